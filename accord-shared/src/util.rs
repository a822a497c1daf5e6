use rand::Rng;

/// First-byte demultiplexing classes for datagrams sharing one transport,
/// per RFC 7983.
///
/// ```plain
///             +----------------+
///             |        [0..3] -+--> STUN
///             |                |
///             |      [20..63] -+--> DTLS (carries SCTP)
///             |                |
/// packet -->  |    [128..191] -+--> RTP/RTCP
///             +----------------+
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Demux {
    Stun,
    Dtls,
    Rtp,
    Rtcp,
    Unknown,
}

/// Classifies a datagram by its first byte (and, for RTCP, its packet type).
pub fn classify(buf: &[u8]) -> Demux {
    let Some(&first) = buf.first() else {
        return Demux::Unknown;
    };
    match first {
        0..=3 => Demux::Stun,
        20..=63 => Demux::Dtls,
        128..=191 => {
            if is_rtcp(buf) {
                Demux::Rtcp
            } else {
                Demux::Rtp
            }
        }
        _ => Demux::Unknown,
    }
}

/// RTCP packet types occupy 192..=223 in the second octet.
pub fn is_rtcp(buf: &[u8]) -> bool {
    if buf.len() < 4 {
        return false;
    }
    (192..=223).contains(&buf[1])
}

const RUNES_ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates a random alphabetic string of the requested length.
pub fn math_rand_alpha(n: usize) -> String {
    random_string(n, RUNES_ALPHA)
}

fn random_string(n: usize, runes: &[u8]) -> String {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| {
            let idx = rng.gen_range(0..runes.len());
            runes[idx] as char
        })
        .collect()
}

/// Random 32-bit value, e.g. a fresh SSRC or SCTP verification tag.
pub fn random32() -> u32 {
    rand::thread_rng().gen::<u32>()
}
