use std::collections::VecDeque;
use std::fmt;

use bwe::RemoteBitrateEstimator;
use rtp::sequence::Sequencer;
use sdp::direction::Direction;
use sdp::parameters::{DtlsFingerprint, HeaderExtensionParameters, RtpCodecParameters, RtpParameters};
use shared::error::{Error, Result};
use shared::util::random32;

use crate::media::Codec;
use crate::peer_connection::transport::TransportPair;

/// Kind of media a transceiver carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        };
        write!(f, "{s}")
    }
}

impl TryFrom<&str> for MediaKind {
    type Error = Error;

    fn try_from(raw: &str) -> Result<Self> {
        match raw {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            _ => Err(Error::ErrUnsupportedTrackKind(raw.to_owned())),
        }
    }
}

/// An application-provided source of media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: String,
    pub kind: MediaKind,
}

/// Outbound half of a transceiver.
#[derive(Debug)]
pub struct RtpSender {
    pub(crate) track: Option<MediaTrack>,
    pub(crate) ssrc: u32,
    pub(crate) payload_type: Option<u8>,
    pub(crate) codec: Option<Codec>,
    pub(crate) sequencer: Sequencer,
    pub(crate) timestamp: u32,
}

impl RtpSender {
    fn new(track: Option<MediaTrack>) -> Self {
        Self {
            track,
            ssrc: random32(),
            payload_type: None,
            codec: None,
            sequencer: Sequencer::new(),
            timestamp: random32(),
        }
    }

    pub fn track(&self) -> Option<&MediaTrack> {
        self.track.as_ref()
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }
}

/// Inbound half of a transceiver: packets are delivered in arrival order,
/// reordering beyond that is left to the consumer.
#[derive(Default, Debug)]
pub struct RtpReceiver {
    pub(crate) ssrcs: Vec<u32>,
    pub(crate) packets: VecDeque<rtp::Packet>,
    pub(crate) packets_received: u64,
    pub(crate) bytes_received: u64,
}

impl RtpReceiver {
    /// Next received packet, if any.
    pub fn poll_packet(&mut self) -> Option<rtp::Packet> {
        self.packets.pop_front()
    }

    pub fn ssrcs(&self) -> &[u32] {
        &self.ssrcs
    }

    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}

/// One media section: a sender, a receiver and the transport harness they
/// share.
#[derive(Debug)]
pub struct RtpTransceiver {
    pub(crate) kind: MediaKind,
    pub(crate) mid: Option<String>,
    pub(crate) sender: RtpSender,
    pub(crate) receiver: RtpReceiver,
    /// Codecs offered or, once negotiated, agreed with the peer
    pub(crate) codecs: Vec<RtpCodecParameters>,
    pub(crate) header_extensions: Vec<HeaderExtensionParameters>,
    pub(crate) remote_parameters: Option<RtpParameters>,
    pub(crate) transport: TransportPair,
    pub(crate) estimator: RemoteBitrateEstimator,
    pub(crate) abs_send_time_id: Option<u16>,
    pub(crate) last_bandwidth_estimate: Option<u64>,
}

impl RtpTransceiver {
    pub(crate) fn new(
        kind: MediaKind,
        controlling: bool,
        local_fingerprint: DtlsFingerprint,
        track: Option<MediaTrack>,
        codecs: Vec<RtpCodecParameters>,
        header_extensions: Vec<HeaderExtensionParameters>,
    ) -> Self {
        Self {
            kind,
            mid: None,
            sender: RtpSender::new(track),
            receiver: RtpReceiver::default(),
            codecs,
            header_extensions,
            remote_parameters: None,
            transport: TransportPair::new(controlling, local_fingerprint),
            estimator: RemoteBitrateEstimator::new(),
            abs_send_time_id: None,
            last_bandwidth_estimate: None,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn mid(&self) -> Option<&str> {
        self.mid.as_deref()
    }

    /// A transceiver with a local track wants both directions; one created
    /// only to receive stays receive-only.
    pub fn direction(&self) -> Direction {
        if self.sender.track.is_some() {
            Direction::Sendrecv
        } else {
            Direction::Recvonly
        }
    }

    pub fn sender(&self) -> &RtpSender {
        &self.sender
    }

    pub fn receiver(&self) -> &RtpReceiver {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut RtpReceiver {
        &mut self.receiver
    }

    /// Latest delay-based estimate for the inbound direction.
    pub fn bandwidth_estimate(&self) -> Option<u64> {
        self.last_bandwidth_estimate
    }
}

/// Pulls the 24-bit abs-send-time out of a one-byte-header extension block.
pub(crate) fn abs_send_time(header: &rtp::Header, id: u16) -> Option<u32> {
    if !header.extension || header.extension_profile != 0xBEDE {
        return None;
    }
    let payload = &header.extension_payload;
    let mut i = 0;
    while i < payload.len() {
        let b = payload[i];
        if b == 0 {
            i += 1;
            continue;
        }
        let ext_id = u16::from(b >> 4);
        let len = (b & 0x0F) as usize + 1;
        if i + 1 + len > payload.len() {
            return None;
        }
        if ext_id == id {
            if len != 3 {
                return None;
            }
            return Some(
                (u32::from(payload[i + 1]) << 16)
                    | (u32::from(payload[i + 2]) << 8)
                    | u32::from(payload[i + 3]),
            );
        }
        i += 1 + len;
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_abs_send_time_extraction() {
        let header = rtp::Header {
            extension: true,
            extension_profile: 0xBEDE,
            // id 2, len 3: abs-send-time 0x123456, then padding
            extension_payload: Bytes::from_static(&[0x22, 0x12, 0x34, 0x56]),
            ..Default::default()
        };
        assert_eq!(abs_send_time(&header, 2), Some(0x123456));
        assert_eq!(abs_send_time(&header, 3), None);

        let no_ext = rtp::Header::default();
        assert_eq!(abs_send_time(&no_ext, 2), None);
    }

    #[test]
    fn test_abs_send_time_skips_other_elements() {
        let header = rtp::Header {
            extension: true,
            extension_profile: 0xBEDE,
            // id 1 len 1 (audio level), pad, id 2 len 3, pad
            extension_payload: Bytes::from_static(&[0x10, 0x7F, 0x00, 0x22, 0x01, 0x02, 0x03, 0x00]),
            ..Default::default()
        };
        assert_eq!(abs_send_time(&header, 2), Some(0x010203));
    }
}
