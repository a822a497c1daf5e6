//! `a=candidate:` grammar.

use std::fmt;

use shared::error::{Error, Result};

/// One ICE candidate as carried in a session description.
///
/// Protocol and type stay textual; the connectivity provider owns their
/// interpretation. Trailing extension tokens (`generation`, `network-id`,
/// ...) other than `raddr`/`rport`/`tcptype` are ignored on parse.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub foundation: String,
    pub component: u16,
    pub protocol: String,
    pub priority: u32,
    pub ip: String,
    pub port: u16,
    pub typ: String,
    pub related_address: Option<String>,
    pub related_port: Option<u16>,
    pub tcp_type: Option<String>,
}

impl IceCandidate {
    /// Parses the value of an `a=candidate:` attribute.
    pub fn from_sdp(sdp: &str) -> Result<Self> {
        let bits: Vec<&str> = sdp.split_whitespace().collect();
        if bits.len() < 8 || bits[6] != "typ" {
            return Err(Error::ErrSdpInvalidSyntax(format!("candidate:{sdp}")));
        }

        let mut candidate = IceCandidate {
            foundation: bits[0].to_owned(),
            component: bits[1].parse()?,
            protocol: bits[2].to_owned(),
            priority: bits[3].parse()?,
            ip: bits[4].to_owned(),
            port: bits[5].parse()?,
            typ: bits[7].to_owned(),
            ..Default::default()
        };

        let mut i = 8;
        while i + 1 < bits.len() {
            match bits[i] {
                "raddr" => candidate.related_address = Some(bits[i + 1].to_owned()),
                "rport" => candidate.related_port = Some(bits[i + 1].parse()?),
                "tcptype" => candidate.tcp_type = Some(bits[i + 1].to_owned()),
                _ => {}
            }
            i += 2;
        }

        Ok(candidate)
    }
}

impl fmt::Display for IceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} typ {}",
            self.foundation,
            self.component,
            self.protocol,
            self.priority,
            self.ip,
            self.port,
            self.typ
        )?;
        if let Some(related_address) = &self.related_address {
            write!(f, " raddr {related_address}")?;
        }
        if let Some(related_port) = &self.related_port {
            write!(f, " rport {related_port}")?;
        }
        if let Some(tcp_type) = &self.tcp_type {
            write!(f, " tcptype {tcp_type}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_candidate_host() {
        let sdp = "0 1 UDP 2122187007 192.168.99.58 45274 typ host";
        let candidate = IceCandidate::from_sdp(sdp).unwrap();
        assert_eq!(candidate.foundation, "0");
        assert_eq!(candidate.component, 1);
        assert_eq!(candidate.protocol, "UDP");
        assert_eq!(candidate.priority, 2122187007);
        assert_eq!(candidate.ip, "192.168.99.58");
        assert_eq!(candidate.port, 45274);
        assert_eq!(candidate.typ, "host");
        assert_eq!(candidate.to_string(), sdp);
    }

    #[test]
    fn test_candidate_server_reflexive() {
        let sdp = "1 1 udp 1686052607 1.2.3.4 42705 typ srflx raddr 192.168.99.58 rport 42705";
        let candidate = IceCandidate::from_sdp(sdp).unwrap();
        assert_eq!(candidate.typ, "srflx");
        assert_eq!(candidate.related_address.as_deref(), Some("192.168.99.58"));
        assert_eq!(candidate.related_port, Some(42705));
        assert_eq!(candidate.to_string(), sdp);
    }

    #[test]
    fn test_candidate_tcp_with_extension_tokens() {
        let sdp = "3496416974 1 tcp 1518283007 1.2.3.4 9 typ host tcptype active \
                   generation 0 network-id 2 network-cost 10";
        let candidate = IceCandidate::from_sdp(sdp).unwrap();
        assert_eq!(candidate.tcp_type.as_deref(), Some("active"));
        assert_eq!(
            candidate.to_string(),
            "3496416974 1 tcp 1518283007 1.2.3.4 9 typ host tcptype active"
        );
    }

    #[test]
    fn test_candidate_malformed() {
        assert!(IceCandidate::from_sdp("0 1 UDP 2122187007").is_err());
        assert!(IceCandidate::from_sdp("0 1 UDP 2122187007 1.2.3.4 9 kind host").is_err());
    }
}
