use std::fmt;
use std::ops::RangeInclusive;

use shared::error::{Error, Result};

use crate::candidate::IceCandidate;
use crate::description::common::{
    ipaddress_from_sdp, ipaddress_to_sdp, parse_attr, parse_ssrc_group,
};
use crate::description::session::SessionDefaults;
use crate::direction::{Direction, DIRECTIONS};
use crate::parameters::{
    parameters_from_sdp, parameters_to_sdp, DtlsFingerprint, DtlsParameters, DtlsRole,
    HeaderExtensionParameters, IceParameters, RtcpFeedback, RtpCodecParameters, RtpParameters,
    SctpCapabilities, SsrcDescription, SsrcGroup, SSRC_INFO_ATTRS,
};

/// Payload types reserved so RTCP packets multiplexed on the same transport
/// stay distinguishable from RTP.
pub const FORBIDDEN_PAYLOAD_TYPES: RangeInclusive<u8> = 64..=95;

/// One `m=` section of a session description.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaDescription {
    // rtp
    pub kind: String,
    pub port: u16,
    pub host: Option<String>,
    pub profile: String,
    pub direction: Option<Direction>,
    pub msid: Option<String>,

    // rtcp
    pub rtcp_port: Option<u16>,
    pub rtcp_host: Option<String>,
    pub rtcp_mux: bool,

    // ssrc
    pub ssrc: Vec<SsrcDescription>,
    pub ssrc_group: Vec<SsrcGroup>,

    // formats
    pub fmt: Vec<String>,
    pub rtp: RtpParameters,

    // sctp
    pub sctp_capabilities: Option<SctpCapabilities>,
    pub sctpmap: Vec<(u16, String)>,
    pub sctp_port: Option<u16>,

    // dtls
    pub dtls: Option<DtlsParameters>,

    // ice
    pub ice: IceParameters,
    pub ice_candidates: Vec<IceCandidate>,
    pub ice_candidates_complete: bool,
    pub ice_options: Option<String>,
}

impl MediaDescription {
    pub fn new(
        kind: impl Into<String>,
        port: u16,
        profile: impl Into<String>,
        fmt: Vec<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            port,
            host: None,
            profile: profile.into(),
            direction: None,
            msid: None,
            rtcp_port: None,
            rtcp_host: None,
            rtcp_mux: false,
            ssrc: Vec::new(),
            ssrc_group: Vec::new(),
            fmt,
            rtp: RtpParameters::default(),
            sctp_capabilities: None,
            sctpmap: Vec::new(),
            sctp_port: None,
            dtls: None,
            ice: IceParameters::default(),
            ice_candidates: Vec::new(),
            ice_candidates_complete: false,
            ice_options: None,
        }
    }

    /// Looks up the codec declared for a payload type.
    pub fn codec(&self, payload_type: u8) -> Option<&RtpCodecParameters> {
        self.rtp
            .codecs
            .iter()
            .find(|c| c.payload_type == payload_type)
    }

    pub(crate) fn parse(media_lines: &[&str], defaults: &SessionDefaults) -> Result<Self> {
        let m_value = media_lines[0]
            .strip_prefix("m=")
            .ok_or_else(|| Error::ErrSdpInvalidSyntax(media_lines[0].to_owned()))?;
        let bits: Vec<&str> = m_value.split_whitespace().collect();
        if bits.len() < 4 {
            return Err(Error::ErrSdpInvalidSyntax(media_lines[0].to_owned()));
        }

        let kind = bits[0];
        let port: u16 = bits[1].parse()?;
        let profile = bits[2];
        let fmt: Vec<String> = bits[3..].iter().map(|s| (*s).to_owned()).collect();

        // audio/video format tokens must be payload types outside the
        // forbidden range; application formats stay opaque
        if kind == "audio" || kind == "video" {
            for token in &fmt {
                let pt: u8 = token
                    .parse()
                    .map_err(|_| Error::ErrSdpInvalidValue(token.clone()))?;
                if FORBIDDEN_PAYLOAD_TYPES.contains(&pt) {
                    return Err(Error::ErrForbiddenPayloadType(pt));
                }
            }
        }

        let mut media = MediaDescription::new(kind, port, profile, fmt);
        let mut dtls_fingerprints = defaults.dtls_fingerprints.clone();
        let mut dtls_role = defaults.dtls_role;
        media.ice = IceParameters {
            username_fragment: defaults.ice_username_fragment.clone(),
            password: defaults.ice_password.clone(),
            ice_lite: defaults.ice_lite,
        };
        media.ice_options = defaults.ice_options.clone();

        for line in &media_lines[1..] {
            if let Some(value) = line.strip_prefix("c=") {
                media.host = Some(ipaddress_from_sdp(value)?);
            } else if let Some(body) = line.strip_prefix("a=") {
                let (attr, value) = parse_attr(body);
                match (attr, value) {
                    ("candidate", Some(value)) => {
                        media.ice_candidates.push(IceCandidate::from_sdp(value)?);
                    }
                    ("end-of-candidates", None) => {
                        media.ice_candidates_complete = true;
                    }
                    ("extmap", Some(value)) => {
                        let (ext_id, ext_uri) = value
                            .split_once(' ')
                            .ok_or_else(|| Error::ErrSdpInvalidSyntax((*line).to_owned()))?;
                        let (ext_id, ext_direction) = match ext_id.split_once('/') {
                            Some((id, direction)) => (id, Some(direction.to_owned())),
                            None => (ext_id, None),
                        };
                        media.rtp.header_extensions.push(HeaderExtensionParameters {
                            id: ext_id.parse()?,
                            uri: ext_uri.to_owned(),
                            direction: ext_direction,
                        });
                    }
                    ("fingerprint", Some(value)) => {
                        let (algorithm, fingerprint) = value
                            .split_once(' ')
                            .ok_or_else(|| Error::ErrSdpInvalidSyntax((*line).to_owned()))?;
                        dtls_fingerprints.push(DtlsFingerprint {
                            algorithm: algorithm.to_owned(),
                            value: fingerprint.to_owned(),
                        });
                    }
                    ("ice-options", Some(value)) => {
                        media.ice_options = Some(value.to_owned());
                    }
                    ("ice-pwd", Some(value)) => {
                        media.ice.password = Some(value.to_owned());
                    }
                    ("ice-ufrag", Some(value)) => {
                        media.ice.username_fragment = Some(value.to_owned());
                    }
                    ("max-message-size", Some(value)) => {
                        media.sctp_capabilities = Some(SctpCapabilities {
                            max_message_size: value.parse()?,
                        });
                    }
                    ("mid", Some(value)) => {
                        media.rtp.mux_id = value.to_owned();
                    }
                    ("msid", Some(value)) => {
                        media.msid = Some(value.to_owned());
                    }
                    ("rtcp", Some(value)) => match value.split_once(' ') {
                        Some((port, rest)) => {
                            media.rtcp_port = Some(port.parse()?);
                            media.rtcp_host = Some(ipaddress_from_sdp(rest)?);
                        }
                        None => {
                            media.rtcp_port = Some(value.parse()?);
                        }
                    },
                    ("rtcp-mux", None) => {
                        media.rtcp_mux = true;
                    }
                    ("setup", Some(value)) => {
                        dtls_role = DtlsRole::from_setup(value);
                    }
                    ("rtpmap", Some(value)) => {
                        let (format_id, format_desc) = value
                            .split_once(' ')
                            .ok_or_else(|| Error::ErrSdpInvalidSyntax((*line).to_owned()))?;
                        let bits: Vec<&str> = format_desc.split('/').collect();
                        if bits.len() < 2 {
                            return Err(Error::ErrSdpInvalidSyntax((*line).to_owned()));
                        }
                        let channels = if media.kind == "audio" {
                            if bits.len() > 2 {
                                Some(bits[2].parse()?)
                            } else {
                                Some(1)
                            }
                        } else {
                            None
                        };
                        media.rtp.codecs.push(RtpCodecParameters {
                            mime_type: format!("{}/{}", media.kind, bits[0]),
                            clock_rate: bits[1].parse()?,
                            channels,
                            payload_type: format_id.parse()?,
                            parameters: Vec::new(),
                            rtcp_feedback: Vec::new(),
                        });
                    }
                    ("sctpmap", Some(value)) => {
                        let (format_id, format_desc) = value
                            .split_once(' ')
                            .ok_or_else(|| Error::ErrSdpInvalidSyntax((*line).to_owned()))?;
                        media
                            .sctpmap
                            .push((format_id.parse()?, format_desc.to_owned()));
                    }
                    ("sctp-port", Some(value)) => {
                        media.sctp_port = Some(value.parse()?);
                    }
                    ("ssrc-group", Some(value)) => {
                        parse_ssrc_group(&mut media.ssrc_group, value)?;
                    }
                    ("ssrc", Some(value)) => {
                        let (ssrc_str, ssrc_desc) = value
                            .split_once(' ')
                            .ok_or_else(|| Error::ErrSdpInvalidSyntax((*line).to_owned()))?;
                        let ssrc: u32 = ssrc_str.parse()?;
                        let (ssrc_attr, ssrc_value) = ssrc_desc
                            .split_once(':')
                            .ok_or_else(|| Error::ErrSdpInvalidSyntax((*line).to_owned()))?;

                        let index = match media.ssrc.iter().position(|s| s.ssrc == ssrc) {
                            Some(index) => index,
                            None => {
                                media.ssrc.push(SsrcDescription::new(ssrc));
                                media.ssrc.len() - 1
                            }
                        };
                        let info = &mut media.ssrc[index];
                        if SSRC_INFO_ATTRS.contains(&ssrc_attr) {
                            let value = Some(ssrc_value.to_owned());
                            match ssrc_attr {
                                "cname" => info.cname = value,
                                "msid" => info.msid = value,
                                "mslabel" => info.mslabel = value,
                                "label" => info.label = value,
                                _ => unreachable!(),
                            }
                        }
                    }
                    (attr, None) if DIRECTIONS.contains(&attr) => {
                        media.direction = Some(attr.parse()?);
                    }
                    // unknown attributes are ignored
                    _ => {}
                }
            }
        }

        // a section advertising neither a fingerprint nor a setup role does
        // not use DTLS at all
        if dtls_fingerprints.is_empty() && dtls_role.is_none() {
            media.dtls = None;
        } else {
            media.dtls = Some(DtlsParameters {
                fingerprints: dtls_fingerprints,
                role: dtls_role.unwrap_or_default(),
            });
        }

        // fmtp and rtcp-fb refer to codecs, so they need a second pass
        for line in &media_lines[1..] {
            if let Some(body) = line.strip_prefix("a=") {
                let (attr, value) = parse_attr(body);
                match (attr, value) {
                    ("fmtp", Some(value)) => {
                        let (format_id, format_desc) = value
                            .split_once(' ')
                            .ok_or_else(|| Error::ErrSdpInvalidSyntax((*line).to_owned()))?;
                        let pt: u8 = format_id.parse()?;
                        let codec = media
                            .rtp
                            .codecs
                            .iter_mut()
                            .find(|c| c.payload_type == pt)
                            .ok_or(Error::ErrUnknownPayloadType(pt))?;
                        codec.parameters = parameters_from_sdp(format_desc);
                    }
                    ("rtcp-fb", Some(value)) => {
                        let bits: Vec<&str> = value.splitn(3, ' ').collect();
                        if bits.len() < 2 {
                            return Err(Error::ErrSdpInvalidSyntax((*line).to_owned()));
                        }
                        for codec in &mut media.rtp.codecs {
                            if bits[0] == "*" || bits[0] == codec.payload_type.to_string() {
                                codec.rtcp_feedback.push(RtcpFeedback {
                                    typ: bits[1].to_owned(),
                                    parameter: bits.get(2).map(|s| (*s).to_owned()),
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(media)
    }
}

impl fmt::Display for MediaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        lines.push(format!(
            "m={} {} {} {}",
            self.kind,
            self.port,
            self.profile,
            self.fmt.join(" ")
        ));
        if let Some(host) = &self.host {
            lines.push(format!("c={}", ipaddress_to_sdp(host)));
        }
        if let Some(direction) = &self.direction {
            lines.push(format!("a={direction}"));
        }

        for header in &self.rtp.header_extensions {
            match &header.direction {
                Some(direction) => {
                    lines.push(format!("a=extmap:{}/{} {}", header.id, direction, header.uri));
                }
                None => lines.push(format!("a=extmap:{} {}", header.id, header.uri)),
            }
        }

        if !self.rtp.mux_id.is_empty() {
            lines.push(format!("a=mid:{}", self.rtp.mux_id));
        }

        if let Some(msid) = &self.msid {
            lines.push(format!("a=msid:{msid}"));
        }

        if let (Some(rtcp_port), Some(rtcp_host)) = (self.rtcp_port, &self.rtcp_host) {
            lines.push(format!("a=rtcp:{} {}", rtcp_port, ipaddress_to_sdp(rtcp_host)));
            if self.rtcp_mux {
                lines.push("a=rtcp-mux".to_owned());
            }
        }

        for group in &self.ssrc_group {
            lines.push(format!("a=ssrc-group:{group}"));
        }
        for ssrc_info in &self.ssrc {
            let attrs = [
                ("cname", &ssrc_info.cname),
                ("msid", &ssrc_info.msid),
                ("mslabel", &ssrc_info.mslabel),
                ("label", &ssrc_info.label),
            ];
            for (ssrc_attr, ssrc_value) in attrs {
                if let Some(ssrc_value) = ssrc_value {
                    lines.push(format!("a=ssrc:{} {}:{}", ssrc_info.ssrc, ssrc_attr, ssrc_value));
                }
            }
        }

        for codec in &self.rtp.codecs {
            lines.push(format!("a=rtpmap:{} {}", codec.payload_type, codec));

            for feedback in &codec.rtcp_feedback {
                let mut value = feedback.typ.clone();
                if let Some(parameter) = &feedback.parameter {
                    value.push(' ');
                    value.push_str(parameter);
                }
                lines.push(format!("a=rtcp-fb:{} {}", codec.payload_type, value));
            }

            let params = parameters_to_sdp(&codec.parameters);
            if !params.is_empty() {
                lines.push(format!("a=fmtp:{} {}", codec.payload_type, params));
            }
        }

        for (k, v) in &self.sctpmap {
            lines.push(format!("a=sctpmap:{k} {v}"));
        }
        if let Some(sctp_port) = self.sctp_port {
            lines.push(format!("a=sctp-port:{sctp_port}"));
        }
        if let Some(capabilities) = &self.sctp_capabilities {
            lines.push(format!("a=max-message-size:{}", capabilities.max_message_size));
        }

        // ice
        for candidate in &self.ice_candidates {
            lines.push(format!("a=candidate:{candidate}"));
        }
        if self.ice_candidates_complete {
            lines.push("a=end-of-candidates".to_owned());
        }
        if let Some(username_fragment) = &self.ice.username_fragment {
            lines.push(format!("a=ice-ufrag:{username_fragment}"));
        }
        if let Some(password) = &self.ice.password {
            lines.push(format!("a=ice-pwd:{password}"));
        }
        if let Some(ice_options) = &self.ice_options {
            lines.push(format!("a=ice-options:{ice_options}"));
        }

        // dtls
        if let Some(dtls) = &self.dtls {
            for fingerprint in &dtls.fingerprints {
                lines.push(format!(
                    "a=fingerprint:{} {}",
                    fingerprint.algorithm, fingerprint.value
                ));
            }
            lines.push(format!("a=setup:{}", dtls.role.to_setup()));
        }

        for line in lines {
            write!(f, "{line}\r\n")?;
        }
        Ok(())
    }
}
