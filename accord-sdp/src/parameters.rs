//! Semantic parameter objects carried by a parsed session description.

use std::fmt;

/// fmtp keys whose values are decimal integers; every other key is an opaque
/// string, and keys without `=` carry no value at all.
pub const FMTP_INT_PARAMETERS: [&str; 7] = [
    "apt",
    "max-fr",
    "max-fs",
    "maxplaybackrate",
    "minptime",
    "stereo",
    "useinbandfec",
];

/// A single `a=fmtp:` parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FmtpValue {
    Integer(i64),
    String(String),
}

impl fmt::Display for FmtpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FmtpValue::Integer(v) => write!(f, "{v}"),
            FmtpValue::String(v) => write!(f, "{v}"),
        }
    }
}

/// One `key[=value]` entry of an `a=fmtp:` line, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FmtpParameter {
    pub key: String,
    pub value: Option<FmtpValue>,
}

pub type FmtpParameters = Vec<FmtpParameter>;

/// Parses `k=v;k=v;k`, typing values in [FMTP_INT_PARAMETERS] as integers.
pub fn parameters_from_sdp(sdp: &str) -> FmtpParameters {
    let mut parameters = Vec::new();
    for param in sdp.split(';') {
        if let Some((k, v)) = param.split_once('=') {
            let value = if FMTP_INT_PARAMETERS.contains(&k) {
                match v.parse::<i64>() {
                    Ok(i) => FmtpValue::Integer(i),
                    Err(_) => FmtpValue::String(v.to_owned()),
                }
            } else {
                FmtpValue::String(v.to_owned())
            };
            parameters.push(FmtpParameter {
                key: k.to_owned(),
                value: Some(value),
            });
        } else {
            parameters.push(FmtpParameter {
                key: param.to_owned(),
                value: None,
            });
        }
    }
    parameters
}

/// Renders parameters back to `k=v;k=v;k` form.
pub fn parameters_to_sdp(parameters: &FmtpParameters) -> String {
    let params: Vec<String> = parameters
        .iter()
        .map(|p| match &p.value {
            Some(v) => format!("{}={}", p.key, v),
            None => p.key.clone(),
        })
        .collect();
    params.join(";")
}

/// An `a=rtcp-fb:` feedback mechanism attached to a codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcpFeedback {
    pub typ: String,
    pub parameter: Option<String>,
}

/// Codec description from `a=rtpmap:` with its `a=fmtp:` and `a=rtcp-fb:`
/// attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpCodecParameters {
    /// MIME type as `kind/name`, e.g. `audio/opus`
    pub mime_type: String,
    pub clock_rate: u32,
    /// Channel count; audio only, defaulting to 1
    pub channels: Option<u16>,
    pub payload_type: u8,
    pub parameters: FmtpParameters,
    pub rtcp_feedback: Vec<RtcpFeedback>,
}

impl RtpCodecParameters {
    /// Codec name without the `kind/` prefix.
    pub fn name(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(self.mime_type.as_str())
    }
}

impl fmt::Display for RtpCodecParameters {
    /// Renders the rtpmap codec descriptor, `name/rate[/channels]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name(), self.clock_rate)?;
        if let Some(channels) = self.channels {
            if channels > 1 {
                write!(f, "/{channels}")?;
            }
        }
        Ok(())
    }
}

/// An `a=extmap:` RTP header extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderExtensionParameters {
    pub id: u16,
    pub uri: String,
    /// Optional `/direction` suffix on the id
    pub direction: Option<String>,
}

/// RTP parameters of one media section.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RtpParameters {
    pub codecs: Vec<RtpCodecParameters>,
    pub header_extensions: Vec<HeaderExtensionParameters>,
    /// `a=mid:` value binding the section to its BUNDLE group
    pub mux_id: String,
}

/// A DTLS certificate fingerprint, `a=fingerprint:<algorithm> <value>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtlsFingerprint {
    pub algorithm: String,
    pub value: String,
}

/// Role of the secured transport in the handshake.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DtlsRole {
    /// `a=setup:actpass`, offerer lets the answerer choose
    #[default]
    Auto,
    /// `a=setup:active`, initiates the handshake
    Client,
    /// `a=setup:passive`, awaits the handshake
    Server,
}

impl DtlsRole {
    pub fn to_setup(self) -> &'static str {
        match self {
            DtlsRole::Auto => "actpass",
            DtlsRole::Client => "active",
            DtlsRole::Server => "passive",
        }
    }

    pub fn from_setup(setup: &str) -> Option<DtlsRole> {
        match setup {
            "actpass" => Some(DtlsRole::Auto),
            "active" => Some(DtlsRole::Client),
            "passive" => Some(DtlsRole::Server),
            _ => None,
        }
    }
}

/// DTLS parameters of one media section.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct DtlsParameters {
    pub fingerprints: Vec<DtlsFingerprint>,
    pub role: DtlsRole,
}

/// ICE parameters of one media section.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct IceParameters {
    pub username_fragment: Option<String>,
    pub password: Option<String>,
    pub ice_lite: bool,
}

/// SCTP capabilities advertised by an `application` section.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SctpCapabilities {
    pub max_message_size: u64,
}

/// An `a=group:`/`a=msid-semantic:` binding, e.g. `BUNDLE audio video`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescription {
    pub semantic: String,
    pub items: Vec<String>,
}

impl fmt::Display for GroupDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.semantic, self.items.join(" "))
    }
}

/// An `a=ssrc-group:` binding over synchronization sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsrcGroup {
    pub semantic: String,
    pub ssrcs: Vec<u32>,
}

impl fmt::Display for SsrcGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.ssrcs.iter().map(|s| s.to_string()).collect();
        write!(f, "{} {}", self.semantic, items.join(" "))
    }
}

pub(crate) const SSRC_INFO_ATTRS: [&str; 4] = ["cname", "msid", "mslabel", "label"];

/// Accumulated `a=ssrc:` attributes of one synchronization source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsrcDescription {
    pub ssrc: u32,
    pub cname: Option<String>,
    pub msid: Option<String>,
    pub mslabel: Option<String>,
    pub label: Option<String>,
}

impl SsrcDescription {
    pub fn new(ssrc: u32) -> Self {
        Self {
            ssrc,
            cname: None,
            msid: None,
            mslabel: None,
            label: None,
        }
    }
}
