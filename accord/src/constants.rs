/// Default SCTP port advertised for the application section.
pub(crate) const SCTP_DEFAULT_PORT: u16 = 5000;

/// Largest user message accepted over a data channel.
pub(crate) const SCTP_MAX_MESSAGE_SIZE: u64 = 65536;

pub(crate) const ABS_SEND_TIME_URI: &str =
    "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time";
pub(crate) const SSRC_AUDIO_LEVEL_URI: &str = "urn:ietf:params:rtp-hdrext:ssrc-audio-level";
