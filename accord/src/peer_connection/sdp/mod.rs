use std::fmt;

use serde::{Deserialize, Serialize};

use sdp::SessionDescription;
use shared::error::Result;

/// Kind of a session description in the offer/answer exchange.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Pranswer,
    Answer,
}

impl fmt::Display for SdpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            SdpKind::Offer => "offer",
            SdpKind::Pranswer => "pranswer",
            SdpKind::Answer => "answer",
        };
        write!(f, "{s}")
    }
}

/// A session description as it crosses the signaling channel: a kind plus
/// the textual form. Serializes to the JSON shape signaling code expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptionInit {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescriptionInit {
    pub fn offer(sdp: String) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp,
        }
    }

    pub fn pranswer(sdp: String) -> Self {
        Self {
            kind: SdpKind::Pranswer,
            sdp,
        }
    }

    pub fn answer(sdp: String) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp,
        }
    }

    /// Parses the carried text into its semantic form.
    pub fn parse(&self) -> Result<SessionDescription> {
        SessionDescription::parse(&self.sdp)
    }
}
