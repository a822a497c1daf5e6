use std::fmt;

use shared::error::{Error, Result};

use crate::description::common::{
    grouplines, ipaddress_from_sdp, ipaddress_to_sdp, parse_attr, parse_group,
};
use crate::description::media::MediaDescription;
use crate::parameters::{DtlsFingerprint, DtlsRole, GroupDescription};

/// Session-level values that seed every media section.
///
/// A fingerprint or setup role declared in the preamble applies to each media
/// section that does not override it.
#[derive(Default, Debug, Clone)]
pub(crate) struct SessionDefaults {
    pub(crate) dtls_fingerprints: Vec<DtlsFingerprint>,
    pub(crate) dtls_role: Option<DtlsRole>,
    pub(crate) ice_lite: bool,
    pub(crate) ice_options: Option<String>,
    pub(crate) ice_password: Option<String>,
    pub(crate) ice_username_fragment: Option<String>,
}

/// A parsed session description.
///
/// Rendering is the exact inverse of parsing: `parse(render(d))` yields an
/// equal value, and rendering a freshly parsed description is stable under a
/// second pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDescription {
    pub version: u32,
    pub origin: String,
    pub name: String,
    pub time: String,
    pub host: Option<String>,
    pub group: Vec<GroupDescription>,
    pub msid_semantic: Vec<GroupDescription>,
    pub media: Vec<MediaDescription>,
}

impl Default for SessionDescription {
    fn default() -> Self {
        Self {
            version: 0,
            origin: "- 0 0 IN IP4 0.0.0.0".to_owned(),
            name: "-".to_owned(),
            time: "0 0".to_owned(),
            host: None,
            group: Vec::new(),
            msid_semantic: Vec::new(),
            media: Vec::new(),
        }
    }
}

impl SessionDescription {
    pub fn parse(sdp: &str) -> Result<Self> {
        let (session_lines, media_groups) = grouplines(sdp);

        let mut session = SessionDescription::default();
        let mut defaults = SessionDefaults::default();

        for line in session_lines {
            if let Some(value) = line.strip_prefix("v=") {
                session.version = value.trim_end().parse()?;
            } else if let Some(value) = line.strip_prefix("o=") {
                session.origin = value.trim_end().to_owned();
            } else if let Some(value) = line.strip_prefix("s=") {
                session.name = value.trim_end().to_owned();
            } else if let Some(value) = line.strip_prefix("c=") {
                session.host = Some(ipaddress_from_sdp(value)?);
            } else if let Some(value) = line.strip_prefix("t=") {
                session.time = value.trim_end().to_owned();
            } else if let Some(body) = line.strip_prefix("a=") {
                let (attr, value) = parse_attr(body);
                match (attr, value) {
                    ("fingerprint", Some(value)) => {
                        let (algorithm, fingerprint) = value
                            .split_once(' ')
                            .ok_or_else(|| Error::ErrSdpInvalidSyntax(line.to_owned()))?;
                        defaults.dtls_fingerprints.push(DtlsFingerprint {
                            algorithm: algorithm.to_owned(),
                            value: fingerprint.to_owned(),
                        });
                    }
                    ("ice-lite", None) => {
                        defaults.ice_lite = true;
                    }
                    ("ice-options", Some(value)) => {
                        defaults.ice_options = Some(value.to_owned());
                    }
                    ("ice-pwd", Some(value)) => {
                        defaults.ice_password = Some(value.to_owned());
                    }
                    ("ice-ufrag", Some(value)) => {
                        defaults.ice_username_fragment = Some(value.to_owned());
                    }
                    ("group", Some(value)) => {
                        parse_group(&mut session.group, value);
                    }
                    ("msid-semantic", Some(value)) => {
                        parse_group(&mut session.msid_semantic, value);
                    }
                    ("setup", Some(value)) => {
                        defaults.dtls_role = DtlsRole::from_setup(value);
                    }
                    // unknown attributes are ignored
                    _ => {}
                }
            }
        }

        for media_lines in media_groups {
            session
                .media
                .push(MediaDescription::parse(&media_lines, &defaults)?);
        }

        Ok(session)
    }

    /// Resolves the WebRTC track id of a media section through its `a=msid:`
    /// and the session's `WMS` semantic group.
    pub fn webrtc_track_id(&self, media: &MediaDescription) -> Option<String> {
        let msid = media.msid.as_deref()?;
        let (stream_id, track_id) = msid.split_once(' ')?;
        for group in &self.msid_semantic {
            if group.semantic == "WMS"
                && (group.items.iter().any(|i| i == stream_id)
                    || group.items.iter().any(|i| i == "*"))
            {
                return Some(track_id.to_owned());
            }
        }
        None
    }
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = vec![
            format!("v={}", self.version),
            format!("o={}", self.origin),
            format!("s={}", self.name),
        ];
        if let Some(host) = &self.host {
            lines.push(format!("c={}", ipaddress_to_sdp(host)));
        }
        lines.push(format!("t={}", self.time));
        if self.media.iter().any(|m| m.ice.ice_lite) {
            lines.push("a=ice-lite".to_owned());
        }
        for group in &self.group {
            lines.push(format!("a=group:{group}"));
        }
        for group in &self.msid_semantic {
            lines.push(format!("a=msid-semantic:{group}"));
        }

        for line in lines {
            write!(f, "{line}\r\n")?;
        }
        for media in &self.media {
            write!(f, "{media}")?;
        }
        Ok(())
    }
}
