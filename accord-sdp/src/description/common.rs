//! Line-level helpers shared by the session and media grammars.

use shared::error::{Error, Result};

use crate::parameters::{GroupDescription, SsrcGroup};

/// Splits an attribute body into `(key, value)`; flag attributes have no
/// value.
pub(crate) fn parse_attr(body: &str) -> (&str, Option<&str>) {
    match body.split_once(':') {
        Some((key, value)) => (key, Some(value)),
        None => (body, None),
    }
}

/// Parses a connection address, `IN IP4 <addr>` or `IN IP6 <addr>`.
pub(crate) fn ipaddress_from_sdp(sdp: &str) -> Result<String> {
    let bits: Vec<&str> = sdp.split_whitespace().collect();
    if bits.len() != 3 || bits[0] != "IN" || (bits[1] != "IP4" && bits[1] != "IP6") {
        return Err(Error::ErrSdpInvalidSyntax(format!("c={sdp}")));
    }
    Ok(bits[2].to_owned())
}

/// Renders a connection address; colons mark an IPv6 literal.
pub(crate) fn ipaddress_to_sdp(addr: &str) -> String {
    let version = if addr.contains(':') { 6 } else { 4 };
    format!("IN IP{version} {addr}")
}

/// Parses a `<semantic> <item...>` group binding.
pub(crate) fn parse_group(dest: &mut Vec<GroupDescription>, value: &str) {
    let mut bits = value.split_whitespace();
    if let Some(semantic) = bits.next() {
        dest.push(GroupDescription {
            semantic: semantic.to_owned(),
            items: bits.map(|s| s.to_owned()).collect(),
        });
    }
}

/// Parses an `a=ssrc-group:` binding, items being synchronization sources.
pub(crate) fn parse_ssrc_group(dest: &mut Vec<SsrcGroup>, value: &str) -> Result<()> {
    let mut bits = value.split_whitespace();
    if let Some(semantic) = bits.next() {
        let mut ssrcs = Vec::new();
        for item in bits {
            ssrcs.push(item.parse::<u32>()?);
        }
        dest.push(SsrcGroup {
            semantic: semantic.to_owned(),
            ssrcs,
        });
    }
    Ok(())
}

/// Splits a description into the session preamble and one line group per
/// media section; a group starts at each `m=` line. Accepts both CRLF and
/// LF endings.
pub(crate) fn grouplines(sdp: &str) -> (Vec<&str>, Vec<Vec<&str>>) {
    let mut session = Vec::new();
    let mut media: Vec<Vec<&str>> = Vec::new();
    for line in sdp.lines() {
        if line.starts_with("m=") {
            media.push(vec![line]);
        } else if let Some(last) = media.last_mut() {
            last.push(line);
        } else {
            session.push(line);
        }
    }
    (session, media)
}
