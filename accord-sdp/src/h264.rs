//! H.264 `profile-level-id` interpretation.
//!
//! The three-byte hex value packs profile_idc, profile_iop and level_idc;
//! recognized profiles are matched through bit patterns over profile_iop.

use shared::error::{Error, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum H264Profile {
    ConstrainedBaseline,
    Baseline,
    Main,
    ConstrainedHigh,
    High,
    PredictiveHigh444,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum H264Level {
    Level1B,
    Level1,
    Level1_1,
    Level1_2,
    Level1_3,
    Level2,
    Level2_1,
    Level2_2,
    Level3,
    Level3_1,
    Level3_2,
    Level4,
    Level4_1,
    Level4_2,
    Level5,
    Level5_1,
    Level5_2,
}

impl H264Level {
    fn from_idc(level_idc: u8) -> Option<Self> {
        Some(match level_idc {
            10 => H264Level::Level1,
            11 => H264Level::Level1_1,
            12 => H264Level::Level1_2,
            13 => H264Level::Level1_3,
            20 => H264Level::Level2,
            21 => H264Level::Level2_1,
            22 => H264Level::Level2_2,
            30 => H264Level::Level3,
            31 => H264Level::Level3_1,
            32 => H264Level::Level3_2,
            40 => H264Level::Level4,
            41 => H264Level::Level4_1,
            42 => H264Level::Level4_2,
            50 => H264Level::Level5,
            51 => H264Level::Level5_1,
            52 => H264Level::Level5_2,
            _ => return None,
        })
    }
}

/// Matches a profile_iop byte against a pattern of `0`, `1` and `x` (don't
/// care) characters, most significant bit first.
struct BitPattern {
    mask: u8,
    masked_value: u8,
}

impl BitPattern {
    const fn new(s: &[u8; 8]) -> Self {
        Self {
            mask: !bytemask(s, b'x'),
            masked_value: bytemask(s, b'1'),
        }
    }

    fn matches(&self, v: u8) -> bool {
        v & self.mask == self.masked_value
    }
}

const fn bytemask(s: &[u8; 8], c: u8) -> u8 {
    ((s[0] == c) as u8) << 7
        | ((s[1] == c) as u8) << 6
        | ((s[2] == c) as u8) << 5
        | ((s[3] == c) as u8) << 4
        | ((s[4] == c) as u8) << 3
        | ((s[5] == c) as u8) << 2
        | ((s[6] == c) as u8) << 1
        | ((s[7] == c) as u8)
}

const PROFILE_PATTERNS: [(u8, BitPattern, H264Profile); 9] = [
    (0x42, BitPattern::new(b"x1xx0000"), H264Profile::ConstrainedBaseline),
    (0x4D, BitPattern::new(b"1xxx0000"), H264Profile::ConstrainedBaseline),
    (0x58, BitPattern::new(b"11xx0000"), H264Profile::ConstrainedBaseline),
    (0x42, BitPattern::new(b"x0xx0000"), H264Profile::Baseline),
    (0x58, BitPattern::new(b"10xx0000"), H264Profile::Baseline),
    (0x4D, BitPattern::new(b"0x0x0000"), H264Profile::Main),
    (0x64, BitPattern::new(b"00000000"), H264Profile::High),
    (0x64, BitPattern::new(b"00001100"), H264Profile::ConstrainedHigh),
    (0xF4, BitPattern::new(b"00000000"), H264Profile::PredictiveHigh444),
];

/// Parses a six-hex-digit `profile-level-id` into (profile, level).
pub fn parse_profile_level_id(profile_str: &str) -> Result<(H264Profile, H264Level)> {
    if profile_str.len() != 6 || !profile_str.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::ErrSdpInvalidValue(format!(
            "profile-level-id {profile_str}"
        )));
    }

    let profile_idc = u8::from_str_radix(&profile_str[0..2], 16)?;
    let profile_iop = u8::from_str_radix(&profile_str[2..4], 16)?;
    let level_idc = u8::from_str_radix(&profile_str[4..6], 16)?;

    // level 1b shares level_idc 11 with level 1.1, disambiguated by a
    // constraint flag
    let level = if level_idc == 11 && (profile_iop & 0x10) != 0 {
        H264Level::Level1B
    } else {
        H264Level::from_idc(level_idc).ok_or_else(|| {
            Error::ErrSdpInvalidValue(format!("level_idc {level_idc}"))
        })?
    };

    for (idc, pattern, profile) in &PROFILE_PATTERNS {
        if *idc == profile_idc && pattern.matches(profile_iop) {
            return Ok((*profile, level));
        }
    }

    Err(Error::ErrSdpInvalidValue(format!(
        "profile_idc {profile_idc:#x} profile_iop {profile_iop:#x}"
    )))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_constrained_baseline() {
        let (profile, level) = parse_profile_level_id("42e01f").unwrap();
        assert_eq!(profile, H264Profile::ConstrainedBaseline);
        assert_eq!(level, H264Level::Level3_1);
    }

    #[test]
    fn test_baseline() {
        let (profile, level) = parse_profile_level_id("42001f").unwrap();
        assert_eq!(profile, H264Profile::Baseline);
        assert_eq!(level, H264Level::Level3_1);
    }

    #[test]
    fn test_high() {
        let (profile, level) = parse_profile_level_id("640028").unwrap();
        assert_eq!(profile, H264Profile::High);
        assert_eq!(level, H264Level::Level4);
    }

    #[test]
    fn test_level_1b() {
        let (profile, level) = parse_profile_level_id("42f00b").unwrap();
        assert_eq!(profile, H264Profile::ConstrainedBaseline);
        assert_eq!(level, H264Level::Level1B);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_profile_level_id("42e0").is_err());
        assert!(parse_profile_level_id("zzzzzz").is_err());
        assert!(parse_profile_level_id("ff00ff").is_err());
    }
}
