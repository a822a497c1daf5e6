//! Serial-number arithmetic (RFC 1982) for 16- and 32-bit counters.
//!
//! RTP sequence numbers and timestamps as well as SCTP transmission sequence
//! numbers wrap around; comparisons must happen within a half-window.

const HALF_MOD_U16: u16 = 0x8000;
const HALF_MOD_U32: u32 = 0x8000_0000;

/// Returns `a + b` modulo 2^16.
pub fn uint16_add(a: u16, b: u16) -> u16 {
    a.wrapping_add(b)
}

/// Returns `a > b` within a half-window of 2^15.
pub fn uint16_gt(a: u16, b: u16) -> bool {
    ((a < b) && (b - a > HALF_MOD_U16)) || ((a > b) && (a - b < HALF_MOD_U16))
}

/// Returns `a >= b` within a half-window of 2^15.
pub fn uint16_gte(a: u16, b: u16) -> bool {
    a == b || uint16_gt(a, b)
}

/// Returns `a + b` modulo 2^32.
pub fn uint32_add(a: u32, b: u32) -> u32 {
    a.wrapping_add(b)
}

/// Returns `a - b` modulo 2^32.
pub fn uint32_sub(a: u32, b: u32) -> u32 {
    a.wrapping_sub(b)
}

/// Returns `a > b` within a half-window of 2^31.
pub fn uint32_gt(a: u32, b: u32) -> bool {
    ((a < b) && (b - a > HALF_MOD_U32)) || ((a > b) && (a - b < HALF_MOD_U32))
}

/// Returns `a >= b` within a half-window of 2^31.
pub fn uint32_gte(a: u32, b: u32) -> bool {
    a == b || uint32_gt(a, b)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_uint16_add_wraps() {
        assert_eq!(uint16_add(0xFFFF, 1), 0);
        assert_eq!(uint16_add(0xFFFF, 2), 1);
        assert_eq!(uint16_add(1, 2), 3);
    }

    #[test]
    fn test_uint16_gt() {
        assert!(!uint16_gt(0, 0));
        assert!(uint16_gt(1, 0));
        assert!(!uint16_gt(0, 1));
        // wrap: 0 follows 0xFFFF
        assert!(uint16_gt(0, 0xFFFF));
        assert!(!uint16_gt(0xFFFF, 0));
    }

    #[test]
    fn test_uint16_gte() {
        assert!(uint16_gte(0, 0));
        assert!(uint16_gte(1, 0));
        assert!(!uint16_gte(0, 1));
        assert!(uint16_gte(0, 0xFFFF));
    }

    #[test]
    fn test_uint32_add_inverse() {
        // a + (b + (-a - b)) == 0 for wrapping arithmetic
        let cases: Vec<(u32, u32)> = vec![
            (0, 0),
            (1, 2),
            (0xFFFF_FFFF, 1),
            (0x8000_0000, 0x8000_0000),
            (123_456_789, 987_654_321),
        ];
        for (a, b) in cases {
            let neg = 0u32.wrapping_sub(a).wrapping_sub(b);
            assert_eq!(uint32_add(a, uint32_add(b, neg)), 0, "a={a} b={b}");
        }
    }

    #[test]
    fn test_uint32_gt_antisymmetric() {
        let cases: Vec<(u32, u32)> = vec![
            (1, 0),
            (0x7FFF_FFFF, 0),
            (0, 0xFFFF_FFFF),
            (0x8000_0001, 0x8000_0000),
        ];
        for (a, b) in cases {
            assert!(uint32_gt(a, b), "expected {a} > {b}");
            assert!(!uint32_gt(b, a), "expected !({b} > {a})");
        }
        assert!(!uint32_gt(7, 7));
    }

    #[test]
    fn test_uint32_sub_wraps() {
        assert_eq!(uint32_sub(0, 1), 0xFFFF_FFFF);
        assert_eq!(uint32_sub(5, 2), 3);
    }
}
