use bytes::Bytes;

use shared::error::Result;

/// Splits one compressed frame into RTP payloads no larger than `mtu`,
/// framing descriptors included.
pub trait Payloader {
    fn payload(&mut self, mtu: usize, frame: &Bytes) -> Result<Vec<Bytes>>;
}

/// Strips payload framing, yielding the codec bitstream fragment.
pub trait Depacketizer {
    fn depacketize(&mut self, payload: &Bytes) -> Result<Bytes>;
}
