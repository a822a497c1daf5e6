use bytes::{Buf, BytesMut};

use crate::error::Result;

/// Number of bytes a value occupies once marshaled.
pub trait MarshalSize {
    fn marshal_size(&self) -> usize;
}

/// Serialize a value into a caller-provided buffer.
pub trait Marshal: MarshalSize {
    /// Writes the wire form into `buf` and returns the number of bytes written.
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize>;

    /// Allocates a buffer of exactly `marshal_size()` bytes and writes into it.
    fn marshal(&self) -> Result<BytesMut> {
        let size = self.marshal_size();
        let mut buf = BytesMut::with_capacity(size);
        buf.resize(size, 0);
        let n = self.marshal_to(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}

/// Parse a value from the front of a buffer, advancing it.
pub trait Unmarshal {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf;
}
