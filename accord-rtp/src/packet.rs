use bytes::{Buf, Bytes};

use shared::error::Result;
use shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::Header;

/// A full RTP packet.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Bytes,
}

impl MarshalSize for Packet {
    fn marshal_size(&self) -> usize {
        self.header.marshal_size() + self.payload.len()
    }
}

impl Marshal for Packet {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(shared::error::Error::UnexpectedEndOfBuffer {
                expected: size,
                actual: buf.len(),
            });
        }
        let n = self.header.marshal_to(buf)?;
        buf[n..n + self.payload.len()].copy_from_slice(&self.payload);
        Ok(n + self.payload.len())
    }
}

impl Unmarshal for Packet {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        let payload = buf.copy_to_bytes(buf.remaining());
        Ok(Packet { header, payload })
    }
}
