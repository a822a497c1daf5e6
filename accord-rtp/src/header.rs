use bytes::{Buf, Bytes};

use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};

pub const HEADER_LENGTH: usize = 12;
pub const VERSION: u8 = 2;

/// RTP fixed header with CSRC list and one raw extension block.
///
/// ```plain
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|V=2|P|X|  CC   |M|     PT      |       sequence number         |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                           timestamp                           |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|           synchronization source (SSRC) identifier            |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|            contributing source (CSRC) identifiers             |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub padding: bool,
    pub extension: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    pub extension_profile: u16,
    /// Raw extension payload, a multiple of four bytes
    pub extension_payload: Bytes,
}

impl MarshalSize for Header {
    fn marshal_size(&self) -> usize {
        let mut size = HEADER_LENGTH + 4 * self.csrc.len();
        if self.extension {
            size += 4 + self.extension_payload.len();
        }
        size
    }
}

impl Marshal for Header {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: size,
                actual: buf.len(),
            });
        }

        buf[0] = (VERSION << 6)
            | ((self.padding as u8) << 5)
            | ((self.extension as u8) << 4)
            | self.csrc.len() as u8;
        buf[1] = ((self.marker as u8) << 7) | (self.payload_type & 0x7f);
        buf[2..4].copy_from_slice(&self.sequence_number.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        let mut pos = HEADER_LENGTH;
        for csrc in &self.csrc {
            buf[pos..pos + 4].copy_from_slice(&csrc.to_be_bytes());
            pos += 4;
        }

        if self.extension {
            if self.extension_payload.len() % 4 != 0 {
                return Err(Error::Other(
                    "extension payload is not a multiple of four bytes".to_owned(),
                ));
            }
            buf[pos..pos + 2].copy_from_slice(&self.extension_profile.to_be_bytes());
            let words = (self.extension_payload.len() / 4) as u16;
            buf[pos + 2..pos + 4].copy_from_slice(&words.to_be_bytes());
            pos += 4;
            buf[pos..pos + self.extension_payload.len()].copy_from_slice(&self.extension_payload);
            pos += self.extension_payload.len();
        }

        Ok(pos)
    }
}

impl Unmarshal for Header {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        if buf.remaining() < HEADER_LENGTH {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: HEADER_LENGTH,
                actual: buf.remaining(),
            });
        }

        let b0 = buf.get_u8();
        if b0 >> 6 != VERSION {
            return Err(Error::ErrShortPacket);
        }
        let padding = (b0 >> 5) & 1 != 0;
        let extension = (b0 >> 4) & 1 != 0;
        let cc = (b0 & 0x0f) as usize;

        let b1 = buf.get_u8();
        let marker = b1 >> 7 != 0;
        let payload_type = b1 & 0x7f;

        let sequence_number = buf.get_u16();
        let timestamp = buf.get_u32();
        let ssrc = buf.get_u32();

        if buf.remaining() < 4 * cc {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: 4 * cc,
                actual: buf.remaining(),
            });
        }
        let mut csrc = Vec::with_capacity(cc);
        for _ in 0..cc {
            csrc.push(buf.get_u32());
        }

        let mut extension_profile = 0;
        let mut extension_payload = Bytes::new();
        if extension {
            if buf.remaining() < 4 {
                return Err(Error::UnexpectedEndOfBuffer {
                    expected: 4,
                    actual: buf.remaining(),
                });
            }
            extension_profile = buf.get_u16();
            let length = buf.get_u16() as usize * 4;
            if buf.remaining() < length {
                return Err(Error::UnexpectedEndOfBuffer {
                    expected: length,
                    actual: buf.remaining(),
                });
            }
            extension_payload = buf.copy_to_bytes(length);
        }

        Ok(Header {
            padding,
            extension,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extension_profile,
            extension_payload,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = Header {
            marker: true,
            payload_type: 96,
            sequence_number: 27023,
            timestamp: 3653407706,
            ssrc: 476325762,
            csrc: vec![1, 2],
            ..Default::default()
        };
        let raw = header.marshal().unwrap();
        assert_eq!(raw.len(), 20);

        let mut buf = &raw[..];
        let parsed = Header::unmarshal(&mut buf).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn test_header_with_extension() {
        let header = Header {
            extension: true,
            extension_profile: 0xBEDE,
            extension_payload: Bytes::from_static(&[0x90, 0x01, 0x02, 0x03]),
            payload_type: 111,
            sequence_number: 1,
            timestamp: 960,
            ssrc: 7,
            ..Default::default()
        };
        let raw = header.marshal().unwrap();
        let mut buf = &raw[..];
        assert_eq!(Header::unmarshal(&mut buf).unwrap(), header);
    }

    #[test]
    fn test_header_too_short() {
        let mut buf = &[0x80u8, 96, 0][..];
        assert!(matches!(
            Header::unmarshal(&mut buf),
            Err(Error::UnexpectedEndOfBuffer { .. })
        ));
    }

    #[test]
    fn test_header_wrong_version() {
        let mut buf = &[0x40u8, 96, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0][..];
        assert!(Header::unmarshal(&mut buf).is_err());
    }
}
