//! VP8 RTP payload framing.
//!
//! Based on <https://datatracker.ietf.org/doc/html/rfc7741>

use bytes::{Buf, Bytes, BytesMut};
use rand::Rng;

use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::packetizer::{Depacketizer, Payloader};

/// Upper bound of one payload, descriptor included.
pub const PACKET_MAX: usize = 1300;

const PICTURE_ID_MOD: u16 = 1 << 15;

/// VP8 payload descriptor.
///
/// ```plain
///      0 1 2 3 4 5 6 7
///     +-+-+-+-+-+-+-+-+
///     |X|R|N|S| PID   |
///     +-+-+-+-+-+-+-+-+
/// X:  |I|L|T|K|  RSV  |
///     +-+-+-+-+-+-+-+-+
/// I:  |M| PictureID   |  (two bytes when M is set, 15-bit id)
///     +-+-+-+-+-+-+-+-+
/// L:  |   TL0PICIDX   |
///     +-+-+-+-+-+-+-+-+
/// T/K:|TID|Y| KEYIDX  |
///     +-+-+-+-+-+-+-+-+
/// ```
///
/// The extension byte is emitted only when at least one optional field is
/// present.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct VpxPayloadDescriptor {
    pub partition_start: bool,
    /// 4-bit partition index
    pub partition_id: u8,
    /// 15-bit picture id
    pub picture_id: Option<u16>,
    pub tl0picidx: Option<u8>,
    /// (TID, Y)
    pub tid: Option<(u8, u8)>,
    /// 5-bit temporal key frame index
    pub keyidx: Option<u8>,
}

impl VpxPayloadDescriptor {
    fn has_extension(&self) -> bool {
        self.picture_id.is_some()
            || self.tl0picidx.is_some()
            || self.tid.is_some()
            || self.keyidx.is_some()
    }
}

impl MarshalSize for VpxPayloadDescriptor {
    fn marshal_size(&self) -> usize {
        let mut size = 1;
        if self.has_extension() {
            size += 1;
            if let Some(picture_id) = self.picture_id {
                size += if picture_id < 128 { 1 } else { 2 };
            }
            if self.tl0picidx.is_some() {
                size += 1;
            }
            if self.tid.is_some() || self.keyidx.is_some() {
                size += 1;
            }
        }
        size
    }
}

impl Marshal for VpxPayloadDescriptor {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: size,
                actual: buf.len(),
            });
        }

        let octet = ((self.partition_start as u8) << 4) | (self.partition_id & 0x0f);
        if !self.has_extension() {
            buf[0] = octet;
            return Ok(1);
        }

        let mut ext_octet = 0u8;
        if self.picture_id.is_some() {
            ext_octet |= 1 << 7;
        }
        if self.tl0picidx.is_some() {
            ext_octet |= 1 << 6;
        }
        if self.tid.is_some() {
            ext_octet |= 1 << 5;
        }
        if self.keyidx.is_some() {
            ext_octet |= 1 << 4;
        }

        buf[0] = (1 << 7) | octet;
        buf[1] = ext_octet;
        let mut pos = 2;

        if let Some(picture_id) = self.picture_id {
            if picture_id < 128 {
                buf[pos] = picture_id as u8;
                pos += 1;
            } else {
                let long = (1 << 15) | (picture_id & 0x7fff);
                buf[pos..pos + 2].copy_from_slice(&long.to_be_bytes());
                pos += 2;
            }
        }
        if let Some(tl0picidx) = self.tl0picidx {
            buf[pos] = tl0picidx;
            pos += 1;
        }
        if self.tid.is_some() || self.keyidx.is_some() {
            let mut t_k = 0u8;
            if let Some((tid, y)) = self.tid {
                t_k |= ((tid & 0x03) << 6) | ((y & 0x01) << 5);
            }
            if let Some(keyidx) = self.keyidx {
                t_k |= keyidx & 0x1f;
            }
            buf[pos] = t_k;
            pos += 1;
        }

        Ok(pos)
    }
}

impl Unmarshal for VpxPayloadDescriptor {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        if buf.remaining() < 1 {
            return Err(Error::ErrShortPacket);
        }

        let octet = buf.get_u8();
        let extended = octet >> 7 != 0;
        let partition_start = (octet >> 4) & 1 != 0;
        let partition_id = octet & 0x0f;

        let mut descriptor = VpxPayloadDescriptor {
            partition_start,
            partition_id,
            ..Default::default()
        };

        if extended {
            if buf.remaining() < 1 {
                return Err(Error::ErrTruncatedDescriptor);
            }
            let ext = buf.get_u8();
            let ext_i = (ext >> 7) & 1 != 0;
            let ext_l = (ext >> 6) & 1 != 0;
            let ext_t = (ext >> 5) & 1 != 0;
            let ext_k = (ext >> 4) & 1 != 0;

            if ext_i {
                if buf.remaining() < 1 {
                    return Err(Error::ErrTruncatedDescriptor);
                }
                let first = buf.get_u8();
                if first & 0x80 != 0 {
                    if buf.remaining() < 1 {
                        return Err(Error::ErrTruncatedDescriptor);
                    }
                    let second = buf.get_u8();
                    descriptor.picture_id =
                        Some(u16::from_be_bytes([first, second]) & 0x7fff);
                } else {
                    descriptor.picture_id = Some(first as u16);
                }
            }
            if ext_l {
                if buf.remaining() < 1 {
                    return Err(Error::ErrTruncatedDescriptor);
                }
                descriptor.tl0picidx = Some(buf.get_u8());
            }
            if ext_t || ext_k {
                if buf.remaining() < 1 {
                    return Err(Error::ErrTruncatedDescriptor);
                }
                let t_k = buf.get_u8();
                if ext_t {
                    descriptor.tid = Some(((t_k >> 6) & 0x03, (t_k >> 5) & 0x01));
                }
                if ext_k {
                    descriptor.keyidx = Some(t_k & 0x1f);
                }
            }
        }

        Ok(descriptor)
    }
}

/// Splits VP8 frames into descriptor-prefixed payloads.
///
/// Every payload of one frame shares a picture id; the id steps by one per
/// frame, modulo 2^15, from a random start.
#[derive(Debug, Clone)]
pub struct Vp8Payloader {
    picture_id: u16,
}

impl Default for Vp8Payloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Vp8Payloader {
    pub fn new() -> Self {
        Self {
            picture_id: rand::thread_rng().gen_range(0..PICTURE_ID_MOD),
        }
    }

    pub fn with_picture_id(picture_id: u16) -> Self {
        Self {
            picture_id: picture_id % PICTURE_ID_MOD,
        }
    }

    pub fn picture_id(&self) -> u16 {
        self.picture_id
    }
}

impl Payloader for Vp8Payloader {
    fn payload(&mut self, mtu: usize, frame: &Bytes) -> Result<Vec<Bytes>> {
        let mut descriptor = VpxPayloadDescriptor {
            partition_start: true,
            partition_id: 0,
            picture_id: Some(self.picture_id),
            ..Default::default()
        };
        if mtu <= descriptor.marshal_size() {
            return Err(Error::Other(format!("mtu {mtu} leaves no payload room")));
        }

        let mut payloads = Vec::new();
        let mut pos = 0;
        while pos < frame.len() {
            let descriptor_bytes = descriptor.marshal()?;
            let size = (frame.len() - pos).min(mtu - descriptor_bytes.len());
            let mut payload = BytesMut::with_capacity(descriptor_bytes.len() + size);
            payload.extend_from_slice(&descriptor_bytes);
            payload.extend_from_slice(&frame[pos..pos + size]);
            payloads.push(payload.freeze());

            descriptor.partition_start = false;
            pos += size;
        }

        self.picture_id = (self.picture_id + 1) % PICTURE_ID_MOD;
        Ok(payloads)
    }
}

/// Strips the payload descriptor off incoming VP8 payloads.
#[derive(Default, Debug, Clone)]
pub struct Vp8Depacketizer;

impl Depacketizer for Vp8Depacketizer {
    fn depacketize(&mut self, payload: &Bytes) -> Result<Bytes> {
        let mut buf = payload.clone();
        VpxPayloadDescriptor::unmarshal(&mut buf)?;
        Ok(buf)
    }
}
