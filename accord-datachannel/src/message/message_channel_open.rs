use bytes::{Buf, BufMut};

use shared::error::{Error, Result};
use shared::marshal::{Marshal, MarshalSize, Unmarshal};

const CHANNEL_OPEN_HEADER_LEN: usize = 11;

/// Delivery semantics requested for a channel.
///
/// <https://www.rfc-editor.org/rfc/rfc8832.html#section-5.1>
#[derive(Eq, PartialEq, Copy, Clone, Debug, Default)]
pub enum ChannelType {
    /// Reliable, in order
    #[default]
    Reliable = 0x00,
    /// Reliable, unordered
    ReliableUnordered = 0x80,
    /// Bounded retransmissions, in order
    PartialReliableRexmit = 0x01,
    /// Bounded retransmissions, unordered
    PartialReliableRexmitUnordered = 0x81,
    /// Bounded lifetime, in order
    PartialReliableTimed = 0x02,
    /// Bounded lifetime, unordered
    PartialReliableTimedUnordered = 0x82,
}

impl ChannelType {
    pub fn unordered(&self) -> bool {
        (*self as u8) & 0x80 != 0
    }
}

impl TryFrom<u8> for ChannelType {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0x00 => Ok(ChannelType::Reliable),
            0x80 => Ok(ChannelType::ReliableUnordered),
            0x01 => Ok(ChannelType::PartialReliableRexmit),
            0x81 => Ok(ChannelType::PartialReliableRexmitUnordered),
            0x02 => Ok(ChannelType::PartialReliableTimed),
            0x82 => Ok(ChannelType::PartialReliableTimedUnordered),
            other => Err(Error::InvalidMessageType(other)),
        }
    }
}

/// The data-part of a DATA_CHANNEL_OPEN message without the message type.
///
/// # Memory layout
///
/// ```plain
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///| Channel Type  |           Priority            |               |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+           +-+-+-+-+-+-+-+-+
///|                    Reliability Parameter      |  Label Length |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|  Label Length |        Protocol Length        |               |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+               |
///|                            Label                              |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                           Protocol                            |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Eq, PartialEq, Clone, Debug)]
pub struct DataChannelOpen {
    pub channel_type: ChannelType,
    pub priority: u16,
    pub reliability_parameter: u32,
    pub label: Vec<u8>,
    pub protocol: Vec<u8>,
}

impl MarshalSize for DataChannelOpen {
    fn marshal_size(&self) -> usize {
        CHANNEL_OPEN_HEADER_LEN + self.label.len() + self.protocol.len()
    }
}

impl Marshal for DataChannelOpen {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: size,
                actual: buf.len(),
            });
        }

        let mut buf = buf;
        buf.put_u8(self.channel_type as u8);
        buf.put_u16(self.priority);
        buf.put_u32(self.reliability_parameter);
        buf.put_u16(self.label.len() as u16);
        buf.put_u16(self.protocol.len() as u16);
        buf.put_slice(&self.label);
        buf.put_slice(&self.protocol);

        Ok(size)
    }
}

impl Unmarshal for DataChannelOpen {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        if buf.remaining() < CHANNEL_OPEN_HEADER_LEN {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: CHANNEL_OPEN_HEADER_LEN,
                actual: buf.remaining(),
            });
        }

        let channel_type = ChannelType::try_from(buf.get_u8())?;
        let priority = buf.get_u16();
        let reliability_parameter = buf.get_u32();
        let label_len = buf.get_u16() as usize;
        let protocol_len = buf.get_u16() as usize;

        if buf.remaining() < label_len + protocol_len {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: label_len + protocol_len,
                actual: buf.remaining(),
            });
        }

        let mut label = vec![0; label_len];
        buf.copy_to_slice(&mut label);
        let mut protocol = vec![0; protocol_len];
        buf.copy_to_slice(&mut protocol);

        Ok(Self {
            channel_type,
            priority,
            reliability_parameter,
            label,
            protocol,
        })
    }
}
