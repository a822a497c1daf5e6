use std::fmt;

use bytes::{Buf, Bytes};

use shared::error::{Error, Result};

use crate::ppi::PayloadProtocolIdentifier;

/// Registered chunk types.
///
/// <https://www.iana.org/assignments/sctp-parameters/sctp-parameters.xhtml#sctp-parameters-1>
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChunkType {
    Data,
    Init,
    InitAck,
    Sack,
    Heartbeat,
    HeartbeatAck,
    Abort,
    Shutdown,
    ShutdownAck,
    Error,
    CookieEcho,
    CookieAck,
    Ecne,
    Cwr,
    ShutdownComplete,
    Reconfig,
    ForwardTsn,
    Unknown(u8),
}

impl From<u8> for ChunkType {
    fn from(v: u8) -> Self {
        match v {
            0 => ChunkType::Data,
            1 => ChunkType::Init,
            2 => ChunkType::InitAck,
            3 => ChunkType::Sack,
            4 => ChunkType::Heartbeat,
            5 => ChunkType::HeartbeatAck,
            6 => ChunkType::Abort,
            7 => ChunkType::Shutdown,
            8 => ChunkType::ShutdownAck,
            9 => ChunkType::Error,
            10 => ChunkType::CookieEcho,
            11 => ChunkType::CookieAck,
            12 => ChunkType::Ecne,
            13 => ChunkType::Cwr,
            14 => ChunkType::ShutdownComplete,
            130 => ChunkType::Reconfig,
            192 => ChunkType::ForwardTsn,
            _ => ChunkType::Unknown(v),
        }
    }
}

impl From<ChunkType> for u8 {
    fn from(t: ChunkType) -> Self {
        match t {
            ChunkType::Data => 0,
            ChunkType::Init => 1,
            ChunkType::InitAck => 2,
            ChunkType::Sack => 3,
            ChunkType::Heartbeat => 4,
            ChunkType::HeartbeatAck => 5,
            ChunkType::Abort => 6,
            ChunkType::Shutdown => 7,
            ChunkType::ShutdownAck => 8,
            ChunkType::Error => 9,
            ChunkType::CookieEcho => 10,
            ChunkType::CookieAck => 11,
            ChunkType::Ecne => 12,
            ChunkType::Cwr => 13,
            ChunkType::ShutdownComplete => 14,
            ChunkType::Reconfig => 130,
            ChunkType::ForwardTsn => 192,
            ChunkType::Unknown(v) => v,
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ChunkType::Data => "DATA",
            ChunkType::Init => "INIT",
            ChunkType::InitAck => "INIT-ACK",
            ChunkType::Sack => "SACK",
            ChunkType::Heartbeat => "HEARTBEAT",
            ChunkType::HeartbeatAck => "HEARTBEAT-ACK",
            ChunkType::Abort => "ABORT",
            ChunkType::Shutdown => "SHUTDOWN",
            ChunkType::ShutdownAck => "SHUTDOWN-ACK",
            ChunkType::Error => "ERROR",
            ChunkType::CookieEcho => "COOKIE-ECHO",
            ChunkType::CookieAck => "COOKIE-ACK",
            ChunkType::Ecne => "ECNE",
            ChunkType::Cwr => "CWR",
            ChunkType::ShutdownComplete => "SHUTDOWN-COMPLETE",
            ChunkType::Reconfig => "RECONFIG",
            ChunkType::ForwardTsn => "FORWARD-TSN",
            ChunkType::Unknown(v) => return write!(f, "Unknown ChunkType: {v}"),
        };
        write!(f, "{s}")
    }
}

pub(crate) const CHUNK_HEADER_SIZE: usize = 4;

/// One chunk of an SCTP packet.
///
/// ```plain
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|  Chunk Type   |  Chunk Flags  |         Chunk Length          |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                          Chunk Value                          |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The length field covers header and value but not the trailing pad to a
/// four-byte boundary; the pad bytes are on the wire nevertheless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub typ: ChunkType,
    pub flags: u8,
    pub value: Bytes,
}

impl Chunk {
    /// Bytes occupied on the wire, pad included.
    pub fn wire_size(&self) -> usize {
        let length = CHUNK_HEADER_SIZE + self.value.len();
        length + padding(length)
    }
}

/// Pad bytes needed to reach a four-byte boundary.
pub(crate) fn padding(length: usize) -> usize {
    (4 - length % 4) % 4
}

const PAYLOAD_DATA_ENDING_FRAGMENT_BITMASK: u8 = 1;
const PAYLOAD_DATA_BEGINNING_FRAGMENT_BITMASK: u8 = 2;
const PAYLOAD_DATA_UNORDERED_BITMASK: u8 = 4;
const PAYLOAD_DATA_HEADER_SIZE: usize = 12;

/// Typed view of a DATA chunk.
///
/// ```plain
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|   Type = 0    | Reserved|U|B|E|    Length                     |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                              TSN                              |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|      Stream Identifier S      |   Stream Sequence Number n    |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                  Payload Protocol Identifier                  |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                 User Data (seq n of Stream S)                 |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPayloadData {
    pub unordered: bool,
    pub beginning_fragment: bool,
    pub ending_fragment: bool,

    pub tsn: u32,
    pub stream_identifier: u16,
    pub stream_sequence_number: u16,
    pub payload_type: PayloadProtocolIdentifier,
    pub user_data: Bytes,
}

impl ChunkPayloadData {
    /// Decodes the value of a DATA chunk.
    pub fn from_chunk(chunk: &Chunk) -> Result<Self> {
        if chunk.typ != ChunkType::Data {
            return Err(Error::Other(format!(
                "chunk type {} is not DATA",
                chunk.typ
            )));
        }
        if chunk.value.len() < PAYLOAD_DATA_HEADER_SIZE {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: PAYLOAD_DATA_HEADER_SIZE,
                actual: chunk.value.len(),
            });
        }

        let mut value = chunk.value.clone();
        let tsn = value.get_u32();
        let stream_identifier = value.get_u16();
        let stream_sequence_number = value.get_u16();
        let payload_type = PayloadProtocolIdentifier::from(value.get_u32());

        Ok(Self {
            unordered: chunk.flags & PAYLOAD_DATA_UNORDERED_BITMASK != 0,
            beginning_fragment: chunk.flags & PAYLOAD_DATA_BEGINNING_FRAGMENT_BITMASK != 0,
            ending_fragment: chunk.flags & PAYLOAD_DATA_ENDING_FRAGMENT_BITMASK != 0,
            tsn,
            stream_identifier,
            stream_sequence_number,
            payload_type,
            user_data: value,
        })
    }

    /// Encodes back into a raw chunk.
    pub fn to_chunk(&self) -> Chunk {
        let mut flags = 0;
        if self.ending_fragment {
            flags |= PAYLOAD_DATA_ENDING_FRAGMENT_BITMASK;
        }
        if self.beginning_fragment {
            flags |= PAYLOAD_DATA_BEGINNING_FRAGMENT_BITMASK;
        }
        if self.unordered {
            flags |= PAYLOAD_DATA_UNORDERED_BITMASK;
        }

        let mut value = Vec::with_capacity(PAYLOAD_DATA_HEADER_SIZE + self.user_data.len());
        value.extend_from_slice(&self.tsn.to_be_bytes());
        value.extend_from_slice(&self.stream_identifier.to_be_bytes());
        value.extend_from_slice(&self.stream_sequence_number.to_be_bytes());
        value.extend_from_slice(&u32::from(self.payload_type).to_be_bytes());
        value.extend_from_slice(&self.user_data);

        Chunk {
            typ: ChunkType::Data,
            flags,
            value: Bytes::from(value),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_chunk_type_round_trip() {
        for v in 0u8..=255 {
            let t = ChunkType::from(v);
            assert_eq!(u8::from(t), v);
        }
    }

    #[test]
    fn test_padding() {
        assert_eq!(padding(4), 0);
        assert_eq!(padding(5), 3);
        assert_eq!(padding(6), 2);
        assert_eq!(padding(7), 1);
        assert_eq!(padding(8), 0);
    }

    #[test]
    fn test_payload_data_round_trip() {
        let data = ChunkPayloadData {
            unordered: false,
            beginning_fragment: true,
            ending_fragment: true,
            tsn: 1234,
            stream_identifier: 1,
            stream_sequence_number: 0,
            payload_type: PayloadProtocolIdentifier::Dcep,
            user_data: Bytes::from_static(&[3, 0, 0, 0]),
        };
        let chunk = data.to_chunk();
        assert_eq!(chunk.typ, ChunkType::Data);
        assert_eq!(chunk.flags, 3);
        assert_eq!(ChunkPayloadData::from_chunk(&chunk).unwrap(), data);
    }

    #[test]
    fn test_payload_data_too_short() {
        let chunk = Chunk {
            typ: ChunkType::Data,
            flags: 0,
            value: Bytes::from_static(&[0, 0, 0]),
        };
        assert!(matches!(
            ChunkPayloadData::from_chunk(&chunk),
            Err(Error::UnexpectedEndOfBuffer { .. })
        ));
    }
}
