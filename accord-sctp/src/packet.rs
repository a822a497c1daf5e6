use bytes::Bytes;
use crc::{Crc, CRC_32_ISCSI};

use shared::error::{Error, Result};

use crate::chunk::{padding, Chunk, ChunkType, CHUNK_HEADER_SIZE};

const PACKET_HEADER_SIZE: usize = 12;

const CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// An SCTP packet: common header followed by chunks.
///
/// ```plain
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|     Source Port Number        |     Destination Port Number   |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                      Verification Tag                         |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                           Checksum                            |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The checksum is CRC-32C over the packet with the checksum field zeroed.
/// RFC 4960 appendix B stores the digest in reflected byte order, so it goes
/// out little-endian while everything else is big-endian.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub source_port: u16,
    pub destination_port: u16,
    pub verification_tag: u32,
    pub chunks: Vec<Chunk>,
}

impl Packet {
    pub fn new(source_port: u16, destination_port: u16, verification_tag: u32) -> Self {
        Self {
            source_port,
            destination_port,
            verification_tag,
            chunks: Vec::new(),
        }
    }

    /// Parses and checksum-verifies a packet.
    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        if raw.len() < PACKET_HEADER_SIZE {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: PACKET_HEADER_SIZE,
                actual: raw.len(),
            });
        }

        let source_port = u16::from_be_bytes([raw[0], raw[1]]);
        let destination_port = u16::from_be_bytes([raw[2], raw[3]]);
        let verification_tag = u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
        let their_checksum = u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]);

        let mut digest = CRC32C.digest();
        digest.update(&raw[0..8]);
        digest.update(&[0, 0, 0, 0]);
        digest.update(&raw[PACKET_HEADER_SIZE..]);
        if digest.finalize() != their_checksum {
            return Err(Error::ErrBadChecksum);
        }

        let mut packet = Packet::new(source_port, destination_port, verification_tag);
        let mut pos = PACKET_HEADER_SIZE;
        while pos < raw.len() {
            if raw.len() - pos < CHUNK_HEADER_SIZE {
                return Err(Error::ErrTruncatedChunk);
            }
            let typ = ChunkType::from(raw[pos]);
            let flags = raw[pos + 1];
            let length = u16::from_be_bytes([raw[pos + 2], raw[pos + 3]]) as usize;
            if length < CHUNK_HEADER_SIZE || length > raw.len() - pos {
                return Err(Error::ErrTruncatedChunk);
            }

            packet.chunks.push(Chunk {
                typ,
                flags,
                value: Bytes::copy_from_slice(&raw[pos + CHUNK_HEADER_SIZE..pos + length]),
            });

            // the pad after the last chunk may be absent
            pos += length + padding(length).min(raw.len() - pos - length);
        }

        Ok(packet)
    }

    /// Renders the packet and fills in its checksum.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let size = PACKET_HEADER_SIZE + self.chunks.iter().map(Chunk::wire_size).sum::<usize>();
        let mut raw = Vec::with_capacity(size);

        raw.extend_from_slice(&self.source_port.to_be_bytes());
        raw.extend_from_slice(&self.destination_port.to_be_bytes());
        raw.extend_from_slice(&self.verification_tag.to_be_bytes());
        raw.extend_from_slice(&[0, 0, 0, 0]);

        for chunk in &self.chunks {
            let length = CHUNK_HEADER_SIZE + chunk.value.len();
            if length > u16::MAX as usize {
                return Err(Error::Other(format!("chunk too large: {length}")));
            }
            raw.push(u8::from(chunk.typ));
            raw.push(chunk.flags);
            raw.extend_from_slice(&(length as u16).to_be_bytes());
            raw.extend_from_slice(&chunk.value);
            raw.resize(raw.len() + padding(length), 0);
        }

        let checksum = CRC32C.checksum(&raw);
        raw[8..12].copy_from_slice(&checksum.to_le_bytes());

        Ok(raw)
    }
}
