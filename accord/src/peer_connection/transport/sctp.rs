//! SCTP framing above one secured transport.
//!
//! Association management (handshake, acknowledgement, retransmission) is
//! the transport provider's business; this layer frames data-channel
//! messages into DATA chunks, performs stream resets through RE-CONFIG, and
//! unpacks inbound packets.

use std::collections::HashMap;

use bytes::{Buf, Bytes};
use log::{debug, trace};

use datachannel::DataChannelMessage;
use sctp::{Chunk, ChunkPayloadData, ChunkType, Packet, PayloadProtocolIdentifier};
use sdp::parameters::{DtlsFingerprint, SctpCapabilities};
use sdp::MediaDescription;
use shared::error::{Error, Result};
use shared::serial::{uint16_add, uint32_add};
use shared::util::random32;

use crate::constants::{SCTP_DEFAULT_PORT, SCTP_MAX_MESSAGE_SIZE};
use crate::peer_connection::transport::TransportPair;

const PARAM_OUTGOING_RESET_REQUEST: u16 = 13;
const PARAM_RECONFIG_RESPONSE: u16 = 16;
const RECONFIG_RESULT_SUCCESS: u32 = 1;

/// Something a parsed inbound packet asks of us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SctpInbound {
    /// User or DCEP data on a stream
    Data {
        stream_id: u16,
        ppi: PayloadProtocolIdentifier,
        payload: Bytes,
    },
    /// The peer reset its outgoing streams, i.e. our inbound side
    IncomingStreamReset(Vec<u16>),
    /// The peer acknowledged our outgoing stream reset
    OutgoingResetComplete(Vec<u16>),
}

/// The singleton SCTP context of a connection.
pub struct SctpTransport {
    pub(crate) transport: TransportPair,
    pub(crate) mid: Option<String>,
    local_port: u16,
    remote_port: u16,
    verification_tag: u32,
    max_message_size: u64,
    remote_capabilities: Option<SctpCapabilities>,
    tsn: u32,
    reconfig_request_seq: u32,
    pending_resets: HashMap<u32, Vec<u16>>,
    stream_sequence: HashMap<u16, u16>,
}

impl SctpTransport {
    pub fn new(controlling: bool, local_fingerprint: DtlsFingerprint) -> Self {
        Self {
            transport: TransportPair::new(controlling, local_fingerprint),
            mid: None,
            local_port: SCTP_DEFAULT_PORT,
            remote_port: SCTP_DEFAULT_PORT,
            verification_tag: 0,
            max_message_size: SCTP_MAX_MESSAGE_SIZE,
            remote_capabilities: None,
            tsn: random32(),
            reconfig_request_seq: random32(),
            pending_resets: HashMap::new(),
            stream_sequence: HashMap::new(),
        }
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn max_message_size(&self) -> u64 {
        self.max_message_size
    }

    /// Tag expected on outgoing packets, as learned by the provider during
    /// association setup.
    pub fn set_verification_tag(&mut self, tag: u32) {
        self.verification_tag = tag;
    }

    /// Adopts the peer's application-section parameters.
    pub fn configure_remote(&mut self, media: &MediaDescription) {
        if let Some(port) = media.sctp_port {
            self.remote_port = port;
        } else if let Some((port, _)) = media.sctpmap.first() {
            self.remote_port = *port;
        }
        self.remote_capabilities = media.sctp_capabilities;
    }

    /// Largest message the peer accepts.
    pub fn remote_max_message_size(&self) -> u64 {
        self.remote_capabilities
            .map(|c| c.max_message_size)
            .unwrap_or(SCTP_MAX_MESSAGE_SIZE)
    }

    fn next_tsn(&mut self) -> u32 {
        let tsn = self.tsn;
        self.tsn = uint32_add(self.tsn, 1);
        tsn
    }

    /// Frames one data-channel message into a packet.
    pub fn frame_message(&mut self, message: &DataChannelMessage) -> Result<Vec<u8>> {
        if message.payload.len() as u64 > self.remote_max_message_size() {
            return Err(Error::Other(format!(
                "message of {} bytes exceeds the peer limit of {}",
                message.payload.len(),
                self.remote_max_message_size()
            )));
        }

        let sequence = self
            .stream_sequence
            .entry(message.stream_id)
            .or_insert(0);
        let stream_sequence_number = *sequence;
        *sequence = uint16_add(*sequence, 1);

        let data = ChunkPayloadData {
            unordered: false,
            beginning_fragment: true,
            ending_fragment: true,
            tsn: self.next_tsn(),
            stream_identifier: message.stream_id,
            stream_sequence_number,
            payload_type: message.ppi,
            user_data: Bytes::copy_from_slice(&message.payload),
        };

        let mut packet = Packet::new(self.local_port, self.remote_port, self.verification_tag);
        packet.chunks.push(data.to_chunk());
        packet.marshal()
    }

    /// Frames an outgoing stream reset request for the given streams.
    pub fn frame_stream_reset(&mut self, stream_ids: &[u16]) -> Result<Vec<u8>> {
        let request_seq = self.reconfig_request_seq;
        self.reconfig_request_seq = uint32_add(self.reconfig_request_seq, 1);
        self.pending_resets.insert(request_seq, stream_ids.to_vec());

        let mut value = Vec::with_capacity(16 + 2 * stream_ids.len());
        value.extend_from_slice(&PARAM_OUTGOING_RESET_REQUEST.to_be_bytes());
        value.extend_from_slice(&((16 + 2 * stream_ids.len()) as u16).to_be_bytes());
        value.extend_from_slice(&request_seq.to_be_bytes());
        value.extend_from_slice(&0u32.to_be_bytes()); // response sequence
        value.extend_from_slice(&self.tsn.to_be_bytes()); // last assigned TSN
        for stream_id in stream_ids {
            value.extend_from_slice(&stream_id.to_be_bytes());
        }

        let mut packet = Packet::new(self.local_port, self.remote_port, self.verification_tag);
        packet.chunks.push(Chunk {
            typ: ChunkType::Reconfig,
            flags: 0,
            value: Bytes::from(value),
        });
        packet.marshal()
    }

    fn frame_reconfig_response(&mut self, response_seq: u32) -> Result<Vec<u8>> {
        let mut value = Vec::with_capacity(12);
        value.extend_from_slice(&PARAM_RECONFIG_RESPONSE.to_be_bytes());
        value.extend_from_slice(&12u16.to_be_bytes());
        value.extend_from_slice(&response_seq.to_be_bytes());
        value.extend_from_slice(&RECONFIG_RESULT_SUCCESS.to_be_bytes());

        let mut packet = Packet::new(self.local_port, self.remote_port, self.verification_tag);
        packet.chunks.push(Chunk {
            typ: ChunkType::Reconfig,
            flags: 0,
            value: Bytes::from(value),
        });
        packet.marshal()
    }

    /// Unpacks one inbound packet. Reconfiguration responses for the peer
    /// are returned alongside so the caller can queue them out.
    pub fn handle_packet(&mut self, raw: &[u8]) -> Result<(Vec<SctpInbound>, Vec<Vec<u8>>)> {
        let packet = Packet::unmarshal(raw)?;
        let mut inbound = Vec::new();
        let mut responses = Vec::new();

        for chunk in &packet.chunks {
            match chunk.typ {
                ChunkType::Data => {
                    let data = ChunkPayloadData::from_chunk(chunk)?;
                    inbound.push(SctpInbound::Data {
                        stream_id: data.stream_identifier,
                        ppi: data.payload_type,
                        payload: data.user_data,
                    });
                }
                ChunkType::Reconfig => {
                    self.handle_reconfig(chunk, &mut inbound, &mut responses)?;
                }
                other => {
                    // association bookkeeping is the provider's business
                    trace!("ignoring {other} chunk");
                }
            }
        }

        Ok((inbound, responses))
    }

    fn handle_reconfig(
        &mut self,
        chunk: &Chunk,
        inbound: &mut Vec<SctpInbound>,
        responses: &mut Vec<Vec<u8>>,
    ) -> Result<()> {
        let mut value = chunk.value.clone();
        while value.remaining() >= 4 {
            let param_type = value.get_u16();
            let length = value.get_u16() as usize;
            if length < 4 || value.remaining() < length - 4 {
                return Err(Error::ErrTruncatedChunk);
            }
            let mut param = value.copy_to_bytes(length - 4);
            // parameters are padded to four bytes
            let pad = (4 - length % 4) % 4;
            value.advance(pad.min(value.remaining()));

            match param_type {
                PARAM_OUTGOING_RESET_REQUEST => {
                    if param.remaining() < 12 {
                        return Err(Error::ErrTruncatedChunk);
                    }
                    let request_seq = param.get_u32();
                    let _response_seq = param.get_u32();
                    let _last_tsn = param.get_u32();
                    let mut stream_ids = Vec::new();
                    while param.remaining() >= 2 {
                        stream_ids.push(param.get_u16());
                    }
                    debug!("incoming stream reset for {stream_ids:?}");
                    responses.push(self.frame_reconfig_response(request_seq)?);
                    inbound.push(SctpInbound::IncomingStreamReset(stream_ids));
                }
                PARAM_RECONFIG_RESPONSE => {
                    if param.remaining() < 8 {
                        return Err(Error::ErrTruncatedChunk);
                    }
                    let response_seq = param.get_u32();
                    let result = param.get_u32();
                    if let Some(stream_ids) = self.pending_resets.remove(&response_seq) {
                        if result == RECONFIG_RESULT_SUCCESS {
                            inbound.push(SctpInbound::OutgoingResetComplete(stream_ids));
                        }
                    }
                }
                other => {
                    trace!("ignoring reconfig parameter {other}");
                }
            }
        }
        Ok(())
    }
}
