#[cfg(test)]
mod data_channel_test;

use std::collections::VecDeque;

use bytes::{Buf, BytesMut};
use log::debug;

use sctp::PayloadProtocolIdentifier;
use shared::error::{Error, Result};
use shared::marshal::{Marshal, Unmarshal};

use crate::message::message_channel_ack::DataChannelAck;
use crate::message::message_channel_open::{ChannelType, DataChannelOpen};
use crate::message::Message;

/// Lifecycle of a channel.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataChannelState {
    #[default]
    Connecting,
    Open,
    Closing,
    Closed,
}

/// DataChannelConfig is used to configure a channel.
#[derive(Eq, PartialEq, Default, Clone, Debug)]
pub struct DataChannelConfig {
    pub channel_type: ChannelType,
    /// Negotiated out of band; no DCEP handshake is sent
    pub negotiated: bool,
    pub priority: u16,
    pub reliability_parameter: u32,
    pub label: String,
    pub protocol: String,
}

/// One message crossing the SCTP stream of a channel.
#[derive(Debug, Default, Clone)]
pub struct DataChannelMessage {
    pub stream_id: u16,
    pub ppi: PayloadProtocolIdentifier,
    pub payload: BytesMut,
}

/// A data channel bound to one SCTP stream.
///
/// The channel is a queue-backed state machine: user and DCEP messages to be
/// sent pile up in `write_outs` for the owner to drain towards the SCTP
/// endpoint, inbound user messages pile up in `read_outs`.
#[derive(Debug, Default, Clone)]
pub struct DataChannel {
    config: DataChannelConfig,
    stream_id: u16,
    state: DataChannelState,

    read_outs: VecDeque<DataChannelMessage>,
    write_outs: VecDeque<DataChannelMessage>,

    outgoing_reset_done: bool,
    incoming_reset_done: bool,

    // stats
    messages_sent: usize,
    messages_received: usize,
    bytes_sent: usize,
    bytes_received: usize,
}

impl DataChannel {
    fn new(config: DataChannelConfig, stream_id: u16) -> Self {
        Self {
            config,
            stream_id,
            ..Default::default()
        }
    }

    /// Opens a channel towards the peer, queueing DATA_CHANNEL_OPEN unless
    /// the channel was negotiated out of band.
    pub fn dial(config: DataChannelConfig, stream_id: u16) -> Result<Self> {
        let mut data_channel = DataChannel::new(config.clone(), stream_id);

        if !config.negotiated {
            let msg = Message::DataChannelOpen(DataChannelOpen {
                channel_type: config.channel_type,
                priority: config.priority,
                reliability_parameter: config.reliability_parameter,
                label: config.label.into_bytes(),
                protocol: config.protocol.into_bytes(),
            })
            .marshal()?;

            data_channel.write_outs.push_back(DataChannelMessage {
                stream_id,
                ppi: PayloadProtocolIdentifier::Dcep,
                payload: msg,
            });
        }

        Ok(data_channel)
    }

    /// Accepts a peer-initiated channel from its DATA_CHANNEL_OPEN message
    /// and queues the acknowledgement.
    pub fn accept(
        mut config: DataChannelConfig,
        stream_id: u16,
        ppi: PayloadProtocolIdentifier,
        buf: &[u8],
    ) -> Result<Self> {
        if ppi != PayloadProtocolIdentifier::Dcep {
            return Err(Error::InvalidPayloadProtocolIdentifier(ppi as u8));
        }

        let mut read_buf = buf;
        let msg = Message::unmarshal(&mut read_buf)?;

        if let Message::DataChannelOpen(dco) = msg {
            config.channel_type = dco.channel_type;
            config.priority = dco.priority;
            config.reliability_parameter = dco.reliability_parameter;
            config.label = String::from_utf8(dco.label)?;
            config.protocol = String::from_utf8(dco.protocol)?;
        } else {
            return Err(Error::InvalidMessageType(msg.message_type() as u8));
        };

        let mut data_channel = DataChannel::new(config, stream_id);
        data_channel.write_data_channel_ack()?;
        // the acknowledging side is usable as soon as the ack is on its way
        data_channel.state = DataChannelState::Open;

        Ok(data_channel)
    }

    /// Feeds one inbound SCTP message for this stream. User payloads are
    /// queued for the application; returns true when the channel just moved
    /// to open.
    pub fn handle_inbound(&mut self, ppi: PayloadProtocolIdentifier, buf: &[u8]) -> Result<bool> {
        match ppi {
            PayloadProtocolIdentifier::Dcep => {
                let mut read_buf = buf;
                self.handle_dcep(&mut read_buf)
            }
            PayloadProtocolIdentifier::String | PayloadProtocolIdentifier::Binary => {
                self.messages_received += 1;
                self.bytes_received += buf.len();
                self.read_outs.push_back(DataChannelMessage {
                    stream_id: self.stream_id,
                    ppi,
                    payload: BytesMut::from(buf),
                });
                Ok(false)
            }
            PayloadProtocolIdentifier::StringEmpty | PayloadProtocolIdentifier::BinaryEmpty => {
                self.messages_received += 1;
                self.read_outs.push_back(DataChannelMessage {
                    stream_id: self.stream_id,
                    ppi,
                    payload: BytesMut::new(),
                });
                Ok(false)
            }
            other => Err(Error::InvalidPayloadProtocolIdentifier(other as u8)),
        }
    }

    fn handle_dcep<B>(&mut self, data: &mut B) -> Result<bool>
    where
        B: Buf,
    {
        let msg = Message::unmarshal(data)?;

        match msg {
            Message::DataChannelOpen(_) => {
                // a well-behaved peer only sends OPEN once; answer it anyway
                debug!("stream {}: received DATA_CHANNEL_OPEN", self.stream_id);
                self.write_data_channel_ack()?;
                Ok(false)
            }
            Message::DataChannelAck(DataChannelAck) => {
                debug!("stream {}: received DATA_CHANNEL_ACK", self.stream_id);
                if self.state == DataChannelState::Connecting {
                    self.state = DataChannelState::Open;
                    return Ok(true);
                }
                Ok(false)
            }
        }
    }

    /// Queues one user message. Empty messages go out on the empty-message
    /// protocol identifiers with a single zero byte, per RFC 8831.
    pub fn send(&mut self, data: &[u8], is_string: bool) -> Result<()> {
        if self.state == DataChannelState::Closing || self.state == DataChannelState::Closed {
            return Err(Error::ErrDataChannelClosed);
        }

        let (ppi, payload) = match (is_string, data.is_empty()) {
            (true, false) => (PayloadProtocolIdentifier::String, BytesMut::from(data)),
            (true, true) => (
                PayloadProtocolIdentifier::StringEmpty,
                BytesMut::from(&[0u8][..]),
            ),
            (false, false) => (PayloadProtocolIdentifier::Binary, BytesMut::from(data)),
            (false, true) => (
                PayloadProtocolIdentifier::BinaryEmpty,
                BytesMut::from(&[0u8][..]),
            ),
        };

        self.messages_sent += 1;
        self.bytes_sent += data.len();
        self.write_outs.push_back(DataChannelMessage {
            stream_id: self.stream_id,
            ppi,
            payload,
        });
        Ok(())
    }

    /// Starts closing; the owner issues the SCTP stream reset.
    pub fn close(&mut self) {
        if self.state != DataChannelState::Closed {
            self.state = DataChannelState::Closing;
        }
    }

    /// Records completion of the outbound stream reset. Returns true when
    /// the channel just fully closed.
    pub fn on_outgoing_stream_reset(&mut self) -> bool {
        self.outgoing_reset_done = true;
        self.maybe_closed()
    }

    /// Records the peer's stream reset. Returns true when the channel just
    /// fully closed.
    pub fn on_incoming_stream_reset(&mut self) -> bool {
        self.incoming_reset_done = true;
        self.maybe_closed()
    }

    fn maybe_closed(&mut self) -> bool {
        if self.outgoing_reset_done
            && self.incoming_reset_done
            && self.state != DataChannelState::Closed
        {
            self.state = DataChannelState::Closed;
            true
        } else {
            false
        }
    }

    /// Next message to hand to the SCTP endpoint.
    pub fn poll_write(&mut self) -> Option<DataChannelMessage> {
        self.write_outs.pop_front()
    }

    /// Next inbound user message for the application.
    pub fn poll_read(&mut self) -> Option<DataChannelMessage> {
        self.read_outs.pop_front()
    }

    fn write_data_channel_ack(&mut self) -> Result<()> {
        let ack = Message::DataChannelAck(DataChannelAck).marshal()?;
        self.write_outs.push_back(DataChannelMessage {
            stream_id: self.stream_id,
            ppi: PayloadProtocolIdentifier::Dcep,
            payload: ack,
        });
        Ok(())
    }

    pub fn state(&self) -> DataChannelState {
        self.state
    }

    /// StreamIdentifier returns the stream id this channel is bound to.
    pub fn stream_identifier(&self) -> u16 {
        self.stream_id
    }

    pub fn config(&self) -> &DataChannelConfig {
        &self.config
    }

    /// MessagesSent returns the number of messages sent
    pub fn messages_sent(&self) -> usize {
        self.messages_sent
    }

    /// MessagesReceived returns the number of messages received
    pub fn messages_received(&self) -> usize {
        self.messages_received
    }

    /// BytesSent returns the number of user bytes sent
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// BytesReceived returns the number of user bytes received
    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }
}
