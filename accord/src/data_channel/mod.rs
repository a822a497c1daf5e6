//! Ownership and identifier management for the connection's data channels.

use std::collections::BTreeMap;

use log::{debug, warn};

use datachannel::{DataChannel, DataChannelConfig, DataChannelMessage};
use sctp::PayloadProtocolIdentifier;
use sdp::parameters::DtlsRole;
use shared::error::{Error, Result};

/// Outcome of feeding inbound stream data through the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataChannelNotice {
    /// A locally opened channel finished its handshake
    Opened(u16),
    /// The peer opened a new channel
    Incoming(u16),
}

/// Owns the channels of one SCTP association, keyed by stream id.
///
/// Identifier parity follows RFC 8832: the side acting as secured-channel
/// client takes even ids, the server odd ones; before the role is resolved
/// the controlling side assumes even. Opens are serialized through the
/// ordered map, so two local channels can never race for one id.
#[derive(Default, Debug)]
pub struct DataChannelManager {
    channels: BTreeMap<u16, DataChannel>,
}

impl DataChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a locally initiated channel and returns its stream id.
    pub fn create_channel(
        &mut self,
        label: &str,
        protocol: &str,
        role: DtlsRole,
        controlling: bool,
    ) -> Result<u16> {
        let even = match role {
            DtlsRole::Client => true,
            DtlsRole::Server => false,
            DtlsRole::Auto => controlling,
        };

        let mut stream_id: u16 = if even { 0 } else { 1 };
        while self.channels.contains_key(&stream_id) {
            stream_id = stream_id
                .checked_add(2)
                .ok_or(Error::ErrStreamIdInUse(stream_id))?;
        }

        let config = DataChannelConfig {
            label: label.to_owned(),
            protocol: protocol.to_owned(),
            ..Default::default()
        };
        let channel = DataChannel::dial(config, stream_id)?;
        debug!("data channel {stream_id} ({label}) dialing");
        self.channels.insert(stream_id, channel);
        Ok(stream_id)
    }

    /// Routes one inbound SCTP user message to its channel, accepting a new
    /// channel when the peer opens a stream.
    pub fn handle_data(
        &mut self,
        stream_id: u16,
        ppi: PayloadProtocolIdentifier,
        data: &[u8],
    ) -> Result<Option<DataChannelNotice>> {
        if let Some(channel) = self.channels.get_mut(&stream_id) {
            let opened = channel.handle_inbound(ppi, data)?;
            return Ok(opened.then_some(DataChannelNotice::Opened(stream_id)));
        }

        if ppi == PayloadProtocolIdentifier::Dcep {
            let channel = DataChannel::accept(DataChannelConfig::default(), stream_id, ppi, data)?;
            debug!(
                "data channel {stream_id} ({}) accepted",
                channel.config().label
            );
            self.channels.insert(stream_id, channel);
            return Ok(Some(DataChannelNotice::Incoming(stream_id)));
        }

        warn!("user data for unknown stream {stream_id} dropped");
        Ok(None)
    }

    pub fn get(&self, stream_id: u16) -> Option<&DataChannel> {
        self.channels.get(&stream_id)
    }

    pub fn get_mut(&mut self, stream_id: u16) -> Option<&mut DataChannel> {
        self.channels.get_mut(&stream_id)
    }

    /// Drains every channel's pending writes, lowest stream id first.
    pub fn poll_writes(&mut self) -> Vec<DataChannelMessage> {
        let mut messages = Vec::new();
        for channel in self.channels.values_mut() {
            while let Some(message) = channel.poll_write() {
                messages.push(message);
            }
        }
        messages
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
