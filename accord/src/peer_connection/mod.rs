//! The peer connection state machine.

pub mod event;
pub mod sdp;
pub mod state;
pub mod transport;

use std::collections::VecDeque;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use log::{debug, warn};
use rand::Rng;

use ::sdp::candidate::IceCandidate;
use ::sdp::parameters::{
    DtlsFingerprint, FmtpParameter, FmtpValue, GroupDescription, HeaderExtensionParameters,
    RtcpFeedback, RtpCodecParameters, SsrcDescription,
};
use ::sdp::{MediaDescription, SessionDescription};
use shared::error::{Error, Result};
use shared::marshal::{Marshal, Unmarshal};
use shared::transport::{TaggedBytesMut, Transport};
use shared::util::{classify, math_rand_alpha, Demux};

use crate::constants::{
    ABS_SEND_TIME_URI, SCTP_DEFAULT_PORT, SCTP_MAX_MESSAGE_SIZE, SSRC_AUDIO_LEVEL_URI,
};
use crate::data_channel::{DataChannelManager, DataChannelNotice};
use crate::media::{AudioFrame, Codec};
use crate::rtp_transceiver::{abs_send_time, MediaKind, MediaTrack, RtpTransceiver};

use self::event::{PeerConnectionEvent, TrackEvent};
use self::sdp::{SdpKind, SessionDescriptionInit};
use self::state::signaling_state::{check_next_signaling_state, StateChangeOp};
use self::state::{IceConnectionState, IceGatheringState, SignalingState};
use self::transport::sctp::SctpInbound;
use self::transport::{SctpTransport, TransportPair};

/// Static configuration of a connection.
///
/// The certificate fingerprint comes from the secured-transport provider;
/// the default generates a stand-in so tests and examples run without one.
#[derive(Debug, Clone)]
pub struct PeerConnectionConfiguration {
    pub fingerprint: DtlsFingerprint,
}

impl Default for PeerConnectionConfiguration {
    fn default() -> Self {
        let mut rng = rand::thread_rng();
        let value = (0..32)
            .map(|_| format!("{:02X}", rng.gen::<u8>()))
            .collect::<Vec<_>>()
            .join(":");
        Self {
            fingerprint: DtlsFingerprint {
                algorithm: "sha-256".to_owned(),
                value,
            },
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TransportRef {
    Transceiver(usize),
    Sctp,
}

/// A WebRTC-compatible connection between the local and a remote peer.
///
/// Sans-io: every operation is synchronous; events, outbound datagrams and
/// inbound media pile up in queues the application drains. The excluded
/// transport providers surface through
/// [`add_local_candidate`](Self::add_local_candidate),
/// [`on_transport_connected`](Self::on_transport_connected) and the
/// per-transport datagram queues.
pub struct PeerConnection {
    configuration: PeerConnectionConfiguration,

    signaling_state: SignalingState,
    ice_connection_state: IceConnectionState,
    ice_gathering_state: IceGatheringState,
    is_closed: bool,

    transceivers: Vec<RtpTransceiver>,
    sctp: Option<SctpTransport>,
    data_channels: DataChannelManager,
    creation_order: Vec<TransportRef>,

    local_description_kind: Option<SdpKind>,
    remote_description: Option<SessionDescriptionInit>,

    cname: String,
    session_id: u64,
    events: VecDeque<PeerConnectionEvent>,
    parse_error_count: u64,
}

impl Default for PeerConnection {
    fn default() -> Self {
        Self::new(PeerConnectionConfiguration::default())
    }
}

impl PeerConnection {
    pub fn new(configuration: PeerConnectionConfiguration) -> Self {
        Self {
            configuration,
            signaling_state: SignalingState::Stable,
            ice_connection_state: IceConnectionState::New,
            ice_gathering_state: IceGatheringState::New,
            is_closed: false,
            transceivers: Vec::new(),
            sctp: None,
            data_channels: DataChannelManager::new(),
            creation_order: Vec::new(),
            local_description_kind: None,
            remote_description: None,
            cname: math_rand_alpha(16),
            session_id: ::sdp::util::new_session_id(),
            events: VecDeque::new(),
            parse_error_count: 0,
        }
    }

    pub fn signaling_state(&self) -> SignalingState {
        self.signaling_state
    }

    pub fn ice_connection_state(&self) -> IceConnectionState {
        self.ice_connection_state
    }

    pub fn ice_gathering_state(&self) -> IceGatheringState {
        self.ice_gathering_state
    }

    /// Count of inbound datagrams dropped as unparseable.
    pub fn parse_error_count(&self) -> u64 {
        self.parse_error_count
    }

    /// Next queued event, in the order the transitions occurred.
    pub fn poll_event(&mut self) -> Option<PeerConnectionEvent> {
        self.events.pop_front()
    }

    pub fn transceiver(&self, index: usize) -> Option<&RtpTransceiver> {
        self.transceivers.get(index)
    }

    pub fn transceiver_mut(&mut self, index: usize) -> Option<&mut RtpTransceiver> {
        self.transceivers.get_mut(index)
    }

    pub fn transceivers(&self) -> &[RtpTransceiver] {
        &self.transceivers
    }

    /// Adds an outbound media track; returns the index of the transceiver
    /// now carrying it.
    pub fn add_track(&mut self, track: MediaTrack) -> Result<usize> {
        self.assert_not_closed()?;

        for transceiver in &self.transceivers {
            if transceiver.sender.track.as_ref().map(|t| &t.id) == Some(&track.id) {
                return Err(Error::ErrTrackAlreadyAdded);
            }
        }

        for (index, transceiver) in self.transceivers.iter_mut().enumerate() {
            if transceiver.kind == track.kind && transceiver.sender.track.is_none() {
                transceiver.sender.track = Some(track);
                return Ok(index);
            }
        }

        Ok(self.create_transceiver(track.kind, true, Some(track)))
    }

    fn create_transceiver(
        &mut self,
        kind: MediaKind,
        controlling: bool,
        track: Option<MediaTrack>,
    ) -> usize {
        let transceiver = RtpTransceiver::new(
            kind,
            controlling,
            self.configuration.fingerprint.clone(),
            track,
            supported_codecs(kind),
            supported_header_extensions(kind),
        );
        self.transceivers.push(transceiver);
        let index = self.transceivers.len() - 1;
        self.creation_order.push(TransportRef::Transceiver(index));
        index
    }

    fn ensure_sctp(&mut self, controlling: bool) {
        if self.sctp.is_none() {
            self.sctp = Some(SctpTransport::new(
                controlling,
                self.configuration.fingerprint.clone(),
            ));
            self.creation_order.push(TransportRef::Sctp);
        }
    }

    /// Opens a data channel, creating the SCTP transport on first use.
    pub fn create_data_channel(&mut self, label: &str, protocol: &str) -> Result<u16> {
        self.assert_not_closed()?;
        self.ensure_sctp(true);
        let sctp = self.sctp.as_ref().unwrap();
        let role = sctp.transport.secured.role();
        let controlling = sctp.transport.datagram.controlling();

        let stream_id = self
            .data_channels
            .create_channel(label, protocol, role, controlling)?;
        self.flush_data_channels()?;
        Ok(stream_id)
    }

    /// Queues one message on an open data channel.
    pub fn send_data(&mut self, stream_id: u16, data: &[u8], is_string: bool) -> Result<()> {
        self.assert_not_closed()?;
        let channel = self
            .data_channels
            .get_mut(stream_id)
            .ok_or(Error::ErrDataChannelClosed)?;
        channel.send(data, is_string)?;
        self.flush_data_channels()
    }

    /// Starts closing a data channel via an SCTP stream reset.
    pub fn close_data_channel(&mut self, stream_id: u16) -> Result<()> {
        self.assert_not_closed()?;
        let channel = self
            .data_channels
            .get_mut(stream_id)
            .ok_or(Error::ErrDataChannelClosed)?;
        channel.close();

        if let Some(sctp) = &mut self.sctp {
            let raw = sctp.frame_stream_reset(&[stream_id])?;
            sctp.transport.secured.send(tagged(raw))?;
        }
        Ok(())
    }

    pub fn data_channel(&self, stream_id: u16) -> Option<&datachannel::DataChannel> {
        self.data_channels.get(stream_id)
    }

    pub fn data_channel_mut(&mut self, stream_id: u16) -> Option<&mut datachannel::DataChannel> {
        self.data_channels.get_mut(stream_id)
    }

    /// Builds an offer describing the current transceivers and data
    /// transport.
    pub fn create_offer(&mut self) -> Result<SessionDescriptionInit> {
        self.assert_not_closed()?;
        if self.transceivers.is_empty() && self.sctp.is_none() {
            return Err(Error::ErrCreateOfferWithoutTransports);
        }

        self.ensure_mids();
        Ok(SessionDescriptionInit::offer(
            self.build_session_description().to_string(),
        ))
    }

    /// Builds an answer mirroring the applied remote offer.
    pub fn create_answer(&mut self) -> Result<SessionDescriptionInit> {
        self.assert_not_closed()?;
        if self.signaling_state != SignalingState::HaveRemoteOffer
            && self.signaling_state != SignalingState::HaveLocalPranswer
        {
            return Err(Error::ErrCreateAnswerInvalidState(
                self.signaling_state.to_string(),
            ));
        }

        self.ensure_mids();
        Ok(SessionDescriptionInit::answer(
            self.build_session_description().to_string(),
        ))
    }

    /// Applies a local description, starting candidate gathering.
    pub fn set_local_description(&mut self, description: &SessionDescriptionInit) -> Result<()> {
        self.assert_not_closed()?;
        let next = check_next_signaling_state(
            self.signaling_state,
            StateChangeOp::SetLocal,
            description.kind,
        )?;
        self.set_signaling_state(next);
        self.local_description_kind = Some(description.kind);

        if self.ice_gathering_state == IceGatheringState::New {
            self.set_ice_gathering_state(IceGatheringState::Gathering);
        }

        self.maybe_start_connecting();
        Ok(())
    }

    /// Applies a remote description, configuring transceivers and
    /// transports.
    pub fn set_remote_description(&mut self, description: &SessionDescriptionInit) -> Result<()> {
        self.assert_not_closed()?;
        let next = check_next_signaling_state(
            self.signaling_state,
            StateChangeOp::SetRemote,
            description.kind,
        )?;

        // a malformed description aborts before any state changes
        let parsed = description.parse()?;

        for media in &parsed.media {
            match media.kind.as_str() {
                "audio" | "video" => {
                    let kind = MediaKind::try_from(media.kind.as_str())?;
                    let index = self.select_transceiver(kind, media);
                    self.apply_remote_media(index, media, &parsed)?;
                }
                "application" => {
                    self.ensure_sctp(false);
                    self.apply_remote_application(media)?;
                }
                other => {
                    debug!("ignoring media section of kind {other}");
                }
            }
        }

        self.set_signaling_state(next);
        self.remote_description = Some(description.clone());
        self.maybe_start_connecting();
        Ok(())
    }

    /// The local description, re-rendered so it carries all candidates
    /// gathered so far.
    pub fn local_description(&mut self) -> Option<SessionDescriptionInit> {
        let kind = self.local_description_kind?;
        let sdp = self.build_session_description().to_string();
        Some(SessionDescriptionInit { kind, sdp })
    }

    pub fn remote_description(&self) -> Option<&SessionDescriptionInit> {
        self.remote_description.as_ref()
    }

    /// Feeds one candidate gathered by the connectivity provider.
    pub fn add_local_candidate(&mut self, mid: &str, candidate: IceCandidate) -> Result<()> {
        self.assert_not_closed()?;
        let pair = self
            .pair_by_mid_mut(mid)
            .ok_or_else(|| Error::ErrUnknownMid(mid.to_owned()))?;
        pair.datagram.add_local_candidate(candidate);
        self.maybe_start_connecting();
        Ok(())
    }

    /// Marks local gathering finished on every transport.
    pub fn end_of_local_candidates(&mut self) -> Result<()> {
        self.assert_not_closed()?;
        for transceiver in &mut self.transceivers {
            transceiver.transport.datagram.end_of_local_candidates();
        }
        if let Some(sctp) = &mut self.sctp {
            sctp.transport.datagram.end_of_local_candidates();
        }
        if self.ice_gathering_state != IceGatheringState::Complete {
            self.set_ice_gathering_state(IceGatheringState::Complete);
        }
        Ok(())
    }

    /// The provider reports one transport's path and secured channel up.
    pub fn on_transport_connected(&mut self, mid: &str) -> Result<()> {
        self.assert_not_closed()?;
        let pair = self
            .pair_by_mid_mut(mid)
            .ok_or_else(|| Error::ErrUnknownMid(mid.to_owned()))?;
        pair.notify_ready();

        if self.ice_connection_state != IceConnectionState::Completed && self.all_transports_ready()
        {
            self.set_ice_connection_state(IceConnectionState::Completed);
        }
        self.flush_data_channels()
    }

    /// The provider reports the secured transport lost. Terminal: the
    /// application decides whether to re-offer over a fresh connection.
    pub fn on_transport_failed(&mut self, mid: &str) -> Result<()> {
        let pair = self
            .pair_by_mid_mut(mid)
            .ok_or_else(|| Error::ErrUnknownMid(mid.to_owned()))?;
        pair.close();
        warn!("secured transport on mid {mid} lost");
        if self.ice_connection_state != IceConnectionState::Closed {
            self.set_ice_connection_state(IceConnectionState::Closed);
        }
        Ok(())
    }

    /// Terminates the connection, tearing transports down in reverse
    /// creation order. Queued work is discarded, not flushed.
    pub fn close(&mut self) {
        if self.is_closed {
            return;
        }
        self.is_closed = true;
        self.set_signaling_state(SignalingState::Closed);

        for reference in self.creation_order.clone().into_iter().rev() {
            match reference {
                TransportRef::Transceiver(index) => {
                    if let Some(transceiver) = self.transceivers.get_mut(index) {
                        transceiver.transport.close();
                    }
                }
                TransportRef::Sctp => {
                    if let Some(sctp) = &mut self.sctp {
                        sctp.transport.close();
                    }
                }
            }
        }

        if self.ice_connection_state != IceConnectionState::Closed {
            self.set_ice_connection_state(IceConnectionState::Closed);
        }
    }

    /// Encodes one raw audio frame and queues its RTP packets.
    pub fn send_audio_frame(&mut self, transceiver: usize, frame: &AudioFrame) -> Result<()> {
        self.assert_not_closed()?;
        let t = self
            .transceivers
            .get_mut(transceiver)
            .ok_or_else(|| Error::Other(format!("no transceiver {transceiver}")))?;
        let codec = t.sender.codec.as_mut().ok_or(Error::ErrNoCommonCodec)?;
        let (payloads, duration) = codec.encode(frame)?;
        Self::write_payloads(t, payloads, duration)
    }

    /// Packetizes one pre-compressed frame and queues its RTP packets.
    pub fn send_encoded_frame(&mut self, transceiver: usize, frame: &Bytes) -> Result<()> {
        self.assert_not_closed()?;
        let t = self
            .transceivers
            .get_mut(transceiver)
            .ok_or_else(|| Error::Other(format!("no transceiver {transceiver}")))?;
        let codec = t.sender.codec.as_mut().ok_or(Error::ErrNoCommonCodec)?;
        let (payloads, duration) = codec.pack(frame)?;
        Self::write_payloads(t, payloads, duration)
    }

    fn write_payloads(t: &mut RtpTransceiver, payloads: Vec<Bytes>, duration: u32) -> Result<()> {
        let timestamp = t.sender.timestamp;
        t.sender.timestamp = shared::serial::uint32_add(timestamp, duration);
        let payload_type = t.sender.payload_type.ok_or(Error::ErrNoCommonCodec)?;

        let count = payloads.len();
        for (i, payload) in payloads.into_iter().enumerate() {
            let packet = rtp::Packet {
                header: rtp::Header {
                    marker: t.kind == MediaKind::Video && i + 1 == count,
                    payload_type,
                    sequence_number: t.sender.sequencer.next_sequence_number(),
                    timestamp,
                    ssrc: t.sender.ssrc,
                    ..Default::default()
                },
                payload,
            };
            let raw = packet.marshal()?;
            t.transport.secured.send(tagged(raw.to_vec()))?;
        }
        Ok(())
    }

    /// Routes one decrypted datagram from a media transport by its first
    /// byte, per RFC 7983.
    pub fn handle_datagram(&mut self, mid: &str, raw: &[u8], arrival_time_ms: i64) -> Result<()> {
        match classify(raw) {
            Demux::Rtp => self.handle_rtp(mid, raw, arrival_time_ms),
            Demux::Rtcp => {
                // control traffic is acknowledged but not interpreted here
                debug!("ignoring rtcp datagram on mid {mid}");
                Ok(())
            }
            Demux::Stun | Demux::Dtls => {
                // handshake classes never reach this layer; the providers
                // consume them
                self.parse_error_count += 1;
                warn!("dropping handshake-class datagram on mid {mid}");
                Ok(())
            }
            Demux::Unknown => {
                self.parse_error_count += 1;
                warn!("dropping unclassifiable datagram on mid {mid}");
                Ok(())
            }
        }
    }

    /// Feeds one RTP datagram received on a transport. Unparseable
    /// datagrams are dropped and counted.
    pub fn handle_rtp(&mut self, mid: &str, raw: &[u8], arrival_time_ms: i64) -> Result<()> {
        self.assert_not_closed()?;

        let mut buf = raw;
        let packet = match rtp::Packet::unmarshal(&mut buf) {
            Ok(packet) => packet,
            Err(e) => {
                self.parse_error_count += 1;
                warn!("dropping unparseable rtp datagram: {e}");
                return Ok(());
            }
        };

        let index = self
            .transceivers
            .iter()
            .position(|t| t.mid.as_deref() == Some(mid))
            .or_else(|| {
                self.transceivers
                    .iter()
                    .position(|t| t.receiver.ssrcs.contains(&packet.header.ssrc))
            });
        let Some(index) = index else {
            self.parse_error_count += 1;
            warn!("dropping rtp datagram for unknown mid {mid}");
            return Ok(());
        };

        let t = &mut self.transceivers[index];

        // the congestion side-channel
        if let Some(id) = t.abs_send_time_id {
            if let Some(send_time) = abs_send_time(&packet.header, id) {
                let (estimate, _ssrcs) =
                    t.estimator
                        .incoming(send_time, arrival_time_ms, raw.len(), packet.header.ssrc);
                t.last_bandwidth_estimate = Some(estimate);
                if let Some(codec) = t.sender.codec.as_mut() {
                    codec.set_target_bitrate(estimate);
                }
            }
        }

        if !t.receiver.ssrcs.contains(&packet.header.ssrc) {
            t.receiver.ssrcs.push(packet.header.ssrc);
        }
        t.receiver.packets_received += 1;
        t.receiver.bytes_received += raw.len() as u64;
        t.receiver.packets.push_back(packet);
        Ok(())
    }

    /// Feeds one plaintext SCTP datagram from the secured transport.
    /// Unparseable datagrams are dropped and counted.
    pub fn handle_sctp(&mut self, raw: &[u8]) -> Result<()> {
        self.assert_not_closed()?;
        let Some(sctp) = &mut self.sctp else {
            return Ok(());
        };

        let (inbound, responses) = match sctp.handle_packet(raw) {
            Ok(result) => result,
            Err(e) => {
                self.parse_error_count += 1;
                warn!("dropping unparseable sctp datagram: {e}");
                return Ok(());
            }
        };
        for response in responses {
            sctp.transport.secured.send(tagged(response))?;
        }

        for item in inbound {
            match item {
                SctpInbound::Data {
                    stream_id,
                    ppi,
                    payload,
                } => match self.data_channels.handle_data(stream_id, ppi, &payload) {
                    Ok(Some(DataChannelNotice::Incoming(id))) => {
                        self.events.push_back(PeerConnectionEvent::DataChannel(id));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.parse_error_count += 1;
                        warn!("dropping data-channel message: {e}");
                    }
                },
                SctpInbound::IncomingStreamReset(stream_ids) => {
                    self.handle_incoming_stream_reset(&stream_ids)?;
                }
                SctpInbound::OutgoingResetComplete(stream_ids) => {
                    for stream_id in stream_ids {
                        if let Some(channel) = self.data_channels.get_mut(stream_id) {
                            channel.on_outgoing_stream_reset();
                        }
                    }
                }
            }
        }

        self.flush_data_channels()
    }

    fn handle_incoming_stream_reset(&mut self, stream_ids: &[u16]) -> Result<()> {
        for stream_id in stream_ids {
            let Some(channel) = self.data_channels.get_mut(*stream_id) else {
                continue;
            };
            let was_closing = channel.state() == datachannel::DataChannelState::Closing;
            channel.on_incoming_stream_reset();
            if !was_closing {
                // the peer started the close; answer with our own reset
                channel.close();
                if let Some(sctp) = &mut self.sctp {
                    let raw = sctp.frame_stream_reset(&[*stream_id])?;
                    sctp.transport.secured.send(tagged(raw))?;
                }
            }
        }
        Ok(())
    }

    /// Next outbound datagram, tagged with the mid of its transport.
    pub fn poll_outbound(&mut self) -> Option<(String, TaggedBytesMut)> {
        for transceiver in &mut self.transceivers {
            if let Some(datagram) = transceiver.transport.poll_outbound() {
                return Some((transceiver.mid.clone().unwrap_or_default(), datagram));
            }
        }
        if let Some(sctp) = &mut self.sctp {
            if let Some(datagram) = sctp.transport.poll_outbound() {
                return Some((sctp.mid.clone().unwrap_or_default(), datagram));
            }
        }
        None
    }

    //
    // internals
    //

    fn assert_not_closed(&self) -> Result<()> {
        if self.is_closed {
            Err(Error::ErrConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn set_signaling_state(&mut self, state: SignalingState) {
        if self.signaling_state != state {
            self.signaling_state = state;
            self.events
                .push_back(PeerConnectionEvent::SignalingStateChange(state));
        }
    }

    fn set_ice_connection_state(&mut self, state: IceConnectionState) {
        self.ice_connection_state = state;
        self.events
            .push_back(PeerConnectionEvent::IceConnectionStateChange(state));
    }

    fn set_ice_gathering_state(&mut self, state: IceGatheringState) {
        self.ice_gathering_state = state;
        self.events
            .push_back(PeerConnectionEvent::IceGatheringStateChange(state));
    }

    fn ensure_mids(&mut self) {
        for (position, reference) in self.creation_order.clone().into_iter().enumerate() {
            let mid = position.to_string();
            match reference {
                TransportRef::Transceiver(index) => {
                    let transceiver = &mut self.transceivers[index];
                    if transceiver.mid.is_none() {
                        transceiver.mid = Some(mid);
                    }
                }
                TransportRef::Sctp => {
                    if let Some(sctp) = &mut self.sctp {
                        if sctp.mid.is_none() {
                            sctp.mid = Some(mid);
                        }
                    }
                }
            }
        }
    }

    fn pair_by_mid_mut(&mut self, mid: &str) -> Option<&mut TransportPair> {
        for transceiver in &mut self.transceivers {
            if transceiver.mid.as_deref() == Some(mid) {
                return Some(&mut transceiver.transport);
            }
        }
        if let Some(sctp) = &mut self.sctp {
            if sctp.mid.as_deref() == Some(mid) {
                return Some(&mut sctp.transport);
            }
        }
        None
    }

    fn all_transports_ready(&self) -> bool {
        let mut any = false;
        for transceiver in &self.transceivers {
            any = true;
            if !transceiver.transport.is_ready() {
                return false;
            }
        }
        if let Some(sctp) = &self.sctp {
            any = true;
            if !sctp.transport.is_ready() {
                return false;
            }
        }
        any
    }

    fn maybe_start_connecting(&mut self) {
        if self.ice_connection_state != IceConnectionState::New {
            return;
        }

        let mut any = false;
        for transceiver in &self.transceivers {
            any = true;
            if !transceiver.transport.datagram.has_both_candidates() {
                return;
            }
        }
        if let Some(sctp) = &self.sctp {
            any = true;
            if !sctp.transport.datagram.has_both_candidates() {
                return;
            }
        }
        if any {
            self.set_ice_connection_state(IceConnectionState::Checking);
        }
    }

    /// Picks the transceiver a remote media section lands on: the one
    /// already bound to its mid, else the first of the right kind without
    /// remote parameters, else a fresh one.
    fn select_transceiver(&mut self, kind: MediaKind, media: &MediaDescription) -> usize {
        if !media.rtp.mux_id.is_empty() {
            if let Some(index) = self
                .transceivers
                .iter()
                .position(|t| t.mid.as_deref() == Some(media.rtp.mux_id.as_str()))
            {
                return index;
            }
        }
        if let Some(index) = self
            .transceivers
            .iter()
            .position(|t| t.kind == kind && t.remote_parameters.is_none())
        {
            return index;
        }
        self.create_transceiver(kind, false, None)
    }

    fn apply_remote_media(
        &mut self,
        index: usize,
        media: &MediaDescription,
        session: &SessionDescription,
    ) -> Result<()> {
        let track_id = session.webrtc_track_id(media);
        let first_configuration = self.transceivers[index].remote_parameters.is_none();
        let t = &mut self.transceivers[index];

        if t.mid.is_none() && !media.rtp.mux_id.is_empty() {
            t.mid = Some(media.rtp.mux_id.clone());
        }

        // transport parameters; a section with no DTLS block is unusable
        let dtls = media.dtls.as_ref().ok_or(Error::ErrNoUsableTransport)?;
        t.transport.secured.set_remote_parameters(dtls.clone());
        t.transport.datagram.set_remote_parameters(media.ice.clone());
        t.transport
            .datagram
            .add_remote_candidates(&media.ice_candidates, media.ice_candidates_complete);

        // codec matching: keep the intersection, adopting the remote
        // payload types so the answer mirrors the offer
        let common: Vec<RtpCodecParameters> = media
            .rtp
            .codecs
            .iter()
            .filter(|remote| {
                t.codecs
                    .iter()
                    .any(|local| local.name().eq_ignore_ascii_case(remote.name()))
            })
            .cloned()
            .collect();
        if common.is_empty() {
            return Err(Error::ErrNoCommonCodec);
        }
        t.sender.payload_type = Some(common[0].payload_type);
        t.sender.codec = Codec::for_parameters(&common[0]);
        t.codecs = common;

        // header extensions: adopt the remote ids for the uris we support
        let supported = supported_header_extensions(t.kind);
        t.header_extensions = media
            .rtp
            .header_extensions
            .iter()
            .filter(|remote| supported.iter().any(|local| local.uri == remote.uri))
            .cloned()
            .collect();
        t.abs_send_time_id = t
            .header_extensions
            .iter()
            .find(|ext| ext.uri == ABS_SEND_TIME_URI)
            .map(|ext| ext.id);

        for ssrc_info in &media.ssrc {
            if !t.receiver.ssrcs.contains(&ssrc_info.ssrc) {
                t.receiver.ssrcs.push(ssrc_info.ssrc);
            }
        }

        t.remote_parameters = Some(media.rtp.clone());

        let remote_sends = media
            .direction
            .map(|d| {
                matches!(
                    d,
                    ::sdp::direction::Direction::Sendrecv | ::sdp::direction::Direction::Sendonly
                )
            })
            .unwrap_or(true);
        if first_configuration && remote_sends {
            let kind = t.kind;
            self.events.push_back(PeerConnectionEvent::Track(TrackEvent {
                transceiver: index,
                kind,
                track_id,
            }));
        }
        Ok(())
    }

    fn apply_remote_application(&mut self, media: &MediaDescription) -> Result<()> {
        let sctp = self.sctp.as_mut().unwrap();

        let dtls = media.dtls.as_ref().ok_or(Error::ErrNoUsableTransport)?;
        sctp.transport.secured.set_remote_parameters(dtls.clone());
        sctp.transport
            .datagram
            .set_remote_parameters(media.ice.clone());
        sctp.transport
            .datagram
            .add_remote_candidates(&media.ice_candidates, media.ice_candidates_complete);

        if sctp.mid.is_none() && !media.rtp.mux_id.is_empty() {
            sctp.mid = Some(media.rtp.mux_id.clone());
        }
        sctp.configure_remote(media);
        Ok(())
    }

    /// Drains channel writes into framed SCTP packets once the secured
    /// transport is up.
    fn flush_data_channels(&mut self) -> Result<()> {
        let Some(sctp) = &mut self.sctp else {
            return Ok(());
        };
        if !sctp.transport.secured.is_ready() {
            return Ok(());
        }
        for message in self.data_channels.poll_writes() {
            let raw = sctp.frame_message(&message)?;
            sctp.transport.secured.send(tagged(raw))?;
        }
        Ok(())
    }

    fn build_session_description(&self) -> SessionDescription {
        let mut session = SessionDescription {
            origin: format!("- {} 2 IN IP4 0.0.0.0", self.session_id),
            ..Default::default()
        };

        let mut mids = Vec::new();
        for reference in &self.creation_order {
            match reference {
                TransportRef::Transceiver(index) => {
                    let transceiver = &self.transceivers[*index];
                    if let Some(mid) = &transceiver.mid {
                        mids.push(mid.clone());
                    }
                    session.media.push(self.build_media(transceiver));
                }
                TransportRef::Sctp => {
                    if let Some(sctp) = &self.sctp {
                        if let Some(mid) = &sctp.mid {
                            mids.push(mid.clone());
                        }
                        session.media.push(self.build_application(sctp));
                    }
                }
            }
        }

        if !mids.is_empty() {
            session.group.push(GroupDescription {
                semantic: "BUNDLE".to_owned(),
                items: mids,
            });
        }
        session.msid_semantic.push(GroupDescription {
            semantic: "WMS".to_owned(),
            items: vec!["*".to_owned()],
        });
        session
    }

    fn build_media(&self, transceiver: &RtpTransceiver) -> MediaDescription {
        let fmt = transceiver
            .codecs
            .iter()
            .map(|c| c.payload_type.to_string())
            .collect();
        let mut media =
            MediaDescription::new(transceiver.kind.to_string(), 9, "UDP/TLS/RTP/SAVPF", fmt);
        media.host = Some("0.0.0.0".to_owned());
        media.direction = Some(transceiver.direction());
        media.rtp.mux_id = transceiver.mid.clone().unwrap_or_default();
        media.rtp.codecs = transceiver.codecs.clone();
        media.rtp.header_extensions = transceiver.header_extensions.clone();
        media.rtcp_port = Some(9);
        media.rtcp_host = Some("0.0.0.0".to_owned());
        media.rtcp_mux = true;

        if let Some(track) = &transceiver.sender.track {
            media.msid = Some(format!("accord {}", track.id));
            media.ssrc.push(SsrcDescription {
                cname: Some(self.cname.clone()),
                label: Some(track.id.clone()),
                ..SsrcDescription::new(transceiver.sender.ssrc)
            });
        }

        self.fill_transport_attributes(&mut media, &transceiver.transport);
        media
    }

    fn build_application(&self, sctp: &SctpTransport) -> MediaDescription {
        let mut media = MediaDescription::new(
            "application",
            9,
            "UDP/DTLS/SCTP",
            vec!["webrtc-datachannel".to_owned()],
        );
        media.host = Some("0.0.0.0".to_owned());
        media.rtp.mux_id = sctp.mid.clone().unwrap_or_default();
        media.sctp_port = Some(SCTP_DEFAULT_PORT);
        media.sctp_capabilities = Some(::sdp::parameters::SctpCapabilities {
            max_message_size: SCTP_MAX_MESSAGE_SIZE,
        });

        self.fill_transport_attributes(&mut media, &sctp.transport);
        media
    }

    fn fill_transport_attributes(&self, media: &mut MediaDescription, pair: &TransportPair) {
        media.ice = pair.datagram.local_parameters().clone();
        media.ice_candidates = pair.datagram.local_candidates().to_vec();
        media.ice_candidates_complete = pair.datagram.local_candidates_complete();
        media.dtls = Some(::sdp::parameters::DtlsParameters {
            fingerprints: pair.secured.local_fingerprints().to_vec(),
            role: pair.secured.role(),
        });
    }
}

fn tagged(raw: Vec<u8>) -> TaggedBytesMut {
    TaggedBytesMut {
        now: Instant::now(),
        transport: Default::default(),
        message: BytesMut::from(&raw[..]),
    }
}

fn supported_codecs(kind: MediaKind) -> Vec<RtpCodecParameters> {
    match kind {
        MediaKind::Audio => vec![
            RtpCodecParameters {
                mime_type: "audio/opus".to_owned(),
                clock_rate: 48000,
                channels: Some(2),
                payload_type: 111,
                parameters: vec![
                    FmtpParameter {
                        key: "minptime".to_owned(),
                        value: Some(FmtpValue::Integer(10)),
                    },
                    FmtpParameter {
                        key: "useinbandfec".to_owned(),
                        value: Some(FmtpValue::Integer(1)),
                    },
                ],
                rtcp_feedback: vec![],
            },
            RtpCodecParameters {
                mime_type: "audio/PCMU".to_owned(),
                clock_rate: 8000,
                channels: Some(1),
                payload_type: 0,
                parameters: vec![],
                rtcp_feedback: vec![],
            },
            RtpCodecParameters {
                mime_type: "audio/PCMA".to_owned(),
                clock_rate: 8000,
                channels: Some(1),
                payload_type: 8,
                parameters: vec![],
                rtcp_feedback: vec![],
            },
        ],
        MediaKind::Video => vec![RtpCodecParameters {
            mime_type: "video/VP8".to_owned(),
            clock_rate: 90000,
            channels: None,
            payload_type: 97,
            parameters: vec![],
            rtcp_feedback: vec![
                RtcpFeedback {
                    typ: "nack".to_owned(),
                    parameter: None,
                },
                RtcpFeedback {
                    typ: "nack".to_owned(),
                    parameter: Some("pli".to_owned()),
                },
                RtcpFeedback {
                    typ: "goog-remb".to_owned(),
                    parameter: None,
                },
            ],
        }],
    }
}

fn supported_header_extensions(kind: MediaKind) -> Vec<HeaderExtensionParameters> {
    let mut extensions = Vec::new();
    if kind == MediaKind::Audio {
        extensions.push(HeaderExtensionParameters {
            id: 1,
            uri: SSRC_AUDIO_LEVEL_URI.to_owned(),
            direction: None,
        });
    }
    extensions.push(HeaderExtensionParameters {
        id: 2,
        uri: ABS_SEND_TIME_URI.to_owned(),
        direction: None,
    });
    extensions
}
