use crate::peer_connection::state::{IceConnectionState, IceGatheringState, SignalingState};
use crate::rtp_transceiver::MediaKind;

/// First inbound configuration of a media section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    /// Index of the transceiver now carrying the remote track
    pub transceiver: usize,
    pub kind: MediaKind,
    /// WebRTC track id resolved from the remote description, if present
    pub track_id: Option<String>,
}

/// Events drained from the peer connection, in transition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerConnectionEvent {
    SignalingStateChange(SignalingState),
    IceConnectionStateChange(IceConnectionState),
    IceGatheringStateChange(IceGatheringState),
    /// A remote track was configured for the first time
    Track(TrackEvent),
    /// A peer-initiated data channel opened
    DataChannel(u16),
}
