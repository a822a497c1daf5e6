pub mod ice_connection_state;
pub mod ice_gathering_state;
pub mod signaling_state;

pub use ice_connection_state::IceConnectionState;
pub use ice_gathering_state::IceGatheringState;
pub use signaling_state::SignalingState;
