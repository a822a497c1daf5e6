use std::fmt;

/// Connectivity of the transports backing the connection.
///
/// The peer connection advances `New -> Checking` once every transport has
/// both candidate sets installed, and `Checking -> Completed` when every
/// transport reports its path and secured channel usable. `Closed` is
/// terminal, reached through [`close`](crate::PeerConnection::close) or the
/// loss of a secured transport.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum IceConnectionState {
    #[default]
    New,
    Checking,
    Completed,
    Closed,
}

impl fmt::Display for IceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            IceConnectionState::New => "new",
            IceConnectionState::Checking => "checking",
            IceConnectionState::Completed => "completed",
            IceConnectionState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}
