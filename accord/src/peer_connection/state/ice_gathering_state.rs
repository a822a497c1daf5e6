use std::fmt;

/// Progress of local candidate gathering.
///
/// Gathering itself happens in the connectivity provider; the application
/// feeds candidates in through
/// [`add_local_candidate`](crate::PeerConnection::add_local_candidate) and
/// marks the end with
/// [`end_of_local_candidates`](crate::PeerConnection::end_of_local_candidates).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum IceGatheringState {
    #[default]
    New,
    Gathering,
    Complete,
}

impl fmt::Display for IceGatheringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            IceGatheringState::New => "new",
            IceGatheringState::Gathering => "gathering",
            IceGatheringState::Complete => "complete",
        };
        write!(f, "{s}")
    }
}
