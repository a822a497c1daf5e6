use std::fmt;

use shared::error::{Error, Result};

use crate::peer_connection::sdp::SdpKind;

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum StateChangeOp {
    #[default]
    SetLocal,
    SetRemote,
}

impl fmt::Display for StateChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StateChangeOp::SetLocal => write!(f, "SetLocal"),
            StateChangeOp::SetRemote => write!(f, "SetRemote"),
        }
    }
}

/// State of the offer/answer exchange, per the RFC 3264 model.
///
/// ```text
/// offerer:  stable -> (setLocal offer)  -> have-local-offer
///                  -> (setRemote answer) -> stable
/// answerer: stable -> (setRemote offer) -> have-remote-offer
///                  -> (setLocal answer)  -> stable
/// ```
///
/// Provisional answers pass through the pranswer states before the final
/// answer lands.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignalingState {
    /// No exchange in progress; the only state offers may start from.
    #[default]
    Stable,
    /// A local offer was applied, awaiting the remote answer.
    HaveLocalOffer,
    /// A remote offer was applied; a local answer is due.
    HaveRemoteOffer,
    /// A remote offer was answered provisionally.
    HaveLocalPranswer,
    /// A local offer was answered provisionally by the remote.
    HaveRemotePranswer,
    /// Closed for good.
    Closed,
}

const SIGNALING_STATE_STABLE_STR: &str = "stable";
const SIGNALING_STATE_HAVE_LOCAL_OFFER_STR: &str = "have-local-offer";
const SIGNALING_STATE_HAVE_REMOTE_OFFER_STR: &str = "have-remote-offer";
const SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR: &str = "have-local-pranswer";
const SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR: &str = "have-remote-pranswer";
const SIGNALING_STATE_CLOSED_STR: &str = "closed";

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            SignalingState::Stable => SIGNALING_STATE_STABLE_STR,
            SignalingState::HaveLocalOffer => SIGNALING_STATE_HAVE_LOCAL_OFFER_STR,
            SignalingState::HaveRemoteOffer => SIGNALING_STATE_HAVE_REMOTE_OFFER_STR,
            SignalingState::HaveLocalPranswer => SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR,
            SignalingState::HaveRemotePranswer => SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR,
            SignalingState::Closed => SIGNALING_STATE_CLOSED_STR,
        };
        write!(f, "{s}")
    }
}

impl From<&str> for SignalingState {
    fn from(raw: &str) -> Self {
        match raw {
            SIGNALING_STATE_HAVE_LOCAL_OFFER_STR => SignalingState::HaveLocalOffer,
            SIGNALING_STATE_HAVE_REMOTE_OFFER_STR => SignalingState::HaveRemoteOffer,
            SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR => SignalingState::HaveLocalPranswer,
            SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR => SignalingState::HaveRemotePranswer,
            SIGNALING_STATE_CLOSED_STR => SignalingState::Closed,
            _ => SignalingState::Stable,
        }
    }
}

/// Validates one transition of the signaling state machine.
pub(crate) fn check_next_signaling_state(
    cur: SignalingState,
    op: StateChangeOp,
    sdp_kind: SdpKind,
) -> Result<SignalingState> {
    match (cur, op, sdp_kind) {
        (SignalingState::Stable, StateChangeOp::SetLocal, SdpKind::Offer) => {
            Ok(SignalingState::HaveLocalOffer)
        }
        (SignalingState::Stable, StateChangeOp::SetRemote, SdpKind::Offer) => {
            Ok(SignalingState::HaveRemoteOffer)
        }
        // a repeated local offer stays put
        (SignalingState::HaveLocalOffer, StateChangeOp::SetLocal, SdpKind::Offer) => {
            Ok(SignalingState::HaveLocalOffer)
        }
        (SignalingState::HaveLocalOffer, StateChangeOp::SetRemote, SdpKind::Answer) => {
            Ok(SignalingState::Stable)
        }
        (SignalingState::HaveLocalOffer, StateChangeOp::SetRemote, SdpKind::Pranswer) => {
            Ok(SignalingState::HaveRemotePranswer)
        }
        (SignalingState::HaveRemotePranswer, StateChangeOp::SetRemote, SdpKind::Answer) => {
            Ok(SignalingState::Stable)
        }
        // a repeated remote offer stays put
        (SignalingState::HaveRemoteOffer, StateChangeOp::SetRemote, SdpKind::Offer) => {
            Ok(SignalingState::HaveRemoteOffer)
        }
        (SignalingState::HaveRemoteOffer, StateChangeOp::SetLocal, SdpKind::Answer) => {
            Ok(SignalingState::Stable)
        }
        (SignalingState::HaveRemoteOffer, StateChangeOp::SetLocal, SdpKind::Pranswer) => {
            Ok(SignalingState::HaveLocalPranswer)
        }
        (SignalingState::HaveLocalPranswer, StateChangeOp::SetLocal, SdpKind::Answer) => {
            Ok(SignalingState::Stable)
        }
        _ => Err(Error::ErrSignalingStateProposedTransitionInvalid(format!(
            "from {cur} applying {op} {sdp_kind}"
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_signaling_state_string() {
        let tests = vec![
            (SignalingState::Stable, "stable"),
            (SignalingState::HaveLocalOffer, "have-local-offer"),
            (SignalingState::HaveRemoteOffer, "have-remote-offer"),
            (SignalingState::HaveLocalPranswer, "have-local-pranswer"),
            (SignalingState::HaveRemotePranswer, "have-remote-pranswer"),
            (SignalingState::Closed, "closed"),
        ];

        for (state, expected_string) in tests {
            assert_eq!(state.to_string(), expected_string);
            assert_eq!(SignalingState::from(expected_string), state);
        }
    }

    #[test]
    fn test_signaling_state_transitions() {
        let tests = vec![
            (
                "stable->SetLocal(offer)->have-local-offer",
                SignalingState::Stable,
                StateChangeOp::SetLocal,
                SdpKind::Offer,
                Some(SignalingState::HaveLocalOffer),
            ),
            (
                "stable->SetRemote(offer)->have-remote-offer",
                SignalingState::Stable,
                StateChangeOp::SetRemote,
                SdpKind::Offer,
                Some(SignalingState::HaveRemoteOffer),
            ),
            (
                "have-local-offer->SetRemote(answer)->stable",
                SignalingState::HaveLocalOffer,
                StateChangeOp::SetRemote,
                SdpKind::Answer,
                Some(SignalingState::Stable),
            ),
            (
                "have-local-offer->SetRemote(pranswer)->have-remote-pranswer",
                SignalingState::HaveLocalOffer,
                StateChangeOp::SetRemote,
                SdpKind::Pranswer,
                Some(SignalingState::HaveRemotePranswer),
            ),
            (
                "have-remote-pranswer->SetRemote(answer)->stable",
                SignalingState::HaveRemotePranswer,
                StateChangeOp::SetRemote,
                SdpKind::Answer,
                Some(SignalingState::Stable),
            ),
            (
                "have-remote-offer->SetLocal(answer)->stable",
                SignalingState::HaveRemoteOffer,
                StateChangeOp::SetLocal,
                SdpKind::Answer,
                Some(SignalingState::Stable),
            ),
            (
                "have-remote-offer->SetLocal(pranswer)->have-local-pranswer",
                SignalingState::HaveRemoteOffer,
                StateChangeOp::SetLocal,
                SdpKind::Pranswer,
                Some(SignalingState::HaveLocalPranswer),
            ),
            (
                "have-local-pranswer->SetLocal(answer)->stable",
                SignalingState::HaveLocalPranswer,
                StateChangeOp::SetLocal,
                SdpKind::Answer,
                Some(SignalingState::Stable),
            ),
            (
                "(invalid) stable->SetLocal(answer)",
                SignalingState::Stable,
                StateChangeOp::SetLocal,
                SdpKind::Answer,
                None,
            ),
            (
                "(invalid) stable->SetRemote(pranswer)",
                SignalingState::Stable,
                StateChangeOp::SetRemote,
                SdpKind::Pranswer,
                None,
            ),
            (
                "(invalid) have-local-offer->SetRemote(offer)",
                SignalingState::HaveLocalOffer,
                StateChangeOp::SetRemote,
                SdpKind::Offer,
                None,
            ),
            (
                "(invalid) closed->SetLocal(offer)",
                SignalingState::Closed,
                StateChangeOp::SetLocal,
                SdpKind::Offer,
                None,
            ),
        ];

        for (desc, cur, op, kind, expected) in tests {
            let result = check_next_signaling_state(cur, op, kind);
            match expected {
                Some(next) => assert_eq!(result, Ok(next), "{desc}"),
                None => assert!(result.is_err(), "{desc}: expected an error"),
            }
        }
    }
}
