use std::num::ParseIntError;
use std::string::FromUtf8Error;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //
    // wire codecs
    //
    #[error("buffer too short: expected {expected}, got {actual}")]
    UnexpectedEndOfBuffer { expected: usize, actual: usize },
    #[error("packet is too short")]
    ErrShortPacket,
    #[error("sctp: checksum mismatch")]
    ErrBadChecksum,
    #[error("sctp: chunk length exceeds remaining buffer")]
    ErrTruncatedChunk,
    #[error("vp8: descriptor promises a field it does not carry")]
    ErrTruncatedDescriptor,

    //
    // session description
    //
    #[error("sdp: invalid syntax: {0}")]
    ErrSdpInvalidSyntax(String),
    #[error("sdp: invalid value: {0}")]
    ErrSdpInvalidValue(String),
    #[error("sdp: payload type {0} lies in the forbidden range")]
    ErrForbiddenPayloadType(u8),
    #[error("sdp: no codec declared for payload type {0}")]
    ErrUnknownPayloadType(u8),

    //
    // signaling state machine
    //
    #[error("invalid signaling state transition: {0}")]
    ErrSignalingStateProposedTransitionInvalid(String),
    #[error("peer connection is closed")]
    ErrConnectionClosed,
    #[error("cannot create an offer with no media and no data channels")]
    ErrCreateOfferWithoutTransports,
    #[error("cannot create an answer in signaling state {0}")]
    ErrCreateAnswerInvalidState(String),
    #[error("track kind {0} is neither audio nor video")]
    ErrUnsupportedTrackKind(String),
    #[error("track already has a sender")]
    ErrTrackAlreadyAdded,
    #[error("no common codec for media section")]
    ErrNoCommonCodec,
    #[error("no transport with mid {0}")]
    ErrUnknownMid(String),
    #[error("remote media section carries no usable transport")]
    ErrNoUsableTransport,
    #[error("secured transport lost")]
    ErrSecuredTransportLost,

    //
    // data channels
    //
    #[error("invalid payload protocol identifier {0}")]
    InvalidPayloadProtocolIdentifier(u8),
    #[error("invalid DCEP message type {0}")]
    InvalidMessageType(u8),
    #[error("data channel is closed")]
    ErrDataChannelClosed,
    #[error("stream id {0} is already in use")]
    ErrStreamIdInUse(u16),

    #[error("parse int: {0}")]
    ParseInt(String),
    #[error("utf8: {0}")]
    Utf8(String),
    #[error("{0}")]
    Other(String),
}

impl From<ParseIntError> for Error {
    fn from(e: ParseIntError) -> Self {
        Error::ParseInt(e.to_string())
    }
}

impl From<FromUtf8Error> for Error {
    fn from(e: FromUtf8Error) -> Self {
        Error::Utf8(e.to_string())
    }
}
