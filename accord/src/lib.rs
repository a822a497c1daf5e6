#![warn(rust_2018_idioms)]

//! A sans-io, WebRTC-compatible peer endpoint.
//!
//! The [`PeerConnection`](peer_connection::PeerConnection) negotiates media
//! and data transport with a remote peer through offer/answer session
//! descriptions, frames media into RTP payloads and user data into SCTP
//! chunks, and measures delay-based bandwidth on the receiving side.
//!
//! All types are synchronous state machines: operations mutate state and
//! queue events and outbound datagrams, which the application drains and
//! bridges to its own sockets, connectivity checks and record encryption.

pub mod data_channel;
pub mod media;
pub mod peer_connection;
pub mod rtp_transceiver;

pub(crate) mod constants;

pub use peer_connection::{PeerConnection, PeerConnectionConfiguration};
