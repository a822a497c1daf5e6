use bytes::BytesMut;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Instant;

use crate::error::Result;

/// Addressing information attached to every datagram crossing the harness.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportContext {
    /// Local socket address, either IPv4 or IPv6
    pub local_addr: SocketAddr,
    /// Peer socket address, either IPv4 or IPv6
    pub peer_addr: SocketAddr,
}

impl Default for TransportContext {
    fn default() -> Self {
        Self {
            local_addr: SocketAddr::from_str("0.0.0.0:0").unwrap(),
            peer_addr: SocketAddr::from_str("0.0.0.0:0").unwrap(),
        }
    }
}

/// A generic transmit with [TransportContext]
#[derive(Debug, Clone)]
pub struct TransportMessage<T> {
    /// Received/Sent time
    pub now: Instant,
    /// Addressing for the message
    pub transport: TransportContext,
    /// Message body with generic type
    pub message: T,
}

/// BytesMut type transmit with [TransportContext]
pub type TaggedBytesMut = TransportMessage<BytesMut>;

/// Uniform send/recv surface over the two excluded transport providers.
///
/// Both the plain datagram transport (connectivity provider) and the secured
/// channel above it expose the same semantics: queue a datagram out, poll a
/// datagram in, report readiness. The peer connection never touches sockets
/// or handshakes; the application bridges these calls to its providers.
pub trait Transport {
    /// Queues one datagram for the wire. Fails once the transport is detached.
    fn send(&mut self, datagram: TaggedBytesMut) -> Result<()>;

    /// Takes the next datagram received from the wire, if any.
    fn recv(&mut self) -> Option<TaggedBytesMut>;

    /// True once the provider has signaled the path usable.
    fn is_ready(&self) -> bool;

    /// Detaches the transport; queued datagrams are dropped.
    fn close(&mut self);
}
