//! Transport harness above the two excluded providers.
//!
//! The connectivity provider (candidate gathering, checks) and the secured
//! channel provider (handshake, record protection) live outside this crate.
//! The harness holds their negotiated parameters, tracks readiness, and
//! queues datagrams in both directions so the peer connection never touches
//! a socket.

pub mod sctp;

use std::collections::VecDeque;

use sdp::candidate::IceCandidate;
use sdp::parameters::{DtlsFingerprint, DtlsParameters, DtlsRole, IceParameters};
use shared::error::{Error, Result};
use shared::transport::{TaggedBytesMut, Transport};
use shared::util::math_rand_alpha;

pub use self::sctp::SctpTransport;

/// Datagram path as negotiated with the connectivity provider.
#[derive(Debug)]
pub struct DatagramTransport {
    controlling: bool,
    local_parameters: IceParameters,
    remote_parameters: Option<IceParameters>,
    local_candidates: Vec<IceCandidate>,
    remote_candidates: Vec<IceCandidate>,
    local_candidates_complete: bool,
    remote_candidates_complete: bool,
    ready: bool,
    closed: bool,
    inbound: VecDeque<TaggedBytesMut>,
    outbound: VecDeque<TaggedBytesMut>,
}

impl DatagramTransport {
    fn new(controlling: bool) -> Self {
        Self {
            controlling,
            local_parameters: IceParameters {
                username_fragment: Some(math_rand_alpha(4)),
                password: Some(math_rand_alpha(22)),
                ice_lite: false,
            },
            remote_parameters: None,
            local_candidates: Vec::new(),
            remote_candidates: Vec::new(),
            local_candidates_complete: false,
            remote_candidates_complete: false,
            ready: false,
            closed: false,
            inbound: VecDeque::new(),
            outbound: VecDeque::new(),
        }
    }

    pub fn controlling(&self) -> bool {
        self.controlling
    }

    pub fn local_parameters(&self) -> &IceParameters {
        &self.local_parameters
    }

    pub fn local_candidates(&self) -> &[IceCandidate] {
        &self.local_candidates
    }

    pub fn local_candidates_complete(&self) -> bool {
        self.local_candidates_complete
    }

    pub fn add_local_candidate(&mut self, candidate: IceCandidate) {
        self.local_candidates.push(candidate);
    }

    pub fn end_of_local_candidates(&mut self) {
        self.local_candidates_complete = true;
    }

    pub fn set_remote_parameters(&mut self, parameters: IceParameters) {
        self.remote_parameters = Some(parameters);
    }

    pub fn add_remote_candidates(&mut self, candidates: &[IceCandidate], complete: bool) {
        self.remote_candidates.extend_from_slice(candidates);
        self.remote_candidates_complete |= complete;
    }

    /// Both candidate sets installed; connectivity checks may start.
    pub fn has_both_candidates(&self) -> bool {
        !self.local_candidates.is_empty() && !self.remote_candidates.is_empty()
    }

    /// The provider reported a usable pair.
    pub fn notify_ready(&mut self) {
        self.ready = true;
    }

    /// Queues an inbound datagram from the provider.
    pub fn push_inbound(&mut self, datagram: TaggedBytesMut) {
        if !self.closed {
            self.inbound.push_back(datagram);
        }
    }
}

impl Transport for DatagramTransport {
    fn send(&mut self, datagram: TaggedBytesMut) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.outbound.push_back(datagram);
        Ok(())
    }

    fn recv(&mut self) -> Option<TaggedBytesMut> {
        self.inbound.pop_front()
    }

    fn is_ready(&self) -> bool {
        self.ready && !self.closed
    }

    fn close(&mut self) {
        self.closed = true;
        self.ready = false;
        self.inbound.clear();
        self.outbound.clear();
    }
}

/// Secured channel above the datagram path.
///
/// Same send/recv surface plus the peer fingerprint learned during
/// negotiation and verified by the provider.
#[derive(Debug)]
pub struct SecuredTransport {
    role: DtlsRole,
    local_fingerprints: Vec<DtlsFingerprint>,
    remote_parameters: Option<DtlsParameters>,
    ready: bool,
    closed: bool,
    inbound: VecDeque<TaggedBytesMut>,
    outbound: VecDeque<TaggedBytesMut>,
}

impl SecuredTransport {
    fn new(role: DtlsRole, local_fingerprint: DtlsFingerprint) -> Self {
        Self {
            role,
            local_fingerprints: vec![local_fingerprint],
            remote_parameters: None,
            ready: false,
            closed: false,
            inbound: VecDeque::new(),
            outbound: VecDeque::new(),
        }
    }

    pub fn role(&self) -> DtlsRole {
        self.role
    }

    pub fn local_fingerprints(&self) -> &[DtlsFingerprint] {
        &self.local_fingerprints
    }

    /// Fingerprint of the peer certificate, once negotiated.
    pub fn peer_fingerprint(&self) -> Option<&DtlsFingerprint> {
        self.remote_parameters
            .as_ref()
            .and_then(|p| p.fingerprints.first())
    }

    pub fn set_remote_parameters(&mut self, parameters: DtlsParameters) {
        // an actpass peer leaves the choice to us; stay with our configured
        // role, otherwise take the complement
        match parameters.role {
            DtlsRole::Client => self.role = DtlsRole::Server,
            DtlsRole::Server => self.role = DtlsRole::Client,
            DtlsRole::Auto => {
                if self.role == DtlsRole::Auto {
                    self.role = DtlsRole::Client;
                }
            }
        }
        self.remote_parameters = Some(parameters);
    }

    pub fn notify_ready(&mut self) {
        self.ready = true;
    }

    pub fn push_inbound(&mut self, datagram: TaggedBytesMut) {
        if !self.closed {
            self.inbound.push_back(datagram);
        }
    }
}

impl Transport for SecuredTransport {
    fn send(&mut self, datagram: TaggedBytesMut) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.outbound.push_back(datagram);
        Ok(())
    }

    fn recv(&mut self) -> Option<TaggedBytesMut> {
        self.inbound.pop_front()
    }

    fn is_ready(&self) -> bool {
        self.ready && !self.closed
    }

    fn close(&mut self) {
        self.closed = true;
        self.ready = false;
        self.inbound.clear();
        self.outbound.clear();
    }
}

/// The datagram path and its secured channel, owned together.
#[derive(Debug)]
pub struct TransportPair {
    pub datagram: DatagramTransport,
    pub secured: SecuredTransport,
}

impl TransportPair {
    /// The controlling side offers `actpass` and lets the answerer pick its
    /// role; the controlled side goes active.
    pub fn new(controlling: bool, local_fingerprint: DtlsFingerprint) -> Self {
        let role = if controlling {
            DtlsRole::Auto
        } else {
            DtlsRole::Client
        };
        Self {
            datagram: DatagramTransport::new(controlling),
            secured: SecuredTransport::new(role, local_fingerprint),
        }
    }

    /// Both layers report usable.
    pub fn is_ready(&self) -> bool {
        self.datagram.is_ready() && self.secured.is_ready()
    }

    pub fn notify_ready(&mut self) {
        self.datagram.notify_ready();
        self.secured.notify_ready();
    }

    /// Tears the secured channel down before the path below it.
    pub fn close(&mut self) {
        self.secured.close();
        self.datagram.close();
    }

    /// Drains the next outbound datagram, secured traffic first.
    pub fn poll_outbound(&mut self) -> Option<TaggedBytesMut> {
        self.secured
            .outbound
            .pop_front()
            .or_else(|| self.datagram.outbound.pop_front())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fingerprint() -> DtlsFingerprint {
        DtlsFingerprint {
            algorithm: "sha-256".to_owned(),
            value: "AA:BB".to_owned(),
        }
    }

    #[test]
    fn test_roles() {
        let offerer = TransportPair::new(true, fingerprint());
        assert_eq!(offerer.secured.role(), DtlsRole::Auto);
        let answerer = TransportPair::new(false, fingerprint());
        assert_eq!(answerer.secured.role(), DtlsRole::Client);
    }

    #[test]
    fn test_role_resolution_against_remote() {
        // remote actpass: the answerer keeps its active preference
        let mut pair = TransportPair::new(false, fingerprint());
        pair.secured.set_remote_parameters(DtlsParameters {
            fingerprints: vec![fingerprint()],
            role: DtlsRole::Auto,
        });
        assert_eq!(pair.secured.role(), DtlsRole::Client);

        // remote goes active: we serve
        let mut pair = TransportPair::new(true, fingerprint());
        pair.secured.set_remote_parameters(DtlsParameters {
            fingerprints: vec![fingerprint()],
            role: DtlsRole::Client,
        });
        assert_eq!(pair.secured.role(), DtlsRole::Server);
        assert_eq!(pair.secured.peer_fingerprint(), Some(&fingerprint()));
    }

    #[test]
    fn test_readiness_and_close() {
        let mut pair = TransportPair::new(true, fingerprint());
        assert!(!pair.is_ready());
        pair.notify_ready();
        assert!(pair.is_ready());

        pair.secured
            .send(TaggedBytesMut {
                now: std::time::Instant::now(),
                transport: Default::default(),
                message: bytes::BytesMut::from(&b"x"[..]),
            })
            .unwrap();
        assert!(pair.poll_outbound().is_some());

        pair.close();
        assert!(!pair.is_ready());
        assert!(pair
            .secured
            .send(TaggedBytesMut {
                now: std::time::Instant::now(),
                transport: Default::default(),
                message: bytes::BytesMut::new(),
            })
            .is_err());
    }

    #[test]
    fn test_inbound_queue() {
        let mut pair = TransportPair::new(false, fingerprint());
        pair.datagram.push_inbound(TaggedBytesMut {
            now: std::time::Instant::now(),
            transport: Default::default(),
            message: bytes::BytesMut::from(&b"in"[..]),
        });
        let datagram = pair.datagram.recv().unwrap();
        assert_eq!(&datagram.message[..], b"in");
        assert!(pair.datagram.recv().is_none());

        // a closed transport drops inbound datagrams
        pair.close();
        pair.secured.push_inbound(TaggedBytesMut {
            now: std::time::Instant::now(),
            transport: Default::default(),
            message: bytes::BytesMut::new(),
        });
        assert!(pair.secured.recv().is_none());
    }

    #[test]
    fn test_candidate_bookkeeping() {
        let mut pair = TransportPair::new(true, fingerprint());
        assert!(!pair.datagram.has_both_candidates());

        pair.datagram.add_local_candidate(IceCandidate {
            foundation: "0".to_owned(),
            component: 1,
            protocol: "udp".to_owned(),
            priority: 1,
            ip: "10.0.0.1".to_owned(),
            port: 4000,
            typ: "host".to_owned(),
            ..Default::default()
        });
        pair.datagram
            .add_remote_candidates(&[IceCandidate::default()], true);
        assert!(pair.datagram.has_both_candidates());
        assert!(pair.datagram.remote_candidates_complete);
    }
}
