//! Peer registry: the single source of truth for who is joined.
//!
//! Maps connection id -> [`Peer`]. The registry owns no sockets;
//! removing an entry does not close anything. The multiplexer pairs
//! every removal with its own socket teardown, and inserts only after a
//! connection's identity frame has fully arrived, so the registry never
//! references a closed socket and never broadcasts to a half-registered
//! one.

use std::collections::{HashMap, hash_map::Entry};

use relaychat_proto::{Frame, ProtocolError};

use crate::error::RegistryError;

/// A registered, currently connected client.
///
/// Holds the identity frame exactly as it arrived so broadcasts re-send
/// it without re-encoding, plus the decoded display name for logging.
/// Both are immutable for the connection's lifetime - there is no
/// rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Identity frame (header + encoded display name), kept verbatim
    identity: Frame,
    /// Display name decoded once at registration
    name: String,
}

impl Peer {
    /// Build a peer from its identity frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidBody` if the display name is not valid
    ///   UTF-8 (the connection is refused registration)
    pub fn new(identity: Frame) -> Result<Self, ProtocolError> {
        let name = identity.text()?.to_owned();
        Ok(Self { identity, name })
    }

    /// The identity frame as originally received.
    #[must_use]
    pub fn identity(&self) -> &Frame {
        &self.identity
    }

    /// The registered display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Registry of active peers, keyed by connection id.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<u64, Peer>,
}

impl PeerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer under a connection id.
    ///
    /// # Errors
    ///
    /// - `RegistryError::AlreadyRegistered` if the id is present. Ids
    ///   are never reused, so this indicates a multiplexer bookkeeping
    ///   bug rather than a peer behavior.
    pub fn insert(&mut self, conn_id: u64, peer: Peer) -> Result<(), RegistryError> {
        match self.peers.entry(conn_id) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(conn_id)),
            Entry::Vacant(slot) => {
                slot.insert(peer);
                Ok(())
            },
        }
    }

    /// Remove and return a peer.
    ///
    /// # Errors
    ///
    /// - `RegistryError::NotFound` if the id is absent
    pub fn remove(&mut self, conn_id: u64) -> Result<Peer, RegistryError> {
        self.peers.remove(&conn_id).ok_or(RegistryError::NotFound(conn_id))
    }

    /// Look up a peer.
    ///
    /// # Errors
    ///
    /// - `RegistryError::NotFound` if the id is absent
    pub fn get(&self, conn_id: u64) -> Result<&Peer, RegistryError> {
        self.peers.get(&conn_id).ok_or(RegistryError::NotFound(conn_id))
    }

    /// Whether a connection id is registered.
    #[must_use]
    pub fn contains(&self, conn_id: u64) -> bool {
        self.peers.contains_key(&conn_id)
    }

    /// Every registered peer except `conn_id`, in unspecified order.
    ///
    /// Lazy, finite, and restartable; callers that need a stable
    /// snapshot (broadcast does) must materialize it themselves.
    pub fn all_except(&self, conn_id: u64) -> impl Iterator<Item = (u64, &Peer)> + '_ {
        self.peers.iter().filter(move |(id, _)| **id != conn_id).map(|(id, peer)| (*id, peer))
    }

    /// Number of registered peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no peers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
