//! Relay driver.
//!
//! Ties together the connection state machines, the [`PeerRegistry`],
//! and broadcast routing. The runtime feeds events in and executes the
//! returned actions; all relay bookkeeping happens inside
//! [`RelayDriver::process_event`].
//!
//! Error containment: framing anomalies and registry misuse are
//! converted into close actions for the affected connection. Nothing a
//! single peer does can make `process_event` poison the process.

use std::collections::HashMap;

use bytes::Bytes;

use relaychat_proto::Frame;

use crate::{
    broadcast::route,
    connection::{Connection, ConnectionState},
    error::RelayError,
    registry::{Peer, PeerRegistry},
};

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximum concurrent connections; excess accepts are closed
    pub max_connections: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { max_connections: 10_000 }
    }
}

/// Events the relay driver processes.
///
/// Produced by the external runtime (production transport or tests).
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// A new connection was accepted
    ConnectionAccepted {
        /// Connection id allocated by the runtime
        conn_id: u64,
    },

    /// A complete frame was received from a connection
    FrameReceived {
        /// Connection that sent the frame
        conn_id: u64,
        /// The received frame
        frame: Frame,
    },

    /// A connection was closed (by the peer, a transport error, or an
    /// exceptional socket condition)
    ConnectionClosed {
        /// Connection that was closed
        conn_id: u64,
        /// Reason for closure
        reason: String,
    },
}

/// Actions the relay driver produces.
///
/// Executed by runtime-specific code.
#[derive(Debug, Clone)]
pub enum RelayAction {
    /// Send raw bytes to a connection's socket
    SendToConn {
        /// Target connection
        conn_id: u64,
        /// Pre-framed wire bytes
        bytes: Bytes,
    },

    /// Close a connection's socket
    CloseConnection {
        /// Connection to close
        conn_id: u64,
        /// Reason for closure
        reason: String,
    },

    /// Emit a log line
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
    },
}

/// Log levels for relay actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Event-driven relay orchestrator.
///
/// Owns the per-connection state machines and the peer registry. The
/// registry contains exactly the `Active` connections: entries are
/// inserted only when an identity frame has fully arrived and removed
/// the moment a closure is processed, so a broadcast can never target a
/// closed or half-registered socket.
#[derive(Debug, Default)]
pub struct RelayDriver {
    /// Connection state machines (conn id -> lifecycle state)
    connections: HashMap<u64, Connection>,
    /// Active peers eligible for broadcast
    registry: PeerRegistry,
    /// Relay configuration
    config: RelayConfig,
    /// Messages relayed since startup
    frames_relayed: u64,
}

impl RelayDriver {
    /// Create a driver with the given configuration.
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self {
            connections: HashMap::new(),
            registry: PeerRegistry::new(),
            config,
            frames_relayed: 0,
        }
    }

    /// Process one event and return the actions to execute.
    ///
    /// # Errors
    ///
    /// - `RelayError::UnknownConnection` if a frame arrives for a
    ///   connection the driver is not tracking. The runtime logs this
    ///   and stops reading from that socket.
    pub fn process_event(&mut self, event: RelayEvent) -> Result<Vec<RelayAction>, RelayError> {
        match event {
            RelayEvent::ConnectionAccepted { conn_id } => Ok(self.handle_accepted(conn_id)),
            RelayEvent::FrameReceived { conn_id, frame } => self.handle_frame(conn_id, frame),
            RelayEvent::ConnectionClosed { conn_id, reason } => {
                Ok(self.handle_closed(conn_id, &reason))
            },
        }
    }

    fn handle_accepted(&mut self, conn_id: u64) -> Vec<RelayAction> {
        if self.connections.len() >= self.config.max_connections {
            return vec![
                RelayAction::CloseConnection {
                    conn_id,
                    reason: "max connections exceeded".to_string(),
                },
                RelayAction::Log {
                    level: LogLevel::Warn,
                    message: format!(
                        "connection {conn_id} rejected: at limit of {}",
                        self.config.max_connections
                    ),
                },
            ];
        }

        let replaced = self.connections.insert(conn_id, Connection::new());
        debug_assert!(replaced.is_none(), "connection ids are never reused");

        vec![RelayAction::Log {
            level: LogLevel::Debug,
            message: format!("connection {conn_id} accepted, awaiting registration"),
        }]
    }

    fn handle_frame(
        &mut self,
        conn_id: u64,
        frame: Frame,
    ) -> Result<Vec<RelayAction>, RelayError> {
        let state = self
            .connections
            .get(&conn_id)
            .map(Connection::state)
            .ok_or(RelayError::UnknownConnection(conn_id))?;

        match state {
            ConnectionState::PendingRegistration => Ok(self.handle_registration(conn_id, frame)),
            ConnectionState::Active => Ok(self.handle_chat_message(conn_id, &frame)),
            ConnectionState::Closed => Ok(vec![RelayAction::Log {
                level: LogLevel::Warn,
                message: format!("discarding frame from closed connection {conn_id}"),
            }]),
        }
    }

    /// First frame on a pending connection: the identity frame.
    fn handle_registration(&mut self, conn_id: u64, identity: Frame) -> Vec<RelayAction> {
        let peer = match Peer::new(identity) {
            Ok(peer) => peer,
            Err(err) => {
                return self.drop_connection(conn_id, &format!("invalid display name: {err}"));
            },
        };

        let name = peer.name().to_owned();

        if let Err(err) = self.registry.insert(conn_id, peer) {
            // Bookkeeping drifted; contain it to this connection.
            let mut actions =
                self.drop_connection(conn_id, "registry rejected registration");
            actions.push(RelayAction::Log {
                level: LogLevel::Error,
                message: format!("registry insert failed for connection {conn_id}: {err}"),
            });
            return actions;
        }

        match self.connections.get_mut(&conn_id).map(Connection::register) {
            Some(Ok(())) => {},
            _ => {
                // Undone immediately: the state machine refused the
                // transition the registry already recorded.
                let _ = self.registry.remove(conn_id);
                return self.drop_connection(conn_id, "registration state mismatch");
            },
        }

        vec![RelayAction::Log {
            level: LogLevel::Info,
            message: format!("peer {name:?} joined on connection {conn_id} ({} online)",
                self.registry.len()),
        }]
    }

    /// Steady-state frame on an active connection: relay it.
    fn handle_chat_message(&mut self, conn_id: u64, message: &Frame) -> Vec<RelayAction> {
        // Every relayed body must decode as text; an undecodable body
        // is a framing anomaly and drops the sender.
        if let Err(err) = message.text() {
            return self.drop_connection(conn_id, &format!("undecodable message: {err}"));
        }

        let peer = match self.registry.get(conn_id) {
            Ok(peer) => peer,
            Err(err) => {
                let mut actions = self.drop_connection(conn_id, "not registered");
                actions.push(RelayAction::Log {
                    level: LogLevel::Error,
                    message: format!("active connection {conn_id} missing from registry: {err}"),
                });
                return actions;
            },
        };

        let mut actions = route(conn_id, &self.registry, peer.identity(), message);
        self.frames_relayed += 1;
        actions.push(RelayAction::Log {
            level: LogLevel::Debug,
            message: format!(
                "relayed {} body bytes from {:?} to {} peers",
                message.body_len(),
                peer.name(),
                actions.len(),
            ),
        });

        actions
    }

    fn handle_closed(&mut self, conn_id: u64, reason: &str) -> Vec<RelayAction> {
        let Some(mut conn) = self.connections.remove(&conn_id) else {
            // Already discarded (e.g. rejected at the connection limit).
            return Vec::new();
        };

        let was_active = conn.is_active();
        conn.close();

        if !was_active {
            return vec![RelayAction::Log {
                level: LogLevel::Debug,
                message: format!("connection {conn_id} closed before registering: {reason}"),
            }];
        }

        match self.registry.remove(conn_id) {
            Ok(peer) => vec![RelayAction::Log {
                level: LogLevel::Info,
                message: format!(
                    "peer {:?} left ({reason}), {} online",
                    peer.name(),
                    self.registry.len()
                ),
            }],
            Err(err) => vec![RelayAction::Log {
                level: LogLevel::Error,
                message: format!("active connection {conn_id} missing from registry: {err}"),
            }],
        }
    }

    /// Tear down a connection after a per-connection anomaly: forget
    /// its state, unregister it if present, and ask the runtime to
    /// close the socket. Registry removal and socket closure always
    /// travel together.
    fn drop_connection(&mut self, conn_id: u64, reason: &str) -> Vec<RelayAction> {
        if let Some(mut conn) = self.connections.remove(&conn_id) {
            conn.close();
        }

        if self.registry.contains(conn_id) {
            let _ = self.registry.remove(conn_id);
        }

        vec![
            RelayAction::CloseConnection { conn_id, reason: reason.to_string() },
            RelayAction::Log {
                level: LogLevel::Warn,
                message: format!("dropping connection {conn_id}: {reason}"),
            },
        ]
    }

    /// Number of tracked connections (pending and active).
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of registered peers.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.registry.len()
    }

    /// Messages relayed since startup, counted per inbound frame.
    #[must_use]
    pub fn frames_relayed(&self) -> u64 {
        self.frames_relayed
    }

    /// The peer registry (active peers only).
    #[must_use]
    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }
}
