//! Relaychat production server.
//!
//! Production "glue" wrapping [`relaychat_core`]'s action-based relay
//! logic with real I/O: a Tokio TCP accept loop, per-connection read
//! tasks, and an executor for the driver's actions.
//!
//! # Architecture
//!
//! The [`relaychat_core::RelayDriver`] is sans-IO; this crate feeds it
//! events and executes its actions. All driver access goes through one
//! `tokio::sync::Mutex`, so relay bookkeeping remains a single logical
//! control thread even though socket I/O is spread across tasks.
//!
//! Reads are readiness-driven: each connection task waits for its
//! socket to become readable, then performs a non-blocking read into
//! the exact byte range its [`FrameReader`] asks for. A `WouldBlock`
//! after a readiness notification is not an error - the read is retried
//! on the next notification. Every other transport error takes the same
//! path as stream closure, for that connection only.
//!
//! Writes go through per-connection writer halves held in a shared
//! table. Broadcast deliveries are independent per destination; a
//! destination whose send fails is torn down eagerly via the driver's
//! closed transition and never blocks delivery to the rest.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod transport;

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

pub use error::ServerError;
use relaychat_core::{
    FrameReader, LogLevel, ReadProgress, RelayAction, RelayConfig, RelayDriver, RelayEvent,
};
use relaychat_proto::Frame;
use tokio::{
    io::AsyncWriteExt,
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
    sync::{Mutex, RwLock},
};
pub use transport::TcpTransport;

/// Shared state for all connections.
///
/// Holds the writer halves for message routing. The reader halves stay
/// owned by their connection tasks.
struct SharedState {
    /// Connection id -> outbound writer half. All sends to a client go
    /// through this single writer, preserving per-sender ordering.
    writers: RwLock<HashMap<u64, Mutex<OwnedWriteHalf>>>,
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g. "0.0.0.0:1234")
    pub bind_address: String,
    /// Relay driver configuration (connection limits)
    pub relay: RelayConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:1234".to_string(), relay: RelayConfig::default() }
    }
}

/// Cheap cloneable view into a running server's relay state.
///
/// Useful for health checks and tests that need to observe when a
/// registration or disconnect has landed.
#[derive(Clone)]
pub struct ServerHandle {
    driver: Arc<Mutex<RelayDriver>>,
}

impl ServerHandle {
    /// Number of registered peers.
    pub async fn peer_count(&self) -> usize {
        self.driver.lock().await.peer_count()
    }

    /// Number of tracked connections (pending and active).
    pub async fn connection_count(&self) -> usize {
        self.driver.lock().await.connection_count()
    }

    /// Messages relayed since startup.
    pub async fn frames_relayed(&self) -> u64 {
        self.driver.lock().await.frames_relayed()
    }
}

/// Production relaychat server.
///
/// Wraps [`RelayDriver`] with TCP transport and a Tokio runtime.
pub struct Server {
    /// The action-based relay driver
    driver: Arc<Mutex<RelayDriver>>,
    /// Listening TCP transport
    transport: TcpTransport,
    /// Writer table shared with connection tasks
    shared: Arc<SharedState>,
    /// Monotonic connection id allocator; ids are never reused
    next_conn_id: AtomicU64,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` / `ServerError::Transport` on bind or
    ///   listen failure - fatal at startup
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let driver = RelayDriver::new(config.relay);
        let transport = TcpTransport::bind(&config.bind_address)?;

        Ok(Self {
            driver: Arc::new(Mutex::new(driver)),
            transport,
            shared: Arc::new(SharedState { writers: RwLock::new(HashMap::new()) }),
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    /// Observer handle into the relay state.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle { driver: Arc::clone(&self.driver) }
    }

    /// Run the server, accepting connections and relaying frames.
    ///
    /// Runs until the process is shut down. Per-connection failures are
    /// contained; only the accept loop itself lives here.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("relay listening on {}", self.transport.local_addr()?);

        loop {
            match self.transport.accept().await {
                Ok((stream, peer_addr)) => {
                    let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
                    let driver = Arc::clone(&self.driver);
                    let shared = Arc::clone(&self.shared);

                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, peer_addr, conn_id, driver, shared).await
                        {
                            tracing::warn!("connection {} error: {}", conn_id, e);
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("accept error: {}", e);
                },
            }
        }
    }
}

/// Outcome of reading one frame from a connection.
enum FrameRead {
    /// A complete frame was assembled
    Frame(Frame),
    /// The peer closed the stream
    Closed {
        /// Closure happened inside a frame rather than at a boundary
        mid_frame: bool,
    },
}

/// Result of one readiness-gated receive attempt.
///
/// `WouldBlock` means the readiness notification was spurious; the read
/// is retried on the next notification, never surfaced as an error.
enum SocketRead {
    /// Bytes were delivered into the pending range
    Data(usize),
    /// Zero-byte read: the peer closed the stream
    Closed,
    /// Socket not actually readable yet
    WouldBlock,
    /// Unrecoverable transport error
    Error(std::io::Error),
}

/// Handle a single client connection for its whole lifetime.
async fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    conn_id: u64,
    driver: Arc<Mutex<RelayDriver>>,
    shared: Arc<SharedState>,
) -> Result<(), ServerError> {
    tracing::debug!("connection {} from {}", conn_id, peer_addr);

    let (read_half, write_half) = stream.into_split();

    {
        let mut writers = shared.writers.write().await;
        writers.insert(conn_id, Mutex::new(write_half));
    }

    let actions = {
        let mut driver = driver.lock().await;
        driver.process_event(RelayEvent::ConnectionAccepted { conn_id })?
    };
    let closed = execute_actions(actions, &shared).await;
    if reap_closed(conn_id, closed, &driver, &shared).await {
        // Rejected at the connection limit; both halves drop here.
        return Ok(());
    }

    let mut reader = FrameReader::new();

    let close_reason = loop {
        match next_frame(&read_half, &mut reader).await {
            Ok(FrameRead::Frame(frame)) => {
                let result = {
                    let mut driver = driver.lock().await;
                    driver.process_event(RelayEvent::FrameReceived { conn_id, frame })
                };

                let actions = match result {
                    Ok(actions) => actions,
                    Err(e) => {
                        tracing::warn!("frame processing error on {}: {}", conn_id, e);
                        break "driver rejected frame".to_string();
                    },
                };

                let closed = execute_actions(actions, &shared).await;
                if reap_closed(conn_id, closed, &driver, &shared).await {
                    // The driver already forgot this connection.
                    return Ok(());
                }
            },
            Ok(FrameRead::Closed { mid_frame }) => {
                break if mid_frame {
                    "stream closed mid-frame".to_string()
                } else {
                    "peer closed the stream".to_string()
                };
            },
            Err(e) => {
                tracing::debug!("read error on {}: {}", conn_id, e);
                break e.to_string();
            },
        }
    };

    disconnect(conn_id, close_reason, &driver, &shared).await;

    Ok(())
}

/// Read exactly one frame, accumulating across partial receives.
///
/// One readiness notification admits at most one frame; any following
/// frame's bytes stay buffered in the transport because the read never
/// extends past what [`FrameReader::pending`] asks for.
async fn next_frame(
    read_half: &OwnedReadHalf,
    reader: &mut FrameReader,
) -> Result<FrameRead, ServerError> {
    loop {
        read_half
            .readable()
            .await
            .map_err(|e| ServerError::Transport(format!("readiness wait failed: {e}")))?;

        let outcome = match read_half.try_read(reader.pending()) {
            Ok(0) => SocketRead::Closed,
            Ok(n) => SocketRead::Data(n),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => SocketRead::WouldBlock,
            Err(e) => SocketRead::Error(e),
        };

        match outcome {
            SocketRead::Data(n) => {
                match reader.advance(n).map_err(|e| ServerError::Protocol(e.to_string()))? {
                    ReadProgress::Frame(frame) => return Ok(FrameRead::Frame(frame)),
                    ReadProgress::NeedMore => {},
                    ReadProgress::Closed { mid_frame } => {
                        return Ok(FrameRead::Closed { mid_frame });
                    },
                }
            },
            SocketRead::Closed => match reader.advance(0) {
                Ok(ReadProgress::Closed { mid_frame }) => {
                    return Ok(FrameRead::Closed { mid_frame });
                },
                _ => return Ok(FrameRead::Closed { mid_frame: false }),
            },
            SocketRead::WouldBlock => {
                // Spurious readiness; retry on the next notification.
            },
            SocketRead::Error(e) => {
                // Same path as closure, scoped to this connection.
                return Err(ServerError::Transport(e.to_string()));
            },
        }
    }
}

/// Execute relay actions against the writer table.
///
/// Returns the connections the executor now considers dead: explicit
/// close actions plus destinations whose send failed. Each delivery is
/// independent, so one dead destination never prevents the rest.
async fn execute_actions(
    actions: Vec<RelayAction>,
    shared: &SharedState,
) -> Vec<(u64, String)> {
    let mut closed = Vec::new();

    for action in actions {
        match action {
            RelayAction::SendToConn { conn_id, bytes } => {
                let writers = shared.writers.read().await;
                match writers.get(&conn_id) {
                    Some(writer) => {
                        let mut writer = writer.lock().await;
                        if let Err(e) = writer.write_all(&bytes).await {
                            tracing::warn!("send to connection {} failed: {}", conn_id, e);
                            closed.push((conn_id, format!("send failed: {e}")));
                        }
                    },
                    None => {
                        tracing::warn!("send to unknown connection {}", conn_id);
                    },
                }
            },

            RelayAction::CloseConnection { conn_id, reason } => {
                tracing::info!("closing connection {}: {}", conn_id, reason);
                closed.push((conn_id, reason));
            },

            RelayAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }

    closed
}

/// Tear down connections reported dead by the executor.
///
/// Drops their writer halves and runs the driver's closed transition so
/// the registry stays consistent. Returns true if `own_id` itself was
/// among the dead (the caller's read loop must stop).
async fn reap_closed(
    own_id: u64,
    closed: Vec<(u64, String)>,
    driver: &Arc<Mutex<RelayDriver>>,
    shared: &Arc<SharedState>,
) -> bool {
    let mut own_closed = false;

    for (conn_id, reason) in closed {
        if conn_id == own_id {
            own_closed = true;
            // The driver dropped this connection when it emitted the
            // close action; only the writer half is left to remove.
            let mut writers = shared.writers.write().await;
            writers.remove(&conn_id);
        } else {
            disconnect(conn_id, reason, driver, shared).await;
        }
    }

    own_closed
}

/// Remove a connection's writer and feed its closed transition through
/// the driver. Registry removal and socket teardown always pair up.
async fn disconnect(
    conn_id: u64,
    reason: String,
    driver: &Arc<Mutex<RelayDriver>>,
    shared: &Arc<SharedState>,
) {
    {
        let mut writers = shared.writers.write().await;
        writers.remove(&conn_id);
    }

    let result = {
        let mut driver = driver.lock().await;
        driver.process_event(RelayEvent::ConnectionClosed { conn_id, reason })
    };

    match result {
        // Closed transitions only produce logs; nothing further can
        // fail here.
        Ok(actions) => {
            let _ = execute_actions(actions, shared).await;
        },
        Err(e) => {
            tracing::warn!("close processing error on {}: {}", conn_id, e);
        },
    }
}
