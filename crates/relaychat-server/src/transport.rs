//! TCP transport for the relay server.
//!
//! Thin wrapper over a Tokio `TcpListener` that applies the protocol's
//! startup contract: the "allow address reuse" socket option is set
//! before bind, and bind/listen failures are fatal at startup rather
//! than retried. After startup the listening socket lives for the whole
//! process.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::error::ServerError;

/// Backlog for pending, not-yet-accepted connections.
const LISTEN_BACKLOG: u32 = 1024;

/// Listening TCP transport.
pub struct TcpTransport {
    /// The process-lifetime listening socket
    listener: TcpListener,
}

impl TcpTransport {
    /// Create and bind the listening socket.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` if the address does not parse
    /// - `ServerError::Transport` if socket setup, bind, or listen
    ///   fails - fatal at startup
    pub fn bind(address: &str) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(|e| ServerError::Transport(format!("failed to create socket: {e}")))?;

        // Address reuse must be configured before bind.
        socket
            .set_reuseaddr(true)
            .map_err(|e| ServerError::Transport(format!("failed to set SO_REUSEADDR: {e}")))?;

        socket
            .bind(addr)
            .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;

        let listener = socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| ServerError::Transport(format!("failed to listen on {addr}: {e}")))?;

        tracing::info!("TCP transport bound to {}", addr);

        Ok(Self { listener })
    }

    /// Accept the next incoming connection.
    ///
    /// Blocks until a connection is available.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ServerError> {
        self.listener
            .accept()
            .await
            .map_err(|e| ServerError::Transport(format!("accept failed: {e}")))
    }

    /// Local address the transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("failed to get local address: {e}")))
    }
}
