//! TCP transport for the client.
//!
//! Provides [`connect`], which registers a display name and returns a
//! [`ConnectedClient`] handle. Outbound text goes through a channel to
//! a send task; inbound (identity, content) frame pairs are decoded by
//! a receive task and surfaced as [`ClientEvent`]s.
//!
//! The receive task uses the same [`FrameReader`] accumulation logic as
//! the server, so frames split across any number of receives reassemble
//! exactly.

use std::net::SocketAddr;

use relaychat_core::{FrameReader, ReadProgress};
use relaychat_proto::{Frame, ProtocolError};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
};

use crate::event::ClientEvent;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The display name was empty.
    ///
    /// Rejected before any network I/O; the server never sees the
    /// connection.
    #[error("display name must not be empty")]
    EmptyName,

    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error (encoding or framing).
    ///
    /// On the send path this is `BodyTooLarge`: the text cannot be
    /// framed and the send is refused rather than truncated.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Handle to a connected, registered client.
///
/// Dropping the handle stops the send task, which in turn closes the
/// connection.
pub struct ConnectedClient {
    /// Outbound content frames to the send task
    to_server: mpsc::Sender<Frame>,
    /// Inbound events from the receive task
    from_server: mpsc::Receiver<ClientEvent>,
    /// Abort handle for the connection tasks
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedClient {
    /// Send one chat message.
    ///
    /// # Errors
    ///
    /// - `TransportError::Protocol` if the text exceeds the header's
    ///   digit budget - surfaced here, never truncated
    /// - `TransportError::Stream` if the connection tasks are gone
    pub async fn send(&self, text: &str) -> Result<(), TransportError> {
        let frame = Frame::encode(text)?;

        self.to_server
            .send(frame)
            .await
            .map_err(|_| TransportError::Stream("connection task stopped".to_string()))
    }

    /// Next event from the server.
    ///
    /// Returns `None` after the event stream has ended; a
    /// [`ClientEvent::Disconnected`] always precedes that when the
    /// connection drops.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.from_server.recv().await
    }

    /// Stop the connection tasks immediately.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Connect to a relay server and register a display name.
///
/// The identity frame is sent before this function returns; everything
/// after that is handled by spawned tasks.
///
/// # Errors
///
/// - `TransportError::EmptyName` for an empty display name (checked
///   before any network I/O)
/// - `TransportError::Protocol` if the name exceeds the header budget
/// - `TransportError::Connection` / `TransportError::Stream` on network
///   failure
pub async fn connect(server_addr: &str, username: &str) -> Result<ConnectedClient, TransportError> {
    if username.is_empty() {
        return Err(TransportError::EmptyName);
    }

    let identity = Frame::encode(username)?;

    let addr: SocketAddr = server_addr
        .parse()
        .map_err(|e| TransportError::Connection(format!("invalid address: {e}")))?;

    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    // Register before handing the socket to the tasks; the server
    // broadcasts nothing to us until this frame completes.
    let mut wire = Vec::with_capacity(identity.wire_len());
    identity.write_to(&mut wire);
    stream.write_all(&wire).await.map_err(|e| TransportError::Stream(e.to_string()))?;

    tracing::debug!("registered as {:?} with {}", username, server_addr);

    let (read_half, write_half) = stream.into_split();
    let (to_server_tx, to_server_rx) = mpsc::channel::<Frame>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<ClientEvent>(32);

    let handle = tokio::spawn(run_connection(read_half, write_half, to_server_rx, from_server_tx));

    Ok(ConnectedClient {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Send loop: frames from the channel onto the socket.
///
/// Ends when the [`ConnectedClient`] is dropped or a write fails; the
/// receive task is stopped with it.
async fn run_connection(
    read_half: OwnedReadHalf,
    mut write_half: OwnedWriteHalf,
    mut to_server: mpsc::Receiver<Frame>,
    from_server: mpsc::Sender<ClientEvent>,
) {
    let recv_handle = tokio::spawn(receive_events(read_half, from_server));

    while let Some(frame) = to_server.recv().await {
        let mut wire = Vec::with_capacity(frame.wire_len());
        frame.write_to(&mut wire);

        if let Err(e) = write_half.write_all(&wire).await {
            tracing::debug!("send failed: {}", e);
            break;
        }
    }

    recv_handle.abort();
}

/// Receive loop: (identity, content) frame pairs into events.
async fn receive_events(mut read_half: OwnedReadHalf, events: mpsc::Sender<ClientEvent>) {
    let mut reader = FrameReader::new();
    // First frame of each pair once it has arrived
    let mut pending_sender: Option<String> = None;

    loop {
        let frame = match next_frame(&mut read_half, &mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                let _ = events
                    .send(ClientEvent::Disconnected {
                        reason: "connection closed by server".to_string(),
                    })
                    .await;
                return;
            },
            Err(e) => {
                let _ = events.send(ClientEvent::Disconnected { reason: e.to_string() }).await;
                return;
            },
        };

        let text = match frame.text() {
            Ok(text) => text.to_owned(),
            Err(e) => {
                let _ = events
                    .send(ClientEvent::Disconnected {
                        reason: format!("undecodable frame from server: {e}"),
                    })
                    .await;
                return;
            },
        };

        match pending_sender.take() {
            None => pending_sender = Some(text),
            Some(sender) => {
                if events.send(ClientEvent::Message { sender, text }).await.is_err() {
                    // Application dropped the handle; stop reading.
                    return;
                }
            },
        }
    }
}

/// Read exactly one frame, accumulating across partial receives.
///
/// Returns `Ok(None)` when the server closes the stream.
async fn next_frame(
    read_half: &mut OwnedReadHalf,
    reader: &mut FrameReader,
) -> Result<Option<Frame>, TransportError> {
    loop {
        let n = read_half
            .read(reader.pending())
            .await
            .map_err(|e| TransportError::Stream(e.to_string()))?;

        match reader.advance(n)? {
            ReadProgress::Frame(frame) => return Ok(Some(frame)),
            ReadProgress::NeedMore => {},
            ReadProgress::Closed { .. } => return Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_name_rejected_before_any_io() {
        // The address is unroutable; reaching I/O would hang or error
        // differently, so an EmptyName result proves the early check.
        let result = connect("127.0.0.1:1", "").await;
        assert!(matches!(result, Err(TransportError::EmptyName)));
    }

    #[tokio::test]
    async fn invalid_address_is_a_connection_error() {
        let result = connect("not-an-address", "alice").await;
        assert!(matches!(result, Err(TransportError::Connection(_))));
    }
}
