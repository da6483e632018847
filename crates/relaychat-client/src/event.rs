//! Events delivered to the client application.

/// Something the server-facing tasks want the application to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A relayed chat message: one (identity, content) frame pair.
    Message {
        /// Display name from the identity frame
        sender: String,
        /// Text from the content frame
        text: String,
    },

    /// The connection is gone; no further events will arrive.
    ///
    /// Emitted for server-side closure, transport errors, and framing
    /// violations alike - the application's receive path ends cleanly
    /// either way.
    Disconnected {
        /// Human-readable cause
        reason: String,
    },
}
