//! Error types for stream operations.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while connecting to or reading from the stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// DNS, TCP, TLS or WebSocket upgrade failure.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Malformed frame, JSON or payload. Only the offending frame is lost.
    #[error("Malformed frame: {0}")]
    Protocol(String),

    /// Peer closed the session or the socket failed mid-stream.
    #[error("Transport closed: {0}")]
    TransportClosed(String),

    /// Error reported by the server in a `type: "error"` frame.
    #[error("Server error: {message}")]
    Application { code: Option<i64>, message: String },

    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Socket failures on an established session. Handshake failures are mapped
/// to `Connection` explicitly by the client.
impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        StreamError::TransportClosed(err.to_string())
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Protocol(err.to_string())
    }
}

impl From<url::ParseError> for StreamError {
    fn from(err: url::ParseError) -> Self {
        StreamError::Connection(err.to_string())
    }
}

impl StreamError {
    /// Returns true if this error ends the session (or prevents it from starting).
    ///
    /// Per-frame errors (`Protocol`, `Application`) are logged by the read loop
    /// and the session continues.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            StreamError::Protocol(_) | StreamError::Application { .. }
        )
    }
}
