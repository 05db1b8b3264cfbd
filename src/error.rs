//! OEF SDK error types.
//!
//! Only connection setup reports errors synchronously. Once a session is
//! active, transport failures end the session instead of surfacing per call,
//! and errors reported by the node arrive as data through
//! [`AgentHandler`](crate::proxy::AgentHandler) callbacks.

use thiserror::Error;

/// OEF SDK errors.
#[derive(Error, Debug)]
pub enum OefSdkError {
    /// Could not open the connection to the node.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The node rejected the handshake or answered with a malformed message.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Connection and handshake did not complete in time.
    #[error("Connect timed out after {0} seconds")]
    ConnectTimeout(u64),

    /// The stream was closed by the peer (EOF or a zero-length frame).
    #[error("Connection closed")]
    ConnectionClosed,

    /// Payload does not fit in a 32-bit length prefix.
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Operation requires an active session.
    #[error("Not connected")]
    NotConnected,

    /// `connect` was called on a proxy that already left the unconnected state.
    #[error("Proxy already connected or stopped")]
    AlreadyConnected,

    /// The proxy was stopped before the connection was established.
    #[error("Stopped while connecting")]
    Stopped,

    /// Message is structurally valid but not the one expected.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for OEF SDK operations
pub type Result<T> = std::result::Result<T, OefSdkError>;

impl OefSdkError {
    /// Whether this error means the peer went away rather than misbehaved.
    pub fn is_disconnect(&self) -> bool {
        match self {
            OefSdkError::ConnectionClosed => true,
            OefSdkError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

impl From<toml::de::Error> for OefSdkError {
    fn from(err: toml::de::Error) -> Self {
        OefSdkError::Config(err.to_string())
    }
}
