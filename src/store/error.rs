//! Store-specific error types.
//!
//! [`StoreError`] is `Clone` so a latched connection can hand the same error
//! back on every later call.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur talking to the statistics store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// TCP connect failed.
    #[error("failed to connect to {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: Arc<io::Error>,
    },

    /// The server rejected the AUTH command issued right after dial.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Socket read/write failed.
    #[error("io error: {0}")]
    Io(#[source] Arc<io::Error>),

    /// Malformed frame on the wire.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server answered with an error reply.
    #[error("server error: {0}")]
    Server(String),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// A reply did not have the expected shape.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl StoreError {
    /// True for failures that happen while establishing a connection.
    pub fn is_connect_error(&self) -> bool {
        matches!(self, Self::Dial { .. } | Self::Auth(_))
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::Io(Arc::new(e))
    }
}
