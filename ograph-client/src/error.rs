//! Client error types.

use ograph_protocol::{ProtocolError, ServerError};
use thiserror::Error;

/// Errors surfaced by connection handling and operation messages.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("server error: {0}")]
    Server(#[from] ServerError),

    #[error("not connected")]
    NotConnected,

    #[error("no database is open on this connection")]
    DatabaseNotOpened,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("{value:?} is not a valid {kind}")]
    Validation { kind: &'static str, value: String },

    #[error("serialization format {0:?} is not supported by this driver")]
    UnsupportedSerialization(String),
}

impl ClientError {
    /// Whether the connection must be closed and re-established before any
    /// further use.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::ConnectionClosed | ClientError::Protocol(_)
        )
    }
}
