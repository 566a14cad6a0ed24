//! Protocol error types: framing failures and server-reported error frames.

use std::fmt;
use thiserror::Error;

/// Errors raised while encoding or decoding the byte stream.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unexpected end of stream: needed {needed} more bytes")]
    UnexpectedEof { needed: usize },

    #[error("invalid length prefix: {0}")]
    InvalidLength(i32),

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("invalid record link: {0:?}")]
    InvalidRecordLink(String),

    #[error("unexpected value for reserved record key {key:?}")]
    InvalidRecordKey { key: String },

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Maps a short read to a framing error, keeping other I/O failures as-is.
    pub(crate) fn from_read(err: std::io::Error, needed: usize) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::UnexpectedEof { needed }
        } else {
            ProtocolError::Io(err)
        }
    }
}

/// One (exception class, message) pair from a server error frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerException {
    pub class: String,
    pub message: String,
}

/// A structured server-reported error decoded from an error frame.
///
/// The server may stack several exceptions in one frame; they are kept in
/// the order they were written. `stack_trace` is the opaque serialized form
/// of the server-side exception, present only on protocol versions that
/// send it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    exceptions: Vec<ServerException>,
    stack_trace: Vec<u8>,
}

impl ServerError {
    pub fn new(exceptions: Vec<ServerException>, stack_trace: Vec<u8>) -> Self {
        Self {
            exceptions,
            stack_trace,
        }
    }

    /// Class of the first (outermost) exception.
    pub fn class(&self) -> Option<&str> {
        self.exceptions.first().map(|e| e.class.as_str())
    }

    /// Message of the first (outermost) exception.
    pub fn message(&self) -> Option<&str> {
        self.exceptions.first().map(|e| e.message.as_str())
    }

    /// Every stacked exception, outermost first.
    pub fn exceptions(&self) -> &[ServerException] {
        &self.exceptions
    }

    /// The serialized server-side exception payload, if any.
    pub fn stack_trace(&self) -> &[u8] {
        &self.stack_trace
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exceptions.first() {
            Some(e) => write!(f, "{}: {}", e.class, e.message),
            None => write!(f, "unknown server error"),
        }
    }
}

impl std::error::Error for ServerError {}
