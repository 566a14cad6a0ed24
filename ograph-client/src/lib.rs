//! # ograph-client
//!
//! Blocking TCP client for the OrientDB binary network protocol.
//!
//! This crate provides:
//! - A synchronous connection owning the socket and the session state
//! - The request/response frame engine
//! - One message strategy per server operation
//! - A high-level [`Client`] facade
//!
//! The exchange model is strictly one request, one response, one owner:
//! there is no pooling, no multiplexing and no internal locking. Callers
//! that share a connection across threads must serialize access
//! themselves, which the `&mut` API makes the natural default.

pub mod client;
pub mod connection;
pub mod error;
pub mod frame;
pub mod messages;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
pub use frame::MessageFrame;
pub use messages::Cluster;
pub use session::{DatabaseType, SerializationType, SessionState, StorageType};

pub use ograph_protocol as protocol;
