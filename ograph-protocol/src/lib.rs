//! # ograph-protocol
//!
//! Wire-level building blocks for the OrientDB binary network protocol.
//!
//! This crate provides:
//! - Typed field codec (fixed-width big-endian integers, one-byte booleans,
//!   length-prefixed strings and blobs)
//! - Operation codes and negotiated-version gates
//! - Dynamic record model (records, record links, embedded binary objects)
//! - Framing and server-reported error types
//!
//! Nothing on this wire is self-describing: the caller always supplies the
//! tag a value is encoded or decoded under, and the field order of every
//! request and response is a fixed contract of the operation.

pub mod error;
pub mod field;
pub mod record;

pub use error::{ProtocolError, ServerError, ServerException};
pub use field::{Field, FieldTag};
pub use record::{BinaryObject, Record, RecordLink, RecordValue};

/// Highest protocol version this driver speaks, announced in Connect/DbOpen.
pub const SUPPORTED_PROTOCOL: i16 = 24;

/// Default port of the server's binary listener.
pub const DEFAULT_PORT: u16 = 2424;

/// Driver name announced during Connect and DbOpen.
pub const DRIVER_NAME: &str = "ograph";

/// Driver version announced during Connect and DbOpen.
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Versions above this carry the serialization-impl string in Connect/DbOpen.
pub const VERSION_WITH_SERIALIZATION: i16 = 21;

/// Versions at or above this take a storage-type string in DbExists/DbDrop.
pub const VERSION_WITH_STORAGE_TYPE: i16 = 16;

/// Versions at or above this take the database name in DbExists.
pub const VERSION_WITH_DB_NAME: i16 = 6;

/// Versions above this append the serialized server exception to error frames.
pub const VERSION_WITH_STACK_TRACE: i16 = 18;

/// Versions at or above this report clusters as bare (name, id) pairs.
pub const VERSION_COMPACT_CLUSTERS: i16 = 24;

/// Operation codes of the binary protocol.
///
/// The code is the one-byte field leading every request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    Shutdown = 1,
    Connect = 2,
    DbOpen = 3,
    DbCreate = 4,
    DbClose = 5,
    DbExists = 6,
    DbDrop = 7,
    DbSize = 8,
    DbCountRecords = 9,
    DbReload = 73,
}

impl Operation {
    pub const fn code(self) -> u8 {
        self as u8
    }
}
