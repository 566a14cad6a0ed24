//! Per-connection session state and the closed sets of caller choices.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record serialization formats the server can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SerializationType {
    /// `ORecordDocument2csv`, the textual document format.
    #[default]
    Csv,
    /// `ORecordSerializerBinary`. Recognized but not implemented by this
    /// driver; selecting it fails before any byte is written.
    Binary,
}

impl SerializationType {
    pub const fn as_str(self) -> &'static str {
        match self {
            SerializationType::Csv => "ORecordDocument2csv",
            SerializationType::Binary => "ORecordSerializerBinary",
        }
    }

    /// Validates a caller-supplied spelling against the closed set.
    pub fn parse(s: &str) -> Result<Self, ClientError> {
        match s {
            "ORecordDocument2csv" => Ok(SerializationType::Csv),
            "ORecordSerializerBinary" => Ok(SerializationType::Binary),
            _ => Err(ClientError::Validation {
                kind: "serialization type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SerializationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database kinds the server distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DatabaseType {
    #[default]
    Document,
    Graph,
}

impl DatabaseType {
    pub const fn as_str(self) -> &'static str {
        match self {
            DatabaseType::Document => "document",
            DatabaseType::Graph => "graph",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ClientError> {
        match s {
            "document" => Ok(DatabaseType::Document),
            "graph" => Ok(DatabaseType::Graph),
            _ => Err(ClientError::Validation {
                kind: "database type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side storage engines a database can live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageType {
    /// Persistent paginated storage.
    PLocal,
    /// Volatile in-memory storage.
    Memory,
    /// The legacy persistent engine of servers older than protocol 17.
    Local,
}

impl StorageType {
    pub const fn as_str(self) -> &'static str {
        match self {
            StorageType::PLocal => "plocal",
            StorageType::Memory => "memory",
            StorageType::Local => "local",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ClientError> {
        match s {
            "plocal" => Ok(StorageType::PLocal),
            "memory" => Ok(StorageType::Memory),
            "local" => Ok(StorageType::Local),
            _ => Err(ClientError::Validation {
                kind: "storage type",
                value: s.to_string(),
            }),
        }
    }

    /// The storage engine servers of the given protocol version default to.
    pub fn default_for_protocol(protocol: i16) -> Self {
        if protocol > 16 {
            StorageType::PLocal
        } else {
            StorageType::Local
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection-wide session state.
///
/// Owned by the connection. Every operation message reads it; only Connect
/// (`session_id`), DbOpen (`session_id`, `database_opened`,
/// `serialization_type`) and DbCreate (`database_opened`) write it, and the
/// protocol version is fixed once the connection handshake completes.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub(crate) session_id: i32,
    pub(crate) protocol_version: i16,
    pub(crate) database_opened: Option<String>,
    pub(crate) serialization_type: SerializationType,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            session_id: -1,
            protocol_version: 0,
            database_opened: None,
            serialization_type: SerializationType::Csv,
        }
    }

    /// Server-assigned session id; -1 before authentication.
    pub fn session_id(&self) -> i32 {
        self.session_id
    }

    /// Protocol version read during the connection handshake.
    pub fn protocol_version(&self) -> i16 {
        self.protocol_version
    }

    /// Name of the open database, if any.
    pub fn database_opened(&self) -> Option<&str> {
        self.database_opened.as_deref()
    }

    pub fn serialization_type(&self) -> SerializationType {
        self.serialization_type
    }

    pub fn is_connected(&self) -> bool {
        self.session_id >= 0
    }

    pub fn is_database_opened(&self) -> bool {
        self.database_opened.is_some()
    }

    /// Guard: the session must be authenticated.
    pub fn ensure_connected(&self) -> Result<(), ClientError> {
        if self.session_id < 0 {
            return Err(ClientError::NotConnected);
        }
        Ok(())
    }

    /// Guard: a database must be open (implies authenticated).
    pub fn ensure_database_opened(&self) -> Result<(), ClientError> {
        self.ensure_connected()?;
        if self.database_opened.is_none() {
            return Err(ClientError::DatabaseNotOpened);
        }
        Ok(())
    }
}
