//! Dynamic record model.
//!
//! Server records are schemaless: the attribute set is unknown until decode
//! time. A decoded record arrives as a key -> value mapping in which a few
//! reserved keys carry identity instead of data: `rid` and `version`
//! populate dedicated fields, and a key whose first character is `@` names
//! the record's class, its value being a nested mapping scanned in turn.

use crate::error::ProtocolError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Leading character marking a class-qualified key in a decoded mapping.
pub const CLASS_MARKER: char = '@';

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Link(RecordLink),
    Binary(BinaryObject),
    List(Vec<RecordValue>),
    Map(BTreeMap<String, RecordValue>),
}

/// A reference to another record by its identifier.
///
/// A link never owns the target record; it is a pure
/// `<cluster>:<position>` identifier with a canonical `#`-prefixed
/// rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordLink {
    cluster: i16,
    position: i64,
}

impl RecordLink {
    pub fn new(cluster: i16, position: i64) -> Self {
        Self { cluster, position }
    }

    /// Parses the exact `<cluster>:<position>` text form, both integers,
    /// no whitespace. Anything else fails with a parse error.
    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidRecordLink(s.to_string());
        let (cluster, position) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            cluster: cluster.parse().map_err(|_| invalid())?,
            position: position.parse().map_err(|_| invalid())?,
        })
    }

    pub fn cluster(&self) -> i16 {
        self.cluster
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    /// The bare `<cluster>:<position>` form.
    pub fn get(&self) -> String {
        format!("{}:{}", self.cluster, self.position)
    }

    /// The canonical `#<cluster>:<position>` rendering.
    pub fn get_hash(&self) -> String {
        format!("#{}:{}", self.cluster, self.position)
    }
}

impl fmt::Display for RecordLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster, self.position)
    }
}

/// An embedded binary payload carried as base64 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryObject {
    b64: String,
}

impl BinaryObject {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self {
            b64: encoded.into(),
        }
    }

    /// The underscore-wrapped form used when embedding in serialized output.
    pub fn raw(&self) -> String {
        format!("_{}_", self.b64)
    }

    /// The base64 text without the sentinels.
    pub fn encoded(&self) -> &str {
        &self.b64
    }

    /// Decodes the payload. Decoding is pure: calling this twice yields the
    /// same bytes, and the encoded text is left untouched.
    pub fn bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(BASE64.decode(&self.b64)?)
    }
}

/// A schemaless document record: an attribute map plus the reserved
/// identity fields the server manages (record id, version, class name).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    rid: Option<RecordLink>,
    version: Option<i32>,
    class_name: Option<String>,
    attributes: BTreeMap<String, RecordValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record by scanning a decoded key -> value mapping.
    ///
    /// Keys literally named `rid` and `version` populate the reserved
    /// fields; a key starting with [`CLASS_MARKER`] carries the class name
    /// and its value is a nested mapping scanned recursively; every other
    /// key becomes an ordinary attribute.
    pub fn from_map(content: BTreeMap<String, RecordValue>) -> Result<Self, ProtocolError> {
        let mut record = Record::default();
        record.scan(content)?;
        Ok(record)
    }

    fn scan(&mut self, content: BTreeMap<String, RecordValue>) -> Result<(), ProtocolError> {
        for (key, value) in content {
            if key == "rid" {
                self.rid = Some(link_from_value(&key, value)?);
            } else if key == "version" {
                self.version = Some(version_from_value(&key, value)?);
            } else if let Some(class) = key.strip_prefix(CLASS_MARKER) {
                self.class_name = Some(class.to_string());
                match value {
                    RecordValue::Map(inner) => self.scan(inner)?,
                    _ => return Err(ProtocolError::InvalidRecordKey { key }),
                }
            } else {
                self.attributes.insert(key, value);
            }
        }
        Ok(())
    }

    pub fn rid(&self) -> Option<&RecordLink> {
        self.rid.as_ref()
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Looks up an ordinary attribute by name.
    pub fn get(&self, name: &str) -> Option<&RecordValue> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, RecordValue> {
        &self.attributes
    }

    /// Replaces the server-assigned identity after a round-trip. A missing
    /// class name is filled in; an existing one is kept.
    pub fn update(&mut self, rid: RecordLink, version: i32, class_name: Option<String>) {
        self.rid = Some(rid);
        self.version = Some(version);
        if self.class_name.is_none() {
            self.class_name = class_name;
        }
    }
}

fn link_from_value(key: &str, value: RecordValue) -> Result<RecordLink, ProtocolError> {
    match value {
        RecordValue::Link(link) => Ok(link),
        RecordValue::String(s) => RecordLink::parse(&s),
        _ => Err(ProtocolError::InvalidRecordKey {
            key: key.to_string(),
        }),
    }
}

fn version_from_value(key: &str, value: RecordValue) -> Result<i32, ProtocolError> {
    match value {
        RecordValue::Integer(v) => v.try_into().map_err(|_| ProtocolError::InvalidRecordKey {
            key: key.to_string(),
        }),
        _ => Err(ProtocolError::InvalidRecordKey {
            key: key.to_string(),
        }),
    }
}
