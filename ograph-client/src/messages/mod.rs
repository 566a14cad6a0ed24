//! Operation messages: one strategy per server operation.
//!
//! Each message owns its operation code, the exact request field order for
//! the negotiated protocol version, the declared shape of its response,
//! and its session side effects. The shared framing lives in
//! [`crate::frame::MessageFrame`]; messages only compose it.
//!
//! The lifecycle is `new -> set_* -> prepare -> send -> fetch_response`,
//! with every guard evaluated at the top of `prepare` before any byte is
//! written.

mod connect;
mod database;

pub use connect::{ConnectMessage, ShutdownMessage};
pub use database::{
    DbCloseMessage, DbCountRecordsMessage, DbCreateMessage, DbDropMessage, DbExistsMessage,
    DbOpenMessage, DbReloadMessage, DbSizeMessage,
};

use crate::connection::Connection;
use crate::error::ClientError;
use ograph_protocol::{field, VERSION_COMPACT_CLUSTERS};
use serde::{Deserialize, Serialize};

/// A server-side storage partition descriptor, as reported by DbOpen and
/// DbReload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub id: i16,
    /// Only reported by servers older than protocol 24.
    pub cluster_type: Option<String>,
    /// Only reported by servers older than protocol 24.
    pub segment: Option<i16>,
}

/// Decodes `count` cluster rows in the shape the negotiated protocol uses.
fn read_clusters(conn: &mut Connection, count: i16) -> Result<Vec<Cluster>, ClientError> {
    let compact = conn.session().protocol_version() >= VERSION_COMPACT_CLUSTERS;
    let mut clusters = Vec::with_capacity(count.max(0) as usize);

    for _ in 0..count.max(0) {
        let name = field::read_string(&mut *conn)?.unwrap_or_default();
        let id = field::read_i16(&mut *conn)?;
        let (cluster_type, segment) = if compact {
            (None, None)
        } else {
            (
                field::read_string(&mut *conn)?,
                Some(field::read_i16(&mut *conn)?),
            )
        };
        clusters.push(Cluster {
            name,
            id,
            cluster_type,
            segment,
        });
    }
    Ok(clusters)
}
