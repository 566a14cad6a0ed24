//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use crate::messages::{
    Cluster, ConnectMessage, DbCloseMessage, DbCountRecordsMessage, DbCreateMessage,
    DbDropMessage, DbExistsMessage, DbOpenMessage, DbReloadMessage, DbSizeMessage,
    ShutdownMessage,
};
use crate::session::{DatabaseType, SerializationType, SessionState, StorageType};

/// High-level client over one connection.
///
/// Every method runs a full request/response exchange; the underlying
/// connection supports exactly one exchange at a time, which the `&mut`
/// receivers enforce.
pub struct Client {
    conn: Connection,
}

impl Client {
    /// Creates a client for the given configuration. No I/O happens until
    /// the first operation.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Connection::new(config),
        }
    }

    /// Authenticates against the server and returns the session id.
    pub fn connect(
        &mut self,
        user: &str,
        password: &str,
        client_id: &str,
        serialization: SerializationType,
    ) -> Result<i32, ClientError> {
        tracing::debug!(user, "connect");
        let mut msg = ConnectMessage::new(&mut self.conn);
        msg.set_user(user)
            .set_password(password)
            .set_client_id(client_id);
        msg.set_serialization_type(serialization)?;
        msg.prepare()?.send()?;
        msg.fetch_response()
    }

    /// Opens a database, authenticating first if this connection has no
    /// session yet, and returns the configured clusters.
    #[allow(clippy::too_many_arguments)]
    pub fn db_open(
        &mut self,
        db_name: &str,
        user: &str,
        password: &str,
        db_type: DatabaseType,
        client_id: &str,
        serialization: SerializationType,
    ) -> Result<Vec<Cluster>, ClientError> {
        tracing::debug!(db_name, "db_open");
        let mut msg = DbOpenMessage::new(&mut self.conn);
        msg.set_db_name(db_name)
            .set_db_type(db_type)
            .set_user(user)
            .set_password(password)
            .set_client_id(client_id);
        msg.set_serialization_type(serialization)?;
        msg.prepare()?.send()?;
        msg.fetch_response()
    }

    /// Closes the open database and, with it, the connection.
    pub fn db_close(&mut self) -> Result<i32, ClientError> {
        tracing::debug!("db_close");
        let mut msg = DbCloseMessage::new(&mut self.conn);
        msg.prepare()?.send()?;
        msg.fetch_response()
    }

    /// Asks whether a database exists. Without an explicit storage type the
    /// server default for the negotiated protocol is used.
    pub fn db_exists(
        &mut self,
        db_name: &str,
        storage_type: Option<StorageType>,
    ) -> Result<bool, ClientError> {
        let mut msg = DbExistsMessage::new(&mut self.conn);
        msg.set_db_name(db_name);
        if let Some(storage) = storage_type {
            msg.set_storage_type(storage);
        }
        msg.prepare()?.send()?;
        msg.fetch_response()
    }

    /// Creates a database on the server.
    pub fn db_create(
        &mut self,
        db_name: &str,
        db_type: DatabaseType,
        storage_type: Option<StorageType>,
    ) -> Result<(), ClientError> {
        tracing::debug!(db_name, "db_create");
        let mut msg = DbCreateMessage::new(&mut self.conn);
        msg.set_db_name(db_name).set_db_type(db_type);
        if let Some(storage) = storage_type {
            msg.set_storage_type(storage);
        }
        msg.prepare()?.send()?;
        msg.fetch_response()
    }

    /// Removes a database from the server.
    pub fn db_drop(
        &mut self,
        db_name: &str,
        storage_type: Option<StorageType>,
    ) -> Result<(), ClientError> {
        tracing::debug!(db_name, "db_drop");
        let mut msg = DbDropMessage::new(&mut self.conn);
        msg.set_db_name(db_name);
        if let Some(storage) = storage_type {
            msg.set_storage_type(storage);
        }
        msg.prepare()?.send()?;
        msg.fetch_response()
    }

    /// Counts the records of the open database.
    pub fn db_count_records(&mut self) -> Result<i64, ClientError> {
        let mut msg = DbCountRecordsMessage::new(&mut self.conn);
        msg.prepare()?.send()?;
        msg.fetch_response()
    }

    /// Reloads the cluster configuration.
    pub fn db_reload(&mut self) -> Result<Vec<Cluster>, ClientError> {
        let mut msg = DbReloadMessage::new(&mut self.conn);
        msg.prepare()?.send()?;
        msg.fetch_response()
    }

    /// Asks for the size of the open database.
    pub fn db_size(&mut self) -> Result<i64, ClientError> {
        let mut msg = DbSizeMessage::new(&mut self.conn);
        msg.prepare()?.send()?;
        msg.fetch_response()
    }

    /// Shuts the server down. The connection is closed afterwards.
    pub fn shutdown(&mut self, user: &str, password: &str) -> Result<(), ClientError> {
        tracing::debug!("shutdown");
        let mut msg = ShutdownMessage::new(&mut self.conn);
        msg.set_user(user).set_password(password);
        msg.prepare()?.send()?;
        msg.fetch_response()
    }

    /// Closes the connection without talking to the server.
    pub fn close(&mut self) {
        self.conn.close();
    }

    pub fn session(&self) -> &SessionState {
        self.conn.session()
    }

    /// The underlying connection, for issuing operation messages directly.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}
