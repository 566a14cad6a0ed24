//! Database-scoped operation messages.

use super::{read_clusters, Cluster};
use crate::connection::Connection;
use crate::error::ClientError;
use crate::frame::MessageFrame;
use crate::messages::ConnectMessage;
use crate::session::{DatabaseType, SerializationType, StorageType};
use ograph_protocol::field::{self, Field, FieldTag};
use ograph_protocol::{
    Operation, DRIVER_NAME, DRIVER_VERSION, SUPPORTED_PROTOCOL, VERSION_WITH_DB_NAME,
    VERSION_WITH_SERIALIZATION, VERSION_WITH_STORAGE_TYPE,
};

/// Opens a database on the server, establishing a session if none exists.
///
/// Request: driver name/version, supported protocol short, then client id,
/// serialization impl (above protocol 21), database name and type, user
/// and password.
/// Response: new session id, then the configured cluster list, the cluster
/// configuration blob (null today) and the server release string.
pub struct DbOpenMessage<'a> {
    conn: &'a mut Connection,
    frame: MessageFrame,
    db_name: String,
    db_type: DatabaseType,
    user: String,
    password: String,
    client_id: String,
    serialization: SerializationType,
}

impl<'a> DbOpenMessage<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            frame: MessageFrame::new(),
            db_name: String::new(),
            db_type: DatabaseType::default(),
            user: String::new(),
            password: String::new(),
            client_id: String::new(),
            serialization: SerializationType::default(),
        }
    }

    pub fn set_db_name(&mut self, db_name: impl Into<String>) -> &mut Self {
        self.db_name = db_name.into();
        self
    }

    pub fn set_db_type(&mut self, db_type: DatabaseType) -> &mut Self {
        self.db_type = db_type;
        self
    }

    pub fn set_user(&mut self, user: impl Into<String>) -> &mut Self {
        self.user = user.into();
        self
    }

    pub fn set_password(&mut self, password: impl Into<String>) -> &mut Self {
        self.password = password.into();
        self
    }

    pub fn set_client_id(&mut self, client_id: impl Into<String>) -> &mut Self {
        self.client_id = client_id.into();
        self
    }

    /// Picks the record serialization format to negotiate. Formats the
    /// driver cannot decode are rejected here, before any I/O.
    pub fn set_serialization_type(
        &mut self,
        serialization: SerializationType,
    ) -> Result<&mut Self, ClientError> {
        if serialization == SerializationType::Binary {
            return Err(ClientError::UnsupportedSerialization(
                serialization.as_str().to_string(),
            ));
        }
        self.serialization = serialization;
        Ok(self)
    }

    /// Builds the request frame, transparently authenticating first when
    /// the connection has no session yet. This is the one operation that
    /// auto-remediates instead of failing its guard.
    pub fn prepare(&mut self) -> Result<&mut Self, ClientError> {
        self.conn.connect()?;

        if self.conn.session().session_id() < 0 {
            self.perform_connection()?;
        }

        let session = self.conn.session();
        let protocol = session.protocol_version();
        let session_id = session.session_id();

        let open_params = if protocol > VERSION_WITH_SERIALIZATION {
            vec![
                self.client_id.clone(),
                self.serialization.as_str().to_string(),
                self.db_name.clone(),
                self.db_type.as_str().to_string(),
                self.user.clone(),
                self.password.clone(),
            ]
        } else {
            vec![
                self.client_id.clone(),
                self.db_name.clone(),
                self.db_type.as_str().to_string(),
                self.user.clone(),
                self.password.clone(),
            ]
        };

        self.frame
            .append(Field::Byte(Operation::DbOpen.code()))
            .append(Field::Int(session_id))
            .append(Field::Strings(vec![
                DRIVER_NAME.to_string(),
                DRIVER_VERSION.to_string(),
            ]))
            .append(Field::Short(SUPPORTED_PROTOCOL))
            .append(Field::Strings(open_params));
        self.frame.encode();
        Ok(self)
    }

    fn perform_connection(&mut self) -> Result<(), ClientError> {
        tracing::debug!("no session yet, connecting first");
        let mut connect = ConnectMessage::new(&mut *self.conn);
        connect
            .set_user(self.user.clone())
            .set_password(self.password.clone())
            .set_client_id(self.client_id.clone());
        connect.set_serialization_type(self.serialization)?;
        connect.prepare()?.send()?;
        connect.fetch_response()?;
        Ok(())
    }

    pub fn send(&mut self) -> Result<&mut Self, ClientError> {
        self.frame.send(&mut *self.conn)?;
        Ok(self)
    }

    /// Reads the session id and cluster list, then marks the database open.
    pub fn fetch_response(&mut self) -> Result<Vec<Cluster>, ClientError> {
        self.frame.read_header(&mut *self.conn)?;
        let session_id = field::read_i32(&mut *self.conn)?;
        let cluster_count = field::read_i16(&mut *self.conn)?;
        let clusters = read_clusters(&mut *self.conn, cluster_count)?;

        // cluster configuration (null unless clustered) and server release
        self.frame
            .fetch_response(&mut *self.conn, &[FieldTag::Bytes, FieldTag::String])?;

        let session = self.conn.session_mut();
        session.session_id = session_id;
        session.database_opened = Some(self.db_name.clone());
        session.serialization_type = self.serialization;

        tracing::debug!(
            session_id,
            db = %self.db_name,
            clusters = clusters.len(),
            "database opened"
        );
        Ok(clusters)
    }
}

/// Closes the open database and the connection with it.
///
/// The server tears the socket down without writing a reply, so there is
/// no frame to decode: the response phase just closes the transport.
pub struct DbCloseMessage<'a> {
    conn: &'a mut Connection,
    frame: MessageFrame,
}

impl<'a> DbCloseMessage<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            frame: MessageFrame::new(),
        }
    }

    pub fn prepare(&mut self) -> Result<&mut Self, ClientError> {
        self.conn.session().ensure_connected()?;

        let session_id = self.conn.session().session_id();
        self.frame
            .append(Field::Byte(Operation::DbClose.code()))
            .append(Field::Int(session_id));
        self.frame.encode();
        Ok(self)
    }

    pub fn send(&mut self) -> Result<&mut Self, ClientError> {
        self.frame.send(&mut *self.conn)?;
        Ok(self)
    }

    /// Closes the transport and returns the close sentinel.
    pub fn fetch_response(&mut self) -> Result<i32, ClientError> {
        self.conn.close();
        Ok(0)
    }
}

/// Asks whether a database exists on the server.
pub struct DbExistsMessage<'a> {
    conn: &'a mut Connection,
    frame: MessageFrame,
    db_name: String,
    storage_type: StorageType,
}

impl<'a> DbExistsMessage<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        let storage_type = StorageType::default_for_protocol(conn.session().protocol_version());
        Self {
            conn,
            frame: MessageFrame::new(),
            db_name: String::new(),
            storage_type,
        }
    }

    pub fn set_db_name(&mut self, db_name: impl Into<String>) -> &mut Self {
        self.db_name = db_name.into();
        self
    }

    pub fn set_storage_type(&mut self, storage_type: StorageType) -> &mut Self {
        self.storage_type = storage_type;
        self
    }

    pub fn prepare(&mut self) -> Result<&mut Self, ClientError> {
        self.conn.session().ensure_connected()?;

        let protocol = self.conn.session().protocol_version();
        let session_id = self.conn.session().session_id();

        self.frame
            .append(Field::Byte(Operation::DbExists.code()))
            .append(Field::Int(session_id));
        if protocol >= VERSION_WITH_DB_NAME {
            self.frame.append(Field::string(self.db_name.clone()));
        }
        if protocol >= VERSION_WITH_STORAGE_TYPE {
            self.frame
                .append(Field::string(self.storage_type.as_str()));
        }
        self.frame.encode();
        Ok(self)
    }

    pub fn send(&mut self) -> Result<&mut Self, ClientError> {
        self.frame.send(&mut *self.conn)?;
        Ok(self)
    }

    pub fn fetch_response(&mut self) -> Result<bool, ClientError> {
        let fields = self
            .frame
            .fetch_response(&mut *self.conn, &[FieldTag::Boolean])?;
        Ok(matches!(fields.as_slice(), [Field::Boolean(true)]))
    }
}

/// Creates a database on the server.
pub struct DbCreateMessage<'a> {
    conn: &'a mut Connection,
    frame: MessageFrame,
    db_name: String,
    db_type: DatabaseType,
    storage_type: StorageType,
}

impl<'a> DbCreateMessage<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        let storage_type = StorageType::default_for_protocol(conn.session().protocol_version());
        Self {
            conn,
            frame: MessageFrame::new(),
            db_name: String::new(),
            db_type: DatabaseType::default(),
            storage_type,
        }
    }

    pub fn set_db_name(&mut self, db_name: impl Into<String>) -> &mut Self {
        self.db_name = db_name.into();
        self
    }

    pub fn set_db_type(&mut self, db_type: DatabaseType) -> &mut Self {
        self.db_type = db_type;
        self
    }

    pub fn set_storage_type(&mut self, storage_type: StorageType) -> &mut Self {
        self.storage_type = storage_type;
        self
    }

    pub fn prepare(&mut self) -> Result<&mut Self, ClientError> {
        self.conn.session().ensure_connected()?;

        let session_id = self.conn.session().session_id();
        self.frame
            .append(Field::Byte(Operation::DbCreate.code()))
            .append(Field::Int(session_id))
            .append(Field::Strings(vec![
                self.db_name.clone(),
                self.db_type.as_str().to_string(),
                self.storage_type.as_str().to_string(),
            ]));
        self.frame.encode();
        Ok(self)
    }

    pub fn send(&mut self) -> Result<&mut Self, ClientError> {
        self.frame.send(&mut *self.conn)?;
        Ok(self)
    }

    /// Confirms the creation and marks the database open.
    pub fn fetch_response(&mut self) -> Result<(), ClientError> {
        self.frame.read_header(&mut *self.conn)?;
        self.conn.session_mut().database_opened = Some(self.db_name.clone());
        Ok(())
    }
}

/// Removes a database from the server.
pub struct DbDropMessage<'a> {
    conn: &'a mut Connection,
    frame: MessageFrame,
    db_name: String,
    storage_type: StorageType,
}

impl<'a> DbDropMessage<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        let storage_type = StorageType::default_for_protocol(conn.session().protocol_version());
        Self {
            conn,
            frame: MessageFrame::new(),
            db_name: String::new(),
            storage_type,
        }
    }

    pub fn set_db_name(&mut self, db_name: impl Into<String>) -> &mut Self {
        self.db_name = db_name.into();
        self
    }

    pub fn set_storage_type(&mut self, storage_type: StorageType) -> &mut Self {
        self.storage_type = storage_type;
        self
    }

    pub fn prepare(&mut self) -> Result<&mut Self, ClientError> {
        self.conn.session().ensure_connected()?;

        let protocol = self.conn.session().protocol_version();
        let session_id = self.conn.session().session_id();

        self.frame
            .append(Field::Byte(Operation::DbDrop.code()))
            .append(Field::Int(session_id))
            .append(Field::string(self.db_name.clone()));
        if protocol >= VERSION_WITH_STORAGE_TYPE {
            self.frame
                .append(Field::string(self.storage_type.as_str()));
        }
        self.frame.encode();
        Ok(self)
    }

    pub fn send(&mut self) -> Result<&mut Self, ClientError> {
        self.frame.send(&mut *self.conn)?;
        Ok(self)
    }

    pub fn fetch_response(&mut self) -> Result<(), ClientError> {
        self.frame.read_header(&mut *self.conn)?;
        Ok(())
    }
}

/// Counts the records of the open database.
pub struct DbCountRecordsMessage<'a> {
    conn: &'a mut Connection,
    frame: MessageFrame,
}

impl<'a> DbCountRecordsMessage<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            frame: MessageFrame::new(),
        }
    }

    pub fn prepare(&mut self) -> Result<&mut Self, ClientError> {
        self.conn.session().ensure_database_opened()?;

        let session_id = self.conn.session().session_id();
        self.frame
            .append(Field::Byte(Operation::DbCountRecords.code()))
            .append(Field::Int(session_id));
        self.frame.encode();
        Ok(self)
    }

    pub fn send(&mut self) -> Result<&mut Self, ClientError> {
        self.frame.send(&mut *self.conn)?;
        Ok(self)
    }

    pub fn fetch_response(&mut self) -> Result<i64, ClientError> {
        self.frame.read_header(&mut *self.conn)?;
        Ok(field::read_i64(&mut *self.conn)?)
    }
}

/// Reloads the cluster configuration of the open connection.
pub struct DbReloadMessage<'a> {
    conn: &'a mut Connection,
    frame: MessageFrame,
}

impl<'a> DbReloadMessage<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            frame: MessageFrame::new(),
        }
    }

    pub fn prepare(&mut self) -> Result<&mut Self, ClientError> {
        self.conn.session().ensure_connected()?;

        let session_id = self.conn.session().session_id();
        self.frame
            .append(Field::Byte(Operation::DbReload.code()))
            .append(Field::Int(session_id));
        self.frame.encode();
        Ok(self)
    }

    pub fn send(&mut self) -> Result<&mut Self, ClientError> {
        self.frame.send(&mut *self.conn)?;
        Ok(self)
    }

    pub fn fetch_response(&mut self) -> Result<Vec<Cluster>, ClientError> {
        self.frame.read_header(&mut *self.conn)?;
        let cluster_count = field::read_i16(&mut *self.conn)?;
        read_clusters(&mut *self.conn, cluster_count)
    }
}

/// Asks for the size of the open database.
pub struct DbSizeMessage<'a> {
    conn: &'a mut Connection,
    frame: MessageFrame,
}

impl<'a> DbSizeMessage<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            frame: MessageFrame::new(),
        }
    }

    pub fn prepare(&mut self) -> Result<&mut Self, ClientError> {
        self.conn.session().ensure_database_opened()?;

        let session_id = self.conn.session().session_id();
        self.frame
            .append(Field::Byte(Operation::DbSize.code()))
            .append(Field::Int(session_id));
        self.frame.encode();
        Ok(self)
    }

    pub fn send(&mut self) -> Result<&mut Self, ClientError> {
        self.frame.send(&mut *self.conn)?;
        Ok(self)
    }

    pub fn fetch_response(&mut self) -> Result<i64, ClientError> {
        self.frame.read_header(&mut *self.conn)?;
        Ok(field::read_i64(&mut *self.conn)?)
    }
}
