//! Connect and Shutdown messages.

use crate::connection::Connection;
use crate::error::ClientError;
use crate::frame::MessageFrame;
use crate::session::SerializationType;
use ograph_protocol::field::{self, Field};
use ograph_protocol::{
    Operation, DRIVER_NAME, DRIVER_VERSION, SUPPORTED_PROTOCOL, VERSION_WITH_SERIALIZATION,
};

/// Authenticates the connection against the server, binding a session id.
///
/// Request: driver name/version, supported protocol short, then client id,
/// serialization impl (above protocol 21), user and password.
/// Response: the new session id.
pub struct ConnectMessage<'a> {
    conn: &'a mut Connection,
    frame: MessageFrame,
    user: String,
    password: String,
    client_id: String,
    serialization: SerializationType,
}

impl<'a> ConnectMessage<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            frame: MessageFrame::new(),
            user: String::new(),
            password: String::new(),
            client_id: String::new(),
            serialization: SerializationType::default(),
        }
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

    /// Builds the request frame for the negotiated protocol version.
    pub fn prepare(&mut self) -> Result<&mut Self, ClientError> {
        self.conn.connect()?;

        let session = self.conn.session();
        let protocol = session.protocol_version();
        let session_id = session.session_id();

        let credentials = if protocol > VERSION_WITH_SERIALIZATION {
            vec![
                self.client_id.clone(),
                self.serialization.as_str().to_string(),
                self.user.clone(),
                self.password.clone(),
            ]
        } else {
            vec![
                self.client_id.clone(),
                self.user.clone(),
                self.password.clone(),
            ]
        };

        self.frame
            .append(Field::Byte(Operation::Connect.code()))
            .append(Field::Int(session_id))
            .append(Field::Strings(vec![
                DRIVER_NAME.to_string(),
                DRIVER_VERSION.to_string(),
            ]))
            .append(Field::Short(SUPPORTED_PROTOCOL))
            .append(Field::Strings(credentials));
        self.frame.encode();
        Ok(self)
    }

    pub fn send(&mut self) -> Result<&mut Self, ClientError> {
        self.frame.send(&mut *self.conn)?;
        Ok(self)
    }

    /// Reads the new session id and binds it to the session state.
    pub fn fetch_response(&mut self) -> Result<i32, ClientError> {
        self.frame.read_header(&mut *self.conn)?;
        let session_id = field::read_i32(&mut *self.conn)?;
        self.conn.session_mut().session_id = session_id;
        tracing::debug!(session_id, "session established");
        Ok(session_id)
    }
}

/// Asks the server to shut itself down.
///
/// Request: the server administrator's user and password.
/// Response: empty; the connection is finished afterwards.
pub struct ShutdownMessage<'a> {
    conn: &'a mut Connection,
    frame: MessageFrame,
    user: String,
    password: String,
}

impl<'a> ShutdownMessage<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            frame: MessageFrame::new(),
            user: String::new(),
            password: String::new(),
        }
    }

    pub fn set_user(&mut self, user: impl Into<String>) -> &mut Self {
        self.user = user.into();
        self
    }

    pub fn set_password(&mut self, password: impl Into<String>) -> &mut Self {
        self.password = password.into();
        self
    }

    pub fn prepare(&mut self) -> Result<&mut Self, ClientError> {
        self.conn.session().ensure_connected()?;

        let session_id = self.conn.session().session_id();
        self.frame
            .append(Field::Byte(Operation::Shutdown.code()))
            .append(Field::Int(session_id))
            .append(Field::Strings(vec![
                self.user.clone(),
                self.password.clone(),
            ]));
        self.frame.encode();
        Ok(self)
    }

    pub fn send(&mut self) -> Result<&mut Self, ClientError> {
        self.frame.send(&mut *self.conn)?;
        Ok(self)
    }

    /// Confirms the shutdown. The server is going down, so the connection
    /// is closed regardless of what the response carried.
    pub fn fetch_response(&mut self) -> Result<(), ClientError> {
        let result = self.frame.read_header(&mut *self.conn).map(|_| ());
        self.conn.close();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionConfig;
    use crate::testutil::{self, MockServer};
    use bytes::BytesMut;

    fn expected_connect_frame(session_id: i32, strings: &[&str]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        Field::Byte(Operation::Connect.code()).encode(&mut buf);
        Field::Int(session_id).encode(&mut buf);
        Field::Strings(vec![DRIVER_NAME.to_string(), DRIVER_VERSION.to_string()])
            .encode(&mut buf);
        Field::Short(SUPPORTED_PROTOCOL).encode(&mut buf);
        Field::Strings(strings.iter().map(|s| s.to_string()).collect()).encode(&mut buf);
        buf.to_vec()
    }

    #[test]
    fn test_request_sequence_includes_serialization_above_21() {
        let server = MockServer::start(24, Vec::new());
        let mut conn = Connection::new(server.config());

        let mut msg = ConnectMessage::new(&mut conn);
        msg.set_user("admin").set_password("admin").set_client_id("");
        msg.prepare().unwrap();

        assert_eq!(
            msg.frame.encoded(),
            expected_connect_frame(
                -1,
                &["", "ORecordDocument2csv", "admin", "admin"]
            )
            .as_slice()
        );

        conn.close();
        server.finish();
    }

    #[test]
    fn test_request_sequence_excludes_serialization_up_to_21() {
        let server = MockServer::start(21, Vec::new());
        let mut conn = Connection::new(server.config());

        let mut msg = ConnectMessage::new(&mut conn);
        msg.set_user("admin").set_password("secret");
        msg.prepare().unwrap();

        assert_eq!(
            msg.frame.encoded(),
            expected_connect_frame(-1, &["", "admin", "secret"]).as_slice()
        );

        conn.close();
        server.finish();
    }

    #[test]
    fn test_fetch_response_binds_session_id() {
        let mut response = testutil::ok_header(-1);
        testutil::push_fields(&mut response, &[Field::Int(32)]);

        let server = MockServer::start(24, response);
        let mut conn = Connection::new(server.config());

        let mut msg = ConnectMessage::new(&mut conn);
        msg.set_user("admin").set_password("admin");
        msg.prepare().unwrap().send().unwrap();
        let session_id = msg.fetch_response().unwrap();

        assert_eq!(session_id, 32);
        assert_eq!(conn.session().session_id(), 32);
        assert!(conn.session().is_connected());

        conn.close();
        server.finish();
    }

    #[test]
    fn test_binary_serialization_is_rejected_before_io() {
        let mut conn = Connection::new(ConnectionConfig::new("127.0.0.1"));
        let mut msg = ConnectMessage::new(&mut conn);
        assert!(matches!(
            msg.set_serialization_type(SerializationType::Binary),
            Err(ClientError::UnsupportedSerialization(_))
        ));
    }

    #[test]
    fn test_shutdown_requires_connected_session() {
        let mut conn = Connection::new(ConnectionConfig::new("127.0.0.1"));
        let mut msg = ShutdownMessage::new(&mut conn);
        assert!(matches!(msg.prepare(), Err(ClientError::NotConnected)));
    }

    #[test]
    fn test_shutdown_closes_the_connection() {
        let server = MockServer::start(24, testutil::ok_header(5));
        let mut conn = Connection::new(server.config());
        conn.connect().unwrap();
        conn.session_mut().session_id = 5;

        let mut msg = ShutdownMessage::new(&mut conn);
        msg.set_user("root").set_password("root");
        msg.prepare().unwrap().send().unwrap();
        msg.fetch_response().unwrap();

        assert!(conn.is_closed());

        let captured = server.finish();
        let mut expected = BytesMut::new();
        Field::Byte(Operation::Shutdown.code()).encode(&mut expected);
        Field::Int(5).encode(&mut expected);
        Field::Strings(vec!["root".to_string(), "root".to_string()]).encode(&mut expected);
        assert_eq!(captured, expected.to_vec());
    }
}
