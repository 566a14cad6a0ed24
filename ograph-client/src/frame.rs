//! Request/response frame engine.
//!
//! A request frame is an ordered list of typed fields: the one-byte
//! operation code, the 4-byte session id, then whatever the operation
//! appends. The order fields are appended in is the order they hit the
//! wire; nothing is reordered or inferred.
//!
//! On the response side the caller declares the tag sequence it expects.
//! The leading `[status:1][session-id:4]` header is consumed once per
//! exchange; a non-zero status switches to the error-frame shape
//! `[more:bool]([class:string][message:string][more:bool])*` followed, on
//! protocol versions above 18, by the serialized server-side exception.

use crate::connection::Connection;
use crate::error::ClientError;
use bytes::BytesMut;
use ograph_protocol::field::{self, Field, FieldTag};
use ograph_protocol::{ServerError, ServerException, VERSION_WITH_STACK_TRACE};

/// Builds one request frame and decodes its response.
#[derive(Debug, Default)]
pub struct MessageFrame {
    fields: Vec<Field>,
    output: BytesMut,
    header_read: bool,
}

impl MessageFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field to the request, in order.
    pub fn append(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// Encodes the accumulated fields, in order, into the output buffer
    /// and returns the encoded frame.
    pub fn encode(&mut self) -> &[u8] {
        self.output.clear();
        for field in &self.fields {
            field.encode(&mut self.output);
        }
        &self.output
    }

    /// The frame as last encoded.
    pub fn encoded(&self) -> &[u8] {
        &self.output
    }

    /// Writes the encoded frame to the connection as one logical frame and
    /// clears the field list for the response phase.
    pub fn send(&mut self, conn: &mut Connection) -> Result<(), ClientError> {
        if self.output.is_empty() && !self.fields.is_empty() {
            self.encode();
        }
        conn.write(&self.output)?;
        tracing::trace!(bytes = self.output.len(), "frame sent");
        self.fields.clear();
        Ok(())
    }

    /// Reads the response header, once per exchange.
    ///
    /// Returns the session id echoed by the server. On a non-zero status
    /// byte the remainder of the stream is an error frame, which is decoded
    /// and returned as [`ClientError::Server`].
    pub fn read_header(&mut self, conn: &mut Connection) -> Result<i32, ClientError> {
        let status = field::read_u8(&mut *conn)?;
        let session_id = field::read_i32(&mut *conn)?;
        self.header_read = true;

        if status != 0 {
            let err = read_error_frame(conn)?;
            tracing::debug!(error = %err, "server reported an error frame");
            return Err(ClientError::Server(err));
        }
        Ok(session_id)
    }

    /// Decodes a declared, ordered tag sequence, reading the response
    /// header first if it has not been consumed yet.
    ///
    /// Count-driven loops call this (or the typed readers in
    /// [`ograph_protocol::field`]) again with further tags; the header is
    /// only ever read once.
    pub fn fetch_response(
        &mut self,
        conn: &mut Connection,
        tags: &[FieldTag],
    ) -> Result<Vec<Field>, ClientError> {
        if !self.header_read {
            self.read_header(conn)?;
        }
        let mut values = Vec::with_capacity(tags.len());
        for &tag in tags {
            values.push(field::decode(tag, &mut *conn)?);
        }
        Ok(values)
    }
}

fn read_error_frame(conn: &mut Connection) -> Result<ServerError, ClientError> {
    let mut exceptions = Vec::new();
    while field::read_bool(&mut *conn)? {
        let class = field::read_string(&mut *conn)?.unwrap_or_default();
        let message = field::read_string(&mut *conn)?.unwrap_or_default();
        exceptions.push(ServerException { class, message });
    }

    let stack_trace = if conn.session().protocol_version() > VERSION_WITH_STACK_TRACE {
        field::read_bytes(&mut *conn)?.unwrap_or_default()
    } else {
        Vec::new()
    };

    Ok(ServerError::new(exceptions, stack_trace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, MockServer};

    #[test]
    fn test_send_writes_fields_in_append_order() {
        let server = MockServer::start(24, Vec::new());
        let mut conn = Connection::new(server.config());
        conn.connect().unwrap();

        let mut frame = MessageFrame::new();
        frame
            .append(Field::Byte(6))
            .append(Field::Int(42))
            .append(Field::string("demo"));
        frame.encode();
        frame.send(&mut conn).unwrap();

        conn.close();
        let captured = server.finish();
        assert_eq!(
            captured,
            vec![6, 0, 0, 0, 42, 0, 0, 0, 4, b'd', b'e', b'm', b'o']
        );
    }

    #[test]
    fn test_fetch_response_decodes_declared_tags_after_header() {
        let mut response = testutil::ok_header(9);
        testutil::push_fields(
            &mut response,
            &[Field::Long(1234), Field::string("release")],
        );

        let server = MockServer::start(24, response);
        let mut conn = Connection::new(server.config());
        conn.connect().unwrap();

        let mut frame = MessageFrame::new();
        let fields = frame
            .fetch_response(&mut conn, &[FieldTag::Long, FieldTag::String])
            .unwrap();
        assert_eq!(
            fields,
            vec![Field::Long(1234), Field::string("release")]
        );

        conn.close();
        server.finish();
    }

    #[test]
    fn test_error_status_decodes_stacked_exceptions() {
        let mut response = vec![1u8]; // error status
        testutil::push_fields(&mut response, &[Field::Int(-1)]);
        testutil::push_fields(
            &mut response,
            &[
                Field::Boolean(true),
                Field::string("com.orientechnologies.OStorageException"),
                Field::string("db is locked"),
                Field::Boolean(true),
                Field::string("java.io.IOException"),
                Field::string("file busy"),
                Field::Boolean(false),
                Field::Bytes(Some(vec![0xDE, 0xAD])),
            ],
        );

        let server = MockServer::start(24, response);
        let mut conn = Connection::new(server.config());
        conn.connect().unwrap();

        let mut frame = MessageFrame::new();
        let err = frame
            .fetch_response(&mut conn, &[FieldTag::Int])
            .unwrap_err();

        match err {
            ClientError::Server(server_err) => {
                let pairs: Vec<_> = server_err
                    .exceptions()
                    .iter()
                    .map(|e| (e.class.as_str(), e.message.as_str()))
                    .collect();
                assert_eq!(
                    pairs,
                    vec![
                        (
                            "com.orientechnologies.OStorageException",
                            "db is locked"
                        ),
                        ("java.io.IOException", "file busy"),
                    ]
                );
                assert_eq!(server_err.stack_trace(), &[0xDE, 0xAD]);
            }
            other => panic!("expected server error, got {other:?}"),
        }

        conn.close();
        server.finish();
    }

    #[test]
    fn test_error_frame_has_no_stack_trace_on_old_protocols() {
        let mut response = vec![1u8];
        testutil::push_fields(&mut response, &[Field::Int(-1)]);
        testutil::push_fields(
            &mut response,
            &[
                Field::Boolean(true),
                Field::string("OCommandSQLParsingException"),
                Field::string("bad syntax"),
                Field::Boolean(false),
                // no serialized exception on protocol 18
            ],
        );

        let server = MockServer::start(18, response);
        let mut conn = Connection::new(server.config());
        conn.connect().unwrap();

        let mut frame = MessageFrame::new();
        let err = frame.read_header(&mut conn).unwrap_err();
        match err {
            ClientError::Server(server_err) => {
                assert_eq!(server_err.class(), Some("OCommandSQLParsingException"));
                assert!(server_err.stack_trace().is_empty());
            }
            other => panic!("expected server error, got {other:?}"),
        }

        conn.close();
        server.finish();
    }

    #[test]
    fn test_truncated_response_is_a_framing_error() {
        // header promises an int that never arrives
        let response = vec![0u8, 0, 0, 0, 1];
        let server = MockServer::start(24, response);
        let mut conn = Connection::new(server.config());
        conn.connect().unwrap();

        let mut frame = MessageFrame::new();
        let err = frame
            .fetch_response(&mut conn, &[FieldTag::Long])
            .unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));

        conn.close();
        server.finish();
    }
}
