//! Scripted single-connection server for exchange-level tests.

use crate::connection::ConnectionConfig;
use bytes::BytesMut;
use ograph_protocol::field::Field;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};

/// Accepts one connection, greets with the protocol handshake short,
/// writes a canned response stream, then records everything the client
/// sends until it closes.
pub(crate) struct MockServer {
    addr: SocketAddr,
    handle: JoinHandle<Vec<u8>>,
}

impl MockServer {
    pub fn start(protocol: i16, response: Vec<u8>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(&protocol.to_be_bytes()).unwrap();
            sock.write_all(&response).unwrap();
            // half-close so a client reading past the script sees EOF
            let _ = sock.shutdown(Shutdown::Write);

            let mut captured = Vec::new();
            let _ = sock.read_to_end(&mut captured);
            captured
        });

        Self { addr, handle }
    }

    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.addr.ip().to_string()).with_port(self.addr.port())
    }

    /// Joins the server thread, returning the captured request bytes.
    /// Call after the client connection is closed.
    pub fn finish(self) -> Vec<u8> {
        self.handle.join().unwrap()
    }
}

/// Appends the wire form of `fields` to `out`.
pub(crate) fn push_fields(out: &mut Vec<u8>, fields: &[Field]) {
    let mut buf = BytesMut::new();
    for field in fields {
        field.encode(&mut buf);
    }
    out.extend_from_slice(&buf);
}

/// A success response header echoing `session_id`.
pub(crate) fn ok_header(session_id: i32) -> Vec<u8> {
    let mut out = vec![0u8];
    push_fields(&mut out, &[Field::Int(session_id)]);
    out
}
