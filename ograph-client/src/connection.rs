//! Blocking TCP transport and connection lifecycle.

use crate::error::ClientError;
use crate::session::SessionState;
use ograph_protocol::{field, DEFAULT_PORT};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server host name or address.
    pub host: String,
    /// Port of the binary listener.
    pub port: u16,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Socket read timeout. None blocks indefinitely.
    pub read_timeout: Option<Duration>,
    /// Socket write timeout. None blocks indefinitely.
    pub write_timeout: Option<Duration>,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            write_timeout: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }
}

/// A connection to the server's binary listener.
///
/// Owns the socket and the [`SessionState`]. The exchange discipline is
/// strictly synchronous: at most one request/response pair is in flight,
/// which operation messages enforce by borrowing the connection mutably
/// for their whole exchange.
pub struct Connection {
    config: ConnectionConfig,
    stream: Option<TcpStream>,
    session: SessionState,
    closed: bool,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            stream: None,
            session: SessionState::new(),
            closed: false,
        }
    }

    /// Establishes the TCP connection and reads the protocol version short
    /// the server greets with. Idempotent while the connection is live;
    /// fails fast once the connection has been closed.
    pub fn connect(&mut self) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::ConnectionClosed);
        }
        if self.stream.is_some() {
            return Ok(());
        }

        tracing::debug!(
            host = %self.config.host,
            port = self.config.port,
            "connecting"
        );

        let addr = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::AddrNotAvailable, "host resolved to no address")
            })?;

        let stream = TcpStream::connect_timeout(&addr, self.config.connect_timeout)?;
        stream.set_nodelay(true).ok();
        stream.set_read_timeout(self.config.read_timeout)?;
        stream.set_write_timeout(self.config.write_timeout)?;
        self.stream = Some(stream);

        // the server greets with the highest protocol version it speaks
        let protocol = field::read_i16(&mut *self)?;
        self.session.protocol_version = protocol;

        tracing::debug!(protocol, "connected");
        Ok(())
    }

    /// Whether the TCP connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some() && !self.closed
    }

    /// Whether the connection has been closed for good.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    /// Writes one logical frame to the socket.
    pub(crate) fn write(&mut self, buf: &[u8]) -> Result<(), ClientError> {
        let stream = self.stream_mut()?;
        stream.write_all(buf)?;
        Ok(())
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, ClientError> {
        if self.closed {
            return Err(ClientError::ConnectionClosed);
        }
        self.stream.as_mut().ok_or(ClientError::NotConnected)
    }

    /// Closes the connection.
    ///
    /// Idempotent. The socket is released unconditionally, the open
    /// database and session binding are cleared, and the connection is
    /// terminally closed: any further use fails fast.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            tracing::debug!("connection closed");
        }
        self.session.database_opened = None;
        self.session.session_id = -1;
        self.closed = true;
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.stream {
            Some(stream) if !self.closed => stream.read(buf),
            _ => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection is not open",
            )),
        }
    }
}
