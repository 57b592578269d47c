//! Blocking RESP2 driver over TCP.
//!
//! Frames are encoded and decoded with the `redis-protocol` codec against
//! in-memory buffers; socket I/O is plain `std::net`.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use redis_protocol::codec::Resp2;
use redis_protocol::resp2::types::BytesFrame;
use tokio_util::codec::{Decoder, Encoder};

use super::{Command, ConnectionFactory, RawConnection, Reply, StoreError};

/// Default connect, read and write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const READ_CHUNK: usize = 4096;

/// Dials RESP connections to one address.
#[derive(Clone)]
pub struct RespDialer {
    address: String,
    password: Option<String>,
    connect_timeout: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl RespDialer {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            password: None,
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Issue AUTH with this password after every dial. Empty means none.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_io_timeouts(mut self, read: Duration, write: Duration) -> Self {
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn connect(&self) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in self.address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "address resolved to nothing")
        }))
    }
}

impl std::fmt::Debug for RespDialer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RespDialer")
            .field("address", &self.address)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

impl ConnectionFactory for RespDialer {
    fn dial(&self) -> Result<Box<dyn RawConnection>, StoreError> {
        let stream = self.connect().map_err(|e| StoreError::Dial {
            address: self.address.clone(),
            source: Arc::new(e),
        })?;
        stream.set_read_timeout(Some(self.read_timeout))?;
        stream.set_write_timeout(Some(self.write_timeout))?;
        stream.set_nodelay(true)?;

        let mut conn = RespConnection::new(stream);
        if let Some(password) = &self.password {
            conn.execute(&Command::new("AUTH").arg(password))
                .map_err(|e| StoreError::Auth(e.to_string()))?;
        }

        tracing::debug!(address = %self.address, "Store connection established");
        Ok(Box::new(conn))
    }
}

/// A RESP2 connection over any blocking byte stream.
pub struct RespConnection<S = TcpStream> {
    stream: S,
    codec: Resp2,
    read_buf: BytesMut,
    write_buf: BytesMut,
    // Replies owed for commands sent but not yet received.
    pending: usize,
}

impl<S: Read + Write> RespConnection<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            codec: Resp2::default(),
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            write_buf: BytesMut::new(),
            pending: 0,
        }
    }

    fn encode(&mut self, command: &Command) -> Result<(), StoreError> {
        let frame = BytesFrame::Array(
            std::iter::once(command.name().as_bytes())
                .chain(command.args().iter().map(Vec::as_slice))
                .map(|part| BytesFrame::BulkString(Bytes::copy_from_slice(part)))
                .collect(),
        );
        self.codec
            .encode(frame, &mut self.write_buf)
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    fn read_frame(&mut self) -> Result<BytesFrame, StoreError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = self
                .codec
                .decode(&mut self.read_buf)
                .map_err(|e| StoreError::Protocol(e.to_string()))?
            {
                return Ok(frame);
            }
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return Err(StoreError::ConnectionClosed);
            }
            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }
}

impl<S: Read + Write + Send> RawConnection for RespConnection<S> {
    /// Flushes the command with anything already queued, then reads every
    /// owed reply. Returns this command's reply, or the first error among
    /// earlier pipelined replies. A stream failure while draining is
    /// returned at once.
    fn execute(&mut self, command: &Command) -> Result<Reply, StoreError> {
        self.send(command)?;
        self.flush()?;

        let mut first_err = None;
        while self.pending > 1 {
            match self.receive() {
                Ok(_) => {}
                Err(e @ StoreError::Server(_)) => {
                    first_err.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }
        let reply = self.receive();
        match first_err {
            Some(e) => Err(e),
            None => reply,
        }
    }

    fn send(&mut self, command: &Command) -> Result<(), StoreError> {
        self.encode(command)?;
        self.pending += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if !self.write_buf.is_empty() {
            self.stream.write_all(&self.write_buf)?;
            self.write_buf.clear();
        }
        self.stream.flush()?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Reply, StoreError> {
        let frame = match self.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                // Stream position is unknown; nothing more can be read reliably.
                self.pending = 0;
                return Err(e);
            }
        };
        self.pending = self.pending.saturating_sub(1);
        reply_from_frame(frame)
    }
}

fn reply_from_frame(frame: BytesFrame) -> Result<Reply, StoreError> {
    match frame {
        BytesFrame::SimpleString(s) => Ok(Reply::Status(String::from_utf8_lossy(&s).into_owned())),
        BytesFrame::Error(err) => Err(StoreError::Server(err.to_string())),
        BytesFrame::Integer(i) => Ok(Reply::Integer(i)),
        BytesFrame::BulkString(b) => Ok(Reply::Bulk(b.to_vec())),
        BytesFrame::Array(items) => items
            .into_iter()
            .map(reply_from_frame)
            .collect::<Result<Vec<_>, _>>()
            .map(Reply::Array),
        BytesFrame::Null => Ok(Reply::Nil),
    }
}
