//! Stream transport under the MQTT client.
//!
//! Error classification is the load-bearing part: transient socket
//! conditions (would-block, timed-out, interrupted, connect still in
//! progress) map to [`NetError::Busy`] so the client can tolerate them,
//! while an empty read maps to [`NetError::PeerClosed`], which is always
//! fatal to the connection.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;

use crate::error::NetError;

/// Byte-stream transport used by the MQTT client.
///
/// `read` never returns zero: an empty read is reported as
/// [`NetError::PeerClosed`].
pub trait NetTransport {
    fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<(), NetError>;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError>;
    fn write_all(&mut self, buf: &[u8]) -> Result<(), NetError>;
    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<(), NetError>;
    fn close(&mut self);
}

fn classify(e: &std::io::Error) -> NetError {
    match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => NetError::Busy,
        _ => NetError::Io,
    }
}

/// Plain TCP transport.
///
/// TLS wraps the stream here when `mqtt.config.ssl` is set; the client
/// above this seam is oblivious either way.
#[derive(Default)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self { stream: None }
    }

    fn stream(&mut self) -> Result<&mut TcpStream, NetError> {
        self.stream.as_mut().ok_or(NetError::Io)
    }
}

impl NetTransport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<(), NetError> {
        // Replace any previous socket wholesale.
        self.close();
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|_| NetError::Io)?
            .next()
            .ok_or(NetError::Io)?;
        debug!("connecting to {addr}");
        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| classify(&e))?;
        stream
            .set_read_timeout(Some(timeout))
            .map_err(|e| classify(&e))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        match self.stream()?.read(buf) {
            Ok(0) => Err(NetError::PeerClosed),
            Ok(n) => Ok(n),
            Err(e) => Err(classify(&e)),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), NetError> {
        self.stream()?.write_all(buf).map_err(|e| classify(&e))
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<(), NetError> {
        self.stream()?
            .set_nonblocking(nonblocking)
            .map_err(|e| classify(&e))
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("closing existing socket");
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────
