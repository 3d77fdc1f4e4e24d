//! Unified error types for the ampsense firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level setup and loop error handling uniform. Variants are cheap to
//! pass across task boundaries; only config/init errors are fatal.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// Peripheral initialisation failed (ADC, UART, GPIO).
    Init(&'static str),
    /// Network / pub-sub transport failure.
    Net(NetError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Net(e) => write!(f, "net: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Network / transport errors
// ---------------------------------------------------------------------------

/// Errors raised by the pub-sub client and its transport.
///
/// `Busy` covers the transient OS-level codes (in-progress, timed-out,
/// would-block) that the connect and read paths tolerate rather than
/// treat as connection loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// Transient socket condition; retry the operation or ignore this tick.
    Busy,
    /// The peer closed the stream (empty read). Fatal to this connection.
    PeerClosed,
    /// The broker's handshake acknowledgement was malformed or carried a
    /// non-zero return code.
    BadHandshake(u8),
    /// Requested QoS level is not supported (only 0 and 1 are).
    QosUnsupported(u8),
    /// An inbound frame could not be decoded.
    BadFrame,
    /// Any other socket-level failure. Triggers reconnect.
    Io,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "transient socket busy"),
            Self::PeerClosed => write!(f, "peer closed connection"),
            Self::BadHandshake(rc) => write!(f, "handshake rejected (rc={rc})"),
            Self::QosUnsupported(q) => write!(f, "qos {q} not supported (only 0 and 1)"),
            Self::BadFrame => write!(f, "malformed inbound frame"),
            Self::Io => write!(f, "socket I/O error"),
        }
    }
}

impl From<NetError> for Error {
    fn from(e: NetError) -> Self {
        Self::Net(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
