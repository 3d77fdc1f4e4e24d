//! Fault-tolerant MQTT 3.1.1 client.
//!
//! Split at the transport seam: [`transport::NetTransport`] hides the
//! socket so the client's framing and retry logic runs unchanged against
//! a mock in host tests. TLS, when enabled in config, wraps the stream
//! inside the transport and the client never knows.
//!
//! The retry policy is deliberately stubborn: `reconnect()` never gives
//! up and `publish()` never drops a message. Callers that cannot afford
//! to block keep the client on its own thread.

pub mod client;
pub mod transport;

pub use client::{MessageHandler, MqttClient, RuntimeHandler};
pub use transport::{NetTransport, TcpTransport};
