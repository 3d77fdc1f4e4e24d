//! Ampsense firmware library.
//!
//! Exposes the measurement core (protocol, averaging, orchestration,
//! pub-sub client) for integration testing and external inspection. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, so the whole core builds and tests on the host.

#![deny(unused_must_use)]

pub mod averaging;
pub mod channel;
pub mod config;
pub mod error;
pub mod mqtt;
pub mod protocol;

pub mod app;

// Hardware-facing modules; the actual implementations are guarded by
// cfg attributes inside, with simulation fallbacks for the host.
pub mod adapters;
pub mod drivers;
