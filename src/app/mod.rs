//! Application core: device state, operations, and the task orchestrator.
//!
//! Everything in here is hardware-free. Adapters implement the port
//! traits in [`ports`] and the orchestrator wires them to the command
//! protocol and the measurement operations.

pub mod ops;
pub mod orchestrator;
pub mod ports;
pub mod sampler;
pub mod state;
pub mod status;
