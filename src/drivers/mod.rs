//! Peripheral drivers and thread-placement helpers.

pub mod indicator;
pub mod init_button;
pub mod task_pin;
