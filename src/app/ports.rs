//! Port traits — the boundary between the measurement core and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Orchestrator / ops (domain)
//! ```
//!
//! Adapters (ESP-IDF peripherals on target, mocks and simulators on the
//! host) implement these traits. The domain consumes them via generics,
//! so none of the measurement or protocol logic touches hardware
//! directly and all of it runs in host tests.

// ───────────────────────────────────────────────────────────────
// Analog input (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One calibrated-attenuation ADC input, read in microvolts.
pub trait AnalogChannel {
    /// Raw reading in microvolts. Conversion noise is handled upstream
    /// by the averaging window, not here.
    fn read_uv(&mut self) -> i64;
}

// ───────────────────────────────────────────────────────────────
// Serial command/data port
// ───────────────────────────────────────────────────────────────

/// The line-oriented command and data interface (UART on target).
///
/// Writers share one port through a lock, so `write_line` must emit the
/// whole line in a single call. Implementations append exactly one
/// newline and swallow transport errors after logging them; the command
/// task never dies because a reply could not be sent.
pub trait SerialPort {
    /// Non-blocking: returns one complete received line (including its
    /// trailing newline) if one is pending.
    fn poll_line(&mut self) -> Option<String>;

    /// Write `line` plus a single trailing newline.
    fn write_line(&mut self, line: &str);
}

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Wall-clock and monotonic time queries.
pub trait Clock {
    /// Wall-clock seconds since the Unix epoch (NTP-synced on target).
    fn now_s(&self) -> i64;

    /// Monotonic milliseconds since boot.
    fn ticks_ms(&self) -> i64;
}

/// Cooperative sleep. Production delays go through the async reactor so
/// a sleeping task never blocks its peers; test doubles return
/// immediately and advance a mock clock instead.
pub trait Delay {
    async fn sleep_ms(&self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Operator controls
// ───────────────────────────────────────────────────────────────

/// The calibration push-button (active high).
pub trait Button {
    fn is_pressed(&mut self) -> bool;
}

/// The activity LED flashed during calibration and sampling.
pub trait Led {
    fn set(&mut self, on: bool);
}

/// CPU frequency scaling: full speed while measuring, minimum while idle.
pub trait CpuFreq {
    fn set_high(&self);
    fn set_low(&self);
}

// ───────────────────────────────────────────────────────────────
// Device runtime (per-device-variant seam)
// ───────────────────────────────────────────────────────────────

/// What a device variant plugs into the shared boot scaffolding: its
/// main entry point and its reaction to inbound pub-sub messages.
pub trait DeviceRuntime {
    /// Device main. Called once after network and pub-sub bring-up;
    /// expected not to return.
    fn run(&mut self);

    /// Handle one inbound message from a subscribed topic.
    fn on_message(&mut self, topic: &str, payload: &[u8]);
}

// ───────────────────────────────────────────────────────────────
// Absent-peripheral stand-ins
// ───────────────────────────────────────────────────────────────

/// Stand-in for boards without a calibration button.
#[derive(Clone, Copy)]
pub struct NoButton;

impl Button for NoButton {
    fn is_pressed(&mut self) -> bool {
        false
    }
}

/// Stand-in for boards without an activity LED.
#[derive(Clone, Copy)]
pub struct NoLed;

impl Led for NoLed {
    fn set(&mut self, _on: bool) {}
}

/// Stand-in used on hosts where frequency scaling does not apply.
#[derive(Clone, Copy)]
pub struct NoCpuFreq;

impl CpuFreq for NoCpuFreq {
    fn set_high(&self) {}
    fn set_low(&self) {}
}
