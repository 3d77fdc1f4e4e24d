//! Serial line protocol: `CMD:` request parsing and response rendering.
//!
//! Requests are single lines. A line is only considered a command when it
//! is at least [`MIN_COMMAND_LEN`] bytes, starts with `CMD:` and ends with
//! a newline; anything else is answered with an `ERROR:Unknown Command`
//! line echoing the offending input. Colons separate fields everywhere,
//! so channel names must not contain one.
//!
//! Rendering lives here too so every task that writes to the serial port
//! produces byte-identical framing. Lines are rendered without a trailing
//! newline; the serial writer appends exactly one.

use core::fmt::Write as _;

/// Shortest valid request on the wire (`CMD:ONE` plus newline).
pub const MIN_COMMAND_LEN: usize = 8;

/// Written when a STOP request failed to halt the sampler in time.
pub const ERR_UNABLE_TO_STOP: &str = "ERROR:unable to stop sampling";

/// Help text returned by `CMD:LIST`, one line per supported command.
pub const COMMAND_LIST: [&str; 7] = [
    "CMD:INIT\\n - Initialize the ADC based ammeter.  Ammeter should have NO LOAD to zeroize the reading.",
    "CMD:INTERVAL:{ms}\\n - Set a sampling interval in milliseconds for a pin (RAM only, does not update config file).",
    "CMD:START[:{timeout}]\\n - Start the sampling.  Timeout is 600 seconds if none is provided.",
    "CMD:STOP\\n - Stop the sampling.",
    "CMD:ONE\\n - Make a single reading and return the result.",
    "CMD:STATUS\\n - Return the current status",
    "CMD:CONFIG\\n - Return the current configuration in the following: CONFIG:{interval}:{pin}:{name}[:{pin}:{name}...]",
];

// ── Parsing ───────────────────────────────────────────────────

/// A decoded serial request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    List,
    Init,
    Status,
    Config,
    /// New sampling interval in milliseconds. `None` when the argument
    /// was omitted, which is accepted and does nothing.
    Interval(Option<u32>),
    /// Optional session timeout in seconds.
    Start(Option<u32>),
    Stop,
    One,
}

/// The line was not a well-formed command. The dispatcher answers these
/// uniformly, echoing the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Malformed;

/// Decode one raw line (including its trailing newline) into a [`Command`].
pub fn parse_line(raw: &str) -> Result<Command, Malformed> {
    if raw.len() < MIN_COMMAND_LEN || !raw.starts_with("CMD:") || !raw.ends_with('\n') {
        return Err(Malformed);
    }
    let mut parts = raw.split(':');
    let _prefix = parts.next();
    let Some(keyword) = parts.next() else {
        return Err(Malformed);
    };
    let arg = parts.next().map(|a| a.trim_end_matches('\n'));

    match keyword.trim_end_matches('\n') {
        "LIST" => Ok(Command::List),
        "INIT" => Ok(Command::Init),
        "STATUS" => Ok(Command::Status),
        "CONFIG" => Ok(Command::Config),
        "STOP" => Ok(Command::Stop),
        "ONE" => Ok(Command::One),
        "INTERVAL" => parse_arg(arg).map(Command::Interval),
        "START" => parse_arg(arg).map(Command::Start),
        _ => Err(Malformed),
    }
}

/// A missing argument is fine; a present but non-numeric one is not.
fn parse_arg(arg: Option<&str>) -> Result<Option<u32>, Malformed> {
    match arg {
        None => Ok(None),
        Some(a) => a.parse::<u32>().map(Some).map_err(|_| Malformed),
    }
}

// ── Rendering ─────────────────────────────────────────────────

/// Device lifecycle state as reported by `CMD:STATUS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    /// At least one channel has never been calibrated; names the first.
    NoInit { channel: String },
    /// Calibration in progress, with seconds left on the current channel.
    Initializing { remaining_s: i64 },
    Ready,
    /// Sampling in progress, with seconds until the session deadline.
    Running { remaining_s: i64 },
}

pub fn render_status(report: &StatusReport) -> String {
    match report {
        StatusReport::NoInit { channel } => format!("STATUS:NOINIT:{channel}"),
        StatusReport::Initializing { remaining_s } => {
            format!("STATUS:INITIALIZING:{remaining_s}")
        }
        StatusReport::Ready => "STATUS:READY:0".to_string(),
        StatusReport::Running { remaining_s } => format!("STATUS:RUNNING:{remaining_s}"),
    }
}

/// One channel's fields in the `CMD:CONFIG` reply.
#[derive(Debug, Clone)]
pub struct ConfigChannel {
    pub pin: i32,
    pub name: Option<String>,
    pub baseline_uv: Option<i64>,
}

/// `CONFIG:{interval}:{timeout}:{baseline_time}` followed by
/// `:{pin}:{name}:{baseline}` per channel. Unnamed channels report
/// `n/a`; uncalibrated ones report a zero baseline.
pub fn render_config(
    interval_ms: u32,
    timeout_s: u32,
    baseline_time_s: u32,
    channels: &[ConfigChannel],
) -> String {
    let mut line = format!("CONFIG:{interval_ms}:{timeout_s}:{baseline_time_s}");
    for ch in channels {
        let name = ch.name.as_deref().unwrap_or("n/a");
        let baseline = ch.baseline_uv.unwrap_or(0);
        let _ = write!(line, ":{}:{}:{}", ch.pin, name, baseline);
    }
    line
}

pub fn render_session_start(epoch_s: i64) -> String {
    format!("START:{epoch_s}")
}

pub fn render_session_stop(epoch_s: i64) -> String {
    format!("STOP:{epoch_s}")
}

/// `ERROR:Unknown Command <input>` with the input's newline stripped.
pub fn render_unknown(raw: &str) -> String {
    format!("ERROR:Unknown Command {}", raw.trim_end_matches('\n'))
}

/// Builder for a `DATA` record, one field group per channel:
/// `DATA:{name}:{ticks}:{amps}:{window}:{mean}` repeated.
#[derive(Debug)]
pub struct DataRecord {
    line: String,
}

impl DataRecord {
    pub fn new() -> Self {
        Self {
            line: "DATA".to_string(),
        }
    }

    pub fn push_channel(&mut self, name: &str, ticks_ms: i64, amps: f64, window: &[f64], mean: f64) {
        let _ = write!(
            self.line,
            ":{}:{}:{}:{}:{}",
            name,
            ticks_ms,
            fmt_amps(amps),
            fmt_window(window),
            fmt_amps(mean)
        );
    }

    pub fn finish(self) -> String {
        self.line
    }
}

impl Default for DataRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// `[a, b, c]` with the same float formatting as the scalar fields.
fn fmt_window(window: &[f64]) -> String {
    let mut out = String::from("[");
    for (i, v) in window.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", fmt_amps(*v));
    }
    out.push(']');
    out
}

/// Whole-number readings keep one decimal place so `0` renders as `0.0`,
/// matching what downstream log parsers already expect.
fn fmt_amps(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

// ── Tests ─────────────────────────────────────────────────────
