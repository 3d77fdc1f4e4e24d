//! Clock and delay adapters.
//!
//! Two time bases: wall-clock seconds (epoch, set by SNTP at boot) for
//! session deadlines and START/STOP stamps, and a monotonic millisecond
//! tick for per-record timing. On the host both derive from std.

use crate::app::ports::{Clock, Delay};

use async_io_mini::Timer;

/// Device clock. `Clone` so every task can carry its own copy.
#[derive(Clone)]
pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    origin: std::time::Instant,
}

impl SystemClock {
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        Self {}
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl Clock for SystemClock {
    fn now_s(&self) -> i64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: plain libc gettimeofday into a local.
        unsafe {
            esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut());
        }
        tv.tv_sec as i64
    }

    fn ticks_ms(&self) -> i64 {
        // SAFETY: esp_timer is started by the runtime before main.
        unsafe { esp_idf_svc::sys::esp_timer_get_time() / 1000 }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Clock for SystemClock {
    fn now_s(&self) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn ticks_ms(&self) -> i64 {
        self.origin.elapsed().as_millis() as i64
    }
}

/// Render an epoch timestamp as `YYYY-MM-DD HH:MM:SS TZ` with a fixed
/// hour offset. Used for the boot banner; log lines carry their own
/// timestamps.
pub fn local_time_string(epoch_s: i64, tz_offset_hours: i32, tz_name: &str) -> String {
    let shifted = epoch_s + i64::from(tz_offset_hours) * 3600;
    let days = shifted.div_euclid(86_400);
    let secs = shifted.rem_euclid(86_400);
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);

    // Civil-from-days (proleptic Gregorian).
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let mon = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if mon <= 2 { y + 1 } else { y };

    format!("{y}-{mon}-{d} {h:02}:{m:02}:{s:02} {tz_name}")
}

/// Delay via the async-io reactor; yields the executor instead of
/// blocking its thread.
#[derive(Clone, Copy, Default)]
pub struct ReactorDelay;

impl Delay for ReactorDelay {
    async fn sleep_ms(&self, ms: u32) {
        Timer::after(core::time::Duration::from_millis(u64::from(ms))).await;
    }
}
