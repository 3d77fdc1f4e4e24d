//! Shared device state and the operation token.
//!
//! Cross-task coordination is lock-free where a reader only needs one
//! scalar: the active-operation token, the two deadlines and the
//! indicator flags are atomics. The channel table is the one piece of
//! compound state, guarded by a [`Mutex`] held only for the duration of
//! a read or a baseline update.
//!
//! The token is the mutual-exclusion mechanism for long-running
//! operations: calibration and a sampling session can never run
//! concurrently because both must win the Idle→op compare-exchange
//! before touching the channels.

use core::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::app::ports::AnalogChannel;
use crate::channel::Channel;
use crate::config::{AdcConfig, Tunables};

/// Lock that shrugs off poisoning: a panicked writer leaves the channel
/// table readable (baselines are plain values, never half-written).
pub fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Operation token ───────────────────────────────────────────

/// The long-running operation currently holding the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActiveOp {
    Idle = 0,
    Calibrating = 1,
    Sampling = 2,
}

impl ActiveOp {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Calibrating,
            2 => Self::Sampling,
            _ => Self::Idle,
        }
    }
}

// ── Indicator ─────────────────────────────────────────────────

/// Activity-LED request flags, written by operations and read by the
/// indicator task.
#[derive(Debug, Default)]
pub struct IndicatorState {
    active: AtomicBool,
    started_ticks: AtomicI64,
}

impl IndicatorState {
    pub fn start(&self, ticks_ms: i64) {
        self.started_ticks.store(ticks_ms, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    pub fn stop(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn started_ticks(&self) -> i64 {
        self.started_ticks.load(Ordering::Relaxed)
    }
}

// ── Shared state ──────────────────────────────────────────────

/// One channel paired with the ADC capability that reads it.
pub struct ChannelSlot<A> {
    pub channel: Channel,
    pub adc: A,
}

/// Everything the serial, button, indicator, operation and sampler
/// tasks share. Lives in an `Arc`; the sampler thread holds a clone.
pub struct SharedState<A> {
    pub channels: Mutex<Vec<ChannelSlot<A>>>,
    active_op: AtomicU8,
    /// Epoch second after which the sampler must exit. STOP rewinds
    /// this to "now" rather than signalling the thread directly.
    pub sampling_deadline_s: AtomicI64,
    /// Epoch second when calibration of the current channel completes.
    pub calib_deadline_s: AtomicI64,
    pub tunables: Tunables,
    /// Averaging window length, fixed at boot.
    pub avg_count: usize,
    pub indicator: IndicatorState,
}

impl<A: AnalogChannel> SharedState<A> {
    pub fn new(adc: &AdcConfig, slots: Vec<ChannelSlot<A>>) -> Self {
        Self {
            channels: Mutex::new(slots),
            active_op: AtomicU8::new(ActiveOp::Idle as u8),
            sampling_deadline_s: AtomicI64::new(0),
            calib_deadline_s: AtomicI64::new(0),
            tunables: Tunables::from_adc(adc),
            avg_count: adc.avg_count.max(1),
            indicator: IndicatorState::default(),
        }
    }

    /// Claim the device for `op`. Fails if any operation is in flight.
    pub fn try_begin(&self, op: ActiveOp) -> bool {
        self.active_op
            .compare_exchange(
                ActiveOp::Idle as u8,
                op as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Release the device. Only the holder of `op` calls this.
    pub fn end(&self, op: ActiveOp) {
        let _ = self.active_op.compare_exchange(
            op as u8,
            ActiveOp::Idle as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn current(&self) -> ActiveOp {
        ActiveOp::from_u8(self.active_op.load(Ordering::Acquire))
    }

    pub fn channel_count(&self) -> usize {
        lock(&self.channels).len()
    }
}

// ── Tests ─────────────────────────────────────────────────────
