//! The preemptive sampling session.
//!
//! Runs on its own core-pinned thread so a steady stream of `DATA`
//! records keeps flowing even while the cooperative executor is busy.
//! The dispatcher claims the Sampling token and sets the deadline
//! *before* spawning this; the session releases the token on exit.
//! Nothing signals the thread directly — STOP and calibration rewind
//! the deadline and wait.

use core::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::info;

use crate::app::ports::{AnalogChannel, Clock, CpuFreq, SerialPort};
use crate::app::state::{lock, ActiveOp, SharedState};
use crate::averaging::Bank;
use crate::protocol::{self, DataRecord};

/// Thread body for one sampling session.
pub fn run_session<A, S, C, P>(
    state: Arc<SharedState<A>>,
    serial: Arc<Mutex<S>>,
    clock: C,
    cpu: P,
) where
    A: AnalogChannel,
    S: SerialPort,
    C: Clock,
    P: CpuFreq,
{
    cpu.set_high();
    state.indicator.start(clock.ticks_ms());
    info!("Starting amperage sampling for all pins");
    lock(&serial).write_line(&protocol::render_session_start(clock.now_s()));

    let mut bank = Bank::new(state.channel_count(), state.avg_count);
    let start_ticks = clock.ticks_ms();
    while clock.now_s() < state.sampling_deadline_s.load(Ordering::Relaxed) {
        let mut rec = DataRecord::new();
        {
            let mut slots = lock(&state.channels);
            for (idx, slot) in slots.iter_mut().enumerate() {
                let ticks = clock.ticks_ms() - start_ticks;
                let raw = slot.adc.read_uv();
                let amps = slot.channel.amps(raw);
                let sample = bank.record(idx, amps);
                rec.push_channel(
                    &slot.channel.config.display_name(),
                    ticks,
                    amps,
                    &sample.trimmed,
                    sample.trimmed_mean,
                );
            }
        }
        lock(&serial).write_line(&rec.finish());
        thread::sleep(Duration::from_millis(u64::from(state.tunables.interval_ms())));
    }

    lock(&serial).write_line(&protocol::render_session_stop(clock.now_s()));
    info!("Stopping amperage sampling for all pins");
    state.end(ActiveOp::Sampling);
    state.indicator.stop();
    cpu.set_low();
}

// ── Tests ─────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::NoCpuFreq;
    use crate::app::state::ChannelSlot;
    use crate::channel::{Channel, ChannelConfig};
    use crate::config::DeviceConfig;
    use core::sync::atomic::AtomicI64;

    struct FixedAdc(i64);

    impl AnalogChannel for FixedAdc {
        fn read_uv(&mut self) -> i64 {
            self.0
        }
    }

    /// Clock whose wall-clock second advances on every query, letting a
    /// session run its loop a bounded number of times without sleeping
    /// for real seconds.
    #[derive(Clone, Default)]
    struct SteppingClock(Arc<AtomicI64>);

    impl Clock for SteppingClock {
        fn now_s(&self) -> i64 {
            self.0.fetch_add(1, Ordering::Relaxed)
        }

        fn ticks_ms(&self) -> i64 {
            self.0.load(Ordering::Relaxed) * 1000
        }
    }

    #[derive(Default)]
    struct MockSerial {
        written: Vec<String>,
    }

    impl SerialPort for MockSerial {
        fn poll_line(&mut self) -> Option<String> {
            None
        }

        fn write_line(&mut self, line: &str) {
            self.written.push(line.to_string());
        }
    }

    fn state(raw_uv: i64) -> Arc<SharedState<FixedAdc>> {
        let cfg = DeviceConfig::from_json(
            r#"{ "adc": { "interval": 1, "avg_count": 3,
                 "pins": [ { "pin": 34, "name": "pump", "baseline": 2450000 } ] } }"#,
        )
        .unwrap();
        let slots = cfg
            .adc
            .pins
            .iter()
            .map(|p| ChannelSlot {
                channel: Channel::with_baseline(ChannelConfig::from_pin(p), p.baseline),
                adc: FixedAdc(raw_uv),
            })
            .collect();
        Arc::new(SharedState::new(&cfg.adc, slots))
    }

    #[test]
    fn session_frames_data_between_start_and_stop() {
        let state = state(2_265_000);
        assert!(state.try_begin(ActiveOp::Sampling));
        state.sampling_deadline_s.store(6, Ordering::Relaxed);
        let serial = Arc::new(Mutex::new(MockSerial::default()));

        run_session(
            Arc::clone(&state),
            Arc::clone(&serial),
            SteppingClock::default(),
            NoCpuFreq,
        );

        let written = &lock(&serial).written;
        assert!(written.len() >= 3, "expected START, DATA.., STOP");
        assert!(written[0].starts_with("START:"));
        assert!(written.last().unwrap().starts_with("STOP:"));
        for line in &written[1..written.len() - 1] {
            assert!(line.starts_with("DATA:pump:"), "unexpected line {line}");
        }
        assert_eq!(state.current(), ActiveOp::Idle);
        assert!(!state.indicator.is_active());
    }

    #[test]
    fn expired_deadline_means_no_data_records() {
        let state = state(2_450_000);
        assert!(state.try_begin(ActiveOp::Sampling));
        state.sampling_deadline_s.store(0, Ordering::Relaxed);
        let serial = Arc::new(Mutex::new(MockSerial::default()));

        run_session(
            Arc::clone(&state),
            Arc::clone(&serial),
            SteppingClock::default(),
            NoCpuFreq,
        );

        let written = &lock(&serial).written;
        assert_eq!(written.len(), 2);
        assert!(written[0].starts_with("START:"));
        assert!(written[1].starts_with("STOP:"));
        assert_eq!(state.current(), ActiveOp::Idle);
    }
}
