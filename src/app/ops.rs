//! Cooperative operations: calibration, stop requests, single reads.
//!
//! These run on the orchestrator's executor, one at a time, pulled off
//! the operation queue. The preemptive sampling session lives in
//! [`sampler`](crate::app::sampler); the only way an operation here
//! interacts with it is by rewinding its deadline and waiting for the
//! operation token to come back.

use core::sync::atomic::Ordering;
use std::sync::Mutex;

use log::{debug, info};

use crate::app::ports::{AnalogChannel, Clock, CpuFreq, Delay, SerialPort};
use crate::app::state::{lock, ActiveOp, SharedState};
use crate::averaging::BaselineAccumulator;
use crate::protocol::{self, DataRecord};

/// Zero-load calibration of every channel, sequentially.
///
/// A running sampling session is stopped first; a calibration already in
/// progress makes this request a no-op. Each channel accumulates raw
/// readings for `baseline_time` seconds at the sampling interval, and
/// its baseline becomes the integer mean of that run.
pub async fn calibrate<A, S, C, D, P>(
    state: &SharedState<A>,
    serial: &Mutex<S>,
    clock: &C,
    delay: &D,
    cpu: &P,
) where
    A: AnalogChannel,
    S: SerialPort,
    C: Clock,
    D: Delay,
    P: CpuFreq,
{
    if !state.try_begin(ActiveOp::Calibrating) {
        if state.current() == ActiveOp::Calibrating {
            debug!("calibration already in progress, ignoring request");
            return;
        }
        stop_sampling(state, serial, clock, delay).await;
        loop {
            if state.try_begin(ActiveOp::Calibrating) {
                break;
            }
            if state.current() == ActiveOp::Calibrating {
                return;
            }
            delay.sleep_ms(state.tunables.interval_ms()).await;
        }
    }

    state.indicator.start(clock.ticks_ms());
    cpu.set_high();
    debug!("baseline start");

    let baseline_time = state.tunables.baseline_time_s();
    let count = state.channel_count();
    for idx in 0..count {
        let deadline = clock.now_s() + i64::from(baseline_time);
        state.calib_deadline_s.store(deadline, Ordering::Relaxed);
        let name = lock(&state.channels)[idx].channel.config.display_name();
        info!("Starting baseline run for {baseline_time} seconds on {name}");

        let mut acc = BaselineAccumulator::new();
        while clock.now_s() < deadline {
            {
                let mut slots = lock(&state.channels);
                acc.push(slots[idx].adc.read_uv());
            }
            delay.sleep_ms(state.tunables.interval_ms()).await;
        }
        if let Some(baseline) = acc.mean() {
            lock(&state.channels)[idx].channel.baseline_uv = Some(baseline);
            info!("{name} baseline is {baseline}");
        }
    }

    state.end(ActiveOp::Calibrating);
    state.indicator.stop();
    cpu.set_low();
}

/// Ask a running session to stop by rewinding its deadline to now.
///
/// Silent when nothing is sampling. If the sampler still holds the
/// token after twice the sampling interval, an error line is written so
/// the operator knows the session did not halt.
pub async fn stop_sampling<A, S, C, D>(
    state: &SharedState<A>,
    serial: &Mutex<S>,
    clock: &C,
    delay: &D,
) where
    A: AnalogChannel,
    S: SerialPort,
    C: Clock,
    D: Delay,
{
    if state.current() != ActiveOp::Sampling {
        return;
    }
    info!("Stop of sampling requested");
    state
        .sampling_deadline_s
        .store(clock.now_s(), Ordering::Relaxed);
    delay
        .sleep_ms(state.tunables.interval_ms().saturating_mul(2))
        .await;
    if state.current() == ActiveOp::Sampling {
        lock(serial).write_line(protocol::ERR_UNABLE_TO_STOP);
    }
}

/// One averaged reading of every channel, reported as a single `DATA`
/// line carrying the full (untrimmed) window and its plain mean.
pub async fn single_read<A, S, C, D>(
    state: &SharedState<A>,
    serial: &Mutex<S>,
    clock: &C,
    delay: &D,
) where
    A: AnalogChannel,
    S: SerialPort,
    C: Clock,
    D: Delay,
{
    debug!("Starting single read");
    let n = state.avg_count;
    let count = state.channel_count();
    if count == 0 {
        return;
    }

    let mut windows = vec![vec![0.0f64; n]; count];
    let mut last_amps = vec![0.0f64; count];
    let mut last_ticks = vec![0i64; count];
    let start_ticks = clock.ticks_ms();

    for i in 0..n {
        {
            let mut slots = lock(&state.channels);
            for (idx, slot) in slots.iter_mut().enumerate() {
                let ticks = clock.ticks_ms() - start_ticks;
                let raw = slot.adc.read_uv();
                let amps = slot.channel.amps(raw);
                windows[idx][i] = amps;
                last_amps[idx] = amps;
                last_ticks[idx] = ticks;
            }
        }
        delay.sleep_ms(state.tunables.interval_ms()).await;
    }

    let mut rec = DataRecord::new();
    {
        let slots = lock(&state.channels);
        for (idx, slot) in slots.iter().enumerate() {
            let mean = windows[idx].iter().sum::<f64>() / n as f64;
            rec.push_channel(
                &slot.channel.config.display_name(),
                last_ticks[idx],
                last_amps[idx],
                &windows[idx],
                mean,
            );
        }
    }
    lock(serial).write_line(&rec.finish());
}

// ── Tests ─────────────────────────────────────────────────────
