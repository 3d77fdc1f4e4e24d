//! Task orchestrator — the cooperative half of the runtime.
//!
//! Runs in a dedicated thread using `edge-executor` for cooperative
//! multi-task scheduling and `async-io-mini` for reactor-driven timers.
//! Always-on tasks:
//!
//! 1. **Serial** — polls the command port every 100ms (fixed; the
//!    tunable interval only paces measurements)
//! 2. **Operations** — drains the operation queue one request at a time,
//!    so calibration, stop and single reads never interleave
//! 3. **Button** — samples the calibration button at the debounce
//!    period, firing on the rising edge
//! 4. **Indicator** — drives the activity LED at a fixed flash rate,
//!    bounded so a stuck operation cannot flash forever
//!
//! `CMD:START` is the one escape hatch out of cooperative land: the
//! dispatcher claims the Sampling token and hands the session to a
//! core-pinned preemptive thread.

use core::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel as MsgChannel;
use log::{debug, info, warn};

use crate::app::ops::{calibrate, single_read, stop_sampling};
use crate::app::ports::{AnalogChannel, Button, Clock, CpuFreq, Delay, Led, SerialPort};
use crate::app::sampler;
use crate::app::state::{lock, ActiveOp, SharedState};
use crate::app::status::derive_status;
use crate::drivers::task_pin::{self, Core, TaskSpec};
use crate::protocol::{self, Command, ConfigChannel};

/// Fixed command-port poll period. Unrelated to the sampling interval.
pub const SERIAL_POLL_MS: u32 = 100;

/// Activity-LED half-period.
const FLASH_MS: u32 = 500;

/// Longest a single operation may keep the LED flashing.
const FLASH_LIMIT_MS: i64 = 60_000;

const SAMPLER_PRIORITY: u8 = 15;
const SAMPLER_STACK_KB: usize = 8;

/// A queued long-running request. START is not queued; it spawns the
/// preemptive session directly from the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpRequest {
    Calibrate,
    Stop,
    SingleRead,
}

/// Requests flow serial/button task → operations task through here.
pub type OpQueue = MsgChannel<CriticalSectionRawMutex, OpRequest, 4>;

pub struct Orchestrator<A, S, C, D, P> {
    state: Arc<SharedState<A>>,
    serial: Arc<Mutex<S>>,
    clock: C,
    delay: D,
    cpu: P,
}

impl<A, S, C, D, P> Orchestrator<A, S, C, D, P>
where
    A: AnalogChannel + Send + 'static,
    S: SerialPort + Send + 'static,
    C: Clock + Clone + Send + 'static,
    D: Delay,
    P: CpuFreq + Clone + Send + 'static,
{
    pub fn new(
        state: Arc<SharedState<A>>,
        serial: Arc<Mutex<S>>,
        clock: C,
        delay: D,
        cpu: P,
    ) -> Self {
        Self {
            state,
            serial,
            clock,
            delay,
            cpu,
        }
    }

    /// Spawn every cooperative task and drive them forever.
    pub fn run<B, L>(&self, queue: &OpQueue, button: Option<(B, u32)>, led: Option<L>)
    where
        B: Button + 'static,
        L: Led + 'static,
    {
        let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();

        executor.spawn(self.serial_loop(queue)).detach();
        executor.spawn(self.ops_loop(queue)).detach();
        if let Some((btn, debounce_ms)) = button {
            executor.spawn(self.button_loop(btn, debounce_ms, queue)).detach();
        }
        if let Some(led) = led {
            executor.spawn(self.indicator_loop(led)).detach();
        }

        info!("orchestrator started ({}ms serial poll)", SERIAL_POLL_MS);
        futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
    }

    /// Command task: one received line handled per poll tick.
    pub async fn serial_loop(&self, queue: &OpQueue) {
        loop {
            let line = lock(&self.serial).poll_line();
            if let Some(raw) = line {
                debug!("RECEIVED: {}", raw.trim_end_matches('\n'));
                self.dispatch(&raw, queue).await;
            }
            self.delay.sleep_ms(SERIAL_POLL_MS).await;
        }
    }

    /// Operations task: executes queued requests strictly in order.
    pub async fn ops_loop(&self, queue: &OpQueue) {
        loop {
            match queue.receive().await {
                OpRequest::Calibrate => {
                    calibrate(&self.state, &self.serial, &self.clock, &self.delay, &self.cpu)
                        .await;
                }
                OpRequest::Stop => {
                    stop_sampling(&self.state, &self.serial, &self.clock, &self.delay).await;
                }
                OpRequest::SingleRead => {
                    single_read(&self.state, &self.serial, &self.clock, &self.delay).await;
                }
            }
        }
    }

    /// Button task: rising edge queues a calibration.
    pub async fn button_loop<B: Button>(&self, mut button: B, debounce_ms: u32, queue: &OpQueue) {
        info!("Starting button loop ({}ms debounce)", debounce_ms);
        let mut last = button.is_pressed();
        loop {
            let pressed = button.is_pressed();
            if pressed != last {
                last = pressed;
                if pressed {
                    info!("Init button press identified, queueing calibration");
                    queue.send(OpRequest::Calibrate).await;
                }
            }
            self.delay.sleep_ms(debounce_ms).await;
        }
    }

    /// Indicator task: flashes while an operation asks for it, with a
    /// hard time bound per operation.
    pub async fn indicator_loop<L: Led>(&self, mut led: L) {
        let mut lit = false;
        loop {
            let flashing = self.state.indicator.is_active()
                && self.clock.ticks_ms() - self.state.indicator.started_ticks() < FLASH_LIMIT_MS;
            if flashing {
                lit = !lit;
                led.set(lit);
            } else if lit {
                lit = false;
                led.set(false);
            }
            self.delay.sleep_ms(FLASH_MS).await;
        }
    }

    pub async fn dispatch(&self, raw: &str, queue: &OpQueue) {
        match protocol::parse_line(raw) {
            Err(protocol::Malformed) => {
                warn!("Unknown command: {}", raw.trim_end_matches('\n'));
                lock(&self.serial).write_line(&protocol::render_unknown(raw));
            }
            Ok(cmd) => match cmd {
                Command::List => {
                    let mut serial = lock(&self.serial);
                    for line in protocol::COMMAND_LIST {
                        serial.write_line(line);
                    }
                }
                Command::Status => {
                    let report = derive_status(&self.state, self.clock.now_s());
                    lock(&self.serial).write_line(&protocol::render_status(&report));
                }
                Command::Config => {
                    let line = self.render_config();
                    lock(&self.serial).write_line(&line);
                }
                Command::Interval(Some(ms)) => {
                    debug!("Setting sampling interval to {ms}ms (RAM only)");
                    self.state.tunables.set_interval_ms(ms);
                }
                Command::Interval(None) => {}
                Command::Start(timeout_s) => self.start_session(timeout_s),
                Command::Stop => queue.send(OpRequest::Stop).await,
                Command::One => queue.send(OpRequest::SingleRead).await,
                Command::Init => queue.send(OpRequest::Calibrate).await,
            },
        }
    }

    fn render_config(&self) -> String {
        let channels: Vec<ConfigChannel> = lock(&self.state.channels)
            .iter()
            .map(|slot| ConfigChannel {
                pin: slot.channel.config.pin,
                name: slot.channel.config.name.clone(),
                baseline_uv: slot.channel.baseline_uv,
            })
            .collect();
        protocol::render_config(
            self.state.tunables.interval_ms(),
            self.state.tunables.timeout_s(),
            self.state.tunables.baseline_time_s(),
            &channels,
        )
    }

    /// Claim the Sampling token and hand the session to its own thread.
    /// A START while any operation is in flight is a silent no-op.
    fn start_session(&self, timeout_s: Option<u32>) {
        if !self.state.try_begin(ActiveOp::Sampling) {
            debug!("START ignored, an operation is already running");
            return;
        }
        let timeout_s = timeout_s.unwrap_or_else(|| self.state.tunables.timeout_s());
        self.state
            .sampling_deadline_s
            .store(self.clock.now_s() + i64::from(timeout_s), Ordering::Relaxed);

        let state = Arc::clone(&self.state);
        let serial = Arc::clone(&self.serial);
        let clock = self.clock.clone();
        let cpu = self.cpu.clone();
        // Detached: the session releases the token itself on exit.
        let _ = task_pin::spawn(
            TaskSpec {
                core: Core::App,
                priority: SAMPLER_PRIORITY,
                stack_kb: SAMPLER_STACK_KB,
                name: "sampler\0",
            },
            move || sampler::run_session(state, serial, clock, cpu),
        );
    }
}
