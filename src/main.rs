//! Ampsense firmware — device entry point.
//!
//! Boot order mirrors the runtime layering:
//!
//! 1. ESP-IDF bootstrap (link patches, logger)
//! 2. Config file from the SPIFFS partition
//! 3. Peripherals: ADC channels (exit 1 on failure), UART (exit 2)
//! 4. WiFi association + SNTP sync (blocking)
//! 5. Pub-sub session bring-up + its service thread on the protocol core
//! 6. The cooperative orchestrator on the main thread, forever

#![deny(unused_must_use)]

#[cfg(target_os = "espidf")]
mod device {
    use std::sync::{Arc, Mutex};

    use anyhow::{Context, Result};
    use log::{error, info, warn};

    use ampsense::adapters::hardware::{AdcReader, EspAdcChannel, EspUartSerial};
    use ampsense::adapters::net;
    use ampsense::adapters::power::PmCpuFreq;
    use ampsense::adapters::time::{local_time_string, ReactorDelay, SystemClock};
    use ampsense::app::orchestrator::{OpQueue, Orchestrator};
    use ampsense::app::ports::{Clock, CpuFreq, DeviceRuntime};
    use ampsense::app::state::{ChannelSlot, SharedState};
    use ampsense::channel::{Channel, ChannelConfig};
    use ampsense::config::{DeviceConfig, UartConfig, DEFAULT_DEBOUNCE_MS};
    use ampsense::drivers::indicator::GpioLed;
    use ampsense::drivers::init_button::GpioButton;
    use ampsense::drivers::task_pin::{self, Core, TaskSpec};
    use ampsense::mqtt::{MqttClient, RuntimeHandler, TcpTransport};

    const CONFIG_PATH: &str = "/spiffs/config.json";
    const PUBSUB_PRIORITY: u8 = 5;
    const PUBSUB_STACK_KB: usize = 8;
    const PUBSUB_POLL_S: u32 = 1;

    static OP_QUEUE: OpQueue = OpQueue::new();

    /// The ammeter variant behind the shared boot scaffolding: its main
    /// loop is the orchestrator; inbound pub-sub messages are logged
    /// (no remote commands are defined for this device).
    struct AmmeterRuntime {
        state: Arc<SharedState<EspAdcChannel>>,
        serial: Arc<Mutex<EspUartSerial>>,
        clock: SystemClock,
        cpu: PmCpuFreq,
        button: Option<(GpioButton, u32)>,
        led: Option<GpioLed>,
    }

    impl AmmeterRuntime {
        /// A peripheral-free handle for the pub-sub service thread.
        fn link(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                serial: Arc::clone(&self.serial),
                clock: self.clock.clone(),
                cpu: self.cpu,
                button: None,
                led: None,
            }
        }
    }

    impl DeviceRuntime for AmmeterRuntime {
        fn run(&mut self) {
            let orch = Orchestrator::new(
                Arc::clone(&self.state),
                Arc::clone(&self.serial),
                self.clock.clone(),
                ReactorDelay,
                self.cpu,
            );
            orch.run(&OP_QUEUE, self.button.take(), self.led.take());
        }

        fn on_message(&mut self, topic: &str, payload: &[u8]) {
            info!(
                "Message Received: {topic}, {}",
                String::from_utf8_lossy(payload)
            );
        }
    }

    fn load_config() -> Result<DeviceConfig> {
        let spiffs_cfg = esp_idf_svc::sys::esp_vfs_spiffs_conf_t {
            base_path: c"/spiffs".as_ptr(),
            partition_label: core::ptr::null(),
            max_files: 4,
            format_if_mount_failed: false,
        };
        // SAFETY: one-shot VFS registration from the boot path.
        let ret = unsafe { esp_idf_svc::sys::esp_vfs_spiffs_register(&spiffs_cfg) };
        anyhow::ensure!(
            ret == esp_idf_svc::sys::ESP_OK as i32,
            "SPIFFS mount failed: {ret}"
        );
        let raw = std::fs::read_to_string(CONFIG_PATH)
            .with_context(|| format!("reading {CONFIG_PATH}"))?;
        Ok(DeviceConfig::from_json(&raw)?)
    }

    pub fn run() -> Result<()> {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;

        info!("Ampsense v{} booting", env!("CARGO_PKG_VERSION"));

        let config = load_config()?;
        let clock = SystemClock::new();
        let cpu = PmCpuFreq::new();
        // Full speed through setup, as the bootloader leaves it.
        cpu.set_high();

        let peripherals = esp_idf_svc::hal::peripherals::Peripherals::take()?;
        let sysloop = esp_idf_svc::eventloop::EspSystemEventLoop::take()?;
        let nvs = esp_idf_svc::nvs::EspDefaultNvsPartition::take()?;

        // ── ADC channels ──────────────────────────────────────
        info!("Starting sensors...");
        let reader = match AdcReader::new() {
            Ok(r) => r,
            Err(e) => {
                error!("Error configuring ADC: {e}");
                std::process::exit(1);
            }
        };
        let mut slots = Vec::with_capacity(config.adc.pins.len());
        for pin in &config.adc.pins {
            let chan_cfg = ChannelConfig::from_pin(pin);
            match reader.channel(pin.pin, chan_cfg.atten) {
                Ok(mut adc) => {
                    use ampsense::app::ports::AnalogChannel;
                    info!(
                        "Initial read for {}: {}",
                        chan_cfg.display_name(),
                        adc.read_uv() as f64 / 1000.0
                    );
                    slots.push(ChannelSlot {
                        channel: Channel::with_baseline(chan_cfg, pin.baseline),
                        adc,
                    });
                }
                Err(e) => {
                    error!("Error configuring ADC: {e}");
                    std::process::exit(1);
                }
            }
        }

        // ── UART command port ─────────────────────────────────
        let uart_cfg = config.uart.clone().unwrap_or(UartConfig {
            uart: None,
            baudrate: 115_200,
            tx: None,
            rx: None,
        });
        let serial = match EspUartSerial::new(&uart_cfg) {
            Ok(s) => s,
            Err(e) => {
                error!("Error configuring UART: {e}");
                std::process::exit(2);
            }
        };

        // ── Operator controls ─────────────────────────────────
        let mut button = None;
        let mut led = None;
        if let Some(btn_cfg) = &config.init_button {
            if let Some(pin) = btn_cfg.button_pin {
                match GpioButton::new(pin) {
                    Ok(b) => {
                        let debounce = if btn_cfg.debounce == 0 {
                            DEFAULT_DEBOUNCE_MS
                        } else {
                            btn_cfg.debounce
                        };
                        button = Some((b, debounce));
                    }
                    Err(e) => warn!("Init button unavailable: {e}"),
                }
            }
            if let Some(pin) = btn_cfg.led_pin {
                match GpioLed::new(pin) {
                    Ok(l) => led = Some(l),
                    Err(e) => warn!("Activity LED unavailable: {e}"),
                }
            }
        }

        // ── Network ───────────────────────────────────────────
        let net_stack = match &config.network {
            Some(net_cfg) => {
                let stack = net::bring_up(
                    net_cfg,
                    &config.ntp_server,
                    peripherals.modem,
                    sysloop,
                    nvs,
                )?;
                info!(
                    "Local time: {}",
                    local_time_string(clock.now_s(), config.timezone, &config.timezone_name)
                );
                Some(stack)
            }
            None => {
                warn!("No network configured; running standalone");
                None
            }
        };

        // ── Shared state + runtime ────────────────────────────
        let state = Arc::new(SharedState::new(&config.adc, slots));
        let serial = Arc::new(Mutex::new(serial));
        let mut runtime = AmmeterRuntime {
            state,
            serial,
            clock,
            cpu,
            button,
            led,
        };

        // ── Pub-sub session ───────────────────────────────────
        if let Some(section) = config.mqtt.as_ref().filter(|_| net_stack.is_some()) {
            let mut client = MqttClient::from_section(TcpTransport::new(), section);
            let mut handler = RuntimeHandler(&mut runtime);
            if let Err(e) = client.bring_up(section, &mut handler) {
                // The service thread will keep retrying; bring-up
                // failure is not fatal to the measurement core.
                warn!("Pub-sub bring-up failed: {e}");
            }
            let section = section.clone();
            let mut link = runtime.link();
            let _ = task_pin::spawn(
                TaskSpec {
                    core: Core::Pro,
                    priority: PUBSUB_PRIORITY,
                    stack_kb: PUBSUB_STACK_KB,
                    name: "pubsub\0",
                },
                move || {
                    let keepalive = u32::from(section.config.keepalive.max(2));
                    let mut since_ping: u32 = 0;
                    loop {
                        client.check_msg(&mut RuntimeHandler(&mut link));
                        std::thread::sleep(core::time::Duration::from_secs(u64::from(
                            PUBSUB_POLL_S,
                        )));
                        since_ping += PUBSUB_POLL_S;
                        if since_ping >= keepalive / 2 {
                            client.ping_with_retry(section.retry);
                            since_ping = 0;
                        }
                    }
                },
            );
        }

        // Idle clock until an operation raises it.
        cpu.set_low();

        info!("System ready. Entering orchestrator.");
        runtime.run();
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    device::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("ampsense: the device binary only targets espidf; use the library and its tests on the host");
}
