//! Device configuration tree.
//!
//! Mirrors the JSON config file layout consumed at boot:
//! `network.{ssid,psk}`, `mqtt.{config,lwt,online,subscribe,retry}`,
//! `adc.{interval,timeout,baseline_time,avg_count,pins[]}`, `uart.{...}`,
//! `init_button.{button_pin,led_pin,debounce}`. Loading and persisting the
//! file itself is a boot-time collaborator; this module only defines the
//! shape, the defaults, and the parse entry point.
//!
//! Load-time configuration is immutable. The few values that the serial
//! `INTERVAL` command may overwrite at runtime live in [`Tunables`], a
//! separate atomics struct with single-writer / multi-reader discipline.

use core::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ── Defaults ──────────────────────────────────────────────────

pub const DEFAULT_INTERVAL_MS: u32 = 100;
pub const DEFAULT_TIMEOUT_S: u32 = 600;
pub const DEFAULT_BASELINE_TIME_S: u32 = 10;
pub const DEFAULT_AVG_COUNT: usize = 5;
pub const DEFAULT_DEBOUNCE_MS: u32 = 200;
pub const DEFAULT_MV_PER_AMP: u32 = 185;

fn default_interval() -> u32 {
    DEFAULT_INTERVAL_MS
}
fn default_timeout() -> u32 {
    DEFAULT_TIMEOUT_S
}
fn default_baseline_time() -> u32 {
    DEFAULT_BASELINE_TIME_S
}
fn default_avg_count() -> usize {
    DEFAULT_AVG_COUNT
}
fn default_debounce() -> u32 {
    DEFAULT_DEBOUNCE_MS
}
fn default_mv_per_amp() -> u32 {
    DEFAULT_MV_PER_AMP
}
fn default_mqtt_port() -> u16 {
    1883
}
fn default_keepalive() -> u16 {
    60
}
fn default_retry() -> u32 {
    3
}
fn default_baudrate() -> u32 {
    115_200
}
fn default_ntp_server() -> String {
    "0.us.pool.ntp.org".into()
}
fn default_timezone() -> i32 {
    -7
}
fn default_timezone_name() -> String {
    "MST".into()
}

// ── Top level ─────────────────────────────────────────────────

/// Root of the device configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub adc: AdcConfig,
    #[serde(default)]
    pub network: Option<NetworkConfig>,
    #[serde(default)]
    pub mqtt: Option<MqttSection>,
    #[serde(default)]
    pub uart: Option<UartConfig>,
    #[serde(default)]
    pub init_button: Option<InitButtonConfig>,
    #[serde(default = "default_ntp_server")]
    pub ntp_server: String,
    #[serde(default = "default_timezone")]
    pub timezone: i32,
    #[serde(default = "default_timezone_name")]
    pub timezone_name: String,
}

impl DeviceConfig {
    /// Parse the raw JSON config file contents.
    pub fn from_json(raw: &str) -> Result<Self> {
        let cfg: Self =
            serde_json::from_str(raw).map_err(|_| Error::Config("invalid config JSON"))?;
        if cfg.adc.pins.is_empty() {
            return Err(Error::Config("adc.pins must not be empty"));
        }
        Ok(cfg)
    }
}

/// Wireless association credentials (consumed by the boot collaborator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub ssid: String,
    pub psk: String,
}

// ── MQTT ──────────────────────────────────────────────────────

/// The full `mqtt` section: broker parameters plus the session bring-up
/// extras (last-will, online announcement, subscription list).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttSection {
    pub config: MqttConfig,
    #[serde(default)]
    pub lwt: Option<MqttMessage>,
    #[serde(default)]
    pub online: Option<MqttMessage>,
    #[serde(default)]
    pub subscribe: Vec<Subscription>,
    #[serde(default = "default_retry")]
    pub retry: u32,
}

/// Broker connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub server: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub client_id: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_keepalive")]
    pub keepalive: u16,
    #[serde(default)]
    pub ssl: bool,
    /// Passed through to the TLS wrapper verbatim (cert paths, server name).
    #[serde(default)]
    pub ssl_params: Option<serde_json::Value>,
}

/// A fixed topic/payload pair (used for last-will and the online message).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttMessage {
    pub topic: String,
    pub msg: String,
    #[serde(default)]
    pub retain: bool,
    #[serde(default)]
    pub qos: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub topic: String,
    #[serde(default)]
    pub qos: u8,
}

// ── ADC ───────────────────────────────────────────────────────

/// Analog sampling parameters and the per-pin channel list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdcConfig {
    /// Sampling interval in milliseconds.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Default sampling-session timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    /// Per-channel calibration duration in seconds.
    #[serde(default = "default_baseline_time")]
    pub baseline_time: u32,
    /// Averaging window length.
    #[serde(default = "default_avg_count")]
    pub avg_count: usize,
    pub pins: Vec<PinConfig>,
}

/// One current-sense input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinConfig {
    pub pin: i32,
    #[serde(default)]
    pub name: Option<String>,
    /// Input attenuation code: 0, 2.5, 6 or 11 (dB).
    #[serde(default)]
    pub atten: Option<f32>,
    /// Sensor scale factor in millivolts per ampere.
    #[serde(default = "default_mv_per_amp")]
    pub mv_per_a: u32,
    /// Persisted zero-load baseline in microvolts, if a previous
    /// calibration was saved.
    #[serde(default)]
    pub baseline: Option<i64>,
}

// ── UART / init button ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UartConfig {
    #[serde(default)]
    pub uart: Option<u32>,
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,
    #[serde(default)]
    pub tx: Option<i32>,
    #[serde(default)]
    pub rx: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitButtonConfig {
    #[serde(default)]
    pub button_pin: Option<i32>,
    #[serde(default)]
    pub led_pin: Option<i32>,
    #[serde(default = "default_debounce")]
    pub debounce: u32,
}

// ── Runtime-tunable settings ──────────────────────────────────

/// Settings the serial command task may overwrite at runtime (RAM only,
/// never persisted). Single writer (the command task), many readers;
/// each value is one scalar so torn reads are not possible.
#[derive(Debug)]
pub struct Tunables {
    interval_ms: AtomicU32,
    timeout_s: AtomicU32,
    baseline_time_s: AtomicU32,
}

impl Tunables {
    pub fn from_adc(adc: &AdcConfig) -> Self {
        Self {
            interval_ms: AtomicU32::new(adc.interval),
            timeout_s: AtomicU32::new(adc.timeout),
            baseline_time_s: AtomicU32::new(adc.baseline_time),
        }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms.load(Ordering::Relaxed)
    }

    pub fn set_interval_ms(&self, ms: u32) {
        self.interval_ms.store(ms, Ordering::Relaxed);
    }

    pub fn timeout_s(&self) -> u32 {
        self.timeout_s.load(Ordering::Relaxed)
    }

    pub fn baseline_time_s(&self) -> u32 {
        self.baseline_time_s.load(Ordering::Relaxed)
    }
}

// ── Tests ─────────────────────────────────────────────────────
