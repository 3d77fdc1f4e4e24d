//! Hardware adapter — ADC channels and the UART command port.
//!
//! This is the only module that touches the measurement peripherals.
//!
//! - **`target_os = "espidf"`** — oneshot ADC reads through the
//!   calibration scheme (microvolt output), UART via the IDF driver.
//! - **all other targets** — atomic-injection simulation so the full
//!   stack runs in host tests.

use crate::app::ports::{AnalogChannel, SerialPort};
use crate::channel::Attenuation;
use crate::error::{Error, Result};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Line reassembly ───────────────────────────────────────────

/// Longest unterminated frame the port will hold. Real commands are
/// under 32 bytes; anything that fills this is noise.
const LINE_CAP: usize = 256;

/// Accumulates raw serial bytes and yields complete lines (newline
/// included, matching what the parser expects). Fixed capacity: a
/// stream that never sends a newline cannot grow the buffer.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: heapless::Vec<u8, LINE_CAP>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, data: &[u8]) {
        for &byte in data {
            if self.pending.push(byte).is_err() {
                // An overlong frame cannot be a valid command; restart
                // it so the port keeps framing on the next newline.
                self.pending.clear();
                let _ = self.pending.push(byte);
            }
        }
    }

    /// Pop the oldest complete line, if any. Bytes that are not valid
    /// UTF-8 are replaced rather than dropped; the parser will answer
    /// with an unknown-command error either way.
    pub fn pop_line(&mut self) -> Option<String> {
        let nl = self.pending.iter().position(|&b| b == b'\n')?;
        let line = String::from_utf8_lossy(&self.pending[..=nl]).into_owned();
        self.pending.copy_within(nl + 1.., 0);
        self.pending.truncate(self.pending.len() - (nl + 1));
        Some(line)
    }
}

// ── ADC (espidf) ──────────────────────────────────────────────

/// Owner of the oneshot ADC unit. Channels are carved out of it at
/// boot, one per configured pin.
#[cfg(target_os = "espidf")]
pub struct AdcReader {
    unit: adc_oneshot_unit_handle_t,
}

#[cfg(target_os = "espidf")]
impl AdcReader {
    pub fn new() -> Result<Self> {
        let init_cfg = adc_oneshot_unit_init_cfg_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..Default::default()
        };
        let mut unit: adc_oneshot_unit_handle_t = core::ptr::null_mut();
        // SAFETY: one-shot unit creation from the boot path.
        let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &mut unit) };
        if ret != ESP_OK as i32 {
            return Err(Error::Init("ADC unit init failed"));
        }
        Ok(Self { unit })
    }

    /// Configure one pin as a calibrated channel.
    pub fn channel(&self, pin: i32, atten: Attenuation) -> Result<EspAdcChannel> {
        let atten = match atten {
            Attenuation::Db0 => adc_atten_t_ADC_ATTEN_DB_0,
            Attenuation::Db2_5 => adc_atten_t_ADC_ATTEN_DB_2_5,
            Attenuation::Db6 => adc_atten_t_ADC_ATTEN_DB_6,
            Attenuation::Db11 => adc_atten_t_ADC_ATTEN_DB_12,
        };

        let mut unit_id: adc_unit_t = 0;
        let mut channel: adc_channel_t = 0;
        // SAFETY: pure lookup of the pin's ADC routing.
        let ret = unsafe { adc_oneshot_io_to_channel(pin, &mut unit_id, &mut channel) };
        if ret != ESP_OK as i32 || unit_id != adc_unit_t_ADC_UNIT_1 {
            return Err(Error::Init("pin is not routable to ADC1"));
        }

        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        // SAFETY: unit handle created in new(); boot path only.
        let ret = unsafe { adc_oneshot_config_channel(self.unit, channel, &chan_cfg) };
        if ret != ESP_OK as i32 {
            return Err(Error::Init("ADC channel config failed"));
        }

        let cali_cfg = adc_cali_curve_fitting_config_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            chan: channel,
            atten,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        let mut cali: adc_cali_handle_t = core::ptr::null_mut();
        // SAFETY: calibration scheme creation from the boot path.
        let ret = unsafe { adc_cali_create_scheme_curve_fitting(&cali_cfg, &mut cali) };
        if ret != ESP_OK as i32 {
            return Err(Error::Init("ADC calibration scheme unavailable"));
        }

        log::info!("Creating ADC channel on pin {pin}");
        Ok(EspAdcChannel {
            unit: self.unit,
            channel,
            cali,
        })
    }
}

/// One calibrated ADC input.
#[cfg(target_os = "espidf")]
pub struct EspAdcChannel {
    unit: adc_oneshot_unit_handle_t,
    channel: adc_channel_t,
    cali: adc_cali_handle_t,
}

// SAFETY: the channel table mutex serializes every access to the
// oneshot unit; the handles themselves are never reconfigured after
// boot.
#[cfg(target_os = "espidf")]
unsafe impl Send for EspAdcChannel {}

#[cfg(target_os = "espidf")]
impl AnalogChannel for EspAdcChannel {
    fn read_uv(&mut self) -> i64 {
        let mut raw: i32 = 0;
        // SAFETY: handles valid since boot; serialized by the caller.
        let ret = unsafe { adc_oneshot_read(self.unit, self.channel, &mut raw) };
        if ret != ESP_OK as i32 {
            return 0;
        }
        let mut mv: i32 = 0;
        // SAFETY: as above.
        let ret = unsafe { adc_cali_raw_to_voltage(self.cali, raw, &mut mv) };
        if ret != ESP_OK as i32 {
            return 0;
        }
        i64::from(mv) * 1000
    }
}

// ── ADC (simulation) ──────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim_adc {
    use core::sync::atomic::{AtomicI64, Ordering};

    pub const SIM_ADC_SLOTS: usize = 8;

    static SIM_ADC_UV: [AtomicI64; SIM_ADC_SLOTS] = [const { AtomicI64::new(0) }; SIM_ADC_SLOTS];

    /// Inject a simulated reading for one channel slot.
    pub fn sim_set_adc_uv(slot: usize, uv: i64) {
        SIM_ADC_UV[slot].store(uv, Ordering::Release);
    }

    pub(super) fn read(slot: usize) -> i64 {
        SIM_ADC_UV[slot].load(Ordering::Acquire)
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim_adc::{sim_set_adc_uv, SIM_ADC_SLOTS};

/// Host stand-in for a calibrated ADC input.
#[cfg(not(target_os = "espidf"))]
pub struct SimAdcChannel {
    slot: usize,
}

#[cfg(not(target_os = "espidf"))]
impl SimAdcChannel {
    pub fn new(slot: usize) -> Self {
        assert!(slot < SIM_ADC_SLOTS);
        Self { slot }
    }
}

#[cfg(not(target_os = "espidf"))]
impl AnalogChannel for SimAdcChannel {
    fn read_uv(&mut self) -> i64 {
        sim_adc::read(self.slot)
    }
}

// ── UART (espidf) ─────────────────────────────────────────────

/// UART command/data port via the IDF driver.
#[cfg(target_os = "espidf")]
pub struct EspUartSerial {
    port: uart_port_t,
    buffer: LineBuffer,
}

#[cfg(target_os = "espidf")]
unsafe impl Send for EspUartSerial {}

#[cfg(target_os = "espidf")]
impl EspUartSerial {
    const RX_BUF_BYTES: i32 = 1024;

    pub fn new(cfg: &crate::config::UartConfig) -> Result<Self> {
        let port = cfg.uart.unwrap_or(0) as uart_port_t;
        let uart_cfg = uart_config_t {
            baud_rate: cfg.baudrate as i32,
            data_bits: uart_word_length_t_UART_DATA_8_BITS,
            parity: uart_parity_t_UART_PARITY_DISABLE,
            stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
            flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
            ..Default::default()
        };
        // SAFETY: one-shot driver install from the boot path.
        unsafe {
            let ret = uart_driver_install(port, Self::RX_BUF_BYTES, 0, 0, core::ptr::null_mut(), 0);
            if ret != ESP_OK as i32 {
                return Err(Error::Init("UART driver install failed"));
            }
            let ret = uart_param_config(port, &uart_cfg);
            if ret != ESP_OK as i32 {
                return Err(Error::Init("UART param config failed"));
            }
            let ret = uart_set_pin(
                port,
                cfg.tx.unwrap_or(UART_PIN_NO_CHANGE),
                cfg.rx.unwrap_or(UART_PIN_NO_CHANGE),
                UART_PIN_NO_CHANGE,
                UART_PIN_NO_CHANGE,
            );
            if ret != ESP_OK as i32 {
                return Err(Error::Init("UART pin config failed"));
            }
        }
        log::info!("Opening UART {port} at {} baud", cfg.baudrate);
        Ok(Self {
            port,
            buffer: LineBuffer::new(),
        })
    }
}

#[cfg(target_os = "espidf")]
impl SerialPort for EspUartSerial {
    fn poll_line(&mut self) -> Option<String> {
        let mut chunk = [0u8; 128];
        loop {
            // SAFETY: driver installed in new(); zero timeout, never blocks.
            let n = unsafe {
                uart_read_bytes(
                    self.port,
                    chunk.as_mut_ptr().cast(),
                    chunk.len() as u32,
                    0,
                )
            };
            if n <= 0 {
                break;
            }
            self.buffer.feed(&chunk[..n as usize]);
            if (n as usize) < chunk.len() {
                break;
            }
        }
        self.buffer.pop_line()
    }

    fn write_line(&mut self, line: &str) {
        // SAFETY: driver installed in new().
        unsafe {
            uart_write_bytes(self.port, line.as_ptr().cast(), line.len());
            uart_write_bytes(self.port, "\n".as_ptr().cast(), 1);
        }
    }
}

// ── UART (simulation) ─────────────────────────────────────────

/// Host stand-in for the UART: commands are pushed in, replies taken
/// out, both from test code.
#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct SimSerialPort {
    inbound: std::collections::VecDeque<String>,
    outbound: Vec<String>,
}

#[cfg(not(target_os = "espidf"))]
impl SimSerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_command(&mut self, line: &str) {
        self.inbound.push_back(line.to_string());
    }

    pub fn take_output(&mut self) -> Vec<String> {
        core::mem::take(&mut self.outbound)
    }
}

#[cfg(not(target_os = "espidf"))]
impl SerialPort for SimSerialPort {
    fn poll_line(&mut self) -> Option<String> {
        self.inbound.pop_front()
    }

    fn write_line(&mut self, line: &str) {
        self.outbound.push(line.to_string());
    }
}

// ── Tests ─────────────────────────────────────────────────────
