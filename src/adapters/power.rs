//! CPU frequency scaling.
//!
//! The device idles at 80 MHz and steps up to 240 MHz while calibrating
//! or sampling so the ADC cadence holds at short intervals. Scaling is
//! reference-free here; the operation token already guarantees only one
//! owner raises and lowers the clock at a time.

use crate::app::ports::CpuFreq;

const FREQ_HIGH_MHZ: i32 = 240;
const FREQ_LOW_MHZ: i32 = 80;

#[derive(Clone, Copy, Default)]
pub struct PmCpuFreq;

impl PmCpuFreq {
    pub fn new() -> Self {
        Self
    }

    #[cfg(target_os = "espidf")]
    fn configure(&self, mhz: i32) {
        let cfg = esp_idf_svc::sys::esp_pm_config_t {
            max_freq_mhz: mhz,
            min_freq_mhz: mhz,
            light_sleep_enable: false,
        };
        // SAFETY: esp_pm_configure copies the config; no aliasing.
        let ret = unsafe {
            esp_idf_svc::sys::esp_pm_configure((&cfg as *const esp_idf_svc::sys::esp_pm_config_t).cast())
        };
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            log::warn!("esp_pm_configure({mhz} MHz) failed: {ret}");
        } else {
            log::debug!("CPU frequency set to {mhz} MHz");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn configure(&self, mhz: i32) {
        log::debug!("CPU(sim): frequency set to {mhz} MHz");
    }
}

impl CpuFreq for PmCpuFreq {
    fn set_high(&self) {
        self.configure(FREQ_HIGH_MHZ);
    }

    fn set_low(&self) {
        self.configure(FREQ_LOW_MHZ);
    }
}
