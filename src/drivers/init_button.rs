//! Calibration push-button driver.
//!
//! Active-high momentary switch with the internal pull-down enabled; the
//! button task polls the level at the debounce period and fires on the
//! rising edge. No ISR: the debounce cadence is slow enough that a
//! polled level is sufficient, as it was on this hardware before.

use crate::app::ports::Button;
#[cfg(target_os = "espidf")]
use crate::error::Error;
use crate::error::Result;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};

/// Simulated button level, injectable from host tests.
#[cfg(not(target_os = "espidf"))]
static SIM_BUTTON_LEVEL: AtomicBool = AtomicBool::new(false);

/// Set the simulated button level (host only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_button_level(pressed: bool) {
    SIM_BUTTON_LEVEL.store(pressed, Ordering::Release);
}

pub struct GpioButton {
    pin: i32,
}

impl GpioButton {
    /// Configure `pin` as a pulled-down input.
    #[cfg(target_os = "espidf")]
    pub fn new(pin: i32) -> Result<Self> {
        use esp_idf_svc::sys::*;

        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: one-shot pin configuration from the boot path.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(Error::Init("button GPIO config failed"));
        }
        log::info!("Initializing init button on pin {pin}");
        Ok(Self { pin })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(pin: i32) -> Result<Self> {
        log::info!("Button(sim) on pin {pin}");
        Ok(Self { pin })
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }
}

impl Button for GpioButton {
    #[cfg(target_os = "espidf")]
    fn is_pressed(&mut self) -> bool {
        unsafe { esp_idf_svc::sys::gpio_get_level(self.pin) == 1 }
    }

    #[cfg(not(target_os = "espidf"))]
    fn is_pressed(&mut self) -> bool {
        SIM_BUTTON_LEVEL.load(Ordering::Acquire)
    }
}
