//! Activity LED driver.
//!
//! A bare GPIO output, off at boot. The indicator task owns the blink
//! pattern; this driver only sets the level.

use crate::app::ports::Led;
#[cfg(target_os = "espidf")]
use crate::error::Error;
use crate::error::Result;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};

/// Last simulated LED level, observable from host tests.
#[cfg(not(target_os = "espidf"))]
static SIM_LED_LEVEL: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_led_level() -> bool {
    SIM_LED_LEVEL.load(Ordering::Acquire)
}

pub struct GpioLed {
    pin: i32,
}

impl GpioLed {
    /// Configure `pin` as an output driven low.
    #[cfg(target_os = "espidf")]
    pub fn new(pin: i32) -> Result<Self> {
        use esp_idf_svc::sys::*;

        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: one-shot pin configuration from the boot path.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(Error::Init("LED GPIO config failed"));
        }
        unsafe {
            gpio_set_level(gpio_num(pin), 0);
        }
        log::info!("Initializing LED on pin {pin}");
        Ok(Self { pin })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(pin: i32) -> Result<Self> {
        log::info!("LED(sim) on pin {pin}");
        Ok(Self { pin })
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }
}

#[cfg(target_os = "espidf")]
fn gpio_num(pin: i32) -> esp_idf_svc::sys::gpio_num_t {
    pin as esp_idf_svc::sys::gpio_num_t
}

impl Led for GpioLed {
    #[cfg(target_os = "espidf")]
    fn set(&mut self, on: bool) {
        unsafe {
            esp_idf_svc::sys::gpio_set_level(gpio_num(self.pin), u32::from(on));
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn set(&mut self, on: bool) {
        SIM_LED_LEVEL.store(on, Ordering::Release);
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn sim_level_tracks_set() {
        let mut led = GpioLed::new(2).unwrap();
        led.set(true);
        assert!(sim_led_level());
        led.set(false);
        assert!(!sim_led_level());
    }
}
