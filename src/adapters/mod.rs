//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter    | Implements      | Connects to                    |
//! |------------|-----------------|--------------------------------|
//! | `hardware` | AnalogChannel   | ESP32 oneshot ADC (calibrated) |
//! |            | SerialPort      | ESP32 UART                     |
//! | `time`     | Clock, Delay    | esp_timer / wall clock, reactor|
//! | `power`    | CpuFreq         | ESP-IDF power management       |
//! | `net`      | —               | WiFi STA bring-up + SNTP sync  |

pub mod hardware;
pub mod net;
pub mod power;
pub mod time;
