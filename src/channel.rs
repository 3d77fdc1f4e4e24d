//! Per-pin channel model: identity, attenuation, calibration state.
//!
//! A [`Channel`] owns no hardware — the orchestrator pairs each channel
//! with its analog capability. The baseline is `None` until a calibration
//! run completes for that channel and is then fixed until the next run.

use crate::config::{PinConfig, DEFAULT_MV_PER_AMP};

/// Fallback zero-load reading when a channel was never calibrated but a
/// conversion is still requested (single reads before INIT).
pub const DEFAULT_BASELINE_UV: i64 = 2_450_000;

// ── Attenuation ───────────────────────────────────────────────

/// ADC input attenuation. The config file carries the numeric dB code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attenuation {
    #[default]
    Db0,
    Db2_5,
    Db6,
    Db11,
}

impl Attenuation {
    /// Map the config's numeric code to a setting. Unknown codes fall
    /// back to 0 dB, matching the original controller's behaviour.
    pub fn from_code(code: Option<f32>) -> Self {
        match code {
            Some(c) if c == 11.0 => Self::Db11,
            Some(c) if c == 6.0 => Self::Db6,
            Some(c) if c == 2.5 => Self::Db2_5,
            _ => Self::Db0,
        }
    }
}

// ── Channel ───────────────────────────────────────────────────

/// Static identity of one current-sense input.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub pin: i32,
    pub name: Option<String>,
    pub atten: Attenuation,
    /// Sensor scale factor (millivolts per ampere).
    pub mv_per_amp: u32,
}

impl ChannelConfig {
    pub fn from_pin(pin: &PinConfig) -> Self {
        Self {
            pin: pin.pin,
            name: pin.name.clone(),
            atten: Attenuation::from_code(pin.atten),
            mv_per_amp: if pin.mv_per_a == 0 {
                DEFAULT_MV_PER_AMP
            } else {
                pin.mv_per_a
            },
        }
    }

    /// Display name: the configured name, else the pin number.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(n) => n.clone(),
            None => self.pin.to_string(),
        }
    }
}

/// One channel's identity plus calibration state.
#[derive(Debug, Clone)]
pub struct Channel {
    pub config: ChannelConfig,
    /// Zero-load reference in microvolts. `None` until calibrated.
    pub baseline_uv: Option<i64>,
}

impl Channel {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            baseline_uv: None,
        }
    }

    /// Restore a channel with a persisted baseline from the config file.
    pub fn with_baseline(config: ChannelConfig, baseline_uv: Option<i64>) -> Self {
        Self {
            config,
            baseline_uv,
        }
    }

    /// Convert one raw reading to amperes against this channel's baseline.
    pub fn amps(&self, raw_uv: i64) -> f64 {
        calc_amperage(
            raw_uv,
            self.baseline_uv.unwrap_or(DEFAULT_BASELINE_UV),
            self.config.mv_per_amp,
        )
    }
}

/// `amps = (baseline_uv - raw_uv) / (mv_per_amp * 1000.0)`
pub fn calc_amperage(raw_uv: i64, baseline_uv: i64, mv_per_amp: u32) -> f64 {
    (baseline_uv - raw_uv) as f64 / (mv_per_amp as f64 * 1000.0)
}

// ── Tests ─────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_load_reads_zero_amps() {
        // Documented identity: raw at baseline means no current flows.
        assert_eq!(calc_amperage(2_450_000, 2_450_000, 185), 0.0);
    }

    #[test]
    fn amperage_sign_follows_baseline_delta() {
        // Reading below baseline -> positive current for this sensor wiring.
        let amps = calc_amperage(2_265_000, 2_450_000, 185);
        assert!((amps - 1.0).abs() < 1e-9);
        let amps = calc_amperage(2_635_000, 2_450_000, 185);
        assert!((amps + 1.0).abs() < 1e-9);
    }

    #[test]
    fn attenuation_codes() {
        assert_eq!(Attenuation::from_code(Some(11.0)), Attenuation::Db11);
        assert_eq!(Attenuation::from_code(Some(6.0)), Attenuation::Db6);
        assert_eq!(Attenuation::from_code(Some(2.5)), Attenuation::Db2_5);
        assert_eq!(Attenuation::from_code(Some(0.0)), Attenuation::Db0);
        assert_eq!(Attenuation::from_code(None), Attenuation::Db0);
        // Unknown codes degrade to no attenuation.
        assert_eq!(Attenuation::from_code(Some(3.0)), Attenuation::Db0);
    }

    #[test]
    fn display_name_prefers_config_name() {
        let mut cfg = ChannelConfig {
            pin: 34,
            name: Some("pump".into()),
            atten: Attenuation::Db11,
            mv_per_amp: 185,
        };
        assert_eq!(cfg.display_name(), "pump");
        cfg.name = None;
        assert_eq!(cfg.display_name(), "34");
    }

    #[test]
    fn uncalibrated_channel_uses_default_baseline() {
        let ch = Channel::new(ChannelConfig {
            pin: 34,
            name: None,
            atten: Attenuation::Db0,
            mv_per_amp: 185,
        });
        assert_eq!(ch.amps(DEFAULT_BASELINE_UV), 0.0);
    }
}
