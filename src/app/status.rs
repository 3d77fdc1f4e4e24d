//! Status derivation for `CMD:STATUS`.
//!
//! Status is never stored; it is computed on demand from the operation
//! token, the deadlines and the per-channel calibration state, so it
//! cannot drift from reality.

use core::sync::atomic::Ordering;

use crate::app::ports::AnalogChannel;
use crate::app::state::{lock, ActiveOp, SharedState};
use crate::protocol::StatusReport;

pub fn derive_status<A: AnalogChannel>(state: &SharedState<A>, now_s: i64) -> StatusReport {
    match state.current() {
        ActiveOp::Calibrating => StatusReport::Initializing {
            remaining_s: state.calib_deadline_s.load(Ordering::Relaxed) - now_s,
        },
        ActiveOp::Sampling => StatusReport::Running {
            remaining_s: state.sampling_deadline_s.load(Ordering::Relaxed) - now_s,
        },
        ActiveOp::Idle => {
            let slots = lock(&state.channels);
            for slot in slots.iter() {
                if slot.channel.baseline_uv.is_none() {
                    return StatusReport::NoInit {
                        channel: slot.channel.config.display_name(),
                    };
                }
            }
            StatusReport::Ready
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::ChannelSlot;
    use crate::channel::{Channel, ChannelConfig};
    use crate::config::DeviceConfig;

    struct FixedAdc;

    impl AnalogChannel for FixedAdc {
        fn read_uv(&mut self) -> i64 {
            2_450_000
        }
    }

    fn state(baselines: &[Option<i64>]) -> SharedState<FixedAdc> {
        let cfg = DeviceConfig::from_json(
            r#"{ "adc": { "pins": [ { "pin": 34, "name": "pump" }, { "pin": 35 } ] } }"#,
        )
        .unwrap();
        let slots = cfg
            .adc
            .pins
            .iter()
            .zip(baselines)
            .map(|(p, b)| ChannelSlot {
                channel: Channel::with_baseline(ChannelConfig::from_pin(p), *b),
                adc: FixedAdc,
            })
            .collect();
        SharedState::new(&cfg.adc, slots)
    }

    #[test]
    fn reports_first_uncalibrated_channel() {
        let s = state(&[None, None]);
        assert_eq!(
            derive_status(&s, 0),
            StatusReport::NoInit {
                channel: "pump".into()
            }
        );
        // A channel without a name reports its pin number.
        let s = state(&[Some(2_450_000), None]);
        assert_eq!(
            derive_status(&s, 0),
            StatusReport::NoInit {
                channel: "35".into()
            }
        );
    }

    #[test]
    fn ready_once_all_channels_have_baselines() {
        let s = state(&[Some(2_450_000), Some(2_451_000)]);
        assert_eq!(derive_status(&s, 0), StatusReport::Ready);
    }

    #[test]
    fn running_reports_time_to_deadline() {
        let s = state(&[Some(2_450_000), Some(2_451_000)]);
        assert!(s.try_begin(ActiveOp::Sampling));
        s.sampling_deadline_s.store(1_000_600, Ordering::Relaxed);
        assert_eq!(
            derive_status(&s, 1_000_000),
            StatusReport::Running { remaining_s: 600 }
        );
    }

    #[test]
    fn calibrating_wins_over_missing_baselines() {
        let s = state(&[None, None]);
        assert!(s.try_begin(ActiveOp::Calibrating));
        s.calib_deadline_s.store(1_000_010, Ordering::Relaxed);
        assert_eq!(
            derive_status(&s, 1_000_000),
            StatusReport::Initializing { remaining_s: 10 }
        );
    }
}
