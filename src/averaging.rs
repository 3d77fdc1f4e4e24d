//! Outlier-rejecting rolling average over a fixed window.
//!
//! Each sampling session owns one [`Ring`] per channel (rings are
//! session-ephemeral — they are created on START / ONE and dropped when
//! the session ends). A ring always holds exactly N slots, zero-filled
//! until warm. The trimmed mean sorts a copy of the window, discards the
//! single minimum and single maximum, and averages the remainder.
//!
//! Edge case: for N < 3 the trimmed set would be empty, so windows of
//! one or two values are averaged without trimming.

// ── Ring ──────────────────────────────────────────────────────

/// Fixed-length window of the last N scaled readings.
#[derive(Debug, Clone)]
pub struct Ring {
    slots: Vec<f64>,
    write_index: usize,
}

/// Result of recording one reading.
#[derive(Debug, Clone)]
pub struct Sample {
    /// The value just recorded.
    pub instant: f64,
    /// Sorted window with min and max removed (whole window for N < 3).
    pub trimmed: Vec<f64>,
    /// Mean of `trimmed`.
    pub trimmed_mean: f64,
}

impl Ring {
    /// A zero-filled window of `n` slots. `n` must be at least 1.
    pub fn new(n: usize) -> Self {
        Self {
            slots: vec![0.0; n.max(1)],
            write_index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false: `new()` enforces at least one slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Push `value` and return it alongside the trimmed window and mean.
    pub fn record(&mut self, value: f64) -> Sample {
        let n = self.slots.len();
        self.slots[self.write_index % n] = value;
        self.write_index = self.write_index.wrapping_add(1);

        let mut sorted = self.slots.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let trimmed = if n >= 3 {
            sorted[1..n - 1].to_vec()
        } else {
            sorted
        };
        let trimmed_mean = trimmed.iter().sum::<f64>() / trimmed.len() as f64;

        Sample {
            instant: value,
            trimmed,
            trimmed_mean,
        }
    }
}

// ── Bank ──────────────────────────────────────────────────────

/// One ring per channel, created for the lifetime of a sampling session.
#[derive(Debug)]
pub struct Bank {
    rings: Vec<Ring>,
}

impl Bank {
    pub fn new(channels: usize, window: usize) -> Self {
        Self {
            rings: (0..channels).map(|_| Ring::new(window)).collect(),
        }
    }

    pub fn record(&mut self, channel: usize, value: f64) -> Sample {
        self.rings[channel].record(value)
    }
}

// ── Calibration accumulator ───────────────────────────────────

/// Accumulates raw microvolt readings during a calibration run and
/// yields their integer arithmetic mean as the channel baseline.
#[derive(Debug, Default)]
pub struct BaselineAccumulator {
    sum: i128,
    count: u32,
}

impl BaselineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, raw_uv: i64) {
        self.sum += i128::from(raw_uv);
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Integer mean of everything pushed so far; `None` if nothing was.
    pub fn mean(&self) -> Option<i64> {
        if self.count == 0 {
            return None;
        }
        Some((self.sum / i128::from(self.count)) as i64)
    }
}

// ── Tests ─────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_one_min_and_one_max() {
        let mut ring = Ring::new(5);
        for v in [10.0, 1.0, 5.0, 7.0] {
            ring.record(v);
        }
        // Window is now [10, 1, 5, 7, 0]; trimmed drops 0 and 10.
        let s = ring.record(3.0); // replaces the zero slot
        assert_eq!(s.instant, 3.0);
        assert_eq!(s.trimmed, vec![3.0, 5.0, 7.0]);
        assert!((s.trimmed_mean - 5.0).abs() < 1e-12);
    }

    #[test]
    fn cold_window_is_zero_filled() {
        let mut ring = Ring::new(5);
        let s = ring.record(10.0);
        // [10, 0, 0, 0, 0] -> trimmed [0, 0, 0]
        assert_eq!(s.trimmed_mean, 0.0);
        assert_eq!(s.trimmed.len(), 3);
    }

    #[test]
    fn only_last_n_pushes_matter() {
        let mut a = Ring::new(3);
        let mut b = Ring::new(3);
        for v in [100.0, 200.0, 300.0, 1.0, 2.0, 3.0] {
            a.record(v);
        }
        let sa = a.record(4.0);
        for v in [1.0, 2.0, 3.0] {
            b.record(v);
        }
        let sb = b.record(4.0);
        assert_eq!(sa.trimmed, sb.trimmed);
        assert_eq!(sa.trimmed_mean, sb.trimmed_mean);
    }

    #[test]
    fn window_of_two_skips_trimming() {
        let mut ring = Ring::new(2);
        ring.record(2.0);
        let s = ring.record(4.0);
        assert_eq!(s.trimmed, vec![2.0, 4.0]);
        assert!((s.trimmed_mean - 3.0).abs() < 1e-12);
    }

    #[test]
    fn window_of_one_returns_the_value() {
        let mut ring = Ring::new(1);
        let s = ring.record(7.5);
        assert_eq!(s.trimmed_mean, 7.5);
    }

    #[test]
    fn ring_is_never_empty() {
        // Even a zero-slot request is clamped up to one.
        assert!(!Ring::new(0).is_empty());
        assert_eq!(Ring::new(0).len(), 1);
    }

    #[test]
    fn bank_keeps_channels_independent() {
        let mut bank = Bank::new(2, 3);
        for _ in 0..3 {
            bank.record(0, 6.0);
            bank.record(1, 2.0);
        }
        assert_eq!(bank.record(0, 6.0).trimmed_mean, 6.0);
        assert_eq!(bank.record(1, 2.0).trimmed_mean, 2.0);
    }

    #[test]
    fn baseline_is_integer_mean() {
        let mut acc = BaselineAccumulator::new();
        assert_eq!(acc.mean(), None);
        for v in [2_450_000, 2_450_010, 2_449_990, 2_450_001] {
            acc.push(v);
        }
        assert_eq!(acc.count(), 4);
        assert_eq!(acc.mean(), Some(2_450_000));
    }
}
