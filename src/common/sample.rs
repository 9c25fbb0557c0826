/// Number of consecutive readings kept by a [`TorqueSample`].
pub const MAX_SAMPLE_VALS: usize = 6;

/// Sliding window over the last few driver torque readings.
///
/// The rate limiter uses the window extrema rather than the latest value,
/// so one noisy reading cannot unlock the driver override allowance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TorqueSample {
    values: [i32; MAX_SAMPLE_VALS],
    min: i32,
    max: i32,
}

impl TorqueSample {
    /// Push a new reading and recompute the window extrema.
    pub fn update(&mut self, sample_new: i32) {
        self.values.copy_within(0..MAX_SAMPLE_VALS - 1, 1);
        self.values[0] = sample_new;

        self.min = self.values[0];
        self.max = self.values[0];
        for &v in &self.values[1..] {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
    }

    /// Overwrite the whole window with one value.
    pub fn fill(&mut self, value: i32) {
        self.values = [value; MAX_SAMPLE_VALS];
        self.min = value;
        self.max = value;
    }

    /// Most recent reading.
    pub fn latest(&self) -> i32 {
        self.values[0]
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_default_is_zero() {
        let s = TorqueSample::default();
        assert_eq!((s.min(), s.max(), s.latest()), (0, 0, 0));
    }

    #[test]
    fn test_sample_window_extrema() {
        let mut s = TorqueSample::default();
        for _ in 0..5 {
            s.update(-10);
        }
        s.update(30);
        assert_eq!(s.latest(), 30);
        assert_eq!(s.min(), -10);
        assert_eq!(s.max(), 30);
    }

    #[test]
    fn test_sample_old_values_fall_out() {
        let mut s = TorqueSample::default();
        s.update(500);
        for _ in 0..MAX_SAMPLE_VALS - 1 {
            s.update(1);
        }
        assert_eq!(s.max(), 500);
        s.update(1);
        assert_eq!(s.max(), 1);
        assert_eq!(s.min(), 1);
    }
}
