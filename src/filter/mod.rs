//! Scalar filters used by the barometer subsystem.
//!
//! - [`LowPassFilter`]: first-order IIR parameterised by a time constant,
//!   used by the drift estimator.
//! - [`DerivativeFilter`]: 7-tap smooth-derivative filter over
//!   timestamped samples, used for the climb rate.

/// First-order low-pass filter.
///
/// The output starts at zero and relaxes toward the input with
/// `alpha = dt / (tc + dt)` per applied sample, so a freshly constructed
/// filter ramps from zero with the configured time constant rather than
/// stepping to the first sample.
#[derive(Debug, Clone, Copy)]
pub struct LowPassFilter {
    output: f32,
    alpha: f32,
}

impl LowPassFilter {
    /// Creates a filter with zero output that passes samples through until
    /// a time constant is set.
    pub fn new() -> Self {
        Self {
            output: 0.0,
            alpha: 1.0,
        }
    }

    /// Configures the smoothing from the update period `dt` and the time
    /// constant `tc`, both in seconds. Degenerate inputs (`tc + dt <= 0`)
    /// disable smoothing.
    pub fn set_time_constant(&mut self, dt: f32, tc: f32) {
        if tc + dt <= 0.0 {
            self.alpha = 1.0;
        } else {
            self.alpha = (dt / (tc + dt)).clamp(0.0, 1.0);
        }
    }

    /// Applies one sample and returns the new output.
    pub fn apply(&mut self, sample: f32) -> f32 {
        self.output += (sample - self.output) * self.alpha;
        self.output
    }

    /// Forces the output to a value.
    pub fn reset(&mut self, value: f32) {
        self.output = value;
    }

    /// Current filter output.
    pub fn output(&self) -> f32 {
        self.output
    }
}

impl Default for LowPassFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of taps in the derivative filter window.
pub const DERIVATIVE_FILTER_SIZE: usize = 7;

/// Smooth noise-robust differentiator over timestamped samples.
///
/// Holds a ring of the last seven (sample, timestamp) pairs and estimates
/// the slope as a weighted blend of three secants (weights 5, 4, 1 out of
/// 32 per side), each divided by its own timestamp span so irregular
/// sampling does not bias the result. Samples are metres and timestamps
/// milliseconds here, making the slope m/ms.
#[derive(Debug, Clone, Copy)]
pub struct DerivativeFilter {
    samples: [f32; DERIVATIVE_FILTER_SIZE],
    timestamps: [u64; DERIVATIVE_FILTER_SIZE],
    sample_index: usize,
    count: usize,
    new_data: bool,
    last_slope: f32,
}

impl DerivativeFilter {
    /// Creates an empty filter; `slope` reports zero until seven samples
    /// with distinct timestamps have been fed in.
    pub fn new() -> Self {
        Self {
            samples: [0.0; DERIVATIVE_FILTER_SIZE],
            timestamps: [0; DERIVATIVE_FILTER_SIZE],
            sample_index: 0,
            count: 0,
            new_data: false,
            last_slope: 0.0,
        }
    }

    /// Adds a sample. A timestamp equal to the previous sample's means the
    /// source had no new data and the sample is dropped.
    pub fn update(&mut self, sample: f32, timestamp_ms: u64) {
        if self.count > 0 {
            let newest = (self.sample_index + DERIVATIVE_FILTER_SIZE - 1) % DERIVATIVE_FILTER_SIZE;
            if self.timestamps[newest] == timestamp_ms {
                return;
            }
        }

        self.samples[self.sample_index] = sample;
        self.timestamps[self.sample_index] = timestamp_ms;
        self.sample_index = (self.sample_index + 1) % DERIVATIVE_FILTER_SIZE;
        if self.count < DERIVATIVE_FILTER_SIZE {
            self.count += 1;
        }
        self.new_data = true;
    }

    /// Returns the current slope estimate in sample-units per timestamp
    /// unit. Cached between updates.
    pub fn slope(&mut self) -> f32 {
        if !self.new_data {
            return self.last_slope;
        }
        if self.count < DERIVATIVE_FILTER_SIZE {
            return 0.0;
        }

        let f = |i: isize| -> f32 { self.samples[self.ring_index(i)] };
        let x = |i: isize| -> f32 {
            // spans are small; the i64 difference is exact in f32
            self.timestamps[self.ring_index(i)] as i64 as f32
        };

        let result = 2.0 * 5.0 * (f(1) - f(-1)) / (x(1) - x(-1))
            + 4.0 * 4.0 * (f(2) - f(-2)) / (x(2) - x(-2))
            + 6.0 * (f(3) - f(-3)) / (x(3) - x(-3));
        let result = result / 32.0;

        self.last_slope = result;
        self.new_data = false;
        result
    }

    /// Discards all stored samples.
    pub fn reset(&mut self) {
        self.sample_index = 0;
        self.count = 0;
        self.new_data = false;
        self.last_slope = 0.0;
    }

    /// Index of the slot `i` steps ahead of the newest sample (negative
    /// reaches back in time).
    fn ring_index(&self, i: isize) -> usize {
        let newest = self.sample_index as isize - 1;
        let n = DERIVATIVE_FILTER_SIZE as isize;
        ((newest + i + 2 * n) % n) as usize
    }
}

impl Default for DerivativeFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowpass_step_response() {
        let mut filter = LowPassFilter::new();
        filter.set_time_constant(1.0, 9.0); // alpha = 0.1

        let out = filter.apply(10.0);
        assert!((out - 1.0).abs() < 0.001, "expected 1.0, got {}", out);

        let out = filter.apply(10.0);
        assert!((out - 1.9).abs() < 0.001, "expected 1.9, got {}", out);
    }

    #[test]
    fn test_lowpass_converges_to_input() {
        let mut filter = LowPassFilter::new();
        filter.set_time_constant(0.2, 2.0);
        for _ in 0..500 {
            filter.apply(5.0);
        }
        assert!((filter.output() - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_lowpass_degenerate_time_constant_passes_through() {
        let mut filter = LowPassFilter::new();
        filter.set_time_constant(0.0, 0.0);
        assert!((filter.apply(3.0) - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_lowpass_reset() {
        let mut filter = LowPassFilter::new();
        filter.set_time_constant(1.0, 1.0);
        filter.apply(10.0);
        filter.reset(0.0);
        assert!(filter.output().abs() < 0.001);
    }

    #[test]
    fn test_derivative_zero_until_full() {
        let mut filter = DerivativeFilter::new();
        for i in 0..(DERIVATIVE_FILTER_SIZE - 1) {
            filter.update(i as f32, (i as u64) * 100);
            assert!(filter.slope().abs() < 1e-6, "slope before buffer full");
        }
    }

    #[test]
    fn test_derivative_of_linear_ramp() {
        let mut filter = DerivativeFilter::new();
        // 0.1 units per 100 ms => slope 0.001 per ms
        for i in 0..20 {
            filter.update(i as f32 * 0.1, (i as u64) * 100);
        }
        let slope = filter.slope();
        assert!(
            (slope - 0.001).abs() < 1e-6,
            "expected 0.001, got {}",
            slope
        );
    }

    #[test]
    fn test_derivative_irregular_sampling() {
        let mut filter = DerivativeFilter::new();
        // Same line sampled at jittered intervals: slope still exact
        let times = [0u64, 80, 210, 300, 390, 520, 600, 710, 790];
        for &t in &times {
            filter.update(t as f32 * 0.002, t);
        }
        let slope = filter.slope();
        assert!(
            (slope - 0.002).abs() < 1e-6,
            "expected 0.002, got {}",
            slope
        );
    }

    #[test]
    fn test_derivative_ignores_duplicate_timestamp() {
        let mut filter = DerivativeFilter::new();
        for i in 0..10 {
            filter.update(i as f32, (i as u64) * 100);
        }
        let slope_before = filter.slope();
        filter.update(1000.0, 900); // same timestamp as the last sample
        let slope_after = filter.slope();
        assert!((slope_before - slope_after).abs() < 1e-9);
    }

    #[test]
    fn test_derivative_slope_cached_between_updates() {
        let mut filter = DerivativeFilter::new();
        for i in 0..10 {
            filter.update(i as f32 * 0.5, (i as u64) * 50);
        }
        let first = filter.slope();
        let second = filter.slope();
        assert!((first - second).abs() < 1e-9);
    }

    #[test]
    fn test_derivative_reset() {
        let mut filter = DerivativeFilter::new();
        for i in 0..10 {
            filter.update(i as f32, (i as u64) * 100);
        }
        filter.reset();
        assert!(filter.slope().abs() < 1e-9);
    }
}
