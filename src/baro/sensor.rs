//! Pressure sensor capability trait
//!
//! The barometer wrapper is generic over the sensor backend; this narrow
//! trait is the only polymorphic point in the crate. Drivers own their
//! sampling state and stamp each completed sample so the wrapper can tell
//! fresh data from stale.

/// Absolute pressure sensor driver.
pub trait PressureSensor {
    /// One-time hardware initialisation; false if the probe failed.
    fn init(&mut self) -> bool;

    /// Samples the sensor, updating pressure, temperature, health and the
    /// sample timestamp.
    fn read(&mut self);

    /// Background accumulation between reads; some drivers average
    /// multiple conversions per sample.
    fn accumulate(&mut self) {}

    /// Last sampled pressure in Pascal.
    fn get_pressure(&self) -> f32;

    /// Last sampled temperature in degrees C.
    fn get_temperature(&self) -> f32;

    /// True once the driver has produced a valid sample.
    fn healthy(&self) -> bool;

    /// Timestamp of the last completed sample in ms.
    fn last_update_ms(&self) -> u64;
}

/// Scripted pressure sensor for host tests.
///
/// Tests stage a sample with [`set_sample`](MockPressureSensor::set_sample)
/// and each `read` publishes it. The driver reports healthy after a
/// configurable number of reads (default: the first).
pub struct MockPressureSensor {
    staged_pressure_pa: f32,
    staged_temperature_c: f32,
    staged_timestamp_ms: u64,
    pressure_pa: f32,
    temperature_c: f32,
    last_update_ms: u64,
    healthy: bool,
    healthy_after_reads: u32,
    reads: u32,
    accumulate_calls: u32,
}

impl MockPressureSensor {
    /// Creates a sensor with no staged sample that reports healthy from
    /// the first read.
    pub fn new() -> Self {
        Self {
            staged_pressure_pa: 0.0,
            staged_temperature_c: 0.0,
            staged_timestamp_ms: 0,
            pressure_pa: 0.0,
            temperature_c: 0.0,
            last_update_ms: 0,
            healthy: false,
            healthy_after_reads: 1,
            reads: 0,
            accumulate_calls: 0,
        }
    }

    /// Stages the sample the next `read` will publish.
    pub fn set_sample(&mut self, pressure_pa: f32, temperature_c: f32, timestamp_ms: u64) {
        self.staged_pressure_pa = pressure_pa;
        self.staged_temperature_c = temperature_c;
        self.staged_timestamp_ms = timestamp_ms;
    }

    /// Number of reads before the driver reports healthy; `u32::MAX`
    /// keeps it unhealthy forever.
    pub fn set_healthy_after_reads(&mut self, reads: u32) {
        self.healthy_after_reads = reads;
    }

    /// Total `read` calls observed.
    pub fn read_count(&self) -> u32 {
        self.reads
    }

    /// Total `accumulate` calls observed.
    pub fn accumulate_count(&self) -> u32 {
        self.accumulate_calls
    }
}

impl Default for MockPressureSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl PressureSensor for MockPressureSensor {
    fn init(&mut self) -> bool {
        true
    }

    fn read(&mut self) {
        self.reads = self.reads.saturating_add(1);
        if self.reads >= self.healthy_after_reads {
            self.healthy = true;
        }
        if self.healthy {
            self.pressure_pa = self.staged_pressure_pa;
            self.temperature_c = self.staged_temperature_c;
            self.last_update_ms = self.staged_timestamp_ms;
        }
    }

    fn accumulate(&mut self) {
        self.accumulate_calls = self.accumulate_calls.saturating_add(1);
    }

    fn get_pressure(&self) -> f32 {
        self.pressure_pa
    }

    fn get_temperature(&self) -> f32 {
        self.temperature_c
    }

    fn healthy(&self) -> bool {
        self.healthy
    }

    fn last_update_ms(&self) -> u64 {
        self.last_update_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_sensor_publishes_on_read() {
        let mut sensor = MockPressureSensor::new();
        sensor.set_sample(101_325.0, 15.0, 42);

        assert!(!sensor.healthy());
        assert!(sensor.get_pressure().abs() < 0.001);

        sensor.read();
        assert!(sensor.healthy());
        assert!((sensor.get_pressure() - 101_325.0).abs() < 0.001);
        assert!((sensor.get_temperature() - 15.0).abs() < 0.001);
        assert_eq!(sensor.last_update_ms(), 42);
    }

    #[test]
    fn test_mock_sensor_healthy_after_n_reads() {
        let mut sensor = MockPressureSensor::new();
        sensor.set_sample(100_000.0, 20.0, 1);
        sensor.set_healthy_after_reads(3);

        sensor.read();
        sensor.read();
        assert!(!sensor.healthy());
        sensor.read();
        assert!(sensor.healthy());
    }
}
