//! Barometric altitude subsystem
//!
//! Wraps a pressure sensor driver with ground calibration, pressure to
//! altitude conversion, a 7-tap climb rate filter, the EAS to TAS scale
//! factor and a drift estimator that slaves the long-term barometric
//! altitude to an external drift-free reference (GPS, rangefinder).
//!
//! Calibration is the one fatal path in this crate: a driver that cannot
//! produce a healthy sample within the timeout aborts startup through the
//! platform handle, and the vehicle refuses to arm.

mod sensor;

pub use sensor::{MockPressureSensor, PressureSensor};

use libm::{expf, logf};

use crate::filter::{DerivativeFilter, LowPassFilter};
use crate::log_debug;
use crate::math::safe_sqrt;
use crate::parameters::BaroParams;
use crate::traits::Platform;

/// Longest a calibration phase may go without a healthy sample, ms.
pub const BARO_CAL_TIMEOUT_MS: u64 = 500;

/// Drift innovations at or beyond this many metres are dropped as sensor
/// glitches. Tuned in flight - kept a constant rather than a parameter.
pub const BARO_DRIFT_INNOVATION_GATE_M: f32 = 5.0;

/// Altitude change that forces the EAS to TAS factor to be recomputed, m.
const EAS2TAS_RECOMPUTE_ALT_M: f32 = 100.0;

/// Barometer with calibration, altitude derivation and drift estimation.
pub struct Baro<D, C> {
    driver: D,
    clock: C,
    params: BaroParams,

    // altitude cache, refreshed only when the driver timestamp advances
    altitude_m: f32,
    last_altitude_t_ms: u64,
    climb_rate_filter: DerivativeFilter,

    // EAS to TAS cache
    eas2tas: f32,
    last_altitude_eas2tas_m: f32,

    // drift estimator
    cal_time_ms: u64,
    drift_est_m: f32,
    drift_gnd_level_m: f32,
    drift_init_count: u16,
    drift_filter: LowPassFilter,
}

impl<D: PressureSensor, C: Platform> Baro<D, C> {
    /// Wraps a driver. Call [`calibrate`](Self::calibrate) before using
    /// the altitude or climb rate interfaces.
    pub fn new(driver: D, clock: C, params: BaroParams) -> Self {
        Self {
            driver,
            clock,
            params,
            altitude_m: 0.0,
            last_altitude_t_ms: 0,
            climb_rate_filter: DerivativeFilter::new(),
            eas2tas: 0.0,
            last_altitude_eas2tas_m: 0.0,
            cal_time_ms: 0,
            drift_est_m: 0.0,
            drift_gnd_level_m: 0.0,
            drift_init_count: 0,
            drift_filter: LowPassFilter::new(),
        }
    }

    /// Initialises the sensor hardware.
    pub fn init(&mut self) -> bool {
        self.driver.init()
    }

    /// Samples the sensor. Call regularly; the altitude interfaces only
    /// see data published here.
    pub fn read(&mut self) {
        self.driver.read();
    }

    /// Lets the driver accumulate conversions between reads.
    pub fn accumulate(&mut self) {
        self.driver.accumulate();
    }

    /// True once the driver has produced a valid sample.
    pub fn healthy(&self) -> bool {
        self.driver.healthy()
    }

    /// Last sampled pressure in Pascal.
    pub fn get_pressure(&self) -> f32 {
        self.driver.get_pressure()
    }

    /// Last sampled temperature in degrees C.
    pub fn get_temperature(&self) -> f32 {
        self.driver.get_temperature()
    }

    /// Timestamp of the last sensor sample in ms.
    pub fn get_last_update(&self) -> u64 {
        self.driver.last_update_ms()
    }

    /// Calibrated ground pressure in Pascal.
    pub fn get_ground_pressure(&self) -> f32 {
        self.params.ground_pressure_pa
    }

    /// Calibrated ground temperature in degrees C.
    pub fn get_ground_temperature(&self) -> f32 {
        self.params.ground_temperature_c
    }

    /// Current parameters.
    pub fn params(&self) -> &BaroParams {
        &self.params
    }

    /// Mutable parameter access for the control surface.
    pub fn params_mut(&mut self) -> &mut BaroParams {
        &mut self.params
    }

    /// Calibrates the ground pressure and temperature.
    ///
    /// Three phases against the sensor: wait for the first healthy
    /// non-zero sample, let the sensor settle for ten passes, then blend
    /// five further samples into the ground values. Each phase aborts via
    /// [`Platform::fatal`] after [`BARO_CAL_TIMEOUT_MS`] without a healthy
    /// read.
    pub fn calibrate(&mut self) {
        let mut ground_pressure: f32 = 0.0;
        let mut ground_temperature: f32 = 0.0;

        // the altitude offset is for within a flight; calibration resets it
        self.params.alt_offset_m = 0.0;

        {
            let tstart = self.clock.now_ms();
            while ground_pressure == 0.0 || !self.driver.healthy() {
                self.driver.read();
                if self.clock.now_ms().saturating_sub(tstart) > BARO_CAL_TIMEOUT_MS {
                    self.clock
                        .fatal("Baro::read unsuccessful for more than 500ms in Baro::calibrate [1]");
                }
                ground_pressure = self.driver.get_pressure();
                ground_temperature = self.driver.get_temperature();
                self.clock.delay_ms(20);
            }
        }

        // let the sensor settle; the first second of output reads far off
        for _ in 0..10 {
            let tstart = self.clock.now_ms();
            loop {
                self.driver.read();
                if self.clock.now_ms().saturating_sub(tstart) > BARO_CAL_TIMEOUT_MS {
                    self.clock
                        .fatal("Baro::read unsuccessful for more than 500ms in Baro::calibrate [2]");
                }
                if self.driver.healthy() {
                    break;
                }
            }
            ground_pressure = self.driver.get_pressure();
            ground_temperature = self.driver.get_temperature();
            self.clock.delay_ms(100);
        }

        // average the ground values over five further samples
        for _ in 0..5 {
            let tstart = self.clock.now_ms();
            loop {
                self.driver.read();
                if self.clock.now_ms().saturating_sub(tstart) > BARO_CAL_TIMEOUT_MS {
                    self.clock
                        .fatal("Baro::read unsuccessful for more than 500ms in Baro::calibrate [3]");
                }
                if self.driver.healthy() {
                    break;
                }
            }
            ground_pressure = ground_pressure * 0.8 + self.driver.get_pressure() * 0.2;
            ground_temperature = ground_temperature * 0.8 + self.driver.get_temperature() * 0.2;
            self.clock.delay_ms(100);
        }

        self.params.ground_pressure_pa = ground_pressure;
        self.params.ground_temperature_c = ground_temperature;
        self.cal_time_ms = self.clock.now_ms();
    }

    /// Refreshes the ground calibration to the current sensor values.
    /// Used for incremental pre-arm updates without the full sequence.
    pub fn update_calibration(&mut self) {
        self.params.ground_pressure_pa = self.driver.get_pressure();
        self.params.ground_temperature_c = self.driver.get_temperature();
        self.cal_time_ms = self.clock.now_ms();
    }

    /// Altitude difference in metres between `pressure` and a base
    /// pressure, both in Pascal. Positive when `pressure` is lower than
    /// the base (higher up).
    ///
    /// Exact troposphere relation, within +-2.5 m of the standard
    /// atmosphere tables up to 11 km.
    pub fn get_altitude_difference(&self, base_pressure: f32, pressure: f32) -> f32 {
        let scaling = pressure / base_pressure;
        let temp = self.params.ground_temperature_c + 273.15;
        153.8462 * temp * (1.0 - expf(0.190259 * logf(scaling)))
    }

    /// Altitude in metres relative to the calibration point, including
    /// the altitude offset and the drift correction.
    ///
    /// The underlying pressure altitude is recomputed only when the
    /// driver has a newer sample than the cache; each refresh also feeds
    /// the climb rate filter.
    pub fn get_altitude(&mut self) -> f32 {
        if self.params.ground_pressure_pa == 0.0 {
            // called before calibration
            return 0.0;
        }

        let last_update = self.driver.last_update_ms();
        if self.last_altitude_t_ms == last_update {
            // no new information
            return self.altitude_m + self.params.alt_offset_m - self.drift_est_m;
        }

        self.altitude_m =
            self.get_altitude_difference(self.params.ground_pressure_pa, self.driver.get_pressure());
        self.last_altitude_t_ms = last_update;

        self.climb_rate_filter.update(self.altitude_m, last_update);

        self.altitude_m + self.params.alt_offset_m - self.drift_est_m
    }

    /// Climb rate in m/s, positive up. Derived from the 7-tap slope of
    /// the altitude cache over the sample timestamps.
    pub fn get_climb_rate(&mut self) -> f32 {
        // slope is m/ms
        self.climb_rate_filter.slope() * 1.0e3
    }

    /// Scale factor from equivalent to true airspeed at the current
    /// altitude, assuming the standard atmosphere lapse rate. Cached until
    /// the altitude moves by [`EAS2TAS_RECOMPUTE_ALT_M`].
    pub fn get_eas2tas(&mut self) -> f32 {
        if (self.altitude_m - self.last_altitude_eas2tas_m).abs() < EAS2TAS_RECOMPUTE_ALT_M
            && self.eas2tas != 0.0
        {
            // not enough change to require re-calculating
            return self.eas2tas;
        }

        let temp_k = self.params.ground_temperature_c + 273.15 - 0.0065 * self.altitude_m;
        self.eas2tas = safe_sqrt(1.225 / (self.driver.get_pressure() / (287.26 * temp_k)));
        self.last_altitude_eas2tas_m = self.altitude_m;
        self.eas2tas
    }

    /// Updates the drift estimate from an externally supplied altitude in
    /// metres (relative to the same zero as the barometric altitude) and
    /// the period `dt` in seconds between calls.
    ///
    /// For `BARO_DRIFT_INIT` seconds after calibration the external
    /// altitudes are averaged into a ground level; afterwards a low-pass
    /// filter with time constant `BARO_DRIFT_TC` tracks the innovation
    /// between barometric and external altitude. Innovations at or past
    /// the gate are dropped; a negative time constant disables the
    /// estimator entirely.
    pub fn update_drift_estimate(&mut self, alt: f32, dt: f32) {
        let init_window_ms = (self.params.drift_init_period_s * 1000.0) as u64;
        if self.clock.now_ms() < self.cal_time_ms + init_window_ms {
            self.drift_gnd_level_m += alt;
            self.drift_init_count += 1;
            return;
        }

        if self.drift_init_count > 0 {
            self.drift_gnd_level_m /= self.drift_init_count as f32;
            self.drift_init_count = 0;

            // let the estimate move away from zero with the same time
            // constant as the tracking below, so closing the init window
            // does not step the altitude
            self.drift_filter.set_time_constant(dt, self.params.drift_tc_s);
            self.drift_est_m = self.drift_filter.apply(0.0);
        }

        if self.params.drift_tc_s < 0.0 {
            self.drift_est_m = 0.0;
            return;
        }

        let innov =
            self.altitude_m + self.params.alt_offset_m - self.drift_est_m - (alt - self.drift_gnd_level_m);

        if innov < BARO_DRIFT_INNOVATION_GATE_M {
            self.drift_filter.set_time_constant(dt, self.params.drift_tc_s);
            self.drift_est_m = self.drift_filter.apply(innov + self.drift_est_m);
        } else {
            log_debug!("BARO: drift innovation {} m rejected", innov);
        }
    }

    /// Estimated barometric drift since calibration, metres.
    pub fn get_drift_estimate(&self) -> f32 {
        self.drift_est_m
    }

    /// Driver access for staged test fixtures.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
