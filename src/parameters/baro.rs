//! Barometer Parameter Definitions
//!
//! Calibration results and drift-estimator tunables. Storage indices 0 and
//! 1 of this group are reserved: they held the old integer ground
//! temperature and pressure and must never be reused.
//!
//! # Parameters
//!
//! - `BARO_ABS_PRESS` - Calibrated ground pressure, Pa
//! - `BARO_TEMP` - Calibrated ground temperature, deg C
//! - `BARO_ALT_OFFSET` - Offset added to barometric altitude, m
//! - `BARO_DRIFT_TC` - Drift estimator time constant, s (negative disables)
//! - `BARO_DRIFT_INIT` - Drift estimator ground-averaging window, s

use super::error::ParameterError;
use super::schema::ParamDescriptor;
use super::storage::{ParamFlags, ParamValue, ParameterStore};

const DEFAULT_GROUND_PRESSURE: f32 = 0.0;
const DEFAULT_GROUND_TEMPERATURE: f32 = 0.0;
const DEFAULT_ALT_OFFSET: f32 = 0.0;
const DEFAULT_DRIFT_TC: f32 = 180.0;
const DEFAULT_DRIFT_INIT_PERIOD: f32 = 180.0;

const MIN_GROUND_PRESSURE: f32 = 0.0;
const MAX_GROUND_PRESSURE: f32 = 150_000.0;

const MIN_GROUND_TEMPERATURE: f32 = -80.0;
const MAX_GROUND_TEMPERATURE: f32 = 80.0;

const MIN_ALT_OFFSET: f32 = -128.0;
const MAX_ALT_OFFSET: f32 = 127.0;

const MIN_DRIFT_TC: f32 = -1000.0;
const MAX_DRIFT_TC: f32 = 1000.0;

const MIN_DRIFT_INIT_PERIOD: f32 = 0.0;
const MAX_DRIFT_INIT_PERIOD: f32 = 600.0;

/// Barometer parameters loaded from the parameter store
#[derive(Debug, Clone)]
pub struct BaroParams {
    /// Calibrated ground pressure in Pa (BARO_ABS_PRESS)
    pub ground_pressure_pa: f32,
    /// Calibrated ground temperature in deg C (BARO_TEMP)
    pub ground_temperature_c: f32,
    /// Altitude offset in metres added to barometric altitude; reset to 0
    /// whenever the barometer is calibrated (BARO_ALT_OFFSET)
    pub alt_offset_m: f32,
    /// Drift estimator low-pass time constant in seconds; a negative value
    /// disables drift estimation (BARO_DRIFT_TC)
    pub drift_tc_s: f32,
    /// Seconds after calibration during which external altitudes are
    /// averaged into the drift ground level (BARO_DRIFT_INIT)
    pub drift_init_period_s: f32,
}

impl Default for BaroParams {
    fn default() -> Self {
        Self {
            ground_pressure_pa: DEFAULT_GROUND_PRESSURE,
            ground_temperature_c: DEFAULT_GROUND_TEMPERATURE,
            alt_offset_m: DEFAULT_ALT_OFFSET,
            drift_tc_s: DEFAULT_DRIFT_TC,
            drift_init_period_s: DEFAULT_DRIFT_INIT_PERIOD,
        }
    }
}

impl BaroParams {
    /// Persisted schema. Indices 0 and 1 are reserved (legacy integer
    /// ground values); this table starts at 2.
    pub const DESCRIPTORS: &'static [ParamDescriptor] = &[
        ParamDescriptor::new(
            "BARO_ABS_PRESS",
            2,
            DEFAULT_GROUND_PRESSURE,
            MIN_GROUND_PRESSURE,
            MAX_GROUND_PRESSURE,
        ),
        ParamDescriptor::new(
            "BARO_TEMP",
            3,
            DEFAULT_GROUND_TEMPERATURE,
            MIN_GROUND_TEMPERATURE,
            MAX_GROUND_TEMPERATURE,
        ),
        ParamDescriptor::new(
            "BARO_ALT_OFFSET",
            4,
            DEFAULT_ALT_OFFSET,
            MIN_ALT_OFFSET,
            MAX_ALT_OFFSET,
        ),
        ParamDescriptor::new("BARO_DRIFT_TC", 5, DEFAULT_DRIFT_TC, MIN_DRIFT_TC, MAX_DRIFT_TC),
        ParamDescriptor::new(
            "BARO_DRIFT_INIT",
            6,
            DEFAULT_DRIFT_INIT_PERIOD,
            MIN_DRIFT_INIT_PERIOD,
            MAX_DRIFT_INIT_PERIOD,
        ),
    ];

    /// Register barometer parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        for desc in Self::DESCRIPTORS {
            store.register(desc.name, ParamValue::Float(desc.default), ParamFlags::empty())?;
        }
        Ok(())
    }

    /// Load barometer parameters from parameter store
    pub fn from_store(store: &ParameterStore) -> Self {
        Self {
            ground_pressure_pa: load_float(store, &Self::DESCRIPTORS[0]),
            ground_temperature_c: load_float(store, &Self::DESCRIPTORS[1]),
            alt_offset_m: load_float(store, &Self::DESCRIPTORS[2]),
            drift_tc_s: load_float(store, &Self::DESCRIPTORS[3]),
            drift_init_period_s: load_float(store, &Self::DESCRIPTORS[4]),
        }
    }
}

/// Load a float parameter from store with clamping
fn load_float(store: &ParameterStore, desc: &ParamDescriptor) -> f32 {
    match store.get(desc.name) {
        Some(ParamValue::Float(v)) => desc.clamp(*v),
        Some(ParamValue::Int(v)) => desc.clamp(*v as f32),
        _ => desc.default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baro_params_defaults() {
        let params = BaroParams::default();
        assert!(params.ground_pressure_pa.abs() < 0.001);
        assert!(params.ground_temperature_c.abs() < 0.001);
        assert!(params.alt_offset_m.abs() < 0.001);
        assert!((params.drift_tc_s - 180.0).abs() < 0.001);
        assert!((params.drift_init_period_s - 180.0).abs() < 0.001);
    }

    #[test]
    fn test_reserved_indices_not_used() {
        for desc in BaroParams::DESCRIPTORS {
            assert!(desc.index >= 2, "{} uses a reserved index", desc.name);
        }
    }

    #[test]
    fn test_descriptor_indices_are_stable() {
        let expected = [
            ("BARO_ABS_PRESS", 2u8),
            ("BARO_TEMP", 3),
            ("BARO_ALT_OFFSET", 4),
            ("BARO_DRIFT_TC", 5),
            ("BARO_DRIFT_INIT", 6),
        ];
        assert_eq!(BaroParams::DESCRIPTORS.len(), expected.len());
        for (desc, (name, index)) in BaroParams::DESCRIPTORS.iter().zip(expected) {
            assert_eq!(desc.name, name);
            assert_eq!(desc.index, index);
        }
    }

    #[test]
    fn test_from_store_roundtrip() {
        let mut store = ParameterStore::new();
        BaroParams::register_defaults(&mut store).unwrap();

        store
            .set("BARO_ABS_PRESS", ParamValue::Float(101_325.0))
            .unwrap();
        store.set("BARO_TEMP", ParamValue::Float(15.0)).unwrap();
        store.set("BARO_DRIFT_TC", ParamValue::Float(-1.0)).unwrap();

        let params = BaroParams::from_store(&store);
        assert!((params.ground_pressure_pa - 101_325.0).abs() < 0.001);
        assert!((params.ground_temperature_c - 15.0).abs() < 0.001);
        assert!((params.drift_tc_s + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_negative_drift_tc_survives_load() {
        // disabling the estimator is an admissible stored value
        let mut store = ParameterStore::new();
        BaroParams::register_defaults(&mut store).unwrap();
        store
            .set("BARO_DRIFT_TC", ParamValue::Float(-100.0))
            .unwrap();
        let params = BaroParams::from_store(&store);
        assert!(params.drift_tc_s < 0.0);
    }
}
