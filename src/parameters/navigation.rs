//! Waypoint / Loiter Navigation Parameter Definitions
//!
//! Tunables of the navigation engine. The storage indices in
//! [`WpNavParams::DESCRIPTORS`] are part of the non-volatile format and
//! must not be renumbered (index 0 of the historical table was the old
//! orientation matrix and has long been retired from this group's layout).
//!
//! # Parameters
//!
//! - `WPNAV_SPEED` - Horizontal cruise speed during missions, cm/s
//! - `WPNAV_RADIUS` - Distance from a waypoint at which it counts as hit, cm
//! - `WPNAV_SPEED_UP` - Climb speed during missions, cm/s
//! - `WPNAV_SPEED_DN` - Descent speed during missions, cm/s
//! - `WPNAV_LOIT_SPEED` - Maximum horizontal speed in loiter, cm/s
//! - `WPNAV_ACCEL` - Horizontal acceleration during missions, cm/s/s

use super::error::ParameterError;
use super::schema::ParamDescriptor;
use super::storage::{ParamFlags, ParamValue, ParameterStore};

const DEFAULT_WP_SPEED: f32 = 500.0;
const DEFAULT_WP_RADIUS: f32 = 200.0;
const DEFAULT_WP_SPEED_UP: f32 = 250.0;
const DEFAULT_WP_SPEED_DOWN: f32 = 150.0;
const DEFAULT_LOITER_SPEED: f32 = 500.0;
const DEFAULT_WP_ACCEL: f32 = 100.0;

const MIN_WP_SPEED: f32 = 0.0;
const MAX_WP_SPEED: f32 = 2000.0;

const MIN_WP_RADIUS: f32 = 100.0;
const MAX_WP_RADIUS: f32 = 1000.0;

const MIN_SPEED_Z: f32 = 0.0;
const MAX_SPEED_Z: f32 = 1000.0;

const MIN_LOITER_SPEED: f32 = 0.0;
const MAX_LOITER_SPEED: f32 = 2000.0;

const MIN_WP_ACCEL: f32 = 50.0;
const MAX_WP_ACCEL: f32 = 500.0;

/// Navigation engine parameters loaded from the parameter store
#[derive(Debug, Clone)]
pub struct WpNavParams {
    /// Horizontal cruise speed in cm/s (WPNAV_SPEED)
    pub wp_speed_cms: f32,
    /// Waypoint acceptance radius in cm (WPNAV_RADIUS)
    pub wp_radius_cm: f32,
    /// Climb speed in cm/s (WPNAV_SPEED_UP)
    pub wp_speed_up_cms: f32,
    /// Descent speed magnitude in cm/s (WPNAV_SPEED_DN)
    pub wp_speed_down_cms: f32,
    /// Maximum loiter horizontal speed in cm/s (WPNAV_LOIT_SPEED)
    pub loiter_speed_cms: f32,
    /// Horizontal acceleration along the track in cm/s/s (WPNAV_ACCEL)
    pub wp_accel_cmss: f32,
}

impl Default for WpNavParams {
    fn default() -> Self {
        Self {
            wp_speed_cms: DEFAULT_WP_SPEED,
            wp_radius_cm: DEFAULT_WP_RADIUS,
            wp_speed_up_cms: DEFAULT_WP_SPEED_UP,
            wp_speed_down_cms: DEFAULT_WP_SPEED_DOWN,
            loiter_speed_cms: DEFAULT_LOITER_SPEED,
            wp_accel_cmss: DEFAULT_WP_ACCEL,
        }
    }
}

impl WpNavParams {
    /// Persisted schema. Indices are stable storage slots.
    pub const DESCRIPTORS: &'static [ParamDescriptor] = &[
        ParamDescriptor::new("WPNAV_SPEED", 0, DEFAULT_WP_SPEED, MIN_WP_SPEED, MAX_WP_SPEED),
        ParamDescriptor::new(
            "WPNAV_RADIUS",
            1,
            DEFAULT_WP_RADIUS,
            MIN_WP_RADIUS,
            MAX_WP_RADIUS,
        ),
        ParamDescriptor::new(
            "WPNAV_SPEED_UP",
            2,
            DEFAULT_WP_SPEED_UP,
            MIN_SPEED_Z,
            MAX_SPEED_Z,
        ),
        ParamDescriptor::new(
            "WPNAV_SPEED_DN",
            3,
            DEFAULT_WP_SPEED_DOWN,
            MIN_SPEED_Z,
            MAX_SPEED_Z,
        ),
        ParamDescriptor::new(
            "WPNAV_LOIT_SPEED",
            4,
            DEFAULT_LOITER_SPEED,
            MIN_LOITER_SPEED,
            MAX_LOITER_SPEED,
        ),
        ParamDescriptor::new("WPNAV_ACCEL", 5, DEFAULT_WP_ACCEL, MIN_WP_ACCEL, MAX_WP_ACCEL),
    ];

    /// Register navigation parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        for desc in Self::DESCRIPTORS {
            store.register(desc.name, ParamValue::Float(desc.default), ParamFlags::empty())?;
        }
        Ok(())
    }

    /// Load navigation parameters from parameter store
    pub fn from_store(store: &ParameterStore) -> Self {
        Self {
            wp_speed_cms: load_float(store, &Self::DESCRIPTORS[0]),
            wp_radius_cm: load_float(store, &Self::DESCRIPTORS[1]),
            wp_speed_up_cms: load_float(store, &Self::DESCRIPTORS[2]),
            wp_speed_down_cms: load_float(store, &Self::DESCRIPTORS[3]),
            loiter_speed_cms: load_float(store, &Self::DESCRIPTORS[4]),
            wp_accel_cmss: load_float(store, &Self::DESCRIPTORS[5]),
        }
    }

    /// Validate navigation parameters
    pub fn is_valid(&self) -> bool {
        if self.wp_speed_cms < MIN_WP_SPEED || self.wp_speed_cms > MAX_WP_SPEED {
            return false;
        }
        if self.wp_radius_cm < MIN_WP_RADIUS || self.wp_radius_cm > MAX_WP_RADIUS {
            return false;
        }
        if self.wp_speed_up_cms < MIN_SPEED_Z || self.wp_speed_up_cms > MAX_SPEED_Z {
            return false;
        }
        if self.wp_speed_down_cms < MIN_SPEED_Z || self.wp_speed_down_cms > MAX_SPEED_Z {
            return false;
        }
        if self.loiter_speed_cms < MIN_LOITER_SPEED || self.loiter_speed_cms > MAX_LOITER_SPEED {
            return false;
        }
        if self.wp_accel_cmss < MIN_WP_ACCEL || self.wp_accel_cmss > MAX_WP_ACCEL {
            return false;
        }
        true
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
