//! Waypoint and loiter navigation engine
//!
//! [`WpNav`] is the facade the flight mode layer talks to. It owns the
//! state of the active mode - loiter target dynamics, a straight waypoint
//! leg, or a Hermite spline leg - and at each tick publishes an
//! intermediate position target (plus, in loiter, a feed-forward velocity)
//! to the inner position controller.
//!
//! The engine is single-threaded and allocation free. Collaborators are
//! passed into each call so the engine holds no long-lived borrows; the
//! scheduler clock alone is threaded through the constructor.
//!
//! Per-tick ordering is strict: sample state, compute the new target,
//! publish it to the position controller, request its step.

mod loiter;
mod spline;
mod track;
mod types;

pub use types::{SegmentFlags, SegmentType, SplineSegmentEnd};

use nalgebra::Vector3;

use crate::log_warn;
use crate::parameters::WpNavParams;
use crate::traits::TimeSource;

/// Fallback horizontal acceleration when the configured value is
/// non-positive, cm/s/s.
pub const WPNAV_ACCELERATION: f32 = 100.0;

/// Lower clamp applied to the loiter speed parameter before it is used as
/// a divisor, cm/s.
pub const WPNAV_LOITER_SPEED_MIN: f32 = 100.0;

/// Loiter acceleration before the first target initialisation, cm/s/s.
pub const WPNAV_LOITER_ACCEL: f32 = 250.0;

/// Constant braking acceleration in loiter, cm/s/s. Together with the
/// speed-proportional term this stops the vehicle in finite time.
pub const WPNAV_LOITER_ACCEL_MIN: f32 = 25.0;

/// Minimum configured cruise speed for waypoint speed overrides, cm/s.
pub const WPNAV_WP_SPEED_MIN: f32 = 100.0;

/// Vertical acceleration ceiling along a climbing or descending track,
/// cm/s/s.
pub const WPNAV_ALT_HOLD_ACCEL_MAX: f32 = 250.0;

/// Leash length used for zero-length segments, cm. Keeps the along-track
/// leash strictly positive so the advance math never divides by zero.
pub const WPNAV_LEASH_LENGTH_MIN: f32 = 100.0;

/// Period of the waypoint/spline carrot advance, seconds (10 Hz).
pub const WPNAV_WP_UPDATE_TIME: f32 = 0.1;

/// Period of the loiter feed-forward integration, seconds (100 Hz).
pub const WPNAV_LOITER_UPDATE_TIME: f32 = 0.01;

/// A mode update gap at or beyond this is treated as a scheduler fault:
/// the integrator runs with dt = 0 for that tick.
pub const WPNAV_STALE_DT: f32 = 1.0;

/// Window after the last waypoint update during which the segment is
/// considered active for origin hand-over, ms.
pub const WPNAV_SEGMENT_TIMEOUT_MS: u64 = 1000;

/// Tangent scale applied to the origin-to-destination vector when the
/// vehicle is stopped at a spline endpoint.
pub const SPLINE_STOPPED_VEL_SCALE: f32 = 0.1;

/// Spline tangents are scaled down when their combined length exceeds this
/// multiple of the segment length, to stop long tangents bowing past a
/// short segment's destination.
pub const SPLINE_OVERSHOOT_VEL_FACTOR: f32 = 4.0;

/// Spline time overrun below which the remainder carries into the next
/// segment; larger overruns are discarded. Tuned in flight - do not change
/// without flight testing.
pub const SPLINE_TIME_ROLLOVER_MAX: f32 = 1.1;

/// Waypoint and loiter navigation engine.
///
/// Construct once with the platform clock and the loaded parameter group,
/// then drive the active mode: `update_loiter` at ~100 Hz, `update_wpnav`
/// or `update_spline` at ~10 Hz. Calling any `set_*` entry point supplants
/// the previous mode state atomically.
pub struct WpNav<C> {
    clock: C,
    params: WpNavParams,
    params_dirty: bool,

    // loiter state
    loiter_last_update_ms: u64,
    pilot_accel_fwd_cmss: f32,
    pilot_accel_rgt_cmss: f32,
    loiter_accel_cmss: f32,

    // waypoint leg state
    wp_last_update_ms: u64,
    origin: Vector3<f32>,
    destination: Vector3<f32>,
    pos_delta_unit: Vector3<f32>,
    track_length: f32,
    track_desired: f32,
    limited_speed_xy_cms: f32,
    track_accel: f32,
    track_speed: f32,
    track_leash_length: f32,
    flags: SegmentFlags,

    // spline leg state
    spline_time: f32,
    spline_vel_scaler: f32,
    spline_slow_down_dist: f32,
    spline_origin_vel: Vector3<f32>,
    spline_destination_vel: Vector3<f32>,
    hermite_solution: [Vector3<f32>; 4],

    // commanded heading in centi-degrees
    yaw_cd: f32,
}

impl<C: TimeSource> WpNav<C> {
    /// Creates an idle engine.
    pub fn new(clock: C, params: WpNavParams) -> Self {
        Self {
            clock,
            params,
            params_dirty: false,
            loiter_last_update_ms: 0,
            pilot_accel_fwd_cmss: 0.0,
            pilot_accel_rgt_cmss: 0.0,
            loiter_accel_cmss: WPNAV_LOITER_ACCEL,
            wp_last_update_ms: 0,
            origin: Vector3::zeros(),
            destination: Vector3::zeros(),
            pos_delta_unit: Vector3::zeros(),
            track_length: 0.0,
            track_desired: 0.0,
            limited_speed_xy_cms: 0.0,
            track_accel: 0.0,
            track_speed: 0.0,
            track_leash_length: 0.0,
            flags: SegmentFlags::default(),
            spline_time: 0.0,
            spline_vel_scaler: 0.0,
            spline_slow_down_dist: 0.0,
            spline_origin_vel: Vector3::zeros(),
            spline_destination_vel: Vector3::zeros(),
            hermite_solution: [Vector3::zeros(); 4],
            yaw_cd: 0.0,
        }
    }

    /// Current tunables.
    pub fn params(&self) -> &WpNavParams {
        &self.params
    }

    /// Mutable access for the control surface. The tick loop never writes
    /// parameters; a single-writer assumption applies.
    pub fn params_mut(&mut self) -> &mut WpNavParams {
        &mut self.params
    }

    /// True if the engine modified a parameter (e.g. clamped a bad
    /// acceleration) and the value should be written back to storage.
    pub fn params_dirty(&self) -> bool {
        self.params_dirty
    }

    /// Acknowledges a parameter write-back.
    pub fn clear_params_dirty(&mut self) {
        self.params_dirty = false;
    }

    /// Commanded heading for the active segment in centi-degrees.
    pub fn get_yaw(&self) -> f32 {
        self.yaw_cd
    }

    /// True once the active segment's arrival criterion has fired.
    pub fn reached_destination(&self) -> bool {
        self.flags.reached_destination
    }

    /// Status flags of the active segment.
    pub fn segment_flags(&self) -> SegmentFlags {
        self.flags
    }

    /// Origin of the active segment in cm from home.
    pub fn get_wp_origin(&self) -> Vector3<f32> {
        self.origin
    }

    /// Destination of the active segment in cm from home.
    pub fn get_wp_destination(&self) -> Vector3<f32> {
        self.destination
    }

    /// Clamps a non-positive configured acceleration back to the default.
    /// The corrected value is flagged for persistence.
    fn check_wp_accel(&mut self) {
        if self.params.wp_accel_cmss <= 0.0 {
            log_warn!("WPNAV: non-positive accel, reset to default");
            self.params.wp_accel_cmss = WPNAV_ACCELERATION;
            self.params_dirty = true;
        }
    }
}
