//! Straight-segment waypoint engine
//!
//! Moves an intermediate position target (the "carrot") along a 3-D line
//! from origin to destination. The carrot's advance is limited two ways:
//! kinematically, by the track speed/acceleration derived from the
//! configured limits, and spatially, by how much of the position
//! controller's leash the vehicle's current tracking error leaves unused.
//! The vehicle can therefore never be commanded further than it is able to
//! follow.

use nalgebra::Vector3;

use super::{
    SegmentType, WpNav, WPNAV_ALT_HOLD_ACCEL_MAX, WPNAV_LEASH_LENGTH_MIN,
    WPNAV_SEGMENT_TIMEOUT_MS, WPNAV_STALE_DT, WPNAV_WP_SPEED_MIN, WPNAV_WP_UPDATE_TIME,
};
use crate::math::{get_bearing_cd, pythag2};
use crate::traits::{InertialNav, PosControl, TimeSource};

impl<C: TimeSource> WpNav<C> {
    /// Overrides the waypoint cruise speed in cm/s.
    pub fn set_horizontal_velocity<P: PosControl>(&mut self, velocity_cms: f32, pos_control: &mut P) {
        if self.params.wp_speed_cms >= WPNAV_WP_SPEED_MIN {
            self.params.wp_speed_cms = velocity_cms;
            pos_control.set_speed_xy(self.params.wp_speed_cms);
        }
    }

    /// Starts a straight segment to `destination` (cm from home).
    ///
    /// If the waypoint controller ran within the last second the current
    /// position target is reused as the origin, stitching segments without
    /// a step; otherwise the origin is the position controller's kinematic
    /// stopping point.
    pub fn set_wp_destination<I: InertialNav, P: PosControl>(
        &mut self,
        destination: Vector3<f32>,
        inav: &I,
        pos_control: &mut P,
    ) {
        let origin = if self.clock.now_ms().saturating_sub(self.wp_last_update_ms)
            < WPNAV_SEGMENT_TIMEOUT_MS
        {
            pos_control.get_pos_target()
        } else {
            let xy = pos_control.get_stopping_point_xy();
            Vector3::new(xy.x, xy.y, pos_control.get_stopping_point_z())
        };

        self.set_wp_origin_and_destination(origin, destination, inav, pos_control);
    }

    /// Starts a straight segment between explicit endpoints (cm from home).
    pub fn set_wp_origin_and_destination<I: InertialNav, P: PosControl>(
        &mut self,
        origin: Vector3<f32>,
        destination: Vector3<f32>,
        inav: &I,
        pos_control: &mut P,
    ) {
        self.origin = origin;
        self.destination = destination;
        let pos_delta = destination - origin;

        self.track_length = pos_delta.norm();
        if self.track_length == 0.0 {
            // zero-length segment: no direction to advance along
            self.pos_delta_unit = Vector3::zeros();
        } else {
            self.pos_delta_unit = pos_delta / self.track_length;
        }

        self.check_wp_accel();

        pos_control.set_speed_xy(self.params.wp_speed_cms);
        pos_control.set_accel_xy(self.params.wp_accel_cmss);
        pos_control.set_speed_z(-self.params.wp_speed_down_cms, self.params.wp_speed_up_cms);
        pos_control.calc_leash_length_xy();
        pos_control.calc_leash_length_z();

        self.calculate_wp_leash_length(pos_control);

        self.yaw_cd = get_bearing_cd(&self.origin, &self.destination);

        // intermediate target starts at the origin
        pos_control.set_pos_target(origin);
        self.track_desired = 0.0;
        self.flags.reached_destination = false;
        self.flags.fast_waypoint = false;
        self.flags.segment_type = SegmentType::Straight;

        // seed the carrot speed from the velocity already along the track
        let curr_vel = inav.get_velocity();
        let speed_along_track = curr_vel.dot(&self.pos_delta_unit);
        self.limited_speed_xy_cms = speed_along_track.clamp(0.0, self.params.wp_speed_cms);
    }

    /// Horizontal point the vehicle would stop at, in cm from home.
    pub fn get_wp_stopping_point_xy<P: PosControl>(&self, pos_control: &P) -> Vector3<f32> {
        let xy = pos_control.get_stopping_point_xy();
        Vector3::new(xy.x, xy.y, 0.0)
    }

    /// Horizontal distance to the destination in cm.
    pub fn get_wp_distance_to_destination<I: InertialNav>(&self, inav: &I) -> f32 {
        let curr = inav.get_position();
        pythag2(self.destination.x - curr.x, self.destination.y - curr.y)
    }

    /// Bearing from the vehicle to the destination in centi-degrees.
    pub fn get_wp_bearing_to_destination<I: InertialNav>(&self, inav: &I) -> i32 {
        get_bearing_cd(&inav.get_position(), &self.destination) as i32
    }

    /// Runs the straight-segment controller; call at ~10 Hz.
    pub fn update_wpnav<I: InertialNav, P: PosControl>(&mut self, inav: &I, pos_control: &mut P) {
        let now = self.clock.now_ms();
        let mut dt = now.saturating_sub(self.wp_last_update_ms) as f32 / 1000.0;

        if dt >= WPNAV_WP_UPDATE_TIME {
            if dt >= WPNAV_STALE_DT {
                dt = 0.0;
            }
            self.wp_last_update_ms = now;
            self.advance_wp_target_along_track(dt, inav, pos_control);
            pos_control.trigger_xy();
        } else {
            pos_control.update_xy_controller(false);
        }
    }

    /// Moves the intermediate target along the track from origin toward
    /// destination.
    fn advance_wp_target_along_track<I: InertialNav, P: PosControl>(
        &mut self,
        dt: f32,
        inav: &I,
        pos_control: &mut P,
    ) {
        let curr_pos = inav.get_position();
        let curr_delta = curr_pos - self.origin;

        // distance covered along the track and the off-track error
        let track_covered = curr_delta.dot(&self.pos_delta_unit);
        let track_error = curr_delta - self.pos_delta_unit * track_covered;
        let track_error_xy = pythag2(track_error.x, track_error.y);
        let track_error_z = track_error.z.abs();

        let leash_xy = pos_control.get_leash_xy();
        let leash_z = if track_error.z >= 0.0 {
            pos_control.get_leash_up_z()
        } else {
            pos_control.get_leash_down_z()
        };

        // how far ahead of the vehicle the target may sit before either
        // leash budget is exhausted
        let track_extra_max = f32::min(
            self.track_leash_length * (leash_z - track_error_z) / leash_z,
            self.track_leash_length * (leash_xy - track_error_xy) / leash_xy,
        );
        let track_desired_max = if track_extra_max < 0.0 {
            track_covered
        } else {
            track_covered + track_extra_max
        };

        let track_desired_old = self.track_desired;

        let curr_vel = inav.get_velocity();
        let speed_along_track = curr_vel.dot(&self.pos_delta_unit);

        // speed below which the position controller responds linearly
        let mut linear_velocity = self.params.wp_speed_cms;
        let kp = pos_control.get_pos_xy_kp();
        if kp >= 0.0 {
            linear_velocity = self.track_accel / kp;
        }

        if speed_along_track < -linear_velocity {
            // moving fast away from the waypoint: hold the target
            self.limited_speed_xy_cms = 0.0;
        } else {
            if dt > 0.0 {
                if track_desired_max > self.track_desired {
                    self.limited_speed_xy_cms += 2.0 * self.track_accel * dt;
                } else {
                    // leash budget exhausted: pin the target
                    self.track_desired = track_desired_max;
                }
            }
            if self.limited_speed_xy_cms > self.track_speed {
                self.limited_speed_xy_cms = self.track_speed;
            }
            // keep the target speed near the vehicle's own speed so the
            // carrot cannot run arbitrarily far ahead
            if speed_along_track.abs() < linear_velocity {
                self.limited_speed_xy_cms = self.limited_speed_xy_cms.clamp(
                    speed_along_track - linear_velocity,
                    speed_along_track + linear_velocity,
                );
            }
        }

        // advance, never past the segment end, never backwards
        let track_desired_temp =
            (track_desired_old + self.limited_speed_xy_cms * dt).clamp(0.0, self.track_length);
        self.track_desired = self.track_desired.max(track_desired_temp);

        pos_control.set_pos_target(self.origin + self.pos_delta_unit * self.track_desired);

        if !self.flags.reached_destination && self.track_desired >= self.track_length {
            if self.flags.fast_waypoint {
                self.flags.reached_destination = true;
            } else {
                // slow waypoints also need the vehicle itself at the point
                let dist_to_dest = curr_pos - self.destination;
                if dist_to_dest.norm() <= self.params.wp_radius_cm {
                    self.flags.reached_destination = true;
                }
            }
        }
    }

    /// Derives the along-track speed, acceleration and leash from the
    /// configured axis limits and the position controller's leashes.
    ///
    /// The axis limits are mapped through the track direction so that a
    /// full-leash deflection on any axis corresponds to the same
    /// along-track distance; on diagonal tracks the tighter axis governs.
    pub(super) fn calculate_wp_leash_length<P: PosControl>(&mut self, pos_control: &P) {
        let pos_delta_unit_xy = pythag2(self.pos_delta_unit.x, self.pos_delta_unit.y);
        let pos_delta_unit_z = self.pos_delta_unit.z.abs();

        let (speed_z, leash_z) = if self.pos_delta_unit.z >= 0.0 {
            (self.params.wp_speed_up_cms, pos_control.get_leash_up_z())
        } else {
            (self.params.wp_speed_down_cms, pos_control.get_leash_down_z())
        };

        if pos_delta_unit_z == 0.0 && pos_delta_unit_xy == 0.0 {
            self.track_accel = 0.0;
            self.track_speed = 0.0;
            self.track_leash_length = WPNAV_LEASH_LENGTH_MIN;
        } else if self.pos_delta_unit.z == 0.0 {
            self.track_accel = self.params.wp_accel_cmss / pos_delta_unit_xy;
            self.track_speed = self.params.wp_speed_cms / pos_delta_unit_xy;
            self.track_leash_length = pos_control.get_leash_xy() / pos_delta_unit_xy;
        } else if pos_delta_unit_xy == 0.0 {
            self.track_accel = WPNAV_ALT_HOLD_ACCEL_MAX / pos_delta_unit_z;
            self.track_speed = speed_z / pos_delta_unit_z;
            self.track_leash_length = leash_z / pos_delta_unit_z;
        } else {
            self.track_accel = f32::min(
                WPNAV_ALT_HOLD_ACCEL_MAX / pos_delta_unit_z,
                self.params.wp_accel_cmss / pos_delta_unit_xy,
            );
            self.track_speed = f32::min(
                speed_z / pos_delta_unit_z,
                self.params.wp_speed_cms / pos_delta_unit_xy,
            );
            self.track_leash_length = f32::min(
                leash_z / pos_delta_unit_z,
                pos_control.get_leash_xy() / pos_delta_unit_xy,
            );
        }
    }
}
