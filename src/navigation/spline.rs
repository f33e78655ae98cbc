//! Spline-segment waypoint engine
//!
//! Joins waypoints with a Hermite cubic so consecutive segments share a
//! tangent at the junction. The curve is flown by re-parameterising time:
//! each tick the engine samples position and velocity at the current curve
//! parameter, picks a target speed (accelerating toward cruise, or the
//! square-root braking profile when approaching a stopping waypoint) and
//! advances the parameter at the rate that yields that speed.

use libm::atan2f;
use nalgebra::Vector3;

use super::{
    SegmentType, SplineSegmentEnd, WpNav, SPLINE_OVERSHOOT_VEL_FACTOR, SPLINE_STOPPED_VEL_SCALE,
    SPLINE_TIME_ROLLOVER_MAX, WPNAV_SEGMENT_TIMEOUT_MS, WPNAV_STALE_DT, WPNAV_WP_UPDATE_TIME,
};
use crate::math::{safe_sqrt, wrap_360_cd, RAD_TO_CD};
use crate::traits::{Ahrs, PosControl, TimeSource};

impl<C: TimeSource> WpNav<C> {
    /// Starts a spline segment to `destination` (cm from home).
    ///
    /// `stopped_at_start` should be true if the vehicle is stationary at
    /// the origin. `seg_end_type` describes the following segment and
    /// selects the destination tangent; `next_destination` must be set for
    /// the `Straight` and `Spline` end types.
    ///
    /// If the previous waypoint was just reached its destination becomes
    /// the origin; otherwise the position controller's stopping point is
    /// used.
    pub fn set_spline_destination<A: Ahrs, P: PosControl>(
        &mut self,
        destination: Vector3<f32>,
        stopped_at_start: bool,
        seg_end_type: SplineSegmentEnd,
        next_destination: Vector3<f32>,
        ahrs: &A,
        pos_control: &mut P,
    ) {
        let origin = if self.flags.reached_destination
            && self.clock.now_ms().saturating_sub(self.wp_last_update_ms)
                < WPNAV_SEGMENT_TIMEOUT_MS
        {
            self.destination
        } else {
            let xy = pos_control.get_stopping_point_xy();
            Vector3::new(xy.x, xy.y, pos_control.get_stopping_point_z())
        };

        self.set_spline_origin_and_destination(
            origin,
            destination,
            stopped_at_start,
            seg_end_type,
            next_destination,
            ahrs,
            pos_control,
        );
    }

    /// Starts a spline segment between explicit endpoints (cm from home).
    #[allow(clippy::too_many_arguments)]
    pub fn set_spline_origin_and_destination<A: Ahrs, P: PosControl>(
        &mut self,
        origin: Vector3<f32>,
        destination: Vector3<f32>,
        stopped_at_start: bool,
        seg_end_type: SplineSegmentEnd,
        next_destination: Vector3<f32>,
        ahrs: &A,
        pos_control: &mut P,
    ) {
        // the previous segment can seed our origin tangent only if it just
        // completed and the controller has been running
        let prev_segment_exists = self.flags.reached_destination
            && self.clock.now_ms().saturating_sub(self.wp_last_update_ms)
                < WPNAV_SEGMENT_TIMEOUT_MS;

        self.check_wp_accel();

        // origin tangent
        if stopped_at_start || !prev_segment_exists {
            // no usable previous motion: aim gently at the destination
            self.spline_origin_vel = (destination - origin) * SPLINE_STOPPED_VEL_SCALE;
            self.spline_time = 0.0;
            self.spline_vel_scaler = 0.0;
        } else {
            match self.flags.segment_type {
                SegmentType::Straight => {
                    // fly straight through the junction along the previous leg
                    self.spline_origin_vel = self.destination - self.origin;
                    self.spline_time = 0.0;
                    self.spline_vel_scaler = 0.0;
                }
                SegmentType::Spline => {
                    // continuity: reuse the previous segment's exit tangent
                    self.spline_origin_vel = self.spline_destination_vel;
                    if self.spline_time > 1.0 && self.spline_time < SPLINE_TIME_ROLLOVER_MAX {
                        // carry the small overrun into this segment
                        self.spline_time -= 1.0;
                    } else {
                        self.spline_time = 0.0;
                    }
                    self.spline_vel_scaler = 0.0;
                }
            }
        }

        // destination tangent, from the type of the next segment
        match seg_end_type {
            SplineSegmentEnd::Stop => {
                self.spline_destination_vel = (destination - origin) * SPLINE_STOPPED_VEL_SCALE;
                self.flags.fast_waypoint = false;
            }
            SplineSegmentEnd::Straight => {
                self.spline_destination_vel = next_destination - destination;
                self.flags.fast_waypoint = true;
            }
            SplineSegmentEnd::Spline => {
                self.spline_destination_vel = next_destination - origin;
                self.flags.fast_waypoint = true;
            }
        }

        // long tangents bow a short segment past its destination; scale
        // them down when their combined length exceeds the guard factor
        let vel_len = (self.spline_origin_vel + self.spline_destination_vel).norm();
        let pos_len = (destination - origin).norm() * SPLINE_OVERSHOOT_VEL_FACTOR;
        if vel_len > pos_len {
            let vel_scaling = pos_len / vel_len;
            self.update_spline_solution(
                origin,
                destination,
                self.spline_origin_vel * vel_scaling,
                self.spline_destination_vel * vel_scaling,
            );
        } else {
            self.update_spline_solution(
                origin,
                destination,
                self.spline_origin_vel,
                self.spline_destination_vel,
            );
        }

        // heading starts at the current yaw and follows the curve tangent
        // once the segment is flown
        self.yaw_cd = ahrs.yaw_sensor() as f32;

        self.origin = origin;
        self.destination = destination;

        pos_control.set_speed_xy(self.params.wp_speed_cms);
        pos_control.set_accel_xy(self.params.wp_accel_cmss);
        pos_control.set_speed_z(-self.params.wp_speed_down_cms, self.params.wp_speed_up_cms);
        pos_control.calc_leash_length_xy();
        pos_control.calc_leash_length_z();

        self.calculate_wp_leash_length(pos_control);

        // braking distance for stopping waypoints; evaluated once per
        // segment, deliberately not refreshed if the limits change mid-leg
        self.spline_slow_down_dist =
            self.params.wp_speed_cms * self.params.wp_speed_cms / (2.0 * self.params.wp_accel_cmss);

        pos_control.set_pos_target(origin);
        self.flags.reached_destination = false;
        self.flags.segment_type = SegmentType::Spline;
    }

    /// Runs the spline controller; call at ~10 Hz. Does nothing unless the
    /// active segment is a spline.
    pub fn update_spline<P: PosControl>(&mut self, pos_control: &mut P) {
        if self.flags.segment_type != SegmentType::Spline {
            return;
        }

        let now = self.clock.now_ms();
        let mut dt = now.saturating_sub(self.wp_last_update_ms) as f32 / 1000.0;

        if dt >= WPNAV_WP_UPDATE_TIME {
            if dt >= WPNAV_STALE_DT {
                dt = 0.0;
            }
            self.wp_last_update_ms = now;
            self.advance_spline_target_along_track(dt, pos_control);
            pos_control.trigger_xy();
        } else {
            pos_control.update_xy_controller(false);
        }
    }

    /// Stores the Hermite coefficients for the segment.
    fn update_spline_solution(
        &mut self,
        origin: Vector3<f32>,
        dest: Vector3<f32>,
        origin_vel: Vector3<f32>,
        dest_vel: Vector3<f32>,
    ) {
        self.hermite_solution[0] = origin;
        self.hermite_solution[1] = origin_vel;
        self.hermite_solution[2] = -origin * 3.0 - origin_vel * 2.0 + dest * 3.0 - dest_vel;
        self.hermite_solution[3] = origin * 2.0 + origin_vel - dest * 2.0 + dest_vel;
    }

    /// Moves the intermediate target along the curve.
    fn advance_spline_target_along_track<P: PosControl>(&mut self, dt: f32, pos_control: &mut P) {
        if self.flags.reached_destination {
            return;
        }

        let (target_pos, target_vel) = self.calc_spline_pos_vel(self.spline_time);

        let spline_dist_to_wp = (self.destination - target_pos).norm();

        if !self.flags.fast_waypoint && spline_dist_to_wp < self.spline_slow_down_dist {
            // braking profile into a stopping waypoint
            self.spline_vel_scaler =
                safe_sqrt(spline_dist_to_wp * 2.0 * self.params.wp_accel_cmss);
        } else if self.spline_vel_scaler < self.params.wp_speed_cms {
            // per-tick acceleration at the 10 Hz update rate
            self.spline_vel_scaler += self.params.wp_accel_cmss * WPNAV_WP_UPDATE_TIME;
        }

        if self.spline_vel_scaler > self.params.wp_speed_cms {
            self.spline_vel_scaler = self.params.wp_speed_cms;
        }

        // advance curve time at the rate that yields the target speed
        let spline_time_scale = self.spline_vel_scaler / target_vel.norm();

        pos_control.set_pos_target(target_pos);

        self.yaw_cd = wrap_360_cd(atan2f(target_vel.y, target_vel.x) * RAD_TO_CD);

        self.spline_time += spline_time_scale * dt;

        if self.spline_time >= 1.0 {
            self.flags.reached_destination = true;
        }
    }

    /// Samples the Hermite cubic and its derivative at `spline_time`.
    fn calc_spline_pos_vel(&self, spline_time: f32) -> (Vector3<f32>, Vector3<f32>) {
        let spline_time_sqrd = spline_time * spline_time;
        let spline_time_cubed = spline_time_sqrd * spline_time;

        let position = self.hermite_solution[0]
            + self.hermite_solution[1] * spline_time
            + self.hermite_solution[2] * spline_time_sqrd
            + self.hermite_solution[3] * spline_time_cubed;

        let velocity = self.hermite_solution[1]
            + self.hermite_solution[2] * (2.0 * spline_time)
            + self.hermite_solution[3] * (3.0 * spline_time_sqrd);

        (position, velocity)
    }
}
