//! Loiter controller
//!
//! Holds position while the pilot perturbs the target through roll/pitch
//! stick input. Stick deflection maps to a body-frame acceleration which
//! is rotated into the north/east frame and integrated into a feed-forward
//! velocity for the position controller. A blend of speed-proportional
//! drag and constant friction brings the velocity back to zero in finite
//! time once the sticks are centred.

use nalgebra::{Vector2, Vector3};

use super::{
    WpNav, WPNAV_LOITER_ACCEL_MIN, WPNAV_LOITER_SPEED_MIN, WPNAV_LOITER_UPDATE_TIME,
    WPNAV_STALE_DT,
};
use crate::math::{get_bearing_cd, pythag2};
use crate::traits::{Ahrs, InertialNav, PosControl, TimeSource};

/// Full stick deflection in centi-degrees; stick input is normalised
/// against this to scale the commanded acceleration.
pub const LOITER_STICK_FULL_SCALE_CD: f32 = 4500.0;

impl<C: TimeSource> WpNav<C> {
    /// Starts loitering about the current position.
    ///
    /// The target is seeded from the current inertial estimate (the
    /// requested hold point documents intent only, so the inner loop never
    /// sees a step) and the feed-forward velocity is zeroed.
    pub fn set_loiter_target<I: InertialNav, P: PosControl>(
        &mut self,
        _position: Vector3<f32>,
        inav: &I,
        pos_control: &mut P,
    ) {
        pos_control.set_pos_target(inav.get_position());
        pos_control.set_desired_velocity(0.0, 0.0);
        self.init_loiter_limits(pos_control);
    }

    /// Starts loitering from the current position and velocity.
    ///
    /// Unlike [`set_loiter_target`](Self::set_loiter_target) the
    /// feed-forward velocity is seeded from the inertial estimate, so an
    /// entry at speed decelerates smoothly instead of stopping dead.
    pub fn init_loiter_target<I: InertialNav, P: PosControl>(
        &mut self,
        inav: &I,
        pos_control: &mut P,
    ) {
        let curr_vel = inav.get_velocity();
        pos_control.set_pos_target(inav.get_position());
        pos_control.set_desired_velocity(curr_vel.x, curr_vel.y);
        self.init_loiter_limits(pos_control);
    }

    /// Configures the position controller limits for loiter and resets
    /// pilot input.
    fn init_loiter_limits<P: PosControl>(&mut self, pos_control: &mut P) {
        pos_control.set_speed_xy(self.params.loiter_speed_cms);
        self.loiter_accel_cmss = self.params.loiter_speed_cms / 2.0;
        pos_control.set_accel_xy(self.loiter_accel_cmss);
        self.pilot_accel_fwd_cmss = 0.0;
        self.pilot_accel_rgt_cmss = 0.0;
    }

    /// Overrides the maximum loiter speed in cm/s. Values below the
    /// minimum are ignored.
    pub fn set_loiter_velocity<P: PosControl>(&mut self, velocity_cms: f32, pos_control: &mut P) {
        if velocity_cms >= WPNAV_LOITER_SPEED_MIN {
            self.params.loiter_speed_cms = velocity_cms;
            pos_control.set_speed_xy(self.params.loiter_speed_cms);
            self.loiter_accel_cmss = self.params.loiter_speed_cms / 2.0;
            pos_control.set_accel_xy(self.loiter_accel_cmss);
        }
    }

    /// Maps pilot roll/pitch stick positions (centi-degrees, +-4500) to a
    /// body-frame acceleration demand. Forward stick is nose-down, hence
    /// the inverted pitch sign.
    pub fn set_pilot_desired_acceleration(&mut self, control_roll: f32, control_pitch: f32) {
        self.pilot_accel_fwd_cmss =
            -control_pitch * self.loiter_accel_cmss / LOITER_STICK_FULL_SCALE_CD;
        self.pilot_accel_rgt_cmss =
            control_roll * self.loiter_accel_cmss / LOITER_STICK_FULL_SCALE_CD;
    }

    /// Horizontal point the vehicle would stop at, in cm from home.
    pub fn get_loiter_stopping_point_xy<P: PosControl>(&self, pos_control: &P) -> Vector3<f32> {
        let xy = pos_control.get_stopping_point_xy();
        Vector3::new(xy.x, xy.y, 0.0)
    }

    /// Bearing from the vehicle to the loiter target in centi-degrees.
    pub fn get_loiter_bearing_to_target<I: InertialNav, P: PosControl>(
        &self,
        inav: &I,
        pos_control: &P,
    ) -> i32 {
        get_bearing_cd(&inav.get_position(), &pos_control.get_pos_target()) as i32
    }

    /// Runs the loiter controller; call at ~100 Hz.
    ///
    /// The feed-forward integration runs once per
    /// [`WPNAV_LOITER_UPDATE_TIME`]; intermediate calls step the inner
    /// horizontal position controller instead.
    pub fn update_loiter<A: Ahrs, P: PosControl>(&mut self, ahrs: &A, pos_control: &mut P) {
        let now = self.clock.now_ms();
        let mut dt = now.saturating_sub(self.loiter_last_update_ms) as f32 / 1000.0;

        if dt >= WPNAV_LOITER_UPDATE_TIME {
            // a stale gap means the scheduler starved us; restart the
            // integration rather than integrating a huge step
            if dt >= WPNAV_STALE_DT {
                dt = 0.0;
            }
            self.loiter_last_update_ms = now;
            self.calc_loiter_desired_velocity(dt, ahrs, pos_control);
            pos_control.trigger_xy();
        } else {
            pos_control.update_xy_controller(true);
        }
    }

    /// Integrates pilot acceleration into the feed-forward velocity and
    /// applies the synthetic drag, then hands the result to the position
    /// controller.
    fn calc_loiter_desired_velocity<A: Ahrs, P: PosControl>(
        &mut self,
        nav_dt: f32,
        ahrs: &A,
        pos_control: &mut P,
    ) {
        if nav_dt < 0.0 {
            return;
        }

        // keep the speed parameter usable as a divisor
        if self.params.loiter_speed_cms < WPNAV_LOITER_SPEED_MIN {
            self.params.loiter_speed_cms = WPNAV_LOITER_SPEED_MIN;
            self.loiter_accel_cmss = self.params.loiter_speed_cms / 2.0;
        }

        // rotate pilot input into the north/east frame
        let desired_accel = Vector2::new(
            self.pilot_accel_fwd_cmss * ahrs.cos_yaw() - self.pilot_accel_rgt_cmss * ahrs.sin_yaw(),
            self.pilot_accel_fwd_cmss * ahrs.sin_yaw() + self.pilot_accel_rgt_cmss * ahrs.cos_yaw(),
        );

        let mut desired_vel = pos_control.get_desired_velocity();
        desired_vel += desired_accel * nav_dt;

        self.apply_loiter_drag(&mut desired_vel.x, nav_dt);
        self.apply_loiter_drag(&mut desired_vel.y, nav_dt);

        // cap the total horizontal speed
        let vel_total = pythag2(desired_vel.x, desired_vel.y);
        if vel_total > self.params.loiter_speed_cms && vel_total > 0.0 {
            desired_vel.x = self.params.loiter_speed_cms * desired_vel.x / vel_total;
            desired_vel.y = self.params.loiter_speed_cms * desired_vel.y / vel_total;
        }

        pos_control.set_desired_velocity(desired_vel.x, desired_vel.y);
    }

    /// Per-axis synthetic drag: a speed-proportional term plus a constant
    /// friction term clamped so braking never reverses the sign.
    fn apply_loiter_drag(&self, vel: &mut f32, nav_dt: f32) {
        if *vel > 0.0 {
            *vel -= (self.loiter_accel_cmss - WPNAV_LOITER_ACCEL_MIN) * nav_dt * *vel
                / self.params.loiter_speed_cms;
            *vel = (*vel - WPNAV_LOITER_ACCEL_MIN * nav_dt).max(0.0);
        } else if *vel < 0.0 {
            *vel -= (self.loiter_accel_cmss - WPNAV_LOITER_ACCEL_MIN) * nav_dt * *vel
                / self.params.loiter_speed_cms;
            *vel = (*vel + WPNAV_LOITER_ACCEL_MIN * nav_dt).min(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::WpNavParams;
    use crate::traits::{MockAhrs, MockClock, MockInertialNav, MockPosControl};
    use core::f32::consts::FRAC_PI_2;

    fn setup() -> (MockClock, MockInertialNav, MockAhrs, MockPosControl) {
        (
            MockClock::new(),
            MockInertialNav::new(),
            MockAhrs::new(),
            MockPosControl::new(),
        )
    }

    #[test]
    fn test_init_loiter_target_seeds_velocity() {
        let (clock, inav, _ahrs, mut pos) = setup();
        let mut nav = WpNav::new(&clock, WpNavParams::default());

        inav.set_position(Vector3::new(100.0, 200.0, 300.0));
        inav.set_velocity(Vector3::new(50.0, -30.0, 10.0));
        nav.init_loiter_target(&inav, &mut pos);

        let target = pos.get_pos_target();
        assert!((target.x - 100.0).abs() < 0.001);
        assert!((target.z - 300.0).abs() < 0.001);

        let vel = pos.get_desired_velocity();
        assert!((vel.x - 50.0).abs() < 0.001);
        assert!((vel.y + 30.0).abs() < 0.001);

        // loiter limits pushed to the inner controller
        assert!((pos.speed_xy() - 500.0).abs() < 0.001);
        assert!((pos.accel_xy() - 250.0).abs() < 0.001);
    }

    #[test]
    fn test_set_loiter_target_zeroes_velocity() {
        let (clock, inav, _ahrs, mut pos) = setup();
        let mut nav = WpNav::new(&clock, WpNavParams::default());

        inav.set_position(Vector3::new(10.0, 20.0, 30.0));
        inav.set_velocity(Vector3::new(100.0, 100.0, 0.0));
        nav.set_loiter_target(Vector3::new(999.0, 999.0, 999.0), &inav, &mut pos);

        let target = pos.get_pos_target();
        assert!((target.x - 10.0).abs() < 0.001);
        let vel = pos.get_desired_velocity();
        assert!(vel.norm() < 0.001);
    }

    #[test]
    fn test_pilot_acceleration_mapping() {
        let (clock, inav, _ahrs, mut pos) = setup();
        let mut nav = WpNav::new(&clock, WpNavParams::default());
        nav.init_loiter_target(&inav, &mut pos); // loiter_accel = 250

        // full forward stick (pitch negative) accelerates forward
        nav.set_pilot_desired_acceleration(0.0, -4500.0);
        assert!((nav.pilot_accel_fwd_cmss - 250.0).abs() < 0.001);
        assert!(nav.pilot_accel_rgt_cmss.abs() < 0.001);

        // full right roll accelerates right
        nav.set_pilot_desired_acceleration(4500.0, 0.0);
        assert!(nav.pilot_accel_fwd_cmss.abs() < 0.001);
        assert!((nav.pilot_accel_rgt_cmss - 250.0).abs() < 0.001);

        // half stick scales linearly
        nav.set_pilot_desired_acceleration(2250.0, 0.0);
        assert!((nav.pilot_accel_rgt_cmss - 125.0).abs() < 0.001);
    }

    #[test]
    fn test_loiter_steady_state_full_right_roll() {
        // full right roll with yaw north must converge east at the speed cap
        let (clock, inav, ahrs, mut pos) = setup();
        let mut nav = WpNav::new(&clock, WpNavParams::default());
        nav.init_loiter_target(&inav, &mut pos);
        nav.set_pilot_desired_acceleration(4500.0, 0.0);

        for _ in 0..1000 {
            clock.advance_ms(10);
            nav.update_loiter(&ahrs, &mut pos);
            let vel = pos.get_desired_velocity();
            assert!(
                vel.norm() <= 500.0 + 0.01,
                "feed-forward speed {} exceeds cap",
                vel.norm()
            );
        }

        // the discrete drag fixed point sits just under the cap
        let vel = pos.get_desired_velocity();
        assert!(vel.x.abs() < 1.0, "north component {} should be ~0", vel.x);
        assert!(
            (vel.y - 500.0).abs() < 5.0,
            "east component {} should converge at the cap",
            vel.y
        );
    }

    #[test]
    fn test_loiter_acceleration_rotated_by_yaw() {
        // yaw east: forward stick now accelerates east
        let (clock, inav, ahrs, mut pos) = setup();
        let mut nav = WpNav::new(&clock, WpNavParams::default());
        ahrs.set_yaw(FRAC_PI_2);
        nav.init_loiter_target(&inav, &mut pos);
        nav.set_pilot_desired_acceleration(0.0, -4500.0);

        for _ in 0..200 {
            clock.advance_ms(10);
            nav.update_loiter(&ahrs, &mut pos);
        }

        let vel = pos.get_desired_velocity();
        assert!(vel.y > 100.0, "east component {} should grow", vel.y);
        assert!(vel.x.abs() < 1.0, "north component {} should stay ~0", vel.x);
    }

    #[test]
    fn test_loiter_velocity_decays_to_exact_zero() {
        // sticks centred: combined drag must null the velocity in finite time
        let (clock, inav, ahrs, mut pos) = setup();
        let mut nav = WpNav::new(&clock, WpNavParams::default());
        inav.set_velocity(Vector3::new(300.0, -200.0, 0.0));
        nav.init_loiter_target(&inav, &mut pos);

        let mut zero_at_s = None;
        for i in 0..2500 {
            clock.advance_ms(10);
            nav.update_loiter(&ahrs, &mut pos);
            if pos.get_desired_velocity().norm() == 0.0 {
                zero_at_s = Some(i as f32 * 0.01);
                break;
            }
        }

        let t = zero_at_s.expect("velocity never reached zero");
        assert!(t < 25.0, "decay took {} s", t);

        // and stays there
        for _ in 0..100 {
            clock.advance_ms(10);
            nav.update_loiter(&ahrs, &mut pos);
        }
        assert!(pos.get_desired_velocity().norm() == 0.0);
    }

    #[test]
    fn test_update_loiter_gates_on_period() {
        let (clock, _inav, ahrs, mut pos) = setup();
        let mut nav = WpNav::new(&clock, WpNavParams::default());

        // below the period: only the inner controller steps
        clock.advance_ms(5);
        nav.update_loiter(&ahrs, &mut pos);
        assert_eq!(pos.trigger_count, 0);
        assert_eq!(pos.update_count, 1);

        // at the period: integration runs and the controller is triggered
        clock.advance_ms(5);
        nav.update_loiter(&ahrs, &mut pos);
        assert_eq!(pos.trigger_count, 1);
    }

    #[test]
    fn test_stale_dt_is_treated_as_reset() {
        let (clock, inav, ahrs, mut pos) = setup();
        let mut nav = WpNav::new(&clock, WpNavParams::default());
        nav.init_loiter_target(&inav, &mut pos);
        nav.set_pilot_desired_acceleration(4500.0, 0.0);

        // a 2 s scheduler gap must not integrate 2 s of acceleration
        clock.advance_ms(2000);
        nav.update_loiter(&ahrs, &mut pos);
        let vel = pos.get_desired_velocity();
        assert!(vel.norm() < 0.001, "stale dt integrated: {}", vel.norm());
    }

    #[test]
    fn test_negative_dt_ignored() {
        let (clock, _inav, ahrs, mut pos) = setup();
        let mut nav = WpNav::new(&clock, WpNavParams::default());
        pos.set_desired_velocity(123.0, -45.0);

        nav.calc_loiter_desired_velocity(-0.1, &ahrs, &mut pos);

        let vel = pos.get_desired_velocity();
        assert!((vel.x - 123.0).abs() < 0.001);
        assert!((vel.y + 45.0).abs() < 0.001);
    }

    #[test]
    fn test_loiter_speed_below_min_is_raised() {
        let (clock, _inav, ahrs, mut pos) = setup();
        let mut params = WpNavParams::default();
        params.loiter_speed_cms = 10.0;
        let mut nav = WpNav::new(&clock, params);

        nav.calc_loiter_desired_velocity(0.01, &ahrs, &mut pos);

        assert!((nav.params().loiter_speed_cms - WPNAV_LOITER_SPEED_MIN).abs() < 0.001);
        assert!((nav.loiter_accel_cmss - WPNAV_LOITER_SPEED_MIN / 2.0).abs() < 0.001);
    }

    #[test]
    fn test_set_loiter_velocity_guard() {
        let (clock, _inav, _ahrs, mut pos) = setup();
        let mut nav = WpNav::new(&clock, WpNavParams::default());

        nav.set_loiter_velocity(50.0, &mut pos); // below minimum, ignored
        assert!((nav.params().loiter_speed_cms - 500.0).abs() < 0.001);

        nav.set_loiter_velocity(800.0, &mut pos);
        assert!((nav.params().loiter_speed_cms - 800.0).abs() < 0.001);
        assert!((nav.loiter_accel_cmss - 400.0).abs() < 0.001);
        assert!((pos.speed_xy() - 800.0).abs() < 0.001);
    }

    #[test]
    fn test_loiter_bearing_and_stopping_point() {
        let (clock, inav, _ahrs, mut pos) = setup();
        let nav = WpNav::new(&clock, WpNavParams::default());

        inav.set_position(Vector3::zeros());
        pos.set_pos_target(Vector3::new(0.0, 100.0, 0.0));
        let bearing = nav.get_loiter_bearing_to_target(&inav, &pos);
        assert!((bearing - 9000).abs() <= 1, "bearing east, got {}", bearing);

        pos.set_stopping_point(Vector3::new(12.0, 34.0, 56.0));
        let sp = nav.get_loiter_stopping_point_xy(&pos);
        assert!((sp.x - 12.0).abs() < 0.001);
        assert!((sp.y - 34.0).abs() < 0.001);
        assert!(sp.z.abs() < 0.001);
    }
}
