//! Inner position controller surface.
//!
//! The navigator never drives attitude directly: it publishes an
//! intermediate position target (and, in loiter, a feed-forward velocity)
//! to the inner position controller and asks it to step. This trait is the
//! exact surface consumed; the PID/leash implementation behind it lives
//! outside this crate.
//!
//! Units at this boundary: positions cm, velocities cm/s, accelerations
//! cm/s/s. `set_speed_z` takes descent speed as a negative number, matching
//! the convention of the controller it fronts.

use nalgebra::{Vector2, Vector3};

/// Horizontal/vertical position controller as seen by the navigator.
pub trait PosControl {
    /// Sets the position target in cm from home.
    fn set_pos_target(&mut self, pos: Vector3<f32>);

    /// Returns the current position target in cm from home.
    fn get_pos_target(&self) -> Vector3<f32>;

    /// Sets the horizontal feed-forward velocity in cm/s.
    fn set_desired_velocity(&mut self, vel_x_cms: f32, vel_y_cms: f32);

    /// Returns the horizontal feed-forward velocity in cm/s.
    fn get_desired_velocity(&self) -> Vector2<f32>;

    /// Sets the maximum horizontal speed in cm/s.
    fn set_speed_xy(&mut self, speed_cms: f32);

    /// Sets the maximum horizontal acceleration in cm/s/s.
    fn set_accel_xy(&mut self, accel_cmss: f32);

    /// Sets the climb/descent speed limits in cm/s (down is negative).
    fn set_speed_z(&mut self, speed_down_cms: f32, speed_up_cms: f32);

    /// Recomputes the horizontal leash from current speed/accel/gain.
    fn calc_leash_length_xy(&mut self);

    /// Recomputes the vertical leashes from current speed/accel/gain.
    fn calc_leash_length_z(&mut self);

    /// Maximum allowed horizontal position error in cm.
    fn get_leash_xy(&self) -> f32;

    /// Maximum allowed position error above the target in cm.
    fn get_leash_up_z(&self) -> f32;

    /// Maximum allowed position error below the target in cm.
    fn get_leash_down_z(&self) -> f32;

    /// Horizontal point the vehicle would stop at from current state (cm).
    fn get_stopping_point_xy(&self) -> Vector2<f32>;

    /// Altitude the vehicle would stop at from current state (cm).
    fn get_stopping_point_z(&self) -> f32;

    /// Proportional gain of the horizontal position loop.
    fn get_pos_xy_kp(&self) -> f32;

    /// Flags the horizontal controller to run a full update on its next step.
    fn trigger_xy(&mut self);

    /// Steps the horizontal controller; `run_full` selects the complete
    /// update versus the cheaper intermediate one.
    fn update_xy_controller(&mut self, run_full: bool);
}

/// State-holding mock position controller for host tests.
///
/// Leashes, stopping points and the position gain are plain configurable
/// values; `calc_leash_length_*` are no-ops so tests control the envelope
/// directly.
pub struct MockPosControl {
    pos_target: Vector3<f32>,
    desired_vel: Vector2<f32>,
    speed_xy_cms: f32,
    accel_xy_cmss: f32,
    speed_down_cms: f32,
    speed_up_cms: f32,
    leash_xy_cm: f32,
    leash_up_z_cm: f32,
    leash_down_z_cm: f32,
    stopping_point: Vector3<f32>,
    pos_xy_kp: f32,
    /// Number of `trigger_xy` calls observed.
    pub trigger_count: u32,
    /// Number of `update_xy_controller` calls observed.
    pub update_count: u32,
}

impl MockPosControl {
    /// Creates a mock with a 1000 cm horizontal leash, 500 cm vertical
    /// leashes and unity position gain.
    pub fn new() -> Self {
        Self {
            pos_target: Vector3::zeros(),
            desired_vel: Vector2::zeros(),
            speed_xy_cms: 0.0,
            accel_xy_cmss: 0.0,
            speed_down_cms: 0.0,
            speed_up_cms: 0.0,
            leash_xy_cm: 1000.0,
            leash_up_z_cm: 500.0,
            leash_down_z_cm: 500.0,
            stopping_point: Vector3::zeros(),
            pos_xy_kp: 1.0,
            trigger_count: 0,
            update_count: 0,
        }
    }

    /// Overrides the horizontal leash length in cm.
    pub fn set_leash_xy(&mut self, leash_cm: f32) {
        self.leash_xy_cm = leash_cm;
    }

    /// Overrides the vertical leash lengths in cm.
    pub fn set_leash_z(&mut self, up_cm: f32, down_cm: f32) {
        self.leash_up_z_cm = up_cm;
        self.leash_down_z_cm = down_cm;
    }

    /// Overrides the reported stopping point (cm from home).
    pub fn set_stopping_point(&mut self, point: Vector3<f32>) {
        self.stopping_point = point;
    }

    /// Overrides the horizontal position gain.
    pub fn set_pos_xy_kp(&mut self, kp: f32) {
        self.pos_xy_kp = kp;
    }

    /// Last configured horizontal speed limit in cm/s.
    pub fn speed_xy(&self) -> f32 {
        self.speed_xy_cms
    }

    /// Last configured horizontal acceleration limit in cm/s/s.
    pub fn accel_xy(&self) -> f32 {
        self.accel_xy_cmss
    }

    /// Last configured climb/descent speed limits in cm/s.
    pub fn speed_z(&self) -> (f32, f32) {
        (self.speed_down_cms, self.speed_up_cms)
    }
}

impl Default for MockPosControl {
    fn default() -> Self {
        Self::new()
    }
}

impl PosControl for MockPosControl {
    fn set_pos_target(&mut self, pos: Vector3<f32>) {
        self.pos_target = pos;
    }

    fn get_pos_target(&self) -> Vector3<f32> {
        self.pos_target
    }

    fn set_desired_velocity(&mut self, vel_x_cms: f32, vel_y_cms: f32) {
        self.desired_vel = Vector2::new(vel_x_cms, vel_y_cms);
    }

    fn get_desired_velocity(&self) -> Vector2<f32> {
        self.desired_vel
    }

    fn set_speed_xy(&mut self, speed_cms: f32) {
        self.speed_xy_cms = speed_cms;
    }

    fn set_accel_xy(&mut self, accel_cmss: f32) {
        self.accel_xy_cmss = accel_cmss;
    }

    fn set_speed_z(&mut self, speed_down_cms: f32, speed_up_cms: f32) {
        self.speed_down_cms = speed_down_cms;
        self.speed_up_cms = speed_up_cms;
    }

    fn calc_leash_length_xy(&mut self) {}

    fn calc_leash_length_z(&mut self) {}

    fn get_leash_xy(&self) -> f32 {
        self.leash_xy_cm
    }

    fn get_leash_up_z(&self) -> f32 {
        self.leash_up_z_cm
    }

    fn get_leash_down_z(&self) -> f32 {
        self.leash_down_z_cm
    }

    fn get_stopping_point_xy(&self) -> Vector2<f32> {
        Vector2::new(self.stopping_point.x, self.stopping_point.y)
    }

    fn get_stopping_point_z(&self) -> f32 {
        self.stopping_point.z
    }

    fn get_pos_xy_kp(&self) -> f32 {
        self.pos_xy_kp
    }

    fn trigger_xy(&mut self) {
        self.trigger_count += 1;
    }

    fn update_xy_controller(&mut self, _run_full: bool) {
        self.update_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_pos_control_targets() {
        let mut pos = MockPosControl::new();
        pos.set_pos_target(Vector3::new(1.0, 2.0, 3.0));
        let target = pos.get_pos_target();
        assert!((target.x - 1.0).abs() < 0.001);
        assert!((target.z - 3.0).abs() < 0.001);

        pos.set_desired_velocity(10.0, -20.0);
        let vel = pos.get_desired_velocity();
        assert!((vel.x - 10.0).abs() < 0.001);
        assert!((vel.y + 20.0).abs() < 0.001);
    }

    #[test]
    fn mock_pos_control_counts_steps() {
        let mut pos = MockPosControl::new();
        pos.trigger_xy();
        pos.trigger_xy();
        pos.update_xy_controller(true);
        assert_eq!(pos.trigger_count, 2);
        assert_eq!(pos.update_count, 1);
    }

    #[test]
    fn mock_pos_control_stopping_point() {
        let mut pos = MockPosControl::new();
        pos.set_stopping_point(Vector3::new(50.0, 60.0, 70.0));
        let xy = pos.get_stopping_point_xy();
        assert!((xy.x - 50.0).abs() < 0.001);
        assert!((xy.y - 60.0).abs() < 0.001);
        assert!((pos.get_stopping_point_z() - 70.0).abs() < 0.001);
    }
}
