//! Inertial navigation estimate trait.
//!
//! The navigator consumes a fused position/velocity estimate; the filter
//! producing it lives elsewhere in the autopilot.

use core::cell::Cell;
use nalgebra::Vector3;

/// Fused inertial navigation output.
///
/// Positions are centimetres from home (x = north, y = east, z = up),
/// velocities cm/s in the same frame.
pub trait InertialNav {
    /// Current position estimate in cm from home.
    fn get_position(&self) -> Vector3<f32>;

    /// Current velocity estimate in cm/s.
    fn get_velocity(&self) -> Vector3<f32>;
}

/// Mock inertial nav with settable state for host tests.
#[derive(Default)]
pub struct MockInertialNav {
    position: Cell<Vector3<f32>>,
    velocity: Cell<Vector3<f32>>,
}

impl MockInertialNav {
    /// Creates a mock at rest at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reported position (cm from home).
    pub fn set_position(&self, position: Vector3<f32>) {
        self.position.set(position);
    }

    /// Sets the reported velocity (cm/s).
    pub fn set_velocity(&self, velocity: Vector3<f32>) {
        self.velocity.set(velocity);
    }
}

impl InertialNav for MockInertialNav {
    fn get_position(&self) -> Vector3<f32> {
        self.position.get()
    }

    fn get_velocity(&self) -> Vector3<f32> {
        self.velocity.get()
    }
}
