//! Platform-agnostic trait abstractions
//!
//! Every service the navigation core consumes from the rest of the
//! autopilot is injected through one of these traits. Each trait ships a
//! mock implementation so the whole engine runs on the host.

pub mod ahrs;
pub mod inertial;
pub mod pos_control;
pub mod time;

pub use ahrs::{Ahrs, MockAhrs};
pub use inertial::{InertialNav, MockInertialNav};
pub use pos_control::{MockPosControl, PosControl};
pub use time::{MockClock, Platform, TimeSource};
