//! Geometry and math utilities
//!
//! Pure functions shared by the navigation engine and the barometer.
//! All positions are centimetres from home in a local Cartesian frame
//! (x = north, y = east, z = up); bearings are centi-degrees in
//! `[0, 36000)`.

use libm::{atan2f, sqrtf};
use nalgebra::Vector3;

/// Radians to centi-degrees (180 * 100 / pi).
pub const RAD_TO_CD: f32 = 5729.57795;

/// Square root that maps invalid inputs to zero instead of NaN.
pub fn safe_sqrt(v: f32) -> f32 {
    let ret = sqrtf(v);
    if ret.is_nan() {
        return 0.0;
    }
    ret
}

/// Hypotenuse of a 2-D vector.
pub fn pythag2(a: f32, b: f32) -> f32 {
    sqrtf(a * a + b * b)
}

/// Bearing from `origin` to `destination` in centi-degrees `[0, 36000)`.
///
/// 0 = north, 9000 = east. Positions are cm from home.
pub fn get_bearing_cd(origin: &Vector3<f32>, destination: &Vector3<f32>) -> f32 {
    let mut bearing =
        9000.0 + atan2f(-(destination.x - origin.x), destination.y - origin.y) * RAD_TO_CD;
    if bearing < 0.0 {
        bearing += 36000.0;
    }
    bearing
}

/// Normalize a centi-degree angle to `[0, 36000)`.
pub fn wrap_360_cd(angle_cd: f32) -> f32 {
    let mut a = angle_cd % 36000.0;
    if a < 0.0 {
        a += 36000.0;
    }
    a
}
