//! Navigation type definitions
//!
//! Small state types shared by the loiter, straight-track and spline
//! engines.

/// Geometry of the active waypoint leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentType {
    /// Straight line from origin to destination
    #[default]
    Straight,
    /// Hermite cubic from origin to destination
    Spline,
}

/// What the vehicle does at the end of a spline segment.
///
/// Chosen by the mission layer from the type of the *next* segment; it
/// selects the destination tangent and whether the waypoint is "fast"
/// (complete as soon as the curve is consumed) or requires the vehicle to
/// come to the point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplineSegmentEnd {
    /// Vehicle stops at the destination
    Stop,
    /// Next segment is a straight line
    Straight,
    /// Next segment is another spline
    Spline,
}

/// Per-segment status flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentFlags {
    /// True once the active segment's arrival criterion has fired
    pub reached_destination: bool,
    /// Fast waypoints complete when the intermediate target reaches the
    /// destination; slow ones also require the vehicle within the
    /// acceptance radius
    pub fast_waypoint: bool,
    /// Geometry of the active segment
    pub segment_type: SegmentType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_flags_default() {
        let flags = SegmentFlags::default();
        assert!(!flags.reached_destination);
        assert!(!flags.fast_waypoint);
        assert_eq!(flags.segment_type, SegmentType::Straight);
    }
}
