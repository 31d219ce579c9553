use glam::Vec3;
use pano_graph::Direction;

/// Maps a world-space point on an indicator to the direction that indicator
/// stands for.
///
/// Each direction owns a zone centred `reach` units out along its offset
/// axis. A point is inside a zone when it lies strictly within `tolerance` of
/// that centre along the axis and strictly within `tolerance` of zero across
/// it. Height is ignored. Zones are tested in [`Direction::ALL`] order and the
/// first match wins, so a point on the exact boundary is outside and overlaps
/// resolve to the earlier direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitClassifier {
    pub reach: f32,
    pub tolerance: f32,
}

impl Default for HitClassifier {
    fn default() -> Self {
        Self {
            reach: 200.0,
            tolerance: 20.0,
        }
    }
}

impl HitClassifier {
    pub fn new(reach: f32, tolerance: f32) -> Self {
        Self { reach, tolerance }
    }

    /// `None` means no zone matched and nothing should happen.
    pub fn classify(&self, point: Vec3) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|&direction| self.in_zone(direction, point))
    }

    fn in_zone(&self, direction: Direction, point: Vec3) -> bool {
        let axis = Vec3::from_array(direction.offset());
        let along = point.x * axis.x + point.z * axis.z;
        let across = point.x * axis.z - point.z * axis.x;
        // NaN fails both comparisons.
        (along - self.reach).abs() < self.tolerance && across.abs() < self.tolerance
    }
}
