use std::fmt;

use glam::Vec3;
use pano_graph::{Direction, EnvironmentNode};

/// Where direction markers sit around the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorLayout {
    /// Horizontal distance from the origin.
    pub reach: f32,
    /// Vertical offset; negative places markers below the horizon.
    pub height: f32,
    /// Marker size in world units.
    pub size: f32,
    /// Radius of the sphere used when picking a marker.
    pub pick_radius: f32,
}

impl Default for IndicatorLayout {
    fn default() -> Self {
        Self {
            reach: 200.0,
            height: -100.0,
            size: 50.0,
            pick_radius: 18.0,
        }
    }
}

impl IndicatorLayout {
    pub fn position(&self, direction: Direction) -> Vec3 {
        Vec3::from_array(direction.offset()) * self.reach + Vec3::Y * self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    pub direction: Direction,
    pub target: String,
    pub position: Vec3,
    /// Unit vector the marker points along.
    pub orientation: Vec3,
    pub size: f32,
}

/// Markers for the edges leaving one location, in direction priority order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    indicators: Vec<Indicator>,
}

impl IndicatorSet {
    pub fn for_node(node: &EnvironmentNode, layout: &IndicatorLayout) -> Self {
        let indicators = node
            .neighbors()
            .map(|(direction, target)| Indicator {
                direction,
                target: target.to_string(),
                position: layout.position(direction),
                orientation: Vec3::from_array(direction.offset()),
                size: layout.size,
            })
            .collect();
        Self { indicators }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Indicator> {
        self.indicators.iter()
    }

    pub fn get(&self, direction: Direction) -> Option<&Indicator> {
        self.indicators
            .iter()
            .find(|indicator| indicator.direction == direction)
    }

    pub fn directions(&self) -> Vec<Direction> {
        self.indicators.iter().map(|indicator| indicator.direction).collect()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Changes needed to go from `previous` to `self`.
    pub fn diff(&self, previous: &IndicatorSet) -> IndicatorDiff {
        let mut diff = IndicatorDiff::default();
        for direction in Direction::ALL {
            match (previous.get(direction), self.get(direction)) {
                (None, Some(_)) => diff.added.push(direction),
                (Some(_), None) => diff.removed.push(direction),
                (Some(old), Some(new)) if old.target != new.target => {
                    diff.retargeted.push(direction)
                }
                _ => {}
            }
        }
        diff
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorDiff {
    pub added: Vec<Direction>,
    pub removed: Vec<Direction>,
    pub retargeted: Vec<Direction>,
}

impl IndicatorDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.retargeted.is_empty()
    }
}

impl fmt::Display for IndicatorDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("unchanged");
        }
        let entries = self
            .added
            .iter()
            .map(|direction| format!("+{direction}"))
            .chain(self.removed.iter().map(|direction| format!("-{direction}")))
            .chain(self.retargeted.iter().map(|direction| format!("~{direction}")));
        let parts: Vec<String> = entries.collect();
        f.write_str(&parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(neighbors: &[(Direction, &str)]) -> EnvironmentNode {
        EnvironmentNode::new(
            "Here",
            "here.jpg",
            neighbors
                .iter()
                .map(|(direction, target)| (*direction, target.to_string())),
        )
    }

    #[test]
    fn markers_follow_default_layout() {
        let set = IndicatorSet::for_node(
            &node(&[(Direction::Front, "A"), (Direction::Right, "B")]),
            &IndicatorLayout::default(),
        );
        assert_eq!(set.directions(), vec![Direction::Front, Direction::Right]);
        let front = set.get(Direction::Front).expect("front marker");
        assert_eq!(front.position, Vec3::new(0.0, -100.0, 200.0));
        let right = set.get(Direction::Right).expect("right marker");
        assert_eq!(right.position, Vec3::new(-200.0, -100.0, 0.0));
        assert_eq!(right.orientation, Vec3::NEG_X);
    }

    #[test]
    fn location_without_edges_has_no_markers() {
        let set = IndicatorSet::for_node(&node(&[]), &IndicatorLayout::default());
        assert!(set.is_empty());
    }

    #[test]
    fn diff_reports_added_removed_and_retargeted() {
        let layout = IndicatorLayout::default();
        let before = IndicatorSet::for_node(
            &node(&[(Direction::Front, "A"), (Direction::Left, "B")]),
            &layout,
        );
        let after = IndicatorSet::for_node(
            &node(&[(Direction::Front, "C"), (Direction::Behind, "D")]),
            &layout,
        );
        let diff = after.diff(&before);
        assert_eq!(diff.added, vec![Direction::Behind]);
        assert_eq!(diff.removed, vec![Direction::Left]);
        assert_eq!(diff.retargeted, vec![Direction::Front]);
        assert_eq!(diff.to_string(), "+behind -left ~front");
        assert_eq!(after.diff(&after).to_string(), "unchanged");
    }
}
