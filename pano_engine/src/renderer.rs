use glam::Vec3;
use pano_graph::Direction;

use crate::camera::{pick_indicators, OrbitCamera, PickHit, Viewport};
use crate::indicators::{IndicatorLayout, IndicatorSet};
use crate::loader::LoadedEnvironment;

/// What the navigation engine needs from whatever draws the scene.
pub trait SceneRenderer {
    /// Replaces the panorama and its reflection data.
    fn set_environment(&mut self, environment: &LoadedEnvironment);
    fn set_indicators(&mut self, indicators: &IndicatorSet);
    /// Multiplier applied to tone-mapping exposure; 0 is black.
    fn set_brightness_factor(&mut self, factor: f32);
    /// Scene point under the given window pixel, if any.
    fn pick_at(&self, x: f32, y: f32) -> Option<PickHit>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum RendererCall {
    Environment { asset_ref: String },
    Indicators(Vec<Direction>),
    Brightness(f32),
}

/// Renderer without a GPU: keeps the scene state, picks with the same camera
/// math as the windowed viewer and records every call it receives.
#[derive(Debug)]
pub struct HeadlessRenderer {
    camera: OrbitCamera,
    viewport: Viewport,
    layout: IndicatorLayout,
    environment: Option<String>,
    indicators: IndicatorSet,
    brightness: f32,
    calls: Vec<RendererCall>,
}

impl HeadlessRenderer {
    pub fn new(camera: OrbitCamera, viewport: Viewport, layout: IndicatorLayout) -> Self {
        Self {
            camera,
            viewport,
            layout,
            environment: None,
            indicators: IndicatorSet::default(),
            brightness: 0.0,
            calls: Vec::new(),
        }
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn face(&mut self, direction: Direction) {
        self.camera.face(Vec3::from_array(direction.offset()));
    }

    /// Window pixel at which the marker for `direction` is drawn.
    pub fn screen_position(&self, direction: Direction) -> Option<[f32; 2]> {
        let indicator = self.indicators.get(direction)?;
        self.camera
            .projector(self.viewport)
            .project(indicator.position)
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn indicators(&self) -> &IndicatorSet {
        &self.indicators
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn calls(&self) -> &[RendererCall] {
        &self.calls
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new(
            OrbitCamera::default(),
            Viewport::new(1280.0, 720.0),
            IndicatorLayout::default(),
        )
    }
}

impl SceneRenderer for HeadlessRenderer {
    fn set_environment(&mut self, environment: &LoadedEnvironment) {
        self.environment = Some(environment.asset_ref.clone());
        self.calls.push(RendererCall::Environment {
            asset_ref: environment.asset_ref.clone(),
        });
    }

    fn set_indicators(&mut self, indicators: &IndicatorSet) {
        self.indicators = indicators.clone();
        self.calls
            .push(RendererCall::Indicators(indicators.directions()));
    }

    fn set_brightness_factor(&mut self, factor: f32) {
        self.brightness = factor;
        self.calls.push(RendererCall::Brightness(factor));
    }

    fn pick_at(&self, x: f32, y: f32) -> Option<PickHit> {
        let ray = self.camera.projector(self.viewport).ray(x, y)?;
        pick_indicators(
            &ray,
            &self.indicators,
            self.layout.pick_radius,
            self.camera.far * 0.9,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PickKind;
    use pano_graph::EnvironmentNode;

    #[test]
    fn picks_marker_at_its_screen_position() {
        let mut renderer = HeadlessRenderer::default();
        let node = EnvironmentNode::new("A", "a.jpg", [(Direction::Front, "B".to_string())]);
        let set = IndicatorSet::for_node(&node, &IndicatorLayout::default());
        renderer.set_indicators(&set);

        let [x, y] = renderer
            .screen_position(Direction::Front)
            .expect("front marker on screen");
        let hit = renderer.pick_at(x, y).expect("hit");
        assert_eq!(hit.kind, PickKind::Indicator);
        assert!(renderer.screen_position(Direction::Left).is_none());
        assert_eq!(
            renderer.calls(),
            [RendererCall::Indicators(vec![Direction::Front])]
        );
    }
}
