//! GPU side of the viewer. Owns the wgpu device and surface, the panorama
//! and marker pipelines, and the orbit camera, and implements
//! [`SceneRenderer`] so the navigation controller can drive it. Submodules:
//! `init` for setup, `environment` for texture uploads, `layout` for resize
//! handling and `render` for the draw passes.

use std::sync::Arc;

use anyhow::Result;
use pano_engine::camera::pick_indicators;
use pano_engine::{
    IndicatorLayout, IndicatorSet, LoadedEnvironment, OrbitCamera, PickHit, PickKind,
    SceneRenderer, Viewport,
};
use pano_graph::Direction;
use wgpu::SurfaceError;
use winit::{dpi::PhysicalSize, window::Window};

mod environment;
mod init;
mod layout;
mod render;

struct PanoramaResources {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    texture: environment::EnvironmentTexture,
}

struct MarkerResources {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

pub struct ViewerState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    panorama: PanoramaResources,
    markers: MarkerResources,
    camera: OrbitCamera,
    layout: IndicatorLayout,
    indicators: IndicatorSet,
    hovered: Option<Direction>,
    brightness: f32,
    blur_level: f32,
    ambient: [f32; 3],
}

impl ViewerState {
    pub async fn new(
        window: Arc<Window>,
        camera: OrbitCamera,
        layout: IndicatorLayout,
    ) -> Result<Self> {
        init::new(window, camera, layout).await
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        layout::resize(self, new_size);
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        render::render(self)
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    /// Highlights the marker under the pointer, if any.
    pub fn set_hover(&mut self, x: f32, y: f32) {
        self.hovered = self.indicator_at(x, y);
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    /// Moves the panorama sample level by `delta`, clamped to the mip chain.
    pub fn adjust_blur(&mut self, delta: f32) -> f32 {
        self.blur_level = (self.blur_level + delta).clamp(0.0, self.max_blur_level());
        self.blur_level
    }

    fn max_blur_level(&self) -> f32 {
        self.panorama.texture.mip_count.saturating_sub(1) as f32
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.size.width as f32, self.size.height as f32)
    }

    fn indicator_at(&self, x: f32, y: f32) -> Option<Direction> {
        let hit = self.pick_at(x, y)?;
        if hit.kind != PickKind::Indicator {
            return None;
        }
        self.indicators
            .iter()
            .min_by(|a, b| {
                a.position
                    .distance_squared(hit.point)
                    .total_cmp(&b.position.distance_squared(hit.point))
            })
            .map(|indicator| indicator.direction)
    }
}

impl SceneRenderer for ViewerState {
    fn set_environment(&mut self, environment: &LoadedEnvironment) {
        environment::replace_environment(self, environment);
    }

    fn set_indicators(&mut self, indicators: &IndicatorSet) {
        let diff = indicators.diff(&self.indicators);
        if !diff.is_empty() {
            println!("[pano_viewer] markers {diff}");
        }
        self.indicators = indicators.clone();
        self.hovered = None;
    }

    fn set_brightness_factor(&mut self, factor: f32) {
        self.brightness = factor;
    }

    fn pick_at(&self, x: f32, y: f32) -> Option<PickHit> {
        let ray = self.camera.projector(self.viewport()).ray(x, y)?;
        pick_indicators(
            &ray,
            &self.indicators,
            self.layout.pick_radius,
            self.camera.far * 0.9,
        )
    }
}
