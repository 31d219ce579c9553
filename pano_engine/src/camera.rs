use glam::{Mat4, Vec3, Vec4};

use crate::indicators::IndicatorSet;

const MAX_PITCH: f32 = 1.5;

/// Camera orbiting the origin, where the panorama is centred.
///
/// Yaw 0 puts the eye on -Z looking towards +Z, which is the "front" of
/// every location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 120.0,
            fov_y_degrees: 50.0,
            near: 1.0,
            far: 500.0,
            min_distance: 50.0,
            max_distance: 300.0,
        }
    }
}

impl OrbitCamera {
    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch) * self.distance
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            aspect_ratio.max(f32::EPSILON),
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self, aspect_ratio: f32) -> Mat4 {
        self.projection(aspect_ratio) * self.view()
    }

    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw = (self.yaw + delta_yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch + delta_pitch).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Scales the orbit distance, staying inside `[min_distance, max_distance]`.
    pub fn zoom(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.distance = (self.distance * factor).clamp(self.min_distance, self.max_distance);
    }

    /// Turns the camera to look along the horizontal `offset`.
    pub fn face(&mut self, offset: Vec3) {
        if offset.x == 0.0 && offset.z == 0.0 {
            return;
        }
        self.yaw = (-offset.x).atan2(offset.z);
        self.pitch = 0.0;
    }

    pub fn projector(&self, viewport: Viewport) -> CameraProjector {
        CameraProjector {
            view_projection: self.view_projection(viewport.aspect_ratio()),
            viewport,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }
}

/// Converts between world space and window pixels (origin top left).
#[derive(Debug, Clone, Copy)]
pub struct CameraProjector {
    view_projection: Mat4,
    viewport: Viewport,
}

impl CameraProjector {
    pub fn project(&self, position: Vec3) -> Option<[f32; 2]> {
        let clip = self.view_projection * position.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if !ndc.x.is_finite() || !ndc.y.is_finite() {
            return None;
        }
        Some([
            (ndc.x + 1.0) * 0.5 * self.viewport.width,
            (1.0 - ndc.y) * 0.5 * self.viewport.height,
        ])
    }

    pub fn ray(&self, x: f32, y: f32) -> Option<Ray> {
        let ndc_x = x / self.viewport.width * 2.0 - 1.0;
        let ndc_y = -(y / self.viewport.height) * 2.0 + 1.0;
        let inverse = self.view_projection.inverse();
        let unproject = |depth: f32| {
            let world = inverse * Vec4::new(ndc_x, ndc_y, depth, 1.0);
            (world.w.abs() > f32::EPSILON).then(|| world.truncate() / world.w)
        };
        let near = unproject(0.0)?;
        let far = unproject(1.0)?;
        let direction = (far - near).try_normalize()?;
        Some(Ray {
            origin: near,
            direction,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance to the first intersection in front of the origin.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let to_origin = self.origin - center;
        let b = to_origin.dot(self.direction);
        let c = to_origin.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        [-b - root, -b + root].into_iter().find(|t| *t >= 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickKind {
    Indicator,
    /// The panorama itself; never navigates.
    Backdrop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub point: Vec3,
    pub kind: PickKind,
}

/// Nearest indicator along `ray`, falling back to the backdrop sphere.
pub fn pick_indicators(
    ray: &Ray,
    indicators: &IndicatorSet,
    pick_radius: f32,
    backdrop_radius: f32,
) -> Option<PickHit> {
    let nearest = indicators
        .iter()
        .filter_map(|indicator| ray.intersect_sphere(indicator.position, pick_radius))
        .min_by(|a, b| a.total_cmp(b));
    if let Some(t) = nearest {
        return Some(PickHit {
            point: ray.at(t),
            kind: PickKind::Indicator,
        });
    }
    ray.intersect_sphere(Vec3::ZERO, backdrop_radius)
        .map(|t| PickHit {
            point: ray.at(t),
            kind: PickKind::Backdrop,
        })
}
