//! Cone geometry for the direction markers. The cone is built in a unit box
//! with its apex on +Y so one transform can scale it to the marker size and
//! point it along the marker's direction.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use pano_engine::Indicator;

const CONE_SEGMENTS: u32 = 24;

const MARKER_COLOR: [f32; 4] = [0.93, 0.95, 1.0, 0.92];
const MARKER_HOVER_COLOR: [f32; 4] = [1.0, 0.82, 0.3, 1.0];

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

pub struct MeshPrimitive {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u16>,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MarkerInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MarkerUniforms {
    pub view_projection: [[f32; 4]; 4],
    /// rgb: ambient light from the panorama, a: brightness factor.
    pub lighting: [f32; 4],
}

pub fn marker_uniforms(view_projection: Mat4, ambient: [f32; 3], brightness: f32) -> MarkerUniforms {
    MarkerUniforms {
        view_projection: view_projection.to_cols_array_2d(),
        lighting: [ambient[0], ambient[1], ambient[2], brightness],
    }
}

/// Places a unit cone on the indicator, apex pointing along its orientation.
pub fn marker_instance(indicator: &Indicator, hovered: bool) -> MarkerInstance {
    let rotation = orientation_rotation(indicator.orientation);
    let transform = Mat4::from_scale_rotation_translation(
        Vec3::splat(indicator.size),
        rotation,
        indicator.position,
    );
    MarkerInstance {
        model: transform.to_cols_array_2d(),
        color: if hovered {
            MARKER_HOVER_COLOR
        } else {
            MARKER_COLOR
        },
    }
}

fn orientation_rotation(orientation: Vec3) -> Quat {
    match orientation.try_normalize() {
        Some(direction) => Quat::from_rotation_arc(Vec3::Y, direction),
        None => Quat::IDENTITY,
    }
}

pub fn cone() -> MeshPrimitive {
    let ring = CONE_SEGMENTS;
    let mut vertices = Vec::with_capacity((ring * 2 + 2) as usize);
    let mut indices = Vec::with_capacity((ring * 6) as usize);

    let apex_index = vertices.len() as u16;
    vertices.push(MeshVertex {
        position: [0.0, 0.5, 0.0],
        normal: [0.0, 1.0, 0.0],
    });

    for i in 0..ring {
        let angle = (i as f32 / ring as f32) * PI * 2.0;
        let x = angle.cos() * 0.5;
        let z = angle.sin() * 0.5;
        let normal = Vec3::new(x, 0.5, z).normalize();
        vertices.push(MeshVertex {
            position: [x, -0.5, z],
            normal: normal.into(),
        });
    }

    // Counter-clockwise when seen from outside.
    for i in 0..ring {
        let current = 1 + i as u16;
        let next = 1 + ((i + 1) % ring) as u16;
        indices.extend_from_slice(&[apex_index, next, current]);
    }

    let base_center_index = vertices.len() as u16;
    vertices.push(MeshVertex {
        position: [0.0, -0.5, 0.0],
        normal: [0.0, -1.0, 0.0],
    });
    for i in 0..ring {
        let angle = (i as f32 / ring as f32) * PI * 2.0;
        vertices.push(MeshVertex {
            position: [angle.cos() * 0.5, -0.5, angle.sin() * 0.5],
            normal: [0.0, -1.0, 0.0],
        });
    }
    for i in 0..ring {
        let current = base_center_index + 1 + i as u16;
        let next = base_center_index + 1 + ((i + 1) % ring) as u16;
        indices.extend_from_slice(&[base_center_index, current, next]);
    }

    MeshPrimitive { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pano_graph::Direction;

    fn indicator(direction: Direction) -> Indicator {
        Indicator {
            direction,
            target: "B".to_string(),
            position: Vec3::new(0.0, -100.0, 200.0),
            orientation: Vec3::from_array(direction.offset()),
            size: 50.0,
        }
    }

    #[test]
    fn cone_fits_unit_box() {
        let cone = cone();
        assert!(cone.indices.len() % 3 == 0);
        assert!(cone
            .indices
            .iter()
            .all(|&index| (index as usize) < cone.vertices.len()));
        for vertex in &cone.vertices {
            assert!(vertex.position.iter().all(|v| v.abs() <= 0.5 + 1e-6));
        }
    }

    #[test]
    fn side_triangles_face_outwards() {
        let cone = cone();
        let [a, b, c] = [0, 1, 2].map(|i| Vec3::from(cone.vertices[cone.indices[i] as usize].position));
        let normal = (b - a).cross(c - a);
        let centroid = (a + b + c) / 3.0;
        assert!(normal.dot(centroid) > 0.0);
    }

    #[test]
    fn apex_points_along_orientation() {
        let instance = marker_instance(&indicator(Direction::Front), false);
        let model = Mat4::from_cols_array_2d(&instance.model);
        let apex = model.transform_point3(Vec3::new(0.0, 0.5, 0.0));
        let base = model.transform_point3(Vec3::new(0.0, -0.5, 0.0));
        let axis = (apex - base).normalize();
        assert!(axis.abs_diff_eq(Vec3::Z, 1e-5));
        assert!(((apex - base).length() - 50.0).abs() < 1e-3);
        assert!(((apex + base) * 0.5).abs_diff_eq(Vec3::new(0.0, -100.0, 200.0), 1e-3));
    }

    #[test]
    fn backwards_marker_does_not_degenerate() {
        let instance = marker_instance(&indicator(Direction::Behind), true);
        let model = Mat4::from_cols_array_2d(&instance.model);
        let axis = model.transform_vector3(Vec3::Y).normalize();
        assert!(axis.abs_diff_eq(Vec3::NEG_Z, 1e-5));
        assert_eq!(instance.color, MARKER_HOVER_COLOR);
    }
}
