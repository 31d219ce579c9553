use bytemuck::{Pod, Zeroable};
use glam::Mat4;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PanoramaUniforms {
    pub inverse_view_projection: [[f32; 4]; 4],
    /// x: brightness factor, y: mip level to sample, zw: unused.
    pub params: [f32; 4],
}

impl PanoramaUniforms {
    pub fn new(view_projection: Mat4, brightness: f32, blur_level: f32) -> Self {
        Self {
            inverse_view_projection: view_projection.inverse().to_cols_array_2d(),
            params: [brightness, blur_level, 0.0, 0.0],
        }
    }
}

/// Draws the equirectangular panorama behind everything else. A single
/// oversized triangle covers the screen; each fragment turns its clip-space
/// position back into a world direction and looks that up in the texture.
pub(super) const PANORAMA_SHADER_SOURCE: &str = r#"
struct PanoramaUniforms {
    inverse_view_projection: mat4x4<f32>,
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: PanoramaUniforms;
@group(0) @binding(1)
var panorama_texture: texture_2d<f32>;
@group(0) @binding(2)
var panorama_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let x = f32((index << 1u) & 2u) * 2.0 - 1.0;
    let y = f32(index & 2u) * 2.0 - 1.0;
    var out: VertexOutput;
    out.position = vec4<f32>(x, y, 1.0, 1.0);
    out.ndc = vec2<f32>(x, y);
    return out;
}

const PI: f32 = 3.14159265358979;

fn aces(color: vec3<f32>) -> vec3<f32> {
    let a = 2.51;
    let b = 0.03;
    let c = 2.43;
    let d = 0.59;
    let e = 0.14;
    return clamp((color * (a * color + b)) / (color * (c * color + d) + e), vec3<f32>(0.0), vec3<f32>(1.0));
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let near = uniforms.inverse_view_projection * vec4<f32>(input.ndc, 0.0, 1.0);
    let far = uniforms.inverse_view_projection * vec4<f32>(input.ndc, 1.0, 1.0);
    let direction = normalize(far.xyz / far.w - near.xyz / near.w);

    let u = atan2(direction.z, direction.x) / (2.0 * PI) + 0.5;
    let v = asin(clamp(direction.y, -1.0, 1.0)) / PI + 0.5;
    let color = textureSampleLevel(panorama_texture, panorama_sampler, vec2<f32>(u, 1.0 - v), uniforms.params.y);
    return vec4<f32>(aces(color.rgb * uniforms.params.x), 1.0);
}
"#;

pub(super) const MARKER_SHADER_SOURCE: &str = r#"
struct MarkerUniforms {
    view_projection: mat4x4<f32>,
    lighting: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: MarkerUniforms;

struct VertexIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn marker_vs_main(input: VertexIn) -> VertexOutput {
    let model = mat4x4<f32>(input.model_0, input.model_1, input.model_2, input.model_3);
    let world = model * vec4<f32>(input.position, 1.0);
    var out: VertexOutput;
    out.position = uniforms.view_projection * world;
    out.normal = normalize((model * vec4<f32>(input.normal, 0.0)).xyz);
    out.color = input.color;
    return out;
}

@fragment
fn marker_fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let light_dir = normalize(vec3<f32>(0.3, 1.0, -0.4));
    let diffuse = max(dot(input.normal, light_dir), 0.0);
    let ambient = uniforms.lighting.rgb * 0.8 + vec3<f32>(0.2);
    let lit = input.color.rgb * (ambient * 0.6 + vec3<f32>(diffuse * 0.6));
    return vec4<f32>(lit * uniforms.lighting.a, input.color.a);
}
"#;
