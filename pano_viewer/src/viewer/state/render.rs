use bytemuck::cast_slice;
use wgpu::SurfaceError;

use super::super::mesh::{MarkerInstance, marker_instance, marker_uniforms};
use super::super::shaders::PanoramaUniforms;
use super::ViewerState;
use super::init::create_instance_buffer;

const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

pub(super) fn render(state: &mut ViewerState) -> Result<(), SurfaceError> {
    let frame = state.surface.get_current_texture()?;
    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("pano-viewer-encoder"),
        });

    draw_panorama(state, &view, &mut encoder);
    draw_markers(state, &view, &mut encoder);

    state.queue.submit(std::iter::once(encoder.finish()));
    frame.present();
    Ok(())
}

fn draw_panorama(
    state: &mut ViewerState,
    view: &wgpu::TextureView,
    encoder: &mut wgpu::CommandEncoder,
) {
    let view_projection = state
        .camera
        .view_projection(state.viewport().aspect_ratio());
    let uniforms = PanoramaUniforms::new(view_projection, state.brightness, state.blur_level);
    state
        .queue
        .write_buffer(&state.panorama.uniform_buffer, 0, cast_slice(&[uniforms]));

    let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("panorama-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    rpass.set_pipeline(&state.panorama.pipeline);
    rpass.set_bind_group(0, &state.panorama.bind_group, &[]);
    rpass.draw(0..3, 0..1);
}

fn draw_markers(
    state: &mut ViewerState,
    view: &wgpu::TextureView,
    encoder: &mut wgpu::CommandEncoder,
) {
    if state.indicators.is_empty() {
        return;
    }

    let instances: Vec<MarkerInstance> = state
        .indicators
        .iter()
        .map(|indicator| marker_instance(indicator, state.hovered == Some(indicator.direction)))
        .collect();
    ensure_marker_capacity(state, instances.len());
    state.queue.write_buffer(
        &state.markers.instance_buffer,
        0,
        cast_slice(&instances),
    );

    let view_projection = state
        .camera
        .view_projection(state.viewport().aspect_ratio());
    let uniforms = marker_uniforms(view_projection, state.ambient, state.brightness);
    state
        .queue
        .write_buffer(&state.markers.uniform_buffer, 0, cast_slice(&[uniforms]));

    let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("marker-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &state.markers.depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Discard,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    rpass.set_pipeline(&state.markers.pipeline);
    rpass.set_bind_group(0, &state.markers.bind_group, &[]);
    rpass.set_vertex_buffer(0, state.markers.vertex_buffer.slice(..));
    rpass.set_vertex_buffer(1, state.markers.instance_buffer.slice(..));
    rpass.set_index_buffer(
        state.markers.index_buffer.slice(..),
        wgpu::IndexFormat::Uint16,
    );
    rpass.draw_indexed(
        0..state.markers.index_count,
        0,
        0..instances.len() as u32,
    );
}

fn ensure_marker_capacity(state: &mut ViewerState, required: usize) {
    if required <= state.markers.instance_capacity {
        return;
    }
    let capacity = required.next_power_of_two();
    state.markers.instance_buffer = create_instance_buffer(&state.device, capacity);
    state.markers.instance_capacity = capacity;
}
