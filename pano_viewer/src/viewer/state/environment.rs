use pano_engine::LoadedEnvironment;

use super::ViewerState;

/// GPU copy of a panorama. Mip 0 is the largest level the device accepts;
/// the reflection levels fill the rest of the chain.
pub(super) struct EnvironmentTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub mip_count: u32,
}

pub(super) fn create_environment_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    environment: &LoadedEnvironment,
) -> EnvironmentTexture {
    let max_dimension = device.limits().max_texture_dimension_2d;
    let mut chain: Vec<(u32, u32, &[u8])> = Vec::new();
    chain.push((
        environment.texture.width,
        environment.texture.height,
        environment.texture.pixels.as_slice(),
    ));
    chain.extend(
        environment
            .reflection
            .levels()
            .iter()
            .map(|level| (level.width, level.height, level.pixels.as_slice())),
    );

    let skipped = chain
        .iter()
        .take_while(|(width, height, _)| *width > max_dimension || *height > max_dimension)
        .count();
    if skipped > 0 {
        log::warn!(
            "{} is {}x{}, larger than the device limit {max_dimension}; dropping {skipped} level(s)",
            environment.asset_ref,
            environment.texture.width,
            environment.texture.height
        );
    }
    let chain = &chain[skipped.min(chain.len().saturating_sub(1))..];
    let (base_width, base_height, _) = chain[0];

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("panorama-texture"),
        size: wgpu::Extent3d {
            width: base_width,
            height: base_height,
            depth_or_array_layers: 1,
        },
        mip_level_count: chain.len() as u32,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (mip_level, (width, height, pixels)) in chain.iter().enumerate() {
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: mip_level as u32,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(*height),
            },
            wgpu::Extent3d {
                width: *width,
                height: *height,
                depth_or_array_layers: 1,
            },
        );
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    EnvironmentTexture {
        _texture: texture,
        view,
        mip_count: chain.len() as u32,
    }
}

pub(super) fn create_panorama_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform_buffer: &wgpu::Buffer,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("panorama-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Swaps the panorama texture and the ambient colour the markers are lit with.
pub(super) fn replace_environment(state: &mut ViewerState, environment: &LoadedEnvironment) {
    let texture = create_environment_texture(&state.device, &state.queue, environment);
    state.panorama.bind_group = create_panorama_bind_group(
        &state.device,
        &state.panorama.bind_group_layout,
        &state.panorama.uniform_buffer,
        &texture.view,
        &state.panorama.sampler,
    );
    state.panorama.texture = texture;
    state.ambient = environment.reflection.ambient_color();
    state.blur_level = state.blur_level.min(state.max_blur_level());
    println!(
        "[pano_viewer] environment {} ({}x{}, {} mip levels)",
        environment.asset_ref,
        environment.width,
        environment.height,
        state.panorama.texture.mip_count
    );
}
