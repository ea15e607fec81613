use super::EnvironmentMaps;
use crate::texture::{CubeTexture, TextureStore};
use anyhow::{anyhow, Context, Result};
use half::f16;
use std::sync::Arc;

/// Baked environment maps resident on a wgpu device.
pub struct EnvironmentGpu {
    _environment_texture: Arc<wgpu::Texture>,
    environment_view: Arc<wgpu::TextureView>,
    _irradiance_texture: Option<Arc<wgpu::Texture>>,
    irradiance_view: Option<Arc<wgpu::TextureView>>,
    _prefilter_texture: Option<Arc<wgpu::Texture>>,
    prefilter_view: Option<Arc<wgpu::TextureView>>,
    _brdf_texture: Option<Arc<wgpu::Texture>>,
    brdf_view: Option<Arc<wgpu::TextureView>>,
    sampler: Arc<wgpu::Sampler>,
    prefilter_mip_count: u32,
}

fn f32_to_f16_bits(data: impl Iterator<Item = f32>) -> Vec<u16> {
    data.map(|value| f16::from_f32(value).to_bits()).collect()
}

/// Requests a device without a surface, for offline baking and tests.
pub async fn request_headless_device() -> Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::default();
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .context("Failed to request headless adapter")?;
    let device_desc = wgpu::DeviceDescriptor {
        label: Some("IBL Upload Device"),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
        experimental_features: wgpu::ExperimentalFeatures::default(),
        memory_hints: wgpu::MemoryHints::default(),
        trace: wgpu::Trace::default(),
    };
    let (device, queue) =
        adapter.request_device(&device_desc).await.context("Failed to request headless device")?;
    Ok((device, queue))
}

fn upload_cube(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    cube: &CubeTexture,
    label: &str,
) -> (Arc<wgpu::Texture>, Arc<wgpu::TextureView>) {
    let (base, max) = cube.mip_range();
    let mip_count = max - base + 1;
    let size = cube.level(base).map(|level| level.size()).unwrap_or(1);
    let texture = Arc::new(device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d { width: size, height: size, depth_or_array_layers: 6 },
        mip_level_count: mip_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba16Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    }));
    for mip in base..=max {
        let Some(level) = cube.level(mip) else { continue };
        for face in crate::texture::CubeFace::ALL {
            let texels = level.face(face).texels();
            let face_half = f32_to_f16_bits(texels.iter().flat_map(|texel| texel.to_array()));
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip - base,
                    origin: wgpu::Origin3d { x: 0, y: 0, z: face.index() as u32 },
                    aspect: wgpu::TextureAspect::All,
                },
                bytemuck::cast_slice(&face_half),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(level.size() * 8),
                    rows_per_image: Some(level.size()),
                },
                wgpu::Extent3d { width: level.size(), height: level.size(), depth_or_array_layers: 1 },
            );
        }
    }
    let view = Arc::new(texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some(label),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        base_mip_level: 0,
        mip_level_count: Some(mip_count),
        ..Default::default()
    }));
    (texture, view)
}

impl EnvironmentGpu {
    /// Copies every available baked map in `maps` to the device as half-float textures.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        store: &TextureStore,
        maps: &EnvironmentMaps,
    ) -> Result<Self> {
        let environment = maps
            .cubemap_id()
            .and_then(|id| store.cube(id))
            .ok_or_else(|| anyhow!("Environment cubemap is not baked"))?;
        let (environment_texture, environment_view) =
            upload_cube(device, queue, environment, "Environment Cube");

        let (irradiance_texture, irradiance_view) = maps
            .irradiance_map_id()
            .and_then(|id| store.cube(id))
            .map(|cube| upload_cube(device, queue, cube, "Environment Irradiance Cube"))
            .unzip();

        let prefilter = maps.prefilter_map_id().and_then(|id| store.cube(id));
        let prefilter_mip_count = prefilter.map(|cube| cube.mip_range().1 + 1).unwrap_or(0);
        let (prefilter_texture, prefilter_view) =
            prefilter.map(|cube| upload_cube(device, queue, cube, "Environment Prefilter Cube")).unzip();

        let (brdf_texture, brdf_view) = maps
            .brdf_lut_id()
            .and_then(|id| store.texture_2d(id))
            .map(|lut| {
                let image = lut.image();
                let texture = Arc::new(device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("Environment BRDF LUT"),
                    size: wgpu::Extent3d {
                        width: image.width(),
                        height: image.height(),
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rg16Float,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                }));
                let brdf_half = f32_to_f16_bits(image.texels().iter().flat_map(|texel| [texel.x, texel.y]));
                queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    bytemuck::cast_slice(&brdf_half),
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(image.width() * 4),
                        rows_per_image: Some(image.height()),
                    },
                    wgpu::Extent3d { width: image.width(), height: image.height(), depth_or_array_layers: 1 },
                );
                let view = Arc::new(texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Environment BRDF View"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    ..Default::default()
                }));
                (texture, view)
            })
            .unzip();

        let sampler = Arc::new(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        }));
        log::info!("[ibl] uploaded environment maps ({prefilter_mip_count} prefilter levels)");

        Ok(Self {
            _environment_texture: environment_texture,
            environment_view,
            _irradiance_texture: irradiance_texture,
            irradiance_view,
            _prefilter_texture: prefilter_texture,
            prefilter_view,
            _brdf_texture: brdf_texture,
            brdf_view,
            sampler,
            prefilter_mip_count,
        })
    }

    pub fn environment_view(&self) -> &wgpu::TextureView {
        self.environment_view.as_ref()
    }

    pub fn irradiance_view(&self) -> Option<&wgpu::TextureView> {
        self.irradiance_view.as_deref()
    }

    pub fn prefilter_view(&self) -> Option<&wgpu::TextureView> {
        self.prefilter_view.as_deref()
    }

    pub fn brdf_view(&self) -> Option<&wgpu::TextureView> {
        self.brdf_view.as_deref()
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        self.sampler.as_ref()
    }

    pub fn prefilter_mip_count(&self) -> u32 {
        self.prefilter_mip_count
    }
}
