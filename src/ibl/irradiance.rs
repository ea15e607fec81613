use super::capture::{render_to_cubemap, CaptureTarget, FaceShader, PipelineState};
use crate::error::IblError;
use crate::texture::{TextureFormat, TextureId, TextureStore};
use glam::{Vec3, Vec4};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

const STAGE: &str = "irradiance map";

/// Smallest accepted angular step, in radians.
pub const MIN_SAMPLE_DELTA: f32 = 1e-4;

struct ConvolutionShader {
    environment: TextureId,
    sample_delta: f32,
    azimuth_steps: u32,
    elevation_steps: u32,
}

impl ConvolutionShader {
    fn new(environment: TextureId, sample_delta: f32) -> Self {
        Self {
            environment,
            sample_delta,
            azimuth_steps: (TAU / sample_delta).ceil() as u32,
            elevation_steps: (FRAC_PI_2 / sample_delta).ceil() as u32,
        }
    }
}

impl FaceShader for ConvolutionShader {
    fn shade(&self, sources: &TextureStore, local_position: Vec3) -> Vec4 {
        let normal = local_position.normalize();
        let (right, up) = hemisphere_basis(normal);

        let mut irradiance = Vec3::ZERO;
        let mut samples = 0u32;
        for i in 0..self.azimuth_steps {
            let (sin_phi, cos_phi) = (i as f32 * self.sample_delta).sin_cos();
            for j in 0..self.elevation_steps {
                let (sin_theta, cos_theta) = (j as f32 * self.sample_delta).sin_cos();
                let tangent = Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta);
                let sample = tangent.x * right + tangent.y * up + tangent.z * normal;
                let radiance = sources.sample_cube_lod(self.environment, sample, 0.0).truncate();
                irradiance += radiance * cos_theta * sin_theta;
                samples += 1;
            }
        }
        (PI * irradiance / samples.max(1) as f32).extend(1.0)
    }
}

/// `(right, up)` spanning the plane perpendicular to `normal`, built against world +Y.
pub fn hemisphere_basis(normal: Vec3) -> (Vec3, Vec3) {
    let reference = if normal.y.abs() > 0.999 { Vec3::Z } else { Vec3::Y };
    let right = reference.cross(normal).normalize();
    let up = normal.cross(right);
    (right, up)
}

/// Cosine-weighted hemispherical convolution of `environment` into a `size`-texel cubemap.
/// The result is restricted to its base level.
pub fn bake_irradiance(
    store: &mut TextureStore,
    target: &mut CaptureTarget,
    pipeline: &mut PipelineState,
    environment: TextureId,
    size: u32,
    sample_delta: f32,
) -> Result<TextureId, IblError> {
    if !(sample_delta.is_finite() && sample_delta >= MIN_SAMPLE_DELTA) {
        return Err(IblError::resource(
            STAGE,
            format!("sample delta {sample_delta} must be at least {MIN_SAMPLE_DELTA}"),
        ));
    }
    if store.cube(environment).is_none() {
        return Err(IblError::resource(STAGE, "environment cubemap is missing"));
    }
    let irradiance = store.create_cubemap(STAGE, TextureFormat::Rgba16Float, size, 1)?;

    let shader = ConvolutionShader::new(environment, sample_delta);
    if let Err(err) = render_to_cubemap(store, target, pipeline, irradiance, 0, &shader) {
        store.remove(irradiance);
        return Err(err);
    }
    store.set_mip_range(irradiance, 0, 0);
    log::info!("[ibl] baked irradiance map {size}x{size} (delta {sample_delta})");
    Ok(irradiance)
}
