use super::capture::{render_to_cubemap, CaptureTarget, FaceShader, PipelineState};
use super::sampling::{distribution_ggx, hammersley, importance_sample_ggx, reflect};
use crate::error::IblError;
use crate::texture::{full_mip_chain, TextureFormat, TextureId, TextureStore};
use glam::{Vec3, Vec4};
use std::f32::consts::PI;

const STAGE: &str = "prefilter map";

/// Roughness assigned to `mip` of an `levels`-level chain: `mip / (levels - 1)`, so the base
/// is a mirror and the last level is fully rough.
pub fn roughness_for_mip(mip: u32, levels: u32) -> f32 {
    if levels <= 1 {
        return 0.0;
    }
    (mip.min(levels - 1) as f32) / (levels - 1) as f32
}

struct PrefilterShader {
    environment: TextureId,
    environment_resolution: u32,
    roughness: f32,
    sample_count: u32,
}

impl PrefilterShader {
    /// Source mip to read for a sample with the given GGX pdf terms. Sparse samples at high
    /// roughness read blurrier levels so they do not alias into fireflies.
    fn source_lod(&self, n_dot_h: f32, h_dot_v: f32) -> f32 {
        if self.roughness <= 0.0 {
            return 0.0;
        }
        let d = distribution_ggx(n_dot_h, self.roughness);
        let pdf = d * n_dot_h / (4.0 * h_dot_v.max(1e-4)) + 1e-4;
        let resolution = self.environment_resolution as f32;
        let sa_texel = 4.0 * PI / (6.0 * resolution * resolution);
        let sa_sample = 1.0 / (self.sample_count as f32 * pdf + 1e-4);
        (0.5 * (sa_sample / sa_texel).log2()).max(0.0)
    }
}

impl FaceShader for PrefilterShader {
    fn shade(&self, sources: &TextureStore, local_position: Vec3) -> Vec4 {
        let normal = local_position.normalize();
        let view = normal;

        let mut color = Vec3::ZERO;
        let mut total_weight = 0.0f32;
        for i in 0..self.sample_count {
            let xi = hammersley(i, self.sample_count);
            let half = importance_sample_ggx(xi, normal, self.roughness);
            let light = reflect(-view, half).normalize();
            let n_dot_l = normal.dot(light);
            if n_dot_l > 0.0 {
                let n_dot_h = normal.dot(half).max(0.0);
                let h_dot_v = half.dot(view).max(0.0);
                let lod = self.source_lod(n_dot_h, h_dot_v);
                color += sources.sample_cube_lod(self.environment, light, lod).truncate() * n_dot_l;
                total_weight += n_dot_l;
            }
        }
        if total_weight > 0.0 {
            color /= total_weight;
        }
        color.extend(1.0)
    }
}

/// GGX-prefiltered copy of `environment`: level `m` is `base_size >> m` texels and holds the
/// lobe for [`roughness_for_mip`]. The level count is clamped to what `base_size` can hold.
pub fn bake_prefilter(
    store: &mut TextureStore,
    target: &mut CaptureTarget,
    pipeline: &mut PipelineState,
    environment: TextureId,
    base_size: u32,
    levels: u32,
    sample_count: u32,
) -> Result<TextureId, IblError> {
    if sample_count == 0 {
        return Err(IblError::resource(STAGE, "sample count must be non-zero"));
    }
    if levels == 0 {
        return Err(IblError::resource(STAGE, "mip level count must be non-zero"));
    }
    let environment_resolution = store
        .cube(environment)
        .map(|cube| cube.size())
        .ok_or_else(|| IblError::resource(STAGE, "environment cubemap is missing"))?;
    let prefilter = store.create_cubemap(STAGE, TextureFormat::Rgba16Float, base_size, levels)?;
    let levels_created = store.cube(prefilter).map(|cube| cube.level_count()).unwrap_or(1);
    if levels_created < levels {
        log::warn!(
            "[ibl] prefilter base {base_size} only holds {} mip levels, {levels} requested",
            full_mip_chain(base_size)
        );
    }

    for mip in 0..levels_created {
        let shader = PrefilterShader {
            environment,
            environment_resolution,
            roughness: roughness_for_mip(mip, levels_created),
            sample_count,
        };
        if let Err(err) = render_to_cubemap(store, target, pipeline, prefilter, mip, &shader) {
            store.remove(prefilter);
            return Err(err);
        }
        log::debug!("[ibl] prefiltered mip {mip} at roughness {:.3}", shader.roughness);
    }
    store.set_mip_range(prefilter, 0, levels_created - 1);
    log::info!("[ibl] baked prefilter map {base_size}x{base_size} with {levels_created} levels");
    Ok(prefilter)
}
