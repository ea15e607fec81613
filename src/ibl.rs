//! Image-based lighting precompute: environment capture, diffuse irradiance, specular
//! prefilter and the split-sum BRDF table.
//!
//! Every stage renders through [`capture::render_to_cubemap`] except the BRDF table, which
//! does not depend on the environment and is cached across loads.

pub mod brdf;
pub mod capture;
pub mod environment;
pub mod gpu;
pub mod irradiance;
pub mod prefilter;
pub mod sampling;

use crate::config::IblConfig;
use crate::error::IblError;
use crate::hdr::HdrImage;
use crate::texture::{TextureId, TextureStore};
use brdf::{bake_brdf_lut, BrdfLut};
use capture::{CaptureTarget, PipelineState};
use std::path::Path;

pub use gpu::EnvironmentGpu;

/// Handles to the baked maps of one environment. Any stage that failed leaves its handle empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentMaps {
    cubemap: Option<TextureId>,
    irradiance: Option<TextureId>,
    prefilter: Option<TextureId>,
    brdf_lut: Option<TextureId>,
    prefilter_mip_levels: u32,
}

impl EnvironmentMaps {
    pub fn cubemap_id(&self) -> Option<TextureId> {
        self.cubemap
    }

    pub fn irradiance_map_id(&self) -> Option<TextureId> {
        self.irradiance
    }

    pub fn prefilter_map_id(&self) -> Option<TextureId> {
        self.prefilter
    }

    pub fn brdf_lut_id(&self) -> Option<TextureId> {
        self.brdf_lut
    }

    pub fn prefilter_mip_levels(&self) -> u32 {
        self.prefilter_mip_levels
    }

    /// True once the environment cubemap exists.
    pub fn is_valid(&self) -> bool {
        self.cubemap.is_some()
    }

    pub fn has_diffuse(&self) -> bool {
        self.irradiance.is_some()
    }

    pub fn has_specular(&self) -> bool {
        self.prefilter.is_some() && self.brdf_lut.is_some()
    }

    /// Frees every baked map held by these handles.
    pub fn release(&mut self, store: &mut TextureStore) {
        for id in [self.cubemap, self.irradiance, self.prefilter, self.brdf_lut].into_iter().flatten() {
            store.remove(id);
        }
        *self = Self::default();
    }
}

/// Runs the bake stages against a [`TextureStore`], reusing one capture target throughout.
pub struct IblBaker {
    config: IblConfig,
    target: CaptureTarget,
    pipeline: PipelineState,
    brdf_cache: Option<BrdfLut>,
}

impl IblBaker {
    pub fn new(config: IblConfig) -> Self {
        Self { config, target: CaptureTarget::new(), pipeline: PipelineState::default(), brdf_cache: None }
    }

    pub fn config(&self) -> &IblConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &PipelineState {
        &self.pipeline
    }

    pub fn capture_target(&self) -> &CaptureTarget {
        &self.target
    }

    /// Loads the panorama at `path` and bakes it. A missing or undecodable file yields empty
    /// maps.
    pub fn bake_from_path(&mut self, store: &mut TextureStore, path: impl AsRef<Path>) -> EnvironmentMaps {
        match HdrImage::load(path) {
            Ok(image) => self.bake_from_image(store, &image),
            Err(err) => {
                log::error!("[ibl] {err}; image-based lighting disabled");
                EnvironmentMaps::default()
            }
        }
    }

    pub fn bake_from_image(&mut self, store: &mut TextureStore, image: &HdrImage) -> EnvironmentMaps {
        let cfg = self.config.clone();
        let cubemap = match environment::capture_environment(
            store,
            &mut self.target,
            &mut self.pipeline,
            image,
            cfg.environment_size,
        ) {
            Ok(id) => id,
            Err(err) => {
                log::error!("[ibl] environment capture failed: {err}; image-based lighting disabled");
                return EnvironmentMaps::default();
            }
        };

        let irradiance = irradiance::bake_irradiance(
            store,
            &mut self.target,
            &mut self.pipeline,
            cubemap,
            cfg.irradiance_size,
            cfg.irradiance_sample_delta,
        )
        .map_err(|err| log::warn!("[ibl] skipping irradiance map: {err}"))
        .ok();

        let prefilter = prefilter::bake_prefilter(
            store,
            &mut self.target,
            &mut self.pipeline,
            cubemap,
            cfg.prefilter_size,
            cfg.prefilter_mip_levels,
            cfg.prefilter_sample_count,
        )
        .map_err(|err| log::warn!("[ibl] skipping prefilter map: {err}"))
        .ok();
        let prefilter_mip_levels =
            prefilter.and_then(|id| store.cube(id)).map(|cube| cube.level_count()).unwrap_or(0);

        let brdf_lut = self
            .bake_brdf_stage(store)
            .map_err(|err| log::warn!("[ibl] skipping BRDF LUT: {err}"))
            .ok();

        let maps = EnvironmentMaps { cubemap: Some(cubemap), irradiance, prefilter, brdf_lut, prefilter_mip_levels };
        log::info!(
            "[ibl] environment ready (irradiance: {}, prefilter: {}, brdf: {})",
            maps.irradiance.is_some(),
            maps.prefilter.is_some(),
            maps.brdf_lut.is_some()
        );
        maps
    }

    /// Validates the table size against the store before integrating anything.
    fn bake_brdf_stage(&mut self, store: &mut TextureStore) -> Result<TextureId, IblError> {
        let size = self.config.brdf_lut_size;
        store.check_size("brdf lut", size, size)?;
        bake_brdf_lut(store, self.brdf_lut())
    }

    /// The split-sum table for the configured size and sample count, computed on first use.
    pub fn brdf_lut(&mut self) -> &BrdfLut {
        let size = self.config.brdf_lut_size;
        let samples = self.config.brdf_sample_count;
        let cached = self.brdf_cache.take().filter(|lut| lut.matches(size, samples));
        self.brdf_cache.insert(cached.unwrap_or_else(|| {
            log::debug!("[ibl] integrating BRDF LUT {size}x{size}");
            BrdfLut::compute(size, samples)
        }))
    }

    pub fn has_cached_brdf_lut(&self) -> bool {
        self.brdf_cache.is_some()
    }
}
