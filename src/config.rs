use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolutions and sample counts for the four image-based-lighting bake stages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IblConfig {
    #[serde(default = "IblConfig::default_environment_size")]
    pub environment_size: u32,
    #[serde(default = "IblConfig::default_irradiance_size")]
    pub irradiance_size: u32,
    #[serde(default = "IblConfig::default_irradiance_sample_delta")]
    pub irradiance_sample_delta: f32,
    #[serde(default = "IblConfig::default_prefilter_size")]
    pub prefilter_size: u32,
    #[serde(default = "IblConfig::default_prefilter_mip_levels")]
    pub prefilter_mip_levels: u32,
    #[serde(default = "IblConfig::default_prefilter_sample_count")]
    pub prefilter_sample_count: u32,
    #[serde(default = "IblConfig::default_brdf_lut_size")]
    pub brdf_lut_size: u32,
    #[serde(default = "IblConfig::default_brdf_sample_count")]
    pub brdf_sample_count: u32,
    #[serde(default = "IblConfig::default_max_texture_size")]
    pub max_texture_size: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "RendererConfig::default_width")]
    pub width: u32,
    #[serde(default = "RendererConfig::default_height")]
    pub height: u32,
    #[serde(default = "RendererConfig::default_clear_color")]
    pub clear_color: [f32; 4],
    #[serde(default = "RendererConfig::default_flat_ambient")]
    pub flat_ambient: [f32; 3],
    #[serde(default = "RendererConfig::default_skybox")]
    pub skybox: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Option<PathBuf>,
    #[serde(default)]
    pub ibl: IblConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub environment: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl IblConfig {
    const fn default_environment_size() -> u32 {
        1024
    }

    const fn default_irradiance_size() -> u32 {
        32
    }

    fn default_irradiance_sample_delta() -> f32 {
        0.025
    }

    const fn default_prefilter_size() -> u32 {
        128
    }

    const fn default_prefilter_mip_levels() -> u32 {
        5
    }

    const fn default_prefilter_sample_count() -> u32 {
        1024
    }

    const fn default_brdf_lut_size() -> u32 {
        512
    }

    const fn default_brdf_sample_count() -> u32 {
        1024
    }

    const fn default_max_texture_size() -> u32 {
        crate::texture::DEFAULT_MAX_TEXTURE_SIZE
    }
}

impl Default for IblConfig {
    fn default() -> Self {
        Self {
            environment_size: Self::default_environment_size(),
            irradiance_size: Self::default_irradiance_size(),
            irradiance_sample_delta: Self::default_irradiance_sample_delta(),
            prefilter_size: Self::default_prefilter_size(),
            prefilter_mip_levels: Self::default_prefilter_mip_levels(),
            prefilter_sample_count: Self::default_prefilter_sample_count(),
            brdf_lut_size: Self::default_brdf_lut_size(),
            brdf_sample_count: Self::default_brdf_sample_count(),
            max_texture_size: Self::default_max_texture_size(),
        }
    }
}

impl RendererConfig {
    const fn default_width() -> u32 {
        1280
    }

    const fn default_height() -> u32 {
        720
    }

    fn default_clear_color() -> [f32; 4] {
        [0.05, 0.05, 0.1, 1.0]
    }

    fn default_flat_ambient() -> [f32; 3] {
        [0.03, 0.03, 0.03]
    }

    const fn default_skybox() -> bool {
        true
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            clear_color: Self::default_clear_color(),
            flat_ambient: Self::default_flat_ambient(),
            skybox: Self::default_skybox(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("[config] {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(environment) = &overrides.environment {
            self.environment = Some(environment.clone());
        }
        if let Some(width) = overrides.width {
            self.renderer.width = width;
        }
        if let Some(height) = overrides.height {
            self.renderer.height = height;
        }
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.environment.is_none() && self.width.is_none() && self.height.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.environment.is_some() {
            fields.push("environment");
        }
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        fields
    }
}
