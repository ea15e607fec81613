use crate::error::IblError;
use glam::{Vec2, Vec3};
use image::{DynamicImage, ImageReader};
use std::f32::consts::{FRAC_1_PI, PI, TAU};
use std::path::Path;

/// Decoded floating-point equirectangular panorama. Row 0 is the top of the image (+Y).
#[derive(Clone, Debug)]
pub struct HdrImage {
    width: u32,
    height: u32,
    pixels: Vec<Vec3>,
}

impl HdrImage {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IblError> {
        let path = path.as_ref();
        let asset_error = |reason: String| IblError::AssetLoad { path: path.to_path_buf(), reason };
        let reader = ImageReader::open(path)
            .map_err(|err| asset_error(err.to_string()))?
            .with_guessed_format()
            .map_err(|err| asset_error(err.to_string()))?;
        let decoded = reader.decode().map_err(|err| asset_error(err.to_string()))?;
        let image = Self::from_dynamic(&decoded);
        if image.width == 0 || image.height == 0 {
            return Err(asset_error("image has no pixels".to_string()));
        }
        log::debug!("[hdr] loaded '{}' ({}x{})", path.display(), image.width, image.height);
        Ok(image)
    }

    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb32f();
        let (width, height) = rgb.dimensions();
        let pixels = rgb.pixels().map(|pixel| Vec3::from_array(pixel.0)).collect();
        Self { width, height, pixels }
    }

    /// Returns `None` unless `pixels` holds exactly `width * height` entries.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Vec3>) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self { width, height, pixels })
    }

    /// Flat-colored panorama, handy for tests and as a neutral environment.
    pub fn uniform(width: u32, height: u32, color: Vec3) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self { width, height, pixels: vec![color; (width as usize) * (height as usize)] }
    }

    /// Procedural sky/ground gradient with a small sun.
    pub fn procedural_sky(width: u32, height: u32) -> Self {
        let width = width.max(2);
        let height = height.max(2);
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            let v = y as f32 / (height - 1) as f32;
            for x in 0..width {
                let u = x as f32 / (width - 1) as f32;
                let horizon = (1.0 - (2.0 * (v - 0.5)).abs()).clamp(0.0, 1.0);
                let sky = Vec3::new(0.65, 0.7, 0.9) * (1.0 - v) + Vec3::new(0.25, 0.35, 0.6) * v;
                let sun_offset = Vec2::new(u - 0.2, v - 0.35);
                let sun = (1.0 - sun_offset.length() * 6.0).max(0.0).powf(12.0);
                let ground =
                    Vec3::new(0.08, 0.07, 0.05) * (1.0 - horizon) + Vec3::new(0.2, 0.18, 0.16) * horizon;
                let mut color = if v < 0.5 { sky * (0.6 + 0.4 * horizon) } else { ground };
                color += Vec3::new(1.0, 0.9, 0.75) * sun * 8.0;
                pixels.push(color);
            }
        }
        Self { width, height, pixels }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_equirectangular(&self) -> bool {
        self.width == self.height * 2
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec3 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Radiance along `dir`, bilinearly filtered. Longitude wraps, latitude clamps at the poles.
    pub fn sample_direction(&self, dir: Vec3) -> Vec3 {
        let uv = direction_to_equirect_uv(dir);
        let x = uv.x * self.width as f32 - 0.5;
        let y = (1.0 - uv.y) * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;

        let width = self.width as f32;
        let max_y = (self.height - 1) as f32;
        let ix0 = x0.rem_euclid(width) as u32 % self.width;
        let ix1 = (x0 + 1.0).rem_euclid(width) as u32 % self.width;
        let iy0 = y0.clamp(0.0, max_y) as u32;
        let iy1 = (y0 + 1.0).clamp(0.0, max_y) as u32;

        let c0 = self.pixel(ix0, iy0).lerp(self.pixel(ix1, iy0), tx);
        let c1 = self.pixel(ix0, iy1).lerp(self.pixel(ix1, iy1), tx);
        c0.lerp(c1, ty)
    }
}

/// Longitude/latitude mapping: `u = atan2(z, x) / 2π + 0.5`, `v = asin(y) / π + 0.5`.
pub fn direction_to_equirect_uv(dir: Vec3) -> Vec2 {
    let d = dir.normalize_or_zero();
    let u = d.z.atan2(d.x) / TAU + 0.5;
    let v = d.y.clamp(-1.0, 1.0).asin() * FRAC_1_PI + 0.5;
    Vec2::new(u, v)
}

pub fn equirect_uv_to_direction(uv: Vec2) -> Vec3 {
    let phi = (uv.x - 0.5) * TAU;
    let theta = (uv.y - 0.5) * PI;
    Vec3::new(theta.cos() * phi.cos(), theta.sin(), theta.cos() * phi.sin())
}
