use super::sampling::{geometry_smith_ibl, hammersley, importance_sample_ggx, reflect};
use crate::error::IblError;
use crate::texture::{Image2D, TextureFormat, TextureId, TextureStore};
use glam::{Vec2, Vec3, Vec4};

/// Split-sum scale (`x`) and bias (`y`) applied to F0 for the given view angle and roughness.
pub fn integrate_brdf(n_dot_v: f32, roughness: f32, sample_count: u32) -> Vec2 {
    let n_dot_v = n_dot_v.clamp(1e-4, 1.0);
    let normal = Vec3::Z;
    let view = Vec3::new((1.0 - n_dot_v * n_dot_v).max(0.0).sqrt(), 0.0, n_dot_v);

    let mut scale = 0.0f32;
    let mut bias = 0.0f32;
    let sample_count = sample_count.max(1);
    for i in 0..sample_count {
        let xi = hammersley(i, sample_count);
        let half = importance_sample_ggx(xi, normal, roughness);
        let light = reflect(-view, half).normalize();

        let n_dot_l = light.z.max(0.0);
        let n_dot_h = half.z.max(0.0);
        let v_dot_h = view.dot(half).max(0.0);
        if n_dot_l > 0.0 {
            let g = geometry_smith_ibl(n_dot_v, n_dot_l, roughness);
            let g_vis = (g * v_dot_h) / (n_dot_h * n_dot_v).max(1e-6);
            let fc = (1.0 - v_dot_h).powi(5);
            scale += (1.0 - fc) * g_vis;
            bias += fc * g_vis;
        }
    }
    Vec2::new(scale, bias) / sample_count as f32
}

/// Baked split-sum table. Column `x` is N·V, row `y` is roughness, both sampled at texel centers.
#[derive(Clone, Debug, PartialEq)]
pub struct BrdfLut {
    size: u32,
    sample_count: u32,
    texels: Vec<Vec2>,
}

impl BrdfLut {
    pub fn compute(size: u32, sample_count: u32) -> Self {
        let mut texels = Vec::with_capacity((size as usize) * (size as usize));
        for y in 0..size {
            let roughness = (y as f32 + 0.5) / size as f32;
            for x in 0..size {
                let n_dot_v = (x as f32 + 0.5) / size as f32;
                texels.push(integrate_brdf(n_dot_v, roughness, sample_count));
            }
        }
        Self { size, sample_count, texels }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn texels(&self) -> &[Vec2] {
        &self.texels
    }

    pub fn get(&self, x: u32, y: u32) -> Vec2 {
        self.texels[(y * self.size + x) as usize]
    }

    pub fn matches(&self, size: u32, sample_count: u32) -> bool {
        self.size == size && self.sample_count == sample_count
    }
}

/// Uploads `lut` as a two-channel 2D texture.
pub fn bake_brdf_lut(store: &mut TextureStore, lut: &BrdfLut) -> Result<TextureId, IblError> {
    let texels = lut.texels.iter().map(|ab| Vec4::new(ab.x, ab.y, 0.0, 1.0)).collect();
    let image = Image2D::from_texels(lut.size, lut.size, texels)
        .ok_or_else(|| IblError::resource("brdf lut", "texel count does not match size"))?;
    let id = store.create_texture_2d("brdf lut", TextureFormat::Rg16Float, image)?;
    log::info!("[ibl] baked BRDF LUT {0}x{0} ({1} samples)", lut.size, lut.sample_count);
    Ok(id)
}
