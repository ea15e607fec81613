use crate::error::IblError;
use glam::{Vec2, Vec3, Vec4};
use std::collections::HashMap;
use std::num::NonZeroU32;

pub const DEFAULT_MAX_TEXTURE_SIZE: u32 = 8192;

/// Opaque handle to a texture owned by a [`TextureStore`]. Handles are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(NonZeroU32);

impl TextureId {
    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba16Float,
    Rg16Float,
    Rgba8Unorm,
    Rgba8UnormSrgb,
}

/// Cubemap faces in GL layer order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn index(self) -> usize {
        match self {
            CubeFace::PositiveX => 0,
            CubeFace::NegativeX => 1,
            CubeFace::PositiveY => 2,
            CubeFace::NegativeY => 3,
            CubeFace::PositiveZ => 4,
            CubeFace::NegativeZ => 5,
        }
    }

    pub fn axis(self) -> Vec3 {
        match self {
            CubeFace::PositiveX => Vec3::X,
            CubeFace::NegativeX => Vec3::NEG_X,
            CubeFace::PositiveY => Vec3::Y,
            CubeFace::NegativeY => Vec3::NEG_Y,
            CubeFace::PositiveZ => Vec3::Z,
            CubeFace::NegativeZ => Vec3::NEG_Z,
        }
    }

    /// Selects the face a direction lands on and the face-local `(s, t)` coordinate,
    /// following the GL cubemap convention.
    pub fn from_direction(dir: Vec3) -> (CubeFace, Vec2) {
        let abs = dir.abs();
        let (face, sc, tc, ma) = if abs.x >= abs.y && abs.x >= abs.z {
            if dir.x >= 0.0 {
                (CubeFace::PositiveX, -dir.z, -dir.y, abs.x)
            } else {
                (CubeFace::NegativeX, dir.z, -dir.y, abs.x)
            }
        } else if abs.y >= abs.z {
            if dir.y >= 0.0 {
                (CubeFace::PositiveY, dir.x, dir.z, abs.y)
            } else {
                (CubeFace::NegativeY, dir.x, -dir.z, abs.y)
            }
        } else if dir.z >= 0.0 {
            (CubeFace::PositiveZ, dir.x, -dir.y, abs.z)
        } else {
            (CubeFace::NegativeZ, -dir.x, -dir.y, abs.z)
        };
        let ma = ma.max(f32::MIN_POSITIVE);
        (face, Vec2::new((sc / ma + 1.0) * 0.5, (tc / ma + 1.0) * 0.5))
    }
}

/// One level of texel data. Row 0 is `t = 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct Image2D {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
}

impl Image2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, texels: vec![Vec4::ZERO; (width as usize) * (height as usize)] }
    }

    pub fn from_texels(width: u32, height: u32, texels: Vec<Vec4>) -> Option<Self> {
        if texels.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self { width, height, texels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        self.texels[(y * self.width + x) as usize]
    }

    pub fn set_texel(&mut self, x: u32, y: u32, value: Vec4) {
        let idx = (y * self.width + x) as usize;
        self.texels[idx] = value;
    }

    pub(crate) fn copy_from(&mut self, texels: &[Vec4]) {
        self.texels.copy_from_slice(texels);
    }

    /// Bilinear lookup with clamp-to-edge addressing.
    pub fn sample_bilinear(&self, uv: Vec2) -> Vec4 {
        if self.texels.is_empty() {
            return Vec4::ZERO;
        }
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let x = (uv.x * self.width as f32 - 0.5).clamp(0.0, max_x);
        let y = (uv.y * self.height as f32 - 0.5).clamp(0.0, max_y);
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;
        let ix0 = x0 as u32;
        let iy0 = y0 as u32;
        let ix1 = (ix0 + 1).min(self.width - 1);
        let iy1 = (iy0 + 1).min(self.height - 1);

        let c0 = self.texel(ix0, iy0).lerp(self.texel(ix1, iy0), tx);
        let c1 = self.texel(ix0, iy1).lerp(self.texel(ix1, iy1), tx);
        c0.lerp(c1, ty)
    }

    /// 2x2 box filter down to the next mip size.
    fn downsample(&self) -> Image2D {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut out = Image2D::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let sx = (x * 2).min(self.width - 1);
                let sy = (y * 2).min(self.height - 1);
                let sx1 = (sx + 1).min(self.width - 1);
                let sy1 = (sy + 1).min(self.height - 1);
                let sum = self.texel(sx, sy) + self.texel(sx1, sy) + self.texel(sx, sy1) + self.texel(sx1, sy1);
                out.set_texel(x, y, sum * 0.25);
            }
        }
        out
    }
}

#[derive(Clone, Debug)]
pub struct CubeLevel {
    size: u32,
    faces: [Image2D; 6],
}

impl CubeLevel {
    fn new(size: u32) -> Self {
        Self { size, faces: std::array::from_fn(|_| Image2D::new(size, size)) }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn face(&self, face: CubeFace) -> &Image2D {
        &self.faces[face.index()]
    }

    pub(crate) fn face_mut(&mut self, face: CubeFace) -> &mut Image2D {
        &mut self.faces[face.index()]
    }

    fn sample(&self, dir: Vec3) -> Vec4 {
        let (face, uv) = CubeFace::from_direction(dir);
        self.faces[face.index()].sample_bilinear(uv)
    }
}

#[derive(Clone, Debug)]
pub struct CubeTexture {
    label: &'static str,
    format: TextureFormat,
    levels: Vec<CubeLevel>,
    base_level: u32,
    max_level: u32,
}

impl CubeTexture {
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn size(&self) -> u32 {
        self.levels.first().map(|level| level.size).unwrap_or(0)
    }

    pub fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn level(&self, mip: u32) -> Option<&CubeLevel> {
        self.levels.get(mip as usize)
    }

    pub(crate) fn level_mut(&mut self, mip: u32) -> Option<&mut CubeLevel> {
        self.levels.get_mut(mip as usize)
    }

    pub fn mip_range(&self) -> (u32, u32) {
        (self.base_level, self.max_level)
    }

    /// Trilinear lookup. `lod` is clamped into the sampleable mip range.
    pub fn sample_lod(&self, dir: Vec3, lod: f32) -> Vec4 {
        if self.levels.is_empty() {
            return Vec4::ZERO;
        }
        let lod = if lod.is_finite() { lod } else { 0.0 };
        let lod = lod.clamp(self.base_level as f32, self.max_level as f32);
        let l0 = lod.floor() as u32;
        let l1 = (l0 + 1).min(self.max_level);
        let frac = lod - l0 as f32;
        let c0 = self.levels[l0 as usize].sample(dir);
        if l1 == l0 || frac <= 0.0 {
            return c0;
        }
        c0.lerp(self.levels[l1 as usize].sample(dir), frac)
    }
}

#[derive(Clone, Debug)]
pub struct Texture2D {
    label: &'static str,
    format: TextureFormat,
    image: Image2D,
}

impl Texture2D {
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn image(&self) -> &Image2D {
        &self.image
    }
}

#[derive(Clone, Debug)]
pub enum Texture {
    D2(Texture2D),
    Cube(CubeTexture),
}

/// Owner of every texture and cubemap the renderer creates.
pub struct TextureStore {
    textures: HashMap<TextureId, Texture>,
    next_id: u32,
    max_texture_size: u32,
}

impl TextureStore {
    pub fn new(max_texture_size: u32) -> Self {
        Self { textures: HashMap::new(), next_id: 1, max_texture_size }
    }

    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.textures.contains_key(&id)
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(&id)
    }

    pub fn cube(&self, id: TextureId) -> Option<&CubeTexture> {
        match self.textures.get(&id) {
            Some(Texture::Cube(cube)) => Some(cube),
            _ => None,
        }
    }

    pub(crate) fn cube_mut(&mut self, id: TextureId) -> Option<&mut CubeTexture> {
        match self.textures.get_mut(&id) {
            Some(Texture::Cube(cube)) => Some(cube),
            _ => None,
        }
    }

    pub fn texture_2d(&self, id: TextureId) -> Option<&Texture2D> {
        match self.textures.get(&id) {
            Some(Texture::D2(texture)) => Some(texture),
            _ => None,
        }
    }

    /// Detaches a cubemap so it can be written while other textures in the store are read.
    pub(crate) fn take_cube(&mut self, id: TextureId) -> Option<CubeTexture> {
        match self.textures.remove(&id)? {
            Texture::Cube(cube) => Some(cube),
            other => {
                self.textures.insert(id, other);
                None
            }
        }
    }

    pub(crate) fn restore_cube(&mut self, id: TextureId, cube: CubeTexture) {
        self.textures.insert(id, Texture::Cube(cube));
    }

    pub fn remove(&mut self, id: TextureId) -> bool {
        self.textures.remove(&id).is_some()
    }

    pub(crate) fn check_size(&self, label: &'static str, width: u32, height: u32) -> Result<(), IblError> {
        if width == 0 || height == 0 {
            return Err(IblError::resource(label, format!("invalid size {width}x{height}")));
        }
        if width > self.max_texture_size || height > self.max_texture_size {
            return Err(IblError::resource(
                label,
                format!("{width}x{height} exceeds the {} texel limit", self.max_texture_size),
            ));
        }
        Ok(())
    }

    fn insert(&mut self, texture: Texture) -> TextureId {
        // next_id starts at 1 and only grows, so it is never zero here.
        let id = TextureId(NonZeroU32::new(self.next_id).unwrap_or(NonZeroU32::MIN));
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.textures.insert(id, texture);
        id
    }

    pub fn create_texture_2d(
        &mut self,
        label: &'static str,
        format: TextureFormat,
        image: Image2D,
    ) -> Result<TextureId, IblError> {
        self.check_size(label, image.width, image.height)?;
        Ok(self.insert(Texture::D2(Texture2D { label, format, image })))
    }

    pub fn create_render_texture(
        &mut self,
        label: &'static str,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<TextureId, IblError> {
        self.check_size(label, width, height)?;
        Ok(self.insert(Texture::D2(Texture2D { label, format, image: Image2D::new(width, height) })))
    }

    /// Allocates a cubemap with `mip_levels` levels, each half the size of the previous one.
    /// The level count is clamped to the full chain for `size`.
    pub fn create_cubemap(
        &mut self,
        label: &'static str,
        format: TextureFormat,
        size: u32,
        mip_levels: u32,
    ) -> Result<TextureId, IblError> {
        self.check_size(label, size, size)?;
        let levels = mip_levels.clamp(1, full_mip_chain(size));
        let cube = CubeTexture {
            label,
            format,
            levels: (0..levels).map(|mip| CubeLevel::new((size >> mip).max(1))).collect(),
            base_level: 0,
            max_level: levels - 1,
        };
        Ok(self.insert(Texture::Cube(cube)))
    }

    /// Restricts which cube levels sampling may touch. Both ends are clamped to existing levels.
    pub fn set_mip_range(&mut self, id: TextureId, base: u32, max: u32) -> bool {
        let Some(cube) = self.cube_mut(id) else {
            return false;
        };
        let last = cube.level_count().saturating_sub(1);
        cube.max_level = max.min(last);
        cube.base_level = base.min(cube.max_level);
        true
    }

    /// Rebuilds the full box-filtered mip chain from level 0 and clamps the sampleable
    /// range to the levels produced. Returns the level count.
    pub fn generate_mipmaps(&mut self, id: TextureId) -> Option<u32> {
        let cube = self.cube_mut(id)?;
        let base = cube.levels.first()?.clone();
        let count = full_mip_chain(base.size);
        let mut levels = Vec::with_capacity(count as usize);
        levels.push(base);
        while (levels.len() as u32) < count {
            let Some(prev) = levels.last() else { break };
            let faces = std::array::from_fn(|face| prev.faces[face].downsample());
            let size = (prev.size / 2).max(1);
            levels.push(CubeLevel { size, faces });
        }
        cube.levels = levels;
        cube.base_level = 0;
        cube.max_level = cube.level_count() - 1;
        Some(cube.level_count())
    }

    pub fn sample_cube(&self, id: TextureId, dir: Vec3) -> Vec4 {
        self.cube(id).map(|cube| cube.sample_lod(dir, cube.base_level as f32)).unwrap_or(Vec4::ZERO)
    }

    pub fn sample_cube_lod(&self, id: TextureId, dir: Vec3, lod: f32) -> Vec4 {
        self.cube(id).map(|cube| cube.sample_lod(dir, lod)).unwrap_or(Vec4::ZERO)
    }

    pub fn sample_2d(&self, id: TextureId, uv: Vec2) -> Vec4 {
        self.texture_2d(id).map(|texture| texture.image.sample_bilinear(uv)).unwrap_or(Vec4::ZERO)
    }
}

impl Default for TextureStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TEXTURE_SIZE)
    }
}

pub fn full_mip_chain(size: u32) -> u32 {
    if size == 0 {
        return 1;
    }
    32 - size.leading_zeros()
}
