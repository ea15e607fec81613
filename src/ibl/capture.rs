use crate::error::IblError;
use crate::texture::{CubeTexture, TextureId, TextureStore};
use glam::{Mat4, Vec3, Vec4};

pub use crate::texture::CubeFace;

const CAPTURE_NEAR: f32 = 0.1;
const CAPTURE_FAR: f32 = 10.0;

/// Fragment stage run once per texel of a captured face. `local_position` is the point on
/// the unit cube surface seen through that texel; `sources` holds the bound input textures.
pub trait FaceShader {
    fn shade(&self, sources: &TextureStore, local_position: Vec3) -> Vec4;
}

impl<F> FaceShader for F
where
    F: Fn(&TextureStore, Vec3) -> Vec4,
{
    fn shade(&self, sources: &TextureStore, local_position: Vec3) -> Vec4 {
        self(sources, local_position)
    }
}

/// Fixed-function state the capture routine has to override while it runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineState {
    pub cull_faces: bool,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self { cull_faces: true }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Attachment {
    face: CubeFace,
    mip: u32,
}

/// Single color buffer that is retargeted at one cubemap face and mip at a time.
#[derive(Debug, Default)]
pub struct CaptureTarget {
    size: u32,
    color: Vec<Vec4>,
    attachment: Option<Attachment>,
    allocation_count: u32,
}

impl CaptureTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn allocation_count(&self) -> u32 {
        self.allocation_count
    }

    /// Reallocates the color buffer only when `size` differs from the current one.
    pub fn resize(&mut self, size: u32) -> bool {
        if size == self.size && !self.color.is_empty() {
            return false;
        }
        self.size = size;
        self.color = vec![Vec4::ZERO; (size as usize) * (size as usize)];
        self.attachment = None;
        self.allocation_count += 1;
        log::trace!("[ibl] capture target reallocated at {size}x{size}");
        true
    }

    /// Points the color attachment at `face` of `cubemap` level `mip`. The attachment is
    /// incomplete, and rejected, if the level size differs from the buffer size.
    pub fn attach(
        &mut self,
        store: &TextureStore,
        cubemap: TextureId,
        face: CubeFace,
        mip: u32,
    ) -> Result<(), IblError> {
        let cube = store.cube(cubemap).ok_or_else(|| IblError::resource("capture", "cubemap handle not found"))?;
        self.attach_level(cube, face, mip)
    }

    fn attach_level(&mut self, cube: &CubeTexture, face: CubeFace, mip: u32) -> Result<(), IblError> {
        self.attachment = None;
        let level = cube
            .level(mip)
            .ok_or_else(|| IblError::resource(cube.label(), format!("mip level {mip} does not exist")))?;
        if self.size == 0 || level.size() != self.size {
            return Err(IblError::resource(
                cube.label(),
                format!("capture target is {0}x{0} but mip {mip} is {1}x{1}", self.size, level.size()),
            ));
        }
        self.attachment = Some(Attachment { face, mip });
        Ok(())
    }

    pub fn clear(&mut self, color: Vec4) {
        self.color.fill(color);
    }

    fn write(&mut self, x: u32, y: u32, color: Vec4) {
        let idx = (y * self.size + x) as usize;
        self.color[idx] = color;
    }

    /// Copies the color buffer into the attached face.
    fn resolve(&self, cube: &mut CubeTexture) -> Result<(), IblError> {
        let attachment =
            self.attachment.ok_or_else(|| IblError::resource("capture", "no color attachment bound"))?;
        let label = cube.label();
        let level = cube
            .level_mut(attachment.mip)
            .ok_or_else(|| IblError::resource(label, "attached level disappeared"))?;
        level.face_mut(attachment.face).copy_from(&self.color);
        Ok(())
    }
}

pub fn capture_projection() -> Mat4 {
    Mat4::perspective_rh_gl(90f32.to_radians(), 1.0, CAPTURE_NEAR, CAPTURE_FAR)
}

/// Look-at matrix from the origin toward `face`, using the GL cubemap up vectors.
pub fn capture_view(face: CubeFace) -> Mat4 {
    let up = match face {
        CubeFace::PositiveX | CubeFace::NegativeX => Vec3::NEG_Y,
        CubeFace::PositiveY => Vec3::Z,
        CubeFace::NegativeY => Vec3::NEG_Z,
        CubeFace::PositiveZ | CubeFace::NegativeZ => Vec3::NEG_Y,
    };
    Mat4::look_at_rh(Vec3::ZERO, face.axis(), up)
}

/// Renders the inside of a unit cube into all six faces of `cubemap` at level `mip`.
///
/// Face culling is switched off for the duration of the capture because the camera sits
/// inside the cube; the caller's pipeline state is restored afterwards, also on failure.
/// The destination is detached from `store` while it is written, so the shader can only
/// read the other textures.
pub fn render_to_cubemap(
    store: &mut TextureStore,
    target: &mut CaptureTarget,
    pipeline: &mut PipelineState,
    cubemap: TextureId,
    mip: u32,
    shader: &dyn FaceShader,
) -> Result<(), IblError> {
    let mut cube =
        store.take_cube(cubemap).ok_or_else(|| IblError::resource("capture", "cubemap handle not found"))?;
    let result = match cube.level(mip).map(|level| level.size()) {
        Some(size) => {
            target.resize(size);
            let saved = *pipeline;
            pipeline.cull_faces = false;
            let result = capture_faces(store, target, &mut cube, mip, shader);
            *pipeline = saved;
            result
        }
        None => Err(IblError::resource(cube.label(), format!("mip level {mip} does not exist"))),
    };
    store.restore_cube(cubemap, cube);
    result
}

fn capture_faces(
    sources: &TextureStore,
    target: &mut CaptureTarget,
    cube: &mut CubeTexture,
    mip: u32,
    shader: &dyn FaceShader,
) -> Result<(), IblError> {
    let projection = capture_projection();
    let size = target.size();
    for face in CubeFace::ALL {
        target.attach_level(cube, face, mip)?;
        target.clear(Vec4::ZERO);
        let inverse = (projection * capture_view(face)).inverse();
        for py in 0..size {
            let ndc_y = 2.0 * (py as f32 + 0.5) / size as f32 - 1.0;
            for px in 0..size {
                let ndc_x = 2.0 * (px as f32 + 0.5) / size as f32 - 1.0;
                let world = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
                let max_axis = world.abs().max_element().max(f32::MIN_POSITIVE);
                target.write(px, py, shader.shade(sources, world / max_axis));
            }
        }
        target.resolve(cube)?;
    }
    Ok(())
}
