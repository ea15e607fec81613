use super::capture::{render_to_cubemap, CaptureTarget, FaceShader, PipelineState};
use crate::error::IblError;
use crate::hdr::HdrImage;
use crate::texture::{TextureFormat, TextureId, TextureStore};
use glam::{Vec3, Vec4};

struct EquirectShader<'a> {
    image: &'a HdrImage,
}

impl FaceShader for EquirectShader<'_> {
    fn shade(&self, _sources: &TextureStore, local_position: Vec3) -> Vec4 {
        self.image.sample_direction(local_position).extend(1.0)
    }
}

/// Projects an equirectangular panorama onto a `size`-texel cubemap and builds its mip chain.
pub fn capture_environment(
    store: &mut TextureStore,
    target: &mut CaptureTarget,
    pipeline: &mut PipelineState,
    image: &HdrImage,
    size: u32,
) -> Result<TextureId, IblError> {
    if !image.is_equirectangular() {
        log::warn!(
            "[ibl] environment source is {}x{}, expected a 2:1 equirectangular panorama",
            image.width(),
            image.height()
        );
    }
    let cubemap = store.create_cubemap("environment cubemap", TextureFormat::Rgba16Float, size, 1)?;
    let shader = EquirectShader { image };
    if let Err(err) = render_to_cubemap(store, target, pipeline, cubemap, 0, &shader) {
        store.remove(cubemap);
        return Err(err);
    }
    let levels = store.generate_mipmaps(cubemap).unwrap_or(1);
    log::info!("[ibl] captured environment cubemap {size}x{size} with {levels} mip levels");
    Ok(cubemap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::CubeFace;

    #[test]
    fn each_face_receives_its_region_of_the_panorama() {
        let image = HdrImage::procedural_sky(64, 32);
        let mut store = TextureStore::default();
        let mut target = CaptureTarget::new();
        let mut pipeline = PipelineState::default();
        let cube = capture_environment(&mut store, &mut target, &mut pipeline, &image, 16).expect("capture");

        let up = store.sample_cube(cube, Vec3::Y).truncate();
        let down = store.sample_cube(cube, Vec3::NEG_Y).truncate();
        assert!(up.z > down.z, "sky should be bluer than the ground");
        for face in CubeFace::ALL {
            assert_ne!(store.sample_cube(cube, face.axis()), Vec4::ZERO);
        }
    }

    #[test]
    fn mip_chain_is_clamped_to_generated_levels() {
        let image = HdrImage::uniform(8, 4, Vec3::splat(0.5));
        let mut store = TextureStore::default();
        let mut target = CaptureTarget::new();
        let mut pipeline = PipelineState::default();
        let cube = capture_environment(&mut store, &mut target, &mut pipeline, &image, 8).expect("capture");
        let texture = store.cube(cube).expect("cube");
        assert_eq!(texture.level_count(), 4);
        assert_eq!(texture.mip_range(), (0, 3));
        let far = store.sample_cube_lod(cube, Vec3::X, 20.0);
        assert!((far.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn non_equirect_sources_still_capture() {
        let image = HdrImage::uniform(4, 4, Vec3::ONE);
        let mut store = TextureStore::default();
        let mut target = CaptureTarget::new();
        let mut pipeline = PipelineState::default();
        assert!(capture_environment(&mut store, &mut target, &mut pipeline, &image, 4).is_ok());
    }
}
