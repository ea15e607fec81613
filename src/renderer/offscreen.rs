use crate::error::IblError;
use crate::texture::{TextureFormat, TextureId, TextureStore};

/// HDR color target the geometry pass renders into before compositing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffscreenTarget {
    color: TextureId,
    width: u32,
    height: u32,
}

impl OffscreenTarget {
    pub fn create(store: &mut TextureStore, width: u32, height: u32) -> Result<Self, IblError> {
        let color = store.create_render_texture("offscreen color", TextureFormat::Rgba16Float, width, height)?;
        log::debug!("[renderer] offscreen target {width}x{height}");
        Ok(Self { color, width, height })
    }

    pub fn color(&self) -> TextureId {
        self.color
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Replaces the color texture when the size changes. The old texture is freed only once
    /// the new one exists. Returns whether anything was recreated.
    pub fn resize(&mut self, store: &mut TextureStore, width: u32, height: u32) -> Result<bool, IblError> {
        if (width, height) == (self.width, self.height) {
            return Ok(false);
        }
        let replacement = Self::create(store, width, height)?;
        store.remove(self.color);
        *self = replacement;
        Ok(true)
    }
}
