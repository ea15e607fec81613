use crate::texture::TextureId;
use bitflags::bitflags;
use glam::Vec3;
use std::sync::Arc;

/// Shared, immutable material. Swapping a mesh's look replaces its handle.
pub type MaterialHandle = Arc<Material>;

pub const IRRADIANCE_SLOT: u32 = 6;
pub const PREFILTER_SLOT: u32 = 7;
pub const BRDF_LUT_SLOT: u32 = 8;
pub const COMPOSITE_SOURCE_SLOT: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureChannel {
    Diffuse,
    Normal,
    Metallic,
    Roughness,
    AmbientOcclusion,
    Emission,
}

bitflags! {
    /// Which material channels have a bound texture.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TextureChannels: u32 {
        const DIFFUSE = 1 << 0;
        const NORMAL = 1 << 1;
        const METALLIC = 1 << 2;
        const ROUGHNESS = 1 << 3;
        const AMBIENT_OCCLUSION = 1 << 4;
        const EMISSION = 1 << 5;
    }
}

impl TextureChannel {
    pub const ALL: [TextureChannel; 6] = [
        TextureChannel::Diffuse,
        TextureChannel::Normal,
        TextureChannel::Metallic,
        TextureChannel::Roughness,
        TextureChannel::AmbientOcclusion,
        TextureChannel::Emission,
    ];

    /// Texture unit the channel is always bound to.
    pub const fn slot(self) -> u32 {
        match self {
            TextureChannel::Diffuse => 0,
            TextureChannel::Normal => 1,
            TextureChannel::Metallic => 2,
            TextureChannel::Roughness => 3,
            TextureChannel::AmbientOcclusion => 4,
            TextureChannel::Emission => 5,
        }
    }

    pub const fn flag(self) -> TextureChannels {
        match self {
            TextureChannel::Diffuse => TextureChannels::DIFFUSE,
            TextureChannel::Normal => TextureChannels::NORMAL,
            TextureChannel::Metallic => TextureChannels::METALLIC,
            TextureChannel::Roughness => TextureChannels::ROUGHNESS,
            TextureChannel::AmbientOcclusion => TextureChannels::AMBIENT_OCCLUSION,
            TextureChannel::Emission => TextureChannels::EMISSION,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TextureChannel::Diffuse => "diffuse",
            TextureChannel::Normal => "normal",
            TextureChannel::Metallic => "metallic",
            TextureChannel::Roughness => "roughness",
            TextureChannel::AmbientOcclusion => "ao",
            TextureChannel::Emission => "emission",
        }
    }

    fn index(self) -> usize {
        self.slot() as usize
    }
}

/// Scalar PBR inputs, used wherever the matching texture is absent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialProperties {
    pub albedo: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub ao: f32,
    pub emission: Vec3,
    pub emission_strength: f32,
}

impl Default for MaterialProperties {
    fn default() -> Self {
        Self {
            albedo: Vec3::ONE,
            metallic: 0.0,
            roughness: 0.5,
            ao: 1.0,
            emission: Vec3::ZERO,
            emission_strength: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Material {
    name: String,
    properties: MaterialProperties,
    textures: [Option<TextureId>; 6],
}

impl Material {
    pub fn new(name: impl Into<String>, properties: MaterialProperties) -> Self {
        Self { name: name.into(), properties, textures: [None; 6] }
    }

    pub fn with_texture(mut self, channel: TextureChannel, texture: TextureId) -> Self {
        self.set_texture(channel, Some(texture));
        self
    }

    pub fn set_texture(&mut self, channel: TextureChannel, texture: Option<TextureId>) {
        self.textures[channel.index()] = texture;
    }

    pub fn texture(&self, channel: TextureChannel) -> Option<TextureId> {
        self.textures[channel.index()]
    }

    /// Bound textures in slot order.
    pub fn bound_textures(&self) -> impl Iterator<Item = (TextureChannel, TextureId)> + '_ {
        TextureChannel::ALL.into_iter().filter_map(|channel| self.texture(channel).map(|id| (channel, id)))
    }

    pub fn present_channels(&self) -> TextureChannels {
        self.bound_textures().fold(TextureChannels::empty(), |flags, (channel, _)| flags | channel.flag())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &MaterialProperties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut MaterialProperties {
        &mut self.properties
    }

    pub fn into_handle(self) -> MaterialHandle {
        Arc::new(self)
    }
}

/// Stock metals, dielectrics and emitters.
pub struct MaterialLibrary;

impl MaterialLibrary {
    fn preset(name: &str, albedo: Vec3, metallic: f32, roughness: f32) -> MaterialHandle {
        Material::new(name, MaterialProperties { albedo, metallic, roughness, ..MaterialProperties::default() })
            .into_handle()
    }

    pub fn gold() -> MaterialHandle {
        Self::preset("gold", Vec3::new(1.0, 0.765_557, 0.336_057), 1.0, 0.3)
    }

    pub fn silver() -> MaterialHandle {
        Self::preset("silver", Vec3::new(0.972, 0.960, 0.915), 1.0, 0.2)
    }

    pub fn copper() -> MaterialHandle {
        Self::preset("copper", Vec3::new(0.955, 0.637, 0.538), 1.0, 0.4)
    }

    pub fn plastic() -> MaterialHandle {
        Self::preset("plastic", Vec3::new(1.0, 0.0, 0.0), 0.0, 0.6)
    }

    pub fn rubber() -> MaterialHandle {
        Self::preset("rubber", Vec3::splat(0.2), 0.0, 0.9)
    }

    pub fn emissive(color: Vec3, strength: f32) -> MaterialHandle {
        Material::new(
            "emissive",
            MaterialProperties {
                albedo: color,
                roughness: 1.0,
                emission: color,
                emission_strength: strength,
                ..MaterialProperties::default()
            },
        )
        .into_handle()
    }
}
