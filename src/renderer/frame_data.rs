use super::lights::{DirectionalLight, PointLight, MAX_POINT_LIGHTS};
use crate::ibl::EnvironmentMaps;
use crate::material::Material;
use bitflags::bitflags;
use glam::{Mat4, Vec3, Vec4};

bitflags! {
    /// Which image-based-lighting terms the shading stage may use.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct IblFlags: u32 {
        const DIFFUSE = 1 << 0;
        const SPECULAR = 1 << 1;
    }
}

impl IblFlags {
    pub fn from_maps(maps: &EnvironmentMaps) -> Self {
        let mut flags = IblFlags::empty();
        flags.set(IblFlags::DIFFUSE, maps.has_diffuse());
        flags.set(IblFlags::SPECULAR, maps.has_specular());
        flags
    }
}

/// Camera, lights and environment for the frame being recorded.
#[derive(Clone, Debug)]
pub struct SceneFrameData {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub directional: DirectionalLight,
    pub point_lights: Vec<PointLight>,
    pub environment: EnvironmentMaps,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub skybox_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub light_dir: [f32; 4],
    pub light_color: [f32; 4],
    /// xyz position, w radius. Shading applies [`PointLight::attenuation`] with that radius.
    pub point_positions: [[f32; 4]; MAX_POINT_LIGHTS],
    /// rgb color, w intensity.
    pub point_colors: [[f32; 4]; MAX_POINT_LIGHTS],
    pub lighting_params: [f32; 4], // point count, ibl flags, prefilter max lod, unused
    pub ambient_color: [f32; 4],
}

impl FrameUniforms {
    pub fn new(scene: &SceneFrameData, flat_ambient: Vec3) -> Self {
        let mut point_positions = [[0.0; 4]; MAX_POINT_LIGHTS];
        let mut point_colors = [[0.0; 4]; MAX_POINT_LIGHTS];
        let count = scene.point_lights.len().min(MAX_POINT_LIGHTS);
        for (i, light) in scene.point_lights.iter().take(count).enumerate() {
            point_positions[i] = light.position.extend(light.radius).to_array();
            point_colors[i] = light.color.extend(light.intensity).to_array();
        }
        let ibl = IblFlags::from_maps(&scene.environment);
        let max_lod = scene.environment.prefilter_mip_levels().saturating_sub(1) as f32;
        let directional = &scene.directional;
        Self {
            view: scene.view.to_cols_array_2d(),
            projection: scene.projection.to_cols_array_2d(),
            view_proj: (scene.projection * scene.view).to_cols_array_2d(),
            skybox_view_proj: (scene.projection * rotation_only(scene.view)).to_cols_array_2d(),
            camera_pos: scene.camera_position.extend(1.0).to_array(),
            light_dir: directional.direction().extend(directional.intensity).to_array(),
            light_color: directional.color.extend(1.0).to_array(),
            point_positions,
            point_colors,
            lighting_params: [count as f32, ibl.bits() as f32, max_lod, 0.0],
            ambient_color: flat_ambient.extend(1.0).to_array(),
        }
    }

    pub fn point_light_count(&self) -> usize {
        self.lighting_params[0] as usize
    }

    pub fn ibl_flags(&self) -> IblFlags {
        IblFlags::from_bits_truncate(self.lighting_params[1] as u32)
    }
}

/// `view` without its translation, so the skybox stays at infinity.
fn rotation_only(view: Mat4) -> Mat4 {
    let mut rotation = view;
    rotation.w_axis = Vec4::W;
    rotation
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub albedo: [f32; 4],
    pub emission: [f32; 4], // rgb + strength
    pub params: [f32; 4],   // metallic, roughness, ao, unused
    pub texture_flags: [u32; 4],
}

impl From<&Material> for MaterialUniform {
    fn from(material: &Material) -> Self {
        let props = material.properties();
        Self {
            albedo: props.albedo.extend(1.0).to_array(),
            emission: props.emission.extend(props.emission_strength).to_array(),
            params: [props.metallic, props.roughness, props.ao, 0.0],
            texture_flags: [material.present_channels().bits(), 0, 0, 0],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
}

impl DrawUniforms {
    pub fn new(model: Mat4) -> Self {
        Self { model: model.to_cols_array_2d(), normal_matrix: model.inverse().transpose().to_cols_array_2d() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{MaterialProperties, TextureChannels};

    fn scene(points: usize) -> SceneFrameData {
        SceneFrameData {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            camera_position: Vec3::new(0.0, 1.0, 5.0),
            directional: DirectionalLight::default(),
            point_lights: (0..points)
                .map(|i| PointLight::new(Vec3::splat(i as f32), Vec3::ONE, 2.0, 8.0))
                .collect(),
            environment: EnvironmentMaps::default(),
        }
    }

    #[test]
    fn uniforms_pack_lights() {
        let uniforms = FrameUniforms::new(&scene(3), Vec3::splat(0.03));
        assert_eq!(uniforms.point_light_count(), 3);
        assert_eq!(uniforms.point_positions[2], [2.0, 2.0, 2.0, 8.0]);
        assert_eq!(uniforms.point_colors[0][3], 2.0);
        assert_eq!(uniforms.point_positions[3], [0.0; 4]);
        assert_eq!(uniforms.ambient_color[0], 0.03);
    }

    #[test]
    fn packed_lights_carry_everything_the_falloff_needs() {
        let scene = scene(2);
        let uniforms = FrameUniforms::new(&scene, Vec3::ZERO);
        for (i, light) in scene.point_lights.iter().enumerate() {
            let [x, y, z, radius] = uniforms.point_positions[i];
            let [r, g, b, intensity] = uniforms.point_colors[i];
            let unpacked = PointLight::new(Vec3::new(x, y, z), Vec3::new(r, g, b), intensity, radius);
            assert_eq!(&unpacked, light);
            assert_eq!(unpacked.attenuation(3.0), light.attenuation(3.0));
        }
    }

    #[test]
    fn skybox_matrix_ignores_camera_translation() {
        let mut moved = scene(0);
        moved.view = Mat4::from_translation(Vec3::new(4.0, -2.0, 9.0));
        let uniforms = FrameUniforms::new(&moved, Vec3::ZERO);
        assert_eq!(uniforms.skybox_view_proj, Mat4::IDENTITY.to_cols_array_2d());
        assert_ne!(uniforms.view_proj, uniforms.skybox_view_proj);
    }

    #[test]
    fn missing_environment_disables_ibl() {
        let uniforms = FrameUniforms::new(&scene(0), Vec3::splat(0.03));
        assert_eq!(uniforms.ibl_flags(), IblFlags::empty());
    }

    #[test]
    fn material_uniform_carries_scalars_and_flags() {
        let material = Material::new(
            "m",
            MaterialProperties { metallic: 0.25, roughness: 0.75, ..MaterialProperties::default() },
        );
        let uniform = MaterialUniform::from(&material);
        assert_eq!(uniform.params, [0.25, 0.75, 1.0, 0.0]);
        assert_eq!(uniform.texture_flags[0], TextureChannels::empty().bits());
    }

    #[test]
    fn uniform_sizes_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 64);
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 128);
    }
}
