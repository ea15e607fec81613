use glam::{Mat4, Vec3};
use kestrel_pbr::config::{IblConfig, RendererConfig};
use kestrel_pbr::hdr::HdrImage;
use kestrel_pbr::material::{
    Material, MaterialProperties, TextureChannel, BRDF_LUT_SLOT, IRRADIANCE_SLOT, PREFILTER_SLOT,
};
use kestrel_pbr::mesh::{Mesh, Model};
use kestrel_pbr::renderer::backend::{CommandRecorder, GpuCommand, RenderBackend, RenderTarget, ShaderProgram};
use kestrel_pbr::renderer::frame_data::IblFlags;
use kestrel_pbr::renderer::lights::{DirectionalLight, PointLight};
use kestrel_pbr::texture::{Image2D, TextureFormat};
use kestrel_pbr::{RenderError, Renderer};
use std::sync::Arc;

fn tiny_ibl() -> IblConfig {
    IblConfig {
        environment_size: 8,
        irradiance_size: 2,
        irradiance_sample_delta: 0.3,
        prefilter_size: 4,
        prefilter_mip_levels: 2,
        prefilter_sample_count: 4,
        brdf_lut_size: 4,
        brdf_sample_count: 4,
        max_texture_size: 64,
    }
}

fn renderer() -> Renderer<CommandRecorder> {
    let config = RendererConfig { width: 16, height: 16, ..RendererConfig::default() };
    Renderer::new(CommandRecorder::new(), config, tiny_ibl()).expect("renderer")
}

fn bound(commands: &[GpuCommand], slot: u32) -> Option<Option<kestrel_pbr::TextureId>> {
    commands.iter().find_map(|cmd| match cmd {
        GpuCommand::BindTexture { slot: s, texture } if *s == slot => Some(*texture),
        _ => None,
    })
}

#[test]
fn empty_frame_still_applies_frame_uniforms() {
    let mut renderer = renderer();
    renderer.begin_frame(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::new(0.0, 2.0, 4.0));
    let stats = renderer.end_frame().expect("empty frame");
    assert_eq!(stats.draw_calls, 0);
    let uniforms = renderer.backend().last_frame_uniforms().expect("uniforms applied");
    assert_eq!(uniforms.camera_pos, [0.0, 2.0, 4.0, 1.0]);
    assert_eq!(uniforms.point_light_count(), 0);
    assert_eq!(renderer.backend().draw_count(), 0);
}

#[test]
fn fifth_point_light_is_dropped() {
    let mut renderer = renderer();
    renderer.begin_frame(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO);
    let accepted: Vec<bool> = (0..5)
        .map(|i| renderer.submit_point_light(PointLight::new(Vec3::splat(i as f32), Vec3::ONE, 1.0, 5.0)))
        .collect();
    assert_eq!(accepted, vec![true, true, true, true, false]);
    let stats = renderer.end_frame().expect("frame");
    assert_eq!((stats.point_lights, stats.dropped_point_lights), (4, 1));
    let uniforms = renderer.backend().last_frame_uniforms().expect("uniforms");
    assert_eq!(uniforms.point_light_count(), 4);
    assert_eq!(uniforms.point_positions[3][0], 3.0);
}

#[test]
fn draws_are_issued_front_to_back() {
    let mut renderer = renderer();
    let mesh = Arc::new(Mesh::cube(1.0));
    renderer.begin_frame(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO);
    for distance in [10.0, 2.0, 7.0] {
        renderer.submit_mesh(&mesh, Mat4::from_translation(Vec3::new(0.0, 0.0, -distance)));
    }
    let stats = renderer.end_frame().expect("frame");
    assert_eq!(stats.draw_calls, 3);
    let order: Vec<f32> = renderer.backend().draw_transforms().iter().map(|draw| -draw.model[3][2]).collect();
    assert_eq!(order, vec![2.0, 7.0, 10.0]);
}

#[test]
fn geometry_pass_targets_the_offscreen_buffer() {
    let mut renderer = renderer();
    renderer.begin_frame(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO);
    renderer.submit(&Model::from_mesh(Mesh::plane(2.0)), Mat4::IDENTITY);
    renderer.end_frame().expect("frame");
    let color = renderer.offscreen().color();
    let commands = renderer.backend().commands();
    assert_eq!(commands[0], GpuCommand::BindTarget(RenderTarget::Offscreen(color)));
    assert!(commands.contains(&GpuCommand::UseProgram(ShaderProgram::Pbr)));
    assert!(!commands.contains(&GpuCommand::UseProgram(ShaderProgram::Skybox)));
}

#[test]
fn baked_environment_is_bound_to_the_ibl_slots() {
    let mut renderer = renderer();
    let maps = *renderer.load_environment_image(&HdrImage::procedural_sky(16, 8));
    assert!(maps.is_valid());
    renderer.begin_frame(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO);
    let stats = renderer.end_frame().expect("frame");
    assert_eq!(stats.ibl, IblFlags::DIFFUSE | IblFlags::SPECULAR);
    assert!(stats.skybox);

    let commands = renderer.backend().commands();
    assert_eq!(bound(commands, IRRADIANCE_SLOT), Some(maps.irradiance_map_id()));
    assert_eq!(bound(commands, PREFILTER_SLOT), Some(maps.prefilter_map_id()));
    assert_eq!(bound(commands, BRDF_LUT_SLOT), Some(maps.brdf_lut_id()));
    assert_eq!(commands.last(), Some(&GpuCommand::DrawSkybox(maps.cubemap_id().expect("cubemap"))));
    let uniforms = renderer.backend().last_frame_uniforms().expect("uniforms");
    assert_eq!(uniforms.lighting_params[2], 1.0);
}

#[test]
fn failed_environment_load_falls_back_to_flat_ambient() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut renderer = renderer();
    renderer.load_environment_image(&HdrImage::uniform(16, 8, Vec3::ONE));
    let textures_with_environment = renderer.textures().len();

    let maps = *renderer.load_environment(dir.path().join("missing.hdr"));
    assert!(!maps.is_valid());
    assert!(renderer.textures().len() < textures_with_environment, "previous maps released");

    renderer.begin_frame(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO);
    let stats = renderer.end_frame().expect("frame");
    assert_eq!(stats.ibl, IblFlags::empty());
    assert!(!stats.skybox);
    assert_eq!(bound(renderer.backend().commands(), IRRADIANCE_SLOT), Some(None));
    let uniforms = renderer.backend().last_frame_uniforms().expect("uniforms");
    assert_eq!(uniforms.ambient_color, [0.03, 0.03, 0.03, 1.0]);
}

#[test]
fn material_textures_do_not_leak_between_draws() {
    let mut renderer = renderer();
    let albedo = renderer
        .textures_mut()
        .create_texture_2d("albedo", TextureFormat::Rgba8UnormSrgb, Image2D::new(2, 2))
        .expect("texture");
    let textured = Material::new("textured", MaterialProperties::default())
        .with_texture(TextureChannel::Diffuse, albedo)
        .into_handle();
    let near = Arc::new(Mesh::cube(1.0).with_material(textured));
    let far = Arc::new(Mesh::cube(1.0));

    renderer.begin_frame(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO);
    renderer.submit_mesh(&far, Mat4::from_translation(Vec3::new(0.0, 0.0, -9.0)));
    renderer.submit_mesh(&near, Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0)));
    let stats = renderer.end_frame().expect("frame");
    assert_eq!(stats.textures_bound, 1);

    let diffuse_binds: Vec<_> = renderer
        .backend()
        .commands()
        .iter()
        .filter_map(|cmd| match cmd {
            GpuCommand::BindTexture { slot, texture } if *slot == TextureChannel::Diffuse.slot() => Some(*texture),
            _ => None,
        })
        .collect();
    assert_eq!(diffuse_binds, vec![Some(albedo), None]);
}

#[test]
fn directional_light_resets_each_frame() {
    let mut renderer = renderer();
    renderer.begin_frame(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO);
    renderer.submit_directional_light(DirectionalLight::new(Vec3::NEG_Y, Vec3::ONE, 1.0));
    renderer.submit_directional_light(DirectionalLight::new(Vec3::X, Vec3::ONE, 3.0));
    renderer.end_frame().expect("frame");
    let lit = *renderer.backend().last_frame_uniforms().expect("uniforms");
    assert_eq!(lit.light_dir, [1.0, 0.0, 0.0, 3.0]);

    renderer.begin_frame(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO);
    renderer.end_frame().expect("frame");
    let reset = renderer.backend().last_frame_uniforms().expect("uniforms");
    assert_eq!(reset.light_dir[3], DirectionalLight::default().intensity);
}

#[test]
fn composite_after_end_frame_samples_the_offscreen_color() {
    let mut renderer = renderer();
    assert!(matches!(renderer.end_frame(), Err(RenderError::FrameNotBegun)));
    renderer.begin_frame(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO);
    renderer.end_frame().expect("frame");
    renderer.backend_mut().take_commands();
    renderer.composite_to_screen();
    let color = renderer.offscreen().color();
    let commands = renderer.backend().commands();
    assert!(commands.contains(&GpuCommand::BindTexture { slot: 0, texture: Some(color) }));
    assert!(commands.contains(&GpuCommand::DrawFullscreen));
    assert!(renderer.backend().depth_test());
}
