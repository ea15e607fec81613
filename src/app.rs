use crate::camera3d::{Camera3D, OrbitCamera};
use crate::cli::CliOverrides;
use crate::config::AppConfig;
use crate::hdr::HdrImage;
use crate::ibl::{gpu::request_headless_device, EnvironmentGpu, EnvironmentMaps};
use crate::material::MaterialLibrary;
use crate::mesh::{Mesh, Model};
use crate::renderer::backend::CommandRecorder;
use crate::renderer::lights::{DirectionalLight, PointLight};
use crate::renderer::{FrameStats, Renderer};
use anyhow::{Context, Result};
use glam::{Mat4, Vec2, Vec3};
use std::sync::Arc;

const PROCEDURAL_SKY_SIZE: (u32, u32) = (256, 128);

pub fn run() -> Result<()> {
    run_with_overrides(CliOverrides::default())
}

/// Bakes the configured environment, renders one demonstration frame and composites it.
pub fn run_with_overrides(cli: CliOverrides) -> Result<()> {
    let mut config = match cli.config_path() {
        Some(path) => AppConfig::load_or_default(path),
        None => AppConfig::default(),
    };
    let overrides = cli.into_config_overrides();
    if !overrides.is_empty() {
        log::info!("[config] command line overrides: {}", overrides.applied_fields().join(", "));
    }
    config.apply_overrides(&overrides);

    let mut renderer = Renderer::new(CommandRecorder::new(), config.renderer.clone(), config.ibl.clone())
        .context("Failed to create renderer")?;
    let maps = match &config.environment {
        Some(path) => *renderer.load_environment(path),
        None => {
            log::info!("[app] no --hdr given; baking the procedural sky");
            let (width, height) = PROCEDURAL_SKY_SIZE;
            *renderer.load_environment_image(&HdrImage::procedural_sky(width, height))
        }
    };
    log_environment(&maps);
    upload_to_gpu(&renderer, &maps);

    let stats = render_demo_frame(&mut renderer).context("Demo frame failed")?;
    renderer.composite_to_screen();
    log::info!(
        "[app] frame: {} draws, {} textures bound, {} point lights ({} dropped), skybox {}, ibl {:?}",
        stats.draw_calls,
        stats.textures_bound,
        stats.point_lights,
        stats.dropped_point_lights,
        stats.skybox,
        stats.ibl
    );
    log::info!("[app] recorded {} backend commands", renderer.backend().commands().len());
    Ok(())
}

fn log_environment(maps: &EnvironmentMaps) {
    log::info!("[app] environment cubemap: {:?}", maps.cubemap_id());
    log::info!("[app] irradiance map: {:?}", maps.irradiance_map_id());
    log::info!("[app] prefilter map: {:?} ({} mips)", maps.prefilter_map_id(), maps.prefilter_mip_levels());
    log::info!("[app] brdf lut: {:?}", maps.brdf_lut_id());
    log::info!("[app] environment valid: {}", maps.is_valid());
}

fn upload_to_gpu(renderer: &Renderer<CommandRecorder>, maps: &EnvironmentMaps) {
    if !maps.is_valid() {
        return;
    }
    let (device, queue) = match pollster::block_on(request_headless_device()) {
        Ok(pair) => pair,
        Err(err) => {
            log::warn!("[app] skipping GPU upload: {err:#}");
            return;
        }
    };
    match EnvironmentGpu::upload(&device, &queue, renderer.textures(), maps) {
        Ok(gpu) => log::info!("[app] uploaded environment ({} prefilter mips)", gpu.prefilter_mip_count()),
        Err(err) => log::warn!("[app] GPU upload failed: {err:#}"),
    }
}

fn render_demo_frame(renderer: &mut Renderer<CommandRecorder>) -> Result<FrameStats> {
    let mut orbit = OrbitCamera::new(Vec3::new(0.0, 0.5, 0.0), 9.0);
    orbit.orbit(Vec2::new(0.35, -0.3));
    let camera: Camera3D = orbit.to_camera(50.0_f32.to_radians(), 0.1, 100.0);
    let viewport = (renderer.config().width, renderer.config().height);
    renderer.begin_frame(
        camera.view_matrix(),
        camera.projection_matrix(Camera3D::aspect(viewport)),
        camera.position,
    );

    let presets = [
        MaterialLibrary::gold(),
        MaterialLibrary::silver(),
        MaterialLibrary::copper(),
        MaterialLibrary::plastic(),
        MaterialLibrary::rubber(),
        MaterialLibrary::emissive(Vec3::new(1.0, 0.4, 0.1), 4.0),
    ];
    let sphere = Mesh::sphere(0.5, 32, 16);
    let count = presets.len() as f32;
    for (i, material) in presets.into_iter().enumerate() {
        let mesh = Arc::new(sphere.clone().with_material(material));
        let x = (i as f32 - (count - 1.0) * 0.5) * 1.25;
        renderer.submit_mesh(&mesh, Mat4::from_translation(Vec3::new(x, 0.5, 0.0)));
    }
    let mut floor = Model::from_mesh(Mesh::plane(12.0));
    floor.set_material_all(&MaterialLibrary::rubber());
    renderer.submit(&floor, Mat4::IDENTITY);

    renderer.submit_directional_light(DirectionalLight::new(Vec3::new(-0.3, -1.0, -0.4), Vec3::ONE, 2.0));
    renderer.submit_point_light(PointLight::new(Vec3::new(-3.0, 2.5, 2.0), Vec3::new(1.0, 0.8, 0.6), 12.0, 8.0));
    renderer.submit_point_light(PointLight::new(Vec3::new(3.0, 2.5, 2.0), Vec3::new(0.5, 0.7, 1.0), 12.0, 8.0));

    Ok(renderer.end_frame()?)
}
