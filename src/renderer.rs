//! Forward renderer: per-frame command collection, front-to-back sorting, global and
//! per-draw binding into an offscreen HDR target, then a composite pass to the screen.

pub mod backend;
pub mod frame_data;
pub mod lights;
pub mod offscreen;
pub mod queue;

use crate::config::{IblConfig, RendererConfig};
use crate::error::RenderError;
use crate::hdr::HdrImage;
use crate::ibl::{EnvironmentMaps, IblBaker};
use crate::material::{
    Material, MaterialHandle, TextureChannel, BRDF_LUT_SLOT, COMPOSITE_SOURCE_SLOT, IRRADIANCE_SLOT,
    PREFILTER_SLOT,
};
use crate::mesh::{Mesh, Model};
use crate::texture::TextureStore;
use glam::{Mat4, Vec3};
use std::path::Path;
use std::sync::Arc;

use backend::{RenderBackend, RenderTarget, ShaderProgram};
use frame_data::{DrawUniforms, FrameUniforms, IblFlags, MaterialUniform, SceneFrameData};
use lights::{DirectionalLight, LightAggregator, PointLight};
use offscreen::OffscreenTarget;
use queue::RenderQueue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameState {
    Idle,
    Recording,
}

#[derive(Clone, Copy, Debug)]
struct CameraState {
    view: Mat4,
    projection: Mat4,
    position: Vec3,
}

/// Summary of the last `end_frame`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draw_calls: u32,
    pub textures_bound: u32,
    pub point_lights: u32,
    pub dropped_point_lights: u32,
    pub skybox: bool,
    pub ibl: IblFlags,
}

pub struct Renderer<B: RenderBackend> {
    backend: B,
    config: RendererConfig,
    textures: TextureStore,
    baker: IblBaker,
    environment: EnvironmentMaps,
    offscreen: OffscreenTarget,
    queue: RenderQueue,
    lights: LightAggregator,
    camera: CameraState,
    state: FrameState,
    default_material: MaterialHandle,
}

impl<B: RenderBackend> Renderer<B> {
    pub fn new(backend: B, config: RendererConfig, ibl_config: IblConfig) -> Result<Self, RenderError> {
        let mut textures = TextureStore::new(ibl_config.max_texture_size);
        let offscreen = OffscreenTarget::create(&mut textures, config.width, config.height)?;
        Ok(Self {
            backend,
            config,
            textures,
            baker: IblBaker::new(ibl_config),
            environment: EnvironmentMaps::default(),
            offscreen,
            queue: RenderQueue::new(),
            lights: LightAggregator::new(),
            camera: CameraState { view: Mat4::IDENTITY, projection: Mat4::IDENTITY, position: Vec3::ZERO },
            state: FrameState::Idle,
            default_material: Arc::new(Material::default()),
        })
    }

    /// Bakes the panorama at `path` and makes it the active environment. On failure the
    /// previous maps are still released and shading falls back to the flat ambient term.
    pub fn load_environment(&mut self, path: impl AsRef<Path>) -> &EnvironmentMaps {
        self.environment.release(&mut self.textures);
        self.environment = self.baker.bake_from_path(&mut self.textures, path);
        &self.environment
    }

    pub fn load_environment_image(&mut self, image: &HdrImage) -> &EnvironmentMaps {
        self.environment.release(&mut self.textures);
        self.environment = self.baker.bake_from_image(&mut self.textures, image);
        &self.environment
    }

    pub fn environment(&self) -> &EnvironmentMaps {
        &self.environment
    }

    pub fn textures(&self) -> &TextureStore {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureStore {
        &mut self.textures
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn offscreen(&self) -> &OffscreenTarget {
        &self.offscreen
    }

    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    pub fn lights(&self) -> &LightAggregator {
        &self.lights
    }

    pub fn is_recording(&self) -> bool {
        self.state == FrameState::Recording
    }

    pub fn begin_frame(&mut self, view: Mat4, projection: Mat4, camera_position: Vec3) {
        if self.state == FrameState::Recording {
            log::warn!("[renderer] begin_frame while a frame is open; dropping {} queued draws", self.queue.len());
        }
        self.queue.clear();
        self.lights.reset();
        self.camera = CameraState { view, projection, position: camera_position };
        self.state = FrameState::Recording;
    }

    fn accepting(&self, what: &str) -> bool {
        if self.state != FrameState::Recording {
            log::warn!("[renderer] {what} submitted outside begin_frame/end_frame; ignored");
            return false;
        }
        true
    }

    pub fn submit(&mut self, model: &Model, transform: Mat4) {
        if !self.accepting("model") {
            return;
        }
        for mesh in model.meshes() {
            self.push_mesh(mesh, transform);
        }
    }

    pub fn submit_mesh(&mut self, mesh: &Arc<Mesh>, transform: Mat4) {
        if self.accepting("mesh") {
            self.push_mesh(mesh, transform);
        }
    }

    fn push_mesh(&mut self, mesh: &Arc<Mesh>, transform: Mat4) {
        let material = mesh.material().cloned().unwrap_or_else(|| Arc::clone(&self.default_material));
        self.queue.push(Arc::clone(mesh), material, transform, self.camera.position);
    }

    pub fn submit_directional_light(&mut self, light: DirectionalLight) {
        if self.accepting("directional light") {
            self.lights.set_directional(light);
        }
    }

    /// Returns false if the light was ignored or dropped at the per-frame cap.
    pub fn submit_point_light(&mut self, light: PointLight) -> bool {
        self.accepting("point light") && self.lights.push_point(light)
    }

    /// Sorts the queue and records the geometry pass into the offscreen target.
    pub fn end_frame(&mut self) -> Result<FrameStats, RenderError> {
        if self.state != FrameState::Recording {
            return Err(RenderError::FrameNotBegun);
        }
        self.state = FrameState::Idle;
        self.queue.sort_front_to_back();

        let scene = SceneFrameData {
            view: self.camera.view,
            projection: self.camera.projection,
            camera_position: self.camera.position,
            directional: *self.lights.directional(),
            point_lights: self.lights.point_lights().to_vec(),
            environment: self.environment,
        };
        let uniforms = FrameUniforms::new(&scene, Vec3::from_array(self.config.flat_ambient));
        let mut stats = FrameStats {
            point_lights: scene.point_lights.len() as u32,
            dropped_point_lights: self.lights.dropped_point_lights(),
            ibl: uniforms.ibl_flags(),
            ..FrameStats::default()
        };

        let backend = &mut self.backend;
        backend.bind_target(RenderTarget::Offscreen(self.offscreen.color()));
        backend.set_depth_test(true);
        backend.clear(self.config.clear_color);
        backend.use_program(ShaderProgram::Pbr);
        backend.set_frame_uniforms(&uniforms);
        for (slot, texture) in [
            (IRRADIANCE_SLOT, self.environment.irradiance_map_id()),
            (PREFILTER_SLOT, self.environment.prefilter_map_id()),
            (BRDF_LUT_SLOT, self.environment.brdf_lut_id()),
        ] {
            backend.bind_texture(slot, texture);
            stats.textures_bound += u32::from(texture.is_some());
        }

        for command in self.queue.commands() {
            let material = command.material.as_ref();
            backend.set_material(&MaterialUniform::from(material));
            for channel in TextureChannel::ALL {
                let texture = material.texture(channel);
                backend.bind_texture(channel.slot(), texture);
                stats.textures_bound += u32::from(texture.is_some());
            }
            backend.set_draw_uniforms(&DrawUniforms::new(command.transform));
            backend.draw_indexed(&command.mesh);
            stats.draw_calls += 1;
        }

        if let Some(cubemap) = self.environment.cubemap_id().filter(|_| self.config.skybox) {
            backend.use_program(ShaderProgram::Skybox);
            backend.draw_skybox(cubemap);
            stats.skybox = true;
        }
        log::trace!(
            "[renderer] frame: {} draws, {} point lights ({} dropped)",
            stats.draw_calls,
            stats.point_lights,
            stats.dropped_point_lights
        );
        Ok(stats)
    }

    /// Draws the offscreen color target over the screen with depth testing suspended.
    pub fn composite_to_screen(&mut self) {
        let backend = &mut self.backend;
        let depth_was_enabled = backend.depth_test();
        backend.set_depth_test(false);
        backend.bind_target(RenderTarget::Screen);
        backend.use_program(ShaderProgram::Composite);
        backend.bind_texture(COMPOSITE_SOURCE_SLOT, Some(self.offscreen.color()));
        backend.draw_fullscreen();
        backend.set_depth_test(depth_was_enabled);
    }

    /// Recreates the offscreen target for the new viewport. Zero-sized viewports (minimized
    /// windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            log::warn!("[renderer] ignoring resize to {width}x{height}");
            return Ok(());
        }
        if self.offscreen.resize(&mut self.textures, width, height)? {
            self.config.width = width;
            self.config.height = height;
            log::debug!("[renderer] resized to {width}x{height}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::backend::{CommandRecorder, GpuCommand};
    use super::*;

    fn renderer() -> Renderer<CommandRecorder> {
        let config = RendererConfig { width: 8, height: 8, ..RendererConfig::default() };
        Renderer::new(CommandRecorder::new(), config, IblConfig::default()).expect("renderer")
    }

    #[test]
    fn end_frame_requires_begin() {
        let mut renderer = renderer();
        assert!(matches!(renderer.end_frame(), Err(RenderError::FrameNotBegun)));
        renderer.begin_frame(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO);
        assert!(renderer.is_recording());
        assert!(renderer.end_frame().is_ok());
        assert!(!renderer.is_recording());
        assert!(matches!(renderer.end_frame(), Err(RenderError::FrameNotBegun)));
    }

    #[test]
    fn submissions_outside_a_frame_are_ignored() {
        let mut renderer = renderer();
        renderer.submit_mesh(&Arc::new(Mesh::cube(1.0)), Mat4::IDENTITY);
        assert!(!renderer.submit_point_light(PointLight::new(Vec3::ZERO, Vec3::ONE, 1.0, 1.0)));
        assert!(renderer.queue().is_empty());
        assert!(renderer.lights().point_lights().is_empty());
    }

    #[test]
    fn meshes_without_material_use_the_default() {
        let mut renderer = renderer();
        renderer.begin_frame(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO);
        renderer.submit_mesh(&Arc::new(Mesh::plane(1.0)), Mat4::IDENTITY);
        renderer.end_frame().expect("frame");
        let material = renderer.backend().commands().iter().find_map(|cmd| match cmd {
            GpuCommand::Material(uniform) => Some(*uniform),
            _ => None,
        });
        assert_eq!(material, Some(MaterialUniform::from(&Material::default())));
    }

    #[test]
    fn composite_restores_depth_state() {
        let mut renderer = renderer();
        renderer.backend_mut().set_depth_test(true);
        renderer.composite_to_screen();
        assert!(renderer.backend().depth_test());
        let commands = renderer.backend().commands();
        assert!(commands.contains(&GpuCommand::SetDepthTest(false)));
        assert!(commands.contains(&GpuCommand::BindTarget(RenderTarget::Screen)));
        assert_eq!(commands.last(), Some(&GpuCommand::SetDepthTest(true)));
    }

    #[test]
    fn zero_resize_keeps_the_target() {
        let mut renderer = renderer();
        let before = *renderer.offscreen();
        renderer.resize(0, 600).expect("ignored");
        assert_eq!(*renderer.offscreen(), before);
        renderer.resize(16, 4).expect("resized");
        assert_eq!(renderer.offscreen().size(), (16, 4));
        assert_eq!(renderer.config().width, 16);
    }
}
