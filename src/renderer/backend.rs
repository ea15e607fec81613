use super::frame_data::{DrawUniforms, FrameUniforms, MaterialUniform};
use crate::mesh::Mesh;
use crate::texture::TextureId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderTarget {
    Offscreen(TextureId),
    Screen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderProgram {
    Pbr,
    Skybox,
    Composite,
}

/// Graphics command stream the renderer drives. Calls take effect in the order issued.
pub trait RenderBackend {
    fn bind_target(&mut self, target: RenderTarget);
    fn clear(&mut self, color: [f32; 4]);
    fn set_depth_test(&mut self, enabled: bool);
    fn depth_test(&self) -> bool;
    fn use_program(&mut self, program: ShaderProgram);
    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms);
    /// `None` unbinds the slot so the previous draw's texture cannot leak through.
    fn bind_texture(&mut self, slot: u32, texture: Option<TextureId>);
    fn set_material(&mut self, uniform: &MaterialUniform);
    fn set_draw_uniforms(&mut self, uniforms: &DrawUniforms);
    fn draw_indexed(&mut self, mesh: &Mesh);
    fn draw_skybox(&mut self, cubemap: TextureId);
    fn draw_fullscreen(&mut self);
}

#[derive(Clone, Debug, PartialEq)]
pub enum GpuCommand {
    BindTarget(RenderTarget),
    Clear([f32; 4]),
    SetDepthTest(bool),
    UseProgram(ShaderProgram),
    FrameUniforms(Box<FrameUniforms>),
    BindTexture { slot: u32, texture: Option<TextureId> },
    Material(MaterialUniform),
    DrawUniforms(DrawUniforms),
    DrawIndexed { index_count: u32, vertex_count: u32 },
    DrawSkybox(TextureId),
    DrawFullscreen,
}

/// Backend that records every call, for headless runs and tests.
#[derive(Debug)]
pub struct CommandRecorder {
    commands: Vec<GpuCommand>,
    depth_test: bool,
}

impl Default for CommandRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self { commands: Vec::new(), depth_test: true }
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|cmd| matches!(cmd, GpuCommand::DrawIndexed { .. })).count()
    }

    pub fn last_frame_uniforms(&self) -> Option<&FrameUniforms> {
        self.commands.iter().rev().find_map(|cmd| match cmd {
            GpuCommand::FrameUniforms(uniforms) => Some(uniforms.as_ref()),
            _ => None,
        })
    }

    /// Model transforms of every indexed draw, in issue order.
    pub fn draw_transforms(&self) -> Vec<DrawUniforms> {
        let mut pending = None;
        let mut transforms = Vec::new();
        for cmd in &self.commands {
            match cmd {
                GpuCommand::DrawUniforms(uniforms) => pending = Some(*uniforms),
                GpuCommand::DrawIndexed { .. } => transforms.extend(pending),
                _ => {}
            }
        }
        transforms
    }
}

impl RenderBackend for CommandRecorder {
    fn bind_target(&mut self, target: RenderTarget) {
        self.commands.push(GpuCommand::BindTarget(target));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.commands.push(GpuCommand::Clear(color));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        self.commands.push(GpuCommand::SetDepthTest(enabled));
    }

    fn depth_test(&self) -> bool {
        self.depth_test
    }

    fn use_program(&mut self, program: ShaderProgram) {
        self.commands.push(GpuCommand::UseProgram(program));
    }

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.commands.push(GpuCommand::FrameUniforms(Box::new(*uniforms)));
    }

    fn bind_texture(&mut self, slot: u32, texture: Option<TextureId>) {
        self.commands.push(GpuCommand::BindTexture { slot, texture });
    }

    fn set_material(&mut self, uniform: &MaterialUniform) {
        self.commands.push(GpuCommand::Material(*uniform));
    }

    fn set_draw_uniforms(&mut self, uniforms: &DrawUniforms) {
        self.commands.push(GpuCommand::DrawUniforms(*uniforms));
    }

    fn draw_indexed(&mut self, mesh: &Mesh) {
        self.commands.push(GpuCommand::DrawIndexed {
            index_count: mesh.index_count(),
            vertex_count: mesh.vertices.len() as u32,
        });
    }

    fn draw_skybox(&mut self, cubemap: TextureId) {
        self.commands.push(GpuCommand::DrawSkybox(cubemap));
    }

    fn draw_fullscreen(&mut self) {
        self.commands.push(GpuCommand::DrawFullscreen);
    }
}
