pub mod app;
pub mod camera3d;
pub mod cli;
pub mod config;
pub mod error;
pub mod hdr;
pub mod ibl;
pub mod material;
pub mod mesh;
pub mod renderer;
pub mod texture;

pub use app::{run, run_with_overrides};
pub use error::{IblError, RenderError};
pub use ibl::{EnvironmentMaps, IblBaker};
pub use renderer::{FrameStats, Renderer};
pub use texture::{TextureId, TextureStore};
