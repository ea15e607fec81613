use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while baking image-based lighting maps.
///
/// None of these are fatal to the renderer: an `AssetLoad` failure aborts the whole
/// bake, a `ResourceInit` failure only drops the stage that raised it.
#[derive(Debug, Error)]
pub enum IblError {
    #[error("failed to load HDR environment '{path}': {reason}")]
    AssetLoad { path: PathBuf, reason: String },
    #[error("{stage}: render resource unavailable ({reason})")]
    ResourceInit { stage: &'static str, reason: String },
}

impl IblError {
    pub(crate) fn resource(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::ResourceInit { stage, reason: reason.into() }
    }

    pub fn is_asset_load(&self) -> bool {
        matches!(self, Self::AssetLoad { .. })
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("end_frame called without a matching begin_frame")]
    FrameNotBegun,
    #[error("{stage}: render resource unavailable ({reason})")]
    ResourceInit { stage: &'static str, reason: String },
}

impl From<IblError> for RenderError {
    fn from(err: IblError) -> Self {
        match err {
            IblError::ResourceInit { stage, reason } => RenderError::ResourceInit { stage, reason },
            IblError::AssetLoad { path, reason } => RenderError::ResourceInit {
                stage: "environment",
                reason: format!("{}: {reason}", path.display()),
            },
        }
    }
}
