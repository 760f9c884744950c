use tagplace_core::SmoothingError;
use tagplace_placement::{BindingError, SpeedError};

/// Invalid values in a [`crate::PipelineConfig`].
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("marker_size_m must be finite and > 0, got {0}")]
    InvalidMarkerSize(f32),
    #[error(transparent)]
    Smoothing(#[from] SmoothingError),
    #[error(transparent)]
    SlowPlacing(#[from] SpeedError),
    #[error(transparent)]
    Binding(#[from] BindingError),
}

/// Fatal errors raised while building a pipeline.
///
/// Transient unavailability (no frame yet) is never an error; see
/// [`crate::TagPipeline::detect_markers`].
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("no frame source assigned")]
    MissingFrameSource,
    #[error("no marker detector assigned")]
    MissingDetector,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(thiserror::Error, Debug)]
pub enum TagplaceIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
