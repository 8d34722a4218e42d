//! Evaluation errors
//!
//! Everything that can go wrong while turning module options into an
//! artifact and a unit. Filesystem and process failures during deployment
//! are reported through `eyre` instead.

use std::path::PathBuf;

use format_serde_error::SerdeError;
use thiserror::Error;

/// Errors raised while evaluating the module options
#[derive(Debug, Error)]
pub enum Error {
    /// The options document does not match the option schema
    #[error("invalid module options:\n{0}")]
    Schema(SerdeError),

    /// The service is enabled but has nowhere to put its config
    #[error("`configPath` must be set when the service is enabled")]
    MissingConfigPath,

    /// The config path is not absolute
    #[error("`configPath` must be an absolute path, got {0:?}")]
    RelativeConfigPath(PathBuf),

    /// The rendered config could not be serialized
    #[error("failed to render config: {0}")]
    Render(#[from] serde_json::Error),
}

/// Result alias for evaluation
pub type Result<T, E = Error> = std::result::Result<T, E>;
