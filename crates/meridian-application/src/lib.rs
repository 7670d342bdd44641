pub mod backtesting;
pub mod config;
pub mod shared;
pub mod streaming;

use meridian_domain::errors::ArtifactError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
