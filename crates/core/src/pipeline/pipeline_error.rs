use thiserror::Error;

use crate::detection::domain::face_geometry_source::ModelLoadError;
use crate::video::domain::video_source::MediaAccessError;

use super::pipeline_config::ConfigError;

/// Errors that escape a compositor run.
///
/// Only start-up failures end up here; per-tick detection and render errors
/// are handled inside the tick.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    MediaAccess(#[from] MediaAccessError),
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
}
