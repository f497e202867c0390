use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Failure to acquire or read the video source.
///
/// Fatal to pipeline start-up; mid-run occurrences only skip the tick.
#[derive(Error, Debug)]
pub enum MediaAccessError {
    #[error("video source not found: {0}")]
    NotFound(PathBuf),
    #[error("permission denied for video source: {0}")]
    PermissionDenied(PathBuf),
    #[error("failed to open {source_name}: {reason}")]
    Open { source_name: String, reason: String },
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("video source has not been started")]
    NotStarted,
}

impl MediaAccessError {
    /// Classifies an I/O error raised while opening `path`.
    pub fn from_io(path: PathBuf, error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => MediaAccessError::NotFound(path),
            std::io::ErrorKind::PermissionDenied => MediaAccessError::PermissionDenied(path),
            _ => MediaAccessError::Open {
                source_name: path.display().to_string(),
                reason: error.to_string(),
            },
        }
    }
}

/// Live frame producer (camera, file, stream).
///
/// Acquired by `start` and released by `stop`. Between the two, the
/// compositor pulls one frame per tick.
pub trait VideoSource: Send {
    fn start(&mut self) -> Result<VideoMetadata, MediaAccessError>;

    /// Next frame for this tick. `Ok(None)` means the source is exhausted.
    fn current_frame(&mut self) -> Result<Option<Frame>, MediaAccessError>;

    /// Releases the underlying device or file. Safe to call repeatedly.
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::ErrorKind;

    #[rstest]
    #[case(ErrorKind::NotFound, "not found")]
    #[case(ErrorKind::PermissionDenied, "permission denied")]
    #[case(ErrorKind::InvalidData, "failed to open")]
    fn test_from_io_classification(#[case] kind: ErrorKind, #[case] expected: &str) {
        let err = MediaAccessError::from_io(PathBuf::from("cam.mp4"), &std::io::Error::from(kind));
        assert!(err.to_string().contains(expected), "{err}");
    }
}
