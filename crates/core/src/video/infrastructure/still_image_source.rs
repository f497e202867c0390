use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::shared::constants::DEFAULT_FPS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_source::{MediaAccessError, VideoSource};

/// Presents one picture as a live source: every tick yields the same pixels
/// under a fresh frame index and timestamp.
///
/// Decodes with the `image` crate. Useful for tuning filters on a still
/// portrait without a camera.
pub struct StillImageSource {
    path: PathBuf,
    fps: f64,
    max_frames: Option<usize>,
    image: Option<(Vec<u8>, u32, u32)>,
    next_index: usize,
}

impl StillImageSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            fps: DEFAULT_FPS,
            max_frames: None,
            image: None,
            next_index: 0,
        }
    }

    /// Nominal rate used to space frame timestamps.
    pub fn with_fps(mut self, fps: f64) -> Self {
        if fps > 0.0 && fps.is_finite() {
            self.fps = fps;
        }
        self
    }

    /// Ends the stream after `max_frames` frames.
    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }
}

impl VideoSource for StillImageSource {
    fn start(&mut self) -> Result<VideoMetadata, MediaAccessError> {
        std::fs::metadata(&self.path)
            .map_err(|e| MediaAccessError::from_io(self.path.clone(), &e))?;
        let rgb = image::open(&self.path)
            .map_err(|e| MediaAccessError::Open {
                source_name: self.path.display().to_string(),
                reason: e.to_string(),
            })?
            .to_rgb8();
        let (width, height) = rgb.dimensions();
        self.image = Some((rgb.into_raw(), width, height));
        self.next_index = 0;
        log::info!(
            "Opened still image {} ({width}x{height})",
            self.path.display()
        );
        Ok(VideoMetadata {
            width,
            height,
            fps: self.fps,
            source: self.path.display().to_string(),
        })
    }

    fn current_frame(&mut self) -> Result<Option<Frame>, MediaAccessError> {
        let Some((data, width, height)) = self.image.as_ref() else {
            return Err(MediaAccessError::NotStarted);
        };
        if self.max_frames.is_some_and(|max| self.next_index >= max) {
            return Ok(None);
        }
        let index = self.next_index;
        self.next_index += 1;
        let timestamp = Duration::from_secs_f64(index as f64 / self.fps);
        Ok(Some(
            Frame::new(data.clone(), *width, *height, 3, index).with_timestamp(timestamp),
        ))
    }

    fn stop(&mut self) {
        self.image = None;
    }

    fn is_active(&self) -> bool {
        self.image.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_image(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("portrait.png");
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([50, 100, 200]);
        }
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_start_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), 40, 30);
        let mut source = StillImageSource::new(&path).with_fps(10.0);

        let meta = source.start().unwrap();

        assert_eq!((meta.width, meta.height), (40, 30));
        assert_eq!(meta.fps, 10.0);
        assert!(source.is_active());
    }

    #[test]
    fn test_frames_repeat_with_increasing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), 4, 4);
        let mut source = StillImageSource::new(&path).with_fps(10.0);
        source.start().unwrap();

        let a = source.current_frame().unwrap().unwrap();
        let b = source.current_frame().unwrap().unwrap();

        assert_eq!(a.data(), b.data());
        assert_eq!(a.pixel(0, 0), &[50, 100, 200]);
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(b.timestamp(), Duration::from_millis(100));
    }

    #[test]
    fn test_max_frames_ends_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), 2, 2);
        let mut source = StillImageSource::new(&path).with_max_frames(Some(2));
        source.start().unwrap();

        assert!(source.current_frame().unwrap().is_some());
        assert!(source.current_frame().unwrap().is_some());
        assert!(source.current_frame().unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let mut source = StillImageSource::new(Path::new("/nonexistent/face.png"));
        assert!(matches!(
            source.start(),
            Err(MediaAccessError::NotFound(_))
        ));
        assert!(!source.is_active());
    }

    #[test]
    fn test_undecodable_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        let mut source = StillImageSource::new(&path);
        assert!(matches!(source.start(), Err(MediaAccessError::Open { .. })));
    }

    #[test]
    fn test_frame_before_start_is_error() {
        let mut source = StillImageSource::new(Path::new("x.png"));
        assert!(matches!(
            source.current_frame(),
            Err(MediaAccessError::NotStarted)
        ));
    }

    #[test]
    fn test_stop_releases_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), 2, 2);
        let mut source = StillImageSource::new(&path);
        source.start().unwrap();
        source.stop();
        source.stop();
        assert!(!source.is_active());
    }
}
