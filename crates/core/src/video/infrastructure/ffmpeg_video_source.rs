use std::path::Path;
use std::time::Duration;

use crate::shared::constants::DEFAULT_FPS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_source::{MediaAccessError, VideoSource};

/// Open decoder state, alive between `start` and `stop`.
struct Decoding {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    time_base: ffmpeg_next::Rational,
    width: u32,
    height: u32,
    flushing: bool,
    done: bool,
}

/// Decodes a video file or stream URL via ffmpeg-next, one frame per tick.
///
/// Frames are converted to RGB24. Timestamps come from the packet
/// presentation time when available, otherwise from the frame index and the
/// stream's nominal rate, and never go backwards.
pub struct FfmpegVideoSource {
    input: String,
    max_frames: Option<usize>,
    state: Option<Decoding>,
    fps: f64,
    next_index: usize,
    last_timestamp: Duration,
}

// Safety: FfmpegVideoSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegVideoSource {}

impl FfmpegVideoSource {
    /// `input` is a file path or any URL ffmpeg can open.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
            max_frames: None,
            state: None,
            fps: DEFAULT_FPS,
            next_index: 0,
            last_timestamp: Duration::ZERO,
        }
    }

    /// Ends the stream after `max_frames` frames.
    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }

    fn open_error(&self, reason: impl std::fmt::Display) -> MediaAccessError {
        MediaAccessError::Open {
            source_name: self.input.clone(),
            reason: reason.to_string(),
        }
    }

    fn timestamp_for(&mut self, pts: Option<i64>, time_base: ffmpeg_next::Rational) -> Duration {
        let from_pts = pts.filter(|p| *p >= 0).and_then(|p| {
            if time_base.denominator() == 0 {
                return None;
            }
            let secs = p as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
            secs.is_finite().then(|| Duration::from_secs_f64(secs))
        });
        let ts = from_pts
            .unwrap_or_else(|| Duration::from_secs_f64(self.next_index as f64 / self.fps));
        self.last_timestamp = ts.max(self.last_timestamp);
        self.last_timestamp
    }
}

fn looks_like_url(input: &str) -> bool {
    input.contains("://")
}

impl VideoSource for FfmpegVideoSource {
    fn start(&mut self) -> Result<VideoMetadata, MediaAccessError> {
        if !looks_like_url(&self.input) {
            let path = Path::new(&self.input);
            std::fs::metadata(path).map_err(|e| MediaAccessError::from_io(path.into(), &e))?;
        }
        ffmpeg_next::init().map_err(|e| self.open_error(e))?;

        let ictx = ffmpeg_next::format::input(&self.input).map_err(|e| self.open_error(e))?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| self.open_error("no video stream found"))?;

        let stream_index = stream.index();
        let time_base = stream.time_base();
        let rate = stream.rate();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| self.open_error(e))?;
        let decoder = codec_ctx.decoder().video().map_err(|e| self.open_error(e))?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| self.open_error(e))?;

        let fps = if rate.denominator() != 0 && rate.numerator() > 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        self.fps = if fps > 0.0 { fps } else { DEFAULT_FPS };
        self.next_index = 0;
        self.last_timestamp = Duration::ZERO;
        self.state = Some(Decoding {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            width,
            height,
            flushing: false,
            done: false,
        });

        log::info!("Opened {} ({width}x{height} @ {fps:.2} fps)", self.input);
        Ok(VideoMetadata {
            width,
            height,
            fps,
            source: self.input.clone(),
        })
    }

    fn current_frame(&mut self) -> Result<Option<Frame>, MediaAccessError> {
        if self.max_frames.is_some_and(|max| self.next_index >= max) {
            return Ok(None);
        }
        let Some(state) = self.state.as_mut() else {
            return Err(MediaAccessError::NotStarted);
        };
        let Some((pixels, pts)) = next_rgb_frame(state)? else {
            return Ok(None);
        };
        let (width, height, time_base) = (state.width, state.height, state.time_base);
        let timestamp = self.timestamp_for(pts, time_base);
        let frame = Frame::new(pixels, width, height, 3, self.next_index).with_timestamp(timestamp);
        self.next_index += 1;
        Ok(Some(frame))
    }

    fn stop(&mut self) {
        if self.state.take().is_some() {
            log::debug!("Closed {} after {} frames", self.input, self.next_index);
        }
    }

    fn is_active(&self) -> bool {
        self.state.is_some()
    }
}

/// Decodes until one frame is available or the input is exhausted.
fn next_rgb_frame(state: &mut Decoding) -> Result<Option<(Vec<u8>, Option<i64>)>, MediaAccessError> {
    if state.done {
        return Ok(None);
    }
    loop {
        if let Some(frame) = try_receive(state)? {
            return Ok(Some(frame));
        }
        if state.flushing {
            state.done = true;
            return Ok(None);
        }
        match state.ictx.packets().next() {
            Some((stream, packet)) => {
                if stream.index() != state.stream_index {
                    continue;
                }
                if let Err(e) = state.decoder.send_packet(&packet) {
                    log::debug!("Skipping undecodable packet: {e}");
                }
            }
            None => {
                let _ = state.decoder.send_eof();
                state.flushing = true;
            }
        }
    }
}

fn try_receive(state: &mut Decoding) -> Result<Option<(Vec<u8>, Option<i64>)>, MediaAccessError> {
    let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
    if state.decoder.receive_frame(&mut decoded).is_err() {
        return Ok(None);
    }
    let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
    state
        .scaler
        .run(&decoded, &mut rgb_frame)
        .map_err(|e| MediaAccessError::Decode(e.to_string()))?;
    let pixels = extract_rgb_pixels(&rgb_frame, state.width, state.height);
    Ok(Some((pixels, decoded.timestamp().or(decoded.pts()))))
}

/// Copies pixel data from an ffmpeg frame into a tightly packed RGB buffer,
/// dropping per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_bytes]);
    }
    pixels
}
