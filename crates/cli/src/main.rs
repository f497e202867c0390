use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{Receiver, Sender};

use facefilter_core::detection::domain::detection_scheduler::DetectionDegraded;
use facefilter_core::detection::domain::face_geometry_source::DetectOptions;
use facefilter_core::detection::infrastructure::model_resolver;
use facefilter_core::detection::infrastructure::onnx_blazeface_source::OnnxBlazefaceSource;
use facefilter_core::detection::infrastructure::threaded_detection_executor::ThreadedDetectionExecutor;
use facefilter_core::filters::domain::drawing_surface::DrawingSurface;
use facefilter_core::filters::domain::filter_id::FilterId;
use facefilter_core::filters::domain::filter_registry::FilterRegistry;
use facefilter_core::filters::infrastructure::asset_loader::load_filter_assets;
use facefilter_core::filters::infrastructure::raster_surface::RasterSurface;
use facefilter_core::pipeline::compositor::{Compositor, ControlEvent};
use facefilter_core::pipeline::infrastructure::interval_frame_clock::IntervalFrameClock;
use facefilter_core::pipeline::pipeline_config::PipelineConfig;
use facefilter_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facefilter_core::shared::constants::{
    BLAZEFACE_MODEL_NAME, BLAZEFACE_MODEL_URL, IMAGE_EXTENSIONS,
};
use facefilter_core::video::domain::frame_sink::{FrameSink, NullFrameSink};
use facefilter_core::video::domain::video_source::VideoSource;
use facefilter_core::video::infrastructure::ffmpeg_video_source::FfmpegVideoSource;
use facefilter_core::video::infrastructure::png_sequence_sink::PngSequenceSink;
use facefilter_core::video::infrastructure::still_image_source::StillImageSource;

/// Real-time face filters over a video, stream or still image.
///
/// While running, reads commands from stdin: `toggle <filter>` and `stop`.
#[derive(Parser)]
#[command(name = "facefilter")]
struct Cli {
    /// Input video file, stream URL or image.
    input: String,

    /// Write every presented frame as a PNG into this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Filters enabled at start (comma-separated): sunglasses, mustache,
    /// clown-nose, pixelate, rainbow.
    #[arg(long, value_delimiter = ',')]
    filters: Vec<FilterId>,

    /// Render rate in frames per second.
    #[arg(long, default_value = "30")]
    fps: f64,

    /// Submit detection at most every Nth frame (1 = every frame).
    #[arg(long, default_value = "1")]
    detect_every: usize,

    /// Consecutive detection failures tolerated before the overlay is hidden.
    #[arg(long, default_value = "5")]
    failure_threshold: u32,

    /// Milliseconds a detection may run before it counts as failed.
    #[arg(long, default_value = "2000")]
    detection_timeout_ms: u64,

    /// Block size of the pixelate filter in pixels.
    #[arg(long, default_value = "10")]
    pixel_size: u32,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.5")]
    confidence: f64,

    /// Outline detected faces and their landmarks.
    #[arg(long)]
    show_detections: bool,

    /// Image drawn by the sunglasses filter instead of a black band.
    #[arg(long)]
    sunglasses_image: Option<PathBuf>,

    /// Image drawn by the mustache filter instead of a black bar.
    #[arg(long)]
    mustache_image: Option<PathBuf>,

    /// Detection model file (skips cache lookup and download).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Where to download the detection model when it is not cached.
    #[arg(long, default_value = BLAZEFACE_MODEL_URL)]
    model_url: String,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let model_path = resolve_model(&cli)?;
    let assets = load_filter_assets(&asset_sources(&cli))?;
    let config = PipelineConfig {
        detection_interval: cli.detect_every,
        failure_threshold: cli.failure_threshold,
        detection_timeout: Duration::from_millis(cli.detection_timeout_ms),
        pixel_size: cli.pixel_size,
        detect_options: DetectOptions {
            min_confidence: cli.confidence,
            ..Default::default()
        },
        show_detections: cli.show_detections,
    };

    let mut compositor = Compositor::new(
        open_source(&cli),
        Box::new(ThreadedDetectionExecutor::new(Box::new(
            OnnxBlazefaceSource::new(),
        ))),
        build_surface(cli.output_dir.as_deref())?,
        FilterRegistry::with_enabled(&cli.filters),
        config,
        &model_path,
    )?
    .with_assets(assets)
    .with_logger(Box::new(StdoutPipelineLogger::new(
        cli.fps.round().max(1.0) as usize,
    )))
    .with_degraded_callback(Box::new(|degraded: DetectionDegraded| {
        eprintln!(
            "Face detection is failing ({} times in a row); filters hidden until it recovers",
            degraded.consecutive_failures
        );
    }));

    let mut clock = IntervalFrameClock::from_fps(cli.fps);
    let metadata = compositor.start(&mut clock)?;
    log::info!(
        "Rendering {}x{} at {:.1} fps",
        metadata.width,
        metadata.height,
        cli.fps
    );

    let controls = spawn_command_reader();
    compositor.run(&controls, &AtomicBool::new(false))?;

    if let Some(dir) = &cli.output_dir {
        log::info!("Frames written to {}", dir.display());
    }
    Ok(())
}

fn resolve_model(cli: &Cli) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.model {
        return Ok(path.clone());
    }
    log::info!("Resolving model: {BLAZEFACE_MODEL_NAME}");
    let path = model_resolver::resolve(
        BLAZEFACE_MODEL_NAME,
        Some(cli.model_url.as_str()),
        None,
        Some(Box::new(download_progress)),
    )?;
    Ok(path)
}

fn asset_sources(cli: &Cli) -> Vec<(FilterId, PathBuf)> {
    let mut sources = Vec::new();
    if let Some(path) = &cli.sunglasses_image {
        sources.push((FilterId::Sunglasses, path.clone()));
    }
    if let Some(path) = &cli.mustache_image {
        sources.push((FilterId::Mustache, path.clone()));
    }
    sources
}

fn open_source(cli: &Cli) -> Box<dyn VideoSource> {
    let path = Path::new(&cli.input);
    if is_image(path) {
        Box::new(
            StillImageSource::new(path)
                .with_fps(cli.fps)
                .with_max_frames(cli.max_frames),
        )
    } else {
        Box::new(FfmpegVideoSource::new(&cli.input).with_max_frames(cli.max_frames))
    }
}

fn build_surface(
    output_dir: Option<&Path>,
) -> Result<Box<dyn DrawingSurface>, Box<dyn std::error::Error>> {
    let sink: Box<dyn FrameSink> = match output_dir {
        Some(dir) => Box::new(PngSequenceSink::new(dir)?),
        None => Box::new(NullFrameSink),
    };
    Ok(Box::new(RasterSurface::new(sink)))
}

/// Forwards stdin commands to the compositor until stdin closes.
fn spawn_command_reader() -> Receiver<ControlEvent> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || read_commands(std::io::stdin().lock(), &tx));
    rx
}

fn read_commands(input: impl BufRead, tx: &Sender<ControlEvent>) {
    for line in input.lines() {
        let Ok(line) = line else {
            break;
        };
        match parse_command(&line) {
            Ok(Some(event)) => {
                if tx.send(event).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("{e}"),
        }
    }
}

fn parse_command(line: &str) -> Result<Option<ControlEvent>, String> {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (None, _) => Ok(None),
        (Some("stop" | "quit"), None) => Ok(Some(ControlEvent::Stop)),
        (Some("toggle"), Some(name)) => name
            .parse::<FilterId>()
            .map(|id| Some(ControlEvent::Toggle(id)))
            .map_err(|e| e.to_string()),
        _ => Err(format!(
            "Unknown command '{}'; expected 'toggle <filter>' or 'stop'",
            line.trim()
        )),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let input = Path::new(&cli.input);
    if !cli.input.contains("://") && !input.exists() {
        return Err(format!("Input not found: {}", input.display()).into());
    }
    if !(cli.fps > 0.0 && cli.fps.is_finite()) {
        return Err(format!("FPS must be a positive number, got {}", cli.fps).into());
    }
    if cli.detect_every == 0 {
        return Err("--detect-every must be at least 1".into());
    }
    if cli.detection_timeout_ms == 0 {
        return Err("--detection-timeout-ms must be at least 1".into());
    }
    if cli.pixel_size == 0 {
        return Err("--pixel-size must be at least 1".into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    for path in [&cli.sunglasses_image, &cli.mustache_image, &cli.model]
        .into_iter()
        .flatten()
    {
        if !path.exists() {
            return Err(format!("File not found: {}", path.display()).into());
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toggle_and_stop() {
        assert_eq!(
            parse_command("toggle clown_nose"),
            Ok(Some(ControlEvent::Toggle(FilterId::ClownNose)))
        );
        assert_eq!(parse_command("  stop "), Ok(Some(ControlEvent::Stop)));
        assert_eq!(parse_command(""), Ok(None));
    }

    #[test]
    fn test_parse_rejects_unknown_input() {
        assert!(parse_command("toggle monocle").is_err());
        assert!(parse_command("dance").is_err());
        assert!(parse_command("stop now").is_err());
    }

    #[test]
    fn test_read_commands_forwards_until_eof() {
        let (tx, rx) = crossbeam_channel::unbounded();
        read_commands(&b"toggle rainbow\nnonsense\nstop\n"[..], &tx);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![ControlEvent::Toggle(FilterId::Rainbow), ControlEvent::Stop]
        );
    }

    #[test]
    fn test_filters_flag_parses_comma_list() {
        let cli = Cli::try_parse_from([
            "facefilter",
            "in.mp4",
            "--filters",
            "sunglasses,pixelate",
        ])
        .unwrap();
        assert_eq!(cli.filters, vec![FilterId::Sunglasses, FilterId::Pixelate]);
        assert_eq!(cli.pixel_size, 10);
        assert_eq!(cli.failure_threshold, 5);
    }

    #[test]
    fn test_model_downloads_from_release_by_default() {
        let cli = Cli::try_parse_from(["facefilter", "in.mp4"]).unwrap();
        assert_eq!(cli.model_url, BLAZEFACE_MODEL_URL);
        assert!(cli.model_url.ends_with(BLAZEFACE_MODEL_NAME));
        assert!(cli.model.is_none());
    }

    #[test]
    fn test_model_url_can_be_overridden() {
        let cli = Cli::try_parse_from([
            "facefilter",
            "in.mp4",
            "--model-url",
            "https://mirror.example/blazeface.onnx",
        ])
        .unwrap();
        assert_eq!(cli.model_url, "https://mirror.example/blazeface.onnx");
    }

    #[test]
    fn test_detection_timeout_flag() {
        let cli = Cli::try_parse_from(["facefilter", "in.mp4"]).unwrap();
        assert_eq!(cli.detection_timeout_ms, 2000);

        let cli =
            Cli::try_parse_from(["facefilter", "in.mp4", "--detection-timeout-ms", "250"]).unwrap();
        assert_eq!(cli.detection_timeout_ms, 250);
    }
}
