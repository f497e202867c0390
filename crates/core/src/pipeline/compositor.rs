use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam_channel::{select, Receiver};

use crate::detection::domain::detection_executor::{DetectionEvent, DetectionExecutor};
use crate::detection::domain::detection_scheduler::{
    CompletionOutcome, DetectionDegraded, DetectionScheduler, SubmitOutcome,
};
use crate::detection::domain::face_geometry_source::ModelLoadError;
use crate::detection::domain::geometry_cache::GeometryCache;
use crate::filters::domain::drawing_surface::{DrawingSurface, RenderError};
use crate::filters::domain::filter_assets::FilterAssets;
use crate::filters::domain::filter_drawing::{
    draw_detection_overlay, validate_geometry, DrawContext,
};
use crate::filters::domain::filter_id::FilterId;
use crate::filters::domain::filter_registry::FilterRegistry;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_source::{MediaAccessError, VideoSource};

use super::frame_clock::FrameClock;
use super::pipeline_config::PipelineConfig;
use super::pipeline_error::PipelineError;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::pipeline_state::{ModelStatus, PipelineState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorState {
    Idle,
    Running,
    /// Terminal.
    Stopped,
}

impl CompositorState {
    fn name(self) -> &'static str {
        match self {
            CompositorState::Idle => "idle",
            CompositorState::Running => "running",
            CompositorState::Stopped => "stopped",
        }
    }
}

/// User input consumed by [`Compositor::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Toggle(FilterId),
    Stop,
}

/// What one call to [`Compositor::tick`] did.
#[derive(Debug)]
pub enum TickOutcome {
    /// Not running; nothing happened.
    Inactive,
    /// Models still loading (or failed earlier); tick was a no-op.
    NotReady,
    /// Model initialization failed during this tick's event drain.
    ModelLoadFailed(ModelLoadError),
    /// The video source has no more frames.
    EndOfStream,
    /// The frame could not be read; tick skipped.
    FrameUnavailable(MediaAccessError),
    /// Filters drawn over `faces` cached faces and presented.
    Rendered { faces: usize },
    /// No cached geometry; the raw frame was presented.
    Bare,
    /// Rendering failed; nothing was presented this tick.
    Skipped(RenderError),
}

pub type DegradedCallback = Box<dyn Fn(DetectionDegraded) + Send>;

/// Per-frame driver: frame → detection scheduling → filter drawing → present.
///
/// Lifecycle is `Idle → Running → Stopped`. The compositor owns every
/// collaborator and all pipeline state, so teardown (cancel pending
/// detection, release the source, stop the worker) runs from `stop`, from
/// every exit path of `run`, and on drop.
pub struct Compositor {
    source: Box<dyn VideoSource>,
    executor: Box<dyn DetectionExecutor>,
    surface: Box<dyn DrawingSurface>,
    config: PipelineConfig,
    model_path: PathBuf,
    assets: FilterAssets,
    logger: Box<dyn PipelineLogger>,
    on_degraded: Option<DegradedCallback>,
    lifecycle: CompositorState,
    state: PipelineState,
    frames_rendered: usize,
}

impl Compositor {
    pub fn new(
        source: Box<dyn VideoSource>,
        executor: Box<dyn DetectionExecutor>,
        surface: Box<dyn DrawingSurface>,
        registry: FilterRegistry,
        config: PipelineConfig,
        model_path: &Path,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let scheduler = DetectionScheduler::new(
            config.detection_interval,
            config.failure_threshold,
            config.detection_timeout,
            config.detect_options,
        );
        Ok(Self {
            source,
            executor,
            surface,
            config,
            model_path: model_path.to_path_buf(),
            assets: FilterAssets::new(),
            logger: Box::new(NullPipelineLogger),
            on_degraded: None,
            lifecycle: CompositorState::Idle,
            state: PipelineState::new(scheduler, registry),
            frames_rendered: 0,
        })
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_assets(mut self, assets: FilterAssets) -> Self {
        self.assets = assets;
        self
    }

    /// Called once each time detection degrades past the failure threshold.
    pub fn with_degraded_callback(mut self, callback: DegradedCallback) -> Self {
        self.on_degraded = Some(callback);
        self
    }

    pub fn state(&self) -> CompositorState {
        self.lifecycle
    }

    pub fn model_status(&self) -> ModelStatus {
        self.state.models
    }

    pub fn geometry_cache(&self) -> &GeometryCache {
        &self.state.cache
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.state.registry
    }

    pub fn frames_rendered(&self) -> usize {
        self.frames_rendered
    }

    /// Flips a filter and returns its new state.
    pub fn toggle(&mut self, id: FilterId) -> bool {
        let enabled = self.state.registry.toggle(id);
        self.logger.info(&format!(
            "{id} {}",
            if enabled { "on" } else { "off" }
        ));
        enabled
    }

    /// Starts the video source, kicks off model loading and subscribes to
    /// `clock`.
    ///
    /// On a media error the compositor stays `Idle` and may be started again.
    pub fn start(&mut self, clock: &mut dyn FrameClock) -> Result<VideoMetadata, PipelineError> {
        if self.lifecycle != CompositorState::Idle {
            return Err(PipelineError::InvalidState {
                action: "start",
                state: self.lifecycle.name(),
            });
        }
        let metadata = self.source.start()?;
        if let Err(e) = self.executor.load_models(&self.model_path) {
            self.source.stop();
            return Err(e.into());
        }
        self.state.models = ModelStatus::Loading;
        self.state.subscription = Some(clock.subscribe());
        self.lifecycle = CompositorState::Running;
        self.logger.info(&format!(
            "Compositing {} ({}x{})",
            metadata.source, metadata.width, metadata.height
        ));
        Ok(metadata)
    }

    /// Requests model initialization again after a failed load.
    pub fn retry_model_load(&mut self) -> Result<(), PipelineError> {
        if self.lifecycle != CompositorState::Running {
            return Err(PipelineError::InvalidState {
                action: "reload models",
                state: self.lifecycle.name(),
            });
        }
        if self.state.models != ModelStatus::Failed {
            return Ok(());
        }
        self.executor.load_models(&self.model_path)?;
        self.state.models = ModelStatus::Loading;
        Ok(())
    }

    /// Tears the pipeline down. Idempotent; valid from any state.
    ///
    /// A detection still running is abandoned, not awaited: its completion
    /// carries a stale epoch and is never merged.
    pub fn stop(&mut self) {
        if self.lifecycle == CompositorState::Stopped {
            return;
        }
        let was_running = self.lifecycle == CompositorState::Running;
        self.lifecycle = CompositorState::Stopped;
        self.state.teardown();
        self.source.stop();
        self.executor.shutdown();
        if was_running {
            self.logger.metric(
                "dropped_frames",
                self.state.scheduler.dropped_frames() as f64,
            );
            self.logger.summary();
        }
    }

    /// One display tick. Never blocks on detection.
    pub fn tick(&mut self) -> TickOutcome {
        if self.lifecycle != CompositorState::Running {
            return TickOutcome::Inactive;
        }

        let load_failure = self.drain_detection_events();
        if self.state.models != ModelStatus::Ready {
            return match load_failure {
                Some(e) => TickOutcome::ModelLoadFailed(e),
                None => TickOutcome::NotReady,
            };
        }

        let frame = match self.source.current_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return TickOutcome::EndOfStream,
            Err(e) => {
                log::warn!("Skipping tick: {e}");
                return TickOutcome::FrameUnavailable(e);
            }
        };

        let submitted = self.state.scheduler.on_frame_available(
            &frame,
            self.executor.as_mut(),
            &mut self.state.cache,
        );
        match submitted {
            SubmitOutcome::Rejected { error, degraded } => {
                log::debug!("Detection request rejected: {error}");
                self.report_degraded(degraded);
            }
            SubmitOutcome::TimedOut { degraded, .. } => self.report_degraded(degraded),
            SubmitOutcome::Submitted | SubmitOutcome::Busy | SubmitOutcome::Throttled => {}
        }

        let start = Instant::now();
        let rendered = self.render(&frame);
        self.logger
            .timing("render", start.elapsed().as_secs_f64() * 1000.0);

        match rendered {
            Ok(faces) => {
                self.frames_rendered += 1;
                self.logger.progress(self.frames_rendered);
                match faces {
                    Some(faces) => TickOutcome::Rendered { faces },
                    None => TickOutcome::Bare,
                }
            }
            Err(e) => {
                log::warn!("Skipping frame {}: {e}", frame.index());
                TickOutcome::Skipped(e)
            }
        }
    }

    /// Drives `tick` from the subscribed clock until the source ends, a
    /// `Stop` control arrives or `cancelled` is set. Always leaves the
    /// compositor `Stopped`.
    ///
    /// A closed control channel is ignored. A model load failure ends the run
    /// with an error.
    pub fn run(
        &mut self,
        controls: &Receiver<ControlEvent>,
        cancelled: &AtomicBool,
    ) -> Result<(), PipelineError> {
        let result = self.run_loop(controls, cancelled);
        self.stop();
        result
    }

    fn run_loop(
        &mut self,
        controls: &Receiver<ControlEvent>,
        cancelled: &AtomicBool,
    ) -> Result<(), PipelineError> {
        let ticks = match (&self.lifecycle, &self.state.subscription) {
            (CompositorState::Running, Some(subscription)) => subscription.ticks().clone(),
            _ => {
                return Err(PipelineError::InvalidState {
                    action: "run",
                    state: self.lifecycle.name(),
                })
            }
        };

        let idle = crossbeam_channel::never();
        let mut controls_open = true;
        while !cancelled.load(Ordering::Relaxed) {
            let commands = if controls_open { controls } else { &idle };
            select! {
                recv(ticks) -> tick => {
                    if tick.is_err() {
                        break;
                    }
                    match self.tick() {
                        TickOutcome::EndOfStream => {
                            self.logger.info("End of stream");
                            break;
                        }
                        TickOutcome::ModelLoadFailed(e) => return Err(e.into()),
                        _ => {}
                    }
                }
                recv(commands) -> control => match control {
                    Ok(ControlEvent::Toggle(id)) => {
                        self.toggle(id);
                    }
                    Ok(ControlEvent::Stop) => break,
                    Err(_) => controls_open = false,
                }
            }
        }
        Ok(())
    }

    /// Applies everything the detector produced since the last tick.
    /// Returns the model load error, if one arrived.
    fn drain_detection_events(&mut self) -> Option<ModelLoadError> {
        let mut load_failure = None;
        while let Some(event) = self.executor.poll() {
            match event {
                DetectionEvent::ModelsLoaded(Ok(())) => {
                    self.state.models = ModelStatus::Ready;
                    self.logger.info("Face detection models ready");
                }
                DetectionEvent::ModelsLoaded(Err(e)) => {
                    log::error!("Failed to load face detection models: {e}");
                    self.state.models = ModelStatus::Failed;
                    load_failure = Some(e);
                }
                DetectionEvent::Completed(completion) => {
                    let elapsed_ms = completion.elapsed.as_secs_f64() * 1000.0;
                    let outcome = self
                        .state
                        .scheduler
                        .on_completion(completion, &mut self.state.cache);
                    match outcome {
                        CompletionOutcome::Accepted { faces } => {
                            self.logger.timing("detect", elapsed_ms);
                            self.logger.metric("faces", faces as f64);
                        }
                        CompletionOutcome::Failed { degraded, .. } => {
                            self.report_degraded(degraded);
                        }
                        CompletionOutcome::OutOfOrder | CompletionOutcome::Stale => {}
                    }
                }
            }
        }
        load_failure
    }

    fn report_degraded(&mut self, degraded: Option<DetectionDegraded>) {
        let Some(degraded) = degraded else {
            return;
        };
        log::warn!(
            "Face detection degraded after {} consecutive failures; overlay hidden",
            degraded.consecutive_failures
        );
        if let Some(callback) = &self.on_degraded {
            callback(degraded);
        }
    }

    /// Clears to `frame`, draws every active filter on every cached face and
    /// presents. Returns the number of faces drawn, or `None` when there was
    /// no geometry to draw.
    fn render(&mut self, frame: &Frame) -> Result<Option<usize>, RenderError> {
        self.surface.clear(frame)?;
        let Some(result) = self.state.cache.get() else {
            self.surface.present()?;
            return Ok(None);
        };
        for face in &result.geometries {
            validate_geometry(face)?;
        }

        let active = self.state.registry.active_filters();
        let mut ctx = DrawContext {
            surface: self.surface.as_mut(),
            frame,
            pixel_size: self.config.pixel_size,
            assets: &self.assets,
        };
        for face in &result.geometries {
            for spec in &active {
                (spec.draw)(&mut ctx, face)?;
            }
            if self.config.show_detections {
                draw_detection_overlay(&mut ctx, face)?;
            }
        }
        self.surface.present()?;
        Ok(Some(result.face_count()))
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        self.stop();
    }
}
