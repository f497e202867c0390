use std::collections::BTreeMap;
use std::time::Instant;

/// Cross-cutting logger for compositor events.
///
/// Keeps the render loop independent of where its diagnostics go (stdout,
/// a host application, nowhere).
pub trait PipelineLogger: Send {
    /// Report the number of frames rendered so far. Live sources have no
    /// known total.
    fn progress(&mut self, frames_rendered: usize);

    /// Record how long a named stage (`detect`, `render`) took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per frame, dropped frames).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-pipeline summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _frames_rendered: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Count, sum and maximum of a stream of samples.
///
/// Constant size, so a live source can run indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
}

impl RunningStats {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 {
            value
        } else {
            self.max.max(value)
        };
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Logger for the CLI: folds timings and metrics into running stats and
/// prints a report when the compositor stops.
///
/// Progress is logged every `every_frames` frames.
pub struct StdoutPipelineLogger {
    every_frames: usize,
    stages: BTreeMap<String, RunningStats>,
    metrics: BTreeMap<String, RunningStats>,
    started: Instant,
    frames_rendered: usize,
}

impl StdoutPipelineLogger {
    pub fn new(every_frames: usize) -> Self {
        Self {
            every_frames: every_frames.max(1),
            stages: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            frames_rendered: 0,
        }
    }

    pub fn stage_stats(&self, stage: &str) -> Option<RunningStats> {
        self.stages.get(stage).copied()
    }

    pub fn metric_stats(&self, name: &str) -> Option<RunningStats> {
        self.metrics.get(name).copied()
    }

    /// Formats the end-of-run report, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.stages.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let wall_s = self.started.elapsed().as_secs_f64();
        let frames = self.frames_rendered;
        let mut out = format!("Compositor summary ({frames} frames in {wall_s:.1}s)");

        for (stage, stats) in &self.stages {
            let share = if wall_s > 0.0 {
                stats.sum / (wall_s * 10.0)
            } else {
                0.0
            };
            out.push_str(&format!(
                "\n  {stage:<10} mean {:6.1}ms  worst {:6.1}ms  {share:4.1}% of wall time",
                stats.mean(),
                stats.max
            ));
        }
        for (name, stats) in &self.metrics {
            out.push_str(&format!(
                "\n  {name:<10} mean {:.1}  peak {:.0}",
                stats.mean(),
                stats.max
            ));
        }
        if frames > 0 && wall_s > 0.0 {
            out.push_str(&format!("\n  achieved {:.1} fps", frames as f64 / wall_s));
        }
        Some(out)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, frames_rendered: usize) {
        self.frames_rendered = frames_rendered;
        if frames_rendered > 0 && frames_rendered % self.every_frames == 0 {
            log::info!("Rendered {frames_rendered} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        if let Some(stats) = self.stages.get_mut(stage) {
            stats.record(duration_ms);
        } else {
            let mut stats = RunningStats::default();
            stats.record(duration_ms);
            self.stages.insert(stage.to_owned(), stats);
        }
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_owned()).or_default().record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        match self.summary_string() {
            Some(report) => log::info!("\n\n{report}"),
            None => log::info!("Compositor stopped before rendering anything"),
        }
    }
}
