use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use crate::detection::domain::detection_executor::{
    DetectionCompletion, DetectionEvent, DetectionExecutor, DetectionRequest,
};
use crate::detection::domain::face_geometry_source::{
    DetectionError, FaceGeometrySource, ModelLoadError,
};

/// Room for one model load plus one detection request.
const COMMAND_CAPACITY: usize = 2;

enum WorkerCommand {
    LoadModels(PathBuf),
    Detect(DetectionRequest),
}

/// Runs a [`FaceGeometrySource`] on a dedicated thread.
///
/// Layout: `render loop → commands → worker [load/detect] → events → render loop`
///
/// Results are only observed when the render loop calls `poll`, so all cache
/// mutation stays on the render thread.
pub struct ThreadedDetectionExecutor {
    commands: Option<Sender<WorkerCommand>>,
    events: Receiver<DetectionEvent>,
    handle: Option<JoinHandle<()>>,
    /// The request handed to the worker and not yet answered.
    pending: Option<DetectionRequest>,
}

impl ThreadedDetectionExecutor {
    pub fn new(source: Box<dyn FaceGeometrySource>) -> Self {
        let (command_tx, command_rx) = crossbeam_channel::bounded(COMMAND_CAPACITY);
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let handle = spawn_worker(source, command_rx, event_tx);
        Self {
            commands: Some(command_tx),
            events: event_rx,
            handle: Some(handle),
            pending: None,
        }
    }
}

fn spawn_worker(
    mut source: Box<dyn FaceGeometrySource>,
    command_rx: Receiver<WorkerCommand>,
    event_tx: Sender<DetectionEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for command in command_rx {
            let event = match command {
                WorkerCommand::LoadModels(path) => {
                    DetectionEvent::ModelsLoaded(source.load_models(&path))
                }
                WorkerCommand::Detect(request) => {
                    let start = Instant::now();
                    let outcome = source.detect(&request.frame, &request.options);
                    DetectionEvent::Completed(DetectionCompletion::for_request(
                        &request,
                        outcome,
                        start.elapsed(),
                    ))
                }
            };
            if event_tx.send(event).is_err() {
                break;
            }
        }
        log::debug!("Detection worker exiting");
    })
}

impl DetectionExecutor for ThreadedDetectionExecutor {
    fn load_models(&mut self, model_path: &Path) -> Result<(), ModelLoadError> {
        let commands = self
            .commands
            .as_ref()
            .ok_or(ModelLoadError::WorkerUnavailable)?;
        commands
            .send(WorkerCommand::LoadModels(model_path.to_path_buf()))
            .map_err(|_| ModelLoadError::WorkerUnavailable)
    }

    fn submit(&mut self, request: DetectionRequest) -> Result<(), DetectionError> {
        let commands = self.commands.as_ref().ok_or(DetectionError::Disconnected)?;
        let pending = request.clone();
        match commands.try_send(WorkerCommand::Detect(request)) {
            Ok(()) => {
                self.pending = Some(pending);
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(DetectionError::Inference(
                "detection worker queue is full".into(),
            )),
            Err(TrySendError::Disconnected(_)) => Err(DetectionError::Disconnected),
        }
    }

    fn poll(&mut self) -> Option<DetectionEvent> {
        match self.events.try_recv() {
            Ok(event) => {
                if matches!(event, DetectionEvent::Completed(_)) {
                    self.pending = None;
                }
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            // A worker that died mid-request still owes the scheduler an
            // answer, otherwise the in-flight slot is never released.
            Err(TryRecvError::Disconnected) => self.pending.take().map(|request| {
                log::warn!("Detection worker stopped while processing a frame");
                DetectionEvent::Completed(DetectionCompletion::for_request(
                    &request,
                    Err(DetectionError::Disconnected),
                    Duration::ZERO,
                ))
            }),
        }
    }

    fn shutdown(&mut self) {
        self.commands = None;
        self.pending = None;
        // Detach: a detection already running finishes on its own and its
        // result is dropped with the channel.
        self.handle = None;
    }
}

impl Drop for ThreadedDetectionExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_geometry_source::DetectOptions;
    use crate::shared::face_geometry::{FaceGeometry, Rect};
    use crate::shared::frame::Frame;

    struct FakeSource {
        delay: Duration,
        fail_load: bool,
        panic_on_detect: bool,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                delay: Duration::ZERO,
                fail_load: false,
                panic_on_detect: false,
            }
        }
    }

    impl FaceGeometrySource for FakeSource {
        fn load_models(&mut self, model_path: &Path) -> Result<(), ModelLoadError> {
            if self.fail_load {
                Err(ModelLoadError::NotFound(model_path.to_path_buf()))
            } else {
                Ok(())
            }
        }

        fn detect(
            &mut self,
            frame: &Frame,
            _options: &DetectOptions,
        ) -> Result<Vec<FaceGeometry>, DetectionError> {
            if self.panic_on_detect {
                panic!("detector crashed");
            }
            std::thread::sleep(self.delay);
            let x = frame.index() as f64;
            Ok(vec![FaceGeometry::new(Rect::new(x, 0.0, 10.0, 10.0))])
        }
    }

    fn request(index: usize, epoch: u64) -> DetectionRequest {
        DetectionRequest {
            frame: Frame::new(vec![0u8; 12], 2, 2, 3, index)
                .with_timestamp(Duration::from_millis(index as u64 * 10)),
            options: DetectOptions::default(),
            epoch,
        }
    }

    fn wait_event(executor: &mut ThreadedDetectionExecutor) -> DetectionEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(event) = executor.poll() {
                return event;
            }
            assert!(Instant::now() < deadline, "timed out waiting for event");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_load_models_reports_ready() {
        let mut executor = ThreadedDetectionExecutor::new(Box::new(FakeSource::new()));
        executor.load_models(Path::new("model.onnx")).unwrap();

        match wait_event(&mut executor) {
            DetectionEvent::ModelsLoaded(result) => assert!(result.is_ok()),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_load_models_reports_failure() {
        let source = FakeSource {
            fail_load: true,
            ..FakeSource::new()
        };
        let mut executor = ThreadedDetectionExecutor::new(Box::new(source));
        executor.load_models(Path::new("missing.onnx")).unwrap();

        match wait_event(&mut executor) {
            DetectionEvent::ModelsLoaded(Err(ModelLoadError::NotFound(path))) => {
                assert_eq!(path, PathBuf::from("missing.onnx"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_completion_carries_request_identity() {
        let mut executor = ThreadedDetectionExecutor::new(Box::new(FakeSource::new()));
        executor.submit(request(7, 3)).unwrap();

        match wait_event(&mut executor) {
            DetectionEvent::Completed(done) => {
                assert_eq!(done.epoch, 3);
                assert_eq!(done.frame_id, 7);
                assert_eq!(done.captured_at, Duration::from_millis(70));
                let faces = done.outcome.unwrap();
                assert_eq!(faces[0].bounding_box.x, 7.0);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_poll_does_not_block_while_detecting() {
        let source = FakeSource {
            delay: Duration::from_millis(200),
            ..FakeSource::new()
        };
        let mut executor = ThreadedDetectionExecutor::new(Box::new(source));
        executor.submit(request(0, 0)).unwrap();

        let start = Instant::now();
        assert!(executor.poll().is_none());
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_submit_after_shutdown_is_disconnected() {
        let mut executor = ThreadedDetectionExecutor::new(Box::new(FakeSource::new()));
        executor.shutdown();

        assert_eq!(
            executor.submit(request(0, 0)),
            Err(DetectionError::Disconnected)
        );
        assert!(matches!(
            executor.load_models(Path::new("m.onnx")),
            Err(ModelLoadError::WorkerUnavailable)
        ));
    }

    #[test]
    fn test_crashed_worker_fails_pending_request() {
        let source = FakeSource {
            panic_on_detect: true,
            ..FakeSource::new()
        };
        let mut executor = ThreadedDetectionExecutor::new(Box::new(source));
        executor.submit(request(4, 1)).unwrap();

        match wait_event(&mut executor) {
            DetectionEvent::Completed(done) => {
                assert_eq!(done.frame_id, 4);
                assert_eq!(done.outcome, Err(DetectionError::Disconnected));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(executor.poll().is_none());
    }
}
