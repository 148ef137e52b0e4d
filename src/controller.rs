use crate::{
    error::{DreamerError, Result},
    logger,
    models::{GenerationRequest, GenerationSettings, ListenerEvent, Trigger},
    sdapi::ImageBackend,
    storage::{decode_base64_image, ImageStore},
};
use image::DynamicImage;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};
use tokio::sync::oneshot;

/// What the status label shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Waiting,
    Received(String),
    Generating,
    Displayed(PathBuf),
    Saved(PathBuf),
    Failed(String),
    ListenerLost(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Waiting => write!(f, "Waiting for messages..."),
            Status::Received(message) => write!(f, "Received message: {}", message),
            Status::Generating => write!(f, "Generating image..."),
            Status::Displayed(path) => write!(f, "Showing {}", path.display()),
            Status::Saved(path) => write!(f, "Saved {}", path.display()),
            Status::Failed(reason) => write!(f, "Error: {}", reason),
            Status::ListenerLost(reason) => write!(f, "Listener stopped: {}", reason),
        }
    }
}

/// Result of one poll step.
#[derive(Debug)]
pub enum TickOutcome {
    /// Queue was empty.
    Idle,
    /// A generation is still running; the queue was not touched.
    Busy,
    GenerationStarted,
    GenerationFinished(PathBuf),
    GenerationFailed(DreamerError),
    Saved(PathBuf),
    SaveFailed(DreamerError),
    StatusUpdated,
    ListenerLost,
}

/// Pixels ready to be uploaded as a texture.
#[derive(Debug, Clone)]
pub struct DisplayImage {
    pub path: PathBuf,
    pub size: [usize; 2],
    pub rgba: Arc<Vec<u8>>,
}

impl DisplayImage {
    fn new(image: &DynamicImage, path: &Path) -> Self {
        let rgba = image.to_rgba8();
        Self {
            path: path.to_path_buf(),
            size: [rgba.width() as usize, rgba.height() as usize],
            rgba: Arc::new(rgba.into_raw()),
        }
    }
}

struct GeneratedImage {
    image: DynamicImage,
    path: PathBuf,
}

/// Per-window state: the queue, prompt fields, current image and status.
///
/// Only one generation runs at a time. While it is in flight, `tick` leaves
/// the queue alone, so triggers are handled strictly in arrival order and a
/// save always sees the newest image.
pub struct Controller {
    inbox: UnboundedReceiver<ListenerEvent>,
    backend: Arc<dyn ImageBackend>,
    runtime: Handle,
    store: ImageStore,
    settings: GenerationSettings,
    pub prompt: String,
    pub negative_prompt: String,
    current: Option<DynamicImage>,
    pending_display: Option<DisplayImage>,
    status: Status,
    in_flight: Option<oneshot::Receiver<Result<GeneratedImage>>>,
}

impl Controller {
    pub fn new(
        inbox: UnboundedReceiver<ListenerEvent>,
        backend: Arc<dyn ImageBackend>,
        runtime: Handle,
        store: ImageStore,
    ) -> Self {
        Self {
            inbox,
            backend,
            runtime,
            store,
            settings: GenerationSettings::default(),
            prompt: String::new(),
            negative_prompt: String::new(),
            current: None,
            pending_display: None,
            status: Status::Waiting,
            in_flight: None,
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn current_image(&self) -> Option<&DynamicImage> {
        self.current.as_ref()
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Hands out a newly generated image once.
    pub fn take_display(&mut self) -> Option<DisplayImage> {
        self.pending_display.take()
    }

    /// Handles at most one queued message, or collects a finished generation.
    pub fn tick(&mut self) -> TickOutcome {
        if let Some(outcome) = self.poll_generation() {
            return outcome;
        }

        match self.inbox.try_recv() {
            Ok(event) => self.handle_event(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => TickOutcome::Idle,
        }
    }

    fn handle_event(&mut self, event: ListenerEvent) -> TickOutcome {
        match event {
            ListenerEvent::Message(bytes) => match Trigger::from(bytes) {
                Trigger::ShowImage => self.start_generation(),
                Trigger::SaveImage => self.save_current(),
                other => {
                    log::info!("📨 Unrecognized message: {}", other);
                    self.status = Status::Received(other.to_string());
                    TickOutcome::StatusUpdated
                }
            },
            ListenerEvent::Disconnected(reason) => {
                self.status = Status::ListenerLost(reason);
                TickOutcome::ListenerLost
            }
        }
    }

    fn start_generation(&mut self) -> TickOutcome {
        let request = GenerationRequest::new(self.prompt.clone(), self.negative_prompt.clone())
            .with_settings(self.settings);
        let backend = Arc::clone(&self.backend);
        let store = self.store.clone();
        let (tx, rx) = oneshot::channel();

        self.runtime.spawn(async move {
            let result = generate(backend.as_ref(), store, request).await;
            let _ = tx.send(result);
        });

        self.in_flight = Some(rx);
        self.status = Status::Generating;
        TickOutcome::GenerationStarted
    }

    fn poll_generation(&mut self) -> Option<TickOutcome> {
        let result = match self.in_flight.as_mut()?.try_recv() {
            Err(oneshot::error::TryRecvError::Empty) => return Some(TickOutcome::Busy),
            Err(oneshot::error::TryRecvError::Closed) => Err(DreamerError::Cancelled),
            Ok(result) => result,
        };
        self.in_flight = None;

        Some(match result {
            Ok(generated) => {
                self.pending_display = Some(DisplayImage::new(&generated.image, &generated.path));
                self.current = Some(generated.image);
                self.status = Status::Displayed(generated.path.clone());
                TickOutcome::GenerationFinished(generated.path)
            }
            Err(err) => {
                log::error!("❌ Image generation failed: {}", err);
                self.status = Status::Failed(err.to_string());
                TickOutcome::GenerationFailed(err)
            }
        })
    }

    fn save_current(&mut self) -> TickOutcome {
        let saved = match &self.current {
            Some(image) => self.store.save(image),
            None => Err(DreamerError::NoImage),
        };

        match saved {
            Ok(path) => {
                self.status = Status::Saved(path.clone());
                TickOutcome::Saved(path)
            }
            Err(err) => {
                log::error!("❌ Save failed: {}", err);
                self.status = Status::Failed(err.to_string());
                TickOutcome::SaveFailed(err)
            }
        }
    }
}

async fn generate(
    backend: &dyn ImageBackend,
    store: ImageStore,
    request: GenerationRequest,
) -> Result<GeneratedImage> {
    let mut timer = logger::timer("txt2img");
    let response = backend.txt2img(&request).await?;
    let encoded = response
        .into_first_image()
        .ok_or(DreamerError::EmptyResponse)?;

    let generated = tokio::task::spawn_blocking(move || -> Result<GeneratedImage> {
        let image = decode_base64_image(&encoded)?;
        let path = store.save(&image)?;
        Ok(GeneratedImage { image, path })
    })
    .await
    .map_err(|_| DreamerError::Cancelled)??;

    timer.stop();
    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerationResponse;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use image::{ImageFormat, RgbaImage};
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;
    use tokio::runtime::Runtime;
    use tokio::sync::mpsc::{self, UnboundedSender};
    use tokio::sync::Semaphore;

    #[derive(Default)]
    struct MockBackend {
        calls: Mutex<Vec<GenerationRequest>>,
        responses: Mutex<VecDeque<Result<GenerationResponse>>>,
        gate: Option<Arc<Semaphore>>,
    }

    impl MockBackend {
        fn respond(&self, response: Result<GenerationResponse>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn calls(&self) -> Vec<GenerationRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageBackend for MockBackend {
        async fn txt2img(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
            self.calls.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or(Err(DreamerError::Request("no scripted response".into())))
        }
    }

    fn png_b64(width: u32, height: u32) -> String {
        let image = RgbaImage::from_pixel(width, height, image::Rgba([9, 99, 199, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        STANDARD.encode(bytes)
    }

    fn images(list: Vec<String>) -> GenerationResponse {
        GenerationResponse {
            images: list,
            parameters: serde_json::Value::Null,
            info: serde_json::Value::Null,
        }
    }

    struct Harness {
        _runtime: Runtime,
        dir: TempDir,
        backend: Arc<MockBackend>,
        sender: UnboundedSender<ListenerEvent>,
        controller: Controller,
    }

    impl Harness {
        fn new(backend: MockBackend) -> Self {
            let runtime = Runtime::new().unwrap();
            let dir = tempfile::tempdir().unwrap();
            let backend = Arc::new(backend);
            let (sender, inbox) = mpsc::unbounded_channel();
            let controller = Controller::new(
                inbox,
                backend.clone(),
                runtime.handle().clone(),
                ImageStore::in_dir(dir.path()).unwrap(),
            );
            Self {
                _runtime: runtime,
                dir,
                backend,
                sender,
                controller,
            }
        }

        fn push(&self, bytes: &[u8]) {
            self.sender
                .send(ListenerEvent::Message(bytes.to_vec()))
                .unwrap();
        }

        /// Ticks until the running generation resolves.
        fn finish(&mut self) -> TickOutcome {
            let deadline = Instant::now() + Duration::from_secs(5);
            loop {
                match self.controller.tick() {
                    TickOutcome::Busy => {
                        assert!(Instant::now() < deadline, "generation never finished");
                        std::thread::sleep(Duration::from_millis(10));
                    }
                    outcome => return outcome,
                }
            }
        }

        fn files(&self) -> usize {
            std::fs::read_dir(self.dir.path()).unwrap().count()
        }
    }

    #[test]
    fn empty_queue_tick_changes_nothing() {
        let mut h = Harness::new(MockBackend::default());

        assert!(matches!(h.controller.tick(), TickOutcome::Idle));
        assert_eq!(h.controller.status(), &Status::Waiting);
        assert!(h.controller.current_image().is_none());
        assert!(h.backend.calls().is_empty());
        assert_eq!(h.files(), 0);
    }

    #[test]
    fn show_image_generates_saves_and_displays() {
        let backend = MockBackend::default();
        backend.respond(Ok(images(vec![format!("{},", png_b64(4, 6))])));
        let mut h = Harness::new(backend);

        h.push(b"ShowImage");
        // Prompts are read when the message is dequeued, not when it arrives.
        h.controller.prompt = "a red fox".to_string();
        h.controller.negative_prompt = "blurry".to_string();

        assert!(matches!(h.controller.tick(), TickOutcome::GenerationStarted));
        assert!(h.controller.is_generating());
        assert_eq!(h.controller.status(), &Status::Generating);

        let path = match h.finish() {
            TickOutcome::GenerationFinished(path) => path,
            other => panic!("unexpected outcome: {:?}", other),
        };

        let calls = h.backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], GenerationRequest::new("a red fox", "blurry"));

        assert!(path.starts_with(h.dir.path()));
        assert_eq!(image::open(&path).unwrap().width(), 4);
        assert_eq!(h.controller.status(), &Status::Displayed(path.clone()));

        let display = h.controller.take_display().unwrap();
        assert_eq!(display.size, [4, 6]);
        assert_eq!(display.rgba.len(), 4 * 6 * 4);
        assert_eq!(display.path, path);
        assert!(h.controller.take_display().is_none());
        assert!(!h.controller.is_generating());
    }

    #[test]
    fn save_before_any_generation_fails() {
        let mut h = Harness::new(MockBackend::default());
        h.push(b"SaveImage");

        assert!(matches!(
            h.controller.tick(),
            TickOutcome::SaveFailed(DreamerError::NoImage)
        ));
        assert!(matches!(h.controller.status(), Status::Failed(_)));
        assert_eq!(h.files(), 0);
        assert!(h.backend.calls().is_empty());
    }

    #[test]
    fn save_queued_behind_show_persists_the_new_image() {
        let backend = MockBackend::default();
        backend.respond(Ok(images(vec![png_b64(2, 2)])));
        backend.respond(Ok(images(vec![png_b64(3, 5)])));
        let mut h = Harness::new(backend);

        h.push(b"ShowImage");
        h.push(b"SaveImage");
        assert!(matches!(h.controller.tick(), TickOutcome::GenerationStarted));
        assert!(matches!(h.finish(), TickOutcome::GenerationFinished(_)));
        let first_save = match h.controller.tick() {
            TickOutcome::Saved(path) => path,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(image::open(&first_save).unwrap().height(), 2);

        h.push(b"ShowImage");
        h.push(b"SaveImage");
        assert!(matches!(h.controller.tick(), TickOutcome::GenerationStarted));
        assert!(matches!(h.finish(), TickOutcome::GenerationFinished(_)));
        let second_save = match h.controller.tick() {
            TickOutcome::Saved(path) => path,
            other => panic!("unexpected outcome: {:?}", other),
        };

        assert_ne!(first_save, second_save);
        assert_eq!(image::open(&second_save).unwrap().height(), 5);
        // Two generated files plus two saves.
        assert_eq!(h.files(), 4);
        assert_eq!(h.controller.status(), &Status::Saved(second_save));
    }

    #[test]
    fn failed_generation_keeps_previous_image() {
        let backend = MockBackend::default();
        backend.respond(Ok(images(vec![png_b64(2, 3)])));
        backend.respond(Err(DreamerError::Status {
            status: 500,
            body: "boom".into(),
        }));
        let mut h = Harness::new(backend);

        h.push(b"ShowImage");
        h.controller.tick();
        assert!(matches!(h.finish(), TickOutcome::GenerationFinished(_)));
        assert!(h.controller.take_display().is_some());

        h.push(b"ShowImage");
        h.controller.tick();
        match h.finish() {
            TickOutcome::GenerationFailed(DreamerError::Status { status, .. }) => {
                assert_eq!(status, 500)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let current = h.controller.current_image().unwrap();
        assert_eq!((current.width(), current.height()), (2, 3));
        assert!(h.controller.take_display().is_none());
        assert!(h.controller.status().to_string().starts_with("Error: "));
        assert_eq!(h.files(), 1);
    }

    #[test]
    fn malformed_responses_fail_with_typed_errors() {
        let backend = MockBackend::default();
        backend.respond(Ok(images(Vec::new())));
        backend.respond(Ok(images(vec!["@@not-base64@@".to_string()])));
        let mut h = Harness::new(backend);

        h.push(b"ShowImage");
        h.controller.tick();
        assert!(matches!(
            h.finish(),
            TickOutcome::GenerationFailed(DreamerError::EmptyResponse)
        ));

        h.push(b"ShowImage");
        h.controller.tick();
        assert!(matches!(
            h.finish(),
            TickOutcome::GenerationFailed(DreamerError::Decode(_))
        ));

        assert!(h.controller.current_image().is_none());
        assert_eq!(h.files(), 0);
    }

    #[test]
    fn other_messages_only_update_status() {
        let mut h = Harness::new(MockBackend::default());
        h.push(b"hello\x01");

        assert!(matches!(h.controller.tick(), TickOutcome::StatusUpdated));
        assert_eq!(h.controller.status().to_string(), "Received message: hello\\x01");
        assert!(h.backend.calls().is_empty());
        assert!(!h.controller.is_generating());
    }

    #[test]
    fn queue_is_left_alone_while_generating() {
        let gate = Arc::new(Semaphore::new(0));
        let backend = MockBackend {
            gate: Some(gate.clone()),
            ..Default::default()
        };
        backend.respond(Ok(images(vec![png_b64(1, 1)])));
        backend.respond(Ok(images(vec![png_b64(1, 1)])));
        let mut h = Harness::new(backend);

        h.push(b"ShowImage");
        h.push(b"ShowImage");
        assert!(matches!(h.controller.tick(), TickOutcome::GenerationStarted));
        for _ in 0..3 {
            assert!(matches!(h.controller.tick(), TickOutcome::Busy));
        }

        // The second trigger has not been dequeued, so no overlapping request.
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(h.backend.calls().len(), 1);

        gate.add_permits(1);
        assert!(matches!(h.finish(), TickOutcome::GenerationFinished(_)));
        assert!(matches!(h.controller.tick(), TickOutcome::GenerationStarted));

        gate.add_permits(1);
        assert!(matches!(h.finish(), TickOutcome::GenerationFinished(_)));
        assert_eq!(h.backend.calls().len(), 2);
        assert!(matches!(h.controller.tick(), TickOutcome::Idle));
    }

    #[test]
    fn lost_listener_is_shown() {
        let mut h = Harness::new(MockBackend::default());
        h.sender
            .send(ListenerEvent::Disconnected("connection reset".into()))
            .unwrap();

        assert!(matches!(h.controller.tick(), TickOutcome::ListenerLost));
        assert_eq!(
            h.controller.status().to_string(),
            "Listener stopped: connection reset"
        );
    }
}
