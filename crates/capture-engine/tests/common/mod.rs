//! Scripted capture backend for session tests.

#![allow(dead_code)]

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use videobank_capture_engine::{CaptureSession, InMemoryPreviewRegistry, SessionConfig};
use videobank_common::clock::ManualClock;
use videobank_common::error::{VideobankError, VideobankResult};
use videobank_media_model::{CaptureConstraints, EncodingCandidate};
use videobank_platform_core::{
    CaptureBackend, EncoderSupport, MediaSource, MediaStream, PreviewSurface, RawFrame, Recorder,
    RecorderFactory, RecorderSink,
};

#[derive(Default)]
pub struct FakeBackend {
    pub supported: Vec<String>,
    pub deny_acquire: bool,
    /// The next acquire never resolves.
    pub stall_acquire: AtomicBool,
    pub fail_recorder: bool,
    pub zero_surface: bool,
    pub sinks: Mutex<Vec<RecorderSink>>,
    pub encodings: Mutex<Vec<Option<String>>>,
    pub recorder_stops: Arc<AtomicUsize>,
    pub streams: Mutex<Vec<Arc<AtomicBool>>>,
    pub track_stops: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn supporting(types: &[&str]) -> Self {
        Self {
            supported: types.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Sink of the most recently created recorder.
    pub fn sink(&self) -> RecorderSink {
        self.sinks.lock().unwrap().last().cloned().expect("no recorder created")
    }

    pub fn sink_at(&self, index: usize) -> RecorderSink {
        self.sinks.lock().unwrap()[index].clone()
    }

    pub fn live_streams(&self) -> usize {
        self.streams
            .lock()
            .unwrap()
            .iter()
            .filter(|active| active.load(Ordering::SeqCst))
            .count()
    }

    pub fn last_encoding(&self) -> Option<String> {
        self.encodings.lock().unwrap().last().cloned().flatten()
    }
}

#[async_trait::async_trait]
impl MediaSource for FakeBackend {
    async fn acquire(&self, constraints: &CaptureConstraints) -> VideobankResult<Box<dyn MediaStream>> {
        if self.stall_acquire.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.deny_acquire {
            return Err(VideobankError::platform("NotAllowedError: permission denied"));
        }
        let active = Arc::new(AtomicBool::new(true));
        self.streams.lock().unwrap().push(Arc::clone(&active));
        Ok(Box::new(FakeStream {
            has_audio: constraints.audio,
            active: Arc::clone(&active),
            stops: Arc::clone(&self.track_stops),
            surface: Arc::new(FakeSurface {
                size: if self.zero_surface { (0, 0) } else { (16, 12) },
            }),
        }))
    }
}

impl EncoderSupport for FakeBackend {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|t| t == mime_type)
    }
}

impl RecorderFactory for FakeBackend {
    fn create_recorder(
        &self,
        _stream: &dyn MediaStream,
        encoding: Option<&EncodingCandidate>,
        sink: RecorderSink,
    ) -> VideobankResult<Box<dyn Recorder>> {
        if self.fail_recorder {
            return Err(VideobankError::recorder_init("NotSupportedError"));
        }
        let mime = encoding.map(|e| e.mime_type().to_string());
        self.encodings.lock().unwrap().push(mime.clone());
        self.sinks.lock().unwrap().push(sink);
        Ok(Box::new(FakeRecorder {
            mime,
            stops: Arc::clone(&self.recorder_stops),
        }))
    }
}

impl CaptureBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeStream {
    has_audio: bool,
    active: Arc<AtomicBool>,
    stops: Arc<AtomicUsize>,
    surface: Arc<FakeSurface>,
}

impl MediaStream for FakeStream {
    fn id(&self) -> &str {
        "fake-stream"
    }

    fn has_audio(&self) -> bool {
        self.has_audio
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn stop_tracks(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn preview(&self) -> Arc<dyn PreviewSurface> {
        self.surface.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct FakeSurface {
    size: (u32, u32),
}

impl PreviewSurface for FakeSurface {
    fn native_size(&self) -> (u32, u32) {
        self.size
    }

    fn current_frame(&self) -> Option<RawFrame> {
        let (w, h) = self.size;
        Some(RawFrame::new(w, h, vec![90; (w * h * 3) as usize]))
    }
}

/// Records nothing on its own; tests drive the sink.
struct FakeRecorder {
    mime: Option<String>,
    stops: Arc<AtomicUsize>,
}

impl Recorder for FakeRecorder {
    fn start(&mut self) -> VideobankResult<()> {
        Ok(())
    }

    fn stop(&mut self) -> VideobankResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime.as_deref()
    }
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub clock: Arc<ManualClock>,
    pub previews: Arc<InMemoryPreviewRegistry>,
    pub session: CaptureSession,
}

pub fn harness(backend: FakeBackend) -> Harness {
    let backend = Arc::new(backend);
    let clock = Arc::new(ManualClock::new());
    let previews = Arc::new(InMemoryPreviewRegistry::new());
    let config = SessionConfig {
        tick_interval: Duration::from_secs(1),
        ..SessionConfig::default()
    };
    let session = CaptureSession::new(
        config,
        backend.clone(),
        clock.clone(),
        previews.clone(),
    );
    Harness {
        backend,
        clock,
        previews,
        session,
    }
}
