//! Software camera backend.
//!
//! Produces a moving test pattern as the preview and a steady stream of
//! fake container bytes as recorder output. Used by the CLI when no camera
//! is configured and by tests that need a backend with real timing.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use videobank_common::error::{VideobankError, VideobankResult};
use videobank_media_model::{CaptureConstraints, Container, EncodingCandidate};
use videobank_platform_core::{
    CaptureBackend, EncoderSupport, MediaSource, MediaStream, PreviewSurface, RawFrame, Recorder,
    RecorderFactory, RecorderSink,
};

/// Behaviour of the synthetic camera.
#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    /// Preview resolution.
    pub width: u32,
    pub height: u32,

    /// Refuse every acquisition, as a user denying camera access would.
    pub deny_permission: bool,

    /// MIME types the fake recorder accepts.
    pub supported_types: Vec<String>,

    /// Time between data chunks.
    pub chunk_interval: Duration,

    /// Bytes per data chunk.
    pub chunk_size: usize,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            deny_permission: false,
            supported_types: vec![
                "video/webm;codecs=vp8,opus".to_string(),
                "video/webm".to_string(),
            ],
            chunk_interval: Duration::from_millis(250),
            chunk_size: 4096,
        }
    }
}

/// Test-pattern camera.
#[derive(Debug, Default)]
pub struct SyntheticBackend {
    options: SyntheticOptions,
    next_stream: AtomicU64,
}

impl SyntheticBackend {
    pub fn new(options: SyntheticOptions) -> Self {
        Self {
            options,
            next_stream: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> &SyntheticOptions {
        &self.options
    }
}

#[async_trait::async_trait]
impl MediaSource for SyntheticBackend {
    async fn acquire(
        &self,
        constraints: &CaptureConstraints,
    ) -> VideobankResult<Box<dyn MediaStream>> {
        if self.options.deny_permission {
            return Err(VideobankError::acquisition("Permission denied by user"));
        }
        if self.options.width == 0 || self.options.height == 0 {
            return Err(VideobankError::acquisition("Synthetic camera has no resolution"));
        }

        let n = self.next_stream.fetch_add(1, Ordering::Relaxed) + 1;
        let active = Arc::new(AtomicBool::new(true));
        let surface = Arc::new(TestPattern {
            width: self.options.width,
            height: self.options.height,
            active: Arc::clone(&active),
            frames: AtomicU64::new(0),
        });

        tracing::debug!(stream = n, facing = %constraints.facing, "Synthetic stream opened");
        Ok(Box::new(SyntheticStream {
            id: format!("synthetic-{}-{n}", constraints.facing),
            has_audio: constraints.audio,
            active,
            surface,
        }))
    }
}

impl EncoderSupport for SyntheticBackend {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        let Ok(wanted) = EncodingCandidate::parse(mime_type) else {
            return false;
        };
        self.options
            .supported_types
            .iter()
            .filter_map(|t| EncodingCandidate::parse(t).ok())
            .any(|supported| same_encoding(&supported, &wanted))
    }
}

impl RecorderFactory for SyntheticBackend {
    fn create_recorder(
        &self,
        stream: &dyn MediaStream,
        encoding: Option<&EncodingCandidate>,
        sink: RecorderSink,
    ) -> VideobankResult<Box<dyn Recorder>> {
        let stream = stream
            .as_any()
            .downcast_ref::<SyntheticStream>()
            .ok_or_else(|| {
                VideobankError::recorder_init("Stream was not opened by the synthetic backend")
            })?;

        if !stream.is_active() {
            return Err(VideobankError::recorder_init("Camera stream has been stopped"));
        }
        if let Some(encoding) = encoding {
            if !self.is_type_supported(encoding.mime_type()) {
                return Err(VideobankError::recorder_init(format!(
                    "Unsupported MIME type: {}",
                    encoding.mime_type()
                )));
            }
        }

        Ok(Box::new(SyntheticRecorder {
            mime: encoding.map(|e| e.mime_type().to_string()),
            container: encoding.map(|e| e.container()).unwrap_or(Container::Webm),
            stream_active: Arc::clone(&stream.active),
            sink,
            chunk_interval: self.options.chunk_interval,
            chunk_size: self.options.chunk_size.max(1),
            stop_tx: None,
            started: false,
        }))
    }
}

impl CaptureBackend for SyntheticBackend {
    fn name(&self) -> &str {
        "synthetic"
    }
}

fn same_encoding(a: &EncodingCandidate, b: &EncodingCandidate) -> bool {
    a.container() == b.container()
        && a.codecs().len() == b.codecs().len()
        && a.codecs()
            .iter()
            .zip(b.codecs())
            .all(|(x, y)| x.eq_ignore_ascii_case(y))
}

struct SyntheticStream {
    id: String,
    has_audio: bool,
    active: Arc<AtomicBool>,
    surface: Arc<TestPattern>,
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn has_audio(&self) -> bool {
        self.has_audio
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn stop_tracks(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            tracing::debug!(stream = %self.id, "Synthetic tracks stopped");
        }
    }

    fn preview(&self) -> Arc<dyn PreviewSurface> {
        self.surface.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Diagonal colour bars that scroll one step per captured frame.
struct TestPattern {
    width: u32,
    height: u32,
    active: Arc<AtomicBool>,
    frames: AtomicU64,
}

impl PreviewSurface for TestPattern {
    fn native_size(&self) -> (u32, u32) {
        if self.active.load(Ordering::SeqCst) {
            (self.width, self.height)
        } else {
            (0, 0)
        }
    }

    fn current_frame(&self) -> Option<RawFrame> {
        if !self.active.load(Ordering::SeqCst) {
            return None;
        }
        let shift = self.frames.fetch_add(1, Ordering::Relaxed) as u32;
        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                let band = (x.wrapping_add(y).wrapping_add(shift) / 32) % 6;
                let (r, g, b) = match band {
                    0 => (230, 60, 60),
                    1 => (230, 200, 60),
                    2 => (60, 200, 90),
                    3 => (60, 200, 220),
                    4 => (70, 90, 230),
                    _ => (200, 70, 220),
                };
                rgb.extend_from_slice(&[r, g, b]);
            }
        }
        Some(RawFrame::new(self.width, self.height, rgb))
    }
}

struct SyntheticRecorder {
    mime: Option<String>,
    container: Container,
    stream_active: Arc<AtomicBool>,
    sink: RecorderSink,
    chunk_interval: Duration,
    chunk_size: usize,
    stop_tx: Option<oneshot::Sender<()>>,
    started: bool,
}

impl Recorder for SyntheticRecorder {
    fn start(&mut self) -> VideobankResult<()> {
        if self.started {
            return Err(VideobankError::invalid_state("Recorder already started"));
        }
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            VideobankError::recorder_init("Synthetic recorder needs a tokio runtime")
        })?;

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let sink = self.sink.clone();
        let active = Arc::clone(&self.stream_active);
        let interval = self.chunk_interval.max(Duration::from_millis(1));
        let size = self.chunk_size;
        let container = self.container;

        handle.spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut seq = 0u64;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !active.load(Ordering::SeqCst) {
                            sink.failed("Camera stream ended while recording");
                            return;
                        }
                        sink.data(synthetic_chunk(container, seq, size));
                        seq += 1;
                    }
                    stopped = &mut stop_rx => {
                        // Dropped sender means the recorder itself went away.
                        if stopped.is_ok() {
                            sink.data(synthetic_chunk(container, seq, size));
                            sink.finalized();
                        }
                        return;
                    }
                }
            }
        });

        self.stop_tx = Some(stop_tx);
        self.started = true;
        tracing::debug!(mime = ?self.mime, "Synthetic recorder started");
        Ok(())
    }

    fn stop(&mut self) -> VideobankResult<()> {
        if !self.started {
            return Err(VideobankError::invalid_state("Recorder was never started"));
        }
        if let Some(tx) = self.stop_tx.take() {
            if tx.send(()).is_err() {
                tracing::debug!("Synthetic recorder task already finished");
            }
        }
        Ok(())
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime.as_deref()
    }
}

/// Chunk `seq` of a fake recording. The first chunk starts with the
/// container's magic bytes so the output is recognisable.
fn synthetic_chunk(container: Container, seq: u64, size: usize) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(size);
    if seq == 0 {
        match container {
            Container::Webm => chunk.extend_from_slice(&[0x1A, 0x45, 0xDF, 0xA3]),
            Container::Mp4 => chunk.extend_from_slice(b"\0\0\0\x18ftypisom"),
        }
    }
    let mut i = 0u64;
    while chunk.len() < size {
        chunk.push((seq.wrapping_mul(31).wrapping_add(i) & 0xff) as u8);
        i += 1;
    }
    chunk
}
