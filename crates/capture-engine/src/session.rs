//! Recording session management.
//!
//! [`CaptureSession`] owns the camera stream, the recorder, the chunk buffer
//! and the elapsed-time timer for one trip through the capture screen. User
//! commands (`acquire`, `start`, `stop`, `cancel`) are methods; recorder
//! output and timer ticks arrive as [`SessionEvent`]s on the session's own
//! queue and are applied with [`CaptureSession::handle_event`].
//!
//! Every recording attempt gets a new generation number. Ticks and recorder
//! events are stamped with the generation that scheduled them, so anything
//! left over from a stopped or cancelled attempt is ignored instead of
//! mutating the current one.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use videobank_common::clock::{elapsed_whole_secs, ClockSource, TimerId};
use videobank_common::config::CaptureDefaults;
use videobank_common::error::{VideobankError, VideobankResult};
use videobank_media_model::{
    default_encoding_priority, CaptureConstraints, CapturedArtifact, ChunkBuffer,
    EncodingCandidate,
};
use videobank_platform_core::{
    CaptureBackend, MediaStream, PreviewRegistry, PreviewSurface, Recorder, RecorderEvent,
    RecorderSink,
};

use crate::acquisition::{acquire_stream, ACQUISITION_ERROR_MESSAGE};
use crate::assembly::assemble;
use crate::negotiation::select_encoding;

/// Shown when the recorder cannot be created or started.
pub const RECORDER_INIT_ERROR_MESSAGE: &str =
    "Failed to start recording. This device does not support the selected video format.";

/// Shown when a running recorder reports a failure.
pub const RECORDING_FAILED_MESSAGE: &str = "Recording failed. Please try again.";

/// Configuration for a capture session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// What to ask the media source for.
    pub constraints: CaptureConstraints,

    /// Encodings to negotiate, best first.
    pub encodings: Vec<EncodingCandidate>,

    /// Period of the elapsed-time refresh.
    pub tick_interval: Duration,

    /// JPEG quality for the analysis still.
    pub still_quality: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            constraints: CaptureConstraints::default(),
            encodings: default_encoding_priority(),
            tick_interval: Duration::from_secs(1),
            still_quality: 80,
        }
    }
}

impl From<&CaptureDefaults> for SessionConfig {
    fn from(defaults: &CaptureDefaults) -> Self {
        Self {
            constraints: defaults.constraints,
            encodings: defaults.encodings.clone(),
            tick_interval: Duration::from_millis(defaults.tick_interval_ms.max(1)),
            still_quality: defaults.still_quality,
        }
    }
}

/// State of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Nothing acquired.
    Idle,
    /// Waiting for the media source.
    Acquiring,
    /// Stream open, not recording.
    Ready,
    /// Recorder running.
    Recording,
    /// Recorder told to finalize; artifact follows (or has been emitted).
    Stopped,
    /// Acquisition or recorder failure. See [`CaptureSession::error_message`].
    Errored,
}

/// The observable session record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSession {
    pub status: SessionStatus,
    pub started_at_ms: Option<u64>,
    pub elapsed_secs: u64,
    pub encoding: Option<EncodingCandidate>,
}

impl RecordingSession {
    fn idle() -> Self {
        Self {
            status: SessionStatus::Idle,
            started_at_ms: None,
            elapsed_secs: 0,
            encoding: None,
        }
    }
}

/// Something that happened outside the session's direct control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Elapsed-time timer fired.
    Tick { generation: u64 },
    /// Recorder output.
    Recorder { generation: u64, event: RecorderEvent },
}

/// A recording session over one camera stream.
pub struct CaptureSession {
    config: SessionConfig,
    backend: Arc<dyn CaptureBackend>,
    clock: Arc<dyn ClockSource>,
    previews: Arc<dyn PreviewRegistry>,
    record: RecordingSession,
    stream: Option<Box<dyn MediaStream>>,
    recorder: Option<Box<dyn Recorder>>,
    chunks: ChunkBuffer,
    timer: Option<TimerId>,
    generation: u64,
    error: Option<&'static str>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl CaptureSession {
    /// Create a new capture session with the given configuration.
    pub fn new(
        config: SessionConfig,
        backend: Arc<dyn CaptureBackend>,
        clock: Arc<dyn ClockSource>,
        previews: Arc<dyn PreviewRegistry>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            backend,
            clock,
            previews,
            record: RecordingSession::idle(),
            stream: None,
            recorder: None,
            chunks: ChunkBuffer::new(),
            timer: None,
            generation: 0,
            error: None,
            events_tx,
            events_rx,
        }
    }

    /// Current session state.
    pub fn status(&self) -> SessionStatus {
        self.record.status
    }

    pub fn record(&self) -> &RecordingSession {
        &self.record
    }

    /// Seconds recorded so far (frozen once stopped).
    pub fn elapsed_secs(&self) -> u64 {
        self.record.elapsed_secs
    }

    /// User-facing message for the current error, if any.
    pub fn error_message(&self) -> Option<&'static str> {
        self.error
    }

    /// Whether a camera stream is currently held.
    pub fn has_stream(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_active())
    }

    /// Live preview of the held stream, for display.
    pub fn preview(&self) -> Option<Arc<dyn PreviewSurface>> {
        self.stream.as_ref().map(|s| s.preview())
    }

    /// Bytes buffered for the current recording.
    pub fn buffered_bytes(&self) -> usize {
        self.chunks.total_bytes()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Open the camera stream.
    ///
    /// Allowed from `Idle` and `Errored`; a failed acquisition is never
    /// retried automatically. Also allowed from `Acquiring`: `&mut self`
    /// rules out a concurrent call, so that state means an earlier
    /// `acquire` future was dropped before the source answered.
    pub async fn acquire(&mut self) -> VideobankResult<()> {
        match self.record.status {
            SessionStatus::Idle | SessionStatus::Errored => {}
            SessionStatus::Acquiring => {
                tracing::debug!("Previous acquisition was abandoned; starting over");
            }
            other => {
                return Err(VideobankError::invalid_state(format!(
                    "Cannot acquire a stream while {other:?}"
                )))
            }
        }

        // Never hold two streams.
        self.release();
        self.error = None;
        self.record = RecordingSession::idle();
        self.record.status = SessionStatus::Acquiring;

        match acquire_stream(self.backend.as_ref(), &self.config.constraints).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.record.status = SessionStatus::Ready;
                Ok(())
            }
            Err(e) => {
                self.record.status = SessionStatus::Errored;
                self.error = Some(ACQUISITION_ERROR_MESSAGE);
                Err(e)
            }
        }
    }

    /// Start recording on the acquired stream.
    ///
    /// Rejected without changing state when no stream is ready or a
    /// recording is already running.
    pub fn start(&mut self) -> VideobankResult<()> {
        match self.record.status {
            SessionStatus::Ready => {}
            SessionStatus::Recording => {
                return Err(VideobankError::invalid_state("Already recording"));
            }
            other => {
                tracing::debug!(status = ?other, "Start ignored: no ready stream");
                return Err(VideobankError::invalid_state(format!(
                    "Cannot start recording while {other:?}"
                )));
            }
        }

        let Some(stream) = self.stream.as_deref() else {
            return Err(VideobankError::invalid_state("No camera stream acquired"));
        };
        if !stream.is_active() {
            return Err(VideobankError::invalid_state("Camera stream is no longer active"));
        }

        let backend = Arc::clone(&self.backend);
        let encoding = select_encoding(&self.config.encodings, |candidate| {
            backend.is_type_supported(candidate.mime_type())
        });

        self.chunks.clear();
        self.generation += 1;
        let generation = self.generation;

        let tx = self.events_tx.clone();
        let sink = RecorderSink::new(move |event| {
            if tx.send(SessionEvent::Recorder { generation, event }).is_err() {
                tracing::debug!(generation, "Recorder event dropped: session gone");
            }
        });

        let recorder = backend
            .create_recorder(stream, encoding.as_ref(), sink)
            .and_then(|mut recorder| {
                recorder.start()?;
                Ok(recorder)
            });

        let recorder = match recorder {
            Ok(recorder) => recorder,
            Err(e) => {
                tracing::error!(error = %e, encoding = ?encoding.as_ref().map(|c| c.mime_type()), "Failed to start recorder");
                self.record.status = SessionStatus::Errored;
                self.error = Some(RECORDER_INIT_ERROR_MESSAGE);
                self.release();
                return Err(match e {
                    VideobankError::RecorderInit { .. } => e,
                    other => VideobankError::recorder_init(other.to_string()),
                });
            }
        };

        let started_at = self.clock.now_ms();
        self.recorder = Some(recorder);
        self.record.started_at_ms = Some(started_at);
        self.record.elapsed_secs = 0;
        self.record.encoding = encoding;
        self.record.status = SessionStatus::Recording;

        let tx = self.events_tx.clone();
        self.timer = Some(self.clock.schedule_repeating(
            self.config.tick_interval,
            Box::new(move || {
                if tx.send(SessionEvent::Tick { generation }).is_err() {
                    tracing::debug!(generation, "Tick dropped: session gone");
                }
            }),
        ));

        tracing::info!(
            generation,
            encoding = self.record.encoding.as_ref().map(|c| c.mime_type()).unwrap_or("platform default"),
            "Recording started"
        );
        Ok(())
    }

    /// Stop recording. Returns `false` (and does nothing) when not recording.
    ///
    /// The artifact is produced later, when the recorder's `Finalized` event
    /// is handled.
    pub fn stop(&mut self) -> VideobankResult<bool> {
        if self.record.status != SessionStatus::Recording {
            tracing::debug!(status = ?self.record.status, "Stop ignored: not recording");
            return Ok(false);
        }

        self.refresh_elapsed();
        self.cancel_timer();
        self.record.status = SessionStatus::Stopped;

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.stop() {
                tracing::warn!(error = %e, "Recorder failed to stop cleanly; assembling buffered data");
                let finalize = SessionEvent::Recorder {
                    generation: self.generation,
                    event: RecorderEvent::Finalized,
                };
                if self.events_tx.send(finalize).is_err() {
                    tracing::debug!("Synthetic finalize dropped: queue closed");
                }
            }
        }

        tracing::info!(elapsed_secs = self.record.elapsed_secs, "Recording stopped");
        Ok(true)
    }

    /// Abandon the capture: stop any recording, discard buffered data,
    /// release the camera and return to `Idle`. Never emits an artifact.
    pub fn cancel(&mut self) {
        tracing::info!(status = ?self.record.status, "Capture cancelled");
        self.generation += 1;
        self.release();
        self.chunks.clear();
        self.record = RecordingSession::idle();
        self.error = None;
    }

    /// Release the camera, the recorder and the timer. Safe to call any
    /// number of times.
    pub fn release(&mut self) {
        self.cancel_timer();

        if let Some(mut recorder) = self.recorder.take() {
            if let Err(e) = recorder.stop() {
                tracing::warn!(error = %e, "Recorder stop during release failed");
            }
        }

        match self.stream.take() {
            Some(stream) => {
                stream.stop_tracks();
                tracing::info!(stream = stream.id(), "Camera stream released");
            }
            None => tracing::trace!("Release: no stream held"),
        }
    }

    /// Apply one event. Returns the artifact when this event completes the
    /// recording.
    pub async fn handle_event(
        &mut self,
        event: SessionEvent,
    ) -> VideobankResult<Option<CapturedArtifact>> {
        match event {
            SessionEvent::Tick { generation } => {
                if generation == self.generation && self.record.status == SessionStatus::Recording {
                    self.refresh_elapsed();
                } else {
                    tracing::trace!(generation, current = self.generation, "Ignoring stale tick");
                }
                Ok(None)
            }
            SessionEvent::Recorder { generation, event } if generation != self.generation => {
                tracing::debug!(generation, current = self.generation, ?event, "Ignoring stale recorder event");
                Ok(None)
            }
            SessionEvent::Recorder { event, .. } => self.handle_recorder_event(event).await,
        }
    }

    /// Apply every event already queued without waiting for more.
    pub async fn process_pending(&mut self) -> VideobankResult<Option<CapturedArtifact>> {
        let mut artifact = None;
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(done) = self.handle_event(event).await? {
                artifact = Some(done);
            }
        }
        Ok(artifact)
    }

    /// Wait for the next queued event.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// After [`stop`](Self::stop), pump events until the artifact is ready.
    ///
    /// Returns `Ok(None)` if the session is not stopped or leaves the stopped
    /// state without producing one.
    pub async fn wait_for_artifact(&mut self) -> VideobankResult<Option<CapturedArtifact>> {
        while self.record.status == SessionStatus::Stopped && self.recorder.is_some() {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            if let Some(artifact) = self.handle_event(event).await? {
                return Ok(Some(artifact));
            }
        }
        Ok(None)
    }

    async fn handle_recorder_event(
        &mut self,
        event: RecorderEvent,
    ) -> VideobankResult<Option<CapturedArtifact>> {
        match event {
            RecorderEvent::DataAvailable(bytes) => {
                match self.record.status {
                    SessionStatus::Recording | SessionStatus::Stopped if self.recorder.is_some() => {
                        let size = bytes.len();
                        if !self.chunks.push(bytes) {
                            tracing::trace!("Dropped empty chunk");
                        } else {
                            tracing::trace!(size, total = self.chunks.total_bytes(), "Chunk buffered");
                        }
                    }
                    other => tracing::debug!(status = ?other, "Chunk ignored outside a recording"),
                }
                Ok(None)
            }
            RecorderEvent::Finalized => {
                if self.record.status != SessionStatus::Stopped || self.recorder.is_none() {
                    tracing::debug!(status = ?self.record.status, "Ignoring finalize outside a stopped recording");
                    return Ok(None);
                }
                Ok(Some(self.finish_recording().await))
            }
            RecorderEvent::Failed(message) => {
                if !matches!(self.record.status, SessionStatus::Recording | SessionStatus::Stopped) {
                    tracing::debug!(%message, "Ignoring recorder failure outside a recording");
                    return Ok(None);
                }
                tracing::error!(%message, "Recorder failed");
                self.generation += 1;
                self.chunks.clear();
                self.release();
                self.record.status = SessionStatus::Errored;
                self.error = Some(RECORDING_FAILED_MESSAGE);
                Err(VideobankError::platform(format!("Recorder failed: {message}")))
            }
        }
    }

    async fn finish_recording(&mut self) -> CapturedArtifact {
        // Consumed exactly once: a second Finalized finds no recorder.
        self.recorder = None;
        let chunks = std::mem::take(&mut self.chunks);
        let surface = self.preview();

        let artifact = assemble(
            chunks,
            self.record.encoding.as_ref(),
            self.record.elapsed_secs,
            surface.as_deref(),
            self.config.still_quality,
            self.previews.as_ref(),
        )
        .await;

        self.release();
        artifact
    }

    fn refresh_elapsed(&mut self) {
        if let Some(started_at) = self.record.started_at_ms {
            let elapsed = elapsed_whole_secs(started_at, self.clock.now_ms());
            self.record.elapsed_secs = self.record.elapsed_secs.max(elapsed);
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            if !self.clock.cancel(timer) {
                tracing::debug!(timer = timer.raw(), "Timer was already cancelled");
            }
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Format seconds as `m:ss` for the recording timer.
pub fn format_elapsed(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
