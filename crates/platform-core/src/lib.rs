//! VideoBank platform core contracts.
//!
//! This crate contains the capability traits the capture engine is driven
//! through: opening a camera stream, probing encoder support, creating a
//! recorder, reading the live preview, and registering playable previews.
//! Concrete backends implement them; tests substitute scripted fakes.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use videobank_common::error::VideobankResult;
use videobank_media_model::{CaptureConstraints, EncodingCandidate, PreviewHandle, VideoBlob};

/// A packed RGB8 frame.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Self {
        Self { width, height, rgb }
    }

    /// Non-empty and the buffer length matches the dimensions.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.rgb.len() == self.width as usize * self.height as usize * 3
    }
}

impl fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgb.len())
            .finish()
    }
}

/// The on-screen live view of a stream.
pub trait PreviewSurface: Send + Sync {
    /// Native resolution of the displayed frame. `(0, 0)` while nothing is
    /// displayed (before the first frame or during teardown).
    fn native_size(&self) -> (u32, u32);

    /// Copy of the frame currently displayed.
    fn current_frame(&self) -> Option<RawFrame>;
}

/// An open camera (+ optional microphone) stream.
pub trait MediaStream: Send + Sync {
    /// Backend-specific identifier, for logs.
    fn id(&self) -> &str;

    fn has_audio(&self) -> bool;

    /// Whether any track is still live.
    fn is_active(&self) -> bool;

    /// Stop every track. Calling it again must be a no-op.
    fn stop_tracks(&self);

    /// Live preview attached to this stream. Display only; the stream keeps
    /// ownership of the hardware.
    fn preview(&self) -> Arc<dyn PreviewSurface>;

    /// Lets a backend recover its own stream type in its recorder factory.
    fn as_any(&self) -> &dyn Any;
}

/// Opens camera streams.
#[async_trait::async_trait]
pub trait MediaSource: Send + Sync {
    /// Open a stream. Permission denial and missing devices are reported as
    /// `VideobankError::Acquisition`.
    async fn acquire(&self, constraints: &CaptureConstraints)
        -> VideobankResult<Box<dyn MediaStream>>;
}

/// Answers whether a recorder could produce a given MIME type.
pub trait EncoderSupport: Send + Sync {
    fn is_type_supported(&self, mime_type: &str) -> bool;
}

/// Output of a running recorder, delivered in production order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// A fragment of encoded output. May be empty.
    DataAvailable(Vec<u8>),
    /// All data has been delivered; the recorder is done.
    Finalized,
    /// The recorder failed after it started.
    Failed(String),
}

/// Where a recorder sends its events. Cheap to clone; safe to call from any
/// thread.
#[derive(Clone)]
pub struct RecorderSink {
    emit: Arc<dyn Fn(RecorderEvent) + Send + Sync>,
}

impl RecorderSink {
    pub fn new(emit: impl Fn(RecorderEvent) + Send + Sync + 'static) -> Self {
        Self {
            emit: Arc::new(emit),
        }
    }

    pub fn emit(&self, event: RecorderEvent) {
        (self.emit)(event)
    }

    pub fn data(&self, bytes: Vec<u8>) {
        self.emit(RecorderEvent::DataAvailable(bytes));
    }

    pub fn finalized(&self) {
        self.emit(RecorderEvent::Finalized);
    }

    pub fn failed(&self, message: impl Into<String>) {
        self.emit(RecorderEvent::Failed(message.into()));
    }
}

impl fmt::Debug for RecorderSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RecorderSink")
    }
}

/// An encoder bound to one stream for one recording.
pub trait Recorder: Send {
    /// Begin producing data.
    fn start(&mut self) -> VideobankResult<()>;

    /// Request finalization. Remaining data and then
    /// [`RecorderEvent::Finalized`] arrive through the sink.
    fn stop(&mut self) -> VideobankResult<()>;

    /// MIME type the recorder was configured with, if any.
    fn mime_type(&self) -> Option<&str>;
}

/// Builds recorders for a stream.
pub trait RecorderFactory: Send + Sync {
    /// `encoding` is `None` when negotiation found nothing and the platform
    /// default should be used. Construction failures are reported as
    /// `VideobankError::RecorderInit`.
    fn create_recorder(
        &self,
        stream: &dyn MediaStream,
        encoding: Option<&EncodingCandidate>,
        sink: RecorderSink,
    ) -> VideobankResult<Box<dyn Recorder>>;
}

/// Issues playable handles for finished videos without copying their bytes.
pub trait PreviewRegistry: Send + Sync {
    fn register(&self, video: &VideoBlob) -> PreviewHandle;

    /// The video behind a live handle.
    fn resolve(&self, handle: &PreviewHandle) -> Option<VideoBlob>;

    /// Release a handle. Returns `false` if it was unknown or already released.
    fn release(&self, handle: &PreviewHandle) -> bool;

    /// Number of handles not yet released.
    fn live_handles(&self) -> usize;
}

/// Everything a platform must provide to record.
pub trait CaptureBackend: MediaSource + EncoderSupport + RecorderFactory {
    fn name(&self) -> &str;
}

/// Summary of a backend's capabilities, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderReport {
    pub mime_type: String,
    pub supported: bool,
}

/// Probe each candidate MIME type against a backend.
pub fn probe_encoders<'a, S>(
    support: &S,
    candidates: impl IntoIterator<Item = &'a EncodingCandidate>,
) -> Vec<EncoderReport>
where
    S: EncoderSupport + ?Sized,
{
    candidates
        .into_iter()
        .map(|candidate| EncoderReport {
            mime_type: candidate.mime_type().to_string(),
            supported: support.is_type_supported(candidate.mime_type()),
        })
        .collect()
}
