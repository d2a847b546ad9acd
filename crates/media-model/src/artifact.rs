//! Recorded chunks and the finished capture artifact.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Append-only, ordered store for recorder output.
///
/// Fragments are kept in arrival order. Empty fragments are refused so the
/// buffer only ever holds bytes that belong in the final video.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
    total_bytes: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Returns `false` (and stores nothing) for an empty one.
    pub fn push(&mut self, chunk: Vec<u8>) -> bool {
        if chunk.is_empty() {
            return false;
        }
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
        true
    }

    /// Number of stored fragments.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Sum of all stored fragment sizes.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Drop all fragments.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }

    /// Concatenate every fragment in arrival order, consuming the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_bytes);
        for chunk in self.chunks {
            out.extend_from_slice(&chunk);
        }
        out
    }
}

/// The assembled recording.
///
/// Bytes are reference counted so a preview handle can point at the same
/// allocation instead of copying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoBlob {
    data: Arc<[u8]>,
    mime_type: String,
}

impl VideoBlob {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the underlying bytes.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Reference to a registered video that can be played back without copying
/// its bytes. Must be released through the registry that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// A single still image, stored as a `data:` URL.
///
/// An empty string is the placeholder used when no frame could be captured.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StillFrame {
    data_url: String,
}

impl StillFrame {
    /// Wrap base64-encoded JPEG bytes.
    pub fn from_jpeg_base64(payload: impl AsRef<str>) -> Self {
        Self {
            data_url: format!("{JPEG_DATA_URL_PREFIX}{}", payload.as_ref()),
        }
    }

    /// Accept either a full `data:` URL or a bare base64 payload.
    pub fn from_data_url(value: impl Into<String>) -> Self {
        Self {
            data_url: value.into(),
        }
    }

    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_placeholder(&self) -> bool {
        self.base64_payload().is_empty()
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// The base64 payload with any `data:...;base64,` header removed.
    pub fn base64_payload(&self) -> &str {
        match self.data_url.split_once(',') {
            Some((header, payload)) if header.starts_with("data:") => payload,
            _ => &self.data_url,
        }
    }

    /// Declared image type, defaulting to JPEG for bare payloads.
    pub fn mime_type(&self) -> &str {
        self.data_url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map(|(mime, _)| mime)
            .unwrap_or("image/jpeg")
    }
}

/// Everything produced by one completed recording.
///
/// The receiver owns `preview` and must release it once the recording is no
/// longer displayed.
#[derive(Debug, Clone)]
pub struct CapturedArtifact {
    pub video: VideoBlob,
    pub preview: PreviewHandle,
    pub frame: StillFrame,
    pub duration_secs: u64,
}
