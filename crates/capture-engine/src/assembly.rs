//! Artifact assembly after the recorder finalizes.

use videobank_media_model::{
    CapturedArtifact, ChunkBuffer, EncodingCandidate, StillFrame, VideoBlob, FALLBACK_VIDEO_MIME,
};
use videobank_platform_core::{PreviewRegistry, PreviewSurface};

use crate::still::capture_still;

/// Media type to stamp on the finished video.
pub fn artifact_mime_type(encoding: Option<&EncodingCandidate>) -> &str {
    encoding
        .map(EncodingCandidate::mime_type)
        .unwrap_or(FALLBACK_VIDEO_MIME)
}

/// Build the artifact for one finished recording.
///
/// Consumes the chunk buffer. A failed still capture never aborts assembly;
/// the artifact then carries a placeholder frame.
pub async fn assemble(
    chunks: ChunkBuffer,
    encoding: Option<&EncodingCandidate>,
    duration_secs: u64,
    surface: Option<&dyn PreviewSurface>,
    still_quality: u8,
    previews: &dyn PreviewRegistry,
) -> CapturedArtifact {
    let chunk_count = chunks.len();
    let video = VideoBlob::new(chunks.into_bytes(), artifact_mime_type(encoding));
    let preview = previews.register(&video);

    let frame = match surface {
        Some(surface) => match capture_still(surface, still_quality).await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Still frame capture failed; using placeholder");
                StillFrame::placeholder()
            }
        },
        None => {
            tracing::warn!("No preview surface at assembly; using placeholder frame");
            StillFrame::placeholder()
        }
    };

    tracing::info!(
        chunks = chunk_count,
        bytes = video.len(),
        mime = video.mime_type(),
        duration_secs,
        has_frame = !frame.is_placeholder(),
        "Recording assembled"
    );

    CapturedArtifact {
        video,
        preview,
        frame,
        duration_secs,
    }
}
