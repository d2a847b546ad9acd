//! Camera/microphone acquisition.

use videobank_common::error::{VideobankError, VideobankResult};
use videobank_media_model::CaptureConstraints;
use videobank_platform_core::{MediaSource, MediaStream};

/// Shown on the capture screen when the camera cannot be opened.
pub const ACQUISITION_ERROR_MESSAGE: &str = "Could not access camera. Please allow permissions.";

/// Open a stream with the given constraints.
///
/// Every failure is reported as [`VideobankError::Acquisition`] so callers
/// can tell it apart from recorder failures. There is no retry here.
pub async fn acquire_stream<S>(
    source: &S,
    constraints: &CaptureConstraints,
) -> VideobankResult<Box<dyn MediaStream>>
where
    S: MediaSource + ?Sized,
{
    tracing::info!(
        facing = %constraints.facing,
        audio = constraints.audio,
        "Requesting camera stream"
    );

    let stream = source.acquire(constraints).await.map_err(|e| {
        tracing::error!(error = %e, "Error accessing camera");
        match e {
            VideobankError::Acquisition { .. } => e,
            other => VideobankError::acquisition(other.to_string()),
        }
    })?;

    if constraints.audio && !stream.has_audio() {
        tracing::warn!(stream = stream.id(), "Stream opened without the requested audio track");
    }

    let (width, height) = stream.preview().native_size();
    tracing::info!(stream = stream.id(), width, height, "Camera stream acquired");
    Ok(stream)
}
