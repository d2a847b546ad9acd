//! Capture backends.
//!
//! A backend bundles the three platform capabilities a session needs:
//! opening camera streams, answering encoder support queries, and building
//! recorders. [`SyntheticBackend`] runs anywhere; [`GstBackend`] drives real
//! V4L2/PulseAudio devices when built with the `gstreamer` feature.

use std::sync::Arc;

use videobank_common::config::BackendKind;
use videobank_common::error::{VideobankError, VideobankResult};
use videobank_platform_core::CaptureBackend;

#[cfg(feature = "gstreamer")]
pub mod gst;
pub mod synthetic;

#[cfg(feature = "gstreamer")]
pub use gst::GstBackend;
pub use synthetic::{SyntheticBackend, SyntheticOptions};

/// Get the backend selected in configuration.
///
/// `device` pins a camera node (e.g. `/dev/video2`) instead of choosing by
/// facing mode. Only the GStreamer backend opens real devices.
pub fn get_backend(kind: BackendKind, device: Option<&str>) -> VideobankResult<Arc<dyn CaptureBackend>> {
    match (kind, device) {
        (BackendKind::Synthetic, None) => Ok(Arc::new(SyntheticBackend::default())),
        (BackendKind::Synthetic, Some(device)) => Err(VideobankError::unsupported(format!(
            "The synthetic camera cannot open {device}; use the gstreamer backend"
        ))),
        #[cfg(feature = "gstreamer")]
        (BackendKind::Gstreamer, None) => Ok(Arc::new(GstBackend::new()?)),
        #[cfg(feature = "gstreamer")]
        (BackendKind::Gstreamer, Some(device)) => Ok(Arc::new(GstBackend::with_device(device)?)),
        #[cfg(not(feature = "gstreamer"))]
        (BackendKind::Gstreamer, _) => Err(VideobankError::unsupported(
            "This build has no GStreamer support. Rebuild with --features gstreamer",
        )),
    }
}
