//! In-process preview handle registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use videobank_media_model::{PreviewHandle, VideoBlob};
use videobank_platform_core::PreviewRegistry;

/// Keeps registered videos alive until their handle is released.
///
/// Handles look like `blob:videobank/<n>` and are never reused.
#[derive(Debug, Default)]
pub struct InMemoryPreviewRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<PreviewHandle, VideoBlob>>,
}

impl InMemoryPreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreviewRegistry for InMemoryPreviewRegistry {
    fn register(&self, video: &VideoBlob) -> PreviewHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let handle = PreviewHandle::new(format!("blob:videobank/{id}"));
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle.clone(), video.clone());
        tracing::debug!(%handle, bytes = video.len(), "Registered preview");
        handle
    }

    fn resolve(&self, handle: &PreviewHandle) -> Option<VideoBlob> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(handle)
            .cloned()
    }

    fn release(&self, handle: &PreviewHandle) -> bool {
        let removed = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(handle)
            .is_some();
        if removed {
            tracing::debug!(%handle, "Released preview");
        } else {
            tracing::debug!(%handle, "Preview already released");
        }
        removed
    }

    fn live_handles(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_resolve_until_released() {
        let registry = InMemoryPreviewRegistry::new();
        let video = VideoBlob::new(vec![1, 2, 3], "video/webm");
        let handle = registry.register(&video);

        assert_eq!(registry.resolve(&handle), Some(video));
        assert!(registry.release(&handle));
        assert!(!registry.release(&handle));
        assert_eq!(registry.resolve(&handle), None);
        assert_eq!(registry.live_handles(), 0);
    }

    #[test]
    fn handles_are_unique() {
        let registry = InMemoryPreviewRegistry::new();
        let video = VideoBlob::new(vec![0], "video/mp4");
        let a = registry.register(&video);
        let b = registry.register(&video);
        assert_ne!(a, b);
        assert_eq!(registry.live_handles(), 2);
    }
}
