//! Submission of reviewed recordings.

use std::time::Duration;

use chrono::Utc;
use videobank_common::config::SubmissionConfig;
use videobank_common::error::{VideobankError, VideobankResult};
use videobank_media_model::{SubmissionRequest, Tag, VideoMetadata};

/// Category assigned to every new upload.
pub const DEFAULT_CATEGORY: &str = "General";

/// Accepts a reviewed recording and returns its ledger record.
#[async_trait::async_trait]
pub trait SubmissionService: Send + Sync {
    async fn submit(&self, request: &SubmissionRequest) -> VideobankResult<VideoMetadata>;
}

/// Pretends to upload: waits for the configured latency, then accepts.
#[derive(Debug, Clone)]
pub struct SimulatedUploader {
    latency: Duration,
}

impl SimulatedUploader {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedUploader {
    fn default() -> Self {
        Self::from(&SubmissionConfig::default())
    }
}

impl From<&SubmissionConfig> for SimulatedUploader {
    fn from(config: &SubmissionConfig) -> Self {
        Self::new(Duration::from_millis(config.simulated_latency_ms))
    }
}

#[async_trait::async_trait]
impl SubmissionService for SimulatedUploader {
    async fn submit(&self, request: &SubmissionRequest) -> VideobankResult<VideoMetadata> {
        if request.tags.is_empty() || request.description.trim().is_empty() {
            return Err(VideobankError::submission(
                "A submission needs at least one tag and a description",
            ));
        }

        tracing::info!(
            latency_ms = self.latency.as_millis() as u64,
            duration = request.duration,
            "Uploading recording"
        );
        tokio::time::sleep(self.latency).await;

        let video = VideoMetadata {
            id: uuid::Uuid::new_v4().to_string(),
            thumbnail: None,
            duration: request.duration,
            tags: request
                .tags
                .iter()
                .enumerate()
                .map(|(i, label)| Tag {
                    id: format!("new-{i}"),
                    label: label.clone(),
                })
                .collect(),
            category: DEFAULT_CATEGORY.to_string(),
            description: request.description.clone(),
            earnings: request.earnings,
            created_at: Utc::now(),
        };
        tracing::info!(id = %video.id, earnings = video.earnings, "Upload accepted");
        Ok(video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SubmissionRequest {
        SubmissionRequest {
            tags: vec!["Plumbing".to_string(), "Leak".to_string()],
            description: "Fixing a leak.".to_string(),
            earnings: 2.25,
            duration: 15,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_latency_then_returns_record() {
        let uploader = SimulatedUploader::default();
        let started = tokio::time::Instant::now();
        let video = uploader.submit(&request()).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(1_500));
        assert_eq!(video.tags[1].id, "new-1");
        assert_eq!(video.tags[1].label, "Leak");
        assert_eq!(video.category, "General");
        assert_eq!(video.earnings, 2.25);
        assert_eq!(video.duration, 15);
        assert!(uuid::Uuid::parse_str(&video.id).is_ok());
    }

    #[tokio::test]
    async fn rejects_incomplete_request() {
        let mut incomplete = request();
        incomplete.tags.clear();
        let err = SimulatedUploader::new(Duration::ZERO).submit(&incomplete).await.unwrap_err();
        assert!(matches!(err, VideobankError::Submission { .. }));
    }
}
