//! Top-level view flow: Dashboard → Recorder → Review → Success.
//!
//! `AppFlow` owns the recording under review and its preview handle. Every
//! way out of the review (discard or submit) releases the handle exactly
//! once.

use std::sync::Arc;

use serde::Serialize;
use videobank_common::error::{VideobankError, VideobankResult};
use videobank_media_model::{CapturedArtifact, VideoMetadata};
use videobank_platform_core::PreviewRegistry;

use crate::analysis::{analyze_or_fallback, AnalysisService, FrameAnalysis};
use crate::draft::ReviewDraft;
use crate::earnings::EarningsEstimator;
use crate::ledger::Ledger;
use crate::submission::SubmissionService;

/// Screen currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppView {
    Dashboard,
    Recorder,
    Review,
    Success,
}

struct PendingReview {
    artifact: CapturedArtifact,
    draft: ReviewDraft,
}

pub struct AppFlow {
    view: AppView,
    ledger: Ledger,
    estimator: EarningsEstimator,
    previews: Arc<dyn PreviewRegistry>,
    review: Option<PendingReview>,
    last_earnings: f64,
}

impl AppFlow {
    pub fn new(ledger: Ledger, estimator: EarningsEstimator, previews: Arc<dyn PreviewRegistry>) -> Self {
        Self {
            view: AppView::Dashboard,
            ledger,
            estimator,
            previews,
            review: None,
            last_earnings: 0.0,
        }
    }

    pub fn view(&self) -> AppView {
        self.view
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Payout of the most recent successful submission.
    pub fn last_earnings(&self) -> f64 {
        self.last_earnings
    }

    pub fn artifact(&self) -> Option<&CapturedArtifact> {
        self.review.as_ref().map(|r| &r.artifact)
    }

    pub fn draft(&self) -> Option<&ReviewDraft> {
        self.review.as_ref().map(|r| &r.draft)
    }

    pub fn draft_mut(&mut self) -> Option<&mut ReviewDraft> {
        self.review.as_mut().map(|r| &mut r.draft)
    }

    /// Dashboard → Recorder.
    pub fn start_recording_flow(&mut self) -> VideobankResult<()> {
        self.expect_view(AppView::Dashboard, "start recording")?;
        self.view = AppView::Recorder;
        Ok(())
    }

    /// Recorder → Review with a fresh draft for `artifact`.
    pub fn on_recording_complete(&mut self, artifact: CapturedArtifact) -> VideobankResult<&mut ReviewDraft> {
        if self.view != AppView::Recorder {
            // Not ours to keep.
            self.previews.release(&artifact.preview);
            return Err(VideobankError::invalid_state(format!(
                "Recording completed while on {:?}",
                self.view
            )));
        }

        tracing::info!(
            duration_secs = artifact.duration_secs,
            bytes = artifact.video.len(),
            preview = %artifact.preview,
            "Recording ready for review"
        );
        let draft = ReviewDraft::new(artifact.duration_secs, &self.estimator);
        self.view = AppView::Review;
        let review = self.review.insert(PendingReview { artifact, draft });
        Ok(&mut review.draft)
    }

    /// Recorder → Dashboard. The capture session has already cleaned up.
    pub fn on_cancel(&mut self) -> VideobankResult<()> {
        self.expect_view(AppView::Recorder, "cancel recording")?;
        self.view = AppView::Dashboard;
        Ok(())
    }

    /// Ask `service` for tags and a description and merge them into the
    /// draft. Falls back to fixed suggestions on failure.
    pub async fn auto_fill(&mut self, service: &dyn AnalysisService) -> VideobankResult<FrameAnalysis> {
        let review = self
            .review
            .as_mut()
            .ok_or_else(|| VideobankError::invalid_state("No recording under review"))?;
        let analysis = analyze_or_fallback(service, &review.artifact.frame).await;
        review.draft.apply_analysis(&analysis);
        Ok(analysis)
    }

    /// Review → Dashboard, dropping the recording.
    pub fn discard_review(&mut self) -> VideobankResult<()> {
        self.expect_view(AppView::Review, "discard review")?;
        if let Some(review) = self.review.take() {
            self.release_preview(&review.artifact);
        }
        tracing::info!("Recording discarded");
        self.view = AppView::Dashboard;
        Ok(())
    }

    /// Review → Success. On failure the review stays open.
    pub async fn submit(&mut self, service: &dyn SubmissionService) -> VideobankResult<VideoMetadata> {
        self.expect_view(AppView::Review, "submit")?;
        let request = match &self.review {
            Some(review) if review.draft.can_submit() => review.draft.to_submission(),
            Some(_) => {
                return Err(VideobankError::invalid_state(
                    "Add at least one tag and a description before submitting",
                ))
            }
            None => return Err(VideobankError::invalid_state("No recording under review")),
        };

        let video = service.submit(&request).await?;

        if let Some(review) = self.review.take() {
            self.release_preview(&review.artifact);
        }
        self.ledger.record(video.clone());
        self.last_earnings = video.earnings;
        self.view = AppView::Success;
        Ok(video)
    }

    /// Success → Dashboard.
    pub fn close_success(&mut self) -> VideobankResult<()> {
        self.expect_view(AppView::Success, "close success screen")?;
        self.view = AppView::Dashboard;
        Ok(())
    }

    fn release_preview(&self, artifact: &CapturedArtifact) {
        if !self.previews.release(&artifact.preview) {
            tracing::debug!(preview = %artifact.preview, "Preview handle was already released");
        }
    }

    fn expect_view(&self, expected: AppView, action: &str) -> VideobankResult<()> {
        if self.view == expected {
            Ok(())
        } else {
            Err(VideobankError::invalid_state(format!(
                "Cannot {action} from {:?}",
                self.view
            )))
        }
    }
}

impl Drop for AppFlow {
    fn drop(&mut self) {
        if let Some(review) = self.review.take() {
            self.release_preview(&review.artifact);
        }
    }
}
