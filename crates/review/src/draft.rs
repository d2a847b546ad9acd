//! User-editable review of a finished recording.

use videobank_media_model::SubmissionRequest;

use crate::analysis::FrameAnalysis;
use crate::earnings::EarningsEstimator;

/// Tags, description and payout estimate for one recording under review.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDraft {
    duration_secs: u64,
    estimated_earnings: f64,
    tags: Vec<String>,
    description: String,
}

impl ReviewDraft {
    /// Start a draft. The payout estimate is fixed here from the duration.
    pub fn new(duration_secs: u64, estimator: &EarningsEstimator) -> Self {
        Self {
            duration_secs,
            estimated_earnings: estimator.estimate(duration_secs),
            tags: Vec::new(),
            description: String::new(),
        }
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn estimated_earnings(&self) -> f64 {
        self.estimated_earnings
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Add a tag. Returns `false` for blank or already present tags.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Remove a tag. Returns `false` if it was not present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Merge suggested tags after the existing ones and take the suggested
    /// description only when none has been written yet.
    pub fn apply_analysis(&mut self, analysis: &FrameAnalysis) {
        for tag in &analysis.tags {
            self.add_tag(tag);
        }
        if self.description.trim().is_empty() {
            self.description = analysis.description.clone();
        }
    }

    /// At least one tag and a description.
    pub fn can_submit(&self) -> bool {
        !self.tags.is_empty() && !self.description.trim().is_empty()
    }

    pub fn to_submission(&self) -> SubmissionRequest {
        SubmissionRequest {
            tags: self.tags.clone(),
            description: self.description.trim().to_string(),
            earnings: self.estimated_earnings,
            duration: self.duration_secs,
        }
    }
}
