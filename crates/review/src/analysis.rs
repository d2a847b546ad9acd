//! AI analysis of the captured still frame.

use serde::{Deserialize, Serialize};
use videobank_common::error::{VideobankError, VideobankResult};
use videobank_media_model::StillFrame;

/// Tags used when analysis is unavailable.
pub const FALLBACK_TAGS: [&str; 3] = ["Work", "Task", "Manual"];

/// Description used when analysis is unavailable.
pub const FALLBACK_DESCRIPTION: &str = "Video uploaded by user.";

/// Suggested tags and a one-sentence description of the work shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl FrameAnalysis {
    pub fn fallback() -> Self {
        Self {
            tags: FALLBACK_TAGS.iter().map(|t| t.to_string()).collect(),
            description: FALLBACK_DESCRIPTION.to_string(),
        }
    }

    /// Trim entries and drop blank tags.
    pub fn normalized(self) -> Self {
        Self {
            tags: self
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            description: self.description.trim().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.description.is_empty()
    }
}

/// Produces tag/description suggestions for a still frame.
#[async_trait::async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, frame: &StillFrame) -> VideobankResult<FrameAnalysis>;
}

/// Run `service`, substituting [`FrameAnalysis::fallback`] on any failure.
///
/// A placeholder frame is never sent to the service.
pub async fn analyze_or_fallback(service: &dyn AnalysisService, frame: &StillFrame) -> FrameAnalysis {
    if frame.is_placeholder() {
        tracing::warn!("No still frame available for analysis; using fallback tags");
        return FrameAnalysis::fallback();
    }

    match service.analyze(frame).await {
        Ok(analysis) => {
            let analysis = analysis.normalized();
            if analysis.is_empty() {
                tracing::warn!("Analysis returned nothing usable; using fallback tags");
                return FrameAnalysis::fallback();
            }
            tracing::info!(tags = analysis.tags.len(), "Frame analysis complete");
            analysis
        }
        Err(e) => {
            tracing::warn!(error = %e, "Frame analysis failed; using fallback tags");
            FrameAnalysis::fallback()
        }
    }
}

/// Returns a fixed analysis. For offline runs and demos.
#[derive(Debug, Clone)]
pub struct StaticAnalysisService {
    analysis: FrameAnalysis,
}

impl StaticAnalysisService {
    pub fn new(analysis: FrameAnalysis) -> Self {
        Self { analysis }
    }
}

impl Default for StaticAnalysisService {
    fn default() -> Self {
        Self::new(FrameAnalysis {
            tags: vec![
                "Maintenance".to_string(),
                "Hand Tools".to_string(),
                "Workshop".to_string(),
                "Repair".to_string(),
                "Inspection".to_string(),
            ],
            description: "Technician inspecting and repairing equipment at a workbench.".to_string(),
        })
    }
}

#[async_trait::async_trait]
impl AnalysisService for StaticAnalysisService {
    async fn analyze(&self, frame: &StillFrame) -> VideobankResult<FrameAnalysis> {
        if frame.base64_payload().is_empty() {
            return Err(VideobankError::analysis("Empty frame"));
        }
        Ok(self.analysis.clone())
    }
}
