//! Earnings ledger records produced after a capture is submitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A label attached to a submitted video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub label: String,
}

/// A submitted video as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: String,

    /// Optional thumbnail (data URL or remote URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    /// Duration in seconds.
    pub duration: u64,

    pub tags: Vec<Tag>,

    pub category: String,

    pub description: String,

    /// Payout for this video.
    pub earnings: f64,

    pub created_at: DateTime<Utc>,
}

/// Aggregate earnings for the current user.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_earnings: f64,
    pub total_videos: u64,
    pub pending_payout: f64,
}

/// What the review stage hands to the submission collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub tags: Vec<String>,
    pub description: String,
    pub earnings: f64,
    pub duration: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_metadata_uses_camel_case_json() {
        let video = VideoMetadata {
            id: "v1".to_string(),
            thumbnail: None,
            duration: 45,
            tags: vec![Tag {
                id: "t1".to_string(),
                label: "HVAC".to_string(),
            }],
            category: "HVAC".to_string(),
            description: "AC unit filter replacement".to_string(),
            earnings: 4.5,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&video).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(!json.contains("thumbnail"));
    }
}
