//! Running earnings totals and submission history.

use serde::{Deserialize, Serialize};
use videobank_media_model::{UserStats, VideoMetadata};

/// The user's earnings summary and recent uploads, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    stats: UserStats,
    recent: Vec<VideoMetadata>,
}

impl Ledger {
    pub fn new(stats: UserStats, recent: Vec<VideoMetadata>) -> Self {
        Self { stats, recent }
    }

    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    pub fn recent(&self) -> &[VideoMetadata] {
        &self.recent
    }

    /// Credit an accepted upload.
    pub fn record(&mut self, video: VideoMetadata) {
        self.stats.total_earnings += video.earnings;
        self.stats.pending_payout += video.earnings;
        self.stats.total_videos += 1;
        tracing::debug!(
            id = %video.id,
            total_earnings = self.stats.total_earnings,
            total_videos = self.stats.total_videos,
            "Ledger updated"
        );
        self.recent.insert(0, video);
    }
}
