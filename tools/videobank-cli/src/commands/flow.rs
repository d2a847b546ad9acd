//! Record, auto-tag and submit in one run.

use std::sync::Arc;

use chrono::Utc;
use videobank_capture_engine::InMemoryPreviewRegistry;
use videobank_common::config::{AppConfig, BackendKind};
use videobank_media_model::{Tag, UserStats, VideoMetadata};
use videobank_review::{
    format_payout, AppFlow, EarningsEstimator, Ledger, SimulatedUploader, StaticAnalysisService,
};

use super::record::{capture, CaptureOptions};

fn demo_ledger() -> Ledger {
    Ledger::new(
        UserStats {
            total_earnings: 124.50,
            total_videos: 12,
            pending_payout: 45.20,
        },
        vec![VideoMetadata {
            id: "1".to_string(),
            thumbnail: None,
            duration: 45,
            tags: vec![
                Tag {
                    id: "t1".to_string(),
                    label: "HVAC".to_string(),
                },
                Tag {
                    id: "t2".to_string(),
                    label: "Maintenance".to_string(),
                },
            ],
            category: "Home Repair".to_string(),
            description: "AC Unit Filter Replacement".to_string(),
            earnings: 4.50,
            created_at: Utc::now(),
        }],
    )
}

fn print_ledger(ledger: &Ledger) {
    let stats = ledger.stats();
    println!(
        "  Total earned: {}  Pending: {}  Videos: {}",
        format_payout(stats.total_earnings),
        format_payout(stats.pending_payout),
        stats.total_videos
    );
    for video in ledger.recent().iter().take(3) {
        let tags: Vec<&str> = video.tags.iter().map(|t| t.label.as_str()).collect();
        println!(
            "    {}  {}s  {}  [{}]",
            format_payout(video.earnings),
            video.duration,
            video.description,
            tags.join(", ")
        );
    }
}

pub async fn run(config: &AppConfig, seconds: u64, backend: Option<BackendKind>) -> anyhow::Result<()> {
    let previews = Arc::new(InMemoryPreviewRegistry::new());
    let mut app = AppFlow::new(demo_ledger(), EarningsEstimator::from(&config.earnings), previews.clone());

    println!("Dashboard");
    print_ledger(app.ledger());
    println!();

    app.start_recording_flow()?;
    let options = CaptureOptions {
        seconds,
        facing: None,
        audio: config.capture.constraints.audio,
        backend,
        device: None,
    };
    let artifact = match capture(config, &options, previews.clone()).await {
        Ok(Some(artifact)) => artifact,
        Ok(None) => {
            app.on_cancel()?;
            println!("Recording produced no output; back to dashboard.");
            return Ok(());
        }
        Err(e) => {
            app.on_cancel()?;
            return Err(e);
        }
    };

    let draft = app.on_recording_complete(artifact)?;
    println!();
    println!("Review ({}s, estimate {})", draft.duration_secs(), format_payout(draft.estimated_earnings()));

    let analysis = app.auto_fill(&StaticAnalysisService::default()).await?;
    tracing::debug!(?analysis, "Suggestions applied");
    if let Some(draft) = app.draft() {
        println!("  Tags:        {}", draft.tags().join(", "));
        println!("  Description: {}", draft.description());
    }

    println!("Uploading...");
    let video = app.submit(&SimulatedUploader::from(&config.submission)).await?;
    println!();
    println!("Success! Earned {} for video {}", format_payout(app.last_earnings()), video.id);
    print_ledger(app.ledger());

    app.close_success()?;
    Ok(())
}
