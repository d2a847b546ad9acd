//! Record a video from the camera.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use base64::Engine;
use videobank_capture_engine::backend::get_backend;
use videobank_capture_engine::{format_elapsed, CaptureSession, InMemoryPreviewRegistry, SessionConfig, SessionStatus};
use videobank_common::clock::SystemClock;
use videobank_common::config::{AppConfig, BackendKind};
use videobank_media_model::{CapturedArtifact, FacingMode};
use videobank_platform_core::PreviewRegistry;
use videobank_review::{format_payout, EarningsEstimator};

/// Capture parameters shared by `record` and `flow`.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub seconds: u64,
    pub facing: Option<FacingMode>,
    pub audio: bool,
    pub backend: Option<BackendKind>,
    /// Camera device node; only the GStreamer backend accepts one.
    pub device: Option<String>,
}

/// Run one recording to completion.
///
/// Stops after `seconds` or on Ctrl+C, whichever comes first.
pub async fn capture(
    config: &AppConfig,
    options: &CaptureOptions,
    previews: Arc<dyn PreviewRegistry>,
) -> anyhow::Result<Option<CapturedArtifact>> {
    let mut session_config = SessionConfig::from(&config.capture);
    if let Some(facing) = options.facing {
        session_config.constraints.facing = facing;
    }
    session_config.constraints.audio = options.audio;

    let backend = get_backend(
        options.backend.unwrap_or(config.capture.backend),
        options.device.as_deref(),
    )?;
    let mut session = CaptureSession::new(session_config, backend, Arc::new(SystemClock::new()), previews);
    println!(
        "Opening {} camera via {}...",
        options.facing.unwrap_or(config.capture.constraints.facing).as_str(),
        session.backend_name()
    );

    if let Err(e) = session.acquire().await {
        let message = session.error_message().map(str::to_string).unwrap_or_else(|| e.to_string());
        anyhow::bail!("{message}");
    }

    if let Err(e) = session.start() {
        let message = session.error_message().map(str::to_string).unwrap_or_else(|| e.to_string());
        anyhow::bail!("{message}");
    }
    if let Some(encoding) = &session.record().encoding {
        println!("Recording as {encoding}");
    } else {
        println!("Recording with the platform default format");
    }
    println!("Press Ctrl+C to stop early.");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(options.seconds);
    let mut shown = u64::MAX;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                tracing::info!("Interrupted; stopping recording");
                break;
            }
            _ = tokio::time::sleep_until(deadline) => break,
            event = session.next_event() => {
                let Some(event) = event else { break };
                session.handle_event(event).await?;
                if session.status() != SessionStatus::Recording {
                    break;
                }
                let elapsed = session.elapsed_secs();
                if elapsed != shown {
                    shown = elapsed;
                    println!("  REC {}", format_elapsed(elapsed));
                }
            }
        }
    }

    if session.status() == SessionStatus::Errored {
        anyhow::bail!(
            "{}",
            session.error_message().unwrap_or("Recording failed. Please try again.")
        );
    }

    session.stop()?;
    let artifact = session.wait_for_artifact().await?;
    Ok(artifact)
}

pub async fn run(
    config: &AppConfig,
    options: CaptureOptions,
    out: Option<PathBuf>,
    frame_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("VideoBank Recorder");
    println!("{}", "=".repeat(50));

    let previews = Arc::new(InMemoryPreviewRegistry::new());
    let Some(artifact) = capture(config, &options, previews.clone()).await? else {
        println!("Recording produced no output.");
        return Ok(());
    };

    let out = out.unwrap_or_else(|| default_output_path(artifact.video.mime_type()));
    std::fs::write(&out, artifact.video.bytes())
        .with_context(|| format!("Failed to write video to {}", out.display()))?;

    if let Some(frame_out) = &frame_out {
        write_frame(frame_out, artifact.frame.base64_payload())?;
    }
    previews.release(&artifact.preview);

    let estimate = EarningsEstimator::from(&config.earnings).estimate(artifact.duration_secs);

    println!();
    println!("Recording complete!");
    println!("  Duration:  {}", format_elapsed(artifact.duration_secs));
    println!("  Format:    {}", artifact.video.mime_type());
    println!("  Size:      {} bytes", artifact.video.len());
    println!("  Video:     {}", out.display());
    if let Some(frame_out) = &frame_out {
        println!("  Frame:     {}", frame_out.display());
    } else if artifact.frame.is_placeholder() {
        println!("  Frame:     (none captured)");
    }
    println!("  Estimate:  {}", format_payout(estimate));

    Ok(())
}

fn default_output_path(mime_type: &str) -> PathBuf {
    let extension = if mime_type.starts_with("video/mp4") { "mp4" } else { "webm" };
    let stamp = unix_stamp();
    PathBuf::from(format!("videobank-{stamp}.{extension}"))
}

fn unix_stamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn write_frame(path: &Path, payload: &str) -> anyhow::Result<()> {
    if payload.is_empty() {
        tracing::warn!("No still frame was captured; skipping {}", path.display());
        return Ok(());
    }
    let jpeg = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .context("Still frame is not valid base64")?;
    std::fs::write(path, jpeg).with_context(|| format!("Failed to write frame to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_extension_follows_container() {
        assert!(default_output_path("video/mp4;codecs=avc1").to_string_lossy().ends_with(".mp4"));
        assert!(default_output_path("video/webm").to_string_lossy().ends_with(".webm"));
    }
}
