//! Suggest tags for a still frame.

use std::path::PathBuf;

use anyhow::Context;
use base64::Engine;
use videobank_common::config::AppConfig;
use videobank_media_model::StillFrame;
use videobank_review::{analyze_or_fallback, AnalysisService, GeminiAnalysisService, StaticAnalysisService};

pub async fn run(config: &AppConfig, image: PathBuf, offline: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(&image).with_context(|| format!("Failed to read {}", image.display()))?;
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        anyhow::bail!("{} is not a JPEG image", image.display());
    }
    let frame = StillFrame::from_jpeg_base64(base64::engine::general_purpose::STANDARD.encode(&bytes));

    let service: Box<dyn AnalysisService> = if offline {
        Box::new(StaticAnalysisService::default())
    } else {
        match GeminiAnalysisService::from_config(&config.analysis) {
            Ok(service) => Box::new(service),
            Err(e) => {
                tracing::warn!("{e}; using built-in suggestions");
                Box::new(StaticAnalysisService::default())
            }
        }
    };

    let analysis = analyze_or_fallback(service.as_ref(), &frame).await;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
