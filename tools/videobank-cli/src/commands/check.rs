//! Report what the capture backend can do.

use videobank_capture_engine::backend::get_backend;
use videobank_capture_engine::negotiation::select_encoding;
use videobank_common::config::{AppConfig, BackendKind};
use videobank_platform_core::probe_encoders;

pub async fn run(config: &AppConfig, backend: Option<BackendKind>) -> anyhow::Result<()> {
    println!("VideoBank System Check");
    println!("{}", "=".repeat(50));

    let kind = backend.unwrap_or(config.capture.backend);
    let backend = match get_backend(kind, None) {
        Ok(backend) => {
            println!("[OK] Capture backend: {}", backend.name());
            backend
        }
        Err(e) => {
            println!("[FAIL] Capture backend {kind:?}: {e}");
            return Ok(());
        }
    };

    println!();
    println!("Encodings (preferred first):");
    for report in probe_encoders(backend.as_ref(), &config.capture.encodings) {
        let marker = if report.supported { "[OK]" } else { "[--]" };
        println!("  {marker} {}", report.mime_type);
    }

    match select_encoding(&config.capture.encodings, |c| backend.is_type_supported(c.mime_type())) {
        Some(encoding) => println!("[OK] Recordings will use {encoding}"),
        None => println!("[WARN] No preferred encoding supported; the platform default will be used"),
    }

    println!();
    let key_env = &config.analysis.api_key_env;
    if std::env::var(key_env).is_ok_and(|k| !k.trim().is_empty()) {
        println!("[OK] AI analysis: {} via {key_env}", config.analysis.model);
    } else {
        println!("[WARN] AI analysis: {key_env} not set, built-in suggestions will be used");
    }

    Ok(())
}
