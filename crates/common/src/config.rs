//! Application configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use videobank_media_model::{default_encoding_priority, CaptureConstraints, EncodingCandidate};

use crate::error::{VideobankError, VideobankResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Camera capture settings.
    pub capture: CaptureDefaults,

    /// AI analysis collaborator settings.
    pub analysis: AnalysisConfig,

    /// Payout estimation.
    pub earnings: EarningsConfig,

    /// Submission collaborator settings.
    pub submission: SubmissionConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Which capture backend to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Software test-pattern camera.
    #[default]
    Synthetic,
    /// V4L2 camera and PulseAudio microphone through GStreamer.
    Gstreamer,
}

/// Default recording parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureDefaults {
    /// Camera/microphone request.
    pub constraints: CaptureConstraints,

    /// Encodings to try, best first.
    pub encodings: Vec<EncodingCandidate>,

    /// Period of the elapsed-time tick.
    pub tick_interval_ms: u64,

    /// JPEG quality of the analysis still, 1-100.
    pub still_quality: u8,

    /// Backend used by the CLI.
    pub backend: BackendKind,
}

/// AI analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Base URL of the generative model API.
    pub endpoint: String,

    /// Model identifier.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Request timeout.
    pub timeout_secs: u64,
}

/// Payout estimation parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EarningsConfig {
    /// Payout per recorded second.
    pub rate_per_second: f64,

    /// Floor applied to every estimate.
    pub minimum_payout: f64,
}

/// Submission collaborator settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Artificial upload delay.
    pub simulated_latency_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "videobank=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            constraints: CaptureConstraints::default(),
            encodings: default_encoding_priority(),
            tick_interval_ms: 1000,
            still_quality: 80,
            backend: BackendKind::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for EarningsConfig {
    fn default() -> Self {
        Self {
            rate_per_second: 0.15,
            minimum_payout: 0.50,
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            simulated_latency_ms: 1500,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match Self::from_json(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Parse and validate a JSON document.
    pub fn from_json(content: &str) -> VideobankResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> VideobankResult<PathBuf> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, json)?;
        Ok(config_path)
    }

    /// Reject values the capture pipeline cannot work with.
    pub fn validate(&self) -> VideobankResult<()> {
        let capture = &self.capture;
        if capture.encodings.is_empty() {
            return Err(VideobankError::config(
                "capture.encodings must list at least one candidate",
            ));
        }
        if capture.tick_interval_ms == 0 {
            return Err(VideobankError::config("capture.tick_interval_ms must be > 0"));
        }
        if !(1..=100).contains(&capture.still_quality) {
            return Err(VideobankError::config(format!(
                "capture.still_quality must be within 1..=100, got {}",
                capture.still_quality
            )));
        }
        if !(self.earnings.rate_per_second >= 0.0 && self.earnings.minimum_payout >= 0.0) {
            return Err(VideobankError::config(
                "earnings rate and minimum payout must be non-negative",
            ));
        }
        if self.analysis.timeout_secs == 0 {
            return Err(VideobankError::config("analysis.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("videobank").join("config.json")
}
