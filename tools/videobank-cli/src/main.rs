//! VideoBank CLI: record work videos, review them, and estimate payouts.
//!
//! Usage:
//!   videobank record [OPTIONS]     Record from the camera
//!   videobank analyze <IMAGE>      Suggest tags for a JPEG still
//!   videobank earnings <SECONDS>   Estimate the payout for a duration
//!   videobank flow [OPTIONS]       Record, review and submit in one go
//!   videobank check                Report backend encoder support
//!   videobank config [--init]      Show or write the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use videobank_common::config::{AppConfig, BackendKind};
use videobank_media_model::FacingMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "videobank",
    about = "Record, tag and submit skilled-work videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a video from the camera
    Record {
        /// Recording length in seconds (Ctrl+C stops early)
        #[arg(short, long, default_value = "5")]
        seconds: u64,

        /// Camera to use: rear|front
        #[arg(long)]
        facing: Option<FacingMode>,

        /// Record without the microphone
        #[arg(long)]
        no_audio: bool,

        /// Capture backend: synthetic|gstreamer
        #[arg(long, value_parser = parse_backend)]
        backend: Option<BackendKind>,

        /// Camera device node to open (gstreamer backend), e.g. /dev/video2
        #[arg(long)]
        device: Option<String>,

        /// Output file for the video
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output file for the still frame (JPEG)
        #[arg(long)]
        frame_out: Option<PathBuf>,
    },

    /// Suggest tags and a description for a JPEG still
    Analyze {
        /// Path to a JPEG image
        image: PathBuf,

        /// Use built-in suggestions instead of the AI service
        #[arg(long)]
        offline: bool,
    },

    /// Estimate the payout for a recording length
    Earnings {
        /// Recording length in seconds
        seconds: u64,
    },

    /// Record, auto-tag and submit a video end to end
    Flow {
        /// Recording length in seconds
        #[arg(short, long, default_value = "3")]
        seconds: u64,

        /// Capture backend: synthetic|gstreamer
        #[arg(long, value_parser = parse_backend)]
        backend: Option<BackendKind>,
    },

    /// Report which encodings the capture backend supports
    Check {
        /// Capture backend: synthetic|gstreamer
        #[arg(long, value_parser = parse_backend)]
        backend: Option<BackendKind>,
    },

    /// Show the effective configuration
    Config {
        /// Write the configuration file with current values
        #[arg(long)]
        init: bool,
    },
}

fn parse_backend(value: &str) -> Result<BackendKind, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "synthetic" => Ok(BackendKind::Synthetic),
        "gstreamer" | "gst" => Ok(BackendKind::Gstreamer),
        other => Err(format!("unknown backend '{other}' (expected synthetic or gstreamer)")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    videobank_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Record {
            seconds,
            facing,
            no_audio,
            backend,
            device,
            out,
            frame_out,
        } => {
            let options = commands::record::CaptureOptions {
                seconds,
                facing,
                audio: !no_audio,
                backend,
                device,
            };
            commands::record::run(&config, options, out, frame_out).await
        }
        Commands::Analyze { image, offline } => commands::analyze::run(&config, image, offline).await,
        Commands::Earnings { seconds } => commands::earnings::run(&config, seconds),
        Commands::Flow { seconds, backend } => commands::flow::run(&config, seconds, backend).await,
        Commands::Check { backend } => commands::check::run(&config, backend).await,
        Commands::Config { init } => commands::config::run(&config, init),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_record_options() {
        let cli = Cli::try_parse_from([
            "videobank",
            "record",
            "--seconds",
            "12",
            "--facing",
            "front",
            "--no-audio",
            "--backend",
            "gstreamer",
            "--device",
            "/dev/video2",
        ])
        .unwrap();
        match cli.command {
            Commands::Record {
                seconds,
                facing,
                no_audio,
                backend,
                device,
                ..
            } => {
                assert_eq!(seconds, 12);
                assert_eq!(facing, Some(FacingMode::Front));
                assert!(no_audio);
                assert_eq!(backend, Some(BackendKind::Gstreamer));
                assert_eq!(device.as_deref(), Some("/dev/video2"));
            }
            _ => panic!("expected record"),
        }
    }

    #[test]
    fn rejects_unknown_facing_mode() {
        assert!(Cli::try_parse_from(["videobank", "record", "--facing", "sideways"]).is_err());
    }
}
