//! Tracing setup for the `videobank` binary.

use tracing_subscriber::filter::EnvFilter;

use crate::config::LoggingConfig;

/// Level used when the configured filter does not parse.
const FALLBACK_FILTER: &str = "info";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `config.level`. Later calls leave the first
/// subscriber in place.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| configured_filter(&config.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };

    match installed {
        Ok(()) => tracing::debug!(level = %config.level, json = config.json, "Logging initialised"),
        Err(_) => tracing::trace!("Subscriber already installed"),
    }
}

fn configured_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{level}' ({e}); using '{FALLBACK_FILTER}'");
        EnvFilter::new(FALLBACK_FILTER)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn configured_level_is_used() {
        assert_eq!(configured_filter("debug").max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(
            configured_filter("videobank_capture_engine=trace,warn").max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }

    #[test]
    fn unparsable_level_falls_back_to_info() {
        assert_eq!(configured_filter("videobank=loud").max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn repeated_initialisation_is_harmless() {
        let config = LoggingConfig::default();
        init_logging(&config);
        init_logging(&LoggingConfig { json: true, ..config });
    }
}
