use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// The filter directive to use when `RUST_LOG` is unset.
pub fn fallback_level(config: &LoggingConfig, quiet: bool) -> &str {
    if quiet { "warn" } else { config.level.as_str() }
}

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins over the configured level. A configured level that does
/// not parse falls back to `info`.
pub fn init(config: &LoggingConfig, quiet: bool) {
    let level = fallback_level(config, quiet);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A second call, e.g. from a test harness, keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.with_target)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_lowers_to_warn() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(fallback_level(&config, false), "debug");
        assert_eq!(fallback_level(&config, true), "warn");
    }
}
