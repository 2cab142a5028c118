use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::TelemetryError;

/// Installs the global `tracing` subscriber and routes `log` records into it.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a
/// subscriber or logger is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), &config.level)?;

    LogTracer::init().map_err(|e| TelemetryError::Install(e.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.map_err(|e| TelemetryError::Install(e.to_string()))
}

fn build_filter(env_directive: Option<&str>, level: &str) -> Result<EnvFilter, TelemetryError> {
    let directive = env_directive
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(level);

    EnvFilter::try_new(directive).map_err(|e| TelemetryError::Filter {
        directive: directive.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_config_level() {
        let filter = build_filter(None, "sterilog=debug").unwrap();
        assert_eq!(filter.to_string(), "sterilog=debug");
    }

    #[test]
    fn test_env_directive_wins() {
        let filter = build_filter(Some("warn"), "debug").unwrap();
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn test_blank_env_directive_ignored() {
        let filter = build_filter(Some("  "), "info").unwrap();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn test_invalid_directive() {
        assert!(matches!(
            build_filter(None, "sterilog=notalevel"),
            Err(TelemetryError::Filter { .. })
        ));
    }
}
