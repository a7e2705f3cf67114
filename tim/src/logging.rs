//! Tracing subscriber set-up.

use tracing::info;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, Settings};
use crate::errors::CommandError;

/// Build the event filter.
///
/// `rust_log` (the `RUST_LOG` value) replaces the default level when present.
/// Targets listed in `WARNING_ONLY_LOGGERS` are capped at `warn` either way.
pub fn build_filter(
    verbose: bool,
    settings: &Settings,
    rust_log: Option<&str>,
) -> Result<EnvFilter, CommandError> {
    let base = match rust_log.filter(|value| !value.trim().is_empty()) {
        Some(value) => value.to_string(),
        None if verbose => "debug".to_string(),
        None => "info".to_string(),
    };
    let mut filter = EnvFilter::try_new(&base)
        .map_err(|e| CommandError::config(format!("Invalid log filter '{}': {}", base, e)))?;

    for target in &settings.warning_only_loggers {
        let directive: Directive = format!("{}=warn", target).parse().map_err(|e| {
            CommandError::config(format!("Invalid logger name '{}': {}", target, e))
        })?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

/// Install the global subscriber.
///
/// Error events are also forwarded to Sentry; the layer is inert until a
/// client is bound with [`crate::reporting::ErrorReporting::init`].
pub fn init_tracing(verbose: bool, settings: &Settings) -> Result<(), CommandError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(verbose, settings, rust_log.as_deref())?;
    let level = if verbose { "debug" } else { "info" };

    let installed = match settings.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(sentry_tracing::layer())
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .pretty(),
            )
            .with(sentry_tracing::layer())
            .try_init(),
    };
    installed
        .map_err(|e| CommandError::config(format!("Failed to initialize logging: {}", e)))?;

    info!(
        service_version = env!("CARGO_PKG_VERSION"),
        level = level,
        format = ?settings.log_format,
        "Logger configured with level={}",
        level.to_uppercase()
    );
    if let Some(workspace) = &settings.workspace {
        info!(workspace = %workspace, "Running in workspace '{}'", workspace);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        let settings = Settings::default();
        assert_eq!(build_filter(false, &settings, None).unwrap().to_string(), "info");
        assert_eq!(build_filter(true, &settings, None).unwrap().to_string(), "debug");
    }

    #[test]
    fn test_rust_log_wins() {
        let settings = Settings::default();
        let filter = build_filter(true, &settings, Some("tim=trace")).unwrap();
        assert_eq!(filter.to_string(), "tim=trace");
    }

    #[test]
    fn test_warning_only_loggers() {
        let settings = Settings {
            warning_only_loggers: vec!["hyper".to_string()],
            ..Settings::default()
        };
        let filter = build_filter(false, &settings, None).unwrap().to_string();
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("info"));
    }
}
