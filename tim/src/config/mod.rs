//! Start-up configuration for the command line.
//!
//! Everything is read from the environment once, after `.env` files are
//! loaded, and passed down explicitly.

pub mod dependencies;

pub use dependencies::Dependencies;

use std::env;

use tim_repository::DEFAULT_AWS_REGION;

use crate::errors::CommandError;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Environment-derived settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Deployment environment tag (`WORKSPACE`), logged at start-up.
    pub workspace: Option<String>,
    /// Log targets only allowed to emit warnings and errors (`WARNING_ONLY_LOGGERS`).
    pub warning_only_loggers: Vec<String>,
    /// Log output format (`LOG_FORMAT`).
    pub log_format: LogFormat,
    /// Region used to sign requests to an AWS-hosted cluster (`AWS_REGION`).
    pub aws_region: String,
    /// Where error events are reported (`SENTRY_DSN`). "none" disables reporting.
    pub sentry_dsn: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace: None,
            warning_only_loggers: Vec::new(),
            log_format: LogFormat::default(),
            aws_region: DEFAULT_AWS_REGION.to_string(),
            sentry_dsn: None,
        }
    }
}

impl Settings {
    /// Read the settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WORKSPACE`: environment tag, e.g. "dev" or "prod"
    /// - `WARNING_ONLY_LOGGERS`: comma-separated log targets limited to warnings
    /// - `LOG_FORMAT`: "pretty" or "json" (default: pretty)
    /// - `AWS_REGION`: region of an AWS-hosted cluster (default: us-east-1)
    /// - `SENTRY_DSN`: Sentry DSN, unset or "none" to disable error reporting
    pub fn from_env() -> Result<Self, CommandError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CommandError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let log_format = match lookup("LOG_FORMAT") {
            None => defaults.log_format,
            Some(value) => match value.trim().to_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                other => {
                    return Err(CommandError::config(format!(
                        "LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                        other
                    )))
                }
            },
        };

        let warning_only_loggers = lookup("WARNING_ONLY_LOGGERS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            workspace: lookup("WORKSPACE"),
            warning_only_loggers,
            log_format,
            aws_region: lookup("AWS_REGION").unwrap_or(defaults.aws_region),
            sentry_dsn: lookup("SENTRY_DSN")
                .map(|dsn| dsn.trim().to_string())
                .filter(|dsn| !dsn.eq_ignore_ascii_case("none")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.aws_region, "us-east-1");
    }

    #[test]
    fn test_values() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("WORKSPACE", "test"),
            ("WARNING_ONLY_LOGGERS", "opensearch, hyper,,"),
            ("LOG_FORMAT", "JSON"),
            ("AWS_REGION", "us-west-2"),
            ("SENTRY_DSN", "https://key@o0.ingest.sentry.io/123"),
        ]))
        .unwrap();
        assert_eq!(settings.workspace.as_deref(), Some("test"));
        assert_eq!(settings.warning_only_loggers, vec!["opensearch", "hyper"]);
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.aws_region, "us-west-2");
        assert_eq!(
            settings.sentry_dsn.as_deref(),
            Some("https://key@o0.ingest.sentry.io/123")
        );
    }

    #[test]
    fn test_sentry_dsn_none_disables_reporting() {
        for value in ["none", "None", "NONE"] {
            let settings = Settings::from_lookup(lookup_from(&[("SENTRY_DSN", value)])).unwrap();
            assert_eq!(settings.sentry_dsn, None);
        }
    }

    #[test]
    fn test_empty_values_are_unset() {
        let settings =
            Settings::from_lookup(lookup_from(&[("WORKSPACE", ""), ("AWS_REGION", " ")])).unwrap();
        assert_eq!(settings.workspace, None);
        assert_eq!(settings.aws_region, "us-east-1");
    }

    #[test]
    fn test_invalid_log_format() {
        let err = Settings::from_lookup(lookup_from(&[("LOG_FORMAT", "xml")])).unwrap_err();
        assert!(matches!(err, CommandError::Config(_)));
    }
}
