//! Error reporting to Sentry.
//!
//! Reporting is on when `SENTRY_DSN` holds a DSN. Error-level events then
//! reach Sentry through the `sentry-tracing` layer installed by
//! [`crate::logging::init_tracing`], tagged with the workspace as environment.

use std::borrow::Cow;

use sentry::types::Dsn;
use sentry::{ClientInitGuard, ClientOptions};

use crate::config::Settings;
use crate::errors::CommandError;

/// Handle on the Sentry client. Pending events are flushed when it is dropped.
pub struct ErrorReporting {
    guard: Option<ClientInitGuard>,
    environment: Option<String>,
}

impl ErrorReporting {
    /// Start the Sentry client when a DSN is configured.
    ///
    /// # Errors
    ///
    /// * `CommandError::Config` - If `SENTRY_DSN` is not a valid DSN
    pub fn init(settings: &Settings) -> Result<Self, CommandError> {
        let environment = settings.workspace.clone();
        let Some(dsn) = &settings.sentry_dsn else {
            return Ok(Self {
                guard: None,
                environment,
            });
        };

        let dsn: Dsn = dsn
            .parse()
            .map_err(|e| CommandError::config(format!("Invalid SENTRY_DSN: {}", e)))?;
        let guard = sentry::init(ClientOptions {
            dsn: Some(dsn),
            environment: environment.clone().map(Cow::Owned),
            release: sentry::release_name!(),
            ..Default::default()
        });

        Ok(Self {
            guard: Some(guard),
            environment,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.guard.as_ref().is_some_and(|guard| guard.is_enabled())
    }

    /// Start-up line describing whether exceptions go to Sentry.
    pub fn status_message(&self) -> String {
        status_message(self.is_enabled(), self.environment.as_deref())
    }
}

fn status_message(enabled: bool, environment: Option<&str>) -> String {
    if enabled {
        format!(
            "Sentry DSN found, exceptions will be sent to Sentry with env={}",
            environment.unwrap_or("None")
        )
    } else {
        "No Sentry DSN found, exceptions will not be sent to Sentry".to_string()
    }
}
