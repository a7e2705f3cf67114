//! Error types for the command line.

use thiserror::Error;

use tim_repository::TimError;

use crate::reader::ReaderError;

/// Exit status for a successful command.
pub const EXIT_SUCCESS: u8 = 0;

/// Exit status for a command that failed or was aborted.
pub const EXIT_FAILURE: u8 = 1;

/// Exit status for invalid usage.
pub const EXIT_USAGE: u8 = 2;

/// Errors that end a command.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The arguments are valid on their own but not together, or name
    /// something that is not in the cluster.
    #[error("Usage error: {0}")]
    Usage(String),

    /// The command stopped on purpose, e.g. a declined confirmation.
    #[error("Aborted!")]
    Aborted,

    /// Cluster operation error.
    #[error(transparent)]
    Repository(#[from] TimError),

    /// Dataset read error.
    #[error(transparent)]
    Reader(#[from] ReaderError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Console read or write failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommandError {
    /// Create a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CommandError::usage("bad").exit_code(), EXIT_USAGE);
        assert_eq!(CommandError::Aborted.exit_code(), EXIT_FAILURE);
        assert_eq!(CommandError::config("bad").exit_code(), EXIT_FAILURE);
        assert_eq!(
            CommandError::from(TimError::index_not_found("test-index")).exit_code(),
            EXIT_FAILURE
        );
    }

    #[test]
    fn test_repository_errors_keep_their_message() {
        let err = CommandError::from(TimError::index_exists("test-index"));
        assert_eq!(
            err.to_string(),
            "Index 'test-index' already exists in the cluster, cannot create."
        );
    }
}
