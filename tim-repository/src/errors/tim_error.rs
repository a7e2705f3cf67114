//! Index manager error types.
//!
//! This module defines the unified error type for all cluster operations. Structural
//! failures (missing index, existing index, missing alias) get their own variants so
//! callers can branch on them; anything else the cluster reports is carried as-is.

use thiserror::Error;

/// Unified errors from cluster operations.
///
/// Used by the `ClusterProvider` trait, the bulk engine and `IndexService`.
#[derive(Debug, Error)]
pub enum TimError {
    /// Validation error (e.g., empty endpoint).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid or unparsable configuration value.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Attempted to create an index that is already present.
    #[error("Index '{0}' already exists in the cluster, cannot create.")]
    IndexExists(String),

    /// An expected index is not present in the cluster.
    #[error("Index '{0}' not present in cluster. Check index name and try again.")]
    IndexNotFound(String),

    /// An alias is not linked to the given index.
    #[error("Alias '{alias}' not associated with index '{index}'. Check index aliases and try again.")]
    AliasNotFound { alias: String, index: String },

    /// Bulk operation kind outside the four the bulk endpoint understands.
    #[error("Invalid action parameter, must be one of [create, delete, index, update]. Action passed was '{0}'")]
    InvalidOperation(String),

    /// A document failed in a way that makes continuing the bulk run pointless.
    #[error("Error indexing record '{record}' into index '{index}'. Details: {error}")]
    BulkIndexing {
        record: String,
        index: String,
        error: String,
    },

    /// The cluster answered with an error the index manager does not classify.
    #[error("OpenSearch returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport-level failure from the client library.
    #[error("Client error: {0}")]
    Client(#[from] opensearch::Error),

    /// Failed to parse or produce JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read a local file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TimError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create an index exists error.
    pub fn index_exists(index: impl Into<String>) -> Self {
        Self::IndexExists(index.into())
    }

    /// Create an index not found error.
    pub fn index_not_found(index: impl Into<String>) -> Self {
        Self::IndexNotFound(index.into())
    }

    /// Create an alias not found error.
    pub fn alias_not_found(alias: impl Into<String>, index: impl Into<String>) -> Self {
        Self::AliasNotFound {
            alias: alias.into(),
            index: index.into(),
        }
    }

    /// Create a fatal bulk indexing error.
    pub fn bulk_indexing(
        record: impl Into<String>,
        index: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::BulkIndexing {
            record: record.into(),
            index: index.into(),
            error: error.into(),
        }
    }

    /// Create an unclassified API error.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Whether this is one of the structural errors callers are expected to handle.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::IndexExists(_) | Self::IndexNotFound(_) | Self::AliasNotFound { .. }
        )
    }
}
