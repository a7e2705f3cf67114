//! Dependency initialization and wiring for the command line.

use std::sync::Arc;

use tracing::info;

use tim_repository::{BulkConfig, ClusterProvider, IndexConfig, IndexService, OpenSearchProvider};

use super::Settings;
use crate::errors::CommandError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// Index service bound to the configured cluster.
    pub service: IndexService,
}

impl Dependencies {
    /// Connect to the cluster at `endpoint` and load the index configuration.
    ///
    /// # Environment Variables
    ///
    /// - `TIM_MAPPINGS_PATH`: optional index settings and mappings file
    /// - `OPENSEARCH_BULK_MAX_CHUNK_BYTES`, `OPENSEARCH_BULK_MAX_RETRIES`,
    ///   `OPENSEARCH_REQUEST_TIMEOUT`, `STATUS_UPDATE_INTERVAL`: see [`BulkConfig::from_env`]
    pub async fn new(endpoint: &str, settings: &Settings) -> Result<Self, CommandError> {
        let bulk_config = BulkConfig::from_env()?;
        let index_config = IndexConfig::from_env()?;

        let provider = OpenSearchProvider::connect(endpoint, &settings.aws_region, bulk_config.clone())
            .await
            .map_err(|e| {
                CommandError::config(format!("Failed to create OpenSearch client: {}", e))
            })?;
        info!(endpoint = %endpoint, "OpenSearch client configured for endpoint '{}'", endpoint);

        Ok(Self::with_provider(Arc::new(provider), index_config, bulk_config))
    }

    /// Wire the dependencies around an existing provider.
    pub fn with_provider(
        provider: Arc<dyn ClusterProvider>,
        index_config: IndexConfig,
        bulk_config: BulkConfig,
    ) -> Self {
        Self {
            service: IndexService::new(provider, index_config, bulk_config),
        }
    }
}
