//! Index lifecycle service.
//!
//! This module provides the main service for managing indexes and aliases.
//! Command code uses it to create, promote, demote and delete indexes, and to
//! run bulk loads against them.
//!
//! # Alias promotion
//!
//! Every index belongs to a source, given by its name prefix. Promoting an index
//! links it to the primary alias, to every alias already holding an index of the
//! same source, and to any extra aliases requested, while unlinking the other
//! same-source indexes from those aliases. All of it is sent as a single alias
//! update request, so the cluster applies it atomically and readers never see
//! an alias without an index for the source.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, info};

use tim_shared::{
    generate_index_name, source_from_index, AliasMap, BulkResult, IndexSummary, Record,
    PRIMARY_ALIAS,
};

use crate::bulk;
use crate::config::BulkConfig;
use crate::errors::TimError;
use crate::interfaces::ClusterProvider;
use crate::opensearch::IndexConfig;
use crate::types::AliasAction;
use crate::utils::format_thousands;

/// The main service for managing the cluster's indexes.
///
/// Wraps a `ClusterProvider` and adds the alias protocol, the cluster views
/// printed by the CLI, and the bulk runs.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tim_repository::{BulkConfig, IndexConfig, IndexService, OpenSearchProvider};
///
/// # async fn example() -> Result<(), tim_repository::TimError> {
/// let provider = OpenSearchProvider::connect("localhost", "us-east-1", BulkConfig::default()).await?;
/// let service = IndexService::new(Arc::new(provider), IndexConfig::embedded()?, BulkConfig::default());
///
/// let index = service.create_index("alma-2022-09-01t00-00-00").await?;
/// service.promote_index(&index, &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct IndexService {
    provider: Arc<dyn ClusterProvider>,
    index_config: IndexConfig,
    bulk_config: BulkConfig,
}

impl IndexService {
    pub fn new(
        provider: Arc<dyn ClusterProvider>,
        index_config: IndexConfig,
        bulk_config: BulkConfig,
    ) -> Self {
        Self {
            provider,
            index_config,
            bulk_config,
        }
    }

    pub fn provider(&self) -> &dyn ClusterProvider {
        self.provider.as_ref()
    }

    pub fn bulk_config(&self) -> &BulkConfig {
        &self.bulk_config
    }

    // Cluster views

    /// Basic cluster information, formatted for display.
    pub async fn formatted_info(&self) -> Result<String, TimError> {
        let info = self.provider.info().await?;
        Ok(format!(
            "\nName: {}\nUUID: {}\nOpenSearch version: {}\nLucene version: {}\n",
            info.cluster_name,
            info.cluster_uuid,
            info.version.number,
            info.version.lucene_version
        ))
    }

    /// Every alias with its member indexes.
    ///
    /// Returns `None` when the cluster has no aliases.
    pub async fn get_aliases(&self) -> Result<Option<AliasMap>, TimError> {
        let entries = self.provider.cat_aliases().await?;
        debug!(count = entries.len(), "Fetched alias entries");

        let mut aliases = AliasMap::new();
        for entry in entries {
            aliases.entry(entry.alias).or_default().push(entry.index);
        }
        Ok((!aliases.is_empty()).then_some(aliases))
    }

    /// Every alias with its sorted member indexes, formatted for display.
    pub async fn formatted_aliases(&self) -> Result<String, TimError> {
        let mut output = String::from("Current state of all aliases:");
        match self.get_aliases().await? {
            Some(aliases) => {
                for (alias, mut indexes) in aliases {
                    indexes.sort();
                    output.push_str(&format!("\nAlias: {}", alias));
                    output.push_str(&format!("\n  Indexes: {}\n", indexes.join(", ")));
                }
            }
            None => output.push_str("\nNo aliases present in OpenSearch cluster.\n"),
        }
        Ok(output)
    }

    /// Summary rows of every index, sorted by name.
    ///
    /// Returns `None` when the cluster has no indexes.
    pub async fn get_indexes(&self) -> Result<Option<Vec<IndexSummary>>, TimError> {
        let mut indexes = self.provider.cat_indices().await?;
        indexes.sort_by(|a, b| a.index.cmp(&b.index));
        Ok((!indexes.is_empty()).then_some(indexes))
    }

    /// Every index with its aliases and summary information, formatted for display.
    pub async fn formatted_indexes(&self) -> Result<String, TimError> {
        let output = String::from("Current state of all indexes:");
        let Some(indexes) = self.get_indexes().await? else {
            return Ok(output + " No indexes present in OpenSearch cluster.");
        };

        let mut output = output + "\n";
        for summary in indexes {
            let aliases = self
                .get_index_aliases(&summary.index)
                .await?
                .map_or_else(|| "None".to_string(), |aliases| aliases.join(", "));
            output.push_str(&format!(
                "\nName: {}\n  Aliases: {}\n  Status: {}\n  Health: {}\n  Documents: {}\n  \
                 Primary store size: {}\n  Total store size: {}\n  UUID: {}\n  \
                 Primary Shards: {}\n  Replica Shards: {}\n",
                summary.index,
                aliases,
                display(&summary.status),
                display(&summary.health),
                display_count(summary.document_count()),
                display(&summary.pri_store_size),
                display(&summary.store_size),
                display(&summary.uuid),
                display_count(summary.primary_shards()),
                display_count(summary.replica_shards()),
            ));
        }
        Ok(output)
    }

    // Index lifecycle

    /// Create an index with the configured settings and mappings.
    ///
    /// Returns the created index name.
    ///
    /// # Errors
    ///
    /// * `TimError::IndexExists` - If an index with that name already exists
    pub async fn create_index(&self, name: &str) -> Result<String, TimError> {
        let body = self.index_config.request_body();
        let index = self.provider.create_index(name, &body).await?;
        debug!(index = %index, "Index created");
        Ok(index)
    }

    /// Delete an index.
    ///
    /// # Errors
    ///
    /// * `TimError::IndexNotFound` - If the index does not exist
    pub async fn delete_index(&self, name: &str) -> Result<(), TimError> {
        self.provider.delete_index(name).await?;
        debug!(index = %name, "Index deleted");
        Ok(())
    }

    /// Return the source's primary index, or create a new index for the source.
    ///
    /// With `force_new` a new index is always created. The returned flag is
    /// `true` when the index was created. A new index is never promoted here.
    pub async fn get_or_create_index_from_source(
        &self,
        source: &str,
        force_new: bool,
    ) -> Result<(String, bool), TimError> {
        if !force_new {
            if let Some(index) = self.get_primary_index_for_source(source).await? {
                debug!(source = %source, index = %index, "Primary index found for source");
                return Ok((index, false));
            }
            debug!(
                source = %source,
                "No current primary index found for source, creating a new index."
            );
        }
        let index = self.create_index(&generate_index_name(source)).await?;
        Ok((index, true))
    }

    // Aliases

    /// Sorted alias names of an index, or `None` if it has none.
    ///
    /// # Errors
    ///
    /// * `TimError::IndexNotFound` - If the index does not exist
    pub async fn get_index_aliases(&self, index: &str) -> Result<Option<Vec<String>>, TimError> {
        let mut aliases = self.provider.index_aliases(index).await?;
        aliases.sort();
        Ok((!aliases.is_empty()).then_some(aliases))
    }

    /// For every alias, the member indexes belonging to `source`.
    ///
    /// Aliases without a member for the source are left out; `None` is returned
    /// when no alias has one. More than one member per alias is unexpected; it
    /// is logged and returned as found.
    pub async fn get_all_aliased_indexes_for_source(
        &self,
        source: &str,
    ) -> Result<Option<AliasMap>, TimError> {
        let Some(aliases) = self.get_aliases().await? else {
            return Ok(None);
        };
        debug!(aliases = ?aliases, "Current aliases");

        let mut result = AliasMap::new();
        for (alias, indexes) in aliases {
            let source_indexes: Vec<String> = indexes
                .into_iter()
                .filter(|index| source_from_index(index) == source)
                .collect();
            if source_indexes.len() > 1 {
                error!(
                    alias = %alias,
                    source = %source,
                    indexes = ?source_indexes,
                    "Alias '{}' had multiple existing indexes for source '{}': {:?}",
                    alias,
                    source,
                    source_indexes
                );
            }
            if !source_indexes.is_empty() {
                result.insert(alias, source_indexes);
            }
        }
        Ok((!result.is_empty()).then_some(result))
    }

    /// The source's index in the primary alias, if any.
    pub async fn get_primary_index_for_source(
        &self,
        source: &str,
    ) -> Result<Option<String>, TimError> {
        Ok(self
            .get_all_aliased_indexes_for_source(source)
            .await?
            .and_then(|mut aliases| aliases.remove(PRIMARY_ALIAS))
            .and_then(|indexes| indexes.into_iter().next()))
    }

    /// Promote an index to every alias it should be in.
    ///
    /// The index joins the primary alias, every alias currently holding an index
    /// of its source, and `extra_aliases` (created if missing). Other indexes of
    /// the same source leave those aliases. Applied as one atomic request, and
    /// promoting an already promoted index changes nothing.
    ///
    /// # Errors
    ///
    /// * `TimError::IndexNotFound` - If the index does not exist; no alias changes
    pub async fn promote_index(&self, index: &str, extra_aliases: &[String]) -> Result<(), TimError> {
        let source = source_from_index(index);
        let current = self
            .get_all_aliased_indexes_for_source(source)
            .await?
            .unwrap_or_default();

        let targets: BTreeSet<&str> = std::iter::once(PRIMARY_ALIAS)
            .chain(current.keys().map(String::as_str))
            .chain(extra_aliases.iter().map(String::as_str))
            .collect();

        let mut actions: Vec<AliasAction> = targets
            .into_iter()
            .map(|alias| AliasAction::add(index, alias))
            .collect();
        for (alias, indexes) in &current {
            actions.extend(
                indexes
                    .iter()
                    .filter(|existing| existing.as_str() != index)
                    .map(|existing| AliasAction::remove(existing.as_str(), alias.as_str())),
            );
        }

        match self.provider.update_aliases(&actions).await {
            Ok(()) => {
                info!(index = %index, actions = actions.len(), "Index promoted");
                Ok(())
            }
            Err(TimError::IndexNotFound(_)) => Err(TimError::index_not_found(index)),
            Err(e) => Err(e),
        }
    }

    /// Unlink one alias from one index.
    ///
    /// # Errors
    ///
    /// * `TimError::IndexNotFound` - If the index does not exist
    /// * `TimError::AliasNotFound` - If the alias is not linked to the index
    pub async fn remove_alias(&self, index: &str, alias: &str) -> Result<(), TimError> {
        self.provider.delete_alias(index, alias).await?;
        debug!(index = %index, alias = %alias, "Alias removed");
        Ok(())
    }

    /// Remove every alias from an index, returning the removed aliases.
    pub async fn demote_index(&self, index: &str) -> Result<Vec<String>, TimError> {
        let aliases = self.get_index_aliases(index).await?.unwrap_or_default();
        for alias in &aliases {
            self.remove_alias(index, alias).await?;
        }
        Ok(aliases)
    }

    // Bulk runs

    /// Index records into `index`. See [`bulk::bulk_index`].
    pub async fn bulk_index<R>(&self, index: &str, records: R) -> Result<BulkResult, TimError>
    where
        R: IntoIterator<Item = Record>,
    {
        bulk::bulk_index(self.provider.as_ref(), index, records, &self.bulk_config).await
    }

    /// Delete records from `index`. See [`bulk::bulk_delete`].
    pub async fn bulk_delete<R>(&self, index: &str, records: R) -> Result<BulkResult, TimError>
    where
        R: IntoIterator<Item = Record>,
    {
        bulk::bulk_delete(self.provider.as_ref(), index, records, &self.bulk_config).await
    }

    /// Patch records in `index`. See [`bulk::bulk_update`].
    pub async fn bulk_update<R>(&self, index: &str, records: R) -> Result<BulkResult, TimError>
    where
        R: IntoIterator<Item = Record>,
    {
        bulk::bulk_update(self.provider.as_ref(), index, records, &self.bulk_config).await
    }
}

fn display(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

fn display_count(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), format_thousands)
}
