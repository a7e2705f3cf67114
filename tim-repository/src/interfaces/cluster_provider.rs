//! Cluster provider trait definition.
//!
//! This module defines the abstract interface for cluster operations, allowing the
//! bulk engine and the index service to run against OpenSearch or an in-memory fake.

use async_trait::async_trait;
use serde_json::Value;

use tim_shared::{AliasEntry, ClusterInfo, IndexSummary};

use crate::errors::TimError;
use crate::types::AliasAction;

/// Abstracts the cluster the index manager talks to.
///
/// Each method maps onto one cluster endpoint. Implementations are responsible for
/// turning the cluster's structural failures into the typed `TimError` variants
/// listed on each method; every other failure is returned unclassified.
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// Basic information about the cluster.
    async fn info(&self) -> Result<ClusterInfo, TimError>;

    /// Every alias-to-index link in the cluster.
    async fn cat_aliases(&self) -> Result<Vec<AliasEntry>, TimError>;

    /// Summary rows for every index in the cluster.
    async fn cat_indices(&self) -> Result<Vec<IndexSummary>, TimError>;

    /// Whether an index with this exact name exists.
    async fn index_exists(&self, index: &str) -> Result<bool, TimError>;

    /// Create an index with the given settings and mappings body.
    ///
    /// Returns the created index name.
    ///
    /// # Errors
    ///
    /// * `TimError::IndexExists` - If an index with that name already exists
    async fn create_index(&self, index: &str, body: &Value) -> Result<String, TimError>;

    /// Delete an index.
    ///
    /// # Errors
    ///
    /// * `TimError::IndexNotFound` - If the index does not exist
    async fn delete_index(&self, index: &str) -> Result<(), TimError>;

    /// Alias names linked to one index, in any order.
    ///
    /// # Errors
    ///
    /// * `TimError::IndexNotFound` - If the index does not exist
    async fn index_aliases(&self, index: &str) -> Result<Vec<String>, TimError>;

    /// Apply all alias actions in one atomic request.
    ///
    /// Either every action is applied or none is.
    ///
    /// # Errors
    ///
    /// * `TimError::IndexNotFound` - If any action names a missing index
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), TimError>;

    /// Unlink one alias from one index.
    ///
    /// # Errors
    ///
    /// * `TimError::IndexNotFound` - If the index does not exist
    /// * `TimError::AliasNotFound` - If the alias is not linked to the index
    async fn delete_alias(&self, index: &str, alias: &str) -> Result<(), TimError>;

    /// Send one bulk request.
    ///
    /// `lines` are the newline-delimited JSON lines of the request body, without
    /// their trailing newlines. Returns the raw `items` array of the response, one
    /// entry per action, in submission order.
    async fn bulk(&self, index: &str, lines: Vec<String>) -> Result<Vec<Value>, TimError>;

    /// Make recent writes to the index visible to searches.
    async fn refresh(&self, index: &str) -> Result<(), TimError>;
}
