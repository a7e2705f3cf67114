//! Cluster summary types.
//!
//! These mirror the JSON shapes returned by the cluster's info and cat
//! endpoints. The cat endpoints report every value as a string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Alias name mapped to the names of its member indexes.
pub type AliasMap = BTreeMap<String, Vec<String>>;

/// Basic information about the cluster, from the root endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub cluster_name: String,
    pub cluster_uuid: String,
    pub version: ClusterVersion,
}

/// Version block of [`ClusterInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterVersion {
    pub number: String,
    pub lucene_version: String,
}

/// One row of the cat aliases endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub alias: String,
    pub index: String,
}

impl AliasEntry {
    pub fn new(alias: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            index: index.into(),
        }
    }
}

/// One row of the cat indices endpoint.
///
/// Closed indexes report no document counts or sizes, hence the options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexSummary {
    pub index: String,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub pri: Option<String>,
    #[serde(default)]
    pub rep: Option<String>,
    #[serde(rename = "docs.count", default)]
    pub docs_count: Option<String>,
    #[serde(rename = "pri.store.size", default)]
    pub pri_store_size: Option<String>,
    #[serde(rename = "store.size", default)]
    pub store_size: Option<String>,
}

impl IndexSummary {
    /// Document count, if the cluster reported a parsable one.
    pub fn document_count(&self) -> Option<u64> {
        self.docs_count.as_deref().and_then(|c| c.parse().ok())
    }

    /// Primary shard count, if reported.
    pub fn primary_shards(&self) -> Option<u64> {
        self.pri.as_deref().and_then(|c| c.parse().ok())
    }

    /// Replica shard count, if reported.
    pub fn replica_shards(&self) -> Option<u64> {
        self.rep.as_deref().and_then(|c| c.parse().ok())
    }
}
