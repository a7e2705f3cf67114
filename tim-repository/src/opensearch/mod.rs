//! OpenSearch implementation of the cluster provider.
//!
//! This module provides a concrete implementation of `ClusterProvider`
//! using OpenSearch as the backend, and the settings and mappings every
//! new index is created with.

mod index_config;
mod provider;

pub use index_config::{IndexConfig, MAPPINGS_PATH_VAR};
pub use provider::{is_local_host, OpenSearchProvider, DEFAULT_AWS_REGION, LOCAL_HOSTS};
