//! # TIM Repository
//!
//! This crate provides the cluster-facing half of the TIMDEX index manager: the
//! `ClusterProvider` trait and its OpenSearch implementation, the bulk action
//! encoder and execution engine, and the `IndexService` that owns the alias
//! promotion protocol.

pub mod bulk;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod service;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod types;
pub mod utils;

pub use bulk::{
    bulk_delete, bulk_index, bulk_update, generate_bulk_actions, BulkAction, BulkActions,
    BulkItemOutcome, BulkOperation,
};
pub use config::BulkConfig;
pub use errors::TimError;
pub use interfaces::ClusterProvider;
pub use opensearch::{IndexConfig, OpenSearchProvider, DEFAULT_AWS_REGION};
pub use service::IndexService;
pub use types::AliasAction;
pub use utils::format_thousands;
