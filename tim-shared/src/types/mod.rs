//! This module defines the core data structures and types used across the index manager.
//! It re-exports specific types like `Record` and `BulkResult`.

pub mod bulk_result;
pub mod cluster;
pub mod record;
pub mod source;

pub use bulk_result::BulkResult;
pub use cluster::{AliasEntry, AliasMap, ClusterInfo, IndexSummary};
pub use record::Record;
