//! # TIM Shared
//!
//! This crate defines shared data structures and types used across the TIMDEX index
//! manager. It includes the record representation fed to bulk runs, the counters
//! those runs produce, the cluster summary shapes, and the source naming rules
//! that tie index names to their data origin.

pub mod types;

pub use types::bulk_result::BulkResult;
pub use types::cluster::{AliasEntry, AliasMap, ClusterInfo, ClusterVersion, IndexSummary};
pub use types::record::{Record, RecordError, RECORD_ID_FIELD};
pub use types::source::{
    generate_index_name, generate_index_name_at, source_from_index, validate_index_name,
    IndexNameError, INDEX_TIMESTAMP_FORMAT, PRIMARY_ALIAS, VALID_SOURCES,
};
