//! Bulk ingestion and deletion.
//!
//! Records are turned into bulk actions by the encoder in [`actions`], sent to
//! the cluster in size-bounded chunks by the engine in [`engine`], and every
//! per-item response is classified by [`outcome`].

mod actions;
mod engine;
mod outcome;

pub use actions::{generate_bulk_actions, BulkAction, BulkActions, BulkOperation};
pub use engine::{bulk_delete, bulk_index, bulk_update, execute};
pub use outcome::BulkItemOutcome;
