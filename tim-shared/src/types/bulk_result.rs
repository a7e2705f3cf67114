//! Aggregate counters produced by a bulk run.

use serde::{Deserialize, Serialize};

/// Counters accumulated over one bulk run.
///
/// Every processed item bumps `total` once and exactly one of the other
/// counters, so `total == created + updated + deleted + errors` always holds.
/// Index and update runs never touch `deleted`; delete runs only touch
/// `deleted` and `errors`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResult {
    /// Documents that did not exist before the run.
    pub created: u64,
    /// Documents that replaced or patched an existing document.
    pub updated: u64,
    /// Documents removed by a delete run.
    pub deleted: u64,
    /// Items that were counted as soft failures.
    pub errors: u64,
    /// Items processed.
    pub total: u64,
}

impl BulkResult {
    /// Create an all-zero result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of the per-outcome buckets; equals `total` for any finished run.
    pub fn outcomes(&self) -> u64 {
        self.created + self.updated + self.deleted + self.errors
    }
}

impl std::ops::Add for BulkResult {
    type Output = BulkResult;

    fn add(self, other: Self) -> Self::Output {
        BulkResult {
            created: self.created + other.created,
            updated: self.updated + other.updated,
            deleted: self.deleted + other.deleted,
            errors: self.errors + other.errors,
            total: self.total + other.total,
        }
    }
}
