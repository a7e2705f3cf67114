//! Classification of per-item bulk responses.

use serde_json::Value;

use super::actions::BulkOperation;

/// Error type the cluster reports for documents that do not fit the mappings.
pub const MAPPER_PARSING_EXCEPTION: &str = "mapper_parsing_exception";

/// What one item of a bulk response means for the run.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkItemOutcome {
    Created,
    Updated,
    Deleted,
    /// The document to delete was not in the index.
    NotFound { id: String },
    /// The document was rejected by the mappings; the run continues.
    MapperParsing { id: String, error: Value },
    /// Any other item error; the run aborts.
    Fatal { id: String, error: Value },
    /// A response the engine does not recognize.
    Unexpected { item: Value },
}

impl BulkItemOutcome {
    /// Classify one item of a bulk response.
    ///
    /// Items look like `{"index": {"_id": "...", "result": "created", ...}}`,
    /// keyed by the operation kind. In delete runs an item error is never
    /// fatal; it is reported as unexpected.
    pub fn classify(operation: BulkOperation, item: &Value) -> Self {
        let Some(details) = item.get(operation.as_str()) else {
            return Self::Unexpected { item: item.clone() };
        };
        let id = details["_id"].as_str().unwrap_or_default().to_string();
        let result = details["result"].as_str();

        if operation == BulkOperation::Delete {
            return match result {
                Some("deleted") => Self::Deleted,
                Some("not_found") => Self::NotFound { id },
                _ => Self::Unexpected { item: item.clone() },
            };
        }

        if let Some(error) = details.get("error") {
            return if error["type"] == MAPPER_PARSING_EXCEPTION {
                Self::MapperParsing {
                    id,
                    error: error.clone(),
                }
            } else {
                Self::Fatal {
                    id,
                    error: error.clone(),
                }
            };
        }

        match result {
            Some("created") => Self::Created,
            Some("updated") => Self::Updated,
            _ => Self::Unexpected { item: item.clone() },
        }
    }

    /// Whether this outcome counts as an error in the run summary.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::MapperParsing { .. } | Self::Unexpected { .. }
        )
    }
}
