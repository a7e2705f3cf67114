//! Record action encoder.
//!
//! Turns a stream of records into bulk action descriptors for one target index.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Value};

use tim_shared::Record;

use crate::errors::TimError;

/// The four operation kinds the bulk endpoint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkOperation {
    Create,
    Index,
    Update,
    Delete,
}

impl BulkOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Index => "index",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for BulkOperation {
    type Err = TimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "index" => Ok(Self::Index),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(TimError::InvalidOperation(other.to_string())),
        }
    }
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bulk action against one document.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkAction {
    /// Add the document, failing if the id already exists.
    Create {
        index: String,
        id: String,
        document: Map<String, Value>,
    },
    /// Add the document or replace an existing one with the same id.
    Index {
        index: String,
        id: String,
        document: Map<String, Value>,
    },
    /// Merge the partial document into an existing one.
    Update {
        index: String,
        id: String,
        document: Map<String, Value>,
    },
    /// Remove the document with this id.
    Delete { index: String, id: String },
}

impl BulkAction {
    pub fn new(index: impl Into<String>, record: Record, operation: BulkOperation) -> Self {
        let index = index.into();
        let id = record.id().to_string();
        match operation {
            BulkOperation::Create => Self::Create {
                index,
                id,
                document: record.into_body(),
            },
            BulkOperation::Index => Self::Index {
                index,
                id,
                document: record.into_body(),
            },
            BulkOperation::Update => Self::Update {
                index,
                id,
                document: record.into_body(),
            },
            BulkOperation::Delete => Self::Delete { index, id },
        }
    }

    pub fn operation(&self) -> BulkOperation {
        match self {
            Self::Create { .. } => BulkOperation::Create,
            Self::Index { .. } => BulkOperation::Index,
            Self::Update { .. } => BulkOperation::Update,
            Self::Delete { .. } => BulkOperation::Delete,
        }
    }

    pub fn index(&self) -> &str {
        match self {
            Self::Create { index, .. }
            | Self::Index { index, .. }
            | Self::Update { index, .. }
            | Self::Delete { index, .. } => index,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Create { id, .. }
            | Self::Index { id, .. }
            | Self::Update { id, .. }
            | Self::Delete { id, .. } => id,
        }
    }

    /// The document sent with the action, if the kind carries one.
    pub fn document(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Create { document, .. }
            | Self::Index { document, .. }
            | Self::Update { document, .. } => Some(document),
            Self::Delete { .. } => None,
        }
    }

    /// Encode the action as newline-delimited JSON lines (without newlines).
    ///
    /// Delete actions are a single header line; every other kind is a header
    /// followed by the document line.
    pub fn to_lines(&self) -> Result<Vec<String>, TimError> {
        let header = json!({
            self.operation().as_str(): {
                "_index": self.index(),
                "_id": self.id(),
            }
        });
        let mut lines = vec![serde_json::to_string(&header)?];
        match self {
            Self::Create { document, .. } | Self::Index { document, .. } => {
                lines.push(serde_json::to_string(document)?);
            }
            Self::Update { document, .. } => {
                lines.push(serde_json::to_string(&json!({ "doc": document }))?);
            }
            Self::Delete { .. } => {}
        }
        Ok(lines)
    }
}

/// Lazy stream of bulk actions for one index and one operation kind.
///
/// Consumes the underlying record iterator once, one record per action.
#[derive(Debug)]
pub struct BulkActions<I> {
    index: String,
    records: I,
    operation: BulkOperation,
}

impl<I> BulkActions<I>
where
    I: Iterator<Item = Record>,
{
    pub fn new(index: impl Into<String>, records: I, operation: BulkOperation) -> Self {
        Self {
            index: index.into(),
            records,
            operation,
        }
    }

    pub fn operation(&self) -> BulkOperation {
        self.operation
    }
}

impl<I> Iterator for BulkActions<I>
where
    I: Iterator<Item = Record>,
{
    type Item = BulkAction;

    fn next(&mut self) -> Option<Self::Item> {
        self.records
            .next()
            .map(|record| BulkAction::new(self.index.clone(), record, self.operation))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

/// Build the action stream for `operation` given by name.
///
/// The name is checked before any record is touched, so an invalid kind
/// fails with `TimError::InvalidOperation` and yields nothing.
pub fn generate_bulk_actions<R>(
    index: &str,
    records: R,
    operation: &str,
) -> Result<BulkActions<R::IntoIter>, TimError>
where
    R: IntoIterator<Item = Record>,
{
    let operation = operation.parse::<BulkOperation>()?;
    Ok(BulkActions::new(index, records.into_iter(), operation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> Record {
        Record::try_from(json!({ "timdex_record_id": id, "other_fields": "some_data" })).unwrap()
    }

    #[test]
    fn test_generate_bulk_actions_index() {
        let mut actions =
            generate_bulk_actions("test-index", vec![record("12345")], "index").unwrap();

        let action = actions.next().unwrap();
        assert_eq!(action.operation(), BulkOperation::Index);
        assert_eq!(action.index(), "test-index");
        assert_eq!(action.id(), "12345");
        assert_eq!(action.document().unwrap()["other_fields"], "some_data");
        assert!(actions.next().is_none());
    }

    #[test]
    fn test_generate_bulk_actions_delete_has_no_document() {
        let mut actions =
            generate_bulk_actions("test-index", vec![Record::from_id("12345")], "delete").unwrap();

        let action = actions.next().unwrap();
        assert_eq!(
            action,
            BulkAction::Delete {
                index: "test-index".to_string(),
                id: "12345".to_string()
            }
        );
        let lines = action.to_lines().unwrap();
        assert_eq!(lines.len(), 1);
        let header: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(
            header,
            json!({ "delete": { "_index": "test-index", "_id": "12345" } })
        );
    }

    #[test]
    fn test_generate_bulk_actions_update_wraps_doc() {
        let action = generate_bulk_actions("test-index", vec![record("12345")], "update")
            .unwrap()
            .next()
            .unwrap();

        let lines = action.to_lines().unwrap();
        assert_eq!(lines.len(), 2);
        let doc: Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(doc["doc"]["timdex_record_id"], "12345");
        assert_eq!(doc["doc"]["other_fields"], "some_data");
    }

    #[test]
    fn test_create_and_index_send_record_as_source() {
        for operation in ["create", "index"] {
            let action = generate_bulk_actions("test-index", vec![record("12345")], operation)
                .unwrap()
                .next()
                .unwrap();
            let lines = action.to_lines().unwrap();

            let header: Value = serde_json::from_str(&lines[0]).unwrap();
            assert_eq!(header[operation]["_index"], "test-index");
            assert_eq!(header[operation]["_id"], "12345");
            let source: Value = serde_json::from_str(&lines[1]).unwrap();
            assert_eq!(
                source,
                json!({ "timdex_record_id": "12345", "other_fields": "some_data" })
            );
        }
    }

    #[test]
    fn test_generate_bulk_actions_invalid_operation() {
        let mut consumed = 0;
        let records = std::iter::from_fn(|| {
            consumed += 1;
            Some(record("12345"))
        });

        let err = generate_bulk_actions("test-index", records, "wrong").unwrap_err();
        assert!(matches!(err, TimError::InvalidOperation(ref op) if op == "wrong"));
        assert_eq!(
            err.to_string(),
            "Invalid action parameter, must be one of [create, delete, index, update]. Action passed was 'wrong'"
        );
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_actions_are_lazy_and_ordered() {
        let ids = ["a", "b", "c"];
        let actions = BulkActions::new(
            "test-index",
            ids.iter().map(|id| record(id)),
            BulkOperation::Index,
        );
        let produced: Vec<String> = actions.map(|a| a.id().to_string()).collect();
        assert_eq!(produced, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_operation_round_trip_names() {
        for name in ["create", "index", "update", "delete"] {
            assert_eq!(name.parse::<BulkOperation>().unwrap().to_string(), name);
        }
    }
}
