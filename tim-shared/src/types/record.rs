//! Transformed record types fed into bulk runs.
//!
//! A record is an arbitrary JSON object that must carry a unique
//! `timdex_record_id` string. The id is validated once at construction, so
//! everything downstream can rely on it being present.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Name of the field holding a record's unique identifier.
pub const RECORD_ID_FIELD: &str = "timdex_record_id";

/// Errors raised when a JSON value cannot be turned into a [`Record`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// The value was not a JSON object.
    #[error("Record must be a JSON object, got {0}")]
    NotAnObject(String),

    /// The object did not carry a string `timdex_record_id`.
    #[error("Record is missing the '{RECORD_ID_FIELD}' field")]
    MissingId,
}

/// A transformed record ready to be sent to the cluster.
///
/// `body` is the full document, including the id field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Record {
    id: String,
    body: Map<String, Value>,
}

impl Record {
    /// Build a record from a JSON object, validating the id field.
    pub fn from_object(body: Map<String, Value>) -> Result<Self, RecordError> {
        let id = body
            .get(RECORD_ID_FIELD)
            .and_then(Value::as_str)
            .ok_or(RecordError::MissingId)?
            .to_string();
        Ok(Self { id, body })
    }

    /// Build a minimal record carrying only its id.
    ///
    /// Used for delete runs, where the cluster only needs the document id.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut body = Map::new();
        body.insert(RECORD_ID_FIELD.to_string(), Value::String(id.clone()));
        Self { id, body }
    }

    /// The record's unique identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The full document.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Consume the record, returning the full document.
    pub fn into_body(self) -> Map<String, Value> {
        self.body
    }
}

impl TryFrom<Value> for Record {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(body) => Self::from_object(body),
            other => Err(RecordError::NotAnObject(other.to_string())),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}
