//! Transformed record dataset reader.
//!
//! A dataset is a JSON Lines file with one row per record version:
//!
//! ```text
//! {"timdex_record_id": "alma:1", "source": "alma", "run_date": "2024-12-01", "run_id": "abc", "action": "index", "transformed_record": {...}}
//! {"timdex_record_id": "alma:2", "source": "alma", "run_date": "2024-12-01", "run_id": "abc", "action": "delete"}
//! ```
//!
//! Rows are read one line at a time and filtered by run metadata. With
//! `current_only`, only the last row of every record id is kept, and dropped if
//! that row is a delete.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use tim_shared::Record;

/// Errors raised while reading a dataset.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Failed to read dataset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Malformed dataset row at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dataset row at line {line} has no usable transformed record: {reason}")]
    Record { line: usize, reason: String },
}

/// What a row asks the cluster to do with its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowAction {
    Index,
    Delete,
}

/// One row of the dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetRow {
    pub timdex_record_id: String,
    pub source: String,
    pub run_date: NaiveDate,
    pub run_id: String,
    pub action: RowAction,
    /// The transformed record, as an object or as serialized JSON. Only index rows carry one.
    #[serde(default)]
    pub transformed_record: Option<Value>,
    #[serde(skip)]
    pub line: usize,
}

impl DatasetRow {
    /// The record to send to the cluster.
    ///
    /// Delete rows yield a record carrying only the id.
    pub fn into_record(self) -> Result<Record, ReaderError> {
        let line = self.line;
        if self.action == RowAction::Delete {
            return Ok(Record::from_id(self.timdex_record_id));
        }

        let value = match self.transformed_record {
            Some(Value::String(serialized)) => {
                serde_json::from_str(&serialized).map_err(|e| ReaderError::Record {
                    line,
                    reason: e.to_string(),
                })?
            }
            Some(value) => value,
            None => {
                return Err(ReaderError::Record {
                    line,
                    reason: "index row is missing 'transformed_record'".to_string(),
                })
            }
        };
        Record::try_from(value).map_err(|e| ReaderError::Record {
            line,
            reason: e.to_string(),
        })
    }
}

/// Which rows to read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetFilter {
    pub run_date: Option<NaiveDate>,
    pub run_id: Option<String>,
    pub source: Option<String>,
    pub action: Option<RowAction>,
    /// Keep only the last row of every record id, and only if it is not a delete.
    pub current_only: bool,
}

impl DatasetFilter {
    pub fn with_action(mut self, action: RowAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Filters applied before the latest row per id is chosen.
    fn matches_run(&self, row: &DatasetRow) -> bool {
        self.run_date.map_or(true, |date| row.run_date == date)
            && self.run_id.as_deref().map_or(true, |id| row.run_id == id)
            && self.source.as_deref().map_or(true, |source| row.source == source)
    }

    fn matches_action(&self, row: &DatasetRow) -> bool {
        self.action.map_or(true, |action| row.action == action)
    }
}

/// A dataset file on disk.
#[derive(Debug, Clone)]
pub struct DatasetReader {
    path: PathBuf,
}

impl DatasetReader {
    /// Point the reader at a dataset file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReaderError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(ReaderError::Io {
                path: path.display().to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            });
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lines(&self) -> Result<Lines<BufReader<File>>, ReaderError> {
        let file = File::open(&self.path).map_err(|source| self.io_error(source))?;
        Ok(BufReader::new(file).lines())
    }

    fn io_error(&self, source: io::Error) -> ReaderError {
        ReaderError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Rows matching the filter, in file order.
    ///
    /// With `current_only` the file is scanned once up front to find the last
    /// row of every record id; only ids and line numbers are held.
    pub fn rows(&self, filter: &DatasetFilter) -> Result<DatasetRows, ReaderError> {
        let latest = if filter.current_only {
            let mut latest = HashMap::new();
            let mut rows = DatasetRows::new(self.path.clone(), self.lines()?, filter.clone(), None);
            for row in rows.by_ref_unfiltered() {
                let row = row?;
                if filter.matches_run(&row) {
                    latest.insert(row.timdex_record_id, row.line);
                }
            }
            debug!(records = latest.len(), "Resolved current record versions");
            Some(latest)
        } else {
            None
        };

        Ok(DatasetRows::new(
            self.path.clone(),
            self.lines()?,
            filter.clone(),
            latest,
        ))
    }

    /// Records of the rows matching the filter.
    pub fn records(
        &self,
        filter: &DatasetFilter,
    ) -> Result<impl Iterator<Item = Result<Record, ReaderError>>, ReaderError> {
        Ok(self
            .rows(filter)?
            .map(|row| row.and_then(DatasetRow::into_record)))
    }
}

/// Lazy iterator over the rows of a dataset.
pub struct DatasetRows {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: usize,
    filter: DatasetFilter,
    latest: Option<HashMap<String, usize>>,
}

impl DatasetRows {
    fn new(
        path: PathBuf,
        lines: Lines<BufReader<File>>,
        filter: DatasetFilter,
        latest: Option<HashMap<String, usize>>,
    ) -> Self {
        Self {
            path,
            lines,
            line: 0,
            filter,
            latest,
        }
    }

    /// Every parsed row, ignoring the filter.
    fn by_ref_unfiltered(&mut self) -> impl Iterator<Item = Result<DatasetRow, ReaderError>> + '_ {
        std::iter::from_fn(move || self.next_row())
    }

    fn next_row(&mut self) -> Option<Result<DatasetRow, ReaderError>> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(source) => {
                    return Some(Err(ReaderError::Io {
                        path: self.path.display().to_string(),
                        source,
                    }))
                }
            };
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }
            let line = self.line;
            return Some(
                serde_json::from_str::<DatasetRow>(&text)
                    .map(|row| DatasetRow { line, ..row })
                    .map_err(|source| ReaderError::Parse { line, source }),
            );
        }
    }

    fn keep(&self, row: &DatasetRow) -> bool {
        if !self.filter.matches_run(row) {
            return false;
        }
        if let Some(latest) = &self.latest {
            if latest.get(&row.timdex_record_id) != Some(&row.line)
                || row.action == RowAction::Delete
            {
                return false;
            }
        }
        self.filter.matches_action(row)
    }
}

impl Iterator for DatasetRows {
    type Item = Result<DatasetRow, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.next_row()? {
                Ok(row) if self.keep(&row) => return Some(Ok(row)),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
