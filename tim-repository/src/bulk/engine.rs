//! Bulk execution engine.
//!
//! Streams actions to the bulk endpoint in chunks bounded by encoded size,
//! classifies every item of every response and refreshes the index once the
//! stream is exhausted.

use std::mem;

use serde_json::Value;
use tracing::{debug, error, info};

use tim_shared::{BulkResult, Record};

use super::actions::{BulkActions, BulkOperation};
use super::outcome::BulkItemOutcome;
use crate::config::BulkConfig;
use crate::errors::TimError;
use crate::interfaces::ClusterProvider;

/// Index every record into `index`, creating or replacing documents by id.
///
/// Returns the run counters. Documents rejected by the mappings are logged and
/// counted as errors; any other item error aborts the run with
/// `TimError::BulkIndexing`.
pub async fn bulk_index<P, R>(
    provider: &P,
    index: &str,
    records: R,
    config: &BulkConfig,
) -> Result<BulkResult, TimError>
where
    P: ClusterProvider + ?Sized,
    R: IntoIterator<Item = Record>,
{
    let actions = BulkActions::new(index, records.into_iter(), BulkOperation::Index);
    execute(provider, index, actions, config).await
}

/// Delete every record (by id) from `index`.
///
/// Ids missing from the index are logged and counted as errors.
pub async fn bulk_delete<P, R>(
    provider: &P,
    index: &str,
    records: R,
    config: &BulkConfig,
) -> Result<BulkResult, TimError>
where
    P: ClusterProvider + ?Sized,
    R: IntoIterator<Item = Record>,
{
    let actions = BulkActions::new(index, records.into_iter(), BulkOperation::Delete);
    execute(provider, index, actions, config).await
}

/// Merge every record into the existing document with the same id.
pub async fn bulk_update<P, R>(
    provider: &P,
    index: &str,
    records: R,
    config: &BulkConfig,
) -> Result<BulkResult, TimError>
where
    P: ClusterProvider + ?Sized,
    R: IntoIterator<Item = Record>,
{
    let actions = BulkActions::new(index, records.into_iter(), BulkOperation::Update);
    execute(provider, index, actions, config).await
}

/// Run an action stream against `index` and return the counters.
pub async fn execute<P, I>(
    provider: &P,
    index: &str,
    actions: BulkActions<I>,
    config: &BulkConfig,
) -> Result<BulkResult, TimError>
where
    P: ClusterProvider + ?Sized,
    I: Iterator<Item = Record>,
{
    let operation = actions.operation();
    let mut run = Run::new(index, operation, config);
    let mut chunk = Chunk::default();

    for action in actions {
        let lines = action.to_lines()?;
        let size: usize = lines.iter().map(|line| line.len() + 1).sum();

        if !chunk.is_empty() && chunk.bytes + size > config.max_chunk_bytes {
            run.send(provider, chunk.take()).await?;
        }
        chunk.push(lines, size);
    }
    if !chunk.is_empty() {
        run.send(provider, chunk.take()).await?;
    }

    info!(
        index = %index,
        total = run.result.total,
        "All records {}, refreshing index.",
        operation_past_tense(operation)
    );
    provider.refresh(index).await?;

    Ok(run.result)
}

fn operation_past_tense(operation: BulkOperation) -> &'static str {
    match operation {
        BulkOperation::Create | BulkOperation::Index => "indexed",
        BulkOperation::Update => "updated",
        BulkOperation::Delete => "deleted",
    }
}

/// Encoded actions waiting to be sent.
#[derive(Default)]
struct Chunk {
    lines: Vec<String>,
    bytes: usize,
}

impl Chunk {
    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn push(&mut self, lines: Vec<String>, size: usize) {
        self.lines.extend(lines);
        self.bytes += size;
    }

    fn take(&mut self) -> Vec<String> {
        self.bytes = 0;
        mem::take(&mut self.lines)
    }
}

/// Counters and context of one run.
struct Run<'a> {
    index: &'a str,
    operation: BulkOperation,
    config: &'a BulkConfig,
    result: BulkResult,
}

impl<'a> Run<'a> {
    fn new(index: &'a str, operation: BulkOperation, config: &'a BulkConfig) -> Self {
        Self {
            index,
            operation,
            config,
            result: BulkResult::new(),
        }
    }

    async fn send<P>(&mut self, provider: &P, lines: Vec<String>) -> Result<(), TimError>
    where
        P: ClusterProvider + ?Sized,
    {
        debug!(index = %self.index, lines = lines.len(), "Sending bulk request");
        let items = provider.bulk(self.index, lines).await?;
        for item in &items {
            self.record(item)?;
        }
        Ok(())
    }

    fn record(&mut self, item: &Value) -> Result<(), TimError> {
        debug!(item = %item, "Bulk item response");
        let outcome = BulkItemOutcome::classify(self.operation, item);
        if outcome.is_error() {
            self.result.errors += 1;
        }
        match outcome {
            BulkItemOutcome::Created => self.result.created += 1,
            BulkItemOutcome::Updated => self.result.updated += 1,
            BulkItemOutcome::Deleted => self.result.deleted += 1,
            BulkItemOutcome::NotFound { id } => error!(
                record = %id,
                index = %self.index,
                "Record to delete '{}' was not found in index '{}'.",
                id,
                self.index
            ),
            BulkItemOutcome::MapperParsing { id, error } => error!(
                record = %id,
                "Error indexing record '{}'. Details: {}",
                id,
                error
            ),
            BulkItemOutcome::Fatal { id, error } => {
                return Err(TimError::bulk_indexing(id, self.index, error.to_string()));
            }
            BulkItemOutcome::Unexpected { item } => error!(
                operation = %self.operation,
                "Something unexpected happened during bulk {}. Response: {}",
                self.operation,
                item
            ),
        }

        self.result.total += 1;
        let interval = self.config.status_update_interval;
        if interval > 0 && self.result.total % interval == 0 {
            info!(
                "Status update: {} records {} so far!",
                self.result.total,
                operation_past_tense(self.operation)
            );
        }
        Ok(())
    }
}
