//! Bulk record processing commands.

use serde_json::{json, Value};
use tracing::info;

use tim_repository::{IndexService, TimError};
use tim_shared::{generate_index_name, BulkResult, Record};

use super::describe_aliases;
use crate::cli::{BulkUpdateArgs, IngestArgs, ReindexSourceArgs};
use crate::errors::CommandError;
use crate::reader::{DatasetFilter, DatasetReader, ReaderError, RowAction};

/// Counters of a bulk command, logged as JSON when it completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSummary {
    pub index: BulkResult,
    /// Present for commands with a delete phase.
    pub delete: Option<BulkResult>,
}

impl BulkSummary {
    pub fn to_json(&self) -> Value {
        let mut summary = json!({
            "index": {
                "created": self.index.created,
                "updated": self.index.updated,
                "errors": self.index.errors,
                "total": self.index.total,
            }
        });
        if let Some(delete) = &self.delete {
            summary["delete"] = json!({
                "deleted": delete.deleted,
                "errors": delete.errors,
                "total": delete.total,
            });
        }
        summary
    }
}

/// Bulk index the index rows of a dataset file into the source's index.
///
/// The source's primary index is used unless `--new` is passed or there is
/// none, in which case a new index is created. With `--auto` the index is
/// promoted once the records are in.
pub async fn ingest(service: &IndexService, args: IngestArgs) -> Result<BulkSummary, CommandError> {
    let reader = DatasetReader::open(&args.filepath)?;
    let (index, created) = service
        .get_or_create_index_from_source(&args.source, args.new)
        .await?;
    if created {
        info!(index = %index, "Index '{}' created.", index);
    }

    info!(
        dataset = %reader.path().display(),
        index = %index,
        "Ingesting records from dataset '{}' into '{}'",
        reader.path().display(),
        index
    );
    let filter = DatasetFilter {
        source: Some(args.source.clone()),
        ..Default::default()
    }
    .with_action(RowAction::Index);
    let index_result = index_records(service, &index, reader.records(&filter)?).await?;

    if args.auto {
        service.promote_index(&index, &args.aliases).await?;
        let current = describe_aliases(service, &index).await?;
        info!(
            "Index promoted. Current aliases for index '{}': {}",
            index, current
        );
    }

    let summary = BulkSummary {
        index: index_result,
        delete: None,
    };
    info!("Ingest complete: {}", summary.to_json());
    Ok(summary)
}

/// Apply one dataset run to an index: index its index rows, then delete its
/// delete rows.
///
/// A fatal indexing error ends the index phase only; the delete phase still
/// runs.
pub async fn bulk_update(
    service: &IndexService,
    args: BulkUpdateArgs,
) -> Result<BulkSummary, CommandError> {
    let index = resolve_target(service, args.index.as_deref(), args.source.as_deref()).await?;
    let reader = DatasetReader::open(&args.dataset_path)?;
    info!(
        dataset = %reader.path().display(),
        index = %index,
        "Bulk updating records from dataset '{}' into '{}'",
        reader.path().display(),
        index
    );

    let filter = DatasetFilter {
        run_date: args.run_date,
        run_id: args.run_id,
        ..Default::default()
    };

    let to_index = reader.records(&filter.clone().with_action(RowAction::Index))?;
    let index_result = match index_records(service, &index, to_index).await {
        Ok(result) => result,
        Err(CommandError::Repository(e @ TimError::BulkIndexing { .. })) => {
            info!("Bulk indexing failed: {}", e);
            BulkResult::default()
        }
        Err(e) => return Err(e),
    };

    let to_delete = reader.records(&filter.with_action(RowAction::Delete))?;
    let delete_result = delete_records(service, &index, to_delete).await?;

    let summary = BulkSummary {
        index: index_result,
        delete: Some(delete_result),
    };
    info!("Bulk update complete: {}", summary.to_json());
    Ok(summary)
}

/// Rebuild a source from scratch.
///
/// Creates a new index, promotes it to the primary alias, the source alias and
/// any extra aliases, then bulk indexes the current version of every record of
/// the source.
pub async fn reindex_source(
    service: &IndexService,
    args: ReindexSourceArgs,
) -> Result<BulkSummary, CommandError> {
    let reader = DatasetReader::open(&args.dataset_path)?;

    let index = service
        .create_index(&generate_index_name(&args.source))
        .await?;
    info!(index = %index, "Index '{}' created.", index);

    let aliases: Vec<String> = std::iter::once(args.source.clone())
        .chain(args.aliases)
        .collect();
    service.promote_index(&index, &aliases).await?;
    let current = describe_aliases(service, &index).await?;
    info!(
        "Index promoted. Current aliases for index '{}': {}",
        index, current
    );

    let filter = DatasetFilter {
        source: Some(args.source),
        current_only: true,
        ..Default::default()
    }
    .with_action(RowAction::Index);
    let index_result = match index_records(service, &index, reader.records(&filter)?).await {
        Ok(result) => result,
        Err(CommandError::Repository(e @ TimError::BulkIndexing { .. })) => {
            info!("Bulk indexing failed: {}", e);
            BulkResult::default()
        }
        Err(e) => return Err(e),
    };

    let summary = BulkSummary {
        index: index_result,
        delete: None,
    };
    info!("Reindex source complete: {}", summary.to_json());
    Ok(summary)
}

/// The index a bulk update writes to: the named index, which must exist, or
/// the source's primary index.
pub async fn resolve_target(
    service: &IndexService,
    index: Option<&str>,
    source: Option<&str>,
) -> Result<String, CommandError> {
    match (index, source) {
        (Some(_), Some(_)) => Err(CommandError::usage(
            "Only one of --index and --source options is allowed, not both.",
        )),
        (None, None) => Err(CommandError::usage(
            "Must provide either an existing index name or a valid source.",
        )),
        (Some(index), None) => {
            if service.provider().index_exists(index).await? {
                Ok(index.to_string())
            } else {
                Err(CommandError::usage(format!(
                    "Index '{}' does not exist in the cluster.",
                    index
                )))
            }
        }
        (None, Some(source)) => service
            .get_primary_index_for_source(source)
            .await?
            .ok_or_else(|| {
                CommandError::usage(format!(
                    "No index name was passed and there is no primary-aliased index for \
                     source '{}'.",
                    source
                ))
            }),
    }
}

async fn index_records<I>(
    service: &IndexService,
    index: &str,
    rows: I,
) -> Result<BulkResult, CommandError>
where
    I: Iterator<Item = Result<Record, ReaderError>>,
{
    let mut failure = None;
    let result = service.bulk_index(index, until_error(rows, &mut failure)).await;
    finish(result, failure)
}

async fn delete_records<I>(
    service: &IndexService,
    index: &str,
    rows: I,
) -> Result<BulkResult, CommandError>
where
    I: Iterator<Item = Result<Record, ReaderError>>,
{
    let mut failure = None;
    let result = service.bulk_delete(index, until_error(rows, &mut failure)).await;
    finish(result, failure)
}

/// Yield records until the reader fails, parking the error in `failure`.
fn until_error<'a, I>(
    rows: I,
    failure: &'a mut Option<ReaderError>,
) -> impl Iterator<Item = Record> + 'a
where
    I: Iterator<Item = Result<Record, ReaderError>> + 'a,
{
    rows.scan(failure, |failure, row| match row {
        Ok(record) => Some(record),
        Err(e) => {
            **failure = Some(e);
            None
        }
    })
}

fn finish(
    result: Result<BulkResult, TimError>,
    failure: Option<ReaderError>,
) -> Result<BulkResult, CommandError> {
    match failure {
        Some(e) => Err(e.into()),
        None => Ok(result?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_json() {
        let summary = BulkSummary {
            index: BulkResult {
                created: 2,
                updated: 1,
                deleted: 0,
                errors: 1,
                total: 4,
            },
            delete: Some(BulkResult {
                deleted: 3,
                total: 3,
                ..Default::default()
            }),
        };
        assert_eq!(
            summary.to_json(),
            json!({
                "index": { "created": 2, "updated": 1, "errors": 1, "total": 4 },
                "delete": { "deleted": 3, "errors": 0, "total": 3 }
            })
        );
    }

    #[test]
    fn test_summary_json_without_delete_phase() {
        let summary = BulkSummary::default();
        assert!(summary.to_json().get("delete").is_none());
    }

    #[test]
    fn test_until_error_stops_at_first_failure() {
        let rows = vec![
            Ok(Record::from_id("alma:1")),
            Err(ReaderError::Record {
                line: 2,
                reason: "missing".to_string(),
            }),
            Ok(Record::from_id("alma:3")),
        ];
        let mut failure = None;
        let ids: Vec<String> = until_error(rows.into_iter(), &mut failure)
            .map(|record| record.id().to_string())
            .collect();
        assert_eq!(ids, vec!["alma:1"]);
        assert!(matches!(failure, Some(ReaderError::Record { line: 2, .. })));
    }
}
