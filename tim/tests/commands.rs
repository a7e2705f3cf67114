//! Command tests against an in-memory cluster.
//!
//! Commands are parsed from real argument lists and run with a scripted console,
//! then the cluster state and the console output are checked.

use std::io::{Cursor, Write};
use std::sync::Arc;

use clap::Parser;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

use tim::cli::Command;
use tim::commands::{self, bulk};
use tim::errors::EXIT_USAGE;
use tim::{Cli, CommandError, Console};
use tim_repository::testing::InMemoryCluster;
use tim_repository::{BulkConfig, IndexConfig, IndexService, TimError};

const OLD_ALMA: &str = "alma-2022-01-01t00-00-00";
const NEW_ALMA: &str = "alma-2022-02-01t00-00-00";

type TestConsole = Console<Cursor<Vec<u8>>, Vec<u8>>;

fn service(cluster: &Arc<InMemoryCluster>) -> IndexService {
    IndexService::new(
        cluster.clone(),
        IndexConfig::embedded().unwrap(),
        BulkConfig::default(),
    )
}

fn console(input: &str) -> TestConsole {
    Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}

fn output(console: TestConsole) -> String {
    String::from_utf8(console.into_output()).unwrap()
}

fn command(args: &[&str]) -> Command {
    Cli::try_parse_from(std::iter::once("tim").chain(args.iter().copied()))
        .unwrap()
        .command
}

async fn run(service: &IndexService, input: &str, args: &[&str]) -> (Result<(), CommandError>, String) {
    let mut console = console(input);
    let result = commands::run(command(args), service, &mut console).await;
    (result, output(console))
}

fn row(id: &str, run_id: &str, action: &str) -> Value {
    let mut row = json!({
        "timdex_record_id": id,
        "source": "alma",
        "run_date": "2024-12-01",
        "run_id": run_id,
        "action": action,
    });
    if action == "index" {
        row["transformed_record"] = json!({
            "timdex_record_id": id,
            "title": format!("Title of {}", id),
            "source": "Alma",
        });
    }
    row
}

fn dataset(rows: &[Value]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}

fn path(file: &NamedTempFile) -> &str {
    file.path().to_str().unwrap()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// Cluster views

#[tokio::test]
async fn test_ping() {
    let cluster = Arc::new(InMemoryCluster::new());
    let (result, out) = run(&service(&cluster), "", &["ping"]).await;
    result.unwrap();
    assert!(out.contains("Name: in-memory"));
    assert!(out.contains("OpenSearch version: 2.11.1"));
}

#[tokio::test]
async fn test_aliases_and_indexes_on_empty_cluster() {
    let cluster = Arc::new(InMemoryCluster::new());
    let service = service(&cluster);

    let (result, out) = run(&service, "", &["aliases"]).await;
    result.unwrap();
    assert!(out.contains("No aliases present in OpenSearch cluster."));

    let (result, out) = run(&service, "", &["indexes"]).await;
    result.unwrap();
    assert!(out.contains("No indexes present in OpenSearch cluster."));
}

// Index management

#[tokio::test]
async fn test_create_with_index_name() {
    let cluster = Arc::new(InMemoryCluster::new());
    let (result, out) = run(&service(&cluster), "", &["create", "-i", NEW_ALMA]).await;
    result.unwrap();
    assert_eq!(cluster.index_names(), vec![NEW_ALMA]);
    assert!(out.contains(&format!("Name: {}", NEW_ALMA)));
}

#[tokio::test]
async fn test_create_with_source() {
    let cluster = Arc::new(InMemoryCluster::new());
    let (result, _) = run(&service(&cluster), "", &["create", "-s", "dspace"]).await;
    result.unwrap();
    let names = cluster.index_names();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("dspace-"));
    assert!(cluster.creation_body(&names[0]).unwrap()["mappings"].is_object());
}

#[tokio::test]
async fn test_create_existing_index_aborts() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(NEW_ALMA, &[]));
    let (result, _) = run(&service(&cluster), "", &["create", "-i", NEW_ALMA]).await;
    assert!(matches!(result, Err(CommandError::Aborted)));
}

#[tokio::test]
async fn test_delete_forced() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(OLD_ALMA, &[]));
    let (result, out) = run(&service(&cluster), "", &["delete", "-i", OLD_ALMA, "-f"]).await;
    result.unwrap();
    assert!(cluster.index_names().is_empty());
    assert!(out.contains(&format!("Index '{}' deleted.", OLD_ALMA)));
}

#[tokio::test]
async fn test_delete_confirmed() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(OLD_ALMA, &[]));
    let (result, out) = run(&service(&cluster), "maybe\ny\n", &["delete", "-i", OLD_ALMA]).await;
    result.unwrap();
    assert!(cluster.index_names().is_empty());
    assert!(out.contains("Invalid input: 'maybe', must be one of 'y' or 'n'."));
}

#[tokio::test]
async fn test_delete_declined() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(OLD_ALMA, &[]));
    let (result, out) = run(&service(&cluster), "n\n", &["delete", "-i", OLD_ALMA]).await;
    assert!(matches!(result, Err(CommandError::Aborted)));
    assert_eq!(cluster.index_names(), vec![OLD_ALMA]);
    assert!(out.contains("Ok, index will not be deleted."));
}

#[tokio::test]
async fn test_delete_missing_index() {
    let cluster = Arc::new(InMemoryCluster::new());
    let (result, _) = run(&service(&cluster), "", &["delete", "-i", OLD_ALMA, "-f"]).await;
    assert!(matches!(
        result,
        Err(CommandError::Repository(TimError::IndexNotFound(_)))
    ));
}

#[tokio::test]
async fn test_promote_replaces_same_source_index() {
    let cluster = Arc::new(
        InMemoryCluster::new()
            .with_index(OLD_ALMA, &["all-current", "alma"])
            .with_index("dspace-2022-01-01t00-00-00", &["all-current"])
            .with_index(NEW_ALMA, &[]),
    );
    let (result, out) = run(
        &service(&cluster),
        "",
        &["promote", "-i", NEW_ALMA, "-a", "timdex"],
    )
    .await;
    result.unwrap();

    assert_eq!(
        cluster.aliases_of(NEW_ALMA).unwrap(),
        strings(&["all-current", "alma", "timdex"])
    );
    assert!(cluster.aliases_of(OLD_ALMA).unwrap().is_empty());
    assert_eq!(
        cluster.aliases_of("dspace-2022-01-01t00-00-00").unwrap(),
        strings(&["all-current"])
    );
    assert_eq!(cluster.alias_updates().len(), 1);
    assert!(out.contains("Alias: timdex"));
}

#[tokio::test]
async fn test_promote_missing_index() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(OLD_ALMA, &["all-current"]));
    let (result, _) = run(&service(&cluster), "", &["promote", "-i", NEW_ALMA]).await;
    assert!(matches!(
        result,
        Err(CommandError::Repository(TimError::IndexNotFound(ref index))) if index == NEW_ALMA
    ));
    assert_eq!(cluster.aliases_of(OLD_ALMA).unwrap(), strings(&["all-current"]));
}

#[tokio::test]
async fn test_demote_without_aliases_aborts() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(OLD_ALMA, &[]));
    let (result, out) = run(&service(&cluster), "", &["demote", "-i", OLD_ALMA]).await;
    assert!(matches!(result, Err(CommandError::Aborted)));
    assert!(out.contains(&format!(
        "Index '{}' has no aliases, please check aliases and try again.",
        OLD_ALMA
    )));
}

#[tokio::test]
async fn test_demote_from_primary_declined() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(OLD_ALMA, &["all-current", "alma"]));
    let (result, out) = run(&service(&cluster), "n\n", &["demote", "-i", OLD_ALMA]).await;
    assert!(matches!(result, Err(CommandError::Aborted)));
    assert!(out.contains("Ok, index will not be demoted."));
    assert_eq!(
        cluster.aliases_of(OLD_ALMA).unwrap(),
        strings(&["all-current", "alma"])
    );
}

#[tokio::test]
async fn test_demote_from_primary_confirmed() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(OLD_ALMA, &["all-current", "alma"]));
    let (result, out) = run(&service(&cluster), "y\n", &["demote", "-i", OLD_ALMA]).await;
    result.unwrap();
    assert!(cluster.aliases_of(OLD_ALMA).unwrap().is_empty());
    assert!(out.contains(&format!(
        "Index '{}' demoted from aliases: all-current, alma",
        OLD_ALMA
    )));
}

#[tokio::test]
async fn test_demote_without_primary_needs_no_confirmation() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(OLD_ALMA, &["timdex"]));
    let (result, out) = run(&service(&cluster), "", &["demote", "-i", OLD_ALMA]).await;
    result.unwrap();
    assert!(!out.contains("[y/n]"));
    assert!(cluster.aliases_of(OLD_ALMA).unwrap().is_empty());
}

// Bulk commands

fn bulk_update_args(args: &[&str]) -> tim::cli::BulkUpdateArgs {
    match command(args) {
        Command::BulkUpdate(args) => args,
        other => panic!("unexpected command: {other:?}"),
    }
}

#[tokio::test]
async fn test_bulk_update_by_source() {
    let cluster = Arc::new(
        InMemoryCluster::new()
            .with_index(OLD_ALMA, &["all-current"])
            .with_document(OLD_ALMA, "alma:1", json!({ "timdex_record_id": "alma:1" }))
            .with_document(OLD_ALMA, "alma:9", json!({ "timdex_record_id": "alma:9" })),
    );
    let file = dataset(&[
        row("alma:1", "run-1", "index"),
        row("alma:2", "run-1", "index"),
        row("alma:9", "run-1", "delete"),
        row("alma:3", "run-2", "index"),
    ]);
    let args = bulk_update_args(&[
        "bulk-update",
        "-s",
        "alma",
        "-d",
        "2024-12-01",
        "--run-id",
        "run-1",
        path(&file),
    ]);

    let summary = bulk::bulk_update(&service(&cluster), args).await.unwrap();

    assert_eq!(summary.index.created, 1);
    assert_eq!(summary.index.updated, 1);
    assert_eq!(summary.index.total, 2);
    let delete = summary.delete.unwrap();
    assert_eq!(delete.deleted, 1);
    assert_eq!(delete.total, 1);

    assert_eq!(cluster.document_count(OLD_ALMA), 2);
    assert_eq!(
        cluster.document(OLD_ALMA, "alma:2").unwrap()["title"],
        "Title of alma:2"
    );
    assert!(cluster.document(OLD_ALMA, "alma:3").is_none());
    assert_eq!(
        summary.to_json(),
        json!({
            "index": { "created": 1, "updated": 1, "errors": 0, "total": 2 },
            "delete": { "deleted": 1, "errors": 0, "total": 1 }
        })
    );
}

#[tokio::test]
async fn test_bulk_update_by_index_name() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(NEW_ALMA, &[]));
    let file = dataset(&[row("alma:1", "run-1", "index")]);
    let args = bulk_update_args(&["bulk-update", "-i", NEW_ALMA, path(&file)]);

    let summary = bulk::bulk_update(&service(&cluster), args).await.unwrap();
    assert_eq!(summary.index.created, 1);
    assert_eq!(cluster.document_count(NEW_ALMA), 1);
}

#[tokio::test]
async fn test_bulk_update_missing_index_is_usage_error() {
    let cluster = Arc::new(InMemoryCluster::new());
    let file = dataset(&[]);
    let args = bulk_update_args(&["bulk-update", "-i", NEW_ALMA, path(&file)]);

    let err = bulk::bulk_update(&service(&cluster), args).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Usage error: Index '{}' does not exist in the cluster.", NEW_ALMA)
    );
    assert_eq!(err.exit_code(), EXIT_USAGE);
}

#[tokio::test]
async fn test_bulk_update_source_without_primary_is_usage_error() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(OLD_ALMA, &["timdex"]));
    let file = dataset(&[]);
    let args = bulk_update_args(&["bulk-update", "-s", "alma", path(&file)]);

    let err = bulk::bulk_update(&service(&cluster), args).await.unwrap_err();
    assert!(matches!(err, CommandError::Usage(ref msg) if msg.contains("source 'alma'")));
}

#[tokio::test]
async fn test_bulk_update_runs_delete_phase_after_fatal_index_error() {
    let cluster = Arc::new(
        InMemoryCluster::new()
            .with_index(OLD_ALMA, &["all-current"])
            .with_document(OLD_ALMA, "alma:9", json!({ "timdex_record_id": "alma:9" }))
            .with_item_error(
                "alma:1",
                json!({ "type": "illegal_argument_exception", "reason": "bad field" }),
            ),
    );
    let file = dataset(&[row("alma:1", "run-1", "index"), row("alma:9", "run-1", "delete")]);
    let args = bulk_update_args(&["bulk-update", "-s", "alma", path(&file)]);

    let summary = bulk::bulk_update(&service(&cluster), args).await.unwrap();
    assert_eq!(summary.index.total, 0);
    assert_eq!(summary.delete.unwrap().deleted, 1);
    assert!(cluster.document(OLD_ALMA, "alma:9").is_none());
}

#[tokio::test]
async fn test_bulk_update_soft_errors_are_counted() {
    let cluster = Arc::new(
        InMemoryCluster::new()
            .with_index(OLD_ALMA, &["all-current"])
            .with_item_error(
                "alma:1",
                json!({ "type": "mapper_parsing_exception", "reason": "failed to parse field [dates]" }),
            ),
    );
    let file = dataset(&[row("alma:1", "run-1", "index"), row("alma:2", "run-1", "index")]);
    let args = bulk_update_args(&["bulk-update", "-s", "alma", path(&file)]);

    let summary = bulk::bulk_update(&service(&cluster), args).await.unwrap();
    assert_eq!(summary.index.errors, 1);
    assert_eq!(summary.index.created, 1);
    assert_eq!(summary.index.total, 2);
}

#[tokio::test]
async fn test_bulk_update_malformed_dataset() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(OLD_ALMA, &["all-current"]));
    let mut file = dataset(&[row("alma:1", "run-1", "index")]);
    writeln!(file, "{{not json").unwrap();
    file.flush().unwrap();
    let args = bulk_update_args(&["bulk-update", "-s", "alma", path(&file)]);

    let err = bulk::bulk_update(&service(&cluster), args).await.unwrap_err();
    assert!(matches!(err, CommandError::Reader(_)));
}

#[tokio::test]
async fn test_reindex_source() {
    let cluster = Arc::new(InMemoryCluster::new().with_index(OLD_ALMA, &["all-current", "alma"]));
    let file = dataset(&[
        row("alma:1", "run-1", "index"),
        row("alma:2", "run-1", "index"),
        row("alma:2", "run-2", "delete"),
        row("alma:3", "run-2", "index"),
    ]);
    let args = match command(&["reindex-source", "-s", "alma", "-a", "timdex", path(&file)]) {
        Command::ReindexSource(args) => args,
        other => panic!("unexpected command: {other:?}"),
    };

    let summary = bulk::reindex_source(&service(&cluster), args).await.unwrap();

    let names = cluster.index_names();
    assert_eq!(names.len(), 2);
    let new_index = names.iter().find(|name| name.as_str() != OLD_ALMA).unwrap();
    assert_eq!(
        cluster.aliases_of(new_index).unwrap(),
        strings(&["all-current", "alma", "timdex"])
    );
    assert!(cluster.aliases_of(OLD_ALMA).unwrap().is_empty());

    assert_eq!(summary.index.created, 2);
    assert_eq!(summary.delete, None);
    assert!(cluster.document(new_index, "alma:1").is_some());
    assert!(cluster.document(new_index, "alma:2").is_none());
    assert!(cluster.document(new_index, "alma:3").is_some());
}

#[tokio::test]
async fn test_ingest_creates_and_promotes_index() {
    let cluster = Arc::new(InMemoryCluster::new());
    let file = dataset(&[row("alma:1", "run-1", "index"), row("alma:2", "run-1", "delete")]);
    let args = match command(&["ingest", "-s", "alma", "--auto", path(&file)]) {
        Command::Ingest(args) => args,
        other => panic!("unexpected command: {other:?}"),
    };

    let summary = bulk::ingest(&service(&cluster), args).await.unwrap();

    let names = cluster.index_names();
    assert_eq!(names.len(), 1);
    assert_eq!(cluster.aliases_of(&names[0]).unwrap(), strings(&["all-current"]));
    assert_eq!(summary.index.created, 1);
    assert_eq!(summary.index.total, 1);
}

#[tokio::test]
async fn test_ingest_into_primary_index() {
    let cluster = Arc::new(
        InMemoryCluster::new()
            .with_index(OLD_ALMA, &["all-current"])
            .with_document(OLD_ALMA, "alma:1", json!({ "timdex_record_id": "alma:1" })),
    );
    let file = dataset(&[row("alma:1", "run-1", "index")]);
    let args = match command(&["ingest", "-s", "alma", path(&file)]) {
        Command::Ingest(args) => args,
        other => panic!("unexpected command: {other:?}"),
    };

    let summary = bulk::ingest(&service(&cluster), args).await.unwrap();

    assert_eq!(cluster.index_names(), vec![OLD_ALMA]);
    assert_eq!(summary.index.updated, 1);
    assert!(cluster.alias_updates().is_empty());
}

#[tokio::test]
async fn test_run_timed_reports_errors_unchanged() {
    let cluster = Arc::new(InMemoryCluster::new());
    let mut console = console("");
    let err = commands::run_timed(command(&["demote", "-i", OLD_ALMA]), &service(&cluster), &mut console)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CommandError::Repository(TimError::IndexNotFound(_))
    ));
}
