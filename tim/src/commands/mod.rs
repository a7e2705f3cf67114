//! Command handlers.
//!
//! Each handler takes the index service and the console, so the same code runs
//! against a live cluster from `main` and against a fake in tests.

pub mod bulk;
pub mod cluster;
pub mod index;

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use tracing::info;

use tim_repository::IndexService;

use crate::cli::Command;
use crate::console::Console;
use crate::errors::CommandError;

pub use bulk::BulkSummary;

/// Run one command to completion.
pub async fn run<R, W>(
    command: Command,
    service: &IndexService,
    console: &mut Console<R, W>,
) -> Result<(), CommandError>
where
    R: BufRead,
    W: Write,
{
    match command {
        Command::Ping => cluster::ping(service, console).await,
        Command::Aliases => cluster::aliases(service, console).await,
        Command::Indexes => cluster::indexes(service, console).await,
        Command::Create(args) => index::create(service, console, args).await,
        Command::Delete(args) => index::delete(service, console, args).await,
        Command::Promote(args) => index::promote(service, console, args).await,
        Command::Demote(args) => index::demote(service, console, args).await,
        Command::Ingest(args) => bulk::ingest(service, args).await.map(drop),
        Command::BulkUpdate(args) => bulk::bulk_update(service, args).await.map(drop),
        Command::ReindexSource(args) => bulk::reindex_source(service, args).await.map(drop),
    }
}

/// Run one command and log how long it took when it succeeds.
pub async fn run_timed<R, W>(
    command: Command,
    service: &IndexService,
    console: &mut Console<R, W>,
) -> Result<(), CommandError>
where
    R: BufRead,
    W: Write,
{
    let start = Instant::now();
    run(command, service, console).await?;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Total time to complete process: {}",
        format_elapsed(start.elapsed())
    );
    Ok(())
}

/// Format a duration as `H:MM:SS`, with microseconds when there are any.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let micros = elapsed.subsec_micros();
    let clock = format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60);
    if micros == 0 {
        clock
    } else {
        format!("{}.{:06}", clock, micros)
    }
}

/// Current aliases of an index, for log lines.
pub(crate) async fn describe_aliases(
    service: &IndexService,
    index: &str,
) -> Result<String, CommandError> {
    Ok(service
        .get_index_aliases(index)
        .await?
        .map_or_else(|| "None".to_string(), |aliases| aliases.join(", ")))
}
