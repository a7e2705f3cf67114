//! Command line definition.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::builder::PossibleValuesParser;
use clap::{ArgGroup, Args, Parser, Subcommand};

use tim_shared::{validate_index_name, VALID_SOURCES};

/// TIM provides commands for interacting with OpenSearch indexes.
///
/// For more details on a specific command, run tim COMMAND -h.
#[derive(Debug, Parser)]
#[command(name = "tim", version)]
pub struct Cli {
    /// The OpenSearch instance endpoint minus the http scheme, e.g.
    /// 'search-timdex-env-1234567890.us-east-1.es.amazonaws.com'.
    #[arg(
        short,
        long,
        env = "TIMDEX_OPENSEARCH_ENDPOINT",
        default_value = "localhost"
    )]
    pub url: String,

    /// Log at debug level instead of info.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ping OpenSearch and display information about the cluster.
    Ping,

    /// List OpenSearch aliases and their associated indexes.
    Aliases,

    /// Display summary information about all indexes in the cluster.
    Indexes,

    /// Create a new index in the cluster.
    ///
    /// Must provide either the index name or source option. If source is
    /// provided, the index is named after the source and the current time.
    Create(CreateArgs),

    /// Delete an index.
    ///
    /// Prompts for confirmation unless --force is passed.
    Delete(DeleteArgs),

    /// Promote an index to the primary alias and any additional aliases.
    ///
    /// Any index of the same source already in one of those aliases is demoted
    /// in the same atomic request.
    Promote(PromoteArgs),

    /// Demote an index from all its associated aliases.
    ///
    /// Prompts for confirmation if the index is in the primary alias.
    Demote(DemoteArgs),

    /// Bulk index the records of a dataset file into a source's index.
    Ingest(IngestArgs),

    /// Bulk index and delete the records of one dataset run.
    BulkUpdate(BulkUpdateArgs),

    /// Rebuild a source in a new, promoted index from its current records.
    ReindexSource(ReindexSourceArgs),
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["index", "source"])))]
pub struct CreateArgs {
    /// Name for the new index, must use the convention 'source-YYYY-MM-DDthh-mm-ss'.
    #[arg(short, long, value_parser = parse_index_name)]
    pub index: Option<String>,

    /// Source to use for the new index name.
    #[arg(short, long, value_parser = source_parser())]
    pub source: Option<String>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Name of the OpenSearch index to delete.
    #[arg(short, long)]
    pub index: String,

    /// Disable the confirmation prompt.
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct PromoteArgs {
    /// Name of the OpenSearch index to promote.
    #[arg(short, long)]
    pub index: String,

    /// Alias to promote the index to in addition to the primary alias. May be
    /// repeated.
    #[arg(short, long = "alias")]
    pub aliases: Vec<String>,
}

#[derive(Debug, Args)]
pub struct DemoteArgs {
    /// Name of the OpenSearch index to demote.
    #[arg(short, long)]
    pub index: String,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Source of the records.
    #[arg(short, long, value_parser = source_parser())]
    pub source: String,

    /// Always create a new index instead of using the source's primary index.
    #[arg(long)]
    pub new: bool,

    /// Promote the index once the records are indexed, if it was created by this run.
    #[arg(long)]
    pub auto: bool,

    /// Extra alias for an automatic promotion. May be repeated.
    #[arg(short, long = "alias")]
    pub aliases: Vec<String>,

    /// JSON Lines dataset file.
    pub filepath: PathBuf,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["index", "source"])))]
pub struct BulkUpdateArgs {
    /// Name of the index on which to perform bulk indexing and deletion.
    #[arg(short, long)]
    pub index: Option<String>,

    /// Source whose primary-aliased index receives the records.
    #[arg(short, long, value_parser = source_parser())]
    pub source: Option<String>,

    /// Run date, formatted as YYYY-MM-DD.
    #[arg(short = 'd', long)]
    pub run_date: Option<NaiveDate>,

    /// Run ID.
    #[arg(long, visible_alias = "rid")]
    pub run_id: Option<String>,

    /// JSON Lines dataset file.
    pub dataset_path: PathBuf,
}

#[derive(Debug, Args)]
pub struct ReindexSourceArgs {
    /// Source to fully reindex.
    #[arg(short, long, value_parser = source_parser())]
    pub source: String,

    /// Alias to promote the index to in addition to the primary alias and the
    /// source alias. May be repeated.
    #[arg(short, long = "alias")]
    pub aliases: Vec<String>,

    /// JSON Lines dataset file.
    pub dataset_path: PathBuf,
}

fn source_parser() -> PossibleValuesParser {
    PossibleValuesParser::new(VALID_SOURCES.iter().copied())
}

fn parse_index_name(value: &str) -> Result<String, String> {
    validate_index_name(value)
        .map(|()| value.to_string())
        .map_err(|e| e.to_string())
}
