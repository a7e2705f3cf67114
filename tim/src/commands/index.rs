//! Index management commands.

use std::io::{BufRead, Write};

use tracing::{error, info};

use tim_repository::{IndexService, TimError};
use tim_shared::{generate_index_name, PRIMARY_ALIAS};

use super::cluster;
use super::describe_aliases;
use crate::cli::{CreateArgs, DeleteArgs, DemoteArgs, PromoteArgs};
use crate::console::Console;
use crate::errors::CommandError;

/// Create an index named explicitly or after a source, then show all indexes.
///
/// An existing index with the same name aborts the command.
pub async fn create<R: BufRead, W: Write>(
    service: &IndexService,
    console: &mut Console<R, W>,
    args: CreateArgs,
) -> Result<(), CommandError> {
    let index = match (args.index, args.source) {
        (Some(_), Some(_)) => {
            return Err(CommandError::usage(
                "Only one of --index and --source options is allowed, not both.",
            ))
        }
        (None, None) => {
            return Err(CommandError::usage(
                "Must provide either a name or source for the new index.",
            ))
        }
        (Some(index), None) => index,
        (None, Some(source)) => generate_index_name(&source),
    };

    match service.create_index(&index).await {
        Ok(created) => info!(index = %created, "Index '{}' created.", created),
        Err(e @ TimError::IndexExists(_)) => {
            error!("{}", e);
            return Err(CommandError::Aborted);
        }
        Err(e) => return Err(e.into()),
    }
    cluster::indexes(service, console).await
}

/// Delete an index after confirmation, then show all indexes.
pub async fn delete<R: BufRead, W: Write>(
    service: &IndexService,
    console: &mut Console<R, W>,
    args: DeleteArgs,
) -> Result<(), CommandError> {
    let index = args.index;
    if !args.force
        && !console.confirm(&format!("Are you sure you want to delete index '{}'?", index))?
    {
        console.echo("Ok, index will not be deleted.")?;
        return Err(CommandError::Aborted);
    }

    service.delete_index(&index).await?;
    console.echo(&format!("Index '{}' deleted.", index))?;
    cluster::indexes(service, console).await
}

/// Promote an index atomically, then show all aliases.
pub async fn promote<R: BufRead, W: Write>(
    service: &IndexService,
    console: &mut Console<R, W>,
    args: PromoteArgs,
) -> Result<(), CommandError> {
    service.promote_index(&args.index, &args.aliases).await?;
    let aliases = describe_aliases(service, &args.index).await?;
    info!(
        "Index promoted. Current aliases for index '{}': {}",
        args.index, aliases
    );
    cluster::aliases(service, console).await
}

/// Remove an index from all of its aliases, then show all aliases.
///
/// Leaving the primary alias needs confirmation, since the source then has no
/// production index.
pub async fn demote<R: BufRead, W: Write>(
    service: &IndexService,
    console: &mut Console<R, W>,
    args: DemoteArgs,
) -> Result<(), CommandError> {
    let index = args.index;
    let Some(aliases) = service.get_index_aliases(&index).await? else {
        console.echo(&format!(
            "Index '{}' has no aliases, please check aliases and try again.",
            index
        ))?;
        return Err(CommandError::Aborted);
    };

    if aliases.iter().any(|alias| alias == PRIMARY_ALIAS)
        && !console.confirm(&format!(
            "Are you sure you want to demote index '{}' from the primary alias \
             without promoting another index for the source?",
            index
        ))?
    {
        console.echo("Ok, index will not be demoted.")?;
        return Err(CommandError::Aborted);
    }

    let removed = service.demote_index(&index).await?;
    console.echo(&format!(
        "Index '{}' demoted from aliases: {}",
        index,
        removed.join(", ")
    ))?;
    cluster::aliases(service, console).await
}
