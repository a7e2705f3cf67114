//! Read-only cluster views.

use std::io::{BufRead, Write};

use tim_repository::IndexService;

use crate::console::Console;
use crate::errors::CommandError;

pub async fn ping<R: BufRead, W: Write>(
    service: &IndexService,
    console: &mut Console<R, W>,
) -> Result<(), CommandError> {
    console.echo(&service.formatted_info().await?)?;
    Ok(())
}

pub async fn aliases<R: BufRead, W: Write>(
    service: &IndexService,
    console: &mut Console<R, W>,
) -> Result<(), CommandError> {
    console.echo(&service.formatted_aliases().await?)?;
    Ok(())
}

pub async fn indexes<R: BufRead, W: Write>(
    service: &IndexService,
    console: &mut Console<R, W>,
) -> Result<(), CommandError> {
    console.echo(&service.formatted_indexes().await?)?;
    Ok(())
}
