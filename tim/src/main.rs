//! TIM entry point.

use std::process::ExitCode;

use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};

use tim::errors::{EXIT_FAILURE, EXIT_SUCCESS};
use tim::logging::init_tracing;
use tim::reporting::ErrorReporting;
use tim::{commands, Cli, CommandError, Console, Dependencies, Settings};

async fn run(cli: Cli, settings: Settings) -> Result<(), CommandError> {
    let deps = Dependencies::new(&cli.url, &settings).await?;
    let mut console = Console::stdio();
    commands::run_timed(cli.command, &deps.service, &mut console).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };
    // Held until exit so queued events are flushed.
    let reporting = match ErrorReporting::init(&settings) {
        Ok(reporting) => reporting,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };
    if let Err(e) = init_tracing(cli.verbose, &settings) {
        eprintln!("{}", e);
        return ExitCode::from(EXIT_FAILURE);
    }
    info!(sentry_enabled = reporting.is_enabled(), "{}", reporting.status_message());

    match run(cli, settings).await {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CommandError::Aborted) => {
            eprintln!("Aborted!");
            ExitCode::from(EXIT_FAILURE)
        }
        Err(e @ CommandError::Usage(_)) => {
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
