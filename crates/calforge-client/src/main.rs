//! calforge CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use calforge_client::cli::{Cli, Command, ConfigAction};
use calforge_client::commands;
use calforge_client::config::ClientConfig;
use calforge_client::error::ClientResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let mut config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };
    cli.apply_overrides(&mut config);

    match cli.command {
        Some(Command::Add { template, dry_run }) => {
            commands::add::run(&config, &template, dry_run).await
        }
        Some(Command::Validate { template, json }) => {
            commands::validate::run(&config, &template, json)
        }
        #[cfg(feature = "ics")]
        Some(Command::Export { template, output }) => {
            commands::export::run(&config, &template, &output)
        }
        #[cfg(feature = "google")]
        Some(Command::ListCalendars) => commands::calendars::run(&config).await,
        #[cfg(feature = "google")]
        Some(Command::Auth { force }) => commands::auth::run(&config, force).await,
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
        None => {
            print_quick_start();
            Ok(())
        }
    }
}

fn print_quick_start() {
    println!("calforge - Turn JSON schedule templates into calendar events");
    println!();
    println!("Run 'calforge --help' for usage information.");
    println!();
    println!("Quick start:");
    println!("  1. Download an OAuth client JSON from the Google Cloud Console");
    println!("     and save it as credentials.json");
    println!("  2. Check a template:   calforge validate -i schedule.json");
    println!("  3. Authenticate:       calforge auth");
    println!("  4. Create the events:  calforge add -i schedule.json");
    println!();
    println!("Or write them to a file: calforge export -i schedule.json -o events.ics");
}
