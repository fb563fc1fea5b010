//! Command-line interface definition.

use std::path::PathBuf;

use calforge_core::TemplateFormat;
use clap::{Parser, Subcommand};

use crate::config::ClientConfig;

/// calforge - Turn JSON schedule templates into calendar events
#[derive(Debug, Parser)]
#[command(name = "calforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "CALFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Timezone for template times ("local" or an IANA name)
    #[arg(long, short = 't', global = true)]
    pub timezone: Option<String>,

    /// Target calendar ID
    #[arg(long, global = true)]
    pub calendar: Option<String>,

    /// Path to Google OAuth credentials JSON
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    /// Path to the token file
    #[arg(long, global = true)]
    pub token: Option<PathBuf>,

    /// Show event descriptions in summaries
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(ref tz) = self.timezone {
            config.timezone = tz.clone();
        }
        if let Some(ref calendar) = self.calendar {
            config.calendar_id = calendar.clone();
        }
        if let Some(ref path) = self.credentials {
            config.google.credentials_file = path.clone();
        }
        if let Some(ref path) = self.token {
            config.google.token_path = Some(path.clone());
        }
        if self.verbose {
            config.verbose = true;
        }
    }
}

/// Template input shared by the parsing commands.
#[derive(Debug, Clone, clap::Args)]
pub struct TemplateArgs {
    /// Template JSON file
    #[arg(long, short)]
    pub input: PathBuf,

    /// Template format: auto, weekly, single, recurring, daterange
    #[arg(long, short, default_value = "auto")]
    pub format: TemplateFormat,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the events of a template in Google Calendar
    Add {
        #[command(flatten)]
        template: TemplateArgs,

        /// Print the events instead of creating them
        #[arg(long)]
        dry_run: bool,
    },

    /// Parse a template and show the resulting events
    Validate {
        #[command(flatten)]
        template: TemplateArgs,

        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the events of a template to an .ics file
    #[cfg(feature = "ics")]
    Export {
        #[command(flatten)]
        template: TemplateArgs,

        /// Output file
        #[arg(long, short, default_value = "events.ics")]
        output: PathBuf,
    },

    /// List the calendars of the authenticated account
    #[cfg(feature = "google")]
    ListCalendars,

    /// Authenticate with Google Calendar
    #[cfg(feature = "google")]
    Auth {
        /// Discard stored tokens and run the consent flow again
        #[arg(long, short)]
        force: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
