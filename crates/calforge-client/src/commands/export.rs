//! `calforge export`: write template events to an iCalendar file.

use std::path::Path;

use calforge_providers::ics::write_ics;
use chrono::Utc;

use crate::cli::TemplateArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

pub fn run(config: &ClientConfig, args: &TemplateArgs, output: &Path) -> ClientResult<()> {
    let events = super::load_events(config, args)?;
    write_ics(&events, output, Utc::now()).map_err(|e| ClientError::Export(e.to_string()))?;
    println!("Exported {} events to {}", events.len(), output.display());
    Ok(())
}
