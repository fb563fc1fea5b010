//! `calforge validate`: parse a template without side effects.

use calforge_core::{CalendarEvent, render_summary};

use crate::cli::TemplateArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

pub fn run(config: &ClientConfig, args: &TemplateArgs, json: bool) -> ClientResult<()> {
    let events = super::load_events(config, args)?;
    println!("{}", render(&events, json, config.verbose)?);
    Ok(())
}

fn render(events: &[CalendarEvent], json: bool, verbose: bool) -> ClientResult<String> {
    if json {
        return serde_json::to_string_pretty(events)
            .map_err(|e| ClientError::Config(format!("failed to serialize events: {}", e)));
    }

    let mut out = render_summary(events, verbose);
    out.push_str(&format!("\n{} events parsed successfully.", events.len()));
    Ok(out)
}
