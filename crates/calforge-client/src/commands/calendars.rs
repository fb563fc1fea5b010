//! `calforge list-calendars`.

use calforge_providers::google::GoogleProvider;
use calforge_providers::{CalendarInfo, CalendarProvider};

use crate::config::ClientConfig;
use crate::error::ClientResult;

pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    let provider = GoogleProvider::new(config.google_config()?)?;
    provider.ensure_authorized(false).await?;

    let calendars = provider.list_calendars().await?;
    if calendars.is_empty() {
        println!("No calendars found.");
        return Ok(());
    }

    println!("Available calendars:");
    for calendar in &calendars {
        println!("{}", format_calendar(calendar));
    }
    Ok(())
}

fn format_calendar(calendar: &CalendarInfo) -> String {
    let marker = if calendar.is_primary { " (primary)" } else { "" };
    format!("  {}{}\n    ID: {}", calendar.name, marker, calendar.id)
}
