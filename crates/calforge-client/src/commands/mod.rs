//! Subcommand implementations.

use calforge_core::{CalendarEvent, TemplateParser};
use tracing::info;

use crate::cli::TemplateArgs;
use crate::config::ClientConfig;
use crate::error::ClientResult;

pub mod add;
#[cfg(feature = "google")]
pub mod auth;
#[cfg(feature = "google")]
pub mod calendars;
pub mod config;
#[cfg(feature = "ics")]
pub mod export;
pub mod validate;

/// Parses the template named by `args` in the configured timezone.
pub(crate) fn load_events(
    config: &ClientConfig,
    args: &TemplateArgs,
) -> ClientResult<Vec<CalendarEvent>> {
    let parser = TemplateParser::new(&config.timezone)?;
    let events = parser.parse_file(&args.input, args.format)?;
    info!("parsed {} events from {}", events.len(), args.input.display());
    Ok(events)
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn loads_events_in_configured_zone() {
        let dir = tempfile::tempdir().unwrap();
        let args = write_template(dir.path(), SINGLE_TEMPLATE);
        let config = ClientConfig {
            timezone: "Europe/Paris".to_string(),
            ..Default::default()
        };

        let events = load_events(&config, &args).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "Kickoff");
        assert_eq!(events[0].time_zone.as_deref(), Some("Europe/Paris"));
        assert_eq!(events[0].start.to_string(), "2025-03-10T09:00:00+01:00");
        assert!(events[1].is_all_day());
    }

    #[test]
    fn bad_timezone_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = write_template(dir.path(), SINGLE_TEMPLATE);
        let config = ClientConfig {
            timezone: "Nowhere/Special".to_string(),
            ..Default::default()
        };
        assert!(matches!(load_events(&config, &args), Err(ClientError::Template(_))));

        let missing = TemplateArgs {
            input: dir.path().join("missing.json"),
            ..args
        };
        assert!(matches!(
            load_events(&ClientConfig::default(), &missing),
            Err(ClientError::Template(_))
        ));
    }
}
