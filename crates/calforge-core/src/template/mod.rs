//! Template parsing: format detection, dispatch and per-dialect conversion.
//!
//! A template is a JSON document in one of four dialects. Each dialect is
//! decoded into [`RawRecord`]s, which are then projected onto
//! [`CalendarEvent`]s through a shared [`TimeParser`]. A single failing
//! record fails the whole parse.

mod daterange;
mod recurring;
mod single;
mod weekly;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

pub use daterange::DateRangeRecord;
pub use recurring::{RecurrenceInput, RecurringRecord};
pub use single::SingleRecord;
pub use weekly::WeeklyRecord;

use crate::error::{ResultExt, TemplateError, TemplateResult};
use crate::event::{CalendarEvent, Reminder};
use crate::temporal::TimeParser;

/// The dialect of a template document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TemplateFormat {
    /// Detect the dialect from the document.
    #[default]
    Auto,
    Weekly,
    Single,
    Recurring,
    DateRange,
}

impl TemplateFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Weekly => "weekly",
            Self::Single => "single",
            Self::Recurring => "recurring",
            Self::DateRange => "daterange",
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateFormat {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "weekly" => Ok(Self::Weekly),
            "single" => Ok(Self::Single),
            "recurring" => Ok(Self::Recurring),
            "daterange" => Ok(Self::DateRange),
            _ => Err(TemplateError::UnknownFormat(s.to_string())),
        }
    }
}

/// Returns true for keys that label a week group (`week_1`, `Week 2`, `week1`).
pub(crate) fn is_week_key(key: &str) -> bool {
    let key = key.to_lowercase();
    key.starts_with("week_") || key.starts_with("week ") || key == "week1"
}

/// Chooses the dialect of `data`.
///
/// An explicit string `format` field wins (unless it is `"auto"`), then
/// week-labelled keys, then the shape of the first entry in `events`.
/// Anything else, including unparseable input, is treated as single events.
pub fn detect_format(data: &[u8]) -> TemplateResult<TemplateFormat> {
    let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(data) else {
        return Ok(TemplateFormat::Single);
    };

    if let Some(Value::String(declared)) = map.get("format") {
        let format: TemplateFormat = declared.parse()?;
        if format != TemplateFormat::Auto {
            return Ok(format);
        }
    }

    if map.keys().any(|key| is_week_key(key)) {
        return Ok(TemplateFormat::Weekly);
    }

    if let Some(Value::Array(events)) = map.get("events") {
        if let Some(Value::Object(first)) = events.first() {
            if first.contains_key("recurrence") {
                return Ok(TemplateFormat::Recurring);
            }
            if first.contains_key("end_date") {
                return Ok(TemplateFormat::DateRange);
            }
        }
    }

    Ok(TemplateFormat::Single)
}

/// One decoded input record, before conversion.
#[derive(Debug, Clone)]
pub enum RawRecord {
    Weekly(WeeklyRecord),
    Single(SingleRecord),
    Recurring(RecurringRecord),
    DateRange(DateRangeRecord),
}

impl RawRecord {
    /// Decodes every record of `data` as the given concrete dialect.
    pub fn decode_all(data: &[u8], format: TemplateFormat) -> TemplateResult<Vec<RawRecord>> {
        match format {
            TemplateFormat::Weekly => weekly::decode(data),
            TemplateFormat::Single => {
                Ok(decode_events::<SingleRecord>(data, "single events")?
                    .into_iter()
                    .map(Self::Single)
                    .collect())
            }
            TemplateFormat::Recurring => {
                Ok(decode_events::<RecurringRecord>(data, "recurring events")?
                    .into_iter()
                    .map(Self::Recurring)
                    .collect())
            }
            TemplateFormat::DateRange => {
                Ok(decode_events::<DateRangeRecord>(data, "date range events")?
                    .into_iter()
                    .map(Self::DateRange)
                    .collect())
            }
            TemplateFormat::Auto => Err(TemplateError::UnknownFormat("auto".to_string())),
        }
    }

    /// Returns the declared name of the record.
    pub fn name(&self) -> &str {
        match self {
            Self::Weekly(r) => &r.event_name,
            Self::Single(r) => &r.name,
            Self::Recurring(r) => &r.name,
            Self::DateRange(r) => &r.name,
        }
    }

    /// Converts the record into a canonical event, tagging failures with its name.
    pub fn to_event(&self, parser: &TimeParser) -> TemplateResult<CalendarEvent> {
        let event = match self {
            Self::Weekly(r) => r.to_event(parser),
            Self::Single(r) => r.to_event(parser),
            Self::Recurring(r) => r.to_event(parser),
            Self::DateRange(r) => r.to_event(parser),
        };
        event.record(self.name())
    }
}

#[derive(Deserialize)]
struct EventsDocument<T> {
    #[serde(default = "Vec::new")]
    events: Vec<T>,
}

fn decode_events<T: for<'de> Deserialize<'de>>(
    data: &[u8],
    context: &str,
) -> TemplateResult<Vec<T>> {
    serde_json::from_slice::<EventsDocument<T>>(data)
        .map(|doc| doc.events)
        .map_err(|e| TemplateError::json(context, e))
}

/// Optional fields shared by the single, recurring and date-range dialects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventDetails {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub links: Option<Vec<String>>,
    #[serde(default)]
    pub color_id: Option<String>,
    #[serde(default)]
    pub reminders: Option<Vec<Reminder>>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl EventDetails {
    fn apply(&self, event: CalendarEvent) -> CalendarEvent {
        event
            .with_description(present(&self.description).unwrap_or_default())
            .with_location(present(&self.location).unwrap_or_default())
            .with_links(self.links.clone().unwrap_or_default())
            .with_color_id(present(&self.color_id))
            .with_reminders(self.reminders.clone().unwrap_or_default())
            .with_metadata(self.metadata.clone().unwrap_or_default())
    }
}

/// Returns the trimmed-non-empty value of an optional text field.
fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Returns `value` or a missing-field error when it is blank.
fn required<'a>(value: &'a str, field: &'static str) -> TemplateResult<&'a str> {
    if value.trim().is_empty() {
        Err(TemplateError::MissingField(field))
    } else {
        Ok(value)
    }
}

/// Converts template documents into canonical events.
#[derive(Debug, Clone)]
pub struct TemplateParser {
    time: TimeParser,
}

impl TemplateParser {
    /// Creates a parser for the given timezone name (`""`/`"local"` or IANA).
    pub fn new(timezone: &str) -> TemplateResult<Self> {
        TimeParser::for_timezone(timezone).map(Self::with_time_parser)
    }

    /// Creates a parser around an existing time parser.
    pub fn with_time_parser(time: TimeParser) -> Self {
        Self { time }
    }

    /// Returns the underlying time parser.
    pub fn time_parser(&self) -> &TimeParser {
        &self.time
    }

    /// Reads and parses a template file.
    pub fn parse_file(
        &self,
        path: impl AsRef<Path>,
        format: TemplateFormat,
    ) -> TemplateResult<Vec<CalendarEvent>> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| TemplateError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&data, format)
            .map_err(|source| TemplateError::InFile {
                path: path.to_path_buf(),
                source: Box::new(source),
            })
    }

    /// Parses a template document, detecting the dialect when `format` is
    /// [`TemplateFormat::Auto`].
    pub fn parse(&self, data: &[u8], format: TemplateFormat) -> TemplateResult<Vec<CalendarEvent>> {
        let format = match format {
            TemplateFormat::Auto => {
                let detected = detect_format(data)?;
                debug!(format = %detected, "detected template format");
                detected
            }
            explicit => explicit,
        };

        let records = RawRecord::decode_all(data, format)?;
        info!(format = %format, records = records.len(), "parsing template");

        records
            .iter()
            .map(|record| {
                debug!(name = record.name(), "converting record");
                record.to_event(&self.time)
            })
            .collect()
    }

    /// Parses a template held in a string.
    pub fn parse_str(&self, data: &str, format: TemplateFormat) -> TemplateResult<Vec<CalendarEvent>> {
        self.parse(data.as_bytes(), format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateErrorKind;
    use crate::time::FixedClock;
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    pub(super) fn parser() -> TemplateParser {
        let now = Utc.with_ymd_and_hms(2025, 4, 14, 15, 0, 0).unwrap();
        let time = TimeParser::for_timezone("Europe/Berlin")
            .unwrap()
            .with_clock(FixedClock(now));
        TemplateParser::with_time_parser(time)
    }

    mod detection {
        use super::*;

        fn detect(json: &str) -> TemplateFormat {
            detect_format(json.as_bytes()).unwrap()
        }

        #[test]
        fn explicit_format_wins_over_week_keys() {
            assert_eq!(
                detect(r#"{"format": "Single", "week_1": []}"#),
                TemplateFormat::Single
            );
        }

        #[test]
        fn auto_format_falls_through() {
            assert_eq!(
                detect(r#"{"format": "auto", "week_1": []}"#),
                TemplateFormat::Weekly
            );
        }

        #[test]
        fn non_string_format_is_ignored() {
            assert_eq!(detect(r#"{"format": 3, "Week 1": []}"#), TemplateFormat::Weekly);
        }

        #[test]
        fn unknown_explicit_format() {
            let err = detect_format(br#"{"format": "bogus"}"#).unwrap_err();
            assert_eq!(err.kind(), TemplateErrorKind::UnknownFormat);
        }

        #[test]
        fn week_keys() {
            assert_eq!(detect(r#"{"WEEK_3": []}"#), TemplateFormat::Weekly);
            assert_eq!(detect(r#"{"week1": []}"#), TemplateFormat::Weekly);
            assert_eq!(detect(r#"{"weekly": []}"#), TemplateFormat::Single);
        }

        #[test]
        fn first_event_shape() {
            assert_eq!(
                detect(r#"{"events": [{"recurrence": {}}, {"end_date": "x"}]}"#),
                TemplateFormat::Recurring
            );
            assert_eq!(
                detect(r#"{"events": [{"end_date": "2025-01-01"}]}"#),
                TemplateFormat::DateRange
            );
            assert_eq!(detect(r#"{"events": [{"date": "x"}]}"#), TemplateFormat::Single);
            assert_eq!(detect(r#"{"events": []}"#), TemplateFormat::Single);
        }

        #[test]
        fn unparseable_defaults_to_single() {
            assert_eq!(detect("not json"), TemplateFormat::Single);
            assert_eq!(detect("[1, 2]"), TemplateFormat::Single);
        }
    }

    mod format_names {
        use super::*;

        #[test]
        fn parse_any_case() {
            assert_eq!("DateRange".parse::<TemplateFormat>().unwrap(), TemplateFormat::DateRange);
            assert_eq!("AUTO".parse::<TemplateFormat>().unwrap(), TemplateFormat::Auto);
            assert!("ics".parse::<TemplateFormat>().is_err());
        }
    }

    mod dispatch {
        use super::*;

        #[test]
        fn unknown_format_creates_nothing() {
            let err = parser()
                .parse_str(r#"{"format": "bogus", "events": [{"name": "x"}]}"#, TemplateFormat::Auto)
                .unwrap_err();
            assert!(matches!(err, TemplateError::UnknownFormat(ref f) if f == "bogus"));
        }

        #[test]
        fn explicit_format_skips_detection() {
            let json = r#"{"events": [{"name": "Trip", "start_date": "2025-05-01", "end_date": "2025-05-03"}]}"#;
            let events = parser().parse_str(json, TemplateFormat::DateRange).unwrap();
            assert_eq!(events.len(), 1);
            assert!(events[0].is_all_day());
        }

        #[test]
        fn malformed_json_is_a_shape_error() {
            let err = parser().parse_str("{", TemplateFormat::Auto).unwrap_err();
            assert_eq!(err.kind(), TemplateErrorKind::JsonShape);
        }

        #[test]
        fn one_bad_record_fails_everything() {
            let json = r#"{"events": [
                {"name": "Ok", "date": "2025-05-01", "start_time": "10:00"},
                {"name": "Broken", "date": "2025-05-02", "start_time": "noon"}
            ]}"#;
            let err = parser().parse_str(json, TemplateFormat::Auto).unwrap_err();
            assert_eq!(err.kind(), TemplateErrorKind::RecordConversion);
            assert_eq!(err.record_name(), Some("Broken"));
            assert_eq!(err.root().kind(), TemplateErrorKind::TimeFormat);
        }

        #[test]
        fn missing_events_is_empty() {
            let events = parser().parse_str(r#"{"format": "single"}"#, TemplateFormat::Auto).unwrap();
            assert!(events.is_empty());
        }

        #[test]
        fn every_dialect_keeps_name_and_order() {
            let weekly = r#"{"week_1": [{"event_name": "W", "date": "2025-05-05", "time": "9:00 - 10:00"}]}"#;
            let single = r#"{"events": [{"name": "S", "date": "2025-05-05", "start_time": "9:00"}]}"#;
            let recurring = r#"{"events": [{"name": "R", "start_time": "9:00", "recurrence": {"frequency": "daily"}}]}"#;
            let range = r#"{"events": [{"name": "D", "start_date": "2025-05-05", "end_date": "2025-05-05"}]}"#;

            for (json, name) in [(weekly, "W"), (single, "S"), (recurring, "R"), (range, "D")] {
                let events = parser().parse_str(json, TemplateFormat::Auto).unwrap();
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].name, name);
                assert!(events[0].end >= events[0].start, "{name}");
            }
        }
    }

    mod files {
        use super::*;

        #[test]
        fn parse_file_reads_template() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(
                file,
                r#"{{"events": [{{"name": "Dentist", "date": "2025-06-02", "start_time": "8:30am"}}]}}"#
            )
            .unwrap();

            let events = parser()
                .parse_file(file.path(), TemplateFormat::Auto)
                .unwrap();
            assert_eq!(events[0].name, "Dentist");
            assert_eq!(events[0].start.to_string(), "2025-06-02T08:30:00+02:00");
        }

        #[test]
        fn missing_file() {
            let dir = tempfile::tempdir().unwrap();
            let err = parser()
                .parse_file(dir.path().join("nope.json"), TemplateFormat::Auto)
                .unwrap_err();
            assert_eq!(err.kind(), TemplateErrorKind::FileRead);
        }

        #[test]
        fn errors_carry_the_path() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(file, r#"{{"format": "bogus"}}"#).unwrap();

            let err = parser()
                .parse_file(file.path(), TemplateFormat::Auto)
                .unwrap_err();
            assert!(matches!(err, TemplateError::InFile { .. }));
            assert_eq!(err.kind(), TemplateErrorKind::UnknownFormat);
            assert!(err.to_string().contains("unknown template format: bogus"));
        }
    }
}
