//! Recurring events: `{"events": [{"name", "start_time", "recurrence": {...}}]}`.

use chrono::Duration;
use serde::Deserialize;

use super::{EventDetails, present, required};
use crate::error::{ResultExt, TemplateError, TemplateResult};
use crate::event::{CalendarEvent, Frequency, RecurrenceRule, parse_weekday};
use crate::temporal::TimeParser;
use crate::time::EventTime;

/// The `recurrence` object of a recurring record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecurrenceInput {
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub interval: Option<u32>,
    /// Last day of the series, inclusive.
    #[serde(default)]
    pub until: Option<String>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub by_day: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_weekends: bool,
}

impl RecurrenceInput {
    fn to_rule(&self, parser: &TimeParser) -> TemplateResult<RecurrenceRule> {
        let frequency: Frequency = self.frequency.parse()?;

        let days = self
            .by_day
            .iter()
            .flatten()
            .map(|name| parse_weekday(name))
            .collect::<TemplateResult<Vec<_>>>()?;

        let mut rule = RecurrenceRule::new(frequency)
            .with_interval(self.interval.unwrap_or(1))
            .with_count(self.count.unwrap_or(0))
            .with_by_day(days)
            .with_exclude_weekends(self.exclude_weekends);

        if let Some(until) = present(&self.until) {
            let date = parser.parse_date(&until).field("until")?;
            rule = rule.with_until(parser.end_of_day(date)?);
        }
        Ok(rule)
    }
}

/// An event that repeats on a schedule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecurringRecord {
    #[serde(default)]
    pub name: String,
    /// First occurrence; today in the parser's zone when absent.
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub recurrence: Option<RecurrenceInput>,
    #[serde(flatten)]
    pub details: EventDetails,
}

impl RecurringRecord {
    pub(super) fn to_event(&self, parser: &TimeParser) -> TemplateResult<CalendarEvent> {
        let name = required(&self.name, "name")?;

        let date = match present(&self.start_date) {
            Some(text) => parser.parse_date(&text).field("start date")?,
            None => parser.today(),
        };

        let start_text = present(&self.start_time).ok_or(TemplateError::MissingField("start_time"))?;
        let (hour, minute) = parser.parse_time(&start_text).field("start time")?;
        let start = parser.combine_date_time(date, hour, minute).field("start time")?;

        let end = if let Some(end_text) = present(&self.end_time) {
            let end = parser.parse_time(&end_text).field("end time")?;
            parser.end_after(start, date, end).field("end time")?
        } else if let Some(duration) = present(&self.duration) {
            parser.add_duration(start, &duration).field("duration")?
        } else {
            start + Duration::hours(1)
        };

        let rule = self
            .recurrence
            .as_ref()
            .ok_or(TemplateError::MissingField("recurrence"))?
            .to_rule(parser)
            .field("recurrence")?;

        let event = CalendarEvent::new(name, EventTime::DateTime(start), EventTime::DateTime(end))
            .with_time_zone(parser.zone().name())
            .with_recurrence(rule);
        Ok(self.details.apply(event))
    }
}
