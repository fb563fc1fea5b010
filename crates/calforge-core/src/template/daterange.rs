//! Multi-day events: `{"events": [{"name", "start_date", "end_date", ...}]}`.

use chrono::Days;
use serde::Deserialize;

use super::{EventDetails, present, required};
use crate::error::{ResultExt, TemplateError, TemplateResult};
use crate::event::CalendarEvent;
use crate::temporal::TimeParser;
use crate::time::EventTime;

/// An event spanning one or more days.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    /// Implied when neither time is given.
    #[serde(default)]
    pub all_day: bool,
    #[serde(flatten)]
    pub details: EventDetails,
}

impl DateRangeRecord {
    pub(super) fn to_event(&self, parser: &TimeParser) -> TemplateResult<CalendarEvent> {
        let name = required(&self.name, "name")?;
        let start_date = parser
            .parse_date(required(&self.start_date, "start_date")?)
            .field("start date")?;
        let end_date = parser
            .parse_date(required(&self.end_date, "end_date")?)
            .field("end date")?;

        let start_time = present(&self.start_time);
        let end_time = present(&self.end_time);
        let all_day = self.all_day || (start_time.is_none() && end_time.is_none());

        let (start, end) = if all_day {
            let exclusive_end = end_date
                .checked_add_days(Days::new(1))
                .ok_or_else(|| TemplateError::DateFormat(self.end_date.clone()))?;
            (EventTime::AllDay(start_date), EventTime::AllDay(exclusive_end))
        } else {
            let (sh, sm) = match start_time {
                Some(text) => parser.parse_time(&text).field("start time")?,
                None => (0, 0),
            };
            let (eh, em) = match end_time {
                Some(text) => parser.parse_time(&text).field("end time")?,
                None => (23, 59),
            };
            let start = parser.combine_date_time(start_date, sh, sm).field("start time")?;
            let end = parser.combine_date_time(end_date, eh, em).field("end time")?;
            (EventTime::DateTime(start), EventTime::DateTime(end))
        };

        if end < start {
            return Err(TemplateError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let mut event = CalendarEvent::new(name, start, end);
        if !all_day {
            event = event.with_time_zone(parser.zone().name());
        }
        Ok(self.details.apply(event))
    }
}
