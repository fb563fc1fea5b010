//! Single events: `{"events": [{"name", "date", "start_time", ...}]}`.

use chrono::{Days, Duration};
use serde::Deserialize;

use super::{EventDetails, present, required};
use crate::error::{ResultExt, TemplateError, TemplateResult};
use crate::event::CalendarEvent;
use crate::temporal::TimeParser;
use crate::time::EventTime;

/// A one-off event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SingleRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    /// Used when `end_time` is absent.
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(flatten)]
    pub details: EventDetails,
}

impl SingleRecord {
    pub(super) fn to_event(&self, parser: &TimeParser) -> TemplateResult<CalendarEvent> {
        let name = required(&self.name, "name")?;
        let date = parser.parse_date(required(&self.date, "date")?).field("date")?;

        if self.all_day {
            let next = date
                .checked_add_days(Days::new(1))
                .ok_or_else(|| TemplateError::DateFormat(self.date.clone()))?;
            let event = CalendarEvent::new(name, EventTime::AllDay(date), EventTime::AllDay(next));
            return Ok(self.details.apply(event));
        }

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

        let event = CalendarEvent::new(name, EventTime::DateTime(start), EventTime::DateTime(end))
            .with_time_zone(parser.zone().name());
        Ok(self.details.apply(event))
    }
}
