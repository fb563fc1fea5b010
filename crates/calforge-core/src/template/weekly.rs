//! Weekly schedules: `{"week_1": [...], "week_2": [...]}`.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{RawRecord, is_week_key, present, required};
use crate::error::{ResultExt, TemplateError, TemplateResult};
use crate::event::CalendarEvent;
use crate::temporal::TimeParser;
use crate::time::EventTime;

/// One session of a weekly schedule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeeklyRecord {
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub date: String,
    /// A time range such as `"11:00am - 1:00pm"`.
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub topic_details: Option<String>,
    #[serde(default)]
    pub useful_links: Option<Vec<String>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl WeeklyRecord {
    pub(super) fn to_event(&self, parser: &TimeParser) -> TemplateResult<CalendarEvent> {
        let name = required(&self.event_name, "event_name")?;
        let date = required(&self.date, "date")?;
        let time = required(&self.time, "time")?;

        let (start, end) = parser.parse_date_time_range(date, time).field("date/time")?;

        let mut description = present(&self.topic_details).unwrap_or_default();
        if let Some(extra) = present(&self.description) {
            if !description.is_empty() {
                description.push_str("\n\n");
            }
            description.push_str(&extra);
        }

        Ok(CalendarEvent::new(name, EventTime::DateTime(start), EventTime::DateTime(end))
            .with_description(description)
            .with_location(present(&self.location).unwrap_or_default())
            .with_links(self.useful_links.clone().unwrap_or_default())
            .with_time_zone(parser.zone().name()))
    }
}

/// Decodes the week groups in lexical key order; other keys are ignored.
pub(super) fn decode(data: &[u8]) -> TemplateResult<Vec<RawRecord>> {
    let groups: Map<String, Value> =
        serde_json::from_slice(data).map_err(|e| TemplateError::json("weekly", e))?;

    let mut keys: Vec<&String> = groups.keys().filter(|key| is_week_key(key)).collect();
    keys.sort();

    let mut records = Vec::new();
    for key in keys {
        let week: Vec<WeeklyRecord> = serde_json::from_value(groups[key.as_str()].clone())
            .map_err(|e| TemplateError::json(format!("week {key}"), e))?;
        records.extend(week.into_iter().map(RawRecord::Weekly));
    }
    Ok(records)
}
