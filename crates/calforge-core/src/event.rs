//! Canonical calendar event model.
//!
//! This module provides the types every template dialect converges to:
//! - [`CalendarEvent`]: the normalized event handed to exporters and providers
//! - [`RecurrenceRule`]: a repeat descriptor, rendered as an RRULE value
//! - [`Reminder`]: a notification override

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::time::EventTime;

/// How often a recurring event repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Returns the RRULE keyword for this frequency.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            "YEARLY" => Ok(Self::Yearly),
            _ => Err(TemplateError::InvalidFrequency(s.to_string())),
        }
    }
}

/// Returns the two-letter RRULE code for a weekday.
pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Parses a full name, three-letter abbreviation or two-letter code.
pub fn parse_weekday(name: &str) -> Result<Weekday, TemplateError> {
    let day = match name.trim().to_uppercase().as_str() {
        "MONDAY" | "MON" | "MO" => Weekday::Mon,
        "TUESDAY" | "TUE" | "TU" => Weekday::Tue,
        "WEDNESDAY" | "WED" | "WE" => Weekday::Wed,
        "THURSDAY" | "THU" | "TH" => Weekday::Thu,
        "FRIDAY" | "FRI" | "FR" => Weekday::Fri,
        "SATURDAY" | "SAT" | "SA" => Weekday::Sat,
        "SUNDAY" | "SUN" | "SU" => Weekday::Sun,
        _ => return Err(TemplateError::InvalidWeekday(name.to_string())),
    };
    Ok(day)
}

/// Serializes weekdays as two-letter codes.
mod day_codes {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(days: &[Weekday], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(days.iter().map(|d| super::weekday_code(*d)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Weekday>, D::Error> {
        Vec::<String>::deserialize(d)?
            .iter()
            .map(|name| super::parse_weekday(name).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// A recurrence descriptor. Occurrences are never expanded locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Every Nth unit of the frequency; always at least 1.
    pub interval: u32,
    /// Inclusive end bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, with = "day_codes", skip_serializing_if = "Vec::is_empty")]
    pub by_day: Vec<Weekday>,
    #[serde(default)]
    pub exclude_weekends: bool,
}

impl RecurrenceRule {
    /// Creates a rule repeating every unit of `frequency` with no bound.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            until: None,
            count: None,
            by_day: Vec::new(),
            exclude_weekends: false,
        }
    }

    /// Builder method to set the interval. Zero is treated as 1.
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Builder method to set the inclusive end bound.
    pub fn with_until(mut self, until: DateTime<FixedOffset>) -> Self {
        self.until = Some(until);
        self
    }

    /// Builder method to set an occurrence limit. Zero means no limit.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = (count > 0).then_some(count);
        self
    }

    /// Builder method to set the weekdays, dropping duplicates.
    pub fn with_by_day(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.by_day.clear();
        for day in days {
            if !self.by_day.contains(&day) {
                self.by_day.push(day);
            }
        }
        self
    }

    /// Builder method to restrict to weekdays.
    ///
    /// When no weekdays were given, Monday through Friday are filled in.
    pub fn with_exclude_weekends(mut self, exclude: bool) -> Self {
        self.exclude_weekends = exclude;
        if exclude && self.by_day.is_empty() {
            self.by_day = vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ];
        }
        self
    }

    /// Renders the rule as an RRULE value (without the `RRULE:` prefix).
    pub fn to_rrule(&self) -> String {
        let mut parts = vec![format!("FREQ={}", self.frequency)];
        if self.interval > 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }
        if let Some(until) = self.until {
            parts.push(format!(
                "UNTIL={}",
                until.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ")
            ));
        }
        if let Some(count) = self.count.filter(|c| *c > 0) {
            parts.push(format!("COUNT={count}"));
        }
        if !self.by_day.is_empty() {
            let days: Vec<&str> = self.by_day.iter().map(|d| weekday_code(*d)).collect();
            parts.push(format!("BYDAY={}", days.join(",")));
        }
        parts.join(";")
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rrule())
    }
}

/// How a reminder is delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Email,
    #[default]
    Popup,
}

impl ReminderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Popup => "popup",
        }
    }
}

/// A reminder fired `minutes` before the event starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    #[serde(default)]
    pub method: ReminderMethod,
    pub minutes: u32,
}

impl Reminder {
    pub fn new(method: ReminderMethod, minutes: u32) -> Self {
        Self { method, minutes }
    }
}

/// A normalized calendar event.
///
/// All-day events carry [`EventTime::AllDay`] on both ends, with `end` one
/// day past the last day covered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    pub start: EventTime,
    pub end: EventTime,
    /// IANA zone the times were resolved in; `None` for the local zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reminders: Vec<Reminder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl CalendarEvent {
    /// Creates a new event with required fields.
    pub fn new(name: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            location: String::new(),
            links: Vec::new(),
            start,
            end,
            time_zone: None,
            recurrence: None,
            reminders: Vec::new(),
            color_id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Returns the time between start and end.
    pub fn duration(&self) -> Duration {
        self.end.to_utc_datetime() - self.start.to_utc_datetime()
    }

    /// Returns the description followed by a "Useful Links" block.
    pub fn formatted_description(&self) -> String {
        let mut desc = self.description.clone();
        if !self.links.is_empty() {
            if !desc.is_empty() {
                desc.push_str("\n\n");
            }
            desc.push_str("Useful Links:\n");
            for link in &self.links {
                desc.push_str("- ");
                desc.push_str(link);
                desc.push('\n');
            }
        }
        desc
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Builder method to set links.
    pub fn with_links(mut self, links: Vec<String>) -> Self {
        self.links = links;
        self
    }

    /// Builder method to set the resolving timezone name.
    pub fn with_time_zone(mut self, tz: Option<impl Into<String>>) -> Self {
        self.time_zone = tz.map(Into::into);
        self
    }

    /// Builder method to attach a recurrence rule.
    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    /// Builder method to set reminders.
    pub fn with_reminders(mut self, reminders: Vec<Reminder>) -> Self {
        self.reminders = reminders;
        self
    }

    /// Builder method to set the color id.
    pub fn with_color_id(mut self, color_id: Option<impl Into<String>>) -> Self {
        self.color_id = color_id.map(Into::into);
        self
    }

    /// Builder method to set metadata.
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}
