//! iCalendar (.ics) export.

use std::fs;
use std::path::Path;

use calforge_core::{CalendarEvent, EventTime};
use chrono::{DateTime, Duration, Utc};
use icalendar::{Alarm, Calendar, Component, EventLike, Property, Trigger, ValueType};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{ProviderError, ProviderResult};

const PRODUCT_ID: &str = "-//calforge//Calendar Event Generator//EN";
const UID_DOMAIN: &str = "calforge";

/// Renders `events` as a `METHOD:REQUEST` calendar.
///
/// `dtstamp` is written to every VEVENT so identical input yields
/// identical output.
pub fn generate_ics(events: &[CalendarEvent], dtstamp: DateTime<Utc>) -> String {
    let mut cal = Calendar::new();
    cal.append_property(Property::new("PRODID", PRODUCT_ID));
    cal.append_property(Property::new("METHOD", "REQUEST"));
    let stamp = dtstamp.format("%Y%m%dT%H%M%SZ").to_string();

    for event in events {
        let mut vevent = icalendar::Event::new();
        vevent.uid(&event_uid(event));
        vevent.summary(&event.name);
        vevent.add_property("DTSTAMP", &stamp);

        if !event.description.is_empty() || !event.links.is_empty() {
            vevent.description(&event.formatted_description());
        }
        if !event.location.is_empty() {
            vevent.location(&event.location);
        }

        add_time_property(&mut vevent, "DTSTART", &event.start, event.time_zone.as_deref());
        add_time_property(&mut vevent, "DTEND", &event.end, event.time_zone.as_deref());

        if let Some(rule) = &event.recurrence {
            vevent.add_property("RRULE", rule.to_rrule());
        }

        for reminder in &event.reminders {
            let trigger = Trigger::before_start(Duration::minutes(i64::from(reminder.minutes)));
            vevent.alarm(Alarm::display(&event.name, trigger));
        }

        cal.push(vevent.done());
    }

    strip_crate_defaults(&cal.done().to_string())
}

/// Writes the rendered calendar to `path`.
pub fn write_ics(
    events: &[CalendarEvent],
    path: impl AsRef<Path>,
    dtstamp: DateTime<Utc>,
) -> ProviderResult<()> {
    let path = path.as_ref();
    fs::write(path, generate_ics(events, dtstamp))
        .map_err(|e| ProviderError::storage("write", path, e).with_provider("ics"))?;
    info!("wrote {} events to {}", events.len(), path.display());
    Ok(())
}

/// Stable identifier derived from name, start and description.
pub fn event_uid(event: &CalendarEvent) -> String {
    let seed = format!("{}-{}-{}", event.name, event.start, event.description);
    format!("{:x}@{}", Sha256::digest(seed.as_bytes()), UID_DOMAIN)
}

/// All-day times become `VALUE=DATE`; timed ones carry `TZID` for named
/// zones and fall back to UTC otherwise.
fn add_time_property(
    vevent: &mut icalendar::Event,
    name: &str,
    time: &EventTime,
    zone: Option<&str>,
) {
    match (time, zone) {
        (EventTime::AllDay(date), _) => {
            let mut prop = Property::new(name, date.format("%Y%m%d").to_string());
            prop.append_parameter(ValueType::Date);
            vevent.append_property(prop);
        }
        (EventTime::DateTime(dt), Some(tzid)) => {
            let mut prop = Property::new(name, dt.format("%Y%m%dT%H%M%S").to_string());
            prop.add_parameter("TZID", tzid);
            vevent.append_property(prop);
        }
        (EventTime::DateTime(_), None) => {
            let utc = time.to_utc_datetime().format("%Y%m%dT%H%M%SZ").to_string();
            vevent.add_property(name, utc);
        }
    }
}

/// Drops what `icalendar` writes on its own and cannot be told not to: its
/// default PRODID header and a DTSTAMP/UID inside every VALARM.
fn strip_crate_defaults(ics: &str) -> String {
    let mut out = String::with_capacity(ics.len());
    let mut in_alarm = false;

    for line in ics.lines() {
        if line.strip_prefix("PRODID:").is_some_and(|id| id != PRODUCT_ID) {
            continue;
        }

        match line {
            "BEGIN:VALARM" => in_alarm = true,
            "END:VALARM" => in_alarm = false,
            _ => {}
        }
        if in_alarm && (line.starts_with("DTSTAMP:") || line.starts_with("UID:")) {
            continue;
        }

        out.push_str(line);
        out.push_str("\r\n");
    }

    out
}
