//! Flexible parsing of human-entered dates, times and durations.
//!
//! Every parser is bound to one [`Zone`] for its lifetime; all instants it
//! builds are wall-clock times in that zone. Layouts and strategies are tried
//! in a fixed order and the first success wins.

use std::fmt;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveTime};
use regex::Regex;
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::time::{Clock, SystemClock, Zone};

/// An hour and minute pair in 24-hour form.
pub type HourMinute = (u32, u32);

/// Date layouts in priority order.
const DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d",   // 2025-12-09
    "%m/%d/%Y",   // 12/09/2025
    "%d-%m-%Y",   // 09-12-2025
    "%B %d, %Y",  // December 9, 2025
    "%b %d, %Y",  // Dec 9, 2025
    "%Y/%m/%d",   // 2025/12/09
];

static COMPACT_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:\d+(?:\.\d*)?|\.\d+)(?:h|ms|us|µs|ns|m|s))+$")
        .expect("valid compact duration regex")
});

static DURATION_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d*)?|\.\d+)(h|ms|us|µs|ns|m|s)").expect("valid duration segment regex")
});

static HOUR_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)\s*(?:hours?|hrs?)").expect("valid hour words regex"));

static MINUTE_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)\s*(?:minutes?|mins?)").expect("valid minute words regex"));

static EXTRACT_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*h(?:ours?)?\s*(?:(\d+)\s*m)?|(\d+)\s*m(?:in(?:utes?)?)?")
        .expect("valid duration extraction regex")
});

type DurationStrategy = fn(&str) -> Option<Duration>;

/// Duration strategies in the order they are tried.
const DURATION_STRATEGIES: &[(&str, DurationStrategy)] = &[
    ("compact", parse_compact_duration),
    ("unit words", parse_unit_words_duration),
    ("extracted", extract_duration),
];

/// Parses dates, times and durations relative to a fixed timezone.
#[derive(Clone)]
pub struct TimeParser {
    zone: Zone,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TimeParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeParser")
            .field("zone", &self.zone)
            .field("clock", &self.clock)
            .finish()
    }
}

impl TimeParser {
    /// Creates a parser bound to `zone`, reading the system clock.
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates a parser from a timezone name (`""`/`"local"` or IANA).
    pub fn for_timezone(name: &str) -> TemplateResult<Self> {
        Zone::from_name(name).map(Self::new)
    }

    /// Replaces the clock used to compute "today".
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Returns the zone this parser is bound to.
    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    /// Returns the current date in the parser's zone.
    pub fn today(&self) -> NaiveDate {
        self.zone.date_of(self.clock.now())
    }

    /// Parses a calendar date using the first layout that accepts it.
    pub fn parse_date(&self, text: &str) -> TemplateResult<NaiveDate> {
        let text = text.trim();
        DATE_LAYOUTS
            .iter()
            .find_map(|layout| NaiveDate::parse_from_str(text, layout).ok())
            .ok_or_else(|| TemplateError::DateFormat(text.to_string()))
    }

    /// Parses a 12- or 24-hour clock time into `(hour, minute)`.
    ///
    /// `"10:00am"`, `"10:00 AM"` and `"10:00 a.m."` are equivalent. A
    /// trailing seconds segment is ignored.
    pub fn parse_time(&self, text: &str) -> TemplateResult<HourMinute> {
        let invalid = || TemplateError::TimeFormat(text.trim().to_string());

        let mut cleaned: String = text
            .to_lowercase()
            .chars()
            .filter(|c| *c != '.' && !c.is_whitespace())
            .collect();

        let meridiem = if cleaned.ends_with("pm") {
            Some(true)
        } else if cleaned.ends_with("am") {
            Some(false)
        } else {
            None
        };
        if meridiem.is_some() {
            cleaned.truncate(cleaned.len() - 2);
        }

        let mut parts = cleaned.split(':');
        let (Some(hour), Some(minute)) = (parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let mut hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;

        match meridiem {
            Some(true) if hour < 12 => hour += 12,
            Some(false) if hour == 12 => hour = 0,
            _ => {}
        }

        Ok((hour, minute))
    }

    /// Parses `"11:00am – 1:00pm"` style ranges into start and end times.
    ///
    /// En dash, em dash and the word `to` are accepted as separators.
    pub fn parse_time_range(&self, text: &str) -> TemplateResult<(HourMinute, HourMinute)> {
        let normalized = text
            .replace(['\u{2013}', '\u{2014}'], "-")
            .replace("to", "-")
            .replace("TO", "-");

        let parts: Vec<&str> = normalized.split('-').collect();
        let [start, end] = parts.as_slice() else {
            return Err(TemplateError::TimeFormat(format!(
                "invalid time range: {}",
                text.trim()
            )));
        };

        Ok((self.parse_time(start)?, self.parse_time(end)?))
    }

    /// Parses a duration such as `"2h"`, `"1h30m"`, `"90 min"` or `"1 hour"`.
    pub fn parse_duration(&self, text: &str) -> TemplateResult<Duration> {
        let text = text.trim().to_lowercase();
        for (name, strategy) in DURATION_STRATEGIES {
            if let Some(duration) = strategy(&text) {
                debug!(input = %text, strategy = name, "parsed duration");
                return Ok(duration);
            }
        }
        Err(TemplateError::DurationFormat(text))
    }

    /// Builds the instant at `hour:minute` on `date` in the parser's zone.
    pub fn combine_date_time(
        &self,
        date: NaiveDate,
        hour: u32,
        minute: u32,
    ) -> TemplateResult<DateTime<FixedOffset>> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .and_then(|time| self.zone.localize(date.and_time(time)))
            .ok_or_else(|| TemplateError::TimeFormat(format!("{hour:02}:{minute:02}")))
    }

    /// Returns midnight at the start of `date`.
    pub fn start_of_day(&self, date: NaiveDate) -> TemplateResult<DateTime<FixedOffset>> {
        self.combine_date_time(date, 0, 0)
    }

    /// Returns 23:59:59 on `date`.
    pub fn end_of_day(&self, date: NaiveDate) -> TemplateResult<DateTime<FixedOffset>> {
        NaiveTime::from_hms_opt(23, 59, 59)
            .and_then(|time| self.zone.localize(date.and_time(time)))
            .ok_or_else(|| TemplateError::TimeFormat("23:59:59".to_string()))
    }

    /// Builds the instant at `hour:minute`, moved to the next day when it
    /// would fall before `start`.
    pub fn end_after(
        &self,
        start: DateTime<FixedOffset>,
        date: NaiveDate,
        (hour, minute): HourMinute,
    ) -> TemplateResult<DateTime<FixedOffset>> {
        let end = self.combine_date_time(date, hour, minute)?;
        if end >= start {
            return Ok(end);
        }
        let next = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| TemplateError::DateFormat(date.to_string()))?;
        self.combine_date_time(next, hour, minute)
    }

    /// Parses `text` as a duration and returns `start` shifted by it.
    pub fn add_duration(
        &self,
        start: DateTime<FixedOffset>,
        text: &str,
    ) -> TemplateResult<DateTime<FixedOffset>> {
        let duration = self.parse_duration(text)?;
        start
            .checked_add_signed(duration)
            .ok_or_else(|| TemplateError::DurationFormat(text.trim().to_string()))
    }

    /// Parses a date plus a time range into start and end instants.
    ///
    /// An end before the start is taken as an overnight event and moved to
    /// the following day.
    pub fn parse_date_time_range(
        &self,
        date_text: &str,
        range_text: &str,
    ) -> TemplateResult<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        let date = self.parse_date(date_text)?;
        let ((sh, sm), end) = self.parse_time_range(range_text)?;
        let start = self.combine_date_time(date, sh, sm)?;
        let end = self.end_after(start, date, end)?;
        Ok((start, end))
    }
}

/// Strict `1h30m` syntax: decimal values each followed by a unit.
fn parse_compact_duration(text: &str) -> Option<Duration> {
    if text == "0" {
        return Some(Duration::zero());
    }
    if !COMPACT_DURATION.is_match(text) {
        return None;
    }

    let mut nanos = 0f64;
    for caps in DURATION_SEGMENT.captures_iter(text) {
        let value: f64 = caps[1].parse().ok()?;
        let unit = match &caps[2] {
            "h" => 3_600_000_000_000f64,
            "m" => 60_000_000_000f64,
            "s" => 1_000_000_000f64,
            "ms" => 1_000_000f64,
            "us" | "µs" => 1_000f64,
            _ => 1f64,
        };
        nanos += value * unit;
    }
    if !nanos.is_finite() || nanos > i64::MAX as f64 {
        return None;
    }
    Some(Duration::nanoseconds(nanos.round() as i64))
}

/// Rewrites `hour`/`hr`/`minute`/`min` words as unit letters and retries.
fn parse_unit_words_duration(text: &str) -> Option<Duration> {
    let text = HOUR_WORDS.replace_all(text, "${1}h");
    let text = MINUTE_WORDS.replace_all(&text, "${1}m");
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    parse_compact_duration(&compact)
}

/// Pulls an hour and/or minute count out of free text.
///
/// A count that does not fit the duration range rejects the strategy.
fn extract_duration(text: &str) -> Option<Duration> {
    let caps = EXTRACT_DURATION.captures(text)?;
    let number = |i: usize| -> Option<i64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let hours = number(1)?;
    let minutes = if caps.get(3).is_some() { number(3)? } else { number(2)? };
    Duration::try_hours(hours)?.checked_add(&Duration::try_minutes(minutes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedClock;
    use chrono::{TimeZone, Utc};

    fn parser() -> TimeParser {
        TimeParser::for_timezone("America/New_York").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod dates {
        use super::*;

        #[test]
        fn all_layouts_agree() {
            let p = parser();
            for text in [
                "2025-12-09",
                "12/09/2025",
                "09-12-2025",
                "December 9, 2025",
                "Dec 9, 2025",
                "2025/12/09",
            ] {
                assert_eq!(p.parse_date(text).unwrap(), date(2025, 12, 9), "{text}");
            }
        }

        #[test]
        fn slash_is_month_first() {
            assert_eq!(parser().parse_date("01/02/2025").unwrap(), date(2025, 1, 2));
        }

        #[test]
        fn hyphen_is_day_first() {
            assert_eq!(parser().parse_date("01-02-2025").unwrap(), date(2025, 2, 1));
        }

        #[test]
        fn surrounding_whitespace() {
            assert_eq!(parser().parse_date("  2025-03-04 ").unwrap(), date(2025, 3, 4));
        }

        #[test]
        fn rejects_unknown_layout() {
            for text in ["next tuesday", "2025.12.09", "", "2025-13-01"] {
                let err = parser().parse_date(text).unwrap_err();
                assert!(matches!(err, TemplateError::DateFormat(_)), "{text}");
            }
        }
    }

    mod times {
        use super::*;

        #[test]
        fn meridiem_spellings() {
            let p = parser();
            assert_eq!(p.parse_time("10:00am").unwrap(), (10, 0));
            assert_eq!(p.parse_time("10:00 AM").unwrap(), (10, 0));
            assert_eq!(p.parse_time("10:00 a.m.").unwrap(), (10, 0));
            assert_eq!(p.parse_time("3:45 P.M.").unwrap(), (15, 45));
        }

        #[test]
        fn noon_and_midnight() {
            let p = parser();
            assert_eq!(p.parse_time("12:30pm").unwrap(), (12, 30));
            assert_eq!(p.parse_time("12:15am").unwrap(), (0, 15));
        }

        #[test]
        fn twenty_four_hour() {
            let p = parser();
            assert_eq!(p.parse_time("23:05").unwrap(), (23, 5));
            assert_eq!(p.parse_time("07:30:45").unwrap(), (7, 30));
        }

        #[test]
        fn rejects_malformed() {
            let p = parser();
            for text in ["10", "10am", "ab:cd", "", "10:xx"] {
                let err = p.parse_time(text).unwrap_err();
                assert!(matches!(err, TemplateError::TimeFormat(_)), "{text}");
            }
        }

        #[test]
        fn ranges() {
            let p = parser();
            assert_eq!(
                p.parse_time_range("11:00am \u{2013} 1:00pm").unwrap(),
                ((11, 0), (13, 0))
            );
            assert_eq!(p.parse_time_range("10:00 - 12:00").unwrap(), ((10, 0), (12, 0)));
            assert_eq!(p.parse_time_range("9:00 to 9:30").unwrap(), ((9, 0), (9, 30)));
            assert_eq!(
                p.parse_time_range("9:00 TO 17:00").unwrap(),
                ((9, 0), (17, 0))
            );
            assert_eq!(
                p.parse_time_range("18:00\u{2014}20:00").unwrap(),
                ((18, 0), (20, 0))
            );
        }

        #[test]
        fn range_needs_two_parts() {
            let p = parser();
            assert!(p.parse_time_range("10:00").is_err());
            assert!(p.parse_time_range("10:00-11:00-12:00").is_err());
        }
    }

    mod durations {
        use super::*;

        #[test]
        fn compact_forms() {
            let p = parser();
            assert_eq!(p.parse_duration("2h").unwrap(), Duration::hours(2));
            assert_eq!(p.parse_duration("30m").unwrap(), Duration::minutes(30));
            assert_eq!(p.parse_duration("1h30m").unwrap(), Duration::minutes(90));
            assert_eq!(p.parse_duration("1.5h").unwrap(), Duration::minutes(90));
            assert_eq!(p.parse_duration("45s").unwrap(), Duration::seconds(45));
            assert_eq!(p.parse_duration("0").unwrap(), Duration::zero());
        }

        #[test]
        fn unit_words() {
            let p = parser();
            assert_eq!(p.parse_duration("90min").unwrap(), Duration::minutes(90));
            assert_eq!(p.parse_duration("2 hours").unwrap(), Duration::hours(2));
            assert_eq!(p.parse_duration("1 Hour").unwrap(), Duration::hours(1));
            assert_eq!(p.parse_duration("1hr30min").unwrap(), Duration::minutes(90));
            assert_eq!(
                p.parse_duration("1 hour 15 minutes").unwrap(),
                Duration::minutes(75)
            );
        }

        #[test]
        fn extracted_from_text() {
            let p = parser();
            assert_eq!(p.parse_duration("about 2 h").unwrap(), Duration::hours(2));
            assert_eq!(
                p.parse_duration("roughly 45 m or so").unwrap(),
                Duration::minutes(45)
            );
        }

        #[test]
        fn strategies_run_in_order() {
            assert!(parse_compact_duration("90 min").is_none());
            assert_eq!(
                parse_unit_words_duration("90 min"),
                Some(Duration::minutes(90))
            );
            assert!(parse_unit_words_duration("about 2 h").is_none());
        }

        #[test]
        fn rejects_garbage() {
            let err = parser().parse_duration("a while").unwrap_err();
            assert!(matches!(err, TemplateError::DurationFormat(ref s) if s == "a while"));
        }

        #[test]
        fn out_of_range_counts_are_rejected() {
            let p = parser();
            for text in ["9999999999999h", "99999999999999999999 minutes", "about 99999999999999999999 h"] {
                let err = p.parse_duration(text).unwrap_err();
                assert!(matches!(err, TemplateError::DurationFormat(_)), "{text}");
            }
            assert!(extract_duration("9999999999999 h").is_none());
            assert_eq!(extract_duration("2 h"), Some(Duration::hours(2)));
        }

        #[test]
        fn shifted_start_stays_in_range() {
            let p = parser();
            let start = p.combine_date_time(date(2025, 2, 3), 10, 0).unwrap();
            assert_eq!(
                p.add_duration(start, "90 min").unwrap(),
                start + Duration::minutes(90)
            );
            let err = p.add_duration(start, "3000000000h").unwrap_err();
            assert!(matches!(err, TemplateError::DurationFormat(ref s) if s == "3000000000h"));
        }
    }

    mod instants {
        use super::*;

        #[test]
        fn combine_uses_zone_offset() {
            let p = parser();
            let winter = p.combine_date_time(date(2025, 1, 15), 9, 0).unwrap();
            let summer = p.combine_date_time(date(2025, 7, 15), 9, 0).unwrap();
            assert_eq!(winter.to_rfc3339(), "2025-01-15T09:00:00-05:00");
            assert_eq!(summer.to_rfc3339(), "2025-07-15T09:00:00-04:00");
        }

        #[test]
        fn combine_rejects_out_of_range() {
            let err = parser().combine_date_time(date(2025, 1, 15), 25, 0).unwrap_err();
            assert!(matches!(err, TemplateError::TimeFormat(ref s) if s == "25:00"));
        }

        #[test]
        fn overnight_range_rolls_over() {
            let (start, end) = parser()
                .parse_date_time_range("2025-12-31", "23:00 - 01:00")
                .unwrap();
            assert_eq!(start.to_rfc3339(), "2025-12-31T23:00:00-05:00");
            assert_eq!(end.to_rfc3339(), "2026-01-01T01:00:00-05:00");
        }

        #[test]
        fn same_day_range() {
            let (start, end) = parser()
                .parse_date_time_range("March 3, 2025", "11:00am - 1:00pm")
                .unwrap();
            assert_eq!(start.to_rfc3339(), "2025-03-03T11:00:00-05:00");
            assert_eq!(end.to_rfc3339(), "2025-03-03T13:00:00-05:00");
        }

        #[test]
        fn end_of_day() {
            let dt = parser().end_of_day(date(2025, 6, 1)).unwrap();
            assert_eq!(dt.to_rfc3339(), "2025-06-01T23:59:59-04:00");
        }

        #[test]
        fn today_uses_clock_and_zone() {
            // 03:00 UTC is still the previous evening in New York.
            let now = Utc.with_ymd_and_hms(2025, 5, 10, 3, 0, 0).unwrap();
            let p = parser().with_clock(FixedClock(now));
            assert_eq!(p.today(), date(2025, 5, 9));
        }
    }
}
