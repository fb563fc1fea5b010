//! Core types: temporal parsing, template dialects, canonical events

pub mod error;
pub mod event;
pub mod summary;
pub mod temporal;
pub mod template;
pub mod time;

pub use error::{TemplateError, TemplateErrorKind, TemplateResult};
pub use event::{
    CalendarEvent, Frequency, RecurrenceRule, Reminder, ReminderMethod, parse_weekday,
    weekday_code,
};
pub use summary::render_summary;
pub use temporal::{HourMinute, TimeParser};
pub use template::{RawRecord, TemplateFormat, TemplateParser, detect_format};
pub use time::{Clock, EventTime, FixedClock, SystemClock, Zone};
