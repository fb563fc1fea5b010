//! Publishing backends for canonical calendar events.
//!
//! - [`CalendarProvider`] - trait implemented by remote calendar services
//! - [`create_events`] - throttled, failure-isolating batch submission
//! - [`google`] - Google Calendar over OAuth 2.0 (feature `google`)
//! - [`ics`] - iCalendar file export (feature `ics`)
//!
//! # Architecture
//!
//! ```text
//!        Vec<CalendarEvent>
//!               │
//!      ┌────────┴─────────┐
//!      ▼                  ▼
//! create_events()     generate_ics()
//!      │                  │
//!      ▼                  ▼
//! GoogleProvider      events.ics
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
#[cfg(feature = "ics")]
pub mod ics;
pub mod provider;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{
    BoxFuture, CalendarInfo, CalendarProvider, CreatedEvent, EventResult, create_events,
};
