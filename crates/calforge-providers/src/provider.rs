//! CalendarProvider trait and throttled batch creation.
//!
//! A provider accepts canonical [`CalendarEvent`]s one at a time. Batches are
//! pushed through [`create_events`], which submits sequentially with a fixed
//! delay between requests and isolates failures to the event that caused them.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use calforge_core::CalendarEvent;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

/// Information about a calendar the account can write to.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_primary: bool,
    /// IANA timezone of the calendar.
    pub timezone: Option<String>,
}

impl CalendarInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            is_primary: false,
            timezone: None,
        }
    }

    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// Identity of an event the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedEvent {
    pub id: String,
    /// Deep link to the event in the backend's UI, when it provides one.
    pub html_link: Option<String>,
}

/// Outcome of submitting one event in a batch.
#[derive(Debug)]
pub struct EventResult {
    /// Name of the submitted event.
    pub name: String,
    pub outcome: ProviderResult<CreatedEvent>,
}

impl EventResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn link(&self) -> Option<&str> {
        self.outcome.as_ref().ok().and_then(|c| c.html_link.as_deref())
    }

    pub fn error(&self) -> Option<&ProviderError> {
        self.outcome.as_ref().err()
    }
}

/// A boxed future that is Send.
///
/// Used by trait methods that return futures so the trait stays object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A calendar backend that can receive events.
pub trait CalendarProvider: Send + Sync {
    /// Returns the name of this backend (e.g. `"google"`).
    fn name(&self) -> &str;

    /// Lists calendars available to the authenticated account.
    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>>;

    /// Creates a single event.
    fn create_event<'a>(
        &'a self,
        event: &'a CalendarEvent,
    ) -> BoxFuture<'a, ProviderResult<CreatedEvent>>;

    /// Checks if the backend holds usable credentials.
    fn is_authenticated(&self) -> bool;
}

/// Submits `events` one by one, sleeping `delay` between requests.
///
/// A failed event never stops the batch. `progress` is called after each
/// submission with the 1-based position, the batch size and the result.
pub async fn create_events<P, F>(
    provider: &P,
    events: &[CalendarEvent],
    delay: Duration,
    mut progress: F,
) -> Vec<EventResult>
where
    P: CalendarProvider + ?Sized,
    F: FnMut(usize, usize, &EventResult),
{
    let total = events.len();
    let mut results = Vec::with_capacity(total);

    info!("creating {} events via {}", total, provider.name());

    for (i, event) in events.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = provider.create_event(event).await;
        match &outcome {
            Ok(created) => debug!("created event '{}' as {}", event.name, created.id),
            Err(e) => warn!("failed to create event '{}': {}", event.name, e),
        }

        let result = EventResult {
            name: event.name.clone(),
            outcome,
        };
        progress(i + 1, total, &result);
        results.push(result);
    }

    results
}
