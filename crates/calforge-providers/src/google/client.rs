//! Google Calendar API v3 client and request shapes.

use std::time::Duration;

use calforge_core::{CalendarEvent, EventTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::CreatedEvent;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Low-level client bound to one access token.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("calforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProviderError::internal("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
        })
    }

    /// Updates the access token (after refresh).
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// Inserts an event into `calendar_id`.
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        request: &EventRequest,
    ) -> ProviderResult<CreatedEvent> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await
            .map_err(request_error)?;

        let inserted: InsertedEvent = read_json(response, Some(calendar_id)).await?;
        debug!("inserted event {} into {}", inserted.id, calendar_id);

        Ok(CreatedEvent {
            id: inserted.id,
            html_link: inserted.html_link,
        })
    }

    /// Lists the calendars on the user's calendar list.
    pub async fn list_calendars(&self) -> ProviderResult<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(request_error)?;

        let list: CalendarListResponse = read_json(response, None).await?;
        Ok(list.items)
    }
}

fn request_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::network("request timeout")
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {}", e))
    } else {
        ProviderError::network(format!("request failed: {}", e))
    }
}

/// Decodes a successful body, or maps the failure status to a provider error.
///
/// `calendar_id` is the calendar the request targeted, if any.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    calendar_id: Option<&str>,
) -> ProviderResult<T> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

    if let Some(err) = status_error(status, retry_after, &body, calendar_id) {
        return Err(err);
    }

    serde_json::from_str(&body).map_err(|e| {
        ProviderError::malformed_response(format!("failed to parse response: {}", e))
    })
}

fn status_error(
    status: reqwest::StatusCode,
    retry_after: Option<Duration>,
    body: &str,
    calendar_id: Option<&str>,
) -> Option<ProviderError> {
    use reqwest::StatusCode;

    if status.is_success() {
        return None;
    }
    let err = match (status, calendar_id) {
        (StatusCode::TOO_MANY_REQUESTS, _) => ProviderError::throttled(retry_after),
        (StatusCode::UNAUTHORIZED, _) => {
            ProviderError::not_authenticated("access token expired or invalid")
        }
        (StatusCode::FORBIDDEN, Some(id)) => {
            ProviderError::access_denied(format!("no write access to '{}'", id))
        }
        (StatusCode::FORBIDDEN, None) => ProviderError::access_denied(api_message(body)),
        (StatusCode::NOT_FOUND, Some(id)) => ProviderError::calendar_not_found(id),
        (StatusCode::BAD_REQUEST, _) => ProviderError::rejected(api_message(body)),
        (s, _) if s.is_server_error() => {
            ProviderError::unavailable(format!("API error ({}): {}", s, api_message(body)))
        }
        (s, _) => ProviderError::rejected(format!("API error ({}): {}", s, api_message(body))),
    };
    Some(err)
}

/// Pulls `error.message` out of a Google error body, falling back to the raw text.
fn api_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Body of an `events.insert` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub summary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminders: Option<EventReminders>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

/// Either `date` (all-day) or `dateTime` with an optional `timeZone`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReminders {
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: u32,
}

impl EventRequest {
    pub fn from_event(event: &CalendarEvent) -> Self {
        let (start, end) = if event.is_all_day() {
            (
                EventDateTime::date(&event.start),
                EventDateTime::date(&event.end),
            )
        } else {
            let zone = event.time_zone.as_deref();
            (
                EventDateTime::timed(&event.start, zone),
                EventDateTime::timed(&event.end, zone),
            )
        };

        let recurrence = event
            .recurrence
            .iter()
            .map(|rule| format!("RRULE:{}", rule.to_rrule()))
            .collect();

        let reminders = (!event.reminders.is_empty()).then(|| EventReminders {
            use_default: false,
            overrides: event
                .reminders
                .iter()
                .map(|r| ReminderOverride {
                    method: r.method.as_str().to_string(),
                    minutes: r.minutes,
                })
                .collect(),
        });

        Self {
            summary: event.name.clone(),
            description: event.formatted_description(),
            location: event.location.clone(),
            start,
            end,
            recurrence,
            reminders,
            color_id: event.color_id.clone(),
        }
    }
}

impl EventDateTime {
    fn date(time: &EventTime) -> Self {
        Self {
            date: Some(time.date().format("%Y-%m-%d").to_string()),
            date_time: None,
            time_zone: None,
        }
    }

    fn timed(time: &EventTime, zone: Option<&str>) -> Self {
        Self {
            date: None,
            date_time: Some(time.to_string()),
            time_zone: zone.map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    id: String,
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
}

/// A calendar from the calendar list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    #[serde(default)]
    pub primary: bool,
    pub time_zone: Option<String>,
    /// `owner`, `writer`, `reader` or `freeBusyReader`.
    pub access_role: Option<String>,
}
