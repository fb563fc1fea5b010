//! Errors raised while publishing events.
//!
//! Codes follow the write path: getting a usable token, reaching the
//! service, having the target calendar accept the event, and reading or
//! writing local files. Two questions matter to a caller holding a failed
//! [`EventResult`](crate::EventResult): will the same request work later
//! ([`ProviderError::is_retryable`]), and will every other event in the
//! batch fail the same way ([`ProviderError::affects_batch`]).

use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// No usable tokens, or the consent flow did not complete.
    NotAuthenticated,
    /// The account may not write to the target calendar.
    AccessDenied,
    /// The target calendar does not exist.
    CalendarNotFound,
    /// The service refused this particular event.
    EventRejected,
    /// Too many requests.
    Throttled,
    /// Connect failure, timeout or truncated body.
    Network,
    /// The service failed on its side (5xx).
    ServiceUnavailable,
    /// A response body that does not decode.
    MalformedResponse,
    /// Credentials, scopes, ports or calendar id are unusable.
    Configuration,
    /// A token or export file could not be read or written.
    Storage,
    Internal,
}

impl ProviderErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::AccessDenied => "access_denied",
            Self::CalendarNotFound => "calendar_not_found",
            Self::EventRejected => "event_rejected",
            Self::Throttled => "throttled",
            Self::Network => "network",
            Self::ServiceUnavailable => "service_unavailable",
            Self::MalformedResponse => "malformed_response",
            Self::Configuration => "configuration",
            Self::Storage => "storage",
            Self::Internal => "internal",
        }
    }

    /// The same request may succeed if sent again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Throttled | Self::Network | Self::ServiceUnavailable
        )
    }

    /// Every remaining event of a batch will fail the same way.
    pub fn affects_batch(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::AccessDenied | Self::CalendarNotFound | Self::Configuration
        )
    }

    /// What the user can do about it, when there is something to do.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotAuthenticated => Some("run 'calforge auth' to sign in again"),
            Self::AccessDenied => Some("check that the account can edit the target calendar"),
            Self::CalendarNotFound => {
                Some("check calendar_id against 'calforge list-calendars'")
            }
            Self::Throttled => Some("raise google.request_delay_ms in config.toml"),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by a backend.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// Backend that raised the error (`"google"`, `"ics"`).
    provider: Option<String>,
    /// Server-suggested wait for [`ProviderErrorCode::Throttled`].
    retry_after: Option<Duration>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            retry_after: None,
            source: None,
        }
    }

    pub fn not_authenticated(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotAuthenticated, message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AccessDenied, message)
    }

    pub fn calendar_not_found(calendar_id: &str) -> Self {
        Self::new(
            ProviderErrorCode::CalendarNotFound,
            format!("calendar '{}' not found", calendar_id),
        )
    }

    /// The service refused the event; `reason` is its explanation.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::EventRejected, reason)
    }

    pub fn throttled(retry_after: Option<Duration>) -> Self {
        let message = match retry_after {
            Some(wait) => format!("rate limit exceeded, retry after {}s", wait.as_secs()),
            None => "rate limit exceeded".to_string(),
        };
        let mut err = Self::new(ProviderErrorCode::Throttled, message);
        err.retry_after = retry_after;
        err
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Network, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServiceUnavailable, message)
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::MalformedResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Configuration, message)
    }

    /// A local file operation failed; `action` names it ("write token file").
    pub fn storage(action: &str, path: &std::path::Path, source: std::io::Error) -> Self {
        Self::new(
            ProviderErrorCode::Storage,
            format!("failed to {} {}: {}", action, path.display(), source),
        )
        .with_source(source)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Internal, message)
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn affects_batch(&self) -> bool {
        self.code.affects_batch()
    }

    pub fn hint(&self) -> Option<&'static str> {
        self.code.hint()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
