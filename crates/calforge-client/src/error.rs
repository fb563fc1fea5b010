//! Client error types.

use std::fmt;

use calforge_core::TemplateError;
use calforge_providers::ProviderError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// The template could not be parsed.
    Template(TemplateError),
    /// Calendar backend error.
    Provider(ProviderError),
    /// IO error.
    Io(std::io::Error),
    /// Writing the calendar file failed.
    Export(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Template(err) => write!(f, "template error: {}", err),
            Self::Provider(err) => {
                write!(f, "provider error: {}", err)?;
                if let Some(hint) = err.hint() {
                    write!(f, " ({})", hint)?;
                }
                Ok(())
            }
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Export(msg) => write!(f, "export failed: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Template(err) => Some(err),
            Self::Provider(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<TemplateError> for ClientError {
    fn from(err: TemplateError) -> Self {
        Self::Template(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_prefixes() {
        let err = ClientError::Config("timezone is empty".into());
        assert_eq!(err.to_string(), "configuration error: timezone is empty");

        let err = ClientError::Export("disk full".into());
        assert_eq!(err.to_string(), "export failed: disk full");
    }

    #[test]
    fn provider_errors_keep_their_source() {
        let err: ClientError = ProviderError::calendar_not_found("team")
            .with_provider("google")
            .into();
        assert_eq!(
            err.to_string(),
            "provider error: [google] calendar_not_found: calendar 'team' not found \
             (check calendar_id against 'calforge list-calendars')"
        );
        assert!(err.source().is_some());

        let err: ClientError = ProviderError::malformed_response("truncated JSON").into();
        assert_eq!(err.to_string(), "provider error: malformed_response: truncated JSON");
    }

    #[test]
    fn template_errors_convert() {
        let err: ClientError = TemplateError::UnknownFormat("ical".into()).into();
        assert!(matches!(err, ClientError::Template(_)));
        assert!(err.to_string().contains("ical"));
    }
}
