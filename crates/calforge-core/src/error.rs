//! Error types for template parsing.
//!
//! Every failure aborts the whole parse. Low-level temporal errors are
//! wrapped with the field that produced them, then with the record name,
//! then with the file path, so the final message reads outside-in.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The category of a template error.
///
/// [`TemplateError::Record`] reports `RecordConversion`; field and file
/// context are transparent. Use [`TemplateError::root`] to get at the
/// original failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateErrorKind {
    /// The input file is missing or unreadable.
    FileRead,
    /// Malformed JSON or a document that does not match the dialect.
    JsonShape,
    /// A format name outside the recognized set.
    UnknownFormat,
    /// A timezone name that could not be resolved.
    Timezone,
    /// A date string no supported layout accepts.
    DateFormat,
    /// A time string that could not be parsed or is out of range.
    TimeFormat,
    /// A duration string no strategy accepts.
    DurationFormat,
    /// A recurrence frequency outside DAILY/WEEKLY/MONTHLY/YEARLY.
    InvalidFrequency,
    /// An event whose end precedes its start.
    InvalidRange,
    /// A record failed to convert (wraps the underlying error).
    RecordConversion,
}

impl TemplateErrorKind {
    /// Returns a short machine-readable name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileRead => "file_read",
            Self::JsonShape => "json_shape",
            Self::UnknownFormat => "unknown_format",
            Self::Timezone => "timezone",
            Self::DateFormat => "date_format",
            Self::TimeFormat => "time_format",
            Self::DurationFormat => "duration_format",
            Self::InvalidFrequency => "invalid_frequency",
            Self::InvalidRange => "invalid_range",
            Self::RecordConversion => "record_conversion",
        }
    }
}

impl fmt::Display for TemplateErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised while reading or converting a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("failed to read file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A parse failure inside a named file.
    #[error("{}: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<TemplateError>,
    },

    /// The JSON could not be decoded into the expected shape.
    #[error("failed to parse {context} JSON: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A required field is absent or empty.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// The requested or declared format is not recognized.
    #[error("unknown template format: {0}")]
    UnknownFormat(String),

    /// The timezone name is not a known IANA zone.
    #[error("invalid timezone {0}")]
    Timezone(String),

    #[error("unable to parse date: {0}")]
    DateFormat(String),

    #[error("invalid time: {0}")]
    TimeFormat(String),

    #[error("unable to parse duration: {0}")]
    DurationFormat(String),

    #[error("invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("invalid weekday: {0}")]
    InvalidWeekday(String),

    /// The computed end precedes the computed start.
    #[error("end {end} is before start {start}")]
    InvalidRange { start: String, end: String },

    /// A failure while resolving a specific field.
    #[error("failed to parse {field}: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: Box<TemplateError>,
    },

    /// A failure while converting a named record.
    #[error("failed to convert event '{name}': {source}")]
    Record {
        name: String,
        #[source]
        source: Box<TemplateError>,
    },
}

impl TemplateError {
    /// Creates a JSON shape error with a short description of what was decoded.
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> TemplateErrorKind {
        match self {
            Self::FileRead { .. } => TemplateErrorKind::FileRead,
            Self::Json { .. } | Self::MissingField(_) | Self::InvalidWeekday(_) => {
                TemplateErrorKind::JsonShape
            }
            Self::UnknownFormat(_) => TemplateErrorKind::UnknownFormat,
            Self::Timezone(_) => TemplateErrorKind::Timezone,
            Self::DateFormat(_) => TemplateErrorKind::DateFormat,
            Self::TimeFormat(_) => TemplateErrorKind::TimeFormat,
            Self::DurationFormat(_) => TemplateErrorKind::DurationFormat,
            Self::InvalidFrequency(_) => TemplateErrorKind::InvalidFrequency,
            Self::InvalidRange { .. } => TemplateErrorKind::InvalidRange,
            Self::Record { .. } => TemplateErrorKind::RecordConversion,
            Self::InFile { source, .. } | Self::Field { source, .. } => source.kind(),
        }
    }

    /// Returns the innermost error, skipping field, record and file context.
    pub fn root(&self) -> &TemplateError {
        match self {
            Self::InFile { source, .. } | Self::Field { source, .. } | Self::Record { source, .. } => {
                source.root()
            }
            other => other,
        }
    }

    /// Returns the name of the record that failed, if the error carries one.
    pub fn record_name(&self) -> Option<&str> {
        match self {
            Self::Record { name, .. } => Some(name),
            Self::InFile { source, .. } | Self::Field { source, .. } => source.record_name(),
            _ => None,
        }
    }
}

/// A specialized Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Attaches field and record context to template results.
pub(crate) trait ResultExt<T> {
    fn field(self, field: &'static str) -> TemplateResult<T>;
    fn record(self, name: &str) -> TemplateResult<T>;
}

impl<T> ResultExt<T> for TemplateResult<T> {
    fn field(self, field: &'static str) -> TemplateResult<T> {
        self.map_err(|source| TemplateError::Field {
            field,
            source: Box::new(source),
        })
    }

    fn record(self, name: &str) -> TemplateResult<T> {
        self.map_err(|source| TemplateError::Record {
            name: name.to_string(),
            source: Box::new(source),
        })
    }
}
