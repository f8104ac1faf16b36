//! The canonical error type and its structured variants.

use std::fmt;

use uuid::Uuid;

use crate::kind::ErrorKind;

/// Boxed cause carried by wrapping variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn non_empty(s: impl Into<String>) -> Option<String> {
    let s = s.into();
    (!s.is_empty()).then_some(s)
}

/// A lookup that found nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotFoundError {
    pub table: Option<String>,
    pub key: Option<String>,
    pub value: Option<String>,
    pub message: Option<String>,
}

impl NotFoundError {
    /// Empty strings are treated as "not provided".
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            table: non_empty(table),
            key: non_empty(key),
            value: non_empty(value),
            message: non_empty(message),
        }
    }

    #[must_use]
    pub fn for_key(table: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(table, key, value, String::new())
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = non_empty(message);
        self
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            return f.write_str(message);
        }
        match (&self.key, &self.value) {
            (Some(key), Some(value)) => write!(
                f,
                "unable to find {} with {key} '{value}'",
                self.table.as_deref().unwrap_or_default()
            ),
            _ => f.write_str(ErrorKind::NotFound.message()),
        }
    }
}

impl std::error::Error for NotFoundError {}

/// Input rejected by validation, optionally with one message per failing field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub field: Option<String>,
    pub value: Option<String>,
    pub message: Option<String>,
    pub errors: Vec<String>,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: non_empty(field),
            value: non_empty(value),
            message: non_empty(message),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_errors(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            message: non_empty(message),
            errors,
            ..Self::default()
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            return f.write_str(message);
        }
        match &self.field {
            Some(field) => write!(f, "validation failed for field '{field}'"),
            None => f.write_str(ErrorKind::Validation.message()),
        }
    }
}

impl std::error::Error for ValidationError {}

/// A value that should have been a UUID but was not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidUuidError {
    pub value: Option<String>,
    pub message: Option<String>,
}

impl InvalidUuidError {
    #[must_use]
    pub fn new(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            value: non_empty(value),
            message: non_empty(message),
        }
    }
}

impl fmt::Display for InvalidUuidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            return f.write_str(message);
        }
        match &self.value {
            Some(value) => write!(f, "failed to parse UUID '{value}'"),
            None => f.write_str(ErrorKind::InvalidUuid.message()),
        }
    }
}

impl std::error::Error for InvalidUuidError {}

/// Sentinels raised by list endpoints when paging or sorting parameters are unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("invalid page number or size")]
    InvalidPageOrSize,
    #[error("invalid sorting field")]
    InvalidSortingField,
}

/// Canonical error consumed at the HTTP boundary.
///
/// Every variant resolves to exactly one [`ErrorKind`] through [`Error::kind`],
/// independent of which context fields are populated.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    InvalidUuid(#[from] InvalidUuidError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    /// A bare kind, optionally wrapping the lower-level cause.
    #[error("{}", kind_display(.kind.message(), .source.as_ref()))]
    Kind {
        kind: ErrorKind,
        #[source]
        source: Option<BoxError>,
    },

    /// A failure nothing upstream could classify. The cause is kept for logs only.
    #[error("internal server error: {source}")]
    Internal {
        #[source]
        source: BoxError,
    },
}

fn kind_display(message: &str, source: Option<&BoxError>) -> String {
    match source {
        Some(cause) => format!("{message}: {cause}"),
        None => message.to_owned(),
    }
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Error::Kind { kind, source: None }
    }

    /// Tag `cause` with `kind`, keeping the cause reachable through `source()`.
    pub fn wrap(kind: ErrorKind, cause: impl Into<BoxError>) -> Self {
        Error::Kind {
            kind,
            source: Some(cause.into()),
        }
    }

    /// Mark `cause` as an unclassified internal failure.
    pub fn internal(cause: impl Into<BoxError>) -> Self {
        Error::Internal {
            source: cause.into(),
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden)
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized)
    }

    #[must_use]
    pub fn credential_invalid() -> Self {
        Self::new(ErrorKind::CredentialInvalid)
    }

    #[must_use]
    pub fn user_already_exists() -> Self {
        Self::new(ErrorKind::UserAlreadyExists)
    }

    #[must_use]
    pub fn invalid_uuid() -> Self {
        Self::new(ErrorKind::InvalidUuid)
    }

    #[must_use]
    pub fn internal_server_error() -> Self {
        Self::new(ErrorKind::InternalServerError)
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Validation(_) | Error::Pagination(_) => ErrorKind::Validation,
            Error::InvalidUuid(_) => ErrorKind::InvalidUuid,
            Error::Kind { kind, .. } => *kind,
            Error::Internal { .. } => ErrorKind::InternalServerError,
        }
    }

    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// `true` for the marker produced when a driver failure could not be classified.
    #[must_use]
    pub fn is_unclassified(&self) -> bool {
        matches!(self, Error::Internal { .. })
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

/// Parse a UUID, reporting failures as [`Error::InvalidUuid`].
///
/// # Errors
/// Returns [`Error::InvalidUuid`] carrying the rejected input when `raw` is not a UUID.
pub fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| InvalidUuidError::new(raw, String::new()).into())
}

#[cfg(feature = "validator")]
impl From<validator::ValidationErrors> for Error {
    fn from(errs: validator::ValidationErrors) -> Self {
        let mut lines: Vec<(String, String)> = Vec::new();
        for (field, failures) in errs.field_errors() {
            for failure in failures {
                let message = failure
                    .message
                    .as_ref()
                    .map_or_else(|| failure.code.to_string(), ToString::to_string);
                lines.push((field.to_string(), message));
            }
        }
        lines.sort();
        let errors = lines
            .into_iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();
        Error::Validation(ValidationError::with_errors(errs.to_string(), errors))
    }
}
