//! Canonical error kinds.

use std::fmt;

use http::StatusCode;

use crate::catalog::{self, ErrDef};

/// Stable category of a failure.
///
/// Clients depend on the mapping from kind to status, title and type URI, so
/// variants are never renamed or removed once published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Forbidden,
    Unauthorized,
    CredentialInvalid,
    UserAlreadyExists,
    InvalidUuid,
    QueryTimeout,
    UniqueViolation,
    ForeignKeyViolation,
    DeadlockDetected,
    InternalServerError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 12] = [
        ErrorKind::NotFound,
        ErrorKind::Validation,
        ErrorKind::Forbidden,
        ErrorKind::Unauthorized,
        ErrorKind::CredentialInvalid,
        ErrorKind::UserAlreadyExists,
        ErrorKind::InvalidUuid,
        ErrorKind::QueryTimeout,
        ErrorKind::UniqueViolation,
        ErrorKind::ForeignKeyViolation,
        ErrorKind::DeadlockDetected,
        ErrorKind::InternalServerError,
    ];

    /// Machine-readable code, stable across releases.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::CredentialInvalid => "CREDENTIAL_INVALID",
            ErrorKind::UserAlreadyExists => "USER_ALREADY_EXISTS",
            ErrorKind::InvalidUuid => "INVALID_UUID",
            ErrorKind::QueryTimeout => "QUERY_TIMEOUT",
            ErrorKind::UniqueViolation => "UNIQUE_VIOLATION",
            ErrorKind::ForeignKeyViolation => "FOREIGN_KEY_VIOLATION",
            ErrorKind::DeadlockDetected => "DEADLOCK_DETECTED",
            ErrorKind::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Generic message used when an error carries no context of its own.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "record not found",
            ErrorKind::Validation => "validation error",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::CredentialInvalid => "invalid username or password",
            ErrorKind::UserAlreadyExists => "user already exists",
            ErrorKind::InvalidUuid => "failed to parse UUID",
            ErrorKind::QueryTimeout => "query timed out",
            ErrorKind::UniqueViolation => "unique constraint violation",
            ErrorKind::ForeignKeyViolation => "foreign key violation",
            ErrorKind::DeadlockDetected => "deadlock detected",
            ErrorKind::InternalServerError => "internal server error",
        }
    }

    /// Wire definition this kind resolves to.
    ///
    /// Database outcome kinds have no client-facing meaning and resolve to the
    /// internal server error definition.
    #[must_use]
    pub const fn def(self) -> &'static ErrDef {
        match self {
            ErrorKind::NotFound => &catalog::NOT_FOUND,
            ErrorKind::Validation | ErrorKind::UserAlreadyExists | ErrorKind::InvalidUuid => {
                &catalog::VALIDATION
            }
            ErrorKind::Forbidden => &catalog::FORBIDDEN,
            ErrorKind::Unauthorized | ErrorKind::CredentialInvalid => &catalog::UNAUTHORIZED,
            ErrorKind::QueryTimeout
            | ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::DeadlockDetected
            | ErrorKind::InternalServerError => &catalog::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn status(self) -> StatusCode {
        self.def().status_code()
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        self.def().title
    }

    #[must_use]
    pub const fn type_url(self) -> &'static str {
        self.def().type_url
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let mut codes: Vec<_> = ErrorKind::ALL.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn documented_triples() {
        let expected = [
            (ErrorKind::NotFound, 404, "Not Found"),
            (ErrorKind::Validation, 400, "Validation Problem"),
            (ErrorKind::Forbidden, 403, "Forbidden"),
            (ErrorKind::Unauthorized, 401, "Unauthorized"),
            (ErrorKind::CredentialInvalid, 401, "Unauthorized"),
            (ErrorKind::UserAlreadyExists, 400, "Validation Problem"),
            (ErrorKind::InvalidUuid, 400, "Validation Problem"),
            (ErrorKind::InternalServerError, 500, "Internal Server Error"),
        ];
        for (kind, status, title) in expected {
            assert_eq!(kind.status().as_u16(), status, "{kind}");
            assert_eq!(kind.title(), title, "{kind}");
            assert!(kind.type_url().ends_with(&status.to_string()), "{kind}");
        }
    }

    #[test]
    fn database_kinds_resolve_to_internal() {
        for kind in [
            ErrorKind::QueryTimeout,
            ErrorKind::UniqueViolation,
            ErrorKind::ForeignKeyViolation,
            ErrorKind::DeadlockDetected,
        ] {
            assert_eq!(kind.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
