//! Maps taxonomy errors onto RFC 9457 Problems.
//!
//! The mapping is a fixed precedence chain; the first matching rule wins:
//!
//! | rule | status | detail |
//! |---|---|---|
//! | structured not-found | 404 | the error's message |
//! | validation | 400 | the error's message, plus `errors` when present |
//! | user already exists | 400 | `User already exists` |
//! | invalid credentials | 401 | `Invalid username or password` |
//! | forbidden | 403 | `Make sure you have the right permissions` |
//! | unauthorized | 401 | `You must be logged in to access this resource` |
//! | invalid UUID | 400 | the error's message |
//! | generic not-found | 404 | `Resource not found` |
//! | internal marker | 500 | `internal server error` |
//! | pagination | 400 | `Invalid page or size` / `Invalid sorting field` |
//!
//! Anything else, including the database outcome kinds, becomes a 500 whose
//! detail never repeats the original error text.

use std::fmt;
use std::sync::Arc;

use summer_errors::catalog::{self, ErrDef};
use summer_errors::{Error, ErrorKind, PaginationError, Problem};

pub const NOT_FOUND_DETAIL: &str = "Resource not found";
pub const FORBIDDEN_DETAIL: &str = "Make sure you have the right permissions";
pub const UNAUTHORIZED_DETAIL: &str = "You must be logged in to access this resource";
pub const CREDENTIAL_INVALID_DETAIL: &str = "Invalid username or password";
pub const USER_ALREADY_EXISTS_DETAIL: &str = "User already exists";
pub const INVALID_PAGE_OR_SIZE_DETAIL: &str = "Invalid page or size";
pub const INVALID_SORTING_FIELD_DETAIL: &str = "Invalid sorting field";
pub const INTERNAL_DETAIL: &str = "internal server error";

/// Caller-supplied mapping consulted before the built-in rules.
///
/// Returning `Some` short-circuits the precedence chain; the Problem is used as-is.
pub type CustomMapping = Arc<dyn Fn(&Error) -> Option<Problem> + Send + Sync>;

/// Converts errors into Problems.
#[derive(Clone, Default)]
pub struct ProblemBuilder {
    mapping: Option<CustomMapping>,
}

impl fmt::Debug for ProblemBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemBuilder")
            .field("mapping", &self.mapping.is_some())
            .finish()
    }
}

impl ProblemBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_mapping<F>(mut self, mapping: F) -> Self
    where
        F: Fn(&Error) -> Option<Problem> + Send + Sync + 'static,
    {
        self.mapping = Some(Arc::new(mapping));
        self
    }

    /// Build the Problem for `err` and log the outcome.
    pub fn build(&self, err: &Error) -> Problem {
        let problem = self
            .mapping
            .as_ref()
            .and_then(|mapping| mapping(err))
            .unwrap_or_else(|| standard_problem(err));

        tracing::warn!(
            error = %err,
            kind = %err.kind(),
            status = problem.status.as_u16(),
            r#type = %problem.type_url,
            detail = %problem.detail,
            "Request failed"
        );
        problem
    }
}

fn standard_problem(err: &Error) -> Problem {
    match err {
        Error::NotFound(nf) => catalog::NOT_FOUND.as_problem(nf.to_string()),
        Error::Validation(v) => {
            let problem = catalog::VALIDATION.as_problem(v.to_string());
            if v.errors.is_empty() {
                problem
            } else {
                problem.with_errors(v.errors.clone())
            }
        }
        Error::InvalidUuid(e) => catalog::VALIDATION.as_problem(e.to_string()),
        Error::Kind { kind, .. } => kind_problem(*kind, err),
        Error::Internal { .. } => internal(),
        Error::Pagination(PaginationError::InvalidPageOrSize) => {
            catalog::VALIDATION.as_problem(INVALID_PAGE_OR_SIZE_DETAIL)
        }
        Error::Pagination(PaginationError::InvalidSortingField) => {
            catalog::VALIDATION.as_problem(INVALID_SORTING_FIELD_DETAIL)
        }
    }
}

/// Bare kinds carry no context of their own, so most of them answer with a fixed phrase.
fn kind_problem(kind: ErrorKind, err: &Error) -> Problem {
    let def: &ErrDef = kind.def();
    match kind {
        ErrorKind::Validation | ErrorKind::InvalidUuid => def.as_problem(err.to_string()),
        ErrorKind::UserAlreadyExists => def.as_problem(USER_ALREADY_EXISTS_DETAIL),
        ErrorKind::CredentialInvalid => def.as_problem(CREDENTIAL_INVALID_DETAIL),
        ErrorKind::Forbidden => def.as_problem(FORBIDDEN_DETAIL),
        ErrorKind::Unauthorized => def.as_problem(UNAUTHORIZED_DETAIL),
        ErrorKind::NotFound => def.as_problem(NOT_FOUND_DETAIL),
        ErrorKind::QueryTimeout
        | ErrorKind::UniqueViolation
        | ErrorKind::ForeignKeyViolation
        | ErrorKind::DeadlockDetected
        | ErrorKind::InternalServerError => internal(),
    }
}

fn internal() -> Problem {
    catalog::INTERNAL_SERVER_ERROR.as_problem(INTERNAL_DETAIL)
}
