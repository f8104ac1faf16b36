//! Driver failure classification.

use std::sync::{Arc, LazyLock};

use summer_errors::{Error, ErrorKind, NotFoundError};

use crate::code::CodeTable;
use crate::driver::{DriverError, NativeFailure};

/// Context of a keyed lookup, used to build a descriptive not-found error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup<'a> {
    pub table: &'a str,
    pub key: &'a str,
    pub value: &'a str,
}

impl<'a> Lookup<'a> {
    #[must_use]
    pub fn new(table: &'a str, key: &'a str, value: &'a str) -> Self {
        Self { table, key, value }
    }
}

/// Turns native driver errors into taxonomy errors.
///
/// Cheap to clone; one instance is meant to be shared by every repository of a backend.
#[derive(Debug, Clone)]
pub struct Classifier {
    table: Arc<CodeTable>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::postgres()
    }
}

impl Classifier {
    #[must_use]
    pub fn new(table: CodeTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    #[must_use]
    pub fn postgres() -> Self {
        Self::new(CodeTable::postgres())
    }

    #[must_use]
    pub fn mysql() -> Self {
        Self::new(CodeTable::mysql())
    }

    #[must_use]
    pub fn sqlite() -> Self {
        Self::new(CodeTable::sqlite())
    }

    #[must_use]
    pub fn mssql() -> Self {
        Self::new(CodeTable::mssql())
    }

    #[must_use]
    pub fn table(&self) -> &CodeTable {
        &self.table
    }

    /// Classify a failed database operation.
    ///
    /// `operation` names what was attempted (e.g. `"GetUser"`) and ends up in the log line.
    pub fn classify<E: DriverError>(&self, err: E, operation: &str) -> Error {
        self.classify_inner(err, None, operation)
    }

    /// Classify a failed keyed lookup; a no-rows outcome names the table, key and value.
    pub fn classify_lookup<E: DriverError>(
        &self,
        err: E,
        lookup: Lookup<'_>,
        operation: &str,
    ) -> Error {
        self.classify_inner(err, Some(lookup), operation)
    }

    fn classify_inner<E: DriverError>(
        &self,
        err: E,
        lookup: Option<Lookup<'_>>,
        operation: &str,
    ) -> Error {
        let kind = match err.native_failure() {
            NativeFailure::NoRows => Some(ErrorKind::NotFound),
            NativeFailure::DeadlineExceeded => Some(ErrorKind::QueryTimeout),
            NativeFailure::Coded(codes) => codes.iter().find_map(|code| self.table.lookup(code)),
            NativeFailure::Other => None,
        };

        let Some(kind) = kind else {
            let wrapped = Error::internal(err);
            log_outcome(&wrapped, lookup, operation, true);
            return wrapped;
        };

        let wrapped = match lookup {
            Some(l) if kind == ErrorKind::NotFound => {
                Error::NotFound(NotFoundError::for_key(l.table, l.key, l.value))
            }
            _ => Error::wrap(kind, err),
        };
        log_outcome(&wrapped, lookup, operation, false);
        wrapped
    }
}

fn log_outcome(wrapped: &Error, lookup: Option<Lookup<'_>>, operation: &str, unknown: bool) {
    let (table, key, value) = lookup.map_or(("", "", ""), |l| (l.table, l.key, l.value));
    if unknown {
        tracing::error!(
            error = %wrapped,
            operation,
            table,
            key,
            value,
            unknown_error = true,
            "Failed to {operation}: unclassified database error"
        );
    } else {
        tracing::warn!(
            error = %wrapped,
            kind = %wrapped.kind(),
            operation,
            table,
            key,
            value,
            unknown_error = false,
            "Failed to {operation}: wrapped database error"
        );
    }
}

static POSTGRES: LazyLock<Classifier> = LazyLock::new(Classifier::postgres);

/// Classify with the `PostgreSQL` code table.
pub fn wrap_db_error<E: DriverError>(err: E, operation: &str) -> Error {
    POSTGRES.classify(err, operation)
}

/// Classify a keyed lookup with the `PostgreSQL` code table.
pub fn wrap_db_error_with_lookup<E: DriverError>(
    err: E,
    lookup: Lookup<'_>,
    operation: &str,
) -> Error {
    POSTGRES.classify_lookup(err, lookup, operation)
}

/// `Result` adapter so repositories can write `query.await.classify(&db, "GetUser")?`.
pub trait ClassifyResultExt<T> {
    /// # Errors
    /// Returns the classified taxonomy error when `self` is `Err`.
    fn classify(self, classifier: &Classifier, operation: &str) -> Result<T, Error>;

    /// # Errors
    /// Returns the classified taxonomy error when `self` is `Err`.
    fn classify_lookup(
        self,
        classifier: &Classifier,
        lookup: Lookup<'_>,
        operation: &str,
    ) -> Result<T, Error>;
}

impl<T, E: DriverError> ClassifyResultExt<T> for Result<T, E> {
    fn classify(self, classifier: &Classifier, operation: &str) -> Result<T, Error> {
        self.map_err(|e| classifier.classify(e, operation))
    }

    fn classify_lookup(
        self,
        classifier: &Classifier,
        lookup: Lookup<'_>,
        operation: &str,
    ) -> Result<T, Error> {
        self.map_err(|e| classifier.classify_lookup(e, lookup, operation))
    }
}
