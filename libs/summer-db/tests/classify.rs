#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::borrow::Cow;
use std::error::Error as _;
use std::fmt;

use sqlx::error::{DatabaseError, ErrorKind as SqlxErrorKind};
use summer_db::code::{DbCode, MSSQL_DEADLOCK_DETECTED};
use summer_db::{
    Classifier, ClassifyResultExt, CodeTable, DriverError, Lookup, NativeFailure, wrap_db_error,
    wrap_db_error_with_lookup,
};
use summer_errors::{Error, ErrorKind};
use tracing_test::traced_test;

/// Stand-in for a server-side rejection carrying a SQLSTATE code.
#[derive(Debug)]
struct FakeDbError {
    code: &'static str,
    message: &'static str,
}

impl FakeDbError {
    fn boxed(code: &'static str, message: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(Self { code, message }))
    }
}

impl fmt::Display for FakeDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl std::error::Error for FakeDbError {}

impl DatabaseError for FakeDbError {
    fn message(&self) -> &str {
        self.message
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.code))
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> SqlxErrorKind {
        SqlxErrorKind::Other
    }
}

/// A driver that only reports numeric error numbers, like SQL Server.
#[derive(Debug)]
struct NumberedError(i64);

impl fmt::Display for NumberedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server error {}", self.0)
    }
}

impl std::error::Error for NumberedError {}

impl DriverError for NumberedError {
    fn native_failure(&self) -> NativeFailure {
        NativeFailure::Coded(vec![DbCode::Number(self.0)])
    }
}

#[test]
#[traced_test]
fn no_rows_is_generic_not_found() {
    let err = wrap_db_error(sqlx::Error::RowNotFound, "ListUsers");
    assert!(err.is(ErrorKind::NotFound));
    assert!(matches!(err, Error::Kind { .. }));
    assert!(err.source().is_some());
    assert!(logs_contain("Failed to ListUsers"));
    assert!(logs_contain("unknown_error=false"));
}

#[test]
#[traced_test]
fn no_rows_with_lookup_names_the_record() {
    let err = wrap_db_error_with_lookup(
        sqlx::Error::RowNotFound,
        Lookup::new("users", "id", "abc"),
        "GetUser",
    );
    let Error::NotFound(nf) = &err else {
        panic!("expected a structured not-found error, got {err:?}");
    };
    assert_eq!(nf.table.as_deref(), Some("users"));
    assert_eq!(err.to_string(), "unable to find users with id 'abc'");
    assert!(logs_contain("Failed to GetUser"));
    assert!(logs_contain("key=\"id\""));
    assert!(logs_contain("value=\"abc\""));
}

#[test]
#[traced_test]
fn unique_violation_keeps_the_cause() {
    let err = wrap_db_error(
        FakeDbError::boxed("23505", "duplicate key value violates unique constraint"),
        "CreateUser",
    );
    assert!(err.is(ErrorKind::UniqueViolation));
    assert!(!err.is_unclassified());
    assert!(err.to_string().starts_with("unique constraint violation: "));
    assert!(logs_contain("WARN"));
}

#[test]
fn foreign_key_and_deadlock_codes() {
    let fk = wrap_db_error(FakeDbError::boxed("23503", "fk"), "AssignRole");
    assert!(fk.is(ErrorKind::ForeignKeyViolation));

    let deadlock = wrap_db_error(FakeDbError::boxed("40P01", "deadlock"), "Transfer");
    assert!(deadlock.is(ErrorKind::DeadlockDetected));
}

#[test]
#[traced_test]
fn unknown_code_becomes_internal_marker() {
    let err = wrap_db_error(FakeDbError::boxed("42P01", "relation does not exist"), "GetUser");
    assert!(err.is(ErrorKind::InternalServerError));
    assert!(err.is_unclassified());
    assert_eq!(
        err.source().map(ToString::to_string).as_deref(),
        Some("error returned from database: relation does not exist")
    );
    assert!(logs_contain("ERROR"));
    assert!(logs_contain("unknown_error=true"));
}

#[test]
fn non_database_failures_are_unclassified() {
    let err = wrap_db_error(sqlx::Error::PoolClosed, "GetUser");
    assert!(err.is_unclassified());
}

#[test]
fn pool_timeout_is_query_timeout() {
    let err = wrap_db_error(sqlx::Error::PoolTimedOut, "GetUser");
    assert!(err.is(ErrorKind::QueryTimeout));
}

#[test]
fn same_outcome_across_backends() {
    let sqlserver = Classifier::mssql();
    let err = sqlserver.classify(NumberedError(MSSQL_DEADLOCK_DETECTED), "Transfer");
    assert!(err.is(ErrorKind::DeadlockDetected));

    let err = sqlserver.classify(NumberedError(2627), "CreateUser");
    assert!(err.is(ErrorKind::UniqueViolation));

    // postgres codes mean nothing to the SQL Server table
    let err = sqlserver.classify(FakeDbError::boxed("23505", "dup"), "CreateUser");
    assert!(err.is_unclassified());
}

#[test]
fn custom_tables_extend_builtins() {
    let classifier = Classifier::new(
        CodeTable::postgres().with_code(DbCode::state("23514"), ErrorKind::Validation),
    );
    let err = classifier.classify(FakeDbError::boxed("23514", "check violation"), "CreateUser");
    assert!(err.is(ErrorKind::Validation));
    assert_eq!(classifier.table().len(), CodeTable::postgres().len() + 1);
}

#[test]
fn result_extension_classifies_errors_only() {
    let classifier = Classifier::default();

    let ok: Result<u32, sqlx::Error> = Ok(7);
    assert_eq!(ok.classify(&classifier, "CountUsers").unwrap(), 7);

    let missing: Result<u32, sqlx::Error> = Err(sqlx::Error::RowNotFound);
    let err = missing
        .classify_lookup(&classifier, Lookup::new("users", "email", "a@b.c"), "GetUserByEmail")
        .unwrap_err();
    assert_eq!(err.to_string(), "unable to find users with email 'a@b.c'");
}

#[tokio::test]
async fn elapsed_deadline_is_query_timeout() {
    let timed_out = tokio::time::timeout(
        std::time::Duration::from_millis(1),
        std::future::pending::<()>(),
    )
    .await;
    let err = timed_out.classify(&Classifier::default(), "SlowReport").unwrap_err();
    assert!(err.is(ErrorKind::QueryTimeout));
}

#[cfg(feature = "sea-orm")]
mod sea_orm_errors {
    use super::*;
    use sea_orm::{DbErr, RuntimeErr};

    #[test]
    fn record_not_found_with_lookup() {
        let err = wrap_db_error_with_lookup(
            DbErr::RecordNotFound("users".to_owned()),
            Lookup::new("users", "id", "abc"),
            "GetUser",
        );
        assert_eq!(err.to_string(), "unable to find users with id 'abc'");
    }

    #[test]
    fn wrapped_sqlx_codes_are_inspected() {
        let err = wrap_db_error(
            DbErr::Exec(RuntimeErr::SqlxError(FakeDbError::boxed("23505", "dup"))),
            "CreateUser",
        );
        assert!(err.is(ErrorKind::UniqueViolation));
    }
}
