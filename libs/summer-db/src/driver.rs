//! Normalization of native driver failures.
//!
//! Each supported driver error type describes itself as a [`NativeFailure`];
//! the classifier only ever sees that description, so adding a backend means
//! implementing [`DriverError`] and nothing else.

use crate::code::DbCode;

/// Driver-independent description of what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeFailure {
    /// The query matched no rows.
    NoRows,
    /// A deadline expired before the database answered.
    DeadlineExceeded,
    /// The database rejected the statement with one or more codes, most specific first.
    Coded(Vec<DbCode>),
    /// Anything else (I/O, protocol, decoding, configuration).
    Other,
}

/// A native error the classifier understands.
pub trait DriverError: std::error::Error + Send + Sync + 'static {
    fn native_failure(&self) -> NativeFailure;
}

impl DriverError for sqlx::Error {
    fn native_failure(&self) -> NativeFailure {
        match self {
            sqlx::Error::RowNotFound => NativeFailure::NoRows,
            sqlx::Error::PoolTimedOut => NativeFailure::DeadlineExceeded,
            sqlx::Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                NativeFailure::DeadlineExceeded
            }
            sqlx::Error::Database(db) => {
                let mut codes = Vec::with_capacity(2);
                #[cfg(feature = "mysql")]
                if let Some(my) = db.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
                    codes.push(DbCode::Number(i64::from(my.number())));
                }
                if let Some(code) = db.code() {
                    codes.push(DbCode::State(code.into_owned()));
                }
                NativeFailure::Coded(codes)
            }
            _ => NativeFailure::Other,
        }
    }
}

impl DriverError for tokio::time::error::Elapsed {
    fn native_failure(&self) -> NativeFailure {
        NativeFailure::DeadlineExceeded
    }
}

#[cfg(feature = "sea-orm")]
impl DriverError for sea_orm::DbErr {
    fn native_failure(&self) -> NativeFailure {
        use sea_orm::{ConnAcquireErr, DbErr, RuntimeErr};

        match self {
            DbErr::RecordNotFound(_) => NativeFailure::NoRows,
            DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => NativeFailure::DeadlineExceeded,
            DbErr::Conn(RuntimeErr::SqlxError(e))
            | DbErr::Exec(RuntimeErr::SqlxError(e))
            | DbErr::Query(RuntimeErr::SqlxError(e)) => e.native_failure(),
            _ => NativeFailure::Other,
        }
    }
}
