//! Driver error code tables.
//!
//! A table maps a backend's native error code onto a canonical kind. Callers
//! pick (or extend) a table once when building a
//! [`Classifier`](crate::Classifier) and never look at codes themselves.

use std::collections::HashMap;
use std::fmt;

use summer_errors::ErrorKind;

/// SQLSTATE-style code reported by `PostgreSQL` on unique constraint violations.
pub const PG_UNIQUE_VIOLATION: &str = "23505";
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
pub const PG_DEADLOCK_DETECTED: &str = "40P01";
/// Raised when `statement_timeout` cancels a query.
pub const PG_QUERY_CANCELED: &str = "57014";

pub const MYSQL_DUP_ENTRY: i64 = 1062;
pub const MYSQL_ROW_IS_REFERENCED: i64 = 1451;
pub const MYSQL_NO_REFERENCED_ROW: i64 = 1452;
pub const MYSQL_LOCK_DEADLOCK: i64 = 1213;
pub const MYSQL_QUERY_TIMEOUT: i64 = 3024;

/// Extended result codes as rendered by the `SQLite` driver.
pub const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";
pub const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
pub const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";

pub const MSSQL_UNIQUE_VIOLATION: i64 = 2627;
pub const MSSQL_UNIQUE_INDEX: i64 = 2601;
pub const MSSQL_FOREIGN_KEY_VIOLATION: i64 = 547;
pub const MSSQL_DEADLOCK_DETECTED: i64 = 1205;

/// Native error code as reported by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DbCode {
    /// String codes such as SQLSTATE.
    State(String),
    /// Numeric error numbers.
    Number(i64),
}

impl DbCode {
    #[must_use]
    pub fn state(code: impl Into<String>) -> Self {
        DbCode::State(code.into())
    }
}

impl fmt::Display for DbCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbCode::State(s) => f.write_str(s),
            DbCode::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Mapping from native code to canonical kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    codes: HashMap<DbCode, ErrorKind>,
}

impl CodeTable {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn postgres() -> Self {
        Self::empty()
            .with_code(DbCode::state(PG_UNIQUE_VIOLATION), ErrorKind::UniqueViolation)
            .with_code(DbCode::state(PG_FOREIGN_KEY_VIOLATION), ErrorKind::ForeignKeyViolation)
            .with_code(DbCode::state(PG_DEADLOCK_DETECTED), ErrorKind::DeadlockDetected)
            .with_code(DbCode::state(PG_QUERY_CANCELED), ErrorKind::QueryTimeout)
    }

    #[must_use]
    pub fn mysql() -> Self {
        Self::empty()
            .with_code(DbCode::Number(MYSQL_DUP_ENTRY), ErrorKind::UniqueViolation)
            .with_code(DbCode::Number(MYSQL_ROW_IS_REFERENCED), ErrorKind::ForeignKeyViolation)
            .with_code(DbCode::Number(MYSQL_NO_REFERENCED_ROW), ErrorKind::ForeignKeyViolation)
            .with_code(DbCode::Number(MYSQL_LOCK_DEADLOCK), ErrorKind::DeadlockDetected)
            .with_code(DbCode::Number(MYSQL_QUERY_TIMEOUT), ErrorKind::QueryTimeout)
    }

    #[must_use]
    pub fn sqlite() -> Self {
        Self::empty()
            .with_code(DbCode::state(SQLITE_CONSTRAINT_UNIQUE), ErrorKind::UniqueViolation)
            .with_code(DbCode::state(SQLITE_CONSTRAINT_PRIMARYKEY), ErrorKind::UniqueViolation)
            .with_code(DbCode::state(SQLITE_CONSTRAINT_FOREIGNKEY), ErrorKind::ForeignKeyViolation)
    }

    #[must_use]
    pub fn mssql() -> Self {
        Self::empty()
            .with_code(DbCode::Number(MSSQL_UNIQUE_VIOLATION), ErrorKind::UniqueViolation)
            .with_code(DbCode::Number(MSSQL_UNIQUE_INDEX), ErrorKind::UniqueViolation)
            .with_code(DbCode::Number(MSSQL_FOREIGN_KEY_VIOLATION), ErrorKind::ForeignKeyViolation)
            .with_code(DbCode::Number(MSSQL_DEADLOCK_DETECTED), ErrorKind::DeadlockDetected)
    }

    /// Add or replace a mapping.
    #[must_use]
    pub fn with_code(mut self, code: DbCode, kind: ErrorKind) -> Self {
        self.codes.insert(code, kind);
        self
    }

    /// Merge another table into this one; entries from `other` win.
    #[must_use]
    pub fn extend(mut self, other: CodeTable) -> Self {
        self.codes.extend(other.codes);
        self
    }

    #[must_use]
    pub fn lookup(&self, code: &DbCode) -> Option<ErrorKind> {
        self.codes.get(code).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
