//! Database driver error classification.
//!
//! Repositories hand raw driver failures to a [`Classifier`], which funnels
//! them into the canonical taxonomy from `summer-errors`:
//!
//! 1. no rows → `NotFound` (descriptive when the lookup key is known)
//! 2. expired deadline → `QueryTimeout`
//! 3. a code found in the backend's [`CodeTable`] → the mapped kind
//! 4. anything else → the internal marker, with the cause kept for logs
//!
//! # Features
//! - `mysql`, `sqlite`: enable the corresponding `SQLx` backends (`PostgreSQL` is always on)
//! - `sea-orm`: classify `sea_orm::DbErr`
//!
//! ```rust,no_run
//! use summer_db::{Classifier, ClassifyResultExt, Lookup};
//!
//! async fn get_user(pool: &sqlx::PgPool, classifier: &Classifier, id: &str)
//!     -> Result<(String,), summer_errors::Error>
//! {
//!     sqlx::query_as("SELECT name FROM users WHERE id = $1")
//!         .bind(id)
//!         .fetch_one(pool)
//!         .await
//!         .classify_lookup(classifier, Lookup::new("users", "id", id), "GetUser")
//! }
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod classify;
pub mod code;
pub mod driver;

pub use classify::{
    Classifier, ClassifyResultExt, Lookup, wrap_db_error, wrap_db_error_with_lookup,
};
pub use code::{CodeTable, DbCode};
pub use driver::{DriverError, NativeFailure};
