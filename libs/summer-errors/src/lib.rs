//! Core error types for summer services
//!
//! This crate provides pure data types for error handling, with no dependencies
//! on HTTP frameworks. It includes:
//! - the canonical error taxonomy (`ErrorKind`, `Error` and its structured variants)
//! - RFC 9457 Problem Details (`Problem`)
//! - the per-kind wire catalog (`ErrDef`)
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod catalog;
pub mod error;
pub mod kind;
pub mod problem;

// Re-export commonly used types
pub use catalog::ErrDef;
pub use error::{
    BoxError, Error, InvalidUuidError, NotFoundError, PaginationError, Result, ValidationError,
    parse_uuid,
};
pub use kind::ErrorKind;
pub use problem::{APPLICATION_PROBLEM_JSON, Problem};
