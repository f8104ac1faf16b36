//! Static Problem definitions, one per wire-level outcome.
//!
//! Every canonical [`ErrorKind`](crate::ErrorKind) resolves to exactly one of
//! these definitions. Titles, statuses and type URIs are part of the public
//! contract and must never change once published.

use crate::problem::Problem;
use http::StatusCode;

/// Static error definition from the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrDef {
    pub status: u16,
    pub title: &'static str,
    pub type_url: &'static str,
}

impl ErrDef {
    /// Convert this error definition into a Problem with the given detail
    #[inline]
    pub fn as_problem(&self, detail: impl Into<String>) -> Problem {
        // Convert u16 to StatusCode, using INTERNAL_SERVER_ERROR as fallback for invalid codes
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Problem::new(status, self.title, detail.into()).with_type(self.type_url)
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

pub const NOT_FOUND: ErrDef = ErrDef {
    status: 404,
    title: "Not Found",
    type_url: "https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/404",
};

pub const VALIDATION: ErrDef = ErrDef {
    status: 400,
    title: "Validation Problem",
    type_url: "https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/400",
};

pub const FORBIDDEN: ErrDef = ErrDef {
    status: 403,
    title: "Forbidden",
    type_url: "https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/403",
};

pub const UNAUTHORIZED: ErrDef = ErrDef {
    status: 401,
    title: "Unauthorized",
    type_url: "https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/401",
};

pub const INTERNAL_SERVER_ERROR: ErrDef = ErrDef {
    status: 500,
    title: "Internal Server Error",
    type_url: "https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/500",
};

/// Not produced by the taxonomy; available for handlers that reject malformed input
/// outside of validation.
pub const BAD_REQUEST: ErrDef = ErrDef {
    status: 400,
    title: "Bad Request",
    type_url: "https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/400",
};
