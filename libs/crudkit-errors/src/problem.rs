//! Error envelope for rejected requests (pure data model, no HTTP framework dependencies)

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Wire body of an error response: `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// A classified failure ready to be rendered by a transport layer.
///
/// Only [`ErrorBody`] goes over the wire; `status`, `title` and `code` are for
/// the transport and for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Problem {
    /// HTTP status code for this occurrence of the problem.
    pub status: StatusCode,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    /// A human-readable explanation specific to this occurrence.
    pub detail: String,
    /// Stable machine-readable code from the error catalog.
    pub code: String,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            detail: detail.into(),
            code: String::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Body to serialize for the client.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            detail: self.detail.clone(),
        }
    }

    /// Consume the problem into its status and wire body.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, ErrorBody) {
        (
            self.status,
            ErrorBody {
                detail: self.detail,
            },
        )
    }
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.title, self.detail)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn problem_builder_pattern() {
        let p = Problem::new(
            StatusCode::NOT_ACCEPTABLE,
            "Unknown Column",
            "filter_by must be one of: email, id",
        )
        .with_code("crudkit.query.unknown_column.v1");

        assert_eq!(p.status, StatusCode::NOT_ACCEPTABLE);
        assert_eq!(p.code, "crudkit.query.unknown_column.v1");
        assert_eq!(p.body().detail, "filter_by must be one of: email, id");
    }

    #[test]
    fn body_serializes_detail_only() {
        let p = Problem::new(StatusCode::CONFLICT, "Conflict", "Resource already exists")
            .with_code("crudkit.db.conflict.v1");
        let json = serde_json::to_string(&p.body()).unwrap();
        assert_eq!(json, r#"{"detail":"Resource already exists"}"#);
    }

    #[test]
    fn into_parts_keeps_status() {
        let (status, body) = Problem::new(StatusCode::NOT_FOUND, "Not Found", "gone").into_parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.detail, "gone");
    }
}
