use thiserror::Error;

use crate::columns::ColumnKind;

/// Request rejected before it reaches the database.
///
/// ## HTTP Mapping
///
/// See [`crate::problem_mapping`]: everything maps to 406 except
/// `InvalidPage` (422).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} '{column}' is not a valid column; valid options: {}", .valid.join(", "))]
    UnknownColumn {
        field: &'static str,
        column: String,
        valid: Vec<String>,
    },

    #[error(
        "filter on '{column}' needs one of min/max, eq, neq, like, isin, isnotin or nullable"
    )]
    MissingCondition { column: String },

    #[error("filter on '{column}' combines {}; use exactly one", .families.join(" and "))]
    AmbiguousCondition {
        column: String,
        families: Vec<&'static str>,
    },

    #[error("'{field}' can only be used together with filter_by")]
    OrphanCondition { field: &'static str },

    #[error("column '{column}' is used in more than one aggregation role ({})", .roles.join(", "))]
    AmbiguousAggregation {
        column: String,
        roles: Vec<&'static str>,
    },

    #[error("group_by must contain at least one column")]
    EmptyGroupBy,

    #[error("value '{value}' is not a valid {expected} for column '{column}'")]
    InvalidValue {
        column: String,
        expected: ColumnKind,
        value: String,
    },

    #[error("'{condition}' is not supported on {kind} column '{column}'")]
    UnsupportedCondition {
        column: String,
        condition: &'static str,
        kind: ColumnKind,
    },

    #[error("invalid value '{value}' for parameter '{name}'")]
    InvalidParameter { name: &'static str, value: String },

    #[error("column '{column}' cannot be modified")]
    ImmutableColumn { column: String },

    #[error("invalid {field}: {reason}")]
    InvalidPage { field: &'static str, reason: String },
}
