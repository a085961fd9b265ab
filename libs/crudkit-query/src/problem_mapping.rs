//! Mapping from validation errors to Problem (pure data)
//!
//! Every rejection keeps its display message as the `detail`, so clients see
//! which column or parameter was wrong and what the valid options are.

use crudkit_errors::Problem;

use crate::error::ValidationError;
use crate::errors;

impl From<ValidationError> for Problem {
    fn from(err: ValidationError) -> Self {
        let def = match &err {
            ValidationError::UnknownColumn { .. } => errors::UNKNOWN_COLUMN,
            ValidationError::MissingCondition { .. } => errors::MISSING_CONDITION,
            ValidationError::AmbiguousCondition { .. } => errors::AMBIGUOUS_CONDITION,
            ValidationError::OrphanCondition { .. } => errors::ORPHAN_CONDITION,
            ValidationError::AmbiguousAggregation { .. } => errors::AMBIGUOUS_AGGREGATION,
            ValidationError::EmptyGroupBy => errors::EMPTY_GROUP_BY,
            ValidationError::InvalidValue { .. } => errors::INVALID_VALUE,
            ValidationError::UnsupportedCondition { .. } => errors::UNSUPPORTED_CONDITION,
            ValidationError::InvalidParameter { .. } => errors::INVALID_PARAMETER,
            ValidationError::ImmutableColumn { .. } => errors::IMMUTABLE_COLUMN,
            // Pagination parameters → 422
            ValidationError::InvalidPage { .. } => errors::INVALID_PAGE,
        };
        def.as_problem(err.to_string())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn unknown_column_converts_to_406() {
        let problem: Problem = ValidationError::UnknownColumn {
            field: "order_by",
            column: "password".to_owned(),
            valid: vec!["email".to_owned(), "id".to_owned()],
        }
        .into();

        assert_eq!(problem.status, StatusCode::NOT_ACCEPTABLE);
        assert_eq!(problem.title, "Unknown Column");
        assert!(problem.detail.contains("password"));
        assert!(problem.detail.contains("email, id"));
        assert_eq!(problem.code, "crudkit.query.unknown_column.v1");
    }

    #[test]
    fn grouping_errors_convert_to_406() {
        let problem: Problem = ValidationError::EmptyGroupBy.into();
        assert_eq!(problem.status, StatusCode::NOT_ACCEPTABLE);

        let problem: Problem = ValidationError::AmbiguousAggregation {
            column: "age".to_owned(),
            roles: vec!["avg", "max"],
        }
        .into();
        assert_eq!(problem.status, StatusCode::NOT_ACCEPTABLE);
        assert!(problem.code.contains("ambiguous_aggregation"));
    }

    #[test]
    fn invalid_page_converts_to_422() {
        let problem: Problem = ValidationError::InvalidPage {
            field: "size",
            reason: "must be less than or equal to 100".to_owned(),
        }
        .into();
        assert_eq!(problem.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(problem.body().detail, "invalid size: must be less than or equal to 100");
    }
}
