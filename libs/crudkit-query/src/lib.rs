#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Declarative request contracts for the crudkit query engine.
//!
//! Everything here is pure data and validation: column metadata, filter and
//! grouping requests, pagination parameters and envelopes. Nothing in this
//! crate talks to a database, so every rejection it produces happens before
//! any SQL is assembled.

pub mod columns;
pub mod error;
pub mod errors;
pub mod filter;
pub mod group;
pub mod page;
pub mod problem_mapping;
pub mod response;
pub mod value;

pub use columns::{ColumnDescriptor, ColumnKind, ColumnSet};
pub use error::ValidationError;
pub use filter::{Condition, FilterPlan, FilterSpec, OrderPlan};
pub use group::{Aggregate, AggregateFn, GroupPlan, GroupSpec, ROW_COUNT_LABEL};
pub use page::{Page, PageParams, PaginationLimits};
pub use response::Response;
pub use value::Scalar;

/// Sort direction of an ordered listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

impl SortOrder {
    /// Parse the query-string spelling (`asc` / `desc`, case-insensitive).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("asc") {
            Some(SortOrder::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(SortOrder::Desc)
        } else {
            None
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}
