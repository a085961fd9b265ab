//! Grouping requests and their validation.

use serde::{Deserialize, Serialize};

use crate::columns::{ColumnDescriptor, ColumnKind, ColumnSet};
use crate::error::ValidationError;

/// Label of the `COUNT(*)` column every grouped row carries.
pub const ROW_COUNT_LABEL: &str = "count";

/// Declarative grouping request.
///
/// Each column may appear in at most one role. Every aggregate is labeled by
/// its source column name in the output rows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct GroupSpec {
    pub group_by: Vec<String>,
    #[serde(default)]
    pub avg: Vec<String>,
    #[serde(default)]
    pub min: Vec<String>,
    #[serde(default)]
    pub max: Vec<String>,
    #[serde(default)]
    pub sum: Vec<String>,
    #[serde(default)]
    pub count: Vec<String>,
    #[serde(default)]
    pub array: Vec<String>,
}

/// Aggregate functions supported in a grouped selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregateFn {
    Avg,
    Min,
    Max,
    Sum,
    /// Non-null values of one column.
    Count,
    /// All values of the group collected into an array.
    Array,
}

impl AggregateFn {
    #[must_use]
    pub fn role(self) -> &'static str {
        match self {
            AggregateFn::Avg => "avg",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
            AggregateFn::Sum => "sum",
            AggregateFn::Count => "count",
            AggregateFn::Array => "array",
        }
    }

    /// Kind of the aggregated value, or `None` if it cannot be filtered on.
    #[must_use]
    pub fn output_kind(self, source: ColumnKind) -> Option<ColumnKind> {
        match self {
            AggregateFn::Avg | AggregateFn::Sum | AggregateFn::Count => {
                Some(ColumnKind::Number)
            }
            AggregateFn::Min | AggregateFn::Max => Some(source),
            AggregateFn::Array => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Aggregate {
    pub func: AggregateFn,
    pub column: ColumnDescriptor,
    pub label: String,
}

/// A grouping that passed validation against a column set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupPlan {
    pub group_by: Vec<ColumnDescriptor>,
    pub aggregates: Vec<Aggregate>,
}

const GROUP_BY_ROLE: &str = "group_by";

impl GroupSpec {
    pub fn by<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_by: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn avg(mut self, column: impl Into<String>) -> Self {
        self.avg.push(column.into());
        self
    }

    pub fn min(mut self, column: impl Into<String>) -> Self {
        self.min.push(column.into());
        self
    }

    pub fn max(mut self, column: impl Into<String>) -> Self {
        self.max.push(column.into());
        self
    }

    pub fn sum(mut self, column: impl Into<String>) -> Self {
        self.sum.push(column.into());
        self
    }

    pub fn count(mut self, column: impl Into<String>) -> Self {
        self.count.push(column.into());
        self
    }

    pub fn array(mut self, column: impl Into<String>) -> Self {
        self.array.push(column.into());
        self
    }

    fn aggregate_roles(&self) -> [(AggregateFn, &[String]); 6] {
        [
            (AggregateFn::Avg, self.avg.as_slice()),
            (AggregateFn::Min, self.min.as_slice()),
            (AggregateFn::Max, self.max.as_slice()),
            (AggregateFn::Sum, self.sum.as_slice()),
            (AggregateFn::Count, self.count.as_slice()),
            (AggregateFn::Array, self.array.as_slice()),
        ]
    }

    /// Every `(role, column)` pair in role order.
    fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> {
        let keys = self.group_by.iter().map(|c| (GROUP_BY_ROLE, c.as_str()));
        let aggregates = self
            .aggregate_roles()
            .into_iter()
            .flat_map(|(func, cols)| cols.iter().map(move |c| (func.role(), c.as_str())));
        keys.chain(aggregates)
    }

    /// Validate the grouping against `columns`.
    ///
    /// # Errors
    /// - `EmptyGroupBy` if `group_by` is empty
    /// - `UnknownColumn` for the first unknown name, in role order
    /// - `AmbiguousAggregation` if a column appears more than once, or is
    ///   named like the row-count label
    pub fn plan(&self, columns: &ColumnSet) -> Result<GroupPlan, ValidationError> {
        if self.group_by.is_empty() {
            return Err(ValidationError::EmptyGroupBy);
        }

        for (role, name) in self.entries() {
            columns.require(role, name)?;
        }

        let mut seen: Vec<(&str, Vec<&'static str>)> = Vec::new();
        for (role, name) in self.entries() {
            match seen.iter_mut().find(|(n, _)| *n == name) {
                Some((_, roles)) => roles.push(role),
                None => seen.push((name, vec![role])),
            }
        }
        if let Some((name, roles)) = seen.into_iter().find(|(_, roles)| roles.len() > 1) {
            return Err(ValidationError::AmbiguousAggregation {
                column: name.to_owned(),
                roles,
            });
        }
        if let Some((role, name)) = self.entries().find(|(_, n)| *n == ROW_COUNT_LABEL) {
            return Err(ValidationError::AmbiguousAggregation {
                column: name.to_owned(),
                roles: vec![role, "row count"],
            });
        }

        let group_by = self
            .group_by
            .iter()
            .map(|name| columns.require(GROUP_BY_ROLE, name).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        let mut aggregates = Vec::new();
        for (func, cols) in self.aggregate_roles() {
            for name in cols {
                let column = columns.require(func.role(), name)?.clone();
                aggregates.push(Aggregate {
                    func,
                    label: column.name.clone(),
                    column,
                });
            }
        }

        Ok(GroupPlan {
            group_by,
            aggregates,
        })
    }
}

impl GroupPlan {
    /// Columns of the grouped rows that a `HAVING` filter or an ordering may
    /// reference.
    pub fn output_columns(&self) -> ColumnSet {
        let mut set: ColumnSet = self.group_by.iter().cloned().collect();
        set.insert(ColumnDescriptor::new(
            ROW_COUNT_LABEL,
            ColumnKind::Number,
            false,
        ));
        for agg in &self.aggregates {
            if let Some(kind) = agg.func.output_kind(agg.column.kind) {
                set.insert(ColumnDescriptor::new(agg.label.clone(), kind, true));
            }
        }
        set
    }

    /// Group key names in request order.
    #[must_use]
    pub fn key_names(&self) -> Vec<&str> {
        self.group_by.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up an aggregate by its output label.
    #[must_use]
    pub fn aggregate(&self, label: &str) -> Option<&Aggregate> {
        self.aggregates.iter().find(|a| a.label == label)
    }
}
