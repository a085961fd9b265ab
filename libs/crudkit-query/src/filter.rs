//! Single-column filter requests and their validation.
//!
//! A [`FilterSpec`] is what a caller sends; [`FilterSpec::plan`] checks it
//! against a [`ColumnSet`] and produces a [`FilterPlan`] whose operands are
//! already coerced to the column kind. Backends compile the plan into SQL
//! without re-validating anything.

use serde::{Deserialize, Serialize};

use crate::SortOrder;
use crate::columns::{ColumnDescriptor, ColumnKind, ColumnSet};
use crate::error::ValidationError;
use crate::value::Scalar;

/// Declarative single-column filter plus ordering.
///
/// If `filter_by` is set, exactly one condition family among
/// `min`/`max`, `eq`, `neq`, `like`, `isin`, `isnotin` may be populated, and
/// `nullable` may be added on top. Without `filter_by` only `order_by` and
/// `order` are meaningful.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct FilterSpec {
    pub filter_by: Option<String>,
    pub min: Option<Scalar>,
    pub max: Option<Scalar>,
    pub eq: Option<Scalar>,
    pub neq: Option<Scalar>,
    pub like: Option<String>,
    pub isin: Option<Vec<Scalar>>,
    pub isnotin: Option<Vec<Scalar>>,
    /// `true` forces NULLs in, `false` forces them out.
    pub nullable: Option<bool>,
    pub order_by: Option<String>,
    pub order: SortOrder,
}

/// The single active condition family of a validated filter.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// `min <= col` and/or `col <= max`; at least one bound is present.
    Range {
        min: Option<Scalar>,
        max: Option<Scalar>,
    },
    Eq(Scalar),
    Neq(Scalar),
    /// Case-insensitive substring match; the raw needle, not yet escaped.
    Like(String),
    In(Vec<Scalar>),
    NotIn(Vec<Scalar>),
}

/// A filter that passed validation against a column set.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterPlan {
    pub column: ColumnDescriptor,
    pub condition: Option<Condition>,
    pub nullable: Option<bool>,
}

/// A validated ordering request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderPlan {
    pub column: String,
    pub order: SortOrder,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a filter on `column`.
    pub fn on(column: impl Into<String>) -> Self {
        Self {
            filter_by: Some(column.into()),
            ..Self::default()
        }
    }

    pub fn min(mut self, v: impl Into<Scalar>) -> Self {
        self.min = Some(v.into());
        self
    }

    pub fn max(mut self, v: impl Into<Scalar>) -> Self {
        self.max = Some(v.into());
        self
    }

    pub fn eq(mut self, v: impl Into<Scalar>) -> Self {
        self.eq = Some(v.into());
        self
    }

    pub fn neq(mut self, v: impl Into<Scalar>) -> Self {
        self.neq = Some(v.into());
        self
    }

    pub fn like(mut self, needle: impl Into<String>) -> Self {
        self.like = Some(needle.into());
        self
    }

    pub fn isin<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        self.isin = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn isnotin<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        self.isnotin = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn nullable(mut self, include_nulls: bool) -> Self {
        self.nullable = Some(include_nulls);
        self
    }

    pub fn ordered_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some(column.into());
        self.order = order;
        self
    }

    #[must_use]
    pub fn is_filtered(&self) -> bool {
        self.filter_by.is_some()
    }

    /// Populated condition families, in declaration order.
    fn active_families(&self) -> Vec<&'static str> {
        let mut families = Vec::new();
        if self.min.is_some() || self.max.is_some() {
            families.push("min/max");
        }
        if self.eq.is_some() {
            families.push("eq");
        }
        if self.neq.is_some() {
            families.push("neq");
        }
        if self.like.is_some() {
            families.push("like");
        }
        if self.isin.is_some() {
            families.push("isin");
        }
        if self.isnotin.is_some() {
            families.push("isnotin");
        }
        families
    }

    fn first_orphan(&self) -> Option<&'static str> {
        [
            ("min", self.min.is_some()),
            ("max", self.max.is_some()),
            ("eq", self.eq.is_some()),
            ("neq", self.neq.is_some()),
            ("like", self.like.is_some()),
            ("isin", self.isin.is_some()),
            ("isnotin", self.isnotin.is_some()),
            ("nullable", self.nullable.is_some()),
        ]
        .into_iter()
        .find_map(|(name, set)| set.then_some(name))
    }

    /// Validate the filter part against `columns`.
    ///
    /// Returns `Ok(None)` when `filter_by` is unset (a pure order/paginate
    /// request).
    ///
    /// # Errors
    /// - `UnknownColumn` if `filter_by` is not in `columns`
    /// - `MissingCondition` if no condition family and no `nullable` flag is set
    /// - `AmbiguousCondition` if more than one condition family is set
    /// - `OrphanCondition` if conditions are set without `filter_by`
    /// - `InvalidValue` / `UnsupportedCondition` if an operand does not fit the column
    pub fn plan(&self, columns: &ColumnSet) -> Result<Option<FilterPlan>, ValidationError> {
        let Some(filter_by) = self.filter_by.as_deref() else {
            if let Some(field) = self.first_orphan() {
                return Err(ValidationError::OrphanCondition { field });
            }
            return Ok(None);
        };

        let column = columns.require("filter_by", filter_by)?;

        let families = self.active_families();
        if families.len() > 1 {
            return Err(ValidationError::AmbiguousCondition {
                column: column.name.clone(),
                families,
            });
        }
        if families.is_empty() && self.nullable.is_none() {
            return Err(ValidationError::MissingCondition {
                column: column.name.clone(),
            });
        }

        let condition = self.build_condition(column)?;
        Ok(Some(FilterPlan {
            column: column.clone(),
            condition,
            nullable: self.nullable,
        }))
    }

    fn build_condition(
        &self,
        column: &ColumnDescriptor,
    ) -> Result<Option<Condition>, ValidationError> {
        let coerce = |v: &Scalar| coerce_operand(column, v);

        if self.min.is_some() || self.max.is_some() {
            if column.kind == ColumnKind::Boolean {
                return Err(unsupported(column, "min/max"));
            }
            return Ok(Some(Condition::Range {
                min: self.min.as_ref().map(coerce).transpose()?,
                max: self.max.as_ref().map(coerce).transpose()?,
            }));
        }
        if let Some(v) = &self.eq {
            return Ok(Some(Condition::Eq(coerce(v)?)));
        }
        if let Some(v) = &self.neq {
            return Ok(Some(Condition::Neq(coerce(v)?)));
        }
        if let Some(needle) = &self.like {
            if column.kind != ColumnKind::Text {
                return Err(unsupported(column, "like"));
            }
            return Ok(Some(Condition::Like(needle.clone())));
        }
        if let Some(values) = &self.isin {
            let values = values.iter().map(coerce).collect::<Result<_, _>>()?;
            return Ok(Some(Condition::In(values)));
        }
        if let Some(values) = &self.isnotin {
            let values = values.iter().map(coerce).collect::<Result<_, _>>()?;
            return Ok(Some(Condition::NotIn(values)));
        }
        Ok(None)
    }

    /// Validate the ordering part against `columns`.
    ///
    /// Returns `Ok(None)` when `order_by` is unset; the caller picks the
    /// default order.
    ///
    /// # Errors
    /// Returns `UnknownColumn` if `order_by` is not in `columns`.
    pub fn order_plan(&self, columns: &ColumnSet) -> Result<Option<OrderPlan>, ValidationError> {
        self.order_by
            .as_deref()
            .map(|name| {
                columns.require("order_by", name).map(|c| OrderPlan {
                    column: c.name.clone(),
                    order: self.order,
                })
            })
            .transpose()
    }

    /// Bind a filter from a URL query string.
    ///
    /// Repeated keys and the `key[]` spelling accumulate into `isin` /
    /// `isnotin`. Empty values count as absent and unknown keys are ignored.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for an unparseable `nullable` or `order`.
    pub fn from_query_str(query: &str) -> Result<Self, ValidationError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut spec = FilterSpec::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let key: &str = &key;
            let key = key.strip_suffix("[]").unwrap_or(key);
            let text = || Scalar::Text(value.to_string());
            match key {
                "filter_by" => spec.filter_by = Some(value.to_string()),
                "min" => spec.min = Some(text()),
                "max" => spec.max = Some(text()),
                "eq" => spec.eq = Some(text()),
                "neq" => spec.neq = Some(text()),
                "like" => spec.like = Some(value.to_string()),
                "isin" => spec.isin.get_or_insert_with(Vec::new).push(text()),
                "isnotin" => spec.isnotin.get_or_insert_with(Vec::new).push(text()),
                "nullable" => {
                    let parsed = Scalar::Text(value.to_string())
                        .coerce(ColumnKind::Boolean)
                        .and_then(|s| match s {
                            Scalar::Bool(b) => Some(b),
                            _ => None,
                        })
                        .ok_or_else(|| ValidationError::InvalidParameter {
                            name: "nullable",
                            value: value.to_string(),
                        })?;
                    spec.nullable = Some(parsed);
                }
                "order_by" => spec.order_by = Some(value.to_string()),
                "order" => {
                    spec.order = SortOrder::parse(&value).ok_or_else(|| {
                        ValidationError::InvalidParameter {
                            name: "order",
                            value: value.to_string(),
                        }
                    })?;
                }
                _ => {}
            }
        }
        Ok(spec)
    }
}

fn coerce_operand(column: &ColumnDescriptor, v: &Scalar) -> Result<Scalar, ValidationError> {
    v.coerce(column.kind)
        .ok_or_else(|| ValidationError::InvalidValue {
            column: column.name.clone(),
            expected: column.kind,
            value: v.to_string(),
        })
}

fn unsupported(column: &ColumnDescriptor, condition: &'static str) -> ValidationError {
    ValidationError::UnsupportedCondition {
        column: column.name.clone(),
        condition,
        kind: column.kind,
    }
}
