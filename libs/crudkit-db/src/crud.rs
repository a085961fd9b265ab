//! Generic CRUD facade over any sea-orm entity.
//!
//! Every operation takes the unit-of-work handle explicitly, so the same
//! `CrudBase` serves plain connections and open transactions alike.
//!
//! ```ignore
//! use crudkit_db::CrudBase;
//! use crudkit_query::{FilterSpec, PageParams, SortOrder};
//!
//! let users = CrudBase::<user::Entity>::new();
//! let filter = FilterSpec::on("age").min(18).ordered_by("email", SortOrder::Asc);
//! let page = users
//!     .get_multi_filtered_paginated(&db, &filter, &PageParams::new(1, 20))
//!     .await?;
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crudkit_query::value::parse_timestamp;
use crudkit_query::{
    ColumnDescriptor, ColumnKind, FilterSpec, GroupSpec, OrderPlan, Page, PageParams,
    PaginationLimits, SortOrder, ValidationError,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    IdenStatic, IntoActiveModel, Iterable, JsonValue, ModelTrait, PaginatorTrait, PrimaryKeyTrait,
    QueryFilter, QuerySelect, Select, TransactionTrait, TryIntoModel, Value,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::{
    apply_group_order, decode_arrays, decode_grouped_row, grouped_select, output_operand,
};
use crate::error::CrudError;
use crate::pager::{fetch_page, fetch_row_page};
use crate::predicate::{apply_order, build_condition};
use crate::registry::ColumnRegistry;

/// Audit timestamp hook for active models.
///
/// Both methods default to no-ops; entities with `created_at`/`updated_at`
/// columns set them here.
pub trait Timestamps {
    /// Called once before an insert.
    fn stamp_created(&mut self, _now: DateTime<Utc>) {}

    /// Called before every insert and update.
    fn stamp_updated(&mut self, _now: DateTime<Utc>) {}
}

type KeyValue<E> = <<E as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType;

pub struct CrudBase<E: EntityTrait> {
    registry: Arc<ColumnRegistry<E>>,
    limits: PaginationLimits,
}

impl<E: EntityTrait> Clone for CrudBase<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            limits: self.limits,
        }
    }
}

impl<E: EntityTrait> Default for CrudBase<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> CrudBase<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(PaginationLimits::default())
    }

    #[must_use]
    pub fn with_limits(limits: PaginationLimits) -> Self {
        Self {
            registry: Arc::new(ColumnRegistry::of()),
            limits,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ColumnRegistry<E> {
        &self.registry
    }

    #[must_use]
    pub fn limits(&self) -> PaginationLimits {
        self.limits
    }

    /// Page window for `page`, using the configured default size when `size`
    /// is absent.
    pub fn page_params(&self, page: u64, size: Option<u64>) -> PageParams {
        self.limits.params(page, size)
    }

    fn reject(&self, op: &'static str, err: ValidationError) -> CrudError {
        debug!(entity = self.registry.entity(), op, error = %err, "request rejected");
        CrudError::Validation(err)
    }

    fn fail(&self, op: &'static str, err: DbErr) -> CrudError {
        let err = CrudError::from(err);
        match &err {
            CrudError::Conflict(msg) => {
                warn!(entity = self.registry.entity(), op, error = %msg, "constraint violation");
            }
            CrudError::QueryRejected(msg) | CrudError::Unavailable(msg) => {
                warn!(entity = self.registry.entity(), op, error = %msg, "statement failed");
            }
            CrudError::Validation(_) | CrudError::NotFound(_) => {
                debug!(entity = self.registry.entity(), op, error = %err, "statement failed");
            }
        }
        err
    }

    fn not_found(&self) -> CrudError {
        CrudError::NotFound(format!("{} record", self.registry.entity()))
    }

    /// Match the row of `model` by its primary key.
    fn key_condition(&self, model: &E::Model) -> Condition {
        self.registry.keys().iter().fold(Condition::all(), |cond, key| {
            cond.add(Expr::col((E::default(), *key)).eq(model.get(*key)))
        })
    }

    /// Entity rows matching `filter`, ordered by its `order_by` with the
    /// primary key as tiebreaker.
    ///
    /// # Errors
    /// Returns `CrudError::Validation` if the filter does not fit the entity.
    pub fn filtered(&self, filter: &FilterSpec) -> Result<Select<E>, CrudError> {
        let columns = self.registry.columns();
        let plan = filter
            .plan(columns)
            .map_err(|e| self.reject("filter", e))?;
        let order = filter
            .order_plan(columns)
            .map_err(|e| self.reject("filter", e))?;

        let mut select = E::find();
        if let Some(plan) = &plan {
            let cond = build_condition(plan, |name| self.registry.operand(name))
                .map_err(|e| self.reject("filter", e))?;
            select = select.filter(cond);
        }
        Ok(apply_order(select, &self.registry, order.as_ref()))
    }

    fn check_page(&self, params: &PageParams) -> Result<(), CrudError> {
        params
            .validate(&self.limits)
            .map_err(|e| self.reject("paginate", e))
    }
}

impl<E> CrudBase<E>
where
    E: EntityTrait,
    E::Model: Sync,
{
    /// # Errors
    /// Returns `CrudError` if the query fails.
    pub async fn get<C>(&self, conn: &C, id: KeyValue<E>) -> Result<Option<E::Model>, CrudError>
    where
        C: ConnectionTrait,
    {
        E::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| self.fail("get", e))
    }

    /// Rows whose primary key is in `ids`, in primary key order. Unknown ids
    /// are skipped.
    ///
    /// # Errors
    /// Returns `CrudError::QueryRejected` for composite primary keys, or if
    /// the query fails.
    pub async fn get_by_ids<C, I>(&self, conn: &C, ids: I) -> Result<Vec<E::Model>, CrudError>
    where
        C: ConnectionTrait,
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let [key] = self.registry.keys() else {
            return Err(CrudError::QueryRejected(format!(
                "{} has a composite primary key",
                self.registry.entity()
            )));
        };
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = E::find().filter(Expr::col((E::default(), *key)).is_in(ids));
        apply_order(select, &self.registry, None)
            .all(conn)
            .await
            .map_err(|e| self.fail("get_by_ids", e))
    }

    /// # Errors
    /// Returns `CrudError` if the query fails.
    pub async fn count<C>(&self, conn: &C) -> Result<u64, CrudError>
    where
        C: ConnectionTrait,
    {
        E::find()
            .count(conn)
            .await
            .map_err(|e| self.fail("count", e))
    }

    /// All rows of `query`, or of the whole table in primary key order.
    ///
    /// # Errors
    /// Returns `CrudError` if the query fails.
    pub async fn get_multi<C>(
        &self,
        conn: &C,
        query: Option<Select<E>>,
    ) -> Result<Vec<E::Model>, CrudError>
    where
        C: ConnectionTrait,
    {
        query
            .unwrap_or_else(|| apply_order(E::find(), &self.registry, None))
            .all(conn)
            .await
            .map_err(|e| self.fail("get_multi", e))
    }

    /// Offset/limit listing in primary key order; `limit` is capped at the
    /// configured maximum page size.
    ///
    /// # Errors
    /// Returns `CrudError` if the query fails.
    pub async fn get_multi_window<C>(
        &self,
        conn: &C,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<E::Model>, CrudError>
    where
        C: ConnectionTrait,
    {
        let limit = limit.min(self.limits.max_size);
        apply_order(E::find(), &self.registry, None)
            .offset(skip)
            .limit(limit)
            .all(conn)
            .await
            .map_err(|e| self.fail("get_multi_window", e))
    }

    /// One page of `query`, or of the whole table in primary key order.
    ///
    /// # Errors
    /// Returns `CrudError::Validation` for an invalid window, or
    /// `CrudError` if the query fails.
    pub async fn get_multi_paginated<C>(
        &self,
        conn: &C,
        params: &PageParams,
        query: Option<Select<E>>,
    ) -> Result<Page<E::Model>, CrudError>
    where
        C: ConnectionTrait,
    {
        self.check_page(params)?;
        let select = query.unwrap_or_else(|| apply_order(E::find(), &self.registry, None));
        fetch_page(select, conn, params)
            .await
            .map_err(|e| self.fail("get_multi_paginated", e))
    }

    /// One page of the table ordered by `order_by` (primary key when absent).
    ///
    /// # Errors
    /// - `CrudError::Validation` if `order_by` is unknown or the window is invalid
    /// - `CrudError` if the query fails
    pub async fn get_multi_paginated_ordered<C>(
        &self,
        conn: &C,
        order_by: Option<&str>,
        order: SortOrder,
        params: &PageParams,
    ) -> Result<Page<E::Model>, CrudError>
    where
        C: ConnectionTrait,
    {
        let plan = order_by
            .map(|name| {
                self.registry
                    .columns()
                    .require("order_by", name)
                    .map(|c| OrderPlan {
                        column: c.name.clone(),
                        order,
                    })
            })
            .transpose()
            .map_err(|e| self.reject("get_multi_paginated_ordered", e))?;
        self.check_page(params)?;

        let select = apply_order(E::find(), &self.registry, plan.as_ref());
        fetch_page(select, conn, params)
            .await
            .map_err(|e| self.fail("get_multi_paginated_ordered", e))
    }

    /// One page of the rows matching `filter`.
    ///
    /// # Errors
    /// - `CrudError::Validation` if the filter or the window is invalid
    /// - `CrudError` if the query fails
    pub async fn get_multi_filtered_paginated<C>(
        &self,
        conn: &C,
        filter: &FilterSpec,
        params: &PageParams,
    ) -> Result<Page<E::Model>, CrudError>
    where
        C: ConnectionTrait,
    {
        let select = self.filtered(filter)?;
        self.check_page(params)?;
        debug!(
            entity = self.registry.entity(),
            filter_by = filter.filter_by.as_deref(),
            order_by = filter.order_by.as_deref(),
            "filtered listing"
        );
        fetch_page(select, conn, params)
            .await
            .map_err(|e| self.fail("get_multi_filtered_paginated", e))
    }

    /// One page of grouped rows. `filter` applies to the grouped output as
    /// `HAVING`, and its `order_by` orders the groups.
    ///
    /// Each row is a JSON object with the group keys, `count`, and one
    /// member per aggregate labeled by its source column.
    ///
    /// # Errors
    /// - `CrudError::Validation` if the grouping, filter or window is invalid
    /// - `CrudError` if the query fails
    pub async fn get_multi_grouped_paginated<C>(
        &self,
        conn: &C,
        filter: &FilterSpec,
        group: &GroupSpec,
        params: &PageParams,
    ) -> Result<Page<JsonValue>, CrudError>
    where
        C: ConnectionTrait,
    {
        self.grouped(conn, None, filter, group, params).await
    }

    /// Like [`Self::get_multi_grouped_paginated`], but `rows` first narrows
    /// the entity rows with a `WHERE` predicate before grouping. The
    /// ordering part of `rows` is ignored.
    ///
    /// # Errors
    /// - `CrudError::Validation` if either filter, the grouping or the window is invalid
    /// - `CrudError` if the query fails
    pub async fn get_multi_grouped_paginated_prefiltered<C>(
        &self,
        conn: &C,
        rows: &FilterSpec,
        having: &FilterSpec,
        group: &GroupSpec,
        params: &PageParams,
    ) -> Result<Page<JsonValue>, CrudError>
    where
        C: ConnectionTrait,
    {
        self.grouped(conn, Some(rows), having, group, params).await
    }

    async fn grouped<C>(
        &self,
        conn: &C,
        rows: Option<&FilterSpec>,
        having: &FilterSpec,
        group: &GroupSpec,
        params: &PageParams,
    ) -> Result<Page<JsonValue>, CrudError>
    where
        C: ConnectionTrait,
    {
        const OP: &str = "get_multi_grouped_paginated";
        let backend = conn.get_database_backend();
        let columns = self.registry.columns();

        let plan = group.plan(columns).map_err(|e| self.reject(OP, e))?;
        let outputs = plan.output_columns();
        let having_plan = having.plan(&outputs).map_err(|e| self.reject(OP, e))?;
        let order = having.order_plan(&outputs).map_err(|e| self.reject(OP, e))?;
        let rows_plan = match rows {
            Some(rows) => rows.plan(columns).map_err(|e| self.reject(OP, e))?,
            None => None,
        };
        self.check_page(params)?;

        let mut select = grouped_select(&self.registry, &plan, backend);
        if let Some(rows_plan) = &rows_plan {
            let cond = build_condition(rows_plan, |name| self.registry.operand(name))
                .map_err(|e| self.reject(OP, e))?;
            select = select.filter(cond);
        }
        if let Some(having_plan) = &having_plan {
            let cond = build_condition(having_plan, |name| {
                output_operand(&self.registry, &plan, name, backend)
            })
            .map_err(|e| self.reject(OP, e))?;
            select = select.having(cond);
        }
        let select = apply_group_order(select, &self.registry, &plan, order.as_ref(), backend);

        debug!(
            entity = self.registry.entity(),
            group_by = ?plan.key_names(),
            aggregates = plan.aggregates.len(),
            "grouped listing"
        );
        let rows = fetch_row_page(select, conn, params)
            .await
            .map_err(|e| self.fail(OP, e))?;
        let mut items = rows
            .items
            .iter()
            .map(|row| decode_grouped_row(row, &plan))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.fail(OP, e))?;
        decode_arrays(&mut items, &plan);
        Ok(Page::new(items, params, rows.total))
    }
}

impl<E> CrudBase<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Timestamps,
{
    /// Insert one row, stamping its audit timestamps.
    ///
    /// # Errors
    /// - `CrudError::Conflict` on a unique or foreign-key violation
    /// - `CrudError` if the insert fails otherwise
    pub async fn create<C, I>(&self, conn: &C, input: I) -> Result<E::Model, CrudError>
    where
        C: ConnectionTrait,
        I: IntoActiveModel<E::ActiveModel>,
    {
        let mut am = input.into_active_model();
        let now = Utc::now();
        am.stamp_created(now);
        am.stamp_updated(now);
        am.insert(conn).await.map_err(|e| self.fail("create", e))
    }

    /// Insert every input in one transaction; any failure aborts the batch.
    ///
    /// # Errors
    /// - `CrudError::Conflict` on a unique or foreign-key violation
    /// - `CrudError` if the transaction or an insert fails
    pub async fn create_multi<C, I>(
        &self,
        conn: &C,
        inputs: Vec<I>,
    ) -> Result<Vec<E::Model>, CrudError>
    where
        C: ConnectionTrait + TransactionTrait,
        I: IntoActiveModel<E::ActiveModel>,
    {
        let txn = conn.begin().await.map_err(|e| self.fail("create_multi", e))?;
        let now = Utc::now();
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let mut am = input.into_active_model();
            am.stamp_created(now);
            am.stamp_updated(now);
            // Returning early drops `txn`, which rolls it back.
            let model = am
                .insert(&txn)
                .await
                .map_err(|e| self.fail("create_multi", e))?;
            created.push(model);
        }
        txn.commit()
            .await
            .map_err(|e| self.fail("create_multi", e))?;
        debug!(
            entity = self.registry.entity(),
            rows = created.len(),
            "batch created"
        );
        Ok(created)
    }

    /// Apply the fields present in `patch` to `current`'s row and return the
    /// refreshed row. `updated_at` is always restamped.
    ///
    /// # Errors
    /// - `CrudError::NotFound` if the row no longer exists
    /// - `CrudError::Conflict` on a unique or foreign-key violation
    /// - `CrudError` if the update fails otherwise
    pub async fn update<C, U>(
        &self,
        conn: &C,
        current: &E::Model,
        patch: U,
    ) -> Result<E::Model, CrudError>
    where
        C: ConnectionTrait,
        U: IntoActiveModel<E::ActiveModel>,
    {
        self.save_changes(conn, current, patch.into_active_model())
            .await
    }

    /// Apply a column-name keyed map of changes to `current`'s row.
    ///
    /// # Errors
    /// - `CrudError::Validation` for unknown keys, primary-key keys, or values
    ///   that do not fit their column
    /// - `CrudError::NotFound` if the row no longer exists
    /// - `CrudError` if the update fails otherwise
    pub async fn update_from_map<C>(
        &self,
        conn: &C,
        current: &E::Model,
        changes: &serde_json::Map<String, JsonValue>,
    ) -> Result<E::Model, CrudError>
    where
        C: ConnectionTrait,
        E::ActiveModel: TryIntoModel<E::Model>,
        for<'de> E::Model: Deserialize<'de> + Serialize,
    {
        for (key, value) in changes {
            let descriptor = self
                .registry
                .columns()
                .require("update", key)
                .map_err(|e| self.reject("update_from_map", e))?;
            if self.registry.is_key(key) {
                return Err(self.reject(
                    "update_from_map",
                    ValidationError::ImmutableColumn {
                        column: key.clone(),
                    },
                ));
            }
            check_json_value(descriptor, value).map_err(|e| self.reject("update_from_map", e))?;
        }

        let mut merged = serde_json::to_value(current)
            .map_err(|e| CrudError::QueryRejected(e.to_string()))?;
        if let Some(obj) = merged.as_object_mut() {
            for (key, value) in changes {
                obj.insert(key.clone(), value.clone());
            }
        }
        let mut am =
            E::ActiveModel::from_json(merged).map_err(|e| self.fail("update_from_map", e))?;
        for column in E::Column::iter() {
            if !changes.contains_key(column.as_str()) {
                am.not_set(column);
            }
        }
        self.save_changes(conn, current, am).await
    }

    async fn save_changes<C>(
        &self,
        conn: &C,
        current: &E::Model,
        mut am: E::ActiveModel,
    ) -> Result<E::Model, CrudError>
    where
        C: ConnectionTrait,
    {
        for key in self.registry.keys() {
            am.set(*key, current.get(*key));
        }
        am.stamp_updated(Utc::now());

        let changed = E::Column::iter()
            .filter(|c| !self.registry.is_key(c.as_str()))
            .any(|c| am.get(c).is_set());
        if !changed {
            return E::find()
                .filter(self.key_condition(current))
                .one(conn)
                .await
                .map_err(|e| self.fail("update", e))?
                .ok_or_else(|| self.not_found());
        }
        am.update(conn).await.map_err(|e| self.fail("update", e))
    }

    /// Delete the row with primary key `id` and return its last state.
    ///
    /// # Errors
    /// - `CrudError::NotFound` if no row has that key
    /// - `CrudError::Conflict` if other rows still reference it
    /// - `CrudError` if the delete fails otherwise
    pub async fn remove<C>(&self, conn: &C, id: KeyValue<E>) -> Result<E::Model, CrudError>
    where
        C: ConnectionTrait,
    {
        let model = E::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| self.fail("remove", e))?
            .ok_or_else(|| self.not_found())?;
        model
            .clone()
            .into_active_model()
            .delete(conn)
            .await
            .map_err(|e| self.fail("remove", e))?;
        Ok(model)
    }
}

fn check_json_value(
    descriptor: &ColumnDescriptor,
    value: &JsonValue,
) -> Result<(), ValidationError> {
    let fits = match (descriptor.kind, value) {
        (_, JsonValue::Null) => descriptor.nullable,
        (ColumnKind::Number, JsonValue::Number(_))
        | (ColumnKind::Boolean, JsonValue::Bool(_))
        | (ColumnKind::Text, JsonValue::String(_) | JsonValue::Array(_) | JsonValue::Object(_)) => {
            true
        }
        (ColumnKind::Timestamp, JsonValue::String(s)) => parse_timestamp(s).is_some(),
        _ => false,
    };
    if fits {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            column: descriptor.name.clone(),
            expected: descriptor.kind,
            value: value.to_string(),
        })
    }
}
