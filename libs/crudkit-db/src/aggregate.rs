//! Grouped selections built from a validated [`GroupPlan`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use crudkit_query::{Aggregate, AggregateFn, ColumnKind, GroupPlan, OrderPlan, ROW_COUNT_LABEL};
use sea_orm::prelude::{Decimal, Uuid};
use sea_orm::sea_query::{Alias, Asterisk, Expr, Func, Order, SimpleExpr};
use sea_orm::{
    DbBackend, DbErr, EntityTrait, JsonValue, QueryOrder, QueryResult, QuerySelect, Select,
};

use crate::predicate::{Operand, sea_order};
use crate::registry::{ColumnRegistry, col_expr};

fn row_count() -> SimpleExpr {
    Func::count(Expr::col(Asterisk)).into()
}

/// Postgres arrays are wrapped in `TO_JSON` so every backend returns JSON.
fn array_agg(backend: DbBackend, expr: SimpleExpr) -> SimpleExpr {
    match backend {
        DbBackend::Postgres => Func::cust(Alias::new("TO_JSON"))
            .arg(Func::cust(Alias::new("ARRAY_AGG")).arg(expr))
            .into(),
        DbBackend::MySql => Func::cust(Alias::new("JSON_ARRAYAGG")).arg(expr).into(),
        DbBackend::Sqlite => Func::cust(Alias::new("JSON_GROUP_ARRAY")).arg(expr).into(),
    }
}

/// SQL expression computing `agg` over its source column.
pub fn aggregate_expr<E: EntityTrait>(
    registry: &ColumnRegistry<E>,
    agg: &Aggregate,
    backend: DbBackend,
) -> Option<SimpleExpr> {
    let source = col_expr::<E>(registry.column(&agg.column.name)?);
    let expr = match agg.func {
        AggregateFn::Avg => Func::avg(source).into(),
        AggregateFn::Min => Func::min(source).into(),
        AggregateFn::Max => Func::max(source).into(),
        AggregateFn::Sum => Func::sum(source).into(),
        AggregateFn::Count => Func::count(source).into(),
        AggregateFn::Array => array_agg(backend, source),
    };
    Some(expr)
}

/// Resolve a grouped output column for `HAVING` and ordering.
///
/// The operand is the aggregate expression itself, not its alias, since not
/// every backend accepts output aliases in `HAVING`.
pub fn output_operand<E: EntityTrait>(
    registry: &ColumnRegistry<E>,
    plan: &GroupPlan,
    name: &str,
    backend: DbBackend,
) -> Option<Operand> {
    if plan.group_by.iter().any(|k| k.name == name) {
        return registry.operand(name);
    }
    if name == ROW_COUNT_LABEL {
        return Some(Operand {
            expr: row_count(),
            column_type: None,
        });
    }
    let agg = plan.aggregate(name)?;
    // min/max keep the source storage type; the rest are plain numbers
    let column_type = match agg.func {
        AggregateFn::Min | AggregateFn::Max => registry.column_type(&agg.column.name).cloned(),
        AggregateFn::Avg | AggregateFn::Sum | AggregateFn::Count | AggregateFn::Array => None,
    };
    Some(Operand {
        expr: aggregate_expr(registry, agg, backend)?,
        column_type,
    })
}

/// `SELECT keys.., COUNT(*) AS count, AGG(col) AS col.. GROUP BY keys..`
pub fn grouped_select<E: EntityTrait>(
    registry: &ColumnRegistry<E>,
    plan: &GroupPlan,
    backend: DbBackend,
) -> Select<E> {
    let mut select = E::find().select_only();
    for key in &plan.group_by {
        if let Some(column) = registry.column(&key.name) {
            select = select.column(column);
        }
    }
    select = select.column_as(row_count(), ROW_COUNT_LABEL);
    for agg in &plan.aggregates {
        if let Some(expr) = aggregate_expr(registry, agg, backend) {
            select = select.column_as(expr, agg.label.as_str());
        }
    }
    for key in &plan.group_by {
        if let Some(column) = registry.column(&key.name) {
            select = select.group_by(col_expr::<E>(column));
        }
    }
    select
}

/// Order groups by `order` (group keys ascending when absent); the group keys
/// are appended as a tiebreaker.
pub fn apply_group_order<E: EntityTrait>(
    select: Select<E>,
    registry: &ColumnRegistry<E>,
    plan: &GroupPlan,
    order: Option<&OrderPlan>,
    backend: DbBackend,
) -> Select<E> {
    let (mut select, dir, lead) = match order {
        Some(o) => {
            let dir = sea_order(o.order);
            let select = match output_operand(registry, plan, &o.column, backend) {
                Some(operand) => select.order_by(operand.expr, dir.clone()),
                None => select,
            };
            (select, dir, Some(o.column.as_str()))
        }
        None => (select, Order::Asc, None),
    };
    for key in &plan.group_by {
        if lead == Some(key.name.as_str()) {
            continue;
        }
        if let Some(column) = registry.column(&key.name) {
            select = select.order_by(col_expr::<E>(column), dir.clone());
        }
    }
    select
}

/// Decode one grouped row into a JSON object keyed by output label.
///
/// Computed columns carry no declared type, so each label is read as the
/// type its kind in `plan` implies. Array aggregates that arrive as JSON
/// text are left for [`decode_arrays`].
///
/// # Errors
/// Returns `DbErr` if a label is missing or its value fits none of the
/// types its kind allows.
pub fn decode_grouped_row(row: &QueryResult, plan: &GroupPlan) -> Result<JsonValue, DbErr> {
    let mut obj = serde_json::Map::new();
    for key in &plan.group_by {
        obj.insert(key.name.clone(), read_kind(row, &key.name, key.kind)?);
    }
    obj.insert(ROW_COUNT_LABEL.to_owned(), read_number(row, ROW_COUNT_LABEL)?);
    for agg in &plan.aggregates {
        let label = agg.label.as_str();
        let value = match agg.func {
            AggregateFn::Avg => read_float(row, label)?,
            AggregateFn::Array => read_array(row, label)?,
            AggregateFn::Min | AggregateFn::Max | AggregateFn::Sum | AggregateFn::Count => {
                let kind = agg.func.output_kind(agg.column.kind).unwrap_or(ColumnKind::Number);
                read_kind(row, label, kind)?
            }
        };
        obj.insert(agg.label.clone(), value);
    }
    Ok(JsonValue::Object(obj))
}

fn read_kind(row: &QueryResult, label: &str, kind: ColumnKind) -> Result<JsonValue, DbErr> {
    match kind {
        ColumnKind::Number => read_number(row, label),
        ColumnKind::Text => read_text(row, label),
        ColumnKind::Boolean => read_bool(row, label),
        ColumnKind::Timestamp => read_timestamp(row, label),
    }
}

fn json_or_null<T: Into<JsonValue>>(value: Option<T>) -> JsonValue {
    value.map_or(JsonValue::Null, Into::into)
}

fn read_number(row: &QueryResult, label: &str) -> Result<JsonValue, DbErr> {
    if let Ok(v) = row.try_get::<Option<i64>>("", label) {
        return Ok(json_or_null(v));
    }
    read_float(row, label)
}

fn read_float(row: &QueryResult, label: &str) -> Result<JsonValue, DbErr> {
    if let Ok(v) = row.try_get::<Option<f64>>("", label) {
        return Ok(json_or_null(v));
    }
    // Postgres and MySQL compute SUM/AVG as NUMERIC
    let v = row.try_get::<Option<Decimal>>("", label)?;
    Ok(v.map_or(JsonValue::Null, decimal_json))
}

fn decimal_json(d: Decimal) -> JsonValue {
    let text = d.normalize().to_string();
    if let Ok(n) = text.parse::<i64>() {
        return JsonValue::from(n);
    }
    text.parse::<f64>().map_or(JsonValue::String(text), JsonValue::from)
}

fn read_text(row: &QueryResult, label: &str) -> Result<JsonValue, DbErr> {
    if let Ok(v) = row.try_get::<Option<String>>("", label) {
        return Ok(json_or_null(v));
    }
    if let Ok(v) = row.try_get::<Option<Uuid>>("", label) {
        return Ok(json_or_null(v.map(|id| id.to_string())));
    }
    Ok(row.try_get::<Option<JsonValue>>("", label)?.unwrap_or(JsonValue::Null))
}

fn read_bool(row: &QueryResult, label: &str) -> Result<JsonValue, DbErr> {
    if let Ok(v) = row.try_get::<Option<bool>>("", label) {
        return Ok(json_or_null(v));
    }
    let v = row.try_get::<Option<i64>>("", label)?;
    Ok(json_or_null(v.map(|n| n != 0)))
}

fn read_timestamp(row: &QueryResult, label: &str) -> Result<JsonValue, DbErr> {
    let rfc3339 = |t: DateTime<Utc>| t.to_rfc3339_opts(SecondsFormat::AutoSi, true);
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>>("", label) {
        return Ok(json_or_null(v.map(rfc3339)));
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>>("", label) {
        return Ok(json_or_null(v.map(|t| rfc3339(t.and_utc()))));
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>>("", label) {
        return Ok(json_or_null(v.map(|d| d.to_string())));
    }
    if let Ok(v) = row.try_get::<Option<NaiveTime>>("", label) {
        return Ok(json_or_null(v.map(|t| t.to_string())));
    }
    read_text(row, label)
}

fn read_array(row: &QueryResult, label: &str) -> Result<JsonValue, DbErr> {
    if let Ok(v) = row.try_get::<Option<String>>("", label) {
        return Ok(json_or_null(v));
    }
    Ok(row.try_get::<Option<JsonValue>>("", label)?.unwrap_or(JsonValue::Null))
}

/// `SQLite` (and `MySQL` through some drivers) hands array aggregates back as
/// JSON text; decode them in place so every backend yields real arrays.
pub fn decode_arrays(rows: &mut [JsonValue], plan: &GroupPlan) {
    let labels: Vec<&str> = plan
        .aggregates
        .iter()
        .filter(|a| a.func == AggregateFn::Array)
        .map(|a| a.label.as_str())
        .collect();
    if labels.is_empty() {
        return;
    }
    for row in rows {
        let Some(obj) = row.as_object_mut() else {
            continue;
        };
        for label in &labels {
            let decoded = obj
                .get(*label)
                .and_then(JsonValue::as_str)
                .and_then(|raw| serde_json::from_str::<JsonValue>(raw).ok());
            if let Some(decoded) = decoded {
                obj.insert((*label).to_owned(), decoded);
            }
        }
    }
}
