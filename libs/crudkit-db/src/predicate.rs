//! Validated filter plan → `sea_orm::Condition` compiler.
//!
//! The compiler is generic over a column resolver, so the same code yields
//! `WHERE` predicates on entity columns and `HAVING` predicates on aggregate
//! expressions.

use crudkit_query::filter::Condition as FilterCondition;
use crudkit_query::{FilterPlan, OrderPlan, Scalar, SortOrder, ValidationError};
use sea_orm::sea_query::{ColumnType, Expr, Func, LikeExpr, Order, SimpleExpr};
use sea_orm::{Condition, EntityTrait, IdenStatic, QueryOrder, Select, Value};

use crate::registry::{ColumnRegistry, bind_value, col_expr};

/// A filterable SQL expression and the storage type its operands bind to.
#[derive(Clone, Debug)]
pub struct Operand {
    pub expr: SimpleExpr,
    /// `None` for computed values without a declared column type.
    pub column_type: Option<ColumnType>,
}

impl Operand {
    fn target(&self) -> Expr {
        Expr::expr(self.expr.clone())
    }
}

fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

fn like_contains(s: &str) -> String {
    format!("%{}%", like_escape(&s.to_lowercase()))
}

/// Compile a validated filter into a condition, resolving the filtered
/// column through `resolve`.
///
/// # Errors
/// - `UnknownColumn` if `resolve` does not know the planned column
/// - `InvalidValue` if an operand cannot be bound to the column's storage type
pub fn build_condition<R>(plan: &FilterPlan, resolve: R) -> Result<Condition, ValidationError>
where
    R: Fn(&str) -> Option<Operand>,
{
    let operand = resolve(&plan.column.name).ok_or_else(|| ValidationError::UnknownColumn {
        field: "filter_by",
        column: plan.column.name.clone(),
        valid: Vec::new(),
    })?;
    let bind = |v: &Scalar| bind_value(operand.column_type.as_ref(), &plan.column, v);
    let bind_all = |vs: &[Scalar]| vs.iter().map(bind).collect::<Result<Vec<Value>, _>>();

    let predicate = match &plan.condition {
        None => None,
        Some(FilterCondition::Range { min, max }) => {
            let mut cond = Condition::all();
            if let Some(min) = min {
                cond = cond.add(operand.target().gte(bind(min)?));
            }
            if let Some(max) = max {
                cond = cond.add(operand.target().lte(bind(max)?));
            }
            Some(cond)
        }
        Some(FilterCondition::Eq(v)) => Some(Condition::all().add(operand.target().eq(bind(v)?))),
        Some(FilterCondition::Neq(v)) => Some(Condition::all().add(operand.target().ne(bind(v)?))),
        Some(FilterCondition::Like(needle)) => {
            let pattern = LikeExpr::new(like_contains(needle)).escape('\\');
            let lowered = Expr::expr(Func::lower(operand.expr.clone()));
            Some(Condition::all().add(lowered.like(pattern)))
        }
        Some(FilterCondition::In(values)) => {
            let values = bind_all(values)?;
            if values.is_empty() {
                // IN () → always false
                Some(Condition::all().add(Expr::cust("1=0")))
            } else {
                Some(Condition::all().add(operand.target().is_in(values)))
            }
        }
        Some(FilterCondition::NotIn(values)) => {
            let values = bind_all(values)?;
            if values.is_empty() {
                // NOT IN () → always true
                Some(Condition::all().add(Expr::cust("1=1")))
            } else {
                Some(Condition::all().add(operand.target().is_not_in(values)))
            }
        }
    };

    let cond = match (predicate, plan.nullable) {
        (Some(p), None) => p,
        (Some(p), Some(true)) => Condition::any().add(p).add(operand.target().is_null()),
        (Some(p), Some(false)) => Condition::all().add(p).add(operand.target().is_not_null()),
        (None, Some(true)) => Condition::all().add(operand.target().is_null()),
        (None, Some(false)) => Condition::all().add(operand.target().is_not_null()),
        (None, None) => Condition::all(),
    };
    Ok(cond)
}

pub(crate) fn sea_order(order: SortOrder) -> Order {
    match order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    }
}

/// Order rows by `plan` (primary key ascending when absent), appending the
/// primary key as a tiebreaker so page windows are stable.
pub fn apply_order<E: EntityTrait>(
    select: Select<E>,
    registry: &ColumnRegistry<E>,
    plan: Option<&OrderPlan>,
) -> Select<E> {
    let Some(plan) = plan else {
        return registry
            .keys()
            .iter()
            .fold(select, |s, key| s.order_by(col_expr::<E>(*key), Order::Asc));
    };
    let dir = sea_order(plan.order);
    let mut select = match registry.column(&plan.column) {
        Some(column) => select.order_by(col_expr::<E>(column), dir.clone()),
        None => select,
    };
    for key in registry.keys() {
        if key.as_str() != plan.column {
            select = select.order_by(col_expr::<E>(*key), dir.clone());
        }
    }
    select
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crudkit_query::FilterSpec;
    use sea_orm::{DbBackend, QueryFilter, QueryTrait};

    mod ent {
        use sea_orm::entity::prelude::*;

        #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "users")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub email: String,
            pub age: Option<i64>,
            pub status: Option<String>,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    fn sql(spec: &FilterSpec) -> String {
        let reg = ColumnRegistry::<ent::Entity>::of();
        let plan = spec.plan(reg.columns()).unwrap().unwrap();
        let cond = build_condition(&plan, |n| reg.operand(n)).unwrap();
        ent::Entity::find()
            .filter(cond)
            .build(DbBackend::Sqlite)
            .to_string()
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(like_escape("test"), "test");
        assert_eq!(like_escape("50%"), "50\\%");
        assert_eq!(like_escape("a_b"), "a\\_b");
        assert_eq!(like_escape("c\\d"), "c\\\\d");
        assert_eq!(like_contains("Ab"), "%ab%");
    }

    #[test]
    fn range_binds_both_bounds() {
        let s = sql(&FilterSpec::on("age").min("18").max(65));
        assert!(s.contains(r#""users"."age" >= 18"#), "{s}");
        assert!(s.contains(r#""users"."age" <= 65"#), "{s}");
        assert!(s.contains(" AND "), "{s}");
    }

    #[test]
    fn eq_and_neq() {
        let s = sql(&FilterSpec::on("email").eq("a@b.com"));
        assert!(s.contains(r#""users"."email" = 'a@b.com'"#), "{s}");
        let s = sql(&FilterSpec::on("email").neq("a@b.com"));
        assert!(s.contains(r#""users"."email" <> 'a@b.com'"#), "{s}");
    }

    #[test]
    fn like_is_case_insensitive_substring() {
        let s = sql(&FilterSpec::on("email").like("Foo_"));
        assert!(s.contains(r#"LOWER("users"."email") LIKE"#), "{s}");
        assert!(s.contains("%foo"), "{s}");
        assert!(!s.contains("Foo"), "{s}");
        assert!(s.contains("ESCAPE"), "{s}");
    }

    #[test]
    fn in_lists() {
        let s = sql(&FilterSpec::on("age").isin([1, 2]));
        assert!(s.contains(r#""users"."age" IN (1, 2)"#), "{s}");
        let s = sql(&FilterSpec::on("age").isnotin([3]));
        assert!(s.contains(r#""users"."age" NOT IN (3)"#), "{s}");
    }

    #[test]
    fn empty_in_lists_are_constant() {
        let s = sql(&FilterSpec::on("age").isin(Vec::<i32>::new()));
        assert!(s.contains("1=0"), "{s}");
        let s = sql(&FilterSpec::on("age").isnotin(Vec::<i32>::new()));
        assert!(s.contains("1=1"), "{s}");
    }

    #[test]
    fn nullable_true_widens_with_is_null() {
        let s = sql(&FilterSpec::on("status").eq("open").nullable(true));
        assert!(s.contains(r#""users"."status" = 'open'"#), "{s}");
        assert!(s.contains(" OR "), "{s}");
        assert!(s.contains(r#""users"."status" IS NULL"#), "{s}");
    }

    #[test]
    fn nullable_false_narrows_with_is_not_null() {
        let s = sql(&FilterSpec::on("status").eq("open").nullable(false));
        assert!(s.contains(" AND "), "{s}");
        assert!(s.contains(r#""users"."status" IS NOT NULL"#), "{s}");

        let s = sql(&FilterSpec::on("status").nullable(false));
        assert!(s.contains(r#"WHERE "users"."status" IS NOT NULL"#), "{s}");
    }

    #[test]
    fn default_order_is_primary_key_ascending() {
        let reg = ColumnRegistry::<ent::Entity>::of();
        let s = apply_order(ent::Entity::find(), &reg, None)
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(s.ends_with(r#"ORDER BY "users"."id" ASC"#), "{s}");
    }

    #[test]
    fn order_appends_primary_key_tiebreaker() {
        let reg = ColumnRegistry::<ent::Entity>::of();
        let plan = OrderPlan {
            column: "email".to_owned(),
            order: SortOrder::Desc,
        };
        let s = apply_order(ent::Entity::find(), &reg, Some(&plan))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(
            s.ends_with(r#"ORDER BY "users"."email" DESC, "users"."id" DESC"#),
            "{s}"
        );

        let by_id = OrderPlan {
            column: "id".to_owned(),
            order: SortOrder::Asc,
        };
        let s = apply_order(ent::Entity::find(), &reg, Some(&by_id))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(s.ends_with(r#"ORDER BY "users"."id" ASC"#), "{s}");
    }
}
