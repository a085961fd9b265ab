//! Per-entity column registry.
//!
//! Built once from the sea-orm column definitions; every caller-supplied
//! column name is resolved through it before any SQL is assembled.

use std::collections::HashMap;

use crudkit_query::{ColumnDescriptor, ColumnKind, ColumnSet, Scalar, ValidationError};
use sea_orm::prelude::{Decimal, Uuid};
use sea_orm::sea_query::{ColumnType, Expr, SimpleExpr};
use sea_orm::{
    ColumnTrait, EntityName, EntityTrait, IdenStatic, Iterable, PrimaryKeyToColumn, Value,
};

use crate::predicate::Operand;

#[derive(Clone, Debug)]
struct Registered<C> {
    column: C,
    column_type: ColumnType,
}

/// Name → column map of one entity, plus its primary key.
#[derive(Clone, Debug)]
pub struct ColumnRegistry<E: EntityTrait> {
    entity: String,
    columns: HashMap<String, Registered<E::Column>>,
    set: ColumnSet,
    keys: Vec<E::Column>,
}

impl<E: EntityTrait> ColumnRegistry<E> {
    #[must_use]
    pub fn of() -> Self {
        let mut columns = HashMap::new();
        let mut set = ColumnSet::new();
        for column in E::Column::iter() {
            let def = column.def();
            let column_type = def.get_column_type().clone();
            let name = column.as_str().to_owned();
            set.insert(ColumnDescriptor::new(
                name.clone(),
                kind_of(&column_type),
                def.is_null(),
            ));
            columns.insert(
                name,
                Registered {
                    column,
                    column_type,
                },
            );
        }
        let keys = E::PrimaryKey::iter().map(PrimaryKeyToColumn::into_column).collect();
        Self {
            entity: EntityName::table_name(&E::default()).to_owned(),
            columns,
            set,
            keys,
        }
    }

    /// Table name, for logs.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.set
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<E::Column> {
        self.columns.get(name).map(|r| r.column)
    }

    #[must_use]
    pub fn column_type(&self, name: &str) -> Option<&ColumnType> {
        self.columns.get(name).map(|r| &r.column_type)
    }

    /// Primary key columns, in declaration order.
    #[must_use]
    pub fn keys(&self) -> &[E::Column] {
        &self.keys
    }

    #[must_use]
    pub fn is_key(&self, name: &str) -> bool {
        self.keys.iter().any(|k| k.as_str() == name)
    }

    /// Qualified column expression for predicates on rows.
    #[must_use]
    pub fn operand(&self, name: &str) -> Option<Operand> {
        self.columns.get(name).map(|r| Operand {
            expr: col_expr::<E>(r.column),
            column_type: Some(r.column_type.clone()),
        })
    }
}

pub(crate) fn col_expr<E: EntityTrait>(column: E::Column) -> SimpleExpr {
    Expr::col((E::default(), column)).into()
}

/// Logical kind of a database column type.
#[must_use]
pub fn kind_of(column_type: &ColumnType) -> ColumnKind {
    match column_type {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned
        | ColumnType::Float
        | ColumnType::Double
        | ColumnType::Decimal(_)
        | ColumnType::Money(_) => ColumnKind::Number,
        ColumnType::Boolean => ColumnKind::Boolean,
        ColumnType::Date
        | ColumnType::Time
        | ColumnType::DateTime
        | ColumnType::Timestamp
        | ColumnType::TimestampWithTimeZone => ColumnKind::Timestamp,
        _ => ColumnKind::Text,
    }
}

/// Largest magnitude below which every integer is an exact `f64`.
const F64_EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Exact integer value of `n`, if it has one.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn integral(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() <= F64_EXACT_LIMIT).then(|| n as i64)
}

fn is_integer(column_type: &ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::TinyUnsigned
            | ColumnType::SmallUnsigned
            | ColumnType::Unsigned
            | ColumnType::BigUnsigned
    )
}

/// Bind an operand already coerced to `descriptor.kind`.
///
/// `column_type` is `None` for computed columns (row counts, averages),
/// which are bound by the shape of the value alone.
///
/// # Errors
/// Returns `ValidationError::InvalidValue` if the operand does not fit the
/// column's storage type (a fractional number for an integer column, a
/// malformed UUID).
#[allow(clippy::cast_precision_loss)]
pub fn bind_value(
    column_type: Option<&ColumnType>,
    descriptor: &ColumnDescriptor,
    value: &Scalar,
) -> Result<Value, ValidationError> {
    let invalid = || ValidationError::InvalidValue {
        column: descriptor.name.clone(),
        expected: descriptor.kind,
        value: value.to_string(),
    };
    let bound = match value {
        Scalar::Int(n) => match column_type {
            Some(ColumnType::Float | ColumnType::Double) => Value::from(*n as f64),
            Some(ColumnType::Decimal(_) | ColumnType::Money(_)) => {
                Value::from(Decimal::from(*n))
            }
            _ => Value::from(*n),
        },
        Scalar::Number(n) => match column_type {
            Some(ColumnType::Float | ColumnType::Double) => Value::from(*n),
            Some(ColumnType::Decimal(_) | ColumnType::Money(_)) => {
                Decimal::from_f64_retain(*n).map_or_else(|| Value::from(*n), Value::from)
            }
            Some(ct) if is_integer(ct) => Value::from(integral(*n).ok_or_else(invalid)?),
            _ => integral(*n).map_or_else(|| Value::from(*n), Value::from),
        },
        Scalar::Bool(b) => Value::from(*b),
        Scalar::Timestamp(t) => match column_type {
            Some(ColumnType::DateTime | ColumnType::Timestamp) => Value::from(t.naive_utc()),
            Some(ColumnType::Date) => Value::from(t.date_naive()),
            Some(ColumnType::Time) => Value::from(t.time()),
            _ => Value::from(*t),
        },
        Scalar::Text(s) => match column_type {
            Some(ColumnType::Uuid) => {
                Value::from(Uuid::parse_str(s.trim()).map_err(|_| invalid())?)
            }
            _ => Value::from(s.clone()),
        },
    };
    Ok(bound)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use sea_orm::sea_query::StringLen;

    mod ent {
        use sea_orm::entity::prelude::*;

        #[derive(Debug, Clone, PartialEq, DeriveEntityModel)]
        #[sea_orm(table_name = "things")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub label: String,
            pub weight: Option<f64>,
            pub enabled: bool,
            pub seen_at: DateTimeUtc,
            pub token: Uuid,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    #[test]
    fn registry_lists_every_column() {
        let reg = ColumnRegistry::<ent::Entity>::of();
        assert_eq!(reg.entity(), "things");
        assert_eq!(
            reg.columns().names(),
            vec!["enabled", "id", "label", "seen_at", "token", "weight"]
        );
        assert_eq!(reg.keys().len(), 1);
        assert_eq!(reg.keys()[0].as_str(), "id");
        assert!(reg.is_key("id"));
        assert!(!reg.is_key("label"));
    }

    #[test]
    fn registry_derives_kinds_and_nullability() {
        let reg = ColumnRegistry::<ent::Entity>::of();
        let cols = reg.columns();
        assert_eq!(cols.get("id").unwrap().kind, ColumnKind::Number);
        assert_eq!(cols.get("label").unwrap().kind, ColumnKind::Text);
        assert_eq!(cols.get("weight").unwrap().kind, ColumnKind::Number);
        assert!(cols.get("weight").unwrap().nullable);
        assert!(!cols.get("label").unwrap().nullable);
        assert_eq!(cols.get("enabled").unwrap().kind, ColumnKind::Boolean);
        assert_eq!(cols.get("seen_at").unwrap().kind, ColumnKind::Timestamp);
        assert_eq!(cols.get("token").unwrap().kind, ColumnKind::Text);
    }

    #[test]
    fn kind_mapping_falls_back_to_text() {
        assert_eq!(kind_of(&ColumnType::Json), ColumnKind::Text);
        assert_eq!(kind_of(&ColumnType::String(StringLen::None)), ColumnKind::Text);
        assert_eq!(kind_of(&ColumnType::Decimal(None)), ColumnKind::Number);
    }

    #[test]
    fn integer_columns_bind_integers() {
        let d = ColumnDescriptor::new("id", ColumnKind::Number, false);
        let v = bind_value(Some(&ColumnType::BigInteger), &d, &Scalar::Number(18.0)).unwrap();
        assert_eq!(v, Value::BigInt(Some(18)));
        let v = bind_value(Some(&ColumnType::BigInteger), &d, &Scalar::Int(18)).unwrap();
        assert_eq!(v, Value::BigInt(Some(18)));
    }

    #[test]
    fn large_ids_bind_every_digit() {
        let d = ColumnDescriptor::new("id", ColumnKind::Number, false);
        let parsed = Scalar::from("9007199254740993")
            .coerce(ColumnKind::Number)
            .unwrap();
        let v = bind_value(Some(&ColumnType::BigInteger), &d, &parsed).unwrap();
        assert_eq!(v, Value::BigInt(Some(9_007_199_254_740_993)));
    }

    #[test]
    fn integer_columns_reject_fractions_and_inexact_floats() {
        let d = ColumnDescriptor::new("id", ColumnKind::Number, false);
        for n in [18.5, 1e17] {
            let err =
                bind_value(Some(&ColumnType::BigInteger), &d, &Scalar::Number(n)).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidValue { .. }), "{n}");
        }
        // computed columns take whatever shape the value has
        let avg = ColumnDescriptor::new("age", ColumnKind::Number, true);
        let v = bind_value(None, &avg, &Scalar::Number(18.5)).unwrap();
        assert_eq!(v, Value::Double(Some(18.5)));
    }

    #[test]
    fn float_and_decimal_columns_accept_integers() {
        let d = ColumnDescriptor::new("weight", ColumnKind::Number, true);
        let v = bind_value(Some(&ColumnType::Double), &d, &Scalar::Int(3)).unwrap();
        assert_eq!(v, Value::Double(Some(3.0)));
        let v = bind_value(Some(&ColumnType::Decimal(None)), &d, &Scalar::Int(3)).unwrap();
        assert_eq!(v, Value::from(Decimal::from(3)));
    }

    #[test]
    fn uuid_columns_reject_malformed_text() {
        let d = ColumnDescriptor::new("token", ColumnKind::Text, false);
        let err = bind_value(Some(&ColumnType::Uuid), &d, &Scalar::from("nope")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }
}
