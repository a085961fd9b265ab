#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

use anyhow::Result;
use crudkit_db::{CrudBase, DatabaseConfig, connect};
use sea_orm::{ActiveValue::Set, ConnectionTrait, DatabaseConnection};

pub mod user {
    use chrono::{DateTime, Utc};
    use crudkit_db::Timestamps;
    use sea_orm::ActiveValue::{NotSet, Set};
    use sea_orm::IntoActiveModel;
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        #[sea_orm(unique)]
        pub email: String,
        pub age: Option<i64>,
        pub role_id: i64,
        pub status: Option<String>,
        pub is_active: bool,
        pub created_at: DateTimeUtc,
        pub updated_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Timestamps for ActiveModel {
        fn stamp_created(&mut self, now: DateTime<Utc>) {
            self.created_at = Set(now);
        }

        fn stamp_updated(&mut self, now: DateTime<Utc>) {
            self.updated_at = Set(now);
        }
    }

    /// Partial update; `None` leaves the column untouched.
    #[derive(Debug, Default)]
    pub struct UserPatch {
        pub email: Option<String>,
        pub age: Option<Option<i64>>,
        pub status: Option<Option<String>>,
    }

    impl IntoActiveModel<ActiveModel> for UserPatch {
        fn into_active_model(self) -> ActiveModel {
            ActiveModel {
                email: self.email.map_or(NotSet, Set),
                age: self.age.map_or(NotSet, Set),
                status: self.status.map_or(NotSet, Set),
                ..Default::default()
            }
        }
    }
}

pub type Users = CrudBase<user::Entity>;

/// email, age, `role_id`, status, `is_active`
pub type Row = (&'static str, Option<i64>, i64, Option<&'static str>, bool);

/// Six users over three roles; ids are assigned 1..=6 in this order.
pub const USERS: &[Row] = &[
    ("ann@example.com", Some(31), 1, Some("active"), true),
    ("bob@example.com", Some(25), 2, None, true),
    ("cat@example.com", None, 1, Some("blocked"), false),
    ("dan@example.com", Some(42), 3, Some("active"), true),
    ("eve@example.com", Some(25), 2, Some("active"), false),
    ("FAY@Corp.example", Some(19), 1, Some("pending"), true),
];

pub async fn setup() -> Result<DatabaseConnection> {
    // one connection: every pooled connection would get its own in-memory db
    let cfg = DatabaseConfig {
        max_conns: Some(1),
        ..DatabaseConfig::default()
    };
    let db = connect(&cfg).await?;
    db.execute_unprepared(
        "CREATE TABLE users (
id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
email TEXT NOT NULL UNIQUE,
age INTEGER NULL,
role_id INTEGER NOT NULL,
status TEXT NULL,
is_active BOOLEAN NOT NULL,
created_at TEXT NOT NULL,
updated_at TEXT NOT NULL
)",
    )
    .await?;
    Ok(db)
}

pub fn new_user(row: &Row) -> user::ActiveModel {
    let (email, age, role_id, status, is_active) = *row;
    user::ActiveModel {
        email: Set(email.to_owned()),
        age: Set(age),
        role_id: Set(role_id),
        status: Set(status.map(str::to_owned)),
        is_active: Set(is_active),
        ..Default::default()
    }
}

pub async fn seeded() -> Result<(DatabaseConnection, Users)> {
    let db = setup().await?;
    let users = Users::new();
    for row in USERS {
        users.create(&db, new_user(row)).await?;
    }
    Ok((db, users))
}

pub fn ids(rows: &[user::Model]) -> Vec<i64> {
    rows.iter().map(|m| m.id).collect()
}
