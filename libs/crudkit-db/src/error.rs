use crudkit_errors::{ErrDef, Problem};
use crudkit_query::ValidationError;
use http::StatusCode;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Failure of a `CrudBase` operation.
///
/// Nothing is retried; a failed operation never yields partial results.
#[derive(Debug, Error)]
pub enum CrudError {
    /// Rejected before any SQL was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unique or foreign-key constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Any other statement the database refused; first diagnostic line only.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// The database could not be reached or no connection was available.
    #[error("database unavailable: {0}")]
    Unavailable(String),
}

pub(crate) fn first_line(err: &impl std::fmt::Display) -> String {
    let text = err.to_string();
    text.lines().next().unwrap_or_default().trim().to_owned()
}

impl From<DbErr> for CrudError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => {
                return CrudError::Conflict(first_line(&msg));
            }
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => {
                return CrudError::Conflict(first_line(&msg));
            }
            _ => {}
        }
        match err {
            DbErr::RecordNotFound(what) => CrudError::NotFound(what),
            DbErr::RecordNotUpdated => CrudError::NotFound("record".to_owned()),
            DbErr::ConnectionAcquire(e) => CrudError::Unavailable(first_line(&e)),
            DbErr::Conn(e) => CrudError::Unavailable(first_line(&e)),
            other => CrudError::QueryRejected(first_line(&other)),
        }
    }
}

pub const CONFLICT: ErrDef = ErrDef {
    status: StatusCode::CONFLICT,
    title: "Conflict",
    code: "crudkit.db.conflict.v1",
};

pub const NOT_FOUND: ErrDef = ErrDef {
    status: StatusCode::NOT_FOUND,
    title: "Not Found",
    code: "crudkit.db.not_found.v1",
};

pub const QUERY_REJECTED: ErrDef = ErrDef {
    status: StatusCode::NOT_ACCEPTABLE,
    title: "Query Rejected",
    code: "crudkit.db.query_rejected.v1",
};

pub const UNAVAILABLE: ErrDef = ErrDef {
    status: StatusCode::SERVICE_UNAVAILABLE,
    title: "Service Unavailable",
    code: "crudkit.db.unavailable.v1",
};

impl From<CrudError> for Problem {
    fn from(err: CrudError) -> Self {
        match err {
            CrudError::Validation(v) => Problem::from(v),
            CrudError::Conflict(_) => CONFLICT.as_problem(err.to_string()),
            CrudError::NotFound(_) => NOT_FOUND.as_problem(err.to_string()),
            CrudError::QueryRejected(_) => QUERY_REJECTED.as_problem(err.to_string()),
            CrudError::Unavailable(_) => UNAVAILABLE.as_problem(err.to_string()),
        }
    }
}
