#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! sea-orm engine for the crudkit query contracts.
//!
//! [`CrudBase`] turns validated [`crudkit_query`] requests into statements
//! for any entity:
//!
//! - [`registry`]: per-entity column metadata, built once
//! - [`predicate`]: filter plans to `WHERE`/`HAVING` conditions and ordering
//! - [`aggregate`]: grouped selections
//! - [`pager`]: page windows and totals
//!
//! Connections come from [`config::connect`]; every operation borrows the
//! caller's connection or transaction.

pub mod aggregate;
pub mod config;
pub mod crud;
pub mod error;
pub mod pager;
pub mod predicate;
pub mod registry;
pub mod unit_of_work;

pub use config::{ConfigError, CrudConfig, DatabaseConfig, connect};
pub use crud::{CrudBase, Timestamps};
pub use error::CrudError;
pub use registry::ColumnRegistry;
pub use unit_of_work::in_transaction;

pub use crudkit_query::{FilterSpec, GroupSpec, Page, PageParams, SortOrder};
