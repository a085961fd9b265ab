//! Core error envelope types for crudkit
//!
//! This crate provides pure data types for error reporting, with no dependencies
//! on HTTP frameworks. It includes:
//! - The `{detail}` error envelope paired with an HTTP status (`Problem`)
//! - Static error catalog entries (`ErrDef`)
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod catalog;
pub mod problem;

pub use catalog::ErrDef;
pub use problem::{ErrorBody, Problem};
