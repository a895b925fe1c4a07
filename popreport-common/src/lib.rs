//! # Pop Report Common Library
//!
//! Shared code for the population report workspace:
//! - Canonical record model and row mapping
//! - Database initialization (SQLite via sqlx)
//! - Configuration resolution
//! - Common error type

pub mod config;
pub mod db;
pub mod error;

pub use db::models::CanonicalRecord;
pub use error::{Error, MalformedRecord, RejectionReason, Result};
