//! # Archivist Common Library
//!
//! Shared code for the archivist ingest and reconcile tools:
//! - Error type
//! - Configuration resolution (CLI → ENV → TOML → default)
//! - Tracing setup
//! - SQLite pool, schema, migrations, monitored transactions, lock retry
//! - Timestamp formatting

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
