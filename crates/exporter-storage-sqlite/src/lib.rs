//! SQLite storage for the chain exporter
//!
//! Two files: the refined relational store ([`Database`]) and the raw staging
//! store ([`RawDatabase`]). Both run in WAL mode, carry versioned migrations
//! and retry on SQLITE_BUSY. Every write is idempotent so an interrupted
//! height can be committed again.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod accounts;
mod blocks;
pub mod busy;
pub mod database;
pub mod error;
mod fees;
mod governance;
pub mod migrations;
pub mod raw_database;
mod sql;
mod store;
mod uptime;
mod validators;

pub use busy::{with_busy_retry, BASE_BACKOFF_MS, MAX_BACKOFF_MS, MAX_BUSY_RETRIES};
pub use database::Database;
pub use error::{Error, Result};
pub use raw_database::RawDatabase;
