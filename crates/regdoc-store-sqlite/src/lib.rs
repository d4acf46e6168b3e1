//! SQLite backend for the regdoc document register.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Reference-code uniqueness among active
//! documents is enforced by a partial unique index, so the write-time check
//! cannot race with another writer.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
