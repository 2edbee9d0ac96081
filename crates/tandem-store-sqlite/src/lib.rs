//! SQLite backend for the Tandem partnership store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every composed operation runs
//! inside a single `IMMEDIATE` transaction; the mirrored partnership rows
//! are only ever written through that one path.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{Clock, SqliteStore};

#[cfg(test)]
mod tests;
