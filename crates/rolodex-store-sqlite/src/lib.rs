//! SQLite backend for the Rolodex contact store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! connection thread without blocking the async runtime. Provides the
//! versioned schema, scoped transactions and per-table observers.

mod encode;
mod observe;
mod store;
mod transaction;

pub mod error;
pub mod schema;

pub use encode::StoredRecord;
pub use error::{Error, Result};
pub use observe::Observer;
pub use store::SqliteStore;
pub use transaction::Transaction;

#[cfg(test)]
mod tests;
