//! Domain types shared by the Rolodex crates: the three tables, their row
//! types, point-in-time snapshots and the [`store::ContactStore`] trait.
//!
//! No I/O lives here. The SQLite backend and the form layer both build on
//! these types.

pub mod contact;
pub mod error;
pub mod store;
pub mod table;

pub use error::{Error, Result};
