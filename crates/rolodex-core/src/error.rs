//! Error types for `rolodex-core`.

use thiserror::Error;

use crate::table::Table;

#[derive(Debug, Error)]
pub enum Error {
  /// A required field was empty when a row reached the storage layer.
  #[error("constraint violated: {table}.{field} must not be empty")]
  Constraint { table: Table, field: &'static str },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
