//! Error type for `rolodex-store-sqlite`.

use rolodex_core::table::Table;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] rolodex_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  /// The database was written by a newer schema than this build declares.
  #[error("stored schema version {stored} is newer than declared version {declared}")]
  UnsupportedSchemaVersion { stored: u32, declared: u32 },

  #[error("invalid schema declaration: {0}")]
  InvalidSchema(String),

  #[error("table {0} is not declared in the schema")]
  UndeclaredTable(Table),

  #[error("column {table}.{column} is not declared in the schema")]
  UndeclaredColumn { table: Table, column: &'static str },

  /// A transaction body touched a table it did not name up front.
  #[error("table {0} is not part of this transaction")]
  TableNotInScope(Table),

  /// The transaction body gave up; everything it wrote was rolled back.
  #[error("transaction aborted: {0}")]
  Aborted(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Abort the enclosing transaction with `reason`.
  pub fn aborted(reason: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    Error::Aborted(reason.into())
  }

  /// Open/upgrade failures. A store that failed with one of these was never
  /// handed out.
  pub fn is_schema_error(&self) -> bool {
    matches!(
      self,
      Error::UnsupportedSchemaVersion { .. } | Error::InvalidSchema(_)
    )
  }

  /// A required field was empty.
  pub fn is_constraint_error(&self) -> bool {
    matches!(self, Error::Core(rolodex_core::Error::Constraint { .. }))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
