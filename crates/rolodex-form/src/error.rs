//! Error types for the rolodex-form resolver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Validated values did not decode into the requested domain type.
  #[error("decode error: {0}")]
  Decode(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
