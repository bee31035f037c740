//! Table identities and point-in-time snapshots of table contents.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ─── Table ───────────────────────────────────────────────────────────────────

/// One of the persisted tables. The string form is the on-disk table name.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Table {
  Contacts,
  Emails,
  Phones,
}

/// A row type that lives in exactly one [`Table`].
pub trait Record: Clone + Send + Sync + 'static {
  const TABLE: Table;

  /// The store-assigned row id.
  fn id(&self) -> i64;
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// The full contents of one table as of a single commit.
///
/// Cloning is cheap; rows are shared. Iteration can be restarted any number of
/// times and always yields the same rows.
#[derive(Debug)]
pub struct Snapshot<R> {
  seq:  u64,
  rows: Arc<[R]>,
}

impl<R> Clone for Snapshot<R> {
  fn clone(&self) -> Self {
    Self { seq: self.seq, rows: Arc::clone(&self.rows) }
  }
}

impl<R> Snapshot<R> {
  pub fn new(seq: u64, rows: Vec<R>) -> Self {
    Self { seq, rows: rows.into() }
  }

  /// An empty snapshot that precedes every commit.
  pub fn empty() -> Self {
    Self { seq: 0, rows: Arc::from(Vec::new()) }
  }

  /// Commit sequence number this snapshot reflects. Higher is newer.
  pub fn seq(&self) -> u64 { self.seq }

  pub fn iter(&self) -> std::slice::Iter<'_, R> { self.rows.iter() }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn as_slice(&self) -> &[R] { &self.rows }

  pub fn to_vec(&self) -> Vec<R>
  where
    R: Clone,
  {
    self.rows.to_vec()
  }
}

impl<'a, R> IntoIterator for &'a Snapshot<R> {
  type Item = &'a R;
  type IntoIter = std::slice::Iter<'a, R>;

  fn into_iter(self) -> Self::IntoIter { self.rows.iter() }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn table_names_are_lowercase() {
    let names: Vec<String> = Table::iter().map(|t| t.to_string()).collect();
    assert_eq!(names, ["contacts", "emails", "phones"]);
    assert_eq!(Table::from_str("phones").unwrap(), Table::Phones);
    assert!(Table::from_str("addresses").is_err());
  }

  #[test]
  fn snapshot_iteration_is_restartable() {
    let snap = Snapshot::new(3, vec![1, 2, 3]);
    let first: Vec<_> = snap.iter().copied().collect();
    let second: Vec<_> = (&snap).into_iter().copied().collect();
    assert_eq!(first, second);
    assert_eq!(snap.seq(), 3);

    let shared = snap.clone();
    assert_eq!(shared.as_slice(), snap.as_slice());
  }
}
