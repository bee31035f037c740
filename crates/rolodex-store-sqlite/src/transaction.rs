//! Scoped read/write transactions.

use std::collections::BTreeSet;

use rolodex_core::{
  contact::{Contact, NewContact, NewEmail, NewPhone},
  table::Table,
};
use rusqlite::{Connection, TransactionBehavior};

use crate::{
  Error, Result,
  encode::{self, StoredRecord},
  store::Shared,
};

/// Handle passed to a [`run_transaction`](crate::SqliteStore::run_transaction)
/// body.
///
/// Only the tables named when the transaction was started can be read or
/// written; touching any other table fails with [`Error::TableNotInScope`].
/// Writes become visible to other readers only when the body returns `Ok`.
pub struct Transaction<'c> {
  tx:     rusqlite::Transaction<'c>,
  shared: &'c Shared,
  scope:  BTreeSet<Table>,
  dirty:  BTreeSet<Table>,
}

impl Transaction<'_> {
  fn ensure(&self, table: Table) -> Result<()> {
    if self.scope.contains(&table) {
      Ok(())
    } else {
      Err(Error::TableNotInScope(table))
    }
  }

  fn insert(&mut self, table: Table, cols: Vec<(&'static str, rusqlite::types::Value)>) -> Result<i64> {
    self.ensure(table)?;
    let id = encode::insert(&self.tx, &self.shared.layout, table, cols)?;
    self.dirty.insert(table);
    Ok(id)
  }

  /// Insert a contact and return its new id.
  pub fn add_contact(&mut self, input: NewContact) -> Result<i64> {
    self.ensure(Table::Contacts)?;
    input.check()?;
    self.insert(Table::Contacts, encode::contact_columns(input))
  }

  /// Insert an email row. `contact_id` is not checked against `contacts`.
  pub fn add_email(&mut self, input: NewEmail) -> Result<i64> {
    self.insert(Table::Emails, encode::email_columns(input))
  }

  /// Insert a phone row. `contact_id` is not checked against `contacts`.
  pub fn add_phone(&mut self, input: NewPhone) -> Result<i64> {
    self.insert(Table::Phones, encode::phone_columns(input))
  }

  /// Delete a contact row. Its emails and phones are left untouched.
  pub fn delete_contact(&mut self, id: i64) -> Result<bool> {
    self.ensure(Table::Contacts)?;
    let n = self.tx.execute("DELETE FROM contacts WHERE id = ?1", [id])?;
    if n > 0 {
      self.dirty.insert(Table::Contacts);
    }
    Ok(n > 0)
  }

  /// Delete every row of `table`. Ids already handed out stay retired.
  pub fn clear(&mut self, table: Table) -> Result<usize> {
    self.ensure(table)?;
    self.shared.layout.columns(table)?;
    let n = self.tx.execute(&format!("DELETE FROM {table}"), [])?;
    if n > 0 {
      self.dirty.insert(table);
    }
    Ok(n)
  }

  pub fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
    self.ensure(Table::Contacts)?;
    let mut rows = encode::read_where::<Contact>(&self.tx, &self.shared.layout, "id", id)?;
    Ok(rows.pop())
  }

  /// Current rows of `R`'s table, including this transaction's own writes.
  pub fn query_all<R: StoredRecord>(&self) -> Result<Vec<R>> {
    self.ensure(R::TABLE)?;
    encode::read_all(&self.tx, &self.shared.layout)
  }
}

/// Run `body` inside an IMMEDIATE transaction on `conn`, then commit and
/// notify observers, or roll back.
pub(crate) fn run<R, F>(conn: &mut Connection, shared: &Shared, scope: &[Table], body: F) -> Result<R>
where
  F: FnOnce(&mut Transaction<'_>) -> Result<R>,
{
  let (out, dirty) = {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut handle = Transaction {
      tx,
      shared,
      scope: scope.iter().copied().collect(),
      dirty: BTreeSet::new(),
    };

    match body(&mut handle) {
      Ok(out) => {
        let Transaction { tx, dirty, .. } = handle;
        tx.commit()?;
        (out, dirty)
      }
      Err(e) => {
        // Dropping the rusqlite transaction rolls it back.
        drop(handle);
        tracing::warn!(?scope, error = %e, "transaction rolled back");
        return Err(e);
      }
    }
  };

  if dirty.is_empty() {
    return Ok(out);
  }

  let seq = shared.next_seq();
  tracing::debug!(?dirty, seq, "transaction committed");

  for table in dirty {
    if shared.observers.is_watched(table)
      && let Err(e) = shared.observers.refresh(conn, &shared.layout, table, seq)
    {
      // The commit stands; observers catch up on the next one.
      tracing::warn!(%table, error = %e, "failed to refresh observers");
    }
  }

  Ok(out)
}
