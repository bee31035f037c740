//! Per-table observer registry.
//!
//! Each table has one [`watch`] channel holding its latest published
//! [`Snapshot`]. Publishing happens on the connection thread, right after a
//! commit or while registering a new observer, and only ever replaces a
//! snapshot with one carrying a higher commit sequence number. Observers
//! therefore see table states in commit order and never go backwards.

use rolodex_core::{
  contact::{Contact, Email, Phone},
  table::{Snapshot, Table},
};
use rusqlite::Connection;
use tokio::sync::watch;

use crate::{
  Result,
  encode::{StoredRecord, read_all},
  schema::Layout,
};

pub struct Observers {
  pub(crate) contacts: watch::Sender<Snapshot<Contact>>,
  pub(crate) emails:   watch::Sender<Snapshot<Email>>,
  pub(crate) phones:   watch::Sender<Snapshot<Phone>>,
}

impl Default for Observers {
  fn default() -> Self {
    Self {
      contacts: watch::channel(Snapshot::empty()).0,
      emails:   watch::channel(Snapshot::empty()).0,
      phones:   watch::channel(Snapshot::empty()).0,
    }
  }
}

impl Observers {
  pub fn new() -> Self { Self::default() }

  pub fn is_watched(&self, table: Table) -> bool {
    match table {
      Table::Contacts => self.contacts.receiver_count() > 0,
      Table::Emails => self.emails.receiver_count() > 0,
      Table::Phones => self.phones.receiver_count() > 0,
    }
  }

  /// Re-read `table` and publish it as of commit `seq`.
  pub fn refresh(&self, conn: &Connection, layout: &Layout, table: Table, seq: u64) -> Result<()> {
    match table {
      Table::Contacts => self.refresh_rows::<Contact>(conn, layout, seq),
      Table::Emails => self.refresh_rows::<Email>(conn, layout, seq),
      Table::Phones => self.refresh_rows::<Phone>(conn, layout, seq),
    }
  }

  fn refresh_rows<R: StoredRecord>(&self, conn: &Connection, layout: &Layout, seq: u64) -> Result<()> {
    let rows = read_all::<R>(conn, layout)?;
    self.publish(Snapshot::new(seq, rows));
    Ok(())
  }

  /// Replace the current snapshot if `snapshot` is newer. Returns whether
  /// observers were notified.
  pub fn publish<R: StoredRecord>(&self, snapshot: Snapshot<R>) -> bool {
    let seq = snapshot.seq();
    let sent = R::channel(self).send_if_modified(|current| {
      if snapshot.seq() > current.seq() {
        *current = snapshot;
        true
      } else {
        false
      }
    });
    if sent {
      tracing::debug!(table = %R::TABLE, seq, "delivered snapshot to observers");
    }
    sent
  }

  /// Publish `snapshot` if newer, then register a receiver whose current
  /// value is already marked as seen.
  pub fn subscribe<R: StoredRecord>(&self, snapshot: Snapshot<R>) -> watch::Receiver<Snapshot<R>> {
    self.publish(snapshot);
    R::channel(self).subscribe()
  }
}

// ─── Observer ────────────────────────────────────────────────────────────────

/// A live subscription to one table.
///
/// Obtained from [`SqliteStore::observe`](crate::SqliteStore::observe).
/// Dropping it unsubscribes.
pub struct Observer<R> {
  rx: watch::Receiver<Snapshot<R>>,
}

impl<R: StoredRecord> Observer<R> {
  pub(crate) fn new(rx: watch::Receiver<Snapshot<R>>) -> Self { Self { rx } }

  /// The most recently delivered snapshot.
  pub fn current(&self) -> Snapshot<R> { self.rx.borrow().clone() }

  /// Wait for the next committed change to the table.
  ///
  /// Several commits in quick succession may be coalesced into one delivery
  /// of the newest state. Returns `None` once the store has been dropped.
  pub async fn changed(&mut self) -> Option<Snapshot<R>> {
    self.rx.changed().await.ok()?;
    Some(self.rx.borrow_and_update().clone())
  }
}
