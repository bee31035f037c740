//! SQLite implementation of [`ContactStore`]: [`SqliteStore`].

use std::{
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
  time::Duration,
};

use rolodex_core::{
  contact::{Contact, Email, NewContact, NewEmail, NewPhone, Phone},
  store::ContactStore,
  table::{Snapshot, Table},
};

use crate::{
  Result,
  encode::{self, StoredRecord},
  observe::{Observer, Observers},
  schema::{self, Layout, SCHEMA_VERSIONS, SchemaVersion},
  transaction::{self, Transaction},
};

// ─── Shared state ────────────────────────────────────────────────────────────

/// State shared by every clone of a store and by work running on its
/// connection thread.
pub struct Shared {
  pub(crate) layout:    Layout,
  pub(crate) observers: Observers,
  /// Commit sequence. Only advanced on the connection thread, so its order
  /// matches commit order.
  seq:                  AtomicU64,
}

impl Shared {
  fn new(layout: Layout) -> Self {
    Self { layout, observers: Observers::new(), seq: AtomicU64::new(1) }
  }

  pub(crate) fn current_seq(&self) -> u64 { self.seq.load(Ordering::Acquire) }

  pub(crate) fn next_seq(&self) -> u64 { self.seq.fetch_add(1, Ordering::AcqRel) + 1 }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Rolodex contact store backed by a single SQLite file.
///
/// Open it once per process and hand clones to whoever needs it. Cloning is
/// cheap; the inner connection is reference-counted. All access runs on one
/// connection thread, which serializes transactions.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  shared: Arc<Shared>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and upgrade it to the built-in schema.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with_schema(path, SCHEMA_VERSIONS).await
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with_schema(SCHEMA_VERSIONS).await
  }

  /// Open (or create) a store at `path` with an explicit ordered list of
  /// schema versions.
  ///
  /// Fails if the declaration is not additive, or if the file was written by
  /// a newer version than the last one declared.
  pub async fn open_with_schema(
    path: impl AsRef<Path>,
    versions: &'static [SchemaVersion],
  ) -> Result<Self> {
    schema::check_declaration(versions)?;
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::bootstrap(conn, versions).await
  }

  pub async fn open_in_memory_with_schema(versions: &'static [SchemaVersion]) -> Result<Self> {
    schema::check_declaration(versions)?;
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::bootstrap(conn, versions).await
  }

  async fn bootstrap(
    conn: tokio_rusqlite::Connection,
    versions: &'static [SchemaVersion],
  ) -> Result<Self> {
    let stored = match conn.call(move |conn| Ok(prepare(conn, versions))).await {
      Ok(Ok(stored)) => stored,
      Ok(Err(e)) => {
        tracing::error!(error = %e, "failed to open store");
        return Err(e);
      }
      Err(e) => return Err(e.into()),
    };

    let latest = versions.last().map(Layout::of).ok_or_else(|| {
      crate::Error::InvalidSchema("no schema versions declared".into())
    })?;

    tracing::info!(from = stored, to = latest.version(), "store opened");

    Ok(Self { conn, shared: Arc::new(Shared::new(latest)) })
  }

  /// Close the underlying connection. Other clones of this store fail every
  /// subsequent call.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    tracing::info!("store closed");
    Ok(())
  }

  /// The schema version the store was upgraded to.
  pub fn schema_version(&self) -> u32 { self.shared.layout.version() }

  /// Run `body` with exclusive access to exactly `tables`.
  ///
  /// Everything `body` writes becomes visible together when it returns `Ok`.
  /// If it returns `Err`, including [`Error::aborted`](crate::Error::aborted)
  /// or an access outside `tables`, every write is rolled back and the error
  /// is returned once the rollback is complete.
  pub async fn run_transaction<R, F>(&self, tables: &[Table], body: F) -> Result<R>
  where
    F: FnOnce(&mut Transaction<'_>) -> Result<R> + Send + 'static,
    R: Send + 'static,
  {
    let scope = tables.to_vec();
    let shared = Arc::clone(&self.shared);
    self
      .conn
      .call(move |conn| Ok(transaction::run(conn, &shared, &scope, body)))
      .await?
  }

  /// The full contents of `R`'s table as of the latest commit.
  pub async fn query_all<R: StoredRecord>(&self) -> Result<Snapshot<R>> {
    let shared = Arc::clone(&self.shared);
    self
      .conn
      .call(move |conn| {
        Ok(
          encode::read_all::<R>(conn, &shared.layout)
            .map(|rows| Snapshot::new(shared.current_seq(), rows)),
        )
      })
      .await?
  }

  /// Subscribe to `R`'s table.
  ///
  /// The returned observer already holds a snapshot at least as new as the
  /// latest commit, and receives a fresh one after every later commit that
  /// writes the table. Deliveries are latest-state: commits that land before
  /// the observer catches up are merged into one snapshot of the newest
  /// state, and snapshots never go backwards.
  pub async fn observe<R: StoredRecord>(&self) -> Result<Observer<R>> {
    let shared = Arc::clone(&self.shared);
    let rx = self
      .conn
      .call(move |conn| {
        Ok(encode::read_all::<R>(conn, &shared.layout).map(|rows| {
          let snapshot = Snapshot::new(shared.current_seq(), rows);
          shared.observers.subscribe(snapshot)
        }))
      })
      .await??;
    tracing::debug!(table = %R::TABLE, "observer registered");
    Ok(Observer::new(rx))
  }

  async fn children_of<R: StoredRecord>(&self, contact_id: i64) -> Result<Vec<R>> {
    let shared = Arc::clone(&self.shared);
    self
      .conn
      .call(move |conn| Ok(encode::read_where::<R>(conn, &shared.layout, "contact_id", contact_id)))
      .await?
  }
}

/// Connection pragmas, then the schema upgrade. Returns the version found on
/// disk.
fn prepare(conn: &mut rusqlite::Connection, versions: &[SchemaVersion]) -> Result<u32> {
  conn.busy_timeout(Duration::from_secs(5))?;
  conn.execute_batch("PRAGMA journal_mode = WAL;")?;
  schema::upgrade(conn, versions)
}

// ─── ContactStore impl ───────────────────────────────────────────────────────

impl ContactStore for SqliteStore {
  type Error = crate::Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn add_contact(&self, input: NewContact) -> Result<i64> {
    self
      .run_transaction(&[Table::Contacts], move |tx| tx.add_contact(input))
      .await
  }

  async fn add_email(&self, input: NewEmail) -> Result<i64> {
    self
      .run_transaction(&[Table::Emails], move |tx| tx.add_email(input))
      .await
  }

  async fn add_phone(&self, input: NewPhone) -> Result<i64> {
    self
      .run_transaction(&[Table::Phones], move |tx| tx.add_phone(input))
      .await
  }

  async fn delete_contact(&self, id: i64) -> Result<bool> {
    self
      .run_transaction(&[Table::Contacts], move |tx| tx.delete_contact(id))
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
    let shared = Arc::clone(&self.shared);
    let mut rows = self
      .conn
      .call(move |conn| Ok(encode::read_where::<Contact>(conn, &shared.layout, "id", id)))
      .await??;
    Ok(rows.pop())
  }

  async fn emails_of(&self, contact_id: i64) -> Result<Vec<Email>> {
    self.children_of(contact_id).await
  }

  async fn phones_of(&self, contact_id: i64) -> Result<Vec<Phone>> {
    self.children_of(contact_id).await
  }

  async fn list_contacts(&self) -> Result<Snapshot<Contact>> { self.query_all().await }

  async fn list_emails(&self) -> Result<Snapshot<Email>> { self.query_all().await }

  async fn list_phones(&self) -> Result<Snapshot<Phone>> { self.query_all().await }
}
