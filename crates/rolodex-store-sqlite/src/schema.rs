//! Declarative, versioned table layout and the additive upgrade engine.
//!
//! A schema is an ordered list of [`SchemaVersion`]s. Each version declares
//! the complete layout of every table at that version; the DDL needed to move
//! from one version to the next is derived by diffing the two declarations.
//! Only additions are expressible: a later version must keep every table and
//! column of the one before it. The applied version is mirrored to
//! `PRAGMA user_version`.

use std::collections::BTreeMap;

use rolodex_core::table::Table;
use rusqlite::{Connection, TransactionBehavior};

use crate::{Error, Result};

// ─── Declarations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
  Integer,
  Real,
  Text,
}

impl ColumnType {
  fn sql(self) -> &'static str {
    match self {
      ColumnType::Integer => "INTEGER",
      ColumnType::Real => "REAL",
      ColumnType::Text => "TEXT",
    }
  }
}

/// One data column. Every table also has an implicit
/// `id INTEGER PRIMARY KEY AUTOINCREMENT` that is never declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDecl {
  pub name:     &'static str,
  pub ty:       ColumnType,
  pub required: bool,
}

impl ColumnDecl {
  pub const fn required(name: &'static str, ty: ColumnType) -> Self {
    Self { name, ty, required: true }
  }

  pub const fn optional(name: &'static str, ty: ColumnType) -> Self {
    Self { name, ty, required: false }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct TableDecl {
  pub table:   Table,
  pub columns: &'static [ColumnDecl],
  /// Columns to index. `id` is always keyed and need not be listed.
  pub indexes: &'static [&'static str],
}

impl TableDecl {
  fn column(&self, name: &str) -> Option<&ColumnDecl> {
    self.columns.iter().find(|c| c.name == name)
  }
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaVersion {
  pub version: u32,
  pub tables:  &'static [TableDecl],
}

impl SchemaVersion {
  fn table(&self, table: Table) -> Option<&TableDecl> {
    self.tables.iter().find(|t| t.table == table)
  }
}

// ─── Built-in schema ─────────────────────────────────────────────────────────

const CONTACTS_V1: TableDecl = TableDecl {
  table:   Table::Contacts,
  columns: &[
    ColumnDecl::required("first_name", ColumnType::Text),
    ColumnDecl::required("last_name", ColumnType::Text),
  ],
  indexes: &["first_name", "last_name"],
};

const CONTACTS_V2: TableDecl = TableDecl {
  table:   Table::Contacts,
  columns: &[
    ColumnDecl::required("first_name", ColumnType::Text),
    ColumnDecl::required("last_name", ColumnType::Text),
    ColumnDecl::optional("middle_name", ColumnType::Text),
    ColumnDecl::optional("power", ColumnType::Real),
    ColumnDecl::optional("agreed", ColumnType::Integer),
  ],
  indexes: &["first_name", "last_name"],
};

const EMAILS_V1: TableDecl = TableDecl {
  table:   Table::Emails,
  columns: &[
    ColumnDecl::required("contact_id", ColumnType::Integer),
    ColumnDecl::required("kind", ColumnType::Text),
    ColumnDecl::required("email", ColumnType::Text),
  ],
  indexes: &["contact_id"],
};

const PHONES_V1: TableDecl = TableDecl {
  table:   Table::Phones,
  columns: &[
    ColumnDecl::required("contact_id", ColumnType::Integer),
    ColumnDecl::required("kind", ColumnType::Text),
    ColumnDecl::required("phone", ColumnType::Text),
  ],
  indexes: &["contact_id"],
};

/// Base layout: contacts with names only.
pub const BASE_VERSION: SchemaVersion = SchemaVersion {
  version: 1,
  tables:  &[CONTACTS_V1, EMAILS_V1, PHONES_V1],
};

/// Adds the extended contact fields.
pub const EXTENDED_VERSION: SchemaVersion = SchemaVersion {
  version: 2,
  tables:  &[CONTACTS_V2, EMAILS_V1, PHONES_V1],
};

/// The schema a default-opened store upgrades to.
pub const SCHEMA_VERSIONS: &[SchemaVersion] = &[BASE_VERSION, EXTENDED_VERSION];

// ─── Layout ──────────────────────────────────────────────────────────────────

/// The column set of every table at the newest declared version. Reads and
/// writes consult it so that columns missing from an older declaration are
/// never referenced in SQL.
#[derive(Debug, Clone)]
pub struct Layout {
  version: u32,
  tables:  BTreeMap<Table, Vec<&'static str>>,
}

impl Layout {
  pub fn of(version: &SchemaVersion) -> Self {
    let tables = version
      .tables
      .iter()
      .map(|t| (t.table, t.columns.iter().map(|c| c.name).collect()))
      .collect();
    Self { version: version.version, tables }
  }

  pub fn version(&self) -> u32 { self.version }

  pub fn columns(&self, table: Table) -> Result<&[&'static str]> {
    self
      .tables
      .get(&table)
      .map(Vec::as_slice)
      .ok_or(Error::UndeclaredTable(table))
  }

  pub fn has(&self, table: Table, column: &str) -> bool {
    self
      .tables
      .get(&table)
      .is_some_and(|cols| cols.contains(&column))
  }
}

// ─── Declaration checks ──────────────────────────────────────────────────────

fn invalid(msg: impl Into<String>) -> Error { Error::InvalidSchema(msg.into()) }

/// Reject declarations that are unordered, self-inconsistent, or not
/// additive from one version to the next.
pub fn check_declaration(versions: &[SchemaVersion]) -> Result<()> {
  if versions.is_empty() {
    return Err(invalid("no schema versions declared"));
  }

  for v in versions {
    if v.version == 0 {
      return Err(invalid("schema versions start at 1"));
    }
    for (i, t) in v.tables.iter().enumerate() {
      if v.tables[..i].iter().any(|o| o.table == t.table) {
        return Err(invalid(format!("v{}: table {} declared twice", v.version, t.table)));
      }
      for (j, c) in t.columns.iter().enumerate() {
        if c.name == "id" {
          return Err(invalid(format!("v{}: {}.id is implicit", v.version, t.table)));
        }
        if t.columns[..j].iter().any(|o| o.name == c.name) {
          return Err(invalid(format!(
            "v{}: column {}.{} declared twice",
            v.version, t.table, c.name
          )));
        }
      }
      for idx in t.indexes {
        if *idx != "id" && t.column(idx).is_none() {
          return Err(invalid(format!(
            "v{}: index on unknown column {}.{idx}",
            v.version, t.table
          )));
        }
      }
    }
  }

  for pair in versions.windows(2) {
    let (prev, next) = (&pair[0], &pair[1]);
    if next.version <= prev.version {
      return Err(invalid(format!(
        "versions must increase: v{} follows v{}",
        next.version, prev.version
      )));
    }
    for old in prev.tables {
      let Some(new) = next.table(old.table) else {
        return Err(invalid(format!(
          "v{} drops table {} (upgrades are additive)",
          next.version, old.table
        )));
      };
      for col in old.columns {
        match new.column(col.name) {
          Some(c) if c == col => {}
          Some(_) => {
            return Err(invalid(format!(
              "v{} changes column {}.{}",
              next.version, old.table, col.name
            )));
          }
          None => {
            return Err(invalid(format!(
              "v{} drops column {}.{} (upgrades are additive)",
              next.version, old.table, col.name
            )));
          }
        }
      }
      for col in new.columns {
        if col.required && old.column(col.name).is_none() {
          return Err(invalid(format!(
            "v{}: added column {}.{} must be optional",
            next.version, old.table, col.name
          )));
        }
      }
    }
  }

  Ok(())
}

// ─── Upgrade ─────────────────────────────────────────────────────────────────

/// DDL that moves a database from `prev` (or nothing) to `next`.
fn migration_statements(prev: Option<&SchemaVersion>, next: &SchemaVersion) -> Vec<String> {
  let mut stmts = Vec::new();

  for decl in next.tables {
    let t = decl.table;
    match prev.and_then(|p| p.table(t)) {
      None => {
        let mut cols = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_owned()];
        cols.extend(decl.columns.iter().map(|c| {
          if c.required {
            format!("{} {} NOT NULL", c.name, c.ty.sql())
          } else {
            format!("{} {}", c.name, c.ty.sql())
          }
        }));
        stmts.push(format!("CREATE TABLE IF NOT EXISTS {t} ({})", cols.join(", ")));
      }
      Some(old) => {
        for c in decl.columns.iter().filter(|c| old.column(c.name).is_none()) {
          stmts.push(format!("ALTER TABLE {t} ADD COLUMN {} {}", c.name, c.ty.sql()));
        }
      }
    }

    for idx in decl.indexes.iter().filter(|i| **i != "id") {
      stmts.push(format!("CREATE INDEX IF NOT EXISTS {t}_{idx}_idx ON {t}({idx})"));
    }
  }

  stmts
}

pub fn current_user_version(conn: &Connection) -> Result<u32> {
  Ok(conn.query_row("PRAGMA user_version", [], |row| row.get::<_, u32>(0))?)
}

/// Compare the stored version against `declared`. `Some` means nothing is
/// left to do.
fn settled(stored: u32, declared: u32) -> Result<Option<u32>> {
  if stored > declared {
    return Err(Error::UnsupportedSchemaVersion { stored, declared });
  }
  Ok((stored == declared).then_some(stored))
}

/// Bring the database up to the newest declared version.
///
/// All pending versions are applied inside one IMMEDIATE SQLite transaction.
/// The stored version is re-read once the write lock is held, so when several
/// connections open the same file at once only the first applies the DDL.
/// Returns the version found on disk.
pub fn upgrade(conn: &mut Connection, versions: &[SchemaVersion]) -> Result<u32> {
  let declared = versions.last().map_or(0, |v| v.version);
  if let Some(stored) = settled(current_user_version(conn)?, declared)? {
    return Ok(stored);
  }

  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let stored = current_user_version(&tx)?;
  if let Some(stored) = settled(stored, declared)? {
    tracing::debug!(version = stored, "schema already upgraded by another connection");
    return Ok(stored);
  }

  let mut prev = versions.iter().rev().find(|v| v.version <= stored);
  if stored > 0 && prev.is_none() {
    return Err(invalid(format!("stored version {stored} predates every declared version")));
  }

  for next in versions.iter().filter(|v| v.version > stored) {
    tracing::info!(from = prev.map_or(0, |p| p.version), to = next.version, "applying schema version");
    for stmt in migration_statements(prev, next) {
      tx.execute_batch(&stmt)?;
    }
    tx.execute_batch(&format!("PRAGMA user_version = {}", next.version))?;
    prev = Some(next);
  }
  tx.commit()?;

  Ok(stored)
}
