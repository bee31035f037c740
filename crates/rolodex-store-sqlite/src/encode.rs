//! Mapping between domain rows and SQLite columns.
//!
//! Column lists come from the [`Layout`] of the newest declared schema
//! version, so a column that the schema does not (yet) declare is never
//! selected and simply reads back as `None`.

use rolodex_core::{
  contact::{Contact, Email, NewContact, NewEmail, NewPhone, Phone},
  table::{Record, Snapshot, Table},
};
use rusqlite::{Connection, types::Value};
use tokio::sync::watch;

use crate::{Error, Result, observe::Observers, schema::Layout};

/// A domain row the SQLite store knows how to decode and observe.
pub trait StoredRecord: Record {
  fn from_row(row: &rusqlite::Row<'_>, layout: &Layout) -> rusqlite::Result<Self>;

  #[doc(hidden)]
  fn channel(observers: &Observers) -> &watch::Sender<Snapshot<Self>>;
}

/// Read a column that may be missing from the declared layout.
fn optional<T: rusqlite::types::FromSql>(
  row: &rusqlite::Row<'_>,
  layout: &Layout,
  table: Table,
  column: &str,
) -> rusqlite::Result<Option<T>> {
  if layout.has(table, column) {
    row.get(column)
  } else {
    Ok(None)
  }
}

impl StoredRecord for Contact {
  fn from_row(row: &rusqlite::Row<'_>, layout: &Layout) -> rusqlite::Result<Self> {
    Ok(Contact {
      id:          row.get("id")?,
      first_name:  row.get("first_name")?,
      last_name:   row.get("last_name")?,
      middle_name: optional(row, layout, Table::Contacts, "middle_name")?,
      power:       optional(row, layout, Table::Contacts, "power")?,
      agreed:      optional(row, layout, Table::Contacts, "agreed")?,
    })
  }

  fn channel(observers: &Observers) -> &watch::Sender<Snapshot<Self>> { &observers.contacts }
}

impl StoredRecord for Email {
  fn from_row(row: &rusqlite::Row<'_>, _layout: &Layout) -> rusqlite::Result<Self> {
    Ok(Email {
      id:         row.get("id")?,
      contact_id: row.get("contact_id")?,
      kind:       row.get("kind")?,
      email:      row.get("email")?,
    })
  }

  fn channel(observers: &Observers) -> &watch::Sender<Snapshot<Self>> { &observers.emails }
}

impl StoredRecord for Phone {
  fn from_row(row: &rusqlite::Row<'_>, _layout: &Layout) -> rusqlite::Result<Self> {
    Ok(Phone {
      id:         row.get("id")?,
      contact_id: row.get("contact_id")?,
      kind:       row.get("kind")?,
      phone:      row.get("phone")?,
    })
  }

  fn channel(observers: &Observers) -> &watch::Sender<Snapshot<Self>> { &observers.phones }
}

// ─── Reads ───────────────────────────────────────────────────────────────────

fn select_sql(layout: &Layout, table: Table, filter: Option<&str>) -> Result<String> {
  let mut cols = vec!["id"];
  cols.extend_from_slice(layout.columns(table)?);
  let where_clause = filter.map(|f| format!(" WHERE {f} = ?1")).unwrap_or_default();
  Ok(format!("SELECT {} FROM {table}{where_clause} ORDER BY id", cols.join(", ")))
}

/// Every row of `R`'s table, in id order.
pub fn read_all<R: StoredRecord>(conn: &Connection, layout: &Layout) -> Result<Vec<R>> {
  let sql = select_sql(layout, R::TABLE, None)?;
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map([], |row| R::from_row(row, layout))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Rows of `R`'s table whose `column` equals `value`, in id order.
pub fn read_where<R: StoredRecord>(
  conn: &Connection,
  layout: &Layout,
  column: &'static str,
  value: i64,
) -> Result<Vec<R>> {
  if !layout.has(R::TABLE, column) && column != "id" {
    return Err(Error::UndeclaredColumn { table: R::TABLE, column });
  }
  let sql = select_sql(layout, R::TABLE, Some(column))?;
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map([value], |row| R::from_row(row, layout))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Column/value pairs for an insert. Absent optional fields are left out so
/// that the row is valid under layouts that do not declare them.
pub fn contact_columns(input: NewContact) -> Vec<(&'static str, Value)> {
  let mut cols = vec![
    ("first_name", Value::Text(input.first_name)),
    ("last_name", Value::Text(input.last_name)),
  ];
  if let Some(m) = input.middle_name {
    cols.push(("middle_name", Value::Text(m)));
  }
  if let Some(p) = input.power {
    cols.push(("power", Value::Real(p)));
  }
  if let Some(a) = input.agreed {
    cols.push(("agreed", Value::Integer(i64::from(a))));
  }
  cols
}

pub fn email_columns(input: NewEmail) -> Vec<(&'static str, Value)> {
  vec![
    ("contact_id", Value::Integer(input.contact_id)),
    ("kind", Value::Text(input.kind)),
    ("email", Value::Text(input.email)),
  ]
}

pub fn phone_columns(input: NewPhone) -> Vec<(&'static str, Value)> {
  vec![
    ("contact_id", Value::Integer(input.contact_id)),
    ("kind", Value::Text(input.kind)),
    ("phone", Value::Text(input.phone)),
  ]
}

/// Insert one row and return its assigned id.
pub fn insert(
  conn: &Connection,
  layout: &Layout,
  table: Table,
  cols: Vec<(&'static str, Value)>,
) -> Result<i64> {
  layout.columns(table)?;
  if let Some((column, _)) = cols.iter().find(|(c, _)| !layout.has(table, c)) {
    return Err(Error::UndeclaredColumn { table, column: *column });
  }

  let names: Vec<&str> = cols.iter().map(|(c, _)| *c).collect();
  let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{i}")).collect();
  let sql = format!(
    "INSERT INTO {table} ({}) VALUES ({})",
    names.join(", "),
    placeholders.join(", ")
  );

  conn.execute(&sql, rusqlite::params_from_iter(cols.into_iter().map(|(_, v)| v)))?;
  Ok(conn.last_insert_rowid())
}
