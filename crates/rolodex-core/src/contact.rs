//! Contact records and the email/phone rows that reference them.
//!
//! A contact owns its emails and phones by reference only: child rows carry a
//! `contact_id`, but nothing enforces that the contact exists, and deleting a
//! contact leaves its children in place.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  table::{Record, Table},
};

// ─── Contact ─────────────────────────────────────────────────────────────────

/// A persisted contact. `id` is assigned by the store and never reused.
///
/// The extended fields were added in a later schema version; rows written
/// before that read them as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
  pub id:          i64,
  pub first_name:  String,
  pub last_name:   String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub middle_name: Option<String>,
  /// Bounded to `[0, 10]` by the form layer, not by the store.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub power:       Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub agreed:      Option<bool>,
}

impl Record for Contact {
  const TABLE: Table = Table::Contacts;

  fn id(&self) -> i64 { self.id }
}

/// Input for creating a contact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
  pub first_name:  String,
  pub last_name:   String,
  #[serde(default)]
  pub middle_name: Option<String>,
  #[serde(default)]
  pub power:       Option<f64>,
  #[serde(default)]
  pub agreed:      Option<bool>,
}

impl NewContact {
  pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
    Self {
      first_name: first_name.into(),
      last_name: last_name.into(),
      ..Default::default()
    }
  }

  /// Reject rows whose required name fields are empty.
  pub fn check(&self) -> Result<()> {
    if self.first_name.is_empty() {
      return Err(Error::Constraint { table: Table::Contacts, field: "firstName" });
    }
    if self.last_name.is_empty() {
      return Err(Error::Constraint { table: Table::Contacts, field: "lastName" });
    }
    Ok(())
  }

  /// Attach the store-assigned id.
  pub fn into_contact(self, id: i64) -> Contact {
    Contact {
      id,
      first_name: self.first_name,
      last_name: self.last_name,
      middle_name: self.middle_name,
      power: self.power,
      agreed: self.agreed,
    }
  }
}

// ─── Email ───────────────────────────────────────────────────────────────────

/// An email address belonging to a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
  pub id:         i64,
  pub contact_id: i64,
  /// Free-text label such as "home" or "work".
  #[serde(rename = "type")]
  pub kind:       String,
  pub email:      String,
}

impl Record for Email {
  const TABLE: Table = Table::Emails;

  fn id(&self) -> i64 { self.id }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmail {
  pub contact_id: i64,
  #[serde(rename = "type")]
  pub kind:       String,
  pub email:      String,
}

impl NewEmail {
  pub fn new(contact_id: i64, kind: impl Into<String>, email: impl Into<String>) -> Self {
    Self { contact_id, kind: kind.into(), email: email.into() }
  }
}

// ─── Phone ───────────────────────────────────────────────────────────────────

/// A phone number belonging to a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phone {
  pub id:         i64,
  pub contact_id: i64,
  #[serde(rename = "type")]
  pub kind:       String,
  pub phone:      String,
}

impl Record for Phone {
  const TABLE: Table = Table::Phones;

  fn id(&self) -> i64 { self.id }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhone {
  pub contact_id: i64,
  #[serde(rename = "type")]
  pub kind:       String,
  pub phone:      String,
}

impl NewPhone {
  pub fn new(contact_id: i64, kind: impl Into<String>, phone: impl Into<String>) -> Self {
    Self { contact_id, kind: kind.into(), phone: phone.into() }
  }
}
