//! The `ContactStore` trait.
//!
//! Implemented by storage backends (e.g. `rolodex-store-sqlite`). Callers that
//! only need single-operation writes and reads depend on this abstraction, not
//! on a concrete backend.

use std::future::Future;

use crate::{
  contact::{Contact, Email, NewContact, NewEmail, NewPhone, Phone},
  table::Snapshot,
};

/// Abstraction over a Rolodex store backend.
///
/// Every write runs as its own single-table transaction: it is either fully
/// visible after the returned future resolves, or not at all.
///
/// Referential integrity between contacts and their emails/phones is advisory.
/// Implementations must not reject a child row whose `contact_id` is unknown,
/// and must not cascade a contact deletion to its children.
pub trait ContactStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a contact and return its freshly assigned id.
  ///
  /// Fails with a constraint error if `first_name` or `last_name` is empty.
  fn add_contact(
    &self,
    input: NewContact,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  fn add_email(
    &self,
    input: NewEmail,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  fn add_phone(
    &self,
    input: NewPhone,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Remove the contact row only. Returns `false` if no such row existed.
  fn delete_contact(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_contact(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// All emails whose `contact_id` equals `contact_id`.
  fn emails_of(
    &self,
    contact_id: i64,
  ) -> impl Future<Output = Result<Vec<Email>, Self::Error>> + Send + '_;

  /// All phones whose `contact_id` equals `contact_id`.
  fn phones_of(
    &self,
    contact_id: i64,
  ) -> impl Future<Output = Result<Vec<Phone>, Self::Error>> + Send + '_;

  fn list_contacts(
    &self,
  ) -> impl Future<Output = Result<Snapshot<Contact>, Self::Error>> + Send + '_;

  fn list_emails(
    &self,
  ) -> impl Future<Output = Result<Snapshot<Email>, Self::Error>> + Send + '_;

  fn list_phones(
    &self,
  ) -> impl Future<Output = Result<Snapshot<Phone>, Self::Error>> + Send + '_;
}
