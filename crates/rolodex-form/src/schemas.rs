//! The contact forms' schemas and the step from validated values to a
//! storable contact.

use rolodex_core::contact::NewContact;
use serde_json::Value;

use crate::{Field, Record, Result, Schema};

pub const REQUIRED: &str = "Required";
pub const TEXT: &str = "Must be text";

/// `firstName` and `lastName`, both required.
pub fn contact() -> Schema {
  Schema::new()
    .field("firstName", Field::text(TEXT).required(REQUIRED))
    .field("lastName", Field::text(TEXT).required(REQUIRED))
}

/// The base fields plus optional `middleName` and `agreed`, and a required
/// `power` in `[0, 10]`.
pub fn extended_contact() -> Schema {
  contact()
    .field("middleName", Field::text(TEXT))
    .field("agreed", Field::boolean("Must be yes or no"))
    .field(
      "power",
      Field::number("Must be a number")
        .required(REQUIRED)
        .min(0.0, "Must be at least 0")
        .max(10.0, "Must be 10 or less"),
    )
}

/// Decode a record accepted by [`contact`] or [`extended_contact`].
/// Fields the contact does not know are ignored.
pub fn into_new_contact(values: Record) -> Result<NewContact> {
  Ok(serde_json::from_value(Value::Object(values))?)
}
