//! Declarative validation for Rolodex forms.
//!
//! A [`Schema`] maps field names to ordered constraint lists. A [`Resolver`]
//! checks a raw record against it and yields either the coerced record or a
//! field-keyed [`ValidationError`] naming every invalid field. Pure logic; no
//! database or UI dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use rolodex_form::{Resolver, schemas};
//!
//! # async fn demo() {
//! let resolver = Resolver::new(schemas::contact());
//! let raw = serde_json::json!({ "firstName": "", "lastName": "Doe" });
//! let res = resolver.validate(raw.as_object().unwrap()).await;
//! assert_eq!(res.errors().unwrap().get("firstName").unwrap().message, "Required");
//! # }
//! ```

pub mod error;
mod field;
mod resolver;
pub mod schemas;

pub use error::{Error, Result};
pub use field::{Constraint, DEFAULT_KIND, Field};
pub use resolver::{FieldError, Record, Resolution, Resolver, Schema, ValidationError};
