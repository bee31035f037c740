//! Schema-driven validation of raw form records.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::field::Field;

/// A raw or validated record, keyed by form field name.
pub type Record = Map<String, Value>;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Why a single field failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
  /// Machine-readable tag such as `required`, `max` or `validation`.
  pub kind:    String,
  pub message: String,
}

/// Every failing field of one record, each with its first failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(transparent)]
#[error("invalid fields: {}", summary(.0))]
pub struct ValidationError(BTreeMap<String, FieldError>);

fn summary(errors: &BTreeMap<String, FieldError>) -> String {
  errors
    .iter()
    .map(|(field, e)| format!("{field} ({})", e.message))
    .collect::<Vec<_>>()
    .join(", ")
}

impl ValidationError {
  pub fn get(&self, field: &str) -> Option<&FieldError> { self.0.get(field) }

  pub fn fields(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn into_inner(self) -> BTreeMap<String, FieldError> { self.0 }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

/// Field name → constraint list. Fields not named here pass through
/// untouched. Read-only once handed to a [`Resolver`].
#[derive(Debug, Clone, Default)]
pub struct Schema {
  fields: Vec<(String, Field)>,
}

impl Schema {
  pub fn new() -> Self { Self::default() }

  /// Declare `name`, replacing any earlier declaration of the same field.
  pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
    let name = name.into();
    match self.fields.iter_mut().find(|(n, _)| *n == name) {
      Some((_, existing)) => *existing = field,
      None => self.fields.push((name, field)),
    }
    self
  }

  pub fn get(&self, name: &str) -> Option<&Field> {
    self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
  }

  pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
    self.fields.iter().map(|(n, f)| (n.as_str(), f))
  }
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Outcome of validating one record: either the coerced values or the
/// field-keyed errors, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
  Valid(Record),
  Invalid(ValidationError),
}

impl Resolution {
  pub fn is_valid(&self) -> bool { matches!(self, Resolution::Valid(_)) }

  /// The coerced record, or `None` if any field failed.
  pub fn values(&self) -> Option<&Record> {
    match self {
      Resolution::Valid(values) => Some(values),
      Resolution::Invalid(_) => None,
    }
  }

  pub fn errors(&self) -> Option<&ValidationError> {
    match self {
      Resolution::Valid(_) => None,
      Resolution::Invalid(errors) => Some(errors),
    }
  }

  pub fn into_result(self) -> Result<Record, ValidationError> {
    match self {
      Resolution::Valid(values) => Ok(values),
      Resolution::Invalid(errors) => Err(errors),
    }
  }
}

/// Serializes as `{ "values": {...}, "errors": {...} }` with the unused side
/// empty, which is the shape form layers consume.
impl Serialize for Resolution {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Wire<'a> {
      values: &'a Record,
      errors: &'a ValidationError,
    }

    let no_values = Record::new();
    let no_errors = ValidationError::default();
    let wire = match self {
      Resolution::Valid(values) => Wire { values, errors: &no_errors },
      Resolution::Invalid(errors) => Wire { values: &no_values, errors },
    };
    wire.serialize(serializer)
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Validates records against a fixed [`Schema`]. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Resolver {
  schema: Arc<Schema>,
}

impl Resolver {
  pub fn new(schema: Schema) -> Self { Self { schema: Arc::new(schema) } }

  pub fn schema(&self) -> &Schema { &self.schema }

  /// Validate every declared field of `record`.
  ///
  /// All fields are evaluated even after one fails, so the error map names
  /// every invalid field. Any failure discards the coerced values entirely.
  pub async fn validate(&self, record: &Record) -> Resolution {
    let mut values = record.clone();
    let mut errors = BTreeMap::new();

    for (name, field) in self.schema.fields() {
      match field.evaluate(record.get(name).cloned()).await {
        Ok(Some(value)) => {
          values.insert(name.to_owned(), value);
        }
        Ok(None) => {
          values.remove(name);
        }
        Err(e) => {
          errors.insert(name.to_owned(), e);
        }
      }
    }

    if errors.is_empty() {
      Resolution::Valid(values)
    } else {
      let errors = ValidationError(errors);
      tracing::debug!(fields = %summary(&errors.0), "record failed validation");
      Resolution::Invalid(errors)
    }
  }

  /// Validate `record`, then call exactly one of the handlers: `on_valid`
  /// with the coerced record, or `on_invalid` with the non-empty error map.
  pub async fn handle_submit<T>(
    &self,
    record: &Record,
    on_valid: impl FnOnce(Record) -> T,
    on_invalid: impl FnOnce(ValidationError) -> T,
  ) -> T {
    match self.validate(record).await {
      Resolution::Valid(values) => on_valid(values),
      Resolution::Invalid(errors) => on_invalid(errors),
    }
  }
}
