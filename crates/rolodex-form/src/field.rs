//! Per-field constraint lists.
//!
//! A [`Field`] is an ordered list of [`Constraint`]s. Each constraint takes
//! the field's current value (absent, or raw JSON) and either passes along a
//! possibly-coerced value or fails with a [`FieldError`]. Evaluation of a
//! field stops at its first failing constraint.

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use serde_json::{Number, Value};

use crate::resolver::FieldError;

/// Kind reported when a constraint does not name a more specific one.
pub const DEFAULT_KIND: &str = "validation";

type Check = Arc<dyn Fn(Option<&Value>) -> bool + Send + Sync>;
type AsyncCheck =
  Arc<dyn Fn(Option<Value>) -> Pin<Box<dyn Future<Output = bool> + Send>> + Send + Sync>;

// ─── Constraint ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum Constraint {
  /// Strings pass; numbers and booleans are stringified.
  Text { message: String },
  /// Numbers pass; numeric strings are parsed. Blank strings become absent.
  Number { message: String },
  /// Booleans pass; `"true"`/`"on"`/`1` and `"false"`/`"off"`/`0` convert.
  Boolean { message: String },
  /// Fails on an absent value or an empty string.
  Required { message: String },
  /// Inclusive lower bound; absent values pass. Non-numeric values fail with
  /// kind `typeError` and the same message.
  Min { limit: f64, message: String },
  /// Inclusive upper bound; absent values pass. Non-numeric values fail with
  /// kind `typeError` and the same message.
  Max { limit: f64, message: String },
  /// Caller-supplied predicate.
  Test { kind: String, message: String, check: Check },
  /// Caller-supplied asynchronous predicate, e.g. a uniqueness lookup.
  TestAsync { kind: String, message: String, check: AsyncCheck },
}

impl fmt::Debug for Constraint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Constraint::Text { .. } => f.write_str("Text"),
      Constraint::Number { .. } => f.write_str("Number"),
      Constraint::Boolean { .. } => f.write_str("Boolean"),
      Constraint::Required { .. } => f.write_str("Required"),
      Constraint::Min { limit, .. } => write!(f, "Min({limit})"),
      Constraint::Max { limit, .. } => write!(f, "Max({limit})"),
      Constraint::Test { kind, .. } => write!(f, "Test({kind})"),
      Constraint::TestAsync { kind, .. } => write!(f, "TestAsync({kind})"),
    }
  }
}

fn fail(kind: &str, message: &str) -> FieldError {
  FieldError { kind: kind.to_owned(), message: message.to_owned() }
}

fn number(n: f64) -> Option<Value> { Number::from_f64(n).map(Value::Number) }

impl Constraint {
  /// Apply this constraint to `value`.
  pub async fn apply(&self, value: Option<Value>) -> Result<Option<Value>, FieldError> {
    let value = value.filter(|v| !v.is_null());

    match self {
      Constraint::Text { message } => match value {
        None | Some(Value::String(_)) => Ok(value),
        Some(Value::Number(n)) => Ok(Some(Value::String(n.to_string()))),
        Some(Value::Bool(b)) => Ok(Some(Value::String(b.to_string()))),
        Some(_) => Err(fail("typeError", message)),
      },

      Constraint::Number { message } => match value {
        None | Some(Value::Number(_)) => Ok(value),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
          .trim()
          .parse::<f64>()
          .ok()
          .and_then(number)
          .map(Some)
          .ok_or_else(|| fail("typeError", message)),
        Some(_) => Err(fail("typeError", message)),
      },

      Constraint::Boolean { message } => match value {
        None | Some(Value::Bool(_)) => Ok(value),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
          "" => Ok(None),
          "true" | "on" => Ok(Some(Value::Bool(true))),
          "false" | "off" => Ok(Some(Value::Bool(false))),
          _ => Err(fail("typeError", message)),
        },
        Some(Value::Number(n)) => match n.as_i64() {
          Some(1) => Ok(Some(Value::Bool(true))),
          Some(0) => Ok(Some(Value::Bool(false))),
          _ => Err(fail("typeError", message)),
        },
        Some(_) => Err(fail("typeError", message)),
      },

      Constraint::Required { message } => {
        let missing = match &value {
          None => true,
          Some(Value::String(s)) => s.is_empty(),
          Some(_) => false,
        };
        if missing { Err(fail("required", message)) } else { Ok(value) }
      }

      Constraint::Min { limit, message } => bound(value, |n| n >= *limit, "min", message),

      Constraint::Max { limit, message } => bound(value, |n| n <= *limit, "max", message),

      Constraint::Test { kind, message, check } => {
        if check(value.as_ref()) {
          Ok(value)
        } else {
          Err(fail(kind, message))
        }
      }

      Constraint::TestAsync { kind, message, check } => {
        if check(value.clone()).await {
          Ok(value)
        } else {
          Err(fail(kind, message))
        }
      }
    }
  }
}

fn bound(
  value: Option<Value>,
  ok: impl Fn(f64) -> bool,
  kind: &str,
  message: &str,
) -> Result<Option<Value>, FieldError> {
  match value.as_ref().map(Value::as_f64) {
    None => Ok(None),
    Some(Some(n)) if ok(n) => Ok(value),
    Some(Some(_)) => Err(fail(kind, message)),
    Some(None) => Err(fail("typeError", message)),
  }
}

// ─── Field ───────────────────────────────────────────────────────────────────

/// The ordered constraint list for one field.
#[derive(Debug, Clone, Default)]
pub struct Field {
  constraints: Vec<Constraint>,
}

impl Field {
  /// No coercion; the raw value is kept as-is.
  pub fn any() -> Self { Self::default() }

  pub fn text(message: impl Into<String>) -> Self {
    Self::any().constraint(Constraint::Text { message: message.into() })
  }

  pub fn number(message: impl Into<String>) -> Self {
    Self::any().constraint(Constraint::Number { message: message.into() })
  }

  pub fn boolean(message: impl Into<String>) -> Self {
    Self::any().constraint(Constraint::Boolean { message: message.into() })
  }

  pub fn constraint(mut self, constraint: Constraint) -> Self {
    self.constraints.push(constraint);
    self
  }

  pub fn required(self, message: impl Into<String>) -> Self {
    self.constraint(Constraint::Required { message: message.into() })
  }

  pub fn min(self, limit: f64, message: impl Into<String>) -> Self {
    self.constraint(Constraint::Min { limit, message: message.into() })
  }

  pub fn max(self, limit: f64, message: impl Into<String>) -> Self {
    self.constraint(Constraint::Max { limit, message: message.into() })
  }

  /// A custom predicate reported with [`DEFAULT_KIND`].
  pub fn test<F>(self, message: impl Into<String>, check: F) -> Self
  where
    F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
  {
    self.test_kind(DEFAULT_KIND, message, check)
  }

  pub fn test_kind<F>(self, kind: impl Into<String>, message: impl Into<String>, check: F) -> Self
  where
    F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
  {
    self.constraint(Constraint::Test {
      kind:    kind.into(),
      message: message.into(),
      check:   Arc::new(check),
    })
  }

  /// A custom asynchronous predicate reported with [`DEFAULT_KIND`].
  pub fn test_async<F, Fut>(self, message: impl Into<String>, check: F) -> Self
  where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
  {
    self.constraint(Constraint::TestAsync {
      kind:    DEFAULT_KIND.to_owned(),
      message: message.into(),
      check:   Arc::new(move |v| Box::pin(check(v))),
    })
  }

  pub fn constraints(&self) -> &[Constraint] { &self.constraints }

  /// Run every constraint in order; the first failure wins.
  pub async fn evaluate(&self, mut value: Option<Value>) -> Result<Option<Value>, FieldError> {
    for constraint in &self.constraints {
      value = constraint.apply(value).await?;
    }
    Ok(value.filter(|v| !v.is_null()))
  }
}
