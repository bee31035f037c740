//! The add-contact form flow: raw input → resolver → one transaction.

use anyhow::Context as _;
use rolodex_core::{
  contact::{NewEmail, NewPhone},
  table::Table,
};
use rolodex_form::{Record, Resolver, ValidationError, schemas};
use rolodex_store_sqlite::SqliteStore;
use serde_json::Value;

/// Raw field values as typed on the command line, before validation.
#[derive(Debug, Default)]
pub struct ContactForm {
  pub first_name:  Option<String>,
  pub last_name:   Option<String>,
  pub middle_name: Option<String>,
  pub power:       Option<String>,
  pub agreed:      Option<String>,
  pub emails:      Vec<(String, String)>,
  pub phones:      Vec<(String, String)>,
}

impl ContactForm {
  /// Field-name keyed record of whatever was supplied.
  fn record(&self) -> Record {
    let mut record = Record::new();
    let fields = [
      ("firstName", &self.first_name),
      ("lastName", &self.last_name),
      ("middleName", &self.middle_name),
      ("power", &self.power),
      ("agreed", &self.agreed),
    ];
    for (name, value) in fields {
      if let Some(v) = value {
        record.insert(name.to_owned(), Value::String(v.clone()));
      }
    }
    record
  }
}

/// Parse `TYPE=VALUE`, e.g. `home=arnold@email.com`.
pub fn parse_labelled(s: &str) -> Result<(String, String), String> {
  match s.split_once('=') {
    Some((kind, value)) if !kind.is_empty() && !value.is_empty() => {
      Ok((kind.to_owned(), value.to_owned()))
    }
    _ => Err(format!("expected TYPE=VALUE, got {s:?}")),
  }
}

pub fn resolver(extended: bool) -> Resolver {
  if extended {
    Resolver::new(schemas::extended_contact())
  } else {
    Resolver::new(schemas::contact())
  }
}

/// Validate `form`; on success store the contact with its emails and phones
/// atomically and return the new id.
pub async fn submit(
  store: &SqliteStore,
  resolver: &Resolver,
  form: ContactForm,
) -> anyhow::Result<i64> {
  let values = resolver
    .handle_submit(&form.record(), Ok, |errors: ValidationError| {
      for (field, e) in errors.iter() {
        tracing::error!(field, kind = %e.kind, message = %e.message, "invalid field");
      }
      Err(errors)
    })
    .await?;

  let contact = schemas::into_new_contact(values).context("decoding validated contact")?;
  let ContactForm { emails, phones, .. } = form;

  let id = store
    .run_transaction(&[Table::Contacts, Table::Emails, Table::Phones], move |tx| {
      let id = tx.add_contact(contact)?;
      for (kind, email) in emails {
        tx.add_email(NewEmail::new(id, kind, email))?;
      }
      for (kind, phone) in phones {
        tx.add_phone(NewPhone::new(id, kind, phone))?;
      }
      Ok(id)
    })
    .await
    .context("saving contact")?;

  tracing::info!(id, "contact added");
  Ok(id)
}
