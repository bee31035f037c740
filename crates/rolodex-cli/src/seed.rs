//! Demo data: wipes every table, then adds two sample contacts.

use rolodex_core::{
  contact::{NewContact, NewEmail, NewPhone},
  table::Table,
};
use rolodex_store_sqlite::{Result, SqliteStore};
use strum::IntoEnumIterator as _;

pub async fn seed(store: &SqliteStore) -> Result<()> {
  let all: Vec<Table> = Table::iter().collect();

  let cleared = store
    .run_transaction(&all, |tx| {
      let mut n = 0;
      for table in Table::iter() {
        n += tx.clear(table)?;
      }
      Ok(n)
    })
    .await?;
  tracing::info!(rows = cleared, "cleared all tables");

  tracing::info!("seeding database with some contacts");
  let (arnold, adam) = store
    .run_transaction(&all, |tx| {
      let arnold = tx.add_contact(NewContact::new("Arnold", "Fitzgerald"))?;
      tx.add_email(NewEmail::new(arnold, "home", "arnold@email.com"))?;
      tx.add_email(NewEmail::new(arnold, "work", "arnold@abc.com"))?;
      tx.add_phone(NewPhone::new(arnold, "home", "12345678"))?;
      tx.add_phone(NewPhone::new(arnold, "work", "987654321"))?;

      let adam = tx.add_contact(NewContact::new("Adam", "Tensta"))?;
      tx.add_email(NewEmail::new(adam, "home", "adam@tensta.se"))?;
      tx.add_phone(NewPhone::new(adam, "work", "88888888"))?;

      Ok((arnold, adam))
    })
    .await?;
  tracing::info!(arnold, adam, "seeded contacts");

  Ok(())
}
