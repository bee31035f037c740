//! Integration tests for `SqliteStore` against in-memory and on-disk databases.

use std::collections::HashSet;

use rolodex_core::{
  contact::{Contact, Email, NewContact, NewEmail, NewPhone, Phone},
  store::ContactStore,
  table::Table,
};

use crate::{
  Error, SqliteStore,
  schema::{BASE_VERSION, EXTENDED_VERSION, SCHEMA_VERSIONS, SchemaVersion},
};

const BASE_ONLY: &[SchemaVersion] = &[BASE_VERSION];

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Contacts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_contact_and_email_scenario() {
  let s = store().await;

  let id = s.add_contact(NewContact::new("Arnold", "Fitzgerald")).await.unwrap();
  assert_eq!(id, 1);
  s.add_email(NewEmail::new(id, "home", "arnold@email.com")).await.unwrap();

  let contacts = s.query_all::<Contact>().await.unwrap();
  assert_eq!(contacts.as_slice(), &[NewContact::new("Arnold", "Fitzgerald").into_contact(1)]);

  let emails = s.query_all::<Email>().await.unwrap();
  assert_eq!(emails.len(), 1);
  assert_eq!(emails.as_slice()[0].contact_id, 1);
  assert_eq!(emails.as_slice()[0].email, "arnold@email.com");
}

#[tokio::test]
async fn contact_ids_are_unique() {
  let s = store().await;

  let mut ids = Vec::new();
  for i in 0..20 {
    ids.push(s.add_contact(NewContact::new(format!("First{i}"), "Last")).await.unwrap());
  }

  let distinct: HashSet<_> = ids.iter().copied().collect();
  assert_eq!(distinct.len(), ids.len());

  let all = s.list_contacts().await.unwrap();
  for id in &ids {
    assert_eq!(all.iter().filter(|c| c.id == *id).count(), 1);
  }
}

#[tokio::test]
async fn ids_are_not_reused_after_delete_or_clear() {
  let s = store().await;

  let a = s.add_contact(NewContact::new("A", "A")).await.unwrap();
  let b = s.add_contact(NewContact::new("B", "B")).await.unwrap();
  assert!(s.delete_contact(b).await.unwrap());

  let c = s.add_contact(NewContact::new("C", "C")).await.unwrap();
  assert!(c > b);

  s.run_transaction(&[Table::Contacts], |tx| tx.clear(Table::Contacts))
    .await
    .unwrap();
  let d = s.add_contact(NewContact::new("D", "D")).await.unwrap();
  assert!(d > c && d > a);
}

#[tokio::test]
async fn empty_names_are_rejected() {
  let s = store().await;

  let err = s.add_contact(NewContact::new("", "Doe")).await.unwrap_err();
  assert!(err.is_constraint_error());

  let err = s.add_contact(NewContact::new("Jane", "")).await.unwrap_err();
  assert!(err.is_constraint_error());

  assert!(s.list_contacts().await.unwrap().is_empty());
}

#[tokio::test]
async fn extended_fields_roundtrip() {
  let s = store().await;

  let mut input = NewContact::new("Jane", "Doe");
  input.middle_name = Some("Q".into());
  input.power = Some(7.5);
  input.agreed = Some(true);

  let id = s.add_contact(input.clone()).await.unwrap();
  let fetched = s.get_contact(id).await.unwrap().unwrap();
  assert_eq!(fetched, input.into_contact(id));
}

#[tokio::test]
async fn get_contact_missing_returns_none() {
  let s = store().await;
  assert!(s.get_contact(42).await.unwrap().is_none());
}

// ─── Relations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn children_are_looked_up_by_contact() {
  let s = store().await;

  let arnold = s.add_contact(NewContact::new("Arnold", "Fitzgerald")).await.unwrap();
  let adam = s.add_contact(NewContact::new("Adam", "Tensta")).await.unwrap();

  s.add_email(NewEmail::new(arnold, "home", "arnold@email.com")).await.unwrap();
  s.add_email(NewEmail::new(arnold, "work", "arnold@abc.com")).await.unwrap();
  s.add_email(NewEmail::new(adam, "home", "adam@tensta.se")).await.unwrap();
  s.add_phone(NewPhone::new(adam, "work", "88888888")).await.unwrap();

  let emails = s.emails_of(arnold).await.unwrap();
  let kinds: Vec<_> = emails.iter().map(|e| e.kind.as_str()).collect();
  assert_eq!(kinds, ["home", "work"]);

  assert!(s.phones_of(arnold).await.unwrap().is_empty());
  assert_eq!(s.phones_of(adam).await.unwrap()[0].phone, "88888888");
}

#[tokio::test]
async fn orphaned_children_are_allowed() {
  let s = store().await;

  // No contact 99 exists; the insert still succeeds.
  s.add_phone(NewPhone::new(99, "home", "12345678")).await.unwrap();

  let id = s.add_contact(NewContact::new("Arnold", "Fitzgerald")).await.unwrap();
  s.add_email(NewEmail::new(id, "home", "arnold@email.com")).await.unwrap();

  // Deleting the contact does not cascade.
  assert!(s.delete_contact(id).await.unwrap());
  assert!(!s.delete_contact(id).await.unwrap());
  assert!(s.get_contact(id).await.unwrap().is_none());
  assert_eq!(s.emails_of(id).await.unwrap().len(), 1);
  assert_eq!(s.list_phones().await.unwrap().len(), 1);
}

// ─── Transactions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn multi_table_transaction_commits_together() {
  let s = store().await;

  let (arnold, adam) = s
    .run_transaction(&[Table::Contacts, Table::Emails, Table::Phones], |tx| {
      let arnold = tx.add_contact(NewContact::new("Arnold", "Fitzgerald"))?;
      tx.add_email(NewEmail::new(arnold, "home", "arnold@email.com"))?;
      tx.add_phone(NewPhone::new(arnold, "home", "12345678"))?;

      let adam = tx.add_contact(NewContact::new("Adam", "Tensta"))?;
      tx.add_phone(NewPhone::new(adam, "work", "88888888"))?;

      // Own writes are visible inside the transaction.
      assert_eq!(tx.query_all::<Contact>()?.len(), 2);
      assert!(tx.get_contact(adam)?.is_some());
      Ok((arnold, adam))
    })
    .await
    .unwrap();

  assert_ne!(arnold, adam);
  assert_eq!(s.list_contacts().await.unwrap().len(), 2);
  assert_eq!(s.list_emails().await.unwrap().len(), 1);
  assert_eq!(s.list_phones().await.unwrap().len(), 2);
}

#[tokio::test]
async fn aborted_transaction_leaves_no_writes() {
  let s = store().await;
  s.add_contact(NewContact::new("Existing", "Person")).await.unwrap();

  let before = s.list_contacts().await.unwrap().to_vec();
  let emails_before = s.list_emails().await.unwrap().to_vec();

  let err = s
    .run_transaction(&[Table::Contacts, Table::Emails], |tx| {
      let id = tx.add_contact(NewContact::new("Half", "Written"))?;
      tx.add_email(NewEmail::new(id, "home", "half@example.com"))?;
      Err::<(), _>(Error::aborted("changed my mind"))
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Aborted(_)));

  assert_eq!(s.list_contacts().await.unwrap().to_vec(), before);
  assert_eq!(s.list_emails().await.unwrap().to_vec(), emails_before);
}

#[tokio::test]
async fn failing_write_rolls_back_earlier_writes() {
  let s = store().await;

  let err = s
    .run_transaction(&[Table::Contacts], |tx| {
      tx.add_contact(NewContact::new("Good", "Row"))?;
      tx.add_contact(NewContact::new("", "Bad"))
    })
    .await
    .unwrap_err();
  assert!(err.is_constraint_error());
  assert!(s.list_contacts().await.unwrap().is_empty());
}

#[tokio::test]
async fn out_of_scope_table_fails_and_rolls_back() {
  let s = store().await;

  let err = s
    .run_transaction(&[Table::Contacts], |tx| {
      let id = tx.add_contact(NewContact::new("Arnold", "Fitzgerald"))?;
      tx.add_email(NewEmail::new(id, "home", "arnold@email.com"))
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::TableNotInScope(Table::Emails)));
  assert!(s.list_contacts().await.unwrap().is_empty());

  let err = s
    .run_transaction(&[Table::Emails], |tx| tx.query_all::<Phone>())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::TableNotInScope(Table::Phones)));
}

#[tokio::test]
async fn concurrent_transactions_do_not_interleave() {
  let s = store().await;

  let mut handles = Vec::new();
  for i in 0..8 {
    let s = s.clone();
    handles.push(tokio::spawn(async move {
      s.run_transaction(&[Table::Contacts, Table::Emails], move |tx| {
        let id = tx.add_contact(NewContact::new(format!("P{i}"), "X"))?;
        tx.add_email(NewEmail::new(id, "home", format!("p{i}@example.com")))?;
        Ok(id)
      })
      .await
    }));
  }
  for h in handles {
    h.await.unwrap().unwrap();
  }

  // Each email references the contact created in the same transaction.
  let contacts = s.list_contacts().await.unwrap();
  let emails = s.list_emails().await.unwrap();
  assert_eq!(contacts.len(), 8);
  for email in &emails {
    let owner = contacts.iter().find(|c| c.id == email.contact_id).unwrap();
    assert_eq!(email.email, format!("{}@example.com", owner.first_name.to_lowercase()));
  }
}

// ─── Snapshots & observers ───────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_is_point_in_time() {
  let s = store().await;
  s.add_contact(NewContact::new("A", "A")).await.unwrap();

  let snap = s.query_all::<Contact>().await.unwrap();
  s.add_contact(NewContact::new("B", "B")).await.unwrap();

  assert_eq!(snap.iter().count(), 1);
  assert_eq!(snap.iter().count(), 1);
  assert_eq!(s.query_all::<Contact>().await.unwrap().len(), 2);
}

#[tokio::test]
async fn observer_starts_with_current_rows() {
  let s = store().await;
  s.add_contact(NewContact::new("Arnold", "Fitzgerald")).await.unwrap();

  let obs = s.observe::<Contact>().await.unwrap();
  assert_eq!(obs.current().len(), 1);
  assert_eq!(obs.current().as_slice()[0].first_name, "Arnold");
}

#[tokio::test]
async fn observer_receives_each_commit() {
  let s = store().await;
  let mut obs = s.observe::<Contact>().await.unwrap();
  assert!(obs.current().is_empty());
  let start = obs.current().seq();

  s.add_contact(NewContact::new("Arnold", "Fitzgerald")).await.unwrap();
  let snap = obs.changed().await.unwrap();
  assert_eq!(snap.len(), 1);
  assert!(snap.seq() > start);

  s.add_contact(NewContact::new("Adam", "Tensta")).await.unwrap();
  let next = obs.changed().await.unwrap();
  assert_eq!(next.len(), 2);
  assert!(next.seq() > snap.seq());
}

#[tokio::test]
async fn back_to_back_commits_deliver_the_newest_state() {
  let s = store().await;
  let mut obs = s.observe::<Contact>().await.unwrap();

  s.add_contact(NewContact::new("A", "A")).await.unwrap();
  s.add_contact(NewContact::new("B", "B")).await.unwrap();
  s.add_contact(NewContact::new("C", "C")).await.unwrap();

  let snap = obs.changed().await.unwrap();
  assert_eq!(snap.len(), 3);
  assert_eq!(snap.seq(), obs.current().seq());
}

#[tokio::test]
async fn observers_ignore_rollbacks_and_other_tables() {
  let s = store().await;
  let contacts = s.observe::<Contact>().await.unwrap();
  let emails = s.observe::<Email>().await.unwrap();
  let contacts_seq = contacts.current().seq();
  let emails_seq = emails.current().seq();

  let _ = s
    .run_transaction(&[Table::Contacts], |tx| {
      tx.add_contact(NewContact::new("Never", "Seen"))?;
      Err::<(), _>(Error::aborted("rollback"))
    })
    .await;
  assert_eq!(contacts.current().seq(), contacts_seq);

  s.add_contact(NewContact::new("Arnold", "Fitzgerald")).await.unwrap();
  assert!(contacts.current().seq() > contacts_seq);
  assert_eq!(contacts.current().len(), 1);
  assert_eq!(emails.current().seq(), emails_seq);
}

#[tokio::test]
async fn late_observer_is_not_stale() {
  let s = store().await;
  let early = s.observe::<Contact>().await.unwrap();
  drop(early);

  // No live observers while these commit.
  s.add_contact(NewContact::new("A", "A")).await.unwrap();
  s.add_contact(NewContact::new("B", "B")).await.unwrap();

  let late = s.observe::<Contact>().await.unwrap();
  assert_eq!(late.current().len(), 2);
}

#[tokio::test]
async fn observer_ends_when_store_is_dropped() {
  let s = store().await;
  let mut obs = s.observe::<Phone>().await.unwrap();
  drop(s);
  assert!(obs.changed().await.is_none());
}

// ─── Schema versions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn upgrade_preserves_existing_rows() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("rolodex.db");

  let old = SqliteStore::open_with_schema(&path, BASE_ONLY).await.unwrap();
  assert_eq!(old.schema_version(), 1);
  let id = old.add_contact(NewContact::new("Arnold", "Fitzgerald")).await.unwrap();
  old.add_email(NewEmail::new(id, "home", "arnold@email.com")).await.unwrap();

  // Extended fields cannot be written under the base layout.
  let mut extended = NewContact::new("Jane", "Doe");
  extended.power = Some(3.0);
  let err = old.add_contact(extended.clone()).await.unwrap_err();
  assert!(matches!(err, Error::UndeclaredColumn { column: "power", .. }));

  let old_contacts = old.list_contacts().await.unwrap().to_vec();
  let old_emails = old.list_emails().await.unwrap().to_vec();
  old.close().await.unwrap();

  let new = SqliteStore::open_with_schema(&path, SCHEMA_VERSIONS).await.unwrap();
  assert_eq!(new.schema_version(), 2);

  let contacts = new.list_contacts().await.unwrap().to_vec();
  assert_eq!(contacts, old_contacts);
  assert_eq!(contacts[0].middle_name, None);
  assert_eq!(contacts[0].power, None);
  assert_eq!(contacts[0].agreed, None);
  assert_eq!(new.list_emails().await.unwrap().to_vec(), old_emails);

  let jane = new.add_contact(extended).await.unwrap();
  assert_eq!(new.get_contact(jane).await.unwrap().unwrap().power, Some(3.0));
}

#[tokio::test]
async fn reopening_is_idempotent() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("rolodex.db");

  let first = SqliteStore::open(&path).await.unwrap();
  first.add_contact(NewContact::new("Arnold", "Fitzgerald")).await.unwrap();
  first.close().await.unwrap();

  let second = SqliteStore::open(&path).await.unwrap();
  assert_eq!(second.schema_version(), 2);
  assert_eq!(second.list_contacts().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_opens_upgrade_once() {
  let dir = tempfile::tempdir().unwrap();

  for round in 0..20 {
    let path = dir.path().join(format!("shared-{round}.db"));

    let base = SqliteStore::open_with_schema(&path, BASE_ONLY).await.unwrap();
    base.add_contact(NewContact::new("Arnold", "Fitzgerald")).await.unwrap();
    base.close().await.unwrap();

    let (a, b) = tokio::join!(SqliteStore::open(&path), SqliteStore::open(&path));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.schema_version(), 2);
    assert_eq!(b.schema_version(), 2);

    // Both handles see the upgraded rows and each other's writes.
    assert_eq!(a.list_contacts().await.unwrap().len(), 1);
    let mut jane = NewContact::new("Jane", "Doe");
    jane.power = Some(4.0);
    let id = a.add_contact(jane).await.unwrap();
    assert_eq!(b.get_contact(id).await.unwrap().unwrap().power, Some(4.0));

    a.close().await.unwrap();
    b.close().await.unwrap();
  }
}

#[tokio::test]
async fn newer_stored_version_is_refused() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("future.db");

  SqliteStore::open(&path).await.unwrap().close().await.unwrap();

  let err = SqliteStore::open_with_schema(&path, BASE_ONLY).await.err().unwrap();
  assert!(err.is_schema_error());
  assert!(matches!(err, Error::UnsupportedSchemaVersion { stored: 2, declared: 1 }));
}

#[tokio::test]
async fn non_additive_declaration_is_refused() {
  const REVERSED: &[SchemaVersion] = &[EXTENDED_VERSION, BASE_VERSION];
  let err = SqliteStore::open_in_memory_with_schema(REVERSED).await.err().unwrap();
  assert!(err.is_schema_error());
}

#[tokio::test]
async fn closed_store_rejects_calls() {
  let s = store().await;
  let other = s.clone();
  s.close().await.unwrap();

  let err = other.list_contacts().await.unwrap_err();
  assert!(matches!(err, Error::Database(_)));
}
