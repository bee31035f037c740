//! `rolodex`: command-line front end for the Rolodex contact store.
//!
//! Reads `rolodex.toml` (or the path given with `--config`) and `ROLODEX_*`
//! environment variables, opens the store once, runs one command and closes
//! the store again.
//!
//! # Usage
//!
//! ```text
//! rolodex seed
//! rolodex add --first-name Arnold --last-name Fitzgerald --email home=arnold@email.com
//! rolodex list emails
//! rolodex watch contacts
//! ```

mod seed;
mod submit;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use rolodex_core::{
  contact::{Contact, Email, Phone},
  store::ContactStore,
  table::{Snapshot, Table},
};
use rolodex_store_sqlite::{SqliteStore, StoredRecord};
use serde::{Deserialize, Serialize};
use submit::{ContactForm, parse_labelled};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Rolodex contact store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "rolodex.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Clear every table and insert sample contacts.
  Seed,
  /// Validate a contact and store it with its emails and phones.
  Add(AddArgs),
  /// Print every row of a table as JSON lines.
  List {
    #[arg(default_value = "contacts")]
    table: Table,
  },
  /// Print one contact with its emails and phones.
  Show { id: i64 },
  /// Delete one contact. Its emails and phones are kept.
  Delete { id: i64 },
  /// Print a table, then print it again after every change until Ctrl-C.
  Watch {
    #[arg(default_value = "contacts")]
    table: Table,
  },
}

#[derive(Args)]
struct AddArgs {
  #[arg(long)]
  first_name:  Option<String>,
  #[arg(long)]
  last_name:   Option<String>,
  #[arg(long)]
  middle_name: Option<String>,
  /// 0 to 10.
  #[arg(long)]
  power:       Option<String>,
  #[arg(long)]
  agreed:      Option<String>,
  /// Validate against the extended form regardless of configuration.
  #[arg(long)]
  extended:    bool,
  /// `TYPE=ADDRESS`; may be repeated.
  #[arg(long = "email", value_name = "TYPE=ADDRESS", value_parser = parse_labelled)]
  emails:      Vec<(String, String)>,
  /// `TYPE=NUMBER`; may be repeated.
  #[arg(long = "phone", value_name = "TYPE=NUMBER", value_parser = parse_labelled)]
  phones:      Vec<(String, String)>,
}

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Settings {
  store_path:    PathBuf,
  /// Validate `add` against the extended contact form.
  extended_form: bool,
}

fn load_settings(path: PathBuf) -> anyhow::Result<Settings> {
  config::Config::builder()
    .set_default("store_path", "rolodex.db")?
    .set_default("extended_form", false)?
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("ROLODEX"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise Settings")
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = load_settings(cli.config)?;

  let store_path = expand_tilde(&settings.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let result = run(&store, &settings, cli.command).await;
  store.close().await.context("failed to close store")?;
  result
}

async fn run(store: &SqliteStore, settings: &Settings, command: Command) -> anyhow::Result<()> {
  match command {
    Command::Seed => seed::seed(store).await?,

    Command::Add(args) => {
      let resolver = submit::resolver(args.extended || settings.extended_form);
      let form = ContactForm {
        first_name:  args.first_name,
        last_name:   args.last_name,
        middle_name: args.middle_name,
        power:       args.power,
        agreed:      args.agreed,
        emails:      args.emails,
        phones:      args.phones,
      };
      let id = submit::submit(store, &resolver, form).await?;
      println!("{id}");
    }

    Command::List { table } => match table {
      Table::Contacts => print_rows(&store.list_contacts().await?)?,
      Table::Emails => print_rows(&store.list_emails().await?)?,
      Table::Phones => print_rows(&store.list_phones().await?)?,
    },

    Command::Show { id } => {
      let contact = store
        .get_contact(id)
        .await?
        .with_context(|| format!("no contact with id {id}"))?;
      let view = serde_json::json!({
        "contact": contact,
        "emails":  store.emails_of(id).await?,
        "phones":  store.phones_of(id).await?,
      });
      println!("{}", serde_json::to_string_pretty(&view)?);
    }

    Command::Delete { id } => {
      if !store.delete_contact(id).await? {
        anyhow::bail!("no contact with id {id}");
      }
      tracing::info!(id, "contact deleted");
    }

    Command::Watch { table } => match table {
      Table::Contacts => watch::<Contact>(store).await?,
      Table::Emails => watch::<Email>(store).await?,
      Table::Phones => watch::<Phone>(store).await?,
    },
  }
  Ok(())
}

fn print_rows<R: Serialize>(rows: &Snapshot<R>) -> anyhow::Result<()> {
  for row in rows {
    println!("{}", serde_json::to_string(row)?);
  }
  Ok(())
}

async fn watch<R: StoredRecord + Serialize>(store: &SqliteStore) -> anyhow::Result<()> {
  let mut observer = store.observe::<R>().await?;
  print_rows(&observer.current())?;

  loop {
    tokio::select! {
      next = observer.changed() => match next {
        Some(snapshot) => {
          println!("-- {} @ {}", R::TABLE, snapshot.seq());
          print_rows(&snapshot)?;
        }
        None => break,
      },
      _ = tokio::signal::ctrl_c() => break,
    }
  }
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
