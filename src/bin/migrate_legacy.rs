//! A utility for assigning records from a pre-account database to a user.
//!
//! Databases created before user accounts existed hold categories and
//! expenses with no owner; those rows are invisible to the application until
//! a user adopts them. This tool hands all of them to the given user in one
//! transaction and can be re-run safely.

use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use spendbook::{Store, user::UserID};

/// Assign ownerless legacy records to a registered user.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The ID of the user who should own the legacy records.
    #[arg(long)]
    user_id: i64,
}

fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    validate_db_path(db_path);

    let store = Store::open(db_path)?;
    let user_id = UserID::new(args.user_id);

    let user = match store.get_user(user_id) {
        Ok(user) => user,
        Err(error) => {
            eprintln!("Could not load user {user_id}: {error}");
            exit(1);
        }
    };
    println!("Migrating ownerless records to {} (ID {})", user.username, user.id);

    let summary = store.migrate_ownerless(user_id)?;

    if summary.is_noop() {
        println!("Nothing to migrate.");
    } else {
        println!("Done: {summary}.");
    }

    Ok(())
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer().pretty().with_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            ),
        )
        .init();
}

fn validate_db_path(db_path: &Path) {
    match db_path.extension() {
        None => {
            eprintln!("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if !db_path.is_file() {
        eprintln!("File does not exist at {db_path:#?}!");
        exit(1);
    }
}
