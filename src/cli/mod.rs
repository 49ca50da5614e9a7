pub mod init;
pub mod ledger;
pub mod queue;
pub mod rules;
pub mod scan;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use spendscan::db::{get_connection, init_db, DB_FILE};
use spendscan::error::{Result, SpendscanError};
use spendscan::models::Necessity;
use spendscan::settings::get_data_dir;

/// Opens the database named by `--db`, or the one in the configured data directory.
pub(crate) fn open_db(db: Option<&str>) -> Result<Connection> {
    let path = match db {
        Some(p) => PathBuf::from(p),
        None => get_data_dir().join(DB_FILE),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            return Err(SpendscanError::Other(format!(
                "No database directory at {}. Run `spendscan init` first.",
                parent.display()
            )));
        }
    }
    let conn = get_connection(&path)?;
    init_db(&conn)?;
    Ok(conn)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| SpendscanError::Other(format!("Invalid date '{raw}', expected YYYY-MM-DD")))
}

pub(crate) fn parse_necessity(raw: &str) -> Result<Necessity> {
    Necessity::parse(raw)
        .ok_or_else(|| SpendscanError::Other(format!("Invalid necessity '{raw}', expected need or want")))
}

#[derive(Parser)]
#[command(
    name = "spendscan",
    about = "Turn recognized bank-screenshot text into reviewed ledger transactions."
)]
pub struct Cli {
    /// Database file (default: <data_dir>/spendscan.db)
    #[arg(long, global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for spendscan data (default: ~/Documents/spendscan)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import the recognized text of one screenshot into the review queue.
    Scan {
        /// Text file with one recognized line per line
        file: String,
        /// Day the screenshot was taken, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Reference to the source image (default: the file name)
        #[arg(long)]
        image: Option<String>,
    },
    /// Review pending entries.
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Manage categorization rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Show committed transactions.
    Ledger {
        /// Show at most this many rows
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List pending entries.
    List {
        /// Only entries from this image
        #[arg(long)]
        image: Option<String>,
        /// Only entries whose description contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Confirm an entry and commit it to the ledger.
    Confirm {
        id: i64,
        /// Ledger account (default from settings)
        #[arg(long)]
        account: Option<String>,
        /// Set the category; also teaches the rules engine
        #[arg(long)]
        category: Option<String>,
    },
    /// Correct an entry, then commit it.
    Edit {
        id: i64,
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Signed amount, e.g. -45.30
        #[arg(long, allow_hyphen_values = true)]
        amount: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Replace the tags (repeatable; `--tag ""` clears them)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// need or want
        #[arg(long)]
        necessity: Option<String>,
        #[arg(long)]
        account: Option<String>,
    },
    /// Discard an entry.
    Reject { id: i64 },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a categorization rule.
    Add {
        /// Text to look for in descriptions (case-insensitive)
        pattern: String,
        /// Category to assign
        #[arg(long)]
        category: String,
        /// Higher wins; must be 0 or more
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        priority: i64,
        /// Mark matches as need or want
        #[arg(long)]
        necessity: Option<String>,
    },
    /// Add a tagging rule.
    Tag {
        /// Text to look for in descriptions (case-insensitive)
        pattern: String,
        /// Tag to add, with or without a leading #
        #[arg(long)]
        tag: String,
    },
    /// List rules in evaluation order, then tagging rules.
    List,
    /// Delete a rule by ID.
    Delete { id: i64 },
    /// Delete a tagging rule by ID.
    DeleteTag { id: i64 },
}
