//! Smart Import pipeline for a personal finance tracker.
//!
//! Recognized screenshot text goes through [`normalizer`], [`classifier`] and
//! [`pairing`] to become candidate transactions, which [`rules`] categorizes and tags
//! and [`queue`] stages for review. [`commit`] moves a confirmed entry into the
//! [`ledger`] atomically.

pub mod classifier;
pub mod commit;
pub mod db;
pub mod error;
pub mod fmt;
pub mod importer;
pub mod ledger;
pub mod models;
pub mod normalizer;
pub mod pairing;
pub mod queue;
pub mod recognizer;
pub mod rules;
pub mod settings;

pub use commit::{CommitOutcome, CommitService};
pub use error::{Result, SpendscanError};
pub use importer::{import_scan, scan_lines, ImportConfig, ImportResult, ScanReport};
pub use ledger::{Ledger, SqliteLedger};
pub use models::{CandidateStatus, CandidateTransaction, EntryId, Necessity, PendingEntry, Rule, ScanInput, TagRule};
pub use queue::{EditFields, QueueFilter, Resolution, ResolveAction};
pub use rules::RulesEngine;
