use thiserror::Error;

use crate::models::EntryId;

#[derive(Error, Debug)]
pub enum SpendscanError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pending entry not found: {0}")]
    NotFound(EntryId),

    #[error("Ledger write failed: {0}")]
    Ledger(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown rule: {0}")]
    UnknownRule(i64),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Tag storage error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Recognition failed: {0}")]
    Recognition(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl SpendscanError {
    /// Queue or ledger write failures. The candidate is still pending and the
    /// caller may retry.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Db(_) | Self::Io(_) | Self::Ledger(_))
    }
}

pub type Result<T> = std::result::Result<T, SpendscanError>;
