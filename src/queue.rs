use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::db::{decimal_at, necessity_at, tags_at, tags_to_text};
use crate::error::{Result, SpendscanError};
use crate::models::{normalize_tags, CandidateStatus, CandidateTransaction, EntryId, Necessity, PendingEntry};

const ENTRY_COLUMNS: &str = "id, date, description, amount, currency, category, \
     category_confidence, source, source_image_ref, raw_text, status, created_at, tags, necessity";

/// Corrections applied by EDIT_AND_CONFIRM. Unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditFields {
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub category: Option<String>,
    /// Replaces the tag set; an empty list clears it.
    pub tags: Option<Vec<String>>,
    pub necessity: Option<Necessity>,
}

impl EditFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveAction {
    Confirm,
    EditAndConfirm(EditFields),
    Reject,
}

impl ResolveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::EditAndConfirm(_) => "edit",
            Self::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Rejected(EntryId),
    /// The candidate to hand to the ledger, status CONFIRMED or EDITED.
    Finalized(CandidateTransaction),
}

#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    pub source_image_ref: Option<String>,
    /// Case-insensitive substring of the description.
    pub description_contains: Option<String>,
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<PendingEntry> {
    let raw_status: String = row.get(10)?;
    let status = CandidateStatus::parse(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            10,
            Type::Text,
            format!("unknown status {raw_status:?}").into(),
        )
    })?;
    let id: EntryId = row.get(0)?;
    Ok(PendingEntry {
        id,
        source_image_ref: row.get(8)?,
        created_at: row.get(11)?,
        candidate: CandidateTransaction {
            id: Some(id),
            date: row.get(1)?,
            description: row.get(2)?,
            amount: decimal_at(row, 3)?,
            currency: row.get(4)?,
            category: row.get(5)?,
            category_confidence: row.get(6)?,
            tags: tags_at(row, 12)?,
            necessity: necessity_at(row, 13)?,
            source: row.get(7)?,
            status,
            raw_text: row.get(9)?,
        },
    })
}

/// Stages a candidate for review and returns its entry id.
pub fn enqueue(conn: &Connection, candidate: &CandidateTransaction, source_image_ref: &str) -> Result<EntryId> {
    if candidate.amount.is_zero() {
        return Err(SpendscanError::InvalidAmount(format!(
            "'{}' has a zero amount",
            candidate.description
        )));
    }
    let tags = tags_to_text(&normalize_tags(&candidate.tags))?;
    conn.execute(
        "INSERT INTO pending_entries (date, description, amount, currency, category, \
         category_confidence, source, source_image_ref, raw_text, tags, necessity, status) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'pending')",
        rusqlite::params![
            candidate.date,
            candidate.description,
            candidate.amount.to_string(),
            candidate.currency,
            candidate.category,
            candidate.category_confidence,
            candidate.source,
            source_image_ref,
            candidate.raw_text,
            tags,
            candidate.necessity.as_str(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(id, description = %candidate.description, amount = %candidate.amount, "enqueued");
    Ok(id)
}

/// Pending entries in creation order.
pub fn list(conn: &Connection, filter: Option<&QueueFilter>) -> Result<Vec<PendingEntry>> {
    let (image, search) = match filter {
        Some(f) => (f.source_image_ref.as_deref(), f.description_contains.as_deref()),
        None => (None, None),
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM pending_entries \
         WHERE (?1 IS NULL OR source_image_ref = ?1) \
           AND (?2 IS NULL OR instr(lower(description), lower(?2)) > 0) \
         ORDER BY id"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![image, search], entry_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get(conn: &Connection, id: EntryId) -> Result<PendingEntry> {
    conn.query_row(
        &format!("SELECT {ENTRY_COLUMNS} FROM pending_entries WHERE id = ?1"),
        [id],
        entry_from_row,
    )
    .optional()?
    .ok_or(SpendscanError::NotFound(id))
}

fn apply_edit(candidate: &mut CandidateTransaction, fields: EditFields) -> Result<()> {
    if let Some(amount) = fields.amount {
        if amount.is_zero() {
            return Err(SpendscanError::InvalidAmount("amount cannot be zero".into()));
        }
        candidate.amount = amount;
    }
    if let Some(description) = fields.description {
        let description = description.trim();
        if description.is_empty() {
            return Err(SpendscanError::Other("description cannot be empty".into()));
        }
        candidate.description = description.to_string();
    }
    if let Some(currency) = fields.currency {
        let currency = currency.trim();
        if currency.is_empty() {
            return Err(SpendscanError::Other("currency cannot be empty".into()));
        }
        candidate.currency = currency.to_uppercase();
    }
    if let Some(date) = fields.date {
        candidate.date = date;
    }
    if let Some(category) = fields.category {
        let category = category.trim();
        candidate.category = (!category.is_empty()).then(|| category.to_string());
        // A human choice is certain.
        candidate.category_confidence = 1.0;
    }
    if let Some(tags) = fields.tags {
        candidate.tags = normalize_tags(&tags);
    }
    if let Some(necessity) = fields.necessity {
        candidate.necessity = necessity;
    }
    Ok(())
}

/// Resolves an entry inside a caller-owned transaction.
///
/// The entry row is removed with a conditional delete; if another writer got
/// there first the call fails with `NotFound`. Nothing is written when the
/// edit is invalid.
pub fn resolve_in(tx: &Transaction<'_>, id: EntryId, action: ResolveAction) -> Result<Resolution> {
    let entry = get(tx, id)?;
    let label = action.as_str();
    let mut candidate = entry.candidate;

    let resolution = match action {
        ResolveAction::Reject => {
            candidate.status = CandidateStatus::Rejected;
            Resolution::Rejected(id)
        }
        ResolveAction::Confirm => {
            candidate.status = CandidateStatus::Confirmed;
            Resolution::Finalized(candidate)
        }
        ResolveAction::EditAndConfirm(fields) => {
            apply_edit(&mut candidate, fields)?;
            candidate.status = CandidateStatus::Edited;
            Resolution::Finalized(candidate)
        }
    };

    let removed = tx.execute("DELETE FROM pending_entries WHERE id = ?1", [id])?;
    if removed != 1 {
        return Err(SpendscanError::NotFound(id));
    }
    tx.execute(
        "INSERT INTO queue_resolutions (entry_id, action) VALUES (?1, ?2)",
        rusqlite::params![id, label],
    )?;
    debug!(id, action = label, "entry resolved");
    Ok(resolution)
}

/// Rejects an entry exactly once.
///
/// Only REJECT is final on its own. CONFIRM and EDIT_AND_CONFIRM must go
/// through [`CommitService`](crate::commit::CommitService) so the ledger
/// write shares the transaction; here they fail with `InvalidAction` (or
/// `NotFound` for an unknown id) and the entry is left untouched.
pub fn resolve(conn: &mut Connection, id: EntryId, action: ResolveAction) -> Result<Resolution> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if action != ResolveAction::Reject {
        get(&tx, id)?;
        return Err(SpendscanError::InvalidAction(format!(
            "{} of entry {id} needs the commit service",
            action.as_str()
        )));
    }
    let resolution = resolve_in(&tx, id, action)?;
    tx.commit()?;
    Ok(resolution)
}
