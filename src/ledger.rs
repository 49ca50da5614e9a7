//! The ledger boundary.
//!
//! Committed transactions live behind the [`Ledger`] trait. The SQLite
//! implementation writes into the same database as the pending queue so the
//! commit service can move an entry across in one transaction.

use chrono::NaiveDate;
use rusqlite::{Connection, Transaction};
use rust_decimal::Decimal;

use crate::db::{decimal_at, necessity_at, tags_at, tags_to_text};
use crate::error::{Result, SpendscanError};
use crate::models::{EntryId, LedgerTransaction, Necessity, TransactionKind};

/// Everything the ledger needs to record a confirmed candidate.
#[derive(Debug, Clone)]
pub struct LedgerInsert<'a> {
    pub entry_id: EntryId,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub currency: &'a str,
    pub description: &'a str,
    pub category: Option<&'a str>,
    pub tags: &'a [String],
    pub necessity: Necessity,
    pub account: &'a str,
    pub source: &'a str,
    pub original_description: &'a str,
}

pub trait Ledger {
    /// Records a transaction as part of the caller's unit of work. An error
    /// must leave nothing behind once `tx` is rolled back.
    fn insert(&self, tx: &Transaction<'_>, record: &LedgerInsert<'_>) -> Result<LedgerTransaction>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteLedger;

impl Ledger for SqliteLedger {
    fn insert(&self, tx: &Transaction<'_>, record: &LedgerInsert<'_>) -> Result<LedgerTransaction> {
        let kind = TransactionKind::from_amount(record.amount);
        let tags = tags_to_text(record.tags)?;
        tx.execute(
            "INSERT INTO ledger_transactions (entry_id, date, amount, currency, description, \
             category, account, kind, source, original_description, tags, necessity) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                record.entry_id,
                record.date,
                record.amount.to_string(),
                record.currency,
                record.description,
                record.category,
                record.account,
                kind.as_str(),
                record.source,
                record.original_description,
                tags,
                record.necessity.as_str(),
            ],
        )
        .map_err(|e| SpendscanError::Ledger(e.to_string()))?;

        Ok(LedgerTransaction {
            id: tx.last_insert_rowid(),
            entry_id: Some(record.entry_id),
            date: record.date,
            amount: record.amount,
            currency: record.currency.to_string(),
            description: record.description.to_string(),
            category: record.category.map(str::to_string),
            tags: record.tags.to_vec(),
            necessity: record.necessity,
            account: record.account.to_string(),
            kind,
            source: record.source.to_string(),
            original_description: record.original_description.to_string(),
        })
    }
}

/// Committed transactions, newest date first.
pub fn list_transactions(conn: &Connection, limit: Option<usize>) -> Result<Vec<LedgerTransaction>> {
    let limit = limit.map_or(-1, |n| n as i64);
    let mut stmt = conn.prepare(
        "SELECT id, entry_id, date, amount, currency, description, category, account, \
         source, original_description, tags, necessity \
         FROM ledger_transactions ORDER BY date DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit], |row| {
            let amount = decimal_at(row, 3)?;
            Ok(LedgerTransaction {
                id: row.get(0)?,
                entry_id: row.get(1)?,
                date: row.get(2)?,
                amount,
                currency: row.get(4)?,
                description: row.get(5)?,
                category: row.get(6)?,
                tags: tags_at(row, 10)?,
                necessity: necessity_at(row, 11)?,
                account: row.get(7)?,
                kind: TransactionKind::from_amount(amount),
                source: row.get(8)?,
                original_description: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
