use rusqlite::{Connection, TransactionBehavior};
use tracing::{info, warn};

use crate::error::Result;
use crate::ledger::{Ledger, LedgerInsert};
use crate::models::{EntryId, LedgerTransaction};
use crate::queue::{self, ResolveAction, Resolution};

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed(LedgerTransaction),
    Rejected(EntryId),
}

/// Moves resolved queue entries into the ledger.
///
/// Queue removal and ledger insertion share one IMMEDIATE transaction. If the
/// ledger refuses the record the transaction rolls back and the entry is still
/// pending, ready for a retry.
pub struct CommitService<L: Ledger> {
    ledger: L,
    default_account: String,
}

impl<L: Ledger> CommitService<L> {
    pub fn new(ledger: L, default_account: impl Into<String>) -> Self {
        Self {
            ledger,
            default_account: default_account.into(),
        }
    }

    pub fn commit(
        &self,
        conn: &mut Connection,
        entry_id: EntryId,
        action: ResolveAction,
        account: Option<&str>,
    ) -> Result<CommitOutcome> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let candidate = match queue::resolve_in(&tx, entry_id, action)? {
            Resolution::Rejected(id) => {
                tx.commit()?;
                info!(entry_id = id, "entry rejected");
                return Ok(CommitOutcome::Rejected(id));
            }
            Resolution::Finalized(candidate) => candidate,
        };

        let account = account
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(self.default_account.as_str());
        let record = LedgerInsert {
            entry_id,
            date: candidate.date,
            amount: candidate.amount,
            currency: &candidate.currency,
            description: &candidate.description,
            category: candidate.category.as_deref(),
            tags: &candidate.tags,
            necessity: candidate.necessity,
            account,
            source: &candidate.source,
            original_description: &candidate.raw_text,
        };

        let committed = match self.ledger.insert(&tx, &record) {
            Ok(t) => t,
            Err(e) => {
                warn!(entry_id, error = %e, "ledger insert failed, entry left pending");
                return Err(e);
            }
        };
        tx.commit()?;
        info!(
            entry_id,
            ledger_id = committed.id,
            amount = %committed.amount,
            account,
            "committed"
        );
        Ok(CommitOutcome::Committed(committed))
    }
}
