use rusqlite::{Connection, TransactionBehavior};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::classifier::{classify_lines, ClassifierConfig, ScanContext};
use crate::error::Result;
use crate::models::{CandidateTransaction, EntryId, ScanInput};
use crate::normalizer::normalize;
use crate::pairing::{pair, PairingConfig, PairingEvent};
use crate::queue;
use crate::rules::RulesEngine;

#[derive(Debug, Clone, Default)]
pub struct ImportConfig {
    pub classifier: ClassifierConfig,
    pub pairing: PairingConfig,
}

/// What one scan produced before anything was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub candidates: Vec<CandidateTransaction>,
    pub events: Vec<PairingEvent>,
    /// Ids of the rules that categorized a candidate, one per hit.
    pub matched_rules: Vec<i64>,
}

impl ScanReport {
    pub fn incomplete_pairings(&self) -> usize {
        self.events.iter().filter(|e| e.is_pairing_incomplete()).count()
    }
}

#[derive(Debug)]
pub struct ImportResult {
    pub entry_ids: Vec<EntryId>,
    pub report: ScanReport,
    /// The same text was imported before; nothing was enqueued.
    pub duplicate_scan: bool,
}

fn scan_checksum(lines: &[String]) -> String {
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Normalizes, classifies, pairs and categorizes one scan. Touches no storage.
pub fn scan_lines(input: &ScanInput, rules: &RulesEngine, config: &ImportConfig) -> ScanReport {
    let clean = normalize(&input.lines);
    let ctx = ScanContext {
        scan_date: input.scan_date,
    };
    let classified = classify_lines(&clean, &ctx, &config.classifier);
    let mut outcome = pair(&classified, input.scan_date, &config.pairing);
    let matched_rules = rules.categorize(&mut outcome.candidates);
    ScanReport {
        candidates: outcome.candidates,
        events: outcome.events,
        matched_rules,
    }
}

/// Runs the pipeline on one scan and stages every candidate for review.
///
/// The enqueues and the scan fingerprint are written in one transaction, so a
/// failed import leaves nothing half-queued.
pub fn import_scan(
    conn: &mut Connection,
    input: &ScanInput,
    rules: &mut RulesEngine,
    config: &ImportConfig,
) -> Result<ImportResult> {
    let mut report = scan_lines(input, rules, config);
    let checksum = scan_checksum(&input.lines);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let seen: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM scans WHERE checksum = ?1)",
        [&checksum],
        |row| row.get(0),
    )?;
    if seen {
        info!(image = %input.image_ref, "scan already imported, skipping");
        return Ok(ImportResult {
            entry_ids: Vec::new(),
            report,
            duplicate_scan: true,
        });
    }

    let mut entry_ids = Vec::with_capacity(report.candidates.len());
    for candidate in report.candidates.iter_mut() {
        let id = queue::enqueue(&tx, candidate, &input.image_ref)?;
        candidate.id = Some(id);
        entry_ids.push(id);
    }
    tx.execute(
        "INSERT INTO scans (image_ref, scan_date, checksum, candidate_count) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![input.image_ref, input.scan_date, checksum, entry_ids.len() as i64],
    )?;
    rules.record_hits(&tx, &report.matched_rules)?;
    tx.commit()?;

    info!(
        image = %input.image_ref,
        queued = entry_ids.len(),
        dropped = report.events.len(),
        "scan imported"
    );
    Ok(ImportResult {
        entry_ids,
        report,
        duplicate_scan: false,
    })
}
