use chrono::NaiveDate;
use rusqlite::{Connection, Transaction};
use rust_decimal::Decimal;

use spendscan::db::{get_connection, init_db};
use spendscan::ledger::{list_transactions, LedgerInsert};
use spendscan::models::{LedgerTransaction, Necessity};
use spendscan::queue;
use spendscan::{
    import_scan, scan_lines, CandidateStatus, CommitOutcome, CommitService, EditFields, ImportConfig,
    Ledger, ResolveAction, RulesEngine, ScanInput, SpendscanError, SqliteLedger,
};

fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("spendscan.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}

fn scan(lines: &[&str], image: &str) -> ScanInput {
    ScanInput::new(
        lines.iter().map(|l| l.to_string()).collect(),
        NaiveDate::from_ymd_opt(2024, 4, 20).unwrap(),
        image,
    )
}

struct OfflineLedger;

impl Ledger for OfflineLedger {
    fn insert(&self, _tx: &Transaction<'_>, _record: &LedgerInsert<'_>) -> spendscan::Result<LedgerTransaction> {
        Err(SpendscanError::Ledger("connection refused".into()))
    }
}

#[test]
fn screenshot_to_ledger() {
    let (_dir, mut conn) = test_db();
    let mut rules = RulesEngine::load(&conn).unwrap();
    rules.add_rule(&conn, "supermercato", "Groceries", 0).unwrap();

    let result = import_scan(
        &mut conn,
        &scan(
            &[
                "Movimenti",
                "Ven 12 aprile",
                "Supermercato Rossi",
                "-45,30 €",
                "Stipendio",
                "Accredito",
                "+1.200,00 €",
                "Bar",
            ],
            "april.png",
        ),
        &mut rules,
        &ImportConfig::default(),
    )
    .unwrap();
    assert_eq!(result.entry_ids.len(), 2);
    assert_eq!(result.report.incomplete_pairings(), 1);

    let pending = queue::list(&conn, None).unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].candidate.date, NaiveDate::from_ymd_opt(2024, 4, 12).unwrap());
    assert_eq!(pending[0].candidate.category.as_deref(), Some("Groceries"));
    assert_eq!(pending[1].candidate.description, "Stipendio Accredito");
    assert_eq!(pending[1].candidate.amount, Decimal::new(120000, 2));

    let service = CommitService::new(SqliteLedger, "Cash");
    let first = service
        .commit(&mut conn, pending[0].id, ResolveAction::Confirm, None)
        .unwrap();
    assert!(matches!(first, CommitOutcome::Committed(_)));
    let second = service
        .commit(&mut conn, pending[1].id, ResolveAction::Reject, None)
        .unwrap();
    assert_eq!(second, CommitOutcome::Rejected(pending[1].id));

    assert!(queue::list(&conn, None).unwrap().is_empty());
    let ledger = list_transactions(&conn, None).unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].amount, Decimal::new(-4530, 2));
    assert_eq!(ledger[0].category.as_deref(), Some("Groceries"));
    assert_eq!(ledger[0].source, "ocr");
}

#[test]
fn correction_teaches_next_scan() {
    let (_dir, mut conn) = test_db();
    let mut rules = RulesEngine::load(&conn).unwrap();
    let config = ImportConfig::default();

    let first = import_scan(
        &mut conn,
        &scan(&["Farmacia Centrale", "-12,90"], "a.png"),
        &mut rules,
        &config,
    )
    .unwrap();
    let id = first.entry_ids[0];
    assert_eq!(queue::get(&conn, id).unwrap().candidate.category, None);

    let service = CommitService::new(SqliteLedger, "Cash");
    let fields = EditFields {
        category: Some("Health".into()),
        ..Default::default()
    };
    let CommitOutcome::Committed(t) = service
        .commit(&mut conn, id, ResolveAction::EditAndConfirm(fields), None)
        .unwrap()
    else {
        panic!("expected a committed transaction");
    };
    let learned = rules.learn(&conn, &t.description, "Health").unwrap().unwrap();
    assert_eq!(learned.pattern, "farmacia");

    // A fresh engine sees the persisted rule.
    let mut reloaded = RulesEngine::load(&conn).unwrap();
    let second = import_scan(
        &mut conn,
        &scan(&["FARMACIA ROSSI", "-5,00"], "b.png"),
        &mut reloaded,
        &config,
    )
    .unwrap();
    let entry = queue::get(&conn, second.entry_ids[0]).unwrap();
    assert_eq!(entry.candidate.category.as_deref(), Some("Health"));
    assert_eq!(entry.candidate.category_confidence, 0.75);
}

#[test]
fn necessity_and_tags_reach_the_ledger() {
    let (_dir, mut conn) = test_db();
    let mut rules = RulesEngine::load(&conn).unwrap();
    let utilities = rules.add_rule(&conn, "enel", "Utilities", 0).unwrap();
    rules.set_necessity(&conn, utilities.id, Some(Necessity::Need)).unwrap();
    rules.add_tag_rule(&conn, "enel", "#casa").unwrap();

    let result = import_scan(
        &mut conn,
        &scan(&["Enel Energia luce", "-80,00 €", "Cinema Odeon", "-9,50 €"], "bills.png"),
        &mut rules,
        &ImportConfig::default(),
    )
    .unwrap();
    let bill = queue::get(&conn, result.entry_ids[0]).unwrap().candidate;
    assert_eq!(bill.tags, vec!["casa", "luce"]);
    assert_eq!(bill.necessity, Necessity::Need);
    let cinema = queue::get(&conn, result.entry_ids[1]).unwrap().candidate;
    assert!(cinema.tags.is_empty());
    assert_eq!(cinema.necessity, Necessity::Want);

    let service = CommitService::new(SqliteLedger, "Cash");
    service
        .commit(&mut conn, result.entry_ids[0], ResolveAction::Confirm, None)
        .unwrap();
    let fields = EditFields {
        tags: Some(vec!["svago".into()]),
        ..Default::default()
    };
    service
        .commit(&mut conn, result.entry_ids[1], ResolveAction::EditAndConfirm(fields), None)
        .unwrap();

    let ledger = list_transactions(&conn, None).unwrap();
    let bill = ledger.iter().find(|t| t.description == "Enel Energia luce").unwrap();
    assert_eq!(bill.category.as_deref(), Some("Utilities"));
    assert_eq!(bill.tags, vec!["casa", "luce"]);
    assert_eq!(bill.necessity, Necessity::Need);
    let cinema = ledger.iter().find(|t| t.description == "Cinema Odeon").unwrap();
    assert_eq!(cinema.tags, vec!["svago"]);
    assert_eq!(cinema.necessity, Necessity::Want);
}

#[test]
fn ledger_outage_keeps_entry_pending() {
    let (_dir, mut conn) = test_db();
    let mut rules = RulesEngine::load(&conn).unwrap();
    let result = import_scan(
        &mut conn,
        &scan(&["12/04", "Supermercato Rossi", "-45,30"], "a.png"),
        &mut rules,
        &ImportConfig::default(),
    )
    .unwrap();
    let id = result.entry_ids[0];

    let err = CommitService::new(OfflineLedger, "Cash")
        .commit(&mut conn, id, ResolveAction::Confirm, None)
        .unwrap_err();
    assert!(err.is_persistence());

    let pending = queue::list(&conn, None).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].candidate.status, CandidateStatus::Pending);
    assert!(list_transactions(&conn, None).unwrap().is_empty());
}

#[test]
fn resolved_entry_cannot_be_resolved_again() {
    let (_dir, mut conn) = test_db();
    let mut rules = RulesEngine::load(&conn).unwrap();
    let result = import_scan(
        &mut conn,
        &scan(&["Bar", "-2,50"], "a.png"),
        &mut rules,
        &ImportConfig::default(),
    )
    .unwrap();
    let id = result.entry_ids[0];
    let err = queue::resolve(&mut conn, id, ResolveAction::Confirm).unwrap_err();
    assert!(matches!(err, SpendscanError::InvalidAction(_)));
    queue::resolve(&mut conn, id, ResolveAction::Reject).unwrap();
    let err = CommitService::new(SqliteLedger, "Cash")
        .commit(&mut conn, id, ResolveAction::Confirm, None)
        .unwrap_err();
    assert!(matches!(err, SpendscanError::NotFound(x) if x == id));
}

#[test]
fn noisy_scan_never_yields_zero_amounts() {
    let input = scan(
        &[
            "Saldo disponibile",
            "1.234,56 €",
            "Oggi",
            "Rimborso spese",
            "0,00",
            "-0,00",
            "~8,5O €",
            "14:32",
            "€",
            "Conad",
            "Totale",
            "-22,10",
        ],
        "noisy.png",
    );
    let report = scan_lines(&input, &RulesEngine::default(), &ImportConfig::default());
    assert!(report.candidates.iter().all(|c| !c.amount.is_zero()));
    assert_eq!(
        report,
        scan_lines(&input, &RulesEngine::default(), &ImportConfig::default())
    );
    let first = &report.candidates[0];
    assert_eq!(first.description, "Rimborso spese");
    assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 4, 20).unwrap());
    assert_eq!(first.amount, Decimal::new(-850, 2));
}
