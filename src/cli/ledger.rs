use colored::Colorize;
use comfy_table::{Cell, Table};

use spendscan::error::Result;
use spendscan::fmt::money;
use spendscan::ledger::list_transactions;

use super::open_db;
use super::queue::hashtags;

pub fn list(db: Option<&str>, limit: Option<usize>) -> Result<()> {
    let conn = open_db(db)?;
    let rows = list_transactions(&conn, limit)?;
    if rows.is_empty() {
        println!("No committed transactions.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Amount", "Category", "Tags", "Need", "Account", "Kind"]);
    for t in &rows {
        let amount = money(t.amount, &t.currency);
        let amount = if t.amount.is_sign_negative() {
            amount.red()
        } else {
            amount.green()
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.date),
            Cell::new(&t.description),
            Cell::new(amount),
            Cell::new(t.category.as_deref().unwrap_or("-")),
            Cell::new(hashtags(&t.tags)),
            Cell::new(t.necessity.as_str()),
            Cell::new(&t.account),
            Cell::new(t.kind.as_str()),
        ]);
    }
    println!("Ledger\n{table}");
    Ok(())
}
