use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use colored::Colorize;
use comfy_table::{Cell, Table};

use spendscan::error::Result;
use spendscan::fmt::money;
use spendscan::importer::import_scan;
use spendscan::models::ScanInput;
use spendscan::recognizer::{recognize_in_background, LazyRecognizer, TextFileRecognizer};
use spendscan::rules::RulesEngine;
use spendscan::settings::load_settings;

use super::{open_db, parse_date};

pub fn run(db: Option<&str>, file: &str, date: Option<&str>, image: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let scan_date = match date {
        Some(d) => parse_date(d)?,
        None => Local::now().date_naive(),
    };
    let image_ref = match image {
        Some(i) => i.to_string(),
        None => Path::new(file)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.to_string()),
    };

    let recognizer = Arc::new(LazyRecognizer::new(|| Ok(TextFileRecognizer)));
    let lines = recognize_in_background(recognizer, file)?.wait()?;

    let mut conn = open_db(db)?;
    let mut rules = RulesEngine::load(&conn)?;
    let input = ScanInput::new(lines, scan_date, image_ref);
    let result = import_scan(&mut conn, &input, &mut rules, &settings.import_config())?;

    if result.duplicate_scan {
        println!("This scan has already been imported (duplicate checksum).");
        return Ok(());
    }

    if !result.report.candidates.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["ID", "Date", "Description", "Amount", "Category"]);
        for c in &result.report.candidates {
            let amount = money(c.amount, &c.currency);
            let amount = if c.amount.is_sign_negative() {
                amount.red()
            } else {
                amount.green()
            };
            table.add_row(vec![
                Cell::new(c.id.map(|id| id.to_string()).unwrap_or_default()),
                Cell::new(c.date),
                Cell::new(&c.description),
                Cell::new(amount),
                Cell::new(c.category.as_deref().unwrap_or("-")),
            ]);
        }
        println!("{table}");
    }

    println!(
        "{} queued for review, {} fragments dropped",
        result.entry_ids.len(),
        result.report.incomplete_pairings()
    );
    Ok(())
}
