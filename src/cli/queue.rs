use std::str::FromStr;

use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;
use rust_decimal::Decimal;

use spendscan::commit::{CommitOutcome, CommitService};
use spendscan::error::{Result, SpendscanError};
use spendscan::fmt::money;
use spendscan::ledger::SqliteLedger;
use spendscan::queue::{self, EditFields, QueueFilter, ResolveAction};
use spendscan::rules::RulesEngine;
use spendscan::settings::load_settings;

use super::{open_db, parse_date, parse_necessity};

/// Raw `queue edit` flags.
pub struct EditArgs {
    pub date: Option<String>,
    pub description: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub necessity: Option<String>,
}

impl EditArgs {
    fn into_fields(self) -> Result<EditFields> {
        let date = self.date.as_deref().map(parse_date).transpose()?;
        let amount = self
            .amount
            .as_deref()
            .map(|a| {
                Decimal::from_str(a.trim())
                    .map_err(|_| SpendscanError::InvalidAmount(format!("'{a}' is not a number")))
            })
            .transpose()?;
        let necessity = self.necessity.as_deref().map(parse_necessity).transpose()?;
        Ok(EditFields {
            date,
            description: self.description,
            amount,
            currency: self.currency,
            category: self.category,
            tags: (!self.tags.is_empty()).then_some(self.tags),
            necessity,
        })
    }
}

pub(crate) fn hashtags(tags: &[String]) -> String {
    tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" ")
}

pub fn list(db: Option<&str>, image: Option<&str>, search: Option<&str>) -> Result<()> {
    let conn = open_db(db)?;
    let filter = QueueFilter {
        source_image_ref: image.map(str::to_string),
        description_contains: search.map(str::to_string),
    };
    let entries = queue::list(&conn, Some(&filter))?;
    if entries.is_empty() {
        println!("No pending entries.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Amount", "Category", "Tags", "Need", "Image"]);
    for entry in &entries {
        let c = &entry.candidate;
        let amount = money(c.amount, &c.currency);
        let amount = if c.amount.is_sign_negative() {
            amount.red()
        } else {
            amount.green()
        };
        let category = match &c.category {
            Some(cat) => format!("{cat} ({:.0}%)", c.category_confidence * 100.0),
            None => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(entry.id),
            Cell::new(c.date),
            Cell::new(&c.description),
            Cell::new(amount),
            Cell::new(category),
            Cell::new(hashtags(&c.tags)),
            Cell::new(c.necessity.as_str()),
            Cell::new(&entry.source_image_ref),
        ]);
    }
    println!("Pending review ({})\n{table}", entries.len());
    Ok(())
}

fn commit_and_learn(
    conn: &mut Connection,
    id: i64,
    action: ResolveAction,
    account: Option<&str>,
    taught_category: Option<&str>,
) -> Result<()> {
    let settings = load_settings();
    let service = CommitService::new(SqliteLedger, settings.default_account);
    let CommitOutcome::Committed(t) = service.commit(conn, id, action, account)? else {
        return Ok(());
    };
    println!(
        "Committed #{id} \u{2192} {} {} [{}]",
        t.description,
        money(t.amount, &t.currency),
        t.account
    );

    if let Some(category) = taught_category.filter(|c| !c.trim().is_empty()) {
        let mut rules = RulesEngine::load(conn)?;
        if let Some(rule) = rules.learn(conn, &t.description, category)? {
            println!("Learned rule: '{}' \u{2192} {}", rule.pattern, rule.category);
        }
    }
    Ok(())
}

pub fn confirm(db: Option<&str>, id: i64, account: Option<&str>, category: Option<&str>) -> Result<()> {
    let mut conn = open_db(db)?;
    let action = match category {
        Some(cat) => ResolveAction::EditAndConfirm(EditFields {
            category: Some(cat.to_string()),
            ..Default::default()
        }),
        None => ResolveAction::Confirm,
    };
    commit_and_learn(&mut conn, id, action, account, category)
}

pub fn edit(db: Option<&str>, id: i64, args: EditArgs, account: Option<&str>) -> Result<()> {
    let mut conn = open_db(db)?;
    let category = args.category.clone();
    let fields = args.into_fields()?;
    if fields.is_empty() {
        return Err(SpendscanError::Other(
            "Nothing to edit; use `queue confirm` to accept as is".into(),
        ));
    }
    commit_and_learn(&mut conn, id, ResolveAction::EditAndConfirm(fields), account, category.as_deref())
}

pub fn reject(db: Option<&str>, id: i64) -> Result<()> {
    let mut conn = open_db(db)?;
    queue::resolve(&mut conn, id, ResolveAction::Reject)?;
    println!("Rejected #{id}");
    Ok(())
}
