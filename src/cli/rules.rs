use comfy_table::{Cell, Table};

use spendscan::error::Result;
use spendscan::rules::RulesEngine;

use super::{open_db, parse_necessity};

pub fn add(db: Option<&str>, pattern: &str, category: &str, priority: i64, necessity: Option<&str>) -> Result<()> {
    let necessity = necessity.map(parse_necessity).transpose()?;
    let conn = open_db(db)?;
    let mut rules = RulesEngine::load(&conn)?;
    let mut rule = rules.add_rule(&conn, pattern, category, priority)?;
    if necessity.is_some() {
        rule = rules.set_necessity(&conn, rule.id, necessity)?;
    }
    println!("Added rule {}: '{}' \u{2192} {}", rule.id, rule.pattern, rule.category);
    Ok(())
}

pub fn add_tag(db: Option<&str>, pattern: &str, tag: &str) -> Result<()> {
    let conn = open_db(db)?;
    let mut rules = RulesEngine::load(&conn)?;
    let rule = rules.add_tag_rule(&conn, pattern, tag)?;
    println!("Added tag rule {}: '{}' \u{2192} #{}", rule.id, rule.pattern, rule.tag);
    Ok(())
}

pub fn list(db: Option<&str>) -> Result<()> {
    let conn = open_db(db)?;
    let rules = RulesEngine::load(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Pattern", "Category", "Priority", "Learned", "Need", "Hits"]);
    for rule in rules.rules() {
        table.add_row(vec![
            Cell::new(rule.id),
            Cell::new(&rule.pattern),
            Cell::new(&rule.category),
            Cell::new(rule.priority),
            Cell::new(if rule.learned { "yes" } else { "" }),
            Cell::new(rule.necessity.map_or("", |n| n.as_str())),
            Cell::new(rule.hit_count),
        ]);
    }
    println!("Rules\n{table}");

    if !rules.tag_rules().is_empty() {
        let mut tags = Table::new();
        tags.set_header(vec!["ID", "Pattern", "Tag"]);
        for rule in rules.tag_rules() {
            tags.add_row(vec![
                Cell::new(rule.id),
                Cell::new(&rule.pattern),
                Cell::new(format!("#{}", rule.tag)),
            ]);
        }
        println!("Tag rules\n{tags}");
    }
    Ok(())
}

pub fn delete(db: Option<&str>, id: i64) -> Result<()> {
    let conn = open_db(db)?;
    let mut rules = RulesEngine::load(&conn)?;
    let rule = rules.remove_rule(&conn, id)?;
    println!("Deleted rule {id}: '{}' \u{2192} {}", rule.pattern, rule.category);
    Ok(())
}

pub fn delete_tag(db: Option<&str>, id: i64) -> Result<()> {
    let conn = open_db(db)?;
    let mut rules = RulesEngine::load(&conn)?;
    let rule = rules.remove_tag_rule(&conn, id)?;
    println!("Deleted tag rule {id}: '{}' \u{2192} #{}", rule.pattern, rule.tag);
    Ok(())
}
