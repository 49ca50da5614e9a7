use std::cmp::Ordering;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Result, SpendscanError};
use crate::models::{normalize_tags, CandidateTransaction, Necessity, Rule, TagRule};

/// Priority tier of learned rules; user-authored priorities start at 0.
pub const LEARNED_PRIORITY: i64 = -1;

pub const USER_RULE_CONFIDENCE: f64 = 1.0;
pub const LEARNED_RULE_CONFIDENCE: f64 = 0.75;

const MIN_TOKEN_CHARS: usize = 3;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "from", "with", "via", "del", "della", "dello", "delle", "dei", "degli",
    "per", "con", "sul", "sulla", "nel", "nella", "alla", "allo", "agli", "alle", "una", "uno",
    "pagamento", "carta", "pos", "bonifico", "addebito", "acquisto", "operazione", "payment",
    "card", "purchase", "srl", "spa", "ltd", "inc",
];

/// Words that tag a candidate on their own, without any stored tag rule.
pub const AUTO_TAG_KEYWORDS: &[&str] = &["luce", "gas", "internet", "taxi", "uber", "amazon"];

/// Strict total order: priority desc, pattern length desc, insertion order.
fn rule_order(a: &Rule, b: &Rule) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.pattern.chars().count().cmp(&a.pattern.chars().count()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Longest non-trivial word of a description, lowercased. Earliest wins ties.
pub fn significant_token(description: &str) -> Option<String> {
    let mut best: Option<String> = None;
    for word in description.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        let len = word.chars().count();
        if len < MIN_TOKEN_CHARS
            || !word.chars().any(char::is_alphabetic)
            || STOPWORDS.contains(&word.as_str())
        {
            continue;
        }
        if best.as_ref().map_or(true, |b| len > b.chars().count()) {
            best = Some(word);
        }
    }
    best
}

fn confidence_of(rule: &Rule) -> f64 {
    if rule.learned {
        LEARNED_RULE_CONFIDENCE
    } else {
        USER_RULE_CONFIDENCE
    }
}

fn keyword_tags(description: &str) -> impl Iterator<Item = &'static str> + '_ {
    let words: Vec<String> = description
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .collect();
    AUTO_TAG_KEYWORDS
        .iter()
        .copied()
        .filter(move |k| words.iter().any(|w| w == k))
}

/// Keyword rules that categorize and tag candidates. Category rules are kept
/// in evaluation order, tag rules in insertion order; both are written
/// through to the database on every change.
#[derive(Debug, Default)]
pub struct RulesEngine {
    rules: Vec<Rule>,
    tag_rules: Vec<TagRule>,
}

impl RulesEngine {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare(
            "SELECT id, pattern, category, priority, learned, hit_count, necessity FROM rules",
        )?;
        let rules = stmt
            .query_map([], |row| {
                let necessity: Option<String> = row.get(6)?;
                Ok(Rule {
                    id: row.get(0)?,
                    pattern: row.get(1)?,
                    category: row.get(2)?,
                    priority: row.get(3)?,
                    learned: row.get::<_, i64>(4)? != 0,
                    hit_count: row.get(5)?,
                    necessity: necessity.as_deref().and_then(Necessity::parse),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare("SELECT id, pattern, tag FROM tag_rules ORDER BY id")?;
        let tag_rules = stmt
            .query_map([], |row| {
                Ok(TagRule {
                    id: row.get(0)?,
                    pattern: row.get(1)?,
                    tag: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut engine = Self { rules, tag_rules };
        engine.rules.sort_by(rule_order);
        Ok(engine)
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn tag_rules(&self) -> &[TagRule] {
        &self.tag_rules
    }

    pub fn first_match(&self, description: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.matches(description))
    }

    /// Category and confidence for a candidate; `(None, 0.0)` when no rule matches.
    pub fn classify(&self, candidate: &CandidateTransaction) -> (Option<String>, f64) {
        match self.first_match(&candidate.description) {
            Some(rule) => (Some(rule.category.clone()), confidence_of(rule)),
            None => (None, 0.0),
        }
    }

    /// Tags earned by a description: every matching tag rule plus the
    /// built-in keywords, normalized.
    pub fn tags_for(&self, description: &str) -> Vec<String> {
        let mut tags: Vec<&str> = self
            .tag_rules
            .iter()
            .filter(|r| r.matches(description))
            .map(|r| r.tag.as_str())
            .collect();
        tags.extend(keyword_tags(description).map(|k| -> &str { k }));
        normalize_tags(&tags)
    }

    /// Annotates candidates in place with category, necessity and tags.
    /// Returns the ids of the category rules that fired.
    pub fn categorize(&self, candidates: &mut [CandidateTransaction]) -> Vec<i64> {
        let mut fired = Vec::new();
        for candidate in candidates.iter_mut() {
            if let Some(rule) = self.first_match(&candidate.description) {
                candidate.category = Some(rule.category.clone());
                candidate.category_confidence = confidence_of(rule);
                if let Some(necessity) = rule.necessity {
                    candidate.necessity = necessity;
                }
                fired.push(rule.id);
            }
            let mut tags = std::mem::take(&mut candidate.tags);
            tags.extend(self.tags_for(&candidate.description));
            candidate.tags = normalize_tags(&tags);
        }
        fired
    }

    pub fn record_hits(&mut self, conn: &Connection, rule_ids: &[i64]) -> Result<()> {
        for id in rule_ids {
            conn.execute("UPDATE rules SET hit_count = hit_count + 1 WHERE id = ?1", [id])?;
            if let Some(rule) = self.rules.iter_mut().find(|r| r.id == *id) {
                rule.hit_count += 1;
            }
        }
        Ok(())
    }

    /// Adds a user-authored rule.
    pub fn add_rule(&mut self, conn: &Connection, pattern: &str, category: &str, priority: i64) -> Result<Rule> {
        let pattern = pattern.trim();
        let category = category.trim();
        if pattern.is_empty() {
            return Err(SpendscanError::InvalidRule("pattern is empty".into()));
        }
        if category.is_empty() {
            return Err(SpendscanError::InvalidRule("category is empty".into()));
        }
        if priority < 0 {
            return Err(SpendscanError::InvalidRule(format!(
                "priority {priority} is reserved for learned rules"
            )));
        }
        self.insert(conn, pattern, category, priority, false)
    }

    /// Sets or clears the necessity a rule stamps on the candidates it matches.
    pub fn set_necessity(&mut self, conn: &Connection, id: i64, necessity: Option<Necessity>) -> Result<Rule> {
        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(SpendscanError::UnknownRule(id))?;
        conn.execute(
            "UPDATE rules SET necessity = ?1 WHERE id = ?2",
            rusqlite::params![necessity.map(|n| n.as_str()), id],
        )?;
        rule.necessity = necessity;
        Ok(rule.clone())
    }

    pub fn remove_rule(&mut self, conn: &Connection, id: i64) -> Result<Rule> {
        let idx = self
            .rules
            .iter()
            .position(|r| r.id == id)
            .ok_or(SpendscanError::UnknownRule(id))?;
        conn.execute("DELETE FROM rules WHERE id = ?1", [id])?;
        Ok(self.rules.remove(idx))
    }

    /// Adds a rule that tags matching descriptions with `tag`.
    pub fn add_tag_rule(&mut self, conn: &Connection, pattern: &str, tag: &str) -> Result<TagRule> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(SpendscanError::InvalidRule("pattern is empty".into()));
        }
        let Some(tag) = normalize_tags(&[tag]).into_iter().next() else {
            return Err(SpendscanError::InvalidRule("tag is empty".into()));
        };
        conn.execute(
            "INSERT INTO tag_rules (pattern, tag) VALUES (?1, ?2)",
            rusqlite::params![pattern, tag],
        )?;
        let rule = TagRule {
            id: conn.last_insert_rowid(),
            pattern: pattern.to_string(),
            tag,
        };
        info!(pattern = %rule.pattern, tag = %rule.tag, "tag rule added");
        self.tag_rules.push(rule.clone());
        Ok(rule)
    }

    pub fn remove_tag_rule(&mut self, conn: &Connection, id: i64) -> Result<TagRule> {
        let idx = self
            .tag_rules
            .iter()
            .position(|r| r.id == id)
            .ok_or(SpendscanError::UnknownRule(id))?;
        conn.execute("DELETE FROM tag_rules WHERE id = ?1", [id])?;
        Ok(self.tag_rules.remove(idx))
    }

    /// Learns `category` for `description` from a user correction.
    ///
    /// Does nothing when the rule that classifies `description` already
    /// yields `category`, so learning the same pair twice leaves the rule set
    /// unchanged. Otherwise the longest meaningful word of the description
    /// becomes a learned rule, which always ranks below user-authored rules.
    pub fn learn(&mut self, conn: &Connection, description: &str, category: &str) -> Result<Option<Rule>> {
        let category = category.trim();
        if category.is_empty() {
            return Err(SpendscanError::InvalidRule("category is empty".into()));
        }
        if self
            .first_match(description)
            .is_some_and(|r| r.category == category)
        {
            debug!(description, category, "already classified this way, nothing to learn");
            return Ok(None);
        }

        let Some(token) = significant_token(description) else {
            debug!(description, "no significant token to learn from");
            return Ok(None);
        };

        if let Some(existing) = self
            .rules
            .iter_mut()
            .find(|r| r.learned && r.pattern.eq_ignore_ascii_case(&token))
        {
            if existing.category == category {
                // Outranked by another rule; a second learned rule on the same
                // word would not change that.
                debug!(pattern = %existing.pattern, category, "learned rule already points here");
                return Ok(None);
            }
            conn.execute(
                "UPDATE rules SET category = ?1 WHERE id = ?2",
                rusqlite::params![category, existing.id],
            )?;
            info!(pattern = %existing.pattern, from = %existing.category, to = category, "learned rule re-pointed");
            existing.category = category.to_string();
            return Ok(Some(existing.clone()));
        }

        let rule = self.insert(conn, &token, category, LEARNED_PRIORITY, true)?;
        info!(pattern = %rule.pattern, category, "learned rule");
        Ok(Some(rule))
    }

    fn insert(&mut self, conn: &Connection, pattern: &str, category: &str, priority: i64, learned: bool) -> Result<Rule> {
        conn.execute(
            "INSERT INTO rules (pattern, category, priority, learned) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![pattern, category, priority, learned as i64],
        )?;
        let rule = Rule {
            id: conn.last_insert_rowid(),
            pattern: pattern.to_string(),
            category: category.to_string(),
            priority,
            learned,
            hit_count: 0,
            necessity: None,
        };
        self.rules.push(rule.clone());
        self.rules.sort_by(rule_order);
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::models::CandidateStatus;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn candidate(description: &str) -> CandidateTransaction {
        CandidateTransaction {
            id: None,
            date: NaiveDate::from_ymd_opt(2024, 4, 12).unwrap(),
            description: description.into(),
            amount: Decimal::new(-1000, 2),
            currency: "EUR".into(),
            source: "ocr".into(),
            category: None,
            category_confidence: 0.0,
            tags: Vec::new(),
            necessity: Necessity::Want,
            status: CandidateStatus::Pending,
            raw_text: String::new(),
        }
    }

    fn snapshot(engine: &RulesEngine) -> Vec<(String, String, i64, bool)> {
        engine
            .rules()
            .iter()
            .map(|r| (r.pattern.clone(), r.category.clone(), r.priority, r.learned))
            .collect()
    }

    #[test]
    fn test_contains_rule_is_case_insensitive() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        engine.add_rule(&conn, "ESSELUNGA", "Groceries", 0).unwrap();
        let (cat, conf) = engine.classify(&candidate("esselunga via Roma"));
        assert_eq!(cat.as_deref(), Some("Groceries"));
        assert_eq!(conf, USER_RULE_CONFIDENCE);
    }

    #[test]
    fn test_no_match_returns_none_and_zero() {
        let (_dir, conn) = test_db();
        let engine = RulesEngine::load(&conn).unwrap();
        assert_eq!(engine.classify(&candidate("Random vendor")), (None, 0.0));
    }

    #[test]
    fn test_higher_priority_wins() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        engine.add_rule(&conn, "amazon", "Shopping", 5).unwrap();
        engine.add_rule(&conn, "amazon", "Books", 10).unwrap();
        assert_eq!(engine.classify(&candidate("Amazon EU")).0.as_deref(), Some("Books"));
    }

    #[test]
    fn test_longer_pattern_breaks_priority_tie() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        engine.add_rule(&conn, "amazon", "Shopping", 0).unwrap();
        engine.add_rule(&conn, "amazon prime", "Subscriptions", 0).unwrap();
        assert_eq!(
            engine.classify(&candidate("AMAZON PRIME VIDEO")).0.as_deref(),
            Some("Subscriptions")
        );
    }

    #[test]
    fn test_insertion_order_breaks_remaining_ties() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        engine.add_rule(&conn, "bar", "Eating Out", 0).unwrap();
        engine.add_rule(&conn, "bar", "Coffee", 0).unwrap();
        assert_eq!(engine.classify(&candidate("Bar Centrale")).0.as_deref(), Some("Eating Out"));
    }

    #[test]
    fn test_negative_user_priority_rejected() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        let err = engine.add_rule(&conn, "bar", "Coffee", -1).unwrap_err();
        assert!(matches!(err, SpendscanError::InvalidRule(_)));
        assert!(engine.add_rule(&conn, "  ", "Coffee", 0).is_err());
    }

    #[test]
    fn test_learn_synthesizes_longest_word() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        let rule = engine
            .learn(&conn, "Pagamento POS Supermercato Rossi", "Groceries")
            .unwrap()
            .unwrap();
        assert_eq!(rule.pattern, "supermercato");
        assert!(rule.learned);
        assert_eq!(rule.priority, LEARNED_PRIORITY);
        let (cat, conf) = engine.classify(&candidate("SUPERMERCATO BIANCHI"));
        assert_eq!(cat.as_deref(), Some("Groceries"));
        assert_eq!(conf, LEARNED_RULE_CONFIDENCE);
    }

    #[test]
    fn test_learn_is_idempotent() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        engine.learn(&conn, "Farmacia Centrale", "Health").unwrap();
        let once = snapshot(&engine);
        assert!(engine.learn(&conn, "Farmacia Centrale", "Health").unwrap().is_none());
        assert_eq!(snapshot(&engine), once);
        let count: i64 = conn.query_row("SELECT count(*) FROM rules", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_learn_noop_when_user_rule_already_covers() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        engine.add_rule(&conn, "netflix", "Subscriptions", 0).unwrap();
        assert!(engine.learn(&conn, "NETFLIX.COM", "Subscriptions").unwrap().is_none());
        assert_eq!(engine.rules().len(), 1);
    }

    #[test]
    fn test_user_rule_outranks_learned_regardless_of_order() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        // Learned first, user rule later.
        engine.learn(&conn, "Ristorante Stella", "Restaurants").unwrap();
        engine.add_rule(&conn, "stella", "Travel", 0).unwrap();
        assert_eq!(engine.classify(&candidate("Ristorante Stella")).0.as_deref(), Some("Travel"));

        // User rule first, learned later for a different category.
        let (_dir2, conn2) = test_db();
        let mut engine2 = RulesEngine::load(&conn2).unwrap();
        engine2.add_rule(&conn2, "stella", "Travel", 0).unwrap();
        engine2.learn(&conn2, "Ristorante Stella", "Restaurants").unwrap();
        assert_eq!(engine2.classify(&candidate("Ristorante Stella")).0.as_deref(), Some("Travel"));
    }

    #[test]
    fn test_learn_repoints_existing_learned_rule() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        engine.learn(&conn, "Autogrill", "Eating Out").unwrap();
        let rule = engine.learn(&conn, "Autogrill", "Travel").unwrap().unwrap();
        assert_eq!(rule.category, "Travel");
        assert_eq!(engine.rules().len(), 1);
        let stored: String = conn
            .query_row("SELECT category FROM rules WHERE id = ?1", [rule.id], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, "Travel");
    }

    #[test]
    fn test_learn_when_a_different_rule_wins() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        engine.learn(&conn, "Supermercato Rossi", "Groceries").unwrap();
        engine.learn(&conn, "Esselunga", "Household").unwrap();
        // "supermercato" is the longer pattern and wins, although the
        // "esselunga" rule also matches and carries Household.
        assert_eq!(
            engine.classify(&candidate("Supermercato Esselunga")).0.as_deref(),
            Some("Groceries")
        );

        let learned = engine
            .learn(&conn, "Supermercato Esselunga", "Household")
            .unwrap()
            .unwrap();
        assert_eq!(learned.category, "Household");
        assert_eq!(
            engine.classify(&candidate("Supermercato Esselunga")).0.as_deref(),
            Some("Household")
        );

        let settled = snapshot(&engine);
        assert!(engine
            .learn(&conn, "Supermercato Esselunga", "Household")
            .unwrap()
            .is_none());
        assert_eq!(snapshot(&engine), settled);
    }

    #[test]
    fn test_learn_noop_when_outranked_learned_rule_already_points_there() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        engine.add_rule(&conn, "autogrill", "Travel", 0).unwrap();
        engine.learn(&conn, "Autogrill", "Eating Out").unwrap();
        let before = snapshot(&engine);
        assert!(engine.learn(&conn, "Autogrill", "Eating Out").unwrap().is_none());
        assert_eq!(snapshot(&engine), before);
    }

    #[test]
    fn test_learn_without_usable_token() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        assert!(engine.learn(&conn, "POS 1234", "Other").unwrap().is_none());
        assert!(engine.rules().is_empty());
    }

    #[test]
    fn test_rules_survive_reload_in_order() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        engine.learn(&conn, "Ristorante Stella", "Restaurants").unwrap();
        engine.add_rule(&conn, "bar", "Coffee", 0).unwrap();
        engine.add_rule(&conn, "tabacchi", "Tobacco", 3).unwrap();
        let reloaded = RulesEngine::load(&conn).unwrap();
        assert_eq!(snapshot(&reloaded), snapshot(&engine));
        assert_eq!(reloaded.rules()[0].pattern, "tabacchi");
        assert!(reloaded.rules()[2].learned);
    }

    #[test]
    fn test_categorize_and_record_hits() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        let rule = engine.add_rule(&conn, "coop", "Groceries", 0).unwrap();
        let mut batch = vec![candidate("COOP Lombardia"), candidate("Cinema"), candidate("coop")];
        let fired = engine.categorize(&mut batch);
        assert_eq!(fired, vec![rule.id, rule.id]);
        assert_eq!(batch[0].category.as_deref(), Some("Groceries"));
        assert_eq!(batch[1].category, None);
        engine.record_hits(&conn, &fired).unwrap();
        let hits: i64 = conn.query_row("SELECT hit_count FROM rules", [], |r| r.get(0)).unwrap();
        assert_eq!(hits, 2);
        assert_eq!(engine.rules()[0].hit_count, 2);
    }

    #[test]
    fn test_remove_rule() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        let rule = engine.add_rule(&conn, "coop", "Groceries", 0).unwrap();
        engine.remove_rule(&conn, rule.id).unwrap();
        assert!(engine.rules().is_empty());
        assert!(matches!(
            engine.remove_rule(&conn, rule.id),
            Err(SpendscanError::UnknownRule(_))
        ));
    }

    #[test]
    fn test_significant_token() {
        assert_eq!(significant_token("Pagamento carta Lidl 0042"), Some("lidl".into()));
        assert_eq!(significant_token("Bar Caffè"), Some("caffè".into()));
        assert_eq!(significant_token("ab 12"), None);
    }

    #[test]
    fn test_rule_necessity_applies_on_match() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        let rule = engine.add_rule(&conn, "farmacia", "Health", 0).unwrap();
        engine.add_rule(&conn, "cinema", "Leisure", 0).unwrap();
        engine.set_necessity(&conn, rule.id, Some(Necessity::Need)).unwrap();

        let mut batch = vec![candidate("Farmacia Centrale"), candidate("Cinema Odeon")];
        engine.categorize(&mut batch);
        assert_eq!(batch[0].necessity, Necessity::Need);
        assert_eq!(batch[1].necessity, Necessity::Want);

        let reloaded = RulesEngine::load(&conn).unwrap();
        assert_eq!(reloaded.first_match("farmacia").unwrap().necessity, Some(Necessity::Need));
        assert!(matches!(
            engine.set_necessity(&conn, 99, None),
            Err(SpendscanError::UnknownRule(99))
        ));
    }

    #[test]
    fn test_tag_rules_and_keywords() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        engine.add_tag_rule(&conn, "enel", "#Casa").unwrap();
        engine.add_tag_rule(&conn, "bolletta", "casa").unwrap();

        let mut batch = vec![
            candidate("Enel Energia bolletta luce"),
            candidate("Uber trip"),
            candidate("Gastronomia Pugliese"),
        ];
        let fired = engine.categorize(&mut batch);
        assert!(fired.is_empty());
        assert_eq!(batch[0].tags, vec!["casa", "luce"]);
        assert_eq!(batch[1].tags, vec!["uber"]);
        // Keywords match whole words only.
        assert!(batch[2].tags.is_empty());

        let reloaded = RulesEngine::load(&conn).unwrap();
        assert_eq!(reloaded.tag_rules().len(), 2);
        assert_eq!(reloaded.tag_rules()[0].tag, "casa");
    }

    #[test]
    fn test_categorize_keeps_existing_tags() {
        let (_dir, conn) = test_db();
        let engine = RulesEngine::load(&conn).unwrap();
        let mut batch = vec![candidate("Amazon EU")];
        batch[0].tags = vec!["regali".into()];
        engine.categorize(&mut batch);
        assert_eq!(batch[0].tags, vec!["amazon", "regali"]);
    }

    #[test]
    fn test_tag_rule_validation_and_removal() {
        let (_dir, conn) = test_db();
        let mut engine = RulesEngine::load(&conn).unwrap();
        assert!(matches!(
            engine.add_tag_rule(&conn, "enel", " # "),
            Err(SpendscanError::InvalidRule(_))
        ));
        let rule = engine.add_tag_rule(&conn, "enel", "casa").unwrap();
        engine.remove_tag_rule(&conn, rule.id).unwrap();
        assert!(engine.tag_rules().is_empty());
        assert!(matches!(
            engine.remove_tag_rule(&conn, rule.id),
            Err(SpendscanError::UnknownRule(_))
        ));
    }
}
