//! Tags each cleaned line as a date, an amount, a description or noise.
//!
//! Every line is classified on its own; the pairing stage decides what the
//! sequence means. A line that looks like both an amount and a date (`12.04`)
//! is an amount unless a weekday or month name marks it as a date.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalizer::CleanLine;

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<sign>[+-])?(?P<pre>[€$£])?(?P<int>\d{1,3}(?:[.,']\d{3})+|\d+)[.,](?P<dec>\d{2})(?P<post>[€$£])?$",
    )
    .unwrap()
});
static SLASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?$").unwrap());
static DOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})(?:\.(\d{4}|\d{2}))?$").unwrap());
static DASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})$").unwrap());
static ISO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap());
static NAMED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\s+(\p{L}+)\.?(?:\s+(\d{4}))?$").unwrap());
/// Day header followed by that day's total, as some banking apps render it.
static NAMED_WITH_TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\s+(\p{L}+)\.?(?:\s+(\d{4}))?\s+(\S.*)$").unwrap()
});
static MONTH_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\p{L}+)\s+\d{4}$").unwrap());

const WEEKDAYS: &[&str] = &[
    "lunedì", "lunedi", "lun", "martedì", "martedi", "mar", "mercoledì", "mercoledi", "mer",
    "giovedì", "giovedi", "gio", "venerdì", "venerdi", "ven", "sabato", "sab", "domenica", "dom",
    "monday", "mon", "tuesday", "tue", "tues", "wednesday", "wed", "thursday", "thu", "thur",
    "thurs", "friday", "fri", "saturday", "sat", "sunday", "sun",
];

const MONTHS: &[(&str, u32)] = &[
    ("gennaio", 1), ("gen", 1), ("january", 1), ("jan", 1),
    ("febbraio", 2), ("feb", 2), ("february", 2),
    ("marzo", 3), ("mar", 3), ("march", 3),
    ("aprile", 4), ("apr", 4), ("april", 4),
    ("maggio", 5), ("mag", 5), ("may", 5),
    ("giugno", 6), ("giu", 6), ("june", 6), ("jun", 6),
    ("luglio", 7), ("lug", 7), ("july", 7), ("jul", 7),
    ("agosto", 8), ("ago", 8), ("august", 8), ("aug", 8),
    ("settembre", 9), ("set", 9), ("september", 9), ("sept", 9), ("sep", 9),
    ("ottobre", 10), ("ott", 10), ("october", 10), ("oct", 10),
    ("novembre", 11), ("nov", 11), ("november", 11),
    ("dicembre", 12), ("dic", 12), ("december", 12), ("dec", 12),
];

const TODAY_WORDS: &[&str] = &["oggi", "today"];
const YESTERDAY_WORDS: &[&str] = &["ieri", "yesterday"];

pub const DEFAULT_NOISE_TERMS: &[&str] = &[
    "transazioni", "movimenti", "totale", "spese", "entrate", "uscite", "saldo", "disponibile",
    "contabile", "transactions", "total", "balance", "expenses", "spending",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePattern {
    /// `12/04`, `12/04/24`, `12/04/2024`
    DayMonthSlash,
    /// `12.04`, `12.04.2024`
    DayMonthDot,
    /// `12-04-2024`
    DayMonthYearDash,
    /// `2024-04-12`
    Iso,
    /// `7 feb`, `7 febbraio 2025`
    DayMonthName,
    /// `oggi`, `ieri`, `today`, `yesterday`
    Relative,
}

impl DatePattern {
    pub const ALL: &'static [DatePattern] = &[
        DatePattern::DayMonthSlash,
        DatePattern::DayMonthDot,
        DatePattern::DayMonthYearDash,
        DatePattern::Iso,
        DatePattern::DayMonthName,
        DatePattern::Relative,
    ];
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub date_patterns: Vec<DatePattern>,
    pub noise_terms: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            date_patterns: DatePattern::ALL.to_vec(),
            noise_terms: DEFAULT_NOISE_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanContext {
    pub scan_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountToken {
    /// Absolute value.
    pub value: Decimal,
    /// Only set when the line carried an explicit `+` or `-`.
    pub sign: Option<Sign>,
    /// ISO code derived from an attached currency symbol.
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Date(NaiveDate),
    Amount(AmountToken),
    Description,
    Noise,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub position: usize,
    pub text: String,
    pub class: LineClass,
}

enum DateMatch {
    NoMatch,
    /// Date-shaped but not a calendar date, e.g. `31/02`.
    Invalid,
    Valid(NaiveDate),
}

fn currency_code(symbol: &str) -> Option<String> {
    match symbol {
        "€" => Some("EUR".to_string()),
        "$" => Some("USD".to_string()),
        "£" => Some("GBP".to_string()),
        _ => None,
    }
}

fn month_number(word: &str) -> Option<u32> {
    MONTHS.iter().find(|(name, _)| *name == word).map(|(_, m)| *m)
}

fn bare_word(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}

fn is_date_marker(token: &str) -> bool {
    let word = bare_word(token);
    WEEKDAYS.contains(&word)
        || month_number(word).is_some()
        || TODAY_WORDS.contains(&word)
        || YESTERDAY_WORDS.contains(&word)
}

fn parse_amount(body: &str) -> Option<AmountToken> {
    let caps = AMOUNT_RE.captures(body)?;
    let int_digits: String = caps["int"].chars().filter(|c| c.is_ascii_digit()).collect();
    let value = Decimal::from_str(&format!("{int_digits}.{}", &caps["dec"])).ok()?;
    let sign = caps.name("sign").map(|s| {
        if s.as_str() == "-" {
            Sign::Negative
        } else {
            Sign::Positive
        }
    });
    let currency = caps
        .name("pre")
        .or_else(|| caps.name("post"))
        .and_then(|c| currency_code(c.as_str()));
    Some(AmountToken {
        value,
        sign,
        currency,
    })
}

/// Builds a date from parts. A missing year comes from the scan date and is
/// moved back a year when that would put the date after the scan.
fn infer_date(day: u32, month: u32, year: Option<i32>, scan_date: NaiveDate) -> Option<NaiveDate> {
    match year {
        Some(y) => {
            let y = if y < 100 { 2000 + y } else { y };
            NaiveDate::from_ymd_opt(y, month, day)
        }
        None => {
            let this_year = NaiveDate::from_ymd_opt(scan_date.year(), month, day)?;
            if this_year > scan_date {
                NaiveDate::from_ymd_opt(scan_date.year() - 1, month, day).or(Some(this_year))
            } else {
                Some(this_year)
            }
        }
    }
}

fn num<T: FromStr>(caps: &Captures<'_>, idx: usize) -> Option<T> {
    caps.get(idx).and_then(|m| m.as_str().parse().ok())
}

fn to_match(date: Option<NaiveDate>) -> DateMatch {
    match date {
        Some(d) => DateMatch::Valid(d),
        None => DateMatch::Invalid,
    }
}

fn match_date(lower: &str, ctx: &ScanContext, patterns: &[DatePattern]) -> DateMatch {
    // An optional leading weekday: "lun 12.04", "Monday, 7 February".
    let mut rest = lower;
    if let Some((first, tail)) = lower.split_once(char::is_whitespace) {
        if WEEKDAYS.contains(&bare_word(first)) {
            rest = tail.trim_start();
        }
    }

    for pattern in patterns {
        match pattern {
            DatePattern::DayMonthSlash | DatePattern::DayMonthDot => {
                let re = if *pattern == DatePattern::DayMonthSlash { &SLASH_RE } else { &DOT_RE };
                if let Some(caps) = re.captures(rest) {
                    let date = match (num(&caps, 1), num(&caps, 2)) {
                        (Some(d), Some(m)) => infer_date(d, m, num(&caps, 3), ctx.scan_date),
                        _ => None,
                    };
                    return to_match(date);
                }
            }
            DatePattern::DayMonthYearDash => {
                if let Some(caps) = DASH_RE.captures(rest) {
                    let date = match (num(&caps, 1), num(&caps, 2), num(&caps, 3)) {
                        (Some(d), Some(m), Some(y)) => NaiveDate::from_ymd_opt(y, m, d),
                        _ => None,
                    };
                    return to_match(date);
                }
            }
            DatePattern::Iso => {
                if let Some(caps) = ISO_RE.captures(rest) {
                    let date = match (num(&caps, 1), num(&caps, 2), num(&caps, 3)) {
                        (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y, m, d),
                        _ => None,
                    };
                    return to_match(date);
                }
            }
            DatePattern::DayMonthName => {
                if let Some(caps) = NAMED_RE.captures(rest) {
                    let Some(month) = month_number(&caps[2]) else {
                        continue;
                    };
                    let date = num(&caps, 1)
                        .and_then(|d| infer_date(d, month, num(&caps, 3), ctx.scan_date));
                    return to_match(date);
                }
                if let Some(caps) = NAMED_WITH_TOTAL_RE.captures(rest) {
                    let total: String = caps[4].split_whitespace().collect();
                    if let (Some(month), Some(_)) = (month_number(&caps[2]), parse_amount(&total)) {
                        // The daily total is not a transaction; keep only the date.
                        let date = num(&caps, 1)
                            .and_then(|d| infer_date(d, month, num(&caps, 3), ctx.scan_date));
                        return to_match(date);
                    }
                }
            }
            DatePattern::Relative => {
                let word = bare_word(rest);
                if TODAY_WORDS.contains(&word) {
                    return DateMatch::Valid(ctx.scan_date);
                }
                if YESTERDAY_WORDS.contains(&word) {
                    return DateMatch::Valid(ctx.scan_date - Duration::days(1));
                }
            }
        }
    }
    DateMatch::NoMatch
}

fn is_noise(lower: &str, noise_terms: &[String]) -> bool {
    if let Some(caps) = MONTH_HEADER_RE.captures(lower) {
        if month_number(&caps[1]).is_some() {
            return true;
        }
    }
    let mut saw_term = false;
    for token in lower.split_whitespace() {
        let word = bare_word(token);
        if word.is_empty() || !word.chars().any(char::is_alphabetic) {
            continue;
        }
        if noise_terms.iter().any(|t| t == word) {
            saw_term = true;
        } else {
            return false;
        }
    }
    saw_term
}

/// Classifies one cleaned line.
pub fn classify_line(text: &str, ctx: &ScanContext, config: &ClassifierConfig) -> LineClass {
    if !text.chars().any(char::is_alphanumeric) {
        return LineClass::Noise;
    }
    let lower = text.to_lowercase();

    let tokens: Vec<&str> = lower.split_whitespace().collect();
    let has_marker = tokens.iter().any(|t| is_date_marker(t));
    let amount_body = tokens
        .iter()
        .filter(|t| !is_date_marker(t))
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let amount = parse_amount(&amount_body);
    let date = match_date(&lower, ctx, &config.date_patterns);

    match (amount, date) {
        (Some(amount), DateMatch::Valid(date)) => {
            if has_marker {
                debug!(line = text, "amount/date tie resolved as date (context marker)");
                LineClass::Date(date)
            } else {
                debug!(line = text, "amount/date tie resolved as amount");
                LineClass::Amount(amount)
            }
        }
        (Some(amount), _) => LineClass::Amount(amount),
        (None, DateMatch::Valid(date)) => LineClass::Date(date),
        (None, DateMatch::Invalid) => {
            debug!(line = text, "date-shaped line is not a calendar date");
            LineClass::Noise
        }
        (None, DateMatch::NoMatch) => {
            if is_noise(&lower, &config.noise_terms) {
                LineClass::Noise
            } else {
                LineClass::Description
            }
        }
    }
}

/// Classifies a scan's lines. Output has the same length and order as the input.
pub fn classify_lines(
    lines: &[CleanLine],
    ctx: &ScanContext,
    config: &ClassifierConfig,
) -> Vec<ClassifiedLine> {
    lines
        .iter()
        .map(|line| ClassifiedLine {
            position: line.position,
            text: line.text.clone(),
            class: classify_line(&line.text, ctx, config),
        })
        .collect()
}
