use chrono::NaiveDate;
use rust_decimal::Decimal;

pub type EntryId = i64;

/// Source tag stamped on everything produced by the screenshot pipeline.
pub const OCR_SOURCE: &str = "ocr";

/// One recognized text fragment as handed over by the recognition step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub text: String,
    pub position: usize,
    pub image_ref: String,
}

/// Everything the pipeline needs to process one scanned image.
#[derive(Debug, Clone)]
pub struct ScanInput {
    pub lines: Vec<String>,
    pub scan_date: NaiveDate,
    pub image_ref: String,
}

impl ScanInput {
    pub fn new(lines: Vec<String>, scan_date: NaiveDate, image_ref: impl Into<String>) -> Self {
        Self {
            lines,
            scan_date,
            image_ref: image_ref.into(),
        }
    }

    pub fn raw_lines(&self) -> Vec<RawLine> {
        self.lines
            .iter()
            .enumerate()
            .map(|(position, text)| RawLine {
                text: text.clone(),
                position,
                image_ref: self.image_ref.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateStatus {
    Pending,
    Confirmed,
    Rejected,
    Edited,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Edited => "edited",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "rejected" => Some(Self::Rejected),
            "edited" => Some(Self::Edited),
            _ => None,
        }
    }
}

/// Whether a spend was essential. Untouched candidates count as `Want`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Necessity {
    Need,
    #[default]
    Want,
}

impl Necessity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Need => "Need",
            Self::Want => "Want",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "need" => Some(Self::Need),
            "want" => Some(Self::Want),
            _ => None,
        }
    }
}

/// Lowercases tags, strips `#`, splits on commas and whitespace, then sorts
/// and dedups.
pub fn normalize_tags<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut tags: Vec<String> = raw
        .iter()
        .flat_map(|t| {
            t.as_ref()
                .replace('#', "")
                .replace(',', " ")
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
        })
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// A pipeline-produced transaction awaiting human review.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTransaction {
    /// Queue-assigned id; `None` until the candidate is enqueued.
    pub id: Option<EntryId>,
    pub date: NaiveDate,
    pub description: String,
    /// Signed, never zero.
    pub amount: Decimal,
    pub currency: String,
    pub source: String,
    pub category: Option<String>,
    pub category_confidence: f64,
    /// Normalized, sorted, no duplicates.
    pub tags: Vec<String>,
    pub necessity: Necessity,
    pub status: CandidateStatus,
    /// Source lines that produced this candidate, joined with " | ".
    pub raw_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub id: EntryId,
    pub created_at: String,
    pub source_image_ref: String,
    pub candidate: CandidateTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Row id; doubles as the insertion order.
    pub id: i64,
    pub pattern: String,
    pub category: String,
    pub priority: i64,
    pub learned: bool,
    pub hit_count: i64,
    /// Necessity stamped on matched candidates; `None` leaves it alone.
    pub necessity: Option<Necessity>,
}

impl Rule {
    pub fn matches(&self, description: &str) -> bool {
        description
            .to_lowercase()
            .contains(&self.pattern.to_lowercase())
    }
}

/// Adds `tag` to every candidate whose description contains `pattern`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRule {
    pub id: i64,
    pub pattern: String,
    pub tag: String,
}

impl TagRule {
    pub fn matches(&self, description: &str) -> bool {
        description
            .to_lowercase()
            .contains(&self.pattern.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn from_amount(amount: Decimal) -> Self {
        if amount.is_sign_negative() {
            Self::Expense
        } else {
            Self::Income
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }
}

/// A committed, immutable ledger record.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTransaction {
    pub id: i64,
    pub entry_id: Option<EntryId>,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub necessity: Necessity,
    pub account: String,
    pub kind: TransactionKind,
    pub source: String,
    pub original_description: String,
}
