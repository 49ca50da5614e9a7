//! Pairs descriptions with the amount that follows them.
//!
//! A single pass over the classified lines drives a small state machine:
//!
//! ```text
//!   SeekDescription --DESCRIPTION--> AccumulateDescription
//!   AccumulateDescription --DESCRIPTION--> AccumulateDescription (up to the line cap)
//!   AccumulateDescription --AMOUNT--> emit candidate, back to SeekDescription
//!   AccumulateDescription --DATE|NOISE--> drop description, back to SeekDescription
//! ```
//!
//! DATE lines always update the pending date, which carries over from one
//! candidate to the next. Anything that cannot be paired is dropped and
//! reported as a [`PairingEvent`]; nothing is guessed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::classifier::{AmountToken, ClassifiedLine, LineClass, Sign};
use crate::models::{CandidateStatus, CandidateTransaction, Necessity, OCR_SOURCE};

pub const DEFAULT_MAX_DESCRIPTION_LINES: usize = 4;

pub const DEFAULT_CREDIT_KEYWORDS: &[&str] = &[
    "accredito", "stipendio", "rimborso", "bonifico ricevuto", "bonifico in entrata", "ricarica ricevuta",
    "salary", "refund", "deposit", "payment received",
];

#[derive(Debug, Clone)]
pub struct PairingConfig {
    pub max_description_lines: usize,
    /// Matched case-insensitively against the description when the amount has no sign.
    pub credit_keywords: Vec<String>,
    pub default_currency: String,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            max_description_lines: DEFAULT_MAX_DESCRIPTION_LINES,
            credit_keywords: DEFAULT_CREDIT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            default_currency: "EUR".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    SeekDescription,
    AccumulateDescription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropKind {
    /// Description flushed by a date, a noise line or the end of input.
    DanglingDescription,
    /// Amount with no description before it.
    OrphanAmount,
    /// Amount right after another paired amount.
    DuplicateAmount,
    /// Description line past the accumulation cap.
    DescriptionOverflow,
    /// Amount equal to zero.
    ZeroAmount,
}

impl DropKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DanglingDescription => "dangling description",
            Self::OrphanAmount => "orphan amount",
            Self::DuplicateAmount => "duplicate amount",
            Self::DescriptionOverflow => "description overflow",
            Self::ZeroAmount => "zero amount",
        }
    }
}

/// A fragment the state machine dropped, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingEvent {
    pub position: usize,
    pub kind: DropKind,
    pub text: String,
}

impl PairingEvent {
    /// Dangling descriptions and unpaired amounts.
    pub fn is_pairing_incomplete(&self) -> bool {
        matches!(
            self.kind,
            DropKind::DanglingDescription | DropKind::OrphanAmount | DropKind::DuplicateAmount
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairingOutcome {
    pub candidates: Vec<CandidateTransaction>,
    pub events: Vec<PairingEvent>,
}

pub struct PairingMachine<'a> {
    config: &'a PairingConfig,
    scan_date: NaiveDate,
    state: PairingState,
    pending_date: Option<NaiveDate>,
    buffer: Vec<(usize, String)>,
    // Set after an emission, cleared once a new description starts.
    just_emitted: bool,
    candidates: Vec<CandidateTransaction>,
    events: Vec<PairingEvent>,
}

impl<'a> PairingMachine<'a> {
    pub fn new(config: &'a PairingConfig, scan_date: NaiveDate) -> Self {
        Self {
            config,
            scan_date,
            state: PairingState::SeekDescription,
            pending_date: None,
            buffer: Vec::new(),
            just_emitted: false,
            candidates: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> PairingState {
        self.state
    }

    pub fn pending_date(&self) -> Option<NaiveDate> {
        self.pending_date
    }

    pub fn feed(&mut self, line: &ClassifiedLine) {
        match (self.state, &line.class) {
            (PairingState::SeekDescription, LineClass::Date(date)) => {
                self.pending_date = Some(*date);
            }
            (PairingState::SeekDescription, LineClass::Noise) => {}
            (PairingState::SeekDescription, LineClass::Description) => {
                self.buffer.push((line.position, line.text.clone()));
                self.just_emitted = false;
                self.state = PairingState::AccumulateDescription;
            }
            (PairingState::SeekDescription, LineClass::Amount(amount)) => {
                if amount.value.is_zero() {
                    self.drop_fragment(line.position, DropKind::ZeroAmount, &line.text);
                } else if self.just_emitted {
                    self.drop_fragment(line.position, DropKind::DuplicateAmount, &line.text);
                } else {
                    self.drop_fragment(line.position, DropKind::OrphanAmount, &line.text);
                }
            }
            (PairingState::AccumulateDescription, LineClass::Description) => {
                if self.buffer.len() < self.config.max_description_lines {
                    self.buffer.push((line.position, line.text.clone()));
                } else {
                    self.drop_fragment(line.position, DropKind::DescriptionOverflow, &line.text);
                }
            }
            (PairingState::AccumulateDescription, LineClass::Date(date)) => {
                self.flush_incomplete();
                self.pending_date = Some(*date);
            }
            (PairingState::AccumulateDescription, LineClass::Noise) => {
                self.flush_incomplete();
            }
            (PairingState::AccumulateDescription, LineClass::Amount(amount)) => {
                if amount.value.is_zero() {
                    self.drop_fragment(line.position, DropKind::ZeroAmount, &line.text);
                } else {
                    self.emit(line, amount);
                }
            }
        }
    }

    pub fn finish(mut self) -> PairingOutcome {
        if self.state == PairingState::AccumulateDescription {
            self.flush_incomplete();
        }
        PairingOutcome {
            candidates: self.candidates,
            events: self.events,
        }
    }

    fn description(&self) -> String {
        self.buffer
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn resolve_sign(&self, amount: &AmountToken, description: &str) -> Decimal {
        let positive = match amount.sign {
            Some(Sign::Positive) => true,
            Some(Sign::Negative) => false,
            None => {
                let lower = description.to_lowercase();
                self.config
                    .credit_keywords
                    .iter()
                    .any(|k| !k.is_empty() && lower.contains(&k.to_lowercase()))
            }
        };
        if positive {
            amount.value
        } else {
            -amount.value
        }
    }

    fn emit(&mut self, line: &ClassifiedLine, amount: &AmountToken) {
        let description = self.description();
        let signed = self.resolve_sign(amount, &description);
        let mut raw: Vec<&str> = self.buffer.iter().map(|(_, text)| text.as_str()).collect();
        raw.push(&line.text);
        let raw_text = raw.join(" | ");

        debug!(position = line.position, %description, amount = %signed, "paired");
        self.candidates.push(CandidateTransaction {
            id: None,
            date: self.pending_date.unwrap_or(self.scan_date),
            description,
            amount: signed,
            currency: amount
                .currency
                .clone()
                .unwrap_or_else(|| self.config.default_currency.clone()),
            source: OCR_SOURCE.to_string(),
            category: None,
            category_confidence: 0.0,
            tags: Vec::new(),
            necessity: Necessity::default(),
            status: CandidateStatus::Pending,
            raw_text,
        });
        self.buffer.clear();
        self.just_emitted = true;
        self.state = PairingState::SeekDescription;
    }

    fn flush_incomplete(&mut self) {
        let description = self.description();
        let position = self.buffer.first().map(|(p, _)| *p).unwrap_or_default();
        self.buffer.clear();
        self.state = PairingState::SeekDescription;
        self.drop_fragment(position, DropKind::DanglingDescription, &description);
    }

    fn drop_fragment(&mut self, position: usize, kind: DropKind, text: &str) {
        let event = PairingEvent {
            position,
            kind,
            text: text.to_string(),
        };
        if event.is_pairing_incomplete() {
            warn!(position, kind = kind.as_str(), text, "PairingIncomplete: fragment dropped");
        } else {
            debug!(position, kind = kind.as_str(), text, "fragment dropped");
        }
        self.events.push(event);
    }
}

/// Runs the state machine over one scan's classified lines.
pub fn pair(lines: &[ClassifiedLine], scan_date: NaiveDate, config: &PairingConfig) -> PairingOutcome {
    let mut machine = PairingMachine::new(config, scan_date);
    for line in lines {
        machine.feed(line);
    }
    machine.finish()
}
