//! Cleans raw recognized lines before classification.
//!
//! Recognition output is full of small artifacts: a tilde where the app showed a
//! minus sign, a euro sign floating one space away from its number, an `O` inside
//! `4O,3O`. Normalization fixes those without ever touching ordinary words.

use std::sync::LazyLock;

use regex::Regex;

static CLOCK_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}[:*]\d{2}$").unwrap());

const CURRENCY_SYMBOLS: &[char] = &['€', '$', '£'];
const MINUS_LOOKALIKES: &[char] = &['-', '~', '–', '—', '−'];

/// A cleaned line plus its position in the recognizer's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanLine {
    pub position: usize,
    pub text: String,
}

fn confusion_digit(c: char) -> Option<char> {
    match c {
        'O' | 'o' => Some('0'),
        'I' | 'l' | '|' => Some('1'),
        'S' | 's' => Some('5'),
        'B' => Some('8'),
        'Z' => Some('2'),
        _ => None,
    }
}

fn is_currency(c: char) -> bool {
    CURRENCY_SYMBOLS.contains(&c)
}

fn sign_of(c: char) -> Option<char> {
    if c == '+' {
        Some('+')
    } else if MINUS_LOOKALIKES.contains(&c) {
        Some('-')
    } else {
        None
    }
}

#[derive(Debug, Default)]
struct NumericToken {
    sign: Option<char>,
    prefix_currency: Option<char>,
    body: String,
    suffix_currency: Option<char>,
}

impl NumericToken {
    fn has_currency(&self) -> bool {
        self.prefix_currency.is_some() || self.suffix_currency.is_some()
    }

    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(s) = self.sign {
            out.push(s);
        }
        if let Some(c) = self.prefix_currency {
            out.push(c);
        }
        out.push_str(&self.body);
        if let Some(c) = self.suffix_currency {
            out.push(c);
        }
        out
    }
}

/// Parses a token as a number, repairing look-alike letters. Returns `None`
/// for anything that is not numeric-shaped so words are never rewritten.
fn parse_numeric(token: &str) -> Option<NumericToken> {
    let mut rest = token;
    let mut parsed = NumericToken::default();

    if let Some(first) = rest.chars().next() {
        if let Some(sign) = sign_of(first) {
            parsed.sign = Some(sign);
            rest = &rest[first.len_utf8()..];
        }
    }
    if let Some(first) = rest.chars().next() {
        if is_currency(first) {
            parsed.prefix_currency = Some(first);
            rest = &rest[first.len_utf8()..];
        }
    }
    if let Some(last) = rest.chars().last() {
        if is_currency(last) && parsed.prefix_currency.is_none() {
            parsed.suffix_currency = Some(last);
            rest = &rest[..rest.len() - last.len_utf8()];
        }
    }

    let first = rest.chars().next()?;
    if !(first.is_ascii_digit() || confusion_digit(first).is_some()) {
        return None;
    }

    let mut digits = 0usize;
    let mut confusables = 0usize;
    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits += 1;
            parsed.body.push(c);
        } else if matches!(c, '.' | ',' | '\'' | '/' | '-') {
            parsed.body.push(c);
        } else if let Some(d) = confusion_digit(c) {
            confusables += 1;
            parsed.body.push(d);
        } else {
            return None;
        }
    }

    if digits == 0 || confusables > digits {
        return None;
    }
    Some(parsed)
}

/// Normalizes a single line. Returns `None` when nothing is left.
pub fn normalize_line(raw: &str) -> Option<String> {
    let mut out: Vec<String> = Vec::new();
    // Index into `out` of the last numeric token, while it can still take a currency.
    let mut open_numeric: Option<(usize, NumericToken)> = None;
    let mut pending_sign: Option<(char, String)> = None;
    let mut pending_currency: Option<char> = None;

    for token in raw.split_whitespace() {
        if CLOCK_TIME_RE.is_match(token) {
            continue;
        }

        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if is_currency(c) {
                match open_numeric.take() {
                    Some((idx, mut num)) if !num.has_currency() => {
                        num.suffix_currency = Some(c);
                        out[idx] = num.render();
                    }
                    _ => pending_currency = Some(c),
                }
                continue;
            }
            if let Some(sign) = sign_of(c) {
                if let Some((_, text)) = pending_sign.take() {
                    out.push(text);
                }
                pending_sign = Some((sign, token.to_string()));
                open_numeric = None;
                continue;
            }
        }

        match parse_numeric(token) {
            Some(mut num) => {
                if let Some((sign, _)) = pending_sign.take() {
                    if num.sign.is_none() {
                        num.sign = Some(sign);
                    }
                }
                if let Some(c) = pending_currency.take() {
                    if !num.has_currency() {
                        num.prefix_currency = Some(c);
                    }
                }
                out.push(num.render());
                open_numeric = Some((out.len() - 1, num));
            }
            None => {
                if let Some((_, text)) = pending_sign.take() {
                    out.push(text);
                }
                // A currency symbol followed by a word is stray.
                pending_currency = None;
                open_numeric = None;
                out.push(token.to_string());
            }
        }
    }

    if let Some((_, text)) = pending_sign {
        out.push(text);
    }

    let line = out.join(" ");
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

/// Normalizes one scan's lines, dropping those that end up empty.
pub fn normalize<S: AsRef<str>>(lines: &[S]) -> Vec<CleanLine> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(position, raw)| {
            normalize_line(raw.as_ref()).map(|text| CleanLine { position, text })
        })
        .collect()
}
