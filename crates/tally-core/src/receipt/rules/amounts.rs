//! Amount parsing and numeral tokenization.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use super::patterns::{CURRENCY_PATTERN, NUMERAL_PATTERN};
use super::{ExtractionMatch, FieldExtractor};

/// A numeral found on a line.
#[derive(Debug, Clone, PartialEq)]
pub struct NumeralToken {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset past the last character.
    pub end: usize,
    pub raw: String,
    /// Parsed value, `None` when the numeral is ungrammatical.
    pub value: Option<Decimal>,
    /// Followed by `%` (optionally after one space).
    pub is_percent: bool,
}

impl NumeralToken {
    /// Parsed, strictly positive value of a non-percent token.
    pub fn amount(&self) -> Option<Decimal> {
        if self.is_percent {
            return None;
        }
        self.value.filter(|v| *v > Decimal::ZERO)
    }

    /// Parsed value of a percent token.
    pub fn rate(&self) -> Option<Decimal> {
        if !self.is_percent {
            return None;
        }
        self.value
    }
}

/// Numeral tokens of one line, left to right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineTokens {
    pub tokens: Vec<NumeralToken>,
}

impl LineTokens {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NumeralToken> {
        self.tokens.iter()
    }

    /// Non-percent tokens.
    pub fn amounts(&self) -> impl Iterator<Item = &NumeralToken> {
        self.tokens.iter().filter(|t| !t.is_percent)
    }

    /// Percent tokens.
    pub fn percents(&self) -> impl Iterator<Item = &NumeralToken> {
        self.tokens.iter().filter(|t| t.is_percent)
    }

    pub fn has_percent(&self) -> bool {
        self.tokens.iter().any(|t| t.is_percent)
    }
}

/// Split a line into numeral tokens.
pub fn tokenize(text: &str) -> LineTokens {
    let tokens = NUMERAL_PATTERN
        .find_iter(text)
        .map(|m| {
            let rest = &text[m.end()..];
            let is_percent = rest.starts_with('%')
                || rest
                    .strip_prefix([' ', '\u{00a0}'])
                    .is_some_and(|r| r.starts_with('%'));
            NumeralToken {
                start: m.start(),
                end: m.end(),
                raw: m.as_str().to_string(),
                value: parse_amount(m.as_str()),
                is_percent,
            }
        })
        .collect();
    LineTokens { tokens }
}

/// Parse an amount written in any common receipt style.
///
/// Handles "1.234,56", "1,234.56", "1234,56", "12.58", currency marks,
/// parenthesized or minus-signed negatives and OCR letter-for-digit slips.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let mut body = s.trim();
    let mut negative = false;

    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        negative = true;
        body = inner;
    }

    let stripped = CURRENCY_PATTERN.replace_all(body, "");
    let stripped: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();

    if let Some(rest) = stripped
        .strip_prefix('-')
        .or_else(|| stripped.strip_prefix('\u{2212}'))
    {
        return parse_unsigned(rest).map(|v| -v);
    }
    if let Some(rest) = stripped.strip_suffix('-') {
        return parse_unsigned(rest).map(|v| -v);
    }

    parse_unsigned(&stripped).map(|v| if negative { -v } else { v })
}

fn parse_unsigned(s: &str) -> Option<Decimal> {
    let has_digit = s.chars().any(|c| c.is_ascii_digit());
    if !has_digit {
        return None;
    }

    let mut cleaned = String::with_capacity(s.len());
    for c in s.chars() {
        let repaired = match c {
            '0'..='9' | ',' | '.' => c,
            'O' | 'o' => '0',
            'I' | 'l' | '|' => '1',
            'S' => '5',
            'B' => '8',
            _ => return None,
        };
        cleaned.push(repaired);
    }

    let cleaned = cleaned.trim_end_matches(|c| c == ',' || c == '.');
    let normalized = normalize_separators(cleaned)?;
    let normalized = if normalized.starts_with('.') {
        format!("0{}", normalized)
    } else {
        normalized
    };

    Decimal::from_str(&normalized).ok()
}

fn normalize_separators(s: &str) -> Option<String> {
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) => s.to_string(),
        (_, 0) => {
            let decimals = s.len() - s.rfind(',').map_or(s.len(), |i| i + 1);
            if commas == 1 && decimals <= 2 {
                s.replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (0, 1) => s.to_string(),
        (0, _) => s.replace('.', ""),
        _ => {
            let (decimal, thousands) = if s.rfind(',') > s.rfind('.') {
                (',', '.')
            } else {
                ('.', ',')
            };
            if s.matches(decimal).count() > 1 {
                return None;
            }
            s.replace(thousands, "").replace(decimal, ".")
        }
    };
    Some(normalized)
}

/// Format an amount for display, with two decimals, midpoint away from zero.
pub fn format_amount(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Positive, non-percent amounts of a line.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        tokenize(text)
            .iter()
            .filter_map(|t| {
                t.amount().map(|value| {
                    ExtractionMatch::new(value, 0.8, t.raw.as_str()).with_position(t.start, t.end)
                })
            })
            .collect()
    }
}
