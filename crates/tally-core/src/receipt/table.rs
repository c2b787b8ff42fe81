//! Summary table detection.
//!
//! Multi-rate receipts print their totals as a small table: a caption row
//! ("Tax rate | Tax | Subtotal | Total") followed by one row per rate. Column
//! order is read from geometry when the recognizer reported boxes, and from
//! text order otherwise.

use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

use super::rules::amounts::{tokenize, LineTokens};
use super::rules::patterns::PATTERNS;
use crate::models::receipt::{Field, TaxBreakdown};
use crate::ocr::Row;

/// How the table columns were ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableMethod {
    /// Column order from bounding boxes.
    Geometric,
    /// Column order from text order, no geometry available.
    TextOnly,
}

/// One rate row of a summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Rate annotation in percent, if the row carried one.
    pub rate: Option<Decimal>,
    pub tax: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    /// First input line of the row.
    pub line_index: usize,
}

/// A detected summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub rows: Vec<TableRow>,
    pub method: TableMethod,
    /// First input line of the header row.
    pub header_line: usize,
    /// Mean OCR confidence of the data rows.
    pub confidence: f32,
}

impl SummaryTable {
    /// Sum of the tax column.
    pub fn tax(&self) -> Decimal {
        self.rows.iter().map(|r| r.tax).sum()
    }

    /// Sum of the subtotal column.
    pub fn subtotal(&self) -> Decimal {
        self.rows.iter().map(|r| r.subtotal).sum()
    }

    /// Aggregate total: subtotal plus tax, never the sum of the row totals.
    pub fn total(&self) -> Decimal {
        self.subtotal() + self.tax()
    }

    pub fn value(&self, field: Field) -> Decimal {
        match field {
            Field::Total => self.total(),
            Field::Subtotal => self.subtotal(),
            Field::Tax => self.tax(),
        }
    }

    /// Per-rate tax of the rows that carry a rate.
    pub fn breakdown(&self) -> Vec<TaxBreakdown> {
        self.rows
            .iter()
            .filter_map(|r| r.rate.map(|rate| TaxBreakdown::new(rate, r.tax)))
            .collect()
    }
}

/// Finds a summary table among grouped rows.
pub struct TableDetector<'r, 'a> {
    rows: &'r [Row<'a>],
}

impl<'r, 'a> TableDetector<'r, 'a> {
    pub fn new(rows: &'r [Row<'a>]) -> Self {
        Self { rows }
    }

    /// Detect the table, or `None` if there is no header or no data row
    /// after it.
    pub fn detect(&self) -> Option<SummaryTable> {
        let method = if !self.rows.is_empty() && self.rows.iter().all(Row::has_geometry) {
            TableMethod::Geometric
        } else {
            TableMethod::TextOnly
        };

        let mut header: Option<&Row<'a>> = None;
        let mut accepted: Vec<(&Row<'a>, TableRow)> = Vec::new();

        for row in self.rows {
            let tokens = tokenize(&row.text);

            let Some(head) = header else {
                if is_header(&row.text, &tokens) {
                    debug!("Table header at line {}: {:?}", row.first_line(), row.text);
                    header = Some(row);
                }
                continue;
            };

            let data = if is_data_row(&row.text, &tokens) {
                read_row(row, &tokens, head.element_count())
            } else {
                None
            };

            match data {
                Some(table_row) => accepted.push((row, table_row)),
                None if !accepted.is_empty() => break,
                None => {}
            }
        }

        let head = header?;
        if accepted.is_empty() {
            debug!("Table header without data rows, ignoring");
            return None;
        }

        let confidence =
            accepted.iter().map(|(r, _)| r.confidence()).sum::<f32>() / accepted.len() as f32;

        Some(SummaryTable {
            rows: accepted.into_iter().map(|(_, r)| r).collect(),
            method,
            header_line: head.first_line(),
            confidence,
        })
    }
}

/// A caption row: no item-table signal and either several summary
/// categories or a single category with no numerals at all. Rows carrying a
/// labeled amount ("Total Tax: 4.30") are values, not captions.
fn is_header(text: &str, tokens: &LineTokens) -> bool {
    let amounts = tokens.amounts().count();
    if amounts > 1 && !tokens.has_percent() {
        return false;
    }

    let categories = PATTERNS.summary_categories(text).len();
    if PATTERNS.item_keyword_count(text) >= 2 && categories < 2 {
        return false;
    }
    if Field::ALL.iter().any(|f| PATTERNS.labeled(*f, text).is_some()) {
        return false;
    }

    categories >= 2 || (categories >= 1 && tokens.is_empty())
}

/// Three or more amounts, or two plus a rate, and not an item line.
fn is_data_row(text: &str, tokens: &LineTokens) -> bool {
    let amounts = tokens.amounts().filter(|t| t.value.is_some()).count();
    let numeric = amounts >= 3 || (amounts >= 2 && tokens.has_percent());
    numeric && PATTERNS.item_keyword_count(text) < 2
}

fn read_row(row: &Row<'_>, tokens: &LineTokens, header_columns: usize) -> Option<TableRow> {
    let column_width = 1.0 / header_columns.max(1) as f32;
    let mut positioned: Vec<(f32, usize)> = tokens
        .iter()
        .enumerate()
        .map(|(i, t)| (row.x_at(t.start).unwrap_or(i as f32 * column_width), i))
        .collect();
    positioned.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let ordered: Vec<_> = positioned.iter().map(|(_, i)| &tokens.tokens[*i]).collect();
    let rate = ordered.iter().find_map(|t| t.rate());
    let values: Vec<Decimal> = ordered
        .iter()
        .filter(|t| !t.is_percent)
        .filter_map(|t| t.value)
        .filter(|v| *v >= Decimal::ZERO)
        .collect();

    let (tax, subtotal, total) = assign_columns(&values)?;
    Some(TableRow {
        rate,
        tax,
        subtotal,
        total,
        line_index: row.first_line(),
    })
}

/// Map left-to-right amounts to (tax, subtotal, total).
///
/// Three values are read as tax, subtotal, total; two as subtotal, total
/// with the tax implied; with more than three the rightmost three count.
pub fn assign_columns(values: &[Decimal]) -> Option<(Decimal, Decimal, Decimal)> {
    let tail = &values[values.len().saturating_sub(3)..];
    match *tail {
        [tax, subtotal, total] => Some((tax, subtotal, total)),
        [subtotal, total] => {
            let implied = total - subtotal;
            (implied >= Decimal::ZERO).then_some((implied, subtotal, total))
        }
        _ => None,
    }
}
