//! Candidate values for the monetary fields, and the collector that gathers
//! them from summary tables and per-row keyword matches.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::rules::amounts::{tokenize, LineTokens, NumeralToken};
use super::rules::patterns::PATTERNS;
use super::rules::tax::TaxExtractor;
use super::rules::{AmountExtractor, FieldExtractor};
use super::table::{SummaryTable, TableDetector, TableMethod};
use crate::models::config::ExtractionConfig;
use crate::models::receipt::Field;
use crate::ocr::{group_rows, BoundingBox, Row, TextLine};

/// Base score of a keyword-category match, per field.
pub fn category_score(field: Field) -> i32 {
    match field {
        Field::Total => 100,
        Field::Subtotal => 90,
        Field::Tax => 80,
    }
}

pub const EXPLICIT_LABEL_SCORE: i32 = 95;
pub const PERCENT_DERIVED_SCORE: i32 = 75;
pub const SYNTHESIZED_TAX_SCORE: i32 = 60;
pub const ITEM_SUM_SCORE: i32 = 60;

/// Where a candidate value came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Rightmost amount on a row carrying a category keyword.
    CategoryPattern { keyword: String },
    /// Amount directly following a category keyword.
    ExplicitLabel { keyword: String },
    /// Column of a detected summary table.
    TablePosition { method: TableMethod, rows: usize },
    /// Sum of percent/amount pairs on tax rows.
    PercentDerived { rates: Vec<Decimal>, synthesized: bool },
    /// Sum of item rows above the summary block.
    ItemSumDerived { items: usize },
}

impl Provenance {
    /// Rank used when identical amounts merge: higher wins.
    pub fn strength(&self) -> u8 {
        match self {
            Provenance::ExplicitLabel { .. } => 4,
            Provenance::TablePosition { .. } => 3,
            Provenance::CategoryPattern { .. } => 2,
            Provenance::PercentDerived { .. } => 1,
            Provenance::ItemSumDerived { .. } => 0,
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Provenance::ExplicitLabel { .. })
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Provenance::TablePosition { .. })
    }

    /// Stable strategy tag, e.g. `explicit_label:total`.
    pub fn tag(&self, field: Field) -> String {
        let kind = match self {
            Provenance::CategoryPattern { .. } => "category_pattern",
            Provenance::ExplicitLabel { .. } => "explicit_label",
            Provenance::TablePosition {
                method: TableMethod::Geometric,
                ..
            } => "table_geometric",
            Provenance::TablePosition {
                method: TableMethod::TextOnly,
                ..
            } => "table_text",
            Provenance::PercentDerived {
                synthesized: false,
                ..
            } => "percent_derived",
            Provenance::PercentDerived {
                synthesized: true, ..
            } => "percent_synthesized",
            Provenance::ItemSumDerived { .. } => "item_sum",
        };
        format!("{}:{}", kind, field)
    }
}

/// A hypothesized value for one field. Built with [`CandidateBuilder`] and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountCandidate {
    field: Field,
    amount: Decimal,
    score: i32,
    line_index: Option<usize>,
    provenance: Provenance,
    label: Option<String>,
    ocr_confidence: Option<f32>,
    bbox: Option<BoundingBox>,
    /// Every provenance that proposed this amount, strongest first.
    sources: Vec<Provenance>,
}

impl AmountCandidate {
    pub fn field(&self) -> Field {
        self.field
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    /// Source line, `None` for table or aggregate values.
    pub fn line_index(&self) -> Option<usize> {
        self.line_index
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn ocr_confidence(&self) -> Option<f32> {
        self.ocr_confidence
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.bbox
    }

    pub fn sources(&self) -> &[Provenance] {
        &self.sources
    }

    pub fn is_explicit(&self) -> bool {
        self.provenance.is_explicit()
    }

    /// Whether a summary table proposed this amount, alone or alongside
    /// other strategies.
    pub fn is_table_sourced(&self) -> bool {
        self.sources.iter().any(Provenance::is_table)
    }

    /// Strategy tags of all contributing sources.
    pub fn strategies(&self) -> Vec<String> {
        self.sources.iter().map(|p| p.tag(self.field)).collect()
    }

    /// Combine with another candidate of the same amount.
    fn merged(self, other: AmountCandidate) -> AmountCandidate {
        let score = self.score.max(other.score);
        let (mut primary, secondary) = if other.provenance.strength() > self.provenance.strength() {
            (other, self)
        } else {
            (self, other)
        };
        for source in secondary.sources {
            if !primary.sources.contains(&source) {
                primary.sources.push(source);
            }
        }
        primary.sources.sort_by_key(|p| std::cmp::Reverse(p.strength()));
        primary.score = score;
        primary.line_index = primary.line_index.or(secondary.line_index);
        primary.ocr_confidence = primary.ocr_confidence.or(secondary.ocr_confidence);
        primary.bbox = primary.bbox.or(secondary.bbox);
        primary
    }
}

/// Accumulates a candidate's score before it is frozen.
#[derive(Debug, Clone)]
pub struct CandidateBuilder {
    field: Field,
    amount: Decimal,
    score: i32,
    provenance: Provenance,
    line_index: Option<usize>,
    label: Option<String>,
    ocr_confidence: Option<f32>,
    bbox: Option<BoundingBox>,
}

impl CandidateBuilder {
    pub fn new(field: Field, amount: Decimal, base_score: i32, provenance: Provenance) -> Self {
        Self {
            field,
            amount,
            score: base_score,
            provenance,
            line_index: None,
            label: None,
            ocr_confidence: None,
            bbox: None,
        }
    }

    pub fn with_line(mut self, line_index: usize) -> Self {
        self.line_index = Some(line_index);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.ocr_confidence = Some(confidence);
        self
    }

    pub fn with_bbox(mut self, bbox: Option<BoundingBox>) -> Self {
        self.bbox = bbox;
        self
    }

    /// Add a score adjustment.
    pub fn adjust(mut self, delta: i32) -> Self {
        self.score += delta;
        self
    }

    /// Add the bonus for where the value sits on the receipt.
    pub fn position_bonus(self, position: f32) -> Self {
        let bonus = positional_bonus(self.field, position);
        self.adjust(bonus)
    }

    /// Freeze the candidate. Non-positive amounts are rejected.
    pub fn finish(self) -> Option<AmountCandidate> {
        if self.amount <= Decimal::ZERO {
            return None;
        }
        Some(AmountCandidate {
            field: self.field,
            amount: self.amount,
            score: self.score,
            line_index: self.line_index,
            sources: vec![self.provenance.clone()],
            provenance: self.provenance,
            label: self.label,
            ocr_confidence: self.ocr_confidence,
            bbox: self.bbox,
        })
    }
}

/// Score bonus from relative vertical position (0.0 top, 1.0 bottom).
///
/// Totals sit near the bottom, subtotals mid-page, tax just above the total.
pub fn positional_bonus(field: Field, position: f32) -> i32 {
    let p = f64::from(position.clamp(0.0, 1.0));
    match field {
        Field::Total if p >= 0.6 => 10 + ((p - 0.6) * 10.0 + 1e-6).floor() as i32,
        Field::Subtotal if (0.3..=0.7).contains(&p) => 5,
        Field::Tax if (0.5..=0.85).contains(&p) => 5,
        _ => 0,
    }
}

/// Ranked candidates of exactly one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCandidates {
    field: Field,
    candidates: Vec<AmountCandidate>,
}

impl FieldCandidates {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            candidates: Vec::new(),
        }
    }

    pub fn field(&self) -> Field {
        self.field
    }

    /// Add a candidate, merging with an existing one of the same amount.
    ///
    /// Candidates of another field are handed back.
    pub fn push(&mut self, candidate: AmountCandidate) -> Result<(), AmountCandidate> {
        if candidate.field != self.field {
            return Err(candidate);
        }
        match self
            .candidates
            .iter()
            .position(|c| c.amount == candidate.amount)
        {
            Some(i) => {
                let existing = self.candidates.remove(i);
                self.candidates.insert(i, existing.merged(candidate));
            }
            None => self.candidates.push(candidate),
        }
        Ok(())
    }

    /// Candidates by descending score; insertion order breaks ties.
    pub fn ranked(&self) -> Vec<&AmountCandidate> {
        let mut ranked: Vec<&AmountCandidate> = self.candidates.iter().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// The `n` best candidates.
    pub fn top(&self, n: usize) -> Vec<&AmountCandidate> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }

    /// Keep only the `n` best candidates.
    pub fn truncate(&mut self, n: usize) {
        self.candidates.sort_by(|a, b| b.score.cmp(&a.score));
        self.candidates.truncate(n);
    }

    /// Keep candidates matching the predicate.
    pub fn retain(&mut self, keep: impl FnMut(&AmountCandidate) -> bool) {
        self.candidates.retain(keep);
    }

    pub fn has_explicit(&self) -> bool {
        self.candidates.iter().any(AmountCandidate::is_explicit)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AmountCandidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// A tax amount paired with its rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxBreakdownCandidate {
    /// Rate in percent.
    pub rate: Decimal,
    pub amount: Decimal,
    pub line_index: Option<usize>,
    pub score: i32,
    pub provenance: Provenance,
    pub bbox: Option<BoundingBox>,
    pub ocr_confidence: Option<f32>,
}

impl TaxBreakdownCandidate {
    pub fn is_synthesized(&self) -> bool {
        matches!(
            self.provenance,
            Provenance::PercentDerived {
                synthesized: true,
                ..
            }
        )
    }
}

/// Everything the collector found for one receipt.
#[derive(Debug, Clone)]
pub struct CollectedCandidates {
    pub total: FieldCandidates,
    pub subtotal: FieldCandidates,
    pub tax: FieldCandidates,
    /// Rate/amount pairs from tax rows.
    pub tax_breakdown: Vec<TaxBreakdownCandidate>,
    /// Summary table, if one was detected.
    pub table: Option<SummaryTable>,
}

impl CollectedCandidates {
    pub fn new() -> Self {
        Self {
            total: FieldCandidates::new(Field::Total),
            subtotal: FieldCandidates::new(Field::Subtotal),
            tax: FieldCandidates::new(Field::Tax),
            tax_breakdown: Vec::new(),
            table: None,
        }
    }

    pub fn field(&self, field: Field) -> &FieldCandidates {
        match field {
            Field::Total => &self.total,
            Field::Subtotal => &self.subtotal,
            Field::Tax => &self.tax,
        }
    }

    pub fn field_mut(&mut self, field: Field) -> &mut FieldCandidates {
        match field {
            Field::Total => &mut self.total,
            Field::Subtotal => &mut self.subtotal,
            Field::Tax => &mut self.tax,
        }
    }

    /// Route a candidate to its field's set.
    pub fn add(&mut self, candidate: AmountCandidate) {
        let field = candidate.field();
        // Routing by the candidate's own field cannot mismatch.
        let _ = self.field_mut(field).push(candidate);
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|f| self.field(*f).is_empty())
    }

    /// Sum of the tax breakdown pairs.
    pub fn tax_total(&self) -> Option<Decimal> {
        if self.tax_breakdown.is_empty() {
            return None;
        }
        Some(self.tax_breakdown.iter().map(|p| p.amount).sum())
    }
}

impl Default for CollectedCandidates {
    fn default() -> Self {
        Self::new()
    }
}

/// Gathers candidates from table structure and per-row keyword matches.
pub struct CandidateCollector {
    config: ExtractionConfig,
}

impl CandidateCollector {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn collect(&self, lines: &[TextLine]) -> CollectedCandidates {
        let rows = group_rows(lines, self.config.row_tolerance);
        let mut collected = CollectedCandidates::new();

        let table = TableDetector::new(&rows).detect();
        if let Some(table) = &table {
            self.add_table_candidates(table, &mut collected);
        }
        collected.table = table;

        for row in &rows {
            self.scan_row(row, &mut collected);
        }

        let subtotal_hint = collected.subtotal.ranked().first().map(|c| c.amount());
        let pairs = TaxExtractor::new()
            .with_subtotal(subtotal_hint)
            .extract_rows(&rows);
        if !pairs.is_empty() {
            self.add_percent_derived(&pairs, &rows, &mut collected);
        }
        collected.tax_breakdown = pairs;

        if self.config.item_sum_corroboration {
            self.add_item_sum(&rows, &mut collected);
        }

        for field in Field::ALL {
            let set = collected.field_mut(field);
            set.truncate(self.config.max_candidates_per_field);
            for c in set.iter() {
                debug!(
                    "{} candidate {} score={} via {}",
                    field,
                    c.amount(),
                    c.score(),
                    c.strategies().join(",")
                );
            }
        }

        collected
    }

    fn add_table_candidates(&self, table: &SummaryTable, collected: &mut CollectedCandidates) {
        debug!(
            "Summary table: {} rows ({:?}), subtotal={} tax={} total={}",
            table.rows.len(),
            table.method,
            table.subtotal(),
            table.tax(),
            table.total()
        );
        let provenance = Provenance::TablePosition {
            method: table.method,
            rows: table.rows.len(),
        };
        let values = [
            (Field::Total, table.total()),
            (Field::Subtotal, table.subtotal()),
            (Field::Tax, table.tax()),
        ];
        for (field, amount) in values {
            let candidate = CandidateBuilder::new(field, amount, self.config.table_score, provenance.clone())
                .with_confidence(table.confidence)
                .finish();
            if let Some(candidate) = candidate {
                collected.add(candidate);
            }
        }
    }

    fn scan_row(&self, row: &Row<'_>, collected: &mut CollectedCandidates) {
        let Some(label) = PATTERNS.classify(&row.text) else {
            return;
        };
        let field = label.field;
        let tokens = tokenize(&row.text);

        let located = |builder: CandidateBuilder| {
            builder
                .with_line(row.first_line())
                .with_confidence(row.confidence())
                .with_bbox(row.bbox())
                .position_bonus(row.position)
                .finish()
        };

        if let Some(labeled) = PATTERNS.labeled(field, &row.text) {
            let provenance = Provenance::ExplicitLabel {
                keyword: labeled.keyword.to_lowercase(),
            };
            let builder = CandidateBuilder::new(field, labeled.amount, EXPLICIT_LABEL_SCORE, provenance)
                .with_label(labeled.keyword.as_str());
            if let Some(candidate) = located(builder) {
                collected.add(candidate);
            }
        }

        if let Some(amount) = rightmost_amount(field, &tokens) {
            let provenance = Provenance::CategoryPattern {
                keyword: label.keyword.to_lowercase(),
            };
            let builder = CandidateBuilder::new(field, amount, category_score(field), provenance)
                .with_label(label.keyword.as_str());
            if let Some(candidate) = located(builder) {
                collected.add(candidate);
            }
        }
    }

    fn add_percent_derived(
        &self,
        pairs: &[TaxBreakdownCandidate],
        rows: &[Row<'_>],
        collected: &mut CollectedCandidates,
    ) {
        let total: Decimal = pairs.iter().map(|p| p.amount).sum();
        let synthesized = pairs.iter().all(TaxBreakdownCandidate::is_synthesized);
        let rates = pairs.iter().map(|p| p.rate).collect();
        let base = if synthesized {
            SYNTHESIZED_TAX_SCORE
        } else {
            PERCENT_DERIVED_SCORE
        };

        let mut builder = CandidateBuilder::new(
            Field::Tax,
            total,
            base,
            Provenance::PercentDerived { rates, synthesized },
        );
        if let Some(line) = pairs.iter().filter_map(|p| p.line_index).min() {
            builder = builder.with_line(line);
            if let Some(row) = rows.iter().find(|r| r.segments.iter().any(|s| s.line_index == line)) {
                builder = builder.with_confidence(row.confidence()).position_bonus(row.position);
            }
        }
        if let Some(candidate) = builder.finish() {
            collected.add(candidate);
        }
    }

    /// Sum single-price item rows above the first summary row.
    fn add_item_sum(&self, rows: &[Row<'_>], collected: &mut CollectedCandidates) {
        let extractor = AmountExtractor::new();
        let table_lines: Vec<usize> = collected
            .table
            .iter()
            .flat_map(|t| t.rows.iter().map(|r| r.line_index))
            .collect();

        let mut items = 0;
        let mut sum = Decimal::ZERO;
        for row in rows {
            if PATTERNS.classify(&row.text).is_some() {
                break;
            }
            if table_lines.contains(&row.first_line()) {
                continue;
            }
            let has_words = row.text.chars().any(char::is_alphabetic);
            let amounts = extractor.extract_all(&row.text);
            if let [price] = amounts.as_slice() {
                if has_words && looks_like_price(&price.source) {
                    items += 1;
                    sum += price.value;
                }
            }
        }

        if items < 2 {
            return;
        }
        debug!("Item sum {} over {} rows", sum, items);
        let candidate = CandidateBuilder::new(
            Field::Subtotal,
            sum,
            ITEM_SUM_SCORE,
            Provenance::ItemSumDerived { items },
        )
        .finish();
        if let Some(candidate) = candidate {
            collected.add(candidate);
        }
    }
}

impl Default for CandidateCollector {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

/// Rightmost positive amount on a row. For tax rows, values equal to a rate
/// on the same row are skipped.
fn rightmost_amount(field: Field, tokens: &LineTokens) -> Option<Decimal> {
    let rates: Vec<Decimal> = tokens.percents().filter_map(NumeralToken::rate).collect();
    let tolerance = Decimal::new(1, 1);
    tokens
        .amounts()
        .filter_map(NumeralToken::amount)
        .filter(|a| field != Field::Tax || rates.iter().all(|r| (*a - *r).abs() > tolerance))
        .last()
}

/// Two decimals after the last separator ("2.50", "1.234,56").
fn looks_like_price(raw: &str) -> bool {
    raw.rfind(|c| c == '.' || c == ',')
        .is_some_and(|i| raw.len() - i - 1 == 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::dec;
    use pretty_assertions::assert_eq;

    fn explicit(field: Field, amount: &str, score: i32) -> AmountCandidate {
        CandidateBuilder::new(
            field,
            dec(amount),
            score,
            Provenance::ExplicitLabel {
                keyword: field.to_string(),
            },
        )
        .with_line(1)
        .finish()
        .unwrap()
    }

    fn table(field: Field, amount: &str) -> AmountCandidate {
        CandidateBuilder::new(
            field,
            dec(amount),
            105,
            Provenance::TablePosition {
                method: TableMethod::Geometric,
                rows: 1,
            },
        )
        .finish()
        .unwrap()
    }

    #[test]
    fn test_builder_accumulates_and_rejects_non_positive() {
        let candidate = CandidateBuilder::new(
            Field::Total,
            dec("15.60"),
            100,
            Provenance::CategoryPattern {
                keyword: "total".into(),
            },
        )
        .adjust(3)
        .position_bonus(1.0)
        .finish()
        .unwrap();
        assert_eq!(candidate.score(), 117);

        let zero = CandidateBuilder::new(
            Field::Tax,
            Decimal::ZERO,
            80,
            Provenance::CategoryPattern { keyword: "tax".into() },
        )
        .finish();
        assert!(zero.is_none());
    }

    #[test]
    fn test_positional_bonus() {
        assert_eq!(positional_bonus(Field::Total, 0.5), 0);
        assert_eq!(positional_bonus(Field::Total, 0.6), 10);
        assert_eq!(positional_bonus(Field::Total, 1.0), 14);
        assert_eq!(positional_bonus(Field::Subtotal, 0.5), 5);
        assert_eq!(positional_bonus(Field::Subtotal, 0.9), 0);
        assert_eq!(positional_bonus(Field::Tax, 0.8), 5);
        assert_eq!(positional_bonus(Field::Tax, 0.2), 0);
    }

    #[test]
    fn test_field_candidates_reject_other_fields() {
        let mut set = FieldCandidates::new(Field::Total);
        assert!(set.push(explicit(Field::Tax, "3.02", 95)).is_err());
        assert!(set.is_empty());
    }

    #[test]
    fn test_merge_keeps_strongest_provenance_and_max_score() {
        let mut set = FieldCandidates::new(Field::Total);
        set.push(table(Field::Total, "25.38")).unwrap();
        set.push(explicit(Field::Total, "25.38", 95)).unwrap();

        assert_eq!(set.len(), 1);
        let merged = set.ranked()[0];
        assert_eq!(merged.score(), 105);
        assert!(merged.is_explicit());
        assert!(merged.is_table_sourced());
        assert_eq!(
            merged.strategies(),
            vec!["explicit_label:total".to_string(), "table_geometric:total".to_string()]
        );
        assert_eq!(merged.line_index(), Some(1));
    }

    #[test]
    fn test_top_is_stable() {
        let mut set = FieldCandidates::new(Field::Subtotal);
        set.push(explicit(Field::Subtotal, "1.00", 90)).unwrap();
        set.push(explicit(Field::Subtotal, "2.00", 95)).unwrap();
        set.push(explicit(Field::Subtotal, "3.00", 90)).unwrap();
        set.push(explicit(Field::Subtotal, "4.00", 10)).unwrap();

        let top: Vec<_> = set.top(3).iter().map(|c| c.amount()).collect();
        assert_eq!(top, vec![dec("2.00"), dec("1.00"), dec("3.00")]);
    }

    #[test]
    fn test_collects_labeled_rows() {
        let lines = vec![
            TextLine::plain("Subtotal €250.00"),
            TextLine::plain("Total €262.50"),
        ];
        let collected = CandidateCollector::default().collect(&lines);

        let total = collected.total.ranked()[0];
        assert_eq!(total.amount(), dec("262.50"));
        assert!(total.is_explicit());
        assert_eq!(collected.subtotal.ranked()[0].amount(), dec("250.00"));
        assert!(collected.tax.is_empty());
        assert!(collected.table.is_none());
    }

    #[test]
    fn test_tax_category_skips_rate_value() {
        let tokens = tokenize("VAT 24% 24.00 3.02");
        assert_eq!(rightmost_amount(Field::Tax, &tokens), Some(dec("3.02")));
        let tokens = tokenize("VAT 24% 3.02 24");
        assert_eq!(rightmost_amount(Field::Tax, &tokens), Some(dec("3.02")));
        assert_eq!(rightmost_amount(Field::Total, &tokens), Some(dec("24")));
    }

    #[test]
    fn test_item_sum_corroboration() {
        let lines = vec![
            TextLine::plain("Bread €2.50"),
            TextLine::plain("Milk €1.89"),
            TextLine::plain("Receipt #001235"),
            TextLine::plain("Subtotal: €4.39"),
        ];
        let config = ExtractionConfig {
            item_sum_corroboration: true,
            ..ExtractionConfig::default()
        };
        let collected = CandidateCollector::new(config).collect(&lines);

        let subtotal = collected.subtotal.ranked()[0];
        assert_eq!(subtotal.amount(), dec("4.39"));
        assert!(subtotal
            .sources()
            .iter()
            .any(|p| matches!(p, Provenance::ItemSumDerived { items: 2 })));
    }

    #[test]
    fn test_truncates_to_max_candidates() {
        let lines = vec![
            TextLine::plain("Total 1.00"),
            TextLine::plain("Total 2.00"),
            TextLine::plain("Total 3.00"),
            TextLine::plain("Total 4.00"),
        ];
        let collected = CandidateCollector::default().collect(&lines);
        assert_eq!(collected.total.len(), 3);
    }
}
