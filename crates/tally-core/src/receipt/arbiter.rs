//! Consistency arbitration between field candidates.
//!
//! Every combination of the top candidates (each field possibly absent) is
//! scored on arithmetic agreement, candidate quality, layout and OCR
//! confidence. The best combination is then checked once more and small
//! arithmetic slips are corrected.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::iter;
use tracing::{debug, warn};

use super::candidates::{AmountCandidate, CollectedCandidates, FieldCandidates, Provenance};
use crate::models::config::ExtractionConfig;
use crate::models::receipt::Field;

/// Outcome of arbitration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyResult {
    pub selected: BTreeMap<Field, AmountCandidate>,
    /// Confidence in the selected combination, 0.0 to 1.0.
    pub consistency_score: f64,
    pub warnings: Vec<String>,
    pub needs_verification: bool,
    /// Values that override the selected amounts.
    pub corrected_values: BTreeMap<Field, Decimal>,
}

impl ConsistencyResult {
    fn empty() -> Self {
        Self {
            selected: BTreeMap::new(),
            consistency_score: 0.0,
            warnings: Vec::new(),
            needs_verification: true,
            corrected_values: BTreeMap::new(),
        }
    }

    /// Final value of a field, corrections applied.
    pub fn value(&self, field: Field) -> Option<Decimal> {
        self.corrected_values
            .get(&field)
            .copied()
            .or_else(|| self.selected.get(&field).map(AmountCandidate::amount))
    }
}

/// One (total, subtotal, tax) assignment, each possibly absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combination<'c> {
    pub total: Option<&'c AmountCandidate>,
    pub subtotal: Option<&'c AmountCandidate>,
    pub tax: Option<&'c AmountCandidate>,
}

impl<'c> Combination<'c> {
    pub fn new(
        total: Option<&'c AmountCandidate>,
        subtotal: Option<&'c AmountCandidate>,
        tax: Option<&'c AmountCandidate>,
    ) -> Self {
        Self {
            total,
            subtotal,
            tax,
        }
    }

    fn present(&self) -> Vec<&'c AmountCandidate> {
        [self.total, self.subtotal, self.tax]
            .into_iter()
            .flatten()
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.total.is_none() && self.subtotal.is_none() && self.tax.is_none()
    }

    fn selected(&self) -> BTreeMap<Field, AmountCandidate> {
        self.present()
            .into_iter()
            .map(|c| (c.field(), c.clone()))
            .collect()
    }
}

/// Picks the most self-consistent combination of candidates.
pub struct ConsistencyArbiter {
    max_candidates: usize,
    auto_correct: bool,
    verification_threshold: f64,
}

impl ConsistencyArbiter {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            max_candidates: config.max_candidates_per_field,
            auto_correct: config.auto_correct,
            verification_threshold: config.verification_threshold,
        }
    }

    pub fn arbitrate(&self, collected: &CollectedCandidates) -> ConsistencyResult {
        let filtered = prefilter(collected);
        let totals = with_absent(&filtered.total, self.max_candidates);
        let subtotals = with_absent(&filtered.subtotal, self.max_candidates);
        let taxes = with_absent(&filtered.tax, self.max_candidates);

        let mut best: Option<(Combination<'_>, f64)> = None;
        for total in &totals {
            for subtotal in &subtotals {
                for tax in &taxes {
                    let combination = Combination::new(*total, *subtotal, *tax);
                    if combination.is_empty() {
                        continue;
                    }
                    let score = score_combination(&combination);
                    let threshold = best.map_or(0.0, |(_, s)| s);
                    if score > threshold + 1e-9 {
                        best = Some((combination, score));
                    }
                }
            }
        }

        let (combination, score) = match best {
            Some(found) => found,
            None => match best_raw_candidate(&filtered) {
                Some(candidate) => {
                    debug!("No combination scored above zero, falling back to best candidate");
                    let combination = single(candidate);
                    (combination, score_combination(&combination))
                }
                None => return ConsistencyResult::empty(),
            },
        };

        debug!(
            "Selected total={:?} subtotal={:?} tax={:?} score={:.4}",
            combination.total.map(AmountCandidate::amount),
            combination.subtotal.map(AmountCandidate::amount),
            combination.tax.map(AmountCandidate::amount),
            score
        );

        let selected = combination.selected();
        let review = review_selection(
            &selected,
            score,
            self.auto_correct,
            self.verification_threshold,
        );
        for warning in &review.warnings {
            warn!("{}", warning);
        }

        ConsistencyResult {
            selected,
            consistency_score: score,
            warnings: review.warnings,
            needs_verification: review.needs_verification,
            corrected_values: review.corrected_values,
        }
    }
}

impl Default for ConsistencyArbiter {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

/// Top candidates in rank order, followed by "absent".
fn with_absent(set: &FieldCandidates, n: usize) -> Vec<Option<&AmountCandidate>> {
    set.top(n)
        .into_iter()
        .map(Some)
        .chain(iter::once(None))
        .collect()
}

fn single(candidate: &AmountCandidate) -> Combination<'_> {
    match candidate.field() {
        Field::Total => Combination::new(Some(candidate), None, None),
        Field::Subtotal => Combination::new(None, Some(candidate), None),
        Field::Tax => Combination::new(None, None, Some(candidate)),
    }
}

fn best_raw_candidate(collected: &CollectedCandidates) -> Option<&AmountCandidate> {
    Field::ALL
        .iter()
        .filter_map(|f| collected.field(*f).ranked().first().copied())
        .fold(None, |best: Option<&AmountCandidate>, c| match best {
            Some(b) if b.score() >= c.score() => Some(b),
            _ => Some(c),
        })
}

/// Drop table values that explicit labels contradict.
///
/// When any field has an explicit-label candidate, candidates seen only in
/// the table are removed from fields without explicit support, and from
/// supported fields when they differ by more than 10% from every explicit
/// value. A table value that was also read off a labeled line is kept.
pub fn prefilter(collected: &CollectedCandidates) -> CollectedCandidates {
    let mut filtered = collected.clone();
    let any_explicit = Field::ALL.iter().any(|f| collected.field(*f).has_explicit());
    if !any_explicit {
        return filtered;
    }

    let tolerance = Decimal::new(10, 2);
    for field in Field::ALL {
        let set = filtered.field_mut(field);
        let explicit: Vec<Decimal> = set
            .iter()
            .filter(|c| c.is_explicit())
            .map(AmountCandidate::amount)
            .collect();
        let before = set.len();
        set.retain(|c| {
            !c.sources().iter().all(Provenance::is_table)
                || explicit
                    .iter()
                    .any(|e| (c.amount() - *e).abs() <= *e * tolerance)
        });
        if set.len() < before {
            debug!("Dropped {} table candidate(s) for {}", before - set.len(), field);
        }
    }
    filtered
}

/// Ceiling of a single-field combination. Below the score of any
/// arithmetically consistent pair or triple.
const SINGLE_FIELD_CEILING: f64 = 0.6;

/// Score a combination, 0.0 to 1.0, rounded to four decimals.
///
/// A lone field scores its raw score over 100 (plus 0.10 when explicit),
/// capped at 1.0 and scaled to [`SINGLE_FIELD_CEILING`].
pub fn score_combination(combination: &Combination<'_>) -> f64 {
    let present = combination.present();
    let raw = match present.as_slice() {
        [] => 0.0,
        [only] => {
            let explicit = if only.is_explicit() { 0.10 } else { 0.0 };
            (f64::from(only.score()) / 100.0 + explicit).min(1.0) * SINGLE_FIELD_CEILING
        }
        _ => {
            arithmetic_score(combination)
                + quality_score(&present)
                + positional_score(combination)
                + confidence_score(&present)
                + table_score(&present)
                + explicit_score(&present)
        }
    };
    (raw.clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0
}

fn arithmetic_score(combination: &Combination<'_>) -> f64 {
    match (combination.total, combination.subtotal, combination.tax) {
        (Some(t), Some(s), Some(x)) => {
            let diff = (t.amount() - (s.amount() + x.amount())).abs();
            if diff <= Decimal::new(1, 2) {
                0.5
            } else if diff <= Decimal::new(10, 2) {
                0.3
            } else if diff <= Decimal::ONE {
                0.1
            } else {
                0.0
            }
        }
        (Some(t), Some(s), None) => {
            let implied = t.amount() - s.amount();
            let both_explicit = t.is_explicit() && s.is_explicit();
            if implied >= Decimal::ZERO && implied <= s.amount() * Decimal::new(5, 1) {
                if both_explicit { 0.4 } else { 0.2 }
            } else if implied < Decimal::ZERO && both_explicit {
                0.1
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

fn quality_score(present: &[&AmountCandidate]) -> f64 {
    let mean = present.iter().map(|c| f64::from(c.score())).sum::<f64>() / present.len() as f64;
    (mean / 100.0).min(1.0) * 0.3
}

fn positional_score(combination: &Combination<'_>) -> f64 {
    let total_line = combination.total.and_then(AmountCandidate::line_index);
    let subtotal_line = combination.subtotal.and_then(AmountCandidate::line_index);
    match (total_line, subtotal_line) {
        (Some(t), Some(s)) if t > s => 0.1,
        _ => 0.0,
    }
}

fn confidence_score(present: &[&AmountCandidate]) -> f64 {
    let confidences: Vec<f64> = present
        .iter()
        .filter_map(|c| c.ocr_confidence())
        .map(f64::from)
        .collect();
    if confidences.is_empty() {
        return 0.0;
    }
    confidences.iter().sum::<f64>() / confidences.len() as f64 * 0.1
}

fn table_score(present: &[&AmountCandidate]) -> f64 {
    if present.iter().filter(|c| c.is_table_sourced()).count() >= 2 {
        0.05
    } else {
        0.0
    }
}

fn explicit_score(present: &[&AmountCandidate]) -> f64 {
    match present.iter().filter(|c| c.is_explicit()).count() {
        0 => 0.0,
        1 => 0.15,
        _ => 0.20,
    }
}

/// Findings of the post-selection check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Review {
    pub warnings: Vec<String>,
    pub needs_verification: bool,
    pub corrected_values: BTreeMap<Field, Decimal>,
}

/// Check total = subtotal + tax on the selected values.
///
/// A gap under 0.10 is a rounding or OCR slip and the total is replaced by
/// subtotal + tax (when `auto_correct` is set); a larger gap asks for manual
/// verification.
pub fn review_selection(
    selected: &BTreeMap<Field, AmountCandidate>,
    score: f64,
    auto_correct: bool,
    verification_threshold: f64,
) -> Review {
    let mut review = Review::default();
    let amount = |field: Field| selected.get(&field).map(AmountCandidate::amount);

    if let (Some(total), Some(subtotal), Some(tax)) =
        (amount(Field::Total), amount(Field::Subtotal), amount(Field::Tax))
    {
        let expected = subtotal + tax;
        let diff = (total - expected).abs();
        if diff > Decimal::new(1, 2) {
            review.warnings.push(format!(
                "total {} differs from subtotal {} + tax {} by {}",
                total, subtotal, tax, diff
            ));
            if diff < Decimal::new(10, 2) {
                if auto_correct {
                    review.corrected_values.insert(Field::Total, expected);
                }
            } else {
                review
                    .warnings
                    .push("manual verification required".to_string());
            }
        }
    }

    review.needs_verification = score < verification_threshold
        || (!review.warnings.is_empty() && review.corrected_values.is_empty());
    review
}
