//! Tax breakdown extraction: pairs each rate on a tax row with its amount.

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::trace;

use super::amounts::{tokenize, NumeralToken};
use super::patterns::PATTERNS;
use crate::ocr::Row;
use crate::receipt::candidates::{
    Provenance, TaxBreakdownCandidate, PERCENT_DERIVED_SCORE, SYNTHESIZED_TAX_SCORE,
};

/// Pairs percent tokens with amounts on rows carrying a tax keyword.
#[derive(Debug, Clone, Default)]
pub struct TaxExtractor {
    subtotal: Option<Decimal>,
}

impl TaxExtractor {
    pub fn new() -> Self {
        Self { subtotal: None }
    }

    /// Subtotal used to synthesize the amount of a rate with none printed.
    pub fn with_subtotal(mut self, subtotal: Option<Decimal>) -> Self {
        self.subtotal = subtotal;
        self
    }

    /// Extract pairs from every row, top to bottom. A rate and amount
    /// printed again further down count once.
    pub fn extract_rows(&self, rows: &[Row<'_>]) -> Vec<TaxBreakdownCandidate> {
        let mut pairs: Vec<TaxBreakdownCandidate> = Vec::new();
        for pair in rows.iter().flat_map(|row| self.extract_row(row)) {
            let repeated = pairs
                .iter()
                .any(|p| p.rate == pair.rate && p.amount == pair.amount);
            if !repeated {
                pairs.push(pair);
            }
        }
        pairs
    }

    fn extract_row(&self, row: &Row<'_>) -> Vec<TaxBreakdownCandidate> {
        let mut pairs = self.pair_row(row);
        for pair in &mut pairs {
            pair.line_index = Some(row.first_line());
            pair.ocr_confidence = Some(row.confidence());
            pair.bbox = row.bbox();
        }
        pairs
    }

    fn pair_row(&self, row: &Row<'_>) -> Vec<TaxBreakdownCandidate> {
        let text = row.text.as_str();
        let keywords = PATTERNS.tax_keywords(text);
        let Some(keyword) = keywords.first() else {
            return Vec::new();
        };

        let tokens = tokenize(text);
        let mut used: Vec<usize> = Vec::new();
        let mut pairs = Vec::new();

        for percent in tokens.percents() {
            let Some(rate) = percent
                .rate()
                .filter(|r| *r > Decimal::ZERO && *r < Decimal::ONE_HUNDRED)
            else {
                continue;
            };

            let free: Vec<(usize, &NumeralToken, Decimal)> = tokens
                .iter()
                .enumerate()
                .filter(|(i, _)| !used.contains(i))
                .filter_map(|(i, t)| t.amount().map(|a| (i, t, a)))
                .collect();

            let resolved = after_colon(text, percent, &free)
                .or_else(|| right_of_keyword(row, keyword.start(), &free))
                .or_else(|| apart_from_rate(rate, &free));

            match resolved {
                Some((index, amount)) => {
                    trace!("Tax {}% -> {} on {:?}", rate, amount, text);
                    used.push(index);
                    pairs.push(pair(rate, amount, false));
                }
                None => {
                    if let Some(subtotal) = self.subtotal {
                        let amount = (subtotal * rate / Decimal::ONE_HUNDRED)
                            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                        trace!("Tax {}% synthesized as {} from subtotal {}", rate, amount, subtotal);
                        pairs.push(pair(rate, amount, true));
                    }
                }
            }
        }

        pairs
    }
}

fn pair(rate: Decimal, amount: Decimal, synthesized: bool) -> TaxBreakdownCandidate {
    TaxBreakdownCandidate {
        rate,
        amount,
        line_index: None,
        score: if synthesized {
            SYNTHESIZED_TAX_SCORE
        } else {
            PERCENT_DERIVED_SCORE
        },
        provenance: Provenance::PercentDerived {
            rates: vec![rate],
            synthesized,
        },
        bbox: None,
        ocr_confidence: None,
    }
}

/// First free amount after the first colon following the rate, or after the
/// first colon on the line.
fn after_colon(
    text: &str,
    percent: &NumeralToken,
    free: &[(usize, &NumeralToken, Decimal)],
) -> Option<(usize, Decimal)> {
    let colon = text[percent.end..]
        .find(':')
        .map(|offset| percent.end + offset)
        .or_else(|| text.find(':'))?;
    free.iter()
        .find(|(_, t, _)| t.start > colon)
        .map(|(i, _, a)| (*i, *a))
}

/// First free amount whose word box lies strictly right of the keyword's.
fn right_of_keyword(
    row: &Row<'_>,
    keyword_start: usize,
    free: &[(usize, &NumeralToken, Decimal)],
) -> Option<(usize, Decimal)> {
    if !row.has_elements() {
        return None;
    }
    let keyword = row.element_at(keyword_start)?;
    free.iter()
        .find(|(_, t, _)| {
            row.element_at(t.start)
                .is_some_and(|e| e.bbox.x > keyword.bbox.right())
        })
        .map(|(i, _, a)| (*i, *a))
}

/// First free amount that is not the rate repeated.
fn apart_from_rate(
    rate: Decimal,
    free: &[(usize, &NumeralToken, Decimal)],
) -> Option<(usize, Decimal)> {
    let tolerance = Decimal::new(1, 1);
    free.iter()
        .find(|(_, _, a)| (*a - rate).abs() > tolerance)
        .map(|(i, _, a)| (*i, *a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{group_rows, BoundingBox, TextElement, TextLine};
    use crate::testing::dec;
    use pretty_assertions::assert_eq;

    fn extract_lines(extractor: &TaxExtractor, lines: &[TextLine]) -> Vec<TaxBreakdownCandidate> {
        extractor.extract_rows(&group_rows(lines, 10.0))
    }

    fn extract_text(extractor: &TaxExtractor, text: &str) -> Vec<TaxBreakdownCandidate> {
        let lines: Vec<TextLine> = text.lines().map(TextLine::plain).collect();
        extract_lines(extractor, &lines)
    }

    fn amounts(pairs: &[TaxBreakdownCandidate]) -> Vec<(Decimal, Decimal)> {
        pairs.iter().map(|p| (p.rate, p.amount)).collect()
    }

    #[test]
    fn test_colon_resolution() {
        let extractor = TaxExtractor::new();
        let pairs = extract_text(&extractor, "VAT 24%: €3.02");
        assert_eq!(amounts(&pairs), vec![(dec("24"), dec("3.02"))]);
        assert!(!pairs[0].is_synthesized());
    }

    #[test]
    fn test_multiple_rates_on_one_line() {
        let extractor = TaxExtractor::new();
        let pairs = extract_text(&extractor, "ALV 14% 1,06 ALV 24% 3,24");
        assert_eq!(
            amounts(&pairs),
            vec![(dec("14"), dec("1.06")), (dec("24"), dec("3.24"))]
        );
    }

    #[test]
    fn test_skips_rate_repeated_as_amount() {
        let extractor = TaxExtractor::new();
        let pairs = extract_text(&extractor, "MOMS 25% 25.00 30.00");
        assert_eq!(amounts(&pairs), vec![(dec("25"), dec("30.00"))]);
    }

    #[test]
    fn test_element_geometry_resolution() {
        let line = TextLine::plain("2 Tax 14% 1.06")
            .with_bbox(BoundingBox::new(0.0, 0.0, 200.0, 12.0))
            .with_elements(vec![
                TextElement::new("2", BoundingBox::new(0.0, 0.0, 10.0, 12.0), 0.9),
                TextElement::new("Tax", BoundingBox::new(20.0, 0.0, 30.0, 12.0), 0.9),
                TextElement::new("14%", BoundingBox::new(60.0, 0.0, 30.0, 12.0), 0.9),
                TextElement::new("1.06", BoundingBox::new(150.0, 0.0, 40.0, 12.0), 0.9),
            ]);
        let pairs = extract_lines(&TaxExtractor::new(), &[line]);
        assert_eq!(amounts(&pairs), vec![(dec("14"), dec("1.06"))]);
        assert_eq!(pairs[0].line_index, Some(0));

        // Without elements the first amount apart from the rate wins.
        let pairs = extract_text(&TaxExtractor::new(), "2 Tax 14% 1.06");
        assert_eq!(amounts(&pairs), vec![(dec("14"), dec("2"))]);
    }

    #[test]
    fn test_repeated_rows_count_once() {
        let lines = vec![
            TextLine::plain("ALV 24%: 3,02"),
            TextLine::plain("YHTEENSÄ 15,60"),
            TextLine::plain("ALV 24%: 3,02"),
        ];
        let pairs = extract_lines(&TaxExtractor::new(), &lines);
        assert_eq!(amounts(&pairs), vec![(dec("24"), dec("3.02"))]);
    }

    #[test]
    fn test_synthesizes_from_subtotal() {
        let extractor = TaxExtractor::new().with_subtotal(Some(dec("12.58")));
        let pairs = extract_text(&extractor, "ALV 24%");
        assert_eq!(amounts(&pairs), vec![(dec("24"), dec("3.02"))]);
        assert!(pairs[0].is_synthesized());

        assert!(extract_text(&TaxExtractor::new(), "ALV 24%").is_empty());
    }

    #[test]
    fn test_ignores_inclusive_and_non_tax_lines() {
        let extractor = TaxExtractor::new();
        assert!(extract_text(&extractor, "Total incl. 24% VAT 15.60").is_empty());
        assert!(extract_text(&extractor, "24% €1.76 €12.58 €14.34").is_empty());
    }
}
