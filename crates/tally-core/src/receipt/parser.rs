//! Receipt parser: candidate collection plus consistency arbitration.

use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::models::config::ExtractionConfig;
use crate::models::receipt::{Field, ReceiptAmounts, TaxBreakdown};
use crate::ocr::{ReceiptInput, TextLine};

use super::arbiter::{ConsistencyArbiter, ConsistencyResult};
use super::candidates::{CandidateCollector, CollectedCandidates};
use super::Result;

/// Result of receipt amount extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted amounts.
    pub amounts: ReceiptAmounts,
    /// Strategy tags of the candidates behind the selected values.
    pub strategies: Vec<String>,
    /// Extraction warnings.
    pub warnings: Vec<String>,
    /// The values should be checked by a person.
    pub needs_verification: bool,
    /// Confidence in the selected combination (0.0 - 1.0).
    pub consistency_score: f64,
    /// Values replaced by the arithmetic check.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub corrections: BTreeMap<Field, Decimal>,
    /// Language hint passed in by the OCR collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Trait for receipt parsing.
pub trait ReceiptParser {
    /// Parse receipt amounts from OCR output.
    fn parse(&self, input: &ReceiptInput) -> Result<ExtractionResult>;

    /// Parse from OCR lines.
    fn parse_lines(&self, lines: &[TextLine]) -> Result<ExtractionResult> {
        self.parse(&ReceiptInput::from_lines(lines.to_vec()))
    }

    /// Parse from flat recognized text.
    fn parse_text(&self, text: &str) -> Result<ExtractionResult> {
        self.parse(&ReceiptInput::from_text(text))
    }
}

/// Receipt parser reconciling table, label and rate signals.
#[derive(Debug, Clone, Default)]
pub struct TallyParser {
    config: ExtractionConfig,
}

impl TallyParser {
    /// Create a new parser with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an extraction configuration.
    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the row grouping tolerance in pixels.
    pub fn with_row_tolerance(mut self, tolerance: f32) -> Self {
        self.config.row_tolerance = tolerance;
        self
    }

    /// Set total auto-correction.
    pub fn with_auto_correct(mut self, auto_correct: bool) -> Self {
        self.config.auto_correct = auto_correct;
        self
    }

    /// Set item-sum corroboration of the subtotal.
    pub fn with_item_sum_corroboration(mut self, enabled: bool) -> Self {
        self.config.item_sum_corroboration = enabled;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Tax breakdown for the output.
    ///
    /// Table rows when the selected tax came from the table; otherwise the
    /// rate pairs, when they add up to the selected tax or there is only one
    /// rate.
    fn breakdown(
        &self,
        collected: &CollectedCandidates,
        consistency: &ConsistencyResult,
    ) -> Vec<TaxBreakdown> {
        let (Some(selected), Some(tax)) = (
            consistency.selected.get(&Field::Tax),
            consistency.value(Field::Tax),
        ) else {
            return Vec::new();
        };

        if selected.is_table_sourced() {
            if let Some(table) = &collected.table {
                let rows = table.breakdown();
                if !rows.is_empty() {
                    return rows;
                }
            }
        }

        let pairs = &collected.tax_breakdown;
        match pairs.as_slice() {
            [] => Vec::new(),
            [only] => vec![TaxBreakdown::new(only.rate, tax)],
            _ => {
                let sum: Decimal = pairs.iter().map(|p| p.amount).sum();
                if (sum - tax).abs() <= Decimal::new(1, 2) {
                    pairs
                        .iter()
                        .map(|p| TaxBreakdown::new(p.rate, p.amount))
                        .collect()
                } else {
                    debug!("Tax pairs sum {} does not match tax {}, dropping breakdown", sum, tax);
                    Vec::new()
                }
            }
        }
    }
}

impl ReceiptParser for TallyParser {
    fn parse(&self, input: &ReceiptInput) -> Result<ExtractionResult> {
        let start = Instant::now();

        let lines = input.effective_lines();
        if lines.is_empty() {
            return Err(ExtractionError::NoInput);
        }
        for (index, line) in lines.iter().enumerate() {
            line.validate(index)?;
        }

        info!("Parsing receipt from {} OCR lines", lines.len());

        let collected = CandidateCollector::new(self.config.clone()).collect(&lines);
        let consistency = ConsistencyArbiter::new(&self.config).arbitrate(&collected);

        let mut amounts = ReceiptAmounts::default();
        for field in Field::ALL {
            amounts.set(field, consistency.value(field));
        }
        amounts.tax_breakdown = self.breakdown(&collected, &consistency);

        let mut strategies: Vec<String> = Vec::new();
        for candidate in consistency.selected.values() {
            for tag in candidate.strategies() {
                if !strategies.contains(&tag) {
                    strategies.push(tag);
                }
            }
        }

        let mut warnings = consistency.warnings.clone();
        for field in amounts.missing() {
            warnings.push(format!("no {} found", field));
        }
        let needs_verification = consistency.needs_verification || amounts.total.is_none();
        if needs_verification {
            warn!(
                "Receipt needs verification (consistency {:.2})",
                consistency.consistency_score
            );
        }

        debug!(
            "Extracted subtotal={:?} tax={:?} total={:?} with consistency {:.2}",
            amounts.subtotal, amounts.tax, amounts.total, consistency.consistency_score
        );

        Ok(ExtractionResult {
            amounts,
            strategies,
            warnings,
            needs_verification,
            consistency_score: consistency.consistency_score,
            corrections: consistency.corrected_values,
            language: input.language.clone(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::BoundingBox;
    use crate::testing::dec;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> ExtractionResult {
        TallyParser::new().parse_text(text).unwrap()
    }

    #[test]
    fn test_subtotal_and_total_without_tax() {
        let result = parse("Subtotal: €250.00\nTotal: €262.50");

        assert_eq!(result.amounts.subtotal, Some(dec("250.00")));
        assert_eq!(result.amounts.total, Some(dec("262.50")));
        assert_eq!(result.amounts.tax, None);
        assert!(result.warnings.contains(&"no tax found".to_string()));
    }

    #[test]
    fn test_single_rate_table() {
        let result = parse("Tax rate Tax Subtotal Total\n24% €1.76 €12.58 €14.34");

        assert_eq!(result.amounts.tax, Some(dec("1.76")));
        assert_eq!(result.amounts.subtotal, Some(dec("12.58")));
        assert_eq!(result.amounts.total, Some(dec("14.34")));
        assert_eq!(
            result.amounts.tax_breakdown,
            vec![TaxBreakdown::new(dec("24"), dec("1.76"))]
        );
        assert!(result.strategies.contains(&"table_text:total".to_string()));
        assert!(!result.needs_verification);
    }

    #[test]
    fn test_two_rate_receipt() {
        let text = "\
SuperMarket Oy
Receipt #001235
Items:
Bread €2.50
Milk €1.89
Cheese €5.20
Tax rate | Tax | Subtotal | Total
14% €1.06 €7.59 €8.65
24% €3.24 €13.49 €16.73
Subtotal: €21.08
Total Tax: €4.30
TOTAL: €25.38
Thank you!";
        let result = parse(text);

        assert_eq!(result.amounts.subtotal, Some(dec("21.08")));
        assert_eq!(result.amounts.tax, Some(dec("4.30")));
        assert_eq!(result.amounts.total, Some(dec("25.38")));
        assert_eq!(
            result.amounts.tax_breakdown,
            vec![
                TaxBreakdown::new(dec("14"), dec("1.06")),
                TaxBreakdown::new(dec("24"), dec("3.24")),
            ]
        );
        assert!(result.warnings.is_empty());
        assert!(result.corrections.is_empty());
    }

    #[test]
    fn test_two_rate_table_accumulates() {
        let result = parse(
            "Tax rate | Tax | Subtotal | Total\n14% €10.00 €71.43 €81.43\n24% €5.00 €20.83 €25.83",
        );

        assert_eq!(result.amounts.tax, Some(dec("15.00")));
        assert_eq!(result.amounts.subtotal, Some(dec("92.26")));
        assert_eq!(result.amounts.total, Some(dec("107.26")));
        assert_eq!(
            result.amounts.tax_breakdown,
            vec![
                TaxBreakdown::new(dec("14"), dec("10.00")),
                TaxBreakdown::new(dec("24"), dec("5.00")),
            ]
        );
    }

    #[test]
    fn test_labeled_tax_with_rate() {
        let result = parse("VAT 24%: €3.02");
        assert_eq!(result.amounts.tax, Some(dec("3.02")));
        assert!(result.needs_verification);
        assert!(result.warnings.contains(&"no total found".to_string()));
    }

    #[test]
    fn test_multilingual_receipts() {
        let receipts = [
            "Lähikauppa\nLeipä €2.50\nVälisumma: €12.58\nALV 24%: €3.02\nYHTEENSÄ: €15.60",
            "Bäckerei\nBrot €2.50\nZwischensumme: €12.58\nMWST 24%: €3.02\nGESAMT: €15.60",
            "Bageri\nBröd €2.50\nDelsumma: €12.58\nMOMS 24%: €3.02\nTOTALT: €15.60",
        ];
        for text in receipts {
            let result = parse(text);
            assert_eq!(result.amounts.subtotal, Some(dec("12.58")), "{}", text);
            assert_eq!(result.amounts.tax, Some(dec("3.02")), "{}", text);
            assert_eq!(result.amounts.total, Some(dec("15.60")), "{}", text);
            assert_eq!(
                result.amounts.tax_breakdown,
                vec![TaxBreakdown::new(dec("24"), dec("3.02"))]
            );
            assert!(!result.needs_verification, "{}", text);
        }
    }

    #[test]
    fn test_geometric_rows() {
        let cell = |text: &str, x: f32, y: f32| {
            TextLine::plain(text).with_bbox(BoundingBox::new(x, y, 80.0, 14.0))
        };
        let lines = vec![
            cell("YHTEENSÄ:", 20.0, 340.0),
            cell("€15.60", 260.0, 342.0),
            cell("Välisumma:", 20.0, 300.0),
            cell("€12.58", 260.0, 301.0),
            cell("ALV 24%:", 20.0, 320.0),
            cell("€3.02", 260.0, 319.0),
        ];
        let result = TallyParser::new().parse_lines(&lines).unwrap();

        assert_eq!(result.amounts.subtotal, Some(dec("12.58")));
        assert_eq!(result.amounts.tax, Some(dec("3.02")));
        assert_eq!(result.amounts.total, Some(dec("15.60")));
    }

    #[test]
    fn test_large_gap_needs_verification() {
        let result = parse("Subtotal: 12.58\nVAT 24%: 3.02\nTotal: 25.00");

        assert_eq!(result.amounts.total, Some(dec("25.00")));
        assert_eq!(result.amounts.subtotal, Some(dec("12.58")));
        assert_eq!(result.amounts.tax, Some(dec("3.02")));
        assert!(result.corrections.is_empty());
        assert!(result.needs_verification);
        assert!(result
            .warnings
            .contains(&"manual verification required".to_string()));
    }

    #[test]
    fn test_small_gap_corrects_total() {
        let text = "Välisumma: 12.58\nALV 24%: 3.02\nYhteensä sis. ALV 15.65";

        let result = parse(text);
        assert_eq!(result.amounts.subtotal, Some(dec("12.58")));
        assert_eq!(result.amounts.tax, Some(dec("3.02")));
        assert_eq!(result.amounts.total, Some(dec("15.60")));
        assert_eq!(result.corrections.get(&Field::Total), Some(&dec("15.60")));
        assert_eq!(result.warnings.len(), 1);
        assert!(!result.needs_verification);

        let result = TallyParser::new()
            .with_auto_correct(false)
            .parse_text(text)
            .unwrap();
        assert_eq!(result.amounts.total, Some(dec("15.65")));
        assert!(result.corrections.is_empty());
        assert!(result.needs_verification);
    }

    #[test]
    fn test_table_total_confirmed_by_unlabeled_line() {
        let text = "\
Tax rate | Tax | Subtotal | Total
14% €1.06 €7.59 €8.65
24% €3.24 €13.49 €16.73
Subtotal: €21.08
Yhteensä sis. ALV 25.38";
        let result = parse(text);

        assert_eq!(result.amounts.subtotal, Some(dec("21.08")));
        assert_eq!(result.amounts.total, Some(dec("25.38")));
    }

    #[test]
    fn test_table_without_geometry_on_data_row() {
        let lines = vec![
            TextLine::plain("Tax rate | Tax | Subtotal | Total")
                .with_bbox(BoundingBox::new(10.0, 100.0, 300.0, 14.0)),
            TextLine::plain("24% €1.76 €12.58 €14.34"),
        ];
        let result = TallyParser::new().parse_lines(&lines).unwrap();

        assert_eq!(result.amounts.tax, Some(dec("1.76")));
        assert_eq!(result.amounts.subtotal, Some(dec("12.58")));
        assert_eq!(result.amounts.total, Some(dec("14.34")));
        assert!(result.strategies.contains(&"table_text:total".to_string()));
    }

    #[test]
    fn test_item_table_is_not_summary() {
        let result = parse(
            "Qty Description Price Amount\n2 Bread 1.25 2.50\n1 Milk 1.89 1.89\nTotal: 4.39",
        );
        assert_eq!(result.amounts.total, Some(dec("4.39")));
        assert!(result.strategies.iter().all(|s| !s.starts_with("table_")));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let parser = TallyParser::new();
        assert!(matches!(
            parser.parse(&ReceiptInput::default()),
            Err(ExtractionError::NoInput)
        ));
        assert!(matches!(
            parser.parse_text("  \n\t\n"),
            Err(ExtractionError::NoInput)
        ));
    }

    #[test]
    fn test_invalid_line_is_an_error() {
        let lines = vec![TextLine::plain("Total 1.00").with_confidence(2.0)];
        assert!(matches!(
            TallyParser::new().parse_lines(&lines),
            Err(ExtractionError::InvalidLine { index: 0, .. })
        ));
    }

    #[test]
    fn test_language_hint_carried_through() {
        let input = ReceiptInput::from_text("YHTEENSÄ 15,60").with_language("fi");
        let result = TallyParser::new().parse(&input).unwrap();
        assert_eq!(result.language.as_deref(), Some("fi"));
        assert_eq!(result.amounts.total, Some(dec("15.60")));
    }

    #[test]
    fn test_result_serializes() {
        let result = parse("Subtotal: 12.58\nVAT 24%: 3.02\nTotal: 15.60");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["amounts"]["total"], "15.60");
        assert_eq!(json["amounts"]["tax_breakdown"][0]["amount"], "3.02");
        assert!(json.get("corrections").is_none());
    }
}
