//! Receipt amount models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::receipt::rules::format_amount;

/// Monetary summary fields of a receipt.
///
/// Ordered total, subtotal, tax: the order the arbiter enumerates them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Total,
    Subtotal,
    Tax,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Total, Field::Subtotal, Field::Tax];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Total => "total",
            Field::Subtotal => "subtotal",
            Field::Tax => "tax",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tax amount charged at one rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// Rate in percent (24 for 24%).
    pub rate: Decimal,

    /// Tax amount at this rate.
    pub amount: Decimal,
}

impl TaxBreakdown {
    pub fn new(rate: Decimal, amount: Decimal) -> Self {
        Self { rate, amount }
    }

    /// Format for display ("24%: 3.02").
    pub fn display(&self) -> String {
        format!("{}%: {}", self.rate.normalize(), format_amount(self.amount))
    }
}

/// The extracted monetary fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptAmounts {
    /// Amount before tax.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,

    /// Total tax.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<Decimal>,

    /// Amount payable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,

    /// Tax per rate, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tax_breakdown: Vec<TaxBreakdown>,
}

impl ReceiptAmounts {
    pub fn get(&self, field: Field) -> Option<Decimal> {
        match field {
            Field::Total => self.total,
            Field::Subtotal => self.subtotal,
            Field::Tax => self.tax,
        }
    }

    pub fn set(&mut self, field: Field, value: Option<Decimal>) {
        match field {
            Field::Total => self.total = value,
            Field::Subtotal => self.subtotal = value,
            Field::Tax => self.tax = value,
        }
    }

    /// Fields with no value.
    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    /// Check the amounts for internal consistency and return any issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let cent = Decimal::new(1, 2);

        if let (Some(total), Some(subtotal), Some(tax)) = (self.total, self.subtotal, self.tax) {
            if (total - (subtotal + tax)).abs() > cent {
                issues.push(format!(
                    "Total ({}) differs from subtotal plus tax ({})",
                    total,
                    subtotal + tax
                ));
            }
        }

        if let Some(tax) = self.tax {
            if !self.tax_breakdown.is_empty() {
                let sum: Decimal = self.tax_breakdown.iter().map(|b| b.amount).sum();
                if (sum - tax).abs() > cent {
                    issues.push(format!(
                        "Tax breakdown sum ({}) differs from tax ({})",
                        sum, tax
                    ));
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::dec;

    #[test]
    fn test_field_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Field::Subtotal).unwrap(), "\"subtotal\"");
        let field: Field = serde_json::from_str("\"tax\"").unwrap();
        assert_eq!(field, Field::Tax);
        assert!(Field::Total < Field::Subtotal && Field::Subtotal < Field::Tax);
    }

    #[test]
    fn test_amounts_serialize_as_strings() {
        let amounts = ReceiptAmounts {
            subtotal: Some(dec("12.58")),
            tax: Some(dec("3.02")),
            total: Some(dec("15.60")),
            tax_breakdown: vec![TaxBreakdown::new(dec("24"), dec("3.02"))],
        };
        let json = serde_json::to_value(&amounts).unwrap();
        assert_eq!(json["total"], "15.60");
        assert_eq!(json["tax_breakdown"][0]["rate"], "24");
        assert!(amounts.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_mismatch() {
        let mut amounts = ReceiptAmounts::default();
        amounts.set(Field::Total, Some(dec("16.00")));
        amounts.set(Field::Subtotal, Some(dec("12.58")));
        amounts.set(Field::Tax, Some(dec("3.02")));
        assert_eq!(amounts.validate().len(), 1);
        assert!(amounts.missing().is_empty());
    }

    #[test]
    fn test_breakdown_display() {
        assert_eq!(TaxBreakdown::new(dec("24.00"), dec("3.02")).display(), "24%: 3.02");
        assert_eq!(TaxBreakdown::new(dec("14"), dec("1.065")).display(), "14%: 1.07");
    }
}
