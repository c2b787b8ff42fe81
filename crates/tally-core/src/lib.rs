//! Core library for receipt amount extraction.
//!
//! This crate provides:
//! - OCR line model and row grouping
//! - Multilingual keyword, amount and tax-rate rules
//! - Summary table detection
//! - Candidate collection and consistency arbitration of total, subtotal and tax

pub mod error;
pub mod models;
pub mod ocr;
pub mod receipt;

pub use error::{ExtractionError, Result, TallyError};
pub use models::config::{ExtractionConfig, TallyConfig};
pub use models::receipt::{Field, ReceiptAmounts, TaxBreakdown};
pub use ocr::{BoundingBox, ReceiptInput, TextElement, TextLine};
pub use receipt::{ExtractionResult, ReceiptParser, TallyParser};

#[cfg(test)]
pub(crate) mod testing {
    use rust_decimal::Decimal;
    use std::str::FromStr;

    pub fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }
}
