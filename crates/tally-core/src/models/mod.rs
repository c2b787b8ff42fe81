//! Data models shared by the engine and its callers.

pub mod config;
pub mod receipt;

pub use config::{ExtractionConfig, TallyConfig};
pub use receipt::{Field, ReceiptAmounts, TaxBreakdown};
