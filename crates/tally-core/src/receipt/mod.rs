//! Receipt amount extraction module.

mod parser;
pub mod arbiter;
pub mod candidates;
pub mod rules;
pub mod table;

pub use arbiter::{ConsistencyArbiter, ConsistencyResult};
pub use candidates::{AmountCandidate, CandidateCollector, CollectedCandidates, Provenance};
pub use parser::{ExtractionResult, ReceiptParser, TallyParser};
pub use table::{SummaryTable, TableDetector, TableMethod};

use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;
