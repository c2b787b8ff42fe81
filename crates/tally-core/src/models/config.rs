//! Configuration structures for the extraction engine.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, TallyError};

/// Main configuration for tally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Amount extraction configuration.
    pub extraction: ExtractionConfig,
}

/// Amount extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum vertical centre distance (pixels) for lines on one row.
    pub row_tolerance: f32,

    /// Candidates kept per field after ranking.
    pub max_candidates_per_field: usize,

    /// Score given to values derived from a summary table.
    pub table_score: i32,

    /// Replace the total by subtotal + tax when they disagree by under 0.10.
    pub auto_correct: bool,

    /// Consistency score below which a result needs human review.
    pub verification_threshold: f64,

    /// Offer the sum of item rows as a subtotal candidate.
    pub item_sum_corroboration: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            row_tolerance: 10.0,
            max_candidates_per_field: 3,
            table_score: 105,
            auto_correct: true,
            verification_threshold: 0.6,
            item_sum_corroboration: false,
        }
    }
}

impl ExtractionConfig {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.row_tolerance.is_finite() || self.row_tolerance < 0.0 {
            return Err(TallyError::Config(format!(
                "row_tolerance must be a non-negative number, got {}",
                self.row_tolerance
            )));
        }
        if self.max_candidates_per_field == 0 {
            return Err(TallyError::Config(
                "max_candidates_per_field must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.verification_threshold) {
            return Err(TallyError::Config(format!(
                "verification_threshold must lie in [0, 1], got {}",
                self.verification_threshold
            )));
        }
        Ok(())
    }
}

impl TallyConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.extraction.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Look up a value by dotted key ("extraction.row_tolerance").
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let value = serde_json::to_value(self).ok()?;
        key.split('.')
            .try_fold(&value, |node, part| node.get(part))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TallyConfig::default();
        assert_eq!(config.extraction.row_tolerance, 10.0);
        assert_eq!(config.extraction.max_candidates_per_field, 3);
        assert_eq!(config.extraction.table_score, 105);
        assert!(config.extraction.auto_correct);
        assert!(!config.extraction.item_sum_corroboration);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: TallyConfig =
            serde_json::from_str(r#"{"extraction": {"auto_correct": false}}"#).unwrap();
        assert!(!config.extraction.auto_correct);
        assert_eq!(config.extraction.verification_threshold, 0.6);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tally").join("config.json");

        let mut config = TallyConfig::default();
        config.extraction.row_tolerance = 6.5;
        config.save(&path).unwrap();

        let loaded = TallyConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_get_dotted_key() {
        let config = TallyConfig::default();
        assert_eq!(
            config.get("extraction.table_score"),
            Some(serde_json::json!(105))
        );
        assert_eq!(config.get("extraction.nope"), None);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = ExtractionConfig::default();
        config.verification_threshold = 1.5;
        assert!(matches!(config.validate(), Err(TallyError::Config(_))));
    }
}
