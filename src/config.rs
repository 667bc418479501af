//! Pipeline configuration management.
//!
//! One serializable struct covers every stage of the OFI / cross-impact
//! pipeline, so an estimation run can be reproduced from a single file.
//!
//! # Features
//!
//! - **Unified Configuration**: ladder depth, resampling, duplicate policy and
//!   regression settings in one place
//! - **Serialization**: Save/load configurations to TOML or JSON
//! - **Validation**: Loaded configurations are validated before use
//!
//! # Example
//!
//! ```ignore
//! use ofi_cross_impact::config::PipelineConfig;
//!
//! let config = PipelineConfig::default().with_aggregation("1S");
//! config.save_toml("experiment_config.toml")?;
//!
//! let loaded = PipelineConfig::load_toml("experiment_config.toml")?;
//! let pipeline = Pipeline::from_config(loaded)?;
//! ```

use crate::error::{Error, Result};
use crate::estimation::LassoCvConfig;
use crate::preprocessing::{DuplicatePolicy, ResampleInterval, DEFAULT_STD_FLOOR};
use crate::schema::{DEFAULT_LEVELS, MAX_LEVELS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Unified pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Book levels used for order flow (1..=10).
    pub levels: usize,

    /// Policy for rows sharing (ts_event, symbol) after the join.
    pub duplicates: DuplicatePolicy,

    /// Replacement for a zero predictor standard deviation.
    pub std_floor: f64,

    /// Time-bucket resampling (optional, off by default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationConfig>,

    /// Cross-validated Lasso settings
    pub regression: LassoCvConfig,

    /// Experiment metadata (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,
}

/// Time-bucket resampling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Bucket width, e.g. `"1S"`, `"500ms"`, `"5min"`.
    pub interval: String,
}

impl AggregationConfig {
    pub fn new(interval: impl Into<String>) -> Self {
        Self {
            interval: interval.into(),
        }
    }

    pub fn parsed_interval(&self) -> Result<ResampleInterval> {
        self.interval.parse()
    }
}

/// Experiment metadata for tracking and reproducibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name
    pub name: String,

    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Version or git commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Instruments covered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,

    /// Custom tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ExperimentMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            symbols: None,
            tags: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = Some(symbols);
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS,
            duplicates: DuplicatePolicy::default(),
            std_floor: DEFAULT_STD_FLOOR,
            aggregation: None,
            regression: LassoCvConfig::default(),
            metadata: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    /// Resample to buckets of `interval` before reduction and returns.
    pub fn with_aggregation(mut self, interval: impl Into<String>) -> Self {
        self.aggregation = Some(AggregationConfig::new(interval));
        self
    }

    pub fn with_duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn with_regression(mut self, regression: LassoCvConfig) -> Self {
        self.regression = regression;
        self
    }

    pub fn with_std_floor(mut self, std_floor: f64) -> Self {
        self.std_floor = std_floor;
        self
    }

    /// Set experiment metadata.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Validate the configuration.
    ///
    /// Returns Ok(()) if valid, Err(msg) otherwise.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.levels == 0 || self.levels > MAX_LEVELS {
            return Err(format!(
                "levels must be between 1 and {MAX_LEVELS}, got {}",
                self.levels
            ));
        }

        if !(self.std_floor > 0.0) {
            return Err(format!("std_floor must be > 0, got {}", self.std_floor));
        }

        if let Some(aggregation) = &self.aggregation {
            aggregation
                .parsed_interval()
                .map_err(|e| e.to_string())?;
        }

        self.regression.validate()
    }

    /// Save configuration to TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load configuration from TOML file.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = PipelineConfig::load_toml("configs/experiment1.toml")?;
    /// ```
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&contents)?;
        config.validate().map_err(Error::Config)?;
        Ok(config)
    }

    /// Save configuration to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load configuration from JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&contents)?;
        config.validate().map_err(Error::Config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.levels, 5);
        assert_eq!(config.duplicates, DuplicatePolicy::Mean);
        assert_eq!(config.regression.folds, 5);
        assert_eq!(config.regression.max_iter, 2000);
        assert!(config.aggregation.is_none());
    }

    #[test]
    fn test_save_load_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = PipelineConfig::default()
            .with_levels(3)
            .with_aggregation("5S")
            .with_duplicates(DuplicatePolicy::Last)
            .with_metadata(
                ExperimentMetadata::new("equities")
                    .with_symbols(vec!["AAPL".to_string(), "MSFT".to_string()]),
            );
        config.save_toml(&path).unwrap();

        let loaded = PipelineConfig::load_toml(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = PipelineConfig::default().with_std_floor(1e-8);
        config.save_json(&path).unwrap();

        let loaded = PipelineConfig::load_json(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PipelineConfig = toml::from_str("levels = 2\nduplicates = \"reject\"\n").unwrap();
        assert_eq!(config.levels, 2);
        assert_eq!(config.duplicates, DuplicatePolicy::Reject);
        assert_eq!(config.regression, LassoCvConfig::default());
    }

    #[test]
    fn test_validation() {
        let mut config = PipelineConfig::default();

        config.levels = 0;
        assert!(config.validate().is_err());
        config.levels = 11;
        assert!(config.validate().is_err());
        config.levels = 10; // Fix
        assert!(config.validate().is_ok());

        config.std_floor = 0.0;
        assert!(config.validate().is_err());
        config.std_floor = DEFAULT_STD_FLOOR; // Fix

        config.aggregation = Some(AggregationConfig::new("5 fortnights"));
        assert!(config.validate().is_err());
        config.aggregation = Some(AggregationConfig::new("250ms")); // Fix

        config.regression.eps = 1.0;
        assert!(config.validate().is_err());
        config.regression.eps = 1e-3; // Fix

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "levels = 0\n").unwrap();

        let err = PipelineConfig::load_toml(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
