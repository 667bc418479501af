//! Fluent builder for pipeline configuration.
//!
//! # Quick Start
//!
//! ```ignore
//! use ofi_cross_impact::PipelineBuilder;
//!
//! // Defaults: 5 levels, no aggregation, mean duplicate policy, 5-fold LassoCV
//! let pipeline = PipelineBuilder::new().build()?;
//! let output = pipeline.run(&snapshots)?;
//! ```
//!
//! # Common Configurations
//!
//! ## One-second buckets, full MBP-10 ladder
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .levels(10)
//!     .aggregate("1S")
//!     .build()?;
//! ```
//!
//! ## Strict keys, coarser regularization path
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .duplicates(DuplicatePolicy::Reject)
//!     .n_alphas(30)
//!     .folds(3)
//!     .build()?;
//! ```

use crate::config::{AggregationConfig, ExperimentMetadata, PipelineConfig};
use crate::error::{Error, Result};
use crate::estimation::LassoCvConfig;
use crate::pipeline::Pipeline;
use crate::preprocessing::{DuplicatePolicy, DEFAULT_STD_FLOOR};
use crate::schema::DEFAULT_LEVELS;

/// Fluent builder for creating pipeline configurations.
///
/// Validation happens once, in [`build_config`](Self::build_config).
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    levels: usize,
    aggregation: Option<AggregationConfig>,
    duplicates: DuplicatePolicy,
    regression: LassoCvConfig,
    std_floor: f64,
    metadata: Option<ExperimentMetadata>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Create a new pipeline builder with default settings.
    pub fn new() -> Self {
        Self {
            levels: DEFAULT_LEVELS,
            aggregation: None,
            duplicates: DuplicatePolicy::default(),
            regression: LassoCvConfig::default(),
            std_floor: DEFAULT_STD_FLOOR,
            metadata: None,
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            levels: config.levels,
            aggregation: config.aggregation,
            duplicates: config.duplicates,
            regression: config.regression,
            std_floor: config.std_floor,
            metadata: config.metadata,
        }
    }

    // =========================================================================
    // Order flow
    // =========================================================================

    /// Number of book levels (1..=10).
    pub fn levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    /// Resample flows and book into buckets of `interval` (e.g. `"1S"`).
    pub fn aggregate(mut self, interval: &str) -> Self {
        self.aggregation = Some(AggregationConfig::new(interval));
        self
    }

    /// Use raw event times.
    pub fn no_aggregation(mut self) -> Self {
        self.aggregation = None;
        self
    }

    // =========================================================================
    // Preprocessing
    // =========================================================================

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn std_floor(mut self, floor: f64) -> Self {
        self.std_floor = floor;
        self
    }

    // =========================================================================
    // Regression
    // =========================================================================

    pub fn folds(mut self, folds: usize) -> Self {
        self.regression.folds = folds;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.regression.max_iter = max_iter;
        self
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.regression.tol = tol;
        self
    }

    pub fn n_alphas(mut self, n_alphas: usize) -> Self {
        self.regression.n_alphas = n_alphas;
        self
    }

    pub fn regression(mut self, config: LassoCvConfig) -> Self {
        self.regression = config;
        self
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Set experiment name and description.
    pub fn experiment(mut self, name: &str, description: &str) -> Self {
        self.metadata = Some(ExperimentMetadata::new(name).with_description(description));
        self
    }

    /// Set experiment metadata with full control.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Build and validate the pipeline configuration.
    pub fn build_config(self) -> Result<PipelineConfig> {
        let config = PipelineConfig {
            levels: self.levels,
            duplicates: self.duplicates,
            std_floor: self.std_floor,
            aggregation: self.aggregation,
            regression: self.regression,
            metadata: self.metadata,
        };

        config.validate().map_err(Error::Config)?;
        Ok(config)
    }

    /// Build and return a ready-to-use Pipeline.
    pub fn build(self) -> Result<Pipeline> {
        Pipeline::from_config(self.build_config()?)
    }

    /// Get a summary of the current configuration.
    pub fn summary(&self) -> String {
        format!(
            "PipelineBuilder Summary:\n\
             - Levels: {} ({} flow columns)\n\
             - Aggregation: {}\n\
             - Duplicates: {:?}\n\
             - LassoCV: {} folds, {} alphas (eps {}), max_iter {}, tol {}",
            self.levels,
            2 * self.levels,
            self.aggregation
                .as_ref()
                .map_or("none", |a| a.interval.as_str()),
            self.duplicates,
            self.regression.folds,
            self.regression.n_alphas,
            self.regression.eps,
            self.regression.max_iter,
            self.regression.tol,
        )
    }
}
