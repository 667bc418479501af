//! OFI Cross-Impact
//!
//! Multi-level order flow imbalance (OFI) features and cross-impact
//! estimation for a basket of instruments.
//!
//! # Overview
//!
//! From per-instrument limit order book snapshots the library computes
//! signed order flow at every book level, compresses the levels into one
//! integrated OFI series with a principal-axis projection, computes
//! mid-price log-returns, and estimates how each instrument's order flow
//! moves every instrument's returns with one cross-validated Lasso per
//! target.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        OFI Cross-Impact                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  schema/        - Column names and required-column checks       │
//! │  features/      - Order flow and log-returns                    │
//! │  preprocessing/ - Resampling, deduplication, standardization    │
//! │  reduction/     - Integrated OFI (principal axis)               │
//! │  estimation/    - LassoCV and the cross-impact matrix           │
//! │  loader / export - CSV in, CSV / JSON / NumPy out               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stage is a pure function of its input table and returns
//! [`Result`]; the first failure aborts the run. The library logs through
//! `tracing` and never installs a subscriber.
//!
//! # Example
//!
//! ```ignore
//! use ofi_cross_impact::prelude::*;
//!
//! let snapshots = CsvBookLoader::new(5).load_path("data/mbp10.csv")?;
//! let pipeline = PipelineBuilder::new().levels(5).aggregate("1S").build()?;
//!
//! let output = pipeline.run(&snapshots)?;
//! for summary in output.coefficients.self_vs_cross() {
//!     println!("{}: {:.4} vs {:.4}", summary.target, summary.self_impact, summary.avg_cross_impact);
//! }
//! ```

pub mod book;
pub mod builder;
pub mod config;
pub mod error;
pub mod estimation;
pub mod export;
pub mod features;
pub mod loader;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod reduction;
pub mod schema;
pub mod validation;

// Re-exports - Core types
pub use book::{
    BookLevel, BookSnapshot, ImpactObservation, IntegratedOfiRow, LevelFlow, OrderFlowRow,
    ReturnRow,
};
pub use error::{Error, Result};

// Re-exports - Config
pub use builder::PipelineBuilder;
pub use config::{AggregationConfig, ExperimentMetadata, PipelineConfig};

// Re-exports - Stages
pub use estimation::{CoefficientMatrix, CrossImpactEstimator, ImpactSummary, LassoCv, LassoCvConfig};
pub use features::{OrderFlowCalculator, ReturnsCalculator};
pub use preprocessing::{Aggregator, DuplicatePolicy, Preprocessor, ResampleInterval, Standardizer};
pub use reduction::{OfiIntegrator, PrincipalAxis};

// Re-exports - I/O
pub use export::{ExportMetadata, ResultExporter};
pub use loader::CsvBookLoader;

// Re-exports - Validation
pub use validation::{validate_book, BookValidator, ValidationConfig, ValidationLevel, ValidationResult};

// Re-exports - Pipeline
pub use pipeline::{Pipeline, PipelineOutput};
