//! Cross-impact estimation.
//!
//! Observations are pivoted into time × instrument matrices of integrated OFI
//! and log-returns. For each target instrument its returns are regressed on
//! the standardized OFI of every instrument with a cross-validated Lasso; the
//! coefficient vectors form the rows of a [`CoefficientMatrix`].
//!
//! # Example
//!
//! ```ignore
//! use ofi_cross_impact::estimation::{CrossImpactEstimator, LassoCvConfig};
//!
//! let estimator = CrossImpactEstimator::new(LassoCvConfig::default(), 1e-10);
//! let matrix = estimator.estimate(&observations)?;
//!
//! for summary in matrix.self_vs_cross() {
//!     println!("{}: self {:.4}, cross {:.4}", summary.target, summary.self_impact, summary.avg_cross_impact);
//! }
//! ```

pub mod coefficients;
pub mod cross_impact;
pub mod lasso;

pub use coefficients::{CoefficientMatrix, ImpactSummary};
pub use cross_impact::{CrossImpactEstimator, ImpactPanel};
pub use lasso::{LassoCv, LassoCvConfig, LassoFit};
