//! Unified OFI / Cross-Impact Pipeline
//!
//! Sequences every stage over one in-memory snapshot table:
//!
//! ```text
//!              ┌─▶ OrderFlowCalculator ─▶ [Aggregator] ─▶ OfiIntegrator ─┐
//! BookSnapshot ┤                                                         ├─▶ join ─▶ Preprocessor ─▶ CrossImpactEstimator
//!              └─▶ [Aggregator] ─▶ ReturnsCalculator ───────────────────┘
//! ```
//!
//! The join is an inner join on (ts_event, symbol) and carries the mid-price
//! of the flow row's snapshot. Bracketed stages run only when aggregation is
//! configured. Without aggregation, returns are taken on a copy of the book
//! sorted by (symbol, ts_event), matching the order flow differencing.
//!
//! # Philosophy
//! - **Pure**: every run refits from its input; nothing persists between runs
//! - **All-or-nothing**: the first failing stage aborts the run
//!
//! # Example
//!
//! ```ignore
//! use ofi_cross_impact::prelude::*;
//!
//! let pipeline = PipelineBuilder::new()
//!     .levels(5)
//!     .aggregate("1S")
//!     .build()?;
//!
//! let output = pipeline.run(&snapshots)?;
//! println!("{:?}", output.coefficients.get("AAPL", "MSFT"));
//! ```
//!
//! # Output Structure
//!
//! | Field | Type | Description |
//! |-------|------|-------------|
//! | `integrated` | `Vec<IntegratedOfiRow>` | Flow rows with `ofi_pca` |
//! | `axis` | `PrincipalAxis` | Fitted projection |
//! | `returns` | `Vec<ReturnRow>` | Mid-price log-returns |
//! | `observations` | `Vec<ImpactObservation>` | Joined, deduplicated table |
//! | `coefficients` | `CoefficientMatrix` | Target × predictor coefficients |
//! | `validation` | `ValidationResult` | Data-quality report on the input |

use crate::book::{BookSnapshot, ImpactObservation, IntegratedOfiRow, ReturnRow};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::estimation::{CoefficientMatrix, CrossImpactEstimator};
use crate::features::{OrderFlowCalculator, ReturnsCalculator};
use crate::preprocessing::{Aggregator, Preprocessor};
use crate::reduction::{OfiIntegrator, PrincipalAxis};
use crate::validation::{validate_book, ValidationResult};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::time::Instant;
use tracing::{info, warn};

/// Output from one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Order flow rows with integrated OFI
    pub integrated: Vec<IntegratedOfiRow>,

    /// Principal axis the flows were projected on
    pub axis: PrincipalAxis,

    /// Mid-price log-returns
    pub returns: Vec<ReturnRow>,

    /// Joined and deduplicated observations fed to the estimator
    pub observations: Vec<ImpactObservation>,

    /// Cross-impact coefficients
    pub coefficients: CoefficientMatrix,

    /// Data-quality report on the input snapshots
    pub validation: ValidationResult,

    /// Book levels used
    pub levels: usize,
}

/// Main Pipeline - connects all stages
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    order_flow: OrderFlowCalculator,
    aggregator: Option<Aggregator>,
    returns: ReturnsCalculator,
    integrator: OfiIntegrator,
    preprocessor: Preprocessor,
    estimator: CrossImpactEstimator,
}

impl Pipeline {
    /// Create pipeline from configuration
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;

        let aggregator = match &config.aggregation {
            Some(aggregation) => Some(Aggregator::new(
                config.levels,
                aggregation.parsed_interval()?,
            )),
            None => None,
        };

        Ok(Self {
            order_flow: OrderFlowCalculator::new(config.levels),
            aggregator,
            returns: ReturnsCalculator::new(),
            integrator: OfiIntegrator::new(config.levels),
            preprocessor: Preprocessor::new(config.duplicates),
            estimator: CrossImpactEstimator::new(config.regression.clone(), config.std_floor),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over `snapshots`.
    pub fn run(&self, snapshots: &[BookSnapshot]) -> Result<PipelineOutput> {
        let start = Instant::now();
        info!(
            rows = snapshots.len(),
            levels = self.config.levels,
            aggregation = ?self.config.aggregation.as_ref().map(|a| a.interval.as_str()),
            "Starting cross-impact pipeline"
        );

        let validation = validate_book(snapshots);
        for warning in validation.warnings() {
            warn!(check = %warning, "Data quality warning");
        }

        let flows = self.order_flow.calculate(snapshots)?;
        let flows = match &self.aggregator {
            Some(aggregator) => aggregator.aggregate_flows(&flows)?,
            None => flows,
        };
        let integration = self.integrator.integrate(&flows)?;

        let book: Cow<'_, [BookSnapshot]> = match &self.aggregator {
            Some(aggregator) => Cow::Owned(aggregator.aggregate_snapshots(snapshots)?),
            None => time_ordered(snapshots),
        };
        let returns = self.returns.calculate(&book)?;

        let joined = join(&integration.rows, &returns);
        info!(rows = joined.len(), "Joined integrated OFI with returns");

        let observations = self.preprocessor.process(joined)?;
        let coefficients = self.estimator.estimate(&observations)?;

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            targets = coefficients.dim().0,
            "Cross-impact pipeline completed"
        );

        Ok(PipelineOutput {
            integrated: integration.rows,
            axis: integration.axis,
            returns,
            observations,
            coefficients,
            validation,
            levels: self.config.levels,
        })
    }
}

/// The book in (symbol, ts_event) order, borrowed when already sorted.
///
/// The sort is stable, so rows sharing a timestamp keep their input order.
fn time_ordered(snapshots: &[BookSnapshot]) -> Cow<'_, [BookSnapshot]> {
    fn key(s: &BookSnapshot) -> (&str, DateTime<Utc>) {
        (s.symbol.as_str(), s.ts_event)
    }
    if snapshots.windows(2).all(|w| key(&w[0]) <= key(&w[1])) {
        return Cow::Borrowed(snapshots);
    }

    let mut sorted = snapshots.to_vec();
    sorted.sort_by(|a, b| key(a).cmp(&key(b)));
    Cow::Owned(sorted)
}

/// Inner join on (ts_event, symbol), in integrated-row order.
///
/// Every matching pair is emitted, so repeated keys on either side multiply.
pub fn join(integrated: &[IntegratedOfiRow], returns: &[ReturnRow]) -> Vec<ImpactObservation> {
    let mut by_key: AHashMap<(DateTime<Utc>, &str), Vec<&ReturnRow>> = AHashMap::new();
    for row in returns {
        by_key
            .entry((row.ts_event, row.symbol.as_str()))
            .or_default()
            .push(row);
    }

    integrated
        .iter()
        .flat_map(|ofi| {
            let matches = by_key
                .get(&(ofi.ts_event(), ofi.symbol()))
                .map(Vec::as_slice)
                .unwrap_or_default();
            matches.iter().map(move |ret| {
                ImpactObservation::new(
                    ofi.ts_event(),
                    ofi.symbol(),
                    ofi.ofi_pca,
                    ret.log_return,
                    ofi.row.snapshot.mid_price(),
                )
            })
        })
        .collect()
}
