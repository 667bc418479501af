//! Per-target Lasso regressions of returns on every instrument's integrated OFI.

use super::coefficients::CoefficientMatrix;
use super::lasso::{LassoCv, LassoCvConfig};
use crate::book::ImpactObservation;
use crate::error::{Error, Result};
use crate::preprocessing::{Standardizer, DEFAULT_STD_FLOOR};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, Axis};
use std::collections::BTreeSet;
use tracing::{debug, error, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Observations pivoted to time × instrument matrices.
///
/// Rows are sorted timestamps, columns sorted symbols; absent cells are `NaN`.
#[derive(Debug, Clone)]
pub struct ImpactPanel {
    pub timestamps: Vec<DateTime<Utc>>,
    pub symbols: Vec<String>,
    pub ofi: Array2<f64>,
    pub returns: Array2<f64>,
}

impl ImpactPanel {
    /// Pivot on (ts_event, symbol). Each key must occur at most once.
    pub fn pivot(observations: &[ImpactObservation]) -> Result<Self> {
        let timestamps: Vec<DateTime<Utc>> = observations
            .iter()
            .map(|o| o.ts_event)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let symbols: Vec<String> = observations
            .iter()
            .map(|o| o.symbol.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let row_of: AHashMap<DateTime<Utc>, usize> =
            timestamps.iter().enumerate().map(|(i, &t)| (t, i)).collect();
        let col_of: AHashMap<&str, usize> = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let shape = (timestamps.len(), symbols.len());
        let mut ofi = Array2::from_elem(shape, f64::NAN);
        let mut returns = Array2::from_elem(shape, f64::NAN);
        let mut seen = Array2::from_elem(shape, false);

        for obs in observations {
            let cell = (row_of[&obs.ts_event], col_of[obs.symbol.as_str()]);
            if seen[cell] {
                return Err(Error::DuplicateKey {
                    ts_event: obs.ts_event,
                    symbol: obs.symbol.clone(),
                });
            }
            seen[cell] = true;
            ofi[cell] = obs.ofi_pca;
            returns[cell] = obs.log_return;
        }

        Ok(Self {
            timestamps,
            symbols,
            ofi,
            returns,
        })
    }

    /// Design matrix and target for one instrument.
    ///
    /// Rows are the timestamps where the target's return is present; missing
    /// OFI is zero-filled.
    pub fn design(&self, target: usize) -> (Array2<f64>, Array1<f64>) {
        let rows: Vec<usize> = self
            .returns
            .column(target)
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_nan())
            .map(|(i, _)| i)
            .collect();

        let x = self
            .ofi
            .select(Axis(0), &rows)
            .mapv(|v| if v.is_nan() { 0.0 } else { v });
        let y = self.returns.column(target).select(Axis(0), &rows);
        (x, y)
    }
}

/// Estimates the cross-impact coefficient matrix.
///
/// Every call refits from scratch: one cross-validated Lasso per target
/// instrument on standardized OFI of all instruments.
#[derive(Debug, Clone)]
pub struct CrossImpactEstimator {
    lasso: LassoCv,
    std_floor: f64,
}

impl Default for CrossImpactEstimator {
    fn default() -> Self {
        Self::new(LassoCvConfig::default(), DEFAULT_STD_FLOOR)
    }
}

impl CrossImpactEstimator {
    pub fn new(regression: LassoCvConfig, std_floor: f64) -> Self {
        Self {
            lasso: LassoCv::new(regression),
            std_floor,
        }
    }

    pub fn regression(&self) -> &LassoCvConfig {
        self.lasso.config()
    }

    pub fn std_floor(&self) -> f64 {
        self.std_floor
    }

    pub fn estimate(&self, observations: &[ImpactObservation]) -> Result<CoefficientMatrix> {
        self.estimate_inner(observations).inspect_err(|e| {
            error!(stage = "cross_impact", error = %e, "cross-impact estimation failed");
        })
    }

    fn estimate_inner(&self, observations: &[ImpactObservation]) -> Result<CoefficientMatrix> {
        info!(rows = observations.len(), "Estimating cross-impact");

        if observations.is_empty() {
            return Err(Error::EmptyInput("cross-impact estimation requires observations"));
        }

        let panel = ImpactPanel::pivot(observations)?;
        debug!(
            timestamps = panel.timestamps.len(),
            instruments = panel.symbols.len(),
            "Pivoted observations"
        );

        let targets = 0..panel.symbols.len();

        #[cfg(feature = "parallel")]
        let rows: Vec<Array1<f64>> = targets
            .into_par_iter()
            .map(|t| self.fit_target(&panel, t))
            .collect::<Result<_>>()?;

        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Array1<f64>> = targets
            .map(|t| self.fit_target(&panel, t))
            .collect::<Result<_>>()?;

        let width = panel.symbols.len();
        let values = Array2::from_shape_vec(
            (rows.len(), width),
            rows.iter().flat_map(|r| r.iter().copied()).collect(),
        )?;

        let matrix = CoefficientMatrix::new(panel.symbols.clone(), panel.symbols, values)?;
        info!(
            targets = matrix.dim().0,
            predictors = matrix.dim().1,
            "Cross-impact estimation completed"
        );
        Ok(matrix)
    }

    fn fit_target(&self, panel: &ImpactPanel, target: usize) -> Result<Array1<f64>> {
        let symbol = &panel.symbols[target];
        let (x, y) = panel.design(target);

        let folds = self.lasso.config().folds;
        if y.len() < folds {
            return Err(Error::InsufficientSamples {
                target: symbol.clone(),
                samples: y.len(),
                folds,
            });
        }

        let x = Standardizer::fit_transform(&x, self.std_floor);
        let fit = self.lasso.fit(&x, &y)?;
        debug!(
            target = %symbol,
            samples = y.len(),
            alpha = fit.alpha,
            nonzero = fit.nonzero(),
            "Fitted target"
        );
        Ok(fit.coefficients)
    }
}
