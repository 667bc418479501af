//! Duplicate (ts_event, symbol) resolution before estimation.
//!
//! The estimator pivots on (ts_event, symbol) and needs a unique key. When
//! the joined table contains collisions the whole table is collapsed with a
//! [`DuplicatePolicy`]; without collisions it passes through unchanged.
//!
//! Collapsing is lossy: anything distinguishing the colliding rows beyond
//! the reduced fields is gone.

use crate::book::ImpactObservation;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// How rows sharing (ts_event, symbol) are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Average `ofi_pca`, `log_return` and `mid_price` (missing values skipped).
    #[default]
    Mean,
    /// Keep the first row of each key in input order.
    First,
    /// Keep the last row of each key in input order.
    Last,
    /// Fail with `Error::DuplicateKey`.
    Reject,
}

/// Resolves key collisions in joined OFI / returns tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor {
    policy: DuplicatePolicy,
}

impl Preprocessor {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Number of rows whose key is shared with at least one other row.
    pub fn count_duplicates(observations: &[ImpactObservation]) -> usize {
        let mut counts: BTreeMap<(DateTime<Utc>, &str), usize> = BTreeMap::new();
        for obs in observations {
            *counts.entry(obs.key()).or_default() += 1;
        }
        counts.values().filter(|&&c| c > 1).sum()
    }

    /// Collapse duplicates, or return the table unchanged when there are none.
    ///
    /// Collapsed output is sorted by (ts_event, symbol).
    pub fn process(&self, observations: Vec<ImpactObservation>) -> Result<Vec<ImpactObservation>> {
        self.process_inner(observations).inspect_err(|e| {
            error!(stage = "preprocess", error = %e, "data preprocessing failed");
        })
    }

    fn process_inner(&self, observations: Vec<ImpactObservation>) -> Result<Vec<ImpactObservation>> {
        info!(rows = observations.len(), "Preprocessing data");

        let duplicates = Self::count_duplicates(&observations);
        if duplicates == 0 {
            info!("Data preprocessing completed, no duplicates");
            return Ok(observations);
        }

        warn!(
            duplicate_rows = duplicates,
            policy = ?self.policy,
            "Duplicate (ts_event, symbol) entries found"
        );

        let mut groups: BTreeMap<(DateTime<Utc>, String), Vec<ImpactObservation>> = BTreeMap::new();
        for obs in observations {
            groups
                .entry((obs.ts_event, obs.symbol.clone()))
                .or_default()
                .push(obs);
        }

        let collapsed = groups
            .into_iter()
            .map(|((ts_event, symbol), rows)| self.collapse(ts_event, symbol, rows))
            .collect::<Result<Vec<_>>>()?;

        info!(rows = collapsed.len(), "Data preprocessing completed");
        Ok(collapsed)
    }

    fn collapse(
        &self,
        ts_event: DateTime<Utc>,
        symbol: String,
        mut rows: Vec<ImpactObservation>,
    ) -> Result<ImpactObservation> {
        match self.policy {
            DuplicatePolicy::Mean => Ok(ImpactObservation {
                ofi_pca: nan_mean(rows.iter().map(|r| r.ofi_pca)),
                log_return: nan_mean(rows.iter().map(|r| r.log_return)),
                mid_price: nan_mean(rows.iter().map(|r| r.mid_price)),
                ts_event,
                symbol,
            }),
            DuplicatePolicy::First => Ok(rows.swap_remove(0)),
            DuplicatePolicy::Last => rows
                .pop()
                .ok_or(Error::EmptyInput("duplicate group is empty")),
            DuplicatePolicy::Reject if rows.len() > 1 => {
                Err(Error::DuplicateKey { ts_event, symbol })
            }
            DuplicatePolicy::Reject => rows
                .pop()
                .ok_or(Error::EmptyInput("duplicate group is empty")),
        }
    }
}

/// Mean of the non-`NaN` values; `NaN` if there are none.
fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
