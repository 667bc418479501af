//! Mid-price log-returns.
//!
//! ```text
//! mid_price[t]  = (bid_px_00[t] + ask_px_00[t]) / 2
//! log_return[t] = ln(mid_price[t] / mid_price[t-1])
//! ```
//!
//! Returns are taken between consecutive rows of the same instrument in the
//! order supplied; callers pass time-ordered data. The first row of each
//! instrument and every non-finite return are dropped.

use crate::book::{group_by_symbol, BookSnapshot, ReturnRow};
use crate::error::{Error, Result};
use crate::schema;
use tracing::{debug, error, info};

/// Computes per-instrument log-returns of the best bid/ask midpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnsCalculator;

impl ReturnsCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(&self, snapshots: &[BookSnapshot]) -> Result<Vec<ReturnRow>> {
        self.calculate_inner(snapshots).inspect_err(|e| {
            error!(stage = "returns", error = %e, "log return calculation failed");
        })
    }

    fn calculate_inner(&self, snapshots: &[BookSnapshot]) -> Result<Vec<ReturnRow>> {
        info!(rows = snapshots.len(), "Calculating log returns from mid-price");

        if snapshots.is_empty() {
            return Err(Error::EmptyInput("returns calculation requires snapshots"));
        }
        if let Some(short) = snapshots.iter().find(|s| s.levels.is_empty()) {
            schema::require_columns(schema::snapshot_columns(short), &schema::returns_columns())?;
        }

        let mut returns = Vec::with_capacity(snapshots.len());
        let mut dropped = 0usize;

        for (symbol, indices) in group_by_symbol(snapshots, |s| s.symbol.as_str()) {
            debug!(symbol, observations = indices.len(), "Computing returns");
            for pair in indices.windows(2) {
                let prev = &snapshots[pair[0]];
                let curr = &snapshots[pair[1]];
                let log_return = (curr.mid_price() / prev.mid_price()).ln();
                if log_return.is_finite() {
                    returns.push(ReturnRow {
                        symbol: symbol.to_string(),
                        ts_event: curr.ts_event,
                        log_return,
                    });
                } else {
                    dropped += 1;
                }
            }
        }

        info!(
            rows = returns.len(),
            non_finite_dropped = dropped,
            "Log returns calculated"
        );
        Ok(returns)
    }
}
