//! Per-level Order Flow
//!
//! Converts a time-ordered bid/ask ladder into signed order flow increments at
//! every level, following the multi-level OFI construction of Cont et al.
//! ("The Price Impact of Order Book Events", 2014) and its multi-level
//! extension.
//!
//! # Flow Definition
//!
//! For consecutive snapshots `t-1`, `t` of the same instrument:
//!
//! ```text
//! bid_flow[t] =  bid_sz[t]                  if bid_px[t] >  bid_px[t-1]
//!             =  bid_sz[t] - bid_sz[t-1]    if bid_px[t] == bid_px[t-1]
//!             = -bid_sz[t]                  if bid_px[t] <  bid_px[t-1]
//!
//! ask_flow[t] = -ask_sz[t]                  if ask_px[t] >  ask_px[t-1]
//!             =  ask_sz[t] - ask_sz[t-1]    if ask_px[t] == ask_px[t-1]
//!             =  ask_sz[t]                  if ask_px[t] <  ask_px[t-1]
//! ```
//!
//! The first snapshot of each instrument has no predecessor and produces no
//! output row.
//!
//! # Example
//!
//! ```ignore
//! use ofi_cross_impact::features::order_flow::OrderFlowCalculator;
//!
//! let calculator = OrderFlowCalculator::new(5);
//! let flows = calculator.calculate(&snapshots)?;
//! println!("of_0_b = {}", flows[0].flows[0].bid);
//! ```

use crate::book::{group_by_symbol, BookSnapshot, LevelFlow, OrderFlowRow};
use crate::error::{Error, Result};
use crate::schema::{self, DEFAULT_LEVELS};
use tracing::{debug, error, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Bid-side flow between two observations of one level.
///
/// `NaN` when either price is missing.
#[inline]
pub fn bid_flow(prev_px: f64, prev_sz: f64, curr_px: f64, curr_sz: f64) -> f64 {
    if prev_px.is_nan() || curr_px.is_nan() {
        f64::NAN
    } else if curr_px > prev_px {
        // New best queue: all of it is inflow
        curr_sz
    } else if curr_px < prev_px {
        -curr_sz
    } else {
        curr_sz - prev_sz
    }
}

/// Ask-side flow between two observations of one level.
///
/// `NaN` when either price is missing.
#[inline]
pub fn ask_flow(prev_px: f64, prev_sz: f64, curr_px: f64, curr_sz: f64) -> f64 {
    if prev_px.is_nan() || curr_px.is_nan() {
        f64::NAN
    } else if curr_px > prev_px {
        -curr_sz
    } else if curr_px < prev_px {
        curr_sz
    } else {
        curr_sz - prev_sz
    }
}

/// Computes per-level order flow for every instrument in a snapshot table.
#[derive(Debug, Clone, Copy)]
pub struct OrderFlowCalculator {
    levels: usize,
}

impl OrderFlowCalculator {
    pub fn new(levels: usize) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Validate that every snapshot carries the configured number of levels.
    pub fn validate(&self, snapshots: &[BookSnapshot]) -> Result<()> {
        let required = schema::order_flow_columns(self.levels);
        match snapshots.iter().find(|s| s.levels.len() < self.levels) {
            Some(short) => schema::require_columns(schema::snapshot_columns(short), &required),
            None => Ok(()),
        }
    }

    /// Compute order flow rows.
    ///
    /// Instruments are processed independently (in parallel with the
    /// `parallel` feature); output is grouped by instrument in symbol order,
    /// ascending time within each instrument.
    pub fn calculate(&self, snapshots: &[BookSnapshot]) -> Result<Vec<OrderFlowRow>> {
        self.calculate_inner(snapshots).inspect_err(|e| {
            error!(stage = "order_flow", error = %e, "order flow calculation failed");
        })
    }

    fn calculate_inner(&self, snapshots: &[BookSnapshot]) -> Result<Vec<OrderFlowRow>> {
        info!(
            rows = snapshots.len(),
            levels = self.levels,
            "Calculating order flows"
        );

        if snapshots.is_empty() {
            return Err(Error::EmptyInput("order flow calculation requires snapshots"));
        }
        self.validate(snapshots)?;

        let groups = group_by_symbol(snapshots, |s| s.symbol.as_str());

        #[cfg(feature = "parallel")]
        let per_symbol: Vec<Vec<OrderFlowRow>> = groups
            .par_iter()
            .map(|(symbol, indices)| self.process_symbol(symbol, snapshots, indices))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let per_symbol: Vec<Vec<OrderFlowRow>> = groups
            .iter()
            .map(|(symbol, indices)| self.process_symbol(symbol, snapshots, indices))
            .collect();

        let rows: Vec<OrderFlowRow> = per_symbol.into_iter().flatten().collect();
        info!(rows = rows.len(), "Order flow calculation completed");
        Ok(rows)
    }

    fn process_symbol(
        &self,
        symbol: &str,
        snapshots: &[BookSnapshot],
        indices: &[usize],
    ) -> Vec<OrderFlowRow> {
        debug!(symbol, observations = indices.len(), "Processing symbol");

        let mut ordered: Vec<&BookSnapshot> = indices.iter().map(|&i| &snapshots[i]).collect();
        ordered.sort_by_key(|s| s.ts_event);

        ordered
            .windows(2)
            .map(|pair| {
                let (prev, curr) = (pair[0], pair[1]);
                OrderFlowRow {
                    snapshot: curr.clone(),
                    flows: self.level_flows(prev, curr),
                }
            })
            .collect()
    }

    fn level_flows(&self, prev: &BookSnapshot, curr: &BookSnapshot) -> Vec<LevelFlow> {
        prev.levels[..self.levels]
            .iter()
            .zip(&curr.levels[..self.levels])
            .map(|(p, c)| LevelFlow {
                bid: bid_flow(p.bid_px, p.bid_sz, c.bid_px, c.bid_sz),
                ask: ask_flow(p.ask_px, p.ask_sz, c.ask_px, c.ask_sz),
            })
            .collect()
    }
}

impl Default for OrderFlowCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_LEVELS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookLevel;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn snap(secs: i64, symbol: &str, bid: (f64, f64), ask: (f64, f64)) -> BookSnapshot {
        BookSnapshot::new(
            ts(secs),
            symbol,
            vec![BookLevel::new(bid.0, ask.0, bid.1, ask.1)],
        )
    }

    #[test]
    fn test_bid_flow_branches() {
        assert_eq!(bid_flow(100.0, 50.0, 101.0, 30.0), 30.0);
        assert_eq!(bid_flow(100.0, 50.0, 100.0, 80.0), 30.0);
        assert_eq!(bid_flow(100.0, 50.0, 99.0, 30.0), -30.0);
        assert!(bid_flow(f64::NAN, 50.0, 99.0, 30.0).is_nan());
    }

    #[test]
    fn test_ask_flow_branches() {
        assert_eq!(ask_flow(100.0, 50.0, 101.0, 30.0), -30.0);
        assert_eq!(ask_flow(100.0, 50.0, 100.0, 20.0), -30.0);
        assert_eq!(ask_flow(100.0, 50.0, 99.0, 30.0), 30.0);
        assert!(ask_flow(100.0, 50.0, f64::NAN, 30.0).is_nan());
    }

    #[test]
    fn test_first_row_per_symbol_dropped() {
        let rows = vec![
            snap(0, "A", (10.0, 5.0), (11.0, 5.0)),
            snap(1, "A", (10.0, 7.0), (11.0, 4.0)),
            snap(0, "B", (20.0, 5.0), (21.0, 5.0)),
        ];
        let flows = OrderFlowCalculator::new(1).calculate(&rows).unwrap();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].snapshot.symbol, "A");
        assert_eq!(flows[0].flows[0], LevelFlow { bid: 2.0, ask: -1.0 });
    }

    #[test]
    fn test_sorts_by_time_within_symbol() {
        let rows = vec![
            snap(2, "A", (10.0, 9.0), (11.0, 5.0)),
            snap(0, "A", (10.0, 5.0), (11.0, 5.0)),
            snap(1, "A", (10.0, 6.0), (11.0, 5.0)),
        ];
        let flows = OrderFlowCalculator::new(1).calculate(&rows).unwrap();
        let times: Vec<i64> = flows.iter().map(|r| r.snapshot.ts_event.timestamp()).collect();
        assert_eq!(times, vec![1, 2]);
        assert_eq!(flows[0].flows[0].bid, 1.0);
        assert_eq!(flows[1].flows[0].bid, 3.0);
    }

    #[test]
    fn test_missing_levels_is_schema_error() {
        let rows = vec![snap(0, "A", (10.0, 5.0), (11.0, 5.0))];
        let err = OrderFlowCalculator::new(2).calculate(&rows).unwrap_err();
        match err {
            Error::Schema { missing } => {
                assert_eq!(missing, vec!["bid_px_01", "ask_px_01", "bid_sz_01", "ask_sz_01"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_input() {
        let err = OrderFlowCalculator::default().calculate(&[]).unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[test]
    fn test_extra_levels_ignored() {
        let mut a = snap(0, "A", (10.0, 5.0), (11.0, 5.0));
        let mut b = snap(1, "A", (10.0, 5.0), (11.0, 5.0));
        a.levels.push(BookLevel::new(9.0, 12.0, 1.0, 1.0));
        b.levels.push(BookLevel::new(9.5, 12.0, 2.0, 1.0));
        let flows = OrderFlowCalculator::new(1).calculate(&[a, b]).unwrap();
        assert_eq!(flows[0].flows.len(), 1);
    }
}
