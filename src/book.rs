//! Row types flowing through the pipeline.
//!
//! Tables are plain `Vec`s of typed rows. Missing numeric values are `NaN`,
//! missing categorical values are `None`. Every stage builds a new table and
//! leaves its input untouched.
//!
//! ```text
//! BookSnapshot ──▶ OrderFlowRow ──▶ IntegratedOfiRow ─┐
//!      │                                              ├──▶ ImpactObservation
//!      └────────────▶ ReturnRow ──────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prices and sizes at one level of the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub bid_px: f64,
    pub ask_px: f64,
    pub bid_sz: f64,
    pub ask_sz: f64,
}

impl BookLevel {
    pub fn new(bid_px: f64, ask_px: f64, bid_sz: f64, ask_sz: f64) -> Self {
        Self {
            bid_px,
            ask_px,
            bid_sz,
            ask_sz,
        }
    }

    /// A level with every field missing.
    pub fn missing() -> Self {
        Self::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN)
    }
}

/// One observation of one instrument's book at one event time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub ts_event: DateTime<Utc>,
    pub symbol: String,
    /// Ladder levels, best first.
    pub levels: Vec<BookLevel>,
    /// Event action code (e.g. `A`dd, `C`ancel, `T`rade).
    pub action: Option<char>,
    /// Side of the triggering event.
    pub side: Option<char>,
    /// Price of the triggering event.
    pub price: Option<f64>,
}

impl BookSnapshot {
    pub fn new(ts_event: DateTime<Utc>, symbol: impl Into<String>, levels: Vec<BookLevel>) -> Self {
        Self {
            ts_event,
            symbol: symbol.into(),
            levels,
            action: None,
            side: None,
            price: None,
        }
    }

    /// Best bid/ask midpoint. `NaN` when level 0 is absent or incomplete.
    #[inline]
    pub fn mid_price(&self) -> f64 {
        match self.levels.first() {
            Some(best) => (best.bid_px + best.ask_px) / 2.0,
            None => f64::NAN,
        }
    }
}

/// Signed flow contributions at one level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelFlow {
    /// `of_{level}_b`
    pub bid: f64,
    /// `of_{level}_a`
    pub ask: f64,
}

/// A snapshot with its per-level order flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFlowRow {
    pub snapshot: BookSnapshot,
    pub flows: Vec<LevelFlow>,
}

impl OrderFlowRow {
    /// Flow values in reducer column order: bid flows, then ask flows.
    pub fn flow_vector(&self) -> Vec<f64> {
        self.flows
            .iter()
            .map(|f| f.bid)
            .chain(self.flows.iter().map(|f| f.ask))
            .collect()
    }
}

/// An order flow row with its integrated OFI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegratedOfiRow {
    pub row: OrderFlowRow,
    pub ofi_pca: f64,
}

impl IntegratedOfiRow {
    pub fn ts_event(&self) -> DateTime<Utc> {
        self.row.snapshot.ts_event
    }

    pub fn symbol(&self) -> &str {
        &self.row.snapshot.symbol
    }
}

/// Mid-price log-return of one instrument at one event time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRow {
    pub symbol: String,
    pub ts_event: DateTime<Utc>,
    pub log_return: f64,
}

/// Joined OFI / returns observation consumed by the estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactObservation {
    pub ts_event: DateTime<Utc>,
    pub symbol: String,
    pub ofi_pca: f64,
    pub log_return: f64,
    /// `NaN` when unknown.
    pub mid_price: f64,
}

impl ImpactObservation {
    pub fn new(
        ts_event: DateTime<Utc>,
        symbol: impl Into<String>,
        ofi_pca: f64,
        log_return: f64,
        mid_price: f64,
    ) -> Self {
        Self {
            ts_event,
            symbol: symbol.into(),
            ofi_pca,
            log_return,
            mid_price,
        }
    }

    /// The (ts_event, symbol) join key.
    pub fn key(&self) -> (DateTime<Utc>, &str) {
        (self.ts_event, self.symbol.as_str())
    }
}

/// Group row indices by symbol.
///
/// Groups come out in lexicographic symbol order; indices within a group keep
/// their input order.
pub(crate) fn group_by_symbol<'a, T, F>(rows: &'a [T], symbol: F) -> Vec<(&'a str, Vec<usize>)>
where
    F: Fn(&'a T) -> &'a str,
{
    let mut groups: std::collections::BTreeMap<&'a str, Vec<usize>> = Default::default();
    for (idx, row) in rows.iter().enumerate() {
        groups.entry(symbol(row)).or_default().push(idx);
    }
    groups.into_iter().collect()
}
