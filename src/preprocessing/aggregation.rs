//! Fixed-interval time aggregation of book snapshots.
//!
//! Resamples each instrument's snapshots into buckets of a fixed width and
//! reduces every field with its own rule:
//!
//! | Field | Rule |
//! |-------|------|
//! | `bid_px_*`, `ask_px_*` | last observed value |
//! | `bid_sz_*`, `ask_sz_*` | sum |
//! | `of_*_b`, `of_*_a` (flow rows) | sum |
//! | `action`, `side`, `price` | last observed value |
//!
//! "Last observed" skips missing values; a bucket without observations yields
//! `NaN` / `None` for last-rules and `0` for sums. Every bucket between an
//! instrument's first and last observation is materialized, including empty
//! ones.
//!
//! # Intervals
//!
//! Interval strings follow the usual resampling grammar: an optional count and
//! a unit, e.g. `"1S"`, `"5s"`, `"250ms"`, `"1min"`, `"1H"`.
//!
//! | Unit | Aliases |
//! |------|---------|
//! | nanoseconds | `ns`, `N` |
//! | microseconds | `us`, `U` |
//! | milliseconds | `ms`, `L` |
//! | seconds | `s`, `S` |
//! | minutes | `min`, `T` |
//! | hours | `h`, `H` |
//! | days | `d`, `D` |
//!
//! # Example
//!
//! ```ignore
//! use ofi_cross_impact::preprocessing::Aggregator;
//!
//! let aggregator = Aggregator::from_interval_str(5, "1S")?;
//! let buckets = aggregator.aggregate_snapshots(&snapshots)?;
//! ```

use crate::book::{group_by_symbol, BookLevel, BookSnapshot, LevelFlow, OrderFlowRow};
use crate::error::{Error, Result};
use crate::schema;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info};

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Width of a resampling bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResampleInterval {
    nanos: i64,
}

impl ResampleInterval {
    /// Create an interval from a positive number of nanoseconds.
    pub fn from_nanos(nanos: i64) -> Result<Self> {
        if nanos <= 0 {
            return Err(Error::Interval(format!("{nanos}ns is not positive")));
        }
        Ok(Self { nanos })
    }

    pub fn from_secs(secs: i64) -> Result<Self> {
        secs.checked_mul(NANOS_PER_SEC)
            .ok_or_else(|| Error::Interval(format!("{secs}s overflows")))
            .and_then(Self::from_nanos)
    }

    /// Parse an interval string such as `"1S"` or `"250ms"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let split = raw
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| Error::Interval(format!("'{raw}' has no unit")))?;
        let (count, unit) = raw.split_at(split);

        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| Error::Interval(format!("'{raw}' has an invalid count")))?
        };

        let unit_nanos = match unit {
            "ns" | "N" => 1,
            "us" | "U" => NANOS_PER_MICRO,
            "ms" | "L" => NANOS_PER_MILLI,
            "s" | "S" => NANOS_PER_SEC,
            "min" | "T" => 60 * NANOS_PER_SEC,
            "h" | "H" => 3_600 * NANOS_PER_SEC,
            "d" | "D" => 86_400 * NANOS_PER_SEC,
            _ => return Err(Error::Interval(format!("'{raw}' has unknown unit '{unit}'"))),
        };

        count
            .checked_mul(unit_nanos)
            .ok_or_else(|| Error::Interval(format!("'{raw}' overflows")))
            .and_then(Self::from_nanos)
    }

    #[inline]
    pub fn as_nanos(&self) -> i64 {
        self.nanos
    }

    /// Bucket index (epoch-aligned floor) of a timestamp.
    #[inline]
    fn bucket_of(&self, ts: DateTime<Utc>) -> Result<i64> {
        ts.timestamp_nanos_opt()
            .map(|nanos| nanos.div_euclid(self.nanos))
            .ok_or_else(|| Error::Time(format!("{ts} is outside the nanosecond range")))
    }

    #[inline]
    fn bucket_start(&self, bucket: i64) -> DateTime<Utc> {
        Utc.timestamp_nanos(bucket * self.nanos)
    }

    /// Start of the bucket containing `ts`.
    pub fn floor(&self, ts: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.bucket_of(ts).map(|b| self.bucket_start(b))
    }
}

impl FromStr for ResampleInterval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ResampleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.nanos;
        if n % (60 * NANOS_PER_SEC) == 0 {
            write!(f, "{}min", n / (60 * NANOS_PER_SEC))
        } else if n % NANOS_PER_SEC == 0 {
            write!(f, "{}s", n / NANOS_PER_SEC)
        } else if n % NANOS_PER_MILLI == 0 {
            write!(f, "{}ms", n / NANOS_PER_MILLI)
        } else if n % NANOS_PER_MICRO == 0 {
            write!(f, "{}us", n / NANOS_PER_MICRO)
        } else {
            write!(f, "{n}ns")
        }
    }
}

/// Running reduction of one bucket.
struct Bucket {
    levels: Vec<BookLevel>,
    flows: Option<Vec<LevelFlow>>,
    action: Option<char>,
    side: Option<char>,
    price: Option<f64>,
}

impl Bucket {
    fn empty(levels: usize, with_flows: bool) -> Self {
        Self {
            levels: vec![BookLevel::new(f64::NAN, f64::NAN, 0.0, 0.0); levels],
            flows: with_flows.then(|| vec![LevelFlow { bid: 0.0, ask: 0.0 }; levels]),
            action: None,
            side: None,
            price: None,
        }
    }

    fn push(&mut self, snapshot: &BookSnapshot, flows: Option<&[LevelFlow]>) {
        for (acc, level) in self.levels.iter_mut().zip(&snapshot.levels) {
            last(&mut acc.bid_px, level.bid_px);
            last(&mut acc.ask_px, level.ask_px);
            sum(&mut acc.bid_sz, level.bid_sz);
            sum(&mut acc.ask_sz, level.ask_sz);
        }

        if let (Some(acc), Some(flows)) = (self.flows.as_mut(), flows) {
            for (acc, flow) in acc.iter_mut().zip(flows) {
                sum(&mut acc.bid, flow.bid);
                sum(&mut acc.ask, flow.ask);
            }
        }

        if snapshot.action.is_some() {
            self.action = snapshot.action;
        }
        if snapshot.side.is_some() {
            self.side = snapshot.side;
        }
        if let Some(price) = snapshot.price.filter(|p| !p.is_nan()) {
            self.price = Some(price);
        }
    }

    fn finish(self, ts_event: DateTime<Utc>, symbol: &str) -> (BookSnapshot, Option<Vec<LevelFlow>>) {
        let snapshot = BookSnapshot {
            ts_event,
            symbol: symbol.to_string(),
            levels: self.levels,
            action: self.action,
            side: self.side,
            price: self.price,
        };
        (snapshot, self.flows)
    }
}

#[inline]
fn last(acc: &mut f64, value: f64) {
    if !value.is_nan() {
        *acc = value;
    }
}

#[inline]
fn sum(acc: &mut f64, value: f64) {
    if !value.is_nan() {
        *acc += value;
    }
}

/// Resamples snapshot or order flow tables into fixed time buckets per instrument.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    levels: usize,
    interval: ResampleInterval,
}

impl Aggregator {
    pub fn new(levels: usize, interval: ResampleInterval) -> Self {
        Self { levels, interval }
    }

    /// Create an aggregator from an interval string such as `"1S"`.
    pub fn from_interval_str(levels: usize, interval: &str) -> Result<Self> {
        Ok(Self::new(levels, ResampleInterval::parse(interval)?))
    }

    pub fn interval(&self) -> ResampleInterval {
        self.interval
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Aggregate raw book snapshots.
    pub fn aggregate_snapshots(&self, snapshots: &[BookSnapshot]) -> Result<Vec<BookSnapshot>> {
        self.resample(snapshots, |s| s, |_| None)
            .map(|buckets| buckets.into_iter().map(|(snapshot, _)| snapshot).collect())
            .inspect_err(|e| {
                error!(stage = "aggregation", error = %e, "snapshot aggregation failed");
            })
    }

    /// Aggregate order flow rows; flow columns are summed per bucket.
    pub fn aggregate_flows(&self, rows: &[OrderFlowRow]) -> Result<Vec<OrderFlowRow>> {
        self.validate_flows(rows)
            .and_then(|_| self.resample(rows, |r| &r.snapshot, |r| Some(r.flows.as_slice())))
            .map(|buckets| {
                buckets
                    .into_iter()
                    .map(|(snapshot, flows)| OrderFlowRow {
                        snapshot,
                        flows: flows.unwrap_or_default(),
                    })
                    .collect()
            })
            .inspect_err(|e| {
                error!(stage = "aggregation", error = %e, "order flow aggregation failed");
            })
    }

    fn validate_flows(&self, rows: &[OrderFlowRow]) -> Result<()> {
        match rows.iter().find(|r| r.flows.len() < self.levels) {
            Some(short) => {
                let available = (0..short.flows.len())
                    .flat_map(|l| [schema::flow_bid(l), schema::flow_ask(l)]);
                let required: Vec<String> = (0..self.levels)
                    .flat_map(|l| [schema::flow_bid(l), schema::flow_ask(l)])
                    .collect();
                schema::require_columns(available, &required)
            }
            None => Ok(()),
        }
    }

    fn resample<'a, T, S, F>(
        &self,
        rows: &'a [T],
        snapshot: S,
        flows: F,
    ) -> Result<Vec<(BookSnapshot, Option<Vec<LevelFlow>>)>>
    where
        S: Fn(&'a T) -> &'a BookSnapshot,
        F: Fn(&'a T) -> Option<&'a [LevelFlow]>,
    {
        info!(
            rows = rows.len(),
            interval = %self.interval,
            "Aggregating order book data"
        );

        if rows.is_empty() {
            return Err(Error::EmptyInput("aggregation requires rows"));
        }
        let required = schema::order_flow_columns(self.levels);
        if let Some(short) = rows.iter().map(&snapshot).find(|s| s.levels.len() < self.levels) {
            schema::require_columns(schema::snapshot_columns(short), &required)?;
        }

        let with_flows = flows(&rows[0]).is_some();
        let mut output = Vec::new();

        for (symbol, mut indices) in group_by_symbol(rows, |r| snapshot(r).symbol.as_str()) {
            indices.sort_by_key(|&i| snapshot(&rows[i]).ts_event);

            let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
            for &i in &indices {
                let snap = snapshot(&rows[i]);
                let bucket = self.interval.bucket_of(snap.ts_event)?;
                buckets
                    .entry(bucket)
                    .or_insert_with(|| Bucket::empty(self.levels, with_flows))
                    .push(snap, flows(&rows[i]));
            }

            let (Some(&first_bucket), Some(&last_bucket)) =
                (buckets.keys().next(), buckets.keys().next_back())
            else {
                continue;
            };
            debug!(
                symbol,
                observations = indices.len(),
                buckets = last_bucket - first_bucket + 1,
                "Resampled symbol"
            );

            for bucket in first_bucket..=last_bucket {
                let acc = buckets
                    .remove(&bucket)
                    .unwrap_or_else(|| Bucket::empty(self.levels, with_flows));
                output.push(acc.finish(self.interval.bucket_start(bucket), symbol));
            }
        }

        info!(rows = output.len(), "Order book data aggregation completed");
        Ok(output)
    }
}
