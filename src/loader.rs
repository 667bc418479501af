//! CSV loading of MBP-10 style book snapshots.
//!
//! The header must carry `symbol`, `ts_event` and the four ladder columns for
//! every configured level; anything else (`rtype`, `publisher_id`, order
//! counts, ...) is ignored. `action`, `side` and `price` are read when present.
//! The header is checked before any row is read.
//!
//! Empty numeric cells load as `NaN`; empty categorical cells as `None`.
//!
//! ```ignore
//! use ofi_cross_impact::loader::CsvBookLoader;
//!
//! let snapshots = CsvBookLoader::new(5).load_path("data/mbp10.csv")?;
//! ```

use crate::book::{BookLevel, BookSnapshot};
use crate::error::{Error, Result};
use crate::schema::{self, parse_event_time};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{error, info};

/// Reads book snapshots from CSV.
#[derive(Debug, Clone, Copy)]
pub struct CsvBookLoader {
    levels: usize,
}

impl Default for CsvBookLoader {
    fn default() -> Self {
        Self::new(schema::DEFAULT_LEVELS)
    }
}

#[derive(Debug)]
struct LevelIndex {
    bid_px: usize,
    ask_px: usize,
    bid_sz: usize,
    ask_sz: usize,
}

#[derive(Debug)]
struct HeaderIndex {
    symbol: usize,
    ts_event: usize,
    levels: Vec<LevelIndex>,
    action: Option<usize>,
    side: Option<usize>,
    price: Option<usize>,
}

impl HeaderIndex {
    fn resolve(headers: &StringRecord, levels: usize) -> Result<Self> {
        schema::require_columns(headers.iter(), &schema::order_flow_columns(levels))?;

        let position = |name: &str| headers.iter().position(|h| h == name);
        let required = |name: String| {
            position(&name).ok_or(Error::Schema {
                missing: vec![name],
            })
        };

        Ok(Self {
            symbol: required(schema::SYMBOL.to_string())?,
            ts_event: required(schema::TS_EVENT.to_string())?,
            levels: (0..levels)
                .map(|l| {
                    Ok(LevelIndex {
                        bid_px: required(schema::bid_px(l))?,
                        ask_px: required(schema::ask_px(l))?,
                        bid_sz: required(schema::bid_sz(l))?,
                        ask_sz: required(schema::ask_sz(l))?,
                    })
                })
                .collect::<Result<_>>()?,
            action: position(schema::ACTION),
            side: position(schema::SIDE),
            price: position(schema::PRICE),
        })
    }
}

impl CsvBookLoader {
    pub fn new(levels: usize) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Load every row of a CSV file.
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<BookSnapshot>> {
        let path = path.as_ref();
        info!(path = %path.display(), levels = self.levels, "Loading book snapshots");
        File::open(path)
            .map_err(Error::from)
            .and_then(|file| self.load_reader(file))
            .inspect_err(|e| {
                error!(stage = "load", path = %path.display(), error = %e, "loading failed");
            })
    }

    /// Load every row from any reader yielding CSV with a header line.
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<Vec<BookSnapshot>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let index = HeaderIndex::resolve(reader.headers()?, self.levels)?;

        let mut snapshots = Vec::new();
        let mut record = StringRecord::new();
        loop {
            let line = reader.position().line();
            let more = reader
                .read_record(&mut record)
                .map_err(|source| Error::CsvLine { line, source })?;
            if !more {
                break;
            }
            let line = record.position().map_or(line, |p| p.line());
            snapshots.push(self.parse_record(&record, &index, line)?);
        }

        info!(rows = snapshots.len(), "Book snapshots loaded");
        Ok(snapshots)
    }

    fn parse_record(&self, record: &StringRecord, index: &HeaderIndex, line: u64) -> Result<BookSnapshot> {
        let cell = |i: usize| record.get(i).unwrap_or("");
        let number = |i: usize, column: String| -> Result<f64> {
            let raw = cell(i);
            if raw.is_empty() {
                return Ok(f64::NAN);
            }
            raw.parse().map_err(|_| Error::Value {
                line,
                column,
                value: raw.to_string(),
            })
        };

        let ts_event = parse_event_time(cell(index.ts_event)).map_err(|e| match e {
            Error::Time(msg) => Error::Time(format!("line {line}: {msg}")),
            other => other,
        })?;

        let levels = index
            .levels
            .iter()
            .enumerate()
            .map(|(l, idx)| {
                Ok(BookLevel::new(
                    number(idx.bid_px, schema::bid_px(l))?,
                    number(idx.ask_px, schema::ask_px(l))?,
                    number(idx.bid_sz, schema::bid_sz(l))?,
                    number(idx.ask_sz, schema::ask_sz(l))?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let code = |i: Option<usize>| i.and_then(|i| cell(i).chars().next());
        let price = match index.price {
            Some(i) if !cell(i).is_empty() => Some(number(i, schema::PRICE.to_string())?),
            _ => None,
        };

        Ok(BookSnapshot {
            action: code(index.action),
            side: code(index.side),
            price,
            ..BookSnapshot::new(ts_event, cell(index.symbol), levels)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const HEADER: &str = "ts_recv,ts_event,action,side,price,size,bid_px_00,ask_px_00,bid_sz_00,ask_sz_00,symbol";

    #[test]
    fn test_load_single_level() {
        let csv = format!(
            "{HEADER}\n\
             0,2024-01-02T14:30:00Z,A,B,100.0,5,100.0,100.5,10,20,AAPL\n\
             0,1704205800500000000,T,,,1,100.0,100.5,,20,AAPL\n"
        );
        let snapshots = CsvBookLoader::new(1).load_reader(csv.as_bytes()).unwrap();
        assert_eq!(snapshots.len(), 2);

        let first = &snapshots[0];
        assert_eq!(first.symbol, "AAPL");
        assert_eq!(first.ts_event, Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap());
        assert_eq!(first.action, Some('A'));
        assert_eq!(first.side, Some('B'));
        assert_eq!(first.price, Some(100.0));
        assert_eq!(first.levels[0], BookLevel::new(100.0, 100.5, 10.0, 20.0));

        let second = &snapshots[1];
        assert_eq!(second.side, None);
        assert_eq!(second.price, None);
        assert!(second.levels[0].bid_sz.is_nan());
        assert_eq!(second.ts_event.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_missing_level_columns() {
        let csv = format!("{HEADER}\n");
        let err = CsvBookLoader::new(2).load_reader(csv.as_bytes()).unwrap_err();
        match err {
            Error::Schema { missing } => {
                assert_eq!(missing, vec!["bid_px_01", "ask_px_01", "bid_sz_01", "ask_sz_01"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_cell_reports_line() {
        let csv = format!(
            "{HEADER}\n\
             0,2024-01-02T14:30:00Z,A,B,100.0,5,100.0,100.5,10,20,AAPL\n\
             0,2024-01-02T14:30:01Z,A,B,100.0,5,abc,100.5,10,20,AAPL\n"
        );
        let err = CsvBookLoader::new(1).load_reader(csv.as_bytes()).unwrap_err();
        match err {
            Error::Value { line, column, value } => {
                assert_eq!(line, 3);
                assert_eq!(column, "bid_px_00");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_time() {
        let csv = format!("{HEADER}\n0,yesterday,A,B,1,1,1,2,1,1,AAPL\n");
        let err = CsvBookLoader::new(1).load_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Time(msg) if msg.starts_with("line 2")));
    }
}
