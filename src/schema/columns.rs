//! Column names and required-column checks.

use crate::book::BookSnapshot;
use crate::error::{Error, Result};

pub const SYMBOL: &str = "symbol";
pub const TS_EVENT: &str = "ts_event";
pub const ACTION: &str = "action";
pub const SIDE: &str = "side";
pub const PRICE: &str = "price";
pub const OFI_PCA: &str = "ofi_pca";
pub const LOG_RETURN: &str = "log_return";
pub const MID_PRICE: &str = "mid_price";

pub fn bid_px(level: usize) -> String {
    format!("bid_px_{level:02}")
}

pub fn ask_px(level: usize) -> String {
    format!("ask_px_{level:02}")
}

pub fn bid_sz(level: usize) -> String {
    format!("bid_sz_{level:02}")
}

pub fn ask_sz(level: usize) -> String {
    format!("ask_sz_{level:02}")
}

pub fn flow_bid(level: usize) -> String {
    format!("of_{level}_b")
}

pub fn flow_ask(level: usize) -> String {
    format!("of_{level}_a")
}

/// Columns required by the order flow calculator and the aggregator.
///
/// `symbol`, `ts_event`, then `bid_px`, `ask_px`, `bid_sz`, `ask_sz` per level
/// (`4 * levels + 2` names).
pub fn order_flow_columns(levels: usize) -> Vec<String> {
    let mut columns = Vec::with_capacity(4 * levels + 2);
    columns.push(SYMBOL.to_string());
    columns.push(TS_EVENT.to_string());
    for level in 0..levels {
        columns.push(bid_px(level));
        columns.push(ask_px(level));
        columns.push(bid_sz(level));
        columns.push(ask_sz(level));
    }
    columns
}

/// Columns required by the returns calculator.
pub fn returns_columns() -> Vec<String> {
    vec![
        SYMBOL.to_string(),
        TS_EVENT.to_string(),
        bid_px(0),
        ask_px(0),
    ]
}

/// Flow columns in reducer order: all bid flows, then all ask flows.
pub fn flow_columns(levels: usize) -> Vec<String> {
    (0..levels)
        .map(flow_bid)
        .chain((0..levels).map(flow_ask))
        .collect()
}

/// Columns a typed snapshot carries.
pub fn snapshot_columns(snapshot: &BookSnapshot) -> Vec<String> {
    let mut columns = vec![SYMBOL.to_string(), TS_EVENT.to_string()];
    for level in 0..snapshot.levels.len() {
        columns.push(bid_px(level));
        columns.push(ask_px(level));
        columns.push(bid_sz(level));
        columns.push(ask_sz(level));
    }
    if snapshot.action.is_some() {
        columns.push(ACTION.to_string());
    }
    if snapshot.side.is_some() {
        columns.push(SIDE.to_string());
    }
    if snapshot.price.is_some() {
        columns.push(PRICE.to_string());
    }
    columns
}

/// Check that every required column is available.
///
/// Returns `Error::Schema` listing the missing names in required order.
pub fn require_columns<I, S>(available: I, required: &[String]) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let available: ahash::AHashSet<String> = available
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .collect();

    let missing: Vec<String> = required
        .iter()
        .filter(|col| !available.contains(col.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Schema { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        assert_eq!(bid_px(0), "bid_px_00");
        assert_eq!(ask_sz(9), "ask_sz_09");
        assert_eq!(flow_bid(3), "of_3_b");
        assert_eq!(flow_ask(0), "of_0_a");
    }

    #[test]
    fn test_order_flow_columns_count() {
        for levels in 1..=10 {
            assert_eq!(order_flow_columns(levels).len(), 4 * levels + 2);
        }
    }

    #[test]
    fn test_flow_columns_order() {
        assert_eq!(
            flow_columns(2),
            vec!["of_0_b", "of_1_b", "of_0_a", "of_1_a"]
        );
    }

    #[test]
    fn test_require_columns_reports_all_missing() {
        let available = ["symbol", "ts_event", "bid_px_00", "bid_sz_00"];
        let err = require_columns(available, &order_flow_columns(1)).unwrap_err();
        match err {
            Error::Schema { missing } => assert_eq!(missing, vec!["ask_px_00", "ask_sz_00"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_require_columns_ignores_extra() {
        let mut available = order_flow_columns(2);
        available.push("action".to_string());
        assert!(require_columns(&available, &order_flow_columns(2)).is_ok());
    }
}
