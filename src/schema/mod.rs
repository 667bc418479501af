//! Table Schema Module
//!
//! Canonical column names and the validation rules shared by every pipeline
//! stage. Typed rows and CSV headers are checked against the same lists, so a
//! missing ladder level is reported identically regardless of where the data
//! came from.
//!
//! # Column Layout
//!
//! | Column | Meaning |
//! |--------|---------|
//! | `symbol` | Instrument identifier |
//! | `ts_event` | Event time |
//! | `bid_px_{l:02}` / `ask_px_{l:02}` | Price at level `l` |
//! | `bid_sz_{l:02}` / `ask_sz_{l:02}` | Size at level `l` |
//! | `of_{l}_b` / `of_{l}_a` | Order flow at level `l` |
//! | `ofi_pca` | Integrated OFI |
//! | `log_return` | Mid-price log-return |
//!
//! # Example
//!
//! ```
//! use ofi_cross_impact::schema::{order_flow_columns, require_columns};
//!
//! let required = order_flow_columns(1);
//! assert_eq!(required.len(), 6);
//!
//! let available = ["symbol", "ts_event", "bid_px_00", "ask_px_00"];
//! let err = require_columns(available, &required).unwrap_err();
//! assert!(err.is_schema());
//! ```

mod columns;
mod time;

pub use columns::{
    ask_px, ask_sz, bid_px, bid_sz, flow_ask, flow_bid, flow_columns, order_flow_columns,
    require_columns, returns_columns, snapshot_columns, ACTION, LOG_RETURN, MID_PRICE, OFI_PCA,
    PRICE, SIDE, SYMBOL, TS_EVENT,
};
pub use time::parse_event_time;

/// Default number of book levels used for order flow.
pub const DEFAULT_LEVELS: usize = 5;

/// Deepest ladder supported (MBP-10).
pub const MAX_LEVELS: usize = 10;
