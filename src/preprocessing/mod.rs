//! Table preprocessing between feature computation and estimation.
//!
//! - **Aggregation**: resample snapshots or flow rows into fixed time buckets
//!   with per-field reduction rules (last price, summed size and flow)
//! - **Deduplication**: collapse rows sharing (ts_event, symbol) with a
//!   configurable policy
//! - **Normalization**: column standardization with a zero-variance floor
//!
//! # Example
//!
//! ```ignore
//! use ofi_cross_impact::preprocessing::{Aggregator, DuplicatePolicy, Preprocessor};
//!
//! let aggregator = Aggregator::from_interval_str(5, "5S")?;
//! let flows = aggregator.aggregate_flows(&flows)?;
//!
//! let joined = Preprocessor::new(DuplicatePolicy::Mean).process(joined)?;
//! ```

pub mod aggregation;
pub mod dedup;
pub mod normalization;

pub use aggregation::{Aggregator, ResampleInterval};
pub use dedup::{DuplicatePolicy, Preprocessor};
pub use normalization::{Standardizer, DEFAULT_STD_FLOOR};
