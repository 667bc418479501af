//! Feature computation from LOB snapshots.
//!
//! - `order_flow`: per-level signed order flow (`of_{l}_b`, `of_{l}_a`)
//! - `returns`: mid-price log-returns
//!
//! Both stages are pure functions of their input table: no state survives
//! between calls.
//!
//! # Usage
//!
//! ```ignore
//! use ofi_cross_impact::features::{OrderFlowCalculator, ReturnsCalculator};
//!
//! let flows = OrderFlowCalculator::new(5).calculate(&snapshots)?;
//! let returns = ReturnsCalculator::new().calculate(&snapshots)?;
//! ```

pub mod order_flow;
pub mod returns;

pub use order_flow::{ask_flow, bid_flow, OrderFlowCalculator};
pub use returns::ReturnsCalculator;
