//! Dimensionality reduction of multi-level order flow.
//!
//! The `2 * levels` flow columns are compressed into one integrated OFI value
//! per row by projecting onto their first principal axis. The axis is fitted
//! once over the whole input table on every call and never persisted.
//!
//! ```ignore
//! use ofi_cross_impact::reduction::OfiIntegrator;
//!
//! let integration = OfiIntegrator::new(5).integrate(&flows)?;
//! println!(
//!     "first axis explains {:.1}% of flow variance",
//!     100.0 * integration.axis.explained_variance_ratio()
//! );
//! ```

pub mod pca;

pub use pca::{Integration, OfiIntegrator, PrincipalAxis};
