//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use ofi_cross_impact::prelude::*;
//!
//! let pipeline = Pipeline::from_config(PipelineConfig::default())?;
//! let output = pipeline.run(&snapshots)?;
//! ```
//!
//! # What's Included
//!
//! ## Core Pipeline
//! - [`Pipeline`], [`PipelineBuilder`], [`PipelineConfig`], [`PipelineOutput`]
//!
//! ## Tables
//! - [`BookSnapshot`], [`BookLevel`], [`OrderFlowRow`], [`IntegratedOfiRow`],
//!   [`ReturnRow`], [`ImpactObservation`]
//!
//! ## Stages
//! - [`OrderFlowCalculator`], [`ReturnsCalculator`], [`Aggregator`],
//!   [`OfiIntegrator`], [`Preprocessor`], [`CrossImpactEstimator`]
//!
//! ## Results and I/O
//! - [`CoefficientMatrix`], [`CsvBookLoader`], [`ResultExporter`]

pub use crate::book::{
    BookLevel, BookSnapshot, ImpactObservation, IntegratedOfiRow, LevelFlow, OrderFlowRow,
    ReturnRow,
};
pub use crate::builder::PipelineBuilder;
pub use crate::config::{AggregationConfig, ExperimentMetadata, PipelineConfig};
pub use crate::error::{Error, Result};
pub use crate::estimation::{
    CoefficientMatrix, CrossImpactEstimator, ImpactSummary, LassoCv, LassoCvConfig,
};
pub use crate::export::ResultExporter;
pub use crate::features::{OrderFlowCalculator, ReturnsCalculator};
pub use crate::loader::CsvBookLoader;
pub use crate::pipeline::{Pipeline, PipelineOutput};
pub use crate::preprocessing::{Aggregator, DuplicatePolicy, Preprocessor, ResampleInterval};
pub use crate::reduction::{OfiIntegrator, PrincipalAxis};
pub use crate::validation::{validate_book, ValidationResult};
