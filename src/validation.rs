//! Book data-quality validation.
//!
//! Checks raw snapshots for problems that do not stop the pipeline but make
//! its output suspect. Validation never fails; it reports.
//!
//! # Validation Categories
//!
//! 1. **Quote Consistency**: crossed best quotes (`bid_px_00 > ask_px_00`)
//! 2. **Price Ranges**: non-finite best prices
//! 3. **Size Sanity**: negative sizes at any level
//! 4. **Timestamp Ordering**: per-instrument time regressions in input order
//!
//! # Usage
//!
//! ```ignore
//! use ofi_cross_impact::validation::validate_book;
//!
//! let result = validate_book(&snapshots);
//! for warning in result.warnings() {
//!     tracing::warn!("{warning}");
//! }
//! ```

use crate::book::BookSnapshot;
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use std::fmt;

/// Validation result for a single check.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    /// Data is valid
    Valid,
    /// Data has issues worth reporting
    Warning(String),
}

impl ValidationLevel {
    /// Check if this result indicates valid data.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationLevel::Valid)
    }

    /// Check if this result is a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationLevel::Warning(_))
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Valid => write!(f, "Valid"),
            ValidationLevel::Warning(msg) => write!(f, "Warning: {msg}"),
        }
    }
}

/// Aggregated validation result.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    results: Vec<(String, ValidationLevel)>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation result.
    pub fn add(&mut self, check_name: &str, level: ValidationLevel) {
        self.results.push((check_name.to_string(), level));
    }

    /// Check if all validations passed.
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|(_, level)| level.is_valid())
    }

    pub fn has_warnings(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_warning())
    }

    /// Warnings formatted as `check: message`.
    pub fn warnings(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Warning(msg) => Some(format!("{name}: {msg}")),
                ValidationLevel::Valid => None,
            })
            .collect()
    }

    pub fn all_results(&self) -> &[(String, ValidationLevel)] {
        &self.results
    }

    pub fn check_count(&self) -> usize {
        self.results.len()
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|(_, l)| l.is_valid()).count()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passed = self.passed_count();
        let total = self.check_count();
        writeln!(f, "Validation: {passed}/{total} checks passed")?;

        for (name, level) in &self.results {
            if !level.is_valid() {
                writeln!(f, "  - {name}: {level}")?;
            }
        }

        Ok(())
    }
}

/// Which checks to run.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Check for crossed quotes (bid > ask)
    pub check_crossed_quotes: bool,

    /// Check for NaN/Inf best prices
    pub check_non_finite: bool,

    /// Check for negative sizes
    pub check_negative_sizes: bool,

    /// Check per-instrument timestamp ordering
    pub check_timestamp_order: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            check_crossed_quotes: true,
            check_non_finite: true,
            check_negative_sizes: true,
            check_timestamp_order: true,
        }
    }
}

/// Runs data-quality checks over a snapshot table.
#[derive(Debug, Clone, Default)]
pub struct BookValidator {
    config: ValidationConfig,
}

impl BookValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, snapshots: &[BookSnapshot]) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.config.check_crossed_quotes {
            result.add(
                "crossed_quotes",
                summarize(
                    snapshots.iter().filter(|s| {
                        s.levels.first().is_some_and(|best| best.bid_px > best.ask_px)
                    }),
                    "snapshots with bid_px_00 > ask_px_00",
                ),
            );
        }

        if self.config.check_non_finite {
            result.add(
                "non_finite_prices",
                summarize(
                    snapshots.iter().filter(|s| match s.levels.first() {
                        Some(best) => !best.bid_px.is_finite() || !best.ask_px.is_finite(),
                        None => true,
                    }),
                    "snapshots with a missing or non-finite best price",
                ),
            );
        }

        if self.config.check_negative_sizes {
            result.add(
                "negative_sizes",
                summarize(
                    snapshots.iter().filter(|s| {
                        s.levels.iter().any(|l| l.bid_sz < 0.0 || l.ask_sz < 0.0)
                    }),
                    "snapshots with a negative size",
                ),
            );
        }

        if self.config.check_timestamp_order {
            let mut latest: AHashMap<&str, DateTime<Utc>> = AHashMap::new();
            let regressions = snapshots.iter().filter(|&s| {
                let previous = latest.insert(s.symbol.as_str(), s.ts_event);
                match previous {
                    Some(prev) if prev > s.ts_event => {
                        latest.insert(s.symbol.as_str(), prev);
                        true
                    }
                    _ => false,
                }
            });
            result.add(
                "timestamp_order",
                summarize(regressions, "snapshots earlier than a preceding snapshot of the same instrument"),
            );
        }

        result
    }
}

/// Validate with every check enabled.
pub fn validate_book(snapshots: &[BookSnapshot]) -> ValidationResult {
    BookValidator::default().validate(snapshots)
}

fn summarize<'a>(offenders: impl Iterator<Item = &'a BookSnapshot>, what: &str) -> ValidationLevel {
    let mut first: Option<&BookSnapshot> = None;
    let mut count = 0usize;
    for snapshot in offenders {
        first.get_or_insert(snapshot);
        count += 1;
    }
    match first {
        None => ValidationLevel::Valid,
        Some(s) => ValidationLevel::Warning(format!(
            "{count} {what} (first: {} at {})",
            s.symbol, s.ts_event
        )),
    }
}
