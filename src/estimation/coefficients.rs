//! Target × predictor cross-impact coefficients.

use crate::error::{Error, Result};
use ndarray::{Array2, ShapeError};
use serde::{Deserialize, Serialize};

/// Regression coefficients: row = target instrument, column = predictor instrument.
///
/// Values are reported as fitted. `NaN` entries are left in place here;
/// consumers that need a dense numeric grid call [`CoefficientMatrix::filled`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientMatrix {
    targets: Vec<String>,
    predictors: Vec<String>,
    values: Array2<f64>,
}

/// Own-flow coefficient against the average cross coefficient of one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub target: String,
    pub self_impact: f64,
    pub avg_cross_impact: f64,
}

impl CoefficientMatrix {
    pub fn new(targets: Vec<String>, predictors: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.dim() != (targets.len(), predictors.len()) {
            return Err(Error::Shape(ShapeError::from_kind(
                ndarray::ErrorKind::IncompatibleShape,
            )));
        }
        Ok(Self {
            targets,
            predictors,
            values,
        })
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn predictors(&self) -> &[String] {
        &self.predictors
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// (targets, predictors)
    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn get(&self, target: &str, predictor: &str) -> Option<f64> {
        let row = self.targets.iter().position(|t| t == target)?;
        let col = self.predictors.iter().position(|p| p == predictor)?;
        Some(self.values[[row, col]])
    }

    /// Values with `NaN` replaced by zero.
    pub fn filled(&self) -> Array2<f64> {
        self.values.mapv(|v| if v.is_nan() { 0.0 } else { v })
    }

    /// Self-impact and average cross-impact per target.
    ///
    /// Only targets that also appear as predictors are reported. The cross
    /// average runs over every predictor column with the target's own column
    /// counted as zero.
    pub fn self_vs_cross(&self) -> Vec<ImpactSummary> {
        let filled = self.filled();
        let width = self.predictors.len() as f64;

        self.targets
            .iter()
            .enumerate()
            .filter_map(|(row, target)| {
                let own = self.predictors.iter().position(|p| p == target)?;
                let coefs = filled.row(row);
                let cross: f64 = coefs
                    .iter()
                    .enumerate()
                    .filter(|&(col, _)| col != own)
                    .map(|(_, v)| v)
                    .sum();
                Some(ImpactSummary {
                    target: target.clone(),
                    self_impact: coefs[own],
                    avg_cross_impact: cross / width,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shape_checked() {
        let err = CoefficientMatrix::new(names(&["A"]), names(&["A", "B"]), array![[1.0]]);
        assert!(err.is_err());
    }

    #[test]
    fn test_get_and_filled() {
        let m = CoefficientMatrix::new(
            names(&["A", "B"]),
            names(&["A", "B"]),
            array![[0.5, f64::NAN], [0.1, 0.2]],
        )
        .unwrap();
        assert_eq!(m.get("A", "A"), Some(0.5));
        assert!(m.get("A", "B").unwrap().is_nan());
        assert_eq!(m.get("C", "A"), None);
        assert_eq!(m.filled()[[0, 1]], 0.0);
    }

    #[test]
    fn test_self_vs_cross() {
        let m = CoefficientMatrix::new(
            names(&["A", "B"]),
            names(&["A", "B", "C"]),
            array![[0.6, 0.3, f64::NAN], [0.3, 0.9, 0.0]],
        )
        .unwrap();
        let summary = m.self_vs_cross();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].target, "A");
        assert_eq!(summary[0].self_impact, 0.6);
        assert!((summary[0].avg_cross_impact - 0.1).abs() < 1e-12);
        assert_eq!(summary[1].self_impact, 0.9);
        assert!((summary[1].avg_cross_impact - 0.1).abs() < 1e-12);
    }
}
