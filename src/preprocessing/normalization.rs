//! Column standardization for regression design matrices.
//!
//! Standardizes each column to zero mean and unit sample variance:
//! ```text
//! normalized[i, j] = (x[i, j] - mean[j]) / std[j]
//! ```
//!
//! `std[j]` is the sample standard deviation (n - 1 denominator). A column
//! whose standard deviation is exactly zero uses `std_floor` instead, so a
//! constant predictor standardizes to a column of zeros rather than `NaN`.
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use ofi_cross_impact::preprocessing::Standardizer;
//!
//! let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
//! let scaler = Standardizer::fit(&x, 1e-10);
//! let z = scaler.transform(&x);
//!
//! assert!((z[[0, 0]] + 1.0).abs() < 1e-12);
//! assert_eq!(z[[0, 1]], 0.0);
//! ```

use ndarray::{Array1, Array2, Axis};

/// Default floor substituted for a zero standard deviation.
pub const DEFAULT_STD_FLOOR: f64 = 1e-10;

/// Per-column mean and standard deviation fitted on one design matrix.
#[derive(Debug, Clone)]
pub struct Standardizer {
    means: Array1<f64>,
    stds: Array1<f64>,
}

impl Standardizer {
    /// Fit column statistics.
    ///
    /// With fewer than two rows every column is treated as constant.
    pub fn fit(x: &Array2<f64>, std_floor: f64) -> Self {
        let n = x.nrows();
        let cols = x.ncols();

        let means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(cols));

        let stds = if n < 2 {
            Array1::from_elem(cols, std_floor)
        } else {
            x.std_axis(Axis(0), 1.0)
                .mapv(|s| if s == 0.0 { std_floor } else { s })
        };

        Self { means, stds }
    }

    /// Apply the fitted statistics.
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.means) / &self.stds
    }

    pub fn fit_transform(x: &Array2<f64>, std_floor: f64) -> Array2<f64> {
        Self::fit(x, std_floor).transform(x)
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn stds(&self) -> &Array1<f64> {
        &self.stds
    }
}
