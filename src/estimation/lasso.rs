//! L1-regularized least squares with cross-validated penalty selection.
//!
//! Minimizes
//! ```text
//! (1 / 2n) * ||y - X w - b||^2 + alpha * ||w||_1
//! ```
//! by cyclic coordinate descent on centred `X` and `y`; the intercept is
//! recovered as `b = mean(y) - mean(X) · w`.
//!
//! `LassoCv` scans a descending log-spaced alpha grid on every fold of an
//! unshuffled K-fold split (warm-starting along the path), picks the alpha
//! with the lowest mean held-out MSE and refits on all rows.

use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, ErrorKind, ShapeError};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, warn};

/// Cross-validated Lasso settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LassoCvConfig {
    /// Number of cross-validation folds.
    pub folds: usize,
    /// Maximum coordinate descent sweeps per fit.
    pub max_iter: usize,
    /// Convergence tolerance.
    pub tol: f64,
    /// Length of the alpha grid.
    pub n_alphas: usize,
    /// Ratio `alpha_min / alpha_max` of the grid.
    pub eps: f64,
}

impl Default for LassoCvConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            max_iter: 2000,
            tol: 1e-4,
            n_alphas: 100,
            eps: 1e-3,
        }
    }
}

impl LassoCvConfig {
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_n_alphas(mut self, n_alphas: usize) -> Self {
        self.n_alphas = n_alphas;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.folds < 2 {
            return Err(format!("folds must be at least 2, got {}", self.folds));
        }
        if self.max_iter == 0 {
            return Err("max_iter must be > 0".to_string());
        }
        if self.n_alphas == 0 {
            return Err("n_alphas must be > 0".to_string());
        }
        if !(self.tol > 0.0) {
            return Err(format!("tol must be > 0, got {}", self.tol));
        }
        if !(self.eps > 0.0 && self.eps < 1.0) {
            return Err(format!("eps must be in (0, 1), got {}", self.eps));
        }
        Ok(())
    }
}

/// Outcome of one coordinate descent run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descent {
    pub iterations: usize,
    pub dual_gap: f64,
    pub converged: bool,
}

/// Result of a cross-validated fit.
#[derive(Debug, Clone)]
pub struct LassoFit {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
    /// Selected penalty. Zero when the target is constant.
    pub alpha: f64,
    /// Alpha grid, descending.
    pub alphas: Vec<f64>,
    /// Held-out MSE, shape `(alphas, folds)`.
    pub mse_path: Array2<f64>,
}

impl LassoFit {
    pub fn nonzero(&self) -> usize {
        self.coefficients.iter().filter(|&&w| w != 0.0).count()
    }
}

#[inline]
fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

/// Descending log-spaced penalties from `alpha_max` down to `alpha_max * eps`.
///
/// Expects centred inputs. Empty when `alpha_max` is zero (no penalty can
/// activate any coefficient).
pub fn alpha_grid(x: &Array2<f64>, y: &Array1<f64>, n_alphas: usize, eps: f64) -> Vec<f64> {
    let n = x.nrows() as f64;
    let alpha_max = x.t().dot(y).fold(0.0f64, |m, v| m.max(v.abs())) / n;
    if !(alpha_max > 0.0) || n_alphas == 0 {
        return Vec::new();
    }
    if n_alphas == 1 {
        return vec![alpha_max];
    }

    let hi = alpha_max.log10();
    let lo = (alpha_max * eps).log10();
    let step = (hi - lo) / (n_alphas - 1) as f64;
    (0..n_alphas)
        .map(|i| 10f64.powf(hi - step * i as f64))
        .collect()
}

/// Contiguous K-fold test ranges; the first `n % k` folds get one extra row.
pub fn fold_ranges(n: usize, k: usize) -> Vec<Range<usize>> {
    let base = n / k;
    let extra = n % k;
    let mut start = 0;
    (0..k)
        .map(|f| {
            let len = base + usize::from(f < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

fn center(x: ArrayView2<f64>, y: ArrayView1<f64>) -> (Array2<f64>, Array1<f64>, Array1<f64>, f64) {
    let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
    let y_mean = y.mean().unwrap_or(0.0);
    (&x - &x_mean, &y - y_mean, x_mean, y_mean)
}

fn duality_gap(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    w: &Array1<f64>,
    residual: &Array1<f64>,
    l1: f64,
) -> f64 {
    let dual_norm = x.t().dot(residual).fold(0.0f64, |m, v| m.max(v.abs()));
    let r_norm2 = residual.dot(residual);
    let w_norm1 = w.fold(0.0, |s, v| s + v.abs());

    let (scale, gap) = if dual_norm > l1 {
        let scale = l1 / dual_norm;
        (scale, 0.5 * (r_norm2 + r_norm2 * scale * scale))
    } else {
        (1.0, r_norm2)
    };
    gap + l1 * w_norm1 - scale * residual.dot(&y)
}

/// Cyclic coordinate descent on centred data, updating `w` in place.
///
/// Stops once the largest coefficient update relative to the largest
/// coefficient drops below `tol` and the duality gap is below
/// `tol * ||y||^2`, or after `max_iter` sweeps.
pub fn coordinate_descent(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    alpha: f64,
    w: &mut Array1<f64>,
    max_iter: usize,
    tol: f64,
) -> Descent {
    let l1 = alpha * x.nrows() as f64;
    let norms: Vec<f64> = x.columns().into_iter().map(|c| c.dot(&c)).collect();
    let mut residual = &y - &x.dot(&*w);
    let tol_scaled = tol * y.dot(&y);
    let mut dual_gap = f64::INFINITY;

    for iter in 0..max_iter {
        let mut w_max = 0.0f64;
        let mut d_w_max = 0.0f64;

        for (j, &norm) in norms.iter().enumerate() {
            if norm == 0.0 {
                continue;
            }
            let col = x.column(j);
            let w_old = w[j];
            if w_old != 0.0 {
                residual.scaled_add(w_old, &col);
            }
            let w_new = soft_threshold(col.dot(&residual), l1) / norm;
            if w_new != 0.0 {
                residual.scaled_add(-w_new, &col);
            }
            w[j] = w_new;

            d_w_max = d_w_max.max((w_new - w_old).abs());
            w_max = w_max.max(w_new.abs());
        }

        if w_max == 0.0 || d_w_max / w_max < tol || iter + 1 == max_iter {
            dual_gap = duality_gap(x, y, w, &residual, l1);
            if dual_gap < tol_scaled {
                return Descent {
                    iterations: iter + 1,
                    dual_gap,
                    converged: true,
                };
            }
        }
    }

    Descent {
        iterations: max_iter,
        dual_gap,
        converged: false,
    }
}

/// Lasso with K-fold cross-validated alpha.
#[derive(Debug, Clone, Default)]
pub struct LassoCv {
    config: LassoCvConfig,
}

impl LassoCv {
    pub fn new(config: LassoCvConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LassoCvConfig {
        &self.config
    }

    /// Fit `y ~ x`.
    ///
    /// Fails with `InsufficientSamples` (empty target name) when there are
    /// fewer rows than folds.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<LassoFit> {
        let (n, p) = x.dim();
        if y.len() != n {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }
        let k = self.config.folds;
        if n < k || n == 0 {
            return Err(Error::InsufficientSamples {
                target: String::new(),
                samples: n,
                folds: k,
            });
        }

        let (xc, yc, x_mean, y_mean) = center(x.view(), y.view());
        let alphas = alpha_grid(&xc, &yc, self.config.n_alphas, self.config.eps);
        if alphas.is_empty() {
            return Ok(LassoFit {
                coefficients: Array1::zeros(p),
                intercept: y_mean,
                alpha: 0.0,
                alphas,
                mse_path: Array2::zeros((0, k)),
            });
        }

        let mut mse_path = Array2::zeros((alphas.len(), k));
        for (fold, test) in fold_ranges(n, k).into_iter().enumerate() {
            let train: Vec<usize> = (0..n).filter(|i| !test.contains(i)).collect();
            let test: Vec<usize> = test.collect();

            let (x_train, y_train, train_x_mean, train_y_mean) = center(
                x.select(Axis(0), &train).view(),
                y.select(Axis(0), &train).view(),
            );
            let x_test = x.select(Axis(0), &test);
            let y_test = y.select(Axis(0), &test);

            let mut w = Array1::zeros(p);
            for (a, &alpha) in alphas.iter().enumerate() {
                coordinate_descent(
                    x_train.view(),
                    y_train.view(),
                    alpha,
                    &mut w,
                    self.config.max_iter,
                    self.config.tol,
                );
                let intercept = train_y_mean - train_x_mean.dot(&w);
                let residual = &y_test - &(x_test.dot(&w) + intercept);
                mse_path[[a, fold]] = residual.mapv(|r| r * r).mean().unwrap_or(f64::NAN);
            }
        }

        let mean_mse = mse_path
            .mean_axis(Axis(1))
            .ok_or(Error::EmptyInput("cross-validation produced no folds"))?;
        let best = mean_mse.iter().enumerate().fold(0, |best, (i, &v)| {
            if v < mean_mse[best] || mean_mse[best].is_nan() {
                i
            } else {
                best
            }
        });
        let alpha = alphas[best];

        let mut coefficients = Array1::zeros(p);
        let descent = coordinate_descent(
            xc.view(),
            yc.view(),
            alpha,
            &mut coefficients,
            self.config.max_iter,
            self.config.tol,
        );
        if !descent.converged {
            warn!(
                alpha,
                dual_gap = descent.dual_gap,
                iterations = descent.iterations,
                "Lasso did not converge"
            );
        }
        debug!(alpha, mse = mean_mse[best], iterations = descent.iterations, "Lasso fitted");

        let intercept = y_mean - x_mean.dot(&coefficients);
        Ok(LassoFit {
            coefficients,
            intercept,
            alpha,
            alphas,
            mse_path,
        })
    }
}
