//! First principal axis and the integrated OFI built on it.

use crate::book::{IntegratedOfiRow, OrderFlowRow};
use crate::error::{Error, Result};
use crate::schema;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::{error, info};

/// Direction of maximal variance of a numeric matrix.
#[derive(Debug, Clone)]
pub struct PrincipalAxis {
    mean: Array1<f64>,
    component: Array1<f64>,
    explained_variance: f64,
    explained_variance_ratio: f64,
}

impl PrincipalAxis {
    /// Fit on the rows of `x`.
    ///
    /// The component is a unit vector whose largest-magnitude loading is
    /// positive. With fewer than two rows the component is all zeros.
    pub fn fit(x: &Array2<f64>) -> Self {
        let (n, d) = x.dim();
        let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(d));

        if n < 2 || d == 0 {
            return Self {
                mean,
                component: Array1::zeros(d),
                explained_variance: 0.0,
                explained_variance_ratio: 0.0,
            };
        }

        let centered = x - &mean;
        let cov = centered.t().dot(&centered) / (n as f64 - 1.0);
        let total_variance = cov.diag().sum();

        let eigen = SymmetricEigen::new(DMatrix::from_fn(d, d, |i, j| cov[[i, j]]));
        let top = eigen
            .eigenvalues
            .iter()
            .enumerate()
            .fold(0, |best, (i, &v)| if v > eigen.eigenvalues[best] { i } else { best });

        let mut component: Array1<f64> = eigen.eigenvectors.column(top).iter().copied().collect();
        let pivot = component
            .iter()
            .enumerate()
            .fold(0, |best, (i, v)| if v.abs() > component[best].abs() { i } else { best });
        if component[pivot] < 0.0 {
            component.mapv_inplace(|v| -v);
        }

        let explained_variance = eigen.eigenvalues[top].max(0.0);
        let explained_variance_ratio = if total_variance > 0.0 {
            explained_variance / total_variance
        } else {
            0.0
        };

        Self {
            mean,
            component,
            explained_variance,
            explained_variance_ratio,
        }
    }

    /// Scalar projection of one row.
    #[inline]
    pub fn project(&self, row: ArrayView1<f64>) -> f64 {
        (&row - &self.mean).dot(&self.component)
    }

    /// Scalar projection of every row.
    pub fn transform(&self, x: &Array2<f64>) -> Array1<f64> {
        (x - &self.mean).dot(&self.component)
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn component(&self) -> &Array1<f64> {
        &self.component
    }

    pub fn explained_variance(&self) -> f64 {
        self.explained_variance
    }

    pub fn explained_variance_ratio(&self) -> f64 {
        self.explained_variance_ratio
    }
}

/// Integrated OFI table plus the axis it was projected on.
#[derive(Debug, Clone)]
pub struct Integration {
    pub rows: Vec<IntegratedOfiRow>,
    pub axis: PrincipalAxis,
}

/// Compresses `2 * levels` flow columns into `ofi_pca`.
#[derive(Debug, Clone, Copy)]
pub struct OfiIntegrator {
    levels: usize,
}

impl OfiIntegrator {
    pub fn new(levels: usize) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Flow matrix in column order `of_0_b..of_{L-1}_b, of_0_a..of_{L-1}_a`.
    ///
    /// Missing flows (`NaN`, e.g. from empty aggregation buckets) are zero-filled.
    pub fn flow_matrix(&self, rows: &[OrderFlowRow]) -> Result<Array2<f64>> {
        let width = 2 * self.levels;
        let mut data = Vec::with_capacity(rows.len() * width);
        for row in rows {
            let flows = &row.flows[..self.levels];
            data.extend(flows.iter().map(|f| f.bid));
            data.extend(flows.iter().map(|f| f.ask));
        }
        data.iter_mut().filter(|v| v.is_nan()).for_each(|v| *v = 0.0);
        Ok(Array2::from_shape_vec((rows.len(), width), data)?)
    }

    /// Fit the principal axis over all rows and project each row onto it.
    pub fn integrate(&self, rows: &[OrderFlowRow]) -> Result<Integration> {
        self.integrate_inner(rows).inspect_err(|e| {
            error!(stage = "reduction", error = %e, "OFI integration failed");
        })
    }

    fn integrate_inner(&self, rows: &[OrderFlowRow]) -> Result<Integration> {
        info!(rows = rows.len(), levels = self.levels, "Integrating OFI using PCA");

        if rows.is_empty() {
            return Err(Error::EmptyInput("OFI integration requires order flow rows"));
        }
        if let Some(short) = rows.iter().find(|r| r.flows.len() < self.levels) {
            let available = (0..short.flows.len())
                .flat_map(|l| [schema::flow_bid(l), schema::flow_ask(l)]);
            schema::require_columns(available, &schema::flow_columns(self.levels))?;
        }

        let x = self.flow_matrix(rows)?;
        let axis = PrincipalAxis::fit(&x);
        let projected = axis.transform(&x);

        let integrated: Vec<IntegratedOfiRow> = rows
            .iter()
            .zip(projected.iter())
            .map(|(row, &ofi_pca)| IntegratedOfiRow {
                row: row.clone(),
                ofi_pca,
            })
            .collect();

        info!(
            rows = integrated.len(),
            explained_variance_ratio = axis.explained_variance_ratio(),
            "OFI integration using PCA completed"
        );

        Ok(Integration {
            rows: integrated,
            axis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{BookSnapshot, LevelFlow};
    use chrono::{TimeZone, Utc};
    use ndarray::array;

    fn flow_row(secs: i64, flows: Vec<(f64, f64)>) -> OrderFlowRow {
        OrderFlowRow {
            snapshot: BookSnapshot::new(Utc.timestamp_opt(secs, 0).unwrap(), "A", Vec::new()),
            flows: flows
                .into_iter()
                .map(|(bid, ask)| LevelFlow { bid, ask })
                .collect(),
        }
    }

    #[test]
    fn test_axis_along_dominant_direction() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [-1.0, -1.0]];
        let axis = PrincipalAxis::fit(&x);
        let expected = 1.0 / 2.0f64.sqrt();
        assert!((axis.component()[0] - expected).abs() < 1e-9);
        assert!((axis.component()[1] - expected).abs() < 1e-9);
        assert!((axis.explained_variance_ratio() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sign_convention() {
        let x = array![[-5.0, 0.1], [5.0, -0.1], [-3.0, 0.0], [3.0, 0.0]];
        let axis = PrincipalAxis::fit(&x);
        assert!(axis.component()[0] > 0.0);
    }

    #[test]
    fn test_projection_is_centered() {
        let x = array![[1.0, 0.0], [3.0, 0.5], [5.0, 1.0], [7.0, 0.2]];
        let axis = PrincipalAxis::fit(&x);
        let projected = axis.transform(&x);
        assert!(projected.sum().abs() < 1e-9);
        assert!((axis.project(x.row(0)) - projected[0]).abs() < 1e-12);
    }

    #[test]
    fn test_single_row_degenerate() {
        let x = array![[4.0, 2.0]];
        let axis = PrincipalAxis::fit(&x);
        assert_eq!(axis.transform(&x)[0], 0.0);
        assert_eq!(axis.explained_variance_ratio(), 0.0);
    }

    #[test]
    fn test_integrate_adds_one_value_per_row() {
        let rows = vec![
            flow_row(1, vec![(10.0, -2.0)]),
            flow_row(2, vec![(-4.0, 3.0)]),
            flow_row(3, vec![(f64::NAN, 1.0)]),
        ];
        let integration = OfiIntegrator::new(1).integrate(&rows).unwrap();
        assert_eq!(integration.rows.len(), rows.len());
        assert!(integration.rows.iter().all(|r| r.ofi_pca.is_finite()));
        assert_eq!(integration.rows[0].row, rows[0]);
    }

    #[test]
    fn test_flow_matrix_zero_fill_and_order() {
        let rows = vec![flow_row(1, vec![(1.0, 2.0), (f64::NAN, 4.0)])];
        let x = OfiIntegrator::new(2).flow_matrix(&rows).unwrap();
        assert_eq!(x, array![[1.0, 0.0, 2.0, 4.0]]);
    }

    #[test]
    fn test_missing_flow_columns() {
        let rows = vec![flow_row(1, vec![(1.0, 2.0)])];
        let err = OfiIntegrator::new(2).integrate(&rows).unwrap_err();
        match err {
            Error::Schema { missing } => assert_eq!(missing, vec!["of_1_b", "of_1_a"]),
            other => panic!("unexpected error: {other}"),
        }
    }
}
