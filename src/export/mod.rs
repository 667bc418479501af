//! Data Export Module
//!
//! Writes pipeline results for downstream plotting and analysis.
//!
//! # Supported Formats
//!
//! - CSV - coefficient matrix (`target,<predictors>`), integrated OFI and
//!   returns tables with canonical column names
//! - JSON - coefficient matrix (targets, predictors, row-major values) and
//!   run metadata
//! - NumPy (.npy) - coefficient matrix for Python
//!
//! Missing values (`NaN`) are written as empty CSV cells and JSON `null`.
//! Coefficients are written as fitted; use [`CoefficientMatrix::filled`] for
//! a zero-filled grid.
//!
//! # Example
//!
//! ```ignore
//! use ofi_cross_impact::export::ResultExporter;
//!
//! let exporter = ResultExporter::new("output/run1");
//! exporter.export(&pipeline_output)?;
//! ```

use crate::book::{IntegratedOfiRow, ReturnRow};
use crate::error::Result;
use crate::estimation::{CoefficientMatrix, ImpactSummary};
use crate::pipeline::PipelineOutput;
use crate::schema;
use chrono::{DateTime, SecondsFormat, Utc};
use csv::Writer;
use ndarray_npy::WriteNpyExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

pub const COEFFICIENTS_CSV: &str = "coefficients.csv";
pub const COEFFICIENTS_JSON: &str = "coefficients.json";
pub const COEFFICIENTS_NPY: &str = "coefficients.npy";
pub const INTEGRATED_OFI_CSV: &str = "integrated_ofi.csv";
pub const RETURNS_CSV: &str = "returns.csv";
pub const METADATA_JSON: &str = "metadata.json";

/// Metadata describing one exported run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Book levels used
    pub levels: usize,

    /// Integrated OFI rows
    pub n_integrated: usize,

    /// Return rows
    pub n_returns: usize,

    /// Observations fed to the estimator
    pub n_observations: usize,

    pub targets: Vec<String>,
    pub predictors: Vec<String>,

    /// Share of flow variance captured by the integrated OFI
    pub explained_variance_ratio: f64,

    /// Self- versus cross-impact per target
    pub impact_summary: Vec<ImpactSummary>,

    /// Data-quality warnings raised on the input
    pub warnings: Vec<String>,

    /// Export timestamp
    pub export_timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CoefficientsJson {
    targets: Vec<String>,
    predictors: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

#[inline]
fn cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

#[inline]
fn timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Coefficient matrix as CSV: header `target,<predictors>`, one row per target.
pub fn write_coefficients_csv<P: AsRef<Path>>(matrix: &CoefficientMatrix, path: P) -> Result<()> {
    let mut writer = Writer::from_path(path)?;

    writer.write_record(std::iter::once("target").chain(matrix.predictors().iter().map(String::as_str)))?;
    for (target, row) in matrix.targets().iter().zip(matrix.values().rows()) {
        writer.write_record(std::iter::once(target.clone()).chain(row.iter().map(|&v| cell(v))))?;
    }

    writer.flush()?;
    Ok(())
}

/// Coefficient matrix as JSON with row-major values.
pub fn write_coefficients_json<P: AsRef<Path>>(matrix: &CoefficientMatrix, path: P) -> Result<()> {
    let json = CoefficientsJson {
        targets: matrix.targets().to_vec(),
        predictors: matrix.predictors().to_vec(),
        values: matrix
            .values()
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|&v| (!v.is_nan()).then_some(v)).collect())
            .collect(),
    };
    serde_json::to_writer_pretty(File::create(path)?, &json)?;
    Ok(())
}

/// Coefficient values as a 2D `.npy` array (targets × predictors).
pub fn write_coefficients_npy<P: AsRef<Path>>(matrix: &CoefficientMatrix, path: P) -> Result<()> {
    let file = File::create(path)?;
    matrix.values().write_npy(file)?;
    Ok(())
}

/// Integrated OFI table: snapshot columns, flow columns, then `ofi_pca`.
pub fn write_integrated_ofi_csv<P: AsRef<Path>>(
    rows: &[IntegratedOfiRow],
    levels: usize,
    path: P,
) -> Result<()> {
    let mut writer = Writer::from_path(path)?;

    let mut header = schema::order_flow_columns(levels);
    header.extend([schema::ACTION, schema::SIDE, schema::PRICE].map(String::from));
    header.extend(schema::flow_columns(levels));
    header.push(schema::OFI_PCA.to_string());
    writer.write_record(&header)?;

    for integrated in rows {
        let snapshot = &integrated.row.snapshot;
        let mut record = vec![snapshot.symbol.clone(), timestamp(snapshot.ts_event)];
        for l in 0..levels {
            match snapshot.levels.get(l) {
                Some(level) => record.extend(
                    [level.bid_px, level.ask_px, level.bid_sz, level.ask_sz].map(cell),
                ),
                None => record.extend(std::iter::repeat(String::new()).take(4)),
            }
        }
        record.push(snapshot.action.map(String::from).unwrap_or_default());
        record.push(snapshot.side.map(String::from).unwrap_or_default());
        record.push(snapshot.price.map(cell).unwrap_or_default());

        let flows = &integrated.row.flows;
        let flow = |l: usize, bid: bool| {
            flows
                .get(l)
                .map(|f| cell(if bid { f.bid } else { f.ask }))
                .unwrap_or_default()
        };
        record.extend((0..levels).map(|l| flow(l, true)));
        record.extend((0..levels).map(|l| flow(l, false)));
        record.push(cell(integrated.ofi_pca));

        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Returns table: `symbol,ts_event,log_return`.
pub fn write_returns_csv<P: AsRef<Path>>(rows: &[ReturnRow], path: P) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([schema::SYMBOL, schema::TS_EVENT, schema::LOG_RETURN])?;
    for row in rows {
        writer.write_record([row.symbol.clone(), timestamp(row.ts_event), cell(row.log_return)])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes every pipeline output into one directory.
pub struct ResultExporter {
    output_dir: PathBuf,
}

impl ResultExporter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export pipeline output
    ///
    /// Creates:
    /// - coefficients.csv / coefficients.json / coefficients.npy
    /// - integrated_ofi.csv
    /// - returns.csv
    /// - metadata.json
    pub fn export(&self, output: &PipelineOutput) -> Result<ExportMetadata> {
        fs::create_dir_all(&self.output_dir)?;

        let matrix = &output.coefficients;
        write_coefficients_csv(matrix, self.output_dir.join(COEFFICIENTS_CSV))?;
        write_coefficients_json(matrix, self.output_dir.join(COEFFICIENTS_JSON))?;
        write_coefficients_npy(matrix, self.output_dir.join(COEFFICIENTS_NPY))?;
        info!(
            dir = %self.output_dir.display(),
            targets = matrix.dim().0,
            predictors = matrix.dim().1,
            "Exported coefficients"
        );

        write_integrated_ofi_csv(
            &output.integrated,
            output.levels,
            self.output_dir.join(INTEGRATED_OFI_CSV),
        )?;
        write_returns_csv(&output.returns, self.output_dir.join(RETURNS_CSV))?;
        info!(
            integrated = output.integrated.len(),
            returns = output.returns.len(),
            "Exported tables"
        );

        let metadata = ExportMetadata {
            levels: output.levels,
            n_integrated: output.integrated.len(),
            n_returns: output.returns.len(),
            n_observations: output.observations.len(),
            targets: matrix.targets().to_vec(),
            predictors: matrix.predictors().to_vec(),
            explained_variance_ratio: output.axis.explained_variance_ratio(),
            impact_summary: matrix.self_vs_cross(),
            warnings: output.validation.warnings(),
            export_timestamp: Utc::now().to_rfc3339(),
        };
        serde_json::to_writer_pretty(
            File::create(self.output_dir.join(METADATA_JSON))?,
            &metadata,
        )?;

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{BookLevel, BookSnapshot, LevelFlow, OrderFlowRow};
    use chrono::TimeZone;
    use ndarray::{array, Array2};
    use ndarray_npy::read_npy;
    use tempfile::tempdir;

    fn matrix() -> CoefficientMatrix {
        CoefficientMatrix::new(
            vec!["A".into(), "B".into()],
            vec!["A".into(), "B".into()],
            array![[0.5, f64::NAN], [0.1, -0.2]],
        )
        .unwrap()
    }

    #[test]
    fn test_coefficients_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(COEFFICIENTS_CSV);
        write_coefficients_csv(&matrix(), &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["target,A,B", "A,0.5,", "B,0.1,-0.2"]);
    }

    #[test]
    fn test_coefficients_json_nan_is_null() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(COEFFICIENTS_JSON);
        write_coefficients_json(&matrix(), &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["targets"][1], "B");
        assert_eq!(value["values"][0][0], 0.5);
        assert!(value["values"][0][1].is_null());
    }

    #[test]
    fn test_coefficients_npy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(COEFFICIENTS_NPY);
        write_coefficients_npy(&matrix(), &path).unwrap();

        let loaded: Array2<f64> = read_npy(&path).unwrap();
        assert_eq!(loaded.dim(), (2, 2));
        assert_eq!(loaded[[1, 1]], -0.2);
    }

    #[test]
    fn test_integrated_and_returns_csv() {
        let dir = tempdir().unwrap();
        let ts = Utc.timestamp_opt(1, 0).unwrap();
        let rows = vec![IntegratedOfiRow {
            row: OrderFlowRow {
                snapshot: BookSnapshot::new(ts, "A", vec![BookLevel::new(10.0, 10.5, 3.0, 4.0)]),
                flows: vec![LevelFlow { bid: 2.0, ask: -1.0 }],
            },
            ofi_pca: 1.25,
        }];
        let path = dir.path().join(INTEGRATED_OFI_CSV);
        write_integrated_ofi_csv(&rows, 1, &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines[0],
            "symbol,ts_event,bid_px_00,ask_px_00,bid_sz_00,ask_sz_00,action,side,price,of_0_b,of_0_a,ofi_pca"
        );
        assert_eq!(lines[1], "A,1970-01-01T00:00:01.000000000Z,10,10.5,3,4,,,,2,-1,1.25");

        let returns = vec![ReturnRow {
            symbol: "A".into(),
            ts_event: ts,
            log_return: 0.01,
        }];
        let path = dir.path().join(RETURNS_CSV);
        write_returns_csv(&returns, &path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents.lines().collect::<Vec<_>>(),
            vec!["symbol,ts_event,log_return", "A,1970-01-01T00:00:01.000000000Z,0.01"]
        );
    }
}
