//! Cross-Impact Estimation Tool
//!
//! Loads MBP-10 style book snapshots from CSV, runs the OFI / cross-impact
//! pipeline and writes every result table into an output directory.
//!
//! ## Output Format
//!
//! - **Coefficients**: `coefficients.csv`, `coefficients.json`, `coefficients.npy`
//! - **Integrated OFI**: `integrated_ofi.csv`
//! - **Returns**: `returns.csv`
//! - **Metadata**: `metadata.json` - row counts, explained variance, self vs cross impact
//!
//! # Usage
//!
//! ```bash
//! # Estimate with a config file
//! cargo run --release --bin ofi_cross_impact -- --config configs/equities.toml \
//!     --input data/mbp10.csv --output output/equities
//!
//! # Generate sample config
//! cargo run --release --bin ofi_cross_impact -- --generate-config equities.toml
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use ofi_cross_impact::prelude::*;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct RunArgs {
    config: Option<PathBuf>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
}

/// Main entry point for the estimation tool
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map_or("ofi_cross_impact", String::as_str);

    if args.len() < 2 {
        print_usage(program);
        process::exit(1);
    }

    match args[1].as_str() {
        "--generate-config" => match args.get(2) {
            Some(path) => generate_sample_config(path),
            None => {
                eprintln!("Error: --generate-config requires a path argument");
                process::exit(1);
            }
        },
        "--help" | "-h" => print_usage(program),
        _ => match parse_run_args(&args[1..]) {
            Ok(run_args) => {
                if let Err(e) = run(run_args) {
                    error!(error = %e, "Estimation failed");
                    process::exit(1);
                }
            }
            Err(msg) => {
                eprintln!("Error: {msg}");
                print_usage(program);
                process::exit(1);
            }
        },
    }
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Cross-Impact Estimation Tool

Usage:
    {program} [--config <path.toml>] --input <book.csv> --output <dir>
    {program} --generate-config <path>   Generate sample config file
    {program} --help                     Show this help

Examples:
    # Default settings (5 levels, no aggregation)
    {program} --input data/mbp10.csv --output output/run1

    # One-second buckets from a config file
    {program} --config configs/equities.toml --input data/mbp10.csv --output output/run2
"#
    );
}

fn parse_run_args(args: &[String]) -> std::result::Result<RunArgs, String> {
    let mut parsed = RunArgs::default();
    let mut iter = args.iter();

    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .map(PathBuf::from)
                .ok_or_else(|| format!("{flag} requires a path argument"))
        };
        match flag.as_str() {
            "--config" => parsed.config = Some(value()?),
            "--input" => parsed.input = Some(value()?),
            "--output" => parsed.output = Some(value()?),
            other => return Err(format!("Unknown argument: {other}")),
        }
    }

    if parsed.input.is_none() {
        return Err("--input is required".to_string());
    }
    if parsed.output.is_none() {
        return Err("--output is required".to_string());
    }
    Ok(parsed)
}

fn run(args: RunArgs) -> ofi_cross_impact::Result<()> {
    let config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            PipelineConfig::load_toml(path)?
        }
        None => PipelineConfig::default(),
    };

    let pipeline = PipelineBuilder::from_config(config).build()?;
    let input = args.input.unwrap_or_default();
    let output_dir = args.output.unwrap_or_default();

    let snapshots = CsvBookLoader::new(pipeline.config().levels).load_path(&input)?;
    let output = pipeline.run(&snapshots)?;

    let exporter = ResultExporter::new(&output_dir);
    let metadata = exporter.export(&output)?;
    pipeline.config().save_toml(output_dir.join("config.toml"))?;

    info!(
        dir = %output_dir.display(),
        targets = metadata.targets.len(),
        observations = metadata.n_observations,
        explained_variance_ratio = metadata.explained_variance_ratio,
        "Export complete"
    );
    for summary in &metadata.impact_summary {
        info!(
            target = %summary.target,
            self_impact = summary.self_impact,
            avg_cross_impact = summary.avg_cross_impact,
            "Impact summary"
        );
    }

    Ok(())
}

/// Generate a sample configuration file
fn generate_sample_config(path: &str) {
    let config = PipelineConfig::default()
        .with_aggregation("1S")
        .with_metadata(
            ExperimentMetadata::new("cross_impact_sample")
                .with_description("Multi-level OFI cross-impact, 1s buckets"),
        );

    match config.save_toml(path) {
        Ok(()) => println!("Sample configuration written to {path}"),
        Err(e) => {
            eprintln!("Error: failed to write {path}: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_run_args_any_order() {
        let args = strings(&["--output", "out", "--input", "in.csv", "--config", "c.toml"]);
        let parsed = parse_run_args(&args).unwrap();
        assert_eq!(parsed.input, Some(PathBuf::from("in.csv")));
        assert_eq!(parsed.output, Some(PathBuf::from("out")));
        assert_eq!(parsed.config, Some(PathBuf::from("c.toml")));
    }

    #[test]
    fn test_parse_run_args_requires_input_and_output() {
        assert!(parse_run_args(&strings(&["--input", "in.csv"])).is_err());
        assert!(parse_run_args(&strings(&["--output"])).is_err());
        assert!(parse_run_args(&strings(&["--bogus", "x"])).is_err());
    }
}
