//! End-to-end pipeline tests on synthetic books.

mod common;

use common::{quote, random_book, ts, ts_ms};
use ofi_cross_impact::prelude::*;
use ofi_cross_impact::BookLevel;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// A: bid steps up at t=2 to 10.1 with size 100. B: prices constant.
fn two_instrument_book() -> Vec<BookSnapshot> {
    vec![
        quote(0, "A", 10.0, 10.2, 50.0, 40.0),
        quote(0, "B", 20.0, 20.5, 10.0, 30.0),
        quote(1, "A", 10.0, 10.2, 60.0, 40.0),
        quote(1, "B", 20.0, 20.5, 15.0, 25.0),
        quote(2, "A", 10.1, 10.2, 100.0, 40.0),
        quote(2, "B", 20.0, 20.5, 12.0, 35.0),
        quote(3, "A", 10.1, 10.2, 120.0, 45.0),
        quote(3, "B", 20.0, 20.5, 20.0, 35.0),
    ]
}

#[test]
fn test_order_flow_two_instruments() {
    let flows = OrderFlowCalculator::new(1).calculate(&two_instrument_book()).unwrap();
    assert_eq!(flows.len(), 6);

    let a: Vec<_> = flows.iter().filter(|r| r.snapshot.symbol == "A").collect();
    assert_eq!(a.len(), 3);
    assert_eq!(a[0].flows[0].bid, 10.0);
    // Price increase: the whole new queue counts
    assert_eq!(a[1].snapshot.ts_event, ts(2));
    assert_eq!(a[1].flows[0].bid, 100.0);
    assert_eq!(a[2].flows[0].bid, 20.0);
    assert_eq!(a[2].flows[0].ask, 5.0);

    let b: Vec<(f64, f64)> = flows
        .iter()
        .filter(|r| r.snapshot.symbol == "B")
        .map(|r| (r.flows[0].bid, r.flows[0].ask))
        .collect();
    assert_eq!(b, vec![(5.0, -5.0), (-3.0, 10.0), (8.0, 0.0)]);
}

#[test]
fn test_aggregation_sum_and_last() {
    let book = vec![
        BookSnapshot::new(ts_ms(100), "A", vec![BookLevel::new(10.0, 10.2, 50.0, 5.0)]),
        BookSnapshot::new(ts_ms(600), "A", vec![BookLevel::new(10.05, 10.2, 30.0, 5.0)]),
    ];
    let out = Aggregator::from_interval_str(1, "1S")
        .unwrap()
        .aggregate_snapshots(&book)
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].levels[0].bid_sz, 80.0);
    assert_eq!(out[0].levels[0].bid_px, 10.05);
}

#[test]
fn test_returns_one_fewer_row_per_instrument() {
    let book = random_book(3, 25, &["A", "B", "C"], 1, 1_000);
    let returns = ReturnsCalculator::new().calculate(&book).unwrap();

    assert_eq!(returns.len(), 3 * 24);
    for symbol in ["A", "B", "C"] {
        assert_eq!(returns.iter().filter(|r| r.symbol == symbol).count(), 24);
    }
    assert!(returns.iter().all(|r| r.log_return.is_finite()));
}

#[test]
fn test_integrator_keeps_row_count() {
    let book = random_book(5, 40, &["A", "B"], 3, 500);
    let flows = OrderFlowCalculator::new(3).calculate(&book).unwrap();
    let integration = OfiIntegrator::new(3).integrate(&flows).unwrap();

    assert_eq!(integration.rows.len(), flows.len());
    for (integrated, flow) in integration.rows.iter().zip(&flows) {
        assert_eq!(&integrated.row, flow);
        assert!(integrated.ofi_pca.is_finite());
    }
    let ratio = integration.axis.explained_variance_ratio();
    assert!((0.0..=1.0).contains(&ratio));
}

#[test]
fn test_preprocessor_idempotent() {
    let observations = vec![
        ImpactObservation::new(ts(0), "A", 1.0, 0.01, 10.0),
        ImpactObservation::new(ts(0), "A", 3.0, 0.03, 10.2),
        ImpactObservation::new(ts(0), "B", 2.0, -0.01, 20.0),
        ImpactObservation::new(ts(1), "A", 0.5, 0.02, 10.1),
    ];
    let preprocessor = Preprocessor::new(DuplicatePolicy::Mean);

    let once = preprocessor.process(observations).unwrap();
    assert_eq!(once.len(), 3);
    assert_eq!(once[0].ofi_pca, 2.0);

    let twice = preprocessor.process(once.clone()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_pipeline_run_raw_events() {
    let symbols = ["AAA", "BBB", "CCC"];
    let book = random_book(17, 80, &symbols, 2, 250);
    let pipeline = PipelineBuilder::new().levels(2).folds(4).n_alphas(30).build().unwrap();

    let output = pipeline.run(&book).unwrap();

    assert_eq!(output.levels, 2);
    assert_eq!(output.integrated.len(), 3 * 79);
    assert_eq!(output.returns.len(), 3 * 79);
    assert_eq!(output.observations.len(), 3 * 79);
    assert!(output.validation.is_valid());

    let matrix = &output.coefficients;
    assert_eq!(matrix.dim(), (3, 3));
    assert_eq!(matrix.targets(), &["AAA", "BBB", "CCC"]);
    assert_eq!(matrix.predictors(), &["AAA", "BBB", "CCC"]);
    assert!(matrix.values().iter().all(|v| v.is_finite()));
}

#[test]
fn test_pipeline_run_with_buckets() {
    let book = random_book(23, 200, &["A", "B"], 5, 100);
    let pipeline = PipelineBuilder::new().aggregate("1S").build().unwrap();

    let output = pipeline.run(&book).unwrap();

    // 20 one-second buckets per symbol; the first bucket has no prior mid
    assert_eq!(output.integrated.len(), 2 * 20);
    assert_eq!(output.returns.len(), 2 * 19);
    assert_eq!(output.observations.len(), 2 * 19);
    assert!(output
        .observations
        .iter()
        .all(|o| o.ts_event.timestamp_subsec_nanos() == 0));
    assert_eq!(output.coefficients.dim(), (2, 2));
}

#[test]
fn test_pipeline_is_pure() {
    let book = random_book(31, 60, &["A", "B"], 2, 1_000);
    let pipeline = PipelineBuilder::new().levels(2).build().unwrap();

    let first = pipeline.run(&book).unwrap();
    let second = pipeline.run(&book).unwrap();
    assert_eq!(first.coefficients.values(), second.coefficients.values());
    assert_eq!(first.observations, second.observations);
}

#[test]
fn test_pipeline_input_order_does_not_matter() {
    let book = random_book(37, 50, &["A", "B", "C"], 2, 1_000);
    let pipeline = PipelineBuilder::new().levels(2).build().unwrap();
    let expected = pipeline.run(&book).unwrap();

    let mut reversed = book.clone();
    reversed.reverse();
    let mut shuffled = book.clone();
    shuffled.shuffle(&mut StdRng::seed_from_u64(1));

    for input in [reversed, shuffled] {
        let output = pipeline.run(&input).unwrap();
        assert!(output.validation.has_warnings());
        assert_eq!(output.returns, expected.returns);
        assert_eq!(output.observations, expected.observations);
        assert_eq!(output.coefficients.values(), expected.coefficients.values());
    }
}

#[test]
fn test_pipeline_too_few_samples() {
    let pipeline = PipelineBuilder::new().levels(1).build().unwrap();
    let err = pipeline.run(&two_instrument_book()).unwrap_err();

    match err {
        Error::InsufficientSamples { samples, folds, .. } => {
            assert_eq!(samples, 3);
            assert_eq!(folds, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_pipeline_missing_levels() {
    let pipeline = PipelineBuilder::new().levels(2).build().unwrap();
    let err = pipeline.run(&two_instrument_book()).unwrap_err();
    assert!(err.is_schema());
}

#[test]
fn test_pipeline_empty_input() {
    let pipeline = PipelineBuilder::new().build().unwrap();
    assert!(matches!(pipeline.run(&[]), Err(Error::EmptyInput(_))));
}
