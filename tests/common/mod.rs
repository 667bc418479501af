//! Synthetic book and observation builders shared by the integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use ofi_cross_impact::{BookLevel, BookSnapshot, ImpactObservation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_205_800 + secs, 0).unwrap()
}

pub fn ts_ms(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_704_205_800_000 + millis).unwrap()
}

/// Single-level snapshot at `secs`.
pub fn quote(secs: i64, symbol: &str, bid_px: f64, ask_px: f64, bid_sz: f64, ask_sz: f64) -> BookSnapshot {
    BookSnapshot::new(ts(secs), symbol, vec![BookLevel::new(bid_px, ask_px, bid_sz, ask_sz)])
}

/// Random-walk ladders: one snapshot per symbol every `step_ms` milliseconds.
pub fn random_book(seed: u64, steps: usize, symbols: &[&str], levels: usize, step_ms: i64) -> Vec<BookSnapshot> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mids: Vec<f64> = (0..symbols.len()).map(|i| 50.0 + 25.0 * i as f64).collect();
    let mut book = Vec::with_capacity(steps * symbols.len());

    for step in 0..steps {
        for (i, symbol) in symbols.iter().enumerate() {
            mids[i] += f64::from(rng.gen_range(-3i32..=3)) * 0.01;
            let ladder = (0..levels)
                .map(|l| {
                    let offset = 0.01 * (l as f64 + 1.0);
                    BookLevel::new(
                        mids[i] - offset,
                        mids[i] + offset,
                        f64::from(rng.gen_range(1u32..400)),
                        f64::from(rng.gen_range(1u32..400)),
                    )
                })
                .collect();
            book.push(BookSnapshot::new(ts_ms(step as i64 * step_ms), *symbol, ladder));
        }
    }
    book
}

/// Joined observations where the first symbol's return loads on its own OFI
/// with `beta`; every other return is pure noise.
pub fn loaded_observations(seed: u64, timestamps: usize, symbols: &[&str], beta: f64) -> Vec<ImpactObservation> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut observations = Vec::with_capacity(timestamps * symbols.len());

    for t in 0..timestamps {
        for (i, symbol) in symbols.iter().enumerate() {
            let ofi: f64 = rng.gen_range(-1.0..1.0);
            let noise: f64 = rng.gen_range(-0.05..0.05);
            let log_return = if i == 0 { beta * ofi + noise } else { noise };
            observations.push(ImpactObservation::new(ts(t as i64), *symbol, ofi, log_return, f64::NAN));
        }
    }
    observations
}

/// CSV text in the MBP-10 column layout for `book`.
pub fn book_csv(book: &[BookSnapshot], levels: usize) -> String {
    let mut header = vec!["ts_recv".to_string(), "ts_event".to_string(), "rtype".to_string()];
    for l in 0..levels {
        header.extend([
            format!("bid_px_{l:02}"),
            format!("ask_px_{l:02}"),
            format!("bid_sz_{l:02}"),
            format!("ask_sz_{l:02}"),
        ]);
    }
    header.push("symbol".to_string());

    let mut csv = header.join(",");
    csv.push('\n');
    for snapshot in book {
        let nanos = snapshot.ts_event.timestamp_nanos_opt().unwrap();
        let mut fields = vec![nanos.to_string(), nanos.to_string(), "10".to_string()];
        for level in &snapshot.levels[..levels] {
            fields.extend([level.bid_px, level.ask_px, level.bid_sz, level.ask_sz].map(|v| v.to_string()));
        }
        fields.push(snapshot.symbol.clone());
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }
    csv
}
