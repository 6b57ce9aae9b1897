//! # Cruise Cycle Benchmark

use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use comms_if::{
    eqpt::{BBox, Detection, TargetEstimate},
    tc::CruiseConfig,
};
use cruise_lib::cruise_loop::{CruiseCore, CycleInput, Params};
use util::module::State;

fn cycle_benchmark(c: &mut Criterion) {
    // ---- Build the inputs ----

    let mut config = CruiseConfig::default();
    config.tracked_label = Some(1);
    let config = Arc::new(config);

    let mut params = Params::default();
    params.follow.labels = vec!["background".into(), "person".into(), "car".into()];

    let detections: Vec<Detection> = (0..20)
        .map(|i| {
            let x = (i as f64) * 0.04;
            Detection::new(i % 3, 0.5 + 0.02 * (i as f64), BBox::new(x, 0.2, x + 0.2, 0.6))
        })
        .collect();

    let t0 = Utc::now();
    let input_at = |n: i64, detections: Option<Vec<Detection>>| {
        let timestamp = t0 + Duration::milliseconds(33 * n);
        CycleInput {
            timestamp,
            estimate: TargetEstimate::new(0.2, 0.5, 0.9, timestamp),
            detections,
            blocked: 0.1,
            config: config.clone(),
        }
    };

    // ---- Road following ----

    let mut core = CruiseCore::new(params.clone(), &config, false);
    let mut n = 0;
    c.bench_function("CruiseCore::proc (road)", |b| {
        b.iter(|| {
            n += 1;
            core.proc(&input_at(n, None)).unwrap()
        })
    });

    // ---- Fleet mode with detections ----

    let mut core = CruiseCore::new(params, &config, true);
    let mut n = 0;
    c.bench_function("CruiseCore::proc (fleet)", |b| {
        b.iter(|| {
            n += 1;
            core.proc(&input_at(n, Some(detections.clone()))).unwrap()
        })
    });
}

criterion_group!(benches, cycle_benchmark);
criterion_main!(benches);
