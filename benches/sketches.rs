//! Frequency sketch increment and estimate costs.

mod common;

use std::hint::black_box;

use cachesim::config::{ResetStrategy, SimulatorConfig, SketchType};
use cachesim::sketch::{Frequency, FrequencySketch};
use common::workload::{Workload, WorkloadSpec};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

const CAPACITY: u64 = 1 << 14;
const OPS: usize = 100_000;

fn keys() -> Vec<u64> {
    WorkloadSpec {
        universe: CAPACITY * 8,
        workload: Workload::Zipfian { exponent: 0.9 },
        seed: 7,
        max_weight: 1,
    }
    .trace(OPS)
    .into_iter()
    .map(|event| event.key)
    .collect()
}

fn sketch(sketch_type: SketchType, reset: ResetStrategy) -> FrequencySketch {
    let config = SimulatorConfig::builder(CAPACITY)
        .sketch_type(sketch_type)
        .sketch_reset_strategy(reset)
        .try_build()
        .unwrap();
    FrequencySketch::from_config(&config).unwrap()
}

fn bench_increment(c: &mut Criterion) {
    let mut group = c.benchmark_group("sketch_increment");
    group.throughput(Throughput::Elements(OPS as u64));
    let keys = keys();

    for &sketch_type in SketchType::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(sketch_type), &keys, |b, keys| {
            let mut sketch = sketch(sketch_type, ResetStrategy::Periodic);
            b.iter(|| {
                for &key in keys {
                    sketch.increment(black_box(key));
                }
            })
        });
    }
    for &reset in ResetStrategy::ALL {
        let id = BenchmarkId::new("count-min-4", reset);
        group.bench_with_input(id, &keys, |b, keys| {
            let mut sketch = sketch(SketchType::CountMin4, reset);
            b.iter(|| {
                for &key in keys {
                    sketch.increment(black_box(key));
                }
            })
        });
    }
    group.finish();
}

fn bench_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("sketch_estimate");
    group.throughput(Throughput::Elements(OPS as u64));
    let keys = keys();

    for &sketch_type in SketchType::ALL {
        let mut sketch = sketch(sketch_type, ResetStrategy::Periodic);
        for &key in &keys {
            sketch.increment(key);
        }
        group.bench_with_input(BenchmarkId::from_parameter(sketch_type), &keys, |b, keys| {
            b.iter(|| {
                let mut total = 0u64;
                for &key in keys {
                    total = total.wrapping_add(sketch.estimate(black_box(key)));
                }
                black_box(total)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_increment, bench_estimate);
criterion_main!(benches);
