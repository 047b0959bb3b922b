//! Replay throughput of every simulated policy over shared traces.

mod common;

use std::hint::black_box;

use cachesim::builder::{PolicyBuilder, PolicyKind};
use cachesim::config::{Admission, EvictionRule, SampleStrategy, SimulatorConfig};
use cachesim::traits::Policy;
use common::workload::{Workload, WorkloadSpec};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

const CAPACITY: u64 = 4096;
const OPS: usize = 100_000;

fn trace(workload: Workload, max_weight: u32) -> Vec<cachesim::traits::AccessEvent> {
    WorkloadSpec {
        universe: CAPACITY * 16,
        workload,
        seed: 42,
        max_weight,
    }
    .trace(OPS)
}

// =============================================================================
// Policy kinds
// =============================================================================

fn bench_policy_kinds(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy_replay");
    group.throughput(Throughput::Elements(OPS as u64));

    let workloads = [
        ("zipfian_1.0", Workload::Zipfian { exponent: 1.0 }),
        (
            "hotset",
            Workload::Hotset {
                hot_fraction: 0.1,
                hot_prob: 0.9,
            },
        ),
        ("scan", Workload::Scan),
    ];
    let builder = PolicyBuilder::new(SimulatorConfig::builder(CAPACITY).try_build().unwrap());

    for (name, workload) in workloads {
        let events = trace(workload, 1);
        for &kind in PolicyKind::ALL {
            group.bench_with_input(BenchmarkId::new(kind.as_str(), name), &events, |b, events| {
                b.iter_batched(
                    || builder.build(kind).unwrap(),
                    |mut policy| {
                        for &event in events {
                            black_box(policy.record(event));
                        }
                        policy
                    },
                    BatchSize::LargeInput,
                )
            });
        }
    }
    group.finish();
}

// =============================================================================
// Sampling strategies
// =============================================================================

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampled_strategy");
    group.throughput(Throughput::Elements(OPS as u64));
    let events = trace(Workload::Zipfian { exponent: 1.0 }, 1);

    for &strategy in SampleStrategy::ALL {
        for rule in [EvictionRule::Lru, EvictionRule::Hyperbolic] {
            let config = SimulatorConfig::builder(CAPACITY)
                .sample_strategy(strategy)
                .admission(Admission::Always)
                .try_build()
                .unwrap();
            let builder = PolicyBuilder::new(config);
            let id = BenchmarkId::new(strategy.as_str(), rule.as_str());
            group.bench_with_input(id, &events, |b, events| {
                b.iter_batched(
                    || builder.build(PolicyKind::Sampled(rule)).unwrap(),
                    |mut policy| {
                        for &event in events {
                            black_box(policy.record(event));
                        }
                        policy
                    },
                    BatchSize::LargeInput,
                )
            });
        }
    }
    group.finish();
}

// =============================================================================
// Hit rates (printed once, not timed)
// =============================================================================

fn report_hit_rates(_c: &mut Criterion) {
    let events = trace(Workload::Zipfian { exponent: 1.0 }, 64);
    for &admission in Admission::ALL {
        let config = SimulatorConfig::builder(CAPACITY * 8)
            .admission(admission)
            .cost_aware(true)
            .try_build()
            .unwrap();
        let builder = PolicyBuilder::new(config);
        for &kind in PolicyKind::ALL {
            let mut policy = builder.build(kind).unwrap();
            let snapshot = cachesim::builder::replay(&mut policy, events.iter().copied());
            println!(
                "{:<32} hit {:>6.2}%  weighted {:>6.2}%",
                policy.name(),
                snapshot.hit_rate() * 100.0,
                snapshot.weighted_hit_rate() * 100.0
            );
        }
    }
}

criterion_group!(benches, bench_policy_kinds, bench_sampling, report_hit_rates);
criterion_main!(benches);
