use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pm_math::{latin_hypercube_sample, CorrelationMatrix, Distribution, DistributionSpec};

fn specs() -> Vec<DistributionSpec> {
    vec![
        DistributionSpec::new(
            "occupancy",
            Distribution::Beta {
                alpha: 2.5,
                beta: 1.8,
                min: 0.30,
                max: 0.75,
            },
            Some((0.30, 0.75)),
        )
        .unwrap(),
        DistributionSpec::new(
            "daily_rate",
            Distribution::LogNormal {
                mu: 300.0_f64.ln(),
                sigma: 0.25,
            },
            Some((150.0, 450.0)),
        )
        .unwrap(),
        DistributionSpec::new(
            "fee",
            Distribution::Triangular {
                min: 0.25,
                mode: 0.30,
                max: 0.35,
            },
            None,
        )
        .unwrap(),
        DistributionSpec::new(
            "inflation",
            Distribution::Normal {
                mean: 0.015,
                std: 0.0075,
            },
            Some((0.0, 0.03)),
        )
        .unwrap(),
    ]
}

fn bench_lhs(c: &mut Criterion) {
    let specs = specs();
    let corr = CorrelationMatrix::from_pairs(
        &["occupancy", "daily_rate", "fee", "inflation"],
        &[("occupancy", "daily_rate", 0.4), ("fee", "inflation", 0.1)],
    )
    .unwrap();
    let mut group = c.benchmark_group("latin_hypercube");
    for n in [1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::new("independent", n), &n, |b, &n| {
            b.iter(|| latin_hypercube_sample(black_box(&specs), None, n, 42).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("copula", n), &n, |b, &n| {
            b.iter(|| latin_hypercube_sample(black_box(&specs), Some(&corr), n, 42).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lhs);
criterion_main!(benches);
