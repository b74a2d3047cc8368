//! Sampler properties over the registry: stratification, bounds, and
//! correlation.

use pm_math::{
    latin_hypercube_sample, random_sample, CorrelationMatrix, Distribution, DistributionSpec,
};
use pm_projection::PropertyConfig;
use pm_simulation::{DistributionRegistry, Simulation, SimulationSettings};

fn spec(name: &str, d: Distribution) -> DistributionSpec {
    DistributionSpec::new(name, d, None).unwrap()
}

fn unbounded_specs() -> Vec<DistributionSpec> {
    vec![
        spec("u", Distribution::Uniform { min: 2.0, max: 5.0 }),
        spec(
            "t",
            Distribution::Triangular {
                min: 0.25,
                mode: 0.30,
                max: 0.35,
            },
        ),
        spec("n", Distribution::Normal { mean: 0.02, std: 0.005 }),
        spec(
            "l",
            Distribution::LogNormal {
                mu: 1_000.0_f64.ln(),
                sigma: 0.2,
            },
        ),
    ]
}

fn assert_one_per_stratum(spec: &DistributionSpec, values: &[f64]) {
    let n = values.len();
    let mut hits = vec![0usize; n];
    for &x in values {
        let u = spec.distribution().cdf(x).unwrap();
        let k = ((u * n as f64).floor() as usize).min(n - 1);
        hits[k] += 1;
    }
    assert!(
        hits.iter().all(|&h| h == 1),
        "{}: strata not covered exactly once",
        spec.name()
    );
}

fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut r = vec![0.0; values.len()];
    for (rank, &i) in order.iter().enumerate() {
        r[i] = rank as f64;
    }
    r
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let (mx, my) = (x.iter().sum::<f64>() / n, y.iter().sum::<f64>() / n);
    let cov: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let vx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
    let vy: f64 = y.iter().map(|b| (b - my).powi(2)).sum();
    cov / (vx * vy).sqrt()
}

// ─── Stratification ───────────────────────────────────────────────────────────

#[test]
fn every_stratum_holds_one_sample() {
    let specs = unbounded_specs();
    let set = latin_hypercube_sample(&specs, None, 1_000, 17).unwrap();
    for spec in &specs {
        assert_one_per_stratum(spec, set.column(spec.name()).unwrap());
    }
}

#[test]
fn copula_keeps_stratification() {
    let specs = unbounded_specs();
    let corr = CorrelationMatrix::from_pairs(
        &["u", "t", "n", "l"],
        &[("u", "t", 0.5), ("n", "l", -0.4), ("u", "l", 0.2)],
    )
    .unwrap();
    let set = latin_hypercube_sample(&specs, Some(&corr), 1_000, 17).unwrap();
    for spec in &specs {
        assert_one_per_stratum(spec, set.column(spec.name()).unwrap());
    }
}

// ─── Bounds ───────────────────────────────────────────────────────────────────

#[test]
fn registry_samples_respect_bounds() {
    let mut settings = SimulationSettings {
        num_simulations: 2_000,
        ..SimulationSettings::default()
    };
    settings.fixed_parameters.clear();
    let sim = Simulation::new(PropertyConfig::base_case(), settings).unwrap();
    let set = sim.sample().unwrap();
    assert_eq!(set.names().len(), 23);

    let registry = DistributionRegistry::reference().unwrap();
    for spec in registry.specs() {
        let Some((lo, hi)) = spec.bounds() else {
            continue;
        };
        let column = set.column(spec.name()).unwrap();
        assert!(
            column.iter().all(|v| (lo..=hi).contains(v)),
            "{} escaped [{lo}, {hi}]",
            spec.name()
        );
    }
}

// ─── Correlation ──────────────────────────────────────────────────────────────

#[test]
fn declared_correlation_is_reproduced_at_5000() {
    let specs = vec![
        spec("x", Distribution::Normal { mean: 0.0, std: 1.0 }),
        spec("y", Distribution::Normal { mean: 10.0, std: 2.0 }),
    ];
    let corr = CorrelationMatrix::from_pairs(&["x", "y"], &[("x", "y", 0.6)]).unwrap();
    let set = latin_hypercube_sample(&specs, Some(&corr), 5_000, 2024).unwrap();
    let (x, y) = (set.column("x").unwrap(), set.column("y").unwrap());

    assert!((pearson(x, y) - 0.6).abs() < 0.05);
    assert!((pearson(&ranks(x), &ranks(y)) - 0.6).abs() < 0.05);
}

#[test]
fn reference_pairs_keep_their_sign() {
    let settings = SimulationSettings {
        num_simulations: 5_000,
        use_seasonality: false,
        ..SimulationSettings::default()
    };
    let sim = Simulation::new(PropertyConfig::base_case(), settings).unwrap();
    let set = sim.sample().unwrap();
    let col = |name: &str| set.column(name).unwrap();

    let positive = pearson(&ranks(col("occupancy_rate")), &ranks(col("daily_rate")));
    assert!((positive - 0.4).abs() < 0.08, "occupancy~daily rate: {positive}");
    let negative = pearson(&ranks(col("occupancy_rate")), &ranks(col("ota_booking_percentage")));
    assert!((negative + 0.3).abs() < 0.08, "occupancy~OTA share: {negative}");
}

#[test]
fn toggles_change_the_sampled_columns() {
    let base = SimulationSettings {
        num_simulations: 10,
        ..SimulationSettings::default()
    };
    let names = |s: SimulationSettings| {
        Simulation::new(PropertyConfig::base_case(), s)
            .unwrap()
            .sample()
            .unwrap()
            .names()
            .to_vec()
    };
    let all = names(base.clone());
    assert!(all.iter().any(|n| n == "winter_occupancy"));
    assert!(!all.iter().any(|n| n == "interest_rate"));

    let flat = names(SimulationSettings {
        use_seasonality: false,
        use_expense_variation: false,
        ..base
    });
    assert!(!flat.iter().any(|n| n == "winter_occupancy" || n == "maintenance_rate"));
    assert!(flat.iter().any(|n| n == "occupancy_rate"));
}

// ─── Plain random sampling ────────────────────────────────────────────────────

fn random_mode(n: usize, seed: u64) -> SimulationSettings {
    let mut settings = SimulationSettings {
        num_simulations: n,
        seed,
        use_lhs: false,
        ..SimulationSettings::default()
    };
    settings.fixed_parameters.clear();
    settings
}

#[test]
fn random_mode_reproduces_with_the_same_seed() {
    let draw = |s: SimulationSettings| {
        Simulation::new(PropertyConfig::base_case(), s)
            .unwrap()
            .sample()
            .unwrap()
    };
    let a = draw(random_mode(500, 11));
    assert_eq!(a, draw(random_mode(500, 11)));
    assert_ne!(a, draw(random_mode(500, 12)));
    assert_ne!(
        a,
        draw(SimulationSettings {
            use_lhs: true,
            ..random_mode(500, 11)
        })
    );
}

#[test]
fn random_mode_respects_bounds_and_correlation_sign() {
    let sim = Simulation::new(PropertyConfig::base_case(), random_mode(5_000, 3)).unwrap();
    let set = sim.sample().unwrap();
    assert_eq!(set.names().len(), 23);

    let registry = DistributionRegistry::reference().unwrap();
    for spec in registry.specs() {
        let Some((lo, hi)) = spec.bounds() else {
            continue;
        };
        assert!(
            set.column(spec.name()).unwrap().iter().all(|v| (lo..=hi).contains(v)),
            "{} escaped [{lo}, {hi}]",
            spec.name()
        );
    }

    let col = |name: &str| set.column(name).unwrap();
    let positive = pearson(&ranks(col("interest_rate")), &ranks(col("discount_rate")));
    assert!(positive > 0.35, "interest~discount: {positive}");
    let negative = pearson(
        &ranks(col("average_length_of_stay")),
        &ranks(col("cleaning_cost_per_stay")),
    );
    assert!(negative < -0.15, "stay length~cleaning: {negative}");
}

#[test]
fn random_mode_without_copula_is_uncorrelated() {
    let specs = unbounded_specs();
    let set = random_sample(&specs, None, 5_000, 8).unwrap();
    let rho = pearson(&ranks(set.column("u").unwrap()), &ranks(set.column("l").unwrap()));
    assert!(rho.abs() < 0.05, "{rho}");
}
