//! Benchmark suite for adaptive-review
//!
//! Run with: cargo bench

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use adaptive_review::selector::{variant_weight, SelectionContext, VariantSelector};
use adaptive_review::{Dimension, DimensionMastery, MasteryProfile, Variant, WeaknessAnalyzer};

fn deck() -> Vec<Variant> {
    Dimension::ALL
        .iter()
        .flat_map(|d| {
            (1u8..=5).map(move |difficulty| {
                Variant::new(
                    format!("{}-{}", d.as_str(), difficulty),
                    "concept",
                    *d,
                    difficulty,
                    "prompt",
                    "answer",
                )
            })
        })
        .collect()
}

fn mixed_profile(seed: usize) -> MasteryProfile {
    Dimension::ALL.iter().fold(MasteryProfile::new(), |p, d| {
        let v = ((seed + d.index() * 7) % 10) as f64 / 10.0;
        p.with(*d, DimensionMastery::new(v, 1.0 - v, 10))
    })
}

fn bench_variant_weight(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let variant = Variant::new("v", "c", Dimension::ScenarioApplication, 4, "p", "a");
    let profile = mixed_profile(3);
    c.bench_function("variant_weight", |b| {
        b.iter(|| variant_weight(black_box(&variant), black_box(&profile), 1, now))
    });
}

fn bench_select_variant_for_concept(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let variants = deck();
    let profile = mixed_profile(5);
    let shown = [Dimension::ScenarioApplication, Dimension::ClozeFill, Dimension::Discrimination];
    let ctx = SelectionContext {
        session_dimensions: &shown,
        consecutive_failures: 0,
        now,
    };
    let selector = VariantSelector::default();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    c.bench_function("VariantSelector::select_variant_for_concept", |b| {
        b.iter(|| selector.select_variant_for_concept(black_box(&variants), &profile, &ctx, &mut rng))
    });
}

fn bench_analyze_batch(c: &mut Criterion) {
    let analyzer = WeaknessAnalyzer::default();
    let profiles: Vec<(String, MasteryProfile)> = (0..1_000)
        .map(|i| (format!("concept-{i}"), mixed_profile(i)))
        .collect();
    c.bench_function("WeaknessAnalyzer::analyze_batch/1000", |b| {
        b.iter(|| analyzer.analyze_batch(black_box(&profiles)))
    });
}

criterion_group!(
    benches,
    bench_variant_weight,
    bench_select_variant_for_concept,
    bench_analyze_batch
);
criterion_main!(benches);
