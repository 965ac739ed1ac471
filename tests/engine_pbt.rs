//! Property-Based Tests for the adaptive engine
//!
//! Tests the following invariants:
//! - EWMA output stays in [0, 1] for any input, and alpha 0/1 are identities
//! - Mastery updates keep both EWMA fields in [0, 1]
//! - Ease factor never leaves [1.3, 2.5] under any rating sequence
//! - Intervals never drop below one day
//! - Pure functions are idempotent (same input, bit-identical output)
//! - Weighted draws always land on a positive-weight index

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use adaptive_review::mastery::{combined_mastery, update_ewma, update_mastery};
use adaptive_review::scheduler::{next_interval, schedule_next_review_at, update_ease_factor};
use adaptive_review::selector::{pick_by_draw, variant_weight};
use adaptive_review::sanitize::clamp01;
use adaptive_review::weakness::analyze;
use adaptive_review::{Dimension, DimensionMastery, MasteryProfile, Rating, ScheduleEntry, Variant};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_f64_0_1() -> impl Strategy<Value = f64> {
    (0u64..=1000u64).prop_map(|v| v as f64 / 1000.0)
}

fn arb_any_f64() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1.0e6f64..1.0e6f64,
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        arb_f64_0_1(),
    ]
}

fn arb_rating() -> impl Strategy<Value = Rating> {
    prop_oneof![
        Just(Rating::Again),
        Just(Rating::Hard),
        Just(Rating::Good),
        Just(Rating::Easy),
    ]
}

fn arb_dimension() -> impl Strategy<Value = Dimension> {
    (0usize..6).prop_map(|i| Dimension::ALL[i])
}

fn arb_mastery() -> impl Strategy<Value = DimensionMastery> {
    (arb_f64_0_1(), arb_f64_0_1(), 0u32..50)
        .prop_map(|(acc, speed, n)| DimensionMastery::new(acc, speed, n))
}

fn arb_profile() -> impl Strategy<Value = MasteryProfile> {
    prop::collection::vec(arb_mastery(), 6).prop_map(|masteries| {
        Dimension::ALL
            .iter()
            .zip(masteries)
            .fold(MasteryProfile::new(), |p, (d, m)| p.with(*d, m))
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn ewma_output_is_clamped(current in arb_any_f64(), observed in arb_any_f64(), alpha in arb_any_f64()) {
        let v = update_ewma(current, observed, alpha);
        prop_assert!((0.0..=1.0).contains(&v));
    }

    #[test]
    fn ewma_alpha_identities(current in arb_any_f64(), observed in arb_any_f64()) {
        prop_assert_eq!(update_ewma(current, observed, 0.0), clamp01(current));
        prop_assert_eq!(update_ewma(current, observed, 1.0), clamp01(observed));
    }

    #[test]
    fn mastery_update_stays_in_bounds(
        start in arb_mastery(),
        reviews in prop::collection::vec((arb_rating(), 0u64..200_000, 1u8..=5), 1..40),
    ) {
        let mut m = start;
        for (rating, time_ms, difficulty) in reviews {
            let next = update_mastery(&m, rating, time_ms as f64, difficulty);
            prop_assert!((0.0..=1.0).contains(&next.accuracy_ewma));
            prop_assert!((0.0..=1.0).contains(&next.speed_ewma));
            prop_assert_eq!(next.recent_count, m.recent_count + 1);
            m = next;
        }
        prop_assert!((0.0..=1.0).contains(&combined_mastery(&m)));
    }

    #[test]
    fn ease_factor_never_leaves_bounds(start in 0.0f64..5.0, ratings in prop::collection::vec(arb_rating(), 1..60)) {
        let mut ease = start;
        for rating in ratings {
            ease = update_ease_factor(ease, rating);
            prop_assert!((1.3..=2.5).contains(&ease), "ease {} out of range", ease);
        }
    }

    #[test]
    fn interval_floor_is_one_day(interval in 0.0f64..400.0, ease in 1.3f64..=2.5, rating in arb_rating()) {
        prop_assert!(next_interval(interval, ease, rating) >= 1.0);
    }

    #[test]
    fn scheduling_is_idempotent(interval in 1.0f64..400.0, ease in 1.3f64..=2.5, rating in arb_rating()) {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 8, 30, 0).unwrap();
        let entry = ScheduleEntry {
            concept_id: "c".to_string(),
            due_at: now,
            interval_days: interval,
            ease_factor: ease,
        };
        let a = schedule_next_review_at(&entry, rating, now);
        let b = schedule_next_review_at(&entry, rating, now);
        prop_assert_eq!(a.interval_days.to_bits(), b.interval_days.to_bits());
        prop_assert_eq!(a.ease_factor.to_bits(), b.ease_factor.to_bits());
        prop_assert_eq!(a.due_at, b.due_at);
        prop_assert!(a.due_at > now);
    }

    #[test]
    fn analysis_is_idempotent(profile in arb_profile()) {
        prop_assert_eq!(analyze(&profile), analyze(&profile));
    }

    #[test]
    fn weights_are_positive(profile in arb_profile(), dimension in arb_dimension(), difficulty in 1u8..=5, failures in 0u32..6) {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 8, 30, 0).unwrap();
        let v = Variant::new("v", "c", dimension, difficulty, "p", "a");
        let w = variant_weight(&v, &profile, failures, now);
        prop_assert!(w > 0.0 && w.is_finite());
        prop_assert_eq!(w.to_bits(), variant_weight(&v, &profile, failures, now).to_bits());
    }

    #[test]
    fn draw_lands_on_positive_weight(
        weights in prop::collection::vec(prop_oneof![Just(0.0f64), 0.01f64..10.0], 1..12),
        unit in 0.0f64..1.0,
    ) {
        match pick_by_draw(&weights, unit) {
            Some(i) => prop_assert!(weights[i] > 0.0),
            None => prop_assert!(weights.iter().all(|w| *w == 0.0)),
        }
    }
}
