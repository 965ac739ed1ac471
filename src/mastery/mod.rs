//! Mastery Tracking
//!
//! Per-dimension exponentially weighted accuracy and speed.
//!
//! Core principles:
//! - Accuracy observation comes from the learner's rating (again..easy -> 0..1)
//! - Speed observation compares response time with a per-difficulty target
//! - Both are folded in with the same EWMA factor and hard-clamped to [0, 1]
//! - Combined mastery weights accuracy 0.7 and speed 0.3

use crate::config::MasteryParams;
use crate::sanitize::{clamp01, clamp_difficulty, non_negative};
use crate::types::{DimensionMastery, MasteryProfile, Rating, ReviewOutcome};

// ==================== Constants ====================

/// Default EWMA smoothing factor
pub const DEFAULT_ALPHA: f64 = 0.15;

/// Combined mastery below this is weak
pub const DEFAULT_WEAK_THRESHOLD: f64 = 0.7;

const ACCURACY_WEIGHT: f64 = 0.7;
const SPEED_WEIGHT: f64 = 0.3;

const FRAGILE_ACCURACY_MIN: f64 = 0.7;
const FRAGILE_SPEED_MAX: f64 = 0.5;

/// Response time ratio at which the speed score bottoms out
const MAX_TIME_RATIO: f64 = 2.0;

// ==================== Pure Functions ====================

/// One EWMA step. Inputs and alpha are clamped to [0, 1] first.
pub fn update_ewma(current: f64, observed: f64, alpha: f64) -> f64 {
    let current = clamp01(current);
    let observed = clamp01(observed);
    let alpha = clamp01(alpha);
    clamp01((1.0 - alpha) * current + alpha * observed)
}

pub fn rating_to_score(rating: Rating) -> f64 {
    match rating {
        Rating::Again => 0.0,
        Rating::Hard => 0.4,
        Rating::Good => 0.7,
        Rating::Easy => 1.0,
    }
}

/// Expected answer time for a difficulty level, in milliseconds
pub fn target_time_ms(difficulty: u8) -> f64 {
    match clamp_difficulty(difficulty) {
        1 => 5_000.0,
        2 => 10_000.0,
        3 => 20_000.0,
        4 => 40_000.0,
        _ => 60_000.0,
    }
}

/// 1.0 for an instant answer, 0.5 at the target time, 0.0 at twice the target or slower
pub fn speed_score(time_ms: f64, difficulty: u8) -> f64 {
    let ratio = (non_negative(time_ms) / target_time_ms(difficulty)).min(MAX_TIME_RATIO);
    1.0 - ratio / MAX_TIME_RATIO
}

/// Fold one review into a dimension using the default alpha
pub fn update_mastery(
    current: &DimensionMastery,
    rating: Rating,
    time_ms: f64,
    difficulty: u8,
) -> DimensionMastery {
    update_mastery_with_alpha(current, rating, time_ms, difficulty, DEFAULT_ALPHA)
}

pub fn update_mastery_with_alpha(
    current: &DimensionMastery,
    rating: Rating,
    time_ms: f64,
    difficulty: u8,
    alpha: f64,
) -> DimensionMastery {
    DimensionMastery {
        accuracy_ewma: update_ewma(current.accuracy_ewma, rating_to_score(rating), alpha),
        speed_ewma: update_ewma(current.speed_ewma, speed_score(time_ms, difficulty), alpha),
        recent_count: current.recent_count.saturating_add(1),
    }
}

pub fn combined_mastery(mastery: &DimensionMastery) -> f64 {
    ACCURACY_WEIGHT * mastery.accuracy_ewma + SPEED_WEIGHT * mastery.speed_ewma
}

/// Correct but not yet automatic
pub fn is_fragile_confidence(mastery: &DimensionMastery) -> bool {
    mastery.accuracy_ewma > FRAGILE_ACCURACY_MIN && mastery.speed_ewma < FRAGILE_SPEED_MAX
}

/// Strictly below `threshold`; a score equal to the threshold is not weak
pub fn is_weak_dimension(mastery: &DimensionMastery, threshold: f64) -> bool {
    combined_mastery(mastery) < threshold
}

/// Unweighted mean of combined mastery over all six dimensions
pub fn mean_combined(profile: &MasteryProfile) -> f64 {
    let (sum, n) = profile
        .iter()
        .fold((0.0, 0usize), |(sum, n), (_, m)| (sum + combined_mastery(m), n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

// ==================== Tracker ====================

/// Configured entry point used by the session loop
#[derive(Debug, Clone, Default)]
pub struct MasteryTracker {
    params: MasteryParams,
}

impl MasteryTracker {
    pub fn new(params: MasteryParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MasteryParams {
        &self.params
    }

    pub fn update(&self, current: &DimensionMastery, outcome: &ReviewOutcome) -> DimensionMastery {
        update_mastery_with_alpha(
            current,
            outcome.rating,
            outcome.time_ms as f64,
            outcome.difficulty,
            self.params.alpha,
        )
    }

    /// Returns a new profile with the outcome's dimension updated
    pub fn apply_outcome(&self, profile: &MasteryProfile, outcome: &ReviewOutcome) -> MasteryProfile {
        let updated = self.update(profile.get(outcome.dimension), outcome);
        tracing::debug!(
            dimension = outcome.dimension.as_str(),
            rating = outcome.rating.as_str(),
            hints_used = outcome.hints_used,
            accuracy = updated.accuracy_ewma,
            speed = updated.speed_ewma,
            count = updated.recent_count,
            "mastery updated"
        );
        profile.clone().with(outcome.dimension, updated)
    }
}

impl MasteryProfile {
    /// See [`mean_combined`]
    pub fn mean_combined(&self) -> f64 {
        mean_combined(self)
    }

    /// New profile with the outcome folded in at the default alpha; `self` is untouched
    pub fn apply_outcome(&self, outcome: &ReviewOutcome) -> MasteryProfile {
        MasteryTracker::default().apply_outcome(self, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dimension;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_update_ewma_basic() {
        assert!(approx(update_ewma(0.5, 1.0, 0.15), 0.575));
        assert!(approx(update_ewma(0.5, 0.0, 0.15), 0.425));
    }

    #[test]
    fn test_update_ewma_alpha_extremes() {
        assert_eq!(update_ewma(0.3, 0.9, 0.0), 0.3);
        assert_eq!(update_ewma(0.3, 0.9, 1.0), 0.9);
        // Out-of-range alpha is clamped
        assert_eq!(update_ewma(0.3, 0.9, -4.0), 0.3);
        assert_eq!(update_ewma(0.3, 0.9, 4.0), 0.9);
    }

    #[test]
    fn test_update_ewma_clamps_inputs() {
        assert_eq!(update_ewma(5.0, 5.0, 0.5), 1.0);
        assert_eq!(update_ewma(-5.0, -5.0, 0.5), 0.0);
        let v = update_ewma(f64::NAN, f64::INFINITY, 0.5);
        assert!((0.0..=1.0).contains(&v));
    }

    #[test]
    fn test_rating_to_score_table() {
        assert_eq!(rating_to_score(Rating::Again), 0.0);
        assert_eq!(rating_to_score(Rating::Hard), 0.4);
        assert_eq!(rating_to_score(Rating::Good), 0.7);
        assert_eq!(rating_to_score(Rating::Easy), 1.0);
    }

    #[test]
    fn test_speed_score_shape() {
        assert_eq!(speed_score(0.0, 3), 1.0);
        assert_eq!(speed_score(20_000.0, 3), 0.5);
        assert_eq!(speed_score(40_000.0, 3), 0.0);
        assert_eq!(speed_score(400_000.0, 3), 0.0);
        assert_eq!(speed_score(5_000.0, 1), 0.5);
        assert_eq!(speed_score(60_000.0, 5), 0.5);
    }

    #[test]
    fn test_speed_score_defensive() {
        assert_eq!(speed_score(-100.0, 2), 1.0);
        assert_eq!(speed_score(f64::INFINITY, 2), 0.0);
        // Difficulty outside 1..=5 uses the nearest level
        assert_eq!(speed_score(5_000.0, 0), 0.5);
        assert_eq!(speed_score(60_000.0, 9), 0.5);
    }

    #[test]
    fn test_update_mastery_does_not_mutate_input() {
        let current = DimensionMastery::default();
        let next = update_mastery(&current, Rating::Easy, 0.0, 1);
        assert_eq!(current, DimensionMastery::default());
        assert!(approx(next.accuracy_ewma, 0.575));
        assert!(approx(next.speed_ewma, 0.575));
        assert_eq!(next.recent_count, 1);
    }

    #[test]
    fn test_combined_mastery_weights() {
        let m = DimensionMastery::new(1.0, 0.0, 3);
        assert!(approx(combined_mastery(&m), 0.7));
        let m = DimensionMastery::new(0.0, 1.0, 3);
        assert!(approx(combined_mastery(&m), 0.3));
    }

    #[test]
    fn test_fragile_confidence() {
        assert!(is_fragile_confidence(&DimensionMastery::new(0.9, 0.3, 10)));
        assert!(!is_fragile_confidence(&DimensionMastery::new(0.7, 0.3, 10)));
        assert!(!is_fragile_confidence(&DimensionMastery::new(0.9, 0.5, 10)));
    }

    #[test]
    fn test_weak_dimension_strict_boundary() {
        // combined exactly 0.7 is not weak
        let m = DimensionMastery::new(1.0, 0.0, 10);
        assert_eq!(combined_mastery(&m), 0.7);
        assert!(!is_weak_dimension(&m, 0.7));
        assert!(is_weak_dimension(&m, 0.7 + 1e-9));
        assert!(is_weak_dimension(&DimensionMastery::new(0.6, 0.6, 10), DEFAULT_WEAK_THRESHOLD));
    }

    #[test]
    fn test_tracker_apply_outcome_only_touches_dimension() {
        let tracker = MasteryTracker::default();
        let profile = MasteryProfile::new();
        let outcome = ReviewOutcome {
            dimension: Dimension::ScenarioApplication,
            difficulty: 3,
            rating: Rating::Again,
            time_ms: 40_000,
            hints_used: 1,
        };
        let next = tracker.apply_outcome(&profile, &outcome);
        let scenario = next.get(Dimension::ScenarioApplication);
        assert!(approx(scenario.accuracy_ewma, 0.425));
        assert!(approx(scenario.speed_ewma, 0.425));
        assert_eq!(scenario.recent_count, 1);
        for dimension in Dimension::ALL {
            if dimension != Dimension::ScenarioApplication {
                assert_eq!(next.get(dimension), profile.get(dimension));
            }
        }
    }

    #[test]
    fn test_mean_combined_neutral_profile() {
        assert!(approx(mean_combined(&MasteryProfile::new()), 0.5));
        let profile =
            MasteryProfile::new().with(Dimension::ClozeFill, DimensionMastery::new(1.0, 1.0, 3));
        assert!(approx(profile.mean_combined(), 3.5 / 6.0));
    }

    #[test]
    fn test_profile_apply_outcome_matches_tracker() {
        let profile = MasteryProfile::new();
        let outcome = ReviewOutcome {
            dimension: Dimension::ClozeFill,
            difficulty: 2,
            rating: Rating::Good,
            time_ms: 4_000,
            hints_used: 0,
        };
        let next = profile.apply_outcome(&outcome);
        assert_eq!(next, MasteryTracker::default().apply_outcome(&profile, &outcome));
        assert_eq!(next.get(Dimension::ClozeFill).recent_count, 1);
        assert_eq!(profile, MasteryProfile::new());
    }
}
