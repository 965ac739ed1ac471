//! Data Sanitization
//!
//! Numerical guards shared by every component.
//!
//! Functions:
//! - Unit-interval clamping that tolerates NaN/Inf
//! - Difficulty clamping to the 1..=5 scale
//! - Boundary sanitization of mastery records read from storage

use crate::types::{DimensionMastery, MasteryProfile, MAX_DIFFICULTY, MIN_DIFFICULTY};

/// Replace a non-finite value with `fallback`
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Clamp to [0, 1]. +Inf maps to 1, -Inf and NaN map to 0.
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Like `f64::clamp`, but never panics: `lo > hi` yields `hi`, and a NaN
/// bound is ignored
pub fn bounded(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Clamp to [0, +Inf). NaN maps to 0.
pub fn non_negative(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Clamp a difficulty level into the supported 1..=5 range
pub fn clamp_difficulty(difficulty: u8) -> u8 {
    difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Force a mastery record back inside its invariants.
///
/// Records produced by this crate already satisfy them; this is for data
/// coming back from an external store.
pub fn sanitize_mastery(mastery: &DimensionMastery) -> DimensionMastery {
    DimensionMastery {
        accuracy_ewma: clamp01(finite_or(mastery.accuracy_ewma, 0.5)),
        speed_ewma: clamp01(finite_or(mastery.speed_ewma, 0.5)),
        recent_count: mastery.recent_count,
    }
}

/// Sanitize every dimension of a profile
pub fn sanitize_profile(profile: &MasteryProfile) -> MasteryProfile {
    let mut out = profile.clone();
    for (dimension, mastery) in profile.iter() {
        out.set(dimension, sanitize_mastery(mastery));
    }
    out
}
