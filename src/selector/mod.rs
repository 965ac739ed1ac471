//! Variant Selection
//!
//! Picks the next question variant for a due concept.
//!
//! Each candidate gets a multiplicative weight:
//!
//! ```text
//! weight = weakness_boost * novelty_boost * anti_frustration_penalty * difficulty_alignment
//! ```
//!
//! and one is drawn proportionally to its weight. Three safety rails sit on
//! top of the draw: a per-session dimension cap, confidence cards after a
//! failure streak, and maintenance reps for strong dimensions.
//!
//! Randomness is always injected (`rand::Rng`), so a seeded
//! `ChaCha8Rng` reproduces a session exactly.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SafetyRailParams;
use crate::mastery::{combined_mastery, DEFAULT_WEAK_THRESHOLD};
use crate::sanitize::{finite_or, non_negative};
use crate::types::{Dimension, DimensionMastery, MasteryProfile, Variant, DIMENSION_COUNT, MS_PER_DAY};

// ==================== Constants ====================

const WEAKNESS_SLOPE: f64 = 2.0;
const STRONG_DIMENSION_PENALTY: f64 = 0.9;

const NEVER_SHOWN_BOOST: f64 = 2.0;
const STALE_BOOST: f64 = 1.5;
const AGING_BOOST: f64 = 1.2;
const RECENT_PENALTY: f64 = 0.8;
const STALE_AFTER_DAYS: f64 = 7.0;
const RECENT_WITHIN_DAYS: f64 = 3.0;

const CHALLENGE_ZONE_BONUS: f64 = 1.2;
const CLOSE_FIT: f64 = 1.0;
const LOOSE_FIT: f64 = 0.7;
const POOR_FIT: f64 = 0.5;

// ==================== Weight Components ====================

/// Up to ~2.4 for a dimension near zero, flat 0.9 once it is strong
pub fn weakness_boost(mastery: &DimensionMastery) -> f64 {
    weakness_boost_with(mastery, DEFAULT_WEAK_THRESHOLD)
}

/// Boost relative to a configured weak/strong boundary
pub fn weakness_boost_with(mastery: &DimensionMastery, weak_threshold: f64) -> f64 {
    let combined = combined_mastery(mastery);
    if combined < weak_threshold {
        1.0 + WEAKNESS_SLOPE * (weak_threshold - combined)
    } else {
        STRONG_DIMENSION_PENALTY
    }
}

pub fn novelty_boost(last_shown_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(shown) = last_shown_at else {
        return NEVER_SHOWN_BOOST;
    };
    let age_days = non_negative(now.signed_duration_since(shown).num_milliseconds() as f64 / MS_PER_DAY);
    if age_days > STALE_AFTER_DAYS {
        STALE_BOOST
    } else if age_days >= RECENT_WITHIN_DAYS {
        AGING_BOOST
    } else {
        RECENT_PENALTY
    }
}

pub fn anti_frustration_penalty(consecutive_failures: u32) -> f64 {
    match consecutive_failures {
        0 => 1.0,
        1 => 0.8,
        2 => 0.6,
        _ => 0.3,
    }
}

/// Mastery 0..1 maps linearly onto difficulty 1..5
pub fn ideal_difficulty(mastery: &DimensionMastery) -> f64 {
    1.0 + combined_mastery(mastery) * 4.0
}

pub fn difficulty_alignment(difficulty: u8, mastery: &DimensionMastery) -> f64 {
    let ideal = ideal_difficulty(mastery);
    let difficulty = f64::from(difficulty);
    let gap = (difficulty - ideal).abs();

    if difficulty > ideal && gap <= 1.0 {
        CHALLENGE_ZONE_BONUS
    } else if gap <= 1.0 {
        CLOSE_FIT
    } else if gap <= 2.0 {
        LOOSE_FIT
    } else {
        POOR_FIT
    }
}

pub fn variant_weight(
    variant: &Variant,
    profile: &MasteryProfile,
    consecutive_failures: u32,
    now: DateTime<Utc>,
) -> f64 {
    variant_weight_with(variant, profile, consecutive_failures, now, DEFAULT_WEAK_THRESHOLD)
}

pub fn variant_weight_with(
    variant: &Variant,
    profile: &MasteryProfile,
    consecutive_failures: u32,
    now: DateTime<Utc>,
    weak_threshold: f64,
) -> f64 {
    let mastery = profile.get(variant.dimension);
    weakness_boost_with(mastery, weak_threshold)
        * novelty_boost(variant.last_shown_at, now)
        * anti_frustration_penalty(consecutive_failures)
        * difficulty_alignment(variant.difficulty, mastery)
}

// ==================== Weighted Draw ====================

/// Index chosen by a pinned uniform value `unit` in [0, 1).
///
/// `None` for empty or non-positive total weight. The first cumulative
/// interval containing the draw wins; the last positive-weight index absorbs
/// rounding at the upper boundary. A non-finite `unit` draws as 0.
pub fn pick_by_draw(weights: &[f64], unit: f64) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let total: f64 = weights.iter().map(|&w| non_negative(w)).sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }

    let draw = finite_or(unit, 0.0).clamp(0.0, 1.0) * total;
    tracing::trace!(draw, total, "weighted draw");

    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += non_negative(w);
        if draw < cumulative {
            return Some(i);
        }
    }
    weights.iter().rposition(|&w| non_negative(w) > 0.0)
}

pub fn weighted_random_select<'a, T, R>(
    candidates: &'a [T],
    weights: &[f64],
    rng: &mut R,
) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    if candidates.is_empty() || candidates.len() != weights.len() {
        return None;
    }
    let unit: f64 = rng.gen();
    pick_by_draw(weights, unit).map(|i| &candidates[i])
}

// ==================== Safety Rails ====================

fn dimension_counts(session_dimensions: &[Dimension]) -> [usize; DIMENSION_COUNT] {
    let mut counts = [0usize; DIMENSION_COUNT];
    for d in session_dimensions {
        counts[d.index()] += 1;
    }
    counts
}

/// Dimensions whose share of the session exceeds `max_share`
pub fn over_represented_dimensions(session_dimensions: &[Dimension], max_share: f64) -> Vec<Dimension> {
    let total = session_dimensions.len();
    if total == 0 {
        return Vec::new();
    }
    let counts = dimension_counts(session_dimensions);
    Dimension::ALL
        .iter()
        .copied()
        .filter(|d| counts[d.index()] as f64 / total as f64 > max_share)
        .collect()
}

/// `false` once any single dimension exceeds `max_pct` of the cards shown
pub fn enforce_session_dimension_cap(session_dimensions: &[Dimension], max_pct: f64) -> bool {
    over_represented_dimensions(session_dimensions, max_pct).is_empty()
}

pub fn should_insert_confidence_card(consecutive_failures: u32) -> bool {
    consecutive_failures >= SafetyRailParams::default().confidence_card_failures
}

pub fn needs_maintenance_rep(session_dimensions: &[Dimension], profile: &MasteryProfile) -> bool {
    needs_maintenance_rep_with(session_dimensions, profile, &SafetyRailParams::default())
}

pub fn needs_maintenance_rep_with(
    session_dimensions: &[Dimension],
    profile: &MasteryProfile,
    params: &SafetyRailParams,
) -> bool {
    let total = session_dimensions.len();
    if total < params.maintenance_min_cards || total == 0 {
        return false;
    }
    let strong = session_dimensions
        .iter()
        .filter(|d| combined_mastery(profile.get(**d)) >= params.strong_threshold)
        .count();
    (strong as f64 / total as f64) < params.maintenance_min_share
}

fn is_strong(variant: &Variant, profile: &MasteryProfile, threshold: f64) -> bool {
    combined_mastery(profile.get(variant.dimension)) >= threshold
}

/// Easiest variant, preferring strong dimensions; ties go to higher mastery,
/// then to input order
pub fn select_confidence_card<'a>(
    variants: &'a [Variant],
    profile: &MasteryProfile,
) -> Option<&'a Variant> {
    let refs: Vec<&Variant> = variants.iter().collect();
    confidence_card_from(&refs, profile, SafetyRailParams::default().strong_threshold)
}

fn confidence_card_from<'a>(
    variants: &[&'a Variant],
    profile: &MasteryProfile,
    strong_threshold: f64,
) -> Option<&'a Variant> {
    let strong: Vec<&'a Variant> = variants
        .iter()
        .copied()
        .filter(|v| is_strong(v, profile, strong_threshold))
        .collect();
    let pool = if strong.is_empty() { variants } else { strong.as_slice() };

    pool.iter().copied().min_by(|a, b| {
        a.difficulty.cmp(&b.difficulty).then_with(|| {
            let ma = combined_mastery(profile.get(a.dimension));
            let mb = combined_mastery(profile.get(b.dimension));
            mb.total_cmp(&ma)
        })
    })
}

// ==================== Selector ====================

/// Session facts the selector needs
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'s> {
    /// Dimension of every card shown so far this session, in order
    pub session_dimensions: &'s [Dimension],
    pub consecutive_failures: u32,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    Weighted,
    Maintenance,
    ConfidenceCard,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::Maintenance => "maintenance",
            Self::ConfidenceCard => "confidence_card",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'a> {
    pub variant: &'a Variant,
    pub weight: f64,
    pub reason: SelectionReason,
}

#[derive(Debug, Clone, Default)]
pub struct VariantSelector {
    params: SafetyRailParams,
}

impl VariantSelector {
    pub fn new(params: SafetyRailParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SafetyRailParams {
        &self.params
    }

    pub fn should_insert_confidence_card(&self, consecutive_failures: u32) -> bool {
        consecutive_failures >= self.params.confidence_card_failures
    }

    pub fn needs_maintenance_rep(&self, session_dimensions: &[Dimension], profile: &MasteryProfile) -> bool {
        needs_maintenance_rep_with(session_dimensions, profile, &self.params)
    }

    pub fn enforce_session_dimension_cap(&self, session_dimensions: &[Dimension]) -> bool {
        enforce_session_dimension_cap(session_dimensions, self.params.max_dimension_share)
    }

    /// Weight with the weakness boost taken relative to `strong_threshold`
    pub fn variant_weight(
        &self,
        variant: &Variant,
        profile: &MasteryProfile,
        consecutive_failures: u32,
        now: DateTime<Utc>,
    ) -> f64 {
        variant_weight_with(variant, profile, consecutive_failures, now, self.params.strong_threshold)
    }

    fn weights_for(&self, variants: &[&Variant], profile: &MasteryProfile, ctx: &SelectionContext<'_>) -> Vec<f64> {
        variants
            .iter()
            .map(|v| {
                let weight = self.variant_weight(v, profile, ctx.consecutive_failures, ctx.now);
                tracing::debug!(
                    variant_id = %v.id,
                    dimension = v.dimension.as_str(),
                    difficulty = v.difficulty,
                    weight,
                    "variant weight"
                );
                weight
            })
            .collect()
    }

    fn draw<'a, R>(
        &self,
        variants: &[&'a Variant],
        profile: &MasteryProfile,
        ctx: &SelectionContext<'_>,
        reason: SelectionReason,
        rng: &mut R,
    ) -> Option<Selection<'a>>
    where
        R: Rng + ?Sized,
    {
        let weights = self.weights_for(variants, profile, ctx);
        let unit: f64 = rng.gen();
        match pick_by_draw(&weights, unit) {
            Some(i) => Some(Selection {
                variant: variants[i],
                weight: weights[i],
                reason,
            }),
            None => {
                if !variants.is_empty() {
                    tracing::warn!(candidates = variants.len(), "degenerate selection weights");
                }
                None
            }
        }
    }

    /// Plain weighted draw over every candidate
    pub fn select_weighted<'a, R>(
        &self,
        variants: &'a [Variant],
        profile: &MasteryProfile,
        ctx: &SelectionContext<'_>,
        rng: &mut R,
    ) -> Option<Selection<'a>>
    where
        R: Rng + ?Sized,
    {
        let refs: Vec<&Variant> = variants.iter().collect();
        self.draw(&refs, profile, ctx, SelectionReason::Weighted, rng)
    }

    fn with_maintenance_from<'a, R>(
        &self,
        variants: &[&'a Variant],
        profile: &MasteryProfile,
        ctx: &SelectionContext<'_>,
        rng: &mut R,
    ) -> Option<Selection<'a>>
    where
        R: Rng + ?Sized,
    {
        if self.needs_maintenance_rep(ctx.session_dimensions, profile) {
            let strong: Vec<&'a Variant> = variants
                .iter()
                .copied()
                .filter(|v| is_strong(v, profile, self.params.strong_threshold))
                .collect();
            if !strong.is_empty() {
                tracing::info!(candidates = strong.len(), "maintenance rep due");
                if let Some(selection) =
                    self.draw(&strong, profile, ctx, SelectionReason::Maintenance, rng)
                {
                    return Some(selection);
                }
            }
        }
        self.draw(variants, profile, ctx, SelectionReason::Weighted, rng)
    }

    /// Restrict to strong dimensions when a maintenance rep is due, otherwise
    /// (or when no strong candidate exists) draw from everything
    pub fn select_variant_with_maintenance<'a, R>(
        &self,
        variants: &'a [Variant],
        profile: &MasteryProfile,
        ctx: &SelectionContext<'_>,
        rng: &mut R,
    ) -> Option<Selection<'a>>
    where
        R: Rng + ?Sized,
    {
        let refs: Vec<&Variant> = variants.iter().collect();
        self.with_maintenance_from(&refs, profile, ctx, rng)
    }

    /// Full selection with every safety rail applied, in order:
    /// confidence card, dimension cap, maintenance rep, weighted draw.
    pub fn select_variant_for_concept<'a, R>(
        &self,
        variants: &'a [Variant],
        profile: &MasteryProfile,
        ctx: &SelectionContext<'_>,
        rng: &mut R,
    ) -> Option<Selection<'a>>
    where
        R: Rng + ?Sized,
    {
        if variants.is_empty() {
            return None;
        }
        let all: Vec<&Variant> = variants.iter().collect();

        if self.should_insert_confidence_card(ctx.consecutive_failures) {
            if let Some(variant) = confidence_card_from(&all, profile, self.params.strong_threshold) {
                tracing::info!(
                    variant_id = %variant.id,
                    failures = ctx.consecutive_failures,
                    "inserting confidence card"
                );
                return Some(Selection {
                    variant,
                    weight: self.variant_weight(variant, profile, ctx.consecutive_failures, ctx.now),
                    reason: SelectionReason::ConfidenceCard,
                });
            }
        }

        let mut pool = all.clone();
        if ctx.session_dimensions.len() >= self.params.maintenance_min_cards {
            let over = over_represented_dimensions(ctx.session_dimensions, self.params.max_dimension_share);
            if !over.is_empty() {
                let kept: Vec<&Variant> = all
                    .iter()
                    .copied()
                    .filter(|v| !over.contains(&v.dimension))
                    .collect();
                if !kept.is_empty() {
                    tracing::info!(
                        capped = ?over,
                        remaining = kept.len(),
                        "session dimension cap applied"
                    );
                    pool = kept;
                }
            }
        }

        self.with_maintenance_from(&pool, profile, ctx, rng)
    }
}
