//! Single-threaded review session.
//!
//! Threads the tracker, scheduler, analyzer and selector together for one
//! sitting. Nothing here persists: the caller loads the profile and schedule,
//! hands them in, and stores what comes back.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::mastery::MasteryTracker;
use crate::scheduler::ReviewScheduler;
use crate::selector::{Selection, SelectionContext, VariantSelector};
use crate::types::{Dimension, MasteryProfile, Rating, ReviewOutcome, ScheduleEntry, Variant};
use crate::weakness::{suggestion, WeaknessAnalyzer, WeaknessProfile};

/// What the selector needs to remember between cards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    dimensions_shown: Vec<Dimension>,
    consecutive_failures: u32,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an answered card. `again` extends the failure streak, anything else ends it.
    pub fn record(&mut self, dimension: Dimension, rating: Rating) {
        self.dimensions_shown.push(dimension);
        if rating.is_failure() {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        } else {
            self.consecutive_failures = 0;
        }
    }

    pub fn dimensions_shown(&self) -> &[Dimension] {
        &self.dimensions_shown
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn cards_shown(&self) -> usize {
        self.dimensions_shown.len()
    }

    pub fn context(&self, now: DateTime<Utc>) -> SelectionContext<'_> {
        SelectionContext {
            session_dimensions: &self.dimensions_shown,
            consecutive_failures: self.consecutive_failures,
            now,
        }
    }
}

/// New values for the caller to persist after one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    pub profile: MasteryProfile,
    pub schedule: ScheduleEntry,
}

pub struct ReviewSession {
    tracker: MasteryTracker,
    analyzer: WeaknessAnalyzer,
    scheduler: ReviewScheduler,
    selector: VariantSelector,
    state: SessionState,
    rng: ChaCha8Rng,
}

impl ReviewSession {
    /// Uses `config.seed` when set, the system clock otherwise
    pub fn new(config: EngineConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        });
        Self::with_seed(config, seed)
    }

    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self {
            tracker: MasteryTracker::new(config.mastery),
            analyzer: WeaknessAnalyzer::new(config.weakness),
            scheduler: ReviewScheduler::new(config.scheduler),
            selector: VariantSelector::new(config.safety),
            state: SessionState::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn scheduler(&self) -> &ReviewScheduler {
        &self.scheduler
    }

    /// Pick the next card for a due concept; `None` means nothing to show
    pub fn next_card<'a>(
        &mut self,
        variants: &'a [Variant],
        profile: &MasteryProfile,
        now: DateTime<Utc>,
    ) -> Option<Selection<'a>> {
        let ctx = self.state.context(now);
        let selection = self
            .selector
            .select_variant_for_concept(variants, profile, &ctx, &mut self.rng);

        match &selection {
            Some(s) => tracing::debug!(
                variant_id = %s.variant.id,
                dimension = s.variant.dimension.as_str(),
                reason = s.reason.as_str(),
                weight = s.weight,
                "card selected"
            ),
            None => tracing::debug!(candidates = variants.len(), "no card available"),
        }
        selection
    }

    /// Fold an answered card into mastery and schedule
    pub fn submit(
        &mut self,
        outcome: &ReviewOutcome,
        profile: &MasteryProfile,
        schedule: &ScheduleEntry,
        now: DateTime<Utc>,
    ) -> ReviewUpdate {
        self.state.record(outcome.dimension, outcome.rating);

        let profile = self.tracker.apply_outcome(profile, outcome);
        let schedule = self
            .scheduler
            .schedule_next_review_at(schedule, outcome.rating, now);

        tracing::info!(
            concept_id = %schedule.concept_id,
            dimension = outcome.dimension.as_str(),
            rating = outcome.rating.as_str(),
            cards = self.state.cards_shown(),
            failures = self.state.consecutive_failures(),
            next_interval_days = schedule.interval_days,
            "review recorded"
        );

        ReviewUpdate { profile, schedule }
    }

    pub fn analyze(&self, profile: &MasteryProfile) -> WeaknessProfile {
        self.analyzer.analyze(profile)
    }

    pub fn suggestion(&self, profile: &MasteryProfile) -> String {
        suggestion(&self.analyze(profile))
    }
}
