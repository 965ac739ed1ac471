//! SM-2 Review Scheduler
//!
//! One-shot transitions over `(interval_days, ease_factor)`:
//! - the ease factor moves by a fixed step per rating and stays in [1.3, 2.5]
//! - `again` resets the interval to one day
//! - `hard` stretches it by 1.2, `good`/`easy` multiply by the updated ease
//!
//! Every time-dependent function has an `_at` form taking `now` explicitly.

use chrono::{DateTime, Duration, Utc};

use crate::config::SchedulerParams;
use crate::sanitize::{bounded, finite_or};
use crate::types::{Rating, ScheduleEntry, MS_PER_DAY};

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const MAX_EASE_FACTOR: f64 = 2.5;

fn ease_adjustment(rating: Rating) -> f64 {
    match rating {
        Rating::Again => -0.2,
        Rating::Hard => -0.15,
        Rating::Good => 0.0,
        Rating::Easy => 0.15,
    }
}

pub fn update_ease_factor(current: f64, rating: Rating) -> f64 {
    update_ease_factor_with(current, rating, &SchedulerParams::default())
}

pub fn update_ease_factor_with(current: f64, rating: Rating, params: &SchedulerParams) -> f64 {
    let current = finite_or(current, params.initial_ease);
    bounded(current + ease_adjustment(rating), params.min_ease, params.max_ease)
}

pub fn next_interval(current_interval: f64, ease_factor: f64, rating: Rating) -> f64 {
    next_interval_with(current_interval, ease_factor, rating, &SchedulerParams::default())
}

pub fn next_interval_with(
    current_interval: f64,
    ease_factor: f64,
    rating: Rating,
    params: &SchedulerParams,
) -> f64 {
    let current_interval = finite_or(current_interval, params.min_interval_days);
    let ease_factor = finite_or(ease_factor, params.initial_ease);

    let raw = match rating {
        Rating::Again => params.min_interval_days,
        Rating::Hard => current_interval * params.hard_multiplier,
        Rating::Good | Rating::Easy => current_interval * ease_factor,
    };
    bounded(raw, params.min_interval_days, params.max_interval_days)
}

/// Saturates at the calendar limit instead of overflowing
fn add_days(now: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    // Float casts saturate and map NaN to 0
    let ms = (days * MS_PER_DAY).round() as i64;
    Duration::try_milliseconds(ms)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn schedule_next_review(current: &ScheduleEntry, rating: Rating) -> ScheduleEntry {
    schedule_next_review_at(current, rating, Utc::now())
}

pub fn schedule_next_review_at(
    current: &ScheduleEntry,
    rating: Rating,
    now: DateTime<Utc>,
) -> ScheduleEntry {
    ReviewScheduler::default().schedule_next_review_at(current, rating, now)
}

pub fn create_initial_schedule(concept_id: &str) -> ScheduleEntry {
    create_initial_schedule_at(concept_id, Utc::now())
}

pub fn create_initial_schedule_at(concept_id: &str, now: DateTime<Utc>) -> ScheduleEntry {
    ReviewScheduler::default().create_initial_schedule_at(concept_id, now)
}

pub fn is_overdue(schedule: &ScheduleEntry) -> bool {
    is_overdue_at(schedule, Utc::now())
}

/// Due exactly at `now` counts as overdue
pub fn is_overdue_at(schedule: &ScheduleEntry, now: DateTime<Utc>) -> bool {
    schedule.due_at <= now
}

pub fn overdue_days(schedule: &ScheduleEntry) -> f64 {
    overdue_days_at(schedule, Utc::now())
}

pub fn overdue_days_at(schedule: &ScheduleEntry, now: DateTime<Utc>) -> f64 {
    let elapsed_ms = now.signed_duration_since(schedule.due_at).num_milliseconds();
    (elapsed_ms as f64 / MS_PER_DAY).max(0.0)
}

/// Short human string for an interval: `now`, `3d`, `2.5d`, `2w`, `4mo`, `1.5y`
pub fn format_interval(days: f64) -> String {
    fn trim(value: f64) -> String {
        let rounded = (value * 10.0).round() / 10.0;
        if rounded.fract() == 0.0 {
            format!("{}", rounded as i64)
        } else {
            format!("{rounded:.1}")
        }
    }

    if !days.is_finite() || days < 1.0 {
        "now".to_string()
    } else if days < 7.0 {
        format!("{}d", trim(days))
    } else if days < 30.0 {
        format!("{}w", trim(days / 7.0))
    } else if days < 365.0 {
        format!("{}mo", trim(days / 30.0))
    } else {
        format!("{}y", trim(days / 365.0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewScheduler {
    params: SchedulerParams,
}

impl ReviewScheduler {
    pub fn new(params: SchedulerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    pub fn create_initial_schedule_at(&self, concept_id: &str, now: DateTime<Utc>) -> ScheduleEntry {
        ScheduleEntry {
            concept_id: concept_id.to_string(),
            due_at: now,
            interval_days: self.params.min_interval_days,
            ease_factor: self.params.initial_ease,
        }
    }

    /// Ease is updated first; the interval then uses the new ease
    pub fn schedule_next_review_at(
        &self,
        current: &ScheduleEntry,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> ScheduleEntry {
        let ease_factor = update_ease_factor_with(current.ease_factor, rating, &self.params);
        let interval_days =
            next_interval_with(current.interval_days, ease_factor, rating, &self.params);
        let due_at = add_days(now, interval_days);

        tracing::debug!(
            concept_id = %current.concept_id,
            rating = rating.as_str(),
            prev_interval = current.interval_days,
            interval_days,
            ease_factor,
            "schedule updated"
        );

        ScheduleEntry {
            concept_id: current.concept_id.clone(),
            due_at,
            interval_days,
            ease_factor,
        }
    }

    pub fn schedule_next_review(&self, current: &ScheduleEntry, rating: Rating) -> ScheduleEntry {
        self.schedule_next_review_at(current, rating, Utc::now())
    }

    /// Interval each rating would produce, for labelling rating buttons
    pub fn preview_intervals(&self, current: &ScheduleEntry) -> [(Rating, f64); 4] {
        Rating::ALL.map(|rating| {
            let ease = update_ease_factor_with(current.ease_factor, rating, &self.params);
            (
                rating,
                next_interval_with(current.interval_days, ease, rating, &self.params),
            )
        })
    }
}
