//! Common Types and Constants
//!
//! Shared data model used across the mastery, weakness, scheduler and
//! selector modules. Field names serialize in camelCase so records can be
//! stored by the persistence layer as-is.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sanitize::{clamp_difficulty, sanitize_mastery, sanitize_profile};

// ==================== Constants ====================

/// Number of cognitive dimensions tracked per concept
pub const DIMENSION_COUNT: usize = 6;

/// Starting value for both EWMA fields of a new dimension
pub const NEUTRAL_MASTERY: f64 = 0.5;

/// Easiest variant difficulty
pub const MIN_DIFFICULTY: u8 = 1;

/// Hardest variant difficulty
pub const MAX_DIFFICULTY: u8 = 5;

/// Milliseconds in one day
pub const MS_PER_DAY: f64 = 86_400_000.0;

// ==================== Enums ====================

/// Cognitive facet a question variant exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    DefinitionRecall,
    ParaphraseRecognition,
    ExampleClassification,
    ScenarioApplication,
    Discrimination,
    ClozeFill,
}

impl Dimension {
    pub const ALL: [Dimension; DIMENSION_COUNT] = [
        Dimension::DefinitionRecall,
        Dimension::ParaphraseRecognition,
        Dimension::ExampleClassification,
        Dimension::ScenarioApplication,
        Dimension::Discrimination,
        Dimension::ClozeFill,
    ];

    pub fn index(&self) -> usize {
        match self {
            Self::DefinitionRecall => 0,
            Self::ParaphraseRecognition => 1,
            Self::ExampleClassification => 2,
            Self::ScenarioApplication => 3,
            Self::Discrimination => 4,
            Self::ClozeFill => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefinitionRecall => "definition_recall",
            Self::ParaphraseRecognition => "paraphrase_recognition",
            Self::ExampleClassification => "example_classification",
            Self::ScenarioApplication => "scenario_application",
            Self::Discrimination => "discrimination",
            Self::ClozeFill => "cloze_fill",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "definition_recall" => Some(Self::DefinitionRecall),
            "paraphrase_recognition" => Some(Self::ParaphraseRecognition),
            "example_classification" => Some(Self::ExampleClassification),
            "scenario_application" => Some(Self::ScenarioApplication),
            "discrimination" => Some(Self::Discrimination),
            "cloze_fill" => Some(Self::ClozeFill),
            _ => None,
        }
    }

    /// Short learner-facing name used in guidance messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::DefinitionRecall => "definitions",
            Self::ParaphraseRecognition => "paraphrases",
            Self::ExampleClassification => "classifying examples",
            Self::ScenarioApplication => "scenarios",
            Self::Discrimination => "telling similar concepts apart",
            Self::ClozeFill => "fill-in-the-blank",
        }
    }
}

/// Learner self-rating of a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "again" => Some(Self::Again),
            "hard" => Some(Self::Hard),
            "good" => Some(Self::Good),
            "easy" => Some(Self::Easy),
            _ => None,
        }
    }

    /// Only `again` extends a frustration streak
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Again)
    }
}

// ==================== Mastery ====================

/// EWMA state for one dimension of one concept
///
/// Deserialization goes through [`sanitize_mastery`], so records read back
/// from storage always satisfy the [0, 1] bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredDimensionMastery")]
pub struct DimensionMastery {
    /// Smoothed correctness in [0, 1]
    pub accuracy_ewma: f64,
    /// Smoothed answer speed in [0, 1]
    pub speed_ewma: f64,
    /// Number of reviews folded into the averages
    pub recent_count: u32,
}

impl Default for DimensionMastery {
    fn default() -> Self {
        Self {
            accuracy_ewma: NEUTRAL_MASTERY,
            speed_ewma: NEUTRAL_MASTERY,
            recent_count: 0,
        }
    }
}

impl DimensionMastery {
    pub fn new(accuracy_ewma: f64, speed_ewma: f64, recent_count: u32) -> Self {
        sanitize_mastery(&Self {
            accuracy_ewma,
            speed_ewma,
            recent_count,
        })
    }
}

/// Unchecked wire form of [`DimensionMastery`]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDimensionMastery {
    accuracy_ewma: f64,
    speed_ewma: f64,
    recent_count: u32,
}

impl From<StoredDimensionMastery> for DimensionMastery {
    fn from(raw: StoredDimensionMastery) -> Self {
        Self::new(raw.accuracy_ewma, raw.speed_ewma, raw.recent_count)
    }
}

/// Mastery of every dimension of a concept. Always fully populated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<Dimension, DimensionMastery>",
    into = "BTreeMap<Dimension, DimensionMastery>"
)]
pub struct MasteryProfile {
    dimensions: [DimensionMastery; DIMENSION_COUNT],
}

impl MasteryProfile {
    /// Every dimension at neutral defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dimension: Dimension) -> &DimensionMastery {
        &self.dimensions[dimension.index()]
    }

    pub fn set(&mut self, dimension: Dimension, mastery: DimensionMastery) {
        self.dimensions[dimension.index()] = mastery;
    }

    /// Builder form of [`MasteryProfile::set`]
    pub fn with(mut self, dimension: Dimension, mastery: DimensionMastery) -> Self {
        self.set(dimension, mastery);
        self
    }

    /// Explicit reinitialisation of one dimension
    pub fn reset(&mut self, dimension: Dimension) {
        self.set(dimension, DimensionMastery::default());
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &DimensionMastery)> + '_ {
        Dimension::ALL
            .iter()
            .map(move |&dimension| (dimension, self.get(dimension)))
    }
}

impl From<BTreeMap<Dimension, DimensionMastery>> for MasteryProfile {
    fn from(map: BTreeMap<Dimension, DimensionMastery>) -> Self {
        let mut profile = Self::new();
        for (dimension, mastery) in map {
            profile.set(dimension, mastery);
        }
        sanitize_profile(&profile)
    }
}

impl From<MasteryProfile> for BTreeMap<Dimension, DimensionMastery> {
    fn from(profile: MasteryProfile) -> Self {
        profile.iter().map(|(d, m)| (d, *m)).collect()
    }
}

// ==================== Content ====================

/// A concrete question for one dimension of a concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub concept_id: String,
    pub dimension: Dimension,
    /// 1 (easiest) ..= 5 (hardest)
    pub difficulty: u8,
    pub prompt: String,
    pub answer: String,
    pub last_shown_at: Option<DateTime<Utc>>,
}

impl Variant {
    pub fn new(
        id: impl Into<String>,
        concept_id: impl Into<String>,
        dimension: Dimension,
        difficulty: u8,
        prompt: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            concept_id: concept_id.into(),
            dimension,
            difficulty: clamp_difficulty(difficulty),
            prompt: prompt.into(),
            answer: answer.into(),
            last_shown_at: None,
        }
    }

    pub fn with_last_shown(mut self, at: DateTime<Utc>) -> Self {
        self.last_shown_at = Some(at);
        self
    }

    /// Record a presentation; the only mutation a variant undergoes
    pub fn mark_shown(&mut self, now: DateTime<Utc>) {
        self.last_shown_at = Some(now);
    }
}

// ==================== Scheduling ====================

/// SM-2 state of one concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub concept_id: String,
    pub due_at: DateTime<Utc>,
    /// Always >= 1
    pub interval_days: f64,
    /// Clamped to [1.3, 2.5] by the scheduler
    pub ease_factor: f64,
}

/// One answered card, consumed by the tracker and the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub dimension: Dimension,
    pub difficulty: u8,
    pub rating: Rating,
    pub time_ms: u64,
    pub hints_used: u32,
}
