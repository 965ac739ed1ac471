//! Weakness Analysis
//!
//! Reads a full mastery profile and classifies:
//! - weak dimensions (combined mastery under threshold, with enough samples)
//! - fragile confidence (accurate but slow)
//! - dodging (strong rote recall masking weak deeper dimensions)
//!
//! Results are derived values, recomputed on demand and never stored.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::WeaknessParams;
use crate::mastery::{combined_mastery, is_fragile_confidence, mean_combined};
use crate::types::{Dimension, MasteryProfile};

/// Reviews required before a dimension can be flagged
pub const DEFAULT_MIN_SAMPLES: u32 = 5;

const HEALTH_POOR_BELOW: f64 = 0.5;
const HEALTH_FAIR_BELOW: f64 = 0.7;
const HEALTH_GOOD_BELOW: f64 = 0.85;

/// Ordered worst first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Moderate,
    Mild,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Moderate => "moderate",
            Self::Mild => "mild",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl OverallHealth {
    pub fn from_score(mean_combined: f64) -> Self {
        if mean_combined < HEALTH_POOR_BELOW {
            Self::Poor
        } else if mean_combined < HEALTH_FAIR_BELOW {
            Self::Fair
        } else if mean_combined < HEALTH_GOOD_BELOW {
            Self::Good
        } else {
            Self::Excellent
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weakness {
    pub dimension: Dimension,
    pub severity: Severity,
    pub score: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaknessProfile {
    /// Sorted critical first, then worst score first
    pub weaknesses: Vec<Weakness>,
    pub fragile_dimensions: Vec<Dimension>,
    pub dodging: bool,
    pub primary_weakness: Option<Weakness>,
    pub overall_health: OverallHealth,
    pub mean_score: f64,
}

// ==================== Detection ====================

fn classify(score: f64, params: &WeaknessParams) -> Severity {
    if score < params.critical_below {
        Severity::Critical
    } else if score < params.moderate_below {
        Severity::Moderate
    } else {
        Severity::Mild
    }
}

/// Weak dimensions using default thresholds and the given sample guard
pub fn detect_weak_dimensions(profile: &MasteryProfile, min_samples: u32) -> Vec<Weakness> {
    let params = WeaknessParams {
        min_samples,
        ..WeaknessParams::default()
    };
    detect_weak_dimensions_with(profile, &params)
}

pub fn detect_weak_dimensions_with(
    profile: &MasteryProfile,
    params: &WeaknessParams,
) -> Vec<Weakness> {
    let mut weaknesses: Vec<Weakness> = profile
        .iter()
        .filter(|(_, m)| m.recent_count >= params.min_samples)
        .filter_map(|(dimension, m)| {
            let score = combined_mastery(m);
            if score >= params.weak_threshold {
                return None;
            }
            let severity = classify(score, params);
            Some(Weakness {
                dimension,
                severity,
                score,
                reason: format!(
                    "{} at {:.0}% combined mastery over {} reviews",
                    dimension.label(),
                    score * 100.0,
                    m.recent_count
                ),
            })
        })
        .collect();

    weaknesses.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.score.total_cmp(&b.score))
    });
    weaknesses
}

pub fn detect_fragile_confidence(profile: &MasteryProfile) -> Vec<Dimension> {
    profile
        .iter()
        .filter(|(_, m)| is_fragile_confidence(m))
        .map(|(dimension, _)| dimension)
        .collect()
}

pub fn detect_dodging_pattern(profile: &MasteryProfile) -> bool {
    detect_dodging_pattern_with(profile, &WeaknessParams::default())
}

pub fn detect_dodging_pattern_with(profile: &MasteryProfile, params: &WeaknessParams) -> bool {
    let recall = combined_mastery(profile.get(Dimension::DefinitionRecall));
    if recall < params.dodging_recall_min {
        return false;
    }

    let others: Vec<f64> = profile
        .iter()
        .filter(|(dimension, _)| *dimension != Dimension::DefinitionRecall)
        .map(|(_, m)| combined_mastery(m))
        .collect();
    let mean_others = others.iter().sum::<f64>() / others.len() as f64;

    mean_others < params.dodging_others_max
}

pub fn analyze(profile: &MasteryProfile) -> WeaknessProfile {
    analyze_with(profile, &WeaknessParams::default())
}

pub fn analyze_with(profile: &MasteryProfile, params: &WeaknessParams) -> WeaknessProfile {
    let weaknesses = detect_weak_dimensions_with(profile, params);
    let primary_weakness = weaknesses.first().cloned();
    let mean_score = mean_combined(profile);

    WeaknessProfile {
        primary_weakness,
        weaknesses,
        fragile_dimensions: detect_fragile_confidence(profile),
        dodging: detect_dodging_pattern_with(profile, params),
        overall_health: OverallHealth::from_score(mean_score),
        mean_score,
    }
}

// ==================== Guidance ====================

fn join_labels(dimensions: &[Dimension]) -> String {
    let labels: Vec<&str> = dimensions.iter().map(|d| d.label()).collect();
    match labels.as_slice() {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

/// One learner-facing message. First matching rule wins:
/// dodging, fragile confidence, primary weakness, overall health.
pub fn suggestion(profile: &WeaknessProfile) -> String {
    if profile.dodging {
        return "Focus: scenarios, examples and discrimination. You're strong on definitions, \
                but deeper understanding is lagging behind."
            .to_string();
    }

    if !profile.fragile_dimensions.is_empty() {
        return format!(
            "You're accurate on {} but still slow. Quick-fire practice will make it automatic.",
            join_labels(&profile.fragile_dimensions)
        );
    }

    if let Some(weakness) = &profile.primary_weakness {
        let label = weakness.dimension.label();
        return match weakness.severity {
            Severity::Critical => {
                format!("Focus: {label}. This is your weakest area right now; expect more of it.")
            }
            Severity::Moderate => format!("Focus: {label}. A few more rounds will shore it up."),
            Severity::Mild => {
                format!("Nearly there on {label}. Keep it in the mix to lock it in.")
            }
        };
    }

    match profile.overall_health {
        OverallHealth::Excellent => {
            "Excellent mastery across the board. Maintenance reviews will keep it that way."
                .to_string()
        }
        OverallHealth::Good => {
            "Good progress. Keep reviewing to turn solid areas into automatic ones.".to_string()
        }
        OverallHealth::Fair => {
            "Steady progress. Mixing question types will round out your understanding."
                .to_string()
        }
        OverallHealth::Poor => {
            "Early days. Start with definitions and build up to scenarios.".to_string()
        }
    }
}

// ==================== Analyzer ====================

#[derive(Debug, Clone, Default)]
pub struct WeaknessAnalyzer {
    params: WeaknessParams,
}

impl WeaknessAnalyzer {
    pub fn new(params: WeaknessParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &WeaknessParams {
        &self.params
    }

    pub fn analyze(&self, profile: &MasteryProfile) -> WeaknessProfile {
        analyze_with(profile, &self.params)
    }

    pub fn suggest(&self, profile: &MasteryProfile) -> String {
        suggestion(&self.analyze(profile))
    }

    /// Analyze many concepts in parallel; output order follows input order
    pub fn analyze_batch(
        &self,
        profiles: &[(String, MasteryProfile)],
    ) -> Vec<(String, WeaknessProfile)> {
        profiles
            .par_iter()
            .map(|(concept_id, profile)| (concept_id.clone(), self.analyze(profile)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DimensionMastery;

    fn profile_with(entries: &[(Dimension, f64, f64, u32)]) -> MasteryProfile {
        entries
            .iter()
            .fold(MasteryProfile::new(), |p, &(d, acc, speed, n)| {
                p.with(d, DimensionMastery::new(acc, speed, n))
            })
    }

    #[test]
    fn test_weak_dimension_flagged_with_enough_samples() {
        let profile = profile_with(&[(Dimension::ScenarioApplication, 0.6, 0.6, 10)]);
        let weaknesses = detect_weak_dimensions(&profile, DEFAULT_MIN_SAMPLES);
        assert_eq!(weaknesses.len(), 1);
        assert_eq!(weaknesses[0].dimension, Dimension::ScenarioApplication);
        assert_eq!(weaknesses[0].severity, Severity::Mild);
    }

    #[test]
    fn test_weak_dimension_ignored_with_few_samples() {
        let profile = profile_with(&[(Dimension::ScenarioApplication, 0.6, 0.6, 2)]);
        assert!(detect_weak_dimensions(&profile, DEFAULT_MIN_SAMPLES).is_empty());
    }

    #[test]
    fn test_severity_bands() {
        let params = WeaknessParams::default();
        assert_eq!(classify(0.1, &params), Severity::Critical);
        assert_eq!(classify(0.39, &params), Severity::Critical);
        assert_eq!(classify(0.4, &params), Severity::Moderate);
        assert_eq!(classify(0.54, &params), Severity::Moderate);
        assert_eq!(classify(0.55, &params), Severity::Mild);
    }

    #[test]
    fn test_sort_order() {
        let profile = profile_with(&[
            (Dimension::ClozeFill, 0.6, 0.6, 9),           // 0.60 mild
            (Dimension::Discrimination, 0.2, 0.2, 9),      // 0.20 critical
            (Dimension::ScenarioApplication, 0.3, 0.3, 9), // 0.30 critical
            (Dimension::ParaphraseRecognition, 0.5, 0.5, 9), // 0.50 moderate
        ]);
        let order: Vec<Dimension> = detect_weak_dimensions(&profile, 5)
            .into_iter()
            .map(|w| w.dimension)
            .collect();
        assert_eq!(
            order,
            vec![
                Dimension::Discrimination,
                Dimension::ScenarioApplication,
                Dimension::ParaphraseRecognition,
                Dimension::ClozeFill,
            ]
        );
    }

    #[test]
    fn test_fragile_detection() {
        let profile = profile_with(&[
            (Dimension::ExampleClassification, 0.9, 0.3, 4),
            (Dimension::ClozeFill, 0.9, 0.9, 4),
        ]);
        assert_eq!(
            detect_fragile_confidence(&profile),
            vec![Dimension::ExampleClassification]
        );
    }

    #[test]
    fn test_dodging_pattern() {
        let mut entries = vec![(Dimension::DefinitionRecall, 0.9, 0.8, 20)];
        for d in Dimension::ALL.iter().skip(1) {
            entries.push((*d, 0.4, 0.4, 10));
        }
        assert!(detect_dodging_pattern(&profile_with(&entries)));

        // Recall not strong enough
        entries[0] = (Dimension::DefinitionRecall, 0.7, 0.7, 20);
        assert!(!detect_dodging_pattern(&profile_with(&entries)));
    }

    #[test]
    fn test_no_dodging_when_others_fine() {
        let mut entries = vec![(Dimension::DefinitionRecall, 0.95, 0.9, 20)];
        for d in Dimension::ALL.iter().skip(1) {
            entries.push((*d, 0.7, 0.6, 10));
        }
        assert!(!detect_dodging_pattern(&profile_with(&entries)));
    }

    #[test]
    fn test_analyze_bundle() {
        let profile = profile_with(&[
            (Dimension::Discrimination, 0.2, 0.2, 9),
            (Dimension::ClozeFill, 0.6, 0.6, 9),
        ]);
        let result = analyze(&profile);
        assert_eq!(result.weaknesses.len(), 2);
        assert_eq!(
            result.primary_weakness.as_ref().map(|w| w.dimension),
            Some(Dimension::Discrimination)
        );
        assert_eq!(result.overall_health, OverallHealth::Poor);
        assert!(!result.dodging);
    }

    #[test]
    fn test_health_buckets() {
        assert_eq!(OverallHealth::from_score(0.49), OverallHealth::Poor);
        assert_eq!(OverallHealth::from_score(0.5), OverallHealth::Fair);
        assert_eq!(OverallHealth::from_score(0.7), OverallHealth::Good);
        assert_eq!(OverallHealth::from_score(0.85), OverallHealth::Excellent);
    }

    #[test]
    fn test_suggestion_priority() {
        let base = WeaknessProfile {
            weaknesses: vec![],
            fragile_dimensions: vec![Dimension::ClozeFill],
            dodging: true,
            primary_weakness: Some(Weakness {
                dimension: Dimension::Discrimination,
                severity: Severity::Critical,
                score: 0.2,
                reason: String::new(),
            }),
            overall_health: OverallHealth::Poor,
            mean_score: 0.3,
        };
        assert!(suggestion(&base).contains("strong on definitions"));

        let fragile = WeaknessProfile {
            dodging: false,
            ..base.clone()
        };
        assert!(suggestion(&fragile).contains("fill-in-the-blank"));

        let weak = WeaknessProfile {
            fragile_dimensions: vec![],
            ..fragile.clone()
        };
        assert!(suggestion(&weak).starts_with("Focus: telling similar concepts apart"));

        let healthy = WeaknessProfile {
            primary_weakness: None,
            overall_health: OverallHealth::Excellent,
            ..weak
        };
        assert!(suggestion(&healthy).starts_with("Excellent"));
    }

    #[test]
    fn test_join_labels() {
        assert_eq!(join_labels(&[Dimension::ClozeFill]), "fill-in-the-blank");
        assert_eq!(
            join_labels(&[
                Dimension::DefinitionRecall,
                Dimension::ParaphraseRecognition,
                Dimension::ScenarioApplication
            ]),
            "definitions, paraphrases and scenarios"
        );
    }

    #[test]
    fn test_analyze_batch_preserves_order() {
        let analyzer = WeaknessAnalyzer::default();
        let inputs: Vec<(String, MasteryProfile)> = (0..16)
            .map(|i| {
                let acc = i as f64 / 16.0;
                (
                    format!("concept-{i}"),
                    profile_with(&[(Dimension::ClozeFill, acc, acc, 10)]),
                )
            })
            .collect();
        let results = analyzer.analyze_batch(&inputs);
        assert_eq!(results.len(), 16);
        for ((id, profile), (out_id, out)) in inputs.iter().zip(results.iter()) {
            assert_eq!(id, out_id);
            assert_eq!(*out, analyzer.analyze(profile));
        }
    }
}
