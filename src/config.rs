use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::mastery::DEFAULT_WEAK_THRESHOLD;

/// Default directory for the rolling log file
pub const DEFAULT_LOG_DIR: &str = "./logs";

/// Default rolling log file name prefix
pub const DEFAULT_LOG_FILE_PREFIX: &str = "adaptive-review.log";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryParams {
    /// EWMA smoothing factor
    pub alpha: f64,
}

impl Default for MasteryParams {
    fn default() -> Self {
        Self { alpha: 0.15 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaknessParams {
    /// Dimensions with fewer reviews are never flagged
    pub min_samples: u32,
    pub weak_threshold: f64,
    pub critical_below: f64,
    pub moderate_below: f64,
    pub dodging_recall_min: f64,
    pub dodging_others_max: f64,
}

impl Default for WeaknessParams {
    fn default() -> Self {
        Self {
            min_samples: 5,
            weak_threshold: DEFAULT_WEAK_THRESHOLD,
            critical_below: 0.4,
            moderate_below: 0.55,
            dodging_recall_min: 0.8,
            dodging_others_max: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerParams {
    pub min_ease: f64,
    pub max_ease: f64,
    pub initial_ease: f64,
    pub hard_multiplier: f64,
    pub min_interval_days: f64,
    pub max_interval_days: f64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            min_ease: 1.3,
            max_ease: 2.5,
            initial_ease: 2.5,
            hard_multiplier: 1.2,
            min_interval_days: 1.0,
            max_interval_days: 36_500.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyRailParams {
    /// Largest share of a session one dimension may take
    pub max_dimension_share: f64,
    /// Failure streak that triggers a confidence card
    pub confidence_card_failures: u32,
    /// Cards shown before maintenance and the cap kick in
    pub maintenance_min_cards: usize,
    /// Minimum share of strong-dimension cards
    pub maintenance_min_share: f64,
    /// Combined mastery at which a dimension counts as strong. Below it the
    /// dimension is weak and gets the weakness boost. Must equal
    /// `WeaknessParams::weak_threshold`.
    pub strong_threshold: f64,
}

impl Default for SafetyRailParams {
    fn default() -> Self {
        Self {
            max_dimension_share: 0.7,
            confidence_card_failures: 3,
            maintenance_min_cards: 5,
            maintenance_min_share: 0.2,
            strong_threshold: DEFAULT_WEAK_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mastery: MasteryParams,
    pub weakness: WeaknessParams,
    pub scheduler: SchedulerParams,
    pub safety: SafetyRailParams,
    pub log_level: String,
    /// Directory for the daily rolling log file; `None` logs to stdout only
    pub log_dir: Option<PathBuf>,
    pub log_file_prefix: String,
    /// Fixed RNG seed for reproducible sessions
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mastery: MasteryParams::default(),
            weakness: WeaknessParams::default(),
            scheduler: SchedulerParams::default(),
            safety: SafetyRailParams::default(),
            log_level: "info".to_string(),
            log_dir: None,
            log_file_prefix: DEFAULT_LOG_FILE_PREFIX.to_string(),
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `ADAPTIVE_*` environment variables.
    ///
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        override_with(&lookup, "ADAPTIVE_EWMA_ALPHA", &mut config.mastery.alpha);
        if let Some(threshold) = parse_var::<f64, _>(&lookup, "ADAPTIVE_WEAK_THRESHOLD") {
            config.set_weak_threshold(threshold);
        }
        override_with(&lookup, "ADAPTIVE_MIN_SAMPLES", &mut config.weakness.min_samples);
        override_with(
            &lookup,
            "ADAPTIVE_DODGING_RECALL_MIN",
            &mut config.weakness.dodging_recall_min,
        );
        override_with(
            &lookup,
            "ADAPTIVE_DODGING_OTHERS_MAX",
            &mut config.weakness.dodging_others_max,
        );
        override_with(
            &lookup,
            "ADAPTIVE_MAX_DIMENSION_SHARE",
            &mut config.safety.max_dimension_share,
        );
        override_with(
            &lookup,
            "ADAPTIVE_MAINTENANCE_MIN_SHARE",
            &mut config.safety.maintenance_min_share,
        );
        override_with(
            &lookup,
            "ADAPTIVE_CONFIDENCE_FAILURES",
            &mut config.safety.confidence_card_failures,
        );
        if let Some(seed) = parse_var::<u64, _>(&lookup, "ADAPTIVE_SEED") {
            config.seed = Some(seed);
        }
        if let Some(level) = lookup("RUST_LOG") {
            config.log_level = level;
        }
        if parse_var::<String, _>(&lookup, "ENABLE_FILE_LOGS")
            .is_some_and(|v| v == "true" || v == "1")
        {
            let dir = lookup("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());
            config.log_dir = Some(PathBuf::from(dir));
        }

        config
    }

    /// One weak/strong boundary for the analyzer and the selector
    pub fn set_weak_threshold(&mut self, threshold: f64) {
        self.weakness.weak_threshold = threshold;
        self.safety.strong_threshold = threshold;
    }

    /// Same config with the file layer turned off
    pub fn without_file_logging(&self) -> Self {
        Self {
            log_dir: None,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.mastery;
        check_unit("mastery.alpha", m.alpha)?;

        let w = &self.weakness;
        check_unit("weakness.weak_threshold", w.weak_threshold)?;
        check_unit("weakness.critical_below", w.critical_below)?;
        check_unit("weakness.moderate_below", w.moderate_below)?;
        check_unit("weakness.dodging_recall_min", w.dodging_recall_min)?;
        check_unit("weakness.dodging_others_max", w.dodging_others_max)?;
        if !(w.critical_below <= w.moderate_below && w.moderate_below <= w.weak_threshold) {
            return Err(ConfigError::Validation(format!(
                "severity bands out of order: critical {} / moderate {} / weak {}",
                w.critical_below, w.moderate_below, w.weak_threshold
            )));
        }

        let s = &self.scheduler;
        if !(s.min_ease >= 1.0 && s.min_ease <= s.max_ease) {
            return Err(ConfigError::Validation(format!(
                "ease range [{}, {}] is invalid",
                s.min_ease, s.max_ease
            )));
        }
        if !(s.initial_ease >= s.min_ease && s.initial_ease <= s.max_ease) {
            return Err(ConfigError::Validation(format!(
                "initial ease {} outside [{}, {}]",
                s.initial_ease, s.min_ease, s.max_ease
            )));
        }
        if !(s.hard_multiplier >= 1.0) {
            return Err(ConfigError::Validation(format!(
                "hard multiplier {} must be >= 1",
                s.hard_multiplier
            )));
        }
        if !(s.min_interval_days > 0.0) {
            return Err(ConfigError::Validation(format!(
                "minimum interval {} must be positive",
                s.min_interval_days
            )));
        }
        if !(s.max_interval_days >= s.min_interval_days) {
            return Err(ConfigError::Validation(format!(
                "maximum interval {} below minimum {}",
                s.max_interval_days, s.min_interval_days
            )));
        }

        let r = &self.safety;
        check_share("safety.max_dimension_share", r.max_dimension_share)?;
        check_share("safety.maintenance_min_share", r.maintenance_min_share)?;
        check_unit("safety.strong_threshold", r.strong_threshold)?;
        if r.strong_threshold != w.weak_threshold {
            return Err(ConfigError::Validation(format!(
                "safety.strong_threshold {} differs from weakness.weak_threshold {}",
                r.strong_threshold, w.weak_threshold
            )));
        }
        if r.confidence_card_failures == 0 {
            return Err(ConfigError::Validation(
                "confidence_card_failures must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Consume and validate in one step
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            let err = ConfigError::InvalidEnv {
                key: key.to_string(),
                value: raw,
            };
            tracing::warn!(error = %err, "ignoring config override");
            None
        }
    }
}

fn override_with<T, F>(lookup: &F, key: &str, slot: &mut T)
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = parse_var(lookup, key) {
        *slot = value;
    }
}

fn check_unit(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{name} = {value} not in [0, 1]")))
    }
}

fn check_share(name: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{name} = {value} not in (0, 1]")))
    }
}
