//! # adaptive-review
//!
//! Adaptive spaced-repetition engine. Beyond interval scheduling it tracks how
//! well a learner knows each of six cognitive dimensions of a concept and
//! chooses which question variant to show next.
//!
//! ## Modules
//!
//! - [`mastery`] - per-dimension EWMA accuracy/speed
//! - [`weakness`] - weak, fragile and dodging pattern detection, guidance text
//! - [`scheduler`] - SM-2 interval scheduling
//! - [`selector`] - weighted variant selection and safety rails
//! - [`session`] - single-threaded session loop over the four above
//! - [`config`] - tunable thresholds, loaded from the environment
//! - [`sanitize`] - numeric guards
//! - [`types`] - shared data model
//!
//! All algorithmic functions are pure: they take values and return new ones.
//! The only nondeterminism is the weighted draw, which takes an injected
//! `rand::Rng`.
//!
//! ```rust
//! use adaptive_review::{scheduler, Rating};
//!
//! let entry = scheduler::create_initial_schedule("ownership");
//! let next = scheduler::schedule_next_review(&entry, Rating::Good);
//! assert_eq!(next.interval_days, 2.5);
//! ```

pub mod config;
pub mod logging;
pub mod mastery;
pub mod sanitize;
pub mod scheduler;
pub mod selector;
pub mod session;
pub mod types;
pub mod weakness;

pub use config::{ConfigError, EngineConfig};
pub use mastery::MasteryTracker;
pub use scheduler::ReviewScheduler;
pub use selector::{Selection, SelectionContext, SelectionReason, VariantSelector};
pub use session::{ReviewSession, ReviewUpdate, SessionState};
pub use types::*;
pub use weakness::{OverallHealth, Severity, Weakness, WeaknessAnalyzer, WeaknessProfile};
