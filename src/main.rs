//! Seeded simulation of one review session against a synthetic learner.
//!
//! Usage: `adaptive-review [CARDS]` (default 30). Configuration comes from
//! `ADAPTIVE_*` environment variables or a `.env` file.

use chrono::{Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use adaptive_review::config::EngineConfig;
use adaptive_review::logging::{init_tracing, LoggingError};
use adaptive_review::mastery::target_time_ms;
use adaptive_review::scheduler::format_interval;
use adaptive_review::{Dimension, MasteryProfile, Rating, ReviewOutcome, ReviewSession, Variant};

const DEFAULT_CARDS: usize = 30;
const DEFAULT_SEED: u64 = 7;

/// Hidden per-dimension skill of the simulated learner: strong on recall,
/// shaky on application
fn learner_skill(dimension: Dimension) -> f64 {
    match dimension {
        Dimension::DefinitionRecall => 0.92,
        Dimension::ParaphraseRecognition => 0.75,
        Dimension::ExampleClassification => 0.6,
        Dimension::ScenarioApplication => 0.35,
        Dimension::Discrimination => 0.45,
        Dimension::ClozeFill => 0.8,
    }
}

fn demo_deck(concept_id: &str) -> Vec<Variant> {
    let mut deck = Vec::new();
    for dimension in Dimension::ALL {
        for difficulty in [1u8, 3, 5] {
            deck.push(Variant::new(
                format!("{}-{}", dimension.as_str(), difficulty),
                concept_id,
                dimension,
                difficulty,
                format!("{} question at level {}", dimension.label(), difficulty),
                "answer",
            ));
        }
    }
    deck
}

fn simulate_answer(variant: &Variant, rng: &mut ChaCha8Rng) -> ReviewOutcome {
    let skill = learner_skill(variant.dimension);
    let p_correct = (skill - 0.08 * (f64::from(variant.difficulty) - 3.0)).clamp(0.05, 0.98);
    let roll: f64 = rng.gen();

    let rating = if roll > p_correct {
        Rating::Again
    } else if roll > p_correct * 0.8 {
        Rating::Hard
    } else if roll > p_correct * 0.3 {
        Rating::Good
    } else {
        Rating::Easy
    };

    let pace = rng.gen_range(0.4..1.6) * (1.6 - skill);
    ReviewOutcome {
        dimension: variant.dimension,
        difficulty: variant.difficulty,
        rating,
        time_ms: (target_time_ms(variant.difficulty) * pace) as u64,
        hints_used: u32::from(rating == Rating::Again),
    }
}

fn main() {
    let _ = dotenvy::dotenv();
    let config = EngineConfig::from_env();
    let _log_guard = match init_tracing(&config) {
        Ok(guard) => Some(guard),
        Err(err @ LoggingError::CreateDir { .. }) => {
            let guard = init_tracing(&config.without_file_logging()).ok();
            tracing::warn!(error = %err, "file logging disabled");
            guard
        }
        Err(err) => {
            eprintln!("{err}");
            None
        }
    };

    let config = match config.validated() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let cards = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<usize>().ok())
        .unwrap_or(DEFAULT_CARDS);
    let seed = config.seed.unwrap_or(DEFAULT_SEED);

    let concept_id = "ownership";
    let mut deck = demo_deck(concept_id);
    let mut profile = MasteryProfile::new();
    let mut session = ReviewSession::with_seed(config, seed);
    let mut schedule = session
        .scheduler()
        .create_initial_schedule_at(concept_id, Utc::now());
    let mut learner_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let mut clock = Utc::now();

    tracing::info!(cards, seed, variants = deck.len(), "simulation started");

    for card in 0..cards {
        let Some(selection) = session.next_card(&deck, &profile, clock) else {
            tracing::warn!("no card available, stopping");
            break;
        };
        let variant_id = selection.variant.id.clone();
        let reason = selection.reason;
        let outcome = simulate_answer(selection.variant, &mut learner_rng);

        let update = session.submit(&outcome, &profile, &schedule, clock);
        profile = update.profile;
        schedule = update.schedule;

        if let Some(shown) = deck.iter_mut().find(|v| v.id == variant_id) {
            shown.mark_shown(clock);
        }

        println!(
            "{:>3}  {:<28} {:<16} {:<6} next in {}",
            card + 1,
            variant_id,
            reason.as_str(),
            outcome.rating.as_str(),
            format_interval(schedule.interval_days)
        );

        clock = clock + Duration::seconds(45);
    }

    let analysis = session.analyze(&profile);
    match serde_json::to_string_pretty(&analysis) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(error = %err, "failed to serialize analysis"),
    }
    println!("{}", session.suggestion(&profile));
}
