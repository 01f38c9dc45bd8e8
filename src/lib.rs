//! Athlete Ranking Library
//!
//! Scores submitted performances, flags suspicious ones and keeps per-sport,
//! per-level leaderboards together with each athlete's recent history.

pub mod athlete;
pub mod cheat;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod history;
pub mod leaderboard;
pub mod notifications;
pub mod orchestrator;
pub mod sqlite_persistence;
pub mod store;

// Re-export commonly used types for convenience
pub use error::{RankingError, RankingResult};
pub use features::FeatureVector;
pub use orchestrator::{EvaluationOrchestrator, EvaluationResult, PipelineSettings};
pub use store::{RankingStore, SqliteRankingStore};
