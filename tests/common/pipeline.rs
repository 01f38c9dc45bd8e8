#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use athlete_ranking::leaderboard::SubmissionMetadata;
use athlete_ranking::orchestrator::{EvaluationOrchestrator, PipelineSettings};
use athlete_ranking::store::{AthleteStore, SqliteRankingStore};
use tempfile::TempDir;

pub const DB_FILE_NAME: &str = "ranking.db";

/// A pipeline backed by its own temporary database.
pub struct TestPipeline {
    pub orchestrator: Arc<EvaluationOrchestrator>,
    pub store: Arc<SqliteRankingStore>,
    pub temp_dir: TempDir,
}

impl TestPipeline {
    pub fn spawn() -> Self {
        Self::spawn_with(PipelineSettings::default())
    }

    pub fn spawn_with(settings: PipelineSettings) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteRankingStore::new(temp_dir.path().join(DB_FILE_NAME))
                .expect("Failed to open ranking store"),
        );
        let orchestrator = EvaluationOrchestrator::open(store.clone(), settings)
            .expect("Failed to open orchestrator");
        Self {
            orchestrator: Arc::new(orchestrator),
            store,
            temp_dir,
        }
    }

    /// Opens a second pipeline over the same database, as a restart would.
    pub fn reopen(&self) -> EvaluationOrchestrator {
        let store = Arc::new(
            SqliteRankingStore::new(self.temp_dir.path().join(DB_FILE_NAME))
                .expect("Failed to reopen ranking store"),
        );
        EvaluationOrchestrator::open(store, PipelineSettings::default())
            .expect("Failed to reopen orchestrator")
    }

    pub fn register(&self, handle: &str) -> String {
        self.store
            .create_athlete(handle)
            .expect("Failed to register athlete")
    }

    pub fn short_timeouts() -> PipelineSettings {
        PipelineSettings {
            lock_timeout: Duration::from_millis(50),
            ..PipelineSettings::default()
        }
    }

    /// Upserts a raw score, skipping evaluation.
    pub async fn record_score(&self, sport: &str, level: &str, athlete_id: &str, score: f64) {
        self.orchestrator
            .leaderboard()
            .upsert(
                sport,
                level,
                athlete_id,
                score,
                SubmissionMetadata {
                    cheat_detected: false,
                    timestamp: chrono::Utc::now().timestamp(),
                },
            )
            .await
            .expect("Failed to upsert score");
    }
}
