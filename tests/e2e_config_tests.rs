//! End-to-end tests for configuration loading and startup validation

mod common;

use athlete_ranking::config::{AppConfig, CliConfig, FileConfig};
use athlete_ranking::evaluation::Sport;
use athlete_ranking::orchestrator::EvaluationOrchestrator;
use athlete_ranking::store::{AthleteStore, SqliteRankingStore};
use athlete_ranking::RankingError;
use common::{steady_vector, FIXTURE_FRAMES, STATE, TENNIS};
use std::sync::Arc;
use tempfile::TempDir;

fn cli_for(temp_dir: &TempDir) -> CliConfig {
    CliConfig {
        db_dir: Some(temp_dir.path().to_path_buf()),
        lock_timeout_ms: 5000,
        history_retention: 50,
        stats_window_days: 30,
        event_channel_capacity: 256,
    }
}

#[tokio::test]
async fn test_config_file_drives_the_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("ranking.toml");
    std::fs::write(
        &config_path,
        r#"
        history_retention = 3

        [scoring.weights.tennis]
        form = 1.0
        technique = 0.0
        movement = 0.0
        balance = 0.0
        posture = 0.0
        consistency = 0.0
        "#,
    )
    .unwrap();

    let file_config = FileConfig::load(&config_path).unwrap();
    let config = AppConfig::resolve(&cli_for(&temp_dir), Some(file_config)).unwrap();
    assert_eq!(config.history_retention, 3);
    assert_eq!(config.weights.lookup(Sport::Tennis).form, 1.0);

    let store = Arc::new(SqliteRankingStore::new(config.ranking_db_path()).unwrap());
    let id = store.create_athlete("x").unwrap();
    let orchestrator = EvaluationOrchestrator::open(store, config.pipeline_settings()).unwrap();

    for _ in 0..5 {
        let result = orchestrator
            .submit(&id, TENNIS, STATE, steady_vector(TENNIS, FIXTURE_FRAMES))
            .await
            .unwrap();
        assert!((result.score.overall - result.score.components.form).abs() < 1e-9);
    }
    assert_eq!(orchestrator.history().len(&id).await, 3);
}

#[test]
fn test_invalid_weights_refuse_to_start() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("ranking.toml");
    std::fs::write(
        &config_path,
        r#"
        [scoring.weights.basketball]
        form = 0.5
        technique = 0.5
        movement = 0.5
        balance = 0.0
        posture = 0.0
        consistency = 0.0
        "#,
    )
    .unwrap();

    let file_config = FileConfig::load(&config_path).unwrap();
    let err = AppConfig::resolve(&cli_for(&temp_dir), Some(file_config)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RankingError>(),
        Some(RankingError::Configuration(_))
    ));
}

#[test]
fn test_unknown_sport_in_weights_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("ranking.toml");
    std::fs::write(
        &config_path,
        r#"
        [scoring.weights.curling]
        form = 1.0
        technique = 0.0
        movement = 0.0
        balance = 0.0
        posture = 0.0
        consistency = 0.0
        "#,
    )
    .unwrap();

    let file_config = FileConfig::load(&config_path).unwrap();
    assert!(AppConfig::resolve(&cli_for(&temp_dir), Some(file_config)).is_err());
}

#[test]
fn test_missing_config_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = FileConfig::load(&temp_dir.path().join("missing.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
