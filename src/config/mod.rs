mod file_config;

pub use file_config::{FileConfig, ScoringConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::evaluation::WeightTables;
use crate::orchestrator::PipelineSettings;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub lock_timeout_ms: u64,
    pub history_retention: usize,
    pub stats_window_days: u32,
    pub event_channel_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub lock_timeout_ms: u64,
    pub history_retention: usize,
    pub stats_window_days: u32,
    pub event_channel_capacity: usize,
    pub weights: WeightTables,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let lock_timeout_ms = file.lock_timeout_ms.unwrap_or(cli.lock_timeout_ms);
        if lock_timeout_ms == 0 {
            bail!("lock_timeout_ms must be greater than 0");
        }
        let history_retention = file.history_retention.unwrap_or(cli.history_retention);
        if history_retention == 0 {
            bail!("history_retention must be at least 1");
        }
        let stats_window_days = file.stats_window_days.unwrap_or(cli.stats_window_days);
        let event_channel_capacity = file
            .event_channel_capacity
            .unwrap_or(cli.event_channel_capacity);
        if event_channel_capacity == 0 {
            bail!("event_channel_capacity must be greater than 0");
        }

        let overrides = file.scoring.unwrap_or_default().weights;
        let weights = WeightTables::with_overrides(&overrides)?;

        Ok(AppConfig {
            db_dir,
            lock_timeout_ms,
            history_retention,
            stats_window_days,
            event_channel_capacity,
            weights,
        })
    }

    pub fn ranking_db_path(&self) -> PathBuf {
        self.db_dir.join("ranking.db")
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            history_retention: self.history_retention,
            stats_window_days: self.stats_window_days,
            event_channel_capacity: self.event_channel_capacity,
            weights: self.weights.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RankingError;
    use crate::evaluation::Sport;
    use tempfile::TempDir;

    fn make_temp_db_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    fn cli_with(db_dir: Option<PathBuf>) -> CliConfig {
        CliConfig {
            db_dir,
            lock_timeout_ms: 5000,
            history_retention: 50,
            stats_window_days: 30,
            event_channel_capacity: 256,
        }
    }

    fn parse(toml_str: &str) -> FileConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = make_temp_db_dir();
        let config =
            AppConfig::resolve(&cli_with(Some(temp_dir.path().to_path_buf())), None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.lock_timeout_ms, 5000);
        assert_eq!(config.history_retention, 50);
        assert_eq!(config.stats_window_days, 30);
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(
            config.weights.lookup(Sport::Tennis),
            Sport::Tennis.default_weights()
        );
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = make_temp_db_dir();
        let file = parse(&format!(
            r#"
            db_dir = "{}"
            lock_timeout_ms = 250
            history_retention = 20

            [scoring.weights.tennis]
            form = 0.5
            technique = 0.1
            movement = 0.1
            balance = 0.1
            posture = 0.1
            consistency = 0.1
            "#,
            temp_dir.path().display()
        ));

        let cli = cli_with(Some(PathBuf::from("/should/be/overridden")));
        let config = AppConfig::resolve(&cli, Some(file)).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.lock_timeout_ms, 250);
        assert_eq!(config.history_retention, 20);
        assert_eq!(config.stats_window_days, 30);
        assert_eq!(config.weights.lookup(Sport::Tennis).form, 0.5);

        let settings = config.pipeline_settings();
        assert_eq!(settings.lock_timeout, Duration::from_millis(250));
        assert_eq!(settings.history_retention, 20);
    }

    #[test]
    fn test_resolve_rejects_bad_weights() {
        let temp_dir = make_temp_db_dir();
        let file = parse(
            r#"
            [scoring.weights.fitness]
            form = 0.9
            technique = 0.9
            movement = 0.0
            balance = 0.0
            posture = 0.0
            consistency = 0.0
            "#,
        );
        let err = AppConfig::resolve(&cli_with(Some(temp_dir.path().to_path_buf())), Some(file))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RankingError>(),
            Some(RankingError::Configuration(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_incomplete_weight_table() {
        let result: std::result::Result<FileConfig, _> = toml::from_str(
            r#"
            [scoring.weights.tennis]
            form = 1.0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let result = AppConfig::resolve(&cli_with(None), None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = cli_with(Some(PathBuf::from("/nonexistent/path/that/does/not/exist")));
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_db_dir_not_directory_error() {
        let temp_dir = make_temp_db_dir();
        let file_path = temp_dir.path().join("not_a_dir");
        std::fs::write(&file_path, "test").unwrap();

        let result = AppConfig::resolve(&cli_with(Some(file_path)), None);
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve_rejects_zero_retention() {
        let temp_dir = make_temp_db_dir();
        let mut cli = cli_with(Some(temp_dir.path().to_path_buf()));
        cli.history_retention = 0;
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("history_retention"));
    }

    #[test]
    fn test_db_path_helpers() {
        let temp_dir = make_temp_db_dir();
        let config =
            AppConfig::resolve(&cli_with(Some(temp_dir.path().to_path_buf())), None).unwrap();
        assert_eq!(config.ranking_db_path(), temp_dir.path().join("ranking.db"));
    }
}
