use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use athlete_ranking::athlete::Athlete;
use athlete_ranking::config::{AppConfig, CliConfig, FileConfig};
use athlete_ranking::evaluation::EarnedBadge;
use athlete_ranking::features::FeatureVector;
use athlete_ranking::history::{HistoryRecord, HistoryStats, DEFAULT_HISTORY_RETENTION};
use athlete_ranking::notifications::{spawn_event_logger, DEFAULT_EVENT_CHANNEL_CAPACITY};
use athlete_ranking::orchestrator::{EvaluationOrchestrator, DEFAULT_STATS_WINDOW_DAYS};
use athlete_ranking::store::{AthleteStore, BadgeStore, SqliteRankingStore};
use athlete_ranking::RankingError;

mod cli_style;
use cli_style::get_styles;

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles(), version, long_version = env!("GIT_HASH"))]
struct CliArgs {
    /// Directory holding the ranking database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the CLI ones.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// How long a submission waits for a busy athlete or leaderboard.
    #[clap(long, default_value_t = 5000)]
    pub lock_timeout_ms: u64,

    /// Number of history records kept per athlete.
    #[clap(long, default_value_t = DEFAULT_HISTORY_RETENTION)]
    pub history_retention: usize,

    /// Window used for the trend reported with each submission.
    #[clap(long, default_value_t = DEFAULT_STATS_WINDOW_DAYS)]
    pub stats_window_days: u32,

    #[clap(long, default_value_t = DEFAULT_EVENT_CHANNEL_CAPACITY)]
    pub event_channel_capacity: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluates a feature vector file for an athlete. The sport is read
    /// from the vector.
    Submit {
        athlete_handle: String,
        level: String,
        #[clap(value_parser = parse_path)]
        feature_vector: PathBuf,
    },

    /// Shows the ranked entries of one leaderboard.
    Leaderboard {
        sport: String,
        level: String,
        #[clap(long)]
        limit: Option<usize>,
    },

    /// Shows every leaderboard merged and ranked by score.
    Global {
        #[clap(long)]
        limit: Option<usize>,
    },

    /// Shows the athlete's entry in one leaderboard.
    Position {
        athlete_handle: String,
        sport: String,
        level: String,
    },

    /// Shows history statistics and earned badges of an athlete.
    Stats {
        athlete_handle: String,
        #[clap(long)]
        window_days: Option<u32>,
    },
}

#[derive(Serialize)]
struct AthleteStatsOutput {
    athlete: Athlete,
    window_days: u32,
    stats: HistoryStats,
    improvement: f64,
    badges: Vec<EarnedBadge>,
    recent: Vec<HistoryRecord>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            lock_timeout_ms: self.lock_timeout_ms,
            history_retention: self.history_retention,
            stats_window_days: self.stats_window_days,
            event_channel_capacity: self.event_channel_capacity,
        }
    }
}

fn find_athlete(store: &SqliteRankingStore, handle: &str) -> Result<Athlete> {
    store
        .get_athlete_by_handle(handle)?
        .ok_or_else(|| RankingError::NotFound(format!("Athlete handle {}", handle)).into())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    info!(
        "athlete-ranking {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)
        .context("Invalid configuration")?;

    let db_path = app_config.ranking_db_path();
    info!("Opening SQLite ranking database at {:?}...", db_path);
    let store = Arc::new(SqliteRankingStore::new(&db_path)?);
    let orchestrator =
        EvaluationOrchestrator::open(store.clone(), app_config.pipeline_settings())?;
    let event_logger = spawn_event_logger(orchestrator.events().subscribe());

    match cli_args.command {
        Command::Submit {
            athlete_handle,
            level,
            feature_vector,
        } => {
            let athlete = find_athlete(&store, &athlete_handle)?;
            let vector = FeatureVector::load(&feature_vector)?;
            let sport = vector.sport.clone();
            let result = orchestrator
                .submit(&athlete.id, &sport, &level, vector)
                .await?;
            print_json(&result)?;
        }
        Command::Leaderboard {
            sport,
            level,
            limit,
        } => {
            let entries = orchestrator.leaderboard().get(&sport, &level, limit).await?;
            print_json(&entries)?;
        }
        Command::Global { limit } => {
            let entries = orchestrator.leaderboard().get_global(limit).await?;
            print_json(&entries)?;
        }
        Command::Position {
            athlete_handle,
            sport,
            level,
        } => {
            let athlete = find_athlete(&store, &athlete_handle)?;
            let entry = orchestrator
                .leaderboard()
                .position_of(&sport, &level, &athlete.id)
                .await?;
            print_json(&entry)?;
        }
        Command::Stats {
            athlete_handle,
            window_days,
        } => {
            let athlete = find_athlete(&store, &athlete_handle)?;
            let window_days = window_days.unwrap_or(app_config.stats_window_days);
            let history = orchestrator.history();
            let output = AthleteStatsOutput {
                stats: history.stats(&athlete.id, window_days).await,
                improvement: history.improvement(&athlete.id).await,
                badges: store.get_athlete_badges(&athlete.id)?,
                recent: history.records(&athlete.id).await,
                athlete,
                window_days,
            };
            print_json(&output)?;
        }
    }

    // Closing the bus lets the logger drain what was published and exit.
    drop(orchestrator);
    let _ = event_logger.await;
    Ok(())
}
