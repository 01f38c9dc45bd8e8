use std::time::Duration;

use serde::Serialize;

use crate::athlete::AthleteId;
use crate::cheat::CheatVerdict;
use crate::evaluation::{Badge, PerformanceLevel, PerformanceScore, WeightTables};
use crate::history::{Trend, DEFAULT_HISTORY_RETENTION};
use crate::leaderboard::LeaderboardEntry;
use crate::notifications::DEFAULT_EVENT_CHANNEL_CAPACITY;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_STATS_WINDOW_DAYS: u32 = 30;

/// Runtime knobs of the evaluation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Bound on waiting for a per-athlete or per-bucket lock.
    pub lock_timeout: Duration,
    pub history_retention: usize,
    /// Window used for the trend reported with each result.
    pub stats_window_days: u32,
    pub event_channel_capacity: usize,
    pub weights: WeightTables,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            history_retention: DEFAULT_HISTORY_RETENTION,
            stats_window_days: DEFAULT_STATS_WINDOW_DAYS,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            weights: WeightTables::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImprovementSummary {
    /// Change against the previous submission in the same bucket.
    pub since_last: f64,
    /// Mean of the last five submissions minus the five before, 0 until ten exist.
    pub recent_windows: f64,
    pub trend: Trend,
    pub history_count: usize,
}

/// Everything produced by one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub athlete_id: AthleteId,
    pub sport: String,
    pub level: String,
    pub score: PerformanceScore,
    pub performance_level: PerformanceLevel,
    pub verdict: CheatVerdict,
    pub entry: LeaderboardEntry,
    pub rank: u32,
    pub total_athletes: usize,
    pub improvement: ImprovementSummary,
    pub badges: Vec<Badge>,
    /// Unix timestamp in seconds.
    pub evaluated_at: i64,
}
