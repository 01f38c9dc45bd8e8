use serde::Serialize;

use crate::athlete::AthleteId;
use crate::evaluation::ComponentScores;

/// One evaluated submission in an athlete's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub athlete_id: AthleteId,
    pub sport: String,
    pub level: String,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    pub score: f64,
    pub components: ComponentScores,
    pub cheat_detected: bool,
    pub duration_seconds: f64,
    pub frame_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub count: usize,
    pub average_score: f64,
    pub best_score: f64,
    pub trend: Trend,
}

impl HistoryStats {
    pub fn empty() -> Self {
        Self {
            count: 0,
            average_score: 0.0,
            best_score: 0.0,
            trend: Trend::Stable,
        }
    }
}
