//! Bounded per-athlete history with derived statistics.
//!
//! Records are written through to storage and mirrored in an in-memory ring
//! per athlete that never holds more than `retention` records.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::models::{HistoryRecord, HistoryStats, Trend};
use crate::athlete::AthleteId;
use crate::error::{RankingError, RankingResult};
use crate::features::mean;
use crate::store::{HistoryStore, RankingStore};

pub const DEFAULT_HISTORY_RETENTION: usize = 50;
/// Records in each of the two windows compared by [`HistoryTracker::improvement`].
pub const IMPROVEMENT_WINDOW: usize = 5;
/// Difference between half means needed to call a trend.
pub const TREND_THRESHOLD: f64 = 5.0;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

pub struct HistoryTracker {
    persistence: Arc<dyn RankingStore>,
    rings: Mutex<HashMap<AthleteId, VecDeque<HistoryRecord>>>,
    retention: usize,
}

impl HistoryTracker {
    pub fn load(persistence: Arc<dyn RankingStore>, retention: usize) -> RankingResult<Self> {
        if retention == 0 {
            return Err(RankingError::Configuration(
                "History retention must be at least 1".to_string(),
            ));
        }
        let mut rings: HashMap<AthleteId, VecDeque<HistoryRecord>> = HashMap::new();
        for record in persistence.load_all_history_records()? {
            let ring = rings.entry(record.athlete_id.clone()).or_default();
            ring.push_back(record);
            if ring.len() > retention {
                ring.pop_front();
            }
        }
        info!(
            "Loaded {} history record(s) for {} athlete(s)",
            count_records(&rings),
            rings.len()
        );
        Ok(Self {
            persistence,
            rings: Mutex::new(rings),
            retention,
        })
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Persists the record and adds it to the athlete's ring, evicting the
    /// oldest records beyond the retention.
    pub async fn append(&self, athlete_id: &str, record: HistoryRecord) -> RankingResult<()> {
        if record.athlete_id != athlete_id {
            return Err(RankingError::Validation(format!(
                "History record of {} appended for {}",
                record.athlete_id, athlete_id
            )));
        }
        let mut rings = self.rings.lock().await;
        let pruned = self
            .persistence
            .append_history_record(&record, self.retention)?;
        self.push(&mut rings, record, pruned);
        Ok(())
    }

    /// Adds a record that storage already holds, e.g. one written together
    /// with its leaderboard entry, to the athlete's ring.
    pub(crate) async fn record_committed(&self, record: HistoryRecord, pruned: usize) {
        let mut rings = self.rings.lock().await;
        self.push(&mut rings, record, pruned);
    }

    fn push(
        &self,
        rings: &mut HashMap<AthleteId, VecDeque<HistoryRecord>>,
        record: HistoryRecord,
        pruned: usize,
    ) {
        let athlete_id = record.athlete_id.clone();
        let ring = rings.entry(athlete_id.clone()).or_default();
        ring.push_back(record);
        let mut evicted = 0;
        while ring.len() > self.retention {
            ring.pop_front();
            evicted += 1;
        }
        if evicted > 0 || pruned > 0 {
            debug!(
                "History of {} evicted {} record(s), pruned {} row(s)",
                athlete_id, evicted, pruned
            );
        }
    }

    /// Retained records, oldest first.
    pub async fn records(&self, athlete_id: &str) -> Vec<HistoryRecord> {
        self.rings
            .lock()
            .await
            .get(athlete_id)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Records retained across all athletes.
    pub async fn total_records(&self) -> usize {
        count_records(&*self.rings.lock().await)
    }

    pub async fn len(&self, athlete_id: &str) -> usize {
        self.rings
            .lock()
            .await
            .get(athlete_id)
            .map_or(0, VecDeque::len)
    }

    /// Statistics over the records of the last `window_days` days.
    pub async fn stats(&self, athlete_id: &str, window_days: u32) -> HistoryStats {
        self.stats_at(athlete_id, window_days, chrono::Utc::now().timestamp())
            .await
    }

    pub async fn stats_at(&self, athlete_id: &str, window_days: u32, now: i64) -> HistoryStats {
        let since = now - window_days as i64 * SECONDS_PER_DAY;
        let scores: Vec<f64> = self
            .records(athlete_id)
            .await
            .iter()
            .filter(|r| r.timestamp >= since)
            .map(|r| r.score)
            .collect();
        window_stats(&scores)
    }

    /// Mean of the last five scores minus the mean of the five before them.
    /// Zero until both windows are full.
    pub async fn improvement(&self, athlete_id: &str) -> f64 {
        let rings = self.rings.lock().await;
        let Some(ring) = rings.get(athlete_id) else {
            return 0.0;
        };
        if ring.len() < 2 * IMPROVEMENT_WINDOW {
            return 0.0;
        }
        let scores: Vec<f64> = ring
            .iter()
            .rev()
            .take(2 * IMPROVEMENT_WINDOW)
            .map(|r| r.score)
            .collect();
        let (recent, preceding) = scores.split_at(IMPROVEMENT_WINDOW);
        match (mean(recent), mean(preceding)) {
            (Some(recent), Some(preceding)) => recent - preceding,
            _ => 0.0,
        }
    }
}

fn window_stats(scores: &[f64]) -> HistoryStats {
    let Some(average_score) = mean(scores) else {
        return HistoryStats::empty();
    };
    HistoryStats {
        count: scores.len(),
        average_score,
        best_score: scores.iter().copied().fold(f64::MIN, f64::max),
        trend: classify_trend(scores),
    }
}

/// Compares the mean of the second half of `scores` against the first half.
pub fn classify_trend(scores: &[f64]) -> Trend {
    if scores.len() < 2 {
        return Trend::Stable;
    }
    let (first, second) = scores.split_at(scores.len() / 2);
    let (Some(first), Some(second)) = (mean(first), mean(second)) else {
        return Trend::Stable;
    };
    if second - first > TREND_THRESHOLD {
        Trend::Improving
    } else if first - second > TREND_THRESHOLD {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

fn count_records(rings: &HashMap<AthleteId, VecDeque<HistoryRecord>>) -> usize {
    rings.values().map(VecDeque::len).sum()
}
