use std::fmt;

use serde::Serialize;

use crate::athlete::AthleteId;
use crate::error::{RankingError, RankingResult};

/// Identifies one (sport, level) bucket. Both parts are trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BucketKey {
    pub sport: String,
    pub level: String,
}

impl BucketKey {
    pub fn new(sport: &str, level: &str) -> RankingResult<Self> {
        let sport = sport.trim().to_lowercase();
        let level = level.trim().to_lowercase();
        if sport.is_empty() || level.is_empty() {
            return Err(RankingError::NotFound(format!(
                "Leaderboard bucket '{}/{}'",
                sport, level
            )));
        }
        Ok(Self { sport, level })
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sport, self.level)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub athlete_id: AthleteId,
    pub sport: String,
    pub level: String,
    /// Score of the latest submission.
    pub score: f64,
    pub best_score: f64,
    pub average_score: f64,
    /// Score before the latest submission, 0 on the first one.
    pub previous_score: f64,
    pub total_submissions: u32,
    pub flagged_submissions: u32,
    /// 1-based, contiguous within the bucket.
    pub rank: u32,
    /// `score - previous_score`.
    pub improvement: f64,
    /// Unix timestamp in seconds.
    pub last_updated: i64,
    /// Store-wide monotonic sequence of the last update, used to break score ties.
    pub update_seq: u64,
}

impl LeaderboardEntry {
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey {
            sport: self.sport.clone(),
            level: self.level.clone(),
        }
    }
}

/// Extra facts about a submission carried into the leaderboard.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubmissionMetadata {
    pub cheat_detected: bool,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketStats {
    pub athletes: usize,
    pub total_submissions: u64,
    pub average_score: f64,
    pub top_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalStats {
    pub buckets: usize,
    /// Distinct athletes across all buckets.
    pub athletes: usize,
    pub total_submissions: u64,
    pub average_score: f64,
}
