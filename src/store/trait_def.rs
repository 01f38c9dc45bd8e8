use anyhow::Result;

use crate::athlete::{Athlete, AthleteId};
use crate::evaluation::{Badge, EarnedBadge};
use crate::history::HistoryRecord;
use crate::leaderboard::{BucketKey, LeaderboardEntry};

pub trait AthleteStore: Send + Sync {
    /// Registers a new athlete and returns the generated id.
    /// Returns Err if the handle is invalid or already taken.
    fn create_athlete(&self, handle: &str) -> Result<AthleteId>;

    /// Returns Ok(None) if the athlete does not exist.
    fn get_athlete(&self, athlete_id: &str) -> Result<Option<Athlete>>;

    /// Returns Ok(None) if no athlete has this handle.
    fn get_athlete_by_handle(&self, handle: &str) -> Result<Option<Athlete>>;

    /// Returns all athletes ordered by handle.
    fn list_athletes(&self) -> Result<Vec<Athlete>>;
}

pub trait LeaderboardPersistence: Send + Sync {
    /// Returns every persisted leaderboard row across all buckets.
    fn load_leaderboard_entries(&self) -> Result<Vec<LeaderboardEntry>>;

    /// Writes the whole bucket in a single transaction.
    fn save_bucket(&self, key: &BucketKey, entries: &[LeaderboardEntry]) -> Result<()>;
}

pub trait HistoryStore: Send + Sync {
    /// Appends a record and deletes the athlete's records beyond the most
    /// recent `retention` ones, atomically. Returns the number of deleted records.
    fn append_history_record(&self, record: &HistoryRecord, retention: usize) -> Result<usize>;

    /// Returns the athlete's records, oldest first.
    fn get_history_records(&self, athlete_id: &str) -> Result<Vec<HistoryRecord>>;

    /// Returns every record, in insertion order.
    fn load_all_history_records(&self) -> Result<Vec<HistoryRecord>>;
}

pub trait BadgeStore: Send + Sync {
    /// Grants the badges to the athlete. A kind the athlete already holds is
    /// only ever upgraded from silver to gold, which also moves its
    /// `earned_at`; an equal or lower tier leaves it untouched.
    fn save_badges(&self, athlete_id: &str, badges: &[Badge], earned_at: i64) -> Result<()>;

    /// Returns the athlete's badges, oldest first.
    fn get_athlete_badges(&self, athlete_id: &str) -> Result<Vec<EarnedBadge>>;
}

/// Everything a single submission writes.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionWrite<'a> {
    pub key: &'a BucketKey,
    /// The whole re-ranked bucket.
    pub entries: &'a [LeaderboardEntry],
    pub record: &'a HistoryRecord,
    pub history_retention: usize,
    pub badges: &'a [Badge],
}

pub trait SubmissionStore: Send + Sync {
    /// Saves the bucket, appends and prunes the history record and grants
    /// the badges in one transaction: either all of it is written or none.
    /// Returns the number of pruned history records.
    fn commit_submission(&self, write: &SubmissionWrite<'_>) -> Result<usize>;
}

/// Everything the ranking pipeline needs from durable storage.
pub trait RankingStore:
    AthleteStore + LeaderboardPersistence + HistoryStore + BadgeStore + SubmissionStore
{
}

impl<T> RankingStore for T where
    T: AthleteStore + LeaderboardPersistence + HistoryStore + BadgeStore + SubmissionStore
{
}
