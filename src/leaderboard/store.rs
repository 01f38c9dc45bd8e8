//! Concurrency-safe, write-through leaderboard.
//!
//! Each (sport, level) bucket sits behind its own `RwLock`. An upsert holds
//! the bucket's write lock for the whole read-modify-write, including the
//! SQLite transaction that persists the re-ranked bucket, so readers only
//! ever observe a fully ranked bucket. Different buckets never contend.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::bucket::{rank_entries, Bucket};
use super::models::{BucketKey, BucketStats, GlobalStats, LeaderboardEntry, SubmissionMetadata};
use crate::error::{RankingError, RankingResult};
use crate::store::{AthleteStore, LeaderboardPersistence, RankingStore};

/// The athlete's entry right after an upsert, with the bucket size at that moment.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub entry: LeaderboardEntry,
    pub total_athletes: usize,
}

pub struct LeaderboardStore {
    persistence: Arc<dyn RankingStore>,
    buckets: RwLock<HashMap<BucketKey, Arc<RwLock<Bucket>>>>,
    next_update_seq: AtomicU64,
    lock_timeout: Duration,
}

impl LeaderboardStore {
    /// Loads every persisted bucket.
    pub fn load(persistence: Arc<dyn RankingStore>, lock_timeout: Duration) -> RankingResult<Self> {
        let rows = persistence.load_leaderboard_entries()?;
        let last_seq = rows.iter().map(|e| e.update_seq).max().unwrap_or(0);

        let mut grouped: HashMap<BucketKey, Vec<LeaderboardEntry>> = HashMap::new();
        for row in rows {
            grouped.entry(row.bucket_key()).or_default().push(row);
        }
        let buckets: HashMap<_, _> = grouped
            .into_iter()
            .map(|(key, entries)| {
                let bucket = Bucket::from_entries(key.clone(), entries);
                (key, Arc::new(RwLock::new(bucket)))
            })
            .collect();
        info!("Loaded {} leaderboard bucket(s)", buckets.len());

        Ok(Self {
            persistence,
            buckets: RwLock::new(buckets),
            next_update_seq: AtomicU64::new(last_seq + 1),
            lock_timeout,
        })
    }

    fn timeout_error(&self, resource: String) -> RankingError {
        warn!(
            "Timed out after {:?} waiting for {}",
            self.lock_timeout, resource
        );
        RankingError::ConcurrencyTimeout {
            resource,
            waited_ms: self.lock_timeout.as_millis() as u64,
        }
    }

    async fn read_bucket<'a>(
        &self,
        bucket: &'a RwLock<Bucket>,
        key: &BucketKey,
    ) -> RankingResult<RwLockReadGuard<'a, Bucket>> {
        timeout(self.lock_timeout, bucket.read())
            .await
            .map_err(|_| self.timeout_error(format!("leaderboard bucket {}", key)))
    }

    async fn write_bucket<'a>(
        &self,
        bucket: &'a RwLock<Bucket>,
        key: &BucketKey,
    ) -> RankingResult<RwLockWriteGuard<'a, Bucket>> {
        timeout(self.lock_timeout, bucket.write())
            .await
            .map_err(|_| self.timeout_error(format!("leaderboard bucket {}", key)))
    }

    async fn find_bucket(&self, key: &BucketKey) -> Option<Arc<RwLock<Bucket>>> {
        self.buckets.read().await.get(key).cloned()
    }

    async fn find_or_create_bucket(&self, key: &BucketKey) -> Arc<RwLock<Bucket>> {
        if let Some(bucket) = self.find_bucket(key).await {
            return bucket;
        }
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(key.clone())
            .or_insert_with(|| {
                debug!("Creating leaderboard bucket {}", key);
                Arc::new(RwLock::new(Bucket::new(key.clone())))
            })
            .clone()
    }

    /// All buckets ordered by key.
    async fn all_buckets(&self) -> Vec<(BucketKey, Arc<RwLock<Bucket>>)> {
        let buckets = self.buckets.read().await;
        let mut all: Vec<_> = buckets
            .iter()
            .map(|(key, bucket)| (key.clone(), bucket.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Records `score` for the athlete and re-ranks the bucket.
    ///
    /// Fails with `NotFound` for athletes missing from the registry and with
    /// `ConcurrencyTimeout` when the bucket stays locked past the timeout. On
    /// any failure the bucket is left exactly as it was.
    pub async fn upsert(
        &self,
        sport: &str,
        level: &str,
        athlete_id: &str,
        score: f64,
        metadata: SubmissionMetadata,
    ) -> RankingResult<UpsertOutcome> {
        let (outcome, ()) = self
            .upsert_with(sport, level, athlete_id, score, metadata, |key, entries, _| {
                Ok(self.persistence.save_bucket(key, entries)?)
            })
            .await?;
        Ok(outcome)
    }

    /// Like [`upsert`](Self::upsert), but the re-ranked bucket is handed to
    /// `persist` instead of being saved on its own, so the caller can write it
    /// together with other rows. `persist` runs under the bucket's write lock
    /// and receives the whole bucket and the athlete's new entry. The bucket
    /// is only replaced when `persist` succeeds.
    pub async fn upsert_with<T, F>(
        &self,
        sport: &str,
        level: &str,
        athlete_id: &str,
        score: f64,
        metadata: SubmissionMetadata,
        persist: F,
    ) -> RankingResult<(UpsertOutcome, T)>
    where
        F: FnOnce(&BucketKey, &[LeaderboardEntry], &LeaderboardEntry) -> RankingResult<T>,
    {
        let key = BucketKey::new(sport, level)?;
        if self.persistence.get_athlete(athlete_id)?.is_none() {
            return Err(RankingError::NotFound(format!("Athlete {}", athlete_id)));
        }

        let bucket = self.find_or_create_bucket(&key).await;
        let mut guard = self.write_bucket(&bucket, &key).await?;

        let mut updated = (*guard).clone();
        let update_seq = self.next_update_seq.fetch_add(1, Ordering::SeqCst);
        let entry = updated.upsert(athlete_id, score, metadata, update_seq);
        let persisted = persist(&key, updated.entries(), &entry)?;

        let total_athletes = updated.len();
        *guard = updated;
        debug!(
            "Bucket {} re-ranked: athlete {} now {} of {}",
            key, athlete_id, entry.rank, total_athletes
        );
        Ok((
            UpsertOutcome {
                entry,
                total_athletes,
            },
            persisted,
        ))
    }

    /// Ranked entries of the bucket, best first. Unknown buckets are empty.
    pub async fn get(
        &self,
        sport: &str,
        level: &str,
        limit: Option<usize>,
    ) -> RankingResult<Vec<LeaderboardEntry>> {
        let key = BucketKey::new(sport, level)?;
        let Some(bucket) = self.find_bucket(&key).await else {
            return Ok(vec![]);
        };
        let guard = self.read_bucket(&bucket, &key).await?;
        let entries = guard.entries();
        let take = limit.unwrap_or(entries.len()).min(entries.len());
        Ok(entries[..take].to_vec())
    }

    pub async fn position_of(
        &self,
        sport: &str,
        level: &str,
        athlete_id: &str,
    ) -> RankingResult<LeaderboardEntry> {
        let key = BucketKey::new(sport, level)?;
        let not_found =
            || RankingError::NotFound(format!("Athlete {} in leaderboard {}", athlete_id, key));
        let bucket = self.find_bucket(&key).await.ok_or_else(not_found)?;
        let guard = self.read_bucket(&bucket, &key).await?;
        guard.position_of(athlete_id).cloned().ok_or_else(not_found)
    }

    /// Every bucket merged and re-ranked by score. Buckets are not modified;
    /// ranks are only reassigned in the returned copies.
    pub async fn get_global(&self, limit: Option<usize>) -> RankingResult<Vec<LeaderboardEntry>> {
        let mut merged = self.snapshot().await?;
        rank_entries(&mut merged);
        if let Some(limit) = limit {
            merged.truncate(limit);
        }
        Ok(merged)
    }

    pub async fn bucket_stats(&self, sport: &str, level: &str) -> RankingResult<BucketStats> {
        let key = BucketKey::new(sport, level)?;
        let Some(bucket) = self.find_bucket(&key).await else {
            return Ok(BucketStats::default());
        };
        let guard = self.read_bucket(&bucket, &key).await?;
        Ok(guard.stats())
    }

    pub async fn global_stats(&self) -> RankingResult<GlobalStats> {
        let bucket_count = self.buckets.read().await.len();
        let entries = self.snapshot().await?;
        if entries.is_empty() {
            return Ok(GlobalStats {
                buckets: bucket_count,
                ..Default::default()
            });
        }
        let athletes: HashSet<&str> = entries.iter().map(|e| e.athlete_id.as_str()).collect();
        let total_score: f64 = entries.iter().map(|e| e.score).sum();
        Ok(GlobalStats {
            buckets: bucket_count,
            athletes: athletes.len(),
            total_submissions: entries.iter().map(|e| e.total_submissions as u64).sum(),
            average_score: total_score / entries.len() as f64,
        })
    }

    /// Copies of every entry, each bucket read under its own read lock.
    async fn snapshot(&self) -> RankingResult<Vec<LeaderboardEntry>> {
        let mut merged = vec![];
        for (key, bucket) in self.all_buckets().await {
            let guard = self.read_bucket(&bucket, &key).await?;
            merged.extend_from_slice(guard.entries());
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteRankingStore;
    use tempfile::TempDir;

    fn create_tmp_store() -> (Arc<SqliteRankingStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteRankingStore::new(temp_dir.path().join("test.db")).unwrap();
        (Arc::new(store), temp_dir)
    }

    fn leaderboard(store: &Arc<SqliteRankingStore>) -> LeaderboardStore {
        LeaderboardStore::load(store.clone(), Duration::from_millis(200)).unwrap()
    }

    fn meta(timestamp: i64) -> SubmissionMetadata {
        SubmissionMetadata {
            cheat_detected: false,
            timestamp,
        }
    }

    #[tokio::test]
    async fn first_and_second_submissions_rank_correctly() {
        let (store, _dir) = create_tmp_store();
        let x = store.create_athlete("x").unwrap();
        let y = store.create_athlete("y").unwrap();
        let board = leaderboard(&store);

        let outcome = board.upsert("Tennis", "State", &x, 92.0, meta(1)).await.unwrap();
        assert_eq!(outcome.entry.rank, 1);
        assert_eq!(outcome.entry.improvement, 92.0);
        assert_eq!(outcome.total_athletes, 1);

        let outcome = board.upsert("tennis", "state", &y, 95.0, meta(2)).await.unwrap();
        assert_eq!(outcome.entry.rank, 1);
        assert_eq!(outcome.total_athletes, 2);

        let entries = board.get("tennis", "state", None).await.unwrap();
        let order: Vec<_> = entries
            .iter()
            .map(|e| (e.athlete_id.clone(), e.score, e.rank))
            .collect();
        assert_eq!(order, vec![(y.clone(), 95.0, 1), (x.clone(), 92.0, 2)]);
        assert_eq!(board.position_of("tennis", "state", &x).await.unwrap().rank, 2);
    }

    #[tokio::test]
    async fn unknown_athlete_is_not_found_and_leaves_no_trace() {
        let (store, _dir) = create_tmp_store();
        let board = leaderboard(&store);

        let err = board
            .upsert("tennis", "state", "ghost", 50.0, meta(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RankingError::NotFound(_)));
        assert!(board.get("tennis", "state", None).await.unwrap().is_empty());
        assert!(store.load_leaderboard_entries().unwrap().is_empty());
    }

    #[tokio::test]
    async fn queries_on_unknown_buckets() {
        let (store, _dir) = create_tmp_store();
        let board = leaderboard(&store);

        assert!(board.get("golf", "club", Some(10)).await.unwrap().is_empty());
        assert!(matches!(
            board.position_of("golf", "club", "a").await,
            Err(RankingError::NotFound(_))
        ));
        assert!(matches!(
            board.get("", "club", None).await,
            Err(RankingError::NotFound(_))
        ));
        assert_eq!(
            board.bucket_stats("golf", "club").await.unwrap(),
            BucketStats::default()
        );
    }

    #[tokio::test]
    async fn get_is_idempotent_and_respects_limit() {
        let (store, _dir) = create_tmp_store();
        let board = leaderboard(&store);
        for (i, score) in [70.0, 85.0, 70.0, 40.0].iter().enumerate() {
            let id = store.create_athlete(&format!("a{}", i)).unwrap();
            board.upsert("tennis", "state", &id, *score, meta(i as i64)).await.unwrap();
        }

        let first = board.get("tennis", "state", None).await.unwrap();
        let second = board.get("tennis", "state", None).await.unwrap();
        assert_eq!(first, second);
        let ranks: Vec<u32> = first.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert_eq!(board.get("tennis", "state", Some(2)).await.unwrap(), first[..2]);
    }

    #[tokio::test]
    async fn global_view_merges_without_touching_buckets() {
        let (store, _dir) = create_tmp_store();
        let x = store.create_athlete("x").unwrap();
        let y = store.create_athlete("y").unwrap();
        let board = leaderboard(&store);
        board.upsert("tennis", "state", &x, 70.0, meta(1)).await.unwrap();
        board.upsert("football", "club", &y, 80.0, meta(2)).await.unwrap();
        board.upsert("football", "club", &x, 60.0, meta(3)).await.unwrap();

        let global = board.get_global(None).await.unwrap();
        let view: Vec<_> = global.iter().map(|e| (e.score, e.rank)).collect();
        assert_eq!(view, vec![(80.0, 1), (70.0, 2), (60.0, 3)]);

        // The tennis bucket still ranks x first.
        assert_eq!(board.position_of("tennis", "state", &x).await.unwrap().rank, 1);

        let stats = board.global_stats().await.unwrap();
        assert_eq!(stats.buckets, 2);
        assert_eq!(stats.athletes, 2);
        assert_eq!(stats.total_submissions, 3);
        assert!((stats.average_score - 70.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn reload_restores_ranks_and_sequence() {
        let (store, _dir) = create_tmp_store();
        let x = store.create_athlete("x").unwrap();
        let y = store.create_athlete("y").unwrap();
        {
            let board = leaderboard(&store);
            board.upsert("tennis", "state", &x, 80.0, meta(1)).await.unwrap();
            board.upsert("tennis", "state", &y, 80.0, meta(2)).await.unwrap();
        }

        let board = leaderboard(&store);
        assert_eq!(board.position_of("tennis", "state", &x).await.unwrap().rank, 1);
        // A later update with the same score must not jump ahead.
        let outcome = board.upsert("tennis", "state", &x, 80.0, meta(3)).await.unwrap();
        assert_eq!(outcome.entry.rank, 2);
    }

    #[tokio::test]
    async fn concurrent_upserts_keep_ranks_consistent() {
        let (store, _dir) = create_tmp_store();
        let ids: Vec<_> = (0..8)
            .map(|i| store.create_athlete(&format!("a{}", i)).unwrap())
            .collect();
        let board = Arc::new(leaderboard(&store));

        let mut handles = vec![];
        for (i, id) in ids.iter().enumerate() {
            for round in 0..3 {
                let board = board.clone();
                let id = id.clone();
                let score = ((i * 7 + round * 13) % 50) as f64 + 50.0;
                handles.push(tokio::spawn(async move {
                    board.upsert("tennis", "state", &id, score, meta(round as i64)).await
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let entries = board.get("tennis", "state", None).await.unwrap();
        assert_eq!(entries.len(), 8);
        for (index, entry) in entries.iter().enumerate() {
            assert_eq!(entry.rank as usize, index + 1);
            assert_eq!(entry.total_submissions, 3);
            if index > 0 {
                assert!(entries[index - 1].score >= entry.score);
            }
        }
        let persisted = store.load_leaderboard_entries().unwrap();
        let mut persisted_ranks: Vec<u32> = persisted.iter().map(|e| e.rank).collect();
        persisted_ranks.sort();
        assert_eq!(persisted_ranks, (1..=8).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn write_lock_timeout_is_retryable() {
        let (store, _dir) = create_tmp_store();
        let x = store.create_athlete("x").unwrap();
        let board = LeaderboardStore::load(store.clone(), Duration::from_millis(20)).unwrap();
        board.upsert("tennis", "state", &x, 50.0, meta(1)).await.unwrap();

        let key = BucketKey::new("tennis", "state").unwrap();
        let bucket = board.find_bucket(&key).await.unwrap();
        let _held = bucket.read().await;

        let err = board
            .upsert("tennis", "state", &x, 60.0, meta(2))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        // Readers are not blocked by other readers.
        assert_eq!(board.get("tennis", "state", None).await.unwrap()[0].score, 50.0);
    }
}
