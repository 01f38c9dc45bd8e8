//! Ranking logic for a single (sport, level) bucket, independent of locking
//! and persistence.

use std::cmp::Ordering;

use super::models::{BucketKey, BucketStats, LeaderboardEntry, SubmissionMetadata};

/// Higher score first; on equal scores the entry updated earlier wins.
pub fn ranking_order(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.update_seq.cmp(&b.update_seq))
}

/// Sorts `entries` and assigns contiguous ranks starting at 1.
pub fn rank_entries(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(ranking_order);
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.rank = index as u32 + 1;
    }
}

#[derive(Debug, Clone)]
pub struct Bucket {
    pub key: BucketKey,
    entries: Vec<LeaderboardEntry>,
}

impl Bucket {
    pub fn new(key: BucketKey) -> Self {
        Self {
            key,
            entries: vec![],
        }
    }

    /// Builds a bucket from persisted rows, re-ranking them.
    pub fn from_entries(key: BucketKey, mut entries: Vec<LeaderboardEntry>) -> Self {
        rank_entries(&mut entries);
        Self { key, entries }
    }

    /// Ranked entries, best first.
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position_of(&self, athlete_id: &str) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|e| e.athlete_id == athlete_id)
    }

    /// Records a new score for the athlete, creating the entry on the first
    /// submission, then re-ranks the whole bucket.
    pub fn upsert(
        &mut self,
        athlete_id: &str,
        score: f64,
        metadata: SubmissionMetadata,
        update_seq: u64,
    ) -> LeaderboardEntry {
        let flagged = u32::from(metadata.cheat_detected);
        let mut updated = match self.entries.iter_mut().find(|e| e.athlete_id == athlete_id) {
            Some(entry) => {
                let submissions = entry.total_submissions + 1;
                entry.average_score = (entry.average_score * entry.total_submissions as f64
                    + score)
                    / submissions as f64;
                entry.previous_score = entry.score;
                entry.best_score = entry.best_score.max(score);
                entry.score = score;
                entry.improvement = score - entry.previous_score;
                entry.total_submissions = submissions;
                entry.flagged_submissions += flagged;
                entry.last_updated = metadata.timestamp;
                entry.update_seq = update_seq;
                entry.clone()
            }
            None => {
                let entry = LeaderboardEntry {
                    athlete_id: athlete_id.to_string(),
                    sport: self.key.sport.clone(),
                    level: self.key.level.clone(),
                    score,
                    best_score: score,
                    average_score: score,
                    previous_score: 0.0,
                    total_submissions: 1,
                    flagged_submissions: flagged,
                    rank: 0,
                    improvement: score,
                    last_updated: metadata.timestamp,
                    update_seq,
                };
                self.entries.push(entry.clone());
                entry
            }
        };
        rank_entries(&mut self.entries);
        let position = self
            .entries
            .iter()
            .take_while(|e| e.athlete_id != athlete_id)
            .count();
        updated.rank = position as u32 + 1;
        updated
    }

    pub fn stats(&self) -> BucketStats {
        if self.entries.is_empty() {
            return BucketStats::default();
        }
        let total: f64 = self.entries.iter().map(|e| e.score).sum();
        BucketStats {
            athletes: self.entries.len(),
            total_submissions: self
                .entries
                .iter()
                .map(|e| e.total_submissions as u64)
                .sum(),
            average_score: total / self.entries.len() as f64,
            top_score: self.entries[0].score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> Bucket {
        Bucket::new(BucketKey::new("tennis", "state").unwrap())
    }

    fn meta(timestamp: i64) -> SubmissionMetadata {
        SubmissionMetadata {
            cheat_detected: false,
            timestamp,
        }
    }

    fn assert_ranked(bucket: &Bucket) {
        for (index, entry) in bucket.entries().iter().enumerate() {
            assert_eq!(entry.rank as usize, index + 1);
            if index > 0 {
                assert!(bucket.entries()[index - 1].score >= entry.score);
            }
        }
    }

    #[test]
    fn first_submission_improves_from_zero() {
        let mut bucket = bucket();
        let entry = bucket.upsert("x", 92.0, meta(1), 1);
        assert_eq!(entry.rank, 1);
        assert_eq!(entry.improvement, 92.0);
        assert_eq!(entry.previous_score, 0.0);
        assert_eq!(entry.total_submissions, 1);
    }

    #[test]
    fn higher_score_takes_the_lead() {
        let mut bucket = bucket();
        bucket.upsert("x", 92.0, meta(1), 1);
        let y = bucket.upsert("y", 95.0, meta(2), 2);
        assert_eq!(y.rank, 1);
        let order: Vec<_> = bucket
            .entries()
            .iter()
            .map(|e| (e.athlete_id.as_str(), e.rank))
            .collect();
        assert_eq!(order, vec![("y", 1), ("x", 2)]);
    }

    #[test]
    fn ties_go_to_the_earlier_update() {
        let mut bucket = bucket();
        bucket.upsert("a", 80.0, meta(1), 1);
        bucket.upsert("b", 80.0, meta(2), 2);
        assert_eq!(bucket.position_of("a").unwrap().rank, 1);
        assert_eq!(bucket.position_of("b").unwrap().rank, 2);

        // Re-submitting the same score moves "a" behind "b".
        bucket.upsert("a", 80.0, meta(3), 3);
        assert_eq!(bucket.position_of("b").unwrap().rank, 1);
        assert_eq!(bucket.position_of("a").unwrap().rank, 2);
    }

    #[test]
    fn updates_rolling_fields() {
        let mut bucket = bucket();
        bucket.upsert("x", 60.0, meta(1), 1);
        bucket.upsert("x", 90.0, meta(2), 2);
        let flagged = SubmissionMetadata {
            cheat_detected: true,
            timestamp: 3,
        };
        let entry = bucket.upsert("x", 75.0, flagged, 3);

        assert_eq!(entry.total_submissions, 3);
        assert_eq!(entry.flagged_submissions, 1);
        assert_eq!(entry.best_score, 90.0);
        assert_eq!(entry.previous_score, 90.0);
        assert_eq!(entry.improvement, -15.0);
        assert!((entry.average_score - 75.0).abs() < 1e-9);
        assert_eq!(entry.last_updated, 3);
        assert_eq!(bucket.len(), 1);
    }

    #[test]
    fn ranks_stay_contiguous_after_many_upserts() {
        let mut bucket = bucket();
        let scores = [50.0, 70.0, 65.0, 70.0, 99.0, 10.0, 65.0, 88.0];
        for (seq, score) in scores.iter().enumerate() {
            let athlete = format!("athlete-{}", seq % 5);
            bucket.upsert(&athlete, *score, meta(seq as i64), seq as u64 + 1);
            assert_ranked(&bucket);
        }
        assert_eq!(bucket.len(), 5);
    }

    #[test]
    fn from_entries_reranks() {
        let mut source = bucket();
        source.upsert("x", 10.0, meta(1), 1);
        source.upsert("y", 20.0, meta(2), 2);
        let mut rows = source.entries().to_vec();
        rows.reverse();
        for row in rows.iter_mut() {
            row.rank = 0;
        }
        let restored = Bucket::from_entries(source.key.clone(), rows);
        assert_eq!(restored.entries(), source.entries());
    }

    #[test]
    fn stats_summarize_the_bucket() {
        let mut bucket = bucket();
        assert_eq!(bucket.stats(), BucketStats::default());
        bucket.upsert("x", 60.0, meta(1), 1);
        bucket.upsert("y", 80.0, meta(2), 2);
        bucket.upsert("y", 90.0, meta(3), 3);
        let stats = bucket.stats();
        assert_eq!(stats.athletes, 2);
        assert_eq!(stats.total_submissions, 3);
        assert_eq!(stats.top_score, 90.0);
        assert_eq!(stats.average_score, 75.0);
    }
}
