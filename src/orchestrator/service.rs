//! Entry point of the evaluation pipeline.
//!
//! A submission runs Evaluate, Detect, Upsert and Append in that order while
//! holding its athlete's lock. The lock is a fair mutex, so submissions of
//! one athlete are applied in dispatch order while different athletes run
//! concurrently. The leaderboard entry, the history record and the earned
//! badges of a submission are committed in a single transaction.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::models::{EvaluationResult, ImprovementSummary, PipelineSettings};
use crate::athlete::AthleteId;
use crate::cheat::{CheatDetector, CheatVerdict};
use crate::error::{RankingError, RankingResult};
use crate::evaluation::{award_badges, PerformanceEvaluator, PerformanceScore, Sport};
use crate::features::FeatureVector;
use crate::history::{HistoryRecord, HistoryTracker};
use crate::leaderboard::{LeaderboardStore, SubmissionMetadata};
use crate::notifications::{EvaluationNotification, EventBus, PipelineEvent, PipelineStage};
use crate::store::{RankingStore, SubmissionStore, SubmissionWrite};

/// One fair mutex per athlete with a submission running or queued.
#[derive(Default)]
struct AthleteLocks(std::sync::Mutex<HashMap<AthleteId, Arc<Mutex<()>>>>);

impl AthleteLocks {
    fn get_or_insert(&self, athlete_id: &str) -> Arc<Mutex<()>> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(athlete_id.to_string())
            .or_default()
            .clone()
    }

    /// Drops the athlete's mutex once nobody holds or waits on it.
    fn forget_if_idle(&self, athlete_id: &str) {
        let mut locks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(athlete_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(athlete_id);
        }
    }

    fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Exclusive access to one athlete, released on drop.
pub(crate) struct AthleteGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    athlete_id: &'a str,
    locks: &'a AthleteLocks,
}

impl Drop for AthleteGuard<'_> {
    fn drop(&mut self) {
        // The guard shares the mutex's Arc, so release it before counting.
        self.guard.take();
        self.locks.forget_if_idle(self.athlete_id);
    }
}

pub struct EvaluationOrchestrator {
    evaluator: PerformanceEvaluator,
    detector: CheatDetector,
    store: Arc<dyn RankingStore>,
    leaderboard: Arc<LeaderboardStore>,
    history: Arc<HistoryTracker>,
    events: EventBus,
    athlete_locks: AthleteLocks,
    lock_timeout: Duration,
    stats_window_days: u32,
}

impl EvaluationOrchestrator {
    /// Validates the weight tables and loads leaderboard and history state
    /// from `store`.
    pub fn open(store: Arc<dyn RankingStore>, settings: PipelineSettings) -> RankingResult<Self> {
        settings.weights.validate()?;
        let leaderboard = LeaderboardStore::load(store.clone(), settings.lock_timeout)?;
        let history = HistoryTracker::load(store.clone(), settings.history_retention)?;
        Ok(Self {
            evaluator: PerformanceEvaluator::new(settings.weights),
            detector: CheatDetector::new(),
            store,
            leaderboard: Arc::new(leaderboard),
            history: Arc::new(history),
            events: EventBus::new(settings.event_channel_capacity),
            athlete_locks: AthleteLocks::default(),
            lock_timeout: settings.lock_timeout,
            stats_window_days: settings.stats_window_days,
        })
    }

    /// Replaces the detector, mainly to exercise the fallback verdict.
    pub fn with_detector(mut self, detector: CheatDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_evaluator(mut self, evaluator: PerformanceEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn leaderboard(&self) -> &Arc<LeaderboardStore> {
        &self.leaderboard
    }

    pub fn history(&self) -> &Arc<HistoryTracker> {
        &self.history
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) async fn lock_athlete<'a>(
        &'a self,
        athlete_id: &'a str,
    ) -> RankingResult<AthleteGuard<'a>> {
        let lock = self.athlete_locks.get_or_insert(athlete_id);
        match timeout(self.lock_timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(AthleteGuard {
                guard: Some(guard),
                athlete_id,
                locks: &self.athlete_locks,
            }),
            Err(_) => {
                self.athlete_locks.forget_if_idle(athlete_id);
                warn!(
                    "Timed out after {:?} waiting for athlete {}",
                    self.lock_timeout, athlete_id
                );
                Err(RankingError::ConcurrencyTimeout {
                    resource: format!("athlete {}", athlete_id),
                    waited_ms: self.lock_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Athletes with a submission running or queued.
    pub(crate) fn locked_athletes(&self) -> usize {
        self.athlete_locks.len()
    }

    fn stage_completed(&self, athlete_id: &str, stage: PipelineStage) {
        self.events.publish(PipelineEvent::StageCompleted {
            athlete_id: athlete_id.to_string(),
            stage,
        });
    }

    /// Runs the whole pipeline for one submission.
    ///
    /// Returns either a complete result or a typed error. An evaluator or
    /// detector failure is replaced by a fallback and never aborts the
    /// submission. When the leaderboard update or its commit fails, neither
    /// the leaderboard, the history nor the athlete's badges change.
    pub async fn submit(
        &self,
        athlete_id: &str,
        sport: &str,
        level: &str,
        vector: FeatureVector,
    ) -> RankingResult<EvaluationResult> {
        info!(
            "Submission accepted for athlete {} in {}/{}",
            athlete_id, sport, level
        );
        let _athlete_guard = self.lock_athlete(athlete_id).await?;

        let score = self
            .evaluator
            .evaluate(&vector, sport)
            .unwrap_or_else(|err| {
                warn!(
                    "Evaluation failed for athlete {}, using zero score: {}",
                    athlete_id, err
                );
                PerformanceScore::degraded(Sport::from_name(sport))
            });
        self.stage_completed(athlete_id, PipelineStage::Evaluation);

        let verdict = self
            .detector
            .detect(&vector, &score)
            .unwrap_or_else(|err| {
                warn!(
                    "Cheat detection failed for athlete {}, using inconclusive verdict: {}",
                    athlete_id, err
                );
                CheatVerdict::inconclusive()
            });
        self.stage_completed(athlete_id, PipelineStage::CheatDetection);

        let evaluated_at = chrono::Utc::now().timestamp();
        let metadata = SubmissionMetadata {
            cheat_detected: verdict.detected,
            timestamp: evaluated_at,
        };
        let retention = self.history.retention();
        let (outcome, (record, badges, pruned)) = self
            .leaderboard
            .upsert_with(
                sport,
                level,
                athlete_id,
                score.overall,
                metadata,
                |key, entries, entry| {
                    let record = HistoryRecord {
                        athlete_id: athlete_id.to_string(),
                        sport: key.sport.clone(),
                        level: key.level.clone(),
                        timestamp: evaluated_at,
                        score: score.overall,
                        components: score.components,
                        cheat_detected: verdict.detected,
                        duration_seconds: vector.duration_seconds,
                        frame_count: vector.frame_count,
                    };
                    let badges = award_badges(&score, entry.total_submissions, verdict.detected);
                    let pruned = self.store.commit_submission(&SubmissionWrite {
                        key,
                        entries,
                        record: &record,
                        history_retention: retention,
                        badges: &badges,
                    })?;
                    Ok((record, badges, pruned))
                },
            )
            .await?;
        self.stage_completed(athlete_id, PipelineStage::LeaderboardUpdate);

        self.history.record_committed(record, pruned).await;
        self.stage_completed(athlete_id, PipelineStage::HistoryAppend);
        if !badges.is_empty() {
            debug!("Athlete {} earned {:?}", athlete_id, badges);
        }

        let entry = outcome.entry;
        let stats = self.history.stats(athlete_id, self.stats_window_days).await;
        let improvement = ImprovementSummary {
            since_last: entry.improvement,
            recent_windows: self.history.improvement(athlete_id).await,
            trend: stats.trend,
            history_count: self.history.len(athlete_id).await,
        };
        self.events
            .publish(PipelineEvent::Evaluated(EvaluationNotification {
                athlete_id: athlete_id.to_string(),
                overall_score: score.overall,
                rank: entry.rank,
                improvement: entry.improvement,
                cheat_detected: verdict.detected,
            }));
        info!(
            "Athlete {} scored {:.2} in {}/{}: rank {} of {}{}",
            athlete_id,
            score.overall,
            entry.sport,
            entry.level,
            entry.rank,
            outcome.total_athletes,
            if verdict.detected { ", flagged" } else { "" }
        );

        Ok(EvaluationResult {
            athlete_id: athlete_id.to_string(),
            sport: entry.sport.clone(),
            level: entry.level.clone(),
            performance_level: score.level(),
            rank: entry.rank,
            total_athletes: outcome.total_athletes,
            score,
            verdict,
            entry,
            improvement,
            badges,
            evaluated_at,
        })
    }
}
