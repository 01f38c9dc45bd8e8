//! Event payloads emitted by the evaluation pipeline.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Evaluation,
    CheatDetection,
    LeaderboardUpdate,
    HistoryAppend,
}

/// Payload handed to the notification collaborator once per submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationNotification {
    pub athlete_id: String,
    pub overall_score: f64,
    pub rank: u32,
    pub improvement: f64,
    pub cheat_detected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageCompleted {
        athlete_id: String,
        stage: PipelineStage,
    },
    Evaluated(EvaluationNotification),
}
