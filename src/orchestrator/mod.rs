mod models;
mod service;

pub use models::{
    EvaluationResult, ImprovementSummary, PipelineSettings, DEFAULT_LOCK_TIMEOUT,
    DEFAULT_STATS_WINDOW_DAYS,
};
pub use service::EvaluationOrchestrator;
