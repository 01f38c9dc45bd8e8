mod models;
mod tracker;

pub use models::{HistoryRecord, HistoryStats, Trend};
pub use tracker::{
    classify_trend, HistoryTracker, DEFAULT_HISTORY_RETENTION, IMPROVEMENT_WINDOW, TREND_THRESHOLD,
};
