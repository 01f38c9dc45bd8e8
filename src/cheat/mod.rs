mod detector;
mod models;

pub use detector::{
    CheatDetector, SignalWeights, CHEAT_DECISION_BOUNDARY, DEFAULT_SIGNAL_WEIGHTS,
    FORM_INCONSISTENCY_THRESHOLD, MOVEMENT_ANOMALY_THRESHOLD, PERFORMANCE_ANOMALY_THRESHOLD,
    SPEED_ANOMALY_THRESHOLD, TECHNIQUE_ANOMALY_THRESHOLD,
};
pub use models::{AnomalySignals, CheatVerdict};
