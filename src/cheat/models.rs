use serde::Serialize;

use super::detector::CHEAT_DECISION_BOUNDARY;

/// Raw anomaly signals, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AnomalySignals {
    pub performance: f64,
    pub movement: f64,
    pub form: f64,
    pub speed: f64,
    pub technique: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheatVerdict {
    pub detected: bool,
    pub confidence: f64,
    pub cheating_score: f64,
    pub signals: AnomalySignals,
    /// One entry per triggered signal, in performance, movement, form, speed, technique order.
    pub patterns: Vec<String>,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
}

impl CheatVerdict {
    /// Strictly greater than the boundary; a score of exactly 0.7 is not detected.
    pub fn is_detected(cheating_score: f64) -> bool {
        cheating_score > CHEAT_DECISION_BOUNDARY
    }

    /// Verdict for input that could not be analysed.
    pub fn inconclusive() -> Self {
        Self {
            detected: false,
            confidence: 0.0,
            cheating_score: 0.0,
            signals: AnomalySignals::default(),
            patterns: vec![],
            risk_factors: vec![],
            recommendations: vec![],
        }
    }
}
