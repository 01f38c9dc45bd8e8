//! Heuristic detection of inauthentic submissions.
//!
//! Five anomaly signals are derived from the extracted features and the
//! computed score. A signal contributes its weight times its value to the
//! cheating score only when it is strictly above its own trigger threshold.

use tracing::debug;

use super::models::{AnomalySignals, CheatVerdict};
use crate::error::{RankingError, RankingResult};
use crate::evaluation::PerformanceScore;
use crate::features::{self, clamp01, mean, std_dev, ExtractedFeatures, FeatureVector};

pub const PERFORMANCE_ANOMALY_THRESHOLD: f64 = 0.8;
pub const MOVEMENT_ANOMALY_THRESHOLD: f64 = 0.6;
pub const FORM_INCONSISTENCY_THRESHOLD: f64 = 0.6;
pub const SPEED_ANOMALY_THRESHOLD: f64 = 0.5;
pub const TECHNIQUE_ANOMALY_THRESHOLD: f64 = 0.6;

pub const CHEAT_DECISION_BOUNDARY: f64 = 0.7;

/// Overall scores above this are increasingly unrealistic.
pub const REALISTIC_SCORE_CEILING: f64 = 85.0;
const PERFORMANCE_ANOMALY_SPAN: f64 = 15.0;
/// Coefficient of variation of frame-to-frame displacement mapped to a full signal.
const MOVEMENT_VARIATION_SCALE: f64 = 3.0;
/// Per-frame score deviation mapped to a full signal.
const FORM_DEVIATION_SCALE: f64 = 30.0;
/// Plausible declared frame rates.
pub const MIN_PLAUSIBLE_FRAME_RATE: f64 = 10.0;
pub const MAX_PLAUSIBLE_FRAME_RATE: f64 = 240.0;
/// Sport feature deviation mapped to a full signal.
const TECHNIQUE_DEVIATION_SCALE: f64 = 0.3;
/// Frames needed before the confidence of a verdict is no longer discounted.
pub const FULL_CONFIDENCE_FRAMES: f64 = 30.0;

const EPSILON: f64 = 1e-9;
/// The cheating score is rounded to this step before it meets the boundary,
/// so a sum of weights equal to the boundary is not pushed over it.
const CHEATING_SCORE_RESOLUTION: f64 = 1e9;

/// Contribution of each signal to the cheating score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalWeights {
    pub performance: f64,
    pub movement: f64,
    pub form: f64,
    pub speed: f64,
    pub technique: f64,
}

pub const DEFAULT_SIGNAL_WEIGHTS: SignalWeights = SignalWeights {
    performance: 0.30,
    movement: 0.20,
    form: 0.20,
    speed: 0.15,
    technique: 0.15,
};

impl SignalWeights {
    pub fn validate(&self) -> RankingResult<()> {
        let weights = [
            self.performance,
            self.movement,
            self.form,
            self.speed,
            self.technique,
        ];
        let total: f64 = weights.iter().sum();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0)
            || (total - 1.0).abs() > crate::evaluation::WEIGHT_SUM_TOLERANCE
        {
            return Err(RankingError::Configuration(format!(
                "Cheat signal weights must be non-negative and sum to 1.0, got {}",
                total
            )));
        }
        Ok(())
    }
}

impl Default for SignalWeights {
    fn default() -> Self {
        DEFAULT_SIGNAL_WEIGHTS
    }
}

struct SignalRule {
    threshold: f64,
    pattern: &'static str,
    risk_factor: &'static str,
    recommendation: &'static str,
}

const PERFORMANCE_RULE: SignalRule = SignalRule {
    threshold: PERFORMANCE_ANOMALY_THRESHOLD,
    pattern: "Unusually high performance score",
    risk_factor: "Score exceeds the realistic ceiling for the sport",
    recommendation: "Request a supervised re-recording of the attempt",
};
const MOVEMENT_RULE: SignalRule = SignalRule {
    threshold: MOVEMENT_ANOMALY_THRESHOLD,
    pattern: "Irregular frame-to-frame movement",
    risk_factor: "Displacement variance suggests spliced or edited footage",
    recommendation: "Verify the video is a single continuous take",
};
const FORM_RULE: SignalRule = SignalRule {
    threshold: FORM_INCONSISTENCY_THRESHOLD,
    pattern: "Inconsistent form across frames",
    risk_factor: "Per-frame form quality varies beyond natural bounds",
    recommendation: "Review the footage for substituted segments",
};
const SPEED_RULE: SignalRule = SignalRule {
    threshold: SPEED_ANOMALY_THRESHOLD,
    pattern: "Frame rate and duration mismatch",
    risk_factor: "Video timing metadata is inconsistent with its content",
    recommendation: "Check the recording for speed manipulation",
};
const TECHNIQUE_RULE: SignalRule = SignalRule {
    threshold: TECHNIQUE_ANOMALY_THRESHOLD,
    pattern: "Unstable sport-specific technique",
    risk_factor: "Technique measurements fluctuate beyond tolerance",
    recommendation: "Have a coach review the technique manually",
};

#[derive(Debug, Clone, Default)]
pub struct CheatDetector {
    weights: SignalWeights,
}

impl CheatDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: SignalWeights) -> Self {
        Self { weights }
    }

    /// Degraded input yields [`CheatVerdict::inconclusive`]. Fails only when
    /// the detector was built with invalid signal weights.
    pub fn detect(
        &self,
        vector: &FeatureVector,
        score: &PerformanceScore,
    ) -> RankingResult<CheatVerdict> {
        self.weights.validate()?;
        if score.reduced_confidence {
            return Ok(CheatVerdict::inconclusive());
        }
        let Some(extracted) = features::extract(vector, score.sport.feature_kinds()) else {
            return Ok(CheatVerdict::inconclusive());
        };

        let signals = compute_signals(vector, score, &extracted);
        let (cheating_score, triggered) = self.weigh_signals(&signals);
        let patterns = triggered.iter().map(|r| r.pattern.to_string()).collect();
        let risk_factors = triggered.iter().map(|r| r.risk_factor.to_string()).collect();
        let recommendations = triggered
            .iter()
            .map(|r| r.recommendation.to_string())
            .collect();

        let coverage = (extracted.frames_used as f64 / FULL_CONFIDENCE_FRAMES).min(1.0);
        let confidence = clamp01(extracted.pose.visibility * coverage);
        let detected = CheatVerdict::is_detected(cheating_score);
        debug!(
            "Cheat analysis: score {:.3}, {} signal(s) triggered, detected {}",
            cheating_score,
            triggered.len(),
            detected
        );

        Ok(CheatVerdict {
            detected,
            confidence,
            cheating_score,
            signals,
            patterns,
            risk_factors,
            recommendations,
        })
    }

    /// Sums the weighted values of the signals strictly above their
    /// thresholds. Triggered rules come back in a fixed order: performance,
    /// movement, form, speed, technique.
    fn weigh_signals(&self, signals: &AnomalySignals) -> (f64, Vec<&'static SignalRule>) {
        let w = &self.weights;
        let checks = [
            (signals.performance, w.performance, &PERFORMANCE_RULE),
            (signals.movement, w.movement, &MOVEMENT_RULE),
            (signals.form, w.form, &FORM_RULE),
            (signals.speed, w.speed, &SPEED_RULE),
            (signals.technique, w.technique, &TECHNIQUE_RULE),
        ];

        let mut sum = 0.0;
        let mut triggered = vec![];
        for (value, weight, rule) in checks {
            if value > rule.threshold {
                sum += weight * value;
                triggered.push(rule);
            }
        }
        let rounded = (sum * CHEATING_SCORE_RESOLUTION).round() / CHEATING_SCORE_RESOLUTION;
        (clamp01(rounded), triggered)
    }
}

fn compute_signals(
    vector: &FeatureVector,
    score: &PerformanceScore,
    extracted: &ExtractedFeatures,
) -> AnomalySignals {
    let performance =
        clamp01((score.overall - REALISTIC_SCORE_CEILING) / PERFORMANCE_ANOMALY_SPAN);

    let steps = &extracted.step_displacements;
    let movement = match mean(steps) {
        Some(avg) if avg > EPSILON => clamp01(std_dev(steps) / avg / MOVEMENT_VARIATION_SCALE),
        _ => 0.0,
    };

    let form = clamp01(std_dev(&extracted.temporal.frame_scores) / FORM_DEVIATION_SCALE);

    let technique_deviations: Vec<f64> = extracted.sport.iter().map(|f| f.std_dev).collect();
    let technique =
        clamp01(mean(&technique_deviations).unwrap_or(0.0) / TECHNIQUE_DEVIATION_SCALE);

    AnomalySignals {
        performance,
        movement,
        form,
        speed: speed_anomaly(vector),
        technique,
    }
}

fn speed_anomaly(vector: &FeatureVector) -> f64 {
    if vector.duration_seconds <= 0.0 || vector.frame_count == 0 {
        return 1.0;
    }
    let fps = vector.declared_frame_rate();
    let rate_deviation = if fps < MIN_PLAUSIBLE_FRAME_RATE {
        (MIN_PLAUSIBLE_FRAME_RATE - fps) / MIN_PLAUSIBLE_FRAME_RATE
    } else if fps > MAX_PLAUSIBLE_FRAME_RATE {
        (fps - MAX_PLAUSIBLE_FRAME_RATE) / MAX_PLAUSIBLE_FRAME_RATE
    } else {
        0.0
    };
    // More pose frames than the video has frames cannot come from this video.
    let pose_frames = vector.frames.len() as f64;
    let excess_frames = if pose_frames > vector.frame_count as f64 {
        (pose_frames - vector.frame_count as f64) / pose_frames
    } else {
        0.0
    };
    clamp01(rate_deviation.max(excess_frames))
}
