use tracing::debug;

use super::models::{ComponentScores, PerformanceScore, MAX_SCORE};
use super::sport::{Sport, WeightTables};
use crate::error::RankingResult;
use crate::features::{self, clamp01, std_dev, ExtractedFeatures, FeatureVector};

// Component blends. Each tuple sums to 1.0 so a component stays in [0, 100].

/// Form: visibility, symmetry, alignment.
pub const FORM_COEFFICIENTS: (f64, f64, f64) = features::FRAME_SCORE_WEIGHTS;
/// Technique: sport feature mean, movement smoothness.
pub const TECHNIQUE_COEFFICIENTS: (f64, f64) = (0.7, 0.3);
/// Movement: smoothness, consistency, intensity.
pub const MOVEMENT_COEFFICIENTS: (f64, f64, f64) = (0.5, 0.3, 0.2);
/// Balance: stability, symmetry.
pub const BALANCE_COEFFICIENTS: (f64, f64) = (0.6, 0.4);
/// Posture: alignment, stability.
pub const POSTURE_COEFFICIENTS: (f64, f64) = (0.7, 0.3);
/// Consistency: reported movement consistency, steadiness of per-frame scores.
pub const CONSISTENCY_COEFFICIENTS: (f64, f64) = (0.5, 0.5);
/// Timing: frame rate adequacy, intra-video trend.
pub const TIMING_COEFFICIENTS: (f64, f64) = (0.6, 0.4);

/// Per-frame score deviation that counts as completely unsteady.
pub const FRAME_SCORE_DEVIATION_SCALE: f64 = 25.0;
/// Frame rate considered fully adequate for timing analysis.
pub const REFERENCE_FRAME_RATE: f64 = 30.0;

/// Turns a feature vector into component and overall scores.
///
/// Evaluation is a pure function of the vector, the sport and the weight
/// tables the evaluator was built with.
#[derive(Debug, Clone, Default)]
pub struct PerformanceEvaluator {
    weights: WeightTables,
}

impl PerformanceEvaluator {
    pub fn new(weights: WeightTables) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &WeightTables {
        &self.weights
    }

    /// Empty or malformed input degrades to [`PerformanceScore::degraded`].
    /// Fails only when the weight table selected for `sport` is invalid.
    pub fn evaluate(&self, vector: &FeatureVector, sport: &str) -> RankingResult<PerformanceScore> {
        let sport = Sport::from_name(sport);
        let table = self.weights.lookup(sport);
        table.validate(sport.as_str())?;

        let Some(extracted) = features::extract(vector, sport.feature_kinds()) else {
            debug!("Feature vector for {} is empty or malformed, degrading", sport);
            return Ok(PerformanceScore::degraded(sport));
        };

        let components = component_scores(&extracted);
        let overall = table.combine(&components).clamp(0.0, MAX_SCORE);
        debug!(
            "Evaluated {} submission over {} frames: overall {:.2}",
            sport, extracted.frames_used, overall
        );
        Ok(PerformanceScore {
            sport,
            components,
            overall,
            reduced_confidence: false,
        })
    }
}

fn component_scores(f: &ExtractedFeatures) -> ComponentScores {
    let pose = &f.pose;
    let movement = &f.movement;

    let (fv, fs, fa) = FORM_COEFFICIENTS;
    let form = fv * pose.visibility + fs * pose.symmetry + fa * pose.alignment;

    let (ts, tm) = TECHNIQUE_COEFFICIENTS;
    let technique = ts * f.sport_feature_mean() + tm * movement.smoothness;

    let (ms, mc, mi) = MOVEMENT_COEFFICIENTS;
    let movement_score =
        ms * movement.smoothness + mc * movement.consistency + mi * movement.intensity;

    let (bs, by) = BALANCE_COEFFICIENTS;
    let balance = bs * pose.stability + by * pose.symmetry;

    let (pa, ps) = POSTURE_COEFFICIENTS;
    let posture = pa * pose.alignment + ps * pose.stability;

    let (cm, cf) = CONSISTENCY_COEFFICIENTS;
    let steadiness =
        1.0 - clamp01(std_dev(&f.temporal.frame_scores) / FRAME_SCORE_DEVIATION_SCALE);
    let consistency = cm * movement.consistency + cf * steadiness;

    let (tf, tt) = TIMING_COEFFICIENTS;
    let timing = tf * clamp01(f.temporal.frame_rate / REFERENCE_FRAME_RATE)
        + tt * (0.5 + f.temporal.trend / 2.0);

    ComponentScores {
        form: form * MAX_SCORE,
        technique: technique * MAX_SCORE,
        movement: movement_score * MAX_SCORE,
        balance: balance * MAX_SCORE,
        posture: posture * MAX_SCORE,
        consistency: consistency * MAX_SCORE,
        timing: timing * MAX_SCORE,
    }
    .clamped()
}
