//! Achievement badges awarded per submission.

use super::models::{Badge, BadgeKind, BadgeTier, PerformanceScore};

pub const CONSISTENCY_STAR_THRESHOLDS: (f64, f64) = (80.0, 90.0);
pub const FAST_LEARNER_THRESHOLDS: (f64, f64) = (70.0, 85.0);
pub const PERFECT_FORM_THRESHOLDS: (f64, f64) = (75.0, 90.0);
pub const DEDICATED_THRESHOLDS: (u32, u32) = (10, 20);

fn tier_for<T: PartialOrd>(value: T, (silver, gold): (T, T)) -> Option<BadgeTier> {
    if value >= gold {
        Some(BadgeTier::Gold)
    } else if value >= silver {
        Some(BadgeTier::Silver)
    } else {
        None
    }
}

/// Badges earned by a submission. Flagged or unevaluable submissions earn none.
pub fn award_badges(
    score: &PerformanceScore,
    total_submissions: u32,
    cheat_detected: bool,
) -> Vec<Badge> {
    if cheat_detected || score.reduced_confidence {
        return vec![];
    }
    let candidates = [
        (
            BadgeKind::ConsistencyStar,
            tier_for(score.components.consistency, CONSISTENCY_STAR_THRESHOLDS),
        ),
        (
            BadgeKind::FastLearner,
            tier_for(score.overall, FAST_LEARNER_THRESHOLDS),
        ),
        (
            BadgeKind::PerfectForm,
            tier_for(score.components.form, PERFECT_FORM_THRESHOLDS),
        ),
        (
            BadgeKind::Dedicated,
            tier_for(total_submissions, DEDICATED_THRESHOLDS),
        ),
    ];
    candidates
        .into_iter()
        .filter_map(|(kind, tier)| tier.map(|tier| Badge { kind, tier }))
        .collect()
}
