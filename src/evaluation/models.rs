use serde::{Deserialize, Serialize};

use super::sport::Sport;

pub const MAX_SCORE: f64 = 100.0;

pub(crate) fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_SCORE)
    }
}

/// The seven component scores, each in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub form: f64,
    pub technique: f64,
    pub movement: f64,
    pub balance: f64,
    pub posture: f64,
    pub consistency: f64,
    /// Reported alongside the others but not part of the overall score.
    pub timing: f64,
}

impl ComponentScores {
    pub fn clamped(self) -> Self {
        Self {
            form: clamp_score(self.form),
            technique: clamp_score(self.technique),
            movement: clamp_score(self.movement),
            balance: clamp_score(self.balance),
            posture: clamp_score(self.posture),
            consistency: clamp_score(self.consistency),
            timing: clamp_score(self.timing),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceScore {
    pub sport: Sport,
    #[serde(flatten)]
    pub components: ComponentScores,
    pub overall: f64,
    /// Set when the input could not be evaluated and every score is zero.
    pub reduced_confidence: bool,
}

impl PerformanceScore {
    /// The all-zero result used for empty or malformed input.
    pub fn degraded(sport: Sport) -> Self {
        Self {
            sport,
            components: ComponentScores::default(),
            overall: 0.0,
            reduced_confidence: true,
        }
    }

    pub fn level(&self) -> PerformanceLevel {
        PerformanceLevel::from_score(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Moderate,
    NeedsImprovement,
    NoData,
}

impl PerformanceLevel {
    pub const EXCELLENT_THRESHOLD: f64 = 80.0;
    pub const GOOD_THRESHOLD: f64 = 60.0;
    pub const MODERATE_THRESHOLD: f64 = 40.0;

    pub fn from_score(score: &PerformanceScore) -> Self {
        if score.reduced_confidence {
            return PerformanceLevel::NoData;
        }
        Self::from_overall(score.overall)
    }

    pub fn from_overall(overall: f64) -> Self {
        if overall >= Self::EXCELLENT_THRESHOLD {
            PerformanceLevel::Excellent
        } else if overall >= Self::GOOD_THRESHOLD {
            PerformanceLevel::Good
        } else if overall >= Self::MODERATE_THRESHOLD {
            PerformanceLevel::Moderate
        } else {
            PerformanceLevel::NeedsImprovement
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeKind {
    ConsistencyStar,
    FastLearner,
    PerfectForm,
    Dedicated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTier {
    Silver,
    Gold,
}

impl BadgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeKind::ConsistencyStar => "consistency_star",
            BadgeKind::FastLearner => "fast_learner",
            BadgeKind::PerfectForm => "perfect_form",
            BadgeKind::Dedicated => "dedicated",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "consistency_star" => Some(BadgeKind::ConsistencyStar),
            "fast_learner" => Some(BadgeKind::FastLearner),
            "perfect_form" => Some(BadgeKind::PerfectForm),
            "dedicated" => Some(BadgeKind::Dedicated),
            _ => None,
        }
    }
}

impl BadgeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeTier::Silver => "silver",
            BadgeTier::Gold => "gold",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "silver" => Some(BadgeTier::Silver),
            "gold" => Some(BadgeTier::Gold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub kind: BadgeKind,
    pub tier: BadgeTier,
}

/// A badge held by an athlete. Each kind is held at most once, at the best
/// tier reached so far; `earned_at` is when that tier was first reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub kind: BadgeKind,
    pub tier: BadgeTier,
    pub earned_at: i64,
}
