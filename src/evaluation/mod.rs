mod badges;
mod evaluator;
mod models;
mod sport;

pub use badges::award_badges;
pub use evaluator::PerformanceEvaluator;
pub use models::{
    Badge, BadgeKind, BadgeTier, ComponentScores, EarnedBadge, PerformanceLevel, PerformanceScore,
    MAX_SCORE,
};
pub use sport::{Sport, WeightTable, WeightTables, WEIGHT_SUM_TOLERANCE};
