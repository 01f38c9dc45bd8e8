mod extraction;
mod models;

pub use extraction::{
    extract, ExtractedFeatures, MovementFeatures, PoseFeatures, SportFeature, SportFeatureKind,
    TemporalFeatures, FRAME_SCORE_WEIGHTS, MIN_GEOMETRY_VISIBILITY, NEUTRAL_FEATURE_VALUE,
};
pub use models::{landmark_index, FeatureVector, FrameMetrics, Landmark, PoseFrame};

pub(crate) use extraction::{clamp01, mean, std_dev};

#[cfg(test)]
pub(crate) use extraction::test_support;
