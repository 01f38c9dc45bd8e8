//! Deterministic feature extraction from a [`FeatureVector`].
//!
//! Every value produced here is a pure function of the input: frames are
//! visited in order and all aggregates are plain means and deviations, so two
//! calls on the same vector yield bit-identical results.

use serde::Serialize;

use super::models::{landmark_index::*, FeatureVector, Landmark, PoseFrame};

/// Landmarks less visible than this are ignored for geometric features.
pub const MIN_GEOMETRY_VISIBILITY: f64 = 0.2;

/// Used for a pose feature when no frame provides the landmarks it needs.
pub const NEUTRAL_FEATURE_VALUE: f64 = 0.5;

/// Mean left/right height difference (normalized coordinates) mapped to zero symmetry.
const SYMMETRY_SCALE: f64 = 5.0;
/// Mean frame-to-frame displacement of the body center mapped to zero stability.
const STABILITY_SCALE: f64 = 10.0;
/// Horizontal shoulder/hip midpoint offset mapped to zero alignment.
const ALIGNMENT_SCALE: f64 = 4.0;
/// Average displacement that counts as full movement intensity.
const DISPLACEMENT_REFERENCE: f64 = 0.1;
/// Scale applied to (1 - hip/ankle straightness) for knee flexion.
const KNEE_FLEXION_SCALE: f64 = 4.0;
/// Ankle spread over hip width that counts as full footwork.
const FOOTWORK_REFERENCE_RATIO: f64 = 2.0;

/// Per-frame form score blend: visibility, symmetry, alignment.
pub const FRAME_SCORE_WEIGHTS: (f64, f64, f64) = (0.4, 0.3, 0.3);

const EPSILON: f64 = 1e-9;

pub(crate) fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation, 0 for fewer than two samples.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let Some(avg) = mean(values) else {
        return 0.0;
    };
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Sport-specific measurements that can be taken from a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SportFeatureKind {
    /// How straight the arms are (shoulder-wrist over shoulder-elbow-wrist).
    ArmExtension,
    /// How bent the knees are.
    KneeFlexion,
    /// How vertical the trunk is.
    TorsoUprightness,
    /// Stance width relative to hip width.
    Footwork,
}

impl SportFeatureKind {
    pub fn measure(&self, frame: &PoseFrame) -> Option<f64> {
        match self {
            SportFeatureKind::ArmExtension => {
                let ratios: Vec<f64> = [
                    (LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST),
                    (RIGHT_SHOULDER, RIGHT_ELBOW, RIGHT_WRIST),
                ]
                .iter()
                .filter_map(|&(a, b, c)| straightness(frame, a, b, c))
                .collect();
                mean(&ratios).map(clamp01)
            }
            SportFeatureKind::KneeFlexion => {
                let flexions: Vec<f64> = [
                    (LEFT_HIP, LEFT_KNEE, LEFT_ANKLE),
                    (RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE),
                ]
                .iter()
                .filter_map(|&(a, b, c)| straightness(frame, a, b, c))
                .map(|ratio| clamp01((1.0 - ratio) * KNEE_FLEXION_SCALE))
                .collect();
                mean(&flexions)
            }
            SportFeatureKind::TorsoUprightness => {
                let (shoulders, hips) = trunk_midpoints(frame)?;
                let dy = (shoulders.1 - hips.1).abs();
                if dy < EPSILON {
                    return None;
                }
                Some(1.0 - clamp01((shoulders.0 - hips.0).abs() / dy))
            }
            SportFeatureKind::Footwork => {
                let hip_width = point(frame, LEFT_HIP)?.distance(point(frame, RIGHT_HIP)?);
                if hip_width < EPSILON {
                    return None;
                }
                let spread = point(frame, LEFT_ANKLE)?.distance(point(frame, RIGHT_ANKLE)?);
                Some(clamp01(spread / hip_width / FOOTWORK_REFERENCE_RATIO))
            }
        }
    }
}

fn point(frame: &PoseFrame, index: usize) -> Option<&Landmark> {
    frame
        .landmarks
        .get(index)
        .filter(|l| l.visibility >= MIN_GEOMETRY_VISIBILITY)
}

/// Ratio of the direct a-c distance over the a-b-c path; 1.0 means a straight limb.
fn straightness(frame: &PoseFrame, a: usize, b: usize, c: usize) -> Option<f64> {
    let (a, b, c) = (point(frame, a)?, point(frame, b)?, point(frame, c)?);
    let path = a.distance(b) + b.distance(c);
    if path < EPSILON {
        return None;
    }
    Some(a.distance(c) / path)
}

fn midpoint(frame: &PoseFrame, left: usize, right: usize) -> Option<(f64, f64)> {
    let (l, r) = (point(frame, left)?, point(frame, right)?);
    Some(((l.x + r.x) / 2.0, (l.y + r.y) / 2.0))
}

fn trunk_midpoints(frame: &PoseFrame) -> Option<((f64, f64), (f64, f64))> {
    Some((
        midpoint(frame, LEFT_SHOULDER, RIGHT_SHOULDER)?,
        midpoint(frame, LEFT_HIP, RIGHT_HIP)?,
    ))
}

fn frame_visibility(frame: &PoseFrame) -> f64 {
    let visibilities: Vec<f64> = frame.landmarks.iter().map(|l| l.visibility).collect();
    mean(&visibilities).unwrap_or(0.0)
}

fn frame_symmetry(frame: &PoseFrame) -> Option<f64> {
    let diffs: Vec<f64> = SYMMETRIC_PAIRS
        .iter()
        .filter_map(|&(l, r)| Some((point(frame, l)?.y - point(frame, r)?.y).abs()))
        .collect();
    mean(&diffs).map(|d| 1.0 - clamp01(d * SYMMETRY_SCALE))
}

fn frame_alignment(frame: &PoseFrame) -> Option<f64> {
    let (shoulders, hips) = trunk_midpoints(frame)?;
    Some(1.0 - clamp01((shoulders.0 - hips.0).abs() * ALIGNMENT_SCALE))
}

fn frame_center(frame: &PoseFrame) -> (f64, f64) {
    let n = frame.landmarks.len() as f64;
    let (sx, sy) = frame
        .landmarks
        .iter()
        .fold((0.0, 0.0), |(sx, sy), l| (sx + l.x, sy + l.y));
    (sx / n, sy / n)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseFeatures {
    pub symmetry: f64,
    pub stability: f64,
    pub alignment: f64,
    pub visibility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementFeatures {
    pub smoothness: f64,
    pub consistency: f64,
    pub average_displacement: f64,
    /// Average displacement normalized against [`DISPLACEMENT_REFERENCE`].
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SportFeature {
    pub kind: SportFeatureKind,
    pub mean: f64,
    pub std_dev: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalFeatures {
    pub duration_seconds: f64,
    pub frame_rate: f64,
    /// Per-frame form score in [0, 100], in frame order.
    pub frame_scores: Vec<f64>,
    /// Mean of the last third of frame scores minus the first third, scaled to [-1, 1].
    pub trend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedFeatures {
    pub pose: PoseFeatures,
    pub movement: MovementFeatures,
    pub sport: Vec<SportFeature>,
    pub temporal: TemporalFeatures,
    /// Body-center displacement between consecutive non-empty frames.
    pub step_displacements: Vec<f64>,
    /// Non-empty frames that contributed to the features.
    pub frames_used: usize,
}

impl ExtractedFeatures {
    pub fn sport_feature_mean(&self) -> f64 {
        let means: Vec<f64> = self.sport.iter().map(|f| f.mean).collect();
        mean(&means).unwrap_or(NEUTRAL_FEATURE_VALUE)
    }
}

/// Returns `None` when the vector carries no landmarks or any value is malformed.
pub fn extract(vector: &FeatureVector, sport_kinds: &[SportFeatureKind]) -> Option<ExtractedFeatures> {
    if !is_well_formed(vector) {
        return None;
    }
    let frames: Vec<&PoseFrame> = vector
        .frames
        .iter()
        .filter(|f| !f.landmarks.is_empty())
        .collect();
    if frames.is_empty() {
        return None;
    }

    let mut visibilities = Vec::with_capacity(frames.len());
    let mut symmetries = Vec::new();
    let mut alignments = Vec::new();
    let mut frame_scores = Vec::with_capacity(frames.len());
    for frame in &frames {
        let visibility = frame_visibility(frame);
        let symmetry = frame_symmetry(frame);
        let alignment = frame_alignment(frame);
        visibilities.push(visibility);
        symmetries.extend(symmetry);
        alignments.extend(alignment);

        let (wv, ws, wa) = FRAME_SCORE_WEIGHTS;
        let score = wv * visibility
            + ws * symmetry.unwrap_or(NEUTRAL_FEATURE_VALUE)
            + wa * alignment.unwrap_or(NEUTRAL_FEATURE_VALUE);
        frame_scores.push(100.0 * clamp01(score));
    }

    let step_displacements: Vec<f64> = frames
        .windows(2)
        .map(|pair| {
            let (a, b) = (frame_center(pair[0]), frame_center(pair[1]));
            ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
        })
        .collect();
    let stability = mean(&step_displacements)
        .map(|step| 1.0 - clamp01(step * STABILITY_SCALE))
        .unwrap_or(1.0);

    let pose = PoseFeatures {
        symmetry: mean(&symmetries).unwrap_or(NEUTRAL_FEATURE_VALUE),
        stability,
        alignment: mean(&alignments).unwrap_or(NEUTRAL_FEATURE_VALUE),
        visibility: mean(&visibilities).unwrap_or(0.0),
    };

    let metrics = &vector.frame_metrics;
    let average_displacement = metrics.average_displacement.max(0.0);
    let movement = MovementFeatures {
        smoothness: clamp01(metrics.smoothness),
        consistency: clamp01(metrics.consistency),
        average_displacement,
        intensity: clamp01(average_displacement / DISPLACEMENT_REFERENCE),
    };

    let sport = sport_kinds
        .iter()
        .map(|kind| {
            let values: Vec<f64> = frames.iter().filter_map(|f| kind.measure(f)).collect();
            SportFeature {
                kind: *kind,
                mean: mean(&values).unwrap_or(NEUTRAL_FEATURE_VALUE),
                std_dev: std_dev(&values),
                samples: values.len(),
            }
        })
        .collect();

    let trend = if frame_scores.len() >= 3 {
        let third = frame_scores.len() / 3;
        let first = mean(&frame_scores[..third]).unwrap_or(0.0);
        let last = mean(&frame_scores[frame_scores.len() - third..]).unwrap_or(0.0);
        ((last - first) / 100.0).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    let temporal = TemporalFeatures {
        duration_seconds: vector.duration_seconds.max(0.0),
        frame_rate: vector.declared_frame_rate(),
        frame_scores,
        trend,
    };

    Some(ExtractedFeatures {
        pose,
        movement,
        sport,
        temporal,
        step_displacements,
        frames_used: frames.len(),
    })
}

fn is_well_formed(vector: &FeatureVector) -> bool {
    vector.duration_seconds.is_finite()
        && vector.frame_metrics.is_well_formed()
        && vector
            .frames
            .iter()
            .all(|f| f.landmarks.iter().all(Landmark::is_well_formed))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::features::FrameMetrics;

    const ALL_KINDS: &[SportFeatureKind] = &[
        SportFeatureKind::ArmExtension,
        SportFeatureKind::KneeFlexion,
        SportFeatureKind::TorsoUprightness,
        SportFeatureKind::Footwork,
    ];

    #[test]
    fn empty_vector_yields_nothing() {
        let vector = FeatureVector {
            sport: "tennis".to_string(),
            frames: vec![PoseFrame::default(), PoseFrame::default()],
            frame_metrics: FrameMetrics::default(),
            duration_seconds: 1.0,
            frame_count: 30,
        };
        assert!(extract(&vector, ALL_KINDS).is_none());
    }

    #[test]
    fn malformed_vector_yields_nothing() {
        let mut vector = steady_vector("tennis", 10);
        vector.frames[3].landmarks[0].x = f64::NAN;
        assert!(extract(&vector, ALL_KINDS).is_none());

        let mut vector = steady_vector("tennis", 10);
        vector.frame_metrics.smoothness = f64::INFINITY;
        assert!(extract(&vector, ALL_KINDS).is_none());
    }

    #[test]
    fn symmetric_upright_pose_scores_high() {
        let features = extract(&steady_vector("tennis", 30), ALL_KINDS).unwrap();

        assert_eq!(features.frames_used, 30);
        assert!((features.pose.symmetry - 1.0).abs() < 1e-9);
        assert!((features.pose.alignment - 1.0).abs() < 1e-9);
        assert!(features.pose.stability > 0.9);
        assert!((features.pose.visibility - 0.95).abs() < 1e-9);
        assert_eq!(features.step_displacements.len(), 29);
        assert_eq!(features.temporal.frame_rate, 30.0);
        assert_eq!(features.temporal.frame_scores.len(), 30);
    }

    #[test]
    fn sport_features_are_measured_in_range() {
        let features = extract(&steady_vector("tennis", 12), ALL_KINDS).unwrap();
        assert_eq!(features.sport.len(), ALL_KINDS.len());
        for feature in &features.sport {
            assert!((0.0..=1.0).contains(&feature.mean), "{:?}", feature);
            assert_eq!(feature.samples, 12);
            assert!(feature.std_dev < 1e-9);
        }
        let torso = &features.sport[2];
        assert_eq!(torso.kind, SportFeatureKind::TorsoUprightness);
        assert!((torso.mean - 1.0).abs() < 1e-9);
    }

    #[test]
    fn trend_follows_frame_quality() {
        let mut vector = steady_vector("tennis", 9);
        for (i, frame) in vector.frames.iter_mut().enumerate() {
            let visibility = 0.3 + 0.07 * i as f64;
            *frame = standing_frame(0.0, visibility);
        }
        let features = extract(&vector, &[]).unwrap();
        assert!(features.temporal.trend > 0.0);
    }

    #[test]
    fn missing_geometry_falls_back_to_neutral() {
        let vector = FeatureVector {
            sport: "generic".to_string(),
            frames: vec![PoseFrame::new(vec![Landmark::new(0.5, 0.5, 0.9); 5])],
            frame_metrics: FrameMetrics::default(),
            duration_seconds: 1.0,
            frame_count: 1,
        };
        let features = extract(&vector, &[SportFeatureKind::Footwork]).unwrap();
        assert_eq!(features.pose.symmetry, NEUTRAL_FEATURE_VALUE);
        assert_eq!(features.pose.alignment, NEUTRAL_FEATURE_VALUE);
        assert_eq!(features.pose.stability, 1.0);
        assert_eq!(features.sport[0].samples, 0);
        assert_eq!(features.sport[0].mean, NEUTRAL_FEATURE_VALUE);
    }

    #[test]
    fn std_dev_of_constant_series_is_zero() {
        assert_eq!(std_dev(&[3.0, 3.0, 3.0]), 0.0);
        assert_eq!(std_dev(&[1.0]), 0.0);
        assert!((std_dev(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
        assert_eq!(mean(&[]), None);
    }
}
