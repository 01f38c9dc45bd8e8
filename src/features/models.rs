//! Input produced by the pose-extraction collaborator for one submitted video.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Indices in the 33-point body-pose landmark layout.
pub mod landmark_index {
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_KNEE: usize = 25;
    pub const RIGHT_KNEE: usize = 26;
    pub const LEFT_ANKLE: usize = 27;
    pub const RIGHT_ANKLE: usize = 28;

    pub const POSE_LANDMARK_COUNT: usize = 33;

    /// Left/right pairs compared for symmetry.
    pub const SYMMETRIC_PAIRS: &[(usize, usize)] = &[
        (LEFT_SHOULDER, RIGHT_SHOULDER),
        (LEFT_ELBOW, RIGHT_ELBOW),
        (LEFT_WRIST, RIGHT_WRIST),
        (LEFT_HIP, RIGHT_HIP),
        (LEFT_KNEE, RIGHT_KNEE),
        (LEFT_ANKLE, RIGHT_ANKLE),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.z.map_or(true, f64::is_finite)
            && (0.0..=1.0).contains(&self.visibility)
    }

    pub fn distance(&self, other: &Landmark) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// All landmarks detected in a single video frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

impl PoseFrame {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }
}

/// Aggregate movement metrics computed by the extractor over the whole clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameMetrics {
    pub smoothness: f64,
    pub consistency: f64,
    pub average_displacement: f64,
}

impl FrameMetrics {
    pub fn is_well_formed(&self) -> bool {
        self.smoothness.is_finite()
            && self.consistency.is_finite()
            && self.average_displacement.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    pub sport: String,
    #[serde(default)]
    pub frames: Vec<PoseFrame>,
    #[serde(default)]
    pub frame_metrics: FrameMetrics,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub frame_count: u32,
}

impl FeatureVector {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse feature vector")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read feature vector file: {:?}", path))?;
        Self::from_json(&content)
    }

    pub fn landmark_count(&self) -> usize {
        self.frames.iter().map(|f| f.landmarks.len()).sum()
    }

    /// Video frames per second as declared by the extractor metadata.
    pub fn declared_frame_rate(&self) -> f64 {
        if self.duration_seconds > 0.0 && self.duration_seconds.is_finite() {
            self.frame_count as f64 / self.duration_seconds
        } else {
            0.0
        }
    }
}
