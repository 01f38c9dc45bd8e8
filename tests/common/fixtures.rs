#![allow(dead_code)]

use athlete_ranking::evaluation::ComponentScores;
use athlete_ranking::features::landmark_index::*;
use athlete_ranking::features::{FeatureVector, FrameMetrics, Landmark, PoseFrame};
use athlete_ranking::history::HistoryRecord;

/// Symmetric upright pose shifted horizontally by `dx`.
fn standing_frame(dx: f64) -> PoseFrame {
    let mut landmarks = vec![Landmark::new(0.5 + dx, 0.1, 0.95); POSE_LANDMARK_COUNT];
    let mut set = |index: usize, x: f64, y: f64| {
        landmarks[index] = Landmark::new(x + dx, y, 0.95);
    };
    set(LEFT_SHOULDER, 0.4, 0.3);
    set(RIGHT_SHOULDER, 0.6, 0.3);
    set(LEFT_ELBOW, 0.35, 0.45);
    set(RIGHT_ELBOW, 0.65, 0.45);
    set(LEFT_WRIST, 0.3, 0.6);
    set(RIGHT_WRIST, 0.7, 0.6);
    set(LEFT_HIP, 0.45, 0.6);
    set(RIGHT_HIP, 0.55, 0.6);
    set(LEFT_KNEE, 0.44, 0.75);
    set(RIGHT_KNEE, 0.56, 0.75);
    set(LEFT_ANKLE, 0.4, 0.9);
    set(RIGHT_ANKLE, 0.6, 0.9);
    PoseFrame::new(landmarks)
}

fn vector_from_frames(sport: &str, frames: Vec<PoseFrame>, metrics: FrameMetrics) -> FeatureVector {
    let frame_count = frames.len();
    FeatureVector {
        sport: sport.to_string(),
        frames,
        frame_metrics: metrics,
        duration_seconds: frame_count as f64 / 30.0,
        frame_count: frame_count as u32,
    }
}

/// A clean, well-lit clip of an athlete barely moving.
pub fn steady_vector(sport: &str, frames: usize) -> FeatureVector {
    vector_from_frames(
        sport,
        (0..frames)
            .map(|i| standing_frame(0.002 * (i % 2) as f64))
            .collect(),
        FrameMetrics {
            smoothness: 0.8,
            consistency: 0.85,
            average_displacement: 0.04,
        },
    )
}

/// A steady clip whose metadata claims it lasted `duration_seconds`.
pub fn stretched_vector(sport: &str, frames: usize, duration_seconds: f64) -> FeatureVector {
    FeatureVector {
        duration_seconds,
        ..steady_vector(sport, frames)
    }
}

pub fn empty_vector(sport: &str) -> FeatureVector {
    FeatureVector {
        sport: sport.to_string(),
        frames: vec![],
        frame_metrics: FrameMetrics::default(),
        duration_seconds: 0.0,
        frame_count: 0,
    }
}

pub fn history_record(athlete_id: &str, score: f64, timestamp: i64) -> HistoryRecord {
    HistoryRecord {
        athlete_id: athlete_id.to_string(),
        sport: "tennis".to_string(),
        level: "state".to_string(),
        timestamp,
        score,
        components: ComponentScores::default(),
        cheat_detected: false,
        duration_seconds: 1.0,
        frame_count: 30,
    }
}
