#![allow(dead_code)]

pub const TENNIS: &str = "Tennis";
pub const BASKETBALL: &str = "Basketball";
pub const STATE: &str = "State";
pub const NATIONAL: &str = "National";

pub const ATHLETE_X: &str = "athlete-x";
pub const ATHLETE_Y: &str = "athlete-y";

/// Frames in the vectors built by the fixtures, one second at 30 fps.
pub const FIXTURE_FRAMES: usize = 30;
