//! Athlete identities. Every leaderboard entry and history record belongs to
//! an athlete registered here.

use serde::Serialize;

use crate::error::{RankingError, RankingResult};

pub type AthleteId = String;

pub const MAX_HANDLE_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Athlete {
    pub id: AthleteId,
    pub handle: String,
    /// Unix timestamp in seconds.
    pub created: i64,
}

/// Trims the handle and checks it is usable as a unique display name.
pub fn normalize_handle(handle: &str) -> RankingResult<String> {
    let handle = handle.trim();
    if handle.is_empty() {
        return Err(RankingError::Validation(
            "Athlete handle cannot be empty".to_string(),
        ));
    }
    if handle.chars().count() > MAX_HANDLE_LENGTH {
        return Err(RankingError::Validation(format!(
            "Athlete handle is longer than {} characters",
            MAX_HANDLE_LENGTH
        )));
    }
    if handle.chars().any(char::is_whitespace) {
        return Err(RankingError::Validation(format!(
            "Athlete handle '{}' contains whitespace",
            handle
        )));
    }
    Ok(handle.to_string())
}

pub fn new_athlete_id() -> AthleteId {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_handles() {
        assert_eq!(normalize_handle("  serena ").unwrap(), "serena");
        assert!(normalize_handle("   ").is_err());
        assert!(normalize_handle("two words").is_err());
        assert!(normalize_handle(&"x".repeat(MAX_HANDLE_LENGTH + 1)).is_err());
    }

    #[test]
    fn ids_are_unique_uuids() {
        let a = new_athlete_id();
        let b = new_athlete_id();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }
}
