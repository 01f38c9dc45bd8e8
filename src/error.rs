//! Error taxonomy shared by every stage of the evaluation pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RankingError {
    /// Malformed input. Stages that can degrade never let this escape.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out after {waited_ms}ms waiting for {resource}")]
    ConcurrencyTimeout { resource: String, waited_ms: u64 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl RankingError {
    /// Only lock timeouts are worth re-submitting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RankingError::ConcurrencyTimeout { .. })
    }
}

pub type RankingResult<T> = Result<T, RankingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_are_retryable() {
        let timeout = RankingError::ConcurrencyTimeout {
            resource: "bucket tennis/state".to_string(),
            waited_ms: 5000,
        };
        assert!(timeout.is_retryable());
        assert!(!RankingError::NotFound("athlete x".to_string()).is_retryable());
        assert!(!RankingError::Configuration("bad weights".to_string()).is_retryable());
        assert!(!RankingError::Validation("no frames".to_string()).is_retryable());
    }

    #[test]
    fn timeout_message_names_the_resource() {
        let err = RankingError::ConcurrencyTimeout {
            resource: "athlete abc".to_string(),
            waited_ms: 250,
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 250ms waiting for athlete abc"
        );
    }

    #[test]
    fn storage_errors_wrap_anyhow() {
        let err: RankingError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, RankingError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
