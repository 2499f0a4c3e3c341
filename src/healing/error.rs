use thiserror::Error;

use crate::repository::RepositoryError;

/// Failure taxonomy reported to callers of the healing engine.
#[derive(Debug, Error)]
pub enum HealError {
    /// Malformed learn/heal input (missing required fields).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Heal requested for an id that was never learned.
    #[error("No fingerprint found.")]
    NoFingerprint,

    /// Candidates existed but none cleared the threshold.
    #[error("Healing failed. No element strongly matched fingerprint (top confidence {confidence}%).")]
    NotFound { confidence: f64 },

    /// Two or more candidates tied for the top score.
    #[error("Ambiguous healing ({tie_count} candidates tie at {confidence}%).")]
    Ambiguous { tie_count: usize, confidence: f64 },

    /// Storage failure, fatal to the current call.
    #[error("fingerprint repository unavailable: {0}")]
    RepositoryUnavailable(#[source] RepositoryError),
}

impl HealError {
    /// Confidence value attached to the failure, where one is meaningful.
    pub fn confidence(&self) -> Option<f64> {
        match self {
            HealError::NoFingerprint => Some(0.0),
            HealError::NotFound { confidence } | HealError::Ambiguous { confidence, .. } => {
                Some(*confidence)
            }
            HealError::BadRequest(_) | HealError::RepositoryUnavailable(_) => None,
        }
    }

    /// Stable machine-readable tag, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            HealError::BadRequest(_) => "bad_request",
            HealError::NoFingerprint => "no_fingerprint",
            HealError::NotFound { .. } => "not_found",
            HealError::Ambiguous { .. } => "ambiguous",
            HealError::RepositoryUnavailable(_) => "repository_unavailable",
        }
    }
}

impl From<RepositoryError> for HealError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::MissingFingerprint { .. } => HealError::NoFingerprint,
            other => HealError::RepositoryUnavailable(other),
        }
    }
}
