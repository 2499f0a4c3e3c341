use serde::{Deserialize, Serialize};

use crate::{healing::error::HealError, snapshot::snapshot_model::Candidate};

pub const DEFAULT_THRESHOLD: f64 = 80.0;

// ============================================================================
// Configuration
// ============================================================================

/// Weight of each descriptive attribute in the confidence score.
///
/// Only attributes present in the stored fingerprint count toward the
/// maximum, so the absolute values matter only relative to each other.
/// Defaults sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub tag: f64,
    pub text: f64,
    pub classes: f64,
    pub placeholder: f64,
    pub input_type: f64,
    pub aria_label: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            tag: 15.0,
            text: 30.0,
            classes: 15.0,
            placeholder: 10.0,
            input_type: 10.0,
            aria_label: 20.0,
        }
    }
}

impl ScoreWeights {
    pub fn values(&self) -> [f64; 6] {
        [
            self.tag,
            self.text,
            self.classes,
            self.placeholder,
            self.input_type,
            self.aria_label,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealingConfig {
    /// Minimum confidence (percent) a unique winner needs to be healed.
    pub threshold: f64,
    pub weights: ScoreWeights,
}

impl Default for HealingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            weights: ScoreWeights::default(),
        }
    }
}

// ============================================================================
// Decision cycle values
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub confidence: f64,
}

/// Result of one heal attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum HealOutcome {
    Healed {
        selector: String,
        confidence: f64,
        matched_id: String,
    },
    Ambiguous {
        tie_count: usize,
        confidence: f64,
    },
    NotFound {
        confidence: f64,
    },
    NoFingerprint,
}

/// The locator handed back to the caller on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealedLocator {
    pub selector: String,
    pub confidence: f64,
    pub matched_id: String,
}

impl HealOutcome {
    pub fn confidence(&self) -> f64 {
        match self {
            HealOutcome::Healed { confidence, .. }
            | HealOutcome::Ambiguous { confidence, .. }
            | HealOutcome::NotFound { confidence } => *confidence,
            HealOutcome::NoFingerprint => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealOutcome::Healed { .. } => "healed",
            HealOutcome::Ambiguous { .. } => "ambiguous",
            HealOutcome::NotFound { .. } => "not_found",
            HealOutcome::NoFingerprint => "no_fingerprint",
        }
    }

    pub fn is_healed(&self) -> bool {
        matches!(self, HealOutcome::Healed { .. })
    }

    /// Split into the success value and the failure taxonomy.
    pub fn into_result(self) -> Result<HealedLocator, HealError> {
        match self {
            HealOutcome::Healed {
                selector,
                confidence,
                matched_id,
            } => Ok(HealedLocator {
                selector,
                confidence,
                matched_id,
            }),
            HealOutcome::Ambiguous {
                tie_count,
                confidence,
            } => Err(HealError::Ambiguous {
                tie_count,
                confidence,
            }),
            HealOutcome::NotFound { confidence } => Err(HealError::NotFound { confidence }),
            HealOutcome::NoFingerprint => Err(HealError::NoFingerprint),
        }
    }
}
