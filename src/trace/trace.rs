use chrono::Utc;
use serde::Serialize;

use crate::healing::healing_model::HealOutcome;

/// One audit line per learn or heal call.
#[derive(Debug, Serialize)]
pub struct HealTraceEvent {
    pub timestamp_ms: i64,
    pub operation: &'static str,

    pub page_key: String,
    pub element_id: String,

    pub outcome: Option<String>,
    pub selector: Option<String>,
    pub matched_id: Option<String>,
    pub confidence: Option<f64>,
    pub tie_count: Option<usize>,
    pub candidates_considered: Option<usize>,
}

impl HealTraceEvent {
    fn now(operation: &'static str, page_key: &str, element_id: &str) -> Self {
        Self {
            timestamp_ms: Utc::now().timestamp_millis(),
            operation,
            page_key: page_key.to_string(),
            element_id: element_id.to_string(),
            outcome: None,
            selector: None,
            matched_id: None,
            confidence: None,
            tie_count: None,
            candidates_considered: None,
        }
    }

    pub fn learn(page_key: &str, id: &str) -> Self {
        Self::now("learn", page_key, id).with_outcome_label("stored")
    }

    pub fn heal(page_key: &str, broken_id: &str) -> Self {
        Self::now("heal", page_key, broken_id)
    }

    pub fn with_outcome(mut self, outcome: &HealOutcome) -> Self {
        self.outcome = Some(outcome.label().to_string());
        self.confidence = Some(outcome.confidence());
        match outcome {
            HealOutcome::Healed {
                selector,
                matched_id,
                ..
            } => {
                self.selector = Some(selector.clone());
                self.matched_id = Some(matched_id.clone());
            }
            HealOutcome::Ambiguous { tie_count, .. } => self.tie_count = Some(*tie_count),
            HealOutcome::NotFound { .. } | HealOutcome::NoFingerprint => {}
        }
        self
    }

    pub fn with_outcome_label(mut self, label: impl ToString) -> Self {
        self.outcome = Some(label.to_string());
        self
    }

    pub fn with_candidates(mut self, count: usize) -> Self {
        self.candidates_considered = Some(count);
        self
    }
}
