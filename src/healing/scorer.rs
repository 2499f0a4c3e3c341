use std::collections::BTreeSet;

use crate::{
    fingerprint::fingerprint_model::ElementDescriptor, healing::healing_model::ScoreWeights,
};

/// Weighted similarity between a stored fingerprint and a live element.
///
/// Every attribute the fingerprint carries adds its weight to the maximum
/// and `weight * similarity` to the achieved score. Attributes the
/// fingerprint lacks are skipped entirely, so sparse fingerprints are scored
/// over a smaller denominator rather than penalized.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    weights: ScoreWeights,
}

impl Scorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Confidence in `[0, 100]`, rounded to one decimal.
    pub fn score(&self, fingerprint: &ElementDescriptor, candidate: &ElementDescriptor) -> f64 {
        let w = &self.weights;
        let mut achieved = 0.0;
        let mut maximum = 0.0;

        let mut contribute = |weight: f64, similarity: f64| {
            maximum += weight;
            achieved += weight * similarity;
        };

        if !fingerprint.tag_name.is_empty() {
            contribute(w.tag, exact_match(&fingerprint.tag_name, &candidate.tag_name));
        }

        if let Some(text) = &fingerprint.inner_text {
            contribute(
                w.text,
                text_similarity(text, candidate.inner_text.as_deref().unwrap_or("")),
            );
        }

        if !fingerprint.class_names.is_empty() {
            contribute(
                w.classes,
                class_overlap(&fingerprint.class_names, &candidate.class_names),
            );
        }

        if let Some(placeholder) = &fingerprint.placeholder {
            contribute(
                w.placeholder,
                text_similarity(placeholder, candidate.placeholder.as_deref().unwrap_or("")),
            );
        }

        if let Some(input_type) = &fingerprint.input_type {
            contribute(
                w.input_type,
                exact_match(input_type, candidate.input_type.as_deref().unwrap_or("")),
            );
        }

        if let Some(label) = &fingerprint.aria_label {
            contribute(
                w.aria_label,
                text_similarity(label, candidate.aria_label.as_deref().unwrap_or("")),
            );
        }

        if maximum <= 0.0 {
            return 0.0;
        }

        round_confidence(achieved / maximum)
    }
}

/// Case-insensitive equality as 0 or 1.
pub fn exact_match(expected: &str, actual: &str) -> f64 {
    if expected.trim().eq_ignore_ascii_case(actual.trim()) {
        1.0
    } else {
        0.0
    }
}

/// `1 - levenshtein(a, b) / max(len(a), len(b))` over characters.
///
/// Identical strings after trimming (including two empty strings) score 1.
pub fn text_similarity(expected: &str, actual: &str) -> f64 {
    let (a, b) = (expected.trim(), actual.trim());
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Share of the expected class tokens present on the candidate.
///
/// Directional: extra classes on the candidate do not lower the score.
pub fn class_overlap(expected: &BTreeSet<String>, actual: &BTreeSet<String>) -> f64 {
    if expected.is_empty() {
        return 1.0;
    }
    let shared = expected.intersection(actual).count();
    shared as f64 / expected.len() as f64
}

/// Ratio in `[0, 1]` to a percentage with one decimal.
pub fn round_confidence(ratio: f64) -> f64 {
    (ratio * 1000.0).round() / 10.0
}
