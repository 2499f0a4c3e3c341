use crate::{
    fingerprint::fingerprint_model::Fingerprint,
    healing::{
        healing_model::{HealOutcome, HealingConfig, ScoredCandidate},
        scorer::Scorer,
        synthesizer::synthesize,
    },
    snapshot::snapshot_model::Candidate,
};

/// Everything one decision cycle produced.
#[derive(Debug, Clone)]
pub struct Decision {
    pub outcome: HealOutcome,
    /// The healed element, set only for `HealOutcome::Healed`.
    pub winner: Option<Candidate>,
    /// All candidates, best first.
    pub ranked: Vec<ScoredCandidate>,
}

/// Score `candidates` against `fingerprint` and apply the healing rules.
///
/// Never guesses: a tie at the top is `Ambiguous` whatever the threshold,
/// and a unique winner below the threshold is `NotFound`.
pub fn decide(
    fingerprint: &Fingerprint,
    candidates: Vec<Candidate>,
    config: &HealingConfig,
) -> Decision {
    let scorer = Scorer::new(config.weights);

    let mut ranked: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let confidence = scorer.score(&fingerprint.descriptor, candidate.descriptor());
            ScoredCandidate {
                candidate,
                confidence,
            }
        })
        .collect();

    // Stable sort keeps document order among equal scores.
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let top = match ranked.first() {
        Some(best) if best.confidence > 0.0 => best.confidence,
        _ => {
            return Decision {
                outcome: HealOutcome::NotFound { confidence: 0.0 },
                winner: None,
                ranked,
            };
        }
    };

    let tie_count = ranked
        .iter()
        .take_while(|s| same_confidence(s.confidence, top))
        .count();

    if tie_count > 1 {
        return Decision {
            outcome: HealOutcome::Ambiguous {
                tie_count,
                confidence: top,
            },
            winner: None,
            ranked,
        };
    }

    if top < config.threshold {
        return Decision {
            outcome: HealOutcome::NotFound { confidence: top },
            winner: None,
            ranked,
        };
    }

    let winner = ranked[0].candidate.clone();
    let outcome = HealOutcome::Healed {
        selector: synthesize(&winner.element),
        confidence: top,
        matched_id: winner.id.clone(),
    };

    Decision {
        outcome,
        winner: Some(winner),
        ranked,
    }
}

/// Ties are exact equality on the one-decimal rounded value.
fn same_confidence(a: f64, b: f64) -> bool {
    (a * 10.0).round() as i64 == (b * 10.0).round() as i64
}
