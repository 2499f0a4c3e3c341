use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    fingerprint::{
        extractor::extract,
        fingerprint_model::{ElementDescriptor, Fingerprint},
    },
    healing::{
        decision::decide,
        error::HealError,
        healing_model::{HealOutcome, HealingConfig},
        locks::KeyLocks,
    },
    repository::{FingerprintRepository, RepositoryError},
    snapshot::{parser::enumerate_candidates, snapshot_model::Candidate},
    trace::{logger::TraceLogger, trace::HealTraceEvent},
};

/// Learns fingerprints and heals broken ids against markup snapshots.
///
/// Stateless apart from the shared repository. Learns and heal commits on
/// the same `(page_key, id)` are serialized through [`KeyLocks`].
pub struct HealingEngine {
    repository: Arc<dyn FingerprintRepository>,
    config: HealingConfig,
    locks: KeyLocks,
    tracer: Option<Arc<TraceLogger>>,
}

impl HealingEngine {
    pub fn new(repository: Arc<dyn FingerprintRepository>, config: HealingConfig) -> Self {
        Self {
            repository,
            config,
            locks: KeyLocks::new(),
            tracer: None,
        }
    }

    pub fn with_tracer(mut self, tracer: Arc<TraceLogger>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn config(&self) -> &HealingConfig {
        &self.config
    }

    // ========================================================================
    // Learn
    // ========================================================================

    /// Upsert the fingerprint of an element that was just located by `id`.
    pub async fn learn(
        &self,
        page_key: &str,
        id: &str,
        descriptor: ElementDescriptor,
    ) -> Result<Fingerprint, HealError> {
        require("pageKey", page_key)?;
        require("id", id)?;
        require("tagName", &descriptor.tag_name)?;

        let _guard = self.locks.lock(page_key, id).await;
        let stored = {
            let (page_key, id) = (page_key.to_string(), id.to_string());
            let fingerprint = Fingerprint::new(&id, descriptor);
            self.with_repository(move |repo| repo.put(&page_key, &id, fingerprint))
                .await?
        };

        debug!(page_key, id, history = stored.history.len(), "Fingerprint stored");
        self.trace(HealTraceEvent::learn(page_key, id));
        Ok(stored)
    }

    // ========================================================================
    // Heal
    // ========================================================================

    /// Find a replacement for `broken_id` in `snapshot`.
    ///
    /// Only storage failures and malformed input are `Err`; every decision,
    /// including "no fingerprint", is a `HealOutcome`.
    pub async fn heal(
        &self,
        page_key: &str,
        broken_id: &str,
        snapshot: &str,
    ) -> Result<HealOutcome, HealError> {
        require("pageKey", page_key)?;
        require("brokenId", broken_id)?;
        require("domSnapshot", snapshot)?;

        let stored = {
            let (page_key, broken_id) = (page_key.to_string(), broken_id.to_string());
            self.with_repository(move |repo| repo.get(&page_key, &broken_id))
                .await?
        };
        let Some(fingerprint) = stored else {
            info!(page_key, broken_id, "No fingerprint for broken id");
            let outcome = HealOutcome::NoFingerprint;
            self.trace(HealTraceEvent::heal(page_key, broken_id).with_outcome(&outcome));
            return Ok(outcome);
        };

        let candidates = enumerate_candidates(snapshot);
        let considered = candidates.len();
        let decision = decide(&fingerprint, candidates, &self.config);

        for scored in decision.ranked.iter().take(3) {
            debug!(
                page_key,
                broken_id,
                candidate = %scored.candidate.id,
                confidence = scored.confidence,
                "Ranked candidate"
            );
        }

        let outcome = match (decision.outcome, decision.winner) {
            (outcome @ HealOutcome::Healed { .. }, Some(winner)) => {
                match self.commit(page_key, broken_id, &winner).await {
                    Ok(()) => outcome,
                    Err(HealError::NoFingerprint) => {
                        warn!(page_key, broken_id, "Fingerprint moved by a concurrent heal");
                        HealOutcome::NoFingerprint
                    }
                    Err(e) => return Err(e),
                }
            }
            (outcome, _) => outcome,
        };

        match &outcome {
            HealOutcome::Healed {
                selector,
                confidence,
                ..
            } => info!(page_key, broken_id, selector = %selector, confidence, "Healed"),
            HealOutcome::Ambiguous {
                tie_count,
                confidence,
            } => warn!(page_key, broken_id, tie_count, confidence, "Ambiguous healing"),
            other => info!(
                page_key,
                broken_id,
                confidence = other.confidence(),
                considered,
                "Healing failed"
            ),
        }

        self.trace(
            HealTraceEvent::heal(page_key, broken_id)
                .with_outcome(&outcome)
                .with_candidates(considered),
        );
        Ok(outcome)
    }

    /// Re-key (or refresh) the fingerprint to track the healed element.
    ///
    /// The move, the history entry and the observed attributes land in one
    /// repository write, so a failed commit leaves the old record in place.
    async fn commit(
        &self,
        page_key: &str,
        broken_id: &str,
        winner: &Candidate,
    ) -> Result<(), HealError> {
        let _guards = self
            .locks
            .lock_many(page_key, &[broken_id, winner.id.as_str()])
            .await;

        let observed = extract(&winner.id, &winner.element);
        let stored = {
            let (page_key, broken_id) = (page_key.to_string(), broken_id.to_string());
            let new_id = winner.id.clone();
            self.with_repository(move |repo| repo.rekey(&page_key, &broken_id, &new_id, observed))
                .await?
        };

        debug!(
            page_key,
            from = broken_id,
            to = %winner.id,
            history = ?stored.history,
            "Fingerprint re-keyed"
        );
        Ok(())
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub async fn fingerprints(&self, page_key: &str) -> Result<Vec<Fingerprint>, HealError> {
        require("pageKey", page_key)?;
        let page_key = page_key.to_string();
        self.with_repository(move |repo| repo.list(&page_key)).await
    }

    /// Run a repository call on the blocking pool; file backends do
    /// synchronous I/O under a per-page mutex.
    async fn with_repository<T, F>(&self, op: F) -> Result<T, HealError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn FingerprintRepository) -> Result<T, RepositoryError> + Send + 'static,
    {
        let repository = Arc::clone(&self.repository);
        tokio::task::spawn_blocking(move || op(repository.as_ref()))
            .await
            .map_err(|e| RepositoryError::Task(e.to_string()))?
            .map_err(HealError::from)
    }

    fn trace(&self, event: HealTraceEvent) {
        if let Some(tracer) = &self.tracer {
            tracer.record(&event);
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), HealError> {
    if value.trim().is_empty() {
        Err(HealError::BadRequest(format!("{} is required", field)))
    } else {
        Ok(())
    }
}
