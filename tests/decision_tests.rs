use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use selector_healing::{
    ElementDescriptor, Fingerprint, FingerprintRepository, HealError, HealOutcome, HealingConfig,
    HealingEngine, MemoryRepository,
    healing::decision::decide,
    repository::RepositoryError,
};

use crate::common::{
    PAGE, candidate, fixture, full_descriptor, memory_engine, memory_engine_with, submit_button,
};

mod common;

fn stored(descriptor: ElementDescriptor) -> Fingerprint {
    Fingerprint::new("old", descriptor)
}

fn button(id: &str, text: &str) -> String {
    format!("<button id=\"{}\">{}</button>", id, text)
}

/// Memory repository whose writes can be switched off.
#[derive(Default)]
struct FlakyRepository {
    inner: MemoryRepository,
    fail_writes: AtomicBool,
}

impl FlakyRepository {
    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(RepositoryError::Poisoned)
        } else {
            Ok(())
        }
    }
}

impl FingerprintRepository for FlakyRepository {
    fn get(&self, page_key: &str, id: &str) -> Result<Option<Fingerprint>, RepositoryError> {
        self.inner.get(page_key, id)
    }

    fn put(
        &self,
        page_key: &str,
        id: &str,
        fingerprint: Fingerprint,
    ) -> Result<Fingerprint, RepositoryError> {
        self.check_writable()?;
        self.inner.put(page_key, id, fingerprint)
    }

    fn rekey(
        &self,
        page_key: &str,
        old_id: &str,
        new_id: &str,
        observed: Fingerprint,
    ) -> Result<Fingerprint, RepositoryError> {
        self.check_writable()?;
        self.inner.rekey(page_key, old_id, new_id, observed)
    }

    fn list(&self, page_key: &str) -> Result<Vec<Fingerprint>, RepositoryError> {
        self.inner.list(page_key)
    }
}

// =========================================================================
// Pure decision rules
// =========================================================================

#[test]
fn single_exact_match_is_healed() {
    let decision = decide(
        &stored(submit_button()),
        vec![
            candidate("cancel", ElementDescriptor::new("BUTTON").with_text("Cancel")),
            candidate("new-submit", submit_button()),
        ],
        &HealingConfig::default(),
    );

    assert_eq!(
        decision.outcome,
        HealOutcome::Healed {
            selector: "#new-submit".to_string(),
            confidence: 100.0,
            matched_id: "new-submit".to_string(),
        }
    );
    assert_eq!(decision.winner.map(|w| w.id), Some("new-submit".to_string()));
}

#[test]
fn ranked_is_best_first_in_document_order_on_ties() {
    let decision = decide(
        &stored(submit_button()),
        vec![
            candidate("a", ElementDescriptor::new("DIV")),
            candidate("b", submit_button()),
            candidate("c", ElementDescriptor::new("BUTTON").with_text("Submitt")),
            candidate("d", ElementDescriptor::new("SPAN")),
        ],
        &HealingConfig::default(),
    );

    let ids: Vec<&str> = decision.ranked.iter().map(|s| s.candidate.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a", "d"]);
}

#[test]
fn tie_at_top_is_ambiguous() {
    let decision = decide(
        &stored(submit_button()),
        vec![
            candidate("submit-a", submit_button()),
            candidate("submit-b", submit_button()),
        ],
        &HealingConfig::default(),
    );

    assert_eq!(
        decision.outcome,
        HealOutcome::Ambiguous {
            tie_count: 2,
            confidence: 100.0,
        }
    );
    assert!(decision.winner.is_none());
}

#[test]
fn tie_below_threshold_is_still_ambiguous() {
    let fp = stored(ElementDescriptor::new("BUTTON").with_text("Submit"));
    // tag matches, text does not: 15 of 45
    let decision = decide(
        &fp,
        vec![
            candidate("x", ElementDescriptor::new("BUTTON").with_text("zzzzzz")),
            candidate("y", ElementDescriptor::new("BUTTON").with_text("qqqqqq")),
            candidate("z", ElementDescriptor::new("BUTTON").with_text("wwwwww")),
        ],
        &HealingConfig::default(),
    );

    assert_eq!(
        decision.outcome,
        HealOutcome::Ambiguous {
            tie_count: 3,
            confidence: 33.3,
        }
    );
}

#[test]
fn tie_below_the_top_score_is_ignored() {
    let decision = decide(
        &stored(submit_button()),
        vec![
            candidate("other-1", ElementDescriptor::new("BUTTON").with_text("Cancel")),
            candidate("winner", submit_button()),
            candidate("other-2", ElementDescriptor::new("BUTTON").with_text("Cancel")),
        ],
        &HealingConfig::default(),
    );

    assert!(decision.outcome.is_healed());
    assert_eq!(decision.winner.map(|w| w.id), Some("winner".to_string()));
}

#[test]
fn threshold_is_inclusive() {
    let fp = stored(full_descriptor());
    let mut live = full_descriptor();
    live.aria_label = None;

    let at_80 = decide(
        &fp,
        vec![candidate("email", live.clone())],
        &HealingConfig::default(),
    );
    assert_eq!(at_80.outcome.confidence(), 80.0);
    assert!(at_80.outcome.is_healed());

    let strict = HealingConfig {
        threshold: 80.1,
        ..HealingConfig::default()
    };
    let above = decide(&fp, vec![candidate("email", live)], &strict);
    assert_eq!(above.outcome, HealOutcome::NotFound { confidence: 80.0 });
}

#[test]
fn weak_unique_match_is_not_found_with_its_confidence() {
    let fp = stored(submit_button());
    let decision = decide(
        &fp,
        vec![candidate("link", ElementDescriptor::new("A").with_text("Submit"))],
        &HealingConfig::default(),
    );

    assert_eq!(decision.outcome, HealOutcome::NotFound { confidence: 66.7 });
}

#[test]
fn no_candidates_is_not_found_at_zero() {
    let decision = decide(&stored(submit_button()), Vec::new(), &HealingConfig::default());
    assert_eq!(decision.outcome, HealOutcome::NotFound { confidence: 0.0 });
    assert!(decision.ranked.is_empty());
}

#[test]
fn all_zero_scores_is_not_found_not_ambiguous() {
    let decision = decide(
        &stored(submit_button()),
        vec![
            candidate("a", ElementDescriptor::new("DIV")),
            candidate("b", ElementDescriptor::new("SPAN")),
        ],
        &HealingConfig::default(),
    );
    assert_eq!(decision.outcome, HealOutcome::NotFound { confidence: 0.0 });
}

#[test]
fn outcome_converts_to_failure_taxonomy() {
    let ambiguous = HealOutcome::Ambiguous {
        tie_count: 2,
        confidence: 100.0,
    };
    assert!(matches!(
        ambiguous.into_result(),
        Err(HealError::Ambiguous { tie_count: 2, .. })
    ));
    assert!(matches!(
        HealOutcome::NoFingerprint.into_result(),
        Err(HealError::NoFingerprint)
    ));

    let healed = HealOutcome::Healed {
        selector: "#x".to_string(),
        confidence: 91.5,
        matched_id: "x".to_string(),
    }
    .into_result()
    .unwrap();
    assert_eq!(healed.selector, "#x");
    assert_eq!(healed.confidence, 91.5);
}

// =========================================================================
// Engine: learn then heal
// =========================================================================

#[tokio::test]
async fn heals_renamed_button_in_fixture() {
    let engine = memory_engine();
    let learned = engine
        .learn(
            PAGE,
            "submit-button",
            ElementDescriptor::new("BUTTON")
                .with_text("Submit")
                .with_classes(["btn", "btn-primary"])
                .with_input_type("submit"),
        )
        .await
        .unwrap();
    assert!(learned.history.is_empty());

    let outcome = engine
        .heal(PAGE, "submit-button", &fixture("healing-page-broken.html"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        HealOutcome::Healed {
            selector: "#new-submit-button-id".to_string(),
            confidence: 100.0,
            matched_id: "new-submit-button-id".to_string(),
        }
    );

    let moved = engine.fingerprints(PAGE).await.unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].id, "new-submit-button-id");
    assert_eq!(moved[0].history, vec!["submit-button".to_string()]);
}

#[tokio::test]
async fn duplicated_button_in_fixture_is_ambiguous_and_not_rekeyed() {
    let engine = memory_engine();
    engine
        .learn(
            PAGE,
            "submit-button",
            ElementDescriptor::new("BUTTON")
                .with_text("Submit")
                .with_classes(["btn", "btn-primary"]),
        )
        .await
        .unwrap();

    let outcome = engine
        .heal(PAGE, "submit-button", &fixture("healing-page-ambiguous.html"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        HealOutcome::Ambiguous {
            tie_count: 2,
            confidence: 100.0,
        }
    );

    let ids: Vec<String> = engine
        .fingerprints(PAGE)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(ids, vec!["submit-button".to_string()]);
}

#[tokio::test]
async fn heal_without_fingerprint_reports_no_fingerprint() {
    let engine = memory_engine();
    let outcome = engine
        .heal(PAGE, "never-learned", &button("x", "Submit"))
        .await
        .unwrap();
    assert_eq!(outcome, HealOutcome::NoFingerprint);
}

#[tokio::test]
async fn heal_on_page_without_identifiers_is_not_found() {
    let engine = memory_engine();
    engine.learn(PAGE, "old", submit_button()).await.unwrap();

    let outcome = engine
        .heal(PAGE, "old", "<div><button>Submit</button></div>")
        .await
        .unwrap();
    assert_eq!(outcome, HealOutcome::NotFound { confidence: 0.0 });
}

#[tokio::test]
async fn rekey_is_recorded_once_and_old_id_is_gone() {
    let engine = memory_engine();
    engine.learn(PAGE, "old", submit_button()).await.unwrap();

    let markup = button("new", "Submit");
    let first = engine.heal(PAGE, "old", &markup).await.unwrap();
    assert!(first.is_healed());

    // The old id no longer has a fingerprint
    let again = engine.heal(PAGE, "old", &markup).await.unwrap();
    assert_eq!(again, HealOutcome::NoFingerprint);

    // Healing the new id against itself refreshes without touching history
    let refreshed = engine.heal(PAGE, "new", &markup).await.unwrap();
    assert!(refreshed.is_healed());

    let all = engine.fingerprints(PAGE).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, "new");
    assert_eq!(all[0].history, vec!["old".to_string()]);
}

#[tokio::test]
async fn failed_heal_leaves_store_untouched() {
    let engine = memory_engine();
    let before = engine.learn(PAGE, "old", submit_button()).await.unwrap();

    let outcome = engine
        .heal(PAGE, "old", &button("link", "Something else entirely"))
        .await
        .unwrap();
    assert!(matches!(outcome, HealOutcome::NotFound { .. }));

    let after = engine.fingerprints(PAGE).await.unwrap();
    assert_eq!(after, vec![before]);
}

#[tokio::test]
async fn heal_refreshes_descriptor_from_the_live_element() {
    let engine = memory_engine();
    engine
        .learn(PAGE, "old", ElementDescriptor::new("BUTTON").with_text("Submit order"))
        .await
        .unwrap();

    let outcome = engine
        .heal(
            PAGE,
            "old",
            "<button id=\"new\" class=\"cta\">Submit orders</button>",
        )
        .await
        .unwrap();
    assert!(outcome.is_healed());

    let all = engine.fingerprints(PAGE).await.unwrap();
    assert_eq!(all[0].descriptor.inner_text.as_deref(), Some("Submit orders"));
    assert!(all[0].descriptor.class_names.contains("cta"));
}

#[tokio::test]
async fn failed_commit_keeps_the_old_record_for_a_retry() {
    let repository = Arc::new(FlakyRepository::default());
    let engine = HealingEngine::new(repository.clone(), HealingConfig::default());
    let before = engine.learn(PAGE, "old", submit_button()).await.unwrap();

    let markup = "<button id=\"new\" class=\"cta\">Submit</button>";
    repository.fail_writes.store(true, Ordering::SeqCst);

    let err = engine.heal(PAGE, "old", markup).await.unwrap_err();
    assert!(matches!(err, HealError::RepositoryUnavailable(_)));
    assert_eq!(engine.fingerprints(PAGE).await.unwrap(), vec![before]);

    repository.fail_writes.store(false, Ordering::SeqCst);

    let retried = engine.heal(PAGE, "old", markup).await.unwrap();
    assert!(retried.is_healed());

    let all = engine.fingerprints(PAGE).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, "new");
    assert_eq!(all[0].history, vec!["old".to_string()]);
    assert!(all[0].descriptor.class_names.contains("cta"));
}

#[tokio::test]
async fn relearn_keeps_history() {
    let engine = memory_engine();
    engine.learn(PAGE, "old", submit_button()).await.unwrap();
    engine
        .heal(PAGE, "old", &button("new", "Submit"))
        .await
        .unwrap();

    let relearned = engine
        .learn(PAGE, "new", ElementDescriptor::new("BUTTON").with_text("Send"))
        .await
        .unwrap();

    assert_eq!(relearned.history, vec!["old".to_string()]);
    assert_eq!(relearned.descriptor.inner_text.as_deref(), Some("Send"));
}

#[tokio::test]
async fn pages_are_isolated() {
    let engine = memory_engine();
    engine
        .learn("example.com_/a", "submit", submit_button())
        .await
        .unwrap();

    let outcome = engine
        .heal("example.com_/b", "submit", &button("new", "Submit"))
        .await
        .unwrap();
    assert_eq!(outcome, HealOutcome::NoFingerprint);
    assert!(engine.fingerprints("example.com_/b").await.unwrap().is_empty());
}

#[tokio::test]
async fn custom_threshold_allows_weaker_matches() {
    let engine = memory_engine_with(HealingConfig {
        threshold: 60.0,
        ..HealingConfig::default()
    });
    assert_eq!(engine.config().threshold, 60.0);
    engine.learn(PAGE, "old", submit_button()).await.unwrap();

    let outcome = engine
        .heal(PAGE, "old", "<a id=\"link\">Submit</a>")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        HealOutcome::Healed {
            selector: "#link".to_string(),
            confidence: 66.7,
            matched_id: "link".to_string(),
        }
    );
}

#[tokio::test]
async fn missing_fields_are_bad_requests() {
    let engine = memory_engine();

    let err = engine.learn("", "id", submit_button()).await.unwrap_err();
    assert!(matches!(err, HealError::BadRequest(_)));

    let err = engine
        .learn(PAGE, "id", ElementDescriptor::new(" "))
        .await
        .unwrap_err();
    assert!(matches!(err, HealError::BadRequest(ref m) if m.contains("tagName")));

    let err = engine.heal(PAGE, "id", "").await.unwrap_err();
    assert!(matches!(err, HealError::BadRequest(ref m) if m.contains("domSnapshot")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_learns_on_distinct_ids_all_land() {
    let repository = Arc::new(MemoryRepository::new());
    let engine = Arc::new(HealingEngine::new(
        repository.clone(),
        HealingConfig::default(),
    ));

    let mut handles = Vec::new();
    for i in 0..32 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .learn(PAGE, &format!("field-{}", i), submit_button())
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(repository.list(PAGE).unwrap().len(), 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_heals_of_one_id_rekey_once() {
    let engine = Arc::new(memory_engine());
    engine.learn(PAGE, "old", submit_button()).await.unwrap();

    let markup = Arc::new(button("new", "Submit"));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let markup = markup.clone();
        handles.push(tokio::spawn(async move { engine.heal(PAGE, "old", &markup).await }));
    }

    let mut healed = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            HealOutcome::Healed { .. } => healed += 1,
            HealOutcome::NoFingerprint => {}
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    assert_eq!(healed, 1);
    let all = engine.fingerprints(PAGE).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].history, vec!["old".to_string()]);
}
