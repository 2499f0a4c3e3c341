#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use selector_healing::{
    ElementDescriptor, HealingConfig, HealingEngine, MemoryRepository,
    snapshot::snapshot_model::{Candidate, ElementSnapshot, TreeContext},
};

pub const PAGE: &str = "localhost_/healing-page.html";

pub fn fixture_path(name: &str) -> PathBuf {
    let base = std::env::current_dir().unwrap();
    base.join("tests").join("fixtures").join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap()
}

pub fn memory_engine() -> HealingEngine {
    memory_engine_with(HealingConfig::default())
}

pub fn memory_engine_with(config: HealingConfig) -> HealingEngine {
    HealingEngine::new(Arc::new(MemoryRepository::new()), config)
}

pub fn submit_button() -> ElementDescriptor {
    ElementDescriptor::new("BUTTON").with_text("Submit")
}

pub fn candidate(id: &str, descriptor: ElementDescriptor) -> Candidate {
    Candidate::from_element(ElementSnapshot {
        id: Some(id.to_string()),
        descriptor,
        context: TreeContext::default(),
    })
    .unwrap()
}

/// Descriptor with all six attributes set.
pub fn full_descriptor() -> ElementDescriptor {
    ElementDescriptor::new("INPUT")
        .with_text("Email address")
        .with_classes(["field", "field-email"])
        .with_placeholder("you@example.com")
        .with_input_type("email")
        .with_aria_label("Email")
}
