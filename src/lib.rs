//! Selector healing: learn element fingerprints while a UI test suite runs,
//! and find the replacement for an element whose id stopped matching.

pub mod cli;
pub mod client;
pub mod fingerprint;
pub mod healing;
pub mod repository;
pub mod server;
pub mod snapshot;
pub mod trace;

pub use fingerprint::fingerprint_model::{ElementDescriptor, Fingerprint};
pub use healing::{
    engine::HealingEngine,
    error::HealError,
    healing_model::{HealOutcome, HealingConfig, ScoreWeights},
};
pub use repository::{FingerprintRepository, JsonFileRepository, MemoryRepository};
