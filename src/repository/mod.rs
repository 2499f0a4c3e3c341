//! Keyed fingerprint storage, partitioned by page key.
//!
//! The healing engine only talks to [`FingerprintRepository`]; backends decide
//! where records live. Upsert and rekey rules are shared by every backend
//! through [`upsert_entry`] and [`rekey_entry`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;

use crate::fingerprint::fingerprint_model::Fingerprint;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileRepository;
pub use memory::MemoryRepository;

/// Fingerprints of one page, keyed by element id.
pub type PageEntries = BTreeMap<String, Fingerprint>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("no fingerprint stored for '{id}' on page '{page_key}'")]
    MissingFingerprint { page_key: String, id: String },

    #[error("fingerprint storage I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stored fingerprints at {} are corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("fingerprint storage lock poisoned")]
    Poisoned,

    #[error("fingerprint storage task failed: {0}")]
    Task(String),
}

/// Storage contract used by the healing engine.
///
/// Each call is atomic with respect to other calls on the same page.
/// Serializing multi-step sequences (heal then rekey) is the engine's job.
pub trait FingerprintRepository: Send + Sync {
    fn get(&self, page_key: &str, id: &str) -> Result<Option<Fingerprint>, RepositoryError>;

    /// Upsert. Keeps the stored `history`, refreshes `last_seen_at`, and
    /// replaces the descriptive fields with the new observation.
    fn put(
        &self,
        page_key: &str,
        id: &str,
        fingerprint: Fingerprint,
    ) -> Result<Fingerprint, RepositoryError>;

    /// Move the record at `old_id` to `new_id` in a single write: `old_id` is
    /// appended to its history and the descriptive fields are replaced by
    /// `observed`. With `old_id == new_id` the record is refreshed in place.
    /// Fails with `MissingFingerprint`, changing nothing, when `old_id` is
    /// unknown.
    fn rekey(
        &self,
        page_key: &str,
        old_id: &str,
        new_id: &str,
        observed: Fingerprint,
    ) -> Result<Fingerprint, RepositoryError>;

    /// All fingerprints stored for a page, ordered by id.
    fn list(&self, page_key: &str) -> Result<Vec<Fingerprint>, RepositoryError>;
}

pub fn upsert_entry(entries: &mut PageEntries, id: &str, mut fingerprint: Fingerprint) -> Fingerprint {
    fingerprint.id = id.to_string();
    fingerprint.last_seen_at = Utc::now();

    if let Some(existing) = entries.get(id) {
        fingerprint.history = existing.history.clone();
    }

    entries.insert(id.to_string(), fingerprint.clone());
    fingerprint
}

pub fn rekey_entry(
    entries: &mut PageEntries,
    page_key: &str,
    old_id: &str,
    new_id: &str,
    observed: Fingerprint,
) -> Result<Fingerprint, RepositoryError> {
    let previous = entries
        .remove(old_id)
        .ok_or_else(|| RepositoryError::MissingFingerprint {
            page_key: page_key.to_string(),
            id: old_id.to_string(),
        })?;

    let mut history = previous.history;
    if old_id != new_id {
        history.push(old_id.to_string());
    }

    let record = Fingerprint {
        id: new_id.to_string(),
        descriptor: observed.descriptor,
        last_seen_at: Utc::now(),
        history,
    };

    entries.insert(new_id.to_string(), record.clone());
    Ok(record)
}
