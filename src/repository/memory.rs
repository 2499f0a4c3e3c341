use std::collections::HashMap;
use std::sync::RwLock;

use crate::fingerprint::fingerprint_model::Fingerprint;
use crate::repository::{
    FingerprintRepository, PageEntries, RepositoryError, rekey_entry, upsert_entry,
};

/// In-process repository. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryRepository {
    pages: RwLock<HashMap<String, PageEntries>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FingerprintRepository for MemoryRepository {
    fn get(&self, page_key: &str, id: &str) -> Result<Option<Fingerprint>, RepositoryError> {
        let pages = self.pages.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(pages.get(page_key).and_then(|page| page.get(id)).cloned())
    }

    fn put(
        &self,
        page_key: &str,
        id: &str,
        fingerprint: Fingerprint,
    ) -> Result<Fingerprint, RepositoryError> {
        let mut pages = self.pages.write().map_err(|_| RepositoryError::Poisoned)?;
        let page = pages.entry(page_key.to_string()).or_default();
        Ok(upsert_entry(page, id, fingerprint))
    }

    fn rekey(
        &self,
        page_key: &str,
        old_id: &str,
        new_id: &str,
        observed: Fingerprint,
    ) -> Result<Fingerprint, RepositoryError> {
        let mut pages = self.pages.write().map_err(|_| RepositoryError::Poisoned)?;
        let page = pages
            .get_mut(page_key)
            .ok_or_else(|| RepositoryError::MissingFingerprint {
                page_key: page_key.to_string(),
                id: old_id.to_string(),
            })?;
        rekey_entry(page, page_key, old_id, new_id, observed)
    }

    fn list(&self, page_key: &str) -> Result<Vec<Fingerprint>, RepositoryError> {
        let pages = self.pages.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(pages
            .get(page_key)
            .map(|page| page.values().cloned().collect())
            .unwrap_or_default())
    }
}
