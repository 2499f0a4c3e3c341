use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::fingerprint::{fingerprint_model::Fingerprint, page_key::storage_stem};
use crate::repository::{
    FingerprintRepository, PageEntries, RepositoryError, rekey_entry, upsert_entry,
};

/// Prune idle page locks once the table grows past this many pages.
const PRUNE_AT: usize = 1024;

/// One pretty-printed JSON document per page key inside `dir`.
///
/// Writes go through a temp file and a rename, and each page's
/// read-modify-write cycle holds that page's mutex.
pub struct JsonFileRepository {
    dir: PathBuf,
    page_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl JsonFileRepository {
    /// Open (creating if needed) a storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| RepositoryError::Io {
            path: dir.clone(),
            source,
        })?;

        Ok(Self {
            dir,
            page_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn page_path(&self, page_key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", storage_stem(page_key)))
    }

    fn page_lock(&self, page_key: &str) -> Result<Arc<Mutex<()>>, RepositoryError> {
        let mut locks = self.page_locks.lock().map_err(|_| RepositoryError::Poisoned)?;
        if locks.len() > PRUNE_AT {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Ok(locks
            .entry(page_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Number of page keys with a lock entry.
    pub fn tracked_pages(&self) -> usize {
        self.page_locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    fn load(&self, page_key: &str) -> Result<PageEntries, RepositoryError> {
        let path = self.page_path(page_key);

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PageEntries::new()),
            Err(source) => return Err(RepositoryError::Io { path, source }),
        };

        serde_json::from_str(&content).map_err(|source| RepositoryError::Corrupt { path, source })
    }

    fn save(&self, page_key: &str, entries: &PageEntries) -> Result<(), RepositoryError> {
        let path = self.page_path(page_key);
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(entries).map_err(|source| {
            RepositoryError::Corrupt {
                path: path.clone(),
                source,
            }
        })?;

        fs::write(&tmp, json).map_err(|source| RepositoryError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| RepositoryError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(page_key, path = %path.display(), entries = entries.len(), "Saved fingerprints");
        Ok(())
    }

    /// Run a read-modify-write cycle on one page under its lock.
    fn modify<T>(
        &self,
        page_key: &str,
        change: impl FnOnce(&mut PageEntries) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let lock = self.page_lock(page_key)?;
        let _guard = lock.lock().map_err(|_| RepositoryError::Poisoned)?;

        let mut entries = self.load(page_key)?;
        let result = change(&mut entries)?;
        self.save(page_key, &entries)?;
        Ok(result)
    }
}

impl FingerprintRepository for JsonFileRepository {
    fn get(&self, page_key: &str, id: &str) -> Result<Option<Fingerprint>, RepositoryError> {
        let lock = self.page_lock(page_key)?;
        let _guard = lock.lock().map_err(|_| RepositoryError::Poisoned)?;
        Ok(self.load(page_key)?.remove(id))
    }

    fn put(
        &self,
        page_key: &str,
        id: &str,
        fingerprint: Fingerprint,
    ) -> Result<Fingerprint, RepositoryError> {
        self.modify(page_key, |entries| Ok(upsert_entry(entries, id, fingerprint)))
    }

    fn rekey(
        &self,
        page_key: &str,
        old_id: &str,
        new_id: &str,
        observed: Fingerprint,
    ) -> Result<Fingerprint, RepositoryError> {
        self.modify(page_key, |entries| {
            rekey_entry(entries, page_key, old_id, new_id, observed)
        })
    }

    fn list(&self, page_key: &str) -> Result<Vec<Fingerprint>, RepositoryError> {
        let lock = self.page_lock(page_key)?;
        let _guard = lock.lock().map_err(|_| RepositoryError::Poisoned)?;
        Ok(self.load(page_key)?.into_values().collect())
    }
}
