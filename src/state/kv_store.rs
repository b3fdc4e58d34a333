// DANS : src/state/kv_store.rs

use crate::error::{LaunchpadError, LaunchpadResult};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tracing::{debug, warn};

/// Le stockage local vu comme un simple magasin de blobs.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> LaunchpadResult<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> LaunchpadResult<()>;
    fn remove(&self, key: &str) -> LaunchpadResult<()>;
}

// --- EN MÉMOIRE ---

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> LaunchpadResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> LaunchpadResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> LaunchpadResult<()> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
        Ok(())
    }
}

// --- FICHIER JSON ---

/// Un fichier JSON `{ clé: base64(valeur) }`, réécrit entièrement à chaque
/// modification (écriture dans un fichier temporaire puis renommage).
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> LaunchpadResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| LaunchpadError::Storage(format!("lecture de {}: {e}", self.path.display())))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            LaunchpadError::Storage(format!("{} n'est pas un magasin valide: {e}", self.path.display()))
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> LaunchpadResult<()> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| LaunchpadError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| LaunchpadError::Storage(format!("écriture de {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), keys = entries.len(), "[Store] Magasin sauvegardé.");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> LaunchpadResult<Option<Vec<u8>>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = self.read_all()?;
        match entries.get(key) {
            None => Ok(None),
            Some(encoded) => match STANDARD.decode(encoded) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) => {
                    warn!(key, error = %e, "[Store] Valeur non décodable, traitée comme absente.");
                    Ok(None)
                }
            },
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> LaunchpadResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), STANDARD.encode(value));
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> LaunchpadResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}
