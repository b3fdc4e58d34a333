// DANS : src/state/drafts.rs

use crate::error::{LaunchpadError, LaunchpadResult};
use crate::models::DraftPoolRecord;
use crate::state::kv_store::KeyValueStore;
use solana_sdk::pubkey::Pubkey;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

pub const DRAFTS_KEY: &str = "launchpad:draft_pools";

/// Les brouillons de pools, persistés sous une seule clé du magasin local.
///
/// Chaque modification (lecture, changement, écriture) se fait sous un verrou
/// partagé par tous les clones : un cycle de rafraîchissement ne peut pas
/// réécrire une liste périmée par-dessus un brouillon qui vient d'être ajouté.
#[derive(Clone)]
pub struct DraftStore {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl DraftStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, write_lock: Arc::new(Mutex::new(())) }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Un contenu illisible est ignoré (journalisé) plutôt que de bloquer le scan.
    pub fn load(&self) -> LaunchpadResult<Vec<DraftPoolRecord>> {
        let Some(bytes) = self.store.get(DRAFTS_KEY)? else {
            return Ok(vec![]);
        };
        match serde_json::from_slice(&bytes) {
            Ok(drafts) => Ok(drafts),
            Err(e) => {
                warn!(error = %e, "[Drafts] Brouillons illisibles, ignorés.");
                Ok(vec![])
            }
        }
    }

    pub fn save(&self, drafts: &[DraftPoolRecord]) -> LaunchpadResult<()> {
        let _guard = self.lock();
        self.write(drafts)
    }

    fn write(&self, drafts: &[DraftPoolRecord]) -> LaunchpadResult<()> {
        let bytes = serde_json::to_vec(drafts).map_err(|e| LaunchpadError::Storage(e.to_string()))?;
        self.store.set(DRAFTS_KEY, &bytes)
    }

    /// Ajoute un brouillon ; un brouillon de même identité est remplacé.
    pub fn add(&self, draft: DraftPoolRecord) -> LaunchpadResult<()> {
        let _guard = self.lock();
        let mut drafts = self.load()?;
        let identity = draft.identity();
        drafts.retain(|existing| existing.identity() != identity);
        info!(identity = %identity, name = %draft.name, "[Drafts] Brouillon enregistré.");
        drafts.push(draft);
        self.write(&drafts)
    }

    /// Suppression explicite par l'utilisateur. Accepte l'adresse du pool ou le mint échangé.
    /// Renvoie le nombre de brouillons retirés.
    pub fn remove(&self, key: &Pubkey) -> LaunchpadResult<usize> {
        let _guard = self.lock();
        let mut drafts = self.load()?;
        let before = drafts.len();
        drafts.retain(|d| d.pool_address.as_ref() != Some(key) && d.traded_mint != *key);
        let removed = before - drafts.len();
        if removed > 0 {
            self.write(&drafts)?;
            info!(key = %key, removed, "[Drafts] Brouillon supprimé.");
        }
        Ok(removed)
    }

    /// Marque comme remplacés les brouillons dont l'identité figure dans `identities`.
    /// Ils restent stockés.
    pub fn mark_superseded(&self, identities: &[Pubkey]) -> LaunchpadResult<usize> {
        let _guard = self.lock();
        let mut drafts = self.load()?;
        let mut changed = 0;
        for draft in drafts.iter_mut() {
            if !draft.superseded && identities.contains(&draft.identity()) {
                draft.superseded = true;
                changed += 1;
            }
        }
        if changed > 0 {
            self.write(&drafts)?;
        }
        Ok(changed)
    }
}

#[cfg(test)]
pub(crate) fn draft_fixture(pool_address: Option<Pubkey>, traded_mint: Pubkey, name: &str, created_at: i64) -> DraftPoolRecord {
    DraftPoolRecord {
        pool_address,
        traded_mint,
        quote_mint: crate::derivation::WSOL_MINT,
        name: name.to_string(),
        symbol: name.to_uppercase(),
        description: Some(format!("{name} description")),
        image_uri: None,
        creator: Pubkey::new_unique(),
        signature: None,
        created_at,
        superseded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::kv_store::MemoryStore;

    fn store() -> DraftStore {
        DraftStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn add_replaces_same_identity() {
        let drafts = store();
        let mint = Pubkey::new_unique();
        drafts.add(draft_fixture(None, mint, "first", 1)).unwrap();
        drafts.add(draft_fixture(None, mint, "second", 2)).unwrap();
        drafts.add(draft_fixture(None, Pubkey::new_unique(), "other", 3)).unwrap();

        let loaded = drafts.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().any(|d| d.name == "second"));
    }

    #[test]
    fn superseded_drafts_are_kept_until_removed() {
        let drafts = store();
        let pool = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        drafts.add(draft_fixture(Some(pool), mint, "cat", 1)).unwrap();

        assert_eq!(drafts.mark_superseded(&[pool]).unwrap(), 1);
        assert_eq!(drafts.mark_superseded(&[pool]).unwrap(), 0);
        let loaded = drafts.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].superseded);

        assert_eq!(drafts.remove(&mint).unwrap(), 1);
        assert!(drafts.load().unwrap().is_empty());
    }

    /// Magasin dont la lecture est lente, pour élargir la fenêtre entre load et save.
    struct SlowStore {
        inner: MemoryStore,
        delay: std::time::Duration,
    }

    impl KeyValueStore for SlowStore {
        fn get(&self, key: &str) -> LaunchpadResult<Option<Vec<u8>>> {
            std::thread::sleep(self.delay);
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8]) -> LaunchpadResult<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> LaunchpadResult<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn concurrent_add_and_supersede_keep_both_changes() {
        let slow = Arc::new(SlowStore { inner: MemoryStore::new(), delay: std::time::Duration::from_millis(50) });
        let drafts = DraftStore::new(slow);
        let pool_a = Pubkey::new_unique();
        drafts.add(draft_fixture(Some(pool_a), Pubkey::new_unique(), "a", 1)).unwrap();

        let adder = {
            let drafts = drafts.clone();
            std::thread::spawn(move || drafts.add(draft_fixture(None, Pubkey::new_unique(), "b", 2)).unwrap())
        };
        std::thread::sleep(std::time::Duration::from_millis(10));
        let marker = {
            let drafts = drafts.clone();
            std::thread::spawn(move || drafts.mark_superseded(&[pool_a]).unwrap())
        };
        adder.join().unwrap();
        assert_eq!(marker.join().unwrap(), 1);

        let mut names: Vec<_> = drafts.load().unwrap().into_iter().map(|d| (d.name, d.superseded)).collect();
        names.sort();
        assert_eq!(names, vec![("a".to_string(), true), ("b".to_string(), false)]);
    }

    #[test]
    fn unreadable_blob_loads_as_empty() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(DRAFTS_KEY, b"not json").unwrap();
        assert!(DraftStore::new(kv).load().unwrap().is_empty());
    }
}
