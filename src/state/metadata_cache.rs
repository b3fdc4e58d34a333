// DANS : src/state/metadata_cache.rs

use crate::models::TokenMetadataRecord;
use solana_sdk::pubkey::Pubkey;
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    inserted_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_valid(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

/// Cache des métadonnées par mint, avec TTL.
///
/// L'absence est mise en cache au même titre qu'un résultat : un mint sans
/// métadonnées (ou aux métadonnées illisibles) n'est pas re-résolu avant
/// l'expiration de l'entrée. Instancié par le propriétaire du cycle de
/// rafraîchissement, jamais global.
pub struct MetadataCache {
    entries: Mutex<HashMap<Pubkey, CacheEntry<Option<TokenMetadataRecord>>>>,
    ttl: Duration,
}

impl MetadataCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// `None` : rien de frais en cache. `Some(None)` : absence mise en cache.
    /// Une entrée expirée est retirée au passage.
    pub fn get(&self, mint: &Pubkey) -> Option<Option<TokenMetadataRecord>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(mint) {
            Some(entry) if entry.is_valid(self.ttl) => Some(entry.data.clone()),
            Some(_) => {
                entries.remove(mint);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, mint: Pubkey, data: Option<TokenMetadataRecord>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(mint, CacheEntry { data, inserted_at: Instant::now() });
    }

    /// Retire les entrées expirées ; renvoie le nombre d'entrées restantes.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.is_valid(self.ttl));
        entries.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
