// src/state/mod.rs

// L'état local du client : cache de métadonnées, magasin clé-valeur,
// brouillons de pools et leur fusion avec l'état on-chain.
pub mod drafts;
pub mod kv_store;
pub mod metadata_cache;
pub mod reconciler;

pub use drafts::DraftStore;
pub use kv_store::{FileStore, KeyValueStore, MemoryStore};
pub use metadata_cache::MetadataCache;
pub use reconciler::{Reconciliation, reconcile};
