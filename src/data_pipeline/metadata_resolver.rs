// src/data_pipeline/metadata_resolver.rs

use crate::data_pipeline::api_connectors::offchain_document::DocumentFetcher;
use crate::decoders::metadata::{DecodedMetadata, decode_metadata};
use crate::derivation::{self, TOKEN_METADATA_PROGRAM_ID};
use crate::error::LaunchpadResult;
use crate::models::TokenMetadataRecord;
use crate::monitoring::metrics;
use crate::rpc::ledger::{LedgerReader, fetch_accounts_chunked};
use crate::state::MetadataCache;
use futures_util::{StreamExt, stream};
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

const IMAGE_EXTENSIONS: [&str; 6] = [".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

/// Résout les métadonnées d'affichage d'un mint : cache, puis compte Metaplex
/// on-chain, puis document hors-chaîne.
pub struct MetadataResolver {
    ledger: Arc<dyn LedgerReader>,
    documents: Arc<dyn DocumentFetcher>,
    cache: Arc<MetadataCache>,
    batch_size: usize,
    concurrency: usize,
}

impl MetadataResolver {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        documents: Arc<dyn DocumentFetcher>,
        cache: Arc<MetadataCache>,
        batch_size: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            ledger,
            documents,
            cache,
            batch_size: batch_size.clamp(1, 100),
            concurrency: concurrency.max(1),
        }
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub async fn resolve(&self, mint: &Pubkey) -> LaunchpadResult<Option<TokenMetadataRecord>> {
        let mut resolved = self.resolve_many(std::slice::from_ref(mint)).await?;
        Ok(resolved.remove(mint).flatten())
    }

    /// Variante par lot. Les comptes sont lus par paquets de `batch_size`, les
    /// documents avec au plus `concurrency` requêtes en vol.
    ///
    /// Une erreur réseau sur la lecture des comptes remonte et rien n'est mis en
    /// cache. Un compte absent ou illisible est mis en cache comme "absent".
    pub async fn resolve_many(&self, mints: &[Pubkey]) -> LaunchpadResult<HashMap<Pubkey, Option<TokenMetadataRecord>>> {
        // Une passe de purge par lot : le cache ne grossit pas au fil des cycles.
        let cached = self.cache.purge_expired();
        debug!(cached, "[Metadata] Entrées expirées purgées.");

        let mut results = HashMap::with_capacity(mints.len());
        let mut pending: HashMap<Pubkey, Pubkey> = HashMap::new(); // adresse metadata -> mint
        let mut seen = HashSet::new();

        for mint in mints {
            if !seen.insert(*mint) {
                continue;
            }
            if let Some(cached) = self.cache.get(mint) {
                metrics::METADATA_CACHE_HITS.inc();
                results.insert(*mint, cached);
                continue;
            }
            metrics::METADATA_CACHE_MISSES.inc();
            match derivation::metadata_record(mint) {
                Ok(derived) => {
                    pending.insert(derived.address, *mint);
                }
                Err(e) => {
                    warn!(mint = %mint, error = %e, "[Metadata] Adresse de métadonnées non dérivable.");
                    self.cache.put(*mint, None);
                    results.insert(*mint, None);
                }
            }
        }

        if pending.is_empty() {
            return Ok(results);
        }

        let addresses: Vec<Pubkey> = pending.keys().copied().collect();
        let accounts = fetch_accounts_chunked(self.ledger.as_ref(), &addresses, self.batch_size).await?;

        let mut decoded: Vec<(Pubkey, DecodedMetadata)> = Vec::new();
        for (address, mint) in &pending {
            let record = accounts
                .get(address)
                .filter(|account| account.owner == TOKEN_METADATA_PROGRAM_ID)
                .and_then(|account| decode_metadata(address, &account.data))
                .filter(|metadata| metadata.mint == *mint);
            match record {
                Some(metadata) => decoded.push((*mint, metadata)),
                None => {
                    debug!(mint = %mint, "[Metadata] Aucune métadonnée exploitable, absence mise en cache.");
                    self.cache.put(*mint, None);
                    results.insert(*mint, None);
                }
            }
        }

        let completed: Vec<(Pubkey, TokenMetadataRecord)> = stream::iter(decoded)
            .map(|(mint, metadata)| async move { (mint, self.complete(metadata).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        info!(requested = mints.len(), resolved = completed.len(), "[Metadata] Lot résolu.");
        for (mint, record) in completed {
            self.cache.put(mint, Some(record.clone()));
            results.insert(mint, Some(record));
        }
        Ok(results)
    }

    /// Ajoute image et description depuis le document hors-chaîne.
    /// Un échec du document laisse ces champs vides sans invalider le reste.
    async fn complete(&self, metadata: DecodedMetadata) -> TokenMetadataRecord {
        let mut record = TokenMetadataRecord {
            name: metadata.name,
            symbol: metadata.symbol,
            uri: metadata.uri,
            image_uri: None,
            description: None,
        };
        if record.uri.is_empty() {
            return record;
        }
        if is_image_uri(&record.uri) {
            record.image_uri = Some(record.uri.clone());
            return record;
        }
        match self.documents.fetch(&record.uri).await {
            Ok(document) => {
                record.image_uri = document.image.filter(|image| !image.is_empty());
                record.description = document.description.filter(|d| !d.is_empty());
            }
            Err(e) => {
                debug!(mint = %metadata.mint, error = %e, "[Metadata] Document hors-chaîne indisponible.");
            }
        }
        record
    }
}

fn is_image_uri(uri: &str) -> bool {
    let lower = uri.to_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_pipeline::api_connectors::offchain_document::fakes::FakeDocuments;
    use crate::decoders::metadata::encode_metadata_fixture;
    use crate::rpc::ledger::fakes::FakeLedger;
    use std::time::Duration;

    struct Harness {
        ledger: Arc<FakeLedger>,
        documents: Arc<FakeDocuments>,
        resolver: MetadataResolver,
    }

    fn harness(batch_size: usize) -> Harness {
        let ledger = Arc::new(FakeLedger::default());
        let documents = Arc::new(FakeDocuments::default());
        let cache = Arc::new(MetadataCache::new(Duration::from_secs(1800)));
        let resolver = MetadataResolver::new(ledger.clone(), documents.clone(), cache, batch_size, 10);
        Harness { ledger, documents, resolver }
    }

    fn insert_metadata(ledger: &FakeLedger, mint: &Pubkey, data: Vec<u8>) {
        let address = derivation::metadata_record(mint).unwrap().address;
        ledger.insert(address, TOKEN_METADATA_PROGRAM_ID, data);
    }

    #[tokio::test]
    async fn resolves_name_symbol_and_image() {
        let h = harness(100);
        let mint = Pubkey::new_unique();
        insert_metadata(&h.ledger, &mint, encode_metadata_fixture(&mint, "Cat", "CAT", "https://x/cat.json"));
        h.documents.insert("https://x/cat.json", "https://x/cat.png", "a cat");

        let record = h.resolver.resolve(&mint).await.unwrap().unwrap();
        assert_eq!(record.name, "Cat");
        assert_eq!(record.symbol, "CAT");
        assert_eq!(record.image_uri.as_deref(), Some("https://x/cat.png"));
        assert_eq!(record.description.as_deref(), Some("a cat"));
    }

    #[tokio::test]
    async fn oversized_name_is_absent_and_cached() {
        let h = harness(100);
        let mint = Pubkey::new_unique();
        let mut data = encode_metadata_fixture(&mint, "name", "SYM", "https://x/m.json");
        data[65..69].copy_from_slice(&60_000u32.to_le_bytes());
        insert_metadata(&h.ledger, &mint, data);

        assert_eq!(h.resolver.resolve(&mint).await.unwrap(), None);
        assert_eq!(h.ledger.multiple_calls(), 1);

        assert_eq!(h.resolver.resolve(&mint).await.unwrap(), None);
        assert_eq!(h.ledger.multiple_calls(), 1);
        assert_eq!(h.documents.calls(), 0);
    }

    #[tokio::test]
    async fn failed_document_still_caches_onchain_fields() {
        let h = harness(100);
        let mint = Pubkey::new_unique();
        insert_metadata(&h.ledger, &mint, encode_metadata_fixture(&mint, "Dog", "DOG", "https://x/missing.json"));

        let record = h.resolver.resolve(&mint).await.unwrap().unwrap();
        assert_eq!(record.name, "Dog");
        assert_eq!(record.image_uri, None);

        h.resolver.resolve(&mint).await.unwrap();
        assert_eq!(h.documents.calls(), 1);
    }

    #[tokio::test]
    async fn image_uri_is_used_directly() {
        let h = harness(100);
        let mint = Pubkey::new_unique();
        insert_metadata(&h.ledger, &mint, encode_metadata_fixture(&mint, "Pic", "PIC", "https://x/pic.PNG?v=2"));
        let record = h.resolver.resolve(&mint).await.unwrap().unwrap();
        assert_eq!(record.image_uri.as_deref(), Some("https://x/pic.PNG?v=2"));
        assert_eq!(h.documents.calls(), 0);
    }

    #[tokio::test]
    async fn batches_account_reads() {
        let h = harness(100);
        let mints: Vec<Pubkey> = (0..250).map(|_| Pubkey::new_unique()).collect();
        for mint in &mints[..10] {
            insert_metadata(&h.ledger, mint, encode_metadata_fixture(mint, "T", "T", ""));
        }

        let resolved = h.resolver.resolve_many(&mints).await.unwrap();
        assert_eq!(resolved.len(), 250);
        assert_eq!(resolved.values().filter(|r| r.is_some()).count(), 10);
        assert_eq!(h.ledger.multiple_calls(), 3);

        h.resolver.resolve_many(&mints).await.unwrap();
        assert_eq!(h.ledger.multiple_calls(), 3);
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_at_the_next_batch() {
        let ledger = Arc::new(FakeLedger::default());
        let cache = Arc::new(MetadataCache::new(Duration::from_millis(30)));
        let resolver = MetadataResolver::new(ledger, Arc::new(FakeDocuments::default()), cache.clone(), 100, 4);

        let stale: Vec<Pubkey> = (0..5).map(|_| Pubkey::new_unique()).collect();
        resolver.resolve_many(&stale).await.unwrap();
        assert_eq!(cache.len(), 5);

        tokio::time::sleep(Duration::from_millis(40)).await;
        resolver.resolve_many(&[Pubkey::new_unique()]).await.unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn mismatched_mint_in_record_is_absent() {
        let h = harness(100);
        let mint = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        insert_metadata(&h.ledger, &mint, encode_metadata_fixture(&other, "X", "X", ""));
        assert_eq!(h.resolver.resolve(&mint).await.unwrap(), None);
    }
}
