// src/data_pipeline/enrichment.rs

use crate::data_pipeline::metadata_resolver::MetadataResolver;
use crate::data_pipeline::onchain_scanner::ScanOutcome;
use crate::decoders::launchpad::decode_target_config;
use crate::decoders::spl_token_decoders::{account::decode_account, mint::decode_mint};
use crate::error::LaunchpadResult;
use crate::models::PoolRecord;
use crate::monitoring::metrics;
use crate::rpc::ledger::{LedgerReader, RawAccount, fetch_accounts_chunked};
use futures_util::{StreamExt, stream};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fenêtre de signatures examinée pour dater un pool.
const CREATION_SIGNATURE_WINDOW: usize = 1000;

/// Transforme les pools décodés en `PoolRecord` complets : soldes réels des
/// vaults, offre du mint, seuil de migration, date de création, métadonnées.
pub struct PoolEnricher {
    ledger: Arc<dyn LedgerReader>,
    resolver: Arc<MetadataResolver>,
    program_id: Pubkey,
    batch_size: usize,
    concurrency: usize,
}

impl PoolEnricher {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        resolver: Arc<MetadataResolver>,
        program_id: Pubkey,
        batch_size: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            ledger,
            resolver,
            program_id,
            batch_size: batch_size.clamp(1, 100),
            concurrency: concurrency.max(1),
        }
    }

    pub async fn enrich(&self, scan: &ScanOutcome) -> LaunchpadResult<Vec<PoolRecord>> {
        // --- 1. Dérivations (une erreur n'exclut que le pool concerné) ---
        let mut records: Vec<PoolRecord> = Vec::with_capacity(scan.pools.len());
        for pool in &scan.pools {
            match pool.to_record(&self.program_id) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(pool = %pool.address, error = %e, "[Enrichment] Pool exclu, dérivation impossible.");
                    metrics::ACCOUNTS_SKIPPED.with_label_values(&["derivation"]).inc();
                }
            }
        }
        if records.is_empty() {
            return Ok(records);
        }

        // --- 2. Une seule passe groupée : vaults, mints, configs manquantes ---
        let mut addresses: Vec<Pubkey> = Vec::with_capacity(records.len() * 4);
        for record in &records {
            addresses.extend([record.traded.vault, record.quote.vault, record.traded.mint]);
            if !scan.target_configs.contains_key(&record.config_record) {
                addresses.push(record.config_record);
            }
        }
        addresses.sort();
        addresses.dedup();
        let accounts = fetch_accounts_chunked(self.ledger.as_ref(), &addresses, self.batch_size).await?;

        for record in records.iter_mut() {
            apply_vault_balances(record, &accounts);
            if let Some(mint) = accounts.get(&record.traded.mint) {
                match decode_mint(&mint.address, &mint.data) {
                    Ok(decoded) => {
                        record.traded_supply = Some(decoded.supply);
                        record.traded_decimals = Some(decoded.decimals);
                    }
                    Err(e) => debug!(mint = %record.traded.mint, error = %e, "[Enrichment] Mint illisible."),
                }
            }
            record.migration_threshold = match scan.target_configs.get(&record.config_record) {
                Some(config) => Some(config.token_target_amount),
                None => accounts
                    .get(&record.config_record)
                    .and_then(|raw| decode_target_config(&raw.address, &raw.data).ok())
                    .map(|config| config.token_target_amount),
            };
        }

        // --- 3. Dates de création ---
        self.attach_creation_times(&mut records).await;

        // --- 4. Métadonnées (un échec global laisse les pools sans métadonnées) ---
        let mints: Vec<Pubkey> = records.iter().map(|r| r.traded.mint).collect();
        match self.resolver.resolve_many(&mints).await {
            Ok(mut resolved) => {
                for record in records.iter_mut() {
                    record.metadata = resolved.remove(&record.traded.mint).flatten();
                }
            }
            Err(e) => warn!(error = %e, "[Enrichment] Résolution des métadonnées échouée pour ce cycle."),
        }

        info!(pools = records.len(), "[Enrichment] Pools hydratés.");
        Ok(records)
    }

    /// La date d'un pool est celle de la plus ancienne signature observée.
    async fn attach_creation_times(&self, records: &mut [PoolRecord]) {
        let ledger = &self.ledger;
        let pools: Vec<Pubkey> = records.iter().map(|r| r.address).collect();
        let times: HashMap<Pubkey, Option<i64>> = stream::iter(pools)
            .map(|pool| async move {
                match ledger.get_signatures_for_address(&pool, CREATION_SIGNATURE_WINDOW).await {
                    Ok(signatures) => (pool, signatures.iter().rev().find_map(|s| s.block_time)),
                    Err(e) => {
                        debug!(pool = %pool, error = %e, "[Enrichment] Signatures indisponibles.");
                        (pool, None)
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for record in records.iter_mut() {
            record.created_at = times.get(&record.address).copied().flatten();
        }
    }
}

/// Remplace les soldes stockés dans le compte du pool par ceux des vaults,
/// quand le vault est lisible et porte bien le mint attendu.
fn apply_vault_balances(record: &mut PoolRecord, accounts: &HashMap<Pubkey, RawAccount>) {
    for reserve in [&mut record.traded, &mut record.quote] {
        let Some(raw) = accounts.get(&reserve.vault) else {
            continue;
        };
        match decode_account(&raw.address, &raw.data) {
            Ok(vault) if vault.mint == reserve.mint => reserve.balance = vault.amount,
            Ok(vault) => warn!(
                vault = %reserve.vault,
                expected_mint = %reserve.mint,
                found_mint = %vault.mint,
                "[Enrichment] Vault au mauvais mint, solde du pool conservé."
            ),
            Err(e) => debug!(vault = %reserve.vault, error = %e, "[Enrichment] Vault illisible."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_pipeline::api_connectors::offchain_document::fakes::FakeDocuments;
    use crate::data_pipeline::onchain_scanner::classify_program_accounts;
    use crate::decoders::launchpad::{POOL_LAYOUT, TARGET_CONFIG_LAYOUT};
    use crate::decoders::layout::LayoutWriter;
    use crate::decoders::metadata::encode_metadata_fixture;
    use crate::decoders::spl_token_decoders::{mint_fixture, token_account_fixture};
    use crate::derivation::{self, LAUNCHPAD_PROGRAM_ID, TOKEN_METADATA_PROGRAM_ID, WSOL_MINT};
    use crate::rpc::ledger::SignatureInfo;
    use crate::rpc::ledger::fakes::FakeLedger;
    use crate::state::MetadataCache;
    use std::time::Duration;

    fn enricher(ledger: Arc<FakeLedger>) -> PoolEnricher {
        let cache = Arc::new(MetadataCache::new(Duration::from_secs(60)));
        let resolver = Arc::new(MetadataResolver::new(ledger.clone(), Arc::new(FakeDocuments::default()), cache, 100, 4));
        PoolEnricher::new(ledger, resolver, LAUNCHPAD_PROGRAM_ID, 100, 4)
    }

    #[tokio::test]
    async fn hydrates_balances_supply_threshold_date_and_metadata() {
        let ledger = Arc::new(FakeLedger::default());
        let program = LAUNCHPAD_PROGRAM_ID;
        let pool = Pubkey::new_unique();
        let meme = Pubkey::new_unique();

        ledger.insert(
            pool,
            program,
            LayoutWriter::new(&POOL_LAYOUT)
                .u64("meme_reserve.tokens", 1)
                .pubkey("meme_reserve.mint", &meme)
                .pubkey("quote_reserve.mint", &WSOL_MINT)
                .finish(),
        );
        let addresses = derivation::pool_addresses(&pool, &meme, &WSOL_MINT, &program).unwrap();
        ledger.insert(addresses.meme_vault, spl_token::id(), token_account_fixture(&meme, &addresses.signer.address, 600_000));
        ledger.insert(addresses.quote_vault, spl_token::id(), token_account_fixture(&WSOL_MINT, &addresses.signer.address, 7_000));
        ledger.insert(meme, spl_token::id(), mint_fixture(6, 1_000_000_000));
        ledger.insert(
            addresses.target_config,
            program,
            LayoutWriter::new(&TARGET_CONFIG_LAYOUT).u64("token_target_amount", 85_000).finish(),
        );
        let metadata_address = derivation::metadata_record(&meme).unwrap().address;
        ledger.insert(metadata_address, TOKEN_METADATA_PROGRAM_ID, encode_metadata_fixture(&meme, "Cat", "CAT", ""));
        ledger.signatures.lock().unwrap().insert(
            pool,
            vec![
                SignatureInfo { signature: "new".into(), slot: 20, block_time: Some(2_000), failed: false },
                SignatureInfo { signature: "old".into(), slot: 10, block_time: Some(1_000), failed: false },
            ],
        );

        // On ne passe que le pool au classement : la config est lue dans la passe groupée.
        let raw = ledger.accounts.lock().unwrap().get(&pool).cloned().unwrap();
        let scan = classify_program_accounts(&[raw], &program);

        let records = enricher(ledger.clone()).enrich(&scan).await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.traded.balance, 600_000);
        assert_eq!(record.quote.balance, 7_000);
        assert_eq!(record.traded_supply, Some(1_000_000_000));
        assert_eq!(record.traded_decimals, Some(6));
        assert_eq!(record.migration_threshold, Some(85_000));
        assert_eq!(record.created_at, Some(1_000));
        assert_eq!(record.metadata.as_ref().map(|m| m.symbol.as_str()), Some("CAT"));
    }

    #[tokio::test]
    async fn vault_with_wrong_mint_keeps_pool_balance() {
        let ledger = Arc::new(FakeLedger::default());
        let pool = Pubkey::new_unique();
        let meme = Pubkey::new_unique();
        let data = LayoutWriter::new(&POOL_LAYOUT)
            .u64("meme_reserve.tokens", 123)
            .pubkey("meme_reserve.mint", &meme)
            .pubkey("quote_reserve.mint", &WSOL_MINT)
            .finish();
        ledger.insert(pool, LAUNCHPAD_PROGRAM_ID, data);
        let addresses = derivation::pool_addresses(&pool, &meme, &WSOL_MINT, &LAUNCHPAD_PROGRAM_ID).unwrap();
        ledger.insert(addresses.meme_vault, spl_token::id(), token_account_fixture(&Pubkey::new_unique(), &pool, 999));

        let raw = ledger.accounts.lock().unwrap().get(&pool).cloned().unwrap();
        let scan = classify_program_accounts(&[raw], &LAUNCHPAD_PROGRAM_ID);
        let records = enricher(ledger).enrich(&scan).await.unwrap();
        assert_eq!(records[0].traded.balance, 123);
        assert_eq!(records[0].created_at, None);
        assert_eq!(records[0].metadata, None);
    }
}
