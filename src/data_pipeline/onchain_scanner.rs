// src/data_pipeline/onchain_scanner.rs

use crate::decoders::launchpad::{POOL_ACCOUNT_SIZE, TARGET_CONFIG_ACCOUNT_SIZE};
use crate::decoders::{DecodedAccount, DecodedBoundPool, DecodedTargetConfig, classify_account};
use crate::error::LaunchpadResult;
use crate::rpc::ledger::{LedgerReader, RawAccount};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use tracing::{info, warn};

/// Le résultat d'un scan, après classification.
#[derive(Debug, Default, Clone)]
pub struct ScanOutcome {
    pub pools: Vec<DecodedBoundPool>,
    pub target_configs: HashMap<Pubkey, DecodedTargetConfig>,
    pub skipped: usize,
}

/// Énumère les comptes du programme. Une requête par layout connu, filtrée
/// par taille exacte, pour ne pas rapatrier les autres types de comptes.
pub async fn find_program_accounts(ledger: &dyn LedgerReader, program_id: &Pubkey) -> LaunchpadResult<Vec<RawAccount>> {
    info!(program = %program_id, "[Scanner] Lancement du scan on-chain.");

    let mut accounts = ledger.get_program_accounts(program_id, Some(POOL_ACCOUNT_SIZE as u64)).await?;
    let pool_count = accounts.len();
    accounts.extend(ledger.get_program_accounts(program_id, Some(TARGET_CONFIG_ACCOUNT_SIZE as u64)).await?);

    info!(
        pools = pool_count,
        target_configs = accounts.len() - pool_count,
        "[Scanner] Scan terminé."
    );
    Ok(accounts)
}

/// Classe et décode chaque compte. Un compte illisible est compté puis ignoré.
pub fn classify_program_accounts(accounts: &[RawAccount], program_id: &Pubkey) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    for account in accounts {
        match classify_account(&account.address, &account.owner, &account.data, program_id) {
            DecodedAccount::Pool(pool) => outcome.pools.push(pool),
            DecodedAccount::TargetConfig(config) => {
                outcome.target_configs.insert(config.address, config);
            }
            DecodedAccount::Unknown { .. } => outcome.skipped += 1,
            other => {
                warn!(account = %account.address, kind = ?other, "[Scanner] Compte inattendu pour ce programme.");
                outcome.skipped += 1;
            }
        }
    }
    outcome.pools.sort_by_key(|pool| pool.address);
    outcome
}
