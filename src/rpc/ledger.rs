// src/rpc/ledger.rs

use crate::error::LaunchpadResult;
use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use std::collections::HashMap;

/// Un compte brut tel que renvoyé par le ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAccount {
    pub address: Pubkey,
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub failed: bool,
}

/// Une transaction confirmée, réduite à ce que l'historique d'un pool affiche.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSummary {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub failed: bool,
    pub logs: Vec<String>,
    /// (programme appelé, données de l'instruction), dans l'ordre.
    pub instructions: Vec<(Pubkey, Vec<u8>)>,
}

/// Les appels de lecture. Toutes les implémentations "réseau" passent par
/// la couche résiliente (backoff + rotation d'endpoint).
#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn get_account(&self, address: &Pubkey) -> LaunchpadResult<Option<RawAccount>>;

    /// Un seul appel pour plusieurs comptes (max 100 côté nœud).
    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> LaunchpadResult<Vec<Option<RawAccount>>>;

    /// Tous les comptes d'un programme, filtrés optionnellement par taille exacte.
    async fn get_program_accounts(&self, program_id: &Pubkey, data_size: Option<u64>) -> LaunchpadResult<Vec<RawAccount>>;

    /// Signatures récentes, de la plus récente à la plus ancienne.
    async fn get_signatures_for_address(&self, address: &Pubkey, limit: usize) -> LaunchpadResult<Vec<SignatureInfo>>;

    async fn get_transaction(&self, signature: &Signature) -> LaunchpadResult<Option<TransactionSummary>>;
}

/// Les appels d'écriture. `send_transaction` n'est JAMAIS ré-essayé.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Lecture : ré-essayée comme les autres.
    async fn get_latest_blockhash(&self) -> LaunchpadResult<Hash>;

    async fn send_transaction(&self, transaction: &Transaction) -> LaunchpadResult<Signature>;

    /// Attend la confirmation d'une signature au niveau d'engagement demandé.
    async fn confirm_transaction(&self, signature: &Signature, commitment: CommitmentConfig) -> LaunchpadResult<()>;
}

/// Récupère des comptes par lots de `batch_size` et les indexe par adresse.
/// Les comptes inexistants sont simplement absents de la map.
pub async fn fetch_accounts_chunked(
    ledger: &dyn LedgerReader,
    addresses: &[Pubkey],
    batch_size: usize,
) -> LaunchpadResult<HashMap<Pubkey, RawAccount>> {
    let mut found = HashMap::with_capacity(addresses.len());
    for chunk in addresses.chunks(batch_size.max(1)) {
        let accounts = ledger.get_multiple_accounts(chunk).await?;
        for (address, account) in chunk.iter().zip(accounts) {
            if let Some(account) = account {
                found.insert(*address, account);
            }
        }
    }
    Ok(found)
}
