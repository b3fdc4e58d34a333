// DANS : src/execution/actions.rs

use crate::error::LaunchpadResult;
use crate::execution::instructions::{MetadataArgs, SwapArgs, to_base_units};
use crate::execution::sender::TransactionSubmitter;
use crate::execution::signer::TransactionSigner;
use crate::execution::transaction_builder::{LaunchpadTransactionBuilder, PoolAccounts};
use crate::models::{DraftPoolRecord, unix_now};
use crate::rpc::ledger::LedgerWriter;
use crate::state::DraftStore;
use solana_sdk::{
    commitment_config::CommitmentConfig, instruction::AccountMeta, pubkey::Pubkey, signature::Signature,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Ce que l'utilisateur saisit pour lancer un token.
#[derive(Debug, Clone)]
pub struct CreatePoolRequest {
    pub traded_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub description: Option<String>,
    pub image_uri: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedPool {
    pub pool: Pubkey,
    pub signature: Signature,
}

/// Les actions utilisateur du launchpad. Chaque action valide ses arguments,
/// construit ses instructions, puis passe par le signataire et un envoi unique.
pub struct LaunchpadActions {
    builder: LaunchpadTransactionBuilder,
    submitter: TransactionSubmitter,
    signer: Arc<dyn TransactionSigner>,
    drafts: DraftStore,
}

impl LaunchpadActions {
    pub fn new(
        ledger: Arc<dyn LedgerWriter>,
        builder: LaunchpadTransactionBuilder,
        signer: Arc<dyn TransactionSigner>,
        drafts: DraftStore,
        commitment: CommitmentConfig,
    ) -> Self {
        Self {
            builder,
            submitter: TransactionSubmitter::new(ledger, commitment),
            signer,
            drafts,
        }
    }

    pub fn payer(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn pool_accounts(&self, pool: Pubkey, traded_mint: Pubkey, quote_mint: Pubkey) -> LaunchpadResult<PoolAccounts> {
        PoolAccounts::derive(pool, traded_mint, quote_mint, &self.builder.program_id())
    }

    pub async fn init_target_config(&self, quote_mint: &Pubkey, traded_mint: &Pubkey, token_target_amount: u64) -> LaunchpadResult<Signature> {
        let instructions = self.builder.init_target_config(&self.payer(), quote_mint, traded_mint, token_target_amount)?;
        let signature = self.submitter.submit(&instructions, self.signer.as_ref()).await?;
        info!(signature = %signature, traded_mint = %traded_mint, token_target_amount, "[Actions] Target config initialisée.");
        Ok(signature)
    }

    /// Crée le pool et enregistre le brouillon dès l'envoi, avant la confirmation,
    /// pour que le pool apparaisse avant que le scan ne le découvre. Une erreur
    /// de confirmation remonte ensuite, brouillon déjà enregistré.
    pub async fn create_pool(&self, request: CreatePoolRequest) -> LaunchpadResult<CreatedPool> {
        let creator = self.payer();
        let metadata = MetadataArgs {
            name: request.name.clone(),
            symbol: request.symbol.clone(),
            uri: request.uri.clone(),
        };
        let (pool, instructions) = self.builder.new_pool(&creator, &request.traded_mint, &request.quote_mint, metadata)?;
        let signature = self.submitter.send(&instructions, self.signer.as_ref()).await?;

        let draft = DraftPoolRecord {
            pool_address: Some(pool),
            traded_mint: request.traded_mint,
            quote_mint: request.quote_mint,
            name: request.name,
            symbol: request.symbol,
            description: request.description,
            image_uri: request.image_uri,
            creator,
            signature: Some(signature.to_string()),
            created_at: unix_now(),
            superseded: false,
        };
        // La transaction est déjà partie : un échec d'écriture locale ne doit pas la masquer.
        if let Err(e) = self.drafts.add(draft) {
            warn!(pool = %pool, error = %e, "[Actions] Brouillon non enregistré.");
        }

        self.submitter.confirm(&signature).await?;
        info!(signature = %signature, pool = %pool, "[Actions] Pool créé.");
        Ok(CreatedPool { pool, signature })
    }

    /// Achat de `quote_amount` (unités humaines du mint de cotation).
    /// `min_out` est en unités de base du token échangé ; 0 désactive la protection.
    pub async fn buy(&self, pool: &PoolAccounts, quote_amount: f64, quote_decimals: u8, min_out: u64) -> LaunchpadResult<Signature> {
        let args = SwapArgs { coin_in_amount: to_base_units(quote_amount, quote_decimals)?, min_out };
        let instructions = self.builder.buy(&self.payer(), pool, args)?;
        let signature = self.submitter.submit(&instructions, self.signer.as_ref()).await?;
        info!(signature = %signature, pool = %pool.pool, amount_in = args.coin_in_amount, min_out, "[Actions] Achat exécuté.");
        Ok(signature)
    }

    pub async fn sell(&self, pool: &PoolAccounts, traded_amount: f64, traded_decimals: u8, min_out: u64) -> LaunchpadResult<Signature> {
        let args = SwapArgs { coin_in_amount: to_base_units(traded_amount, traded_decimals)?, min_out };
        let instructions = self.builder.sell(&self.payer(), pool, args)?;
        let signature = self.submitter.submit(&instructions, self.signer.as_ref()).await?;
        info!(signature = %signature, pool = %pool.pool, amount_in = args.coin_in_amount, min_out, "[Actions] Vente exécutée.");
        Ok(signature)
    }

    pub async fn migrate(&self, pool: &PoolAccounts, amm_accounts: Vec<AccountMeta>) -> LaunchpadResult<Signature> {
        let instructions = self.builder.migrate(&self.payer(), pool, amm_accounts)?;
        let signature = self.submitter.submit(&instructions, self.signer.as_ref()).await?;
        info!(signature = %signature, pool = %pool.pool, "[Actions] Migration envoyée.");
        Ok(signature)
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }
}
