// DANS : src/execution/sender.rs

use crate::error::LaunchpadResult;
use crate::execution::signer::TransactionSigner;
use crate::execution::transaction_builder::unsigned_transaction;
use crate::rpc::ledger::LedgerWriter;
use solana_sdk::{commitment_config::CommitmentConfig, instruction::Instruction, signature::Signature};
use std::sync::Arc;
use tracing::{error, info};

/// Le chemin d'écriture : blockhash, signature externe, un seul envoi,
/// une seule attente de confirmation. Aucun ré-essai à ce niveau.
pub struct TransactionSubmitter {
    ledger: Arc<dyn LedgerWriter>,
    commitment: CommitmentConfig,
}

impl TransactionSubmitter {
    pub fn new(ledger: Arc<dyn LedgerWriter>, commitment: CommitmentConfig) -> Self {
        Self { ledger, commitment }
    }

    /// Blockhash, signature externe, puis un seul envoi. Ne confirme pas.
    pub async fn send(&self, instructions: &[Instruction], signer: &dyn TransactionSigner) -> LaunchpadResult<Signature> {
        let payer = signer.pubkey();
        let mut transaction = unsigned_transaction(instructions, &payer);
        transaction.message.recent_blockhash = self.ledger.get_latest_blockhash().await?;

        let signature = signer.sign(&transaction).await?;
        transaction.signatures = vec![signature];

        info!(signature = %signature, instructions = instructions.len(), "[Sender] Envoi de la transaction.");
        self.ledger.send_transaction(&transaction).await.inspect_err(|e| {
            error!(signature = %signature, error = %e, "[Sender] Transaction rejetée.");
        })
    }

    pub async fn confirm(&self, signature: &Signature) -> LaunchpadResult<()> {
        self.ledger.confirm_transaction(signature, self.commitment).await.inspect_err(|e| {
            error!(signature = %signature, error = %e, "[Sender] Confirmation non obtenue.");
        })?;
        info!(signature = %signature, commitment = ?self.commitment.commitment, "[Sender] Transaction confirmée.");
        Ok(())
    }

    pub async fn submit(&self, instructions: &[Instruction], signer: &dyn TransactionSigner) -> LaunchpadResult<Signature> {
        let signature = self.send(instructions, signer).await?;
        self.confirm(&signature).await?;
        Ok(signature)
    }
}
