// src/data_pipeline/history.rs

use crate::error::{LaunchpadError, LaunchpadResult};
use crate::execution::instructions::LaunchpadInstruction;
use crate::rpc::ledger::LedgerReader;
use futures_util::{StreamExt, stream};
use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::str::FromStr;
use tracing::debug;

/// Une transaction d'un pool, avec les appels au launchpad qu'elle contient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub failed: bool,
    /// Nom de l'instruction décodée (ex: "swap_y").
    pub actions: Vec<String>,
    #[serde(skip)]
    pub instructions: Vec<LaunchpadInstruction>,
}

/// Historique récent d'un pool, du plus récent au plus ancien.
/// Les transactions introuvables ou sans instruction du launchpad sont omises.
pub async fn pool_history(
    ledger: &dyn LedgerReader,
    pool: &Pubkey,
    program_id: &Pubkey,
    limit: usize,
    concurrency: usize,
) -> LaunchpadResult<Vec<HistoryEntry>> {
    let signatures = ledger.get_signatures_for_address(pool, limit).await?;

    let fetched: Vec<LaunchpadResult<Option<HistoryEntry>>> = stream::iter(signatures)
        .map(|info| async move {
            let signature = Signature::from_str(&info.signature)
                .map_err(|e| LaunchpadError::malformed(&info.signature, e.to_string()))?;
            let Some(summary) = ledger.get_transaction(&signature).await? else {
                return Ok(None);
            };
            let instructions: Vec<LaunchpadInstruction> = summary
                .instructions
                .iter()
                .filter(|(program, _)| program == program_id)
                .filter_map(|(_, data)| match LaunchpadInstruction::decode(data) {
                    Ok(ix) => Some(ix),
                    Err(e) => {
                        debug!(signature = %signature, error = %e, "[History] Instruction non reconnue.");
                        None
                    }
                })
                .collect();
            if instructions.is_empty() {
                return Ok(None);
            }
            Ok(Some(HistoryEntry {
                signature: summary.signature,
                slot: summary.slot,
                block_time: summary.block_time,
                failed: summary.failed,
                actions: instructions.iter().map(|ix| ix.name().to_string()).collect(),
                instructions,
            }))
        })
        // `buffered` conserve l'ordre des signatures.
        .buffered(concurrency.max(1))
        .collect()
        .await;

    fetched.into_iter().filter_map(|entry| entry.transpose()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::LAUNCHPAD_PROGRAM_ID;
    use crate::execution::instructions::SwapArgs;
    use crate::rpc::ledger::fakes::FakeLedger;
    use crate::rpc::ledger::{SignatureInfo, TransactionSummary};

    #[tokio::test]
    async fn decodes_launchpad_calls_in_signature_order() {
        let ledger = FakeLedger::default();
        let pool = Pubkey::new_unique();
        let buy = LaunchpadInstruction::SwapY(SwapArgs { coin_in_amount: 10, min_out: 1 });
        let sell = LaunchpadInstruction::SwapX(SwapArgs { coin_in_amount: 5, min_out: 0 });

        let sigs: Vec<Signature> = (0..3).map(|_| Signature::new_unique()).collect();
        ledger.signatures.lock().unwrap().insert(
            pool,
            sigs.iter()
                .enumerate()
                .map(|(i, s)| SignatureInfo { signature: s.to_string(), slot: 30 - i as u64, block_time: None, failed: false })
                .collect(),
        );
        let mut transactions = ledger.transactions.lock().unwrap();
        transactions.insert(sigs[0].to_string(), TransactionSummary {
            signature: sigs[0].to_string(),
            slot: 30,
            block_time: Some(3),
            failed: false,
            logs: vec![],
            instructions: vec![(LAUNCHPAD_PROGRAM_ID, sell.encode().unwrap())],
        });
        // Aucune instruction du launchpad : omise.
        transactions.insert(sigs[1].to_string(), TransactionSummary {
            signature: sigs[1].to_string(),
            slot: 29,
            block_time: Some(2),
            failed: false,
            logs: vec![],
            instructions: vec![(Pubkey::new_unique(), vec![1, 2, 3])],
        });
        transactions.insert(sigs[2].to_string(), TransactionSummary {
            signature: sigs[2].to_string(),
            slot: 28,
            block_time: Some(1),
            failed: true,
            logs: vec![],
            instructions: vec![(LAUNCHPAD_PROGRAM_ID, buy.encode().unwrap())],
        });
        drop(transactions);

        let history = pool_history(&ledger, &pool, &LAUNCHPAD_PROGRAM_ID, 10, 4).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].actions, vec!["swap_x"]);
        assert_eq!(history[1].instructions, vec![buy]);
        assert!(history[1].failed);
    }
}
