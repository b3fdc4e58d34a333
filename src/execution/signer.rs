// DANS : src/execution/signer.rs

use crate::error::{LaunchpadError, LaunchpadResult};
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};

/// La capacité de signature externe : reçoit une transaction non signée,
/// renvoie la signature du payeur ou un refus.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    async fn sign(&self, transaction: &Transaction) -> LaunchpadResult<Signature>;
}

/// Signature locale avec une clé en mémoire (CLI, tests).
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Clé secrète de 64 octets encodée en base58 (format des exports de wallet).
    pub fn from_base58(secret: &str) -> LaunchpadResult<Self> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| LaunchpadError::Config(format!("clé base58 invalide: {e}")))?;
        let keypair = Keypair::try_from(bytes.as_slice())
            .map_err(|e| LaunchpadError::Config(format!("clé secrète invalide: {e}")))?;
        Ok(Self { keypair })
    }

    /// Fichier JSON `[u8; 64]` au format de solana-keygen.
    pub fn from_file(path: &str) -> LaunchpadResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LaunchpadError::Config(format!("lecture de {path}: {e}")))?;
        let bytes: Vec<u8> = serde_json::from_str(&content)
            .map_err(|e| LaunchpadError::Config(format!("{path} n'est pas un keypair JSON: {e}")))?;
        let keypair = Keypair::try_from(bytes.as_slice())
            .map_err(|e| LaunchpadError::Config(format!("clé secrète invalide dans {path}: {e}")))?;
        Ok(Self { keypair })
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign(&self, transaction: &Transaction) -> LaunchpadResult<Signature> {
        let payer = transaction.message.account_keys.first().copied();
        if payer != Some(self.keypair.pubkey()) {
            return Err(LaunchpadError::SignerRejected(format!(
                "le payeur {} n'est pas la clé de ce signataire",
                payer.map(|p| p.to_string()).unwrap_or_default()
            )));
        }
        Ok(self.keypair.sign_message(&transaction.message_data()))
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;

    /// Un signataire qui refuse toujours, comme un utilisateur qui annule.
    pub(crate) struct RejectingSigner(pub Pubkey);

    #[async_trait]
    impl TransactionSigner for RejectingSigner {
        fn pubkey(&self) -> Pubkey {
            self.0
        }

        async fn sign(&self, _transaction: &Transaction) -> LaunchpadResult<Signature> {
            Err(LaunchpadError::SignerRejected("refus de l'utilisateur".into()))
        }
    }
}
