// src/error.rs

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// La taxonomie d'erreurs du client.
///
/// Les erreurs locales à un compte (`MalformedData`, `Derivation`) sont attrapées
/// par le pipeline et le compte est simplement exclu. Les erreurs globales à un
/// cycle (`RetriesExhausted`) font basculer l'orchestrateur en mode démo. Les
/// erreurs d'écriture remontent toujours jusqu'à l'appelant.
#[derive(Debug, Error)]
pub enum LaunchpadError {
    /// Limite de débit ou accès restreint sur un endpoint. Seule erreur ré-essayée.
    #[error("endpoint {endpoint} limité ({reason})")]
    RateLimited { endpoint: String, reason: String },

    #[error("échec réseau temporaire sur {endpoint}: {reason}")]
    TransientNetwork { endpoint: String, reason: String },

    #[error("{operation}: ré-essais épuisés après {attempts} tentatives")]
    RetriesExhausted { operation: String, attempts: u32 },

    #[error("données malformées pour {account}: {reason}")]
    MalformedData { account: String, reason: String },

    #[error("aucune adresse dérivable pour les seeds fournies (programme {program_id})")]
    Derivation { program_id: Pubkey },

    #[error("argument invalide `{argument}`: {reason}")]
    InvalidArgument { argument: &'static str, reason: String },

    #[error("transaction rejetée: {message}")]
    Submission { message: String, logs: Vec<String> },

    #[error("signature refusée par l'utilisateur: {0}")]
    SignerRejected(String),

    #[error("erreur RPC: {0}")]
    Rpc(String),

    #[error("erreur de stockage local: {0}")]
    Storage(String),

    #[error("configuration invalide: {0}")]
    Config(String),
}

impl LaunchpadError {
    /// Vrai uniquement pour les signaux de limitation (429 / 403), les seuls
    /// qui déclenchent une rotation d'endpoint.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LaunchpadError::RateLimited { .. })
    }

    pub fn malformed(account: impl ToString, reason: impl Into<String>) -> Self {
        LaunchpadError::MalformedData {
            account: account.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(argument: &'static str, reason: impl Into<String>) -> Self {
        LaunchpadError::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }
}

pub type LaunchpadResult<T> = Result<T, LaunchpadError>;
