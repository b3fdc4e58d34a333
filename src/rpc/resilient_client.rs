// src/rpc/resilient_client.rs

use crate::config::Config;
use crate::error::{LaunchpadError, LaunchpadResult};
use crate::monitoring::metrics;
use crate::rpc::endpoint_pool::{Endpoint, EndpointPool};
use crate::rpc::ledger::{LedgerReader, LedgerWriter, RawAccount, SignatureInfo, TransactionSummary};
use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    rpc_client::GetConfirmedSignaturesForAddress2Config,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSendTransactionConfig, RpcTransactionConfig},
    rpc_filter::RpcFilterType,
    rpc_request::{RpcError, RpcResponseErrorData},
};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::UiTransactionEncoding;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);
const CONFIRMATION_POLL: Duration = Duration::from_millis(500);

/// Un "wrapper" autour des clients RPC de Solana : backoff exponentiel et
/// rotation automatique d'endpoint quand le nœud nous limite.
///
/// Seules les lectures passent par `retry_with_failover`. L'envoi d'une
/// transaction est tenté une seule fois et son échec remonte tel quel.
#[derive(Clone)]
pub struct ResilientRpcClient {
    pool: Arc<EndpointPool>,
    max_retries: u32,
    base_delay: Duration,
    commitment: CommitmentConfig,
}

impl ResilientRpcClient {
    pub fn new(
        urls: Vec<String>,
        max_retries: u32,
        base_delay: Duration,
        commitment: CommitmentConfig,
    ) -> LaunchpadResult<Self> {
        Ok(Self {
            pool: Arc::new(EndpointPool::new(urls, commitment)?),
            max_retries,
            base_delay,
            commitment,
        })
    }

    pub fn from_config(config: &Config) -> LaunchpadResult<Self> {
        Self::new(config.endpoints(), config.max_retries, config.base_delay(), config.commitment())
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }

    pub fn endpoints(&self) -> &EndpointPool {
        &self.pool
    }

    /// base × 2^tentative
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }

    /// Exécute une lecture sur l'endpoint courant. Sur limitation : rotation,
    /// attente exponentielle, nouvel essai, jusqu'au plafond. Toute autre erreur
    /// remonte immédiatement.
    pub async fn retry_with_failover<T, F, Fut>(&self, method: &'static str, mut operation: F) -> LaunchpadResult<T>
    where
        F: FnMut(Arc<Endpoint>) -> Fut,
        Fut: Future<Output = LaunchpadResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let endpoint = self.pool.current();
            metrics::RPC_ATTEMPTS.with_label_values(&[method]).inc();

            match operation(endpoint.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limited() => {
                    if attempt >= self.max_retries {
                        metrics::RPC_RETRIES_EXHAUSTED.with_label_values(&[method]).inc();
                        warn!(method, attempts = attempt + 1, "[RPC] Ré-essais épuisés sur tous les endpoints.");
                        return Err(LaunchpadError::RetriesExhausted {
                            operation: method.to_string(),
                            attempts: attempt + 1,
                        });
                    }
                    let next_index = self.pool.rotate();
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        method,
                        endpoint = %endpoint.url,
                        next_endpoint = next_index,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "[RPC] Limité, rotation d'endpoint et nouvel essai."
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// --- CLASSIFICATION DES ERREURS ---

/// Les nœuds publics ne renvoient pas toujours un code HTTP propre :
/// on reconnaît aussi la limitation dans le texte.
/// Les codes ne comptent que comme mots entiers : "slot 14293" n'est pas un 429.
pub fn is_rate_limit_message(message: &str) -> bool {
    let message = message.to_lowercase();
    let status_code = message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token == "429" || token == "403");
    status_code
        || ["too many requests", "rate limit", "forbidden", "restricted"]
            .iter()
            .any(|phrase| message.contains(phrase))
}

pub fn classify_client_error(endpoint: &str, error: ClientError) -> LaunchpadError {
    let rate_limited = |reason: String| LaunchpadError::RateLimited { endpoint: endpoint.to_string(), reason };

    match error.kind() {
        ClientErrorKind::Reqwest(e) => {
            if let Some(status) = e.status() {
                if matches!(status.as_u16(), 429 | 403) {
                    return rate_limited(format!("HTTP {}", status.as_u16()));
                }
            }
            if e.is_timeout() || e.is_connect() {
                return LaunchpadError::TransientNetwork { endpoint: endpoint.to_string(), reason: e.to_string() };
            }
            LaunchpadError::Rpc(e.to_string())
        }
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, data }) => {
            if *code == 429 || is_rate_limit_message(message) {
                return rate_limited(format!("{code}: {message}"));
            }
            if let RpcResponseErrorData::SendTransactionPreflightFailure(simulation) = data {
                return LaunchpadError::Submission {
                    message: message.clone(),
                    logs: simulation.logs.clone().unwrap_or_default(),
                };
            }
            LaunchpadError::Rpc(format!("{code}: {message}"))
        }
        ClientErrorKind::Io(e) => {
            LaunchpadError::TransientNetwork { endpoint: endpoint.to_string(), reason: e.to_string() }
        }
        ClientErrorKind::TransactionError(e) => LaunchpadError::Submission { message: e.to_string(), logs: vec![] },
        _ => {
            let text = error.to_string();
            if is_rate_limit_message(&text) { rate_limited(text) } else { LaunchpadError::Rpc(text) }
        }
    }
}

// --- MÉTHODES DE LECTURE (RÉ-ESSAYÉES) ---

#[async_trait]
impl LedgerReader for ResilientRpcClient {
    async fn get_account(&self, address: &Pubkey) -> LaunchpadResult<Option<RawAccount>> {
        let address = *address;
        let commitment = self.commitment;
        self.retry_with_failover("get_account", move |endpoint| async move {
            let response = endpoint
                .client
                .get_account_with_commitment(&address, commitment)
                .await
                .map_err(|e| classify_client_error(&endpoint.url, e))?;
            Ok(response.value.map(|account| RawAccount {
                address,
                owner: account.owner,
                lamports: account.lamports,
                data: account.data,
            }))
        })
        .await
    }

    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> LaunchpadResult<Vec<Option<RawAccount>>> {
        let addresses = addresses.to_vec();
        self.retry_with_failover("get_multiple_accounts", |endpoint| {
            let addresses = addresses.clone();
            async move {
                let accounts = endpoint
                    .client
                    .get_multiple_accounts(&addresses)
                    .await
                    .map_err(|e| classify_client_error(&endpoint.url, e))?;
                Ok(addresses
                    .iter()
                    .zip(accounts)
                    .map(|(address, account)| {
                        account.map(|account| RawAccount {
                            address: *address,
                            owner: account.owner,
                            lamports: account.lamports,
                            data: account.data,
                        })
                    })
                    .collect())
            }
        })
        .await
    }

    async fn get_program_accounts(&self, program_id: &Pubkey, data_size: Option<u64>) -> LaunchpadResult<Vec<RawAccount>> {
        let program_id = *program_id;
        let commitment = self.commitment;
        self.retry_with_failover("get_program_accounts", move |endpoint| async move {
            let config = RpcProgramAccountsConfig {
                filters: data_size.map(|size| vec![RpcFilterType::DataSize(size)]),
                account_config: RpcAccountInfoConfig {
                    encoding: Some(UiAccountEncoding::Base64),
                    data_slice: None,
                    commitment: Some(commitment),
                    min_context_slot: None,
                },
                with_context: Some(false),
                sort_results: None,
            };
            let accounts = endpoint
                .client
                .get_program_accounts_with_config(&program_id, config)
                .await
                .map_err(|e| classify_client_error(&endpoint.url, e))?;
            Ok(accounts
                .into_iter()
                .map(|(address, account)| RawAccount {
                    address,
                    owner: account.owner,
                    lamports: account.lamports,
                    data: account.data,
                })
                .collect())
        })
        .await
    }

    async fn get_signatures_for_address(&self, address: &Pubkey, limit: usize) -> LaunchpadResult<Vec<SignatureInfo>> {
        let address = *address;
        let commitment = self.commitment;
        self.retry_with_failover("get_signatures_for_address", move |endpoint| async move {
            let config = GetConfirmedSignaturesForAddress2Config {
                before: None,
                until: None,
                limit: Some(limit),
                commitment: Some(commitment),
            };
            let statuses = endpoint
                .client
                .get_signatures_for_address_with_config(&address, config)
                .await
                .map_err(|e| classify_client_error(&endpoint.url, e))?;
            Ok(statuses
                .into_iter()
                .map(|status| SignatureInfo {
                    signature: status.signature,
                    slot: status.slot,
                    block_time: status.block_time,
                    failed: status.err.is_some(),
                })
                .collect())
        })
        .await
    }

    async fn get_transaction(&self, signature: &Signature) -> LaunchpadResult<Option<TransactionSummary>> {
        let signature = *signature;
        let commitment = self.commitment;
        self.retry_with_failover("get_transaction", move |endpoint| async move {
            let config = RpcTransactionConfig {
                encoding: Some(UiTransactionEncoding::Base64),
                commitment: Some(commitment),
                max_supported_transaction_version: Some(0),
            };
            let confirmed = endpoint
                .client
                .get_transaction_with_config(&signature, config)
                .await
                .map_err(|e| classify_client_error(&endpoint.url, e))?;

            let Some(transaction) = confirmed.transaction.transaction.decode() else {
                debug!(signature = %signature, "[RPC] Transaction non décodable.");
                return Ok(None);
            };
            let keys = transaction.message.static_account_keys();
            let instructions = transaction
                .message
                .instructions()
                .iter()
                .filter_map(|ix| keys.get(ix.program_id_index as usize).map(|program| (*program, ix.data.clone())))
                .collect();

            let (failed, logs) = match confirmed.transaction.meta {
                Some(meta) => {
                    let logs: Option<Vec<String>> = meta.log_messages.into();
                    (meta.err.is_some(), logs.unwrap_or_default())
                }
                None => (false, vec![]),
            };

            Ok(Some(TransactionSummary {
                signature: signature.to_string(),
                slot: confirmed.slot,
                block_time: confirmed.block_time,
                failed,
                logs,
                instructions,
            }))
        })
        .await
    }
}

// --- MÉTHODES D'ÉCRITURE ---

#[async_trait]
impl LedgerWriter for ResilientRpcClient {
    async fn get_latest_blockhash(&self) -> LaunchpadResult<Hash> {
        self.retry_with_failover("get_latest_blockhash", |endpoint| async move {
            endpoint
                .client
                .get_latest_blockhash()
                .await
                .map_err(|e| classify_client_error(&endpoint.url, e))
        })
        .await
    }

    /// Un seul essai, sur l'endpoint courant.
    async fn send_transaction(&self, transaction: &Transaction) -> LaunchpadResult<Signature> {
        let endpoint = self.pool.current();
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };
        endpoint
            .client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| match classify_client_error(&endpoint.url, e) {
                submission @ LaunchpadError::Submission { .. } => submission,
                other => LaunchpadError::Submission { message: other.to_string(), logs: vec![] },
            })
    }

    async fn confirm_transaction(&self, signature: &Signature, commitment: CommitmentConfig) -> LaunchpadResult<()> {
        let deadline = Instant::now() + CONFIRMATION_TIMEOUT;
        let signature = *signature;
        loop {
            let status = self
                .retry_with_failover("get_signature_status", move |endpoint| async move {
                    endpoint
                        .client
                        .get_signature_status_with_commitment(&signature, commitment)
                        .await
                        .map_err(|e| classify_client_error(&endpoint.url, e))
                })
                .await?;

            match status {
                Some(Ok(())) => return Ok(()),
                Some(Err(e)) => {
                    return Err(LaunchpadError::Submission { message: e.to_string(), logs: vec![] });
                }
                None if Instant::now() >= deadline => {
                    return Err(LaunchpadError::Submission {
                        message: format!("transaction {signature} non confirmée après {}s", CONFIRMATION_TIMEOUT.as_secs()),
                        logs: vec![],
                    });
                }
                None => sleep(CONFIRMATION_POLL).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn client(endpoints: usize, max_retries: u32) -> ResilientRpcClient {
        let urls = (0..endpoints).map(|i| format!("http://node-{i}.invalid")).collect();
        ResilientRpcClient::new(urls, max_retries, Duration::from_millis(1), CommitmentConfig::confirmed()).unwrap()
    }

    async fn fail_n_times(client: &ResilientRpcClient, failures: u32, attempts: &AtomicU32) -> LaunchpadResult<&'static str> {
        client
            .retry_with_failover("test", |endpoint| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < failures {
                        Err(LaunchpadError::RateLimited { endpoint: endpoint.url.clone(), reason: "429".into() })
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await
    }

    #[tokio::test]
    async fn n_rate_limits_mean_n_plus_one_attempts_and_n_rotations() {
        for failures in 0..=4u32 {
            let client = client(3, 5);
            let attempts = AtomicU32::new(0);
            let result = fail_n_times(&client, failures, &attempts).await;
            assert_eq!(result.unwrap(), "ok");
            assert_eq!(attempts.load(Ordering::SeqCst), failures + 1);
            assert_eq!(client.endpoints().rotations(), failures as u64);
            assert_eq!(client.endpoints().current_index(), failures as usize % 3);
        }
    }

    #[tokio::test]
    async fn exhausting_retries_raises_exhausted_error() {
        let client = client(2, 3);
        let attempts = AtomicU32::new(0);
        let result = fail_n_times(&client, u32::MAX, &attempts).await;
        assert!(matches!(result, Err(LaunchpadError::RetriesExhausted { attempts: 4, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        // Pas de rotation après le dernier essai.
        assert_eq!(client.endpoints().rotations(), 3);
        assert_eq!(client.endpoints().current_index(), 1);
    }

    #[tokio::test]
    async fn other_errors_propagate_without_retry() {
        let client = client(3, 5);
        let attempts = AtomicU32::new(0);
        let result: LaunchpadResult<()> = client
            .retry_with_failover("test", |_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(LaunchpadError::Rpc("account not found".into())) }
            })
            .await;
        assert!(matches!(result, Err(LaunchpadError::Rpc(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(client.endpoints().rotations(), 0);
    }

    #[test]
    fn backoff_doubles_each_attempt() {
        let client = ResilientRpcClient::new(
            vec!["http://a.invalid".into()],
            5,
            Duration::from_millis(500),
            CommitmentConfig::confirmed(),
        )
        .unwrap();
        assert_eq!(client.backoff_delay(0), Duration::from_millis(500));
        assert_eq!(client.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(client.backoff_delay(3), Duration::from_millis(4000));
    }

    #[test]
    fn recognises_rate_limit_messages() {
        assert!(is_rate_limit_message("HTTP status client error (429 Too Many Requests)"));
        assert!(is_rate_limit_message("Access Forbidden: method restricted"));
        assert!(!is_rate_limit_message("AccountNotFound: pubkey=abc"));
    }

    #[test]
    fn status_codes_only_count_as_whole_words() {
        assert!(is_rate_limit_message("server responded with 403"));
        assert!(is_rate_limit_message("error code: 429; retry later"));
        assert!(!is_rate_limit_message("AccountNotFound: pubkey=4293xQz"));
        assert!(!is_rate_limit_message("slot 140312 was skipped"));
        assert!(!is_rate_limit_message("Transaction 5j4030 failed: custom program error: 0x1"));
    }

    #[test]
    fn rpc_response_429_is_rate_limited() {
        let error = ClientError::from(ClientErrorKind::RpcError(RpcError::RpcResponseError {
            code: 429,
            message: "Too many requests for a specific RPC call".into(),
            data: RpcResponseErrorData::Empty,
        }));
        assert!(classify_client_error("http://a.invalid", error).is_rate_limited());

        let error = ClientError::from(ClientErrorKind::Custom("invalid param".into()));
        assert!(!classify_client_error("http://a.invalid", error).is_rate_limited());
    }
}
