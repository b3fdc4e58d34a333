// src/config.rs

use crate::error::LaunchpadError;
use anyhow::Result;
use serde::Deserialize;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::{str::FromStr, time::Duration};

pub const DEFAULT_PROGRAM_ID: &str = "ip6SLxttjbSrQggmM2SH5RZXhWKq3onmkzj3kExoceN";

/// Configuration chargée depuis l'environnement (préfixe `LAUNCHPAD_`).
/// Ex: `LAUNCHPAD_RPC_URLS=https://a.example,https://b.example`
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_program_id")]
    pub program_id: String,

    /// Liste ordonnée des endpoints, séparés par des virgules.
    #[serde(default = "default_rpc_urls")]
    pub rpc_urls: String,

    #[serde(default = "default_cache_ttl_secs")]
    pub metadata_cache_ttl_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_document_timeout_ms")]
    pub document_timeout_ms: u64,
    #[serde(default = "default_account_batch_size")]
    pub account_batch_size: usize,
    #[serde(default = "default_document_concurrency")]
    pub document_concurrency: usize,

    /// "processed", "confirmed" ou "finalized".
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Fichier JSON du stockage clé-valeur local (brouillons, dernier snapshot).
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Propriétaire du vault de frais (quote) utilisé à la création d'un pool.
    pub fee_authority: Option<String>,
}

fn default_program_id() -> String { DEFAULT_PROGRAM_ID.to_string() }
fn default_rpc_urls() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_cache_ttl_secs() -> u64 { 30 * 60 }
fn default_max_retries() -> u32 { 5 }
fn default_base_delay_ms() -> u64 { 500 }
fn default_refresh_interval_secs() -> u64 { 120 }
fn default_document_timeout_ms() -> u64 { 5_000 }
fn default_account_batch_size() -> usize { 100 }
fn default_document_concurrency() -> usize { 10 }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_store_path() -> String { "launchpad_store.json".to_string() }

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::prefixed("LAUNCHPAD_").from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LaunchpadError> {
        if self.endpoints().is_empty() {
            return Err(LaunchpadError::Config("aucun endpoint RPC configuré".into()));
        }
        self.program_id()?;
        if self.account_batch_size == 0 || self.account_batch_size > 100 {
            return Err(LaunchpadError::Config(format!(
                "account_batch_size doit être entre 1 et 100 (reçu {})",
                self.account_batch_size
            )));
        }
        if self.document_concurrency == 0 {
            return Err(LaunchpadError::Config("document_concurrency doit être > 0".into()));
        }
        if let Some(authority) = &self.fee_authority {
            Pubkey::from_str(authority)
                .map_err(|e| LaunchpadError::Config(format!("fee_authority invalide: {e}")))?;
        }
        Ok(())
    }

    pub fn program_id(&self) -> Result<Pubkey, LaunchpadError> {
        Pubkey::from_str(&self.program_id)
            .map_err(|e| LaunchpadError::Config(format!("program_id invalide: {e}")))
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.rpc_urls
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn fee_authority(&self) -> Option<Pubkey> {
        self.fee_authority.as_deref().and_then(|a| Pubkey::from_str(a).ok())
    }

    pub fn commitment(&self) -> CommitmentConfig {
        match self.commitment.as_str() {
            "processed" => CommitmentConfig::processed(),
            "finalized" => CommitmentConfig::finalized(),
            _ => CommitmentConfig::confirmed(),
        }
    }

    pub fn metadata_cache_ttl(&self) -> Duration { Duration::from_secs(self.metadata_cache_ttl_secs) }
    pub fn base_delay(&self) -> Duration { Duration::from_millis(self.base_delay_ms) }
    pub fn refresh_interval(&self) -> Duration { Duration::from_secs(self.refresh_interval_secs) }
    pub fn document_timeout(&self) -> Duration { Duration::from_millis(self.document_timeout_ms) }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            program_id: default_program_id(),
            rpc_urls: default_rpc_urls(),
            metadata_cache_ttl_secs: default_cache_ttl_secs(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            refresh_interval_secs: default_refresh_interval_secs(),
            document_timeout_ms: default_document_timeout_ms(),
            account_batch_size: default_account_batch_size(),
            document_concurrency: default_document_concurrency(),
            commitment: default_commitment(),
            store_path: default_store_path(),
            fee_authority: None,
        }
    }
}
