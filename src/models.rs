// src/models.rs

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::time::{SystemTime, UNIX_EPOCH};

/// Horodatage Unix courant, en secondes.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

/// Un côté d'un pool : {mint, solde, vault}.
/// Le solde n'est valable qu'à l'instant du snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveDescriptor {
    pub mint: Pubkey,
    pub balance: u64,
    pub vault: Pubkey,
}

/// L'état canonique d'un pool tel que lu on-chain puis hydraté.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    pub address: Pubkey,
    pub signer: Pubkey,
    /// Le token lancé ("meme").
    pub traded: ReserveDescriptor,
    /// L'actif de cotation (généralement WSOL).
    pub quote: ReserveDescriptor,
    pub fee_vault: Pubkey,
    pub config_record: Pubkey,
    pub creator: Pubkey,
    pub active: bool,
    pub migrated: bool,
    pub migration_threshold: Option<u64>,
    pub traded_supply: Option<u64>,
    pub traded_decimals: Option<u8>,
    pub created_at: Option<i64>,
    pub metadata: Option<TokenMetadataRecord>,
}

/// Métadonnées d'affichage d'un mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadataRecord {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    /// Lus dans le document JSON pointé par `uri`, quand il est joignable.
    pub image_uri: Option<String>,
    pub description: Option<String>,
}

/// Pool créé localement, avant que le scan ne le découvre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPoolRecord {
    pub pool_address: Option<Pubkey>,
    pub traded_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub description: Option<String>,
    pub image_uri: Option<String>,
    pub creator: Pubkey,
    pub signature: Option<String>,
    pub created_at: i64,
    /// Posé quand un enregistrement on-chain correspondant est apparu.
    /// Le brouillon est conservé ; seule une action utilisateur le supprime.
    #[serde(default)]
    pub superseded: bool,
}

impl DraftPoolRecord {
    /// La clé d'identité : l'adresse du pool si connue, sinon le mint échangé.
    pub fn identity(&self) -> Pubkey {
        self.pool_address.unwrap_or(self.traded_mint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    OnChainOnly,
    LocalOnly,
    Merged,
}

/// La vue unifiée exposée à la couche de présentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedPoolView {
    pub pool_address: Option<Pubkey>,
    pub traded_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub description: Option<String>,
    pub image_uri: Option<String>,
    pub traded_balance: Option<u64>,
    pub quote_balance: Option<u64>,
    pub traded_supply: Option<u64>,
    pub migration_threshold: Option<u64>,
    pub creator: Pubkey,
    pub active: bool,
    pub created_at: i64,
    pub provenance: Provenance,
}
