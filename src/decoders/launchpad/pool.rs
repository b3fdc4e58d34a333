// DANS: src/decoders/launchpad/pool.rs

use crate::decoders::layout::{FieldKind, FieldSpec, Layout, sighash};
use crate::derivation;
use crate::error::{LaunchpadError, LaunchpadResult};
use crate::models::{PoolRecord, ReserveDescriptor};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::warn;

// --- CONSTANTES DU PROTOCOLE ---
pub const POOL_ACCOUNT_SIZE: usize = 394;

// --- TABLE DU LAYOUT `BoundPool` ---
// Source unique des offsets : le décodeur ET les fixtures de test la lisent.
pub static POOL_LAYOUT: Layout = Layout {
    name: "BoundPool",
    size: POOL_ACCOUNT_SIZE,
    fields: &[
        FieldSpec::new("discriminator", 0, 8, FieldKind::Bytes),
        FieldSpec::new("meme_reserve.tokens", 8, 8, FieldKind::U64),
        FieldSpec::new("meme_reserve.mint", 16, 32, FieldKind::Pubkey),
        FieldSpec::new("meme_reserve.vault", 48, 32, FieldKind::Pubkey),
        FieldSpec::new("quote_reserve.tokens", 80, 8, FieldKind::U64),
        FieldSpec::new("quote_reserve.mint", 88, 32, FieldKind::Pubkey),
        FieldSpec::new("quote_reserve.vault", 120, 32, FieldKind::Pubkey),
        FieldSpec::new("admin_fees_meme", 152, 8, FieldKind::U64),
        FieldSpec::new("admin_fees_quote", 160, 8, FieldKind::U64),
        FieldSpec::new("fee_vault_quote", 168, 32, FieldKind::Pubkey),
        FieldSpec::new("creator_addr", 200, 32, FieldKind::Pubkey),
        FieldSpec::new("fees.fee_meme_percent", 232, 8, FieldKind::U64),
        FieldSpec::new("fees.fee_quote_percent", 240, 8, FieldKind::U64),
        // Paramètres de la courbe : opaques pour le client.
        FieldSpec::new("config", 248, 112, FieldKind::Bytes),
        FieldSpec::new("locked", 360, 1, FieldKind::Bool),
        FieldSpec::new("pool_migration", 361, 1, FieldKind::Bool),
        FieldSpec::new("migration_pool_key", 362, 32, FieldKind::Pubkey),
    ],
};

/// Le discriminateur Anchor attendu pour un `BoundPool`.
pub fn pool_account_discriminator() -> [u8; 8] {
    sighash("account", "BoundPool")
}

// --- STRUCTURE DE SORTIE "PROPRE" ---
// Le miroir décodé du compte, avant dérivation des adresses dépendantes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedBoundPool {
    pub address: Pubkey,
    pub meme_tokens: u64,
    pub meme_mint: Pubkey,
    pub meme_vault: Pubkey,
    pub quote_tokens: u64,
    pub quote_mint: Pubkey,
    pub quote_vault: Pubkey,
    pub admin_fees_meme: u64,
    pub admin_fees_quote: u64,
    pub fee_vault_quote: Pubkey,
    pub creator: Pubkey,
    pub fee_meme_percent: u64,
    pub fee_quote_percent: u64,
    pub locked: bool,
    pub pool_migration: bool,
    pub migration_pool_key: Pubkey,
    /// Faux si les 8 premiers octets ne sont pas le discriminateur `BoundPool`.
    pub discriminator_matches: bool,
}

/// Décode un compte `BoundPool` de 394 octets.
/// Toute autre longueur est rejetée (le programme possède d'autres types de comptes).
pub fn decode_pool(address: &Pubkey, data: &[u8]) -> LaunchpadResult<DecodedBoundPool> {
    let reader = POOL_LAYOUT.reader(address, data)?;

    let meme_mint = reader.pubkey("meme_reserve.mint")?;
    let quote_mint = reader.pubkey("quote_reserve.mint")?;
    if meme_mint == quote_mint {
        return Err(LaunchpadError::malformed(address, "les deux mints de réserve sont identiques"));
    }

    Ok(DecodedBoundPool {
        address: *address,
        meme_tokens: reader.u64("meme_reserve.tokens")?,
        meme_mint,
        meme_vault: reader.pubkey("meme_reserve.vault")?,
        quote_tokens: reader.u64("quote_reserve.tokens")?,
        quote_mint,
        quote_vault: reader.pubkey("quote_reserve.vault")?,
        admin_fees_meme: reader.u64("admin_fees_meme")?,
        admin_fees_quote: reader.u64("admin_fees_quote")?,
        fee_vault_quote: reader.pubkey("fee_vault_quote")?,
        creator: reader.pubkey("creator_addr")?,
        fee_meme_percent: reader.u64("fees.fee_meme_percent")?,
        fee_quote_percent: reader.u64("fees.fee_quote_percent")?,
        locked: reader.bool("locked")?,
        pool_migration: reader.bool("pool_migration")?,
        migration_pool_key: reader.pubkey("migration_pool_key")?,
        discriminator_matches: reader.bytes("discriminator")? == pool_account_discriminator(),
    })
}

impl DecodedBoundPool {
    pub fn get_mints(&self) -> (Pubkey, Pubkey) {
        (self.meme_mint, self.quote_mint)
    }

    pub fn is_active(&self) -> bool {
        !self.locked && !self.pool_migration
    }

    /// Construit le `PoolRecord` canonique. Les vaults sont toujours recalculés
    /// depuis (signer du pool, mint) ; les valeurs stockées ne servent qu'au contrôle.
    /// Les soldes sont ceux du compte, en attendant l'hydratation par les vaults.
    pub fn to_record(&self, program_id: &Pubkey) -> LaunchpadResult<PoolRecord> {
        let addresses = derivation::pool_addresses(&self.address, &self.meme_mint, &self.quote_mint, program_id)?;

        if addresses.meme_vault != self.meme_vault || addresses.quote_vault != self.quote_vault {
            warn!(
                pool = %self.address,
                stored_meme_vault = %self.meme_vault,
                derived_meme_vault = %addresses.meme_vault,
                stored_quote_vault = %self.quote_vault,
                derived_quote_vault = %addresses.quote_vault,
                "[Decoder] Vaults stockés différents des vaults dérivés, on garde la dérivation."
            );
        }

        Ok(PoolRecord {
            address: self.address,
            signer: addresses.signer.address,
            traded: ReserveDescriptor {
                mint: self.meme_mint,
                balance: self.meme_tokens,
                vault: addresses.meme_vault,
            },
            quote: ReserveDescriptor {
                mint: self.quote_mint,
                balance: self.quote_tokens,
                vault: addresses.quote_vault,
            },
            fee_vault: self.fee_vault_quote,
            config_record: addresses.target_config,
            creator: self.creator,
            active: self.is_active(),
            migrated: self.pool_migration,
            migration_threshold: None,
            traded_supply: None,
            traded_decimals: None,
            created_at: None,
            metadata: None,
        })
    }
}
