// src/decoders/launchpad/target_config.rs

use crate::decoders::layout::{FieldKind, FieldSpec, Layout};
use crate::error::LaunchpadResult;
use solana_sdk::pubkey::Pubkey;

pub const TARGET_CONFIG_ACCOUNT_SIZE: usize = 80;

// --- TABLE DU LAYOUT `TargetConfig` ---
pub static TARGET_CONFIG_LAYOUT: Layout = Layout {
    name: "TargetConfig",
    size: TARGET_CONFIG_ACCOUNT_SIZE,
    fields: &[
        FieldSpec::new("discriminator", 0, 8, FieldKind::Bytes),
        FieldSpec::new("token_target_amount", 8, 8, FieldKind::U64),
        FieldSpec::new("token_mint", 16, 32, FieldKind::Pubkey),
        FieldSpec::new("pair_token_mint", 48, 32, FieldKind::Pubkey),
    ],
};

/// Configuration cible d'une paire : le seuil de migration du pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedTargetConfig {
    pub address: Pubkey,
    /// Montant de quote (ex: lamports de WSOL) qui déclenche la migration.
    pub token_target_amount: u64,
    /// Le mint de cotation (ex: WSOL).
    pub token_mint: Pubkey,
    /// Le mint lancé.
    pub pair_token_mint: Pubkey,
}

pub fn decode_target_config(address: &Pubkey, data: &[u8]) -> LaunchpadResult<DecodedTargetConfig> {
    let reader = TARGET_CONFIG_LAYOUT.reader(address, data)?;
    Ok(DecodedTargetConfig {
        address: *address,
        token_target_amount: reader.u64("token_target_amount")?,
        token_mint: reader.pubkey("token_mint")?,
        pair_token_mint: reader.pubkey("pair_token_mint")?,
    })
}
