// src/decoders/spl_token_decoders/account.rs

use crate::error::{LaunchpadError, LaunchpadResult};
use solana_program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use spl_token::state::Account as SplTokenAccount;

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSplAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

/// Décode un compte de jeton SPL (un vault de pool, typiquement).
/// Les comptes Token-2022 avec extensions dépassent `LEN` : on lit la base.
pub fn decode_account(address: &Pubkey, data: &[u8]) -> LaunchpadResult<DecodedSplAccount> {
    let base = data
        .get(..SplTokenAccount::LEN)
        .ok_or_else(|| LaunchpadError::malformed(address, "compte de jeton tronqué"))?;
    let spl_account = SplTokenAccount::unpack(base)
        .map_err(|e| LaunchpadError::malformed(address, format!("compte de jeton illisible: {e}")))?;
    Ok(DecodedSplAccount {
        mint: spl_account.mint,
        owner: spl_account.owner,
        amount: spl_account.amount,
    })
}
