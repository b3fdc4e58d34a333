// src/decoders/spl_token_decoders/mint.rs

use crate::error::{LaunchpadError, LaunchpadResult};
use solana_sdk::pubkey::Pubkey;
use spl_token_2022::{
    extension::StateWithExtensions,
    state::Mint,
};

// --- STRUCTURE DE SORTIE PROPRE ---
// Ce que l'interface affiche d'un mint : décimales et offre totale.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMint {
    pub address: Pubkey,
    pub decimals: u8,
    pub supply: u64,
    pub mint_authority: Option<Pubkey>,
    pub is_initialized: bool,
}

/// Décode un compte de mint (SPL Token ou Token-2022).
pub fn decode_mint(address: &Pubkey, data: &[u8]) -> LaunchpadResult<DecodedMint> {
    // `StateWithExtensions` lit aussi bien les anciens mints que ceux avec extensions.
    let mint_state = StateWithExtensions::<Mint>::unpack(data)
        .map_err(|e| LaunchpadError::malformed(address, format!("mint illisible: {e}")))?;
    let base_mint = mint_state.base;

    Ok(DecodedMint {
        address: *address,
        decimals: base_mint.decimals,
        supply: base_mint.supply,
        mint_authority: base_mint.mint_authority.into(),
        is_initialized: base_mint.is_initialized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_program_pack::Pack;
    use spl_token::state::Mint as SplMint;

    #[test]
    fn decodes_classic_spl_mint() {
        let authority = Pubkey::new_unique();
        let mint = SplMint {
            mint_authority: Some(authority).into(),
            supply: 1_000_000_000_000_000,
            decimals: 6,
            is_initialized: true,
            freeze_authority: None.into(),
        };
        let mut data = vec![0u8; SplMint::LEN];
        SplMint::pack(mint, &mut data).unwrap();

        let decoded = decode_mint(&Pubkey::new_unique(), &data).unwrap();
        assert_eq!(decoded.decimals, 6);
        assert_eq!(decoded.supply, 1_000_000_000_000_000);
        assert_eq!(decoded.mint_authority, Some(authority));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(decode_mint(&Pubkey::new_unique(), &[1, 2, 3]).is_err());
    }
}
