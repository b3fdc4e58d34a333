// src/derivation.rs

use crate::error::{LaunchpadError, LaunchpadResult};
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address_with_program_id;

// --- SEEDS DU PROGRAMME LAUNCHPAD ---
pub const SIGNER_PDA_PREFIX: &[u8] = b"signer";
pub const CONFIG_PREFIX: &[u8] = b"config";
pub const POOL_PREFIX: &[u8] = b"bound_pool";
pub const METADATA_PREFIX: &[u8] = b"metadata";

pub const LAUNCHPAD_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("ip6SLxttjbSrQggmM2SH5RZXhWKq3onmkzj3kExoceN");
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");
pub const WSOL_MINT: Pubkey = solana_sdk::pubkey!("So11111111111111111111111111111111111111112");

/// Une adresse dérivée et son bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// Dérive une adresse hors-courbe à partir de seeds ordonnées.
/// Fonction pure : mêmes entrées, même sortie. L'absence de bump valide
/// (extrêmement rare) est une erreur dure, jamais ré-essayée.
pub fn derive_address(seeds: &[&[u8]], program_id: &Pubkey) -> LaunchpadResult<DerivedAddress> {
    Pubkey::try_find_program_address(seeds, program_id)
        .map(|(address, bump)| DerivedAddress { address, bump })
        .ok_or(LaunchpadError::Derivation { program_id: *program_id })
}

/// Autorité signataire du pool : `["signer", pool]`.
pub fn pool_signer(pool: &Pubkey, program_id: &Pubkey) -> LaunchpadResult<DerivedAddress> {
    derive_address(&[SIGNER_PDA_PREFIX, pool.as_ref()], program_id)
}

/// Enregistrement de configuration cible : `["config", quote_mint, traded_mint]`.
pub fn target_config(quote_mint: &Pubkey, traded_mint: &Pubkey, program_id: &Pubkey) -> LaunchpadResult<DerivedAddress> {
    derive_address(&[CONFIG_PREFIX, quote_mint.as_ref(), traded_mint.as_ref()], program_id)
}

/// Compte du pool lui-même : `["bound_pool", traded_mint, quote_mint]`.
pub fn bound_pool(traded_mint: &Pubkey, quote_mint: &Pubkey, program_id: &Pubkey) -> LaunchpadResult<DerivedAddress> {
    derive_address(&[POOL_PREFIX, traded_mint.as_ref(), quote_mint.as_ref()], program_id)
}

/// Compte de métadonnées Metaplex d'un mint.
pub fn metadata_record(mint: &Pubkey) -> LaunchpadResult<DerivedAddress> {
    derive_address(
        &[METADATA_PREFIX, TOKEN_METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &TOKEN_METADATA_PROGRAM_ID,
    )
}

/// Vault d'un pool : adresse de token associée (autorité du pool, mint).
/// Jamais stockée indépendamment de cette dérivation.
pub fn vault(pool_signer: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(pool_signer, mint, &spl_token::id())
}

/// Toutes les adresses dépendantes d'un pool, calculées d'un coup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolAddresses {
    pub pool: Pubkey,
    pub signer: DerivedAddress,
    pub meme_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub target_config: Pubkey,
}

pub fn pool_addresses(
    pool: &Pubkey,
    meme_mint: &Pubkey,
    quote_mint: &Pubkey,
    program_id: &Pubkey,
) -> LaunchpadResult<PoolAddresses> {
    let signer = pool_signer(pool, program_id)?;
    let target_config = target_config(quote_mint, meme_mint, program_id)?;
    Ok(PoolAddresses {
        pool: *pool,
        signer,
        meme_vault: vault(&signer.address, meme_mint),
        quote_vault: vault(&signer.address, quote_mint),
        target_config: target_config.address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let pool = Pubkey::new_unique();
        let first = pool_signer(&pool, &LAUNCHPAD_PROGRAM_ID).unwrap();
        let second = pool_signer(&pool, &LAUNCHPAD_PROGRAM_ID).unwrap();
        assert_eq!(first, second);
        assert!(!first.address.is_on_curve());
    }

    #[test]
    fn matches_the_runtime_derivation() {
        let pool = Pubkey::new_unique();
        let (expected, bump) = Pubkey::find_program_address(&[b"signer", pool.as_ref()], &LAUNCHPAD_PROGRAM_ID);
        let derived = pool_signer(&pool, &LAUNCHPAD_PROGRAM_ID).unwrap();
        assert_eq!(derived.address, expected);
        assert_eq!(derived.bump, bump);
    }

    #[test]
    fn seed_order_matters_for_config_records() {
        let quote = WSOL_MINT;
        let meme = Pubkey::new_unique();
        let a = target_config(&quote, &meme, &LAUNCHPAD_PROGRAM_ID).unwrap();
        let b = target_config(&meme, &quote, &LAUNCHPAD_PROGRAM_ID).unwrap();
        assert_ne!(a.address, b.address);
    }

    #[test]
    fn oversized_seed_is_a_derivation_error() {
        let too_long = [7u8; 33];
        let result = derive_address(&[&too_long], &LAUNCHPAD_PROGRAM_ID);
        assert!(matches!(result, Err(LaunchpadError::Derivation { .. })));
    }

    #[test]
    fn vaults_derive_from_signer_and_mint() {
        let pool = Pubkey::new_unique();
        let meme = Pubkey::new_unique();
        let addresses = pool_addresses(&pool, &meme, &WSOL_MINT, &LAUNCHPAD_PROGRAM_ID).unwrap();
        assert_eq!(addresses.meme_vault, vault(&addresses.signer.address, &meme));
        assert_ne!(addresses.meme_vault, addresses.quote_vault);
    }
}
