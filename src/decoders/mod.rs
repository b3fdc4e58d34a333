// src/decoders/mod.rs

use crate::derivation::TOKEN_METADATA_PROGRAM_ID;
use crate::monitoring::metrics;
use solana_sdk::pubkey::Pubkey;
use tracing::warn;

// --- 1. Déclarer tous nos modules principaux ---
pub mod launchpad;
pub mod layout;
pub mod metadata;
pub mod spl_token_decoders;

pub use launchpad::{DecodedBoundPool, DecodedTargetConfig};
pub use metadata::DecodedMetadata;
pub use spl_token_decoders::mint::DecodedMint;

// --- 2. L'enum unifié des comptes que l'on sait lire ---
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedAccount {
    Pool(DecodedBoundPool),
    TargetConfig(DecodedTargetConfig),
    Mint(DecodedMint),
    Metadata(DecodedMetadata),
    Unknown { address: Pubkey, len: usize },
}

/// Classe puis décode un compte brut d'après son propriétaire et sa longueur.
///
/// Les comptes du launchpad sont reconnus à leur taille exacte : tout autre
/// compte appartenant au programme est classé `Unknown` et ignoré. Un compte
/// de la bonne taille mais dont le décodage échoue est aussi `Unknown` : une
/// erreur locale à un compte n'interrompt jamais le lot.
pub fn classify_account(address: &Pubkey, owner: &Pubkey, data: &[u8], program_id: &Pubkey) -> DecodedAccount {
    let unknown = || DecodedAccount::Unknown { address: *address, len: data.len() };

    let result = if owner == program_id {
        match data.len() {
            launchpad::POOL_ACCOUNT_SIZE => launchpad::decode_pool(address, data).map(|pool| {
                if !pool.discriminator_matches {
                    // Classification par longueur seule : faiblesse connue, on la signale.
                    warn!(
                        account = %address,
                        discriminator = %hex::encode(&data[..8]),
                        "[Decoder] Compte de 394 octets sans discriminateur BoundPool."
                    );
                    metrics::ACCOUNTS_SKIPPED.with_label_values(&["discriminator_mismatch"]).inc();
                }
                DecodedAccount::Pool(pool)
            }),
            launchpad::TARGET_CONFIG_ACCOUNT_SIZE => {
                launchpad::decode_target_config(address, data).map(DecodedAccount::TargetConfig)
            }
            _ => return unknown(),
        }
    } else if *owner == spl_token::id() || *owner == spl_token_2022::id() {
        spl_token_decoders::mint::decode_mint(address, data).map(DecodedAccount::Mint)
    } else if *owner == TOKEN_METADATA_PROGRAM_ID {
        return metadata::decode_metadata(address, data)
            .map(DecodedAccount::Metadata)
            .unwrap_or_else(unknown);
    } else {
        return unknown();
    };

    match result {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(account = %address, error = %e, "[Decoder] Compte malformé ignoré.");
            metrics::ACCOUNTS_SKIPPED.with_label_values(&["malformed"]).inc();
            unknown()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::LAUNCHPAD_PROGRAM_ID;

    #[test]
    fn foreign_and_odd_sized_accounts_are_unknown() {
        let address = Pubkey::new_unique();
        let program = LAUNCHPAD_PROGRAM_ID;
        for len in [0usize, 7, 100, 393, 395] {
            let decoded = classify_account(&address, &program, &vec![1u8; len], &program);
            assert_eq!(decoded, DecodedAccount::Unknown { address, len });
        }
        let other_owner = Pubkey::new_unique();
        let decoded = classify_account(&address, &other_owner, &[0u8; 394], &program);
        assert!(matches!(decoded, DecodedAccount::Unknown { .. }));
    }

    #[test]
    fn pool_sized_account_with_equal_mints_is_unknown() {
        let address = Pubkey::new_unique();
        let decoded = classify_account(&address, &LAUNCHPAD_PROGRAM_ID, &[0u8; 394], &LAUNCHPAD_PROGRAM_ID);
        assert!(matches!(decoded, DecodedAccount::Unknown { len: 394, .. }));
    }

    #[test]
    fn metadata_owner_routes_to_metadata_decoder() {
        let mint = Pubkey::new_unique();
        let data = metadata::encode_metadata_fixture(&mint, "Cat", "CAT", "https://x/cat.json");
        let decoded = classify_account(&Pubkey::new_unique(), &TOKEN_METADATA_PROGRAM_ID, &data, &LAUNCHPAD_PROGRAM_ID);
        match decoded {
            DecodedAccount::Metadata(m) => assert_eq!(m.symbol, "CAT"),
            other => panic!("attendu Metadata, reçu {other:?}"),
        }
    }
}
