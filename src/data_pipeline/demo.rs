// src/data_pipeline/demo.rs

use crate::derivation::WSOL_MINT;
use crate::models::{PoolRecord, ReserveDescriptor, TokenMetadataRecord};
use solana_sdk::pubkey::Pubkey;

// (nom, symbole, meme restant, quote collecté, âge en heures)
const DEMO_POOLS: [(&str, &str, u64, u64, i64); 4] = [
    ("Demo Doge", "DDOGE", 552_000_000_000_000, 12_400_000_000, 2),
    ("Demo Cat", "DCAT", 640_000_000_000_000, 3_100_000_000, 9),
    ("Demo Frog", "DFROG", 300_000_000_000_000, 61_800_000_000, 30),
    ("Demo Moon", "DMOON", 689_000_000_000_000, 150_000_000, 72),
];

const DEMO_SUPPLY: u64 = 1_000_000_000_000_000;
const DEMO_THRESHOLD: u64 = 85_000_000_000;

/// Des pools synthétiques, affichés quand le réseau est inutilisable.
/// Adresses et montants sont fixes ; seules les dates suivent `now`.
pub fn demo_pools(now: i64) -> Vec<PoolRecord> {
    DEMO_POOLS
        .iter()
        .enumerate()
        .map(|(i, (name, symbol, meme, quote, age_hours))| {
            let key = |tag: u8| {
                let mut bytes = [0u8; 32];
                bytes[0] = 0xD0;
                bytes[1] = i as u8;
                bytes[2] = tag;
                Pubkey::new_from_array(bytes)
            };
            PoolRecord {
                address: key(1),
                signer: key(2),
                traded: ReserveDescriptor { mint: key(3), balance: *meme, vault: key(4) },
                quote: ReserveDescriptor { mint: WSOL_MINT, balance: *quote, vault: key(5) },
                fee_vault: key(6),
                config_record: key(7),
                creator: key(8),
                active: true,
                migrated: false,
                migration_threshold: Some(DEMO_THRESHOLD),
                traded_supply: Some(DEMO_SUPPLY),
                traded_decimals: Some(6),
                created_at: Some(now - age_hours * 3600),
                metadata: Some(TokenMetadataRecord {
                    name: name.to_string(),
                    symbol: symbol.to_string(),
                    uri: String::new(),
                    image_uri: None,
                    description: Some("Données de démonstration : réseau indisponible.".to_string()),
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn demo_data_is_non_empty_and_stable() {
        let pools = demo_pools(1_000_000);
        assert!(!pools.is_empty());
        assert_eq!(pools, demo_pools(1_000_000));
        let addresses: HashSet<Pubkey> = pools.iter().map(|p| p.address).collect();
        assert_eq!(addresses.len(), pools.len());
        assert!(pools.iter().all(|p| p.traded.mint != p.quote.mint));
    }
}
