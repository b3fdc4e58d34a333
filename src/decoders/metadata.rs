// src/decoders/metadata.rs

use crate::error::{LaunchpadError, LaunchpadResult};
use borsh::BorshDeserialize;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

// --- BORNES DE SANITÉ ---
pub const MAX_NAME_LEN: usize = 200;
pub const MAX_SYMBOL_LEN: usize = 50;
pub const MAX_URI_LEN: usize = 1000;

/// key (1) + update_authority (32) + mint (32)
const METADATA_PREFIX_LEN: usize = 1 + 32 + 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMetadata {
    pub address: Pubkey,
    pub update_authority: Pubkey,
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

// --- MIROIR BORSH DU DÉBUT DU COMPTE METAPLEX ---
// Les champs suivants (créateurs, collection...) ne nous intéressent pas :
// borsh s'arrête après `uri` sans exiger la fin du buffer.
#[derive(BorshDeserialize)]
struct MetadataHead {
    _key: u8,
    update_authority: [u8; 32],
    mint: [u8; 32],
    name: String,
    symbol: String,
    uri: String,
}

/// Décode un compte de métadonnées. Échoue "fermé" : un buffer malformé ou
/// tronqué donne `None`, jamais une panique ni une lecture hors limites.
pub fn decode_metadata(address: &Pubkey, data: &[u8]) -> Option<DecodedMetadata> {
    match decode_with_schema(address, data) {
        Ok(metadata) => Some(metadata),
        Err(schema_error) => {
            debug!(account = %address, error = %schema_error, "[Metadata] Décodage borsh échoué, passage au parseur manuel.");
            match decode_manual(address, data) {
                Ok(metadata) => Some(metadata),
                Err(manual_error) => {
                    debug!(account = %address, error = %manual_error, "[Metadata] Parseur manuel échoué, compte ignoré.");
                    None
                }
            }
        }
    }
}

/// Chemin "schéma" : désérialisation borsh, puis mêmes bornes que le chemin manuel.
pub fn decode_with_schema(address: &Pubkey, data: &[u8]) -> LaunchpadResult<DecodedMetadata> {
    let head = MetadataHead::deserialize(&mut &data[..])
        .map_err(|e| LaunchpadError::malformed(address, format!("borsh: {e}")))?;

    check_bound(address, "name", head.name.len(), MAX_NAME_LEN)?;
    check_bound(address, "symbol", head.symbol.len(), MAX_SYMBOL_LEN)?;
    check_bound(address, "uri", head.uri.len(), MAX_URI_LEN)?;

    Ok(DecodedMetadata {
        address: *address,
        update_authority: Pubkey::new_from_array(head.update_authority),
        mint: Pubkey::new_from_array(head.mint),
        name: trim_padding(&head.name),
        symbol: trim_padding(&head.symbol),
        uri: trim_padding(&head.uri),
    })
}

/// Chemin de repli : lecture séquentielle après le préfixe fixe,
/// trois chaînes préfixées par une longueur u32 little-endian.
pub fn decode_manual(address: &Pubkey, data: &[u8]) -> LaunchpadResult<DecodedMetadata> {
    if data.len() < METADATA_PREFIX_LEN {
        return Err(LaunchpadError::malformed(address, "buffer plus court que le préfixe"));
    }
    let update_authority = Pubkey::try_from(&data[1..33])
        .map_err(|_| LaunchpadError::malformed(address, "update_authority illisible"))?;
    let mint = Pubkey::try_from(&data[33..65])
        .map_err(|_| LaunchpadError::malformed(address, "mint illisible"))?;

    let mut cursor = METADATA_PREFIX_LEN;
    let name = read_string(address, data, &mut cursor, "name", MAX_NAME_LEN)?;
    let symbol = read_string(address, data, &mut cursor, "symbol", MAX_SYMBOL_LEN)?;
    let uri = read_string(address, data, &mut cursor, "uri", MAX_URI_LEN)?;

    Ok(DecodedMetadata { address: *address, update_authority, mint, name, symbol, uri })
}

fn read_string(
    address: &Pubkey,
    data: &[u8],
    cursor: &mut usize,
    field: &str,
    max_len: usize,
) -> LaunchpadResult<String> {
    let len_bytes: [u8; 4] = data
        .get(*cursor..cursor.saturating_add(4))
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| LaunchpadError::malformed(address, format!("longueur de `{field}` tronquée")))?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    check_bound(address, field, len, max_len)?;

    let start = *cursor + 4;
    let bytes = data
        .get(start..start + len)
        .ok_or_else(|| LaunchpadError::malformed(address, format!("`{field}` dépasse le buffer")))?;
    *cursor = start + len;
    Ok(trim_padding(&String::from_utf8_lossy(bytes)))
}

fn check_bound(address: &Pubkey, field: &str, len: usize, max_len: usize) -> LaunchpadResult<()> {
    if len > max_len {
        return Err(LaunchpadError::malformed(
            address,
            format!("`{field}` déclare {len} octets (max {max_len})"),
        ));
    }
    Ok(())
}

/// Metaplex complète les chaînes avec des octets nuls.
fn trim_padding(value: &str) -> String {
    value.trim_end_matches('\0').trim().to_string()
}

/// Encode un compte de métadonnées minimal, pour les tests.
#[cfg(test)]
pub(crate) fn encode_metadata_fixture(mint: &Pubkey, name: &str, symbol: &str, uri: &str) -> Vec<u8> {
    let mut data = vec![4u8];
    data.extend_from_slice(Pubkey::new_unique().as_ref());
    data.extend_from_slice(mint.as_ref());
    for value in [name, symbol, uri] {
        data.extend_from_slice(&(value.len() as u32).to_le_bytes());
        data.extend_from_slice(value.as_bytes());
    }
    // Queue du compte (créateurs, etc.) que le décodeur doit ignorer.
    data.extend_from_slice(&[0u8; 32]);
    data
}
