// src/decoders/layout.rs

//! Les layouts on-chain décrits comme des tables (nom, offset, largeur, type).
//! Le décodeur lit via ces tables et les fixtures de test sont générées à partir
//! des mêmes tables : un offset faux casse les deux à la fois.

use crate::error::{LaunchpadError, LaunchpadResult};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U64,
    Pubkey,
    Bool,
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, offset: usize, width: usize, kind: FieldKind) -> Self {
        Self { name, offset, width, kind }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.width
    }
}

#[derive(Debug)]
pub struct Layout {
    pub name: &'static str,
    pub size: usize,
    pub fields: &'static [FieldSpec],
}

impl Layout {
    pub fn field(&self, name: &str) -> LaunchpadResult<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| LaunchpadError::malformed(self.name, format!("champ inconnu `{name}`")))
    }

    /// Ouvre un lecteur sur `data`. La longueur doit correspondre exactement.
    pub fn reader<'a>(&'static self, address: &Pubkey, data: &'a [u8]) -> LaunchpadResult<LayoutReader<'a>> {
        if data.len() != self.size {
            return Err(LaunchpadError::malformed(
                address,
                format!("{}: longueur {} au lieu de {}", self.name, data.len(), self.size),
            ));
        }
        Ok(LayoutReader { layout: self, address: *address, data })
    }

    /// Vérifie la cohérence de la table : champs triés, sans chevauchement, dans les bornes.
    pub fn validate(&self) -> Result<(), String> {
        let mut cursor = 0;
        for field in self.fields {
            if field.offset < cursor {
                return Err(format!("{}: `{}` chevauche le champ précédent", self.name, field.name));
            }
            let expected_width = match field.kind {
                FieldKind::U64 => Some(8),
                FieldKind::Pubkey => Some(32),
                FieldKind::Bool => Some(1),
                FieldKind::Bytes => None,
            };
            if expected_width.is_some_and(|w| w != field.width) {
                return Err(format!("{}: largeur incohérente pour `{}`", self.name, field.name));
            }
            cursor = field.end();
        }
        if cursor > self.size {
            return Err(format!("{}: les champs dépassent la taille {}", self.name, self.size));
        }
        Ok(())
    }
}

pub struct LayoutReader<'a> {
    layout: &'static Layout,
    address: Pubkey,
    data: &'a [u8],
}

impl<'a> LayoutReader<'a> {
    fn slice(&self, name: &str, kind: FieldKind) -> LaunchpadResult<&'a [u8]> {
        let field = self.layout.field(name)?;
        if field.kind != kind {
            return Err(LaunchpadError::malformed(&self.address, format!("`{name}` n'est pas du type {kind:?}")));
        }
        self.data
            .get(field.offset..field.end())
            .ok_or_else(|| LaunchpadError::malformed(&self.address, format!("`{name}` hors limites")))
    }

    pub fn u64(&self, name: &str) -> LaunchpadResult<u64> {
        let bytes = self.slice(name, FieldKind::U64)?;
        let array: [u8; 8] = bytes
            .try_into()
            .map_err(|_| LaunchpadError::malformed(&self.address, format!("`{name}` tronqué")))?;
        Ok(u64::from_le_bytes(array))
    }

    pub fn pubkey(&self, name: &str) -> LaunchpadResult<Pubkey> {
        let bytes = self.slice(name, FieldKind::Pubkey)?;
        Pubkey::try_from(bytes).map_err(|_| LaunchpadError::malformed(&self.address, format!("`{name}` tronqué")))
    }

    pub fn bool(&self, name: &str) -> LaunchpadResult<bool> {
        match self.slice(name, FieldKind::Bool)? {
            [0] => Ok(false),
            [1] => Ok(true),
            other => Err(LaunchpadError::malformed(
                &self.address,
                format!("`{name}` n'est pas un booléen ({other:?})"),
            )),
        }
    }

    pub fn bytes(&self, name: &str) -> LaunchpadResult<&'a [u8]> {
        self.slice(name, FieldKind::Bytes)
    }
}

/// Les 8 premiers octets de sha256("<namespace>:<name>"), la convention Anchor
/// pour les discriminateurs d'instructions ("global") et de comptes ("account").
pub fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(format!("{namespace}:{name}"));
    let hash = hasher.finalize();
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash[..8]);
    discriminator
}

/// Construit un buffer conforme à une table, pour les fixtures de test.
#[cfg(test)]
pub(crate) struct LayoutWriter {
    layout: &'static Layout,
    data: Vec<u8>,
}

#[cfg(test)]
impl LayoutWriter {
    pub(crate) fn new(layout: &'static Layout) -> Self {
        Self { layout, data: vec![0u8; layout.size] }
    }

    fn put(mut self, name: &str, bytes: &[u8]) -> Self {
        let field = self.layout.field(name).expect("champ inconnu dans la fixture");
        assert_eq!(field.width, bytes.len(), "largeur invalide pour `{name}`");
        self.data[field.offset..field.end()].copy_from_slice(bytes);
        self
    }

    pub(crate) fn u64(self, name: &str, value: u64) -> Self {
        self.put(name, &value.to_le_bytes())
    }

    pub(crate) fn pubkey(self, name: &str, value: &Pubkey) -> Self {
        self.put(name, value.as_ref())
    }

    pub(crate) fn bool(self, name: &str, value: bool) -> Self {
        self.put(name, &[value as u8])
    }

    pub(crate) fn bytes(self, name: &str, value: &[u8]) -> Self {
        self.put(name, value)
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SAMPLE: Layout = Layout {
        name: "Sample",
        size: 41,
        fields: &[
            FieldSpec::new("amount", 0, 8, FieldKind::U64),
            FieldSpec::new("owner", 8, 32, FieldKind::Pubkey),
            FieldSpec::new("flag", 40, 1, FieldKind::Bool),
        ],
    };

    #[test]
    fn reader_rejects_wrong_length() {
        let address = Pubkey::new_unique();
        assert!(SAMPLE.reader(&address, &[0u8; 40]).is_err());
        assert!(SAMPLE.reader(&address, &[]).is_err());
    }

    #[test]
    fn reader_reads_fields_written_by_writer() {
        let owner = Pubkey::new_unique();
        let data = LayoutWriter::new(&SAMPLE)
            .u64("amount", 42)
            .pubkey("owner", &owner)
            .bool("flag", true)
            .finish();
        let reader = SAMPLE.reader(&Pubkey::default(), &data).unwrap();
        assert_eq!(reader.u64("amount").unwrap(), 42);
        assert_eq!(reader.pubkey("owner").unwrap(), owner);
        assert!(reader.bool("flag").unwrap());
        assert!(reader.u64("owner").is_err());
    }

    #[test]
    fn non_boolean_byte_is_malformed() {
        let mut data = vec![0u8; 41];
        data[40] = 7;
        let reader = SAMPLE.reader(&Pubkey::default(), &data).unwrap();
        assert!(matches!(reader.bool("flag"), Err(LaunchpadError::MalformedData { .. })));
    }

    #[test]
    fn sighash_matches_known_anchor_discriminator() {
        // Discriminateur `swap` d'Orca Whirlpool, publié dans son IDL.
        assert_eq!(sighash("global", "swap"), [248, 198, 158, 145, 225, 117, 135, 200]);
    }
}
