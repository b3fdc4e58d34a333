// DANS : src/execution/instructions.rs

use crate::decoders::layout::sighash;
use crate::decoders::metadata::{MAX_NAME_LEN, MAX_SYMBOL_LEN, MAX_URI_LEN};
use crate::error::{LaunchpadError, LaunchpadResult};
use borsh::{BorshDeserialize, BorshSerialize};

// --- ARGUMENTS (ordre et largeur = ceux du programme) ---

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct TargetConfigArgs {
    pub token_target_amount: u64,
}

/// `coin_in_amount` puis le minimum attendu en sortie (protection de slippage).
/// Côté programme : `coin_y_min_value` pour swap_x, `coin_x_min_value` pour swap_y.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapArgs {
    pub coin_in_amount: u64,
    pub min_out: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct MetadataArgs {
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

/// Les instructions du programme launchpad, avec leurs arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchpadInstruction {
    InitTargetConfig(TargetConfigArgs),
    NewPool,
    CreateMetadata(MetadataArgs),
    /// Prévisualisation d'une vente (meme -> quote), sans exécution.
    GetSwapXAmt(SwapArgs),
    /// Vente : meme -> quote.
    SwapX(SwapArgs),
    GetSwapYAmt(SwapArgs),
    /// Achat : quote -> meme.
    SwapY(SwapArgs),
    MigrateToRaydium,
}

const INSTRUCTION_NAMES: [&str; 8] = [
    "init_target_config",
    "new_pool",
    "create_metadata",
    "get_swap_x_amt",
    "swap_x",
    "get_swap_y_amt",
    "swap_y",
    "migrate_to_raydium",
];

impl LaunchpadInstruction {
    pub fn name(&self) -> &'static str {
        match self {
            LaunchpadInstruction::InitTargetConfig(_) => "init_target_config",
            LaunchpadInstruction::NewPool => "new_pool",
            LaunchpadInstruction::CreateMetadata(_) => "create_metadata",
            LaunchpadInstruction::GetSwapXAmt(_) => "get_swap_x_amt",
            LaunchpadInstruction::SwapX(_) => "swap_x",
            LaunchpadInstruction::GetSwapYAmt(_) => "get_swap_y_amt",
            LaunchpadInstruction::SwapY(_) => "swap_y",
            LaunchpadInstruction::MigrateToRaydium => "migrate_to_raydium",
        }
    }

    pub fn discriminator(&self) -> [u8; 8] {
        sighash("global", self.name())
    }

    /// Refuse les montants nuls et les chaînes hors bornes, avant tout appel réseau.
    pub fn validate(&self) -> LaunchpadResult<()> {
        match self {
            LaunchpadInstruction::InitTargetConfig(args) if args.token_target_amount == 0 => {
                Err(LaunchpadError::invalid_argument("token_target_amount", "doit être strictement positif"))
            }
            LaunchpadInstruction::GetSwapXAmt(args)
            | LaunchpadInstruction::SwapX(args)
            | LaunchpadInstruction::GetSwapYAmt(args)
            | LaunchpadInstruction::SwapY(args)
                if args.coin_in_amount == 0 =>
            {
                Err(LaunchpadError::invalid_argument("coin_in_amount", "doit être strictement positif"))
            }
            LaunchpadInstruction::CreateMetadata(args) => {
                check_text("name", &args.name, MAX_NAME_LEN)?;
                check_text("symbol", &args.symbol, MAX_SYMBOL_LEN)?;
                check_text("uri", &args.uri, MAX_URI_LEN)
            }
            _ => Ok(()),
        }
    }

    /// discriminateur (8 octets) + arguments little-endian dans l'ordre déclaré.
    pub fn encode(&self) -> LaunchpadResult<Vec<u8>> {
        self.validate()?;
        let mut data = self.discriminator().to_vec();
        let args = match self {
            LaunchpadInstruction::InitTargetConfig(args) => borsh::to_vec(args),
            LaunchpadInstruction::CreateMetadata(args) => borsh::to_vec(args),
            LaunchpadInstruction::GetSwapXAmt(args)
            | LaunchpadInstruction::SwapX(args)
            | LaunchpadInstruction::GetSwapYAmt(args)
            | LaunchpadInstruction::SwapY(args) => borsh::to_vec(args),
            LaunchpadInstruction::NewPool | LaunchpadInstruction::MigrateToRaydium => Ok(vec![]),
        }
        .map_err(|e| LaunchpadError::invalid_argument("args", e.to_string()))?;
        data.extend_from_slice(&args);
        Ok(data)
    }

    /// Décodeur de référence : retrouve l'instruction et ses arguments depuis
    /// les données brutes. Utilisé par l'historique et par les tests.
    pub fn decode(data: &[u8]) -> LaunchpadResult<Self> {
        let Some((head, mut args)) = data.split_first_chunk::<8>() else {
            return Err(LaunchpadError::malformed("instruction", format!("{} octets, discriminateur incomplet", data.len())));
        };
        let name = INSTRUCTION_NAMES
            .iter()
            .find(|name| sighash("global", name) == *head)
            .ok_or_else(|| LaunchpadError::malformed("instruction", format!("discriminateur inconnu {}", hex::encode(head))))?;

        let malformed = |e: std::io::Error| LaunchpadError::malformed(*name, e.to_string());
        let instruction = match *name {
            "init_target_config" => LaunchpadInstruction::InitTargetConfig(TargetConfigArgs::deserialize(&mut args).map_err(malformed)?),
            "new_pool" => LaunchpadInstruction::NewPool,
            "create_metadata" => LaunchpadInstruction::CreateMetadata(MetadataArgs::deserialize(&mut args).map_err(malformed)?),
            "get_swap_x_amt" => LaunchpadInstruction::GetSwapXAmt(SwapArgs::deserialize(&mut args).map_err(malformed)?),
            "swap_x" => LaunchpadInstruction::SwapX(SwapArgs::deserialize(&mut args).map_err(malformed)?),
            "get_swap_y_amt" => LaunchpadInstruction::GetSwapYAmt(SwapArgs::deserialize(&mut args).map_err(malformed)?),
            "swap_y" => LaunchpadInstruction::SwapY(SwapArgs::deserialize(&mut args).map_err(malformed)?),
            _ => LaunchpadInstruction::MigrateToRaydium,
        };
        if !args.is_empty() {
            return Err(LaunchpadError::malformed(*name, format!("{} octets en trop", args.len())));
        }
        Ok(instruction)
    }
}

fn check_text(argument: &'static str, value: &str, max_len: usize) -> LaunchpadResult<()> {
    if value.trim().is_empty() {
        return Err(LaunchpadError::invalid_argument(argument, "ne peut pas être vide"));
    }
    if value.len() > max_len {
        return Err(LaunchpadError::invalid_argument(argument, format!("{} octets (max {max_len})", value.len())));
    }
    Ok(())
}

// --- CONVERSION DES MONTANTS ---

/// Convertit un montant "humain" (ex : 1.5 SOL) en unités de base.
/// Rejette zéro, les négatifs, NaN/infini, et ce qui s'arrondit à zéro.
pub fn to_base_units(amount: f64, decimals: u8) -> LaunchpadResult<u64> {
    if !amount.is_finite() {
        return Err(LaunchpadError::invalid_argument("amount", "valeur non finie"));
    }
    if amount <= 0.0 {
        return Err(LaunchpadError::invalid_argument("amount", format!("{amount} n'est pas strictement positif")));
    }
    let scaled = (amount * 10f64.powi(decimals as i32)).round();
    if scaled < 1.0 {
        return Err(LaunchpadError::invalid_argument("amount", format!("{amount} est inférieur à la plus petite unité")));
    }
    if scaled >= u64::MAX as f64 {
        return Err(LaunchpadError::invalid_argument("amount", format!("{amount} dépasse la capacité d'un u64")));
    }
    Ok(scaled as u64)
}

pub fn from_base_units(amount: u64, decimals: u8) -> f64 {
    amount as f64 / 10f64.powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminators_match_known_values() {
        let swap = SwapArgs { coin_in_amount: 1, min_out: 0 };
        assert_eq!(LaunchpadInstruction::SwapX(swap).discriminator(), [65, 63, 86, 168, 233, 191, 123, 134]);
        assert_eq!(LaunchpadInstruction::SwapY(swap).discriminator(), [126, 208, 104, 214, 101, 217, 59, 65]);
        assert_eq!(LaunchpadInstruction::NewPool.discriminator(), [38, 63, 210, 32, 246, 20, 239, 112]);
        assert_eq!(
            LaunchpadInstruction::InitTargetConfig(TargetConfigArgs { token_target_amount: 1 }).discriminator(),
            [7, 211, 172, 243, 19, 147, 55, 43]
        );
    }

    #[test]
    fn swap_y_bytes_are_discriminator_then_two_le_u64() {
        let ix = LaunchpadInstruction::SwapY(SwapArgs { coin_in_amount: 1_000_000_000, min_out: 42 });
        let data = ix.encode().unwrap();
        assert_eq!(data.len(), 24);
        assert_eq!(&data[..8], &[126, 208, 104, 214, 101, 217, 59, 65]);
        assert_eq!(&data[8..16], &1_000_000_000u64.to_le_bytes());
        assert_eq!(&data[16..24], &42u64.to_le_bytes());
    }

    #[test]
    fn encoded_instructions_decode_back() {
        let cases = vec![
            LaunchpadInstruction::InitTargetConfig(TargetConfigArgs { token_target_amount: 85_000_000_000 }),
            LaunchpadInstruction::NewPool,
            LaunchpadInstruction::CreateMetadata(MetadataArgs {
                name: "Doge Coin".into(),
                symbol: "DOGE".into(),
                uri: "https://arweave.net/doge.json".into(),
            }),
            LaunchpadInstruction::SwapX(SwapArgs { coin_in_amount: 5, min_out: 0 }),
            LaunchpadInstruction::GetSwapYAmt(SwapArgs { coin_in_amount: 7, min_out: 3 }),
            LaunchpadInstruction::MigrateToRaydium,
        ];
        for ix in cases {
            let data = ix.encode().unwrap();
            assert_eq!(&data[..8], &ix.discriminator());
            assert_eq!(LaunchpadInstruction::decode(&data).unwrap(), ix);
        }
    }

    #[test]
    fn zero_amounts_are_rejected_before_encoding() {
        let zero_swap = LaunchpadInstruction::SwapY(SwapArgs { coin_in_amount: 0, min_out: 10 });
        assert!(matches!(
            zero_swap.encode(),
            Err(LaunchpadError::InvalidArgument { argument: "coin_in_amount", .. })
        ));
        let zero_target = LaunchpadInstruction::InitTargetConfig(TargetConfigArgs { token_target_amount: 0 });
        assert!(zero_target.encode().is_err());
    }

    #[test]
    fn metadata_strings_are_bounded() {
        let ix = LaunchpadInstruction::CreateMetadata(MetadataArgs {
            name: "n".repeat(MAX_NAME_LEN + 1),
            symbol: "S".into(),
            uri: "u".into(),
        });
        assert!(ix.validate().is_err());
        let empty = LaunchpadInstruction::CreateMetadata(MetadataArgs { name: " ".into(), symbol: "S".into(), uri: "u".into() });
        assert!(empty.validate().is_err());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(LaunchpadInstruction::decode(&[1, 2, 3]).is_err());
        assert!(LaunchpadInstruction::decode(&[0u8; 24]).is_err());
        let mut data = LaunchpadInstruction::NewPool.encode().unwrap();
        data.push(0);
        assert!(LaunchpadInstruction::decode(&data).is_err());
        let truncated = &LaunchpadInstruction::SwapX(SwapArgs { coin_in_amount: 1, min_out: 1 }).encode().unwrap()[..20];
        assert!(LaunchpadInstruction::decode(truncated).is_err());
    }

    #[test]
    fn converts_ui_amounts() {
        assert_eq!(to_base_units(1.5, 9).unwrap(), 1_500_000_000);
        assert_eq!(to_base_units(0.000001, 6).unwrap(), 1);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY, 0.0000001] {
            assert!(to_base_units(bad, 6).is_err(), "{bad}");
        }
        assert_eq!(from_base_units(2_500_000, 6), 2.5);
    }
}
