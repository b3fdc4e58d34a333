// DANS : src/bin/launchpad_cli.rs

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use launchpad_client::{
    config::Config,
    data_pipeline::history::pool_history,
    decoders::spl_token_decoders::mint::decode_mint,
    derivation::{self, WSOL_MINT},
    execution::{CreatePoolRequest, KeypairSigner, LaunchpadActions, LaunchpadTransactionBuilder, PoolAccounts, TransactionSigner},
    monitoring::logging,
    rpc::{LedgerReader, ResilientRpcClient},
    state::{DraftStore, FileStore},
};
use solana_sdk::{instruction::AccountMeta, pubkey::Pubkey};
use std::{str::FromStr, sync::Arc};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Actions utilisateur du launchpad", long_about = None)]
struct Cli {
    /// Keypair JSON au format solana-keygen.
    #[arg(long, global = true, conflicts_with = "secret_key")]
    keypair: Option<String>,

    /// Clé secrète encodée en base58.
    #[arg(long, global = true)]
    secret_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct PoolSelector {
    #[arg(long)]
    traded_mint: Pubkey,
    #[arg(long, default_value_t = WSOL_MINT)]
    quote_mint: Pubkey,
    /// Adresse du pool ; dérivée des deux mints si absente.
    #[arg(long)]
    pool: Option<Pubkey>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialise la target config d'une paire.
    InitConfig {
        #[arg(long)]
        traded_mint: Pubkey,
        #[arg(long, default_value_t = WSOL_MINT)]
        quote_mint: Pubkey,
        /// Seuil de migration, en unités de base du token échangé.
        #[arg(long)]
        target_amount: u64,
    },
    /// Crée un pool et ses métadonnées, puis l'enregistre en brouillon.
    CreatePool {
        #[arg(long)]
        traded_mint: Pubkey,
        #[arg(long, default_value_t = WSOL_MINT)]
        quote_mint: Pubkey,
        #[arg(long)]
        name: String,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        uri: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Achète avec `amount` unités du mint de cotation.
    Buy {
        #[command(flatten)]
        pool: PoolSelector,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value_t = 0)]
        min_out: u64,
    },
    /// Vend `amount` unités du token échangé.
    Sell {
        #[command(flatten)]
        pool: PoolSelector,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value_t = 0)]
        min_out: u64,
    },
    /// Migre le pool vers l'AMM. Comptes AMM au format `PUBKEY[:w][:s]`, dans l'ordre du programme.
    Migrate {
        #[command(flatten)]
        pool: PoolSelector,
        #[arg(long = "amm-account")]
        amm_accounts: Vec<String>,
    },
    /// Brouillons locaux.
    Drafts {
        #[command(subcommand)]
        action: DraftCommands,
    },
    /// Dernières transactions d'un pool, décodées.
    History {
        #[arg(long)]
        pool: Pubkey,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum DraftCommands {
    List,
    /// Supprime par adresse de pool ou par mint échangé.
    Remove { key: Pubkey },
}

fn load_signer(cli: &Cli) -> Result<Arc<dyn TransactionSigner>> {
    let signer = match (&cli.keypair, &cli.secret_key) {
        (Some(path), _) => KeypairSigner::from_file(path)?,
        (None, Some(secret)) => KeypairSigner::from_base58(secret)?,
        (None, None) => bail!("--keypair ou --secret-key est requis pour signer"),
    };
    Ok(Arc::new(signer))
}

/// `PUBKEY[:w][:s]` -> AccountMeta.
fn parse_account_meta(raw: &str) -> Result<AccountMeta> {
    let mut parts = raw.split(':');
    let address = parts.next().ok_or_else(|| anyhow!("compte vide"))?;
    let pubkey = Pubkey::from_str(address).with_context(|| format!("adresse invalide: {address}"))?;
    let (mut writable, mut signer) = (false, false);
    for flag in parts {
        match flag {
            "w" => writable = true,
            "s" => signer = true,
            other => bail!("drapeau de compte inconnu '{other}' dans {raw}"),
        }
    }
    Ok(if writable { AccountMeta::new(pubkey, signer) } else { AccountMeta::new_readonly(pubkey, signer) })
}

async fn mint_decimals(rpc: &ResilientRpcClient, mint: &Pubkey) -> Result<u8> {
    let account = rpc.get_account(mint).await?.ok_or_else(|| anyhow!("mint {mint} introuvable"))?;
    Ok(decode_mint(mint, &account.data)?.decimals)
}

fn resolve_pool(selector: &PoolSelector, program_id: &Pubkey) -> Result<PoolAccounts> {
    let pool = match selector.pool {
        Some(pool) => pool,
        None => derivation::bound_pool(&selector.traded_mint, &selector.quote_mint, program_id)?.address,
    };
    Ok(PoolAccounts::derive(pool, selector.traded_mint, selector.quote_mint, program_id)?)
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let program_id = config.program_id()?;
    let rpc = Arc::new(ResilientRpcClient::from_config(&config)?);
    let drafts = DraftStore::new(Arc::new(FileStore::new(&config.store_path)));

    // Les commandes en lecture seule n'exigent pas de clé.
    match &cli.command {
        Commands::Drafts { action: DraftCommands::List } => {
            let list = drafts.load()?;
            println!("{}", serde_json::to_string_pretty(&list)?);
            return Ok(());
        }
        Commands::Drafts { action: DraftCommands::Remove { key } } => {
            let removed = drafts.remove(key)?;
            println!("{removed} brouillon(s) supprimé(s)");
            return Ok(());
        }
        Commands::History { pool, limit } => {
            let entries = pool_history(rpc.as_ref(), pool, &program_id, *limit, config.document_concurrency).await?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }
        _ => {}
    }

    let signer = load_signer(&cli)?;
    let builder = LaunchpadTransactionBuilder::new(program_id, config.fee_authority());
    let actions = LaunchpadActions::new(rpc.clone(), builder, signer, drafts, config.commitment());
    info!(payer = %actions.payer(), "[CLI] Signataire chargé.");

    let signature = match cli.command {
        Commands::InitConfig { traded_mint, quote_mint, target_amount } => {
            actions.init_target_config(&quote_mint, &traded_mint, target_amount).await?
        }
        Commands::CreatePool { traded_mint, quote_mint, name, symbol, uri, description, image } => {
            let created = actions
                .create_pool(CreatePoolRequest {
                    traded_mint,
                    quote_mint,
                    name,
                    symbol,
                    uri,
                    description,
                    image_uri: image,
                })
                .await?;
            println!("pool: {}", created.pool);
            created.signature
        }
        Commands::Buy { pool, amount, min_out } => {
            let accounts = resolve_pool(&pool, &program_id)?;
            let decimals = mint_decimals(&rpc, &pool.quote_mint).await?;
            actions.buy(&accounts, amount, decimals, min_out).await?
        }
        Commands::Sell { pool, amount, min_out } => {
            let accounts = resolve_pool(&pool, &program_id)?;
            let decimals = mint_decimals(&rpc, &pool.traded_mint).await?;
            actions.sell(&accounts, amount, decimals, min_out).await?
        }
        Commands::Migrate { pool, amm_accounts } => {
            let accounts = resolve_pool(&pool, &program_id)?;
            let metas = amm_accounts.iter().map(|raw| parse_account_meta(raw)).collect::<Result<Vec<_>>>()?;
            actions.migrate(&accounts, metas).await?
        }
        Commands::Drafts { .. } | Commands::History { .. } => return Ok(()),
    };
    println!("signature: {signature}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::setup_logging();
    let cli = Cli::parse();
    let config = Config::load().context("chargement de la configuration LAUNCHPAD_*")?;

    if let Err(e) = run(cli, config).await {
        error!("[CLI] La commande a échoué : {:?}", e);
        std::process::exit(1);
    }
    Ok(())
}
