// DANS : src/bin/scan_pools.rs

use anyhow::{Context, Result};
use clap::Parser;
use launchpad_client::{
    config::Config,
    data_pipeline::{
        MetadataResolver, PoolEnricher, PoolSnapshot, RefreshOrchestrator,
        api_connectors::offchain_document::HttpDocumentFetcher,
    },
    monitoring::{logging, metrics},
    rpc::ResilientRpcClient,
    state::{DraftStore, FileStore, KeyValueStore, MetadataCache},
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Scanne le programme launchpad et affiche la vue unifiée des pools
/// (on-chain + brouillons locaux).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Rafraîchit en boucle à l'intervalle configuré au lieu d'un seul cycle.
    #[arg(long)]
    watch: bool,

    /// Sortie JSON (un snapshot par ligne).
    #[arg(long)]
    json: bool,

    /// Affiche les métriques Prometheus après chaque cycle.
    #[arg(long)]
    metrics: bool,
}

fn build_orchestrator(config: &Config) -> Result<Arc<RefreshOrchestrator>> {
    let program_id = config.program_id()?;
    let rpc = Arc::new(ResilientRpcClient::from_config(config)?);
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.store_path));

    let resolver = Arc::new(MetadataResolver::new(
        rpc.clone(),
        Arc::new(HttpDocumentFetcher::new(config.document_timeout())),
        Arc::new(MetadataCache::new(config.metadata_cache_ttl())),
        config.account_batch_size,
        config.document_concurrency,
    ));
    let enricher = PoolEnricher::new(
        rpc.clone(),
        resolver,
        program_id,
        config.account_batch_size,
        config.document_concurrency,
    );
    Ok(Arc::new(RefreshOrchestrator::new(
        rpc,
        enricher,
        DraftStore::new(store.clone()),
        store,
        program_id,
    )))
}

fn print_snapshot(snapshot: &PoolSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }
    if let Some(reason) = &snapshot.failure {
        println!("⚠️  Données de démonstration (échec du scan : {reason})");
    }
    println!("--- Cycle {} : {} pools ---", snapshot.cycle, snapshot.views.len());
    for view in &snapshot.views {
        println!(
            "{:<12} {:<24} {:>6} pool={} mint={} meme={} quote={} seuil={}",
            format!("{:?}", view.provenance),
            view.name.as_deref().unwrap_or("?"),
            view.symbol.as_deref().unwrap_or("?"),
            view.pool_address.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            view.traded_mint,
            view.traded_balance.map(|b| b.to_string()).unwrap_or_else(|| "-".into()),
            view.quote_balance.map(|b| b.to_string()).unwrap_or_else(|| "-".into()),
            view.migration_threshold.map(|b| b.to_string()).unwrap_or_else(|| "-".into()),
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::setup_logging();
    let cli = Cli::parse();
    let config = Config::load().context("chargement de la configuration LAUNCHPAD_*")?;
    let orchestrator = build_orchestrator(&config)?;

    match orchestrator.restore_cached() {
        Ok(true) => print_snapshot(&orchestrator.snapshot(), cli.json)?,
        Ok(false) => {}
        Err(e) => warn!(error = %e, "[ScanPools] Lecture du snapshot persisté impossible."),
    }

    if !cli.watch {
        let snapshot = orchestrator.refresh().await;
        print_snapshot(&snapshot, cli.json)?;
        if cli.metrics {
            println!("{}", metrics::gather());
        }
        return Ok(());
    }

    let interval = config.refresh_interval();
    info!(interval_secs = interval.as_secs(), "[ScanPools] Mode surveillance (Entrée = rafraîchir maintenant).");
    let mut published = orchestrator.subscribe();
    let periodic = orchestrator.spawn_periodic(interval);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            changed = published.changed() => {
                if changed.is_err() {
                    break;
                }
                published.borrow_and_update();
                print_snapshot(&orchestrator.snapshot(), cli.json)?;
                if cli.metrics {
                    println!("{}", metrics::gather());
                }
            }
            line = stdin.next_line() => {
                match line {
                    Ok(Some(_)) => {
                        info!("[ScanPools] Rafraîchissement manuel.");
                        orchestrator.trigger();
                    }
                    // stdin fermé : on continue au rythme du timer.
                    Ok(None) | Err(_) => std::future::pending::<()>().await,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("[ScanPools] Arrêt demandé.");
                break;
            }
        }
    }
    periodic.abort();
    Ok(())
}
