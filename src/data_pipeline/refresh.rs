// src/data_pipeline/refresh.rs

use crate::data_pipeline::demo::demo_pools;
use crate::data_pipeline::enrichment::PoolEnricher;
use crate::data_pipeline::onchain_scanner::{classify_program_accounts, find_program_accounts};
use crate::error::{LaunchpadError, LaunchpadResult};
use crate::models::{DraftPoolRecord, PoolRecord, UnifiedPoolView, unix_now};
use crate::monitoring::metrics;
use crate::rpc::ledger::LedgerReader;
use crate::state::{DraftStore, KeyValueStore, reconcile};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub const SNAPSHOT_KEY: &str = "launchpad:last_snapshot";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshPhase {
    Idle,
    Scanning,
    Decoding,
    Enriching,
    Reconciling,
    DemoFallback,
}

/// Ce que la couche de présentation lit : la dernière vue unifiée publiée.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// 0 : rien n'a encore été publié par ce processus.
    pub cycle: u64,
    pub views: Vec<UnifiedPoolView>,
    pub is_demo: bool,
    /// Raison du repli en mode démo, conservée pour l'affichage.
    pub failure: Option<String>,
    pub completed_at: Option<i64>,
    /// Vrai pour un snapshot relu depuis le stockage local au démarrage.
    #[serde(default)]
    pub restored: bool,
}

/// Possède l'état partagé d'un cycle de rafraîchissement (phase, snapshot
/// publié) et orchestre scan -> décodage -> enrichissement -> fusion.
///
/// Deux cycles peuvent tourner en même temps : aucun n'annule l'autre, et le
/// snapshot publié est celui du dernier cycle *terminé*.
pub struct RefreshOrchestrator {
    ledger: Arc<dyn LedgerReader>,
    enricher: PoolEnricher,
    drafts: DraftStore,
    store: Arc<dyn KeyValueStore>,
    program_id: Pubkey,
    phase: Mutex<RefreshPhase>,
    snapshot: ArcSwap<PoolSnapshot>,
    cycles: AtomicU64,
    /// Numéro du dernier cycle publié, pour les abonnés.
    published: watch::Sender<u64>,
}

impl RefreshOrchestrator {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        enricher: PoolEnricher,
        drafts: DraftStore,
        store: Arc<dyn KeyValueStore>,
        program_id: Pubkey,
    ) -> Self {
        Self {
            ledger,
            enricher,
            drafts,
            store,
            program_id,
            phase: Mutex::new(RefreshPhase::Idle),
            snapshot: ArcSwap::from_pointee(PoolSnapshot::default()),
            cycles: AtomicU64::new(0),
            published: watch::channel(0).0,
        }
    }

    pub fn phase(&self) -> RefreshPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: RefreshPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    pub fn snapshot(&self) -> Arc<PoolSnapshot> {
        self.snapshot.load_full()
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    /// Notifié à chaque publication (cycle terminé, réussi ou démo).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.published.subscribe()
    }

    /// Publie le dernier snapshot persisté, si aucun cycle n'a encore abouti.
    pub fn restore_cached(&self) -> LaunchpadResult<bool> {
        let Some(bytes) = self.store.get(SNAPSHOT_KEY)? else {
            return Ok(false);
        };
        let mut cached: PoolSnapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "[Refresh] Snapshot persisté illisible, ignoré.");
                return Ok(false);
            }
        };
        cached.cycle = 0;
        cached.restored = true;

        // Comparaison-échange : un cycle publié entre-temps n'est jamais écrasé.
        let current = self.snapshot.load_full();
        if current.cycle != 0 {
            return Ok(false);
        }
        let views = cached.views.len();
        let previous = self.snapshot.compare_and_swap(&current, Arc::new(cached));
        if !Arc::ptr_eq(&*previous, &current) {
            return Ok(false);
        }
        info!(pools = views, "[Refresh] Snapshot précédent restauré.");
        Ok(true)
    }

    /// Un cycle complet. Ne renvoie jamais d'erreur : un échec réseau publie
    /// des données de démonstration accompagnées de la raison.
    pub async fn refresh(&self) -> Arc<PoolSnapshot> {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let timer = metrics::REFRESH_LATENCY.start_timer();
        info!(cycle, "[Refresh] Début du cycle.");

        let drafts = self.drafts.load().unwrap_or_else(|e| {
            warn!(error = %e, "[Refresh] Brouillons indisponibles pour ce cycle.");
            vec![]
        });

        let snapshot = match self.run_cycle().await {
            Ok(pools) => {
                self.set_phase(RefreshPhase::Reconciling);
                let snapshot = self.publishable(cycle, &pools, &drafts, None);
                self.persist(&snapshot);
                metrics::REFRESH_CYCLES.with_label_values(&["success"]).inc();
                snapshot
            }
            Err(e) => {
                self.set_phase(RefreshPhase::DemoFallback);
                error!(cycle, error = %e, "[Refresh] Réseau inutilisable, passage en données de démonstration.");
                metrics::REFRESH_CYCLES.with_label_values(&["demo"]).inc();
                self.publishable(cycle, &demo_pools(unix_now()), &drafts, Some(e.to_string()))
            }
        };

        let snapshot = Arc::new(snapshot);
        self.snapshot.store(snapshot.clone());
        self.published.send_replace(cycle);
        self.set_phase(RefreshPhase::Idle);
        timer.observe_duration();
        info!(cycle, pools = snapshot.views.len(), demo = snapshot.is_demo, "[Refresh] Cycle publié.");
        snapshot
    }

    async fn run_cycle(&self) -> LaunchpadResult<Vec<PoolRecord>> {
        self.set_phase(RefreshPhase::Scanning);
        let accounts = find_program_accounts(self.ledger.as_ref(), &self.program_id).await?;

        self.set_phase(RefreshPhase::Decoding);
        let scan = classify_program_accounts(&accounts, &self.program_id);
        if scan.skipped > 0 {
            info!(skipped = scan.skipped, "[Refresh] Comptes ignorés pendant le décodage.");
        }

        self.set_phase(RefreshPhase::Enriching);
        self.enricher.enrich(&scan).await
    }

    fn publishable(
        &self,
        cycle: u64,
        pools: &[PoolRecord],
        drafts: &[DraftPoolRecord],
        failure: Option<String>,
    ) -> PoolSnapshot {
        let reconciliation = reconcile(pools, drafts);
        // Le mode démo ne remplace aucun brouillon.
        if failure.is_none() && !reconciliation.superseded.is_empty() {
            if let Err(e) = self.drafts.mark_superseded(&reconciliation.superseded) {
                warn!(error = %e, "[Refresh] Impossible de marquer les brouillons remplacés.");
            }
        }
        PoolSnapshot {
            cycle,
            views: reconciliation.views,
            is_demo: failure.is_some(),
            failure,
            completed_at: Some(unix_now()),
            restored: false,
        }
    }

    fn persist(&self, snapshot: &PoolSnapshot) {
        let result = serde_json::to_vec(snapshot)
            .map_err(|e| LaunchpadError::Storage(e.to_string()))
            .and_then(|bytes| self.store.set(SNAPSHOT_KEY, &bytes));
        if let Err(e) = result {
            warn!(error = %e, "[Refresh] Snapshot non persisté.");
        }
    }

    /// Déclenchement manuel, en tâche de fond.
    pub fn trigger(self: &Arc<Self>) -> JoinHandle<Arc<PoolSnapshot>> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.refresh().await })
    }

    /// Rafraîchissement périodique. Le premier cycle part immédiatement.
    pub fn spawn_periodic(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                orchestrator.refresh().await;
            }
        })
    }
}
