// DANS : src/monitoring/metrics.rs

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, IntCounter, IntCounterVec, TextEncoder, register_histogram,
    register_int_counter, register_int_counter_vec,
};

lazy_static! {
    // --- Couche RPC résiliente ---
    pub static ref RPC_ATTEMPTS: IntCounterVec = register_int_counter_vec!(
        "launchpad_rpc_attempts_total",
        "Nombre de tentatives d'appels RPC de lecture",
        &["method"]
    ).unwrap();
    pub static ref RPC_ENDPOINT_ROTATIONS: IntCounter = register_int_counter!(
        "launchpad_rpc_endpoint_rotations_total", "Rotations d'endpoint suite à une limitation de débit"
    ).unwrap();
    pub static ref RPC_RETRIES_EXHAUSTED: IntCounterVec = register_int_counter_vec!(
        "launchpad_rpc_retries_exhausted_total",
        "Appels abandonnés après épuisement des ré-essais",
        &["method"]
    ).unwrap();

    // --- Décodage & Métadonnées ---
    pub static ref ACCOUNTS_SKIPPED: IntCounterVec = register_int_counter_vec!(
        "launchpad_accounts_skipped_total",
        "Comptes ignorés pendant un scan (layout inconnu, données malformées, dérivation)",
        &["reason"]
    ).unwrap();
    pub static ref METADATA_CACHE_HITS: IntCounter = register_int_counter!(
        "launchpad_metadata_cache_hits_total", "Résolutions de métadonnées servies par le cache"
    ).unwrap();
    pub static ref METADATA_CACHE_MISSES: IntCounter = register_int_counter!(
        "launchpad_metadata_cache_misses_total", "Résolutions de métadonnées nécessitant le réseau"
    ).unwrap();

    // --- Orchestrateur ---
    pub static ref REFRESH_CYCLES: IntCounterVec = register_int_counter_vec!(
        "launchpad_refresh_cycles_total",
        "Cycles de rafraîchissement terminés, par issue",
        &["outcome"]
    ).unwrap();
    pub static ref REFRESH_LATENCY: Histogram = register_histogram!(
        "launchpad_refresh_latency_seconds", "Durée d'un cycle complet de rafraîchissement"
    ).unwrap();
}

/// Encode toutes les métriques enregistrées au format texte Prometheus.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
