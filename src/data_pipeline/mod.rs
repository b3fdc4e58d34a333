// src/data_pipeline/mod.rs

// Le pipeline de lecture : scan du programme, enrichissement des pools,
// résolution des métadonnées, puis publication par l'orchestrateur.
pub mod api_connectors;
pub mod demo;
pub mod enrichment;
pub mod history;
pub mod metadata_resolver;
pub mod onchain_scanner;
pub mod refresh;

pub use enrichment::PoolEnricher;
pub use metadata_resolver::MetadataResolver;
pub use refresh::{PoolSnapshot, RefreshOrchestrator, RefreshPhase};
