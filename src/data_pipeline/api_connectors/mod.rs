// src/data_pipeline/api_connectors/mod.rs

// Les sources hors-chaîne interrogées par le pipeline.
pub mod offchain_document;
