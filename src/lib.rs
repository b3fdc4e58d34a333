// src/lib.rs

// Client d'un launchpad à courbe de liaison : lecture de l'état on-chain,
// fusion avec les brouillons locaux, et actions utilisateur signées.
pub mod config;
pub mod data_pipeline;
pub mod decoders;
pub mod derivation;
pub mod error;
pub mod execution;
pub mod models;
pub mod monitoring;
pub mod rpc;
pub mod state;

pub use config::Config;
pub use error::{LaunchpadError, LaunchpadResult};
