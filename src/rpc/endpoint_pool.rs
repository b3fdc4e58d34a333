// src/rpc/endpoint_pool.rs

use crate::error::{LaunchpadError, LaunchpadResult};
use crate::monitoring::metrics;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use std::sync::{Arc, Mutex, PoisonError};

/// Un point d'entrée RPC et son client.
pub struct Endpoint {
    pub url: String,
    pub client: RpcClient,
}

/// Liste ordonnée d'endpoints avec un curseur tournant.
/// Seule la couche résiliente fait avancer le curseur, sur limitation de débit.
pub struct EndpointPool {
    endpoints: Vec<Arc<Endpoint>>,
    cursor: Mutex<EndpointCursor>,
}

#[derive(Default)]
struct EndpointCursor {
    index: usize,
    rotations: u64,
}

impl EndpointPool {
    pub fn new(urls: Vec<String>, commitment: CommitmentConfig) -> LaunchpadResult<Self> {
        if urls.is_empty() {
            return Err(LaunchpadError::Config("le pool d'endpoints est vide".into()));
        }
        let endpoints = urls
            .into_iter()
            .map(|url| {
                Arc::new(Endpoint {
                    client: RpcClient::new_with_commitment(url.clone(), commitment),
                    url,
                })
            })
            .collect();
        Ok(Self { endpoints, cursor: Mutex::new(EndpointCursor::default()) })
    }

    /// L'endpoint courant.
    pub fn current(&self) -> Arc<Endpoint> {
        let cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        self.endpoints[cursor.index].clone()
    }

    pub fn current_index(&self) -> usize {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner).index
    }

    /// Passe à l'endpoint suivant (round-robin) et retourne son index.
    pub(crate) fn rotate(&self) -> usize {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        cursor.index = (cursor.index + 1) % self.endpoints.len();
        cursor.rotations += 1;
        metrics::RPC_ENDPOINT_ROTATIONS.inc();
        cursor.index
    }

    pub fn rotations(&self) -> u64 {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner).rotations
    }
}
