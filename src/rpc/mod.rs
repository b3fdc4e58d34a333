// src/rpc/mod.rs

pub mod endpoint_pool;
pub mod ledger;
pub mod resilient_client;

pub use endpoint_pool::{Endpoint, EndpointPool};
pub use ledger::{LedgerReader, LedgerWriter, RawAccount, SignatureInfo, TransactionSummary};
pub use resilient_client::ResilientRpcClient;
