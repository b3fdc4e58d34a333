// src/execution/mod.rs

// Le chemin d'écriture : encodage des instructions, construction des
// transactions, signature externe et envoi unique.
pub mod actions;
pub mod instructions;
pub mod sender;
pub mod signer;
pub mod transaction_builder;

pub use actions::{CreatePoolRequest, CreatedPool, LaunchpadActions};
pub use instructions::{LaunchpadInstruction, MetadataArgs, SwapArgs, TargetConfigArgs};
pub use sender::TransactionSubmitter;
pub use signer::{KeypairSigner, TransactionSigner};
pub use transaction_builder::{LaunchpadTransactionBuilder, PoolAccounts};
