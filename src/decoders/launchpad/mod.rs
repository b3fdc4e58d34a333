pub mod pool;
pub mod target_config;

// On ré-exporte les éléments principaux
pub use pool::{DecodedBoundPool, POOL_ACCOUNT_SIZE, POOL_LAYOUT, decode_pool};
pub use target_config::{DecodedTargetConfig, TARGET_CONFIG_ACCOUNT_SIZE, TARGET_CONFIG_LAYOUT, decode_target_config};
