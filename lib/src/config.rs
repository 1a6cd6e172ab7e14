//! Explicit configuration, injected at construction. Endpoints are never
//! read from process-wide statics; a file plus a `PV`-prefixed environment
//! overlay deserializes into this struct once, at startup.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::debug;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub chain: ChainConfig,
    /// When present, votes go through the relayer; otherwise the dev
    /// direct-submission path is used.
    pub relayer: Option<RelayerConfig>,
    pub store_path: PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub voting_contract: String,
    pub registration_contract: String,
    /// Well-known test key for the direct dev path. Never a production key.
    pub dev_key: Option<String>,
    /// Fixed gas price in wei; queried from the node when absent.
    pub gas_price: Option<u64>,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
}

fn default_gas_limit() -> u64 {
    1_000_000
}

#[derive(Clone, Debug, Deserialize)]
pub struct RelayerConfig {
    pub vote_url: String,
}

impl AppConfig {
    pub fn from_path(path: &Path) -> Result<AppConfig, ConfigError> {
        debug!("reading config from {:?}", path);
        Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("PV").separator("_"))
            .build()?
            .try_deserialize()
    }
}
