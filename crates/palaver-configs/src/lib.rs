//! # palaver-configs
//!
//! Typed configuration for the engine and its adapters. Values layer as
//! defaults < optional `palaver.toml` < `PALAVER_*` environment variables,
//! with `.env` files loaded first.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Storage adapter connection string.
    pub database_url: String,
    /// Lifetime of cached tree snapshots, in seconds.
    pub cache_ttl_secs: u64,
    /// Discussion cap per top-level bucket on the index view.
    pub discussions_per_place: usize,
    /// Page size for single-place views.
    pub discussions_per_page: usize,
}

impl EngineConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("database_url", "sqlite::memory:")?
            .set_default("cache_ttl_secs", 300)?
            .set_default("discussions_per_place", 10)?
            .set_default("discussions_per_page", 20)?
            .add_source(config::File::with_name("palaver").required(false))
            .add_source(config::Environment::with_prefix("PALAVER"))
            .build()?;

        let loaded: Self = settings.try_deserialize()?;
        tracing::debug!(database_url = %loaded.database_url, "configuration loaded");

        Ok(loaded)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
