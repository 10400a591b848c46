//! # Palaver Binary
//!
//! Wires the engine to its reference adapters, seeds a small board when
//! the database is empty, and prints the index view as JSON.

use std::sync::Arc;

use palaver_auth_simple::SimpleCapabilityOracle;
use palaver_cache_memory::MemoryCacheStore;
use palaver_configs::EngineConfig;
use palaver_db_sqlite::SqliteForumRepo;
use palaver_engine::{Memo, PlaceService};

mod seed;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = EngineConfig::load()?;

    // 1. Storage adapter
    let repo = Arc::new(SqliteForumRepo::new(&config.database_url).await?);

    // 2. Cache adapter
    let cache = Arc::new(MemoryCacheStore::new());
    let memo = Memo::new(cache, config.cache_ttl());

    // 3. Demo data, only when the board is brand new
    seed::seed_if_empty(repo.as_ref()).await?;

    let places = PlaceService::new(repo, memo);
    let oracle = SimpleCapabilityOracle::anonymous();

    tracing::info!("building index view");
    let index = places.index(&oracle, config.discussions_per_place).await?;

    println!("{}", serde_json::to_string_pretty(&index)?);

    Ok(())
}
