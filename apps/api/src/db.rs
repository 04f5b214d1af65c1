use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::MemoryConfig;
use crate::memory::postgres::PgMemoryStore;
use crate::memory::TalentMemory;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Builds the memory service. Falls back to stateless operation when memory is
/// disabled, unconfigured, or the database cannot be reached.
pub async fn init_memory(config: &MemoryConfig) -> TalentMemory {
    if !config.enabled {
        info!("Talent memory disabled");
        return TalentMemory::disabled();
    }
    let Some(url) = config.database_url.as_deref() else {
        warn!("MEMORY_ENABLED is set but MEMORY_DB_URL is missing; running without memory");
        return TalentMemory::disabled();
    };

    let pool = match create_pool(url).await {
        Ok(pool) => pool,
        Err(e) => {
            warn!("Memory database unavailable, running without memory: {e}");
            return TalentMemory::disabled();
        }
    };

    let store = PgMemoryStore::new(pool);
    if let Err(e) = store.ensure_schema().await {
        warn!("Memory schema setup failed, running without memory: {e}");
        return TalentMemory::disabled();
    }

    info!("Talent memory enabled (scope: {})", config.scope.as_str());
    TalentMemory::new(Arc::new(store), config.scope)
}
