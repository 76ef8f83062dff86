//! Persistence pool construction.
//!
//! The store is described only by the operations it must support (upsert +
//! query); this module picks a concrete backend behind
//! `sqlx`'s `Any` driver so the broker runs against Postgres in production
//! and SQLite in tests without the owning crates (`registrar-core`,
//! `catalog-core`, `session-core`) knowing which.

use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::AnyPool;

use crate::config::DatabaseConfig;
use crate::error::Result;

/// Connect a pool per [`DatabaseConfig`] and run the embedded schema.
pub async fn connect(cfg: &DatabaseConfig) -> Result<AnyPool> {
    install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.url)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

const SCHEMA: &str = include_str!("schema.sql");

async fn run_migrations(pool: &AnyPool) -> Result<()> {
    for statement in SCHEMA.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
