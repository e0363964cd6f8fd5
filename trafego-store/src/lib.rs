//! # trafego-store
//!
//! SQLite persistence for the Trafego engine, built on `SeaORM`. A single
//! [`SqliteStore`] implements all three repository traits
//! (`ProviderCacheRepository`, `ManagedRecordRepository`,
//! `OverrideRepository`) against one database file, with the schema
//! created by an embedded migration at construction.

mod cache_repo;
pub(crate) mod codec;
pub(crate) mod entity;
mod managed_repo;
mod migration;
mod override_repo;

use std::path::Path;

use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use trafego_core::error::{EngineError, EngineResult};

use migration::Migrator;

/// SQLite-backed store for the provider cache, the managed record
/// ledger, and hostname overrides.
pub struct SqliteStore {
    /// Shared `SeaORM` database connection.
    pub(crate) db: DatabaseConnection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path` and bring the
    /// schema up to date.
    ///
    /// # Errors
    /// Returns `EngineError::StorageError` if directory creation, the
    /// database connection, or the schema migration fails.
    pub async fn new(db_path: &Path) -> EngineResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EngineError::StorageError(format!("Failed to create directory: {e}"))
            })?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let db = Database::connect(&db_url)
            .await
            .map_err(|e| EngineError::StorageError(format!("Failed to connect to SQLite: {e}")))?;

        let store = Self { db };

        // Ensure the schema is up to date before the store is used.
        Migrator::up(&store.db, None)
            .await
            .map_err(|e| EngineError::StorageError(format!("Failed to run migrations: {e}")))?;

        Ok(store)
    }

    /// An in-memory database, for tests and throwaway runs.
    pub async fn in_memory() -> EngineResult<Self> {
        let db = Database::connect("sqlite::memory:")
            .await
            .map_err(|e| EngineError::StorageError(format!("Failed to open SQLite: {e}")))?;
        let store = Self { db };
        Migrator::up(&store.db, None)
            .await
            .map_err(|e| EngineError::StorageError(format!("Failed to run migrations: {e}")))?;
        Ok(store)
    }
}
