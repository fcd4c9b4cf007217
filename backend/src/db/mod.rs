pub mod entries;
pub mod entries_models;
pub mod entries_schema;

use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{Context, Error as AnyhowError, Result};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use parking_lot::Mutex;

use crate::get_create_wbdict_dir;
use crate::logger::info;

pub use crate::db::entries::EntriesDbHandle;

pub const ENTRIES_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/entries/");

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Debug)]
pub struct DatabaseHandle {
    pool: SqlitePool,
    pub write_lock: Mutex<()>,
}

impl DatabaseHandle {
    pub fn new(database_url: &str) -> Result<Self> {
        info(&format!("DatabaseHandle::new() {}", database_url));
        let manager = ConnectionManager::new(database_url);
        let pool = Pool::builder()
            .max_size(5)
            .build(manager)
            .with_context(|| format!("Failed to create pool for: {}", database_url))?;

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    /// Opens the database file, creating its directory, and optionally runs
    /// the pending schema migrations.
    pub fn open(db_path: &Path, setup_schema: bool) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
        }

        let database_url = db_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid database path: {}", db_path.display()))?;

        let handle = DatabaseHandle::new(database_url)?;
        if setup_schema {
            handle.run_migrations()?;
        }
        Ok(handle)
    }

    pub fn run_migrations(&self) -> Result<()> {
        let _lock = self.write_lock.lock();
        let mut db_conn = self.get_conn()?;
        let applied = db_conn
            .run_pending_migrations(ENTRIES_MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("Failed to execute pending database migrations: {}", e))?;
        info(&format!("Applied {} migration(s)", applied.len()));
        Ok(())
    }

    pub fn get_conn(&self) -> Result<DbConn> {
        self.pool.get().map_err(AnyhowError::from)
    }

    /// Performs a write operation on the database, guarded by a Mutex write_lock.
    pub fn do_write<F, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, diesel::result::Error>,
    {
        let _lock = self.write_lock.lock();
        let mut db_conn = self.pool.get().context("Failed to get connection from pool for write")?;
        operation(&mut db_conn).map_err(AnyhowError::from)
    }

    /// Performs a read operation on the database.
    pub fn do_read<F, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, diesel::result::Error>,
    {
        let mut db_conn = self.pool.get().context("Failed to get connection from pool for read")?;
        operation(&mut db_conn).map_err(AnyhowError::from)
    }
}

/// `WBDICT_DB_PATH`, or `entries.sqlite3` in the wbdict dir.
pub fn default_db_path() -> PathBuf {
    match env::var("WBDICT_DB_PATH") {
        Ok(s) if !s.is_empty() => PathBuf::from(s),
        _ => get_create_wbdict_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("entries.sqlite3"),
    }
}
