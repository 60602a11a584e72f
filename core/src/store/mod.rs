//! SQLite persistence layer.
//!
//! RULE: Only store/ and the loader talk to the database.
//! Generators never execute SQL; they receive reference snapshots
//! fetched here and return rows the loader writes.
//!
//! Connections come from a bounded r2d2 pool. Every caller holds a pooled
//! connection only for the duration of one operation (one chunk, one
//! page walk, one report query); dropping the guard returns it.

mod reference;
mod report;

pub use reference::{NamedService, PurchaseRef, ServiceRef};
pub use report::{
    PaymentSampleCheck, RecentPayment, ServicePopularity, ServiceTypeStats, TableCounts,
    TermCheck, TopCustomer,
};

use crate::{config::StoreConfig, error::SeedResult};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params_from_iter;
use std::time::Duration;

pub const CUSTOMERS: &str = "customers";
pub const SERVICES: &str = "services";
pub const PURCHASES: &str = "purchases";
pub const PAYMENTS: &str = "payments";

/// Children first, so a wipe never trips a foreign key.
const WIPE_ORDER: [&str; 4] = [PAYMENTS, PURCHASES, SERVICES, CUSTOMERS];

pub type StoreConn = PooledConnection<SqliteConnectionManager>;

pub struct Store {
    pool: Pool<SqliteConnectionManager>,
    path: String,
}

impl Store {
    /// Open (or create) the database at `config.path` behind a pool of
    /// `pool_size + max_overflow` connections.
    pub fn open(config: &StoreConfig) -> SeedResult<Self> {
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let manager = SqliteConnectionManager::file(&config.path).with_init(move |c| {
            c.busy_timeout(busy_timeout)?;
            c.execute_batch("PRAGMA foreign_keys=ON;")
        });
        let pool = Pool::builder()
            .max_size(config.pool_size + config.max_overflow)
            .min_idle(Some(config.pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build(manager)?;

        let store = Self {
            pool,
            path: config.path.clone(),
        };
        // WAL mode: lets reference reads proceed while a chunk commits.
        let mode: String = store.acquire()?.pragma_update_and_check(
            None,
            "journal_mode",
            "WAL",
            |row| row.get(0),
        )?;
        log::debug!("store: opened {} (journal_mode={mode})", store.path);
        Ok(store)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check out a connection. Released when the guard drops.
    pub fn acquire(&self) -> SeedResult<StoreConn> {
        Ok(self.pool.get()?)
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SeedResult<()> {
        self.acquire()?
            .execute_batch(include_str!("../../../migrations/001_billing.sql"))?;
        Ok(())
    }

    /// Wipe all four tables and reset their id sequences, in one
    /// transaction. Idempotent.
    pub fn clear(&self) -> SeedResult<()> {
        let mut conn = self.acquire()?;
        let tx = conn.transaction()?;
        for table in WIPE_ORDER {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        tx.execute(
            "DELETE FROM sqlite_sequence WHERE name IN (?1, ?2, ?3, ?4)",
            params_from_iter(WIPE_ORDER),
        )?;
        tx.commit()?;
        log::info!("store: cleared {}", WIPE_ORDER.join(", "));
        Ok(())
    }

    pub fn count(&self, table: &str) -> SeedResult<i64> {
        let count: i64 = self
            .acquire()?
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn table_counts(&self) -> SeedResult<TableCounts> {
        Ok(TableCounts {
            customers: self.count(CUSTOMERS)?,
            services: self.count(SERVICES)?,
            purchases: self.count(PURCHASES)?,
            payments: self.count(PAYMENTS)?,
        })
    }

    /// Insert column names of `table`, excluding the `id` key, in the order
    /// the schema declares them.
    pub fn schema_columns(&self, table: &str) -> SeedResult<Vec<String>> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns.into_iter().filter(|c| c != "id").collect())
    }
}
