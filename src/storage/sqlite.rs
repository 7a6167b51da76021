use std::collections::VecDeque;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{Row, Sqlite, SqlitePool};

use super::{KeyValue, LedgerStore, StateIterator, MIGRATION_001_LEDGER_STATE};

/// Rows fetched per round trip while scanning a range.
const SCAN_PAGE_SIZE: i64 = 64;

/// World state persisted in a single SQLite table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create the world-state table if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_LEDGER_STATE)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT value FROM ledger_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("failed to read from world state")?;

        Ok(row.map(|row| row.get::<Vec<u8>, _>("value")))
    }

    async fn put_state(&self, key: &str, value: &[u8]) -> Result<()> {
        anyhow::ensure!(!key.is_empty(), "key must not be empty");
        sqlx::query(
            r#"
            INSERT INTO ledger_state (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .context("failed to put to world state")?;
        Ok(())
    }

    async fn del_state(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM ledger_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .context("failed to delete from world state")?;
        Ok(())
    }

    async fn get_state_by_range(
        &self,
        start_key: &str,
        end_key: &str,
    ) -> Result<Box<dyn StateIterator>> {
        let conn = self
            .pool
            .acquire()
            .await
            .context("failed to open range scan")?;

        Ok(Box::new(SqliteStateIterator {
            conn: Some(conn),
            start_key: start_key.to_string(),
            end_key: end_key.to_string(),
            last_key: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }))
    }
}

/// Pages through a key range on one pooled connection, which is held
/// until the scan is closed or dropped.
struct SqliteStateIterator {
    conn: Option<PoolConnection<Sqlite>>,
    start_key: String,
    end_key: String,
    last_key: Option<String>,
    buffer: VecDeque<KeyValue>,
    exhausted: bool,
}

impl SqliteStateIterator {
    async fn fetch_page(&mut self) -> Result<()> {
        let conn = self
            .conn
            .as_mut()
            .context("range scan already closed")?;

        let rows = sqlx::query(
            r#"
            SELECT key, value
            FROM ledger_state
            WHERE (? = '' OR key >= ?)
              AND (? = '' OR key < ?)
              AND (? IS NULL OR key > ?)
            ORDER BY key
            LIMIT ?
            "#,
        )
        .bind(&self.start_key)
        .bind(&self.start_key)
        .bind(&self.end_key)
        .bind(&self.end_key)
        .bind(&self.last_key)
        .bind(&self.last_key)
        .bind(SCAN_PAGE_SIZE)
        .fetch_all(&mut **conn)
        .await
        .context("failed to scan world state")?;

        if (rows.len() as i64) < SCAN_PAGE_SIZE {
            self.exhausted = true;
        }

        for row in rows {
            self.buffer.push_back(KeyValue {
                key: row.get("key"),
                value: row.get("value"),
            });
        }
        if let Some(last) = self.buffer.back() {
            self.last_key = Some(last.key.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl StateIterator for SqliteStateIterator {
    async fn next(&mut self) -> Result<Option<KeyValue>> {
        anyhow::ensure!(self.conn.is_some(), "range scan already closed");
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }
        Ok(self.buffer.pop_front())
    }

    async fn close(&mut self) -> Result<()> {
        self.buffer.clear();
        self.conn = None;
        Ok(())
    }
}
