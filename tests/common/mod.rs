// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use bookledger::application::BookLedgerService;
use bookledger::storage::{KeyValue, LedgerStore, MemoryStore, SqliteStore, StateIterator};
use tempfile::TempDir;

/// Helper to create a service over a fresh in-memory world state
pub fn memory_service() -> BookLedgerService<MemoryStore> {
    BookLedgerService::new(MemoryStore::new())
}

/// Helper to create a seeded in-memory service
pub async fn seeded_service() -> Result<BookLedgerService<MemoryStore>> {
    let service = memory_service();
    service.init_ledger().await?;
    Ok(service)
}

/// Helper to create a test service with a temporary database
pub async fn sqlite_service() -> Result<(BookLedgerService<SqliteStore>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = BookLedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

pub fn names(borrowers: &[&str]) -> Vec<String> {
    borrowers.iter().map(|s| s.to_string()).collect()
}

/// Memory store that starts failing after a configured number of calls.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    /// Fail every `put_state` after this many have succeeded
    pub puts_before_failure: Option<usize>,
    /// Fail every range scan after it has yielded this many entries
    pub scan_entries_before_failure: Option<usize>,
    pub fail_gets: bool,
    pub fail_closes: bool,
    puts: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn failing_puts_after(mut self, count: usize) -> Self {
        self.puts_before_failure = Some(count);
        self
    }

    pub fn failing_scans_after(mut self, count: usize) -> Self {
        self.scan_entries_before_failure = Some(count);
        self
    }

    pub fn failing_closes(mut self) -> Self {
        self.fail_closes = true;
        self
    }

    pub fn failing_gets(mut self) -> Self {
        self.fail_gets = true;
        self
    }
}

#[async_trait]
impl LedgerStore for FailingStore {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.fail_gets {
            bail!("injected read failure");
        }
        self.inner.get_state(key).await
    }

    async fn put_state(&self, key: &str, value: &[u8]) -> Result<()> {
        let done = self.puts.fetch_add(1, Ordering::SeqCst);
        if matches!(self.puts_before_failure, Some(limit) if done >= limit) {
            bail!("injected write failure");
        }
        self.inner.put_state(key, value).await
    }

    async fn del_state(&self, key: &str) -> Result<()> {
        self.inner.del_state(key).await
    }

    async fn get_state_by_range(
        &self,
        start_key: &str,
        end_key: &str,
    ) -> Result<Box<dyn StateIterator>> {
        let inner = self.inner.get_state_by_range(start_key, end_key).await?;
        Ok(Box::new(FailingIterator {
            inner,
            remaining: self.scan_entries_before_failure,
            fail_close: self.fail_closes,
        }))
    }
}

struct FailingIterator {
    inner: Box<dyn StateIterator>,
    remaining: Option<usize>,
    fail_close: bool,
}

#[async_trait]
impl StateIterator for FailingIterator {
    async fn next(&mut self) -> Result<Option<KeyValue>> {
        match self.remaining {
            Some(0) => bail!("injected scan failure"),
            Some(ref mut n) => *n -= 1,
            None => {}
        }
        self.inner.next().await
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await?;
        if self.fail_close {
            bail!("injected close failure");
        }
        Ok(())
    }
}
