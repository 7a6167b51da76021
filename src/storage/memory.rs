use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use super::{KeyValue, LedgerStore, StateIterator};

/// In-process world state backed by a `BTreeMap`.
///
/// Clones share the same state. Range scans take a snapshot of the
/// range at creation time.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    open_scans: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of range scans that have been opened and not yet released.
    pub fn open_scans(&self) -> usize {
        self.open_scans.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("world state lock poisoned"))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn put_state(&self, key: &str, value: &[u8]) -> Result<()> {
        if key.is_empty() {
            bail!("key must not be empty");
        }
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn del_state(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn get_state_by_range(
        &self,
        start_key: &str,
        end_key: &str,
    ) -> Result<Box<dyn StateIterator>> {
        let state = self.lock()?;

        let entries: VecDeque<KeyValue> =
            if !start_key.is_empty() && !end_key.is_empty() && start_key >= end_key {
                VecDeque::new()
            } else {
                let lower = match start_key {
                    "" => Bound::Unbounded,
                    key => Bound::Included(key),
                };
                let upper = match end_key {
                    "" => Bound::Unbounded,
                    key => Bound::Excluded(key),
                };
                state
                    .range::<str, _>((lower, upper))
                    .map(|(key, value)| KeyValue {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect()
            };

        self.open_scans.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryStateIterator {
            entries,
            open_scans: Some(self.open_scans.clone()),
        }))
    }
}

struct MemoryStateIterator {
    entries: VecDeque<KeyValue>,
    open_scans: Option<Arc<AtomicUsize>>,
}

impl MemoryStateIterator {
    fn release(&mut self) {
        if let Some(counter) = self.open_scans.take() {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl StateIterator for MemoryStateIterator {
    async fn next(&mut self) -> Result<Option<KeyValue>> {
        if self.open_scans.is_none() {
            bail!("range scan already closed");
        }
        Ok(self.entries.pop_front())
    }

    async fn close(&mut self) -> Result<()> {
        self.entries.clear();
        self.release();
        Ok(())
    }
}

impl Drop for MemoryStateIterator {
    fn drop(&mut self) {
        self.release();
    }
}
