use anyhow::Result;
use async_trait::async_trait;

/// A single world-state entry yielded by a range scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// Cursor over a key range of the world state.
///
/// `next` yields entries in ascending key order and returns `None` once
/// the range is exhausted. Callers must `close` the cursor when done,
/// including on error paths; dropping it also releases what it holds.
#[async_trait]
pub trait StateIterator: Send {
    async fn next(&mut self) -> Result<Option<KeyValue>>;

    async fn close(&mut self) -> Result<()>;
}

/// The key-value contract of the ledger's world state.
///
/// A stored value may be empty; `get_state` still returns `Some` for it.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value.
    async fn put_state(&self, key: &str, value: &[u8]) -> Result<()>;

    async fn del_state(&self, key: &str) -> Result<()>;

    /// Scan `[start_key, end_key)`. An empty key leaves that side open,
    /// so `("", "")` scans the whole state.
    async fn get_state_by_range(
        &self,
        start_key: &str,
        end_key: &str,
    ) -> Result<Box<dyn StateIterator>>;
}
