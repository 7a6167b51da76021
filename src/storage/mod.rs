mod memory;
mod sqlite;
mod store;

pub use memory::*;
pub use sqlite::*;
pub use store::*;

/// SQL migration for the world-state table
pub const MIGRATION_001_LEDGER_STATE: &str = include_str!("migrations/001_ledger_state.sql");
