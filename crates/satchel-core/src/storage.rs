//! Persistent storage using redb.
//!
//! This module provides ACID-compliant storage for:
//! - The local cache (state snapshot, session token)
//! - The shared tree of a [`MemoryRemote`](crate::sync::MemoryRemote) when
//!   several processes on one machine share a store

use crate::error::{InventoryError, InventoryResult};
use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

mod cache;

pub use cache::{LocalCache, MemoryCache};

// Table definitions
const CACHE_TABLE: TableDefinition<&str, &str> = TableDefinition::new("cache");
const REMOTE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("remote");

/// Key of the whole shared tree in the remote table
const REMOTE_TREE_KEY: &str = "tree";

/// Storage layer using redb for ACID-compliant persistence
#[derive(Clone)]
pub struct Storage {
    db: Arc<RwLock<Database>>,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// Creates the parent directory and all tables if needed.
    pub fn new(path: impl AsRef<Path>) -> InventoryResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CACHE_TABLE)?;
            let _ = write_txn.open_table(REMOTE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Cache Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Read a cached string by key.
    pub fn get_cached(&self, key: &str) -> InventoryResult<Option<String>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(CACHE_TABLE)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Store a string under `key`, replacing any previous value.
    pub fn set_cached(&self, key: &str, value: &str) -> InventoryResult<()> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(CACHE_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove a cached key. Returns `Ok(())` even if it was absent.
    pub fn remove_cached(&self, key: &str) -> InventoryResult<()> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(CACHE_TABLE)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// List all cache keys.
    pub fn cached_keys(&self) -> InventoryResult<Vec<String>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(CACHE_TABLE)?;

        let mut keys = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Shared Tree Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Persist the whole shared tree.
    pub fn save_remote_tree(&self, tree: &serde_json::Value) -> InventoryResult<()> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(REMOTE_TABLE)?;
            let data =
                serde_json::to_vec(tree).map_err(|e| InventoryError::Serialization(e.to_string()))?;
            table.insert(REMOTE_TREE_KEY, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load the shared tree, or `None` if it was never saved.
    pub fn load_remote_tree(&self) -> InventoryResult<Option<serde_json::Value>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(REMOTE_TABLE)?;

        match table.get(REMOTE_TREE_KEY)? {
            Some(v) => {
                let tree = serde_json::from_slice(v.value())
                    .map_err(|e| InventoryError::Serialization(e.to_string()))?;
                Ok(Some(tree))
            }
            None => Ok(None),
        }
    }
}
