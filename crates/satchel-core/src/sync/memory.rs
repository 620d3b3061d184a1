//! In-process remote store
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  MemoryRemote (clone = same store)                           │
//! │  ├── tree: one JSON value, addressed by slash paths          │
//! │  ├── clock: logical milliseconds, strictly increasing        │
//! │  ├── keys: ULID generator for push()                         │
//! │  ├── watchers: subscribed path -> mpsc sender                │
//! │  └── storage: optional redb copy of the tree                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Several engines holding clones of one `MemoryRemote` behave like
//! sessions sharing a real-time database. With storage attached, the tree
//! is loaded when the store opens and saved after every change, so
//! successive processes see each other's writes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::mpsc;
use ulid::Generator;

use crate::error::{InventoryError, InventoryResult};
use crate::storage::Storage;
use crate::types::{SessionId, Timestamp};

use super::remote::{
    RemoteSnapshot, RemoteStore, Subscription, TxOutcome, TxUpdate, WriteMeta,
    LAST_UPDATED_BY_KEY, LAST_UPDATED_KEY,
};
use super::tree;

struct Watcher {
    path: String,
    tx: mpsc::UnboundedSender<RemoteSnapshot>,
}

struct Inner {
    tree: RwLock<Value>,
    clock: Mutex<Timestamp>,
    keys: Mutex<Generator>,
    watchers: Mutex<Vec<Watcher>>,
    storage: Option<Storage>,
    online: AtomicBool,
}

/// Shared JSON tree with logical server timestamps
#[derive(Clone)]
pub struct MemoryRemote {
    inner: Arc<Inner>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    /// Empty store living only in this process
    pub fn new() -> Self {
        Self::with_tree(Value::Object(Default::default()), None)
    }

    /// Store backed by `storage`; loads the last saved tree
    pub fn persistent(storage: Storage) -> InventoryResult<Self> {
        let tree = storage
            .load_remote_tree()?
            .unwrap_or_else(|| Value::Object(Default::default()));
        tracing::debug!("Opened persistent remote store");
        Ok(Self::with_tree(tree, Some(storage)))
    }

    fn with_tree(tree: Value, storage: Option<Storage>) -> Self {
        // Resume the clock after the newest stamp already in the tree
        let last = [super::path::INVENTORY_ROOT, super::path::CATALOG_ROOT]
            .iter()
            .filter_map(|root| tree::get(&tree, &format!("{}/{}", root, LAST_UPDATED_KEY)))
            .filter_map(Value::as_i64)
            .max()
            .unwrap_or(0);
        Self {
            inner: Arc::new(Inner {
                tree: RwLock::new(tree),
                clock: Mutex::new(last),
                keys: Mutex::new(Generator::new()),
                watchers: Mutex::new(Vec::new()),
                storage,
                online: AtomicBool::new(true),
            }),
        }
    }

    /// Simulate losing or regaining the connection
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
        tracing::info!(online, "Remote store connectivity changed");
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Copy of the whole tree
    pub fn snapshot(&self) -> Value {
        self.inner.tree.read().clone()
    }

    /// Number of live subscriptions
    pub fn watcher_count(&self) -> usize {
        let mut watchers = self.inner.watchers.lock();
        watchers.retain(|w| !w.tx.is_closed());
        watchers.len()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════

    fn ensure_online(&self) -> InventoryResult<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(InventoryError::RemoteUnavailable(
                "remote store is offline".to_string(),
            ))
        }
    }

    fn next_timestamp(&self) -> Timestamp {
        let mut clock = self.inner.clock.lock();
        let now = chrono::Utc::now().timestamp_millis();
        *clock = now.max(*clock + 1);
        *clock
    }

    fn stamp(&self, tree_value: &mut Value, path: &str, session: &SessionId) -> Timestamp {
        let root = path.split('/').find(|s| !s.is_empty()).unwrap_or_default();
        let timestamp = self.next_timestamp();
        tree::set(
            tree_value,
            &format!("{}/{}", root, LAST_UPDATED_KEY),
            Value::from(timestamp),
        );
        tree::set(
            tree_value,
            &format!("{}/{}", root, LAST_UPDATED_BY_KEY),
            Value::from(session.as_str()),
        );
        timestamp
    }

    /// Persist and notify after a change at `path`; call with the write lock held
    fn after_change(&self, tree_value: &Value, path: &str, origin: Option<&SessionId>) {
        if let Some(storage) = &self.inner.storage {
            if let Err(e) = storage.save_remote_tree(tree_value) {
                tracing::error!(error = %e, "Failed to persist remote tree");
            }
        }

        let mut watchers = self.inner.watchers.lock();
        watchers.retain(|watcher| {
            if !tree::overlaps(&watcher.path, path) {
                return !watcher.tx.is_closed();
            }
            let snapshot = RemoteSnapshot {
                path: watcher.path.clone(),
                value: tree::get(tree_value, &watcher.path).cloned(),
                origin: origin.cloned(),
            };
            watcher.tx.send(snapshot).is_ok()
        });
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn read(&self, path: &str) -> InventoryResult<Option<Value>> {
        self.ensure_online()?;
        Ok(tree::get(&self.inner.tree.read(), path).cloned())
    }

    async fn write(&self, path: &str, value: Value, meta: &WriteMeta) -> InventoryResult<()> {
        self.ensure_online()?;
        let mut tree_value = self.inner.tree.write();
        tree::set(&mut tree_value, path, value);
        if meta.stamp {
            self.stamp(&mut tree_value, path, &meta.session);
        }
        tracing::trace!(%path, session = %meta.session.short(), "Remote write");
        self.after_change(&tree_value, path, Some(&meta.session));
        Ok(())
    }

    async fn transaction(
        &self,
        path: &str,
        meta: &WriteMeta,
        update: TxUpdate,
    ) -> InventoryResult<TxOutcome> {
        self.ensure_online()?;
        let mut tree_value = self.inner.tree.write();
        let current = tree::get(&tree_value, path).cloned();
        let Some(next) = update(current.as_ref()) else {
            tracing::debug!(%path, "Remote transaction aborted");
            return Ok(TxOutcome::Aborted { current });
        };

        tree::set(&mut tree_value, path, next);
        let timestamp = meta
            .stamp
            .then(|| self.stamp(&mut tree_value, path, &meta.session));
        let value = tree::get(&tree_value, path).cloned().unwrap_or(Value::Null);
        tracing::trace!(%path, ?timestamp, "Remote transaction committed");
        self.after_change(&tree_value, path, Some(&meta.session));
        Ok(TxOutcome::Committed { value, timestamp })
    }

    async fn push(&self, path: &str, value: Value, meta: &WriteMeta) -> InventoryResult<String> {
        self.ensure_online()?;
        let key = self
            .inner
            .keys
            .lock()
            .generate()
            .map_err(|e| InventoryError::Storage(e.to_string()))?
            .to_string();
        let full = format!("{}/{}", path.trim_end_matches('/'), key);
        let mut tree_value = self.inner.tree.write();
        tree::set(&mut tree_value, &full, value);
        self.after_change(&tree_value, &full, Some(&meta.session));
        Ok(key)
    }

    async fn delete(&self, path: &str, meta: &WriteMeta) -> InventoryResult<()> {
        self.ensure_online()?;
        let mut tree_value = self.inner.tree.write();
        if tree::remove(&mut tree_value, path).is_some() {
            self.after_change(&tree_value, path, Some(&meta.session));
        }
        Ok(())
    }

    async fn subscribe(&self, path: &str) -> InventoryResult<Subscription> {
        self.ensure_online()?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.watchers.lock().push(Watcher {
            path: path.to_string(),
            tx,
        });
        tracing::debug!(%path, "Subscribed to remote path");
        Ok(Subscription::new(path, rx))
    }
}
