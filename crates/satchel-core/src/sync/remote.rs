//! Remote store abstraction
//!
//! The engine talks to the shared store only through [`RemoteStore`]: a
//! JSON tree addressed by slash paths, with change notifications and an
//! atomic read-modify-write on a subtree. Writes carry the writing session
//! so each session can recognize the echo of its own changes.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::InventoryResult;
use crate::types::{SessionId, Timestamp};

/// Key stamped into a resource root on every guarded commit
pub const LAST_UPDATED_KEY: &str = "lastUpdated";
/// Key holding the session that made the last guarded commit
pub const LAST_UPDATED_BY_KEY: &str = "lastUpdatedBy";

/// Metadata attached to every remote write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteMeta {
    /// Session performing the write
    pub session: SessionId,
    /// Stamp `lastUpdated`/`lastUpdatedBy` into the written resource root
    pub stamp: bool,
}

impl WriteMeta {
    /// Plain write, no timestamp stamping
    pub fn plain(session: &SessionId) -> Self {
        Self {
            session: session.clone(),
            stamp: false,
        }
    }

    /// Write that stamps the resource root with a fresh store timestamp
    pub fn stamped(session: &SessionId) -> Self {
        Self {
            session: session.clone(),
            stamp: true,
        }
    }
}

/// A change notification for a subscribed path
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSnapshot {
    /// The subscribed path (not the path that was written)
    pub path: String,
    /// Current value at the subscribed path
    pub value: Option<Value>,
    /// Session whose write caused the change
    pub origin: Option<SessionId>,
}

impl RemoteSnapshot {
    /// Timestamp stamped into the snapshot value, if any
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.value
            .as_ref()
            .and_then(|v| v.get(LAST_UPDATED_KEY))
            .and_then(Value::as_i64)
    }
}

/// Update function for [`RemoteStore::transaction`]
///
/// Receives the current value at the path and returns the replacement, or
/// `None` to abort without writing.
pub type TxUpdate = Box<dyn FnOnce(Option<&Value>) -> Option<Value> + Send>;

/// Result of a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutcome {
    /// The update was written; `timestamp` is the stamp it received
    Committed {
        value: Value,
        timestamp: Option<Timestamp>,
    },
    /// The update function declined; `current` is what it saw
    Aborted { current: Option<Value> },
}

/// Live change stream for one path
pub struct Subscription {
    pub path: String,
    rx: mpsc::UnboundedReceiver<RemoteSnapshot>,
}

impl Subscription {
    pub fn new(path: impl Into<String>, rx: mpsc::UnboundedReceiver<RemoteSnapshot>) -> Self {
        Self {
            path: path.into(),
            rx,
        }
    }

    /// Next queued notification without waiting
    pub fn try_next(&mut self) -> Option<RemoteSnapshot> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next notification; `None` once the store is gone
    pub async fn next(&mut self) -> Option<RemoteSnapshot> {
        self.rx.recv().await
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Shared JSON store with change notifications
///
/// Every method fails with `RemoteUnavailable` when the store cannot be
/// reached; callers keep serving local state in that case.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read the value at `path`
    async fn read(&self, path: &str) -> InventoryResult<Option<Value>>;

    /// Overwrite the value at `path`; `Value::Null` removes it
    async fn write(&self, path: &str, value: Value, meta: &WriteMeta) -> InventoryResult<()>;

    /// Atomically replace the value at `path` with the result of `update`
    async fn transaction(
        &self,
        path: &str,
        meta: &WriteMeta,
        update: TxUpdate,
    ) -> InventoryResult<TxOutcome>;

    /// Append `value` under a fresh, chronologically sortable key; returns the key
    async fn push(&self, path: &str, value: Value, meta: &WriteMeta) -> InventoryResult<String>;

    /// Remove the value at `path`
    async fn delete(&self, path: &str, meta: &WriteMeta) -> InventoryResult<()>;

    /// Receive a snapshot of `path` after every change that touches it
    async fn subscribe(&self, path: &str) -> InventoryResult<Subscription>;
}
