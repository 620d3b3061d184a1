//! Snapshot history logs
//!
//! Before each guarded inventory write the engine appends the full roster
//! to `history/inventory`; catalog changes append the catalog to
//! `history/items`. Keys come from the store's `push`, so sorting keys
//! sorts records oldest first. Logs are capped by pruning the oldest.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::ItemCatalog;
use crate::character::Character;
use crate::error::InventoryResult;
use crate::state::chars_from_value;
use crate::types::{SessionId, Timestamp};

use super::path::{CATALOG_HISTORY, INVENTORY_HISTORY};
use super::remote::{RemoteStore, WriteMeta};

/// Which history log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryLog {
    Inventory,
    Catalog,
}

impl HistoryLog {
    pub fn path(self) -> &'static str {
        match self {
            HistoryLog::Inventory => INVENTORY_HISTORY,
            HistoryLog::Catalog => CATALOG_HISTORY,
        }
    }
}

/// Wire shape of a history record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chars: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    items: Option<Value>,
    #[serde(default)]
    timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<SessionId>,
}

/// A decoded history record
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Push key, usable with `restore_snapshot`
    pub key: String,
    /// Wall-clock milliseconds when the record was taken
    pub timestamp: Timestamp,
    pub session: Option<SessionId>,
    /// Roster at that time (inventory log)
    pub chars: Vec<Character>,
    /// Catalog at that time (catalog log)
    pub items: Option<ItemCatalog>,
}

impl HistoryEntry {
    fn decode(key: String, value: Value) -> Option<Self> {
        let record: HistoryRecord = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(%key, error = %e, "Skipping malformed history record");
                return None;
            }
        };
        Some(Self {
            key,
            timestamp: record.timestamp,
            session: record.session_id,
            chars: record.chars.map(chars_from_value).unwrap_or_default(),
            items: record.items.map(ItemCatalog::from_value),
        })
    }

    /// "2024-03-01 18:22:05" in UTC
    pub fn formatted_time(&self) -> String {
        chrono::DateTime::<chrono::Utc>::from_timestamp_millis(self.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

/// Append an inventory snapshot
pub async fn record_inventory(
    remote: &dyn RemoteStore,
    chars: &[Character],
    meta: &WriteMeta,
) -> InventoryResult<String> {
    let record = HistoryRecord {
        chars: Some(serde_json::to_value(chars)?),
        ..record_header(meta)
    };
    append(remote, HistoryLog::Inventory, record, meta).await
}

/// Append a catalog snapshot
pub async fn record_catalog(
    remote: &dyn RemoteStore,
    items: &ItemCatalog,
    meta: &WriteMeta,
) -> InventoryResult<String> {
    let record = HistoryRecord {
        items: Some(serde_json::to_value(items)?),
        ..record_header(meta)
    };
    append(remote, HistoryLog::Catalog, record, meta).await
}

fn record_header(meta: &WriteMeta) -> HistoryRecord {
    HistoryRecord {
        timestamp: chrono::Utc::now().timestamp_millis(),
        session_id: Some(meta.session.clone()),
        ..Default::default()
    }
}

async fn append(
    remote: &dyn RemoteStore,
    log: HistoryLog,
    record: HistoryRecord,
    meta: &WriteMeta,
) -> InventoryResult<String> {
    let key = remote
        .push(log.path(), serde_json::to_value(record)?, meta)
        .await?;
    tracing::debug!(log = log.path(), %key, "Recorded history snapshot");
    Ok(key)
}

/// Delete the oldest records beyond `limit`; returns how many were removed
pub async fn prune(
    remote: &dyn RemoteStore,
    log: HistoryLog,
    limit: usize,
    meta: &WriteMeta,
) -> InventoryResult<usize> {
    let mut keys = keys(remote, log).await?;
    if keys.len() <= limit {
        return Ok(0);
    }
    keys.sort();
    let excess = keys.len() - limit;
    for key in &keys[..excess] {
        remote
            .delete(&format!("{}/{}", log.path(), key), meta)
            .await?;
    }
    tracing::debug!(log = log.path(), removed = excess, "Pruned history");
    Ok(excess)
}

async fn keys(remote: &dyn RemoteStore, log: HistoryLog) -> InventoryResult<Vec<String>> {
    Ok(match remote.read(log.path()).await? {
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    })
}

/// All records of a log, newest first
pub async fn fetch(remote: &dyn RemoteStore, log: HistoryLog) -> InventoryResult<Vec<HistoryEntry>> {
    let mut entries: Vec<HistoryEntry> = match remote.read(log.path()).await? {
        Some(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| HistoryEntry::decode(key, value))
            .collect(),
        _ => Vec::new(),
    };
    entries.sort_by(|a, b| b.key.cmp(&a.key));
    Ok(entries)
}

/// One record by key
pub async fn fetch_one(
    remote: &dyn RemoteStore,
    log: HistoryLog,
    key: &str,
) -> InventoryResult<Option<HistoryEntry>> {
    Ok(remote
        .read(&format!("{}/{}", log.path(), key))
        .await?
        .and_then(|value| HistoryEntry::decode(key.to_string(), value)))
}
