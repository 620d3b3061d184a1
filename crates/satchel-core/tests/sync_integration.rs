//! Multi-client sync tests
//!
//! Several engines share one `MemoryRemote`, each with its own local cache,
//! the way separate clients share one remote store.
//!
//! ## What These Tests Verify
//!
//! - Remote notifications are applied unless self-originated or stale
//! - A save against a newer remote adopts the remote roster
//! - Read-only clients never write
//! - Outages leave local state serving and recover on the next save
//! - History snapshots can be listed and restored

use std::sync::Arc;

use satchel_core::catalog::ItemDraft;
use satchel_core::inventory::ItemHead;
use satchel_core::sync::{tree, PathState, ResourcePath, ResourceRoot, SyncEvent, WriteMeta};
use satchel_core::{
    EngineConfig, InventoryError, MemoryCache, MemoryRemote, RemoteStore, SaveOutcome,
    SectionKind, SessionId, SyncEngine,
};
use serde_json::json;
use tempfile::TempDir;

fn client(remote: &MemoryRemote) -> SyncEngine {
    SyncEngine::open(
        Arc::new(MemoryCache::new()),
        Arc::new(remote.clone()),
        EngineConfig::default(),
    )
}

async fn connected_pair(remote: &MemoryRemote) -> (SyncEngine, SyncEngine) {
    let mut a = client(remote);
    let mut b = client(remote);
    a.connect().await.unwrap();
    b.connect().await.unwrap();
    (a, b)
}

fn names(engine: &SyncEngine) -> Vec<String> {
    engine.state().chars.iter().map(|c| c.name.clone()).collect()
}

#[tokio::test]
async fn test_sessions_are_distinct() {
    let remote = MemoryRemote::new();
    let (a, b) = connected_pair(&remote).await;
    assert_ne!(a.session(), b.session());
    assert_eq!(remote.watcher_count(), 4);
}

#[tokio::test]
async fn test_remote_write_reaches_other_client() {
    let remote = MemoryRemote::new();
    let (mut a, mut b) = connected_pair(&remote).await;
    let mut events = b.subscribe_events();

    a.add_character("Ayla", 12).await.unwrap();
    a.place_item(0, SectionKind::Backpack, 0, ItemHead::new("Rope", 2))
        .await
        .unwrap();

    // Own echoes only move the high-water mark
    assert_eq!(a.process_pending().await, 0);

    assert!(b.process_pending().await >= 1);
    assert_eq!(names(&b), vec!["Ayla"]);
    assert_eq!(
        b.character(0).unwrap().backpack[0].as_head().unwrap().name,
        "Rope"
    );
    assert_eq!(b.state().last_updated, a.state().last_updated);
    assert!(b.is_read_only());

    let event = events.try_recv().unwrap();
    assert!(matches!(
        event,
        SyncEvent::ExternalUpdateApplied { ref origin, .. } if origin.as_ref() == Some(a.session())
    ));
}

#[tokio::test]
async fn test_stale_save_adopts_remote() {
    let remote = MemoryRemote::new();
    let (mut a, mut b) = connected_pair(&remote).await;
    let mut events = b.subscribe_events();

    a.add_character("First", 10).await.unwrap();
    let winner = a.state().last_updated;

    // b has not seen a's write; its save is superseded
    b.add_character("Second", 10).await.unwrap();
    assert_eq!(names(&b), vec!["First"]);
    assert_eq!(b.state().last_updated, winner);

    let superseded = std::iter::from_fn(|| events.try_recv().ok())
        .find(|e| matches!(e, SyncEvent::SaveSuperseded { .. }));
    assert_eq!(
        superseded,
        Some(SyncEvent::SaveSuperseded {
            path: "inventory".to_string(),
            local: 0,
            remote: winner,
        })
    );

    let snapshot = remote.snapshot();
    assert_eq!(
        tree::get(&snapshot, "inventory/chars/0/name").and_then(|v| v.as_str()),
        Some("First")
    );
    assert!(tree::get(&snapshot, "inventory/chars/1").is_none());
}

#[tokio::test]
async fn test_later_write_wins() {
    let remote = MemoryRemote::new();
    let (mut a, mut b) = connected_pair(&remote).await;

    a.add_character("Ayla", 12).await.unwrap();
    b.process_pending().await;

    b.rename_character(0, "Ayla the Bold").await.unwrap();
    assert!(b.state().last_updated > a.state().last_updated);

    assert_eq!(a.process_pending().await, 1);
    assert_eq!(names(&a), vec!["Ayla the Bold"]);

    // a is now current, so its next save goes through
    a.set_notes(0, "owes the innkeeper").await.unwrap();
    b.process_pending().await;
    assert_eq!(
        b.character(0).unwrap().notes.as_deref(),
        Some("owes the innkeeper")
    );
}

#[tokio::test]
async fn test_explicit_save_outcomes() {
    let remote = MemoryRemote::new();
    let (mut a, mut b) = connected_pair(&remote).await;

    a.add_character("Ayla", 12).await.unwrap();
    b.enable_writes();
    assert!(matches!(
        b.save(ResourcePath::Inventory).await,
        SaveOutcome::Superseded { .. }
    ));
    assert!(matches!(
        b.save(ResourcePath::Inventory).await,
        SaveOutcome::Written { timestamp: Some(_) }
    ));
}

#[tokio::test]
async fn test_repairs_during_apply_stay_local() {
    let remote = MemoryRemote::new();
    let (_a, mut b) = connected_pair(&remote).await;
    b.enable_writes();

    // Another tool writes a character that needs normalizing
    let other = SessionId::from_string("legacy-tool");
    remote
        .write(
            "inventory",
            json!({"chars": [{"name": "Broken", "str": 10, "equipped": [null, null, null]}]}),
            &WriteMeta::stamped(&other),
        )
        .await
        .unwrap();
    let before = remote.snapshot()["inventory"].clone();

    assert_eq!(b.process_pending().await, 1);
    let repaired = b.character(0).unwrap();
    assert_eq!(repaired.equipped.len(), 9);
    assert!(repaired.id.is_some());
    assert_eq!(b.path_state(ResourceRoot::Inventory), PathState::Idle);

    let after = remote.snapshot()["inventory"].clone();
    assert_eq!(after, before);
    assert_eq!(after["lastUpdatedBy"], json!("legacy-tool"));
    assert_eq!(after["lastUpdated"], before["lastUpdated"]);
    assert_eq!(after["chars"][0]["equipped"].as_array().map(Vec::len), Some(3));

    // The repair goes out with the next local save
    assert!(matches!(
        b.save(ResourcePath::Inventory).await,
        SaveOutcome::Written { .. }
    ));
    assert_eq!(
        remote.snapshot()["inventory"]["lastUpdatedBy"],
        json!(b.session().as_str())
    );
}

#[tokio::test]
async fn test_read_only_client_never_writes() {
    let remote = MemoryRemote::new();
    let (mut a, _) = connected_pair(&remote).await;
    a.add_character("Ayla", 12).await.unwrap();

    let mut watcher = client(&remote);
    watcher.connect().await.unwrap();
    assert_eq!(names(&watcher), vec!["Ayla"]);
    assert_eq!(
        watcher.save(ResourcePath::Inventory).await,
        SaveOutcome::LocalOnly
    );

    let by = remote
        .read("inventory/lastUpdatedBy")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by, a.session().as_str());
}

#[tokio::test]
async fn test_catalog_sync() {
    let remote = MemoryRemote::new();
    let (mut a, mut b) = connected_pair(&remote).await;

    let id = a.create_item(ItemDraft::new("Lantern", 1)).await.unwrap();
    assert_eq!(a.process_pending().await, 0);
    assert_eq!(b.process_pending().await, 1);
    assert_eq!(b.state().items.get(&id).unwrap().name, "Lantern");

    // Catalog history sits outside the watched subtree
    assert_eq!(b.process_pending().await, 0);
    assert_eq!(a.fetch_catalog_history().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_outage_then_recovery() {
    let remote = MemoryRemote::new();
    let (mut a, mut b) = connected_pair(&remote).await;
    let mut events = a.subscribe_events();

    remote.set_online(false);
    a.add_character("Offline", 10).await.unwrap();
    assert_eq!(names(&a), vec!["Offline"]);
    assert!(std::iter::from_fn(|| events.try_recv().ok())
        .any(|e| matches!(e, SyncEvent::RemoteUnavailable { .. })));

    remote.set_online(true);
    assert!(matches!(
        a.save(ResourcePath::Inventory).await,
        SaveOutcome::Written { .. }
    ));
    b.process_pending().await;
    assert_eq!(names(&b), vec!["Offline"]);
}

#[tokio::test]
async fn test_connect_offline_then_retry() {
    let remote = MemoryRemote::new();
    let (mut a, _) = connected_pair(&remote).await;
    a.add_character("Ayla", 12).await.unwrap();

    let mut late = client(&remote);
    remote.set_online(false);
    assert!(matches!(
        late.connect().await,
        Err(InventoryError::RemoteUnavailable(_))
    ));
    assert!(late.state().chars.is_empty());

    remote.set_online(true);
    late.connect().await.unwrap();
    assert_eq!(names(&late), vec!["Ayla"]);
}

#[tokio::test]
async fn test_history_restore() {
    let remote = MemoryRemote::new();
    let (mut a, mut b) = connected_pair(&remote).await;

    a.add_character("Before", 10).await.unwrap();
    a.rename_character(0, "After").await.unwrap();

    let history = a.fetch_history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].chars[0].name, "After");
    assert!(history[0].timestamp >= history[1].timestamp);

    let oldest = history[1].key.clone();
    a.restore_snapshot(&oldest).await.unwrap();
    assert_eq!(names(&a), vec!["Before"]);

    b.process_pending().await;
    assert_eq!(names(&b), vec!["Before"]);

    assert!(matches!(
        a.restore_snapshot("missing").await,
        Err(InventoryError::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn test_delete_character_rewrites_positions() {
    let remote = MemoryRemote::new();
    let (mut a, mut b) = connected_pair(&remote).await;

    a.add_character("One", 10).await.unwrap();
    a.add_character("Two", 10).await.unwrap();
    a.add_character("Three", 10).await.unwrap();
    a.delete_character(0).await.unwrap();

    let snapshot = remote.snapshot();
    let chars = snapshot["inventory"]["chars"].as_array().unwrap();
    let remote_names: Vec<_> = chars
        .iter()
        .filter(|c| !c.is_null())
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(remote_names, vec!["Two", "Three"]);

    b.process_pending().await;
    assert_eq!(names(&b), vec!["Two", "Three"]);
}

#[tokio::test]
async fn test_persistent_store_survives_restart() {
    let temp = TempDir::new().unwrap();

    let session = {
        let mut engine = SyncEngine::new(temp.path(), EngineConfig::default())
            .await
            .unwrap();
        engine.connect().await.unwrap();
        engine.add_character("Saved", 14).await.unwrap();
        engine.session().clone()
    };

    let mut engine = SyncEngine::new(temp.path(), EngineConfig::default())
        .await
        .unwrap();
    assert_eq!(engine.session(), &session);
    assert_eq!(names(&engine), vec!["Saved"]);

    engine.connect().await.unwrap();
    assert_eq!(names(&engine), vec!["Saved"]);
    assert_eq!(engine.fetch_history().await.unwrap().len(), 1);
}
