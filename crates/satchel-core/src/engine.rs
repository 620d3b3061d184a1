//! Main SyncEngine - the root controller for Satchel
//!
//! SyncEngine owns the application state and coordinates:
//! - The local cache, written before anything else on every save
//! - The shared remote store, written through the conflict policy
//! - Change notifications from other sessions
//!
//! # Example
//!
//! ```ignore
//! use satchel_core::{EngineConfig, SectionKind, SyncEngine};
//!
//! let mut engine = SyncEngine::new("~/.satchel/data", EngineConfig::default()).await?;
//! engine.connect().await?;
//!
//! let hero = engine.add_character("Brakka", 16).await?;
//! engine.place_from_catalog(hero, SectionKind::Backpack, 0, "Rope").await?;
//!
//! // Later: pick up what other sessions wrote
//! engine.process_pending().await;
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::catalog::ItemCatalog;
use crate::character::Character;
use crate::config::EngineConfig;
use crate::error::{InventoryError, InventoryResult};
use crate::state::{chars_from_value, AppState};
use crate::storage::{LocalCache, Storage};
use crate::sync::history::{self, HistoryEntry, HistoryLog};
use crate::sync::path::{CATALOG_ROOT, INVENTORY_ROOT};
use crate::sync::remote::{LAST_UPDATED_BY_KEY, LAST_UPDATED_KEY};
use crate::sync::{
    tree, ConflictPolicy, IncomingDecision, LastWriteWins, MemoryRemote, PathState, RemoteSnapshot,
    RemoteStore, ResourcePath, ResourceRoot, SaveDecision, Subscription, SyncEvent, TxOutcome,
    TxUpdate, WriteMeta,
};
use crate::types::{SessionId, Timestamp};

mod commands;

/// Default capacity for event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// File name of the database inside the data directory
pub const DATABASE_FILE: &str = "satchel.redb";

/// What happened to a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Cached locally; remote writes are not enabled yet
    LocalOnly,
    /// Suppressed while a remote snapshot was being applied
    Deferred,
    /// Written to the remote store
    Written { timestamp: Option<Timestamp> },
    /// A newer remote value was adopted instead of the local one
    Superseded { remote: Timestamp },
    /// The store failed; the change lives only in memory and the cache
    Unavailable,
}

/// Root controller: owns state, mirrors it to the cache and the remote store
pub struct SyncEngine {
    /// Catalog, roster and UI prefs
    state: AppState,
    /// This client's session token, attached to every remote write
    session: SessionId,
    cache: Arc<dyn LocalCache>,
    remote: Arc<dyn RemoteStore>,
    policy: Arc<dyn ConflictPolicy>,
    config: EngineConfig,
    /// No remote writes until the first user command
    read_only: bool,
    path_states: HashMap<ResourceRoot, PathState>,
    subscriptions: Vec<Subscription>,
    /// Event broadcast channel for the render layer
    event_tx: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Open an engine whose cache and remote store share one redb file in `data_dir`
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Io` if the directory cannot be created.
    /// Returns `InventoryError::Database` if storage initialization fails.
    pub async fn new(data_dir: impl AsRef<Path>, config: EngineConfig) -> InventoryResult<Self> {
        let data_dir = data_dir.as_ref();
        info!(?data_dir, "Initializing SyncEngine");

        std::fs::create_dir_all(data_dir)?;
        let storage = Storage::new(data_dir.join(DATABASE_FILE))?;
        let remote = MemoryRemote::persistent(storage.clone())?;

        Ok(Self::open(Arc::new(storage), Arc::new(remote), config))
    }

    /// Start from whatever the cache holds; the engine begins read-only by default
    pub fn open(
        cache: Arc<dyn LocalCache>,
        remote: Arc<dyn RemoteStore>,
        config: EngineConfig,
    ) -> Self {
        let session = match cache.get(&config.session_cache_key) {
            Some(token) if !token.trim().is_empty() => SessionId::from_string(token.trim()),
            _ => {
                let session = SessionId::generate();
                cache.set(&config.session_cache_key, session.as_str());
                info!(session = %session.short(), "Generated new session token");
                session
            }
        };

        let mut state = cache
            .get(&config.state_cache_key)
            .and_then(|raw| AppState::from_cache(&raw))
            .unwrap_or_default();
        let repaired = state.normalize_all();

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let engine = Self {
            state,
            session,
            cache,
            remote,
            policy: Arc::new(LastWriteWins),
            read_only: config.start_read_only,
            config,
            path_states: HashMap::new(),
            subscriptions: Vec::new(),
            event_tx,
        };
        if !repaired.is_empty() {
            debug!(count = repaired.len(), "Normalized cached characters");
            engine.write_cache();
        }
        info!(
            session = %engine.session.short(),
            chars = engine.state.chars.len(),
            items = engine.state.items.len(),
            "SyncEngine opened"
        );
        engine
    }

    /// Replace the conflict policy
    pub fn with_policy(mut self, policy: Arc<dyn ConflictPolicy>) -> Self {
        self.policy = policy;
        self
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn character(&self, index: usize) -> InventoryResult<&Character> {
        self.state.character(index)
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn path_state(&self, root: ResourceRoot) -> PathState {
        self.path_states.get(&root).copied().unwrap_or_default()
    }

    /// Receive sync events (render triggers, superseded saves, outages)
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// Leave read-only mode for the rest of the session
    pub fn enable_writes(&mut self) {
        if self.read_only {
            self.read_only = false;
            info!(session = %self.session.short(), "Read-only mode disabled; changes will sync");
            self.emit(SyncEvent::WritesEnabled);
        }
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.event_tx.send(event);
    }

    fn set_path_state(&mut self, root: ResourceRoot, state: PathState) {
        self.path_states.insert(root, state);
    }

    /// Mirror the full state into the local cache; failures are logged only
    fn write_cache(&self) {
        match serde_json::to_string(&self.state) {
            Ok(raw) => {
                if !self.cache.set(&self.config.state_cache_key, &raw) {
                    warn!("Local cache rejected state write");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize state for cache"),
        }
    }

    fn remote_unavailable(&self, path: &str, error: &InventoryError) {
        warn!(%path, error = %error, "Remote store unavailable; keeping local state");
        self.emit(SyncEvent::RemoteUnavailable {
            path: path.to_string(),
            reason: error.to_string(),
        });
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Remote Connection
    // ═══════════════════════════════════════════════════════════════════════

    /// Load the catalog and inventory from the remote, then subscribe to both
    ///
    /// On failure the cache keeps serving and the error is returned after
    /// being logged and broadcast.
    pub async fn connect(&mut self) -> InventoryResult<()> {
        let result = self.load_and_subscribe().await;
        if let Err(e) = &result {
            self.remote_unavailable(INVENTORY_ROOT, e);
        }
        result
    }

    async fn load_and_subscribe(&mut self) -> InventoryResult<()> {
        for root in [CATALOG_ROOT, INVENTORY_ROOT] {
            let value = self.remote.read(root).await?;
            let origin = value
                .as_ref()
                .and_then(|v| v.get(LAST_UPDATED_BY_KEY))
                .and_then(Value::as_str)
                .map(SessionId::from_string);
            self.apply_remote(RemoteSnapshot {
                path: root.to_string(),
                value,
                origin,
            })
            .await;
        }

        if self.subscriptions.is_empty() {
            self.subscriptions.push(self.remote.subscribe(INVENTORY_ROOT).await?);
            self.subscriptions.push(self.remote.subscribe(CATALOG_ROOT).await?);
        }
        info!(
            chars = self.state.chars.len(),
            items = self.state.items.len(),
            last_updated = self.state.last_updated,
            "Connected to remote store"
        );
        self.process_pending().await;
        Ok(())
    }

    /// Apply every queued remote notification; returns how many changed local state
    pub async fn process_pending(&mut self) -> usize {
        let mut queued = Vec::new();
        for subscription in &mut self.subscriptions {
            while let Some(snapshot) = subscription.try_next() {
                queued.push(snapshot);
            }
        }

        let mut applied = 0;
        for snapshot in queued {
            if self.apply_remote(snapshot).await {
                applied += 1;
            }
        }
        if applied > 0 {
            debug!(applied, "Processed remote notifications");
        }
        applied
    }

    /// Apply one remote snapshot; returns whether local state changed
    pub async fn apply_remote(&mut self, snapshot: RemoteSnapshot) -> bool {
        let self_origin = snapshot.origin.as_ref() == Some(&self.session);
        match ResourceRoot::of(&snapshot.path) {
            Some(ResourceRoot::Inventory) => self.apply_inventory(snapshot, self_origin).await,
            Some(ResourceRoot::Catalog) => self.apply_catalog(snapshot, self_origin),
            _ => {
                debug!(path = %snapshot.path, "Ignoring snapshot for unwatched path");
                false
            }
        }
    }

    async fn apply_inventory(&mut self, snapshot: RemoteSnapshot, self_origin: bool) -> bool {
        let incoming = snapshot.timestamp().unwrap_or(0);
        let Some(value) = snapshot.value else {
            debug!("Remote inventory is empty; keeping local roster");
            return false;
        };

        match self
            .policy
            .on_incoming(self.state.last_updated, incoming, self_origin)
        {
            IncomingDecision::RecordOnly => {
                self.state.last_updated = self.state.last_updated.max(incoming);
                false
            }
            IncomingDecision::Ignore => {
                debug!(
                    local = self.state.last_updated,
                    incoming, "Ignoring stale remote inventory"
                );
                false
            }
            IncomingDecision::Apply => {
                self.set_path_state(ResourceRoot::Inventory, PathState::ApplyingRemote);
                let chars = value.get("chars").cloned().map(chars_from_value).unwrap_or_default();
                let repaired = self.state.replace_chars(chars);
                self.state.last_updated = incoming;

                // Repairs are not echoed back while applying
                for (index, report) in repaired {
                    for field in report.changed {
                        self.save(ResourcePath::CharacterField(index, field)).await;
                    }
                }
                self.write_cache();
                self.set_path_state(ResourceRoot::Inventory, PathState::Idle);

                info!(
                    origin = ?snapshot.origin.as_ref().map(SessionId::short),
                    timestamp = incoming,
                    chars = self.state.chars.len(),
                    "Applied remote inventory"
                );
                self.emit(SyncEvent::ExternalUpdateApplied {
                    path: snapshot.path,
                    origin: snapshot.origin,
                });
                true
            }
        }
    }

    fn apply_catalog(&mut self, snapshot: RemoteSnapshot, self_origin: bool) -> bool {
        if self_origin {
            return false;
        }
        let Some(value) = snapshot.value else {
            return false;
        };
        self.set_path_state(ResourceRoot::Catalog, PathState::ApplyingRemote);
        self.state.items = ItemCatalog::from_value(value);
        self.write_cache();
        self.set_path_state(ResourceRoot::Catalog, PathState::Idle);

        info!(items = self.state.items.len(), "Applied remote catalog");
        self.emit(SyncEvent::ExternalUpdateApplied {
            path: snapshot.path,
            origin: snapshot.origin,
        });
        true
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Saving
    // ═══════════════════════════════════════════════════════════════════════

    /// Persist the local value at `path`
    pub async fn save(&mut self, path: ResourcePath) -> SaveOutcome {
        self.save_many(vec![path]).await
    }

    /// Persist several paths; guarded paths go out in one transaction
    ///
    /// The cache is always written first. Nothing reaches the remote while
    /// read-only or while a remote snapshot is being applied.
    pub async fn save_many(&mut self, paths: Vec<ResourcePath>) -> SaveOutcome {
        self.write_cache();
        if paths.is_empty() {
            return SaveOutcome::LocalOnly;
        }

        let mut groups: Vec<(ResourceRoot, Vec<ResourcePath>)> = Vec::new();
        for path in paths {
            let root = path.root();
            match groups.iter_mut().find(|(r, _)| *r == root) {
                Some((_, group)) => {
                    if !group.contains(&path) {
                        group.push(path);
                    }
                }
                None => groups.push((root, vec![path])),
            }
        }

        // Report the first root that did not reach the remote, else the last write
        let mut outcomes = Vec::with_capacity(groups.len());
        for (root, group) in groups {
            outcomes.push(self.save_group(root, group).await);
        }
        outcomes
            .iter()
            .copied()
            .find(|o| !matches!(o, SaveOutcome::Written { .. }))
            .or_else(|| outcomes.last().copied())
            .unwrap_or(SaveOutcome::LocalOnly)
    }

    async fn save_group(&mut self, root: ResourceRoot, paths: Vec<ResourcePath>) -> SaveOutcome {
        if self.path_state(root) == PathState::ApplyingRemote {
            debug!(?root, "Save suppressed while applying remote state");
            return SaveOutcome::Deferred;
        }
        if self.read_only {
            debug!(?root, "Read-only; change kept locally");
            return SaveOutcome::LocalOnly;
        }

        self.set_path_state(root, PathState::Saving);
        let label = paths
            .first()
            .map(ToString::to_string)
            .unwrap_or_default();
        let result = if root.is_guarded() {
            self.save_guarded(&paths).await
        } else {
            self.save_direct(root, &paths).await
        };
        self.set_path_state(root, PathState::Idle);

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.remote_unavailable(&label, &e);
                SaveOutcome::Unavailable
            }
        }
    }

    /// Local value at `path`; `null` when it no longer exists
    fn local_value(&self, path: &ResourcePath) -> Value {
        let encoded = match path {
            ResourcePath::Inventory => serde_json::to_value(&self.state.chars),
            ResourcePath::Character(i) => serde_json::to_value(self.state.chars.get(*i)),
            ResourcePath::CharacterField(i, field) => {
                return self
                    .state
                    .chars
                    .get(*i)
                    .map(|c| field.value_of(c))
                    .unwrap_or_default()
            }
            ResourcePath::Catalog => serde_json::to_value(&self.state.items),
            ResourcePath::CatalogItem(id) => serde_json::to_value(self.state.items.get(id)),
            ResourcePath::Ui(_) => serde_json::to_value(&self.state.ui),
        };
        encoded.unwrap_or_default()
    }

    async fn save_direct(
        &mut self,
        root: ResourceRoot,
        paths: &[ResourcePath],
    ) -> InventoryResult<SaveOutcome> {
        let meta = WriteMeta::plain(&self.session);
        for path in paths {
            let value = self.local_value(path);
            self.remote.write(&path.to_string(), value, &meta).await?;
            debug!(%path, "Saved to remote");
        }

        if root == ResourceRoot::Catalog {
            let recorded = history::record_catalog(self.remote.as_ref(), &self.state.items, &meta)
                .await
                .map(|_| ());
            self.after_history(HistoryLog::Catalog, recorded, &meta).await;
        }
        Ok(SaveOutcome::Written { timestamp: None })
    }

    async fn save_guarded(&mut self, paths: &[ResourcePath]) -> InventoryResult<SaveOutcome> {
        let meta = WriteMeta::stamped(&self.session);
        let local = self.state.last_updated;

        let remote_ts = self
            .remote
            .read(&format!("{}/{}", INVENTORY_ROOT, LAST_UPDATED_KEY))
            .await?
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        if self.policy.before_save(local, remote_ts) == SaveDecision::Adopt {
            let current = self.remote.read(INVENTORY_ROOT).await?;
            return Ok(self.adopt_inventory(current, local, remote_ts));
        }

        let recorded = history::record_inventory(self.remote.as_ref(), &self.state.chars, &meta)
            .await
            .map(|_| ());
        self.after_history(HistoryLog::Inventory, recorded, &meta).await;

        let writes: Vec<(String, Value)> = paths
            .iter()
            .map(|path| {
                let relative = match path {
                    ResourcePath::Inventory => "chars".to_string(),
                    other => other
                        .to_string()
                        .trim_start_matches(INVENTORY_ROOT)
                        .trim_start_matches('/')
                        .to_string(),
                };
                (relative, self.local_value(path))
            })
            .collect();
        let policy = Arc::clone(&self.policy);
        let update: TxUpdate = Box::new(move |current: Option<&Value>| {
            let current_ts = current
                .and_then(|v| v.get(LAST_UPDATED_KEY))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            if policy.before_save(local, current_ts) == SaveDecision::Adopt {
                return None;
            }
            let mut next = match current {
                Some(v) if v.is_object() => v.clone(),
                _ => Value::Object(Default::default()),
            };
            for (relative, value) in writes {
                tree::set(&mut next, &relative, value);
            }
            Some(next)
        });

        match self.remote.transaction(INVENTORY_ROOT, &meta, update).await? {
            TxOutcome::Committed { timestamp, .. } => {
                if let Some(ts) = timestamp {
                    self.state.last_updated = ts;
                }
                self.write_cache();
                debug!(
                    paths = paths.len(),
                    timestamp = ?timestamp,
                    "Committed inventory save"
                );
                Ok(SaveOutcome::Written { timestamp })
            }
            TxOutcome::Aborted { current } => {
                let remote_ts = current
                    .as_ref()
                    .and_then(|v| v.get(LAST_UPDATED_KEY))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                Ok(self.adopt_inventory(current, local, remote_ts))
            }
        }
    }

    async fn after_history(
        &self,
        log: HistoryLog,
        recorded: InventoryResult<()>,
        meta: &WriteMeta,
    ) {
        let result = match recorded {
            Ok(()) => {
                history::prune(self.remote.as_ref(), log, self.config.history_limit, meta)
                    .await
                    .map(|_| ())
            }
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(log = log.path(), error = %e, "Failed to record history snapshot");
        }
    }

    /// Drop the pending local roster in favor of the newer remote one
    fn adopt_inventory(
        &mut self,
        current: Option<Value>,
        local: Timestamp,
        remote: Timestamp,
    ) -> SaveOutcome {
        let stale = InventoryError::StaleWrite { local, remote };
        warn!(error = %stale, "Adopting newer remote inventory");

        let chars = current
            .as_ref()
            .and_then(|v| v.get("chars"))
            .cloned()
            .map(chars_from_value)
            .unwrap_or_default();
        self.set_path_state(ResourceRoot::Inventory, PathState::ApplyingRemote);
        self.state.replace_chars(chars);
        self.state.last_updated = remote;
        self.write_cache();
        self.set_path_state(ResourceRoot::Inventory, PathState::Idle);

        self.emit(SyncEvent::SaveSuperseded {
            path: INVENTORY_ROOT.to_string(),
            local,
            remote,
        });
        SaveOutcome::Superseded { remote }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // History
    // ═══════════════════════════════════════════════════════════════════════

    /// Inventory snapshots, newest first
    pub async fn fetch_history(&self) -> InventoryResult<Vec<HistoryEntry>> {
        history::fetch(self.remote.as_ref(), HistoryLog::Inventory).await
    }

    /// Catalog snapshots, newest first
    pub async fn fetch_catalog_history(&self) -> InventoryResult<Vec<HistoryEntry>> {
        history::fetch(self.remote.as_ref(), HistoryLog::Catalog).await
    }

    /// Replace the roster with a recorded snapshot and save it
    pub async fn restore_snapshot(&mut self, key: &str) -> InventoryResult<SaveOutcome> {
        let entry = history::fetch_one(self.remote.as_ref(), HistoryLog::Inventory, key)
            .await?
            .ok_or_else(|| {
                InventoryError::InvalidOperation(format!("no history snapshot {}", key))
            })?;
        self.enable_writes();
        info!(%key, chars = entry.chars.len(), "Restoring inventory snapshot");
        self.state.replace_chars(entry.chars);
        Ok(self.commit(vec![ResourcePath::Inventory]).await)
    }

    /// Save `paths` and tell the render layer
    async fn commit(&mut self, paths: Vec<ResourcePath>) -> SaveOutcome {
        let label = paths
            .first()
            .map(ToString::to_string)
            .unwrap_or_else(|| INVENTORY_ROOT.to_string());
        let outcome = self.save_many(paths).await;
        self.emit(SyncEvent::LocalMutationCommitted { path: label });
        outcome
    }

    /// Indices of characters the UI shows
    pub fn visible_characters(&self) -> Vec<usize> {
        let hidden: &BTreeSet<usize> = &self.state.ui.hidden_chars;
        (0..self.state.chars.len())
            .filter(|i| !hidden.contains(i))
            .collect()
    }
}
