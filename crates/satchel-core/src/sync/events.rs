//! Sync events and per-path state
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  PathState: per resource root                                   │
//! │  ├── Idle: nothing in flight                                    │
//! │  ├── ApplyingRemote: replacing local state from a notification  │
//! │  └── Saving: local value on its way to the remote               │
//! │                                                                 │
//! │  SyncEvent: notifications for the render layer                  │
//! │  ├── ExternalUpdateApplied: another session changed state       │
//! │  ├── LocalMutationCommitted: a command changed local state      │
//! │  ├── SaveSuperseded: newer remote value adopted instead         │
//! │  ├── RemoteUnavailable: store failed, cache keeps serving       │
//! │  └── WritesEnabled: session left read-only mode                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use crate::types::{SessionId, Timestamp};

/// Sync state of one resource root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PathState {
    #[default]
    Idle,
    ApplyingRemote,
    Saving,
}

impl fmt::Display for PathState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathState::Idle => write!(f, "Idle"),
            PathState::ApplyingRemote => write!(f, "Applying remote"),
            PathState::Saving => write!(f, "Saving"),
        }
    }
}

/// Events emitted by the sync engine
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Another session's value replaced part of local state
    ExternalUpdateApplied {
        /// Remote path that changed
        path: String,
        /// Session that wrote it, when known
        origin: Option<SessionId>,
    },
    /// A local command changed state
    LocalMutationCommitted {
        /// Path the command saved
        path: String,
    },
    /// A local save lost to a newer remote value
    SaveSuperseded {
        path: String,
        local: Timestamp,
        remote: Timestamp,
    },
    /// The remote store failed; local state stays authoritative
    RemoteUnavailable {
        path: String,
        reason: String,
    },
    /// The session may now write to the remote
    WritesEnabled,
}

impl SyncEvent {
    /// Whether the render layer should re-derive its views
    pub fn requires_render(&self) -> bool {
        matches!(
            self,
            SyncEvent::ExternalUpdateApplied { .. }
                | SyncEvent::LocalMutationCommitted { .. }
                | SyncEvent::SaveSuperseded { .. }
        )
    }
}
