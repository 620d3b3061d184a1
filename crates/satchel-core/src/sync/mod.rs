//! Last-write-wins synchronization against a shared store
//!
//! ## Overview
//!
//! Every session keeps a full local copy of the inventory and catalog and
//! mirrors writes to a shared JSON store. Sessions learn about each other's
//! writes through change notifications. Conflicts are settled on whole
//! subtrees by the store's timestamps: no field-level merge is attempted.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  RemoteStore (trait)                                            │
//! │  ├── read / write / delete / push                               │
//! │  ├── transaction (atomic read-modify-write, stamps on commit)   │
//! │  └── subscribe (snapshots of a path after each change)          │
//! │                                                                 │
//! │  MemoryRemote: in-process store, optional redb persistence      │
//! │                                                                 │
//! │  ConflictPolicy (trait)                                         │
//! │  └── LastWriteWins: strictly newer remote wins a save,          │
//! │      incoming snapshots apply unless older or self-originated   │
//! │                                                                 │
//! │  history: capped snapshot logs under `history/`                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Layout of the shared tree
//!
//! ```text
//! inventory/chars/<i>/...     roster (guarded, subscribed)
//! inventory/lastUpdated       store timestamp of the last guarded commit
//! inventory/lastUpdatedBy     session of the last guarded commit
//! items/<id>                  catalog (direct writes, subscribed)
//! ui/<session>                per-session view prefs
//! history/inventory/<key>     roster snapshots
//! history/items/<key>         catalog snapshots
//! ```

pub mod conflict;
pub mod events;
pub mod history;
pub mod memory;
pub mod path;
pub mod remote;
pub mod tree;

pub use conflict::{ConflictPolicy, IncomingDecision, LastWriteWins, SaveDecision};
pub use events::{PathState, SyncEvent};
pub use history::{HistoryEntry, HistoryLog};
pub use memory::MemoryRemote;
pub use path::{ResourcePath, ResourceRoot};
pub use remote::{RemoteSnapshot, RemoteStore, Subscription, TxOutcome, TxUpdate, WriteMeta};
