//! Satchel Core Library
//!
//! Slot-based character inventory for tabletop play, shared between clients
//! through a last-write-wins remote store.
//!
//! ## Overview
//!
//! A party keeps one roster of characters. Each character carries items in
//! fixed-size sections (equipped, backpack, sacks) where an item occupies a
//! contiguous run of slots. Every client mirrors the roster to a local cache
//! and to a shared remote tree; the newest timestamped write wins.
//!
//! ## Core Principles
//!
//! - **Local-first**: every mutation lands in memory and the cache before the remote
//! - **Read-only until touched**: a fresh client never overwrites shared data
//!   until its user issues a command
//! - **Last write wins**: stale saves adopt the remote value instead of clobbering it
//!
//! ## Quick Start
//!
//! ```ignore
//! use satchel_core::{EngineConfig, SectionKind, SyncEngine};
//! use satchel_core::inventory::ItemHead;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = SyncEngine::new("~/.satchel/data", EngineConfig::default()).await?;
//!     engine.connect().await?;
//!
//!     let idx = engine.add_character("Brakka", 16).await?;
//!     engine
//!         .place_item(idx, SectionKind::Backpack, 0, ItemHead::new("Rope", 2))
//!         .await?;
//!
//!     let load = engine.character(idx)?.encumbrance();
//!     println!("{} of {} slots used", load.total_used, load.total_slots);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod character;
pub mod config;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod state;
pub mod storage;
pub mod sync;
pub mod transfer;
pub mod types;

// Re-exports
pub use catalog::{CatalogEntry, ItemCatalog, ItemDraft};
pub use character::{Character, CharacterField};
pub use config::EngineConfig;
pub use engine::{SaveOutcome, SyncEngine, DATABASE_FILE};
pub use error::{InventoryError, InventoryResult};
pub use inventory::{ItemHead, SectionKind, Slot};
pub use state::{AppState, UiPrefs};
pub use storage::{LocalCache, MemoryCache, Storage};
pub use sync::{MemoryRemote, RemoteStore, SyncEvent};
pub use types::*;
