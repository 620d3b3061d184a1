//! JSONL logging for concurrent clients.
//!
//! Several clients can work against the same data directory at once. Each
//! one appends to its own JSONL file named after its session token, so
//! nothing interleaves and the files can be merged afterwards.
//!
//! ## Layout
//!
//! ```text
//! logs/
//! └── raw/                              # one file per session per day
//!     ├── 2026-10-18_4kX9pQ2m.jsonl
//!     └── 2026-10-18_Hq7TzA1c.jsonl
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use satchel_core::logging::JsonlLayer;
//! use tracing_subscriber::prelude::*;
//!
//! let jsonl_layer = JsonlLayer::new("./logs", session.short())?;
//!
//! tracing_subscriber::registry()
//!     .with(jsonl_layer)
//!     .with(tracing_subscriber::fmt::layer())
//!     .init();
//! ```
//!
//! ### Querying logs with jq
//!
//! ```bash
//! # Every superseded save
//! jq 'select(.msg | test("Superseded"))' logs/raw/*.jsonl
//!
//! # Timeline across clients
//! cat logs/raw/*.jsonl | jq -s 'sort_by(.ts)'
//! ```

pub mod entry;
pub mod layer;
pub mod writer;

pub use entry::JsonLogEntry;
pub use layer::{JsonlLayer, LoggingBuilder};
pub use writer::{read_all_entries, read_entries_for_date, SessionLogWriter};
