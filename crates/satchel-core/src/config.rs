//! Engine configuration
//!
//! Loaded from `<data_dir>/config.json` with defaults applied for missing
//! fields. Example:
//!
//! ```json
//! { "historyLimit": 20, "startReadOnly": false }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::InventoryResult;

/// File name looked up inside the data directory
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Snapshots kept per history log
    pub history_limit: usize,
    /// Local cache key holding the serialized state
    pub state_cache_key: String,
    /// Local cache key holding this client's session token
    pub session_cache_key: String,
    /// Refuse remote writes until the first user command
    pub start_read_only: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            state_cache_key: "inv_external_items_v5".to_string(),
            session_cache_key: "inventory_session_id".to_string(),
            start_read_only: true,
        }
    }
}

impl EngineConfig {
    /// Read `config.json` from `data_dir`; a missing file gives the defaults
    pub fn load(data_dir: impl AsRef<Path>) -> InventoryResult<Self> {
        let path = data_dir.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&raw)?;
        tracing::debug!(path = %path.display(), ?config, "Loaded engine config");
        Ok(config)
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = EngineConfig::load(temp.path()).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.history_limit, 50);
        assert!(config.start_read_only);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE),
            r#"{"historyLimit": 5, "startReadOnly": false}"#,
        )
        .unwrap();
        let config = EngineConfig::load(temp.path()).unwrap();
        assert_eq!(config.history_limit, 5);
        assert!(!config.start_read_only);
        assert_eq!(config.state_cache_key, "inv_external_items_v5");
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE), "{not json").unwrap();
        assert!(EngineConfig::load(temp.path()).is_err());
    }
}
