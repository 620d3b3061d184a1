//! Error types for Satchel

use thiserror::Error;

use crate::inventory::SectionKind;

/// Main error type for Satchel operations
///
/// Model errors (space, sack) block only the offending command. Sync errors
/// are recovered inside the engine and surface here only from explicit
/// remote calls.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Placement or move could not find the required contiguous run
    #[error("Not enough contiguous empty slots for {name} ({needed} slots) in {section}")]
    InsufficientSpace {
        name: String,
        needed: usize,
        section: SectionKind,
    },

    /// Duplication found no free run anywhere in the section
    #[error("No empty slots available to duplicate {0}")]
    NoSpaceAvailable(String),

    /// Refusal to unequip a sack container while it still holds items
    #[error("You must empty the {0} before removing it from equipped")]
    SackNotEmpty(SectionKind),

    /// Local save superseded by a newer remote timestamp
    #[error("Remote state is newer (remote {remote}, local {local}); local write abandoned")]
    StaleWrite { local: i64, remote: i64 },

    /// Network or store failure during read, write or subscribe
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// Externally supplied bulk data failed shape checks
    #[error("Invalid data file: {0}")]
    MalformedImport(String),

    /// Character index out of range
    #[error("Character not found: {0}")]
    CharacterNotFound(usize),

    /// Catalog entry was not found
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Slot index out of range or not holding an item head
    #[error("No item at {section} slot {index}")]
    SlotNotFound { section: SectionKind, index: usize },

    /// Section is not present on this character (sack not equipped)
    #[error("Section {0} is not available")]
    SectionUnavailable(SectionKind),

    /// Invalid operation for current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Error during storage operations (redb)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InventoryError {
    /// Whether the error is a recoverable model refusal that leaves state untouched.
    pub fn is_model_refusal(&self) -> bool {
        matches!(
            self,
            InventoryError::InsufficientSpace { .. }
                | InventoryError::NoSpaceAvailable(_)
                | InventoryError::SackNotEmpty(_)
        )
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(e: serde_json::Error) -> Self {
        InventoryError::Serialization(e.to_string())
    }
}

/// Result type alias using InventoryError
pub type InventoryResult<T> = Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InventoryError::InsufficientSpace {
            name: "Longsword".to_string(),
            needed: 2,
            section: SectionKind::Backpack,
        };
        assert_eq!(
            format!("{}", err),
            "Not enough contiguous empty slots for Longsword (2 slots) in Backpack"
        );
        assert!(err.is_model_refusal());
    }

    #[test]
    fn test_sack_not_empty_display() {
        let err = InventoryError::SackNotEmpty(SectionKind::LargeSack);
        assert_eq!(
            err.to_string(),
            "You must empty the Large Sack before removing it from equipped"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: InventoryError = io_err.into();
        assert!(matches!(err, InventoryError::Io(_)));
        assert!(!err.is_model_refusal());
    }
}
