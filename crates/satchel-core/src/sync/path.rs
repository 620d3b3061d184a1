//! Remote paths for inventory resources

use std::fmt;

use crate::character::CharacterField;
use crate::types::{ItemId, SessionId};

/// Root of the shared inventory subtree
pub const INVENTORY_ROOT: &str = "inventory";
/// Root of the shared catalog subtree
pub const CATALOG_ROOT: &str = "items";
/// Root of per-session UI prefs
pub const UI_ROOT: &str = "ui";
/// Inventory history log
pub const INVENTORY_HISTORY: &str = "history/inventory";
/// Catalog history log
pub const CATALOG_HISTORY: &str = "history/items";

/// Independently synchronized part of the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceRoot {
    Inventory,
    Catalog,
    Ui,
}

impl ResourceRoot {
    /// Classify a slash-separated path by its first segment
    pub fn of(path: &str) -> Option<Self> {
        match path.split('/').next()? {
            INVENTORY_ROOT => Some(ResourceRoot::Inventory),
            CATALOG_ROOT => Some(ResourceRoot::Catalog),
            UI_ROOT => Some(ResourceRoot::Ui),
            _ => None,
        }
    }

    /// Roots whose writes are guarded by the conflict policy
    pub fn is_guarded(self) -> bool {
        self == ResourceRoot::Inventory
    }
}

/// A path the engine saves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourcePath {
    /// The whole inventory: every character at its position
    Inventory,
    /// One character record
    Character(usize),
    /// One top-level field of a character record
    CharacterField(usize, CharacterField),
    /// The whole catalog
    Catalog,
    /// One catalog entry
    CatalogItem(ItemId),
    /// This session's UI prefs
    Ui(SessionId),
}

impl ResourcePath {
    pub fn root(&self) -> ResourceRoot {
        match self {
            ResourcePath::Inventory
            | ResourcePath::Character(_)
            | ResourcePath::CharacterField(..) => ResourceRoot::Inventory,
            ResourcePath::Catalog | ResourcePath::CatalogItem(_) => ResourceRoot::Catalog,
            ResourcePath::Ui(_) => ResourceRoot::Ui,
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourcePath::Inventory => write!(f, "{}", INVENTORY_ROOT),
            ResourcePath::Character(i) => write!(f, "{}/chars/{}", INVENTORY_ROOT, i),
            ResourcePath::CharacterField(i, field) => {
                write!(f, "{}/chars/{}/{}", INVENTORY_ROOT, i, field.key())
            }
            ResourcePath::Catalog => write!(f, "{}", CATALOG_ROOT),
            ResourcePath::CatalogItem(id) => write!(f, "{}/{}", CATALOG_ROOT, id),
            ResourcePath::Ui(session) => write!(f, "{}/{}", UI_ROOT, session),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::SectionKind;

    #[test]
    fn test_paths_render() {
        assert_eq!(ResourcePath::Inventory.to_string(), "inventory");
        assert_eq!(ResourcePath::Character(2).to_string(), "inventory/chars/2");
        assert_eq!(
            ResourcePath::CharacterField(0, CharacterField::Section(SectionKind::BeltPouch))
                .to_string(),
            "inventory/chars/0/beltPouch"
        );
        assert_eq!(
            ResourcePath::CatalogItem(ItemId::from_key("abc")).to_string(),
            "items/abc"
        );
        let session = SessionId::from_string("s1");
        assert_eq!(ResourcePath::Ui(session).to_string(), "ui/s1");
    }

    #[test]
    fn test_roots() {
        assert_eq!(ResourceRoot::of("inventory/chars/1"), Some(ResourceRoot::Inventory));
        assert_eq!(ResourceRoot::of("items"), Some(ResourceRoot::Catalog));
        assert_eq!(ResourceRoot::of("history/items"), None);
        assert!(ResourcePath::Character(0).root().is_guarded());
        assert!(!ResourcePath::Catalog.root().is_guarded());
    }
}
