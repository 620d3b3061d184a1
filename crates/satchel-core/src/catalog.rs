//! Shared item catalog
//!
//! Entries are templates: placing one copies its descriptors into a
//! character's section by value, so later catalog edits never touch items
//! already placed.

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, InventoryResult};
use crate::inventory::{
    CoinPurse, ItemHead, SubSlots, DEFAULT_PURSE_LIMIT, DEFAULT_SUB_SLOT_UNIT, MAX_SUB_SLOTS,
};
use crate::types::ItemId;

/// A catalog template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default = "one")]
    pub slots: usize,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub has_sub_slots: bool,
    #[serde(default)]
    pub max_sub_slots: u8,
    #[serde(default)]
    pub sub_slot_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub has_coin_slots: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_limit: Option<u32>,
}

fn one() -> usize {
    1
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl CatalogEntry {
    /// Item head to place: full charges, empty coin container
    pub fn to_head(&self) -> ItemHead {
        let mut head = ItemHead::new(self.name.clone(), self.slots.max(1));
        if self.has_sub_slots {
            head.sub_slots = Some(SubSlots::full(
                self.max_sub_slots.max(1),
                self.sub_slot_name.clone(),
            ));
        }
        if self.has_coin_slots {
            head.coins = Some(CoinPurse::new(
                Vec::new(),
                self.coin_limit.unwrap_or(DEFAULT_PURSE_LIMIT),
            ));
        }
        head
    }

    fn matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(query) || self.notes.to_lowercase().contains(query)
    }
}

/// User input for creating or editing a catalog entry
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub name: String,
    pub slots: usize,
    pub notes: String,
    /// Charges per item; `None` for items without sub-slots
    pub sub_slots: Option<(u8, String)>,
    /// Coin limit for coin containers
    pub coin_limit: Option<u32>,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>, slots: usize) -> Self {
        Self {
            name: name.into(),
            slots,
            ..Default::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_sub_slots(mut self, max: u8, unit: impl Into<String>) -> Self {
        self.sub_slots = Some((max, unit.into()));
        self
    }

    pub fn with_coins(mut self, limit: u32) -> Self {
        self.coin_limit = Some(limit);
        self
    }

    /// Trim and clamp into a storable entry
    pub fn validate(self) -> InventoryResult<CatalogEntry> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(InventoryError::InvalidOperation(
                "item name cannot be empty".to_string(),
            ));
        }
        let (has_sub_slots, max_sub_slots, sub_slot_name) = match self.sub_slots {
            Some((max, unit)) => {
                let unit = unit.trim();
                (
                    true,
                    max.clamp(1, MAX_SUB_SLOTS),
                    if unit.is_empty() {
                        DEFAULT_SUB_SLOT_UNIT.to_string()
                    } else {
                        unit.to_string()
                    },
                )
            }
            None => (false, 0, String::new()),
        };
        Ok(CatalogEntry {
            name,
            slots: self.slots.max(1),
            notes: self.notes.trim().to_string(),
            has_sub_slots,
            max_sub_slots,
            sub_slot_name,
            has_coin_slots: self.coin_limit.is_some(),
            coin_limit: self.coin_limit,
        })
    }
}

/// All catalog entries keyed by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ItemCatalog(BTreeMap<ItemId, CatalogEntry>);

impl<'de> Deserialize<'de> for ItemCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(ItemCatalog::from_value(value))
    }
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode from a keyed object or an array (older exports); bad entries are skipped
    pub fn from_value(value: serde_json::Value) -> Self {
        let pairs: Vec<(String, serde_json::Value)> = match value {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            serde_json::Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Vec::new(),
        };
        let entries = pairs
            .into_iter()
            .filter_map(|(key, v)| match serde_json::from_value::<CatalogEntry>(v) {
                Ok(entry) if !entry.name.trim().is_empty() => Some((ItemId::from_key(key), entry)),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "Skipping malformed catalog entry");
                    None
                }
            })
            .collect();
        Self(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &ItemId) -> Option<&CatalogEntry> {
        self.0.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &CatalogEntry)> {
        self.0.iter()
    }

    /// Insert a validated entry under a fresh id
    pub fn create(&mut self, draft: ItemDraft) -> InventoryResult<ItemId> {
        let entry = draft.validate()?;
        let id = ItemId::new();
        self.0.insert(id.clone(), entry);
        Ok(id)
    }

    /// Insert under a caller-provided id (remote push key)
    pub fn insert(&mut self, id: ItemId, entry: CatalogEntry) {
        self.0.insert(id, entry);
    }

    pub fn edit(&mut self, id: &ItemId, draft: ItemDraft) -> InventoryResult<&CatalogEntry> {
        let entry = draft.validate()?;
        let slot = self
            .0
            .get_mut(id)
            .ok_or_else(|| InventoryError::ItemNotFound(id.to_string()))?;
        *slot = entry;
        Ok(slot)
    }

    pub fn delete(&mut self, id: &ItemId) -> InventoryResult<CatalogEntry> {
        self.0
            .remove(id)
            .ok_or_else(|| InventoryError::ItemNotFound(id.to_string()))
    }

    /// Case-insensitive match on name or notes; an empty query lists everything
    pub fn search(&self, query: &str) -> Vec<(&ItemId, &CatalogEntry)> {
        let query = query.trim().to_lowercase();
        self.0
            .iter()
            .filter(|(_, entry)| query.is_empty() || entry.matches(&query))
            .collect()
    }

    /// Look up by exact id, falling back to a case-insensitive name match
    pub fn resolve(&self, key: &str) -> Option<(&ItemId, &CatalogEntry)> {
        self.0.get_key_value(&ItemId::from_key(key)).or_else(|| {
            let wanted = key.trim().to_lowercase();
            self.0
                .iter()
                .find(|(_, entry)| entry.name.to_lowercase() == wanted)
        })
    }
}
