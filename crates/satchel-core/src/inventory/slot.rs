//! Slot cells and item heads
//!
//! A multi-slot item occupies a contiguous run: its first cell is a
//! [`Slot::Head`] carrying the item, the remaining cells are [`Slot::Link`]s
//! pointing back at the head index.
//!
//! The persisted form is lenient. `null` is an empty cell, `{"link": n}` a
//! continuation and any object with `head: true` an item head. Anything else
//! decodes to an empty cell rather than failing the whole character.

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use super::coins::{CoinPurse, Denomination, DEFAULT_PURSE_LIMIT};

/// Hard upper bound for sub-slot uses per item
pub const MAX_SUB_SLOTS: u8 = 3;

/// Unit label used when an item doesn't name its charges
pub const DEFAULT_SUB_SLOT_UNIT: &str = "unit";

/// One cell of a section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Slot {
    #[default]
    Empty,
    Head(ItemHead),
    Link { head: usize },
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub fn as_head(&self) -> Option<&ItemHead> {
        match self {
            Slot::Head(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_head_mut(&mut self) -> Option<&mut ItemHead> {
        match self {
            Slot::Head(h) => Some(h),
            _ => None,
        }
    }

    /// Index of the head this cell belongs to, given the cell's own index
    pub fn head_index(&self, own_index: usize) -> Option<usize> {
        match self {
            Slot::Empty => None,
            Slot::Head(_) => Some(own_index),
            Slot::Link { head } => Some(*head),
        }
    }
}

/// The item occupying the first cell of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemHead {
    pub name: String,
    /// Length of the run, at least 1
    pub slot_count: usize,
    pub sub_slots: Option<SubSlots>,
    pub coins: Option<CoinPurse>,
}

impl ItemHead {
    pub fn new(name: impl Into<String>, slot_count: usize) -> Self {
        Self {
            name: name.into(),
            slot_count: slot_count.max(1),
            sub_slots: None,
            coins: None,
        }
    }

    pub fn with_sub_slots(mut self, sub_slots: SubSlots) -> Self {
        self.sub_slots = Some(sub_slots);
        self
    }

    pub fn with_coins(mut self, coins: CoinPurse) -> Self {
        self.coins = Some(coins);
        self
    }

    /// "Torch (2/3 uses)" style label
    pub fn display_name(&self) -> String {
        match &self.sub_slots {
            Some(sub) => format!("{} ({}/{} {})", self.name, sub.filled, sub.max, sub.unit),
            None => self.name.clone(),
        }
    }
}

/// Consumable charges on an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubSlots {
    pub max: u8,
    pub filled: u8,
    pub unit: String,
}

impl SubSlots {
    /// Full charges, `max` clamped to `1..=3`
    pub fn full(max: u8, unit: impl Into<String>) -> Self {
        let max = max.clamp(1, MAX_SUB_SLOTS);
        let unit = unit.into();
        Self {
            max,
            filled: max,
            unit: if unit.trim().is_empty() {
                DEFAULT_SUB_SLOT_UNIT.to_string()
            } else {
                unit
            },
        }
    }

    /// Remaining room before the item is full
    pub fn available(&self) -> u8 {
        self.max.saturating_sub(self.filled)
    }

    /// Use one charge. Returns false when nothing is left.
    pub fn consume(&mut self) -> bool {
        if self.filled == 0 {
            return false;
        }
        self.filled -= 1;
        true
    }

    /// Restore one charge. Returns false when already full.
    pub fn refill(&mut self) -> bool {
        if self.filled >= self.max {
            return false;
        }
        self.filled += 1;
        true
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Wire format
// ═══════════════════════════════════════════════════════════════════════

#[derive(Serialize, Deserialize)]
struct LinkWire {
    link: usize,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct HeadWire {
    #[serde(default)]
    name: String,
    #[serde(default)]
    slots: Option<serde_json::Value>,
    #[serde(default)]
    head: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    has_sub_slots: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_sub_slots: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filled_sub_slots: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub_slot_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    has_coin_slots: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coin_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coin_amounts: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coin_limit: Option<serde_json::Value>,
}

fn as_count(value: Option<&serde_json::Value>) -> Option<u64> {
    let v = value?;
    v.as_u64()
        .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

impl From<&ItemHead> for HeadWire {
    fn from(head: &ItemHead) -> Self {
        let mut wire = HeadWire {
            name: head.name.clone(),
            slots: Some(serde_json::Value::from(head.slot_count)),
            head: true,
            ..Default::default()
        };
        if let Some(sub) = &head.sub_slots {
            wire.has_sub_slots = Some(true);
            wire.max_sub_slots = Some(sub.max.into());
            wire.filled_sub_slots = Some(sub.filled.into());
            wire.sub_slot_name = Some(sub.unit.clone());
        }
        if let Some(purse) = &head.coins {
            wire.has_coin_slots = Some(true);
            wire.coin_types = Some(purse.types.iter().map(|d| d.code().to_string()).collect());
            wire.coin_amounts = Some(
                purse
                    .types
                    .iter()
                    .map(|d| (d.code().to_string(), purse.amount(*d).into()))
                    .collect(),
            );
            wire.coin_limit = Some(purse.limit.into());
        }
        wire
    }
}

impl HeadWire {
    fn into_head(self) -> ItemHead {
        let slot_count = as_count(self.slots.as_ref()).unwrap_or(1).max(1) as usize;
        let mut head = ItemHead::new(self.name, slot_count);

        if self.has_sub_slots.unwrap_or(false) {
            let max = as_count(self.max_sub_slots.as_ref())
                .unwrap_or(1)
                .clamp(1, MAX_SUB_SLOTS as u64) as u8;
            let mut sub = SubSlots::full(max, self.sub_slot_name.unwrap_or_default());
            if let Some(filled) = as_count(self.filled_sub_slots.as_ref()) {
                sub.filled = filled.min(max as u64) as u8;
            }
            head.sub_slots = Some(sub);
        }

        if self.has_coin_slots.unwrap_or(false) {
            let types: Vec<Denomination> = self
                .coin_types
                .unwrap_or_default()
                .iter()
                .filter_map(|t| t.parse().ok())
                .collect();
            let limit = as_count(self.coin_limit.as_ref())
                .map(|l| l.min(u32::MAX as u64) as u32)
                .unwrap_or(DEFAULT_PURSE_LIMIT);
            let mut purse = CoinPurse::new(types, limit);
            let mut loaded = BTreeMap::new();
            for (code, raw) in self.coin_amounts.unwrap_or_default() {
                let Ok(denomination) = code.parse::<Denomination>() else {
                    continue;
                };
                let amount = as_count(Some(&raw)).unwrap_or(0).min(u32::MAX as u64) as u32;
                loaded.insert(denomination, amount);
            }
            // Clamp in display order so the first denominations keep their coins
            for denomination in Denomination::ALL {
                if let Some(amount) = loaded.get(&denomination) {
                    if purse.types.contains(&denomination) {
                        purse.set_amount(denomination, *amount);
                    }
                }
            }
            head.coins = Some(purse);
        }

        head
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Slot::Empty => serializer.serialize_none(),
            Slot::Link { head } => LinkWire { link: *head }.serialize(serializer),
            Slot::Head(h) => HeadWire::from(h).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Slot::from_value(value))
    }
}

impl Slot {
    /// Decode one persisted cell, treating malformed input as empty
    pub fn from_value(value: serde_json::Value) -> Self {
        let serde_json::Value::Object(map) = &value else {
            return Slot::Empty;
        };
        if let Some(link) = map.get("link").and_then(|l| l.as_u64()) {
            return Slot::Link {
                head: link as usize,
            };
        }
        let is_head = match map.get("head") {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            _ => false,
        };
        if !is_head {
            return Slot::Empty;
        }
        match serde_json::from_value::<HeadWire>(value) {
            Ok(wire) => Slot::Head(wire.into_head()),
            Err(e) => {
                tracing::debug!(error = %e, "Dropping malformed slot head");
                Slot::Empty
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_basic_cells() {
        assert_eq!(Slot::from_value(json!(null)), Slot::Empty);
        assert_eq!(Slot::from_value(json!({"link": 3})), Slot::Link { head: 3 });
        let head = Slot::from_value(json!({"name": "Rope", "slots": 2, "head": true}));
        assert_eq!(head, Slot::Head(ItemHead::new("Rope", 2)));
    }

    #[test]
    fn test_malformed_cells_decode_as_empty() {
        assert_eq!(Slot::from_value(json!("Rope")), Slot::Empty);
        assert_eq!(Slot::from_value(json!(42)), Slot::Empty);
        assert_eq!(Slot::from_value(json!({"name": "Rope"})), Slot::Empty);
        assert_eq!(
            Slot::from_value(json!({"name": 7, "head": true})),
            Slot::Empty
        );
    }

    #[test]
    fn test_sub_slots_are_clamped() {
        let slot = Slot::from_value(json!({
            "name": "Torch", "slots": 1, "head": true,
            "hasSubSlots": true, "maxSubSlots": 9, "filledSubSlots": 7, "subSlotName": ""
        }));
        let sub = slot.as_head().unwrap().sub_slots.clone().unwrap();
        assert_eq!(sub.max, 3);
        assert_eq!(sub.filled, 3);
        assert_eq!(sub.unit, "unit");
    }

    #[test]
    fn test_missing_filled_defaults_to_full() {
        let slot = Slot::from_value(json!({
            "name": "Rations", "slots": 1, "head": true,
            "hasSubSlots": true, "maxSubSlots": 2, "subSlotName": "meal"
        }));
        let sub = slot.as_head().unwrap().sub_slots.clone().unwrap();
        assert_eq!((sub.filled, sub.max), (2, 2));
    }

    #[test]
    fn test_coin_slots_drop_unknown_codes() {
        let slot = Slot::from_value(json!({
            "name": "Coin Purse", "slots": 1, "head": true,
            "hasCoinSlots": true, "coinTypes": ["GP", "XX", "SP"],
            "coinAmounts": {"GP": 5, "XX": 10, "SP": "oops"}
        }));
        let purse = slot.as_head().unwrap().coins.clone().unwrap();
        assert_eq!(purse.types, vec![Denomination::Gold, Denomination::Silver]);
        assert_eq!(purse.amount(Denomination::Gold), 5);
        assert_eq!(purse.amount(Denomination::Silver), 0);
        assert_eq!(purse.limit, DEFAULT_PURSE_LIMIT);
    }

    #[test]
    fn test_loaded_coins_clamped_to_limit() {
        let slot = Slot::from_value(json!({
            "name": "Coin Purse", "slots": 1, "head": true,
            "hasCoinSlots": true, "coinTypes": ["SP", "GP"],
            "coinAmounts": {"SP": 30, "GP": 500}, "coinLimit": 100
        }));
        let purse = slot.as_head().unwrap().coins.clone().unwrap();
        assert_eq!(purse.total_coins(), 100);
        assert_eq!(purse.amount(Denomination::Gold), 100);
        assert_eq!(purse.amount(Denomination::Silver), 0);
    }

    #[test]
    fn test_encode_matches_wire_shape() {
        let head = ItemHead::new("Torch", 1).with_sub_slots(SubSlots::full(3, "use"));
        let value = serde_json::to_value(Slot::Head(head)).unwrap();
        assert_eq!(value["head"], json!(true));
        assert_eq!(value["hasSubSlots"], json!(true));
        assert_eq!(value["maxSubSlots"], json!(3));
        assert_eq!(value["subSlotName"], json!("use"));
        assert!(value.get("hasCoinSlots").is_none());

        assert_eq!(serde_json::to_value(Slot::Empty).unwrap(), json!(null));
        assert_eq!(
            serde_json::to_value(Slot::Link { head: 0 }).unwrap(),
            json!({"link": 0})
        );
    }

    #[test]
    fn test_sub_slot_consume_and_refill() {
        let mut sub = SubSlots::full(2, "use");
        assert!(sub.consume());
        assert!(sub.consume());
        assert!(!sub.consume());
        assert_eq!(sub.available(), 2);
        assert!(sub.refill());
        assert_eq!(sub.filled, 1);
    }

    #[test]
    fn test_display_name() {
        let mut head = ItemHead::new("Torch", 1).with_sub_slots(SubSlots::full(3, "uses"));
        head.sub_slots.as_mut().unwrap().filled = 2;
        assert_eq!(head.display_name(), "Torch (2/3 uses)");
    }
}
