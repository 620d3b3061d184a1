//! Character record and slot commands

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, InventoryResult};
use crate::inventory::{
    self, allocator, backpack_capacity, total_coin_value, CoinValue, Denomination, Encumbrance,
    ItemHead, MoveOutcome, SectionKind, Slot, LARGE_SACK_ITEM, SMALL_SACK_ITEM,
};
use crate::types::CharacterId;

/// Strength assumed when a record doesn't carry one
pub const DEFAULT_STRENGTH: u32 = 18;

/// Name of a character created without one
pub const UNNAMED_CHARACTER: &str = "Unnamed";

/// Name of an item created on an empty slot
pub const NEW_ITEM_NAME: &str = "New Item";

/// One character and all of its inventory sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CharacterId>,

    #[serde(default)]
    pub name: String,

    #[serde(
        rename = "str",
        default = "default_strength",
        deserialize_with = "lenient_strength"
    )]
    pub strength: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, deserialize_with = "lenient_section")]
    pub equipped: Vec<Slot>,

    #[serde(default, deserialize_with = "lenient_section")]
    pub backpack: Vec<Slot>,

    #[serde(default, deserialize_with = "lenient_section")]
    pub belt_pouch: Vec<Slot>,

    #[serde(
        default,
        deserialize_with = "lenient_optional_section",
        skip_serializing_if = "Option::is_none"
    )]
    pub small_sack: Option<Vec<Slot>>,

    #[serde(
        default,
        deserialize_with = "lenient_optional_section",
        skip_serializing_if = "Option::is_none"
    )]
    pub large_sack: Option<Vec<Slot>>,

    /// Flat pre-backpack inventory; migrated and dropped by normalization
    #[serde(
        rename = "slots",
        default,
        deserialize_with = "lenient_optional_section",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_slots: Option<Vec<Slot>>,
}

fn default_strength() -> u32 {
    DEFAULT_STRENGTH
}

fn lenient_strength<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed
        .filter(|f| f.is_finite())
        .map(|f| f.floor().clamp(0.0, f64::from(u32::MAX)) as u32)
        .unwrap_or(DEFAULT_STRENGTH))
}

/// Decode a section from an array, a sparse index-keyed object, or a lone head
pub(crate) fn section_from_value(value: serde_json::Value) -> Option<Vec<Slot>> {
    match value {
        serde_json::Value::Array(cells) => Some(cells.into_iter().map(Slot::from_value).collect()),
        serde_json::Value::Object(map) if map.contains_key("head") => {
            Some(vec![Slot::from_value(serde_json::Value::Object(map))])
        }
        serde_json::Value::Object(map) => {
            let indexed: Vec<(usize, serde_json::Value)> = map
                .into_iter()
                .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
                .collect();
            let len = indexed.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
            let mut cells = inventory::empty_section(len);
            for (i, v) in indexed {
                cells[i] = Slot::from_value(v);
            }
            Some(cells)
        }
        _ => None,
    }
}

fn lenient_section<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Slot>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(section_from_value(value).unwrap_or_default())
}

fn lenient_optional_section<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<Slot>>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(section_from_value(value))
}

impl Character {
    /// A fresh character with empty sections sized for `strength`.
    ///
    /// Run [`normalize`](crate::character::normalize) to add the belt pouch.
    pub fn new(name: &str, strength: u32) -> Self {
        let name = name.trim();
        let strength = strength.max(1);
        Self {
            id: Some(CharacterId::new()),
            name: if name.is_empty() {
                UNNAMED_CHARACTER.to_string()
            } else {
                name.to_string()
            },
            strength,
            notes: Some(String::new()),
            equipped: inventory::empty_section(inventory::EQUIPPED_SLOTS),
            backpack: inventory::empty_section(backpack_capacity(strength)),
            belt_pouch: Vec::new(),
            small_sack: None,
            large_sack: None,
            legacy_slots: None,
        }
    }

    /// Backpack length for the current strength
    pub fn capacity(&self) -> usize {
        backpack_capacity(self.strength)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Sections
    // ═══════════════════════════════════════════════════════════════════════

    pub fn section(&self, kind: SectionKind) -> Option<&[Slot]> {
        match kind {
            SectionKind::Equipped => Some(&self.equipped),
            SectionKind::Backpack => Some(&self.backpack),
            SectionKind::BeltPouch => Some(&self.belt_pouch),
            SectionKind::SmallSack => self.small_sack.as_deref(),
            SectionKind::LargeSack => self.large_sack.as_deref(),
        }
    }

    pub fn section_mut(&mut self, kind: SectionKind) -> InventoryResult<&mut Vec<Slot>> {
        match kind {
            SectionKind::Equipped => Ok(&mut self.equipped),
            SectionKind::Backpack => Ok(&mut self.backpack),
            SectionKind::BeltPouch => Ok(&mut self.belt_pouch),
            SectionKind::SmallSack => self
                .small_sack
                .as_mut()
                .ok_or(InventoryError::SectionUnavailable(kind)),
            SectionKind::LargeSack => self
                .large_sack
                .as_mut()
                .ok_or(InventoryError::SectionUnavailable(kind)),
        }
    }

    /// Whether an item head with this exact name sits in the equipped section
    pub fn has_equipped(&self, name: &str) -> bool {
        self.equipped
            .iter()
            .filter_map(Slot::as_head)
            .any(|h| h.name == name)
    }

    /// The sack section shown for this character; large wins over small
    pub fn visible_sack(&self) -> Option<SectionKind> {
        if self.has_equipped(LARGE_SACK_ITEM) && self.large_sack.is_some() {
            Some(SectionKind::LargeSack)
        } else if self.has_equipped(SMALL_SACK_ITEM) && self.small_sack.is_some() {
            Some(SectionKind::SmallSack)
        } else {
            None
        }
    }

    /// Resolve `index` (head or link) to its head index and item
    pub fn head_at(&self, kind: SectionKind, index: usize) -> InventoryResult<(usize, &ItemHead)> {
        let section = self
            .section(kind)
            .ok_or(InventoryError::SectionUnavailable(kind))?;
        let not_found = || InventoryError::SlotNotFound {
            section: kind,
            index,
        };
        let head_index = section
            .get(index)
            .and_then(|s| s.head_index(index))
            .ok_or_else(not_found)?;
        let head = section
            .get(head_index)
            .and_then(Slot::as_head)
            .ok_or_else(not_found)?;
        Ok((head_index, head))
    }

    fn head_at_mut(&mut self, kind: SectionKind, index: usize) -> InventoryResult<&mut ItemHead> {
        let (head_index, _) = self.head_at(kind, index)?;
        self.section_mut(kind)?[head_index]
            .as_head_mut()
            .ok_or(InventoryError::SlotNotFound {
                section: kind,
                index,
            })
    }

    /// Refuse to take a sack off while its section still holds items,
    /// even when another sack of the same kind stays equipped.
    pub fn check_unequip(&self, kind: SectionKind, head_index: usize) -> InventoryResult<()> {
        if kind != SectionKind::Equipped {
            return Ok(());
        }
        let Some(head) = self.equipped.get(head_index).and_then(Slot::as_head) else {
            return Ok(());
        };
        let Some(sack) = SectionKind::sack_for_item(&head.name) else {
            return Ok(());
        };
        let occupied = self
            .section(sack)
            .is_some_and(|cells| cells.iter().any(|s| !s.is_empty()));
        if occupied {
            return Err(InventoryError::SackNotEmpty(sack));
        }
        Ok(())
    }

    pub(crate) fn reject_belt_pouch(kind: SectionKind, action: &str) -> InventoryResult<()> {
        if kind == SectionKind::BeltPouch {
            return Err(InventoryError::InvalidOperation(format!(
                "the belt pouch cannot be {}",
                action
            )));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Slot Commands
    // ═══════════════════════════════════════════════════════════════════════

    /// Place a copy of `head` starting at `start`
    pub fn place_item(
        &mut self,
        kind: SectionKind,
        start: usize,
        head: ItemHead,
    ) -> InventoryResult<()> {
        Self::reject_belt_pouch(kind, "filled from outside")?;
        let name = head.name.clone();
        let needed = head.slot_count.max(1);
        let section = self.section_mut(kind)?;
        if !allocator::place(section, start, head) {
            return Err(InventoryError::InsufficientSpace {
                name,
                needed,
                section: kind,
            });
        }
        Ok(())
    }

    /// Remove the item covering `index`
    pub fn remove_item(&mut self, kind: SectionKind, index: usize) -> InventoryResult<ItemHead> {
        Self::reject_belt_pouch(kind, "removed")?;
        let (head_index, _) = self.head_at(kind, index)?;
        self.check_unequip(kind, head_index)?;
        allocator::remove(self.section_mut(kind)?, head_index).ok_or(
            InventoryError::SlotNotFound {
                section: kind,
                index,
            },
        )
    }

    /// Move the item covering `index` in `from` to start at `dest` in `to`
    pub fn move_item(
        &mut self,
        from: SectionKind,
        index: usize,
        to: SectionKind,
        dest: usize,
    ) -> InventoryResult<MoveOutcome> {
        Self::reject_belt_pouch(from, "moved")?;
        Self::reject_belt_pouch(to, "filled from outside")?;
        let (head_index, head) = self.head_at(from, index)?;
        let name = head.name.clone();
        let needed = head.slot_count.max(1);

        if from == to {
            let outcome = allocator::move_within(self.section_mut(from)?, head_index, dest);
            return space_checked(outcome, name, needed, to);
        }

        if SectionKind::sack_for_item(&name) == Some(to) {
            return Err(InventoryError::InvalidOperation(format!(
                "{} cannot be stored inside itself",
                name
            )));
        }
        if to != SectionKind::Equipped {
            self.check_unequip(from, head_index)?;
        }
        // Both sections must exist before either is detached
        if self.section(to).is_none() {
            return Err(InventoryError::SectionUnavailable(to));
        }

        let mut target = std::mem::take(self.section_mut(to)?);
        let outcome = match self.section_mut(from) {
            Ok(source) => allocator::move_between(source, head_index, &mut target, dest),
            Err(_) => MoveOutcome::Unchanged,
        };
        *self.section_mut(to)? = target;
        space_checked(outcome, name, needed, to)
    }

    /// Change an item's name, keeping its length and capabilities
    pub fn rename_item(
        &mut self,
        kind: SectionKind,
        index: usize,
        new_name: &str,
    ) -> InventoryResult<()> {
        Self::reject_belt_pouch(kind, "renamed")?;
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(InventoryError::InvalidOperation(
                "item name cannot be empty".to_string(),
            ));
        }
        let (head_index, head) = self.head_at(kind, index)?;
        if head.name != new_name {
            self.check_unequip(kind, head_index)?;
        }
        self.head_at_mut(kind, head_index)?.name = new_name.to_string();
        Ok(())
    }

    /// Copy the item covering `index` into the first free run; returns its index
    pub fn duplicate_item(&mut self, kind: SectionKind, index: usize) -> InventoryResult<usize> {
        Self::reject_belt_pouch(kind, "duplicated")?;
        let (head_index, head) = self.head_at(kind, index)?;
        let name = head.name.clone();
        allocator::duplicate(self.section_mut(kind)?, head_index)
            .ok_or(InventoryError::NoSpaceAvailable(name))
    }

    /// Use one charge; returns the charges left
    pub fn consume_charge(&mut self, kind: SectionKind, index: usize) -> InventoryResult<u8> {
        let head = self.head_at_mut(kind, index)?;
        let name = head.name.clone();
        let sub = head.sub_slots.as_mut().ok_or_else(|| {
            InventoryError::InvalidOperation(format!("{} has no charges", name))
        })?;
        if !sub.consume() {
            return Err(InventoryError::InvalidOperation(format!(
                "{} has no {} left",
                name, sub.unit
            )));
        }
        Ok(sub.filled)
    }

    /// Restore one charge; returns the charges now held
    pub fn refill_charge(&mut self, kind: SectionKind, index: usize) -> InventoryResult<u8> {
        let head = self.head_at_mut(kind, index)?;
        let name = head.name.clone();
        let sub = head.sub_slots.as_mut().ok_or_else(|| {
            InventoryError::InvalidOperation(format!("{} has no charges", name))
        })?;
        if !sub.refill() {
            return Err(InventoryError::InvalidOperation(format!(
                "{} is already full",
                name
            )));
        }
        Ok(sub.filled)
    }

    /// Set one denomination in a coin container; returns the clamped amount stored
    pub fn set_coin_amount(
        &mut self,
        kind: SectionKind,
        index: usize,
        denomination: Denomination,
        amount: u32,
    ) -> InventoryResult<u32> {
        let head = self.head_at_mut(kind, index)?;
        let name = head.name.clone();
        let purse = head.coins.as_mut().ok_or_else(|| {
            InventoryError::InvalidOperation(format!("{} does not hold coins", name))
        })?;
        Ok(purse.set_amount(denomination, amount))
    }

    /// Put a one-slot "New Item" on an empty cell
    pub fn create_blank_item(&mut self, kind: SectionKind, index: usize) -> InventoryResult<()> {
        self.place_item(kind, index, ItemHead::new(NEW_ITEM_NAME, 1))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Derived Values
    // ═══════════════════════════════════════════════════════════════════════

    /// Occupancy and speed; the large sack counts only while it is equipped
    pub fn encumbrance(&self) -> Encumbrance {
        let large_sack = if self.has_equipped(LARGE_SACK_ITEM) {
            self.large_sack.as_deref()
        } else {
            None
        };
        Encumbrance::compute(&self.equipped, &self.backpack, large_sack)
    }

    /// Value of every coin container in all five sections
    pub fn coin_value(&self) -> CoinValue {
        total_coin_value(SectionKind::ALL.iter().filter_map(|k| self.section(*k)))
    }
}

fn space_checked(
    outcome: MoveOutcome,
    name: String,
    needed: usize,
    section: SectionKind,
) -> InventoryResult<MoveOutcome> {
    match outcome {
        MoveOutcome::NoSpace => Err(InventoryError::InsufficientSpace {
            name,
            needed,
            section,
        }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::normalize;
    use crate::inventory::{CoinPurse, SubSlots};
    use serde_json::json;

    fn hero() -> Character {
        let mut c = Character::new("Brannoc", 10);
        normalize(&mut c);
        c
    }

    fn torch(filled: u8) -> ItemHead {
        let mut sub = SubSlots::full(3, "use");
        sub.filled = filled;
        ItemHead::new("Torch", 1).with_sub_slots(sub)
    }

    #[test]
    fn test_new_character_defaults() {
        let c = Character::new("  ", 0);
        assert_eq!(c.name, "Unnamed");
        assert_eq!(c.strength, 1);
        assert_eq!(c.equipped.len(), 9);
        assert_eq!(c.backpack.len(), 13);
    }

    #[test]
    fn test_deserialize_legacy_shapes() {
        let c: Character = serde_json::from_value(json!({
            "name": "Old",
            "str": "12",
            "equipped": {"0": {"name": "Rope", "slots": 1, "head": true}, "3": null},
            "backpack": "garbage",
            "beltPouch": {"name": "Coin Purse", "slots": 1, "head": true}
        }))
        .unwrap();
        assert_eq!(c.strength, 12);
        assert_eq!(c.equipped.len(), 4);
        assert_eq!(c.equipped[0].as_head().unwrap().name, "Rope");
        assert!(c.backpack.is_empty());
        assert_eq!(c.belt_pouch.len(), 1);
        assert!(c.small_sack.is_none());
    }

    #[test]
    fn test_missing_strength_defaults() {
        let c: Character = serde_json::from_value(json!({"name": "X"})).unwrap();
        assert_eq!(c.strength, DEFAULT_STRENGTH);
    }

    #[test]
    fn test_serializes_strength_as_str() {
        let value = serde_json::to_value(hero()).unwrap();
        assert_eq!(value["str"], json!(10));
        assert!(value.get("slots").is_none());
        assert!(value["beltPouch"].is_array());
    }

    #[test]
    fn test_place_reports_insufficient_space() {
        let mut c = hero();
        c.place_item(SectionKind::Backpack, 0, ItemHead::new("Rope", 1))
            .unwrap();
        let err = c
            .place_item(SectionKind::Backpack, 0, ItemHead::new("Pole", 2))
            .unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientSpace { needed: 2, .. }));
    }

    #[test]
    fn test_move_between_sections_and_failure_restores() {
        let mut c = hero();
        c.place_item(SectionKind::Equipped, 0, ItemHead::new("Shield", 2))
            .unwrap();
        let outcome = c
            .move_item(SectionKind::Equipped, 1, SectionKind::Backpack, 3)
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Moved);
        assert!(c.equipped[0].is_empty());
        assert_eq!(c.backpack[3].as_head().unwrap().name, "Shield");

        let before = c.backpack.clone();
        c.place_item(SectionKind::Equipped, 8, ItemHead::new("Lamp", 1))
            .unwrap();
        let err = c
            .move_item(SectionKind::Backpack, 3, SectionKind::Equipped, 8)
            .unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientSpace { .. }));
        assert_eq!(c.backpack, before);
    }

    #[test]
    fn test_merge_scenario() {
        let mut c = hero();
        c.place_item(SectionKind::Backpack, 0, torch(2)).unwrap();
        c.place_item(SectionKind::Backpack, 1, torch(1)).unwrap();
        let outcome = c
            .move_item(SectionKind::Backpack, 0, SectionKind::Backpack, 1)
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Merged);
        assert!(c.backpack[0].is_empty());
        let sub = c.backpack[1].as_head().unwrap().sub_slots.clone().unwrap();
        assert_eq!((sub.filled, sub.max), (3, 3));
    }

    #[test]
    fn test_sack_guard_blocks_remove_move_and_rename() {
        let mut c = hero();
        c.place_item(SectionKind::Equipped, 0, ItemHead::new(LARGE_SACK_ITEM, 1))
            .unwrap();
        normalize(&mut c);
        c.place_item(SectionKind::LargeSack, 0, ItemHead::new("Gem", 1))
            .unwrap();

        let err = c.remove_item(SectionKind::Equipped, 0).unwrap_err();
        assert!(matches!(err, InventoryError::SackNotEmpty(SectionKind::LargeSack)));
        let err = c
            .move_item(SectionKind::Equipped, 0, SectionKind::Backpack, 0)
            .unwrap_err();
        assert!(matches!(err, InventoryError::SackNotEmpty(_)));
        let err = c.rename_item(SectionKind::Equipped, 0, "Bag").unwrap_err();
        assert!(matches!(err, InventoryError::SackNotEmpty(_)));

        // Moving within equipped keeps the sack on
        c.move_item(SectionKind::Equipped, 0, SectionKind::Equipped, 4)
            .unwrap();

        c.remove_item(SectionKind::LargeSack, 0).unwrap();
        c.remove_item(SectionKind::Equipped, 4).unwrap();
    }

    #[test]
    fn test_second_sack_keeps_guard() {
        let mut c = hero();
        c.place_item(SectionKind::Equipped, 0, ItemHead::new(SMALL_SACK_ITEM, 1))
            .unwrap();
        c.place_item(SectionKind::Equipped, 1, ItemHead::new(SMALL_SACK_ITEM, 1))
            .unwrap();
        normalize(&mut c);
        c.place_item(SectionKind::SmallSack, 0, ItemHead::new("Chalk", 1))
            .unwrap();
        assert!(matches!(
            c.remove_item(SectionKind::Equipped, 0),
            Err(InventoryError::SackNotEmpty(SectionKind::SmallSack))
        ));
        assert!(matches!(
            c.remove_item(SectionKind::Equipped, 1),
            Err(InventoryError::SackNotEmpty(SectionKind::SmallSack))
        ));
    }

    #[test]
    fn test_sack_cannot_go_into_itself() {
        let mut c = hero();
        c.place_item(SectionKind::Equipped, 0, ItemHead::new(SMALL_SACK_ITEM, 1))
            .unwrap();
        normalize(&mut c);
        let err = c
            .move_item(SectionKind::Equipped, 0, SectionKind::SmallSack, 0)
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidOperation(_)));
    }

    #[test]
    fn test_belt_pouch_is_fixed() {
        let mut c = hero();
        assert!(matches!(
            c.remove_item(SectionKind::BeltPouch, 0),
            Err(InventoryError::InvalidOperation(_))
        ));
        assert!(matches!(
            c.move_item(SectionKind::BeltPouch, 0, SectionKind::Backpack, 0),
            Err(InventoryError::InvalidOperation(_))
        ));
        let stored = c
            .set_coin_amount(SectionKind::BeltPouch, 0, Denomination::Gold, 80)
            .unwrap();
        assert_eq!(stored, 50);
    }

    #[test]
    fn test_charges() {
        let mut c = hero();
        c.place_item(SectionKind::Backpack, 0, torch(1)).unwrap();
        assert_eq!(c.refill_charge(SectionKind::Backpack, 0).unwrap(), 2);
        assert_eq!(c.consume_charge(SectionKind::Backpack, 0).unwrap(), 1);
        assert_eq!(c.consume_charge(SectionKind::Backpack, 0).unwrap(), 0);
        assert!(c.consume_charge(SectionKind::Backpack, 0).is_err());

        c.place_item(SectionKind::Backpack, 1, ItemHead::new("Rope", 1))
            .unwrap();
        assert!(c.consume_charge(SectionKind::Backpack, 1).is_err());
    }

    #[test]
    fn test_rename_keeps_run_and_capabilities() {
        let mut c = hero();
        c.place_item(SectionKind::Backpack, 2, torch(2)).unwrap();
        c.rename_item(SectionKind::Backpack, 2, "  Lantern ").unwrap();
        let head = c.backpack[2].as_head().unwrap();
        assert_eq!(head.name, "Lantern");
        assert_eq!(head.sub_slots.as_ref().unwrap().filled, 2);
        assert!(c.rename_item(SectionKind::Backpack, 2, "   ").is_err());
    }

    #[test]
    fn test_duplicate_and_blank_items() {
        let mut c = hero();
        c.create_blank_item(SectionKind::Backpack, 0).unwrap();
        assert_eq!(c.backpack[0].as_head().unwrap().name, NEW_ITEM_NAME);
        assert_eq!(c.duplicate_item(SectionKind::Backpack, 0).unwrap(), 1);

        let mut full = Character::new("Packed", 1);
        normalize(&mut full);
        for i in 0..full.backpack.len() {
            full.create_blank_item(SectionKind::Backpack, i).unwrap();
        }
        assert!(matches!(
            full.duplicate_item(SectionKind::Backpack, 0),
            Err(InventoryError::NoSpaceAvailable(_))
        ));
    }

    #[test]
    fn test_missing_sack_section() {
        let mut c = hero();
        assert!(matches!(
            c.place_item(SectionKind::SmallSack, 0, ItemHead::new("Chalk", 1)),
            Err(InventoryError::SectionUnavailable(SectionKind::SmallSack))
        ));
    }

    #[test]
    fn test_large_sack_scenario() {
        let mut c = hero();
        assert_eq!(c.backpack.len(), 16);
        c.place_item(SectionKind::Equipped, 0, ItemHead::new(LARGE_SACK_ITEM, 1))
            .unwrap();
        normalize(&mut c);
        for i in 0..16 {
            c.place_item(SectionKind::Backpack, i, ItemHead::new("Stone", 1))
                .unwrap();
            c.place_item(SectionKind::LargeSack, i, ItemHead::new("Stone", 1))
                .unwrap();
        }
        let enc = c.encumbrance();
        assert_eq!(enc.total_slots, 32);
        assert_eq!(enc.total_used, 32);
        assert_eq!(enc.empty, 0);
        assert_eq!(enc.speed_feet, 30);
        assert_eq!(c.visible_sack(), Some(SectionKind::LargeSack));
    }

    #[test]
    fn test_coin_value_scenario() {
        let mut c = hero();
        c.set_coin_amount(SectionKind::BeltPouch, 0, Denomination::Platinum, 1)
            .unwrap();
        c.set_coin_amount(SectionKind::BeltPouch, 0, Denomination::Gold, 3)
            .unwrap();
        assert_eq!(c.coin_value().to_string(), "8");

        let mut stash = CoinPurse::new(vec![Denomination::Electrum], 100);
        stash.set_amount(Denomination::Electrum, 1);
        c.place_item(
            SectionKind::Equipped,
            0,
            ItemHead::new("Money Belt", 1).with_coins(stash),
        )
        .unwrap();
        assert_eq!(c.coin_value().to_string(), "8.5");
    }
}
