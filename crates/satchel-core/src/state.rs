//! Application state owned by the sync engine
//!
//! `AppState` is what the local cache stores under the state key: the
//! catalog, the character roster, per-session UI prefs and the last remote
//! timestamp seen. Roster operations keep selection and hidden markers
//! pointing at the same characters when indices shift.

use std::collections::BTreeSet;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use crate::catalog::ItemCatalog;
use crate::character::{normalize, Character, NormalizeReport};
use crate::error::{InventoryError, InventoryResult};
use crate::inventory::{allocator, MoveOutcome, SectionKind};
use crate::types::Timestamp;

/// Per-session view preferences; never shared between sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiPrefs {
    #[serde(default)]
    pub left_collapsed: bool,
    #[serde(default)]
    pub right_collapsed: bool,
    #[serde(default)]
    pub hidden_chars: BTreeSet<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_char: Option<usize>,
}

impl UiPrefs {
    /// Rewrite indices after the roster was permuted; `order[new] = old`
    fn remap(&mut self, order: &[usize]) {
        let new_index = |old: usize| order.iter().position(|o| *o == old);
        self.selected_char = self.selected_char.and_then(new_index);
        self.hidden_chars = self.hidden_chars.iter().filter_map(|i| new_index(*i)).collect();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub items: ItemCatalog,
    #[serde(default, deserialize_with = "lenient_chars")]
    pub chars: Vec<Character>,
    #[serde(default)]
    pub ui: UiPrefs,
    #[serde(default)]
    pub last_updated: Timestamp,
}

/// Decode a roster from an array or an index-keyed object, skipping holes
pub(crate) fn chars_from_value(value: serde_json::Value) -> Vec<Character> {
    let cells: Vec<serde_json::Value> = match value {
        serde_json::Value::Array(cells) => cells,
        serde_json::Value::Object(map) => {
            let mut indexed: Vec<(usize, serde_json::Value)> = map
                .into_iter()
                .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
                .collect();
            indexed.sort_by_key(|(i, _)| *i);
            indexed.into_iter().map(|(_, v)| v).collect()
        }
        _ => Vec::new(),
    };
    cells
        .into_iter()
        .filter(serde_json::Value::is_object)
        .filter_map(|v| match serde_json::from_value::<Character>(v) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable character record");
                None
            }
        })
        .collect()
}

fn lenient_chars<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Character>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(chars_from_value(value))
}

impl AppState {
    /// Decode cached state, tolerating older shapes; unreadable input yields `None`
    pub fn from_cache(raw: &str) -> Option<Self> {
        match serde_json::from_str::<AppState>(raw) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable cached state");
                None
            }
        }
    }

    /// Normalize every character; returns the reports of those that changed
    pub fn normalize_all(&mut self) -> Vec<(usize, NormalizeReport)> {
        self.chars
            .iter_mut()
            .enumerate()
            .map(|(i, c)| (i, normalize(c)))
            .filter(|(_, report)| !report.is_clean())
            .collect()
    }

    /// Swap in a whole roster (remote apply, import, restore) and normalize it
    ///
    /// Selection and hidden markers that no longer point at a character are dropped.
    pub fn replace_chars(&mut self, chars: Vec<Character>) -> Vec<(usize, NormalizeReport)> {
        self.chars = chars;
        let len = self.chars.len();
        self.ui.selected_char = self.ui.selected_char.filter(|i| *i < len);
        self.ui.hidden_chars.retain(|i| *i < len);
        self.normalize_all()
    }

    pub fn character(&self, index: usize) -> InventoryResult<&Character> {
        self.chars
            .get(index)
            .ok_or(InventoryError::CharacterNotFound(index))
    }

    pub fn character_mut(&mut self, index: usize) -> InventoryResult<&mut Character> {
        self.chars
            .get_mut(index)
            .ok_or(InventoryError::CharacterNotFound(index))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Roster
    // ═══════════════════════════════════════════════════════════════════════

    /// Append and select a new character; returns its index
    pub fn add_character(&mut self, name: &str, strength: u32) -> usize {
        let mut character = Character::new(name, strength);
        normalize(&mut character);
        self.chars.push(character);
        let index = self.chars.len() - 1;
        self.ui.selected_char = Some(index);
        index
    }

    pub fn delete_character(&mut self, index: usize) -> InventoryResult<Character> {
        if index >= self.chars.len() {
            return Err(InventoryError::CharacterNotFound(index));
        }
        let order: Vec<usize> = (0..self.chars.len()).filter(|i| *i != index).collect();
        let removed = self.chars.remove(index);
        self.ui.remap(&order);
        Ok(removed)
    }

    /// Move the character at `from` so it ends up at `to`
    pub fn reorder_character(&mut self, from: usize, to: usize) -> InventoryResult<()> {
        let len = self.chars.len();
        if from >= len {
            return Err(InventoryError::CharacterNotFound(from));
        }
        if to >= len {
            return Err(InventoryError::CharacterNotFound(to));
        }
        if from == to {
            return Ok(());
        }
        let mut order: Vec<usize> = (0..len).collect();
        let moved = order.remove(from);
        order.insert(to, moved);

        let character = self.chars.remove(from);
        self.chars.insert(to, character);
        self.ui.remap(&order);
        Ok(())
    }

    /// Flip the hidden marker; returns whether the character is now hidden
    pub fn toggle_visibility(&mut self, index: usize) -> InventoryResult<bool> {
        self.character(index)?;
        if self.ui.hidden_chars.remove(&index) {
            Ok(false)
        } else {
            self.ui.hidden_chars.insert(index);
            Ok(true)
        }
    }

    pub fn select_character(&mut self, index: Option<usize>) -> InventoryResult<()> {
        if let Some(i) = index {
            self.character(i)?;
        }
        self.ui.selected_char = index;
        Ok(())
    }

    /// Drag an item from one character to another (or within one)
    pub fn move_between_characters(
        &mut self,
        from_char: usize,
        from: SectionKind,
        index: usize,
        to_char: usize,
        to: SectionKind,
        dest: usize,
    ) -> InventoryResult<MoveOutcome> {
        if from_char == to_char {
            return self.character_mut(from_char)?.move_item(from, index, to, dest);
        }
        self.character(from_char)?;
        self.character(to_char)?;
        Character::reject_belt_pouch(from, "moved")?;
        Character::reject_belt_pouch(to, "filled from outside")?;

        let (source, target) = if from_char < to_char {
            let (left, right) = self.chars.split_at_mut(to_char);
            (
                left.get_mut(from_char)
                    .ok_or(InventoryError::CharacterNotFound(from_char))?,
                &mut right[0],
            )
        } else {
            let (left, right) = self.chars.split_at_mut(from_char);
            (
                right
                    .get_mut(0)
                    .ok_or(InventoryError::CharacterNotFound(from_char))?,
                &mut left[to_char],
            )
        };

        let (head_index, head) = source.head_at(from, index)?;
        let name = head.name.clone();
        let needed = head.slot_count.max(1);
        source.check_unequip(from, head_index)?;

        let outcome = allocator::move_between(
            source.section_mut(from)?,
            head_index,
            target.section_mut(to)?,
            dest,
        );
        if outcome == MoveOutcome::NoSpace {
            return Err(InventoryError::InsufficientSpace {
                name,
                needed,
                section: to,
            });
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::ItemHead;
    use serde_json::json;

    fn roster(names: &[&str]) -> AppState {
        let mut state = AppState::default();
        for name in names {
            state.add_character(name, 18);
        }
        state
    }

    #[test]
    fn test_add_character_selects_it() {
        let mut state = AppState::default();
        assert_eq!(state.add_character("", 18), 0);
        assert_eq!(state.chars[0].name, "Unnamed");
        assert_eq!(state.add_character("Bo", 0), 1);
        assert_eq!(state.chars[1].strength, 1);
        assert_eq!(state.ui.selected_char, Some(1));
        assert_eq!(state.chars[1].belt_pouch.len(), 1);
    }

    #[test]
    fn test_delete_fixes_selection_and_hidden() {
        let mut state = roster(&["A", "B", "C", "D"]);
        state.ui.selected_char = Some(3);
        state.ui.hidden_chars = [1, 2].into_iter().collect();

        let removed = state.delete_character(1).unwrap();
        assert_eq!(removed.name, "B");
        assert_eq!(state.ui.selected_char, Some(2));
        assert_eq!(state.ui.hidden_chars, [1].into_iter().collect());

        state.delete_character(2).unwrap();
        assert_eq!(state.ui.selected_char, None);
        assert!(state.delete_character(9).is_err());
    }

    #[test]
    fn test_reorder_selection_follows_character() {
        let mut state = roster(&["A", "B", "C"]);
        state.ui.selected_char = Some(0);
        state.ui.hidden_chars = [2].into_iter().collect();
        state.reorder_character(0, 2).unwrap();
        let names: Vec<_> = state.chars.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["B", "C", "A"]);
        assert_eq!(state.ui.selected_char, Some(2));
        assert_eq!(state.ui.hidden_chars, [1].into_iter().collect());
    }

    #[test]
    fn test_toggle_visibility() {
        let mut state = roster(&["A"]);
        assert!(state.toggle_visibility(0).unwrap());
        assert!(!state.toggle_visibility(0).unwrap());
        assert!(state.toggle_visibility(5).is_err());
    }

    #[test]
    fn test_move_between_characters() {
        let mut state = roster(&["A", "B"]);
        state.chars[1]
            .place_item(SectionKind::Backpack, 0, ItemHead::new("Rope", 2))
            .unwrap();
        let outcome = state
            .move_between_characters(1, SectionKind::Backpack, 1, 0, SectionKind::Equipped, 4)
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Moved);
        assert!(state.chars[1].backpack[0].is_empty());
        assert_eq!(state.chars[0].equipped[4].as_head().unwrap().name, "Rope");

        let err = state
            .move_between_characters(0, SectionKind::Equipped, 4, 1, SectionKind::Backpack, 18)
            .unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientSpace { .. }));
        assert_eq!(state.chars[0].equipped[4].as_head().unwrap().name, "Rope");
    }

    #[test]
    fn test_replace_chars_drops_dangling_ui() {
        let mut state = roster(&["A", "B", "C"]);
        state.ui.selected_char = Some(2);
        state.ui.hidden_chars = [0, 2].into_iter().collect();

        let reports = state.replace_chars(vec![Character::new("X", 10)]);
        assert_eq!(reports.len(), 1);
        assert_eq!(state.chars[0].belt_pouch.len(), 1);
        assert_eq!(state.ui.selected_char, None);
        assert_eq!(state.ui.hidden_chars, [0].into_iter().collect());
    }

    #[test]
    fn test_cache_with_legacy_item_array() {
        let raw = json!({
            "items": [{"name": "Rope", "slots": 1}],
            "chars": [{"name": "A", "str": 9}, null],
            "ui": {"hiddenChars": [0]},
            "lastUpdated": 1700
        })
        .to_string();
        let state = AppState::from_cache(&raw).unwrap();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.chars.len(), 1);
        assert_eq!(state.last_updated, 1700);
        assert!(state.ui.hidden_chars.contains(&0));
        assert!(AppState::from_cache("not json").is_none());
    }
}
