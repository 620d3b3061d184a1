//! Commands invoked by the render layer
//!
//! Each command leaves read-only mode, mutates local state, normalizes the
//! characters it touched and saves only the fields that changed. Model
//! refusals return before anything is mutated or saved.

use crate::catalog::{CatalogEntry, ItemDraft};
use crate::character::{normalize, Character, CharacterField, UNNAMED_CHARACTER};
use crate::error::{InventoryError, InventoryResult};
use crate::inventory::{Denomination, ItemHead, MoveOutcome, SectionKind};
use crate::sync::ResourcePath;
use crate::transfer;
use crate::types::ItemId;

use super::{SaveOutcome, SyncEngine};

impl SyncEngine {
    /// Normalize touched characters, then save touched and repaired fields
    async fn commit_fields(&mut self, touched: &[(usize, CharacterField)]) -> SaveOutcome {
        let mut paths: Vec<ResourcePath> = touched
            .iter()
            .map(|(i, field)| ResourcePath::CharacterField(*i, *field))
            .collect();

        let mut indices: Vec<usize> = touched.iter().map(|(i, _)| *i).collect();
        indices.sort_unstable();
        indices.dedup();
        for index in indices {
            if let Ok(character) = self.state.character_mut(index) {
                let report = normalize(character);
                paths.extend(
                    report
                        .changed
                        .into_iter()
                        .map(|field| ResourcePath::CharacterField(index, field)),
                );
            }
        }
        self.commit(paths).await
    }

    fn ui_path(&self) -> ResourcePath {
        ResourcePath::Ui(self.session.clone())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Roster
    // ═══════════════════════════════════════════════════════════════════════

    /// Add and select a character; returns its index
    pub async fn add_character(&mut self, name: &str, strength: u32) -> InventoryResult<usize> {
        self.enable_writes();
        let index = self.state.add_character(name, strength);
        tracing::info!(index, name = %self.state.chars[index].name, "Added character");
        let ui = self.ui_path();
        self.commit(vec![ResourcePath::Character(index), ui]).await;
        Ok(index)
    }

    /// Remove a character; later characters move up one position
    pub async fn delete_character(&mut self, index: usize) -> InventoryResult<Character> {
        self.enable_writes();
        let removed = self.state.delete_character(index)?;
        tracing::info!(index, name = %removed.name, "Deleted character");
        let ui = self.ui_path();
        self.commit(vec![ResourcePath::Inventory, ui]).await;
        Ok(removed)
    }

    pub async fn reorder_character(&mut self, from: usize, to: usize) -> InventoryResult<()> {
        self.enable_writes();
        self.state.reorder_character(from, to)?;
        let ui = self.ui_path();
        self.commit(vec![ResourcePath::Inventory, ui]).await;
        Ok(())
    }

    pub async fn rename_character(&mut self, index: usize, name: &str) -> InventoryResult<()> {
        self.enable_writes();
        let character = self.state.character_mut(index)?;
        let name = name.trim();
        character.name = if name.is_empty() {
            UNNAMED_CHARACTER.to_string()
        } else {
            name.to_string()
        };
        self.commit_fields(&[(index, CharacterField::Name)]).await;
        Ok(())
    }

    /// Change Strength; the backpack (and a large sack) follow the new capacity
    ///
    /// Returns the new backpack length. Shrinking drops items past the end.
    pub async fn set_strength(&mut self, index: usize, strength: u32) -> InventoryResult<usize> {
        self.enable_writes();
        let character = self.state.character_mut(index)?;
        character.strength = strength.max(1);
        let capacity = character.capacity();
        self.commit_fields(&[(index, CharacterField::Strength)])
            .await;
        Ok(capacity)
    }

    pub async fn set_notes(&mut self, index: usize, notes: &str) -> InventoryResult<()> {
        self.enable_writes();
        self.state.character_mut(index)?.notes = Some(notes.to_string());
        self.commit_fields(&[(index, CharacterField::Notes)]).await;
        Ok(())
    }

    /// Hide or show a character in this session; returns whether it is now hidden
    pub async fn toggle_visibility(&mut self, index: usize) -> InventoryResult<bool> {
        self.enable_writes();
        let hidden = self.state.toggle_visibility(index)?;
        let ui = self.ui_path();
        self.commit(vec![ui]).await;
        Ok(hidden)
    }

    pub async fn select_character(&mut self, index: Option<usize>) -> InventoryResult<()> {
        self.enable_writes();
        self.state.select_character(index)?;
        let ui = self.ui_path();
        self.commit(vec![ui]).await;
        Ok(())
    }

    pub async fn set_panels_collapsed(&mut self, left: bool, right: bool) {
        self.enable_writes();
        self.state.ui.left_collapsed = left;
        self.state.ui.right_collapsed = right;
        let ui = self.ui_path();
        self.commit(vec![ui]).await;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Slot Commands
    // ═══════════════════════════════════════════════════════════════════════

    /// Place a copy of `head` starting at `start`
    pub async fn place_item(
        &mut self,
        char_index: usize,
        kind: SectionKind,
        start: usize,
        head: ItemHead,
    ) -> InventoryResult<()> {
        self.enable_writes();
        self.state
            .character_mut(char_index)?
            .place_item(kind, start, head)?;
        self.commit_fields(&[(char_index, CharacterField::Section(kind))])
            .await;
        Ok(())
    }

    /// Place a catalog entry, looked up by id or name
    pub async fn place_from_catalog(
        &mut self,
        char_index: usize,
        kind: SectionKind,
        start: usize,
        key: &str,
    ) -> InventoryResult<ItemId> {
        let (id, head) = self
            .state
            .items
            .resolve(key)
            .map(|(id, entry)| (id.clone(), entry.to_head()))
            .ok_or_else(|| InventoryError::ItemNotFound(key.to_string()))?;
        self.place_item(char_index, kind, start, head).await?;
        Ok(id)
    }

    pub async fn remove_item(
        &mut self,
        char_index: usize,
        kind: SectionKind,
        index: usize,
    ) -> InventoryResult<ItemHead> {
        self.enable_writes();
        let removed = self
            .state
            .character_mut(char_index)?
            .remove_item(kind, index)?;
        self.commit_fields(&[(char_index, CharacterField::Section(kind))])
            .await;
        Ok(removed)
    }

    /// Move an item, possibly to another character's section
    pub async fn move_item(
        &mut self,
        from_char: usize,
        from: SectionKind,
        index: usize,
        to_char: usize,
        to: SectionKind,
        dest: usize,
    ) -> InventoryResult<MoveOutcome> {
        self.enable_writes();
        let outcome = self
            .state
            .move_between_characters(from_char, from, index, to_char, to, dest)?;
        if outcome.changed() {
            self.commit_fields(&[
                (from_char, CharacterField::Section(from)),
                (to_char, CharacterField::Section(to)),
            ])
            .await;
        }
        Ok(outcome)
    }

    pub async fn rename_item(
        &mut self,
        char_index: usize,
        kind: SectionKind,
        index: usize,
        name: &str,
    ) -> InventoryResult<()> {
        self.enable_writes();
        self.state
            .character_mut(char_index)?
            .rename_item(kind, index, name)?;
        self.commit_fields(&[(char_index, CharacterField::Section(kind))])
            .await;
        Ok(())
    }

    /// Copy an item into the first free run; returns where the copy landed
    pub async fn duplicate_item(
        &mut self,
        char_index: usize,
        kind: SectionKind,
        index: usize,
    ) -> InventoryResult<usize> {
        self.enable_writes();
        let placed = self
            .state
            .character_mut(char_index)?
            .duplicate_item(kind, index)?;
        self.commit_fields(&[(char_index, CharacterField::Section(kind))])
            .await;
        Ok(placed)
    }

    /// Use one charge; returns the charges left (0 means the caller may offer removal)
    pub async fn consume_charge(
        &mut self,
        char_index: usize,
        kind: SectionKind,
        index: usize,
    ) -> InventoryResult<u8> {
        self.enable_writes();
        let left = self
            .state
            .character_mut(char_index)?
            .consume_charge(kind, index)?;
        self.commit_fields(&[(char_index, CharacterField::Section(kind))])
            .await;
        Ok(left)
    }

    pub async fn refill_charge(
        &mut self,
        char_index: usize,
        kind: SectionKind,
        index: usize,
    ) -> InventoryResult<u8> {
        self.enable_writes();
        let filled = self
            .state
            .character_mut(char_index)?
            .refill_charge(kind, index)?;
        self.commit_fields(&[(char_index, CharacterField::Section(kind))])
            .await;
        Ok(filled)
    }

    /// Set one denomination of a coin container; returns the clamped amount stored
    pub async fn set_coin_amount(
        &mut self,
        char_index: usize,
        kind: SectionKind,
        index: usize,
        denomination: Denomination,
        amount: u32,
    ) -> InventoryResult<u32> {
        self.enable_writes();
        let stored = self
            .state
            .character_mut(char_index)?
            .set_coin_amount(kind, index, denomination, amount)?;
        if stored != amount {
            tracing::debug!(requested = amount, stored, "Coin amount clamped to limit");
        }
        self.commit_fields(&[(char_index, CharacterField::Section(kind))])
            .await;
        Ok(stored)
    }

    pub async fn create_blank_item(
        &mut self,
        char_index: usize,
        kind: SectionKind,
        index: usize,
    ) -> InventoryResult<()> {
        self.enable_writes();
        self.state
            .character_mut(char_index)?
            .create_blank_item(kind, index)?;
        self.commit_fields(&[(char_index, CharacterField::Section(kind))])
            .await;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Catalog
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn create_item(&mut self, draft: ItemDraft) -> InventoryResult<ItemId> {
        self.enable_writes();
        let id = self.state.items.create(draft)?;
        tracing::info!(%id, "Created catalog item");
        self.commit(vec![ResourcePath::CatalogItem(id.clone())])
            .await;
        Ok(id)
    }

    /// Replace a catalog entry; items already placed keep their copies
    pub async fn edit_item(&mut self, id: &ItemId, draft: ItemDraft) -> InventoryResult<()> {
        self.enable_writes();
        self.state.items.edit(id, draft)?;
        self.commit(vec![ResourcePath::CatalogItem(id.clone())])
            .await;
        Ok(())
    }

    pub async fn delete_item(&mut self, id: &ItemId) -> InventoryResult<CatalogEntry> {
        self.enable_writes();
        let removed = self.state.items.delete(id)?;
        tracing::info!(%id, name = %removed.name, "Deleted catalog item");
        self.commit(vec![ResourcePath::CatalogItem(id.clone())])
            .await;
        Ok(removed)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Import / Export
    // ═══════════════════════════════════════════════════════════════════════

    pub fn export_json(&self) -> InventoryResult<String> {
        transfer::export_json(&self.state)
    }

    /// Replace the roster and catalog from an export file
    ///
    /// Malformed input is rejected with `MalformedImport` and nothing changes.
    pub async fn import_json(&mut self, text: &str) -> InventoryResult<SaveOutcome> {
        let data = transfer::parse_import(text)?;
        self.enable_writes();
        tracing::info!(
            chars = data.chars.len(),
            items = data.items.len(),
            "Importing characters and catalog"
        );
        self.state.items = data.items;
        self.state.replace_chars(data.chars);
        Ok(self
            .commit(vec![ResourcePath::Inventory, ResourcePath::Catalog])
            .await)
    }
}
