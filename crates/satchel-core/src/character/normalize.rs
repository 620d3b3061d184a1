//! Canonical form for characters
//!
//! Normalization is idempotent: running it on its own output reports no
//! changed fields. Callers persist only the fields listed in the report.

use crate::inventory::{
    self, coins, CoinPurse, Denomination, SectionKind, Slot, BELT_POUCH_NAME, DEFAULT_PURSE_LIMIT,
    EQUIPPED_SLOTS, LARGE_SACK_ITEM, SMALL_SACK_ITEM, SMALL_SACK_SLOTS,
};
use crate::types::CharacterId;

use super::model::Character;

/// A persisted top-level field of a character record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterField {
    Id,
    Name,
    Strength,
    Notes,
    Section(SectionKind),
    LegacySlots,
}

impl CharacterField {
    /// Key of the field inside `inventory/chars/<index>`
    pub fn key(self) -> &'static str {
        match self {
            CharacterField::Id => "id",
            CharacterField::Name => "name",
            CharacterField::Strength => "str",
            CharacterField::Notes => "notes",
            CharacterField::Section(kind) => kind.key(),
            CharacterField::LegacySlots => "slots",
        }
    }

    /// Current persisted value of this field; `null` for absent optional fields
    pub fn value_of(self, character: &Character) -> serde_json::Value {
        let encoded = match self {
            CharacterField::Id => serde_json::to_value(&character.id),
            CharacterField::Name => serde_json::to_value(&character.name),
            CharacterField::Strength => serde_json::to_value(character.strength),
            CharacterField::Notes => serde_json::to_value(&character.notes),
            CharacterField::Section(kind) => serde_json::to_value(character.section(kind)),
            CharacterField::LegacySlots => serde_json::to_value(&character.legacy_slots),
        };
        encoded.unwrap_or(serde_json::Value::Null)
    }
}

/// Fields rewritten by one normalization pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub changed: Vec<CharacterField>,
}

impl NormalizeReport {
    pub fn is_clean(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Bring `character` into canonical form.
pub fn normalize(character: &mut Character) -> NormalizeReport {
    let before = character.clone();

    if character.id.is_none() {
        character.id = Some(CharacterId::new());
    }
    character.strength = character.strength.max(1);
    if character.notes.is_none() {
        character.notes = Some(String::new());
    }

    resize(&mut character.equipped, EQUIPPED_SLOTS);

    let capacity = character.capacity();
    if let Some(legacy) = character.legacy_slots.take() {
        if character.backpack.iter().all(Slot::is_empty) {
            character.backpack = legacy;
        } else {
            tracing::warn!(
                name = %character.name,
                "Dropping legacy slots; backpack already holds items"
            );
        }
    }
    resize(&mut character.backpack, capacity);

    canonical_belt_pouch(&mut character.belt_pouch);

    let has_small = character.has_equipped(SMALL_SACK_ITEM);
    let has_large = character.has_equipped(LARGE_SACK_ITEM);
    sync_sack(
        &mut character.small_sack,
        has_small,
        SMALL_SACK_SLOTS,
        &character.name,
    );
    sync_sack(&mut character.large_sack, has_large, capacity, &character.name);

    for kind in SectionKind::ALL {
        if let Ok(section) = character.section_mut(kind) {
            clear_orphan_links(section);
            if kind != SectionKind::BeltPouch {
                upgrade_legacy_coins(section);
            }
        }
    }

    let changed: Vec<CharacterField> = [
        CharacterField::Id,
        CharacterField::Strength,
        CharacterField::Notes,
    ]
    .into_iter()
    .chain(SectionKind::ALL.map(CharacterField::Section))
    .chain([CharacterField::LegacySlots])
    .filter(|field| field_differs(*field, &before, character))
    .collect();

    if !changed.is_empty() {
        tracing::debug!(
            name = %character.name,
            fields = ?changed.iter().map(|f| f.key()).collect::<Vec<_>>(),
            "Normalized character"
        );
    }
    NormalizeReport { changed }
}

fn field_differs(field: CharacterField, before: &Character, after: &Character) -> bool {
    match field {
        CharacterField::Id => before.id != after.id,
        CharacterField::Name => before.name != after.name,
        CharacterField::Strength => before.strength != after.strength,
        CharacterField::Notes => before.notes != after.notes,
        CharacterField::Section(kind) => before.section(kind) != after.section(kind),
        CharacterField::LegacySlots => before.legacy_slots != after.legacy_slots,
    }
}

/// Truncate or pad with empty cells, keeping content left-aligned
fn resize(section: &mut Vec<Slot>, len: usize) {
    section.resize(len, Slot::Empty);
}

/// Exactly one head: a coin container over every denomination, limit 50
fn canonical_belt_pouch(pouch: &mut Vec<Slot>) {
    let head = pouch.first().and_then(Slot::as_head).cloned();
    let mut head = match head {
        Some(h) => h,
        None => inventory::ItemHead::new(BELT_POUCH_NAME, 1),
    };

    head.slot_count = 1;
    head.sub_slots = None;
    if head.name.trim().is_empty() {
        head.name = BELT_POUCH_NAME.to_string();
    }
    let mut purse = CoinPurse::belt_pouch();
    if let Some(existing) = &head.coins {
        for denomination in Denomination::ALL {
            purse.set_amount(denomination, existing.amount(denomination));
        }
    }
    head.coins = Some(purse);

    *pouch = vec![Slot::Head(head)];
}

/// Open, resize or drop a sack section to match what is equipped
fn sync_sack(sack: &mut Option<Vec<Slot>>, equipped: bool, len: usize, owner: &str) {
    if equipped {
        let section = sack.get_or_insert_with(Vec::new);
        resize(section, len);
        return;
    }
    match sack {
        Some(section) if section.iter().all(Slot::is_empty) => *sack = None,
        Some(_) => {
            tracing::warn!(name = %owner, "Keeping sack contents although no sack is equipped");
        }
        None => {}
    }
}

/// Clear links whose head is gone or whose run no longer covers them
fn clear_orphan_links(section: &mut [Slot]) {
    for i in 0..section.len() {
        let Slot::Link { head } = section[i] else {
            continue;
        };
        let covered = head < i
            && section[head]
                .as_head()
                .is_some_and(|h| head.saturating_add(h.slot_count) > i)
            && section[head + 1..i]
                .iter()
                .all(|s| *s == Slot::Link { head });
        if !covered {
            section[i] = Slot::Empty;
        }
    }
}

/// Items named like coin containers gain coin slots, seeded from names like "32gp"
fn upgrade_legacy_coins(section: &mut [Slot]) {
    for head in section.iter_mut().filter_map(Slot::as_head_mut) {
        if head.coins.is_some() || !head.name.to_lowercase().contains("coin") {
            continue;
        }
        let mut purse = CoinPurse::new(Denomination::ALL.to_vec(), DEFAULT_PURSE_LIMIT);
        if let Some((denomination, amount)) = coins::parse_amount_from_name(&head.name) {
            purse.set_amount(denomination, amount);
        }
        head.coins = Some(purse);
    }
}
