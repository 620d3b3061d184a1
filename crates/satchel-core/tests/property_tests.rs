//! Property-based tests for slot allocation, encumbrance and normalization
//!
//! Uses proptest to check the allocator and model invariants over random
//! sections and characters.

use proptest::prelude::*;
use satchel_core::character::{normalize, Character};
use satchel_core::inventory::{
    self, backpack_capacity, equipped_speed_factor, speed_factor, ItemHead, MoveOutcome, Slot,
    SubSlots,
};
use satchel_core::SectionKind;

// ============================================================================
// Strategy Generators
// ============================================================================

fn item_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z ]{1,12}").expect("valid regex")
}

/// A placement attempt: start index and run length
fn placement_strategy(max_start: usize) -> impl Strategy<Value = (usize, usize)> {
    (0..max_start, 1..4usize)
}

/// A section of `len` cells with some items placed left to right
fn section_strategy() -> impl Strategy<Value = Vec<Slot>> {
    (4..20usize)
        .prop_flat_map(|len| (Just(len), prop::collection::vec(placement_strategy(len), 0..8)))
        .prop_map(|(len, placements)| {
            let mut section = inventory::empty_section(len);
            for (i, (start, count)) in placements.into_iter().enumerate() {
                inventory::place(&mut section, start, ItemHead::new(format!("item{}", i), count));
            }
            section
        })
}

fn head_indices(section: &[Slot]) -> Vec<usize> {
    section
        .iter()
        .enumerate()
        .filter(|(_, s)| s.as_head().is_some())
        .map(|(i, _)| i)
        .collect()
}

/// Sum of consumable charges held in a section
fn charges(cells: &[Slot]) -> u32 {
    cells
        .iter()
        .filter_map(Slot::as_head)
        .filter_map(|h| h.sub_slots.as_ref())
        .map(|s| u32::from(s.filled))
        .sum()
}

/// Every link points back at a head whose run covers it
fn runs_are_consistent(section: &[Slot]) -> bool {
    section.iter().enumerate().all(|(i, slot)| match slot {
        Slot::Link { head } => {
            *head < i
                && section[*head]
                    .as_head()
                    .is_some_and(|h| head + h.slot_count > i)
        }
        Slot::Head(h) => (1..h.slot_count)
            .all(|k| section.get(i + k) == Some(&Slot::Link { head: i })),
        Slot::Empty => true,
    })
}

// ============================================================================
// Encumbrance Properties
// ============================================================================

proptest! {
    #[test]
    fn backpack_capacity_is_monotonic(s in 0u32..200) {
        prop_assert!(backpack_capacity(s) <= backpack_capacity(s + 1));
        prop_assert!((13..=19).contains(&backpack_capacity(s)));
    }

    #[test]
    fn speed_factor_is_monotonic(e in 0usize..100) {
        prop_assert!(speed_factor(e) <= speed_factor(e + 1));
    }

    #[test]
    fn equipped_factor_is_antitone(filled in 0usize..20) {
        prop_assert!(equipped_speed_factor(filled + 1) <= equipped_speed_factor(filled));
    }
}

#[test]
fn backpack_capacity_breakpoints() {
    for (strength, capacity) in [(3, 13), (4, 14), (6, 15), (9, 16), (13, 17), (16, 18), (18, 19)] {
        assert_eq!(backpack_capacity(strength), capacity, "strength {}", strength);
    }
}

#[test]
fn speed_factor_bands() {
    assert_eq!(speed_factor(1), 0.25);
    assert_eq!(speed_factor(3), 0.50);
    assert_eq!(speed_factor(5), 0.75);
    assert_eq!(speed_factor(6), 1.00);
}

// ============================================================================
// Allocator Properties
// ============================================================================

proptest! {
    /// Placing then removing restores the affected range to empty
    #[test]
    fn place_then_remove_restores(
        len in 1..20usize,
        (start, count) in (0..20usize, 1..5usize),
        name in item_name_strategy(),
    ) {
        let mut section = inventory::empty_section(len);
        let fits = start + count <= len;
        prop_assert_eq!(inventory::place(&mut section, start, ItemHead::new(name.clone(), count)), fits);
        if fits {
            prop_assert!(runs_are_consistent(&section));
            let removed = inventory::remove(&mut section, start).unwrap();
            prop_assert_eq!(removed.name, name);
            prop_assert!(section.iter().all(Slot::is_empty));
        } else {
            prop_assert!(section.iter().all(Slot::is_empty));
        }
    }

    /// A move that fails leaves the source exactly as it was
    #[test]
    fn failed_move_leaves_source_untouched(source in section_strategy(), dest in 0..4usize) {
        let heads = head_indices(&source);
        prop_assume!(!heads.is_empty());
        let mut from = source.clone();
        let mut to = inventory::empty_section(4);
        inventory::place(&mut to, 0, ItemHead::new("Wall", 4));

        let outcome = inventory::move_between(&mut from, heads[0], &mut to, dest);
        prop_assert_eq!(outcome, MoveOutcome::NoSpace);
        prop_assert_eq!(from, source);
    }

    /// Moves within a section keep every run well formed and never lose items
    #[test]
    fn move_within_preserves_items(section in section_strategy(), pick in 0..8usize, dest in 0..20usize) {
        let heads = head_indices(&section);
        prop_assume!(!heads.is_empty());
        let head = heads[pick % heads.len()];
        let mut moved = section.clone();
        let outcome = inventory::move_within(&mut moved, head, dest);

        prop_assert!(runs_are_consistent(&moved));
        prop_assert_eq!(head_indices(&moved).len(), heads.len());
        if outcome == MoveOutcome::NoSpace || outcome == MoveOutcome::Unchanged {
            prop_assert_eq!(moved, section);
        }
    }

    /// Charges are conserved when same-named consumables merge
    #[test]
    fn merge_conserves_charges(src in 0u8..=3, dst in 0u8..=3) {
        let torch = |filled: u8| {
            let mut sub = SubSlots::full(3, "use");
            sub.filled = filled;
            ItemHead::new("Torch", 1).with_sub_slots(sub)
        };
        let mut from = inventory::empty_section(2);
        let mut to = inventory::empty_section(2);
        inventory::place(&mut from, 0, torch(src));
        inventory::place(&mut to, 0, torch(dst));

        let before = charges(&from) + charges(&to);
        let outcome = inventory::move_between(&mut from, 0, &mut to, 0);
        prop_assert_eq!(charges(&from) + charges(&to), before);

        match outcome {
            MoveOutcome::Merged => {
                prop_assert!(from[0].is_empty());
            }
            MoveOutcome::PartiallyMerged { remaining } => {
                prop_assert_eq!(to[0].as_head().unwrap().sub_slots.as_ref().unwrap().filled, 3);
                prop_assert_eq!(from[0].as_head().unwrap().sub_slots.as_ref().unwrap().filled, remaining);
            }
            // Destination already full: an ordinary move to the occupied cell fails
            other => {
                prop_assert_eq!(other, MoveOutcome::NoSpace);
            }
        }
    }

    /// Duplicates land on a free run of the same length without touching the original
    #[test]
    fn duplicate_lands_on_free_run(section in section_strategy(), pick in 0..8usize) {
        let heads = head_indices(&section);
        prop_assume!(!heads.is_empty());
        let head = heads[pick % heads.len()];
        let mut copy = section.clone();

        match inventory::duplicate(&mut copy, head) {
            Some(target) => {
                prop_assert_ne!(target, head);
                prop_assert_eq!(&copy[head], &section[head]);
                prop_assert_eq!(copy[target].as_head().map(|h| &h.name), section[head].as_head().map(|h| &h.name));
                prop_assert!(runs_are_consistent(&copy));
            }
            None => prop_assert_eq!(copy, section),
        }
    }
}

// ============================================================================
// Normalization Properties
// ============================================================================

proptest! {
    /// A canonical character normalizes to itself with nothing to save
    #[test]
    fn normalize_is_idempotent(
        strength in 1u32..30,
        items in prop::collection::vec((item_name_strategy(), 0..20usize, 1..3usize), 0..10),
        equip_sack in any::<bool>(),
    ) {
        let mut character = Character::new("Prop", strength);
        normalize(&mut character);
        if equip_sack {
            character
                .place_item(SectionKind::Equipped, 0, ItemHead::new(inventory::LARGE_SACK_ITEM, 1))
                .unwrap();
        }
        for (name, start, count) in items {
            let _ = character.place_item(SectionKind::Backpack, start, ItemHead::new(name, count));
        }

        normalize(&mut character);
        let settled = character.clone();
        let report = normalize(&mut character);
        prop_assert!(report.is_clean(), "changed {:?}", report.changed);
        prop_assert_eq!(character, settled);
    }

    /// Backpack length always follows strength after normalization
    #[test]
    fn backpack_tracks_strength(first in 1u32..30, second in 1u32..30) {
        let mut character = Character::new("Prop", first);
        normalize(&mut character);
        character.strength = second;
        normalize(&mut character);
        prop_assert_eq!(character.backpack.len(), backpack_capacity(second));
        prop_assert_eq!(character.equipped.len(), 9);
        prop_assert_eq!(character.belt_pouch.len(), 1);
    }
}
