//! Slot-based inventory primitives
//!
//! Everything in this module is pure: no I/O, no logging side effects.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  section: [ Head{Rope,2} | Link→0 | Empty | Head{Torch,1} ] │
//! │             └─ run of 2 ──┘                                  │
//! │                                                              │
//! │  slot.rs         Slot / ItemHead / SubSlots / CoinPurse      │
//! │  allocator.rs    place, remove, move (+merge), duplicate     │
//! │  encumbrance.rs  capacity, occupancy, speed                  │
//! │  coins.rs        denominations and exact coin values         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod allocator;
pub mod coins;
pub mod encumbrance;
pub mod slot;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use allocator::{
    duplicate, find_duplicate_target, has_contiguous_space, move_between, move_within, place,
    remove, MoveOutcome,
};
pub use coins::{
    CoinPurse, CoinValue, Denomination, BELT_POUCH_LIMIT, BELT_POUCH_NAME, DEFAULT_PURSE_LIMIT,
};
pub use encumbrance::{
    backpack_capacity, equipped_speed_factor, format_speed, occupied_count, slowdown_label,
    speed_factor, total_coin_value, Encumbrance, BASE_SPEED_FEET,
};
pub use slot::{ItemHead, Slot, SubSlots, DEFAULT_SUB_SLOT_UNIT, MAX_SUB_SLOTS};

/// Number of slots in the equipped section
pub const EQUIPPED_SLOTS: usize = 9;

/// Number of slots in a small sack
pub const SMALL_SACK_SLOTS: usize = 9;

/// Equipped item name that opens the small sack section
pub const SMALL_SACK_ITEM: &str = "Sack (small)";

/// Equipped item name that opens the large sack section
pub const LARGE_SACK_ITEM: &str = "Sack (large)";

/// One named, fixed-length slot sequence belonging to a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
    Equipped,
    Backpack,
    BeltPouch,
    SmallSack,
    LargeSack,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Equipped,
        SectionKind::Backpack,
        SectionKind::BeltPouch,
        SectionKind::SmallSack,
        SectionKind::LargeSack,
    ];

    /// Field name used in persisted character records and remote paths
    pub fn key(self) -> &'static str {
        match self {
            SectionKind::Equipped => "equipped",
            SectionKind::Backpack => "backpack",
            SectionKind::BeltPouch => "beltPouch",
            SectionKind::SmallSack => "smallSack",
            SectionKind::LargeSack => "largeSack",
        }
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            SectionKind::Equipped => "Equipped",
            SectionKind::Backpack => "Backpack",
            SectionKind::BeltPouch => "Belt Pouch",
            SectionKind::SmallSack => "Small Sack",
            SectionKind::LargeSack => "Large Sack",
        }
    }

    /// Parse from a key ("backpack", "largeSack") or a loose spelling ("large-sack")
    pub fn parse(s: &str) -> Option<Self> {
        let folded: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "equipped" | "eq" => Some(SectionKind::Equipped),
            "backpack" | "bp" => Some(SectionKind::Backpack),
            "beltpouch" | "pouch" => Some(SectionKind::BeltPouch),
            "smallsack" => Some(SectionKind::SmallSack),
            "largesack" => Some(SectionKind::LargeSack),
            _ => None,
        }
    }

    /// The sack section opened by an equipped item with this name, if any
    pub fn sack_for_item(name: &str) -> Option<Self> {
        match name {
            SMALL_SACK_ITEM => Some(SectionKind::SmallSack),
            LARGE_SACK_ITEM => Some(SectionKind::LargeSack),
            _ => None,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A section of `len` empty slots
pub fn empty_section(len: usize) -> Vec<Slot> {
    vec![Slot::Empty; len]
}
