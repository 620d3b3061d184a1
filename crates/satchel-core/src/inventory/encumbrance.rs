//! Capacity, occupancy and movement speed

use super::coins::CoinValue;
use super::slot::Slot;

/// Unencumbered movement speed in feet
pub const BASE_SPEED_FEET: u32 = 120;

/// Backpack length for a strength score
pub fn backpack_capacity(strength: u32) -> usize {
    match strength {
        18.. => 19,
        16..=17 => 18,
        13..=15 => 17,
        9..=12 => 16,
        6..=8 => 15,
        4..=5 => 14,
        _ => 13,
    }
}

/// Number of cells holding a head or a link
pub fn occupied_count(section: &[Slot]) -> usize {
    section.iter().filter(|s| !s.is_empty()).count()
}

/// Speed multiplier from the number of empty carrying slots
pub fn speed_factor(empty: usize) -> f64 {
    match empty {
        0..=1 => 0.25,
        2..=3 => 0.50,
        4..=5 => 0.75,
        _ => 1.00,
    }
}

/// Speed multiplier from the number of filled equipped slots
pub fn equipped_speed_factor(filled: usize) -> f64 {
    match filled {
        8.. => 0.25,
        6..=7 => 0.50,
        4..=5 => 0.75,
        _ => 1.00,
    }
}

/// `30' (10')`: feet followed by squares
pub fn format_speed(feet: u32) -> String {
    format!("{}' ({}')", feet, squares(feet))
}

fn squares(feet: u32) -> u32 {
    (f64::from(feet) / 3.0).round() as u32
}

/// `Slowed — 5/10 used`
pub fn slowdown_label(empty: usize, total: usize) -> String {
    let used = total.saturating_sub(empty);
    let band = match empty {
        0..=1 => "Severely Slowed",
        2..=3 => "Heavily Slowed",
        4..=5 => "Slowed",
        _ => "Unburdened",
    };
    format!("{} — {}/{} used", band, used, total)
}

/// Derived encumbrance of one character
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Encumbrance {
    /// Carrying slots: backpack, plus large sack when present
    pub total_slots: usize,
    pub total_used: usize,
    pub empty: usize,
    pub equipped_filled: usize,
    pub backpack_factor: f64,
    pub equipped_factor: f64,
    pub speed_feet: u32,
    pub squares: u32,
}

impl Encumbrance {
    /// The small sack never counts toward encumbrance.
    pub fn compute(equipped: &[Slot], backpack: &[Slot], large_sack: Option<&[Slot]>) -> Self {
        let mut total_slots = backpack.len();
        let mut total_used = occupied_count(backpack);
        if let Some(sack) = large_sack {
            total_slots += sack.len();
            total_used += occupied_count(sack);
        }
        let empty = total_slots.saturating_sub(total_used);
        let equipped_filled = occupied_count(equipped);

        let backpack_factor = speed_factor(empty);
        let equipped_factor = equipped_speed_factor(equipped_filled);
        let factor = backpack_factor.min(equipped_factor);
        let speed_feet = (f64::from(BASE_SPEED_FEET) * factor).round().max(0.0) as u32;

        Self {
            total_slots,
            total_used,
            empty,
            equipped_filled,
            backpack_factor,
            equipped_factor,
            speed_feet,
            squares: squares(speed_feet),
        }
    }

    pub fn speed_label(&self) -> String {
        format_speed(self.speed_feet)
    }

    pub fn slowdown_label(&self) -> String {
        slowdown_label(self.empty, self.total_slots)
    }
}

/// Sum of every coin container across the given sections
pub fn total_coin_value<'a>(sections: impl IntoIterator<Item = &'a [Slot]>) -> CoinValue {
    sections
        .into_iter()
        .flat_map(|section| section.iter())
        .filter_map(|slot| slot.as_head()?.coins.as_ref())
        .map(|purse| purse.value())
        .sum()
}
