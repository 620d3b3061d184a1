//! Contiguous-run placement over a section
//!
//! All functions operate on a plain `[Slot]` and never resize it. A failed
//! operation leaves the section exactly as it was.

use super::coins::CoinPurse;
use super::slot::{ItemHead, Slot};

/// Result of moving an item run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Source and destination are the same cell, or the source is not an item head
    Unchanged,
    /// The run now starts at the destination
    Moved,
    /// All charges were folded into a same-named item at the destination
    Merged,
    /// The destination filled up; the source keeps the remaining charges
    PartiallyMerged { remaining: u8 },
    /// No contiguous run at the destination; the source was restored
    NoSpace,
}

impl MoveOutcome {
    /// Whether any slot was modified
    pub fn changed(self) -> bool {
        matches!(
            self,
            MoveOutcome::Moved | MoveOutcome::Merged | MoveOutcome::PartiallyMerged { .. }
        )
    }
}

/// True iff `len` cells starting at `start` exist and are all empty
pub fn has_contiguous_space(section: &[Slot], start: usize, len: usize) -> bool {
    match start.checked_add(len) {
        Some(end) if end <= section.len() => section[start..end].iter().all(Slot::is_empty),
        _ => false,
    }
}

/// Write `head` at `start` followed by `slot_count - 1` links back to it.
///
/// Returns false without touching the section if the run doesn't fit.
pub fn place(section: &mut [Slot], start: usize, head: ItemHead) -> bool {
    let len = head.slot_count.max(1);
    if !has_contiguous_space(section, start, len) {
        return false;
    }
    for cell in section.iter_mut().skip(start + 1).take(len - 1) {
        *cell = Slot::Link { head: start };
    }
    section[start] = Slot::Head(ItemHead {
        slot_count: len,
        ..head
    });
    true
}

/// Clear the run owning `index` (a head or any of its links).
///
/// Only cells that actually belong to the run are cleared, so a truncated
/// or damaged run never wipes neighbouring items.
pub fn remove(section: &mut [Slot], index: usize) -> Option<ItemHead> {
    let head_index = section.get(index)?.head_index(index)?;
    let Some(Slot::Head(head)) = section.get(head_index).cloned() else {
        return None;
    };
    section[head_index] = Slot::Empty;
    for cell in section
        .iter_mut()
        .skip(head_index + 1)
        .take(head.slot_count.saturating_sub(1))
    {
        if *cell == (Slot::Link { head: head_index }) {
            *cell = Slot::Empty;
        }
    }
    Some(head)
}

/// Fold the source's charges into the destination head when both are
/// same-named consumables and the destination has room.
fn try_merge(source: &mut ItemHead, dest: &mut ItemHead) -> Option<MoveOutcome> {
    if source.name != dest.name {
        return None;
    }
    let (Some(src), Some(dst)) = (source.sub_slots.as_mut(), dest.sub_slots.as_mut()) else {
        return None;
    };
    let room = dst.available();
    if room == 0 {
        return None;
    }
    let transfer = room.min(src.filled);
    dst.filled += transfer;
    src.filled -= transfer;
    if src.filled > 0 {
        Some(MoveOutcome::PartiallyMerged {
            remaining: src.filled,
        })
    } else {
        Some(MoveOutcome::Merged)
    }
}

/// Move the run headed at `head` to start at `dest` within one section.
pub fn move_within(section: &mut [Slot], head: usize, dest: usize) -> MoveOutcome {
    if head == dest {
        return MoveOutcome::Unchanged;
    }
    let Some(Slot::Head(mut source)) = section.get(head).cloned() else {
        return MoveOutcome::Unchanged;
    };

    if let Some(Slot::Head(target)) = section.get_mut(dest) {
        if let Some(outcome) = try_merge(&mut source, target) {
            finish_merge(section, head, source, outcome);
            return outcome;
        }
    }

    let snapshot = section.to_vec();
    remove(section, head);
    if place(section, dest, source) {
        MoveOutcome::Moved
    } else {
        section.clone_from_slice(&snapshot);
        MoveOutcome::NoSpace
    }
}

/// Move the run headed at `head` in `from` to start at `dest` in `to`.
pub fn move_between(from: &mut [Slot], head: usize, to: &mut [Slot], dest: usize) -> MoveOutcome {
    let Some(Slot::Head(mut source)) = from.get(head).cloned() else {
        return MoveOutcome::Unchanged;
    };

    if let Some(Slot::Head(target)) = to.get_mut(dest) {
        if let Some(outcome) = try_merge(&mut source, target) {
            finish_merge(from, head, source, outcome);
            return outcome;
        }
    }

    let snapshot = from.to_vec();
    remove(from, head);
    if place(to, dest, source) {
        MoveOutcome::Moved
    } else {
        from.clone_from_slice(&snapshot);
        MoveOutcome::NoSpace
    }
}

fn finish_merge(section: &mut [Slot], head: usize, source: ItemHead, outcome: MoveOutcome) {
    match outcome {
        MoveOutcome::Merged => {
            remove(section, head);
        }
        _ => section[head] = Slot::Head(source),
    }
}

/// First run start where a copy of the item at `head` fits.
///
/// Searches forward from just past the item, then wraps around to the
/// cells before it.
pub fn find_duplicate_target(section: &[Slot], head: usize) -> Option<usize> {
    let len = section.get(head)?.as_head()?.slot_count.max(1);
    let last_start = section.len().checked_sub(len)?;
    (head + len..=last_start)
        .chain(0..=head.checked_sub(len).unwrap_or(0).min(last_start))
        .filter(|&i| i + len <= head || i >= head + len)
        .find(|&i| has_contiguous_space(section, i, len))
}

/// Place a copy of the item at `head`.
///
/// Charges are copied as they are. A coin container copy starts empty so
/// duplication never mints coins. Returns the index of the copy.
pub fn duplicate(section: &mut [Slot], head: usize) -> Option<usize> {
    let target = find_duplicate_target(section, head)?;
    let mut copy = section.get(head)?.as_head()?.clone();
    copy.coins = copy.coins.as_ref().map(CoinPurse::zeroed);
    place(section, target, copy).then_some(target)
}
