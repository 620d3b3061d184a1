//! Characters and their canonical form
//!
//! [`Character`] owns its sections and exposes slot commands that return
//! `Result` instead of mutating anything on failure. [`normalize`] brings a
//! character loaded from any historical shape into canonical form and
//! reports exactly which persisted fields it touched.

mod model;
mod normalize;

pub use model::{Character, DEFAULT_STRENGTH, NEW_ITEM_NAME, UNNAMED_CHARACTER};
pub use normalize::{normalize, CharacterField, NormalizeReport};
