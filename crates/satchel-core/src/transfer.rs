//! Bulk export and import of characters and the catalog
//!
//! The file format is `{ "chars": [...], "items": {...} }`. Imports are
//! all-or-nothing: a file that fails the shape checks changes nothing.

use serde::Serialize;
use serde_json::Value;

use crate::catalog::ItemCatalog;
use crate::character::Character;
use crate::error::{InventoryError, InventoryResult};
use crate::state::{chars_from_value, AppState};

/// Suggested file name for exports
pub const EXPORT_FILE_NAME: &str = "character_data.json";

#[derive(Serialize)]
struct ExportFile<'a> {
    chars: &'a [Character],
    items: &'a ItemCatalog,
}

/// Pretty-printed export of the roster and catalog
pub fn export_json(state: &AppState) -> InventoryResult<String> {
    let file = ExportFile {
        chars: &state.chars,
        items: &state.items,
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

/// Decoded contents of an import file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportData {
    pub chars: Vec<Character>,
    pub items: ItemCatalog,
}

/// Parse and shape-check an import file
///
/// Requires an object whose `chars` is an array and whose `items` is an
/// array or a keyed object.
pub fn parse_import(text: &str) -> InventoryResult<ImportData> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| InventoryError::MalformedImport(format!("not valid JSON: {}", e)))?;
    let Value::Object(mut file) = value else {
        return Err(InventoryError::MalformedImport(
            "expected a JSON object".to_string(),
        ));
    };

    let chars = match file.remove("chars") {
        Some(chars @ Value::Array(_)) => chars,
        _ => {
            return Err(InventoryError::MalformedImport(
                "\"chars\" must be an array".to_string(),
            ))
        }
    };
    let items = match file.remove("items") {
        Some(items @ (Value::Array(_) | Value::Object(_))) => items,
        _ => {
            return Err(InventoryError::MalformedImport(
                "\"items\" must be an array or an object".to_string(),
            ))
        }
    };

    Ok(ImportData {
        chars: chars_from_value(chars),
        items: ItemCatalog::from_value(items),
    })
}
