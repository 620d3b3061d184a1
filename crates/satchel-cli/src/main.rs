//! Satchel CLI
//!
//! Thin wrapper around satchel-core commands for command-line usage. Every
//! invocation opens the shared store in the data directory, syncs, runs one
//! command and prints the derived view.
//!
//! ## Usage
//!
//! ```bash
//! # Show session and store information
//! satchel info
//!
//! # Add a character and look at it
//! satchel char add "Brakka" --str 16
//! satchel char show 0
//!
//! # Add a catalog item and place it in the backpack
//! satchel item add "Torch" --charges 3 --unit use
//! satchel inv place 0 backpack 0 Torch
//!
//! # Use a charge, then drag the torch to the equipped section
//! satchel inv use 0 backpack 0
//! satchel inv move 0 backpack 0 equipped 3
//!
//! # Export everything, restore an older roster
//! satchel export --out character_data.json
//! satchel history list
//! satchel history restore <key>
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use satchel_core::catalog::{CatalogEntry, ItemDraft};
use satchel_core::inventory::{Denomination, ItemHead, MoveOutcome, Slot};
use satchel_core::logging::LoggingBuilder;
use satchel_core::transfer::EXPORT_FILE_NAME;
use satchel_core::{Character, EngineConfig, SaveOutcome, SectionKind, SyncEngine};

/// Satchel - shared character inventory
#[derive(Parser)]
#[command(name = "satchel")]
#[command(version = "0.1.0")]
#[command(about = "Satchel - shared character inventory")]
#[command(
    long_about = "Slot-based character inventory for tabletop play, shared between clients with last-write-wins sync."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Data directory (default: ~/.satchel/data)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Also write JSONL logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// History snapshots kept per log (overrides config.json)
    #[arg(long, global = true)]
    history_limit: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show session and store information
    Info,

    /// Character roster
    Char {
        #[command(subcommand)]
        action: CharAction,
    },

    /// Shared item catalog
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Items in a character's sections
    Inv {
        #[command(subcommand)]
        action: InvAction,
    },

    /// Export characters and catalog as JSON
    Export {
        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace characters and catalog from an exported file
    Import {
        /// File to import (default: character_data.json)
        path: Option<PathBuf>,
    },

    /// Inventory snapshots
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum CharAction {
    /// Add a character
    Add {
        name: String,
        /// Strength score
        #[arg(long = "str", default_value_t = 18)]
        strength: u32,
    },
    /// List characters with their load
    List,
    /// Show every section of a character
    Show { index: usize },
    /// Delete a character
    Delete { index: usize },
    /// Move a character to a new position
    Move { from: usize, to: usize },
    /// Rename a character
    Rename { index: usize, name: String },
    /// Set strength (resizes the backpack)
    Str { index: usize, strength: u32 },
    /// Replace a character's notes
    Notes { index: usize, text: String },
    /// Toggle whether a character is shown
    Hide { index: usize },
    /// Select a character (omit the index to clear)
    Select { index: Option<usize> },
}

#[derive(Subcommand)]
enum ItemAction {
    /// Add a catalog item
    Add {
        name: String,
        #[command(flatten)]
        options: ItemOptions,
    },
    /// List catalog items
    List {
        /// Case-insensitive match on name or notes
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Edit a catalog item (by id or name)
    Edit {
        key: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        options: ItemOptions,
    },
    /// Delete a catalog item (by id or name)
    Delete { key: String },
}

#[derive(clap::Args)]
struct ItemOptions {
    /// Slots the item occupies
    #[arg(long)]
    slots: Option<usize>,
    #[arg(long)]
    notes: Option<String>,
    /// Consumable charges (1-3)
    #[arg(long)]
    charges: Option<u8>,
    /// Name of one charge
    #[arg(long)]
    unit: Option<String>,
    /// Make the item a coin container holding up to this many coins
    #[arg(long)]
    coins: Option<u32>,
}

#[derive(Subcommand)]
enum InvAction {
    /// Place a catalog item (or an ad-hoc one with --slots)
    Place {
        char_index: usize,
        #[arg(value_parser = parse_section)]
        section: SectionKind,
        start: usize,
        /// Catalog id or name
        item: String,
        /// Place an item that is not in the catalog, taking this many slots
        #[arg(long)]
        slots: Option<usize>,
    },
    /// Remove the item covering a slot
    Remove {
        char_index: usize,
        #[arg(value_parser = parse_section)]
        section: SectionKind,
        index: usize,
    },
    /// Move an item, optionally to another character
    Move {
        char_index: usize,
        #[arg(value_parser = parse_section)]
        section: SectionKind,
        index: usize,
        #[arg(value_parser = parse_section)]
        to_section: SectionKind,
        dest: usize,
        /// Destination character (default: same character)
        #[arg(long)]
        to_char: Option<usize>,
    },
    /// Copy an item into the next free run
    Dup {
        char_index: usize,
        #[arg(value_parser = parse_section)]
        section: SectionKind,
        index: usize,
    },
    /// Use one charge
    Use {
        char_index: usize,
        #[arg(value_parser = parse_section)]
        section: SectionKind,
        index: usize,
    },
    /// Restore one charge
    Refill {
        char_index: usize,
        #[arg(value_parser = parse_section)]
        section: SectionKind,
        index: usize,
    },
    /// Set a coin amount in a coin container
    Coins {
        char_index: usize,
        #[arg(value_parser = parse_section)]
        section: SectionKind,
        index: usize,
        /// PP, GP, SP, CP, EP or Gems
        #[arg(value_parser = parse_denomination)]
        denomination: Denomination,
        amount: u32,
    },
    /// Rename an item
    Rename {
        char_index: usize,
        #[arg(value_parser = parse_section)]
        section: SectionKind,
        index: usize,
        name: String,
    },
    /// Put a one-slot "New Item" on an empty slot
    Blank {
        char_index: usize,
        #[arg(value_parser = parse_section)]
        section: SectionKind,
        index: usize,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List inventory snapshots, newest first
    List {
        /// Show catalog snapshots instead
        #[arg(long)]
        catalog: bool,
    },
    /// Replace the roster with a snapshot
    Restore { key: String },
}

/// Console logging plus optional JSONL files named after the session
fn setup_logging(verbosity: u8, log_dir: Option<PathBuf>, session: &str) -> Result<()> {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let mut builder = LoggingBuilder::new(session).with_filter(filter);
    if let Some(dir) = log_dir {
        builder = builder.with_logs_dir(dir);
    }
    builder.init().context("Failed to install logging")?;
    Ok(())
}

/// Get the default data directory (~/.satchel/data)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".satchel")
        .join("data")
}

fn parse_section(s: &str) -> std::result::Result<SectionKind, String> {
    SectionKind::parse(s).ok_or_else(|| {
        format!(
            "unknown section '{}'. Must be one of: equipped, backpack, pouch, small-sack, large-sack",
            s
        )
    })
}

fn parse_denomination(s: &str) -> std::result::Result<Denomination, String> {
    s.parse()
}

fn describe(outcome: SaveOutcome) -> String {
    match outcome {
        SaveOutcome::LocalOnly => "kept locally".to_string(),
        SaveOutcome::Deferred => "deferred".to_string(),
        SaveOutcome::Written { .. } => "synced".to_string(),
        SaveOutcome::Superseded { remote } => {
            format!("superseded by a newer remote version ({})", remote)
        }
        SaveOutcome::Unavailable => "remote unavailable, kept locally".to_string(),
    }
}

fn draft_from(entry: &CatalogEntry) -> ItemDraft {
    let mut draft = ItemDraft::new(entry.name.clone(), entry.slots).with_notes(entry.notes.clone());
    if entry.has_sub_slots {
        draft = draft.with_sub_slots(entry.max_sub_slots, entry.sub_slot_name.clone());
    }
    if let Some(limit) = entry.coin_limit.filter(|_| entry.has_coin_slots) {
        draft = draft.with_coins(limit);
    }
    draft
}

fn apply_options(mut draft: ItemDraft, options: ItemOptions) -> ItemDraft {
    if let Some(slots) = options.slots {
        draft.slots = slots;
    }
    if let Some(notes) = options.notes {
        draft.notes = notes;
    }
    if let Some(max) = options.charges {
        let unit = options
            .unit
            .or_else(|| draft.sub_slots.as_ref().map(|(_, u)| u.clone()))
            .unwrap_or_default();
        draft = draft.with_sub_slots(max, unit);
    } else if let (Some(unit), Some((max, _))) = (options.unit, draft.sub_slots.clone()) {
        draft = draft.with_sub_slots(max, unit);
    }
    if let Some(limit) = options.coins {
        draft = draft.with_coins(limit);
    }
    draft
}

fn describe_entry(entry: &CatalogEntry) -> String {
    let mut line = format!(
        "{} ({} slot{})",
        entry.name,
        entry.slots,
        if entry.slots == 1 { "" } else { "s" }
    );
    if entry.has_sub_slots {
        line.push_str(&format!(" [{} {}]", entry.max_sub_slots, entry.sub_slot_name));
    }
    if entry.has_coin_slots {
        line.push_str(&format!(
            " [coins up to {}]",
            entry.coin_limit.unwrap_or_default()
        ));
    }
    if !entry.notes.is_empty() {
        line.push_str(&format!(" - {}", entry.notes));
    }
    line
}

fn describe_slot(section: &[Slot], index: usize) -> String {
    match &section[index] {
        Slot::Empty => "-".to_string(),
        Slot::Link { head } => {
            let name = section
                .get(*head)
                .and_then(Slot::as_head)
                .map(|h| h.name.as_str())
                .unwrap_or("?");
            format!("  (cont. {})", name)
        }
        Slot::Head(head) => describe_head(head),
    }
}

fn describe_head(head: &ItemHead) -> String {
    let mut line = head.display_name();
    if head.slot_count > 1 {
        line.push_str(&format!(" [{} slots]", head.slot_count));
    }
    if let Some(purse) = &head.coins {
        line.push_str(&format!(" {}", purse.summary()));
    }
    line
}

fn print_character(index: usize, character: &Character) {
    let load = character.encumbrance();
    println!("Character {}: {}", index, character.name);
    println!("  Strength: {}", character.strength);
    if let Some(notes) = character.notes.as_deref().filter(|n| !n.is_empty()) {
        println!("  Notes: {}", notes);
    }
    println!("  Speed: {}", load.speed_label());
    println!("  Load: {}", load.slowdown_label());
    println!("  Coins: {} gp", character.coin_value());

    for kind in SectionKind::ALL {
        let Some(section) = character.section(kind) else {
            continue;
        };
        println!();
        println!("{} ({} slots):", kind, section.len());
        for i in 0..section.len() {
            println!("  [{:>2}] {}", i, describe_slot(section, i));
        }
    }
}

fn print_move(outcome: MoveOutcome) {
    match outcome {
        MoveOutcome::Unchanged => println!("Nothing to move"),
        MoveOutcome::Moved => println!("Moved"),
        MoveOutcome::Merged => println!("Merged into the item at the destination"),
        MoveOutcome::PartiallyMerged { remaining } => {
            println!("Destination is full; {} left at the source", remaining)
        }
        MoveOutcome::NoSpace => println!("No space at the destination"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    let mut config = EngineConfig::load(&data_dir)?;
    if let Some(limit) = cli.history_limit {
        config = config.with_history_limit(limit);
    }

    let mut engine = SyncEngine::new(&data_dir, config).await?;
    // The session token names the log file, so logging starts after open
    setup_logging(cli.verbose, cli.log_dir, engine.session().short())?;

    if let Err(e) = engine.connect().await {
        tracing::warn!(error = %e, "Working from the local cache");
    }

    match cli.command {
        Commands::Info => {
            let state = engine.state();
            println!("Satchel v0.1.0");
            println!();
            println!("Session: {}", engine.session());
            println!("Data directory: {}", data_dir.display());
            println!("Characters: {}", state.chars.len());
            println!("Catalog items: {}", state.items.len());
            println!("History limit: {}", engine.config().history_limit);
            if let Some(at) = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(state.last_updated)
                .filter(|_| state.last_updated > 0)
            {
                println!("Last updated: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }

        Commands::Char { action } => match action {
            CharAction::Add { name, strength } => {
                let index = engine.add_character(&name, strength).await?;
                let character = engine.character(index)?;
                println!("Added character {}: {}", index, character.name);
                println!("  Backpack: {} slots", character.capacity());
            }
            CharAction::List => {
                let state = engine.state();
                if state.chars.is_empty() {
                    println!("No characters yet.");
                    println!("Add one with: satchel char add <name>");
                }
                for (i, character) in state.chars.iter().enumerate() {
                    let load = character.encumbrance();
                    let selected = if state.ui.selected_char == Some(i) { "*" } else { " " };
                    let hidden = if state.ui.hidden_chars.contains(&i) {
                        " [hidden]"
                    } else {
                        ""
                    };
                    println!(
                        "{}{}: {} (STR {}) {}/{} slots, {}{}",
                        selected,
                        i,
                        character.name,
                        character.strength,
                        load.total_used,
                        load.total_slots,
                        load.speed_label(),
                        hidden
                    );
                }
            }
            CharAction::Show { index } => {
                print_character(index, engine.character(index)?);
            }
            CharAction::Delete { index } => {
                let removed = engine.delete_character(index).await?;
                println!("Deleted character: {}", removed.name);
            }
            CharAction::Move { from, to } => {
                engine.reorder_character(from, to).await?;
                println!("Moved character {} to position {}", from, to);
            }
            CharAction::Rename { index, name } => {
                engine.rename_character(index, &name).await?;
                println!("Renamed to: {}", engine.character(index)?.name);
            }
            CharAction::Str { index, strength } => {
                let capacity = engine.set_strength(index, strength).await?;
                println!("Strength set; backpack now has {} slots", capacity);
            }
            CharAction::Notes { index, text } => {
                engine.set_notes(index, &text).await?;
                println!("Notes updated");
            }
            CharAction::Hide { index } => {
                let hidden = engine.toggle_visibility(index).await?;
                println!(
                    "Character {} is now {}",
                    index,
                    if hidden { "hidden" } else { "shown" }
                );
            }
            CharAction::Select { index } => {
                engine.select_character(index).await?;
                match index {
                    Some(i) => println!("Selected character {}", i),
                    None => println!("Selection cleared"),
                }
            }
        },

        Commands::Item { action } => match action {
            ItemAction::Add { name, options } => {
                let draft = apply_options(ItemDraft::new(name, 1), options);
                let id = engine.create_item(draft).await?;
                println!("Created item: {}", id);
                if let Some(entry) = engine.state().items.get(&id) {
                    println!("  {}", describe_entry(entry));
                }
            }
            ItemAction::List { search } => {
                let items = engine.state().items.search(search.as_deref().unwrap_or(""));
                if items.is_empty() {
                    println!("No items found.");
                }
                for (id, entry) in items {
                    println!("{}  {}", id, describe_entry(entry));
                }
            }
            ItemAction::Edit { key, name, options } => {
                let (id, mut draft) = engine
                    .state()
                    .items
                    .resolve(&key)
                    .map(|(id, entry)| (id.clone(), draft_from(entry)))
                    .with_context(|| format!("No catalog item '{}'", key))?;
                if let Some(name) = name {
                    draft.name = name;
                }
                engine.edit_item(&id, apply_options(draft, options)).await?;
                println!("Updated item: {}", id);
            }
            ItemAction::Delete { key } => {
                let id = engine
                    .state()
                    .items
                    .resolve(&key)
                    .map(|(id, _)| id.clone())
                    .with_context(|| format!("No catalog item '{}'", key))?;
                let entry = engine.delete_item(&id).await?;
                println!("Deleted item: {}", entry.name);
            }
        },

        Commands::Inv { action } => match action {
            InvAction::Place {
                char_index,
                section,
                start,
                item,
                slots,
            } => {
                match slots {
                    Some(slots) => {
                        engine
                            .place_item(char_index, section, start, ItemHead::new(item.clone(), slots))
                            .await?;
                    }
                    None => {
                        engine
                            .place_from_catalog(char_index, section, start, &item)
                            .await?;
                    }
                }
                println!("Placed {} in {} at {}", item, section, start);
            }
            InvAction::Remove {
                char_index,
                section,
                index,
            } => {
                let removed = engine.remove_item(char_index, section, index).await?;
                println!("Removed {}", removed.name);
            }
            InvAction::Move {
                char_index,
                section,
                index,
                to_section,
                dest,
                to_char,
            } => {
                let outcome = engine
                    .move_item(
                        char_index,
                        section,
                        index,
                        to_char.unwrap_or(char_index),
                        to_section,
                        dest,
                    )
                    .await?;
                print_move(outcome);
            }
            InvAction::Dup {
                char_index,
                section,
                index,
            } => {
                let placed = engine.duplicate_item(char_index, section, index).await?;
                println!("Copied to {} slot {}", section, placed);
            }
            InvAction::Use {
                char_index,
                section,
                index,
            } => {
                let left = engine.consume_charge(char_index, section, index).await?;
                if left == 0 {
                    println!(
                        "Used the last charge; remove it with: satchel inv remove {} {} {}",
                        char_index,
                        section.key(),
                        index
                    );
                } else {
                    println!("{} charge(s) left", left);
                }
            }
            InvAction::Refill {
                char_index,
                section,
                index,
            } => {
                let filled = engine.refill_charge(char_index, section, index).await?;
                println!("{} charge(s) now", filled);
            }
            InvAction::Coins {
                char_index,
                section,
                index,
                denomination,
                amount,
            } => {
                let stored = engine
                    .set_coin_amount(char_index, section, index, denomination, amount)
                    .await?;
                if stored < amount {
                    println!("Container is full; stored {} {}", stored, denomination);
                } else {
                    println!("Stored {} {}", stored, denomination);
                }
                println!(
                    "Total coin value: {} gp",
                    engine.character(char_index)?.coin_value()
                );
            }
            InvAction::Rename {
                char_index,
                section,
                index,
                name,
            } => {
                engine.rename_item(char_index, section, index, &name).await?;
                println!("Renamed to {}", name.trim());
            }
            InvAction::Blank {
                char_index,
                section,
                index,
            } => {
                engine.create_blank_item(char_index, section, index).await?;
                println!("Added a blank item at {} {}", section, index);
            }
        },

        Commands::Export { out } => {
            let json = engine.export_json()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Import { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let outcome = engine.import_json(&text).await?;
            let state = engine.state();
            println!(
                "Imported {} characters and {} items ({})",
                state.chars.len(),
                state.items.len(),
                describe(outcome)
            );
        }

        Commands::History { action } => match action {
            HistoryAction::List { catalog } => {
                let entries = if catalog {
                    engine.fetch_catalog_history().await?
                } else {
                    engine.fetch_history().await?
                };
                if entries.is_empty() {
                    println!("No snapshots yet.");
                }
                for entry in entries {
                    let by = entry
                        .session
                        .as_ref()
                        .map(|s| s.short().to_string())
                        .unwrap_or_else(|| "?".to_string());
                    let size = match &entry.items {
                        Some(items) if catalog => format!("{} items", items.len()),
                        _ => format!("{} characters", entry.chars.len()),
                    };
                    println!("{}  {}  {}  by {}", entry.key, entry.formatted_time(), size, by);
                }
            }
            HistoryAction::Restore { key } => {
                let outcome = engine.restore_snapshot(&key).await?;
                println!("Restored snapshot {} ({})", key, describe(outcome));
            }
        },
    }

    Ok(())
}
