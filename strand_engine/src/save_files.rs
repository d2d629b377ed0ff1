//! Saving and restoring string tables.
//!
//! A table is persisted as a [`StringTableDef`] written out as RON. Files are
//! named `<slot>-strand-<engine version>.ron` so several slots can share a
//! directory.

use anyhow::{Context, Result, bail};
use log::{info, warn};
use strand_data::{StringRecord, StringTableDef, validate_table};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::STRAND_VERSION;
use crate::magic::is_reserved_name;
use crate::version::FormatVersion;
use crate::world::World;

pub const SAVE_DIR: &str = "saved_tables";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSlot {
    pub slot: String,
    pub version: String,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

/// Capture every string of `world`, in table order.
pub fn snapshot_table(world: &World) -> StringTableDef {
    StringTableDef {
        version: world.version.to_string(),
        strings: world
            .strings
            .iter()
            .map(|entry| StringRecord::new(entry.name(), entry.value()))
            .collect(),
    }
}

/// Replace the strings of `world` with the contents of `table`.
///
/// The table is checked before anything is touched, so a bad table leaves the
/// world as it was. The world takes on the table's format version.
///
/// # Errors
/// - if the table fails validation or holds a mirror name
/// - if its version is malformed
/// - if the string table cannot be allocated
pub fn restore_table(world: &mut World, table: &StringTableDef) -> Result<usize> {
    let errors = validate_table(table);
    if !errors.is_empty() {
        let report: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!("invalid string table: {}", report.join("; "));
    }
    if let Some(record) = table.strings.iter().find(|record| is_reserved_name(&record.name)) {
        bail!(
            "invalid string table: '{}' is a read-only mirror name",
            String::from_utf8_lossy(&record.name)
        );
    }
    let version: FormatVersion = table
        .version
        .parse()
        .with_context(|| format!("reading table version '{}'", table.version))?;

    world.strings.clear();
    for record in &table.strings {
        world
            .strings
            .load_raw(record.name.clone(), record.value.clone())
            .with_context(|| format!("loading string '{}'", String::from_utf8_lossy(&record.name)))?;
    }
    world.strings.sort();
    world.version = version;
    info!("{} strings restored (format {version})", table.strings.len());
    Ok(table.strings.len())
}

/// Write the strings of `world` to `dir` under `slot`.
///
/// # Errors
/// - if the directory cannot be created or the file cannot be written
pub fn save_table_file(world: &World, dir: &Path, slot: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating save directory {}", dir.display()))?;
    let path = dir.join(format!("{slot}-strand-{STRAND_VERSION}.ron"));
    let table = snapshot_table(world);
    let ron = ron::ser::to_string_pretty(&table, ron::ser::PrettyConfig::default())
        .context("serializing string table")?;
    fs::write(&path, ron).with_context(|| format!("writing save file {}", path.display()))?;
    info!("{} strings saved to '{}'", table.strings.len(), path.display());
    Ok(path)
}

/// Read a saved table from disk without applying it.
///
/// # Errors
/// Returns an error if the file cannot be read or deserialized.
pub fn read_table_file(path: &Path) -> Result<StringTableDef> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading save file {}", path.display()))?;
    ron::from_str::<StringTableDef>(&raw).with_context(|| format!("parsing save file {}", path.display()))
}

/// Load a saved table into `world`, replacing its strings.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_table_file(world: &mut World, path: &Path) -> Result<usize> {
    let table = read_table_file(path)?;
    restore_table(world, &table).with_context(|| format!("restoring {}", path.display()))
}

/// Discover save slot files stored in `dir`, newest engine version last.
///
/// # Errors
/// Returns an error if the directory contents cannot be read or enumerated.
pub fn collect_save_slots(dir: &Path) -> Result<Vec<SaveSlot>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut slots = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry.with_context(|| format!("enumerating {}", dir.display()))?;
        if let Some(slot) = slot_from_entry(&entry) {
            slots.push(slot);
        }
    }
    slots.sort_by(|a, b| a.slot.cmp(&b.slot).then(a.version.cmp(&b.version)));
    Ok(slots)
}

/// Find the file for `slot` in `dir`, preferring one written by this engine version.
pub fn find_save_slot(dir: &Path, slot: &str) -> Option<PathBuf> {
    let slots = match collect_save_slots(dir) {
        Ok(slots) => slots,
        Err(e) => {
            warn!("unable to list save slots: {e:#}");
            return None;
        },
    };
    let mut matching: Vec<SaveSlot> = slots.into_iter().filter(|s| s.slot == slot).collect();
    if let Some(current) = matching.iter().position(|s| s.version == STRAND_VERSION) {
        return Some(matching.swap_remove(current).path);
    }
    matching.pop().map(|s| s.path)
}

fn slot_from_entry(entry: &fs::DirEntry) -> Option<SaveSlot> {
    let path = entry.path();
    if !path.is_file() {
        return None;
    }
    if path.extension().and_then(|ext| ext.to_str()) != Some("ron") {
        return None;
    }
    let stem = path.file_stem().and_then(|stem| stem.to_str())?;
    let (slot, version) = stem.rsplit_once("-strand-")?;
    if slot.is_empty() {
        return None;
    }
    let modified = entry.metadata().ok().and_then(|meta| meta.modified().ok());
    Some(SaveSlot {
        slot: slot.to_string(),
        version: version.to_string(),
        path,
        modified,
    })
}
