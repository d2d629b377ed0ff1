//! `repl::system` module
//!
//! Contains console handlers for files, save slots and the session itself.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use log::{info, warn};

use crate::STRAND_VERSION;
use crate::command::FileSlot;
use crate::repl::ReplControl;
use crate::save_files::{collect_save_slots, find_save_slot, load_table_file, save_table_file};
use crate::style::ConsoleStyle;
use crate::version::FormatVersion;
use crate::world::World;

/// Open the `fread` source (a file or a directory) or the `fwrite` target.
///
/// # Errors
/// - if writing to `out` fails
pub fn open_handler(world: &mut World, out: &mut dyn Write, slot: FileSlot, path: &Path) -> Result<()> {
    let opened = match slot {
        FileSlot::Input => world.open_input(path),
        FileSlot::Output => world.open_output(path),
    };
    match opened {
        Ok(()) => writeln!(out, "opened {}", path.display().to_string().name_style())?,
        Err(e) => {
            warn!("open of '{}' failed: {e:#}", path.display());
            writeln!(out, "{}", format!("unable to open {}: {e}", path.display()).error_style())?;
        },
    }
    Ok(())
}

/// Close the input source, the output file, or both.
///
/// # Errors
/// - if writing to `out` fails
pub fn close_handler(world: &mut World, out: &mut dyn Write, slot: Option<FileSlot>) -> Result<()> {
    if slot != Some(FileSlot::Output) {
        world.close_input();
        writeln!(out, "{}", "input closed".note_style())?;
    }
    if slot != Some(FileSlot::Input) {
        match world.close_output() {
            Ok(()) => writeln!(out, "{}", "output closed".note_style())?,
            Err(e) => writeln!(out, "{}", format!("{e:#}").error_style())?,
        }
    }
    Ok(())
}

/// Save the string table to a named slot.
///
/// # Errors
/// - if writing to `out` fails
pub fn save_handler(world: &World, out: &mut dyn Write, dir: &Path, slot: &str) -> Result<()> {
    match save_table_file(world, dir, slot) {
        Ok(path) => {
            writeln!(out, "Strings saved as {}", slot.name_style())?;
            info!("table saved to slot \"{slot}\" ({})", path.display());
        },
        Err(e) => {
            warn!("save to slot \"{slot}\" failed: {e:#}");
            writeln!(out, "{}", format!("Save failed: {e:#}").error_style())?;
        },
    }
    Ok(())
}

/// Replace the string table with a saved slot.
///
/// # Errors
/// - if writing to `out` fails
pub fn load_handler(world: &mut World, out: &mut dyn Write, dir: &Path, slot: &str) -> Result<()> {
    let Some(path) = find_save_slot(dir, slot) else {
        writeln!(out, "{}", format!("No save slot named '{slot}'.").error_style())?;
        return list_saves_handler(out, dir);
    };
    match load_table_file(world, &path) {
        Ok(count) => {
            writeln!(out, "Loaded {count} strings from {}", slot.name_style())?;
            info!("table loaded from slot \"{slot}\" ({})", path.display());
        },
        Err(e) => {
            warn!("load of slot \"{slot}\" failed: {e:#}");
            writeln!(out, "{}", format!("Load failed: {e:#}").error_style())?;
        },
    }
    Ok(())
}

/// List available save slots.
///
/// # Errors
/// - if writing to `out` fails
pub fn list_saves_handler(out: &mut dyn Write, dir: &Path) -> Result<()> {
    let slots = match collect_save_slots(dir) {
        Ok(slots) => slots,
        Err(e) => {
            writeln!(out, "{}", format!("Unable to list saves: {e:#}").error_style())?;
            return Ok(());
        },
    };
    if slots.is_empty() {
        writeln!(out, "{}", "(no saved tables)".note_style())?;
        return Ok(());
    }
    writeln!(out, "{}", "Saved tables".heading_style())?;
    for slot in slots {
        let marker = if slot.version == STRAND_VERSION { "" } else { " (older engine)" };
        writeln!(
            out,
            "{} {}{}",
            slot.slot.name_style(),
            slot.version.section_style(),
            marker.note_style()
        )?;
    }
    Ok(())
}

/// Show or change the world format version.
///
/// # Errors
/// - if writing to `out` fails
pub fn version_handler(world: &mut World, out: &mut dyn Write, requested: Option<&str>) -> Result<()> {
    if let Some(requested) = requested {
        match requested.parse::<FormatVersion>() {
            Ok(version) => {
                info!("format version changed from {} to {version}", world.version);
                world.version = version;
            },
            Err(e) => {
                writeln!(out, "{}", e.to_string().error_style())?;
                return Ok(());
            },
        }
    }
    writeln!(
        out,
        "strand {STRAND_VERSION}, world format {}",
        world.version.to_string().number_style()
    )?;
    Ok(())
}

/// Print the command summary.
///
/// # Errors
/// - if writing to `out` fails
pub fn help_handler(out: &mut dyn Write) -> Result<()> {
    const HELP: &[(&str, &str)] = &[
        ("set NAME VALUE", "assign text, a request word (fread, board_name...) or nothing"),
        ("copy DEST SOURCE", "assign one string to another; both may carry +offset#size"),
        ("get NAME", "show a string or splice"),
        ("inc NAME VALUE", "append text"),
        ("dec NAME N", "remove N bytes from the end"),
        ("num NAME", "read as a number; NAME.length and NAME.N#W work too"),
        ("setnum NAME N", "store a number; NAME.length and NAME.N#W work too"),
        ("cmp A B [exact]", "order two strings"),
        ("match NAME PATTERN", "wildcard test: ? one byte, % any run"),
        ("new NAME LEN", "create or resize to exactly LEN bytes"),
        ("list / mem", "show strings / memory use"),
        ("open-in / open-dir PATH", "open the fread source (a file or a directory)"),
        ("open-out PATH", "open the fwrite target"),
        ("close [in|out]", "close one or both again"),
        ("save SLOT / load SLOT", "persist or restore the table"),
        ("saves", "list saved tables"),
        ("version [X.YY]", "show or change the world format version"),
        ("quit", "leave the console"),
    ];
    writeln!(out, "{}", "Commands".heading_style())?;
    for (usage, text) in HELP {
        writeln!(out, "{:<24} {}", usage.name_style(), text)?;
    }
    Ok(())
}

/// Close any open files and leave the console.
///
/// # Errors
/// - if writing to `out` fails
pub fn quit_handler(world: &mut World, out: &mut dyn Write) -> Result<ReplControl> {
    world.close_input();
    if let Err(e) = world.close_output() {
        warn!("output not flushed on exit: {e:#}");
    }
    info!("console closed with {} strings in the table", world.strings.len());
    writeln!(out, "{}", "Goodbye.".note_style())?;
    Ok(ReplControl::Quit)
}
