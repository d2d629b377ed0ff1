//! `repl::strings` module
//!
//! Console handlers for commands that read or modify strings.

use std::cmp::Ordering;
use std::io::Write;

use anyhow::Result;
use log::info;

use crate::engine::{
    SetOutcome, Source, compare_strings, dec_string_int, get_string, inc_string, locate_string, new_string,
    read_as_number, set_string, write_as_number,
};
use crate::repl::CONSOLE_CONTEXT;
use crate::style::ConsoleStyle;
use crate::world::World;

/// Printable form of a byte string.
fn shown(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}

/// Assign a literal value (or a request word) to a string.
///
/// # Errors
/// - if writing to `out` fails
pub fn set_handler(world: &mut World, out: &mut dyn Write, name: &str, value: &str) -> Result<()> {
    let mut target = name.as_bytes().to_vec();
    let outcome = set_string(world, &mut target, Source::Bytes(value.as_bytes()), CONSOLE_CONTEXT);
    report_outcome(world, out, &target, outcome)
}

/// Assign one string (or a splice of it) to another.
///
/// # Errors
/// - if writing to `out` fails
pub fn copy_handler(world: &mut World, out: &mut dyn Write, dest: &str, source: &str) -> Result<()> {
    let mut source_name = source.as_bytes().to_vec();
    let mut target = dest.as_bytes().to_vec();
    let outcome = match locate_string(world, &mut source_name) {
        Some(span) => set_string(world, &mut target, Source::Stored(span), CONSOLE_CONTEXT),
        None => set_string(world, &mut target, Source::Bytes(b""), CONSOLE_CONTEXT),
    };
    report_outcome(world, out, &target, outcome)
}

fn report_outcome(world: &World, out: &mut dyn Write, name: &[u8], outcome: SetOutcome) -> Result<()> {
    match outcome {
        SetOutcome::Written => match world.strings.get(name) {
            Some(entry) => writeln!(
                out,
                "{} = \"{}\"",
                shown(name).name_style(),
                shown(entry.value()).value_style()
            )?,
            None => writeln!(out, "{}", "written".note_style())?,
        },
        SetOutcome::Unchanged => writeln!(out, "{}", "no string changed".note_style())?,
        SetOutcome::RestartProgram => {
            info!("console program replaced; restart requested");
            writeln!(out, "{}", "program replaced; restart requested".note_style())?;
        },
    }
    Ok(())
}

/// Show a string or splice.
///
/// # Errors
/// - if writing to `out` fails
pub fn get_handler(world: &World, out: &mut dyn Write, name: &str) -> Result<()> {
    let mut target = name.as_bytes().to_vec();
    match get_string(world, &mut target) {
        Some(value) => writeln!(out, "{} = \"{}\"", name.name_style(), shown(value).value_style())?,
        None => writeln!(out, "{}", format!("no string named '{name}'").error_style())?,
    }
    Ok(())
}

/// Append a literal to a string.
///
/// # Errors
/// - if writing to `out` fails
pub fn inc_handler(world: &mut World, out: &mut dyn Write, name: &str, value: &str) -> Result<()> {
    let mut target = name.as_bytes().to_vec();
    inc_string(world, &mut target, Source::Bytes(value.as_bytes()));
    get_handler(world, out, &String::from_utf8_lossy(&target))
}

/// Chop bytes off the end of a string.
///
/// # Errors
/// - if writing to `out` fails
pub fn dec_handler(world: &mut World, out: &mut dyn Write, name: &str, count: i32) -> Result<()> {
    dec_string_int(world, name.as_bytes(), count);
    get_handler(world, out, name)
}

/// Show a string's numeric value (`name`, `name.length`, `name.N#W`).
///
/// # Errors
/// - if writing to `out` fails
pub fn num_handler(world: &World, out: &mut dyn Write, name: &str) -> Result<()> {
    let mut target = name.as_bytes().to_vec();
    let value = read_as_number(world, &mut target);
    writeln!(out, "{} = {}", name.name_style(), value.to_string().number_style())?;
    Ok(())
}

/// Store a number into a string (`name`, `name.length`, `name.N#W`).
///
/// # Errors
/// - if writing to `out` fails
pub fn setnum_handler(world: &mut World, out: &mut dyn Write, name: &str, value: i32) -> Result<()> {
    let mut target = name.as_bytes().to_vec();
    write_as_number(world, &mut target, value, CONSOLE_CONTEXT);
    let base = String::from_utf8_lossy(&target).into_owned();
    get_handler(world, out, &base)
}

fn value_or_empty(world: &World, name: &str) -> Vec<u8> {
    let mut target = name.as_bytes().to_vec();
    get_string(world, &mut target).map(<[u8]>::to_vec).unwrap_or_default()
}

/// Order two strings.
///
/// # Errors
/// - if writing to `out` fails
pub fn compare_handler(world: &World, out: &mut dyn Write, left: &str, right: &str, exact_case: bool) -> Result<()> {
    let a = value_or_empty(world, left);
    let b = value_or_empty(world, right);
    let relation = match compare_strings(&a, &b, exact_case, false) {
        Ordering::Less => "<",
        Ordering::Equal => "==",
        Ordering::Greater => ">",
    };
    writeln!(out, "{} {relation} {}", left.name_style(), right.name_style())?;
    Ok(())
}

/// Test a string against a wildcard pattern (`?` one byte, `%` any run).
///
/// # Errors
/// - if writing to `out` fails
pub fn match_handler(world: &World, out: &mut dyn Write, name: &str, pattern: &str) -> Result<()> {
    let value = value_or_empty(world, name);
    let verdict = if compare_strings(&value, pattern.as_bytes(), false, true) == Ordering::Equal {
        "matches".number_style()
    } else {
        "does not match".error_style()
    };
    writeln!(out, "{} {verdict} \"{pattern}\"", name.name_style())?;
    Ok(())
}

/// Create or resize a string to an exact length.
///
/// # Errors
/// - if writing to `out` fails
pub fn new_handler(world: &mut World, out: &mut dyn Write, name: &str, length: usize) -> Result<()> {
    match new_string(world, name.as_bytes(), length) {
        Some(entry) => writeln!(
            out,
            "{} holds {} bytes ({} allocated)",
            name.name_style(),
            entry.length(),
            entry.allocated_length()
        )?,
        None => writeln!(out, "{}", format!("unable to size '{name}' to {length} bytes").error_style())?,
    }
    Ok(())
}

/// List every string in table order.
///
/// # Errors
/// - if writing to `out` fails
pub fn list_handler(world: &World, out: &mut dyn Write) -> Result<()> {
    if world.strings.is_empty() {
        writeln!(out, "{}", "(no strings)".note_style())?;
        return Ok(());
    }
    writeln!(out, "{}", "Strings".heading_style())?;
    for entry in world.strings.iter() {
        writeln!(
            out,
            "{:<24} {:>6}/{:<6} \"{}\"",
            shown(entry.name()).name_style(),
            entry.length(),
            entry.allocated_length(),
            shown(entry.value()).value_style()
        )?;
    }
    Ok(())
}

/// Report table memory use.
///
/// # Errors
/// - if writing to `out` fails
pub fn mem_handler(world: &World, out: &mut dyn Write) -> Result<()> {
    let usage = world.strings.memory_usage();
    writeln!(out, "{}", "Memory".heading_style())?;
    writeln!(out, "{} {}", "list".section_style(), usage.list_size)?;
    writeln!(out, "{} {}", "index".section_style(), usage.index_size)?;
    writeln!(out, "{} {}", "strings".section_style(), usage.strings_size)?;
    writeln!(
        out,
        "{} {}",
        "total".section_style(),
        usage.list_size + usage.index_size + usage.strings_size
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(f: impl FnOnce(&mut dyn Write) -> Result<()>) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn copy_reads_a_splice() {
        let mut world = World::new_empty();
        capture(|out| set_handler(&mut world, out, "$src", "abcdef"));
        capture(|out| copy_handler(&mut world, out, "$dst", "$src+2#3"));
        assert_eq!(world.strings.get(b"$dst").unwrap().value(), b"cde");
    }

    #[test]
    fn copy_of_missing_string_stores_empty() {
        let mut world = World::new_empty();
        capture(|out| copy_handler(&mut world, out, "$dst", "$nothing"));
        assert_eq!(world.strings.get(b"$dst").unwrap().value(), b"");
    }

    #[test]
    fn numeric_handlers_round_trip() {
        let mut world = World::new_empty();
        capture(|out| setnum_handler(&mut world, out, "$n", -42));
        assert_eq!(world.strings.get(b"$n").unwrap().value(), b"-42");
        let shown = capture(|out| num_handler(&world, out, "$n"));
        assert!(shown.contains("= -42"));
        let shown = capture(|out| num_handler(&world, out, "$n.length"));
        assert!(shown.contains("= 3"));
    }

    #[test]
    fn inc_and_dec_adjust_length() {
        let mut world = World::new_empty();
        capture(|out| inc_handler(&mut world, out, "$s", "hello"));
        capture(|out| inc_handler(&mut world, out, "$s", " world"));
        capture(|out| dec_handler(&mut world, out, "$s", 6));
        assert_eq!(world.strings.get(b"$s").unwrap().value(), b"hello");
    }

    #[test]
    fn compare_and_match_report() {
        let mut world = World::new_empty();
        capture(|out| set_handler(&mut world, out, "$a", "Apple"));
        capture(|out| set_handler(&mut world, out, "$b", "apple pie"));
        assert!(capture(|out| compare_handler(&world, out, "$a", "$b", false)).contains("<"));
        assert!(capture(|out| match_handler(&world, out, "$a", "a%e")).contains("matches"));
        assert!(capture(|out| match_handler(&world, out, "$a", "b%")).contains("does not match"));
    }

    #[test]
    fn list_shows_names_in_order() {
        let mut world = World::new_empty();
        capture(|out| set_handler(&mut world, out, "$zed", "z"));
        capture(|out| set_handler(&mut world, out, "$alpha", "a"));
        let listing = capture(|out| list_handler(&world, out));
        let alpha = listing.find("$alpha").unwrap();
        let zed = listing.find("$zed").unwrap();
        assert!(alpha < zed);
    }

    #[test]
    fn writes_to_mirrors_are_refused() {
        let mut world = World::new_empty();
        let shown = capture(|out| set_handler(&mut world, out, "board_name", "x"));
        assert!(shown.contains("no string changed"));
        assert!(world.strings.get(b"board_name").is_none());
    }
}
