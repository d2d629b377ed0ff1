//! REPL and command handling utilities.
//!
//! The console runs in a read-eval-print loop over a single [`World`]. This
//! module and its submodules implement the command handlers that drive the
//! engine's string operations.

mod input;
pub mod strings;
pub mod system;

pub use strings::*;
pub use system::*;

use crate::command::{Command, parse_command};
use crate::host::ContextId;
use crate::save_files::SAVE_DIR;
use crate::style::ConsoleStyle;
use crate::world::World;

use anyhow::Result;
use log::{info, warn};
use std::io::{self, Write};
use std::path::Path;

use input::{InputEvent, InputManager};

/// Robot context used for assignments typed at the console.
pub const CONSOLE_CONTEXT: ContextId = 0;

/// Control flow signal used by handlers to exit the REPL.
pub enum ReplControl {
    Continue,
    Quit,
}

/// Run the console loop until the user quits.
///
/// # Errors
/// - if console input fails or output cannot be written
pub fn run_repl(world: &mut World) -> Result<()> {
    let mut input_manager = InputManager::new(&world.mod_name);
    let stdout = io::stdout();
    let mut command_count = 0_usize;
    loop {
        let prompt = format!("\n[{}|strings: {}]>> ", world.version, world.strings.len())
            .prompt_style()
            .to_string();

        let input = match input_manager.read_line(&prompt)? {
            InputEvent::Line(line) => line,
            InputEvent::Eof => "quit".to_string(),
            InputEvent::Interrupted => {
                println!("{}", "Command canceled.".note_style());
                continue;
            },
        };
        if input.trim().is_empty() {
            continue;
        }

        command_count += 1;
        info!("command {command_count}: {}", input.trim());
        let mut out = stdout.lock();
        let command = parse_command(&input);
        if let ReplControl::Quit = dispatch(world, &mut out, command, Path::new(SAVE_DIR))? {
            break;
        }
        out.flush()?;
    }
    Ok(())
}

/// Route one parsed command to its handler.
///
/// # Errors
/// - if writing to `out` fails
pub fn dispatch(world: &mut World, out: &mut dyn Write, command: Command, save_dir: &Path) -> Result<ReplControl> {
    #[allow(clippy::enum_glob_use)]
    use Command::*;
    match command {
        Set { name, value } => set_handler(world, out, &name, &value)?,
        Copy { dest, source } => copy_handler(world, out, &dest, &source)?,
        Get(name) => get_handler(world, out, &name)?,
        Inc { name, value } => inc_handler(world, out, &name, &value)?,
        Dec { name, count } => dec_handler(world, out, &name, count)?,
        Num(name) => num_handler(world, out, &name)?,
        SetNum { name, value } => setnum_handler(world, out, &name, value)?,
        Compare {
            left,
            right,
            exact_case,
        } => compare_handler(world, out, &left, &right, exact_case)?,
        Match { name, pattern } => match_handler(world, out, &name, &pattern)?,
        New { name, length } => new_handler(world, out, &name, length)?,
        List => list_handler(world, out)?,
        Mem => mem_handler(world, out)?,
        Open { slot, path } => open_handler(world, out, slot, Path::new(&path))?,
        Close(slot) => close_handler(world, out, slot)?,
        Save(slot) => save_handler(world, out, save_dir, &slot)?,
        Load(slot) => load_handler(world, out, save_dir, &slot)?,
        ListSaves => list_saves_handler(out, save_dir)?,
        Version(version) => version_handler(world, out, version.as_deref())?,
        Help => help_handler(out)?,
        Quit => return quit_handler(world, out),
        Unknown => {
            warn!("unrecognized console input");
            writeln!(out, "{}", "Unrecognized command. Type 'help' for a list.".error_style())?;
        },
    }
    Ok(ReplControl::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(world: &mut World, line: &str) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        let dir = tempfile::tempdir().unwrap();
        dispatch(world, &mut out, parse_command(line), dir.path()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn set_then_get_through_console() {
        let mut world = World::new_empty();
        run(&mut world, "set $greeting hello there");
        let shown = run(&mut world, "get $greeting");
        assert!(shown.contains("hello there"));
        assert_eq!(world.strings.get(b"$greeting").unwrap().value(), b"hello there");
    }

    #[test]
    fn quit_ends_the_loop() {
        let mut world = World::new_empty();
        let mut out = Vec::new();
        let dir = tempfile::tempdir().unwrap();
        let control = dispatch(&mut world, &mut out, Command::Quit, dir.path()).unwrap();
        assert!(matches!(control, ReplControl::Quit));
    }

    #[test]
    fn unknown_command_reports_error() {
        let mut world = World::new_empty();
        assert!(run(&mut world, "frobnicate").contains("Unrecognized"));
    }
}
