#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** Strand **
//! Interactive console over the string engine

use strand_engine::host::{MemoryPrograms, RecordingPalette};
use strand_engine::repl::CONSOLE_CONTEXT;
use strand_engine::style::ConsoleStyle;
use strand_engine::{CONFIG_PATH, STRAND_VERSION, World, load_config, run_repl};

use anyhow::Result;
use colored::Colorize;
use log::info;

use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();
    info!("Start: loading engine configuration...");
    let config = load_config(Path::new(CONFIG_PATH));
    let mut world = World::from_config(&config);
    world.programs = Some(Box::new(MemoryPrograms::new().with_robot(CONSOLE_CONTEXT, b"")));
    world.palette = Some(Box::new(RecordingPalette::default()));
    info!("World ready; starting console");

    println!("{}", format!("STRAND {STRAND_VERSION}").bright_yellow().underline());
    println!(
        "{}",
        format!("world format {}, type 'help' for commands", world.version).note_style()
    );

    run_repl(&mut world)?;
    info!("console exited normally");
    Ok(())
}
