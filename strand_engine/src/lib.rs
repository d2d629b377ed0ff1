#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const STRAND_VERSION: &str = env!("CARGO_PKG_VERSION");

// Storage
pub mod entry;
pub mod error;
pub mod splice;
pub mod table;

// String operations
pub mod engine;
pub mod magic;
pub mod numeric;
pub mod version;
pub mod wildcard;

// Session and collaborators
pub mod config;
pub mod host;
pub mod save_files;
pub mod world;

// Console
pub mod command;
pub mod repl;
pub mod style;

// Re-exports for convenience
pub use config::{CONFIG_PATH, EngineConfig, load_config};
pub use engine::{
    SetOutcome, Source, compare_strings, compare_strings_legacy, dec_string_int, get_string, get_string_pointer,
    inc_string, load_string_board, locate_string, new_string, read_as_number, set_string, write_as_number,
};
pub use entry::StringEntry;
pub use error::{StringError, StringResult};
pub use repl::run_repl;
pub use table::{LookupMode, StringTable};
pub use version::FormatVersion;
pub use world::World;
