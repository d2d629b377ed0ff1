//! The string engine session.
//!
//! A [`World`] owns one string table and everything the engine consults while
//! running scripts against it: the format version of the world being played,
//! the open `fread`/`fwrite` targets, and the board, program and palette
//! collaborators. Engine operations take it explicitly; there is no global
//! state.

use anyhow::{Context, Result};
use log::info;

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::STRAND_VERSION;
use crate::config::EngineConfig;
use crate::host::{BoardState, InputSource, PaletteSink, ProgramStore};
use crate::table::{LookupMode, StringTable};
use crate::version::FormatVersion;

/// Complete state of one string engine session.
pub struct World {
    pub strings: StringTable,
    pub version: FormatVersion,
    pub fread_delimiter: u8,
    pub fwrite_delimiter: u8,
    pub input: Option<InputSource>,
    pub output: Option<Box<dyn Write>>,
    pub board: Option<Box<dyn BoardState>>,
    pub programs: Option<Box<dyn ProgramStore>>,
    pub palette: Option<Box<dyn PaletteSink>>,
    pub mod_name: Vec<u8>,
}

impl World {
    /// Create an empty session for the current format version.
    pub fn new_empty() -> World {
        let world = Self::with_version(FormatVersion::CURRENT, LookupMode::default());
        info!("new, empty 'World' created (strand {STRAND_VERSION})");
        world
    }

    /// Create an empty session set up from configuration.
    pub fn from_config(config: &EngineConfig) -> World {
        let mut world = Self::with_version(config.format_version, config.lookup);
        world.fread_delimiter = config.fread_delimiter.0;
        world.fwrite_delimiter = config.fwrite_delimiter.0;
        if let Some(board) = &config.board {
            world.board = Some(Box::new(board.clone()));
        }
        if let Some(mod_name) = &config.mod_name {
            world.mod_name = mod_name.as_bytes().to_vec();
        }
        info!(
            "'World' created from configuration (format {}, {:?} lookup)",
            world.version, config.lookup
        );
        world
    }

    fn with_version(version: FormatVersion, lookup: LookupMode) -> World {
        Self {
            strings: StringTable::new(lookup),
            version,
            fread_delimiter: b'*',
            fwrite_delimiter: b'*',
            input: None,
            output: None,
            board: None,
            programs: None,
            palette: None,
            mod_name: Vec::new(),
        }
    }

    /// Open `path` as the `fread` source, replacing any open input.
    ///
    /// # Errors
    /// - if the path cannot be opened
    pub fn open_input(&mut self, path: &Path) -> Result<()> {
        let source = if path.is_dir() {
            InputSource::open_directory(path)?
        } else {
            InputSource::open_file(path)?
        };
        self.input = Some(source);
        Ok(())
    }

    /// Create (or truncate) `path` as the `fwrite` target.
    ///
    /// # Errors
    /// - if the file cannot be created
    pub fn open_output(&mut self, path: &Path) -> Result<()> {
        self.close_output()?;
        let file = File::create(path).with_context(|| format!("opening '{}' for output", path.display()))?;
        self.output = Some(Box::new(BufWriter::new(file)));
        info!("opened '{}' for output", path.display());
        Ok(())
    }

    pub fn close_input(&mut self) {
        if self.input.take().is_some() {
            info!("input closed");
        }
    }

    /// Flush and drop the `fwrite` target.
    ///
    /// # Errors
    /// - if buffered output cannot be flushed
    pub fn close_output(&mut self) -> Result<()> {
        if let Some(mut output) = self.output.take() {
            output.flush().context("flushing output before close")?;
            info!("output closed");
        }
        Ok(())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::with_version(FormatVersion::CURRENT, LookupMode::default())
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("strings", &self.strings.len())
            .field("version", &self.version)
            .field("input", &self.input)
            .field("output", &self.output.is_some())
            .field("board", &self.board.is_some())
            .field("programs", &self.programs.is_some())
            .field("palette", &self.palette.is_some())
            .field("mod_name", &String::from_utf8_lossy(&self.mod_name))
            .finish_non_exhaustive()
    }
}
