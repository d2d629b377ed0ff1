//! Collaborators the string engine talks to but does not own.
//!
//! Magic request words reach outside the string table: files, the current
//! board, robot programs, the palette. Each of those is a trait here so the
//! engine can be driven by a real game, the console, or a test fixture.

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use crate::version::FormatVersion;

/// Identifier of the script context (robot) issuing a request.
pub type ContextId = i32;

/// A seekable byte stream used as a `fread` source.
pub trait InputStream: Read + Seek {}

impl<T: Read + Seek> InputStream for T {}

/// Bytes left between the current position and the end of `stream`.
///
/// # Errors
/// - if the stream cannot report or restore its position
pub fn remaining_bytes(stream: &mut dyn InputStream) -> io::Result<u64> {
    let pos = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(pos))?;
    Ok(end.saturating_sub(pos))
}

/// Whatever is currently open for `fread`.
pub enum InputSource {
    File(Box<dyn InputStream>),
    Directory(Box<dyn Iterator<Item = Vec<u8>>>),
}

impl InputSource {
    /// Open a file for reading.
    ///
    /// # Errors
    /// - if the file cannot be opened
    pub fn open_file(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening '{}' for input", path.display()))?;
        info!("opened '{}' for input", path.display());
        Ok(Self::File(Box::new(BufReader::new(file))))
    }

    /// Open a directory listing; each `fread` then yields one entry name.
    ///
    /// # Errors
    /// - if the directory cannot be read
    pub fn open_directory(path: &Path) -> Result<Self> {
        let listing =
            fs::read_dir(path).with_context(|| format!("opening directory '{}' for input", path.display()))?;
        let mut names: Vec<Vec<u8>> = listing
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.file_name().into_encoded_bytes())
            .collect();
        names.sort();
        info!("opened directory '{}' ({} entries)", path.display(), names.len());
        Ok(Self::Directory(Box::new(names.into_iter())))
    }

    /// In-memory file contents.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::File(Box::new(Cursor::new(bytes)))
    }

    /// In-memory directory listing, in the given order.
    pub fn from_names<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Vec<u8>>,
    {
        let names: Vec<Vec<u8>> = names.into_iter().map(Into::into).collect();
        Self::Directory(Box::new(names.into_iter()))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(_) => f.write_str("InputSource::File"),
            Self::Directory(_) => f.write_str("InputSource::Directory"),
        }
    }
}

/// Read access to the board a script runs on.
pub trait BoardState {
    fn board_name(&self) -> &[u8];
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// One parameter byte per board cell, row-major.
    fn params(&self) -> &[u8];
    /// The most recent player input line.
    fn input_string(&self) -> &[u8];
    fn robot_name(&self, id: ContextId) -> Option<&[u8]>;
    /// The `(board_x, board_y)` counters of a context.
    fn scan_position(&self, id: ContextId) -> (i32, i32);
}

/// A robot on a [`SimpleBoard`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleRobot {
    pub id: ContextId,
    pub name: String,
    #[serde(default)]
    pub board_x: i32,
    #[serde(default)]
    pub board_y: i32,
}

/// Plain data board, loadable from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleBoard {
    pub name: String,
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub params: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub robots: Vec<SimpleRobot>,
}

impl SimpleBoard {
    fn robot(&self, id: ContextId) -> Option<&SimpleRobot> {
        self.robots.iter().find(|robot| robot.id == id)
    }
}

impl BoardState for SimpleBoard {
    fn board_name(&self) -> &[u8] {
        self.name.as_bytes()
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn params(&self) -> &[u8] {
        self.params.as_bytes()
    }

    fn input_string(&self) -> &[u8] {
        self.input.as_bytes()
    }

    fn robot_name(&self, id: ContextId) -> Option<&[u8]> {
        self.robot(id).map(|robot| robot.name.as_bytes())
    }

    fn scan_position(&self, id: ContextId) -> (i32, i32) {
        self.robot(id).map_or((0, 0), |robot| (robot.board_x, robot.board_y))
    }
}

/// Robot program storage.
pub trait ProgramStore {
    /// Replace the program source of robot `id`. Returns false if the robot
    /// doesn't exist or the source was refused.
    fn install_source(&mut self, id: ContextId, source: &[u8], version: FormatVersion) -> bool;
    fn source(&self, id: ContextId) -> Option<Vec<u8>>;
    fn contains(&self, id: ContextId) -> bool;
}

/// Program sources kept in memory, keyed by robot id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPrograms {
    programs: BTreeMap<ContextId, Vec<u8>>,
}

impl MemoryPrograms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a robot with an initial program.
    pub fn with_robot(mut self, id: ContextId, source: &[u8]) -> Self {
        self.programs.insert(id, source.to_vec());
        self
    }
}

impl ProgramStore for MemoryPrograms {
    fn install_source(&mut self, id: ContextId, source: &[u8], _version: FormatVersion) -> bool {
        match self.programs.get_mut(&id) {
            Some(program) => {
                program.clear();
                program.extend_from_slice(source);
                true
            },
            None => false,
        }
    }

    fn source(&self, id: ContextId) -> Option<Vec<u8>> {
        self.programs.get(&id).cloned()
    }

    fn contains(&self, id: ContextId) -> bool {
        self.programs.contains_key(&id)
    }
}

/// Receiver for `smzx_indices` pushes.
pub trait PaletteSink {
    fn load_indices(&mut self, indices: &[u8]);
}

/// Palette sink that remembers what it was sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingPalette {
    pub last: Option<Vec<u8>>,
    pub pushes: usize,
}

impl PaletteSink for RecordingPalette {
    fn load_indices(&mut self, indices: &[u8]) {
        self.last = Some(indices.to_vec());
        self.pushes += 1;
    }
}
