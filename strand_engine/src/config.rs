//! Engine configuration and its loader.
//!
//! Settings come from a `strand.toml` file. Anything missing takes its
//! default, and an unreadable file means all defaults.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;
use std::fs;
use std::path::Path;

use crate::host::SimpleBoard;
use crate::table::LookupMode;
use crate::version::FormatVersion;

/// Default location of the configuration file, relative to the working directory.
pub const CONFIG_PATH: &str = "strand_engine/data/strand.toml";

/// A single-byte separator for `fread` / `fwrite` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Delimiter(pub u8);

impl Default for Delimiter {
    fn default() -> Self {
        Self(b'*')
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("delimiter must be exactly one byte, got {0:?}")]
pub struct DelimiterError(String);

impl TryFrom<String> for Delimiter {
    type Error = DelimiterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_bytes() {
            [byte] => Ok(Self(*byte)),
            _ => Err(DelimiterError(value)),
        }
    }
}

impl From<Delimiter> for String {
    fn from(value: Delimiter) -> Self {
        char::from(value.0).to_string()
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.0))
    }
}

/// Everything needed to set up a [`World`](crate::world::World).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// World format the scripts were written for; gates version quirks
    pub format_version: FormatVersion,
    /// How names are looked up in the string table
    pub lookup: LookupMode,
    pub fread_delimiter: Delimiter,
    pub fwrite_delimiter: Delimiter,
    /// Board exposed to `board_name`, `board_scan` and friends
    pub board: Option<SimpleBoard>,
    pub mod_name: Option<String>,
}

/// Loads engine configuration from a TOML file, falling back to defaults on error.
///
/// # Logging
/// - `info!` on successful load
/// - `warn!` if the file cannot be read or parsed
pub fn load_config(toml_path: &Path) -> EngineConfig {
    match try_load_config(toml_path) {
        Ok(config) => {
            info!(
                "engine configuration loaded from '{}' (format {}, {:?} lookup)",
                toml_path.display(),
                config.format_version,
                config.lookup
            );
            config
        },
        Err(e) => {
            warn!(
                "Could not load engine configuration from '{}': {:#}. Using defaults.",
                toml_path.display(),
                e
            );
            EngineConfig::default()
        },
    }
}

/// Attempts to load engine configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn try_load_config(toml_path: &Path) -> Result<EngineConfig> {
    let text = fs::read_to_string(toml_path)
        .with_context(|| format!("reading engine configuration from '{}'", toml_path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing engine configuration from '{}'", toml_path.display()))
}
