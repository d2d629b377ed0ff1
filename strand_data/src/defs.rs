use serde::{Deserialize, Serialize};

/// Largest logical length a stored string may reach (4 MiB).
pub const MAX_STRING_LEN: usize = 1 << 22;

/// Longest name accepted for a stored string.
pub const MAX_NAME_LEN: usize = 255;

/// A complete string table as written to a save file.
///
/// Records are emitted in table order (case-insensitive by name), but readers
/// must not rely on it: the engine re-sorts after a raw load.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StringTableDef {
    /// Format version of the world that produced the table, e.g. `"2.93"`.
    pub version: String,
    #[serde(default)]
    pub strings: Vec<StringRecord>,
}

/// One stored string: its name and the logical bytes of its value.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StringRecord {
    pub name: Vec<u8>,
    #[serde(default)]
    pub value: Vec<u8>,
}

impl StringRecord {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Name length as stored alongside the record.
    pub fn name_length(&self) -> usize {
        self.name.len()
    }

    /// Value length as stored alongside the record.
    pub fn length(&self) -> usize {
        self.value.len()
    }
}
