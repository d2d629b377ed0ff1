//! The string symbol table.
//!
//! Entries live in an arena addressed by [`EntryId`]; a separate ordered array
//! keeps them sorted by case-insensitive name so lookups can binary search and
//! iteration (and therefore save order) is deterministic. A pluggable
//! [`NameIndex`] decides how names are found: plain binary search over the
//! ordered array, or a hash index that only falls back to the ordered array to
//! compute insertion points.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use log::info;
use serde::{Deserialize, Serialize};

use crate::entry::{CapacityError, StringEntry};

/// Initial slot count of the ordered array once the first entry is added.
pub const MIN_TABLE_ALLOCATE: usize = 4;

/// Hard cap on the number of entries in one table.
pub const MAX_TABLE_ENTRIES: usize = i32::MAX as usize;

/// Stable handle to an entry, valid until the table is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

/// Result of a name lookup.
///
/// When the name is absent, `slot` is where a new entry must be inserted to
/// keep the ordered array sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    pub entry: Option<EntryId>,
    pub slot: usize,
}

/// How a table resolves names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
    #[default]
    Sorted,
    Hashed,
}

/// Case-insensitive (ASCII) name ordering used by every table.
pub fn compare_names(a: &[u8], b: &[u8]) -> Ordering {
    a.iter()
        .map(u8::to_ascii_lowercase)
        .cmp(b.iter().map(u8::to_ascii_lowercase))
}

/// Lookup strategy for a [`StringTable`].
pub trait NameIndex: fmt::Debug {
    fn mode(&self) -> LookupMode;
    fn find(&self, name: &[u8], order: &[EntryId], entries: &[StringEntry]) -> Lookup;
    /// Called for every entry added to the table, in any position.
    fn record(&mut self, name: &[u8], id: EntryId);
    fn clear(&mut self);
    /// Bytes held by the index itself.
    fn footprint(&self) -> usize;
}

fn binary_search(name: &[u8], order: &[EntryId], entries: &[StringEntry]) -> Lookup {
    match order.binary_search_by(|id| compare_names(entries[id.0].name(), name)) {
        Ok(pos) => Lookup {
            entry: Some(order[pos]),
            slot: pos,
        },
        Err(slot) => Lookup { entry: None, slot },
    }
}

/// Binary search over the ordered array; holds no state of its own.
#[derive(Debug, Default)]
pub struct SortedIndex;

impl NameIndex for SortedIndex {
    fn mode(&self) -> LookupMode {
        LookupMode::Sorted
    }

    fn find(&self, name: &[u8], order: &[EntryId], entries: &[StringEntry]) -> Lookup {
        binary_search(name, order, entries)
    }

    fn record(&mut self, _name: &[u8], _id: EntryId) {}

    fn clear(&mut self) {}

    fn footprint(&self) -> usize {
        0
    }
}

/// Hash index keyed by the ASCII-lowercased name.
#[derive(Debug, Default)]
pub struct HashedIndex {
    map: HashMap<Vec<u8>, EntryId>,
}

impl NameIndex for HashedIndex {
    fn mode(&self) -> LookupMode {
        LookupMode::Hashed
    }

    fn find(&self, name: &[u8], order: &[EntryId], entries: &[StringEntry]) -> Lookup {
        match self.map.get(&name.to_ascii_lowercase()) {
            Some(id) => Lookup {
                entry: Some(*id),
                slot: order.len(),
            },
            None => binary_search(name, order, entries),
        }
    }

    fn record(&mut self, name: &[u8], id: EntryId) {
        self.map.insert(name.to_ascii_lowercase(), id);
    }

    fn clear(&mut self) {
        self.map = HashMap::new();
    }

    fn footprint(&self) -> usize {
        let buckets = self.map.capacity() * std::mem::size_of::<(Vec<u8>, EntryId)>();
        buckets + self.map.keys().map(Vec::len).sum::<usize>()
    }
}

/// Memory held by a table, split the way the editor reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// The ordered array of entry handles.
    pub list_size: usize,
    /// The lookup index.
    pub index_size: usize,
    /// Entry records, names and value buffers.
    pub strings_size: usize,
}

/// Sorted table of named strings.
#[derive(Debug)]
pub struct StringTable {
    entries: Vec<StringEntry>,
    order: Vec<EntryId>,
    index: Box<dyn NameIndex>,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new(LookupMode::default())
    }
}

impl StringTable {
    pub fn new(mode: LookupMode) -> Self {
        let index: Box<dyn NameIndex> = match mode {
            LookupMode::Sorted => Box::new(SortedIndex),
            LookupMode::Hashed => Box::<HashedIndex>::default(),
        };
        Self::with_index(index)
    }

    pub fn with_index(index: Box<dyn NameIndex>) -> Self {
        Self {
            entries: Vec::new(),
            order: Vec::new(),
            index,
        }
    }

    pub fn mode(&self) -> LookupMode {
        self.index.mode()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Find `name` (case-insensitive) and the slot it would be inserted at.
    pub fn find(&self, name: &[u8]) -> Lookup {
        self.index.find(name, &self.order, &self.entries)
    }

    /// Convenience lookup of a whole entry by name.
    pub fn get(&self, name: &[u8]) -> Option<&StringEntry> {
        self.find(name).entry.map(|id| self.entry(id))
    }

    pub fn entry(&self, id: EntryId) -> &StringEntry {
        &self.entries[id.0]
    }

    pub fn entry_mut(&mut self, id: EntryId) -> &mut StringEntry {
        &mut self.entries[id.0]
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &StringEntry> {
        self.order.iter().map(|id| &self.entries[id.0])
    }

    /// Create `name` with `length` pad bytes at ordered position `slot`.
    ///
    /// # Errors
    /// - if the entry or the table arrays cannot be allocated
    /// - if the table already holds [`MAX_TABLE_ENTRIES`] entries
    pub fn insert_at(&mut self, name: &[u8], length: usize, slot: usize) -> Result<EntryId, CapacityError> {
        debug_assert!(slot <= self.order.len(), "insertion slot {slot} out of range");
        let entry = StringEntry::with_length(name, length)?;
        let id = self.push_entry(entry)?;
        self.order.insert(slot.min(self.order.len()), id);
        Ok(id)
    }

    /// Append an entry without looking up its position, for bulk loading.
    /// [`sort`](Self::sort) must be called once loading is complete.
    ///
    /// # Errors
    /// - if the table arrays cannot be grown
    pub fn load_raw(&mut self, name: Vec<u8>, value: Vec<u8>) -> Result<EntryId, CapacityError> {
        let id = self.push_entry(StringEntry::from_parts(name, value))?;
        self.order.push(id);
        Ok(id)
    }

    /// Restore name order after raw loading.
    pub fn sort(&mut self) {
        let entries = &self.entries;
        self.order
            .sort_by(|a, b| compare_names(entries[a.0].name(), entries[b.0].name()));
    }

    /// Drop every entry and reset the index.
    pub fn clear(&mut self) {
        if !self.order.is_empty() {
            info!("clearing string table ({} entries)", self.order.len());
        }
        self.entries = Vec::new();
        self.order = Vec::new();
        self.index.clear();
    }

    pub fn memory_usage(&self) -> MemoryUsage {
        MemoryUsage {
            list_size: self.order.capacity() * std::mem::size_of::<EntryId>(),
            index_size: self.index.footprint(),
            strings_size: self.entries.iter().map(StringEntry::footprint).sum(),
        }
    }

    fn push_entry(&mut self, entry: StringEntry) -> Result<EntryId, CapacityError> {
        let count = self.order.len();
        if count == self.order.capacity() {
            if count >= MAX_TABLE_ENTRIES {
                return Err(CapacityError { requested: count + 1 });
            }
            let target = if count == 0 { MIN_TABLE_ALLOCATE } else { count * 2 };
            let target = target.min(MAX_TABLE_ENTRIES);
            self.order
                .try_reserve_exact(target - count)
                .map_err(|_| CapacityError { requested: target })?;
            self.entries
                .try_reserve_exact(target.saturating_sub(self.entries.len()))
                .map_err(|_| CapacityError { requested: target })?;
        }

        let id = EntryId(self.entries.len());
        self.index.record(entry.name(), id);
        self.entries.push(entry);
        Ok(id)
    }
}
