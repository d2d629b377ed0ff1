//! Stored string entries and their buffer allocation rules.
//!
//! An entry keeps two lengths: the logical `length` visible to scripts and the
//! physical `allocated_length` of its buffer. Buffers only ever grow; shrinking
//! a string just lowers `length` so the capacity can be reused by later writes.

use thiserror::Error;

pub use strand_data::{MAX_NAME_LEN, MAX_STRING_LEN};

/// Fill byte for string regions that become visible before anything is written to them.
pub const PAD_BYTE: u8 = b' ';

/// A string buffer could not be grown.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unable to allocate {requested} bytes for a string buffer")]
pub struct CapacityError {
    pub requested: usize,
}

/// A named, variable-length byte string owned by a [`StringTable`](crate::table::StringTable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringEntry {
    name: Vec<u8>,
    // value.len() is the allocated length
    value: Vec<u8>,
    length: usize,
}

impl StringEntry {
    /// Allocate an entry of `length` pad bytes. Oversized requests are clamped.
    pub(crate) fn with_length(name: &[u8], length: usize) -> Result<Self, CapacityError> {
        let length = clamp_length(length);
        let mut value = Vec::new();
        value.try_reserve_exact(length).map_err(|_| CapacityError { requested: length })?;
        value.resize(length, PAD_BYTE);
        Ok(Self {
            name: name.to_vec(),
            value,
            length,
        })
    }

    /// Rebuild an entry from persisted parts, trusting the caller's validation.
    pub(crate) fn from_parts(name: Vec<u8>, mut value: Vec<u8>) -> Self {
        value.truncate(MAX_STRING_LEN);
        let length = value.len();
        Self { name, value, length }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// The logical bytes of the string.
    pub fn value(&self) -> &[u8] {
        &self.value[..self.length]
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn allocated_length(&self) -> usize {
        self.value.len()
    }

    /// Approximate heap and record size of this entry.
    pub fn footprint(&self) -> usize {
        std::mem::size_of::<Self>() + self.name.len() + self.value.len()
    }

    /// Whole physical buffer, including bytes past the logical end.
    pub(crate) fn buffer(&self) -> &[u8] {
        &self.value
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.value
    }

    pub(crate) fn set_length(&mut self, length: usize) {
        debug_assert!(length <= self.value.len(), "length {length} past allocation {}", self.value.len());
        self.length = length.min(self.value.len());
    }

    /// Grow the physical buffer to `allocated` bytes, padding the new region.
    /// Never shrinks; on failure the entry is untouched.
    pub(crate) fn grow_to(&mut self, allocated: usize) -> Result<(), CapacityError> {
        let current = self.value.len();
        if allocated <= current {
            return Ok(());
        }
        self.value
            .try_reserve_exact(allocated - current)
            .map_err(|_| CapacityError { requested: allocated })?;
        self.value.resize(allocated, PAD_BYTE);
        Ok(())
    }

    /// Pad the bytes between the logical end and `length` (bounded by the allocation).
    pub(crate) fn pad_to(&mut self, length: usize) {
        let end = length.min(self.value.len());
        if end > self.length {
            self.value[self.length..end].fill(PAD_BYTE);
        }
    }
}

/// Bound a requested string length to [`MAX_STRING_LEN`].
pub(crate) fn clamp_length(length: usize) -> usize {
    length.min(MAX_STRING_LEN)
}

/// Next power of two strictly above the highest set bit of `required`,
/// used to amortise repeated one-byte extensions.
pub(crate) fn pow2_capacity(required: usize) -> usize {
    if required == 0 {
        return 0;
    }
    let bits = usize::BITS - required.leading_zeros();
    1usize.checked_shl(bits).unwrap_or(usize::MAX)
}
