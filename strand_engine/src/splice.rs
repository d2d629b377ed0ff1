//! Splice suffixes and the buffer primitives built on them.
//!
//! A string name may carry a `+offset` and/or `#size` suffix (in either
//! order) to address a byte range of the string. Parsing strips the suffixes
//! from the caller's name buffer so the caller is left holding the real name.

use crate::entry::{StringEntry, clamp_length};
use crate::error::{StringError, StringResult};
use crate::numeric::{long_to_int, parse_long_prefix, parse_ulong_prefix};
use crate::table::{EntryId, Lookup, StringTable};
use crate::version::FormatVersion;

/// Offset and size parsed from a name's splice suffixes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpliceSpec {
    pub offset: i32,
    pub offset_specified: bool,
    pub size: usize,
    pub size_specified: bool,
}

impl SpliceSpec {
    pub fn is_splice(&self) -> bool {
        self.offset_specified || self.size_specified
    }

    /// Reject negative offsets for worlds that predate them.
    pub(crate) fn check_version(&self, version: FormatVersion) -> StringResult<()> {
        if self.offset < 0 && !version.allows_negative_indexing() {
            return Err(StringError::Unsupported(version));
        }
        Ok(())
    }
}

/// A byte range of a stored entry.
///
/// Unlike a borrowed slice, a span can be handed to a write on the same table,
/// including a write to the very entry it points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub entry: EntryId,
    pub offset: usize,
    pub len: usize,
}

/// Strip and parse the `+offset` / `#size` suffixes of `name`.
///
/// The name is truncated at the first suffix marker even when parsing fails.
///
/// # Errors
/// - [`StringError::Format`] if a suffix holds anything but a number
pub fn parse_splice(name: &mut Vec<u8>) -> StringResult<SpliceSpec> {
    let plus = name.iter().position(|b| *b == b'+');
    let hash = name.iter().position(|b| *b == b'#');
    let Some(cut) = [plus, hash].into_iter().flatten().min() else {
        return Ok(SpliceSpec::default());
    };

    // each suffix runs up to the other marker, or to the end of the name
    let segment = |start: usize| {
        let end = [plus, hash]
            .into_iter()
            .flatten()
            .find(|pos| *pos > start)
            .unwrap_or(name.len());
        &name[start + 1..end]
    };

    let mut spec = SpliceSpec::default();
    let mut result = Ok(());

    if let Some(pos) = hash {
        let text = segment(pos);
        let (value, used) = parse_ulong_prefix(text);
        if used == text.len() {
            spec.size = usize::try_from(value).unwrap_or(usize::MAX);
            spec.size_specified = true;
        } else {
            result = Err(StringError::Format);
        }
    }

    if result.is_ok()
        && let Some(pos) = plus
    {
        let text = segment(pos);
        let (value, used) = parse_long_prefix(text);
        if used == text.len() {
            spec.offset = long_to_int(value);
            spec.offset_specified = true;
        } else {
            result = Err(StringError::Format);
        }
    }

    name.truncate(cut);
    result.map(|()| spec)
}

/// Turn a possibly negative offset into an absolute one.
///
/// Negative offsets count back from the end of an existing string.
pub(crate) fn resolve_offset(offset: i32, existing: Option<&StringEntry>) -> StringResult<usize> {
    if offset >= 0 {
        return Ok(offset as usize);
    }
    let entry = existing.ok_or(StringError::Bounds)?;
    let back = offset.unsigned_abs() as usize;
    entry.length().checked_sub(back).ok_or(StringError::Bounds)
}

/// Clamp a read splice to the string: `(offset, size)` within `length`.
pub(crate) fn clamp_read(length: usize, offset: usize, spec: &SpliceSpec) -> (usize, usize) {
    let mut size = spec.size;
    if (size == 0 && !spec.size_specified) || size > length {
        size = length;
    }
    let offset = offset.min(length);
    if offset + size > length {
        size = length - offset;
    }
    (offset, size)
}

/// Where a splice write lands, resolved against the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Target {
    pub offset: usize,
    pub offset_specified: bool,
    pub size: usize,
    pub size_specified: bool,
}

impl Target {
    pub fn new(offset: usize, spec: &SpliceSpec) -> Self {
        Self {
            offset,
            offset_specified: spec.offset_specified,
            size: spec.size,
            size_specified: spec.size_specified,
        }
    }

    /// Whole-string write with no suffixes.
    pub fn whole() -> Self {
        Self {
            offset: 0,
            offset_specified: false,
            size: 0,
            size_specified: false,
        }
    }
}

impl StringTable {
    /// Make sure `name` exists and can hold `length` bytes.
    ///
    /// Missing entries are created with `length` pad bytes. Existing entries
    /// grow if needed, and any bytes between their logical end and `length`
    /// are re-padded; their logical length is left alone.
    pub(crate) fn ensure_length(&mut self, name: &[u8], lookup: Lookup, length: usize) -> StringResult<EntryId> {
        let length = clamp_length(length);
        match lookup.entry {
            None => Ok(self.insert_at(name, length, lookup.slot)?),
            Some(id) => {
                let entry = self.entry_mut(id);
                entry.grow_to(length)?;
                entry.pad_to(length);
                Ok(id)
            },
        }
    }

    /// Size the destination of a splice write whose source is `source_len` bytes.
    ///
    /// Returns the entry and the number of bytes to write. Whole-string writes
    /// set the length to the written size; spliced writes only ever extend it.
    pub(crate) fn splice_bounds(
        &mut self,
        name: &[u8],
        lookup: Lookup,
        source_len: usize,
        target: &Target,
    ) -> StringResult<(EntryId, usize)> {
        let source_len = clamp_length(source_len);
        let id = self.ensure_length(name, lookup, source_len)?;

        let mut size = target.size;
        if (size == 0 && !target.size_specified) || size > source_len {
            size = source_len;
        }

        let offset = target.offset;
        let end = offset.saturating_add(size);
        let length = self.entry(id).length();
        if end > length {
            let end = clamp_length(end);
            let existing = Lookup {
                entry: Some(id),
                slot: lookup.slot,
            };
            self.ensure_length(name, existing, end)?;
            self.entry_mut(id).set_length(end);
        } else if offset == 0 && !target.offset_specified {
            self.entry_mut(id).set_length(end);
        }
        Ok((id, size))
    }

    /// Overwrite a (possibly new) string or splice with external bytes.
    pub(crate) fn copy_bytes(&mut self, name: &[u8], lookup: Lookup, target: &Target, src: &[u8]) -> StringResult<EntryId> {
        let (id, size) = self.splice_bounds(name, lookup, src.len(), target)?;
        let entry = self.entry_mut(id);
        if let Some(end) = fits(entry, target.offset, size) {
            entry.buffer_mut()[target.offset..end].copy_from_slice(&src[..size]);
        }
        Ok(id)
    }

    /// Overwrite a string or splice with bytes taken from this table.
    ///
    /// The source may lie inside the destination itself; it is re-resolved
    /// after the destination has been resized.
    pub(crate) fn move_bytes(&mut self, name: &[u8], lookup: Lookup, target: &Target, src: Span) -> StringResult<EntryId> {
        if lookup.entry != Some(src.entry) {
            let bytes = self.span_bytes(src).to_vec();
            return self.copy_bytes(name, lookup, target, &bytes);
        }

        let src = self.clamp_span(src);
        let (id, size) = self.splice_bounds(name, lookup, src.len, target)?;
        let entry = self.entry_mut(id);
        if fits(entry, target.offset, size).is_some() {
            entry
                .buffer_mut()
                .copy_within(src.offset..src.offset + size, target.offset);
        }
        Ok(id)
    }

    /// Bytes named by `span`; empty if the span no longer fits the buffer.
    pub fn span_bytes(&self, span: Span) -> &[u8] {
        self.entry(span.entry)
            .buffer()
            .get(span.offset..span.offset.saturating_add(span.len))
            .unwrap_or_default()
    }

    /// `span`, or an empty span at the start of its entry if it has gone stale.
    pub(crate) fn clamp_span(&self, span: Span) -> Span {
        let end = span.offset.saturating_add(span.len);
        if end <= self.entry(span.entry).allocated_length() {
            span
        } else {
            Span {
                entry: span.entry,
                offset: 0,
                len: 0,
            }
        }
    }
}

/// End of `offset..offset + size` if it lies within the logical string.
fn fits(entry: &StringEntry, offset: usize, size: usize) -> Option<usize> {
    let end = offset.checked_add(size)?;
    (end <= entry.length()).then_some(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> (StringResult<SpliceSpec>, String) {
        let mut buffer = name.as_bytes().to_vec();
        let result = parse_splice(&mut buffer);
        (result, String::from_utf8(buffer).unwrap())
    }

    fn write(table: &mut StringTable, name: &str, target: Target, src: &[u8]) -> EntryId {
        let lookup = table.find(name.as_bytes());
        table.copy_bytes(name.as_bytes(), lookup, &target, src).unwrap()
    }

    fn at(offset: usize, size: Option<usize>) -> Target {
        Target {
            offset,
            offset_specified: true,
            size: size.unwrap_or(0),
            size_specified: size.is_some(),
        }
    }

    #[test]
    fn plain_names_have_no_splice() {
        let (spec, name) = parse("score");
        assert_eq!(spec.unwrap(), SpliceSpec::default());
        assert_eq!(name, "score");
    }

    #[test]
    fn suffixes_parse_in_either_order() {
        let (spec, name) = parse("buf+2#3");
        let spec = spec.unwrap();
        assert_eq!(name, "buf");
        assert_eq!((spec.offset, spec.size), (2, 3));
        assert!(spec.offset_specified && spec.size_specified);

        let (spec, name) = parse("buf#3+2");
        let spec = spec.unwrap();
        assert_eq!(name, "buf");
        assert_eq!((spec.offset, spec.size), (2, 3));
    }

    #[test]
    fn negative_offset_and_empty_suffix() {
        let (spec, _) = parse("s+-2");
        assert_eq!(spec.unwrap().offset, -2);

        let (spec, name) = parse("s#");
        let spec = spec.unwrap();
        assert_eq!(name, "s");
        assert!(spec.size_specified);
        assert_eq!(spec.size, 0);
    }

    #[test]
    fn garbage_suffix_is_a_format_error_but_still_strips() {
        let (spec, name) = parse("s+x");
        assert_eq!(spec, Err(StringError::Format));
        assert_eq!(name, "s");

        let (spec, _) = parse("s#1#2");
        assert_eq!(spec, Err(StringError::Format));
    }

    #[test]
    fn negative_offsets_need_an_existing_string() {
        let entry = StringEntry::from_parts(b"s".to_vec(), b"hello".to_vec());
        assert_eq!(resolve_offset(-2, Some(&entry)), Ok(3));
        assert_eq!(resolve_offset(-6, Some(&entry)), Err(StringError::Bounds));
        assert_eq!(resolve_offset(-1, None), Err(StringError::Bounds));
        assert_eq!(resolve_offset(4, None), Ok(4));
    }

    #[test]
    fn negative_offsets_are_gated_by_version() {
        let spec = SpliceSpec {
            offset: -1,
            offset_specified: true,
            ..SpliceSpec::default()
        };
        assert!(spec.check_version(FormatVersion::V291).is_ok());
        assert_eq!(
            spec.check_version(FormatVersion::V290),
            Err(StringError::Unsupported(FormatVersion::V290))
        );
    }

    #[test]
    fn whole_writes_replace_length() {
        let mut table = StringTable::default();
        let id = write(&mut table, "s", Target::whole(), b"hello world");
        write(&mut table, "s", Target::whole(), b"hi");
        assert_eq!(table.entry(id).value(), b"hi");
        assert_eq!(table.entry(id).allocated_length(), 11);
    }

    #[test]
    fn splice_write_past_end_extends_with_padding() {
        let mut table = StringTable::default();
        let id = write(&mut table, "s", Target::whole(), b"abc");
        write(&mut table, "s", at(6, None), b"xy");
        assert_eq!(table.entry(id).value(), b"abc   xy");
    }

    #[test]
    fn splice_write_inside_keeps_length() {
        let mut table = StringTable::default();
        let id = write(&mut table, "s", Target::whole(), b"HELLO");
        write(&mut table, "s", at(2, Some(3)), b"XYZ");
        assert_eq!(table.entry(id).value(), b"HEXYZ");
        write(&mut table, "s", at(0, Some(1)), b"J");
        assert_eq!(table.entry(id).value(), b"JEXYZ");
    }

    #[test]
    fn size_is_clamped_to_source() {
        let mut table = StringTable::default();
        let id = write(&mut table, "s", Target::whole(), b"0123456789");
        write(&mut table, "s", at(1, Some(50)), b"ab");
        assert_eq!(table.entry(id).value(), b"0ab3456789");
    }

    #[test]
    fn size_only_write_truncates_to_size() {
        let mut table = StringTable::default();
        let target = Target {
            size: 3,
            size_specified: true,
            ..Target::whole()
        };
        let id = write(&mut table, "s", target, b"abcdef");
        assert_eq!(table.entry(id).value(), b"abc");
    }

    #[test]
    fn move_from_own_prefix_into_extension() {
        let mut table = StringTable::default();
        let id = write(&mut table, "s", Target::whole(), b"abcd");
        let lookup = table.find(b"s");
        let src = Span {
            entry: id,
            offset: 0,
            len: 4,
        };
        table.move_bytes(b"s", lookup, &at(2, None), src).unwrap();
        assert_eq!(table.entry(id).value(), b"ababcd");
    }

    #[test]
    fn move_from_other_entry_copies() {
        let mut table = StringTable::default();
        let a = write(&mut table, "a", Target::whole(), b"source");
        let src = Span {
            entry: a,
            offset: 1,
            len: 3,
        };
        let lookup = table.find(b"b");
        let b = table.move_bytes(b"b", lookup, &Target::whole(), src).unwrap();
        assert_eq!(table.entry(b).value(), b"our");
        assert_eq!(table.entry(a).value(), b"source");
    }

    #[test]
    fn read_clamping() {
        let spec = SpliceSpec {
            size: 10,
            size_specified: true,
            ..SpliceSpec::default()
        };
        assert_eq!(clamp_read(5, 3, &spec), (3, 2));
        assert_eq!(clamp_read(5, 9, &SpliceSpec::default()), (5, 0));
        assert_eq!(clamp_read(5, 0, &SpliceSpec::default()), (0, 5));
    }
}
