//! Script-facing string operations.
//!
//! Every operation here is what a script statement compiles down to, so none
//! of them fail loudly: a bad suffix, an out-of-range index or a full table
//! turns the statement into a no-op (or a zero/empty read) and the reason is
//! logged at `debug!` level. Names are passed as mutable buffers because
//! `+offset` / `#size` suffixes are stripped in place, leaving the caller with
//! the real string name.

use std::cmp::Ordering;

use log::debug;

use crate::entry::{CapacityError, MAX_NAME_LEN, MAX_STRING_LEN, StringEntry, clamp_length, pow2_capacity};
use crate::error::{StringError, StringResult};
use crate::host::ContextId;
use crate::magic::{Destination, MagicRequest, is_reserved_name, perform};
use crate::numeric::{format_int, long_to_int, parse_int, parse_long_prefix, parse_ulong_prefix};
use crate::splice::{Span, Target, clamp_read, parse_splice, resolve_offset};
use crate::table::{EntryId, Lookup, StringTable};
use crate::version::FormatVersion;
use crate::wildcard::wildcard_match;
use crate::world::World;

/// Right-hand side of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source<'a> {
    /// Bytes from outside the table (a literal, an expression result)
    Bytes(&'a [u8]),
    /// Another string, or a splice of one; may be the destination itself
    Stored(Span),
}

impl Source<'_> {
    fn bytes<'t>(&'t self, strings: &'t StringTable) -> &'t [u8] {
        match self {
            Source::Bytes(bytes) => bytes,
            Source::Stored(span) => strings.span_bytes(*span),
        }
    }
}

/// What a [`set_string`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// Nothing in the table changed
    Unchanged,
    /// The destination string was written
    Written,
    /// The calling robot's program was replaced and must restart
    RestartProgram,
}

fn ignored(operation: &str, name: &[u8], err: &StringError) {
    debug!("{operation} '{}' ignored: {err}", String::from_utf8_lossy(name));
}

/// Names that may receive a write. New entries also need a sane name.
fn check_writable(name: &[u8], lookup: &Lookup) -> StringResult<()> {
    if is_reserved_name(name) {
        return Err(StringError::Restricted("write to a read-only mirror"));
    }
    if lookup.entry.is_none() {
        if name.is_empty() {
            return Err(StringError::Restricted("empty string name"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(StringError::Restricted("string name too long"));
        }
    }
    Ok(())
}

/// Read a string or splice. The result borrows the table.
pub fn get_string<'w>(world: &'w World, name: &mut Vec<u8>) -> Option<&'w [u8]> {
    let span = locate_string(world, name)?;
    Some(world.strings.span_bytes(span))
}

/// Resolve a string or splice to a [`Span`], for use as a write source.
pub fn locate_string(world: &World, name: &mut Vec<u8>) -> Option<Span> {
    try_locate(world, name)
        .inspect_err(|e| ignored("read of", name, e))
        .ok()
        .flatten()
}

fn try_locate(world: &World, name: &mut Vec<u8>) -> StringResult<Option<Span>> {
    let spec = parse_splice(name)?;
    let Some(id) = world.strings.find(name).entry else {
        return Ok(None);
    };
    spec.check_version(world.version)?;
    let entry = world.strings.entry(id);
    let offset = resolve_offset(spec.offset, Some(entry))?;
    let (offset, len) = clamp_read(entry.length(), offset, &spec);
    Ok(Some(Span { entry: id, offset, len }))
}

/// Look up a whole string. Suffixes are not interpreted.
pub fn get_string_pointer<'w>(world: &'w World, name: &[u8]) -> Option<&'w StringEntry> {
    world.strings.get(name)
}

/// Assign `source` to a string or splice on behalf of robot `context`.
///
/// Magic request words in `source` are served instead of being stored.
pub fn set_string(world: &mut World, name: &mut Vec<u8>, source: Source<'_>, context: ContextId) -> SetOutcome {
    try_set_string(world, name, source, context).unwrap_or_else(|e| {
        ignored("set", name, &e);
        SetOutcome::Unchanged
    })
}

fn try_set_string(
    world: &mut World,
    name: &mut Vec<u8>,
    source: Source<'_>,
    context: ContextId,
) -> StringResult<SetOutcome> {
    let spec = parse_splice(name)?;
    let lookup = world.strings.find(name);
    check_writable(name, &lookup)?;
    spec.check_version(world.version)?;
    let existing = lookup.entry.map(|id| world.strings.entry(id));
    let target = Target::new(resolve_offset(spec.offset, existing)?, &spec);

    let request = MagicRequest::classify(source.bytes(&world.strings), world);
    if let Some(request) = request {
        let dest = Destination {
            name: name.as_slice(),
            lookup,
            target,
        };
        return perform(world, request, &dest, context);
    }

    match source {
        Source::Bytes(bytes) => world.strings.copy_bytes(name, lookup, &target, bytes)?,
        Source::Stored(span) => world.strings.move_bytes(name, lookup, &target, span)?,
    };
    Ok(SetOutcome::Written)
}

/// Append `source` to a string, creating it if needed. Splices are rejected.
pub fn inc_string(world: &mut World, name: &mut Vec<u8>, source: Source<'_>) {
    if let Err(e) = try_inc_string(world, name, source) {
        ignored("increment of", name, &e);
    }
}

fn try_inc_string(world: &mut World, name: &mut Vec<u8>, source: Source<'_>) -> StringResult<()> {
    let strings = &mut world.strings;
    let lookup = strings.find(name);

    let Some(id) = lookup.entry else {
        let spec = parse_splice(name)?;
        if spec.is_splice() {
            return Err(StringError::Restricted("increment of a splice"));
        }
        check_writable(name, &lookup)?;
        let bytes = source.bytes(strings).to_vec();
        let length = clamp_length(bytes.len());
        let id = strings.insert_at(name, length, lookup.slot)?;
        strings.entry_mut(id).buffer_mut()[..length].copy_from_slice(&bytes[..length]);
        return Ok(());
    };

    let source = match source {
        Source::Stored(span) => Source::Stored(strings.clamp_span(span)),
        bytes => bytes,
    };
    let added = source.bytes(strings).len();
    let old_length = strings.entry(id).length();
    let new_length = old_length + added;
    if new_length > MAX_STRING_LEN {
        return Err(StringError::Capacity(CapacityError { requested: new_length }));
    }

    match source {
        Source::Stored(span) if span.entry == id => {
            let entry = strings.entry_mut(id);
            entry.grow_to(new_length)?;
            entry
                .buffer_mut()
                .copy_within(span.offset..span.offset + span.len, old_length);
        },
        _ => {
            let bytes = source.bytes(strings).to_vec();
            let entry = strings.entry_mut(id);
            entry.grow_to(new_length)?;
            entry.buffer_mut()[old_length..new_length].copy_from_slice(&bytes);
        },
    }
    strings.entry_mut(id).set_length(new_length);
    Ok(())
}

/// Shorten a string by `count` bytes, stopping at empty. Capacity is kept.
pub fn dec_string_int(world: &mut World, name: &[u8], count: i32) {
    let Some(id) = world.strings.find(name).entry else {
        return;
    };
    let Ok(count) = usize::try_from(count) else {
        debug!("decrement of '{}' by {count} ignored", String::from_utf8_lossy(name));
        return;
    };
    let entry = world.strings.entry_mut(id);
    let length = entry.length().saturating_sub(count);
    entry.set_length(length);
}

/// Parse the field after a `.` as `index[#width]`.
///
/// Returns `None` unless the whole field is consumed. Width is clamped to 1..=4.
fn parse_dot_index(field: &[u8]) -> Option<(i32, usize)> {
    if field.is_empty() {
        return None;
    }
    let (index, used) = parse_long_prefix(field);
    let mut rest = &field[used..];
    let mut width = 1;
    if rest.len() >= 2 && rest[0] == b'#' {
        let (requested, used) = parse_ulong_prefix(&rest[1..]);
        // a C int holds the low 32 bits, so "-1" is -1 and clamps to 1
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let requested = requested as u32 as i32;
        width = requested.clamp(1, 4).unsigned_abs() as usize;
        rest = &rest[1 + used..];
    }
    rest.is_empty().then_some((long_to_int(index), width))
}

/// Evaluate a string in a numeric context.
///
/// `name.length` gives the length, `name.N[#W]` reads W little-endian bytes at
/// N, and anything else parses the (possibly spliced) string as an integer.
/// Missing strings and bad indices read as 0. Reads narrower than four bytes
/// are zero-extended, so only a full `#4` read can come back negative.
pub fn read_as_number(world: &World, name: &mut Vec<u8>) -> i32 {
    let Some(dot) = name.iter().skip(1).position(|b| *b == b'.').map(|pos| pos + 1) else {
        return get_string(world, name).map_or(0, parse_int);
    };

    let (base, field) = (&name[..dot], &name[dot + 1..]);
    let Some(entry) = world.strings.get(base) else {
        return 0;
    };
    if field.eq_ignore_ascii_case(b"length") {
        return i32::try_from(entry.length()).unwrap_or(i32::MAX);
    }
    let Some((index, width)) = parse_dot_index(field) else {
        return 0;
    };
    read_index(entry, index, width, world.version)
}

fn read_index(entry: &StringEntry, index: i32, width: usize, version: FormatVersion) -> i32 {
    let (real, width) = if version.allows_negative_indexing() {
        match resolve_offset(index, Some(entry)) {
            Ok(real) => (real, width),
            Err(_) => return 0,
        }
    } else {
        match usize::try_from(index) {
            Ok(real) => (real, 1),
            Err(_) => return 0,
        }
    };

    let length = entry.length();
    if real >= length {
        return 0;
    }
    let width = width.min(length - real);
    let mut bytes = [0u8; 4];
    bytes[..width].copy_from_slice(&entry.value()[real..real + width]);
    i32::from_le_bytes(bytes)
}

/// Store a number into a string.
///
/// `name.length` truncates or extends, `name.N[#W]` writes W little-endian
/// bytes at N (growing capacity by powers of two), and a plain name is set to
/// the decimal text of `value`. Dotted names are truncated at the last dot.
pub fn write_as_number(world: &mut World, name: &mut Vec<u8>, value: i32, context: ContextId) {
    let Some(dot) = name.iter().rposition(|b| *b == b'.').filter(|pos| *pos >= 1) else {
        set_string(world, name, Source::Bytes(&format_int(value)), context);
        return;
    };
    let field = name.split_off(dot);
    if let Err(e) = try_write_number(world, name, &field[1..], value) {
        ignored("numeric write to", name, &e);
    }
}

fn try_write_number(world: &mut World, name: &[u8], field: &[u8], value: i32) -> StringResult<()> {
    let version = world.version;
    let strings = &mut world.strings;
    let lookup = strings.find(name);

    // (index, width) for byte writes, None for length writes
    let (index_write, new_length, requested) = if field.eq_ignore_ascii_case(b"length") {
        let new_length = usize::try_from(value).map_err(|_| StringError::Bounds)?;
        if lookup.entry.is_none() {
            return Err(StringError::Bounds);
        }
        (None, new_length, new_length.saturating_add(1))
    } else {
        let (index, width) = parse_dot_index(field).ok_or(StringError::Format)?;
        if index < 0 && !version.allows_negative_indexing() {
            return Err(StringError::Unsupported(version));
        }
        let existing = lookup.entry.map(|id| strings.entry(id));
        let real = resolve_offset(index, existing)?;
        let width = if version.allows_negative_indexing() { width } else { 1 };
        let new_length = real + width;
        (Some((real, width)), new_length, new_length)
    };

    if new_length > MAX_STRING_LEN {
        return Err(StringError::Capacity(CapacityError { requested: new_length }));
    }
    check_writable(name, &lookup)?;

    let mut allocate = requested;
    if let Some(id) = lookup.entry
        && allocate > strings.entry(id).allocated_length()
    {
        allocate = pow2_capacity(allocate);
    }
    let allocate = clamp_length(allocate);
    let id = strings.ensure_length(name, lookup, allocate)?;
    let entry = strings.entry_mut(id);

    match index_write {
        Some((real, width)) => {
            entry.buffer_mut()[real..real + width].copy_from_slice(&value.to_le_bytes()[..width]);
            if entry.length() < new_length {
                entry.set_length(new_length);
            }
        },
        None => {
            if let Some(byte) = entry.buffer_mut().get_mut(new_length) {
                *byte = 0;
            }
            entry.set_length(new_length);
            if version < FormatVersion::V284 {
                entry.set_length(allocate);
            }
        },
    }
    Ok(())
}

/// Order two strings, or test `a` against the wildcard pattern `b`.
///
/// Without wildcards the common prefix decides, then the shorter string sorts
/// first. With wildcards a match is `Equal` and anything else is `Greater`,
/// whichever way the bytes themselves would order; a failed match never
/// reports `Less`.
pub fn compare_strings(a: &[u8], b: &[u8], exact_case: bool, allow_wildcards: bool) -> Ordering {
    if allow_wildcards {
        return if wildcard_match(a, b, exact_case) {
            Ordering::Equal
        } else {
            Ordering::Greater
        };
    }

    let common = a.len().min(b.len());
    let prefix = if exact_case {
        a[..common].cmp(&b[..common])
    } else {
        a[..common]
            .iter()
            .map(u8::to_ascii_lowercase)
            .cmp(b[..common].iter().map(u8::to_ascii_lowercase))
    };
    prefix.then(a.len().cmp(&b.len()))
}

/// Ordering used by worlds older than 2.81, which compared strings as if they
/// ended at their first NUL byte.
pub fn compare_strings_legacy(a: &[u8], b: &[u8]) -> Ordering {
    let common = a.len().min(b.len());
    for (x, y) in a[..common].iter().zip(&b[..common]) {
        let (x, y) = (x.to_ascii_lowercase(), y.to_ascii_lowercase());
        if x != y {
            return x.cmp(&y);
        }
        if x == 0 {
            return Ordering::Equal;
        }
    }

    match a.len().cmp(&b.len()) {
        Ordering::Greater if a[common] != 0 => Ordering::Greater,
        Ordering::Less if b[common] != 0 => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// Create a string of exactly `length` pad bytes, or resize an existing one
/// to `length` (keeping its bytes). `None` if `length` is over the maximum.
pub fn new_string<'w>(world: &'w mut World, name: &[u8], length: usize) -> Option<&'w StringEntry> {
    match try_new_string(world, name, length) {
        Ok(id) => Some(world.strings.entry(id)),
        Err(e) => {
            ignored("creation of", name, &e);
            None
        },
    }
}

fn try_new_string(world: &mut World, name: &[u8], length: usize) -> StringResult<EntryId> {
    if length > MAX_STRING_LEN {
        return Err(StringError::Capacity(CapacityError { requested: length }));
    }
    let lookup = world.strings.find(name);
    check_writable(name, &lookup)?;
    let id = world.strings.ensure_length(name, lookup, length)?;
    world.strings.entry_mut(id).set_length(length);
    Ok(id)
}

/// Copy a `block_width` wide block of board characters into a string.
///
/// `chars` starts at the block's top-left cell and rows are `src_width` apart.
/// Reading stops at `terminator`. Splice suffixes are honoured from 2.91 on;
/// a `#size` suffix sets how many characters are read.
pub fn load_string_board(
    world: &mut World,
    name: &mut Vec<u8>,
    chars: &[u8],
    src_width: usize,
    block_width: usize,
    block_height: usize,
    terminator: Option<u8>,
) {
    let block = BoardBlock {
        chars,
        src_width,
        block_width,
        block_height,
        terminator,
    };
    if let Err(e) = try_load_string_board(world, name, &block) {
        ignored("board load into", name, &e);
    }
}

/// A rectangle of board characters to copy into a string.
struct BoardBlock<'a> {
    chars: &'a [u8],
    src_width: usize,
    block_width: usize,
    block_height: usize,
    terminator: Option<u8>,
}

fn try_load_string_board(world: &mut World, name: &mut Vec<u8>, block: &BoardBlock<'_>) -> StringResult<()> {
    let spec = parse_splice(name)?;
    if spec.is_splice() && world.version < FormatVersion::V291 {
        return Err(StringError::Unsupported(world.version));
    }
    let lookup = world.strings.find(name);
    check_writable(name, &lookup)?;
    let existing = lookup.entry.map(|id| world.strings.entry(id));
    let offset = resolve_offset(spec.offset, existing)?;

    let size = if spec.size_specified {
        spec.size
    } else {
        block.block_width.saturating_mul(block.block_height)
    };
    let size = clamp_length(size);
    let bytes = read_board_block(block, size);

    let target = Target {
        size,
        ..Target::new(offset, &spec)
    };
    world.strings.copy_bytes(name, lookup, &target, &bytes)?;
    Ok(())
}

/// Gather `size` characters row by row, then cut at the terminator.
fn read_board_block(block: &BoardBlock<'_>, size: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(size);
    if block.block_width > 0 {
        let mut row = 0;
        while bytes.len() < size {
            let take = block.block_width.min(size - bytes.len());
            let Some(cells) = block.chars.get(row..row + take) else {
                break;
            };
            bytes.extend_from_slice(cells);
            row += block.src_width;
        }
    }
    if let Some(end) = block.terminator.and_then(|t| bytes.iter().position(|b| *b == t)) {
        bytes.truncate(end);
    }
    bytes
}
