//! Magic request words.
//!
//! Assigning one of a handful of special words to a string does not store the
//! word: it reads a file, mirrors board state, writes to the output file,
//! pushes palette indices or swaps robot programs. The word is taken from the
//! *source* of the assignment and matched case-insensitively; some words take
//! a numeric tail (`fread10`, `load_robot3`).
//!
//! A request whose world precondition is missing (no file open, world too old)
//! is not recognised at all, and the assignment stores the word literally.

use std::io::{Read, Write};

use log::{debug, warn};
use variantly::Variantly;

use crate::engine::SetOutcome;
use crate::entry::{MAX_STRING_LEN, clamp_length};
use crate::error::{StringError, StringResult};
use crate::host::{ContextId, InputSource, InputStream, remaining_bytes};
use crate::numeric::{long_to_int, parse_long_lenient, parse_ulong_prefix};
use crate::splice::Target;
use crate::table::{EntryId, Lookup, StringTable};
use crate::version::FormatVersion;
use crate::world::World;

/// Bytes a bare `fread` reserves before it starts growing the string.
const FREAD_CHUNK: usize = 32;

/// Bytes `board_scan` reads from the board.
const BOARD_SCAN_LENGTH: usize = 63;

/// Terminator for `board_scan` reads.
const BOARD_SCAN_TERMINATOR: u8 = b'*';

/// Destination names that mirror engine state and can never hold a literal value.
pub const RESERVED_NAMES: [&[u8]; 5] = [b"board_name", b"robot_name", b"mod_name", b"input", b"board_scan"];

/// Is `name` one of the read-only mirror names?
pub fn is_reserved_name(name: &[u8]) -> bool {
    RESERVED_NAMES.iter().any(|reserved| name.eq_ignore_ascii_case(reserved))
}

/// A recognised request word and its parsed numeric tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Variantly)]
pub enum MagicRequest {
    /// `fread[N]` from an open file; `None` reads up to the delimiter
    ReadFile(Option<usize>),
    /// `fread` from an open directory: the next entry name
    ReadDirectory,
    BoardName,
    RobotName,
    ModName,
    Input,
    BoardScan,
    /// `fwrite[N]`; `None` writes the whole string plus the delimiter
    WriteFile(Option<i64>),
    SmzxIndices,
    /// `load_robot[N]`; `None` targets the calling robot
    LoadProgram(Option<ContextId>),
    /// `save_robot[N]`; `None` targets the calling robot
    SaveProgram(Option<ContextId>),
}

impl MagicRequest {
    /// Recognise `source` as a request the world can currently serve.
    pub fn classify(source: &[u8], world: &World) -> Option<MagicRequest> {
        let is = |word: &[u8]| source.eq_ignore_ascii_case(word);
        let starts = |word: &[u8]| source.len() >= word.len() && source[..word.len()].eq_ignore_ascii_case(word);
        let tail = |at: usize| source.get(at..).filter(|rest| !rest.is_empty());

        match &world.input {
            Some(InputSource::File(_)) if starts(b"fread") => {
                let count = tail(5).map(|rest| {
                    let (count, _) = parse_ulong_prefix(rest);
                    usize::try_from(count).unwrap_or(usize::MAX).min(MAX_STRING_LEN)
                });
                return Some(MagicRequest::ReadFile(count));
            },
            Some(InputSource::Directory(_)) if starts(b"fread") => return Some(MagicRequest::ReadDirectory),
            _ => {},
        }

        let program_target = || tail(10).map(|rest| long_to_int(parse_long_lenient(rest)));

        if is(b"board_name") {
            Some(MagicRequest::BoardName)
        } else if is(b"robot_name") {
            Some(MagicRequest::RobotName)
        } else if is(b"mod_name") {
            Some(MagicRequest::ModName)
        } else if is(b"input") {
            Some(MagicRequest::Input)
        } else if is(b"board_scan") {
            Some(MagicRequest::BoardScan)
        } else if starts(b"fwrite") && world.output.is_some() {
            Some(MagicRequest::WriteFile(tail(6).map(parse_long_lenient)))
        } else if is(b"smzx_indices") {
            Some(MagicRequest::SmzxIndices)
        } else if starts(b"load_robot") && world.version >= FormatVersion::V290 {
            Some(MagicRequest::LoadProgram(program_target()))
        } else if starts(b"save_robot") && world.version >= FormatVersion::V292 {
            Some(MagicRequest::SaveProgram(program_target()))
        } else {
            None
        }
    }
}

/// The string an assignment targets, already stripped and resolved.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Destination<'a> {
    pub name: &'a [u8],
    pub lookup: Lookup,
    pub target: Target,
}

/// Carry out `request` against `dest` on behalf of robot `context`.
pub(crate) fn perform(
    world: &mut World,
    request: MagicRequest,
    dest: &Destination<'_>,
    context: ContextId,
) -> StringResult<SetOutcome> {
    match request {
        MagicRequest::ReadFile(count) => read_file(world, count, dest),
        MagicRequest::ReadDirectory => read_directory(world, dest),
        MagicRequest::BoardName => {
            let board = world.board.as_deref().ok_or(StringError::Unavailable("board"))?;
            let name = board.board_name().to_vec();
            mirror(&mut world.strings, dest, &name)
        },
        MagicRequest::RobotName => {
            let board = world.board.as_deref().ok_or(StringError::Unavailable("board"))?;
            let name = board
                .robot_name(context)
                .ok_or(StringError::Unavailable("robot"))?
                .to_vec();
            mirror(&mut world.strings, dest, &name)
        },
        MagicRequest::ModName => {
            let name = world.mod_name.clone();
            mirror(&mut world.strings, dest, &name)
        },
        MagicRequest::Input => {
            let input = world
                .board
                .as_deref()
                .map(|board| board.input_string().to_vec())
                .unwrap_or_default();
            mirror(&mut world.strings, dest, &input)
        },
        MagicRequest::BoardScan => board_scan(world, dest, context),
        MagicRequest::WriteFile(count) => write_file(world, count, dest),
        MagicRequest::SmzxIndices => {
            let palette = world.palette.as_deref_mut().ok_or(StringError::Unavailable("palette"))?;
            if let Some(id) = dest.lookup.entry {
                let indices = world.strings.entry(id).value();
                if !indices.is_empty() {
                    palette.load_indices(indices);
                }
            }
            Ok(SetOutcome::Unchanged)
        },
        MagicRequest::LoadProgram(target) => load_program(world, target.unwrap_or(context), dest, context),
        MagicRequest::SaveProgram(target) => {
            let id = target.unwrap_or(context);
            let programs = world.programs.as_deref().ok_or(StringError::Unavailable("programs"))?;
            let source = programs.source(id).ok_or(StringError::Unavailable("robot"))?;
            mirror(&mut world.strings, dest, &source)
        },
    }
}

fn mirror(strings: &mut StringTable, dest: &Destination<'_>, bytes: &[u8]) -> StringResult<SetOutcome> {
    strings.copy_bytes(dest.name, dest.lookup, &dest.target, bytes)?;
    Ok(SetOutcome::Written)
}

fn read_file(world: &mut World, count: Option<usize>, dest: &Destination<'_>) -> StringResult<SetOutcome> {
    let World {
        strings,
        input,
        fread_delimiter,
        ..
    } = world;
    let Some(InputSource::File(stream)) = input else {
        return Err(StringError::Unavailable("input file"));
    };
    let target = &dest.target;
    let offset = target.offset;

    let Some(count) = count else {
        let id = reserve_read(strings, dest, FREAD_CHUNK)?;
        let read = read_delimited(strings, id, offset, stream.as_mut(), *fread_delimiter)?;
        if !target.offset_specified {
            strings.entry_mut(id).set_length(read);
        }
        return Ok(SetOutcome::Written);
    };

    let left = remaining_bytes(stream.as_mut()).map_err(|e| {
        warn!("fread: unable to size input: {e}");
        StringError::Unavailable("input file")
    })?;
    let count = count.min(usize::try_from(left).unwrap_or(usize::MAX));

    let (id, size) = strings.splice_bounds(dest.name, dest.lookup, count, target)?;
    let entry = strings.entry_mut(id);
    let end = offset.saturating_add(size).min(entry.length());
    let window = entry.buffer_mut().get_mut(offset..end).unwrap_or_default();
    let read = fill(stream.as_mut(), window);
    if !target.offset_specified {
        strings.entry_mut(id).set_length(read);
    }
    Ok(SetOutcome::Written)
}

fn reserve_read(strings: &mut StringTable, dest: &Destination<'_>, chunk: usize) -> StringResult<EntryId> {
    let (id, _) = strings.splice_bounds(dest.name, dest.lookup, chunk, &dest.target)?;
    Ok(id)
}

/// Read into `window` until it is full or the stream runs dry.
fn fill<R: Read + ?Sized>(stream: &mut R, window: &mut [u8]) -> usize {
    let mut read = 0;
    while read < window.len() {
        match stream.read(&mut window[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {},
            Err(e) => {
                warn!("fread: input error after {read} bytes: {e}");
                break;
            },
        }
    }
    read
}

/// Byte-at-a-time read up to `delimiter`, growing the string geometrically.
/// Returns the number of bytes stored at `offset`.
fn read_delimited(
    strings: &mut StringTable,
    id: EntryId,
    offset: usize,
    stream: &mut dyn InputStream,
    delimiter: u8,
) -> StringResult<usize> {
    let entry = strings.entry_mut(id);
    let mut capacity = FREAD_CHUNK;
    entry.grow_to(clamp_length(offset.saturating_add(capacity)))?;

    let mut read = 0;
    for byte in stream.bytes() {
        if offset + read >= MAX_STRING_LEN {
            break;
        }
        let byte = match byte {
            Ok(byte) => byte,
            Err(e) => {
                warn!("fread: input error after {read} bytes: {e}");
                break;
            },
        };
        if byte == delimiter {
            break;
        }
        if read == capacity {
            capacity = (capacity * 2).min(MAX_STRING_LEN);
            entry.grow_to(clamp_length(offset.saturating_add(capacity)))?;
        }
        entry.buffer_mut()[offset + read] = byte;
        read += 1;
    }
    Ok(read)
}

fn read_directory(world: &mut World, dest: &Destination<'_>) -> StringResult<SetOutcome> {
    let Some(InputSource::Directory(names)) = &mut world.input else {
        return Err(StringError::Unavailable("input directory"));
    };
    let name = names
        .by_ref()
        .find(|name| name != b"." && name != b".." && !name.iter().any(|b| *b == b'*' || *b == b'/'))
        .unwrap_or_default();
    mirror(&mut world.strings, dest, &name)
}

fn board_scan(world: &mut World, dest: &Destination<'_>, context: ContextId) -> StringResult<SetOutcome> {
    let board = world.board.as_deref().ok_or(StringError::Unavailable("board"))?;
    let id = world.strings.ensure_length(dest.name, dest.lookup, BOARD_SCAN_LENGTH)?;

    let (width, height) = (board.width(), board.height());
    if width == 0 || height == 0 {
        return Ok(SetOutcome::Written);
    }
    let (x, y) = board.scan_position(context);
    let x = usize::try_from(x).unwrap_or(0).min(width - 1);
    let y = usize::try_from(y).unwrap_or(0).min(height - 1);
    let pos = y * width + x;
    let params = board.params();
    let size = (width * height).min(params.len());

    if pos < size {
        let read = BOARD_SCAN_LENGTH.min(size - pos);
        let scanned = &params[pos..pos + read];
        let length = scanned
            .iter()
            .position(|b| *b == BOARD_SCAN_TERMINATOR)
            .unwrap_or(read);
        let entry = world.strings.entry_mut(id);
        entry.buffer_mut()[..read].copy_from_slice(scanned);
        entry.set_length(length);
    }
    Ok(SetOutcome::Written)
}

fn write_file(world: &mut World, count: Option<i64>, dest: &Destination<'_>) -> StringResult<SetOutcome> {
    let output = world.output.as_mut().ok_or(StringError::Unavailable("output file"))?;
    let mut write_delimiter = count.is_none();

    let entry = dest.lookup.entry.map(|id| world.strings.entry(id));
    match entry.filter(|entry| entry.length() > 0) {
        Some(entry) => {
            let length = entry.length();
            let mut size = dest.target.size;
            if let Some(count) = count {
                // negative counts behave as "everything"
                size = usize::try_from(count).unwrap_or(usize::MAX);
            }
            if size == 0 {
                size = length;
            }
            let offset = dest.target.offset.min(length - 1);
            let size = size.min(length - offset);
            output.write_all(&entry.value()[offset..offset + size]).map_err(|e| {
                warn!("fwrite failed: {e}");
                StringError::Unavailable("output file")
            })?;
        },
        None => {
            let version = world.version;
            if (FormatVersion::V280..=FormatVersion::V291).contains(&version) && entry.is_none() {
                write_delimiter = false;
            }
            if (FormatVersion::V282..=FormatVersion::V291).contains(&version) {
                write_delimiter = false;
            }
        },
    }

    if write_delimiter {
        output.write_all(&[world.fwrite_delimiter]).map_err(|e| {
            warn!("fwrite failed: {e}");
            StringError::Unavailable("output file")
        })?;
    }
    Ok(SetOutcome::Unchanged)
}

fn load_program(
    world: &mut World,
    id: ContextId,
    dest: &Destination<'_>,
    context: ContextId,
) -> StringResult<SetOutcome> {
    let programs = world.programs.as_deref_mut().ok_or(StringError::Unavailable("programs"))?;
    if !programs.contains(id) {
        return Err(StringError::Unavailable("robot"));
    }
    let Some(source) = dest.lookup.entry.map(|entry| world.strings.entry(entry).value()) else {
        return Ok(SetOutcome::Unchanged);
    };
    if source.is_empty() {
        return Ok(SetOutcome::Unchanged);
    }
    if !programs.install_source(id, source, world.version) {
        debug!("load_robot: robot {id} refused the new program");
        return Ok(SetOutcome::Unchanged);
    }
    if id == context {
        Ok(SetOutcome::RestartProgram)
    } else {
        Ok(SetOutcome::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{InputSource, MemoryPrograms};

    #[test]
    fn reserved_names_ignore_case() {
        assert!(is_reserved_name(b"BOARD_NAME"));
        assert!(is_reserved_name(b"input"));
        assert!(!is_reserved_name(b"inputs"));
    }

    #[test]
    fn plain_words_are_not_requests() {
        let world = World::new_empty();
        assert_eq!(MagicRequest::classify(b"hello", &world), None);
        assert_eq!(MagicRequest::classify(b"board_names", &world), None);
        assert_eq!(
            MagicRequest::classify(b"Board_Name", &world),
            Some(MagicRequest::BoardName)
        );
    }

    #[test]
    fn fread_needs_an_open_input() {
        let mut world = World::new_empty();
        assert_eq!(MagicRequest::classify(b"fread", &world), None);

        world.input = Some(InputSource::from_bytes(b"abc".to_vec()));
        assert_eq!(
            MagicRequest::classify(b"fread", &world),
            Some(MagicRequest::ReadFile(None))
        );
        assert_eq!(
            MagicRequest::classify(b"FREAD12", &world),
            Some(MagicRequest::ReadFile(Some(12)))
        );

        world.input = Some(InputSource::from_names(["a"]));
        assert!(MagicRequest::classify(b"fread", &world).unwrap().is_read_directory());
    }

    #[test]
    fn fwrite_needs_an_open_output() {
        let mut world = World::new_empty();
        assert_eq!(MagicRequest::classify(b"fwrite", &world), None);
        world.output = Some(Box::new(Vec::new()));
        assert_eq!(
            MagicRequest::classify(b"fwrite", &world),
            Some(MagicRequest::WriteFile(None))
        );
        assert_eq!(
            MagicRequest::classify(b"fwrite-1", &world),
            Some(MagicRequest::WriteFile(Some(-1)))
        );
    }

    #[test]
    fn program_requests_are_version_gated() {
        let mut world = World::new_empty();
        world.programs = Some(Box::new(MemoryPrograms::new()));
        assert_eq!(
            MagicRequest::classify(b"load_robot7", &world),
            Some(MagicRequest::LoadProgram(Some(7)))
        );
        assert_eq!(
            MagicRequest::classify(b"save_robot", &world),
            Some(MagicRequest::SaveProgram(None))
        );

        world.version = FormatVersion::V291;
        assert!(MagicRequest::classify(b"save_robot", &world).is_none());
        assert!(MagicRequest::classify(b"load_robot", &world).is_some());

        world.version = FormatVersion::V284;
        assert!(MagicRequest::classify(b"load_robot", &world).is_none());
    }
}
