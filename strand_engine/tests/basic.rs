use se::host::{InputSource, MemoryPrograms, ProgramStore, SimpleBoard, SimpleRobot};
use se::numeric::{format_int, parse_int};
use se::save_files::{load_table_file, save_table_file};
use se::wildcard::wildcard_match;
use se::*;
use strand_engine as se;

use std::cmp::Ordering;
use std::fs;

fn name(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

fn set(world: &mut World, target: &str, value: &str) -> SetOutcome {
    set_string(world, &mut name(target), Source::Bytes(value.as_bytes()), 0)
}

fn value(world: &World, target: &str) -> Option<Vec<u8>> {
    get_string(world, &mut name(target)).map(<[u8]>::to_vec)
}

#[test]
fn test_splice_writes_compose() {
    let mut world = World::new_empty();
    set(&mut world, "BUF#5", "HELLO");
    set(&mut world, "BUF+2#3", "XYZ");
    assert_eq!(value(&world, "BUF").unwrap(), b"HEXYZ");
    assert_eq!(value(&world, "BUF+1#2").unwrap(), b"EX");
}

#[test]
fn test_dec_keeps_capacity() {
    let mut world = World::new_empty();
    set(&mut world, "s", "hello world");
    let allocated = get_string_pointer(&world, b"s").unwrap().allocated_length();
    dec_string_int(&mut world, b"s", 6);
    let entry = get_string_pointer(&world, b"s").unwrap();
    assert_eq!(entry.value(), b"hello");
    assert_eq!(entry.allocated_length(), allocated);
    dec_string_int(&mut world, b"s", 100);
    assert_eq!(value(&world, "s").unwrap(), b"");
}

#[test]
fn test_self_append_doubles() {
    let mut world = World::new_empty();
    set(&mut world, "s", "abc");
    for _ in 0..5 {
        let span = locate_string(&world, &mut name("s")).unwrap();
        inc_string(&mut world, &mut name("s"), Source::Stored(span));
    }
    let result = value(&world, "s").unwrap();
    assert_eq!(result.len(), 3 * 32);
    assert!(result.chunks(3).all(|chunk| chunk == b"abc"));
}

#[test]
fn test_wildcard_examples() {
    assert!(wildcard_match(b"abcdefg", b"a%c%g", false));
    assert!(!wildcard_match(b"abcdefg", b"z%g", false));
    assert!(wildcard_match(b"", b"%", false));
    assert!(!wildcard_match(b"x", b"", false));
    assert!(wildcard_match(b"HELLO", b"h?llo", false));
    assert!(!wildcard_match(b"HELLO", b"h?llo", true));
}

#[test]
fn test_parse_int_saturates() {
    assert_eq!(parse_int(b"99999999999"), i32::MAX);
    assert_eq!(parse_int(b"-99999999999"), i32::MIN);
    assert_eq!(parse_int(b"  42abc"), 42);
    assert_eq!(format_int(i32::MIN), b"-2147483648");
}

#[test]
fn test_ordering_law() {
    assert_eq!(compare_strings(b"abc", b"ABD", false, false), Ordering::Less);
    assert_eq!(compare_strings(b"ab", b"ABC", false, false), Ordering::Less);
    assert_eq!(compare_strings(b"Hello", b"hELLO", false, false), Ordering::Equal);
    assert_eq!(compare_strings(b"B", b"a", true, false), Ordering::Less);
    assert_eq!(compare_strings(b"zzz", b"a%", false, true), Ordering::Greater);
}

#[test]
fn test_numeric_coercion() {
    let mut world = World::new_empty();
    set(&mut world, "SCORE", "100");
    assert_eq!(read_as_number(&world, &mut name("SCORE")), 100);
    write_as_number(&mut world, &mut name("SCORE"), 250, 0);
    assert_eq!(value(&world, "SCORE").unwrap(), b"250");
    assert_eq!(read_as_number(&world, &mut name("SCORE.length")), 3);
    assert_eq!(read_as_number(&world, &mut name("SCORE.0")), i32::from(b'2'));
}

#[test]
fn test_reserved_names_stay_mirrors() {
    let mut world = World::new_empty();
    world.board = Some(Box::new(SimpleBoard {
        name: "Cave".into(),
        ..SimpleBoard::default()
    }));
    assert_eq!(set(&mut world, "board_name", "fake"), SetOutcome::Unchanged);
    assert_eq!(set(&mut world, "INPUT", "fake"), SetOutcome::Unchanged);
    inc_string(&mut world, &mut name("mod_name"), Source::Bytes(b"x"));
    assert!(world.strings.is_empty());

    set(&mut world, "$where", "board_name");
    assert_eq!(value(&world, "$where").unwrap(), b"Cave");
}

#[test]
fn test_fread_delimited_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.txt");
    fs::write(&path, b"alpha*beta*gamma").unwrap();

    let mut world = World::new_empty();
    world.open_input(&path).unwrap();
    set(&mut world, "$r", "fread");
    assert_eq!(value(&world, "$r").unwrap(), b"alpha");
    set(&mut world, "$r", "FREAD");
    assert_eq!(value(&world, "$r").unwrap(), b"beta");
    set(&mut world, "$r", "fread");
    assert_eq!(value(&world, "$r").unwrap(), b"gamma");
    set(&mut world, "$r", "fread");
    assert_eq!(value(&world, "$r").unwrap(), b"");

    world.open_input(&path).unwrap();
    set(&mut world, "$c", "fread3");
    assert_eq!(value(&world, "$c").unwrap(), b"alp");
    set(&mut world, "$c", "fread100");
    assert_eq!(value(&world, "$c").unwrap(), b"ha*beta*gamma");
}

#[test]
fn test_fread_without_input_stores_word() {
    let mut world = World::new_empty();
    set(&mut world, "$r", "fread");
    assert_eq!(value(&world, "$r").unwrap(), b"fread");
}

#[test]
fn test_fread_directory_lists_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b.txt"), b"").unwrap();
    fs::write(dir.path().join("a.txt"), b"").unwrap();

    let mut world = World::new_empty();
    world.open_input(dir.path()).unwrap();
    set(&mut world, "$f", "fread");
    assert_eq!(value(&world, "$f").unwrap(), b"a.txt");
    set(&mut world, "$f", "fread");
    assert_eq!(value(&world, "$f").unwrap(), b"b.txt");
    set(&mut world, "$f", "fread");
    assert_eq!(value(&world, "$f").unwrap(), b"");
}

#[test]
fn test_directory_source_skips_special_names() {
    let mut world = World::new_empty();
    world.input = Some(InputSource::from_names([".", "..", "star*", "sub/x", "kept"]));
    set(&mut world, "$f", "fread");
    assert_eq!(value(&world, "$f").unwrap(), b"kept");
}

#[test]
fn test_fwrite_whole_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let mut world = World::new_empty();
    world.open_output(&path).unwrap();

    set(&mut world, "$w", "hi");
    assert_eq!(set(&mut world, "$w", "fwrite"), SetOutcome::Unchanged);
    set(&mut world, "$w", "fwrite1");
    world.close_output().unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"hi*h");
    assert_eq!(value(&world, "$w").unwrap(), b"hi");
}

fn fwrite_bytes(version: FormatVersion, prepare: impl FnOnce(&mut World)) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let mut world = World::new_empty();
    world.version = version;
    prepare(&mut world);
    world.open_output(&path).unwrap();
    set(&mut world, "$e", "fwrite");
    world.close_output().unwrap();
    fs::read(&path).unwrap()
}

#[test]
fn test_fwrite_delimiter_quirks() {
    let missing = |_: &mut World| {};
    let empty = |world: &mut World| {
        new_string(world, b"$e", 0).unwrap();
    };

    assert_eq!(fwrite_bytes(FormatVersion::V284, missing), b"");
    assert_eq!(fwrite_bytes(FormatVersion::V293, missing), b"*");
    assert_eq!(fwrite_bytes(FormatVersion::V284, empty), b"");
    assert_eq!(fwrite_bytes(FormatVersion::V281, empty), b"*");
    assert_eq!(fwrite_bytes(FormatVersion::V292, empty), b"*");
}

#[test]
fn test_robot_mirrors_and_programs() {
    let mut world = World::new_empty();
    world.board = Some(Box::new(SimpleBoard {
        name: "Hall".into(),
        width: 4,
        height: 1,
        params: "ab*c".into(),
        input: "go north".into(),
        robots: vec![SimpleRobot {
            id: 3,
            name: "Guard".into(),
            ..SimpleRobot::default()
        }],
    }));
    world.programs = Some(Box::new(MemoryPrograms::new().with_robot(3, b"end")));

    set_string(&mut world, &mut name("$me"), Source::Bytes(b"robot_name"), 3);
    assert_eq!(value(&world, "$me").unwrap(), b"Guard");
    set(&mut world, "$in", "input");
    assert_eq!(value(&world, "$in").unwrap(), b"go north");
    set(&mut world, "$scan", "board_scan");
    assert_eq!(value(&world, "$scan").unwrap(), b"ab");

    set(&mut world, "$prog", "wait 1");
    let outcome = set_string(&mut world, &mut name("$prog"), Source::Bytes(b"load_robot"), 3);
    assert_eq!(outcome, SetOutcome::RestartProgram);
    assert_eq!(world.programs.as_ref().unwrap().source(3).unwrap(), b"wait 1");

    set(&mut world, "$copy", "save_robot3");
    assert_eq!(value(&world, "$copy").unwrap(), b"wait 1");
}

#[test]
fn test_load_robot_needs_290() {
    let mut world = World::new_empty();
    world.version = FormatVersion::V284;
    world.programs = Some(Box::new(MemoryPrograms::new().with_robot(0, b"end")));
    set(&mut world, "$prog", "load_robot");
    assert_eq!(value(&world, "$prog").unwrap(), b"load_robot");
}

#[test]
fn test_save_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut world = World::new_empty();
    world.version = FormatVersion::V284;
    set(&mut world, "zeta", "last");
    set(&mut world, "Alpha", "first\0with nul");

    let path = save_table_file(&world, dir.path(), "slot").unwrap();
    let mut restored = World::new_empty();
    let count = load_table_file(&mut restored, &path).unwrap();

    assert_eq!(count, 2);
    assert_eq!(restored.version, FormatVersion::V284);
    assert_eq!(value(&restored, "ALPHA").unwrap(), b"first\0with nul");
    let names: Vec<&[u8]> = restored.strings.iter().map(StringEntry::name).collect();
    assert_eq!(names, vec![&b"Alpha"[..], &b"zeta"[..]]);
}

#[test]
fn test_config_file_drives_world() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strand.toml");
    fs::write(
        &path,
        "format_version = \"2.90\"\nlookup = \"hashed\"\nfread_delimiter = \",\"\n",
    )
    .unwrap();
    let world = World::from_config(&load_config(&path));
    assert_eq!(world.version, FormatVersion::V290);
    assert_eq!(world.strings.mode(), LookupMode::Hashed);
    assert_eq!(world.fread_delimiter, b',');

    let fallback = load_config(&dir.path().join("missing.toml"));
    assert_eq!(fallback, EngineConfig::default());
}
