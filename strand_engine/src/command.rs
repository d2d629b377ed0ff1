//! Command module
//!
//! Describes the commands accepted by the string console.
use variantly;

/// Which open file a command refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSlot {
    Input,
    Output,
}

/// Commands that can be entered at the console.
#[derive(Debug, variantly::Variantly)]
pub enum Command {
    Set { name: String, value: String },
    Copy { dest: String, source: String },
    Get(String),
    Inc { name: String, value: String },
    Dec { name: String, count: i32 },
    Num(String),
    SetNum { name: String, value: i32 },
    Compare { left: String, right: String, exact_case: bool },
    Match { name: String, pattern: String },
    New { name: String, length: usize },
    List,
    Mem,
    Open { slot: FileSlot, path: String },
    /// `None` closes both
    Close(Option<FileSlot>),
    Save(String),
    Load(String),
    ListSaves,
    Version(Option<String>),
    Help,
    Quit,
    Unknown,
}

/// Text following the first `skip` words of `input`, with its inner spacing intact.
fn remainder(input: &str, skip: usize) -> String {
    let mut rest = input.trim_start();
    for _ in 0..skip {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest.trim_end_matches(['\r', '\n']).to_string()
}

/// Parses an input line and returns the corresponding `Command`.
pub fn parse_command(input: &str) -> Command {
    let words: Vec<&str> = input.split_whitespace().collect();
    match words.as_slice() {
        ["set", name, _, ..] => Command::Set {
            name: (*name).to_string(),
            value: remainder(input, 2),
        },
        ["set", name] => Command::Set {
            name: (*name).to_string(),
            value: String::new(),
        },
        ["copy" | "cp", dest, source] => Command::Copy {
            dest: (*dest).to_string(),
            source: (*source).to_string(),
        },
        ["get" | "show", name] => Command::Get((*name).to_string()),
        ["inc" | "append", name, _, ..] => Command::Inc {
            name: (*name).to_string(),
            value: remainder(input, 2),
        },
        ["dec" | "chop", name, count] => match count.parse() {
            Ok(count) => Command::Dec {
                name: (*name).to_string(),
                count,
            },
            Err(_) => Command::Unknown,
        },
        ["num", name] => Command::Num((*name).to_string()),
        ["setnum", name, value] => match value.parse() {
            Ok(value) => Command::SetNum {
                name: (*name).to_string(),
                value,
            },
            Err(_) => Command::Unknown,
        },
        ["cmp" | "compare", left, right] => Command::Compare {
            left: (*left).to_string(),
            right: (*right).to_string(),
            exact_case: false,
        },
        ["cmp" | "compare", left, right, "exact"] => Command::Compare {
            left: (*left).to_string(),
            right: (*right).to_string(),
            exact_case: true,
        },
        ["match", name, _, ..] => Command::Match {
            name: (*name).to_string(),
            pattern: remainder(input, 2),
        },
        ["new", name, length] => match length.parse() {
            Ok(length) => Command::New {
                name: (*name).to_string(),
                length,
            },
            Err(_) => Command::Unknown,
        },
        ["list" | "ls"] => Command::List,
        ["mem" | "memory"] => Command::Mem,
        ["open-in" | "open-dir", _, ..] => Command::Open {
            slot: FileSlot::Input,
            path: remainder(input, 1),
        },
        ["open-out", _, ..] => Command::Open {
            slot: FileSlot::Output,
            path: remainder(input, 1),
        },
        ["open", "in" | "input", _, ..] => Command::Open {
            slot: FileSlot::Input,
            path: remainder(input, 2),
        },
        ["open", "out" | "output", _, ..] => Command::Open {
            slot: FileSlot::Output,
            path: remainder(input, 2),
        },
        ["close"] => Command::Close(None),
        ["close", "in" | "input"] => Command::Close(Some(FileSlot::Input)),
        ["close", "out" | "output"] => Command::Close(Some(FileSlot::Output)),
        ["save", slot] => Command::Save((*slot).to_string()),
        ["load", slot] => Command::Load((*slot).to_string()),
        ["saves"] | ["load"] => Command::ListSaves,
        ["version"] => Command::Version(None),
        ["version", version] => Command::Version(Some((*version).to_string())),
        ["help" | "?"] => Command::Help,
        ["quit" | "exit"] => Command::Quit,
        _ => Command::Unknown,
    }
}
