//! Terminal input handling for the string console.
//!
//! Wraps rustyline configuration and completion tailored to the console's
//! command set and save-slot workflow.

use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use lazy_static::lazy_static;
use log::{info, warn};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Helper};

use crate::magic::RESERVED_NAMES;
use crate::save_files::{SAVE_DIR, collect_save_slots};

/// Outcome of reading a line from the console input.
pub enum InputEvent {
    Line(String),
    Eof,
    Interrupted,
}

const CONSOLE_COMMANDS: &[&str] = &[
    "set", "copy", "get", "inc", "dec", "num", "setnum", "cmp", "match", "new", "list", "mem", "open-in",
    "open-dir", "open-out", "close", "save", "load", "saves", "version", "help", "quit",
];

const MAGIC_WORDS: &[&str] = &[
    "fread", "fwrite", "board_name", "robot_name", "mod_name", "input", "board_scan",
    "smzx_indices", "load_robot", "save_robot",
];

lazy_static! {
    static ref COMMAND_TERMS: Vec<String> = sorted_terms(CONSOLE_COMMANDS.iter().map(|cmd| (*cmd).to_string()));
    static ref ARGUMENT_TERMS: Vec<String> = sorted_terms(
        MAGIC_WORDS
            .iter()
            .map(|word| (*word).to_string())
            .chain(RESERVED_NAMES.iter().map(|name| String::from_utf8_lossy(name).into_owned()))
    );
}

type ReplEditor = rustyline::Editor<StrandHelper, DefaultHistory>;

#[derive(Default)]
struct StrandHelper;

impl Helper for StrandHelper {}

impl Completer for StrandHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let (start, prefix) = current_prefix(line, pos);
        if prefix.is_empty() {
            return Ok((start, Vec::new()));
        }
        let lower = prefix.to_lowercase();
        if let Some((replacement_start, candidates)) = load_command_completions(&prefix, &lower, start) {
            return Ok((replacement_start, candidates));
        }
        if lower.contains(char::is_whitespace) {
            // past the command word: offer request words and mirror names
            let word_start = line[..pos]
                .rfind(|c: char| c.is_ascii_whitespace())
                .map_or(start, |i| i + 1);
            let word = line[word_start..pos].to_lowercase();
            if word.is_empty() {
                return Ok((word_start, Vec::new()));
            }
            return Ok((word_start, matching_pairs(&ARGUMENT_TERMS, &word)));
        }
        Ok((start, matching_pairs(&COMMAND_TERMS, &lower)))
    }
}

fn matching_pairs(terms: &[String], lower: &str) -> Vec<Pair> {
    terms
        .iter()
        .filter(|term| term.starts_with(lower))
        .map(|term| Pair {
            display: term.clone(),
            replacement: term.clone(),
        })
        .collect()
}

impl Hinter for StrandHelper {
    type Hint = String;
}

impl Highlighter for StrandHelper {}

impl Validator for StrandHelper {
    fn validate(&self, _ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}

fn current_prefix(line: &str, pos: usize) -> (usize, String) {
    let slice = &line[..pos];
    let trimmed = slice.trim_start_matches(char::is_whitespace);
    let start = pos - trimmed.len();
    (start, trimmed.to_string())
}

fn sorted_terms(terms: impl Iterator<Item = String>) -> Vec<String> {
    let mut terms: Vec<String> = terms.collect();
    terms.sort_unstable();
    terms.dedup();
    terms
}

fn load_command_completions(prefix: &str, lower: &str, start: usize) -> Option<(usize, Vec<Pair>)> {
    if !matches_keyword(lower, "load") {
        return None;
    }
    let keyword = "load";
    let command_part = &prefix[..keyword.len()];
    let after_keyword = &prefix[keyword.len()..];
    let trimmed_after = after_keyword.trim_start();
    let insertion_offset = prefix.len() - trimmed_after.len();
    let slots = available_save_slots();

    if after_keyword.is_empty() {
        let pairs = slots
            .into_iter()
            .map(|slot| Pair {
                display: format!("{command_part} {slot}"),
                replacement: format!(" {slot}"),
            })
            .collect();
        return Some((start + prefix.len(), pairs));
    }

    let lower_partial = trimmed_after.to_lowercase();
    let pairs = slots
        .into_iter()
        .filter(|slot| lower_partial.is_empty() || slot.starts_with(&lower_partial))
        .map(|slot| Pair {
            display: slot.clone(),
            replacement: slot,
        })
        .collect();
    Some((start + insertion_offset, pairs))
}

fn matches_keyword(lower: &str, keyword: &str) -> bool {
    if lower == keyword {
        return true;
    }
    lower
        .strip_prefix(keyword)
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_whitespace)
}

fn available_save_slots() -> Vec<String> {
    match collect_save_slots(Path::new(SAVE_DIR)) {
        Ok(slots) => {
            let mut names: Vec<String> = Vec::new();
            for slot in slots {
                if names.last().is_none_or(|last| last != &slot.slot) {
                    names.push(slot.slot);
                }
            }
            names
        },
        Err(err) => {
            warn!("Failed to enumerate save slots for completion: {err}");
            Vec::new()
        },
    }
}

/// Source of console lines: the line editor on a terminal, plain buffered
/// lines otherwise (piped scripts, or a terminal the editor cannot drive).
pub struct InputManager {
    reader: LineReader,
}

impl InputManager {
    /// Open console input. History is kept per mod so each world recalls its own commands.
    pub fn new(mod_name: &[u8]) -> Self {
        let history = dirs::data_dir()
            .or_else(dirs::data_local_dir)
            .map(|base| history_path(&base, mod_name));
        Self::select(io::stdin().is_terminal(), || open_editor(history))
    }

    fn select(interactive: bool, open: impl FnOnce() -> Result<LineReader>) -> Self {
        if !interactive {
            info!("stdin is not a terminal; reading plain lines");
            return Self {
                reader: LineReader::stdin(),
            };
        }
        let reader = open().unwrap_or_else(|e| {
            warn!("line editor unavailable ({e:#}); reading plain lines");
            LineReader::stdin()
        });
        Self { reader }
    }

    /// Read the next console line.
    ///
    /// # Errors
    /// - if the underlying terminal or stdin fails
    pub fn read_line(&mut self, prompt: &str) -> Result<InputEvent> {
        match &mut self.reader {
            LineReader::Editor { editor, history } => {
                let event = editor_event(editor.readline(prompt))?;
                if let InputEvent::Line(line) = &event {
                    remember(editor, history.as_deref(), line);
                }
                Ok(event)
            },
            LineReader::Plain { source, echo } => {
                write!(echo, "{prompt}")?;
                echo.flush()?;
                let mut line = String::new();
                if source.read_line(&mut line).context("reading a console line")? == 0 {
                    return Ok(InputEvent::Eof);
                }
                let kept = line.trim_end_matches(['\r', '\n']).len();
                line.truncate(kept);
                Ok(InputEvent::Line(line))
            },
        }
    }
}

enum LineReader {
    Editor {
        editor: Box<ReplEditor>,
        history: Option<PathBuf>,
    },
    Plain {
        source: Box<dyn BufRead>,
        echo: Box<dyn Write>,
    },
}

impl LineReader {
    fn stdin() -> Self {
        LineReader::Plain {
            source: Box::new(io::stdin().lock()),
            echo: Box::new(io::stdout()),
        }
    }
}

fn open_editor(history: Option<PathBuf>) -> Result<LineReader> {
    let mut editor = ReplEditor::new().context("starting the line editor")?;
    editor.set_helper(Some(StrandHelper));
    if let Some(path) = &history {
        if let Some(dir) = path.parent()
            && let Err(e) = fs::create_dir_all(dir)
        {
            warn!("no history directory at {}: {e}", dir.display());
        }
        match editor.load_history(path) {
            Ok(()) => info!("recalled console history from {}", path.display()),
            Err(ReadlineError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {},
            Err(e) => warn!("history at {} not loaded: {e}", path.display()),
        }
    }
    Ok(LineReader::Editor {
        editor: Box::new(editor),
        history,
    })
}

fn editor_event(read: Result<String, ReadlineError>) -> Result<InputEvent> {
    match read {
        Ok(line) => Ok(InputEvent::Line(line)),
        Err(ReadlineError::Interrupted) => Ok(InputEvent::Interrupted),
        Err(ReadlineError::Eof) => Ok(InputEvent::Eof),
        Err(e) => Err(e).context("reading a console line"),
    }
}

fn remember(editor: &mut ReplEditor, history: Option<&Path>, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    if let Err(e) = editor.add_history_entry(line) {
        warn!("line not added to history: {e}");
    }
    if let Some(path) = history
        && let Err(e) = editor.save_history(path)
    {
        warn!("history not written to {}: {e}", path.display());
    }
}

/// `<base>/strand_engine/history-<mod>.txt`, or `history.txt` with no mod loaded.
fn history_path(base: &Path, mod_name: &[u8]) -> PathBuf {
    let file = mod_name.rsplit(|b| matches!(*b, b'/' | b'\\')).next().unwrap_or_default();
    let key: String = file
        .iter()
        .take_while(|b| **b != b'.')
        .map(|&b| if b.is_ascii_alphanumeric() { char::from(b) } else { '_' })
        .collect();
    let file_name = if key.is_empty() {
        "history.txt".to_string()
    } else {
        format!("history-{key}.txt")
    };
    base.join("strand_engine").join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted(lines: &str) -> InputManager {
        InputManager {
            reader: LineReader::Plain {
                source: Box::new(io::Cursor::new(lines.as_bytes().to_vec())),
                echo: Box::new(io::sink()),
            },
        }
    }

    #[test]
    fn editor_signals_become_events() {
        assert!(matches!(editor_event(Err(ReadlineError::Interrupted)).unwrap(), InputEvent::Interrupted));
        assert!(matches!(editor_event(Err(ReadlineError::Eof)).unwrap(), InputEvent::Eof));
        let failed = editor_event(Err(ReadlineError::Io(io::Error::other("tty gone"))));
        assert!(format!("{:#}", failed.err().unwrap()).contains("tty gone"));
    }

    #[test]
    fn falls_back_to_plain_lines_when_editor_fails() {
        let manager = InputManager::select(true, || anyhow::bail!("no terminal"));
        assert!(matches!(manager.reader, LineReader::Plain { .. }));
        let manager = InputManager::select(false, || unreachable!());
        assert!(matches!(manager.reader, LineReader::Plain { .. }));
    }

    #[test]
    fn plain_lines_strip_endings_then_end() {
        let mut manager = scripted("set $a one two\r\nquit\n");
        let Ok(InputEvent::Line(first)) = manager.read_line("> ") else {
            panic!("expected a line");
        };
        assert_eq!(first, "set $a one two");
        let Ok(InputEvent::Line(second)) = manager.read_line("> ") else {
            panic!("expected a line");
        };
        assert_eq!(second, "quit");
        assert!(matches!(manager.read_line("> ").unwrap(), InputEvent::Eof));
    }

    #[test]
    fn history_is_kept_per_mod() {
        let base = Path::new("/tmp/strand-test");
        assert_eq!(history_path(base, b""), base.join("strand_engine/history.txt"));
        assert_eq!(history_path(base, b"demo.zip"), base.join("strand_engine/history-demo.txt"));
        assert_eq!(
            history_path(base, b"../mods/deep cave.mod"),
            base.join("strand_engine/history-deep_cave.txt")
        );
    }

    #[test]
    fn command_terms_are_sorted_and_complete() {
        assert!(COMMAND_TERMS.iter().any(|term| term == "setnum"));
        assert!(COMMAND_TERMS.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn argument_terms_merge_words_and_mirrors() {
        // "board_name" is both a request word and a mirror name
        assert_eq!(ARGUMENT_TERMS.iter().filter(|term| *term == "board_name").count(), 1);
        assert!(ARGUMENT_TERMS.iter().any(|term| term == "fread"));
        let pairs = matching_pairs(&ARGUMENT_TERMS, "save");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].replacement, "save_robot");
    }

    #[test]
    fn keyword_needs_word_boundary() {
        assert!(matches_keyword("load", "load"));
        assert!(matches_keyword("load sl", "load"));
        assert!(!matches_keyword("loader", "load"));
        assert!(!matches_keyword("lo", "load"));
    }

    #[test]
    fn prefix_skips_leading_space() {
        assert_eq!(current_prefix("  set a", 7), (2, "set a".to_string()));
    }
}
