//! Wildcard string matching for script string comparisons.
//!
//! Pattern grammar:
//! - `?` matches exactly one byte
//! - `%` matches any run of bytes, including an empty one
//! - `\` escapes a following `%`, `?` or `\`; before any other byte (or at the
//!   end of the pattern) it is an ordinary literal
//! - every other byte matches itself, ASCII case-folded unless `exact_case`
//!
//! Most patterns are settled by a single left-to-right scan. Only a `%` that
//! is followed by literals and then another `%` can line up in more than one
//! place; those patterns fall back to a reachability scan over the string.

/// One parsed pattern element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    One,
    Any,
    Byte(u8),
}

fn is_escapable(byte: u8) -> bool {
    matches!(byte, b'%' | b'?' | b'\\')
}

fn tokenize(pattern: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut i = 0;
    while i < pattern.len() {
        let token = match pattern[i] {
            b'?' => Token::One,
            b'%' => Token::Any,
            b'\\' if i + 1 < pattern.len() && is_escapable(pattern[i + 1]) => {
                i += 1;
                Token::Byte(pattern[i])
            },
            other => Token::Byte(other),
        };
        tokens.push(token);
        i += 1;
    }
    tokens
}

#[inline]
fn bytes_equal(a: u8, b: u8, exact_case: bool) -> bool {
    if exact_case { a == b } else { a.eq_ignore_ascii_case(&b) }
}

/// Match `text` against a wildcard `pattern`.
///
/// ```
/// use strand_engine::wildcard::wildcard_match;
///
/// assert!(wildcard_match(b"abcdefg", b"a%c%g", true));
/// assert!(!wildcard_match(b"abcdefg", b"z%g", true));
/// assert!(wildcard_match(b"SCORE", b"s?o%", false));
/// ```
pub fn wildcard_match(text: &[u8], pattern: &[u8], exact_case: bool) -> bool {
    let tokens = tokenize(pattern);
    match_fast(text, &tokens, exact_case)
}

/// Reference matcher that always uses the reachability scan.
pub fn wildcard_match_slow(text: &[u8], pattern: &[u8], exact_case: bool) -> bool {
    let tokens = tokenize(pattern);
    match_slow(text, &tokens, exact_case)
}

fn match_fast(text: &[u8], tokens: &[Token], exact_case: bool) -> bool {
    let len = text.len();
    if tokens.is_empty() {
        return len == 0;
    }

    let mut s = 0;
    let mut w = 0;
    while s < len && w < tokens.len() {
        match tokens[w] {
            Token::Any => {
                let any_at = w;
                let mut skip_from = s;
                w += 1;

                // absorb the rest of the wildcard run
                while w < tokens.len() {
                    match tokens[w] {
                        Token::Any => w += 1,
                        Token::One => {
                            w += 1;
                            s += 1;
                        },
                        Token::Byte(_) => break,
                    }
                }

                if s > len {
                    return false;
                }
                if w == tokens.len() {
                    return true;
                }

                // no further `%`: the rest of the pattern is pinned to the end of the text
                let rest = &tokens[w..];
                if !rest.contains(&Token::Any) {
                    let Some(aligned) = len.checked_sub(rest.len()) else {
                        return false;
                    };
                    s = s.max(aligned);
                    continue;
                }

                let Token::Byte(lookahead) = tokens[w] else {
                    unreachable!("wildcard run ends on a literal");
                };
                while s < len && !bytes_equal(text[s], lookahead, exact_case) {
                    skip_from += 1;
                    s += 1;
                }
                if s >= len {
                    return false;
                }

                // ambiguous layout; nothing before `skip_from` can take part in a match
                return match_slow(&text[skip_from..], &tokens[any_at..], exact_case);
            },
            Token::One => {
                w += 1;
                s += 1;
            },
            Token::Byte(expected) => {
                if !bytes_equal(text[s], expected, exact_case) {
                    return false;
                }
                w += 1;
                s += 1;
            },
        }
    }

    while w < tokens.len() && tokens[w] == Token::Any {
        w += 1;
    }
    s == len && w == tokens.len()
}

// reachable[k]: the pattern consumed so far matches text[..k]
fn match_slow(text: &[u8], tokens: &[Token], exact_case: bool) -> bool {
    let len = text.len();
    let mut reachable = vec![false; len + 1];
    reachable[0] = true;
    let mut first = 0;

    let mut w = 0;
    while w < tokens.len() {
        match tokens[w] {
            Token::One | Token::Any => {
                let mut shift = 0;
                let mut any = false;
                while w < tokens.len() && !matches!(tokens[w], Token::Byte(_)) {
                    if tokens[w] == Token::Any {
                        any = true;
                    } else {
                        shift += 1;
                    }
                    w += 1;
                }

                let start = first + shift;
                if start > len {
                    return false;
                }
                if any {
                    // every position from the earliest reachable one onward
                    reachable[..start].fill(false);
                    reachable[start..].fill(true);
                } else if shift > 0 {
                    reachable.copy_within(first..=len - shift, start);
                    reachable[..start].fill(false);
                }
                first = start;
            },
            Token::Byte(expected) => {
                w += 1;
                let mut next_first = None;
                for k in (first + 1..=len).rev() {
                    reachable[k] = reachable[k - 1] && bytes_equal(text[k - 1], expected, exact_case);
                    if reachable[k] {
                        next_first = Some(k);
                    }
                }
                reachable[first] = false;
                match next_first {
                    Some(k) => first = k,
                    None => return false,
                }
            },
        }
    }

    reachable[len]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn both(text: &str, pattern: &str, exact_case: bool) -> bool {
        let fast = wildcard_match(text.as_bytes(), pattern.as_bytes(), exact_case);
        let slow = wildcard_match_slow(text.as_bytes(), pattern.as_bytes(), exact_case);
        assert_eq!(fast, slow, "fast/slow disagree on {text:?} ~ {pattern:?} (exact={exact_case})");
        fast
    }

    #[test]
    fn documented_examples() {
        assert!(both("abcdefg", "a%c%g", true));
        assert!(!both("abcdefg", "z%g", true));
        assert!(both("", "%", true));
        assert!(both("", "%", false));
        assert!(!both("x", "", true));
        assert!(both("", "", false));
    }

    #[test]
    fn question_mark_takes_exactly_one_byte() {
        assert!(both("abc", "a?c", true));
        assert!(!both("ac", "a?c", true));
        assert!(!both("abbc", "a?c", true));
        assert!(both("abc", "???", true));
        assert!(!both("ab", "???", true));
    }

    #[test]
    fn percent_backtracks_to_last_occurrence() {
        assert!(both("abcabc", "%c", true));
        assert!(both("cccc", "%cc", true));
        assert!(both("xaybzc", "%a%b%c", true));
        assert!(!both("xaybz", "%a%b%c", true));
        assert!(both("aXbXc", "a%X%c", true));
    }

    #[test]
    fn trailing_percents_always_succeed() {
        assert!(both("abc", "abc%%%", true));
        assert!(both("abc", "a%%", true));
        assert!(both("abc", "%%%", true));
    }

    #[test]
    fn case_folding() {
        assert!(both("HeLLo", "hello", false));
        assert!(!both("HeLLo", "hello", true));
        assert!(both("ABC", "%b%", false));
        assert!(!both("ABC", "%b%", true));
        assert!(both("xAyBz", "%a%B%", false));
    }

    #[test]
    fn escapes() {
        assert!(both("100%", "100\\%", true));
        assert!(!both("1000", "100\\%", true));
        assert!(both("a?", "a\\?", true));
        assert!(!both("ab", "a\\?", true));
        assert!(both("a\\b", "a\\\\b", true));
        // unescapable byte after a backslash keeps the backslash literal
        assert!(both("\\n", "\\n", true));
        assert!(both("end\\", "end\\", true));
        assert!(both("x%y", "%\\%%", true));
    }

    #[test]
    fn question_runs_after_percent() {
        assert!(both("abcd", "%??", true));
        assert!(!both("a", "%??", true));
        assert!(both("abcd", "a%?d", true));
        assert!(!both("ad", "a%?d", true));
    }

    #[test]
    fn random_corpus_agrees() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let alphabet = b"abAB%?\\";
        let text_alphabet = b"abAB%?\\";
        for _ in 0..4000 {
            let pattern: Vec<u8> = (0..rng.random_range(0..8))
                .map(|_| alphabet[rng.random_range(0..alphabet.len())])
                .collect();
            let text: Vec<u8> = (0..rng.random_range(0..10))
                .map(|_| text_alphabet[rng.random_range(0..text_alphabet.len())])
                .collect();
            for exact in [true, false] {
                let fast = wildcard_match(&text, &pattern, exact);
                let slow = wildcard_match_slow(&text, &pattern, exact);
                assert_eq!(
                    fast,
                    slow,
                    "fast/slow disagree on {:?} ~ {:?} (exact={exact})",
                    String::from_utf8_lossy(&text),
                    String::from_utf8_lossy(&pattern)
                );
            }
        }
    }
}
