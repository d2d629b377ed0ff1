//! Numeric coercion between stored strings and script counters.
//!
//! Counters are 32-bit signed integers. Reading a string as a number never
//! wraps: out-of-range digit runs saturate at `i32::MIN` / `i32::MAX`.

/// Whitespace as recognised by C `isspace` in the "C" locale.
pub(crate) fn is_c_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | 0x0B | 0x0C | b'\r')
}

/// Parse the leading decimal integer of `bytes`, saturating on overflow.
///
/// Leading whitespace and a single `+`/`-` sign are accepted; parsing stops at
/// the first non-digit. Empty or non-numeric input yields 0.
///
/// ```
/// use strand_engine::numeric::parse_int;
///
/// assert_eq!(parse_int(b"  -42abc"), -42);
/// assert_eq!(parse_int(b"99999999999999"), i32::MAX);
/// assert_eq!(parse_int(b"hello"), 0);
/// ```
pub fn parse_int(bytes: &[u8]) -> i32 {
    let mut pos = bytes.iter().position(|b| !is_c_space(*b)).unwrap_or(bytes.len());
    if pos >= bytes.len() {
        return 0;
    }

    let negative = bytes[pos] == b'-';
    if negative || bytes[pos] == b'+' {
        pos += 1;
    }

    // accumulate toward the sign so i32::MIN is reachable
    let mut value: i32 = 0;
    for &byte in bytes[pos..].iter().take_while(|b| b.is_ascii_digit()) {
        let digit = i32::from(byte - b'0');
        let next = value.checked_mul(10).and_then(|v| {
            if negative {
                v.checked_sub(digit)
            } else {
                v.checked_add(digit)
            }
        });
        match next {
            Some(v) => value = v,
            None => return if negative { i32::MIN } else { i32::MAX },
        }
    }
    value
}

/// Canonical decimal representation of a counter value.
pub fn format_int(value: i32) -> Vec<u8> {
    let mut buffer = itoa::Buffer::new();
    buffer.format(value).as_bytes().to_vec()
}

/// Equivalent of C `strtol(.., 10)`: returns the parsed value and the number
/// of bytes consumed. When no digits are found nothing is consumed.
pub(crate) fn parse_long_prefix(bytes: &[u8]) -> (i64, usize) {
    let (negative, digits_at) = sign_prefix(bytes);
    let digits = count_digits(&bytes[digits_at..]);
    if digits == 0 {
        return (0, 0);
    }

    let mut value: i64 = 0;
    let mut saturated = false;
    for &byte in &bytes[digits_at..digits_at + digits] {
        let digit = i64::from(byte - b'0');
        let next = value.checked_mul(10).and_then(|v| {
            if negative {
                v.checked_sub(digit)
            } else {
                v.checked_add(digit)
            }
        });
        match next {
            Some(v) if !saturated => value = v,
            _ => {
                saturated = true;
                value = if negative { i64::MIN } else { i64::MAX };
            },
        }
    }
    (value, digits_at + digits)
}

/// Equivalent of C `strtoul(.., 10)`: a leading `-` negates in unsigned
/// arithmetic, so `"-1"` is `u64::MAX`.
pub(crate) fn parse_ulong_prefix(bytes: &[u8]) -> (u64, usize) {
    let (negative, digits_at) = sign_prefix(bytes);
    let digits = count_digits(&bytes[digits_at..]);
    if digits == 0 {
        return (0, 0);
    }

    let mut value: u64 = 0;
    for &byte in &bytes[digits_at..digits_at + digits] {
        match value.checked_mul(10).and_then(|v| v.checked_add(u64::from(byte - b'0'))) {
            Some(v) => value = v,
            None => return (u64::MAX, digits_at + digits),
        }
    }
    let value = if negative { value.wrapping_neg() } else { value };
    (value, digits_at + digits)
}

/// Parse a whole byte run as `strtol` would, ignoring anything after the digits.
pub(crate) fn parse_long_lenient(bytes: &[u8]) -> i64 {
    parse_long_prefix(bytes).0
}

/// Clamp a C `long` result into the `int` range.
pub(crate) fn long_to_int(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

fn sign_prefix(bytes: &[u8]) -> (bool, usize) {
    let mut pos = bytes.iter().position(|b| !is_c_space(*b)).unwrap_or(bytes.len());
    let mut negative = false;
    if let Some(&sign) = bytes.get(pos)
        && (sign == b'-' || sign == b'+')
    {
        negative = sign == b'-';
        pos += 1;
    }
    (negative, pos)
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
