//! Decoding of JSON string escapes.
//!
//! The lexer validates escapes as characters arrive and keeps the raw text of
//! the string; [`unescape`] turns that raw text into the string value once the
//! closing quote has been read. `\uXXXX` escapes are UTF-16 code units: a high
//! surrogate followed by a low surrogate escape combines into one character,
//! and a surrogate without its partner decodes to U+FFFD.
use core::str::Chars;

use crate::SyntaxError;

/// Accumulates the four hexadecimal digits of a `\u` escape.
#[derive(Debug, Default)]
pub(crate) struct UnicodeEscapeBuffer {
    unit: u16,
    len: u8,
}

impl UnicodeEscapeBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reset(&mut self) {
        self.unit = 0;
        self.len = 0;
    }

    /// Feeds one digit. Returns the code unit once four digits have been
    /// provided, and resets for the next escape.
    pub(crate) fn feed(&mut self, c: char) -> Result<Option<u16>, SyntaxError> {
        let Some(digit) = c.to_digit(16) else {
            return Err(SyntaxError::InvalidUnicodeEscapeChar(c));
        };
        #[allow(clippy::cast_possible_truncation)]
        let digit = digit as u16;
        self.unit = (self.unit << 4) | digit;
        self.len += 1;
        if self.len == 4 {
            let unit = self.unit;
            self.reset();
            Ok(Some(unit))
        } else {
            Ok(None)
        }
    }
}

fn read_unit(chars: &mut Chars<'_>) -> Result<u16, SyntaxError> {
    let mut buf = UnicodeEscapeBuffer::new();
    loop {
        let c = chars.next().ok_or(SyntaxError::UnexpectedEndOfInput)?;
        if let Some(unit) = buf.feed(c)? {
            return Ok(unit);
        }
    }
}

/// Consumes `\uXXXX` from the front of `chars` if it encodes a low surrogate.
fn take_low_surrogate(chars: &mut Chars<'_>) -> Option<u16> {
    let mut ahead = chars.clone();
    if ahead.next() != Some('\\') || ahead.next() != Some('u') {
        return None;
    }
    let unit = read_unit(&mut ahead).ok()?;
    if (0xDC00..=0xDFFF).contains(&unit) {
        *chars = ahead;
        Some(unit)
    } else {
        None
    }
}

/// Decodes the raw text between the quotes of a JSON string.
pub(crate) fn unescape(raw: &str) -> Result<String, SyntaxError> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = chars.next().ok_or(SyntaxError::UnexpectedEndOfInput)?;
        match escaped {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            '/' => out.push('/'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'u' => {
                let unit = read_unit(&mut chars)?;
                let decoded = match unit {
                    0xD800..=0xDBFF => take_low_surrogate(&mut chars).and_then(|low| {
                        let high = u32::from(unit - 0xD800);
                        char::from_u32(0x10000 + (high << 10) + u32::from(low - 0xDC00))
                    }),
                    _ => char::from_u32(u32::from(unit)),
                };
                out.push(decoded.unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            other => return Err(SyntaxError::InvalidEscape(other)),
        }
    }
    Ok(out)
}
