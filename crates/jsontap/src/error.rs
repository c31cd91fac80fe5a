use std::sync::Arc;

use thiserror::Error;

/// Boxed error reported by a chunk source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A parse failure together with the position of the offending character.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{source} at {line}:{column}")]
pub struct ParserError {
    pub(crate) source: SyntaxError,
    /// 1-based line of the offending character.
    pub line: usize,
    /// 1-based column of the offending character.
    pub column: usize,
}

impl ParserError {
    /// The underlying syntax error.
    #[must_use]
    pub fn syntax_error(&self) -> &SyntaxError {
        &self.source
    }

    /// Returns `true` when the input ended while a token or container was
    /// still open.
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        matches!(
            self.source,
            SyntaxError::UnexpectedEndOfInput | SyntaxError::UnterminatedContainer(_)
        )
    }
}

/// Lexical, structural and truncation errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyntaxError {
    /// A character that cannot start a token, or a raw control character in
    /// a string.
    #[error("invalid character '{}'", .0.escape_debug())]
    InvalidCharacter(char),
    /// A misspelled `true`, `false` or `null`.
    #[error("invalid literal '{0}'")]
    InvalidLiteral(String),
    /// Malformed or out-of-range number text.
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    /// A backslash followed by an unknown escape character.
    #[error("invalid escape sequence '\\{}'", .0.escape_debug())]
    InvalidEscape(char),
    /// A non-hex digit inside `\uXXXX`.
    #[error("invalid unicode escape sequence at character: '{}'", .0.escape_debug())]
    InvalidUnicodeEscapeChar(char),
    /// A delimiter that does not fit the current position.
    #[error("unexpected '{}', expected {expected}", .found.escape_debug())]
    UnexpectedCharacter {
        /// The offending character.
        found: char,
        /// What the parser would have accepted instead.
        expected: &'static str,
    },
    /// A second value after the root one.
    #[error("unexpected value after the end of the document")]
    UnexpectedValue,
    /// A value where an object key belongs.
    #[error("object keys must be strings")]
    NonStringKey,
    /// Input ended inside a token or before any value.
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    /// Input ended while the named container was open.
    #[error("unexpected end of input, {0} is still open")]
    UnterminatedContainer(&'static str),
    /// Opening a container would exceed
    /// [`ParserOptions::max_depth`](crate::ParserOptions::max_depth).
    #[error("containers nested more than {0} levels deep")]
    NestingTooDeep(usize),
}

/// A path string that cannot be turned into a [`Pointer`](crate::Pointer).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PointerError {
    /// Non-empty text that does not start with `/`.
    #[error("pointer '{0}' must be empty or start with '/'")]
    MissingLeadingSlash(String),
    /// A `~` not followed by `0` or `1`.
    #[error("pointer '{0}' contains a '~' not followed by '0' or '1'")]
    InvalidEscape(String),
}

/// Errors surfaced by [`JsonStream`](crate::JsonStream) accessors.
///
/// A drain failure is recorded once and handed to every accessor observing
/// the same session, so the error is cheap to clone.
#[derive(Debug, Error, Clone)]
pub enum StreamError {
    /// The document is malformed or truncated.
    #[error("parse error: {0}")]
    Parse(#[from] ParserError),
    /// The chunk source failed.
    #[error("source error: {0}")]
    Source(Arc<dyn std::error::Error + Send + Sync + 'static>),
    /// The accessor was given a malformed pointer.
    #[error("invalid pointer: {0}")]
    Pointer(#[from] PointerError),
    /// Another accessor holds the drain.
    #[error("another accessor is already draining this stream")]
    DrainInProgress,
}

impl StreamError {
    pub(crate) fn from_source(err: BoxError) -> Self {
        Self::Source(Arc::from(err))
    }

    /// Returns the parse error, if the drain failed on malformed input.
    #[must_use]
    pub fn as_parse_error(&self) -> Option<&ParserError> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}
