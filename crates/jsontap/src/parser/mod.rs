//! The resumable JSON parser.
//!
//! [`StreamingParser`] accepts text in fragments of any size and builds the
//! document as it goes. Every atomic edit (a scalar placed, a key read, a
//! container opened or closed) queues an [`Update`] carrying a snapshot of the
//! whole document at that point.
//!
//! # Examples
//!
//! ```rust
//! use jsontap::{ParserOptions, StreamingParser, Value};
//!
//! let mut parser = StreamingParser::new(ParserOptions::default());
//! parser.feed(r#"{"key": [nu"#).unwrap();
//! parser.feed(r#"ll, true]}"#).unwrap();
//! parser.end().unwrap();
//!
//! let updates = parser.drain_updates();
//! assert_eq!(updates.last().and_then(|u| u.closed).map(|id| id.index()), Some(0));
//! assert_eq!(
//!     parser.root_value(),
//!     Some(
//!         [("key", Value::Array(vec![Value::Null, Value::Boolean(true)]))]
//!             .into_iter()
//!             .collect()
//!     )
//! );
//! ```
#![allow(clippy::module_name_repetitions)]

mod escape_buffer;
mod frame;
mod literal_buffer;
mod numbers;

use std::sync::Arc;

use self::{
    escape_buffer::{UnicodeEscapeBuffer, unescape},
    frame::{ArrayState, Frame, FrameStack, ObjectState},
    literal_buffer::{ExpectedLiteralBuffer, Step},
    numbers::{is_number_char, parse_number},
};
use crate::{
    ParserError, ParserOptions, SyntaxError, Value,
    pointer::PathItem,
    tree::{ContainerId, Snapshot, TreeNode, Update},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Default,
    String,
    Number,
    Literal,
}

/// Progress through an escape sequence inside a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    Backslash,
    Unicode,
}

/// The streaming JSON parser.
///
/// Feed text with [`feed`](Self::feed), signal the end of input with
/// [`end`](Self::end), and collect the queued edits with
/// [`drain_updates`](Self::drain_updates). Once a call fails, the parser is
/// poisoned and every later call returns the same error.
#[derive(Debug)]
pub struct StreamingParser {
    options: ParserOptions,

    line: usize,
    column: usize,

    lex_state: LexState,
    /// Raw text of the token in flight.
    token: String,
    escape: Escape,
    unicode_escape_buffer: UnicodeEscapeBuffer,
    expected_literal: ExpectedLiteralBuffer,

    frames: FrameStack,
    root: Option<Arc<TreeNode>>,
    next_id: u32,

    /// Whether edits queue an [`Update`]. Off for one-shot parsing, so no
    /// snapshot keeps old container versions alive.
    record: bool,
    updates: Vec<Update>,
    error: Option<ParserError>,
}

impl Default for StreamingParser {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

impl StreamingParser {
    /// Creates a parser with the given options.
    #[must_use]
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            line: 1,
            column: 1,
            lex_state: LexState::Default,
            token: String::new(),
            escape: Escape::None,
            unicode_escape_buffer: UnicodeEscapeBuffer::new(),
            expected_literal: ExpectedLiteralBuffer::none(),
            frames: FrameStack::new(),
            root: None,
            next_id: 0,
            record: true,
            updates: Vec::new(),
            error: None,
        }
    }

    /// A parser that queues no updates, for callers that only want the final
    /// value.
    pub(crate) fn without_updates(options: ParserOptions) -> Self {
        Self {
            record: false,
            ..Self::new(options)
        }
    }

    /// Consumes every character of `text`.
    ///
    /// # Errors
    ///
    /// Returns the first lexical or structural error in `text`, or the error
    /// an earlier call already returned.
    ///
    /// ```rust
    /// # use jsontap::StreamingParser;
    /// let mut parser = StreamingParser::default();
    /// parser.feed("[1, 2").unwrap();
    /// assert!(parser.feed("}").is_err());
    /// ```
    pub fn feed(&mut self, text: &str) -> Result<(), ParserError> {
        self.check()?;
        for c in text.chars() {
            if let Err(err) = self.consume(c) {
                return Err(self.fail(err));
            }
            self.advance(c);
        }
        Ok(())
    }

    /// Marks the end of input.
    ///
    /// A number still being read is completed here, since only the end of
    /// input tells `12` apart from the start of `123`.
    ///
    /// # Errors
    ///
    /// Fails if a string or literal is cut short, if a container is still
    /// open, or if no value was read at all.
    pub fn end(&mut self) -> Result<(), ParserError> {
        self.check()?;
        let truncated = match self.lex_state {
            LexState::Number => {
                self.lex_state = LexState::Default;
                self.finish_number().err()
            }
            LexState::String | LexState::Literal => Some(SyntaxError::UnexpectedEndOfInput),
            LexState::Default => None,
        }
        .or_else(|| {
            self.frames
                .last()
                .map(|frame| SyntaxError::UnterminatedContainer(frame.describe()))
        })
        .or_else(|| self.root.is_none().then_some(SyntaxError::UnexpectedEndOfInput));

        match truncated {
            Some(err) => Err(self.fail(err)),
            None => Ok(()),
        }
    }

    /// Ends the input and returns the finished document.
    pub(crate) fn finish(&mut self) -> Result<Snapshot, ParserError> {
        self.end()?;
        match self.snapshot() {
            Some(snapshot) => Ok(snapshot),
            None => Err(self.fail(SyntaxError::UnexpectedEndOfInput)),
        }
    }

    /// Takes the updates queued since the previous call, oldest first.
    pub fn drain_updates(&mut self) -> Vec<Update> {
        core::mem::take(&mut self.updates)
    }

    /// The document read so far, or `None` before the first value starts.
    #[must_use]
    pub fn root_value(&self) -> Option<Value> {
        self.root.as_deref().and_then(TreeNode::to_value)
    }

    /// A snapshot of the document read so far.
    #[must_use]
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.root.as_ref().map(|root| Snapshot::new(Arc::clone(root)))
    }

    /// Returns `true` once the root value has been completely read.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.root.is_some() && self.frames.is_empty() && self.lex_state == LexState::Default
    }

    // --------------------------------------------------------------------------------------------
    // Lexer
    // --------------------------------------------------------------------------------------------

    fn consume(&mut self, c: char) -> Result<(), SyntaxError> {
        match self.lex_state {
            LexState::Default => self.dispatch(c),
            LexState::String => self.string_char(c),
            LexState::Number => {
                if is_number_char(c) {
                    self.token.push(c);
                    Ok(())
                } else {
                    self.lex_state = LexState::Default;
                    self.finish_number()?;
                    self.dispatch(c)
                }
            }
            LexState::Literal => match self.expected_literal.step(c) {
                Step::NeedMore => {
                    self.token.push(c);
                    Ok(())
                }
                Step::Done(value) => {
                    self.lex_state = LexState::Default;
                    self.token.clear();
                    self.place(TreeNode::Leaf(value));
                    Ok(())
                }
                Step::Reject => {
                    self.token.push(c);
                    Err(SyntaxError::InvalidLiteral(core::mem::take(&mut self.token)))
                }
            },
        }
    }

    fn dispatch(&mut self, c: char) -> Result<(), SyntaxError> {
        match c {
            ' ' | '\t' | '\n' | '\r' => Ok(()),
            c if self.options.allow_unicode_whitespace
                && (c.is_whitespace() || c == '\u{FEFF}') =>
            {
                Ok(())
            }
            '{' | '[' => {
                self.expect_value(c)?;
                self.open(c)
            }
            '}' | ']' => self.close(c),
            ',' => self.comma(c),
            ':' => self.colon(c),
            '"' => {
                if !self.frames.last().is_some_and(Frame::awaits_key) {
                    self.expect_value(c)?;
                }
                self.lex_state = LexState::String;
                self.escape = Escape::None;
                self.token.clear();
                Ok(())
            }
            '-' | '0'..='9' => {
                self.expect_value(c)?;
                self.lex_state = LexState::Number;
                self.token.clear();
                self.token.push(c);
                Ok(())
            }
            't' | 'f' | 'n' => {
                self.expect_value(c)?;
                self.lex_state = LexState::Literal;
                self.expected_literal = ExpectedLiteralBuffer::new(c);
                self.token.clear();
                self.token.push(c);
                Ok(())
            }
            c => Err(SyntaxError::InvalidCharacter(c)),
        }
    }

    fn string_char(&mut self, c: char) -> Result<(), SyntaxError> {
        match self.escape {
            Escape::None => match c {
                '"' => return self.finish_string(),
                '\\' => self.escape = Escape::Backslash,
                c if c < '\u{20}' => return Err(SyntaxError::InvalidCharacter(c)),
                _ => {}
            },
            Escape::Backslash => match c {
                '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' => self.escape = Escape::None,
                'u' => {
                    self.unicode_escape_buffer.reset();
                    self.escape = Escape::Unicode;
                }
                c => return Err(SyntaxError::InvalidEscape(c)),
            },
            Escape::Unicode => {
                if self.unicode_escape_buffer.feed(c)?.is_some() {
                    self.escape = Escape::None;
                }
            }
        }
        self.token.push(c);
        Ok(())
    }

    fn finish_string(&mut self) -> Result<(), SyntaxError> {
        self.lex_state = LexState::Default;
        let text = unescape(&self.token)?;
        self.token.clear();

        match self.frames.last_mut() {
            Some(Frame::Object {
                state: state @ (ObjectState::KeyOrEnd | ObjectState::Key),
                pending_key,
                ..
            }) => {
                *state = ObjectState::Colon;
                *pending_key = Some(text.clone());
                self.attach(&PathItem::Key(text), TreeNode::Absent);
                self.push_update(None);
            }
            _ => {
                self.place(TreeNode::Leaf(Value::String(text)));
            }
        }
        Ok(())
    }

    fn finish_number(&mut self) -> Result<(), SyntaxError> {
        let number = parse_number(&self.token)?;
        self.token.clear();
        self.place(TreeNode::Leaf(Value::Number(number)));
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Structure
    // --------------------------------------------------------------------------------------------

    /// Checks that a value may start at the current position.
    fn expect_value(&self, found: char) -> Result<(), SyntaxError> {
        match self.frames.last() {
            None if self.root.is_some() => Err(SyntaxError::UnexpectedValue),
            None => Ok(()),
            Some(frame) if frame.awaits_value() => Ok(()),
            Some(frame) if frame.awaits_key() => Err(SyntaxError::NonStringKey),
            Some(frame) => Err(SyntaxError::UnexpectedCharacter {
                found,
                expected: frame.expected(),
            }),
        }
    }

    fn open(&mut self, c: char) -> Result<(), SyntaxError> {
        if self.frames.depth() >= self.options.max_depth {
            return Err(SyntaxError::NestingTooDeep(self.options.max_depth));
        }
        let id = ContainerId(self.next_id);
        self.next_id += 1;
        let (node, frame) = if c == '{' {
            (TreeNode::new_object(id), Frame::new_object(id))
        } else {
            (TreeNode::new_array(id), Frame::new_array(id))
        };
        let slot = self.place(node);
        self.frames.push(slot, frame);
        Ok(())
    }

    fn close(&mut self, c: char) -> Result<(), SyntaxError> {
        let Some(frame) = self.frames.last() else {
            return Err(SyntaxError::UnexpectedCharacter {
                found: c,
                expected: self.expected_outside_root(),
            });
        };
        if frame.closing_delimiter() != c || !frame.may_close() {
            return Err(SyntaxError::UnexpectedCharacter {
                found: c,
                expected: frame.expected(),
            });
        }
        let id = frame.id();
        self.frames.pop();
        self.push_update(Some(id));
        Ok(())
    }

    fn comma(&mut self, c: char) -> Result<(), SyntaxError> {
        match self.frames.last_mut() {
            Some(Frame::Array { state, .. }) if *state == ArrayState::CommaOrEnd => {
                *state = ArrayState::Value;
                Ok(())
            }
            Some(Frame::Object { state, .. }) if *state == ObjectState::CommaOrEnd => {
                *state = ObjectState::Key;
                Ok(())
            }
            _ => Err(self.unexpected(c)),
        }
    }

    fn colon(&mut self, c: char) -> Result<(), SyntaxError> {
        match self.frames.last_mut() {
            Some(Frame::Object { state, .. }) if *state == ObjectState::Colon => {
                *state = ObjectState::Value;
                Ok(())
            }
            _ => Err(self.unexpected(c)),
        }
    }

    fn unexpected(&self, found: char) -> SyntaxError {
        SyntaxError::UnexpectedCharacter {
            found,
            expected: self
                .frames
                .last()
                .map_or_else(|| self.expected_outside_root(), Frame::expected),
        }
    }

    fn expected_outside_root(&self) -> &'static str {
        if self.root.is_some() {
            "end of input"
        } else {
            "a value"
        }
    }

    /// Places a value at the current position, which [`expect_value`] has
    /// already vetted, and returns its slot in the enclosing container.
    ///
    /// [`expect_value`]: Self::expect_value
    fn place(&mut self, node: TreeNode) -> Option<PathItem> {
        let slot = match self.frames.last_mut() {
            None => None,
            Some(Frame::Array { state, len, .. }) => {
                *state = ArrayState::CommaOrEnd;
                *len += 1;
                Some(PathItem::Index(*len - 1))
            }
            Some(Frame::Object {
                state, pending_key, ..
            }) => {
                *state = ObjectState::CommaOrEnd;
                Some(PathItem::Key(pending_key.take().unwrap_or_default()))
            }
        };

        match &slot {
            Some(slot) => self.attach(slot, node),
            None => self.root = Some(Arc::new(node)),
        }
        self.push_update(None);
        slot
    }

    /// Stores `node` into the innermost open container. The frames mirror the
    /// tree, so the slot always fits that container.
    fn attach(&mut self, slot: &PathItem, node: TreeNode) {
        match (open_container(&mut self.root, &self.frames), slot) {
            (Some(TreeNode::Array { items, .. }), PathItem::Index(_)) => {
                items.push_back(Arc::new(node));
            }
            (Some(TreeNode::Object { entries, .. }), PathItem::Key(key)) => {
                entries.insert(key.clone(), Arc::new(node));
            }
            _ => {}
        }
    }

    fn push_update(&mut self, closed: Option<ContainerId>) {
        if !self.record {
            return;
        }
        if let Some(snapshot) = self.snapshot() {
            self.updates.push(Update { snapshot, closed });
        }
    }

    // --------------------------------------------------------------------------------------------
    // Positions & errors
    // --------------------------------------------------------------------------------------------

    fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn check(&self) -> Result<(), ParserError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn fail(&mut self, source: SyntaxError) -> ParserError {
        let err = ParserError {
            source,
            line: self.line,
            column: self.column,
        };
        #[cfg(any(test, feature = "fuzzing"))]
        assert!(!self.options.panic_on_error, "Syntax error: {err}");
        self.error = Some(err.clone());
        err
    }
}

/// Walks from the root to the innermost open container, un-sharing every node
/// on the way so the edit cannot leak into earlier snapshots.
fn open_container<'a>(
    root: &'a mut Option<Arc<TreeNode>>,
    frames: &FrameStack,
) -> Option<&'a mut TreeNode> {
    let mut node = Arc::make_mut(root.as_mut()?);
    for slot in frames.slots() {
        node = match (node, slot) {
            (TreeNode::Array { items, .. }, PathItem::Index(i)) => Arc::make_mut(items.get_mut(*i)?),
            (TreeNode::Object { entries, .. }, PathItem::Key(key)) => {
                Arc::make_mut(entries.get_mut(key.as_str())?)
            }
            _ => return None,
        };
    }
    Some(node)
}

/// Parses a complete document in one go.
///
/// # Errors
///
/// Returns the first syntax error, including truncation.
///
/// No intermediate snapshots are taken, so the tree is edited in place.
///
/// ```rust
/// let value = jsontap::from_str(r#"{"a": [1, "two", null]}"#).unwrap();
/// assert_eq!(value.get("a").and_then(|a| a.as_array()).map(Vec::len), Some(3));
/// ```
pub fn from_str(text: &str) -> Result<Value, ParserError> {
    let mut parser = StreamingParser::without_updates(ParserOptions::default());
    parser.feed(text)?;
    parser.end()?;
    Ok(parser.root_value().unwrap_or_default())
}
