/// Configuration options for the streaming parser.
///
/// # Examples
///
/// ```rust
/// use jsontap::{ParserOptions, StreamingParser};
///
/// let parser = StreamingParser::new(ParserOptions {
///     allow_unicode_whitespace: true,
///     ..Default::default()
/// });
/// ```
///
/// # Default
///
/// Flags default to `false`; see each field.
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Whether to allow any Unicode whitespace between JSON tokens.
    ///
    /// By default, the parser only recognizes the four whitespace characters
    /// defined by RFC 8259: space (U+0020), line feed (U+000A),
    /// carriage return (U+000D), and horizontal tab (U+0009). Text generated
    /// by language models occasionally carries non-breaking spaces or a byte
    /// order mark between tokens; enable this to skip them.
    ///
    /// # Default
    ///
    /// `false`
    pub allow_unicode_whitespace: bool,

    /// How many containers may be open at once.
    ///
    /// Opening one more fails with
    /// [`SyntaxError::NestingTooDeep`](crate::SyntaxError::NestingTooDeep).
    /// Walking a snapshot recurses once per level, so the limit keeps small
    /// but deeply nested input from exhausting the stack.
    ///
    /// # Default
    ///
    /// `128`
    pub max_depth: usize,

    #[cfg(any(test, feature = "fuzzing"))]
    /// Panic on syntax errors instead of returning them.
    ///
    /// Enabled only in test builds to produce backtraces on parse failures.
    pub panic_on_error: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            allow_unicode_whitespace: false,
            max_depth: 128,
            #[cfg(any(test, feature = "fuzzing"))]
            panic_on_error: false,
        }
    }
}
