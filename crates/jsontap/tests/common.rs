#![allow(missing_docs)]
#![allow(dead_code)]

use std::convert::Infallible;

use futures::stream::{self, Iter};
use jsontap::{Value, from_str};

pub const ITEMS: &str = r#"{"items": [{"id": 1, "name": "Item 1"}, {"id": 2, "name": "Item 2"}]}"#;

pub const MIXED: &str = r#"{"mixed": [1, "string", {"obj": true}, [1,2,3], null]}"#;

pub const TOOL_CALL: &str = r#"
{
    "moderation": {
        "decision": "allow",
        "reason": null
    },
    "steps": [
        {"tool": "search", "args": {"query": "rust streaming json"}},
        {"tool": "open", "args": {"url": "https://example.com/ünïcödé"}},
        {"tool": "answer", "args": {"text": "Done 😀"}}
    ],
    "done": true
}
"#;

pub type Chunks = Iter<std::vec::IntoIter<Result<String, Infallible>>>;

/// Splits `text` into fragments of `size` characters.
pub fn fragments(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

pub fn chunked(text: &str, size: usize) -> Chunks {
    stream::iter(fragments(text, size).into_iter().map(Ok).collect::<Vec<_>>())
}

pub fn json(text: &str) -> Value {
    from_str(text).expect("fixture is valid JSON")
}
