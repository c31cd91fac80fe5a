//! Reacts to a model's tool call while the response is still streaming.
//!
//! The assistant was prompted with a tool description whose arguments look
//! roughly like this (abridged):
//!
//! ```text
//! {
//!   "moderation": { "decision": "allow" | "block", "reason": string | null },
//!   "steps":      [ { "tool": string, "args": object }, ... ]
//! }
//! ```
//!
//! The response arrives as a `text/event-stream` body in which every message
//! carries the next few characters of that document in
//! `choices[0].delta.content`, the way chat-completion APIs deliver partial
//! tokens. The example
//!
//! 1. checks `moderation` as soon as that object is closed, aborting before
//!    the rest of the payload is even read when the decision is `"block"`;
//! 2. runs every step as soon as its object is complete, long before the
//!    response ends.
//!
//! Run with
//!
//! ```bash
//! cargo run -p jsontap --example llm_tool_call
//! ```

#![allow(clippy::doc_markdown)]

use std::convert::Infallible;

use futures::{TryStreamExt, executor::block_on, stream};
use jsontap::{
    JsonStream, Pointer, StreamError, Value,
    adapter::{content_chunks, text_at},
    sse::json_payloads,
};

const ARGUMENTS: &str = r#"{"moderation":{"decision":"allow","reason":null},"steps":[{"tool":"search","args":{"query":"streaming json"}},{"tool":"open","args":{"url":"https://example.com"}},{"tool":"answer","args":{"text":"Done!"}}]}"#;

/// A toy response body. In real life this comes from the network in chunks
/// that ignore message and character boundaries alike.
fn simulated_body() -> Vec<Result<Vec<u8>, Infallible>> {
    let mut body = String::from(": connected\n\n");
    let chars: Vec<char> = ARGUMENTS.chars().collect();
    for fragment in chars.chunks(9) {
        let fragment: String = fragment.iter().collect();
        let escaped = fragment.replace('\\', "\\\\").replace('"', "\\\"");
        body.push_str(&format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{escaped}\"}}}}]}}\n\n"
        ));
    }
    body.push_str("data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n");
    body.push_str("data: [DONE]\n\n");

    body.as_bytes()
        .chunks(23)
        .map(|chunk| Ok(chunk.to_vec()))
        .collect()
}

fn finished(message: &Value) -> bool {
    message
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("finish_reason"))
        .is_some_and(Value::is_string)
}

fn main() -> Result<(), StreamError> {
    let payloads = json_payloads(stream::iter(simulated_body()));
    let content = Pointer::parse("/choices/0/delta/content")?;
    let chunks = content_chunks(payloads, text_at(content), finished);
    let json = JsonStream::new(Box::pin(chunks));

    block_on(async {
        // The moderation verdict comes first, so only the first few messages
        // are read here.
        let mut moderation = json.watch_complete("/moderation")?;
        if let Some(verdict) = moderation.try_next().await? {
            if verdict.get("decision").and_then(Value::as_str) == Some("block") {
                eprintln!("🚨  Moderation blocked the content, aborting");
                return Ok(());
            }
            println!("✅  Moderation decision: {:?}", verdict.get("decision"));
        }
        // Dropping the watch hands the rest of the stream to the next one.
        drop(moderation);

        let mut steps = json.watch_complete("/steps/*")?;
        while let Some(step) = steps.try_next().await? {
            let tool = step.get("tool").and_then(Value::as_str).unwrap_or("?");
            println!("🔧  {tool} {:?}", step.get("args"));
        }

        let document = json.document().await?;
        println!(
            "📄  {} steps in the finished call",
            document
                .get("steps")
                .and_then(Value::as_array)
                .map_or(0, Vec::len)
        );
        Ok::<(), StreamError>(())
    })
}
