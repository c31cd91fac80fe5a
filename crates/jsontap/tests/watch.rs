#![expect(missing_docs)]

mod common;

use std::convert::Infallible;

use common::{ITEMS, MIXED, chunked, json};
use futures::{
    StreamExt, TryStreamExt,
    channel::mpsc,
    executor::block_on,
    future,
    stream,
};
use jsontap::{JsonStream, PointerError, StreamError, SyntaxError, Value};

fn collect<S: jsontap::ChunkSource>(watch: jsontap::Watch<S>) -> Vec<Value> {
    block_on(watch.try_collect::<Vec<_>>()).expect("watch failed")
}

#[test]
fn gated_watch_yields_each_item_once() {
    let stream = JsonStream::new(chunked(ITEMS, 5));
    let items = collect(stream.watch_complete("/items/*").unwrap());
    assert_eq!(
        items,
        [
            json(r#"{"id": 1, "name": "Item 1"}"#),
            json(r#"{"id": 2, "name": "Item 2"}"#),
        ]
    );
}

#[test]
fn eager_watch_reports_growing_items_without_partial_strings() {
    let stream = JsonStream::new(chunked(ITEMS, 5));
    let seen = collect(stream.watch("/items/*").unwrap());

    assert_eq!(seen.first(), Some(&json("{}")));
    assert!(seen.contains(&json(r#"{"id": 1, "name": "Item 1"}"#)));
    assert_eq!(seen.last(), Some(&json(r#"{"id": 2, "name": "Item 2"}"#)));
    for value in &seen {
        if let Some(name) = value.get("name") {
            assert!(matches!(name.as_str(), Some("Item 1" | "Item 2")), "{name:?}");
        }
    }
}

#[test]
fn gated_watch_over_mixed_array() {
    let stream = JsonStream::new(chunked(MIXED, 3));
    let values = collect(stream.watch_complete("/mixed/*").unwrap());
    assert_eq!(
        values,
        [
            json("1"),
            json(r#""string""#),
            json(r#"{"obj": true}"#),
            json("[1,2,3]"),
            Value::Null,
        ]
    );
}

#[test]
fn wildcard_fans_out_over_object_members() {
    let text = r#"{"a": {"x": 1}, "b": {"x": 2}, "c": {"y": 3}}"#;
    let stream = JsonStream::new(chunked(text, 4));
    assert_eq!(
        collect(stream.watch_complete("/*/x").unwrap()),
        [json("1"), json("2")]
    );
}

#[test]
fn strings_are_only_reported_once_closed() {
    let stream = JsonStream::new(chunked(r#"{"s": "hello world"}"#, 1));
    assert_eq!(collect(stream.watch("/s").unwrap()), [json(r#""hello world""#)]);
}

#[test]
fn root_pointer() {
    let stream = JsonStream::new(chunked("[1,2]", 1));
    assert_eq!(
        collect(stream.watch("").unwrap()),
        [json("[]"), json("[1]"), json("[1,2]")]
    );

    let stream = JsonStream::new(chunked(ITEMS, 7));
    assert_eq!(collect(stream.watch_complete("").unwrap()), [json(ITEMS)]);
}

#[test]
fn scalar_root_is_flushed_at_end_of_input() {
    let stream = JsonStream::new(chunked("42", 1));
    assert_eq!(collect(stream.watch_complete("").unwrap()), [json("42")]);
}

#[test]
fn no_match_is_an_empty_stream() {
    let stream = JsonStream::new(chunked(ITEMS, 5));
    assert!(collect(stream.watch("/missing/*").unwrap()).is_empty());
    assert!(stream.is_completed());
}

#[test]
fn malformed_pointer_is_rejected_before_draining() {
    let stream = JsonStream::new(chunked(ITEMS, 5));
    assert_eq!(
        stream.watch("items").unwrap_err(),
        PointerError::MissingLeadingSlash("items".into())
    );
    assert!(stream.current().is_none());
}

#[test]
fn truncated_document_fails_before_any_value() {
    let stream = JsonStream::new(chunked(r#"{"broken": "#, 3));
    let items: Vec<_> = block_on(stream.watch("/broken").unwrap().collect());
    assert_eq!(items.len(), 1);
    let err = items[0].as_ref().unwrap_err();
    let parse = err.as_parse_error().expect("parse error");
    assert_eq!(
        parse.syntax_error(),
        &SyntaxError::UnterminatedContainer("an object")
    );
    assert!(parse.is_truncation());

    // The failure is recorded for every later accessor.
    assert!(matches!(
        block_on(stream.document()),
        Err(StreamError::Parse(_))
    ));
    let again: Vec<_> = block_on(stream.watch("/broken").unwrap().collect());
    assert_eq!(again.len(), 1);
    assert!(again[0].is_err());
}

#[test]
fn syntax_error_is_yielded_after_earlier_matches() {
    let stream = JsonStream::new(chunked(r#"{"ok": [1, 2], "bad": tru!}"#, 4));
    let items: Vec<_> = block_on(stream.watch_complete("/ok").unwrap().collect());
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), &json("[1, 2]"));
    insta::assert_snapshot!(
        items[1].as_ref().unwrap_err().to_string(),
        @"parse error: invalid literal 'tru!' at 1:26"
    );
}

#[test]
fn source_errors_end_the_watch() {
    let chunks = vec![
        Ok("[1, ".to_string()),
        Err(std::io::Error::other("connection reset")),
    ];
    let stream = JsonStream::new(stream::iter(chunks));
    let items: Vec<_> = block_on(stream.watch("/*").unwrap().collect());
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), &json("1"));
    assert_eq!(
        items[1].as_ref().unwrap_err().to_string(),
        "source error: connection reset"
    );
    assert!(matches!(
        block_on(stream.document()),
        Err(StreamError::Source(_))
    ));
}

#[test]
fn byte_chunks_may_split_characters() {
    let text = r#"{"k": "é😀", "ü": [1]}"#;
    let bytes: Vec<_> = text
        .bytes()
        .map(|b| Ok::<_, Infallible>(vec![b]))
        .collect();
    let stream = JsonStream::new(stream::iter(bytes));
    assert_eq!(block_on(stream.document()).unwrap(), json(text));
}

#[test]
fn snapshots_follow_each_changing_chunk() {
    let chunks = ["[1", ",2", "]"].map(|c| Ok::<_, Infallible>(c.to_string()));
    let stream = JsonStream::new(stream::iter(chunks));
    assert_eq!(
        collect(stream.snapshots()),
        [json("[]"), json("[1]"), json("[1,2]")]
    );
}

#[test]
fn second_driver_gets_drain_in_progress() {
    let stream = JsonStream::new(chunked(ITEMS, 5));
    let mut first = stream.watch_complete("/items/*").unwrap();
    assert!(block_on(first.next()).is_some());

    let mut second = stream.watch("/items/*").unwrap();
    assert!(matches!(
        block_on(second.next()),
        Some(Err(StreamError::DrainInProgress))
    ));
    assert!(block_on(second.next()).is_none());
}

#[test]
fn watch_pulls_no_further_than_its_consumer() {
    let stream = JsonStream::new(chunked(ITEMS, 5));
    let mut items = stream.watch_complete("/items/*").unwrap();
    assert!(block_on(items.next()).is_some());

    assert!(!stream.is_completed());
    let current = stream.current().expect("document started");
    assert_ne!(current, json(ITEMS));
    assert_eq!(
        current.get("items").and_then(|items| items.as_array()).map(|a| a[0].clone()),
        Some(json(r#"{"id": 1, "name": "Item 1"}"#))
    );
}

#[test]
fn dropped_watch_hands_the_source_back() {
    let stream = JsonStream::new(chunked(ITEMS, 5));
    let mut first = stream.watch_complete("/items/*").unwrap();
    let item = block_on(first.next()).unwrap().unwrap();
    drop(first);

    let resumed = collect(stream.watch_complete("/items/*").unwrap());
    assert_eq!(resumed, [item, json(r#"{"id": 2, "name": "Item 2"}"#)]);
    assert!(stream.is_completed());
}

#[test]
fn watch_after_completion_replays_final_matches() {
    let stream = JsonStream::new(chunked(MIXED, 5));
    assert_eq!(block_on(stream.document()).unwrap(), json(MIXED));

    assert_eq!(collect(stream.watch("/mixed/2").unwrap()), [json(r#"{"obj": true}"#)]);
    assert_eq!(collect(stream.watch_complete("/mixed/*").unwrap()).len(), 5);
    assert_eq!(collect(stream.snapshots()), [json(MIXED)]);
    assert_eq!(stream.current(), Some(json(MIXED)));
}

#[test]
fn document_waits_for_an_active_watch() {
    let (tx, rx) = mpsc::unbounded::<Result<String, Infallible>>();
    let stream = JsonStream::new(rx);
    let mut items = stream.watch_complete("/items/*").unwrap();
    let mut document = stream.document();

    tx.unbounded_send(Ok(r#"{"items": [{"id": 1}, "#.into())).unwrap();
    block_on(async {
        assert_eq!(items.next().await.unwrap().unwrap(), json(r#"{"id": 1}"#));
        assert!(futures::poll!(&mut document).is_pending());
    });

    tx.unbounded_send(Ok(r#"{"id": 2}]}"#.into())).unwrap();
    drop(tx);
    let (rest, document) = block_on(future::join(items.collect::<Vec<_>>(), document));
    assert_eq!(rest.len(), 1);
    assert_eq!(
        document.unwrap(),
        json(r#"{"items": [{"id": 1}, {"id": 2}]}"#)
    );
}

#[test]
fn gated_watch_waits_for_the_closing_delimiter() {
    let (tx, rx) = mpsc::unbounded::<Result<String, Infallible>>();
    let stream = JsonStream::new(rx);
    let mut gated = stream.watch_complete("/a").unwrap();

    tx.unbounded_send(Ok(r#"{"a": [1, 2, "#.into())).unwrap();
    block_on(async {
        assert!(futures::poll!(gated.next()).is_pending());
    });

    tx.unbounded_send(Ok("3".into())).unwrap();
    block_on(async {
        assert!(futures::poll!(gated.next()).is_pending());
    });

    tx.unbounded_send(Ok("]}".into())).unwrap();
    drop(tx);
    assert_eq!(collect(gated), [json("[1, 2, 3]")]);
}

#[test]
fn eager_watch_sees_a_container_before_it_closes() {
    let (tx, rx) = mpsc::unbounded::<Result<String, Infallible>>();
    let stream = JsonStream::new(rx);
    let mut eager = stream.watch("/a").unwrap();

    tx.unbounded_send(Ok(r#"{"a": [1, 2, "#.into())).unwrap();
    block_on(async {
        assert_eq!(eager.next().await.unwrap().unwrap(), json("[]"));
        assert_eq!(eager.next().await.unwrap().unwrap(), json("[1]"));
        assert_eq!(eager.next().await.unwrap().unwrap(), json("[1, 2]"));
        assert!(futures::poll!(eager.next()).is_pending());
    });

    tx.unbounded_send(Ok("3]}".into())).unwrap();
    drop(tx);
    assert_eq!(collect(eager), [json("[1, 2, 3]")]);
}

#[test]
fn clones_share_one_drain() {
    let stream = JsonStream::new(chunked(ITEMS, 9));
    let other = stream.clone();
    assert_eq!(collect(stream.watch_complete("/items/0/id").unwrap()), [json("1")]);
    assert!(other.is_completed());
    assert_eq!(collect(other.watch("/items/1/id").unwrap()), [json("2")]);
}
