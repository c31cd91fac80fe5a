use rstest::rstest;

use crate::{ParserError, StreamingParser, SyntaxError};

fn parse(text: &str) -> ParserError {
    let mut parser = StreamingParser::default();
    match parser.feed(text) {
        Err(err) => err,
        Ok(()) => parser.end().unwrap_err(),
    }
}

fn assert_err_contains(err: &ParserError, expected_sub: &str, line: usize, col: usize) {
    let s = err.to_string();
    assert!(s.contains(expected_sub), "expected substring {expected_sub:?} in {s:?}");
    assert_eq!(err.line, line, "line of {s:?}");
    assert_eq!(err.column, col, "column of {s:?}");
}

#[test]
fn error_empty_document() {
    assert_err_contains(&parse(""), "unexpected end of input", 1, 1);
}

#[test]
fn error_comment() {
    assert_err_contains(&parse("/"), "invalid character '/'", 1, 1);
}

#[test]
fn error_invalid_characters_in_values() {
    assert_err_contains(&parse("a"), "invalid character 'a'", 1, 1);
}

#[test]
fn error_unquoted_property_name() {
    let err = parse("{a:1}");
    assert_eq!(err.syntax_error(), &SyntaxError::InvalidCharacter('a'));
    assert_eq!(err.column, 2);
}

#[test]
fn error_non_string_property_name() {
    let err = parse("{1:1}");
    assert_err_contains(&err, "object keys must be strings", 1, 2);
    let err = parse(r#"{"a":1, null:2}"#);
    assert_eq!(err.syntax_error(), &SyntaxError::NonStringKey);
}

#[test]
fn error_single_quotes() {
    assert_err_contains(&parse("['a']"), "invalid character '\\''", 1, 2);
}

#[rstest]
#[case::sign_only("-a", "invalid number '-'", 2)]
#[case::exponent_indicator("1ea", "invalid number '1e'", 3)]
#[case::exponent_sign("1e-a", "invalid number '1e-'", 4)]
#[case::leading_zero("[01]", "invalid number '01'", 4)]
#[case::trailing_point("[1.]", "invalid number '1.'", 4)]
#[case::leading_point("[.5]", "invalid character '.'", 2)]
#[case::plus_sign("+1", "invalid character '+'", 1)]
#[case::out_of_range("[1e999]", "invalid number '1e999'", 7)]
fn error_malformed_numbers(#[case] text: &str, #[case] message: &str, #[case] col: usize) {
    assert_err_contains(&parse(text), message, 1, col);
}

#[test]
fn error_new_lines_in_strings() {
    assert_err_contains(&parse("\"a\nb\""), "invalid character '\\n'", 1, 3);
}

#[test]
fn error_control_characters_escaped_in_message() {
    assert_err_contains(&parse("\"\u{1}\""), "invalid character '\\u{1}'", 1, 2);
}

#[test]
fn error_invalid_characters_in_literals() {
    assert_err_contains(&parse("tru!"), "invalid literal 'tru!'", 1, 4);
    assert_err_contains(&parse("[nil]"), "invalid literal 'ni'", 1, 3);
}

#[test]
fn error_unknown_escapes() {
    assert_err_contains(&parse(r#""\x""#), "invalid escape sequence '\\x'", 1, 3);
    assert_err_contains(&parse(r#""\1""#), "invalid escape sequence '\\1'", 1, 3);
}

#[test]
fn error_invalid_unicode_escapes() {
    assert_err_contains(
        &parse(r#""\u00g0""#),
        "invalid unicode escape sequence at character: 'g'",
        1,
        6,
    );
    assert_err_contains(
        &parse(r#""\uZ""#),
        "invalid unicode escape sequence at character: 'Z'",
        1,
        4,
    );
}

#[test]
fn error_multiple_values() {
    assert_err_contains(&parse("1 2"), "unexpected value after the end", 1, 3);
    assert_err_contains(&parse("{} []"), "unexpected value after the end", 1, 4);
    assert_err_contains(&parse("[] ]"), "unexpected ']', expected end of input", 1, 4);
}

#[rstest]
#[case::trailing_comma_array("[1,]", "unexpected ']', expected a value", 4)]
#[case::trailing_comma_object(r#"{"a":1,}"#, "unexpected '}', expected a string key", 8)]
#[case::leading_comma("[,1]", "unexpected ',', expected a value or ']'", 2)]
#[case::double_comma("[1,,2]", "unexpected ',', expected a value", 4)]
#[case::missing_comma("[1 2]", "unexpected '2', expected ',' or ']'", 4)]
#[case::missing_colon(r#"{"a" 1}"#, "unexpected '1', expected ':'", 6)]
#[case::close_before_value(r#"{"a":}"#, "unexpected '}', expected a value", 6)]
#[case::close_after_key(r#"{"a"}"#, "unexpected '}', expected ':'", 5)]
#[case::mismatched_array("[1}", "unexpected '}', expected ',' or ']'", 3)]
#[case::mismatched_object(r#"{"a":1]"#, "unexpected ']', expected ',' or '}'", 7)]
#[case::stray_colon("[1:2]", "unexpected ':', expected ',' or ']'", 3)]
#[case::colon_at_root(":", "unexpected ':', expected a value", 1)]
fn error_structure(#[case] text: &str, #[case] message: &str, #[case] col: usize) {
    assert_err_contains(&parse(text), message, 1, col);
}

#[rstest]
#[case::unclosed_object_before_key("{", "an object is still open", 2)]
#[case::unclosed_object_after_key(r#"{"a""#, "an object is still open", 5)]
#[case::unclosed_object_before_value(r#"{"a":"#, "an object is still open", 6)]
#[case::unclosed_object_after_value(r#"{"a":1"#, "an object is still open", 7)]
#[case::unclosed_array("[1, [2]", "an array is still open", 8)]
#[case::unclosed_string(r#"["abc"#, "unexpected end of input", 6)]
#[case::unclosed_escape(r#""\"#, "unexpected end of input", 3)]
#[case::unclosed_literal("[fals", "unexpected end of input", 6)]
fn error_truncation(#[case] text: &str, #[case] message: &str, #[case] col: usize) {
    let err = parse(text);
    assert!(err.is_truncation());
    assert_err_contains(&err, message, 1, col);
}

#[test]
fn error_position_spans_lines() {
    assert_err_contains(&parse("{\n  \"a\": 1,\n  \"b\" 2\n}"), "expected ':'", 3, 7);
}
