//! JSON Pointer ([RFC 6901]) paths with `*` wildcards, and matching against
//! partially built trees.
//!
//! ```
//! use jsontap::{Pointer, Value, path};
//!
//! let doc: Value = [(
//!     "items",
//!     Value::Array(vec![Value::from(1), Value::from(2)]),
//! )]
//! .into_iter()
//! .collect();
//!
//! let pointer = Pointer::parse("/items/*").unwrap();
//! let found: Vec<_> = pointer.find(&doc).into_iter().map(|m| m.path).collect();
//! assert_eq!(found, vec![path!["items", 0], path!["items", 1]]);
//! ```
//!
//! [RFC 6901]: https://datatracker.ietf.org/doc/html/rfc6901
use core::{fmt, str::FromStr};
use std::sync::Arc;

use crate::{PointerError, Value, tree::TreeNode};

/// One step of a resolved path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathItem {
    /// An object member.
    Key(String),
    /// An array element.
    Index(usize),
}

impl From<&str> for PathItem {
    fn from(s: &str) -> Self {
        Self::Key(s.to_string())
    }
}

impl From<String> for PathItem {
    fn from(s: String) -> Self {
        Self::Key(s)
    }
}

impl From<usize> for PathItem {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

#[doc(hidden)]
pub trait PathItemFrom<T> {
    fn from_path_item(value: T) -> PathItem;
}

macro_rules! impl_integer_as_path_item {
    ($($t:ty),+) => {
        $(
            impl PathItemFrom<$t> for PathItem {
                fn from_path_item(value: $t) -> Self {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    PathItem::Index(value as usize)
                }
            }
        )+
    };
}
impl_integer_as_path_item!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl PathItemFrom<&str> for PathItem {
    fn from_path_item(value: &str) -> Self {
        PathItem::Key(value.to_string())
    }
}

impl PathItemFrom<String> for PathItem {
    fn from_path_item(value: String) -> Self {
        PathItem::Key(value)
    }
}

/// One segment of a [`Pointer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A member name, or an array index when all digits.
    Key(String),
    /// `*`: every element of an array and every member value of an object.
    Wildcard,
}

/// A parsed path: empty for the whole document, otherwise `/`-separated
/// segments with `~1` standing for `/`, `~0` for `~` and `*` for any key or
/// index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Pointer {
    segments: Vec<Segment>,
}

impl Pointer {
    /// The pointer to the whole document.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a path string.
    ///
    /// # Errors
    ///
    /// Returns [`PointerError`] if a non-empty path does not start with `/`,
    /// or if a `~` is not followed by `0` or `1`.
    pub fn parse(text: &str) -> Result<Self, PointerError> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = text.strip_prefix('/') else {
            return Err(PointerError::MissingLeadingSlash(text.to_string()));
        };
        let segments = rest
            .split('/')
            .map(|raw| {
                if raw == "*" {
                    Ok(Segment::Wildcard)
                } else {
                    unescape(raw)
                        .map(Segment::Key)
                        .ok_or_else(|| PointerError::InvalidEscape(text.to_string()))
                }
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { segments })
    }

    /// Builds the concrete pointer of a resolved path.
    #[must_use]
    pub fn from_path(path: &[PathItem]) -> Self {
        let segments = path
            .iter()
            .map(|item| match item {
                PathItem::Key(k) => Segment::Key(k.clone()),
                PathItem::Index(i) => Segment::Key(i.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// The segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns `true` for the pointer to the whole document.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if the pointer contains no wildcard.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        !self.segments.contains(&Segment::Wildcard)
    }

    /// Appends `other` to this pointer.
    #[must_use]
    pub fn join(&self, other: &Pointer) -> Pointer {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Pointer { segments }
    }

    /// Every location in `root` the pointer matches, in document order.
    ///
    /// Missing members or out-of-range indices end their branch without a
    /// match; they are not errors.
    #[must_use]
    pub fn find<'a>(&self, root: &'a Value) -> Vec<Match<'a, Value>> {
        self.find_in(root)
    }

    pub(crate) fn find_in<'a, T: Traverse>(&self, root: &'a T) -> Vec<Match<'a, T>> {
        let mut out = Vec::new();
        let mut path = Vec::with_capacity(self.segments.len());
        walk(&self.segments, root, &mut path, &mut out);
        out
    }
}

impl FromStr for Pointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Pointer {
    type Error = PointerError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            f.write_str("/")?;
            match segment {
                Segment::Wildcard => f.write_str("*")?,
                Segment::Key(key) => {
                    for c in key.chars() {
                        match c {
                            '~' => f.write_str("~0")?,
                            '/' => f.write_str("~1")?,
                            c => fmt::Write::write_char(f, c)?,
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn unescape(raw: &str) -> Option<String> {
    if !raw.contains('~') {
        return Some(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Array index of a segment: ASCII digits without a leading zero.
fn parse_index(key: &str) -> Option<usize> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if canonical { key.parse().ok() } else { None }
}

/// A location found by [`Pointer::find`].
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'a, T> {
    /// The concrete path of the match.
    pub path: Vec<PathItem>,
    /// The matched subtree.
    pub node: &'a T,
}

/// A tree the pointer matcher can walk.
pub trait Traverse {
    /// The member `key` of an object.
    fn member(&self, key: &str) -> Option<&Self>;
    /// The element at `index` of an array.
    fn element(&self, index: usize) -> Option<&Self>;
    /// Every element of an array, or every member of an object, in order.
    fn children(&self) -> Vec<(PathItem, &Self)>;
}

impl Traverse for Value {
    fn member(&self, key: &str) -> Option<&Self> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    fn element(&self, index: usize) -> Option<&Self> {
        match self {
            Value::Array(items) => items.get(index),
            _ => None,
        }
    }

    fn children(&self) -> Vec<(PathItem, &Self)> {
        match self {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (PathItem::Index(i), v))
                .collect(),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| (PathItem::Key(k.clone()), v))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Traverse for TreeNode {
    fn member(&self, key: &str) -> Option<&Self> {
        match self {
            TreeNode::Object { entries, .. } => entries.get(key).map(Arc::as_ref),
            _ => None,
        }
    }

    fn element(&self, index: usize) -> Option<&Self> {
        match self {
            TreeNode::Array { items, .. } => items.get(index).map(Arc::as_ref),
            _ => None,
        }
    }

    fn children(&self) -> Vec<(PathItem, &Self)> {
        match self {
            TreeNode::Array { items, .. } => items
                .iter()
                .enumerate()
                .map(|(i, n)| (PathItem::Index(i), n.as_ref()))
                .collect(),
            TreeNode::Object { entries, .. } => entries
                .iter()
                .map(|(k, n)| (PathItem::Key(k.to_string()), n.as_ref()))
                .collect(),
            TreeNode::Absent | TreeNode::Leaf(_) => Vec::new(),
        }
    }
}

fn walk<'a, T: Traverse>(
    segments: &[Segment],
    node: &'a T,
    path: &mut Vec<PathItem>,
    out: &mut Vec<Match<'a, T>>,
) {
    let Some((segment, rest)) = segments.split_first() else {
        out.push(Match {
            path: path.clone(),
            node,
        });
        return;
    };

    match segment {
        Segment::Wildcard => {
            for (item, child) in node.children() {
                path.push(item);
                walk(rest, child, path, out);
                path.pop();
            }
        }
        Segment::Key(key) => {
            let step = match node.member(key) {
                Some(child) => Some((PathItem::Key(key.clone()), child)),
                None => parse_index(key)
                    .and_then(|i| node.element(i).map(|child| (PathItem::Index(i), child))),
            };
            if let Some((item, child)) = step {
                path.push(item);
                walk(rest, child, path, out);
                path.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{from_str, path};

    fn doc() -> Value {
        from_str(
            r#"{"items":[{"id":1,"tags":["a","b"]},{"id":2,"tags":[]}],
                "a/b":{"m~n":true},
                "meta":{"x":1,"y":[null]}}"#,
        )
        .unwrap()
    }

    fn paths(pointer: &str) -> Vec<Vec<PathItem>> {
        let doc = doc();
        Pointer::parse(pointer)
            .unwrap()
            .find(&doc)
            .into_iter()
            .map(|m| m.path)
            .collect()
    }

    #[rstest]
    #[case("", vec![path![]])]
    #[case("/items/1/id", vec![path!["items", 1, "id"]])]
    #[case("/items/*/id", vec![path!["items", 0, "id"], path!["items", 1, "id"]])]
    #[case("/items/*/tags/*", vec![path!["items", 0, "tags", 0], path!["items", 0, "tags", 1]])]
    #[case("/a~1b/m~0n", vec![path!["a/b", "m~n"]])]
    #[case("/items/7", vec![])]
    #[case("/items/01", vec![])]
    #[case("/missing/*", vec![])]
    #[case("/items/0/id/deeper", vec![])]
    fn resolves_paths(#[case] pointer: &str, #[case] expected: Vec<Vec<PathItem>>) {
        assert_eq!(paths(pointer), expected);
    }

    #[test]
    fn wildcard_fans_out_over_object_members() {
        assert_eq!(paths("/meta/*"), vec![path!["meta", "x"], path!["meta", "y"]]);
        let doc = doc();
        let values: Vec<_> = Pointer::parse("/meta/*")
            .unwrap()
            .find(&doc)
            .into_iter()
            .map(|m| m.node.clone())
            .collect();
        assert_eq!(values, vec![Value::from(1), Value::Array(vec![Value::Null])]);
    }

    #[test]
    fn numeric_keys_still_index_objects() {
        let doc = from_str(r#"{"0":"zero"}"#).unwrap();
        let found = Pointer::parse("/0").unwrap().find(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, path!["0"]);
        assert_eq!(found[0].node, &Value::from("zero"));
    }

    #[rstest]
    #[case("items", PointerError::MissingLeadingSlash("items".into()))]
    #[case("/a~2", PointerError::InvalidEscape("/a~2".into()))]
    #[case("/a~", PointerError::InvalidEscape("/a~".into()))]
    fn rejects_malformed_pointers(#[case] text: &str, #[case] expected: PointerError) {
        assert_eq!(Pointer::parse(text), Err(expected));
    }

    #[test]
    fn display_round_trips_escapes() {
        let pointer = Pointer::parse("/a~1b/*/m~0n/3").unwrap();
        assert_eq!(pointer.to_string(), "/a~1b/*/m~0n/3");
        assert!(!pointer.is_concrete());
        assert_eq!(
            Pointer::from_path(&path!["a/b", 2]).to_string(),
            "/a~1b/2"
        );
        assert_eq!(Pointer::root().to_string(), "");
    }

    #[test]
    fn join_appends_segments() {
        let base = Pointer::parse("/items/0").unwrap();
        let joined = base.join(&Pointer::parse("/tags/*").unwrap());
        assert_eq!(joined.to_string(), "/items/0/tags/*");
        assert_eq!(base.join(&Pointer::root()), base);
    }
}
