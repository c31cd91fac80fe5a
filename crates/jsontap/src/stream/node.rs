use core::fmt;

use super::{ChunkSource, JsonStream};
use crate::{StreamError, Value, pointer::Pointer};

/// Coarse type of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
    /// A string, number, boolean or `null`.
    Primitive,
    /// Nothing was found at the node's pointer.
    Unknown,
}

impl NodeKind {
    pub(crate) fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => NodeKind::Object,
            Value::Array(_) => NodeKind::Array,
            _ => NodeKind::Primitive,
        }
    }
}

/// An addressable location in the finished document.
///
/// Nodes carry the concrete pointer they were found at; their value is read
/// back from the document on demand.
pub struct Node<S> {
    stream: JsonStream<S>,
    pointer: Pointer,
    kind: NodeKind,
}

impl<S> Node<S> {
    pub(crate) fn new(stream: JsonStream<S>, pointer: Pointer, kind: NodeKind) -> Self {
        Self {
            stream,
            pointer,
            kind,
        }
    }

    pub(crate) fn unknown(stream: JsonStream<S>, pointer: Pointer) -> Self {
        Self::new(stream, pointer, NodeKind::Unknown)
    }

    /// Where the node is. Concrete unless the node is [`NodeKind::Unknown`].
    #[must_use]
    pub fn pointer(&self) -> &Pointer {
        &self.pointer
    }

    /// What the node held when it was resolved.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }
}

impl<S> Clone for Node<S> {
    fn clone(&self) -> Self {
        Self::new(self.stream.clone(), self.pointer.clone(), self.kind)
    }
}

impl<S> fmt::Debug for Node<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("pointer", &self.pointer.to_string())
            .field("kind", &self.kind)
            .finish()
    }
}

impl<S: ChunkSource> Node<S> {
    /// The node's value in the finished document, if anything is there.
    ///
    /// # Errors
    ///
    /// Fails if draining the source fails.
    pub async fn value(&self) -> Result<Option<Value>, StreamError> {
        let document = self.stream.document().await?;
        Ok(self
            .pointer
            .find(&document)
            .into_iter()
            .next()
            .map(|found| found.node.clone()))
    }

    /// Like [`JsonStream::select`], with `path` relative to this node.
    ///
    /// # Errors
    ///
    /// Fails if `path` is malformed or if draining the source fails.
    pub async fn select(&self, path: &str) -> Result<Node<S>, StreamError> {
        self.stream.select_from(&self.pointer, path).await
    }

    /// Like [`JsonStream::query_selector`], with `path` relative to this node.
    ///
    /// # Errors
    ///
    /// Fails if `path` is malformed or if draining the source fails.
    pub async fn query_selector(&self, path: &str) -> Result<Option<Node<S>>, StreamError> {
        Ok(self.query_selector_all(path).await?.into_iter().next())
    }

    /// Like [`JsonStream::query_selector_all`], with `path` relative to this
    /// node.
    ///
    /// # Errors
    ///
    /// Fails if `path` is malformed or if draining the source fails.
    pub async fn query_selector_all(&self, path: &str) -> Result<Vec<Node<S>>, StreamError> {
        let pointer = self.pointer.join(&Pointer::parse(path)?);
        self.stream.nodes(&pointer).await
    }
}
