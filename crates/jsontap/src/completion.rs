//! Tracking of structurally closed containers.
//!
//! A container is *value-complete* as soon as every member present has a
//! value, which can happen long before its closing delimiter arrives. Being
//! *structurally complete* additionally requires the parser to have consumed
//! the closing delimiter of the container and of every container nested in it.
//! The tracker records closes by [`ContainerId`], so the test does not depend
//! on the identity of any particular snapshot.
use crate::tree::{ContainerId, Snapshot, TreeNode};

/// Growable bitset of closed containers. Never shrinks.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClosedSet {
    words: Vec<u64>,
}

impl ClosedSet {
    pub(crate) fn insert(&mut self, id: ContainerId) {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << bit;
    }

    pub(crate) fn contains(&self, id: ContainerId) -> bool {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        self.words.get(word).is_some_and(|w| w & (1u64 << bit) != 0)
    }
}

/// Records which containers have had their closing delimiter consumed.
///
/// The orchestrator forwards [`Update::closed`](crate::Update::closed) of every
/// update, in order, before matching against that update's snapshot.
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    closed: ClosedSet,
}

impl CompletionTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `id` has been structurally closed.
    pub fn mark_closed(&mut self, id: ContainerId) {
        self.closed.insert(id);
    }

    /// Returns `true` if `id` has been closed.
    #[must_use]
    pub fn is_closed(&self, id: ContainerId) -> bool {
        self.closed.contains(id)
    }

    /// Returns `true` if the whole snapshot is closed and value-complete.
    #[must_use]
    pub fn is_complete(&self, snapshot: &Snapshot) -> bool {
        snapshot.root().is_structurally_complete(&self.closed)
    }

    pub(crate) fn node_is_complete(&self, node: &TreeNode) -> bool {
        node.is_structurally_complete(&self.closed)
    }
}

/// Which notion of "done" a watch waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    /// Every member present has a value; the container may still grow.
    Value,
    /// The closing delimiter of the match and of everything inside it has been
    /// consumed.
    Structural,
}

impl Completeness {
    pub(crate) fn accepts(self, node: &TreeNode, tracker: &CompletionTracker) -> bool {
        match self {
            Completeness::Value => node.is_value_complete(),
            Completeness::Structural => tracker.node_is_complete(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_set_grows_past_word_boundaries() {
        let mut set = ClosedSet::default();
        set.insert(ContainerId(3));
        set.insert(ContainerId(64));
        set.insert(ContainerId(200));

        assert!(set.contains(ContainerId(3)));
        assert!(set.contains(ContainerId(64)));
        assert!(set.contains(ContainerId(200)));
        assert!(!set.contains(ContainerId(4)));
        assert!(!set.contains(ContainerId(65)));
        assert!(!set.contains(ContainerId(10_000)));
    }

    #[test]
    fn scalars_are_complete_in_both_modes() {
        let tracker = CompletionTracker::new();
        let node = TreeNode::Leaf(crate::Value::Null);
        assert!(Completeness::Value.accepts(&node, &tracker));
        assert!(Completeness::Structural.accepts(&node, &tracker));
        assert!(!Completeness::Value.accepts(&TreeNode::Absent, &tracker));
    }

    #[test]
    fn open_container_is_only_value_complete() {
        let mut tracker = CompletionTracker::new();
        let node = TreeNode::new_object(ContainerId(0));
        assert!(Completeness::Value.accepts(&node, &tracker));
        assert!(!Completeness::Structural.accepts(&node, &tracker));

        tracker.mark_closed(ContainerId(0));
        assert!(tracker.is_closed(ContainerId(0)));
        assert!(Completeness::Structural.accepts(&node, &tracker));
    }
}
