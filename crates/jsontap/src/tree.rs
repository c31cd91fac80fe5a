//! Copy-on-write value tree behind parser snapshots.
//!
//! The parser edits a tree of [`TreeNode`]s whose children are reference
//! counted. Taking a [`Snapshot`] only bumps the root's count; the next edit
//! goes through [`Arc::make_mut`] along the path of open containers, so nodes
//! still shared with a snapshot are copied instead of mutated. Snapshots
//! therefore never observe later edits while consecutive snapshots share every
//! untouched subtree.
//!
//! Container children live in persistent collections from `imbl`: copying a
//! container that a snapshot still holds is O(1), and the edit that follows
//! copies only the O(log n) chunks leading to the touched child.
use std::sync::Arc;

use imbl::{HashMap, Vector};

use crate::{Map, Value, completion::ClosedSet};

/// Stable handle of an object or array, assigned when the parser opens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub(crate) u32);

impl ContainerId {
    /// Position of the container in opening order, starting at zero.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TreeNode {
    /// A member whose key was read but whose value has not arrived yet.
    Absent,
    Leaf(Value),
    Array {
        id: ContainerId,
        items: Vector<Arc<TreeNode>>,
    },
    Object {
        id: ContainerId,
        entries: Entries,
    },
}

/// Object members in arrival order, indexed by key.
#[derive(Debug, Clone, Default)]
pub(crate) struct Entries {
    members: Vector<(Arc<str>, Arc<TreeNode>)>,
    positions: HashMap<Arc<str>, usize>,
}

impl Entries {
    /// Inserts `node` under `key`. A repeated key keeps its first position and
    /// takes the new value.
    pub(crate) fn insert(&mut self, key: String, node: Arc<TreeNode>) {
        if let Some(&i) = self.positions.get(key.as_str()) {
            if let Some(member) = self.members.get_mut(i) {
                member.1 = node;
            }
            return;
        }
        let key: Arc<str> = Arc::from(key);
        self.positions.insert(Arc::clone(&key), self.members.len());
        self.members.push_back((key, node));
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Arc<TreeNode>> {
        let &i = self.positions.get(key)?;
        self.members.get(i).map(|(_, node)| node)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Arc<TreeNode>> {
        let &i = self.positions.get(key)?;
        self.members.get_mut(i).map(|(_, node)| node)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &Arc<TreeNode>)> {
        self.members.iter().map(|(key, node)| (&**key, node))
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &Arc<TreeNode>> {
        self.members.iter().map(|(_, node)| node)
    }
}

impl PartialEq for Entries {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl TreeNode {
    pub(crate) fn new_array(id: ContainerId) -> Self {
        TreeNode::Array {
            id,
            items: Vector::new(),
        }
    }

    pub(crate) fn new_object(id: ContainerId) -> Self {
        TreeNode::Object {
            id,
            entries: Entries::default(),
        }
    }

    /// Materializes the subtree. Absent members are left out.
    pub(crate) fn to_value(&self) -> Option<Value> {
        match self {
            TreeNode::Absent => None,
            TreeNode::Leaf(v) => Some(v.clone()),
            TreeNode::Array { items, .. } => {
                Some(Value::Array(items.iter().filter_map(|n| n.to_value()).collect()))
            }
            TreeNode::Object { entries, .. } => {
                let mut map = Map::new();
                for (k, n) in entries.iter() {
                    if let Some(v) = n.to_value() {
                        map.insert(k.to_string(), v);
                    }
                }
                Some(Value::Object(map))
            }
        }
    }

    /// No member anywhere in the subtree is still waiting for its value.
    pub(crate) fn is_value_complete(&self) -> bool {
        match self {
            TreeNode::Absent => false,
            TreeNode::Leaf(_) => true,
            TreeNode::Array { items, .. } => items.iter().all(|n| n.is_value_complete()),
            TreeNode::Object { entries, .. } => entries.values().all(|n| n.is_value_complete()),
        }
    }

    /// Value-complete, and every container in the subtree has been closed.
    pub(crate) fn is_structurally_complete(&self, closed: &ClosedSet) -> bool {
        match self {
            TreeNode::Absent => false,
            TreeNode::Leaf(_) => true,
            TreeNode::Array { id, items } => {
                closed.contains(*id) && items.iter().all(|n| n.is_structurally_complete(closed))
            }
            TreeNode::Object { id, entries } => {
                closed.contains(*id)
                    && entries
                        .values()
                        .all(|n| n.is_structurally_complete(closed))
            }
        }
    }
}

/// An immutable view of the whole document at one parser edit.
///
/// Cloning a snapshot is cheap; it shares its nodes with the parser until the
/// parser edits them.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub(crate) root: Arc<TreeNode>,
}

impl Snapshot {
    pub(crate) fn new(root: Arc<TreeNode>) -> Self {
        Self { root }
    }

    pub(crate) fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Materializes the document as of this snapshot.
    ///
    /// Object members whose value has not been read yet are omitted.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.root.to_value().unwrap_or_default()
    }

    /// Returns `true` if no member anywhere in the snapshot is still waiting
    /// for its value.
    #[must_use]
    pub fn is_value_complete(&self) -> bool {
        self.root.is_value_complete()
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.root, &other.root) || self.root == other.root
    }
}

/// One atomic edit reported by the parser.
#[derive(Debug, Clone)]
pub struct Update {
    /// The document right after the edit.
    pub snapshot: Snapshot,
    /// The container whose closing delimiter this edit consumed, if any.
    pub closed: Option<ContainerId>,
}
