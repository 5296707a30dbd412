//! The snapshot forest and its read-only queries.
//!
//! [`Snapshot`] stores nodes in a [`SlotMap`] arena keyed by dense handles and
//! keeps a [`HashMap`] from item identity to handle, so identity, parent,
//! child and sibling-index lookups are all O(1). Each node caches its index
//! within its parent; builder operations renumber the affected sibling list.
//!
//! # Invariants
//!
//! - Every identity appears at most once in the forest.
//! - A node's `parent` lists it among its children at position `index`.
//! - Following parent links from any node reaches a root.

use std::collections::HashMap;
use std::fmt;

use slotmap::{new_key_type, SlotMap};

use trellis_types::OutlineItem;

use crate::error::{SnapshotError, SnapshotResult};

new_key_type! {
    /// Arena handle of a snapshot node.
    pub(crate) struct NodeKey;
}

#[derive(Clone, Debug)]
pub(crate) struct Node<T> {
    pub(crate) item: T,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    /// Position within the parent's child list (or the root list).
    pub(crate) index: usize,
}

/// An ordered forest of uniquely identified items.
///
/// Cloning a snapshot yields an independent copy that can be mutated with the
/// builder operations and then diffed against the original.
#[derive(Clone)]
pub struct Snapshot<T: OutlineItem> {
    pub(crate) nodes: SlotMap<NodeKey, Node<T>>,
    pub(crate) keys: HashMap<T::Id, NodeKey>,
    pub(crate) roots: Vec<NodeKey>,
}

impl<T: OutlineItem> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            keys: HashMap::new(),
            roots: Vec::new(),
        }
    }
}

impl<T: OutlineItem> Snapshot<T> {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of items in the forest.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the snapshot holds no items.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    /// Returns `true` if an item with this identity is present.
    pub fn contains(&self, id: &T::Id) -> bool {
        self.keys.contains_key(id)
    }

    /// The item with the given identity.
    pub fn item(&self, id: &T::Id) -> Option<&T> {
        self.node(id).map(|n| &n.item)
    }

    /// The parent item, or `None` for roots and unknown identities.
    pub fn parent(&self, id: &T::Id) -> Option<&T> {
        let parent = self.node(id)?.parent?;
        Some(&self.nodes[parent].item)
    }

    /// Identity of the parent, or `None` for roots and unknown identities.
    pub fn parent_id(&self, id: &T::Id) -> Option<&T::Id> {
        self.parent(id).map(OutlineItem::id)
    }

    /// Ordered children of `parent` (`None` addresses the roots).
    ///
    /// An unknown parent has no children.
    pub fn children(&self, parent: Option<&T::Id>) -> Vec<&T> {
        self.child_keys(parent)
            .iter()
            .map(|k| &self.nodes[*k].item)
            .collect()
    }

    /// Ordered child identities of `parent`.
    pub fn child_ids(&self, parent: Option<&T::Id>) -> Vec<&T::Id> {
        self.child_keys(parent)
            .iter()
            .map(|k| self.nodes[*k].item.id())
            .collect()
    }

    /// Number of direct children of `parent`.
    pub fn child_count(&self, parent: Option<&T::Id>) -> usize {
        self.child_keys(parent).len()
    }

    /// The child of `parent` at `index`.
    pub fn child_at(&self, parent: Option<&T::Id>, index: usize) -> Option<&T> {
        self.child_keys(parent)
            .get(index)
            .map(|k| &self.nodes[*k].item)
    }

    /// All root items in order.
    pub fn root_items(&self) -> Vec<&T> {
        self.children(None)
    }

    /// Position of the item within its parent's children.
    pub fn index_of(&self, id: &T::Id) -> Option<usize> {
        self.node(id).map(|n| n.index)
    }

    /// Distance from the root level (roots have depth 0).
    pub fn depth_of(&self, id: &T::Id) -> Option<usize> {
        let mut node = self.node(id)?;
        let mut depth = 0;
        while let Some(parent) = node.parent {
            depth += 1;
            node = &self.nodes[parent];
        }
        Some(depth)
    }

    /// Returns `true` if the item has at least one child.
    pub fn is_expandable(&self, id: &T::Id) -> bool {
        self.node(id).is_some_and(|n| !n.children.is_empty())
    }

    /// Returns `true` if `id` lies strictly below `ancestor`.
    pub fn is_descendant(&self, id: &T::Id, ancestor: &T::Id) -> bool {
        match (self.keys.get(id), self.keys.get(ancestor)) {
            (Some(&key), Some(&ancestor)) => self.key_is_below(key, ancestor),
            _ => false,
        }
    }

    /// Number of items nested under `parent` at any depth.
    ///
    /// `None` counts the whole forest. An unknown parent counts as empty.
    pub fn number_of_items(&self, parent: Option<&T::Id>) -> usize {
        let Some(parent) = parent else {
            return self.nodes.len();
        };
        let Some(&start) = self.keys.get(parent) else {
            return 0;
        };
        let mut count = 0;
        let mut stack: Vec<NodeKey> = self.nodes[start].children.clone();
        while let Some(key) = stack.pop() {
            count += 1;
            stack.extend(self.nodes[key].children.iter().copied());
        }
        count
    }

    // ---------------------------------------------------------------
    // Linearization
    // ---------------------------------------------------------------

    /// Visit every item depth-first, parents before children, siblings in
    /// order. The visitor receives the item and its parent.
    pub fn enumerate_items<'a, F>(&'a self, mut visitor: F)
    where
        F: FnMut(&'a T, Option<&'a T>),
    {
        let mut stack: Vec<NodeKey> = self.roots.iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            let node = &self.nodes[key];
            visitor(&node.item, node.parent.map(|p| &self.nodes[p].item));
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Identities in linearization order, each paired with its depth.
    pub fn linearized_ids(&self) -> Vec<(&T::Id, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeKey, usize)> =
            self.roots.iter().rev().map(|k| (*k, 0)).collect();
        while let Some((key, depth)) = stack.pop() {
            let node = &self.nodes[key];
            out.push((node.item.id(), depth));
            stack.extend(node.children.iter().rev().map(|k| (*k, depth + 1)));
        }
        out
    }

    // ---------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------

    /// Re-check the structural invariants of the forest.
    ///
    /// Builder operations preserve these by construction; this is used after
    /// deserialization and in tests.
    pub fn validate(&self) -> SnapshotResult<(), T::Id> {
        if self.keys.len() != self.nodes.len() {
            return Err(SnapshotError::InvariantViolation(format!(
                "identity index holds {} entries for {} nodes",
                self.keys.len(),
                self.nodes.len()
            )));
        }

        for (key, node) in &self.nodes {
            match self.keys.get(node.item.id()) {
                Some(&indexed) if indexed == key => {}
                _ => {
                    return Err(SnapshotError::InvariantViolation(format!(
                        "identity {:?} is not indexed",
                        node.item.id()
                    )))
                }
            }

            let siblings = self.list(node.parent);
            if siblings.get(node.index) != Some(&key) {
                return Err(SnapshotError::InvariantViolation(format!(
                    "{:?} is not listed by its parent at index {}",
                    node.item.id(),
                    node.index
                )));
            }

            for child in &node.children {
                if self.nodes.get(*child).and_then(|c| c.parent) != Some(key) {
                    return Err(SnapshotError::InvariantViolation(format!(
                        "child of {:?} does not point back to it",
                        node.item.id()
                    )));
                }
            }

            // A parent chain longer than the forest means a cycle.
            let mut steps = 0;
            let mut cursor = node.parent;
            while let Some(parent) = cursor {
                steps += 1;
                if steps > self.nodes.len() {
                    return Err(SnapshotError::InvariantViolation(format!(
                        "cycle through {:?}",
                        node.item.id()
                    )));
                }
                cursor = self.nodes[parent].parent;
            }
        }

        for root in &self.roots {
            if self.nodes[*root].parent.is_some() {
                return Err(SnapshotError::InvariantViolation(format!(
                    "root {:?} has a parent",
                    self.nodes[*root].item.id()
                )));
            }
        }

        let listed = self.roots.len()
            + self
                .nodes
                .values()
                .map(|n| n.children.len())
                .sum::<usize>();
        if listed != self.nodes.len() {
            return Err(SnapshotError::InvariantViolation(format!(
                "{} nodes listed for {} stored",
                listed,
                self.nodes.len()
            )));
        }

        Ok(())
    }

    // ---------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------

    pub(crate) fn node(&self, id: &T::Id) -> Option<&Node<T>> {
        self.keys.get(id).map(|k| &self.nodes[*k])
    }

    fn child_keys(&self, parent: Option<&T::Id>) -> &[NodeKey] {
        match parent {
            None => &self.roots,
            Some(id) => match self.keys.get(id) {
                Some(key) => &self.nodes[*key].children,
                None => &[],
            },
        }
    }

    /// The sibling list owned by `parent` (or the roots).
    pub(crate) fn list(&self, parent: Option<NodeKey>) -> &Vec<NodeKey> {
        match parent {
            Some(p) => &self.nodes[p].children,
            None => &self.roots,
        }
    }

    pub(crate) fn key_is_below(&self, key: NodeKey, ancestor: NodeKey) -> bool {
        let mut cursor = self.nodes[key].parent;
        while let Some(parent) = cursor {
            if parent == ancestor {
                return true;
            }
            cursor = self.nodes[parent].parent;
        }
        false
    }
}

/// Snapshots are equal when they hold equal items in the same places.
impl<T: OutlineItem> PartialEq for Snapshot<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut lhs = Vec::with_capacity(self.len());
        self.enumerate_items(|item, parent| lhs.push((item, parent.map(OutlineItem::id))));
        let mut rhs = Vec::with_capacity(other.len());
        other.enumerate_items(|item, parent| rhs.push((item, parent.map(OutlineItem::id))));
        lhs == rhs
    }
}

impl<T> fmt::Debug for Snapshot<T>
where
    T: OutlineItem + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries = Vec::with_capacity(self.len());
        self.enumerate_items(|item, parent| entries.push((parent.map(OutlineItem::id), item)));
        f.debug_struct("Snapshot")
            .field("item_count", &self.len())
            .field("entries", &entries)
            .finish()
    }
}
