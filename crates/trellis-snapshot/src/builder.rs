//! Builder operations: insert, delete, move, and update.
//!
//! Every operation validates its whole input first and only then mutates the
//! forest, so an `Err` always leaves the snapshot untouched.

use std::borrow::Borrow;
use std::collections::HashSet;

use tracing::debug;

use trellis_types::{OutlineItem, Placement};

use crate::error::{SnapshotError, SnapshotResult};
use crate::snapshot::{Node, NodeKey, Snapshot};

impl<T: OutlineItem> Snapshot<T> {
    // ---------------------------------------------------------------
    // Insertion
    // ---------------------------------------------------------------

    /// Append items after the last child of `parent` (`None` = roots).
    pub fn append_items<I>(&mut self, items: I, parent: Option<&T::Id>) -> SnapshotResult<(), T::Id>
    where
        I: IntoIterator<Item = T>,
    {
        self.insert_items(
            items,
            Placement::End {
                parent: parent.cloned(),
            },
        )
    }

    /// Insert items immediately before the sibling `anchor`.
    pub fn insert_items_before<I>(&mut self, items: I, anchor: &T::Id) -> SnapshotResult<(), T::Id>
    where
        I: IntoIterator<Item = T>,
    {
        self.insert_items(items, Placement::Before(anchor.clone()))
    }

    /// Insert items immediately after the sibling `anchor`.
    pub fn insert_items_after<I>(&mut self, items: I, anchor: &T::Id) -> SnapshotResult<(), T::Id>
    where
        I: IntoIterator<Item = T>,
    {
        self.insert_items(items, Placement::After(anchor.clone()))
    }

    /// Insert new items, in order, at `placement`.
    ///
    /// Fails with [`SnapshotError::DuplicateItem`] if any identity already
    /// exists (or repeats within `items`), [`SnapshotError::UnknownParent`] /
    /// [`SnapshotError::UnknownAnchor`] if the placement names an absent item,
    /// and [`SnapshotError::IndexOutOfBounds`] for an index past the end.
    pub fn insert_items<I>(&mut self, items: I, placement: Placement<T::Id>) -> SnapshotResult<(), T::Id>
    where
        I: IntoIterator<Item = T>,
    {
        let items: Vec<T> = items.into_iter().collect();

        let mut batch = HashSet::with_capacity(items.len());
        for item in &items {
            if self.keys.contains_key(item.id()) || !batch.insert(item.id()) {
                return Err(SnapshotError::DuplicateItem(item.id().clone()));
            }
        }

        let (parent, index) = self.resolve_insertion(&placement)?;
        if items.is_empty() {
            return Ok(());
        }

        let count = items.len();
        let mut new_keys = Vec::with_capacity(count);
        for item in items {
            let id = item.id().clone();
            let key = self.nodes.insert(Node {
                item,
                parent,
                children: Vec::new(),
                index: 0,
            });
            self.keys.insert(id, key);
            new_keys.push(key);
        }

        self.list_mut(parent).splice(index..index, new_keys);
        self.reindex(parent, index);

        debug!(count, index, nested = parent.is_some(), "inserted snapshot items");
        Ok(())
    }

    fn resolve_insertion(
        &self,
        placement: &Placement<T::Id>,
    ) -> SnapshotResult<(Option<NodeKey>, usize), T::Id> {
        if let Some(anchor) = placement.anchor() {
            let key = *self
                .keys
                .get(anchor)
                .ok_or_else(|| SnapshotError::UnknownAnchor(anchor.clone()))?;
            let node = &self.nodes[key];
            let offset = usize::from(matches!(placement, Placement::After(_)));
            return Ok((node.parent, node.index + offset));
        }

        let parent = self.parent_key(placement.explicit_parent().flatten())?;
        let len = self.list(parent).len();
        match placement {
            Placement::Start { .. } => Ok((parent, 0)),
            Placement::Index { index, .. } if *index > len => {
                Err(SnapshotError::IndexOutOfBounds { index: *index, len })
            }
            Placement::Index { index, .. } => Ok((parent, *index)),
            _ => Ok((parent, len)),
        }
    }

    fn parent_key(&self, parent: Option<&T::Id>) -> SnapshotResult<Option<NodeKey>, T::Id> {
        match parent {
            None => Ok(None),
            Some(id) => self
                .keys
                .get(id)
                .map(|k| Some(*k))
                .ok_or_else(|| SnapshotError::UnknownParent(id.clone())),
        }
    }

    // ---------------------------------------------------------------
    // Deletion
    // ---------------------------------------------------------------

    /// Remove the named items together with their subtrees.
    ///
    /// Identities that are not present are ignored. Returns the number of
    /// items removed, descendants included.
    pub fn delete_items<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator,
        I::Item: Borrow<T::Id>,
    {
        let mut removed = 0;
        for id in ids {
            // An earlier id in the batch may have taken this one with it.
            let id: &T::Id = id.borrow();
            if let Some(&key) = self.keys.get(id) {
                removed += self.remove_subtree(key);
            }
        }
        if removed > 0 {
            debug!(removed, "deleted snapshot items");
        }
        removed
    }

    /// Strict variant of [`Snapshot::delete_items`].
    ///
    /// Fails with [`SnapshotError::UnknownItem`] before removing anything if
    /// any identity is absent.
    pub fn try_delete_items<I>(&mut self, ids: I) -> SnapshotResult<usize, T::Id>
    where
        I: IntoIterator,
        I::Item: Borrow<T::Id>,
    {
        let ids: Vec<I::Item> = ids.into_iter().collect();
        for id in &ids {
            let id: &T::Id = id.borrow();
            if !self.keys.contains_key(id) {
                return Err(SnapshotError::UnknownItem(id.clone()));
            }
        }
        Ok(self.delete_items(ids))
    }

    /// Remove every item.
    pub fn delete_all_items(&mut self) {
        self.nodes.clear();
        self.keys.clear();
        self.roots.clear();
    }

    fn remove_subtree(&mut self, key: NodeKey) -> usize {
        let (parent, index) = {
            let node = &self.nodes[key];
            (node.parent, node.index)
        };
        self.list_mut(parent).remove(index);
        self.reindex(parent, index);

        let mut removed = 0;
        let mut stack = vec![key];
        while let Some(key) = stack.pop() {
            if let Some(node) = self.nodes.remove(key) {
                self.keys.remove(node.item.id());
                stack.extend(node.children);
                removed += 1;
            }
        }
        removed
    }

    // ---------------------------------------------------------------
    // Moves
    // ---------------------------------------------------------------

    /// Move `id` immediately before the sibling `anchor`.
    pub fn move_item_before(&mut self, id: &T::Id, anchor: &T::Id) -> SnapshotResult<(), T::Id> {
        self.move_item(id, Placement::Before(anchor.clone()))
    }

    /// Move `id` immediately after the sibling `anchor`.
    pub fn move_item_after(&mut self, id: &T::Id, anchor: &T::Id) -> SnapshotResult<(), T::Id> {
        self.move_item(id, Placement::After(anchor.clone()))
    }

    /// Move `id` under `parent` at `index`.
    pub fn move_item_into(
        &mut self,
        id: &T::Id,
        parent: Option<&T::Id>,
        index: usize,
    ) -> SnapshotResult<(), T::Id> {
        self.move_item(
            id,
            Placement::Index {
                parent: parent.cloned(),
                index,
            },
        )
    }

    /// Relocate an existing item, with its subtree, to `placement`.
    ///
    /// Explicit indices address the destination list after the item has been
    /// taken out of its current position. Fails with
    /// [`SnapshotError::UnknownItem`] if the item or the anchor (sibling or
    /// parent) is absent, [`SnapshotError::CyclicMove`] if the destination lies
    /// inside the item's own subtree, and [`SnapshotError::IndexOutOfBounds`]
    /// for an index past the end.
    pub fn move_item(&mut self, id: &T::Id, placement: Placement<T::Id>) -> SnapshotResult<(), T::Id> {
        let key = *self
            .keys
            .get(id)
            .ok_or_else(|| SnapshotError::UnknownItem(id.clone()))?;

        let target = self.resolve_move(key, &placement)?;
        let Some((dest_parent, dest)) = target else {
            // Placing an item next to itself leaves it where it is.
            return Ok(());
        };

        if let Some(dest_key) = dest_parent {
            if dest_key == key || self.key_is_below(dest_key, key) {
                return Err(SnapshotError::CyclicMove {
                    item: id.clone(),
                    destination: self.nodes[dest_key].item.id().clone(),
                });
            }
        }

        let (src_parent, src_index) = {
            let node = &self.nodes[key];
            (node.parent, node.index)
        };
        let len_after_detach = self.list(dest_parent).len() - usize::from(src_parent == dest_parent);
        let index = match dest {
            Destination::Index(index) => {
                if index > len_after_detach {
                    return Err(SnapshotError::IndexOutOfBounds {
                        index,
                        len: len_after_detach,
                    });
                }
                index
            }
            Destination::End => len_after_detach,
            Destination::Before(anchor) | Destination::After(anchor) => {
                let anchor_index = self.nodes[anchor].index;
                let shifted = if src_parent == dest_parent && src_index < anchor_index {
                    anchor_index - 1
                } else {
                    anchor_index
                };
                shifted + usize::from(matches!(dest, Destination::After(_)))
            }
        };

        self.list_mut(src_parent).remove(src_index);
        self.reindex(src_parent, src_index);

        self.nodes[key].parent = dest_parent;
        self.list_mut(dest_parent).insert(index, key);
        self.reindex(dest_parent, index);

        debug!(
            from = src_index,
            to = index,
            reparented = src_parent != dest_parent,
            "moved snapshot item"
        );
        Ok(())
    }

    /// Resolve where a move lands. `None` means the move is a no-op.
    fn resolve_move(
        &self,
        key: NodeKey,
        placement: &Placement<T::Id>,
    ) -> SnapshotResult<Option<(Option<NodeKey>, Destination)>, T::Id> {
        if let Some(anchor) = placement.anchor() {
            let anchor_key = *self
                .keys
                .get(anchor)
                .ok_or_else(|| SnapshotError::UnknownItem(anchor.clone()))?;
            if anchor_key == key {
                return Ok(None);
            }
            let dest = if matches!(placement, Placement::Before(_)) {
                Destination::Before(anchor_key)
            } else {
                Destination::After(anchor_key)
            };
            return Ok(Some((self.nodes[anchor_key].parent, dest)));
        }

        let parent = match placement.explicit_parent().flatten() {
            None => None,
            Some(id) => Some(
                *self
                    .keys
                    .get(id)
                    .ok_or_else(|| SnapshotError::UnknownItem(id.clone()))?,
            ),
        };
        let dest = match placement {
            Placement::Start { .. } => Destination::Index(0),
            Placement::Index { index, .. } => Destination::Index(*index),
            _ => Destination::End,
        };
        Ok(Some((parent, dest)))
    }

    // ---------------------------------------------------------------
    // Content updates
    // ---------------------------------------------------------------

    /// Replace the stored value of an existing item, keeping its position.
    ///
    /// Returns the previous value.
    pub fn update_item(&mut self, item: T) -> SnapshotResult<T, T::Id> {
        let key = *self
            .keys
            .get(item.id())
            .ok_or_else(|| SnapshotError::UnknownItem(item.id().clone()))?;
        Ok(std::mem::replace(&mut self.nodes[key].item, item))
    }

    // ---------------------------------------------------------------
    // Sibling list maintenance
    // ---------------------------------------------------------------

    fn list_mut(&mut self, parent: Option<NodeKey>) -> &mut Vec<NodeKey> {
        match parent {
            Some(p) => &mut self.nodes[p].children,
            None => &mut self.roots,
        }
    }

    /// Renumber cached sibling indices from `from` to the end of the list.
    fn reindex(&mut self, parent: Option<NodeKey>, from: usize) {
        let list = std::mem::take(self.list_mut(parent));
        for (index, key) in list.iter().enumerate().skip(from) {
            self.nodes[*key].index = index;
        }
        *self.list_mut(parent) = list;
    }
}

#[derive(Clone, Copy, Debug)]
enum Destination {
    Index(usize),
    End,
    Before(NodeKey),
    After(NodeKey),
}
