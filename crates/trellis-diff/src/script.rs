//! Edit scripts: the ordered operations produced by [`crate::reconcile`].
//!
//! Every index in a script is valid at the moment its edit is applied, given
//! that all earlier edits have been applied in order. Parents are carried as
//! item values (`None` = root level) so a widget adapter can address them
//! without a lookup.

use serde::Serialize;

use trellis_snapshot::{Placement, Snapshot, SnapshotResult};
use trellis_types::OutlineItem;

/// Whether a move changes the item's parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum MoveKind {
    /// Same parent, different sibling index.
    Reorder,
    /// Different parent.
    Reparent,
}

/// A single structural operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Edit<T> {
    /// A new item appears at `index` under `parent`.
    Insert {
        item: T,
        parent: Option<T>,
        index: usize,
    },
    /// The item at `index` under `parent` disappears together with its subtree.
    Delete {
        item: T,
        parent: Option<T>,
        index: usize,
    },
    /// An existing item, with its subtree, is relocated.
    ///
    /// `to_index` addresses `to_parent`'s children after the item has been
    /// taken out of `from_parent`.
    Move {
        item: T,
        from_parent: Option<T>,
        from_index: usize,
        to_parent: Option<T>,
        to_index: usize,
        kind: MoveKind,
    },
    /// The item at `index` under `parent` keeps its place but its content
    /// changed.
    Reload {
        item: T,
        parent: Option<T>,
        index: usize,
    },
}

impl<T: OutlineItem> Edit<T> {
    /// The item the edit is about.
    pub fn item(&self) -> &T {
        match self {
            Edit::Insert { item, .. }
            | Edit::Delete { item, .. }
            | Edit::Move { item, .. }
            | Edit::Reload { item, .. } => item,
        }
    }

    /// Short name of the operation kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Edit::Insert { .. } => "insert",
            Edit::Delete { .. } => "delete",
            Edit::Move {
                kind: MoveKind::Reorder,
                ..
            } => "move",
            Edit::Move {
                kind: MoveKind::Reparent,
                ..
            } => "reparent",
            Edit::Reload { .. } => "reload",
        }
    }

    /// Returns `true` for a move that changes the item's parent.
    pub fn is_reparent(&self) -> bool {
        matches!(
            self,
            Edit::Move {
                kind: MoveKind::Reparent,
                ..
            }
        )
    }

    /// Apply this edit to a snapshot.
    ///
    /// Fails if the snapshot does not match the state the edit was computed
    /// against.
    pub fn apply_to(&self, snapshot: &mut Snapshot<T>) -> SnapshotResult<(), T::Id> {
        match self {
            Edit::Insert {
                item,
                parent,
                index,
            } => snapshot.insert_items(
                [item.clone()],
                Placement::Index {
                    parent: parent.as_ref().map(|p| p.id().clone()),
                    index: *index,
                },
            ),
            Edit::Delete { item, .. } => snapshot.try_delete_items([item.id()]).map(|_| ()),
            Edit::Move {
                item,
                to_parent,
                to_index,
                ..
            } => snapshot.move_item(
                item.id(),
                Placement::Index {
                    parent: to_parent.as_ref().map(|p| p.id().clone()),
                    index: *to_index,
                },
            ),
            Edit::Reload { item, .. } => snapshot.update_item(item.clone()).map(|_| ()),
        }
    }
}

/// Per-kind operation counts of a script.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScriptSummary {
    pub inserts: usize,
    pub deletes: usize,
    pub moves: usize,
    pub reparents: usize,
    pub reloads: usize,
}

impl ScriptSummary {
    /// Total number of structural operations (everything except reloads).
    pub fn structural(&self) -> usize {
        self.inserts + self.deletes + self.moves + self.reparents
    }
}

/// An ordered sequence of edits.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EditScript<T> {
    edits: Vec<Edit<T>>,
}

impl<T> Default for EditScript<T> {
    fn default() -> Self {
        Self { edits: Vec::new() }
    }
}

impl<T: OutlineItem> EditScript<T> {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, edit: Edit<T>) {
        self.edits.push(edit);
    }

    /// Returns `true` if the script contains no edits.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Number of edits.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// The edits in application order.
    pub fn edits(&self) -> &[Edit<T>] {
        &self.edits
    }

    /// Iterate over the edits in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, Edit<T>> {
        self.edits.iter()
    }

    /// All inserts, in order.
    pub fn inserts(&self) -> impl Iterator<Item = &Edit<T>> {
        self.edits.iter().filter(|e| matches!(e, Edit::Insert { .. }))
    }

    /// All deletes, in order.
    pub fn deletes(&self) -> impl Iterator<Item = &Edit<T>> {
        self.edits.iter().filter(|e| matches!(e, Edit::Delete { .. }))
    }

    /// All moves (reorders and reparents), in order.
    pub fn moves(&self) -> impl Iterator<Item = &Edit<T>> {
        self.edits.iter().filter(|e| matches!(e, Edit::Move { .. }))
    }

    /// All reloads, in order.
    pub fn reloads(&self) -> impl Iterator<Item = &Edit<T>> {
        self.edits.iter().filter(|e| matches!(e, Edit::Reload { .. }))
    }

    /// Count the edits by kind.
    pub fn summary(&self) -> ScriptSummary {
        let mut summary = ScriptSummary::default();
        for edit in &self.edits {
            match edit {
                Edit::Insert { .. } => summary.inserts += 1,
                Edit::Delete { .. } => summary.deletes += 1,
                Edit::Move {
                    kind: MoveKind::Reorder,
                    ..
                } => summary.moves += 1,
                Edit::Move {
                    kind: MoveKind::Reparent,
                    ..
                } => summary.reparents += 1,
                Edit::Reload { .. } => summary.reloads += 1,
            }
        }
        summary
    }

    /// Apply every edit, in order, to `snapshot`.
    ///
    /// Replaying the script computed from `current` to `target` onto a copy of
    /// `current` yields a snapshot equal to `target`. Stops at the first edit
    /// that does not fit.
    pub fn replay(&self, snapshot: &mut Snapshot<T>) -> SnapshotResult<(), T::Id> {
        for edit in &self.edits {
            edit.apply_to(snapshot)?;
        }
        Ok(())
    }
}

impl<T> IntoIterator for EditScript<T> {
    type Item = Edit<T>;
    type IntoIter = std::vec::IntoIter<Edit<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a EditScript<T> {
    type Item = &'a Edit<T>;
    type IntoIter = std::slice::Iter<'a, Edit<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.iter()
    }
}
