//! The reconciler: compute the edit script between two snapshots.
//!
//! The script is produced by simulation. A working copy of `current` receives
//! every edit as it is emitted, so each index is read from the exact state the
//! widget will be in when it applies that edit.
//!
//! Phases, in emission order:
//!
//! 1. Deleted items with no surviving descendant are removed as whole
//!    subtrees, deepest first, then by descending index.
//! 2. Target parents are visited breadth-first. Under each parent the target
//!    children are walked in ascending index: items on the longest common
//!    subsequence of old and new sibling order stay, other surviving items
//!    move in behind their target predecessor, new items are inserted there.
//!    A parent is always at its final place before its children are placed,
//!    so a move can never create a cycle.
//! 3. Deleted items that still held surviving descendants during phase 2 are
//!    removed once those descendants have moved out.
//! 4. Every surviving item whose value changed is reloaded at its final
//!    coordinates, in target linearization order.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use trellis_snapshot::Snapshot;
use trellis_types::OutlineItem;

use crate::order::stable_subsequence;
use crate::script::{Edit, EditScript, MoveKind};

/// Compute the edit script that turns `current` into `target`.
///
/// Never fails on well-formed snapshots. The result is deterministic:
/// reconciling the same pair twice yields identical scripts.
pub fn reconcile<T: OutlineItem>(current: &Snapshot<T>, target: &Snapshot<T>) -> EditScript<T> {
    let mut reconciler = Reconciler {
        current,
        target,
        working: current.clone(),
        script: EditScript::new(),
    };

    reconciler.delete_detached();
    reconciler.place_top_down();
    reconciler.delete_hollow();
    reconciler.reload_changed();

    debug_assert!(
        reconciler.working == *target,
        "replayed working copy diverged from the target snapshot"
    );

    let script = reconciler.script;
    debug!(
        edits = script.len(),
        current = current.len(),
        target = target.len(),
        "reconciled snapshots"
    );
    script
}

struct Reconciler<'a, T: OutlineItem> {
    current: &'a Snapshot<T>,
    target: &'a Snapshot<T>,
    /// `current` with every emitted edit applied.
    working: Snapshot<T>,
    script: EditScript<T>,
}

impl<'a, T: OutlineItem> Reconciler<'a, T> {
    fn emit(&mut self, edit: Edit<T>) {
        if let Err(err) = edit.apply_to(&mut self.working) {
            // Only reachable with a malformed input snapshot.
            unreachable!("edit does not fit the working copy: {err}");
        }
        self.script.push(edit);
    }

    /// Latest known value for an identity: the target's if it survives.
    fn value_of(&self, id: &T::Id) -> Option<T> {
        self.target
            .item(id)
            .or_else(|| self.working.item(id))
            .cloned()
    }

    fn parent_value(&self, parent: Option<&T::Id>) -> Option<T> {
        parent.and_then(|p| self.value_of(p))
    }

    /// Delete `id` (with its subtree) at its working coordinates.
    fn emit_delete(&mut self, id: &T::Id) {
        let (Some(item), Some(index)) = (self.working.item(id).cloned(), self.working.index_of(id))
        else {
            return;
        };
        let parent = self.parent_value(self.working.parent_id(id));
        self.emit(Edit::Delete {
            item,
            parent,
            index,
        });
    }

    // ---------------------------------------------------------------
    // Phase 1: deletes that do not strand surviving items
    // ---------------------------------------------------------------

    fn delete_detached(&mut self) {
        let linear = self.current.linearized_ids();

        // Whether each current node has a surviving descendant.
        let mut anchors_survivor: HashMap<&T::Id, bool> = HashMap::with_capacity(linear.len());
        for (id, _) in linear.iter().rev() {
            let survives = self.target.contains(id)
                || anchors_survivor.get(*id).copied().unwrap_or(false);
            if let Some(parent) = self.current.parent_id(id) {
                let entry = anchors_survivor.entry(parent).or_insert(false);
                *entry = *entry || survives;
            }
        }

        let deletable = |id: &T::Id| {
            !self.target.contains(id) && !anchors_survivor.get(id).copied().unwrap_or(false)
        };

        let mut doomed: Vec<(usize, usize, T::Id)> = linear
            .iter()
            .enumerate()
            .filter(|(_, (id, _))| deletable(id))
            .filter(|(_, (id, _))| {
                // Only the top of each deletable subtree.
                self.current.parent_id(id).map_or(true, |p| !deletable(p))
            })
            .map(|(position, (id, depth))| (*depth, position, (*id).clone()))
            .collect();
        doomed.sort_by_key(|(depth, position, _)| (Reverse(*depth), Reverse(*position)));

        for (_, _, id) in doomed {
            self.emit_delete(&id);
        }
    }

    // ---------------------------------------------------------------
    // Phase 2: inserts and moves, one target parent at a time
    // ---------------------------------------------------------------

    fn place_top_down(&mut self) {
        let mut queue: VecDeque<Option<T::Id>> = VecDeque::new();
        queue.push_back(None);

        while let Some(parent) = queue.pop_front() {
            let children: Vec<T::Id> = self
                .target
                .child_ids(parent.as_ref())
                .into_iter()
                .cloned()
                .collect();
            self.place_children(parent.as_ref(), &children);
            queue.extend(children.into_iter().map(Some));
        }
    }

    fn place_children(&mut self, parent: Option<&T::Id>, children: &[T::Id]) {
        let stable = self.stable_children(parent, children);

        for (position, id) in children.iter().enumerate() {
            if stable.contains(id) {
                continue;
            }

            let source = self
                .working
                .index_of(id)
                .map(|index| (self.working.parent_id(id).cloned(), index));
            let same_parent = source
                .as_ref()
                .is_some_and(|(from_parent, _)| from_parent.as_ref() == parent);

            // Directly behind the target predecessor, counted after the item
            // has left its current slot.
            let to_index = match position.checked_sub(1).map(|p| &children[p]) {
                None => 0,
                Some(previous) => {
                    let previous_index = self.working.index_of(previous).unwrap_or(0);
                    match &source {
                        Some((_, from_index)) if same_parent && *from_index < previous_index => {
                            previous_index
                        }
                        _ => previous_index + 1,
                    }
                }
            };

            let Some(item) = self.target.item(id).cloned() else {
                continue;
            };
            let to_parent = self.parent_value(parent);

            match source {
                Some((from_parent, from_index)) => {
                    let kind = if same_parent {
                        MoveKind::Reorder
                    } else {
                        MoveKind::Reparent
                    };
                    let from_parent = self.parent_value(from_parent.as_ref());
                    self.emit(Edit::Move {
                        item,
                        from_parent,
                        from_index,
                        to_parent,
                        to_index,
                        kind,
                    });
                }
                None => self.emit(Edit::Insert {
                    item,
                    parent: to_parent,
                    index: to_index,
                }),
            }
        }
    }

    /// Children that already sit under `parent` and keep their relative order.
    ///
    /// Until `parent` is processed, its surviving children still have their
    /// `current` order in the working copy.
    fn stable_children(&self, parent: Option<&T::Id>, children: &[T::Id]) -> HashSet<T::Id> {
        let wanted: HashSet<&T::Id> = children.iter().collect();
        let old_order: Vec<&T::Id> = self
            .working
            .child_ids(parent)
            .into_iter()
            .filter(|id| wanted.contains(id))
            .collect();
        let present: HashSet<&T::Id> = old_order.iter().copied().collect();
        let new_order: Vec<&T::Id> = children.iter().filter(|id| present.contains(id)).collect();

        stable_subsequence(&old_order, &new_order)
            .into_iter()
            .cloned()
            .collect()
    }

    // ---------------------------------------------------------------
    // Phase 3: deletes that had to wait for their survivors to leave
    // ---------------------------------------------------------------

    fn delete_hollow(&mut self) {
        let linear = self.working.linearized_ids();
        let mut hollow: Vec<(usize, usize, T::Id)> = linear
            .iter()
            .enumerate()
            .filter(|(_, (id, _))| !self.target.contains(id))
            .filter(|(_, (id, _))| {
                self.working
                    .parent_id(id)
                    .map_or(true, |p| self.target.contains(p))
            })
            .map(|(position, (id, depth))| (*depth, position, (*id).clone()))
            .collect();
        hollow.sort_by_key(|(depth, position, _)| (Reverse(*depth), Reverse(*position)));

        for (_, _, id) in hollow {
            self.emit_delete(&id);
        }
    }

    // ---------------------------------------------------------------
    // Phase 4: content changes
    // ---------------------------------------------------------------

    fn reload_changed(&mut self) {
        let mut changed = Vec::new();
        self.target.enumerate_items(|item, parent| {
            if let Some(old) = self.current.item(item.id()) {
                if old != item {
                    changed.push((item.clone(), parent.cloned()));
                }
            }
        });

        for (item, parent) in changed {
            let index = self.target.index_of(item.id()).unwrap_or(0);
            self.emit(Edit::Reload {
                item,
                parent,
                index,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Item {
        id: &'static str,
        rev: u32,
    }

    impl OutlineItem for Item {
        type Id = &'static str;

        fn id(&self) -> &&'static str {
            &self.id
        }
    }

    fn it(id: &'static str) -> Item {
        Item { id, rev: 0 }
    }

    fn linear(s: &Snapshot<Item>) -> Vec<&'static str> {
        let mut out = Vec::new();
        s.enumerate_items(|i, _| out.push(i.id));
        out
    }

    fn roundtrip(current: &Snapshot<Item>, target: &Snapshot<Item>) -> EditScript<Item> {
        let script = reconcile(current, target);
        let mut replayed = current.clone();
        script.replay(&mut replayed).unwrap();
        assert_eq!(&replayed, target);
        script
    }

    #[test]
    fn identical_snapshots_produce_empty_script() {
        let mut s = Snapshot::new();
        s.append_items([it("a"), it("b")], None).unwrap();
        s.append_items([it("a1")], Some(&"a")).unwrap();
        assert!(reconcile(&s, &s).is_empty());
    }

    #[test]
    fn empty_to_empty() {
        let s: Snapshot<Item> = Snapshot::new();
        assert!(reconcile(&s, &s).is_empty());
    }

    #[test]
    fn append_roots_to_empty() {
        let current = Snapshot::new();
        let mut target = Snapshot::new();
        target.append_items([it("a"), it("b"), it("c")], None).unwrap();

        let script = roundtrip(&current, &target);
        let indices: Vec<usize> = script
            .iter()
            .map(|e| match e {
                Edit::Insert { index, parent: None, .. } => *index,
                other => panic!("expected root insert, got {other:?}"),
            })
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn new_subtree_inserted_parent_first() {
        let current = Snapshot::new();
        let mut target = Snapshot::new();
        target.append_items([it("p")], None).unwrap();
        target.append_items([it("c1"), it("c2")], Some(&"p")).unwrap();
        target.append_items([it("g")], Some(&"c1")).unwrap();

        let script = roundtrip(&current, &target);
        let order: Vec<&str> = script.iter().map(|e| e.item().id).collect();
        assert_eq!(order, vec!["p", "c1", "c2", "g"]);
    }

    #[test]
    fn deleting_parent_emits_single_delete() {
        let mut current = Snapshot::new();
        current.append_items([it("a"), it("b")], None).unwrap();
        current.append_items([it("a1"), it("a2")], Some(&"a")).unwrap();
        let mut target = current.clone();
        target.delete_items([&"a"]);

        let script = roundtrip(&current, &target);
        assert_eq!(script.len(), 1);
        assert!(matches!(
            &script.edits()[0],
            Edit::Delete { item, parent: None, index: 0 } if item.id == "a"
        ));
    }

    #[test]
    fn deletes_run_deepest_first_then_descending_index() {
        let mut current = Snapshot::new();
        current.append_items([it("a"), it("b"), it("c")], None).unwrap();
        current.append_items([it("b1"), it("b2")], Some(&"b")).unwrap();
        let mut target = current.clone();
        target.delete_items([&"a", &"c", &"b1", &"b2"]);

        let script = roundtrip(&current, &target);
        let deletes: Vec<(&str, usize)> = script
            .iter()
            .map(|e| match e {
                Edit::Delete { item, index, .. } => (item.id, *index),
                other => panic!("expected delete, got {other:?}"),
            })
            .collect();
        assert_eq!(deletes, vec![("b2", 1), ("b1", 0), ("c", 2), ("a", 0)]);
    }

    #[test]
    fn insertions_and_deletions_across_parents() {
        let mut current = Snapshot::new();
        current.append_items([it("a"), it("b")], None).unwrap();
        current.append_items([it("a1")], Some(&"a")).unwrap();
        current.append_items([it("b2")], Some(&"b")).unwrap();

        let mut target = current.clone();
        target.insert_items_after([it("a2"), it("a3")], &"a1").unwrap();
        target.insert_items_before([it("b1")], &"b2").unwrap();
        target.delete_items([&"a1", &"b2"]);

        let script = roundtrip(&current, &target);
        assert_eq!(linear(&target), vec!["a", "a2", "a3", "b", "b1"]);

        let summary = script.summary();
        assert_eq!(summary.deletes, 2);
        assert_eq!(summary.inserts, 3);
        assert_eq!(summary.moves + summary.reparents, 0);

        // Deletes come before inserts.
        let first_insert = script
            .iter()
            .position(|e| matches!(e, Edit::Insert { .. }))
            .unwrap();
        assert!(script.iter().skip(first_insert).all(|e| !matches!(e, Edit::Delete { .. })));
    }

    #[test]
    fn moves_between_parents() {
        let mut current = Snapshot::new();
        current.append_items([it("a"), it("b")], None).unwrap();
        current.append_items([it("a1"), it("b2"), it("a3")], Some(&"a")).unwrap();
        current.append_items([it("b1"), it("a2")], Some(&"b")).unwrap();

        let mut target = current.clone();
        target.move_item_before(&"a2", &"b2").unwrap();
        target.move_item_after(&"b2", &"b1").unwrap();

        let script = roundtrip(&current, &target);
        assert_eq!(linear(&target), vec!["a", "a1", "a2", "a3", "b", "b1", "b2"]);
        assert_eq!(script.len(), 2);
        assert!(script.iter().all(Edit::is_reparent));
    }

    #[test]
    fn reparent_is_single_move_with_parent_and_index() {
        let mut current = Snapshot::new();
        current.append_items([it("a"), it("b")], None).unwrap();
        current.append_items([it("x")], Some(&"a")).unwrap();
        current.append_items([it("b1"), it("b2")], Some(&"b")).unwrap();

        let mut target = current.clone();
        target.move_item_into(&"x", Some(&"b"), 1).unwrap();

        let script = roundtrip(&current, &target);
        assert_eq!(script.len(), 1);
        match &script.edits()[0] {
            Edit::Move {
                item,
                from_parent,
                from_index,
                to_parent,
                to_index,
                kind,
            } => {
                assert_eq!(item.id, "x");
                assert_eq!(from_parent.as_ref().map(|p| p.id), Some("a"));
                assert_eq!(*from_index, 0);
                assert_eq!(to_parent.as_ref().map(|p| p.id), Some("b"));
                assert_eq!(*to_index, 1);
                assert_eq!(*kind, MoveKind::Reparent);
            }
            other => panic!("expected move, got {other:?}"),
        }
        assert_eq!(script.deletes().count(), 0);
        assert_eq!(script.inserts().count(), 0);
    }

    #[test]
    fn sibling_reorder_uses_minimal_moves() {
        let mut current = Snapshot::new();
        current
            .append_items([it("a"), it("b"), it("c"), it("d"), it("e")], None)
            .unwrap();
        let mut target = current.clone();
        target.move_item_before(&"e", &"a").unwrap();
        target.move_item_after(&"b", &"d").unwrap();

        let script = roundtrip(&current, &target);
        // [e, a, c, d, b]: longest kept run is a, c, d.
        assert_eq!(script.summary().moves, 2);
        assert_eq!(script.summary().reparents, 0);
    }

    #[test]
    fn content_change_only_reloads() {
        let mut current = Snapshot::new();
        current.append_items([it("a"), it("b")], None).unwrap();
        current.append_items([it("a1")], Some(&"a")).unwrap();

        let mut target = current.clone();
        target.update_item(Item { id: "a1", rev: 1 }).unwrap();
        target.update_item(Item { id: "b", rev: 1 }).unwrap();

        let script = roundtrip(&current, &target);
        assert_eq!(script.len(), 2);
        let reloads: Vec<(&str, Option<&str>, usize)> = script
            .iter()
            .map(|e| match e {
                Edit::Reload { item, parent, index } => {
                    (item.id, parent.as_ref().map(|p| p.id), *index)
                }
                other => panic!("expected reload, got {other:?}"),
            })
            .collect();
        assert_eq!(reloads, vec![("a1", Some("a"), 0), ("b", None, 1)]);
    }

    #[test]
    fn moved_and_changed_item_moves_then_reloads() {
        let mut current = Snapshot::new();
        current.append_items([it("a"), it("b")], None).unwrap();
        let mut target = current.clone();
        target.move_item_before(&"b", &"a").unwrap();
        target.update_item(Item { id: "b", rev: 2 }).unwrap();

        let script = roundtrip(&current, &target);
        let kinds: Vec<&str> = script.iter().map(Edit::kind_name).collect();
        assert_eq!(kinds, vec!["move", "reload"]);
    }

    #[test]
    fn survivor_inside_deleted_parent_is_rescued() {
        let mut current = Snapshot::new();
        current.append_items([it("old"), it("keep")], None).unwrap();
        current.append_items([it("child")], Some(&"old")).unwrap();

        let mut target = Snapshot::new();
        target.append_items([it("keep"), it("new")], None).unwrap();
        target.append_items([it("child")], Some(&"new")).unwrap();

        let script = roundtrip(&current, &target);
        let kinds: Vec<(&str, &str)> = script.iter().map(|e| (e.kind_name(), e.item().id)).collect();
        assert_eq!(
            kinds,
            vec![("insert", "new"), ("reparent", "child"), ("delete", "old")]
        );
    }

    #[test]
    fn parent_and_child_swap_places() {
        let mut current = Snapshot::new();
        current.append_items([it("outer")], None).unwrap();
        current.append_items([it("inner")], Some(&"outer")).unwrap();

        let mut target = Snapshot::new();
        target.append_items([it("inner")], None).unwrap();
        target.append_items([it("outer")], Some(&"inner")).unwrap();

        let script = roundtrip(&current, &target);
        assert_eq!(script.summary().reparents, 2);
    }

    #[test]
    fn moves_follow_target_depth() {
        let mut current = Snapshot::new();
        current.append_items([it("a"), it("b")], None).unwrap();
        current.append_items([it("deep")], Some(&"a")).unwrap();
        current.append_items([it("b1")], Some(&"b")).unwrap();

        // b goes under a, deep goes under b.
        let mut target = Snapshot::new();
        target.append_items([it("a")], None).unwrap();
        target.append_items([it("b")], Some(&"a")).unwrap();
        target.append_items([it("b1"), it("deep")], Some(&"b")).unwrap();

        let script = roundtrip(&current, &target);
        let order: Vec<&str> = script.moves().map(|e| e.item().id).collect();
        assert_eq!(order, vec!["b", "deep"]);
    }

    #[test]
    fn deterministic() {
        let mut current = Snapshot::new();
        current.append_items([it("a"), it("b"), it("c")], None).unwrap();
        current.append_items([it("a1"), it("a2")], Some(&"a")).unwrap();
        let mut target = Snapshot::new();
        target.append_items([it("c"), it("a")], None).unwrap();
        target.append_items([it("a2"), it("n"), it("a1")], Some(&"c")).unwrap();

        assert_eq!(reconcile(&current, &target), reconcile(&current, &target));
    }
}
