//! In-memory outline widget.

use std::time::Duration;

use tracing::{debug, warn};

use trellis_types::OutlineItem;

use crate::adapter::{Animation, OutlineAdapter, Transaction};
use crate::config::ApplyConfig;

/// Number of calls a [`MemoryOutline`] received, per primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounters {
    pub begin_updates: usize,
    pub end_updates: usize,
    pub insert_calls: usize,
    pub inserted_rows: usize,
    pub remove_calls: usize,
    pub removed_rows: usize,
    pub moves: usize,
    pub reloads: usize,
    /// Updates that did not fit the rows the widget held.
    pub inconsistencies: usize,
}

#[derive(Clone, Debug)]
struct Row<T> {
    item: T,
    expanded: bool,
    children: Vec<Row<T>>,
}

impl<T> Row<T> {
    fn new(item: T) -> Self {
        Self {
            item,
            expanded: false,
            children: Vec::new(),
        }
    }
}

/// In-memory outline widget.
///
/// Holds the full row tree plus per-row expansion state, which is local to
/// the widget and travels with a row when it moves. Intended for tests,
/// headless hosts and the CLI.
pub struct MemoryOutline<T> {
    roots: Vec<Row<T>>,
    counters: CallCounters,
    animation_delay: Option<Duration>,
}

impl<T: OutlineItem> MemoryOutline<T> {
    /// Create an empty widget whose animations complete at once.
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            counters: CallCounters::default(),
            animation_delay: None,
        }
    }

    /// Create an empty widget that takes `delay` to finish animated batches.
    pub fn with_animation_delay(delay: Duration) -> Self {
        Self {
            animation_delay: Some(delay).filter(|d| !d.is_zero()),
            ..Self::new()
        }
    }

    /// Create an empty widget using the configured animation delay.
    pub fn from_config(config: &ApplyConfig) -> Self {
        Self {
            animation_delay: config.animation_delay(),
            ..Self::new()
        }
    }

    pub fn counters(&self) -> CallCounters {
        self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = CallCounters::default();
    }

    // ------------------------------------------------------------------
    // Expansion
    // ------------------------------------------------------------------

    /// Expand a row. Returns `false` if no row has this identity.
    pub fn expand(&mut self, id: &T::Id) -> bool {
        self.set_expanded(id, true)
    }

    /// Collapse a row. Returns `false` if no row has this identity.
    pub fn collapse(&mut self, id: &T::Id) -> bool {
        self.set_expanded(id, false)
    }

    pub fn is_expanded(&self, id: &T::Id) -> bool {
        find(&self.roots, id).is_some_and(|row| row.expanded)
    }

    pub fn expand_all(&mut self) {
        for_each_mut(&mut self.roots, &mut |row| row.expanded = true);
    }

    pub fn collapse_all(&mut self) {
        for_each_mut(&mut self.roots, &mut |row| row.expanded = false);
    }

    fn set_expanded(&mut self, id: &T::Id, expanded: bool) -> bool {
        match find_mut(&mut self.roots, id) {
            Some(row) => {
                row.expanded = expanded;
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Visible rows
    // ------------------------------------------------------------------

    /// Number of rows currently visible: roots plus the children of every
    /// expanded row that is itself visible.
    pub fn number_of_rows(&self) -> usize {
        self.visible_rows().len()
    }

    /// Visible rows top to bottom, with their nesting depth.
    pub fn visible_rows(&self) -> Vec<(usize, &T)> {
        let mut out = Vec::new();
        collect_visible(&self.roots, 0, &mut out);
        out
    }

    /// Visible items top to bottom.
    pub fn visible_items(&self) -> Vec<&T> {
        self.visible_rows().into_iter().map(|(_, item)| item).collect()
    }

    // ------------------------------------------------------------------
    // Row lookup
    // ------------------------------------------------------------------

    fn rows(&self, parent: Option<&T>) -> Option<&Vec<Row<T>>> {
        match parent {
            None => Some(&self.roots),
            Some(parent) => find(&self.roots, parent.id()).map(|row| &row.children),
        }
    }

    fn rows_mut(&mut self, parent: Option<&T>) -> Option<&mut Vec<Row<T>>> {
        match parent {
            None => Some(&mut self.roots),
            Some(parent) => find_mut(&mut self.roots, parent.id()).map(|row| &mut row.children),
        }
    }

    fn inconsistent(&mut self, operation: &'static str, parent: Option<&T>) {
        self.counters.inconsistencies += 1;
        warn!(
            operation,
            parent = ?parent.map(OutlineItem::id),
            "update does not match the widget's rows"
        );
    }
}

impl<T: OutlineItem> Default for MemoryOutline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: OutlineItem> OutlineAdapter<T> for MemoryOutline<T> {
    fn number_of_children(&self, parent: Option<&T>) -> usize {
        self.rows(parent).map_or(0, Vec::len)
    }

    fn begin_updates(&mut self) {
        self.counters.begin_updates += 1;
    }

    fn insert_items(&mut self, parent: Option<&T>, indexes: &[usize], items: &[T], _animation: Animation) {
        self.counters.insert_calls += 1;
        let mut inserted = 0;
        if let Some(rows) = self.rows_mut(parent) {
            for (&index, item) in indexes.iter().zip(items) {
                if index <= rows.len() {
                    rows.insert(index, Row::new(item.clone()));
                    inserted += 1;
                }
            }
        }
        self.counters.inserted_rows += inserted;
        if inserted != items.len() || indexes.len() != items.len() {
            self.inconsistent("insert", parent);
        }
    }

    fn remove_items(&mut self, parent: Option<&T>, indexes: &[usize], _animation: Animation) {
        self.counters.remove_calls += 1;
        let mut removed = 0;
        if let Some(rows) = self.rows_mut(parent) {
            for &index in indexes {
                if index < rows.len() {
                    rows.remove(index);
                    removed += 1;
                }
            }
        }
        self.counters.removed_rows += removed;
        if removed != indexes.len() {
            self.inconsistent("remove", parent);
        }
    }

    fn move_item(&mut self, from_parent: Option<&T>, from_index: usize, to_parent: Option<&T>, to_index: usize) {
        self.counters.moves += 1;
        let row = self
            .rows_mut(from_parent)
            .filter(|rows| from_index < rows.len())
            .map(|rows| rows.remove(from_index));
        let Some(row) = row else {
            self.inconsistent("move", from_parent);
            return;
        };

        if let Some(rows) = self.rows_mut(to_parent).filter(|rows| to_index <= rows.len()) {
            rows.insert(to_index, row);
            return;
        }
        // The source list lost exactly this row, so its old slot is free.
        if let Some(rows) = self.rows_mut(from_parent) {
            rows.insert(from_index, row);
        }
        self.inconsistent("move", to_parent);
    }

    fn reload_item(&mut self, parent: Option<&T>, index: usize, item: &T) {
        self.counters.reloads += 1;
        if let Some(row) = self.rows_mut(parent).and_then(|rows| rows.get_mut(index)) {
            if row.item.same_identity(item) {
                row.item = item.clone();
                return;
            }
        }
        self.inconsistent("reload", parent);
    }

    fn end_updates(&mut self, animation: Animation) -> Transaction {
        self.counters.end_updates += 1;
        let delay = match self.animation_delay {
            Some(delay) if animation.is_animated() => delay,
            _ => return Transaction::finished(),
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime for animation timer; finishing at once");
            return Transaction::finished();
        };

        let (transaction, handle) = Transaction::pending();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            handle.finish();
        });
        transaction
    }
}

fn find<'a, T: OutlineItem>(rows: &'a [Row<T>], id: &T::Id) -> Option<&'a Row<T>> {
    for row in rows {
        if row.item.id() == id {
            return Some(row);
        }
        if let Some(found) = find(&row.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_mut<'a, T: OutlineItem>(rows: &'a mut [Row<T>], id: &T::Id) -> Option<&'a mut Row<T>> {
    for row in rows.iter_mut() {
        if row.item.id() == id {
            return Some(row);
        }
        if let Some(found) = find_mut(&mut row.children, id) {
            return Some(found);
        }
    }
    None
}

fn for_each_mut<T, F: FnMut(&mut Row<T>)>(rows: &mut [Row<T>], f: &mut F) {
    for row in rows {
        f(row);
        for_each_mut(&mut row.children, f);
    }
}

fn collect_visible<'a, T>(rows: &'a [Row<T>], depth: usize, out: &mut Vec<(usize, &'a T)>) {
    for row in rows {
        out.push((depth, &row.item));
        if row.expanded {
            collect_visible(&row.children, depth + 1, out);
        }
    }
}
