//! The apply engine: owns the applied snapshot and drives a widget to match
//! each new one.

use serde::Serialize;
use tracing::{debug, info, warn};

use trellis_diff::{reconcile, Edit, EditScript, ScriptSummary};
use trellis_snapshot::Snapshot;
use trellis_types::OutlineItem;

use crate::adapter::{Animation, OutlineAdapter, Transaction};
use crate::config::ApplyConfig;
use crate::error::{ApplyError, ApplyResult};

/// Whether a widget batch is still being presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Applying,
}

/// What one apply did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Edits in the reconciled script, per kind.
    pub summary: ScriptSummary,
    /// Calls made to the widget inside the batch, after coalescing.
    pub adapter_calls: usize,
    pub animated: bool,
    /// Parents whose widget child count differed from the snapshot.
    pub row_mismatches: usize,
}

/// A run of same-parent inserts or removes waiting to become one widget call.
enum Pending<T> {
    Insert {
        parent: Option<T>,
        indexes: Vec<usize>,
        items: Vec<T>,
    },
    Remove {
        parent: Option<T>,
        indexes: Vec<usize>,
    },
}

/// Keeps a widget in sync with a sequence of snapshots.
///
/// Each apply reconciles the engine's current snapshot against the new one,
/// replays the script on the widget inside one batch and waits for the
/// widget to finish presenting it. Once the edits reach the widget, the new
/// snapshot is the engine's current one.
pub struct ApplyEngine<T: OutlineItem, A: OutlineAdapter<T>> {
    adapter: A,
    current: Snapshot<T>,
    config: ApplyConfig,
    state: EngineState,
    in_flight: Option<Transaction>,
}

impl<T: OutlineItem, A: OutlineAdapter<T>> ApplyEngine<T, A> {
    /// Create an engine for an empty widget.
    pub fn new(adapter: A) -> Self {
        Self::with_config(adapter, ApplyConfig::default())
    }

    pub fn with_config(adapter: A, config: ApplyConfig) -> Self {
        Self {
            adapter,
            current: Snapshot::new(),
            config,
            state: EngineState::Idle,
            in_flight: None,
        }
    }

    pub fn config(&self) -> &ApplyConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Give up the engine, returning the widget.
    pub fn into_adapter(self) -> A {
        self.adapter
    }

    // ------------------------------------------------------------------
    // Data source
    // ------------------------------------------------------------------

    /// A copy of the applied snapshot.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.current.clone()
    }

    /// The applied snapshot, borrowed.
    pub fn current(&self) -> &Snapshot<T> {
        &self.current
    }

    pub fn number_of_children(&self, parent: Option<&T::Id>) -> usize {
        self.current.child_count(parent)
    }

    pub fn child(&self, parent: Option<&T::Id>, index: usize) -> Option<&T> {
        self.current.child_at(parent, index)
    }

    pub fn is_expandable(&self, id: &T::Id) -> bool {
        self.current.is_expandable(id)
    }

    // ------------------------------------------------------------------
    // Applying
    // ------------------------------------------------------------------

    /// Apply `target` with the configured default animation.
    pub async fn apply(&mut self, target: Snapshot<T>) -> ApplyResult<ApplyReport> {
        let animate = self.config.animate_by_default;
        self.apply_snapshot(target, animate).await
    }

    /// Apply `target` and wait until the widget has presented it.
    pub async fn apply_snapshot(&mut self, target: Snapshot<T>, animate: bool) -> ApplyResult<ApplyReport> {
        let report = self.submit(target, animate)?;
        self.wait_until_idle().await?;
        Ok(report)
    }

    /// Apply `target`, then hand the outcome to `completion`.
    ///
    /// `completion` runs exactly once, after the widget has finished.
    pub async fn apply_snapshot_with<F>(&mut self, target: Snapshot<T>, animate: bool, completion: F)
    where
        F: FnOnce(ApplyResult<ApplyReport>),
    {
        let outcome = self.apply_snapshot(target, animate).await;
        completion(outcome);
    }

    /// Apply `target` without animation and without waiting.
    ///
    /// Widgets finish unanimated batches at once, so the engine is normally
    /// idle again when this returns.
    pub fn apply_immediately(&mut self, target: Snapshot<T>) -> ApplyResult<ApplyReport> {
        let report = self.submit(target, false)?;
        if let Some(outcome) = self.in_flight.as_mut().and_then(Transaction::try_finish) {
            self.settled();
            outcome?;
        }
        Ok(report)
    }

    /// Push the edits for `target` to the widget without waiting for the
    /// batch to be presented.
    ///
    /// Fails with [`ApplyError::Busy`] while the previous batch is still
    /// being presented.
    pub fn submit(&mut self, target: Snapshot<T>, animate: bool) -> ApplyResult<ApplyReport> {
        self.settle_previous()?;

        let script = reconcile(&self.current, &target);
        let animation = Animation::from_flag(animate);
        let summary = script.summary();

        if script.is_empty() {
            self.current = target;
            debug!("snapshot unchanged; nothing to apply");
            return Ok(ApplyReport {
                summary,
                adapter_calls: 0,
                animated: animate,
                row_mismatches: 0,
            });
        }

        self.state = EngineState::Applying;
        self.adapter.begin_updates();
        let adapter_calls = self.drive(&script, animation);
        let transaction = self.adapter.end_updates(animation);
        self.in_flight = Some(transaction);
        self.current = target;

        let row_mismatches = if self.config.verify_row_counts {
            self.verify_row_counts()
        } else {
            0
        };

        info!(
            inserts = summary.inserts,
            deletes = summary.deletes,
            moves = summary.moves,
            reparents = summary.reparents,
            reloads = summary.reloads,
            adapter_calls,
            animate,
            "applied edit script"
        );

        Ok(ApplyReport {
            summary,
            adapter_calls,
            animated: animate,
            row_mismatches,
        })
    }

    /// Wait for the batch in flight, if any, to be presented.
    pub async fn wait_until_idle(&mut self) -> ApplyResult<()> {
        let Some(transaction) = self.in_flight.as_mut() else {
            return Ok(());
        };
        let outcome = transaction.await;
        self.settled();
        outcome
    }

    fn settle_previous(&mut self) -> ApplyResult<()> {
        let Some(transaction) = self.in_flight.as_mut() else {
            return Ok(());
        };
        match transaction.try_finish() {
            None => return Err(ApplyError::Busy),
            Some(Err(err)) => warn!(%err, "previous update never finished"),
            Some(Ok(())) => {}
        }
        self.settled();
        Ok(())
    }

    fn settled(&mut self) {
        self.in_flight = None;
        self.state = EngineState::Idle;
    }

    // ------------------------------------------------------------------
    // Driving the widget
    // ------------------------------------------------------------------

    fn drive(&mut self, script: &EditScript<T>, animation: Animation) -> usize {
        let coalesce = self.config.coalesce_batches;
        let mut calls = 0;
        let mut pending: Option<Pending<T>> = None;

        for edit in script {
            match edit {
                Edit::Insert {
                    item,
                    parent,
                    index,
                } => {
                    if coalesce {
                        if let Some(Pending::Insert {
                            parent: run_parent,
                            indexes,
                            items,
                        }) = &mut pending
                        {
                            if same_parent(run_parent, parent) && indexes.last().is_some_and(|last| index > last) {
                                indexes.push(*index);
                                items.push(item.clone());
                                continue;
                            }
                        }
                    }
                    calls += self.flush(pending.take(), animation);
                    pending = Some(Pending::Insert {
                        parent: parent.clone(),
                        indexes: vec![*index],
                        items: vec![item.clone()],
                    });
                }
                Edit::Delete { parent, index, .. } => {
                    if coalesce {
                        if let Some(Pending::Remove {
                            parent: run_parent,
                            indexes,
                        }) = &mut pending
                        {
                            if same_parent(run_parent, parent) && indexes.last().is_some_and(|last| index < last) {
                                indexes.push(*index);
                                continue;
                            }
                        }
                    }
                    calls += self.flush(pending.take(), animation);
                    pending = Some(Pending::Remove {
                        parent: parent.clone(),
                        indexes: vec![*index],
                    });
                }
                Edit::Move {
                    from_parent,
                    from_index,
                    to_parent,
                    to_index,
                    ..
                } => {
                    calls += self.flush(pending.take(), animation);
                    self.adapter
                        .move_item(from_parent.as_ref(), *from_index, to_parent.as_ref(), *to_index);
                    calls += 1;
                }
                Edit::Reload {
                    item,
                    parent,
                    index,
                } => {
                    calls += self.flush(pending.take(), animation);
                    self.adapter.reload_item(parent.as_ref(), *index, item);
                    calls += 1;
                }
            }
        }

        calls + self.flush(pending.take(), animation)
    }

    fn flush(&mut self, pending: Option<Pending<T>>, animation: Animation) -> usize {
        match pending {
            None => 0,
            Some(Pending::Insert {
                parent,
                indexes,
                items,
            }) => {
                debug!(rows = items.len(), "inserting rows");
                self.adapter
                    .insert_items(parent.as_ref(), &indexes, &items, animation);
                1
            }
            Some(Pending::Remove { parent, indexes }) => {
                debug!(rows = indexes.len(), "removing rows");
                self.adapter.remove_items(parent.as_ref(), &indexes, animation);
                1
            }
        }
    }

    fn verify_row_counts(&self) -> usize {
        let mut parents: Vec<Option<&T>> = vec![None];
        self.current.enumerate_items(|item, _| parents.push(Some(item)));

        let mut mismatches = 0;
        for parent in parents {
            let expected = self.current.child_count(parent.map(OutlineItem::id));
            let actual = self.adapter.number_of_children(parent);
            if expected != actual {
                mismatches += 1;
                warn!(
                    parent = ?parent.map(OutlineItem::id),
                    expected,
                    actual,
                    "widget child count differs from snapshot"
                );
            }
        }
        mismatches
    }
}

fn same_parent<T: OutlineItem>(a: &Option<T>, b: &Option<T>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_identity(b),
        _ => false,
    }
}
