//! The contract between the apply engine and an outline widget.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use trellis_types::OutlineItem;

use crate::error::{ApplyError, ApplyResult};

/// How a batch of updates is presented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Animation {
    #[default]
    None,
    Animated,
}

impl Animation {
    pub fn from_flag(animate: bool) -> Self {
        if animate {
            Animation::Animated
        } else {
            Animation::None
        }
    }

    pub fn is_animated(self) -> bool {
        self == Animation::Animated
    }
}

/// An outline widget that can be driven by edit scripts.
///
/// Parents are addressed by item value, `None` meaning the root level. All
/// updates between [`begin_updates`](Self::begin_updates) and
/// [`end_updates`](Self::end_updates) form one batch.
///
/// Index lists are applied in the order given, each index valid once the
/// previous ones have been applied. The engine passes ascending indices to
/// `insert_items` and descending indices to `remove_items`, so inserted
/// indices are final positions and removed indices are pre-removal positions.
pub trait OutlineAdapter<T: OutlineItem> {
    /// Number of children the widget currently holds under `parent`.
    fn number_of_children(&self, parent: Option<&T>) -> usize;

    /// Open a batch.
    fn begin_updates(&mut self);

    /// Insert `items[i]` at `indexes[i]` under `parent`.
    fn insert_items(&mut self, parent: Option<&T>, indexes: &[usize], items: &[T], animation: Animation);

    /// Remove the rows at `indexes` under `parent`, with their subtrees.
    fn remove_items(&mut self, parent: Option<&T>, indexes: &[usize], animation: Animation);

    /// Move one row with its subtree. `to_index` addresses `to_parent` after
    /// the row has left `from_parent`.
    fn move_item(&mut self, from_parent: Option<&T>, from_index: usize, to_parent: Option<&T>, to_index: usize);

    /// Refresh the row at `index` under `parent` with a new value.
    fn reload_item(&mut self, parent: Option<&T>, index: usize, item: &T);

    /// Close the batch. The returned transaction resolves when the widget has
    /// finished presenting it.
    fn end_updates(&mut self, animation: Animation) -> Transaction;
}

/// Completion of one widget batch.
///
/// Awaiting a transaction yields `Ok(())` once the widget finishes, or
/// [`ApplyError::TransactionDropped`] if the widget dropped its
/// [`TransactionHandle`] without finishing.
#[derive(Debug)]
pub struct Transaction {
    receiver: Option<oneshot::Receiver<()>>,
}

/// The widget's side of a pending [`Transaction`].
#[derive(Debug)]
pub struct TransactionHandle {
    sender: oneshot::Sender<()>,
}

impl Transaction {
    /// A transaction that is already complete.
    pub fn finished() -> Self {
        Self { receiver: None }
    }

    /// A pending transaction and the handle that completes it.
    pub fn pending() -> (Self, TransactionHandle) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                receiver: Some(receiver),
            },
            TransactionHandle { sender },
        )
    }

    /// Check for completion without waiting. `None` while still pending.
    pub fn try_finish(&mut self) -> Option<ApplyResult<()>> {
        let receiver = match self.receiver.as_mut() {
            Some(receiver) => receiver,
            None => return Some(Ok(())),
        };
        let outcome = match receiver.try_recv() {
            Ok(()) => Ok(()),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(ApplyError::TransactionDropped),
        };
        self.receiver = None;
        Some(outcome)
    }
}

impl Future for Transaction {
    type Output = ApplyResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let receiver = match self.receiver.as_mut() {
            Some(receiver) => receiver,
            None => return Poll::Ready(Ok(())),
        };
        let outcome = match Pin::new(receiver).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result.map_err(|_| ApplyError::TransactionDropped),
        };
        self.receiver = None;
        Poll::Ready(outcome)
    }
}

impl TransactionHandle {
    /// Mark the batch as presented.
    pub fn finish(self) {
        // The engine may have stopped waiting; nothing to report then.
        let _ = self.sender.send(());
    }
}
