//! Host-side serialization of snapshot submissions.
//!
//! The queue holds at most one pending snapshot. Submitting while an apply is
//! running replaces any snapshot that has not started yet, so the widget
//! always converges on the newest state without replaying stale ones.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use trellis_snapshot::Snapshot;
use trellis_types::OutlineItem;

use crate::adapter::OutlineAdapter;
use crate::engine::ApplyEngine;
use crate::error::ApplyResult;

#[derive(Clone)]
struct Submission<T: OutlineItem> {
    seq: u64,
    snapshot: Snapshot<T>,
    animate: bool,
}

type Slot<T> = Option<Submission<T>>;

/// Submitting side of an [`UpdateQueue`]. Cheap to clone.
pub struct UpdateSender<T: OutlineItem> {
    slot: Arc<watch::Sender<Slot<T>>>,
}

impl<T: OutlineItem> Clone for UpdateSender<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: OutlineItem> UpdateSender<T> {
    /// Queue `snapshot`, replacing any snapshot not yet picked up.
    pub fn submit(&self, snapshot: Snapshot<T>, animate: bool) {
        self.slot.send_modify(|slot| {
            let seq = slot.as_ref().map_or(1, |s| s.seq + 1);
            *slot = Some(Submission {
                seq,
                snapshot,
                animate,
            });
        });
    }
}

/// Receiving side: feeds submissions to an [`ApplyEngine`] one at a time.
pub struct UpdateQueue<T: OutlineItem> {
    slot: watch::Receiver<Slot<T>>,
    applied: u64,
}

impl<T: OutlineItem> UpdateQueue<T> {
    /// Create a queue and its first sender.
    pub fn channel() -> (UpdateSender<T>, Self) {
        let (tx, rx) = watch::channel(None);
        (
            UpdateSender { slot: Arc::new(tx) },
            Self {
                slot: rx,
                applied: 0,
            },
        )
    }

    /// Apply submissions until every sender is dropped and the newest
    /// submission has been applied. Returns the number of applies run.
    pub async fn run<A: OutlineAdapter<T>>(mut self, engine: &mut ApplyEngine<T, A>) -> ApplyResult<usize> {
        let mut runs = 0;
        loop {
            runs += self.apply_latest(engine).await?;
            if self.slot.changed().await.is_err() {
                // Closed; pick up a submission that raced the close.
                runs += self.apply_latest(engine).await?;
                break;
            }
        }
        debug!(runs, "update queue drained");
        Ok(runs)
    }

    async fn apply_latest<A: OutlineAdapter<T>>(&mut self, engine: &mut ApplyEngine<T, A>) -> ApplyResult<usize> {
        let next = self
            .slot
            .borrow_and_update()
            .as_ref()
            .filter(|s| s.seq > self.applied)
            .cloned();
        let Some(submission) = next else {
            return Ok(0);
        };
        self.applied = submission.seq;
        engine
            .apply_snapshot(submission.snapshot, submission.animate)
            .await?;
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::memory::MemoryOutline;

    fn roots(ids: &[&str]) -> Snapshot<String> {
        let mut s = Snapshot::new();
        s.append_items(ids.iter().map(|id| id.to_string()), None).unwrap();
        s
    }

    #[tokio::test]
    async fn newest_submission_wins() {
        let mut engine = ApplyEngine::new(MemoryOutline::new());
        let (sender, queue) = UpdateQueue::channel();
        sender.submit(roots(&["a"]), false);
        sender.submit(roots(&["a", "b"]), false);
        sender.submit(roots(&["c"]), false);
        drop(sender);

        let runs = queue.run(&mut engine).await.unwrap();
        assert_eq!(runs, 1);
        assert_eq!(engine.current(), &roots(&["c"]));
    }

    #[tokio::test]
    async fn no_submissions() {
        let mut engine: ApplyEngine<String, _> = ApplyEngine::new(MemoryOutline::new());
        let (sender, queue) = UpdateQueue::channel();
        drop(sender);
        assert_eq!(queue.run(&mut engine).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn submissions_during_animation_converge() {
        let widget = MemoryOutline::with_animation_delay(Duration::from_millis(10));
        let mut engine = ApplyEngine::new(widget);
        let (sender, queue) = UpdateQueue::channel();

        let producer = {
            let sender = sender.clone();
            async move {
                sender.submit(roots(&["a"]), true);
                tokio::time::sleep(Duration::from_millis(2)).await;
                sender.submit(roots(&["a", "b"]), true);
                sender.submit(roots(&["b", "a", "c"]), true);
            }
        };
        drop(sender);

        let (_, runs) = tokio::join!(producer, queue.run(&mut engine));
        let runs = runs.unwrap();
        assert!((1..=3).contains(&runs));
        assert_eq!(engine.current(), &roots(&["b", "a", "c"]));
        assert_eq!(engine.adapter().visible_items(), vec!["b", "a", "c"]);
    }
}
