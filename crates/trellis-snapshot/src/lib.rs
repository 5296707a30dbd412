//! Ordered forests of identified items.
//!
//! A [`Snapshot`] describes the desired contents of an outline: an ordered
//! forest in which every identity appears at most once. Snapshots are built by
//! cloning a previous one (or starting empty) and applying builder operations
//! ([`Snapshot::insert_items`], [`Snapshot::delete_items`],
//! [`Snapshot::move_item`], ...). Every builder operation validates its input
//! before touching the forest, so a rejected call leaves the snapshot as it was.

pub mod builder;
pub mod error;
pub mod record;
pub mod snapshot;

pub use error::{SnapshotError, SnapshotResult};
pub use snapshot::Snapshot;
pub use trellis_types::{OutlineItem, Placement};
