//! Error types for snapshot construction.

/// Errors raised by snapshot builder operations.
///
/// All of them are caller logic errors: the offending call is rejected before
/// any part of the forest is modified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError<Id> {
    /// An inserted identity is already present in the forest (or repeated
    /// within the same batch).
    #[error("duplicate item: {0:?}")]
    DuplicateItem(Id),

    /// The operation names an item that is not in the snapshot.
    #[error("unknown item: {0:?}")]
    UnknownItem(Id),

    /// An insertion targets a parent that is not in the snapshot.
    #[error("unknown parent: {0:?}")]
    UnknownParent(Id),

    /// An insertion is relative to a sibling that is not in the snapshot.
    #[error("unknown anchor: {0:?}")]
    UnknownAnchor(Id),

    /// The move would make the item its own descendant.
    #[error("cyclic move: {item:?} cannot be placed under {destination:?}")]
    CyclicMove {
        /// The item being moved.
        item: Id,
        /// The requested destination parent.
        destination: Id,
    },

    /// An explicit child index lies past the end of the destination.
    #[error("index {index} out of bounds for {len} children")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The forest failed a structural check.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for snapshot results.
pub type SnapshotResult<T, Id> = Result<T, SnapshotError<Id>>;
