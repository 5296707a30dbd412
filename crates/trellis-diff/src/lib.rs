//! Tree reconciliation for Trellis.
//!
//! Compares the snapshot a widget currently shows with the snapshot it should
//! show and produces an ordered edit script that, replayed in order, turns one
//! into the other with the fewest structural changes.
//!
//! # Key Types
//!
//! - [`reconcile`] -- Compute the edit script between two snapshots
//! - [`EditScript`] / [`Edit`] -- Ordered Insert/Delete/Move/Reload operations
//! - [`MoveKind`] -- Whether a move changes the parent or only the sibling index
//! - [`ScriptSummary`] -- Per-kind operation counts

pub mod order;
pub mod reconcile;
pub mod script;

pub use order::stable_subsequence;
pub use reconcile::reconcile;
pub use script::{Edit, EditScript, MoveKind, ScriptSummary};
