//! Foundation types for Trellis.
//!
//! This crate provides the contracts shared by every other Trellis crate:
//! what an outline item must expose, how a position inside an outline is
//! described, and the presentation capability hosts attach to item types.
//!
//! # Key Types
//!
//! - [`OutlineItem`] — Stable identity plus full-value equality
//! - [`Placement`] — Where an item lands relative to a parent or sibling
//! - [`Presentable`] — Per-type display capability, never consulted by the diff engine

pub mod item;
pub mod placement;
pub mod presentation;

pub use item::OutlineItem;
pub use placement::Placement;
pub use presentation::Presentable;
