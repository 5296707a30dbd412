//! Apply engine for Trellis.
//!
//! Drives an outline widget from a sequence of snapshots: each new snapshot
//! is reconciled against the applied one and the resulting edit script is
//! replayed on the widget as a single batch of updates.
//!
//! # Key Types
//!
//! - [`ApplyEngine`] -- Owns the applied snapshot and the widget adapter
//! - [`OutlineAdapter`] -- The widget contract (insert/remove/move/reload)
//! - [`Transaction`] -- Completion of one widget batch
//! - [`MemoryOutline`] -- In-memory widget with expansion state
//! - [`UpdateQueue`] -- Single-slot submission queue in front of an engine
//! - [`ApplyConfig`] -- Batching, verification and animation settings

pub mod adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod queue;

pub use adapter::{Animation, OutlineAdapter, Transaction, TransactionHandle};
pub use config::ApplyConfig;
pub use engine::{ApplyEngine, ApplyReport, EngineState};
pub use error::{ApplyError, ApplyResult};
pub use memory::{CallCounters, MemoryOutline};
pub use queue::{UpdateQueue, UpdateSender};
