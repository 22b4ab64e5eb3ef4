//! # warden-gc
//!
//! Conservative, stop-the-world, mark-and-sweep garbage collector.
//!
//! ## Design
//!
//! - **Registry**: a chained hash table keyed by block address, the single
//!   source of truth for which blocks are tracked.
//! - **Collector**: owns one registry, drives allocation and the mark/sweep
//!   cycle, and is single-threaded — one instance per thread.
//! - **Mark/Sweep**: scans rooted blocks and the machine stack
//!   conservatively, then reclaims everything left unmarked.

#![warn(missing_docs)]

pub mod collector;
pub mod error;
pub mod record;
pub mod registry;
mod stack;

pub use collector::{Collector, GcStats};
pub use error::{GcError, GcResult};
pub use record::{AllocationRecord, Finalizer, RecordTag};
pub use registry::AllocationRegistry;

// `stack_base!` is exported at the crate root by `#[macro_export]` on its
// definition in `stack.rs`.
