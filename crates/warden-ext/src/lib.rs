//! # warden-ext
//!
//! Convenience layer on top of [`warden_gc`]: a managed byte buffer, a typed
//! managed array built on top of it, a per-thread collector registry, and a
//! handful of placement macros. None of this changes collector semantics —
//! every type here is a thin wrapper around [`warden_gc::Collector`]'s public
//! API.

pub mod array;
pub mod buffer;
pub mod macros;
pub mod threads;

pub use array::Array;
pub use buffer::Buffer;
pub use threads::{with_thread_collector, ThreadRegistry};
