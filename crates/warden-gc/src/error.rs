//! Error types for warden-gc

use thiserror::Error;

/// Collector failure modes.
///
/// `free` on an untracked pointer is deliberately *not* a variant here — the
/// specification treats it as advisory, logged and ignored rather than
/// surfaced as a failure.
#[derive(Debug, Error)]
pub enum GcError {
    /// The system allocator could not satisfy a request, even after a
    /// forced collection was run to try to free room.
    #[error("out of memory: failed to allocate {requested} bytes")]
    OutOfMemory {
        /// The number of bytes the caller asked for.
        requested: usize,
    },

    /// `realloc` was called with a pointer the collector does not track, or
    /// with the degenerate `(null, 0)` pair.
    #[error("invalid argument: pointer {ptr:p} is not tracked by this collector")]
    InvalidArgument {
        /// The offending pointer (may be null).
        ptr: *mut u8,
    },
}

/// Result type using [`GcError`].
pub type GcResult<T> = Result<T, GcError>;
