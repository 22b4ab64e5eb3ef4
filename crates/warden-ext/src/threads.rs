//! One collector per thread.
//!
//! [`warden_gc::Collector`] is single-threaded by design (its registry and
//! conservative stack scan only make sense relative to one call stack). The
//! reference C++ wrapper keeps a `std::unordered_map` from thread id to GC
//! instance for this; the direct, safe translation in Rust is a
//! `thread_local!` cell, which gives each thread its own collector without
//! any shared-map locking.

use std::cell::RefCell;
use warden_gc::Collector;

thread_local! {
    static THREAD_COLLECTOR: RefCell<Option<Collector>> = const { RefCell::new(None) };
}

/// Handle onto the calling thread's collector slot.
pub struct ThreadRegistry;

impl ThreadRegistry {
    /// Start the calling thread's collector with the reference defaults, if
    /// it isn't already running.
    ///
    /// The captured `stack_base` belongs to whichever call site first
    /// triggers this lazily (directly or through [`with_thread_collector`]),
    /// not necessarily the thread's outermost frame. Call this once,
    /// explicitly, as close to thread entry as practical if the thread has
    /// roots declared shallower than its first `with_thread_collector` use.
    pub fn ensure_started() {
        THREAD_COLLECTOR.with(|cell| {
            let mut slot = cell.borrow_mut();
            if slot.is_none() {
                *slot = Some(Collector::start(warden_gc::stack_base!()));
            }
        });
    }

    /// Stop and drop the calling thread's collector, if one is running,
    /// returning the number of bytes it freed.
    pub fn stop() -> Option<usize> {
        THREAD_COLLECTOR.with(|cell| cell.borrow_mut().take().map(Collector::stop))
    }
}

/// Run `f` with exclusive access to the calling thread's collector, starting
/// one with the reference defaults first if this thread hasn't used one yet.
pub fn with_thread_collector<R>(f: impl FnOnce(&mut Collector) -> R) -> R {
    ThreadRegistry::ensure_started();
    THREAD_COLLECTOR.with(|cell| {
        let mut slot = cell.borrow_mut();
        f(slot.as_mut().expect("ensure_started just ran"))
    })
}
