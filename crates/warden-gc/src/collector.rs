//! The collector: owns a registry, drives allocation, and runs the
//! mark-and-sweep cycle.

use crate::error::{GcError, GcResult};
use crate::record::{Finalizer, RecordTag};
use crate::registry::{AllocationRegistry, ALLOC_ALIGN};
use crate::stack;
use std::alloc::{alloc, alloc_zeroed, dealloc, Layout};
use std::collections::VecDeque;
use std::ffi::CStr;

/// `initial_capacity`/`min_capacity` used by [`Collector::start`].
pub const DEFAULT_MIN_CAPACITY: usize = 1024;
/// Downsize load factor used by [`Collector::start`].
pub const DEFAULT_DOWNSIZE_FACTOR: f64 = 0.2;
/// Upsize load factor used by [`Collector::start`].
pub const DEFAULT_UPSIZE_FACTOR: f64 = 0.8;
/// Sweep-limit factor used by [`Collector::start`].
pub const DEFAULT_SWEEP_FACTOR: f64 = 0.5;

/// Counters describing the collector's history, refreshed after every
/// [`Collector::collect`].
#[derive(Debug, Default, Clone)]
pub struct GcStats {
    /// Number of completed collections (including the implicit one at `stop`).
    pub collections: u64,
    /// Total wall-clock time spent inside `collect`, in nanoseconds.
    pub total_time_ns: u64,
    /// Bytes reclaimed by the most recent collection.
    pub last_reclaimed: usize,
}

/// A single-threaded, stop-the-world, conservative mark-and-sweep collector.
///
/// There is no `Default` impl and no way to construct one in the
/// `Uninitialized` state the reference implementation allows: [`Collector::start`]
/// and [`Collector::start_ext`] are the only constructors, so every live
/// `Collector` is already running. [`Collector::stop`] takes `self` by value,
/// so a stopped collector cannot be used again — the type system enforces
/// the lifecycle the reference implementation checks at runtime.
pub struct Collector {
    registry: AllocationRegistry,
    disabled: bool,
    stack_base: usize,
    worklist: VecDeque<(usize, usize)>,
    stats: GcStats,
}

impl Collector {
    /// Start a collector with the reference defaults (capacity 1024, 20%/80%
    /// load-factor bounds, 50% sweep factor).
    ///
    /// `stack_base` should be an address near the root of the call stack this
    /// collector will scan — typically the result of `warden_gc::stack_base!()`
    /// expanded directly at the call site that starts the collector, so the
    /// captured address belongs to that frame rather than a deeper callee.
    pub fn start(stack_base: usize) -> Self {
        Self::start_ext(
            stack_base,
            DEFAULT_MIN_CAPACITY,
            DEFAULT_MIN_CAPACITY,
            DEFAULT_DOWNSIZE_FACTOR,
            DEFAULT_UPSIZE_FACTOR,
            DEFAULT_SWEEP_FACTOR,
        )
    }

    /// Start a collector with an explicit sizing and load-factor policy.
    ///
    /// Any factor `<= 0.0` falls back to its `DEFAULT_*` constant, matching
    /// the reference implementation's treatment of unset parameters.
    pub fn start_ext(
        stack_base: usize,
        initial_capacity: usize,
        min_capacity: usize,
        downsize_factor: f64,
        upsize_factor: f64,
        sweep_factor: f64,
    ) -> Self {
        let downsize_factor = if downsize_factor > 0.0 {
            downsize_factor
        } else {
            DEFAULT_DOWNSIZE_FACTOR
        };
        let upsize_factor = if upsize_factor > 0.0 {
            upsize_factor
        } else {
            DEFAULT_UPSIZE_FACTOR
        };
        let sweep_factor = if sweep_factor > 0.0 {
            sweep_factor
        } else {
            DEFAULT_SWEEP_FACTOR
        };
        let initial_capacity = initial_capacity.max(min_capacity);
        let registry = AllocationRegistry::new(
            initial_capacity,
            min_capacity,
            downsize_factor,
            upsize_factor,
            sweep_factor,
        );

        #[cfg(feature = "gc_logging")]
        tracing::debug!(
            target: "warden_gc::collector",
            capacity = registry.capacity(),
            "started garbage collector"
        );

        Self {
            registry,
            disabled: false,
            stack_base,
            worklist: VecDeque::new(),
            stats: GcStats::default(),
        }
    }

    /// Temporarily switch garbage collection off: allocations will no longer
    /// trigger [`Collector::collect`] on their own.
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    /// Switch garbage collection back on.
    pub fn enable(&mut self) {
        self.disabled = false;
    }

    /// Whether collection is currently disabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Number of blocks currently tracked.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Whether no blocks are currently tracked.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Current registry bucket count.
    pub fn capacity(&self) -> usize {
        self.registry.capacity()
    }

    /// Statistics gathered across this collector's lifetime.
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// Look up the record tracking `ptr`, if any.
    pub fn get(&self, ptr: *mut u8) -> Option<&crate::record::AllocationRecord> {
        self.registry.get(ptr)
    }

    /// Run a full mark-and-sweep collection unconditionally, returning the
    /// number of bytes reclaimed.
    pub fn collect(&mut self) -> usize {
        let start = std::time::Instant::now();
        self.mark();
        let reclaimed = self.sweep();
        self.stats.collections += 1;
        self.stats.total_time_ns += start.elapsed().as_nanos() as u64;
        self.stats.last_reclaimed = reclaimed;

        #[cfg(feature = "gc_logging")]
        tracing::debug!(target: "warden_gc::collector", reclaimed, "collection finished");

        reclaimed
    }

    /// Allocate `size` bytes of zero-initialized, managed memory.
    pub fn calloc(&mut self, count: usize, size: usize) -> GcResult<*mut u8> {
        self.calloc_with_finalizer(count, size, None)
    }

    /// Like [`Collector::calloc`], with a finalizer run once just before the
    /// block is reclaimed.
    pub fn calloc_with_finalizer(
        &mut self,
        count: usize,
        size: usize,
        finalizer: Option<Finalizer>,
    ) -> GcResult<*mut u8> {
        self.allocate(count, size, finalizer)
    }

    /// Allocate `size` bytes of managed memory, contents unspecified.
    pub fn malloc(&mut self, size: usize) -> GcResult<*mut u8> {
        self.malloc_with_finalizer(size, None)
    }

    /// Like [`Collector::malloc`], with a finalizer run once just before the
    /// block is reclaimed.
    pub fn malloc_with_finalizer(
        &mut self,
        size: usize,
        finalizer: Option<Finalizer>,
    ) -> GcResult<*mut u8> {
        self.allocate(0, size, finalizer)
    }

    /// Allocate `size` bytes of managed memory and immediately root it, so it
    /// survives collections regardless of whether anything points to it.
    pub fn malloc_static(
        &mut self,
        size: usize,
        finalizer: Option<Finalizer>,
    ) -> GcResult<*mut u8> {
        let ptr = self.malloc_with_finalizer(size, finalizer)?;
        self.make_root(ptr);
        Ok(ptr)
    }

    /// Root an already-managed block, so it survives collections regardless
    /// of whether anything points to it. A no-op if `ptr` is not tracked.
    pub fn make_root(&mut self, ptr: *mut u8) {
        if let Some(record) = self.registry.get_mut(ptr) {
            record.tag.insert(RecordTag::ROOT);
        }
    }

    /// Duplicate a C string into a managed, nul-terminated buffer.
    pub fn strdup(&mut self, s: &CStr) -> GcResult<*mut u8> {
        let bytes = s.to_bytes_with_nul();
        let ptr = self.malloc(bytes.len())?;
        // SAFETY: `ptr` was just allocated with `bytes.len()` managed bytes,
        // non-overlapping with `bytes` which comes from a separate `&CStr`.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len()) };
        Ok(ptr)
    }

    /// Resize a managed block in place or move it, preserving its contents up
    /// to `min(old_size, size)` and carrying its finalizer to the new
    /// address. Fails with [`GcError::InvalidArgument`] if `ptr` is not
    /// tracked, or if `ptr` is null and `size` is zero.
    pub fn realloc(&mut self, ptr: *mut u8, size: usize) -> GcResult<*mut u8> {
        if ptr.is_null() {
            if size == 0 {
                return Err(GcError::InvalidArgument { ptr });
            }
            // The reference implementation's `vgc_realloc(NULL, size)` calls
            // libc `realloc` directly rather than going through `vgc_allocate`,
            // so a null old pointer skips the sweep-threshold check and the
            // retry-after-collect policy that `malloc`/`calloc` apply.
            let layout = Layout::from_size_align(size, ALLOC_ALIGN)
                .map_err(|_| GcError::OutOfMemory { requested: size })?;
            // SAFETY: `layout` has non-zero size.
            let new_ptr = unsafe { alloc(layout) };
            if new_ptr.is_null() {
                return Err(GcError::OutOfMemory { requested: size });
            }
            let record = self.registry.put(new_ptr, size, layout, None);
            return Ok(record.base());
        }
        if self.registry.get(ptr).is_none() {
            return Err(GcError::InvalidArgument { ptr });
        }

        // Pull the record out of the registry before touching memory: this
        // collector is single-threaded, so nothing else can observe the
        // block while it's briefly untracked, and we need to own the
        // finalizer to carry it across a potential move.
        let old_record = self
            .registry
            .remove(ptr, true)
            .expect("checked tracked above");
        let old_layout = old_record.layout();

        let new_layout = match Layout::from_size_align(size.max(1), old_layout.align()) {
            Ok(layout) => layout,
            Err(_) => {
                self.registry
                    .put(old_record.base, old_record.size, old_layout, old_record.finalizer);
                return Err(GcError::OutOfMemory { requested: size });
            }
        };

        // SAFETY: `old_record.base` was allocated by this collector with
        // `old_layout`, and removing it from the registry above guarantees
        // this is the only live handle to the block.
        let new_ptr =
            unsafe { std::alloc::realloc(old_record.base, old_layout, new_layout.size()) };
        if new_ptr.is_null() {
            // The original block is untouched; put it back under its old
            // layout so the caller can retry or free it normally.
            self.registry
                .put(old_record.base, old_record.size, old_layout, old_record.finalizer);
            return Err(GcError::OutOfMemory { requested: size });
        }

        let record = self
            .registry
            .put(new_ptr, size, new_layout, old_record.finalizer);
        Ok(record.base())
    }

    /// Release a managed block immediately, running its finalizer if any.
    /// Freeing an untracked, non-null pointer is logged and ignored.
    pub fn free(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        match self.registry.remove(ptr, true) {
            Some(record) => {
                if let Some(finalizer) = record.finalizer {
                    finalizer(record.base);
                }
                // SAFETY: `record.base`/`record.layout` came from the
                // `std::alloc` call that created this block, and removing it
                // from the registry means nothing else can reference it.
                unsafe { dealloc(record.base, record.layout) };
            }
            None => {
                #[cfg(feature = "gc_logging")]
                tracing::warn!(
                    target: "warden_gc::collector",
                    ?ptr,
                    "ignoring request to free unknown pointer"
                );
            }
        }
    }

    /// Stop the collector, unrooting everything and reclaiming every
    /// tracked block regardless of reachability. Consumes the collector by
    /// value, so the compiler — not a runtime flag — rejects any further use.
    /// Returns the number of bytes freed.
    pub fn stop(mut self) -> usize {
        self.registry.unroot_all();
        let freed = self.sweep();

        #[cfg(feature = "gc_logging")]
        tracing::debug!(target: "warden_gc::collector", freed, "collector stopped");

        freed
    }

    fn allocate(
        &mut self,
        count: usize,
        size: usize,
        finalizer: Option<Finalizer>,
    ) -> GcResult<*mut u8> {
        if self.registry.needs_sweep() && !self.disabled {
            #[cfg_attr(not(feature = "gc_logging"), allow(unused_variables))]
            let freed = self.collect();
            #[cfg(feature = "gc_logging")]
            tracing::debug!(
                target: "warden_gc::collector",
                freed,
                "garbage collection ran ahead of allocation"
            );
        }

        let alloc_size = if count == 0 {
            size
        } else {
            count
                .checked_mul(size)
                .ok_or(GcError::OutOfMemory { requested: size })?
        };
        let layout = Layout::from_size_align(alloc_size.max(1), ALLOC_ALIGN)
            .map_err(|_| GcError::OutOfMemory { requested: alloc_size })?;

        // SAFETY: `layout` has non-zero size (enforced by `.max(1)` above).
        let mut ptr = unsafe {
            if count == 0 {
                alloc(layout)
            } else {
                alloc_zeroed(layout)
            }
        };

        if ptr.is_null() && !self.disabled {
            // Out-of-policy collection: the allocator may have more to give
            // after a forced sweep even though we weren't yet over the
            // high-water mark.
            self.collect();
            ptr = unsafe {
                if count == 0 {
                    alloc(layout)
                } else {
                    alloc_zeroed(layout)
                }
            };
        }

        if ptr.is_null() {
            return Err(GcError::OutOfMemory { requested: alloc_size });
        }

        let record = self.registry.put(ptr, alloc_size, layout, finalizer);
        let managed = record.base();

        #[cfg(feature = "gc_logging")]
        tracing::debug!(
            target: "warden_gc::collector",
            ?managed,
            alloc_size,
            "allocated managed block"
        );

        Ok(managed)
    }

    fn mark(&mut self) {
        #[cfg(feature = "gc_logging")]
        tracing::debug!(target: "warden_gc::collector", "initiating mark phase");

        for addr in self.registry.rooted_addresses() {
            self.mark_candidate(addr as *mut u8);
        }

        let stack_base = self.stack_base;
        // SAFETY: `stack_base` was captured by `start`/`start_ext` on this
        // same thread and has not been invalidated since.
        unsafe { stack::scan_stack(self, stack_base) };

        while let Some((base, size)) = self.worklist.pop_front() {
            self.scan_payload(base, size);
        }
    }

    /// Mark `candidate` reachable if it is the exact base address of a
    /// tracked, not-yet-marked block, queueing its payload for a scan. A
    /// no-op for null pointers and values that don't match a tracked base
    /// address exactly — this collector does not recognize interior
    /// pointers.
    pub(crate) fn mark_candidate(&mut self, candidate: *mut u8) {
        if candidate.is_null() {
            return;
        }
        if let Some(record) = self.registry.get_mut(candidate) {
            if !record.tag.contains(RecordTag::MARK) {
                record.tag.insert(RecordTag::MARK);
                self.worklist.push_back((record.base as usize, record.size));
            }
        }
    }

    /// Conservatively scan a block's payload byte-by-byte for values that
    /// look like other tracked base addresses.
    fn scan_payload(&mut self, base: usize, size: usize) {
        let word = std::mem::size_of::<usize>();
        if size < word {
            return;
        }
        let mut offset = 0usize;
        while offset <= size - word {
            // SAFETY: `base..base+size` is the live extent of a block this
            // collector allocated and still tracks.
            let word_value =
                unsafe { std::ptr::read_unaligned((base + offset) as *const usize) };
            self.mark_candidate(word_value as *mut u8);
            offset += 1;
        }
    }

    fn sweep(&mut self) -> usize {
        #[cfg(feature = "gc_logging")]
        tracing::debug!(target: "warden_gc::collector", "initiating sweep phase");

        self.registry.sweep_unmarked(|record| {
            if let Some(finalizer) = record.finalizer {
                finalizer(record.base);
            }
            // SAFETY: `record.base`/`record.layout` were produced by the
            // `std::alloc` call that created this block; the registry has
            // just relinquished its only reference to it.
            unsafe { dealloc(record.base, record.layout) };
        })
    }
}
