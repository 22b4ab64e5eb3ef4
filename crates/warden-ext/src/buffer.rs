//! A managed, fixed-length run of bytes.

use warden_gc::{Collector, Finalizer, GcResult};

/// A run of managed memory with a length fixed at creation time.
///
/// Mirrors the reference implementation's `vgc_Buffer`: `address` and
/// `length` are set once, when the buffer is created, and never change —
/// growing a buffer means creating a new one.
pub struct Buffer {
    address: *mut u8,
    length: usize,
}

impl Buffer {
    /// Allocate a new buffer of `length` bytes.
    pub fn new(collector: &mut Collector, length: usize) -> GcResult<Self> {
        Self::with_finalizer(collector, length, None)
    }

    /// Allocate a new buffer of `length` bytes, running `finalizer` once just
    /// before the underlying memory is reclaimed.
    pub fn with_finalizer(
        collector: &mut Collector,
        length: usize,
        finalizer: Option<Finalizer>,
    ) -> GcResult<Self> {
        let address = collector.malloc_with_finalizer(length, finalizer)?;
        Ok(Self { address, length })
    }

    /// The address where the buffer's data is stored.
    pub fn address(&self) -> *mut u8 {
        self.address
    }

    /// The length of the buffer, in bytes.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Borrow the buffer's contents.
    ///
    /// # Safety
    /// The caller must ensure the collector that owns this buffer has not
    /// reclaimed it (it is still reachable, or a collection has not run)
    /// for the lifetime of the returned slice.
    pub unsafe fn as_slice(&self) -> &[u8] {
        // SAFETY: forwarded to the caller via this function's own contract.
        unsafe { std::slice::from_raw_parts(self.address, self.length) }
    }

    /// Mutably borrow the buffer's contents.
    ///
    /// # Safety
    /// Same contract as [`Buffer::as_slice`], plus exclusive access for the
    /// lifetime of the returned slice.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: forwarded to the caller via this function's own contract.
        unsafe { std::slice::from_raw_parts_mut(self.address, self.length) }
    }
}
