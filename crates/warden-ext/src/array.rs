//! A managed, uniformly-typed array built on top of [`Buffer`].

use crate::buffer::Buffer;
use std::marker::PhantomData;
use warden_gc::{Collector, GcResult};

/// A fixed-length array of `T`, backed by a single managed [`Buffer`].
///
/// Matches the reference implementation's `vgc_Array`: slot count and slot
/// size are fixed at creation and the backing buffer is `slot_count *
/// slot_size` bytes.
pub struct Array<T> {
    buffer: Buffer,
    slot_count: usize,
    _marker: PhantomData<T>,
}

impl<T> Array<T> {
    /// Allocate an array of `count` slots of `T`. Slot contents are
    /// unspecified until written, matching the reference implementation's
    /// `vgc_create_array`.
    pub fn new(collector: &mut Collector, count: usize) -> GcResult<Self> {
        let slot_size = std::mem::size_of::<T>();
        let buffer = Buffer::with_finalizer(collector, count * slot_size, None)?;
        Ok(Self {
            buffer,
            slot_count: count,
            _marker: PhantomData,
        })
    }

    /// Number of slots in the array.
    pub fn len(&self) -> usize {
        self.slot_count
    }

    /// Whether the array has zero slots.
    pub fn is_empty(&self) -> bool {
        self.slot_count == 0
    }

    /// Size of a single slot, in bytes.
    pub fn slot_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    /// The array's backing buffer.
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Borrow the array's slots.
    ///
    /// # Safety
    /// The caller must ensure the owning collector has not reclaimed the
    /// backing buffer and that every slot has been initialized.
    pub unsafe fn as_slice(&self) -> &[T] {
        // SAFETY: forwarded to the caller; `buffer` holds exactly
        // `slot_count * size_of::<T>()` bytes.
        unsafe { std::slice::from_raw_parts(self.buffer.address() as *const T, self.slot_count) }
    }

    /// Mutably borrow the array's slots.
    ///
    /// # Safety
    /// Same contract as [`Array::as_slice`], plus exclusive access for the
    /// lifetime of the returned slice.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: forwarded to the caller; see `as_slice`.
        unsafe {
            std::slice::from_raw_parts_mut(self.buffer.address() as *mut T, self.slot_count)
        }
    }
}
