//! Per-block metadata tracked by the [`AllocationRegistry`](crate::registry::AllocationRegistry).

use std::alloc::Layout;

/// Tag bits carried by a record between a mark phase and the sweep that
/// follows it.
///
/// Hand-rolled rather than pulled from the `bitflags` crate: two bits that
/// will never grow don't justify the dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordTag(u8);

impl RecordTag {
    /// No tags set.
    pub const NONE: Self = Self(0);
    /// The block is unconditionally reachable, independent of the stack.
    pub const ROOT: Self = Self(0b01);
    /// The block has been observed reachable during the current mark phase.
    pub const MARK: Self = Self(0b10);

    /// Whether `other`'s bits are all set in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set `other`'s bits.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear `other`'s bits.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

/// A callback invoked exactly once, immediately before a block's memory is
/// released back to the system allocator.
///
/// Boxed rather than a bare function pointer so finalizers can close over
/// state; a plain `fn(*mut u8)` still coerces to this type.
///
/// Finalizers must not call back into the collector that owns the block
/// being finalized (neither allocating nor freeing through it) — doing so
/// during sweep would corrupt the in-progress bucket walk.
pub type Finalizer = Box<dyn FnOnce(*mut u8)>;

/// Metadata the registry keeps for one live tracked block.
///
/// `chain_next` is the intrusive link the registry uses for separate
/// chaining; it is not part of the public contract of a record but is kept
/// alongside the rest of the metadata to match how the reference collector
/// lays the allocation record out.
pub struct AllocationRecord {
    pub(crate) base: *mut u8,
    pub(crate) size: usize,
    pub(crate) layout: Layout,
    pub(crate) tag: RecordTag,
    pub(crate) finalizer: Option<Finalizer>,
    pub(crate) chain_next: Option<Box<AllocationRecord>>,
}

impl AllocationRecord {
    pub(crate) fn new(
        base: *mut u8,
        size: usize,
        layout: Layout,
        finalizer: Option<Finalizer>,
    ) -> Self {
        Self {
            base,
            size,
            layout,
            tag: RecordTag::NONE,
            finalizer,
            chain_next: None,
        }
    }

    /// The address of the managed block.
    pub fn base(&self) -> *mut u8 {
        self.base
    }

    /// The size of the block in bytes, as seen by the user.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether this block is rooted (unconditionally reachable).
    pub fn is_root(&self) -> bool {
        self.tag.contains(RecordTag::ROOT)
    }

    /// Whether this block has been marked reachable in the current cycle.
    pub fn is_marked(&self) -> bool {
        self.tag.contains(RecordTag::MARK)
    }

    pub(crate) fn layout(&self) -> Layout {
        self.layout
    }
}

impl std::fmt::Debug for AllocationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationRecord")
            .field("base", &self.base)
            .field("size", &self.size)
            .field("root", &self.is_root())
            .field("marked", &self.is_marked())
            .field("has_finalizer", &self.finalizer.is_some())
            .finish()
    }
}
