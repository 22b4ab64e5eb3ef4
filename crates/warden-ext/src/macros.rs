//! Placement construction helpers.
//!
//! The reference implementation leans on preprocessor macros
//! (`vgcx_new`/`var`) to allocate-and-construct in one step. The direct
//! translation is a `macro_rules!` pair that does the same allocate-then-
//! `ptr::write` dance, expanding in the caller's own scope.

/// Allocate managed memory sized for `$value` and move it in, returning a
/// typed pointer.
///
/// ```ignore
/// let mut gc = warden_gc::Collector::start(warden_gc::stack_base!());
/// let p: *mut u64 = warden_ext::gc_new!(&mut gc, 42u64);
/// ```
#[macro_export]
macro_rules! gc_new {
    ($collector:expr, $value:expr) => {{
        let value = $value;
        let ptr = $collector
            .malloc(::std::mem::size_of_val(&value))
            .expect("warden-gc: allocation failed");
        // SAFETY: `ptr` was just allocated with exactly `size_of_val(&value)`
        // bytes, and nothing else can observe it before this write.
        unsafe { ::std::ptr::write(ptr as *mut _, value) };
        ptr as *mut _
    }};
}

/// Like [`gc_new!`], but binds the resulting pointer to `$name` instead of
/// returning it.
#[macro_export]
macro_rules! gc_var {
    ($collector:expr, $name:ident, $value:expr) => {
        let $name = $crate::gc_new!($collector, $value);
    };
}

/// Allocate a managed, uniformly-typed [`crate::Array`] of `$count` slots.
#[macro_export]
macro_rules! gc_array {
    ($collector:expr, $ty:ty, $count:expr) => {
        $crate::Array::<$ty>::new($collector, $count)
    };
}
