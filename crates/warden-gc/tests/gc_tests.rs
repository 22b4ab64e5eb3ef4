//! End-to-end tests for the conservative mark-and-sweep collector.
//!
//! Tests that need a pointer to survive a collection keep it alive through
//! `std::hint::black_box`, the only portable way to stop the optimizer from
//! deciding a local holding a raw pointer is dead before `collect` runs.

use std::cell::Cell;
use std::ffi::CStr;
use std::rc::Rc;
use warden_gc::{Collector, GcError};

// A macro, not a function: `stack_base!()` must expand directly in the
// frame whose locals we want the collector to scan, and a helper function
// would instead capture the address of its own (deeper, short-lived) frame.
macro_rules! new_collector {
    () => {
        Collector::start_ext(warden_gc::stack_base!(), 11, 11, 0.2, 0.8, 0.5)
    };
}

#[test]
fn unrooted_unreferenced_block_is_collected() {
    let mut gc = new_collector!();
    gc.malloc(64).unwrap();
    assert_eq!(gc.len(), 1);
    let reclaimed = gc.collect();
    assert_eq!(reclaimed, 64);
    assert_eq!(gc.len(), 0);
}

#[test]
fn block_reachable_from_the_stack_survives() {
    let mut gc = new_collector!();
    let ptr = gc.malloc(64).unwrap();
    std::hint::black_box(ptr);
    gc.collect();
    assert_eq!(
        gc.len(),
        1,
        "a pointer still live on the stack must survive collection"
    );
    assert!(gc.get(ptr).is_some());
}

#[test]
fn transitive_chain_from_the_stack_survives() {
    let mut gc = new_collector!();
    let tail = gc.malloc(8).unwrap();
    let head = gc.malloc(std::mem::size_of::<usize>()).unwrap();
    // SAFETY: `head` is a freshly-managed block at least one word wide.
    unsafe { std::ptr::write_unaligned(head as *mut usize, tail as usize) };
    std::hint::black_box(head);
    gc.collect();
    assert_eq!(
        gc.len(),
        2,
        "tail is reachable only through head's payload, not a direct stack reference"
    );
}

#[test]
fn malloc_static_survives_with_no_stack_reference() {
    let mut gc = new_collector!();
    gc.malloc_static(32, None).unwrap();
    gc.collect();
    assert_eq!(
        gc.len(),
        1,
        "rooted blocks survive collection independent of the stack"
    );
}

#[test]
fn finalizer_runs_exactly_once_on_stop() {
    let runs = Rc::new(Cell::new(0));
    let mut gc = new_collector!();
    let runs_clone = Rc::clone(&runs);
    gc.malloc_with_finalizer(
        16,
        Some(Box::new(move |_| runs_clone.set(runs_clone.get() + 1))),
    )
    .unwrap();
    let freed = gc.stop();
    assert!(freed > 0);
    assert_eq!(runs.get(), 1);
}

#[test]
fn disable_prevents_automatic_collection() {
    let mut gc = new_collector!();
    gc.disable();
    for _ in 0..64 {
        gc.malloc(32).unwrap();
    }
    assert!(
        gc.len() >= 64,
        "disabled collector must not reclaim anything on its own"
    );
    gc.enable();
    gc.collect();
    assert_eq!(gc.len(), 0);
}

#[test]
fn registry_resizes_under_sustained_load() {
    let mut gc = new_collector!();
    gc.disable();
    let initial_capacity = gc.capacity();
    for _ in 0..500 {
        gc.malloc_static(8, None).unwrap();
    }
    assert!(
        gc.capacity() > initial_capacity,
        "registry should have grown to keep its load factor bounded"
    );
}

#[test]
fn realloc_grow_preserves_contents() {
    let mut gc = new_collector!();
    let ptr = gc.malloc(4).unwrap();
    // SAFETY: `ptr` is a freshly-managed 4-byte block.
    unsafe { std::ptr::copy_nonoverlapping(b"abcd".as_ptr(), ptr, 4) };
    let grown = gc.realloc(ptr, 8).unwrap();
    // SAFETY: `grown` is managed and at least 4 bytes long.
    let bytes = unsafe { std::slice::from_raw_parts(grown, 4) };
    assert_eq!(bytes, b"abcd");
    assert_eq!(gc.get(grown).unwrap().size(), 8);
}

#[test]
fn realloc_carries_the_finalizer_to_the_new_address() {
    let runs = Rc::new(Cell::new(0));
    let mut gc = new_collector!();
    let runs_clone = Rc::clone(&runs);
    let ptr = gc
        .malloc_with_finalizer(4, Some(Box::new(move |_| runs_clone.set(runs_clone.get() + 1))))
        .unwrap();
    let grown = gc.realloc(ptr, 4096).unwrap();
    gc.free(grown);
    assert_eq!(
        runs.get(),
        1,
        "the finalizer registered before realloc must still fire on the new block"
    );
}

#[test]
fn realloc_of_untracked_pointer_is_rejected() {
    let mut gc = new_collector!();
    let mut local = [0u8; 8];
    let err = gc.realloc(local.as_mut_ptr(), 16).unwrap_err();
    assert!(matches!(err, GcError::InvalidArgument { .. }));
}

#[test]
fn realloc_null_with_zero_size_is_rejected() {
    let mut gc = new_collector!();
    let err = gc.realloc(std::ptr::null_mut(), 0).unwrap_err();
    assert!(matches!(err, GcError::InvalidArgument { .. }));
}

#[test]
fn free_of_untracked_pointer_is_a_harmless_noop() {
    let mut gc = new_collector!();
    let mut local = [0u8; 8];
    gc.free(local.as_mut_ptr());
    assert_eq!(gc.len(), 0);
}

#[test]
fn strdup_copies_bytes_and_nul_terminator() {
    let mut gc = new_collector!();
    let source = CStr::from_bytes_with_nul(b"hello\0").unwrap();
    let ptr = gc.strdup(source).unwrap();
    // SAFETY: `strdup` copied a nul-terminated `hello\0` into managed memory.
    let copied = unsafe { CStr::from_ptr(ptr as *const std::os::raw::c_char) };
    assert_eq!(copied.to_bytes(), b"hello");
}
