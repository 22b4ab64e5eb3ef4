//! Integration tests for the buffer/array/thread-registry wrappers.

use warden_ext::{with_thread_collector, Array, Buffer, ThreadRegistry};
use warden_gc::Collector;

// A macro, not a function: `stack_base!()` must expand directly in the
// frame whose locals we want the collector to scan, and a helper function
// would instead capture the address of its own (deeper, short-lived) frame.
macro_rules! new_collector {
    () => {
        Collector::start(warden_gc::stack_base!())
    };
}

#[test]
fn buffer_roundtrips_bytes() {
    let mut gc = new_collector!();
    let mut buffer = Buffer::new(&mut gc, 4).unwrap();
    // SAFETY: the collector hasn't run a collection since `buffer` was made.
    unsafe { buffer.as_mut_slice().copy_from_slice(b"gc!!") };
    // SAFETY: same collector, no intervening collection.
    assert_eq!(unsafe { buffer.as_slice() }, b"gc!!");
}

#[test]
fn array_reports_slot_geometry() {
    let mut gc = new_collector!();
    let array = Array::<u32>::new(&mut gc, 16).unwrap();
    assert_eq!(array.len(), 16);
    assert_eq!(array.slot_size(), std::mem::size_of::<u32>());
    assert_eq!(array.buffer().length(), 16 * std::mem::size_of::<u32>());
}

#[test]
fn thread_registry_starts_and_stops_a_collector() {
    let count = with_thread_collector(|gc| {
        gc.malloc(16).unwrap();
        gc.len()
    });
    assert_eq!(count, 1);
    let freed = ThreadRegistry::stop();
    assert_eq!(freed, Some(16));
}
