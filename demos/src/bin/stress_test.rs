//! Allocates a large number of short-lived managed objects to exercise the
//! collector's resize and sweep paths under sustained load.

struct Vector3 {
    x: f32,
    y: f32,
    z: f32,
}

struct Entity {
    name: *mut u8,
    position: Vector3,
}

fn do_something(gc: &mut warden_gc::Collector) {
    let entity: *mut Entity = warden_ext::gc_new!(
        gc,
        Entity {
            name: std::ptr::null_mut(),
            position: Vector3 { x: 0.0, y: 0.0, z: 0.0 },
        }
    );
    let name: *mut u8 = gc.malloc(64).expect("allocation failed");
    // SAFETY: `entity` was just constructed in place by `gc_new!`.
    unsafe { (*entity).name = name };

    let _big_array = warden_ext::Array::<u64>::new(gc, 1024).expect("array allocation failed");
}

fn main() {
    let mut gc = warden_gc::Collector::start(warden_gc::stack_base!());

    let total_iterations = 100_000;
    for i in 0..total_iterations {
        do_something(&mut gc);
        if i % 1_000 == 999 {
            gc.collect();
        }
    }

    let freed = gc.stop();
    println!("stress_test: freed {freed} bytes on shutdown");
}
