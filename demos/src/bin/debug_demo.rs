//! Small, easy-to-step-through program for exercising the collector under a
//! debugger or with `gc_logging` enabled (`cargo run --features
//! warden-gc/gc_logging --bin debug_demo`).

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
            position: Vector3 { x: 1.0, y: 2.0, z: 3.0 },
        }
    );
    let name = gc.strdup(c"debug-entity").expect("strdup failed");
    // SAFETY: `entity` was just constructed in place above.
    unsafe { (*entity).name = name };
}

fn main() {
    let mut gc = warden_gc::Collector::start(warden_gc::stack_base!());

    for _ in 0..10 {
        do_something(&mut gc);
    }

    let reclaimed = gc.collect();
    println!("debug_demo: reclaimed {reclaimed} bytes, {} blocks remain", gc.len());

    gc.stop();
}
