//! Compares plain heap allocation against managed allocation over a large
//! number of iterations, to get a rough sense of the collector's overhead.

struct Foo {
    value: i32,
}

impl Foo {
    fn show(&self) {
        std::hint::black_box(self.value);
    }
}

fn vanilla_iteration() {
    let instance = Box::new(Foo { value: 42 });
    instance.show();
}

fn managed_iteration(gc: &mut warden_gc::Collector) {
    let instance: *mut Foo = warden_ext::gc_new!(gc, Foo { value: 42 });
    // SAFETY: `instance` was just constructed in place by `gc_new!`.
    unsafe { (*instance).show() };
}

fn main() {
    const ITERATIONS: usize = 1_000_000;

    let vanilla_start = std::time::Instant::now();
    for _ in 0..ITERATIONS {
        vanilla_iteration();
    }
    let vanilla_elapsed = vanilla_start.elapsed();

    let mut gc = warden_gc::Collector::start(warden_gc::stack_base!());
    let managed_start = std::time::Instant::now();
    for _ in 0..ITERATIONS {
        managed_iteration(&mut gc);
    }
    gc.collect();
    let managed_elapsed = managed_start.elapsed();
    gc.stop();

    println!("vanilla: {ITERATIONS} allocations in {vanilla_elapsed:?}");
    println!("managed: {ITERATIONS} allocations in {managed_elapsed:?}");
}
