//! Conservative scanning of the machine stack.
//!
//! The reference collector dumps callee-saved registers onto the stack with a
//! volatile function pointer plus `setjmp`, then scans from the current stack
//! pointer up to a previously recorded base. Rust has no portable `jmp_buf`,
//! so [`spill_callee_saved_registers`] gets a comparable effect on the two
//! architectures this crate targets explicitly by telling the compiler, via
//! inline asm, that every callee-saved register is clobbered at this point:
//! any value the caller chain was keeping live in one of those registers
//! across the call into this crate must be written to that caller's own
//! stack frame first, per the calling convention, which puts it inside the
//! range [`scan_stack`] walks. On other architectures this is a documented
//! no-op; see the caveat on [`spill_callee_saved_registers`].

use crate::collector::Collector;

/// Number of machine words scanned immediately below the register-spill
/// point, to account for this function's own locals.
const FLUSH_SLOTS: usize = 32;

/// Force the compiler to spill any live, pointer-bearing locals sitting in
/// callee-saved registers to memory within the scanned stack range.
///
/// This declares every callee-saved register clobbered via an empty inline
/// asm block — a documented pattern for reading (and here, for forcing a
/// save/restore around) a specific physical register. Because those
/// registers are callee-saved per the platform's calling convention, any
/// function on the call stack that is relying on one of them surviving
/// across the call into this crate must have already pushed its incoming
/// value onto its own stack frame before the call, so that it can restore it
/// on return — which is exactly the memory we want [`scan_stack`] to see.
///
/// # Caveat
/// This is a best-effort technique, not a `setjmp`-strength guarantee. It is
/// implemented only for `x86_64` and `aarch64`; on other architectures it is
/// a no-op, and a pointer resident only in a register (never spilled, never
/// also present on the stack or in a reachable block) can be missed by that
/// cycle's collection. Host code on unsupported architectures should avoid
/// relying on a collector root that exists solely in a register across a
/// call to [`Collector::collect`].
#[inline(never)]
fn spill_callee_saved_registers() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        // `rbx` and `rbp` cannot be named as asm operands on stable Rust
        // (the frame pointer is always rejected, and `rbx` is reserved by
        // LLVM), so they are spilled and restored via explicit push/pop
        // instructions instead of `out(reg)` operands; the net effect on
        // the stack is the same.
        std::arch::asm!(
            "push rbx",
            "pop rbx",
            "push rbp",
            "pop rbp",
            out("r12") _,
            out("r13") _,
            out("r14") _,
            out("r15") _,
            options(nostack, preserves_flags),
        );
    }
    #[cfg(target_arch = "aarch64")]
    unsafe {
        std::arch::asm!(
            "",
            out("x19") _,
            out("x20") _,
            out("x21") _,
            out("x22") _,
            out("x23") _,
            out("x24") _,
            out("x25") _,
            out("x26") _,
            out("x27") _,
            out("x28") _,
            options(nostack, preserves_flags),
        );
    }
}

/// Force live register contents onto the stack, then scan from here down to
/// `stack_base` (exclusive) for values that look like tracked block
/// addresses, marking every hit.
///
/// # Safety
/// `stack_base` must be a valid stack address captured earlier in the same
/// thread's call stack (typically near the root of the program, via the
/// `stack_base!` macro and [`Collector::start`]), and must not have been
/// invalidated by the stack unwinding past it.
pub(crate) unsafe fn scan_stack(collector: &mut Collector, stack_base: usize) {
    spill_callee_saved_registers();

    let flush: [usize; FLUSH_SLOTS] = [0; FLUSH_SLOTS];
    let flush = std::hint::black_box(flush);
    let stack_top = flush.as_ptr() as usize;

    #[cfg(feature = "gc_logging")]
    tracing::debug!(
        target: "warden_gc::stack",
        top = stack_top,
        base = stack_base,
        "scanning conservative stack range"
    );

    let (lo, hi) = if stack_top <= stack_base {
        (stack_top, stack_base)
    } else {
        (stack_base, stack_top)
    };
    let word = std::mem::size_of::<usize>();
    if hi - lo < word {
        return;
    }

    let mut addr = lo;
    while addr <= hi - word {
        // SAFETY: `addr` falls within the live stack range between the
        // caller-provided base and the stack pointer observed just above;
        // every word-aligned-or-not offset in that range is readable stack
        // memory for the duration of this call.
        let candidate = unsafe { std::ptr::read_unaligned(addr as *const usize) };
        collector.mark_candidate(candidate as *mut u8);
        addr += 1;
    }
}

/// Capture an address near the root of the *current* call frame, for use as
/// `stack_base` in [`Collector::start`]/[`Collector::start_ext`].
///
/// This must be a macro, not a function: a function call introduces its own,
/// deeper stack frame, so an address captured inside one sits below (at a
/// lower address than) the frame that called it — excluding that frame, and
/// everything in it, from every later scan. Expanding in place instead
/// captures an address that is part of the caller's own frame, so roots held
/// there are covered by [`scan_stack`] for the lifetime of the collector.
///
/// ```
/// let mut gc = warden_gc::Collector::start(warden_gc::stack_base!());
/// # gc.stop();
/// ```
#[macro_export]
macro_rules! stack_base {
    () => {{
        let __warden_gc_stack_base_probe: usize = 0;
        ::std::hint::black_box(&__warden_gc_stack_base_probe) as *const usize as usize
    }};
}
