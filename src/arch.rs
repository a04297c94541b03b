// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Thin wrappers around ARMv7-A instructions.
//!
//! On any other target architecture (including host-side unit tests) these
//! compile to empty bodies; the test platform models their effects instead.

#[cfg(all(target_arch = "arm", not(test)))]
use core::arch::asm;

/// Smallest data cache line size on the platform; used as the stride for
/// cache maintenance by address.
pub const CACHE_LINE_SIZE: usize = 32;

/// Issues a `wfi` instruction, waiting for an interrupt.
pub fn wfi() {
    // SAFETY: `wfi` does not violate safe Rust guarantees.
    #[cfg(all(target_arch = "arm", not(test)))]
    unsafe {
        asm!("wfi", options(nostack));
    }
}

/// Issues a `wfe` instruction, waiting for an event.
pub fn wfe() {
    // SAFETY: `wfe` does not violate safe Rust guarantees.
    #[cfg(all(target_arch = "arm", not(test)))]
    unsafe {
        asm!("wfe", options(nostack));
    }
}

/// Issues a `sev` instruction, signalling an event to all cores.
pub fn sev() {
    // SAFETY: `sev` does not violate safe Rust guarantees.
    #[cfg(all(target_arch = "arm", not(test)))]
    unsafe {
        asm!("sev", options(nostack));
    }
}

/// Issues a full-system data synchronization barrier.
pub fn dsb_sy() {
    // SAFETY: `dsb` does not violate safe Rust guarantees.
    #[cfg(all(target_arch = "arm", not(test)))]
    unsafe {
        asm!("dsb sy", options(nostack));
    }
}

/// Issues an instruction synchronization barrier.
pub fn isb() {
    // SAFETY: `isb` does not violate safe Rust guarantees.
    #[cfg(all(target_arch = "arm", not(test)))]
    unsafe {
        asm!("isb", options(nostack));
    }
}

/// Masks asynchronous aborts, IRQs and FIQs on the calling core.
pub fn mask_all_exceptions() {
    // SAFETY: Masking exceptions does not violate safe Rust guarantees; the
    // callers of this function never expect to be interrupted again.
    #[cfg(all(target_arch = "arm", not(test)))]
    unsafe {
        asm!("cpsid aif", options(nostack));
    }
}

/// Cleans the L1 data cache by MVA over the given range, making the data
/// visible past the inner cache.
pub fn clean_dcache_range(base: usize, len: usize) {
    #[cfg(all(target_arch = "arm", not(test)))]
    {
        let mut line = base & !(CACHE_LINE_SIZE - 1);
        while line < base + len {
            // SAFETY: `DCCMVAC` is an unprivileged-data-safe maintenance
            // operation and does not violate safe Rust guarantees.
            unsafe {
                asm!("mcr p15, 0, {0}, c7, c10, 1", in(reg) line, options(nostack));
            }
            line += CACHE_LINE_SIZE;
        }
        dsb_sy();
    }
    #[cfg(not(all(target_arch = "arm", not(test))))]
    {
        let _ = (base, len);
    }
}

/// Invalidates the L1 data cache by MVA over the given range, discarding any
/// cached copies so the next read observes memory.
pub fn invalidate_dcache_range(base: usize, len: usize) {
    #[cfg(all(target_arch = "arm", not(test)))]
    {
        let mut line = base & !(CACHE_LINE_SIZE - 1);
        while line < base + len {
            // SAFETY: `DCIMVAC` affects only cache state for lines this core
            // is entitled to access; it does not violate safe Rust guarantees.
            unsafe {
                asm!("mcr p15, 0, {0}, c7, c6, 1", in(reg) line, options(nostack));
            }
            line += CACHE_LINE_SIZE;
        }
        dsb_sy();
    }
    #[cfg(not(all(target_arch = "arm", not(test))))]
    {
        let _ = (base, len);
    }
}

/// Invalidates the instruction cache by MVA over the given range and flushes
/// the branch predictor.
pub fn invalidate_icache_range(base: usize, len: usize) {
    #[cfg(all(target_arch = "arm", not(test)))]
    {
        let mut line = base & !(CACHE_LINE_SIZE - 1);
        while line < base + len {
            // SAFETY: `ICIMVAU` and `BPIALL` only affect instruction cache and
            // branch predictor state.
            unsafe {
                asm!("mcr p15, 0, {0}, c7, c5, 1", in(reg) line, options(nostack));
            }
            line += CACHE_LINE_SIZE;
        }
        // SAFETY: See above.
        unsafe {
            asm!("mcr p15, 0, {0}, c7, c5, 6", in(reg) 0u32, options(nostack));
        }
        dsb_sy();
        isb();
    }
    #[cfg(not(all(target_arch = "arm", not(test))))]
    {
        let _ = (base, len);
    }
}
