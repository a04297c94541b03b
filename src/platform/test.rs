// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! A fake platform for unit tests.
//!
//! Register blocks resolve to fake device memory, the retained and shared
//! windows are leaked host buffers, and the diverging primitives panic with
//! magic strings so tests can unwind them with `catch_unwind`.

use super::{Platform, WakeSource};
use crate::monitor::CoresImpl;
use crate::{
    layout,
    mmio::{DeviceBlock, RegisterBank, RetryPolicy, fake::FakeDeviceMemory},
    retained::RetainedRegion,
    sysregs,
};
use core::sync::atomic::{AtomicBool, Ordering};
use percore::{Cores, ExceptionFree};
use spin::mutex::{SpinMutex, SpinMutexGuard};
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

/// The fake hardware (device memory aside, the CP15 register file and the
/// per-core monitor contexts) is process-global; tests that steer it must
/// hold this lock so the parallel test harness cannot interleave them.
static HARDWARE: SpinMutex<()> = SpinMutex::new(());

/// Serialises a test against every other user of the global fake hardware.
pub fn lock_hardware() -> SpinMutexGuard<'static, ()> {
    HARDWARE.lock()
}

/// Size of the fake non-secure shared window: two checksum blocks.
const SHARED_SIZE: usize = 0x2_0000;

/// Placeholder resume stub bytes; the tests only care that the image is
/// copied and flushed, not what it encodes.
const FAKE_STUB: &[u8] = &[
    0x1e, 0xff, 0x2f, 0xe1, 0x00, 0x00, 0xa0, 0xe1, 0x1e, 0xff, 0x2f, 0xe1, 0x00, 0x00, 0xa0, 0xe1,
];

/// Wake whitelist used by tests: one source in the first mask bank, one in
/// the third.
const TEST_WAKE_SOURCES: &[WakeSource] = &[WakeSource { irq: 36 }, WakeSource { irq: 103 }];

struct Inner {
    mem: FakeDeviceMemory,
    retained_base: usize,
    shared_base: usize,
    shared_len: usize,
    early_wake: AtomicBool,
    verify: AtomicBool,
}

/// A fake platform for unit tests.
#[derive(Clone, Copy)]
pub struct TestPlatform {
    inner: &'static Inner,
}

impl TestPlatform {
    /// Functions that normally do not return make it impossible to test any
    /// PSCI call which ends in them. The test platform panics with the
    /// following magic strings instead, which [`expect_diverge`] catches.
    pub const SUSPEND_WFI_MAGIC: &str = "SUSPEND_WFI_MAGIC";
    /// Magic panic for the park loop.
    pub const PARK_WFE_MAGIC: &str = "PARK_WFE_MAGIC";
    /// Magic panic for the reset/power-off backstop spin.
    pub const TERMINAL_WFI_MAGIC: &str = "TERMINAL_WFI_MAGIC";
    /// Magic panic for the fatal integrity halt.
    pub const FATAL_HALT_MAGIC: &str = "FATAL_HALT_MAGIC";

    /// Creates a fresh fake platform with its own device memory and windows.
    pub fn new() -> Self {
        let retained = Box::leak(
            vec![0u32; layout::OCRAM_RESERVED_SIZE / 4].into_boxed_slice(),
        );
        let shared = Box::leak(vec![0u8; SHARED_SIZE].into_boxed_slice());
        let inner = Box::leak(Box::new(Inner {
            mem: FakeDeviceMemory::default(),
            retained_base: retained.as_mut_ptr() as usize,
            shared_base: shared.as_mut_ptr() as usize,
            shared_len: shared.len(),
            early_wake: AtomicBool::new(false),
            verify: AtomicBool::new(true),
        }));
        Self { inner }
    }

    /// Returns the fake device memory backing all register banks.
    pub fn memory(&self) -> &'static FakeDeviceMemory {
        &self.inner.mem
    }

    /// Makes the next armed wait-for-interrupt return instead of "powering
    /// down", modelling an interrupt racing ahead of sleep entry.
    pub fn set_early_wake(&self, value: bool) {
        self.inner.early_wake.store(value, Ordering::Relaxed);
    }

    /// Enables or disables the post-wake integrity check.
    pub fn set_verify_integrity(&self, value: bool) {
        self.inner.verify.store(value, Ordering::Relaxed);
    }

    /// Flips one byte of the fake non-secure shared window, modelling a
    /// tamper while the machine slept.
    pub fn corrupt_shared_byte(&self, index: usize) {
        assert!(index < self.inner.shared_len);
        // SAFETY: The window is a leaked buffer owned by this platform, and
        // tests run the power core and this helper on one thread.
        unsafe {
            let byte = (self.inner.shared_base + index) as *mut u8;
            *byte ^= 0x55;
        }
    }

    /// Steers which core the power core believes it is running on.
    pub fn set_current_core(core_index: usize) {
        sysregs::fake::SYSREGS.lock().mpidr = core_index as u32;
    }
}

impl Platform for TestPlatform {
    const CORE_COUNT: usize = 4;
    const CACHE_WRITEBACK_GRANULE: usize = 1 << 6;

    fn device(&self, block: DeviceBlock) -> RegisterBank {
        let phys = match block {
            DeviceBlock::Src => layout::SRC_BASE,
            DeviceBlock::Ccm => layout::CCM_BASE,
            DeviceBlock::Anatop => layout::ANATOP_BASE,
            DeviceBlock::Gpc => layout::GPC_BASE,
            DeviceBlock::Snvs => layout::SNVS_BASE,
            DeviceBlock::Wdog => layout::WDOG_BASE,
            DeviceBlock::Scu => layout::SCU_BASE,
            DeviceBlock::Pl310 => layout::PL310_BASE,
            DeviceBlock::Csu => layout::CSU_BASE,
        };
        RegisterBank::with_memory(phys as usize, &self.inner.mem)
    }

    fn retained_region(&self) -> RetainedRegion {
        RetainedRegion {
            virt: self.inner.retained_base,
            phys: layout::OCRAM_BASE,
            size: layout::OCRAM_RESERVED_SIZE,
        }
    }

    fn resume_stub(&self) -> &'static [u8] {
        FAKE_STUB
    }

    fn nonsecure_shared(&self) -> &[u8] {
        // SAFETY: The window is a leaked buffer owned by this platform;
        // `corrupt_shared_byte` is the only writer and tests are
        // single-threaded per platform.
        unsafe {
            core::slice::from_raw_parts(self.inner.shared_base as *const u8, self.inner.shared_len)
        }
    }

    fn wake_sources(&self) -> &[WakeSource] {
        TEST_WAKE_SOURCES
    }

    fn verify_integrity(&self) -> bool {
        self.inner.verify.load(Ordering::Relaxed)
    }

    fn poll_policy(&self) -> RetryPolicy {
        RetryPolicy::Bounded(32)
    }

    fn clean_cache_range(&self, virt: usize, _phys: u32, len: usize) {
        self.inner.mem.record(crate::mmio::fake::Access::Clean { base: virt, len });
    }

    fn invalidate_cache_range(&self, virt: usize, _phys: u32, len: usize) {
        self.inner
            .mem
            .record(crate::mmio::fake::Access::Invalidate { base: virt, len });
    }

    fn wait_for_interrupt(&self) {
        if self.inner.early_wake.swap(false, Ordering::Relaxed) {
            return;
        }
        panic!("{}", Self::SUSPEND_WFI_MAGIC);
    }

    fn park_loop(&self) -> ! {
        // Model the hardware: once the core sits in its wait loop, the SCU
        // power status reports it.
        let status_addr = layout::SCU_BASE as usize + layout::SCU_CPU_POWER_STATUS;
        let core_index = CoresImpl::core_index();
        let status = self.inner.mem.peek32(status_addr) | layout::scu_status_mask(core_index);
        self.inner.mem.preset32(status_addr, status);
        panic!("{}", Self::PARK_WFE_MAGIC);
    }

    fn terminal_spin(&self) -> ! {
        panic!("{}", Self::TERMINAL_WFI_MAGIC);
    }

    fn halt(&self) -> ! {
        panic!("{}", Self::FATAL_HALT_MAGIC);
    }
}

/// Runs the given function and returns the result.
///
/// This is a fake version of `percore::exception_free` for use in unit tests
/// only, which must be run on a single thread.
pub fn exception_free<T>(f: impl FnOnce(ExceptionFree) -> T) -> T {
    // SAFETY: This is only used in unit tests, which are run on the host
    // where there are no hardware exceptions nor multiple threads touching
    // one platform.
    let token = unsafe { ExceptionFree::new() };
    f(token)
}

/// The function expects the closure to end in a diverging power operation.
/// This would normally end in a function which never returns (`func() -> !`),
/// which makes it impossible to test, so the test platform panics with a
/// magic string instead and this helper unwinds it.
pub fn expect_diverge<F>(magic: &str, f: F)
where
    F: FnOnce(),
{
    // Run closure and expect panic unwind. AssertUnwindSafe is required,
    // because spin::Mutex does not implement UnwindSafe.
    let result = catch_unwind(AssertUnwindSafe(f));

    if let Err(err) = result {
        // The closure has panicked, check for the magic string.
        if let Some(s) = err.downcast_ref::<String>()
            && *s == magic
        {
            return;
        }

        // Propagate other panics.
        resume_unwind(err);
    } else {
        panic!("Expected diverging operation returned");
    }
}
