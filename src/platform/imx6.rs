// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The production platform: an i.MX6 quad-core part.

use super::{AddressTranslation, MemoryKind, Platform, WakeSource};
use crate::{
    arch, layout,
    mmio::{DeviceBlock, RegisterBank, RetryPolicy},
    retained::RetainedRegion,
};

/// Interrupt number of the GPIO bank 3 combined interrupt, which carries the
/// power-button line.
const GPIO3_COMBINED_IRQ: u32 = 103;

/// The interrupt sources allowed to wake the SoC from deep sleep.
const WAKE_SOURCES: &[WakeSource] = &[WakeSource {
    irq: GPIO3_COMBINED_IRQ,
}];

/// The i.MX6 platform.
pub struct Imx6 {
    translation: &'static dyn AddressTranslation,
}

impl Imx6 {
    /// Creates the platform around the runtime's address-translation
    /// collaborator.
    pub const fn new(translation: &'static dyn AddressTranslation) -> Self {
        Self { translation }
    }

    fn resolve(&self, phys: u32, kind: MemoryKind) -> usize {
        if self.translation.mmu_enabled() {
            self.translation.phys_to_virt(phys, kind)
        } else {
            phys as usize
        }
    }

    /// Cleans the PL310 outer cache by physical address over the given range.
    fn outer_clean(&self, phys: u32, len: usize) {
        let pl310 = self.device(DeviceBlock::Pl310);
        let mut line = phys as usize & !(layout::PL310_LINE_SIZE - 1);
        while line < phys as usize + len {
            pl310.write32(layout::PL310_CLEAN_PA, line as u32);
            line += layout::PL310_LINE_SIZE;
        }
        pl310.write32(layout::PL310_CACHE_SYNC, 0);
        arch::dsb_sy();
    }

    /// Invalidates the PL310 outer cache by physical address over the given
    /// range.
    fn outer_invalidate(&self, phys: u32, len: usize) {
        let pl310 = self.device(DeviceBlock::Pl310);
        let mut line = phys as usize & !(layout::PL310_LINE_SIZE - 1);
        while line < phys as usize + len {
            pl310.write32(layout::PL310_INV_PA, line as u32);
            line += layout::PL310_LINE_SIZE;
        }
        pl310.write32(layout::PL310_CACHE_SYNC, 0);
        arch::dsb_sy();
    }
}

impl Platform for Imx6 {
    const CORE_COUNT: usize = 4;
    const CACHE_WRITEBACK_GRANULE: usize = 32;

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
        let base = self.resolve(phys, MemoryKind::SecureDevice);
        // SAFETY: `base` comes from the runtime's translation of a device
        // block that stays mapped for the lifetime of the system, and the
        // power core is the only driver of these blocks.
        unsafe { RegisterBank::new(base) }
    }

    fn retained_region(&self) -> RetainedRegion {
        RetainedRegion {
            virt: self.resolve(layout::OCRAM_BASE, MemoryKind::SecureRam),
            phys: layout::OCRAM_BASE,
            size: layout::OCRAM_RESERVED_SIZE,
        }
    }

    fn resume_stub(&self) -> &'static [u8] {
        stub::image()
    }

    fn nonsecure_shared(&self) -> &[u8] {
        let base = self.resolve(layout::NSEC_SHARED_BASE, MemoryKind::NonsecureRam);
        // SAFETY: The shared window is a fixed DRAM range that stays mapped
        // for the lifetime of the system. The normal world may race writes to
        // it; the integrity check only ever reads bytes, and tolerating a
        // torn read is exactly why mismatches are treated as tampering.
        unsafe { core::slice::from_raw_parts(base as *const u8, layout::NSEC_SHARED_SIZE) }
    }

    fn wake_sources(&self) -> &[WakeSource] {
        WAKE_SOURCES
    }

    fn verify_integrity(&self) -> bool {
        true
    }

    fn poll_policy(&self) -> RetryPolicy {
        RetryPolicy::Forever
    }

    fn clean_cache_range(&self, virt: usize, phys: u32, len: usize) {
        arch::clean_dcache_range(virt, len);
        self.outer_clean(phys, len);
    }

    fn invalidate_cache_range(&self, virt: usize, phys: u32, len: usize) {
        self.outer_invalidate(phys, len);
        arch::invalidate_dcache_range(virt, len);
    }

    fn wait_for_interrupt(&self) {
        arch::dsb_sy();
        arch::wfi();
    }

    fn park_loop(&self) -> ! {
        loop {
            arch::wfe();
        }
    }

    fn terminal_spin(&self) -> ! {
        arch::dsb_sy();
        loop {
            arch::wfi();
        }
    }

    fn halt(&self) -> ! {
        arch::mask_all_exceptions();
        loop {
            arch::wfi();
        }
    }
}

#[cfg(target_arch = "arm")]
mod stub {
    use crate::layout;
    use crate::psci::suspend::{CHECKPOINT_RESUMING, ResumeContext};
    use core::arch::global_asm;
    use core::mem::offset_of;

    // The resume stub runs from OCRAM at the warm reset vector, before caches
    // and DRAM are usable. It marks the resume context as the resuming
    // continuation, then jumps into the monitor's warm entry. Everything it
    // loads sits inside its own copy, so the fragment stays relocatable.
    global_asm!(
        ".section .text",
        ".global resume_stub_start",
        ".global resume_stub_end",
        "resume_stub_start:",
        "ldr r2, 1f",
        "ldr r0, [r2, #{GPR_CONTEXT}]",
        "ldr r1, 2f",
        "str r1, [r0, #{CHECKPOINT}]",
        "dsb sy",
        "ldr pc, 3f",
        "1: .word {SRC_BASE}",
        "2: .word {RESUMING}",
        "3: .word monitor_warm_entrypoint",
        "resume_stub_end:",
        SRC_BASE = const layout::SRC_BASE,
        GPR_CONTEXT = const layout::SRC_GPR1 + 4,
        CHECKPOINT = const offset_of!(ResumeContext, checkpoint),
        RESUMING = const CHECKPOINT_RESUMING,
    );

    unsafe extern "C" {
        static resume_stub_start: u8;
        static resume_stub_end: u8;
    }

    /// Returns the resume stub image as copyable bytes.
    pub fn image() -> &'static [u8] {
        // SAFETY: The symbols delimit the stub emitted above; the range
        // between them is immutable code bytes.
        unsafe {
            let start = &raw const resume_stub_start;
            let end = &raw const resume_stub_end;
            core::slice::from_raw_parts(start, end.offset_from(start) as usize)
        }
    }
}

#[cfg(not(target_arch = "arm"))]
mod stub {
    /// Stand-in for builds without the ARM stub fragment.
    pub fn image() -> &'static [u8] {
        &[]
    }
}
