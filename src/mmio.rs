// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Access to memory-mapped device registers.
//!
//! Every hardware access of the power core goes through a [`RegisterBank`]
//! resolved by the platform. Multi-register reconfigurations are expressed as
//! ordered [`ScriptStep`] tables rather than inline bit arithmetic, because an
//! observer (another core, a DMA engine, the watchdog) can act on any
//! intermediate configuration; the step order is a tested property.

#[cfg(test)]
pub mod fake;

use crate::arch;
use arm_psci::ErrorCode;

/// The device register blocks known to the power core.
///
/// The platform resolves each block to an addressable [`RegisterBank`],
/// accounting for whether address translation is active yet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceBlock {
    /// System reset controller.
    Src,
    /// Clock controller module.
    Ccm,
    /// Analog/PMU control block.
    Anatop,
    /// General power controller.
    Gpc,
    /// Always-on SNVS block.
    Snvs,
    /// Watchdog 1.
    Wdog,
    /// Snoop control unit.
    Scu,
    /// PL310 outer cache controller.
    Pl310,
    /// Central security unit.
    Csu,
}

/// An addressable handle over one device register block.
#[derive(Clone, Copy)]
pub struct RegisterBank {
    base: usize,
    #[cfg(test)]
    mem: &'static fake::FakeDeviceMemory,
}

impl RegisterBank {
    /// Creates a bank over the device block mapped at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the currently-addressable base of a device register
    /// block which stays mapped for the lifetime of the bank, and nothing
    /// else may drive the same registers concurrently.
    #[cfg(not(test))]
    pub unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Creates a bank over a block of fake device memory.
    #[cfg(test)]
    pub fn with_memory(base: usize, mem: &'static fake::FakeDeviceMemory) -> Self {
        Self { base, mem }
    }

    /// Returns the base address the bank was resolved to.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Reads a 32-bit register.
    pub fn read32(&self, offset: usize) -> u32 {
        #[cfg(not(test))]
        // SAFETY: The constructor contract guarantees that `base` addresses a
        // mapped device block, so the whole block is readable.
        unsafe {
            return ((self.base + offset) as *const u32).read_volatile();
        }
        #[cfg(test)]
        return self.mem.read32(self.base + offset);
    }

    /// Writes a 32-bit register.
    pub fn write32(&self, offset: usize, value: u32) {
        #[cfg(not(test))]
        // SAFETY: The constructor contract guarantees that `base` addresses a
        // mapped device block, so the whole block is writable.
        unsafe {
            ((self.base + offset) as *mut u32).write_volatile(value)
        }
        #[cfg(test)]
        self.mem.write32(self.base + offset, value);
    }

    /// Reads a 16-bit register.
    pub fn read16(&self, offset: usize) -> u16 {
        #[cfg(not(test))]
        // SAFETY: See `read32`.
        unsafe {
            return ((self.base + offset) as *const u16).read_volatile();
        }
        #[cfg(test)]
        return self.mem.read16(self.base + offset);
    }

    /// Writes a 16-bit register.
    pub fn write16(&self, offset: usize, value: u16) {
        #[cfg(not(test))]
        // SAFETY: See `write32`.
        unsafe {
            ((self.base + offset) as *mut u16).write_volatile(value)
        }
        #[cfg(test)]
        self.mem.write16(self.base + offset, value);
    }

    /// Read-modify-writes a 32-bit register: clears the `clear` bits, then
    /// sets the `set` bits.
    pub fn modify32(&self, offset: usize, clear: u32, set: u32) {
        let value = self.read32(offset);
        self.write32(offset, (value & !clear) | set);
    }
}

/// One step of an ordered register reconfiguration: read-modify-write of the
/// register at `offset` within `block`, clearing `clear` then setting `set`.
///
/// A step with `clear == u32::MAX` is a plain write of `set`.
#[derive(Clone, Copy, Debug)]
pub struct ScriptStep {
    /// Block the register lives in.
    pub block: DeviceBlock,
    /// Register offset within the block.
    pub offset: usize,
    /// Bits to clear.
    pub clear: u32,
    /// Bits to set.
    pub set: u32,
}

/// Applies the steps of a reconfiguration script in exact table order, with a
/// barrier after each step so no observer sees them reordered.
pub fn apply_script(steps: &[ScriptStep], device: impl Fn(DeviceBlock) -> RegisterBank) {
    for step in steps {
        let bank = device(step.block);
        if step.clear == u32::MAX {
            bank.write32(step.offset, step.set);
        } else {
            bank.modify32(step.offset, step.clear, step.set);
        }
        arch::dsb_sy();
    }
}

/// Applies an access-permission table: a "grant" write for every region,
/// followed by a "lock" read-modify-write for every region.
///
/// The grant for a region always lands before the lock for that region; once
/// locked, a region's permissions cannot be widened until the next reset.
pub fn grant_then_lock(bank: RegisterBank, start: usize, end: usize, grant: u32, lock: u32) {
    for offset in (start..end).step_by(4) {
        bank.write32(offset, grant);
    }
    arch::dsb_sy();
    for offset in (start..end).step_by(4) {
        bank.modify32(offset, 0, lock);
    }
    arch::dsb_sy();
}

/// How long a spin-wait keeps retrying.
///
/// Production callers wait forever: the conditions polled by this core are
/// guaranteed by hardware to eventually hold, and failure to do so is an
/// unrecoverable fault that a timeout could not fix. Tests bound the wait so
/// exhaustion becomes a deterministic [`ErrorCode::InternalFailure`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryPolicy {
    /// Keep polling until the condition holds.
    Forever,
    /// Give up after the given number of polls.
    Bounded(usize),
}

/// Polls `condition` under the given retry policy.
pub fn poll_until(policy: RetryPolicy, mut condition: impl FnMut() -> bool) -> Result<(), ErrorCode> {
    match policy {
        RetryPolicy::Forever => {
            while !condition() {
                core::hint::spin_loop();
            }
            Ok(())
        }
        RetryPolicy::Bounded(budget) => {
            for _ in 0..budget {
                if condition() {
                    return Ok(());
                }
                core::hint::spin_loop();
            }
            Err(ErrorCode::InternalFailure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{Access, FakeDeviceMemory};
    use super::*;

    fn fake_bank(base: usize) -> RegisterBank {
        RegisterBank::with_memory(base, FakeDeviceMemory::leak_new())
    }

    #[test]
    fn modify_preserves_other_bits() {
        let bank = fake_bank(0x1000);
        bank.write32(0x10, 0xff00_00ff);
        bank.modify32(0x10, 0x0000_00f0, 0x0000_0003);
        assert_eq!(bank.read32(0x10), 0xff00_000f | 0x3);
    }

    #[test]
    fn script_applies_in_table_order() {
        let bank = fake_bank(0x2000);
        let steps = [
            ScriptStep {
                block: DeviceBlock::Ccm,
                offset: 0x54,
                clear: 0x3,
                set: 0x2,
            },
            ScriptStep {
                block: DeviceBlock::Ccm,
                offset: 0x64,
                clear: 1 << 17,
                set: 0,
            },
            ScriptStep {
                block: DeviceBlock::Ccm,
                offset: 0x154,
                clear: u32::MAX,
                set: 1 << 12,
            },
        ];

        apply_script(&steps, |_| bank);

        let writes: Vec<usize> = bank
            .mem
            .log()
            .iter()
            .filter_map(|access| match access {
                Access::Write32 { addr, .. } => Some(*addr),
                _ => None,
            })
            .collect();
        assert_eq!(writes, vec![0x2054, 0x2064, 0x2154]);
    }

    #[test]
    fn grant_precedes_lock_for_every_region() {
        let bank = fake_bank(0x3000);
        grant_then_lock(bank, 0x0, 0x20, 0x00ff_00ff, 0x0100_0100);

        for offset in (0x0..0x20).step_by(4) {
            let addr = 0x3000 + offset;
            let log = bank.mem.log();
            let grant_pos = log
                .iter()
                .position(|access| {
                    matches!(access, Access::Write32 { addr: a, value } if *a == addr && *value == 0x00ff_00ff)
                })
                .expect("missing grant write");
            let lock_pos = log
                .iter()
                .position(|access| {
                    matches!(access, Access::Write32 { addr: a, value } if *a == addr && *value & 0x0100_0100 != 0)
                })
                .expect("missing lock write");
            assert!(grant_pos < lock_pos, "lock before grant at {addr:#x}");
            assert_eq!(bank.read32(offset), 0x01ff_01ff);
        }
    }

    #[test]
    fn bounded_poll_exhaustion_is_internal_failure() {
        let mut polls = 0;
        let result = poll_until(RetryPolicy::Bounded(4), || {
            polls += 1;
            false
        });
        assert_eq!(result, Err(ErrorCode::InternalFailure));
        assert_eq!(polls, 4);

        assert_eq!(poll_until(RetryPolicy::Bounded(4), || true), Ok(()));
    }
}
