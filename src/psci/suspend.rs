// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Deep-sleep entry and resume.
//!
//! Suspending is a two-phase protocol, not a call that returns. The
//! suspending branch captures the privileged state into the retained
//! [`ResumeContext`], reconfigures the power hardware in documented order and
//! executes the wait instruction; not returning is the successful path. After
//! a real power cycle the reset vector runs the resume stub out of retained
//! RAM, which flips the context's checkpoint discriminant to `Resuming` and
//! re-enters the monitor; the resuming branch is an explicit continuation
//! reached through [`crate::psci::Psci::handle_core_boot`], never a reused
//! call stack.

use crate::monitor::{self, EntryPoint, PrivilegedState};
use crate::platform::{Platform, PlatformImpl};
use crate::retained::{RetainedRegion, STUB_SLOT_SIZE};
use crate::{
    arch, layout,
    mmio::{DeviceBlock, ScriptStep, apply_script, grant_then_lock},
};
use arm_psci::{ErrorCode, PowerState};
use core::mem::size_of;
use log::{error, info};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use sha2::{Digest, Sha256};
use spin::mutex::SpinMutex;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Marker stored in [`ResumeContext::magic`].
const RESUME_MAGIC: u32 = 0x5243_5458;

/// Granularity of the integrity checksums over the non-secure shared window.
pub(crate) const CHECKSUM_BLOCK_SIZE: usize = 0x1_0000;

/// Capacity of the checksum table in [`ResumeContext`].
pub(crate) const MAX_CHECKSUM_BLOCKS: usize = 64;

/// Raw value of [`Checkpoint::Resuming`], exported for the resume stub.
pub(crate) const CHECKPOINT_RESUMING: u32 = Checkpoint::Resuming as u32;

/// The two-state discriminant that distinguishes the suspending branch from
/// the resuming continuation. The resume stub stores `Resuming` before
/// re-entering managed code.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub(crate) enum Checkpoint {
    /// Execution is proceeding down the suspending branch.
    Suspending = 0x5355_5350,
    /// Execution re-entered through the resume stub after a power cycle.
    Resuming = 0x5245_5355,
}

/// Depth of a requested suspend.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SleepMode {
    /// Clock-gated wait; returns on the next interrupt.
    Standby,
    /// Power-gated stop with DRAM in self-refresh; exits through the resume
    /// stub.
    DeepSleep,
}

impl SleepMode {
    /// Parses the platform-specific power state descriptor.
    pub(crate) fn try_from_power_state(power_state: PowerState) -> Option<Self> {
        match power_state {
            PowerState::StandbyOrRetention(0) => Some(Self::Standby),
            PowerState::PowerDown(0) => Some(Self::DeepSleep),
            _ => None,
        }
    }
}

/// Progress of the suspend protocol.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SuspendPhase {
    /// No suspend in progress.
    Active,
    /// Capturing state and reconfiguring the power hardware.
    Preparing,
    /// Armed for power-down; the wait instruction is next (or has executed).
    Armed,
    /// A power cycle completed and the saved context was restored.
    Resumed,
    /// A wake raced the sleep entry; run mode was restored without a power
    /// cycle.
    Aborted,
}

/// The state preserved across the power cycle, placed in always-retained
/// memory. Created on the first suspend, reused by every later one.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub(crate) struct ResumeContext {
    magic: u32,
    /// The [`Checkpoint`] discriminant; written by the resume stub, so its
    /// offset is part of the stub contract.
    pub(crate) checkpoint: u32,
    entry_point: u32,
    argument: u32,
    stub_phys: u32,
    shared_size: u32,
    checksum_count: u32,
    monitor: PrivilegedState,
    checksums: [[u8; 32]; MAX_CHECKSUM_BLOCKS],
}

/// Stop mode with the CPU domain power-gated, in documented order: clocking
/// first, then the analog blocks, then the memories, then the power gate.
const DEEP_SLEEP_ENTRY: &[ScriptStep] = &[
    ScriptStep {
        block: DeviceBlock::Ccm,
        offset: layout::CCM_CLPCR,
        clear: layout::CLPCR_LPM_MASK,
        set: layout::CLPCR_LPM_STOP
            | layout::Clpcr::ARM_CLK_DIS_ON_LPM.bits()
            | layout::Clpcr::SBYOS.bits()
            | layout::Clpcr::VSTBY.bits()
            | layout::Clpcr::BYPASS_MMDC_CH1_LPM_HS.bits(),
    },
    ScriptStep {
        block: DeviceBlock::Anatop,
        offset: layout::ANATOP_MISC0_SET,
        clear: u32::MAX,
        set: layout::ANATOP_MISC0_STOP_MODE_CONFIG,
    },
    ScriptStep {
        block: DeviceBlock::Ccm,
        offset: layout::CCM_CGPR,
        clear: layout::Cgpr::INT_MEM_CLK_LPM.bits(),
        set: 0,
    },
    ScriptStep {
        block: DeviceBlock::Gpc,
        offset: layout::GPC_PGC_CPU_CTRL,
        clear: u32::MAX,
        set: layout::GPC_PGC_CTRL_PCR,
    },
];

/// Back to run mode; the inverse of [`DEEP_SLEEP_ENTRY`], power gate first.
const RUN_MODE_RESTORE: &[ScriptStep] = &[
    ScriptStep {
        block: DeviceBlock::Gpc,
        offset: layout::GPC_PGC_CPU_CTRL,
        clear: u32::MAX,
        set: 0,
    },
    ScriptStep {
        block: DeviceBlock::Ccm,
        offset: layout::CCM_CGPR,
        clear: 0,
        set: layout::Cgpr::INT_MEM_CLK_LPM.bits() | layout::Cgpr::MUST_BE_ONE.bits(),
    },
    ScriptStep {
        block: DeviceBlock::Anatop,
        offset: layout::ANATOP_MISC0_CLR,
        clear: u32::MAX,
        set: layout::ANATOP_MISC0_STOP_MODE_CONFIG,
    },
    ScriptStep {
        block: DeviceBlock::Ccm,
        offset: layout::CCM_CLPCR,
        clear: layout::CLPCR_LPM_MASK
            | layout::Clpcr::ARM_CLK_DIS_ON_LPM.bits()
            | layout::Clpcr::SBYOS.bits()
            | layout::Clpcr::VSTBY.bits()
            | layout::Clpcr::BYPASS_MMDC_CH1_LPM_HS.bits(),
        set: layout::CLPCR_LPM_RUN,
    },
];

/// Clock-gated wait mode, power stays on.
const WAIT_MODE_ENTRY: &[ScriptStep] = &[ScriptStep {
    block: DeviceBlock::Ccm,
    offset: layout::CCM_CLPCR,
    clear: layout::CLPCR_LPM_MASK,
    set: layout::CLPCR_LPM_WAIT | layout::Clpcr::ARM_CLK_DIS_ON_LPM.bits(),
}];

/// Leaves wait mode.
const WAIT_MODE_EXIT: &[ScriptStep] = &[ScriptStep {
    block: DeviceBlock::Ccm,
    offset: layout::CCM_CLPCR,
    clear: layout::CLPCR_LPM_MASK | layout::Clpcr::ARM_CLK_DIS_ON_LPM.bits(),
    set: layout::CLPCR_LPM_RUN,
}];

/// Owner of the suspend protocol and of the retained [`ResumeContext`].
pub(crate) struct SuspendManager {
    phase: SpinMutex<SuspendPhase>,
    context: SpinMutex<Option<&'static mut ResumeContext>>,
    saved_wake_masks: SpinMutex<[u32; layout::GPC_IMR_COUNT]>,
}

impl SuspendManager {
    /// Creates the manager; the resume context is claimed lazily on the
    /// first suspend.
    pub(crate) const fn new() -> Self {
        Self {
            phase: SpinMutex::new(SuspendPhase::Active),
            context: SpinMutex::new(None),
            saved_wake_masks: SpinMutex::new([0; layout::GPC_IMR_COUNT]),
        }
    }

    /// Returns the current protocol phase.
    pub(crate) fn phase(&self) -> SuspendPhase {
        *self.phase.lock()
    }

    /// Clock-gated standby: enter wait mode, sleep until any interrupt, and
    /// restore run mode.
    pub(crate) fn standby(&self, platform: &PlatformImpl) {
        apply_script(WAIT_MODE_ENTRY, |block| platform.device(block));
        platform.wait_for_interrupt();
        apply_script(WAIT_MODE_EXIT, |block| platform.device(block));
    }

    /// The suspending branch.
    ///
    /// On success this normally does not return; the power cycle re-enters
    /// through the resume stub. Returning with `Ok` means an unmasked
    /// interrupt raced ahead of sleep entry and run mode was restored - per
    /// this operation's contract the caller must tolerate "woke immediately".
    pub(crate) fn enter_deep_sleep(
        &self,
        platform: &PlatformImpl,
        entry: EntryPoint,
    ) -> Result<(), ErrorCode> {
        *self.phase.lock() = SuspendPhase::Preparing;
        let region = platform.retained_region();

        let stub_phys = {
            let mut guard = self.context.lock();
            if guard.is_none() {
                *guard = Some(claim_context(platform, &region)?);
            }
            let context = guard.as_mut().unwrap();

            context.monitor = monitor::save_privileged_state();
            context.entry_point = entry.pc;
            context.argument = entry.context_id;
            context.checkpoint = Checkpoint::Suspending.into();

            let shared = platform.nonsecure_shared();
            context.shared_size = shared.len() as u32;
            context.checksum_count = if platform.verify_integrity() {
                compute_checksums(shared, &mut context.checksums)
            } else {
                0
            };
            context.stub_phys
        };

        apply_script(DEEP_SLEEP_ENTRY, |block| platform.device(block));
        self.arm_wake_sources(platform);

        // Tell the reset vector where the stub and the context live.
        let src = platform.device(DeviceBlock::Src);
        src.write32(layout::SRC_GPR1, stub_phys);
        src.write32(layout::SRC_GPR1 + 4, region.context_phys());
        arch::dsb_sy();

        // The power rails may cycle; push the retained state out past every
        // cache level first.
        platform.clean_cache_range(
            region.virt,
            region.phys,
            STUB_SLOT_SIZE + size_of::<ResumeContext>(),
        );

        *self.phase.lock() = SuspendPhase::Armed;
        info!("entering deep sleep");
        platform.wait_for_interrupt();

        info!("wake raced deep-sleep entry; aborting suspend");
        self.disarm(platform);
        *self.phase.lock() = SuspendPhase::Aborted;
        Ok(())
    }

    /// Returns whether the resume stub re-entered us after a power cycle.
    pub(crate) fn resuming(&self) -> bool {
        if *self.phase.lock() != SuspendPhase::Armed {
            return false;
        }
        self.context.lock().as_deref().is_some_and(|context| {
            matches!(
                Checkpoint::try_from(context.checkpoint),
                Ok(Checkpoint::Resuming)
            )
        })
    }

    /// The resuming branch, reached only through the resume stub.
    ///
    /// Restores run mode, re-asserts the peripheral access policy and, when
    /// the policy flag is set, verifies the shared-memory checksums. A
    /// mismatch halts the secure environment: it may indicate a hardware
    /// fault or a tamper that happened while the machine's protections were
    /// not fully active, and neither can be recovered from.
    pub(crate) fn finish_resume(&self, platform: &PlatformImpl) -> EntryPoint {
        self.disarm(platform);

        grant_then_lock(
            platform.device(DeviceBlock::Csu),
            layout::CSU_CSL_START,
            layout::CSU_CSL_END,
            layout::CSU_ACCESS_ALL,
            layout::CSU_SETTING_LOCK,
        );

        let mut guard = self.context.lock();
        let context = guard.as_mut().expect("resuming without an armed suspend");

        // The stub vouched for the checkpoint word only; the marker guards
        // against a retained window that lost or mangled its contents.
        if context.magic != RESUME_MAGIC {
            error!("resume context marker corrupted");
            platform.halt();
        }

        if platform.verify_integrity() {
            verify_checksums(platform, context);
        }

        // The continuation is consumed; the next suspend starts clean.
        context.checkpoint = Checkpoint::Suspending.into();
        let entry = EntryPoint {
            pc: context.entry_point,
            context_id: context.argument,
        };
        drop(guard);

        *self.phase.lock() = SuspendPhase::Resumed;
        info!("resumed from deep sleep; non-secure world continues at {:#010x}", entry.pc);
        entry
    }

    /// Disarms power gating, restores run-mode clocking and wake masks, and
    /// clears the rendezvous registers. Shared by the abort and resume paths.
    fn disarm(&self, platform: &PlatformImpl) {
        apply_script(RUN_MODE_RESTORE, |block| platform.device(block));
        self.restore_wake_sources(platform);

        let src = platform.device(DeviceBlock::Src);
        src.write32(layout::SRC_GPR1, 0);
        src.write32(layout::SRC_GPR1 + 4, 0);
        arch::dsb_sy();
    }

    /// Unmasks exactly the whitelisted wake sources; everything else is
    /// masked for the duration of the sleep. The previous masks are saved for
    /// the unwind.
    fn arm_wake_sources(&self, platform: &PlatformImpl) {
        let gpc = platform.device(DeviceBlock::Gpc);
        let mut masks = [u32::MAX; layout::GPC_IMR_COUNT];
        for source in platform.wake_sources() {
            let Some(relative) = source.irq.checked_sub(32) else {
                continue;
            };
            let bank = (relative / 32) as usize;
            if bank < layout::GPC_IMR_COUNT {
                masks[bank] &= !(1 << (relative % 32));
            }
        }

        let mut saved = self.saved_wake_masks.lock();
        for (bank, mask) in masks.iter().enumerate() {
            let offset = layout::GPC_IMR1 + 4 * bank;
            saved[bank] = gpc.read32(offset);
            gpc.write32(offset, *mask);
        }
    }

    fn restore_wake_sources(&self, platform: &PlatformImpl) {
        let gpc = platform.device(DeviceBlock::Gpc);
        let saved = self.saved_wake_masks.lock();
        for (bank, mask) in saved.iter().enumerate() {
            gpc.write32(layout::GPC_IMR1 + 4 * bank, *mask);
        }
    }

    /// Mirrors the store the resume stub performs before re-entering managed
    /// code, so tests can drive the resuming continuation.
    #[cfg(test)]
    pub(crate) fn simulate_power_cycle(&self) {
        self.context
            .lock()
            .as_mut()
            .expect("suspend was never armed")
            .checkpoint = Checkpoint::Resuming.into();
    }
}

/// Claims the retained window on the first suspend: copies the stub image
/// into its slot and formats the context after it.
fn claim_context(
    platform: &PlatformImpl,
    region: &RetainedRegion,
) -> Result<&'static mut ResumeContext, ErrorCode> {
    let stub = platform.resume_stub();
    if stub.len() > STUB_SLOT_SIZE || size_of::<ResumeContext>() > region.context_capacity() {
        error!("retained window cannot hold the resume state");
        return Err(ErrorCode::InternalFailure);
    }

    // SAFETY: The platform reserves the retained window exclusively for this
    // manager, which formats it exactly once; the slot offsets keep the stub
    // and context disjoint, and the context slot is word aligned.
    let (stub_slot, context_bytes): (&'static mut [u8], &'static mut [u8]) = unsafe {
        (
            core::slice::from_raw_parts_mut(region.stub_virt() as *mut u8, stub.len()),
            core::slice::from_raw_parts_mut(
                region.context_virt() as *mut u8,
                size_of::<ResumeContext>(),
            ),
        )
    };

    stub_slot.copy_from_slice(stub);
    arch::invalidate_icache_range(region.stub_virt(), stub.len());

    context_bytes.fill(0);
    let context =
        ResumeContext::mut_from_bytes(context_bytes).map_err(|_| ErrorCode::InternalFailure)?;
    context.magic = RESUME_MAGIC;
    context.stub_phys = region.stub_phys();
    Ok(context)
}

/// Fills the checksum table from the shared window; returns the block count.
fn compute_checksums(shared: &[u8], out: &mut [[u8; 32]; MAX_CHECKSUM_BLOCKS]) -> u32 {
    let blocks = shared.chunks(CHECKSUM_BLOCK_SIZE);
    assert!(blocks.len() <= MAX_CHECKSUM_BLOCKS);
    let mut count = 0;
    for (index, block) in blocks.enumerate() {
        out[index] = Sha256::digest(block).into();
        count = index as u32 + 1;
    }
    count
}

/// Recomputes the checksums and compares them against the captured table.
/// Any difference halts the secure environment.
fn verify_checksums(platform: &PlatformImpl, context: &ResumeContext) {
    let shared = platform.nonsecure_shared();
    if shared.len() as u32 != context.shared_size {
        error!("resume integrity check failed: shared window size changed");
        platform.halt();
    }
    let blocks = shared.chunks(CHECKSUM_BLOCK_SIZE);
    if blocks.len() as u32 != context.checksum_count {
        error!("resume integrity check failed: block count changed");
        platform.halt();
    }
    for (index, block) in blocks.enumerate() {
        let digest: [u8; 32] = Sha256::digest(block).into();
        if digest != context.checksums[index] {
            error!("resume integrity check failed on block {index}");
            platform.halt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_mode_parsing() {
        assert_eq!(
            SleepMode::try_from_power_state(PowerState::StandbyOrRetention(0)),
            Some(SleepMode::Standby)
        );
        assert_eq!(
            SleepMode::try_from_power_state(PowerState::PowerDown(0)),
            Some(SleepMode::DeepSleep)
        );
        assert_eq!(
            SleepMode::try_from_power_state(PowerState::PowerDown(0x33)),
            None
        );
        assert_eq!(
            SleepMode::try_from_power_state(PowerState::StandbyOrRetention(2)),
            None
        );
    }

    #[test]
    fn checksums_track_content() {
        let mut shared = vec![0u8; 2 * CHECKSUM_BLOCK_SIZE];
        let mut before: [[u8; 32]; MAX_CHECKSUM_BLOCKS] = crate::retained::const_zeroed();
        assert_eq!(compute_checksums(&shared, &mut before), 2);

        let mut after: [[u8; 32]; MAX_CHECKSUM_BLOCKS] = crate::retained::const_zeroed();
        compute_checksums(&shared, &mut after);
        assert_eq!(before, after);

        shared[CHECKSUM_BLOCK_SIZE + 17] ^= 0x01;
        compute_checksums(&shared, &mut after);
        assert_eq!(before[0], after[0]);
        assert_ne!(before[1], after[1]);
    }

    #[test]
    fn checkpoint_discriminants_are_distinct() {
        assert_ne!(u32::from(Checkpoint::Suspending), CHECKPOINT_RESUMING);
        assert!(matches!(
            Checkpoint::try_from(CHECKPOINT_RESUMING),
            Ok(Checkpoint::Resuming)
        ));
        assert!(Checkpoint::try_from(0).is_err());
    }
}
