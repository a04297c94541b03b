// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Bring-up, park and state query for the secondary cores.
//!
//! Cross-core coordination happens through the SRC general-purpose registers,
//! used as one rendezvous slot per core. The slots are single-writer
//! mailboxes over uncached device memory; visibility is guaranteed by an
//! explicit write-back before signalling the peer and an invalidate before
//! reading what the peer published, never by language-level synchronisation.

use crate::monitor::{CoresImpl, EntryPoint};
use crate::platform::{Platform, PlatformImpl};
use crate::{
    arch, layout,
    mmio::{DeviceBlock, poll_until},
};
use arm_psci::{AffinityInfo, ErrorCode};
use log::{debug, info};
use percore::Cores;
use spin::mutex::SpinMutex;

/// Lifecycle of one physical core, driven by this module.
///
/// A core's own transition into `Parking` (and later `Off`) is
/// self-initiated; the transition towards `On` is driven by another core
/// calling bring-up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum LifecycleState {
    /// Clock gated, waiting in reset or parked and torn down.
    Off,
    /// Released from reset, but its boot path has not reported in yet.
    OnPending,
    /// Executing.
    On,
    /// Told to park itself; teardown completes on the next state query.
    Parking,
}

/// Per-core bookkeeping, owned by the PSCI service.
pub(crate) struct CoreState {
    pub(crate) state: LifecycleState,
}

/// The per-core state table.
pub(crate) type CoreStates = [SpinMutex<CoreState>; PlatformImpl::CORE_COUNT];

/// Slot value a core publishes once it has parked itself. Never a valid entry
/// point, since entry points are at least word aligned.
pub(crate) const PARKED_SENTINEL: u32 = 1;

/// Writes a rendezvous slot and makes it visible to the target core
/// regardless of cache state.
fn slot_publish(platform: &PlatformImpl, core_index: usize, entry: u32, argument: u32) {
    let src = platform.device(DeviceBlock::Src);
    let offset = layout::src_gpr_pair(core_index);
    src.write32(offset, entry);
    src.write32(offset + 4, argument);
    arch::dsb_sy();
    platform.clean_cache_range(src.base() + offset, layout::SRC_BASE + offset as u32, 8);
}

/// Reads a rendezvous slot, discarding any locally cached copy first.
fn slot_read(platform: &PlatformImpl, core_index: usize) -> (u32, u32) {
    let src = platform.device(DeviceBlock::Src);
    let offset = layout::src_gpr_pair(core_index);
    platform.invalidate_cache_range(src.base() + offset, layout::SRC_BASE + offset as u32, 8);
    (src.read32(offset), src.read32(offset + 4))
}

/// Brings a secondary core out of reset towards the given non-secure entry
/// point.
///
/// Fire-and-forget: the target core's early reset handling reads the slot;
/// this call returns as soon as the core is released.
pub(crate) fn bring_up(
    platform: &PlatformImpl,
    cores: &CoreStates,
    core_index: usize,
    entry: EntryPoint,
) -> Result<(), ErrorCode> {
    if core_index == 0 || core_index >= PlatformImpl::CORE_COUNT {
        return Err(ErrorCode::InvalidParameters);
    }

    let mut core = cores[core_index].lock();
    match core.state {
        LifecycleState::On | LifecycleState::Parking => return Err(ErrorCode::AlreadyOn),
        LifecycleState::OnPending => return Err(ErrorCode::OnPending),
        LifecycleState::Off => {}
    }
    core.state = LifecycleState::OnPending;

    slot_publish(platform, core_index, entry.pc, entry.context_id);

    // Only now release the core: enable its clock and take it out of reset.
    let shift = core_index as u32 - 1;
    platform.device(DeviceBlock::Src).modify32(
        layout::SRC_SCR,
        0,
        1 << (layout::SRC_SCR_CORE1_ENABLE_SHIFT + shift)
            | 1 << (layout::SRC_SCR_CORE1_RST_SHIFT + shift),
    );

    debug!("released core {core_index} towards {:#010x}", entry.pc);
    Ok(())
}

/// Parks the calling core. Never returns; a spurious wake loops straight back
/// into the wait instruction.
pub(crate) fn park(platform: &PlatformImpl, cores: &CoreStates) -> ! {
    let core_index = CoresImpl::core_index();
    info!("parking core {core_index}");

    cores[core_index].lock().state = LifecycleState::Parking;
    slot_publish(platform, core_index, PARKED_SENTINEL, 0);

    arch::mask_all_exceptions();
    platform.park_loop()
}

/// Returns whether the given core has finished parking itself: its status
/// byte reports the wait instruction and its slot holds the sentinel.
pub(crate) fn is_parked(platform: &PlatformImpl, core_index: usize) -> bool {
    let scu = platform.device(DeviceBlock::Scu);
    let waiting =
        scu.read32(layout::SCU_CPU_POWER_STATUS) & layout::scu_status_mask(core_index) != 0;
    if !waiting {
        return false;
    }
    let (entry, _) = slot_read(platform, core_index);
    entry == PARKED_SENTINEL
}

/// Queries the lifecycle state of a core.
///
/// A core observed mid-park is waited for and then torn down: once the wait
/// status and the sentinel both confirm the park, its clock enable is removed
/// and the core reports `Off`. The wait is unbounded in production; the only
/// legitimate caller already told the target to park, so not parking
/// indicates an unrecoverable hardware fault.
pub(crate) fn query(
    platform: &PlatformImpl,
    cores: &CoreStates,
    core_index: usize,
) -> Result<AffinityInfo, ErrorCode> {
    if core_index >= PlatformImpl::CORE_COUNT {
        return Err(ErrorCode::InvalidParameters);
    }

    let mut core = cores[core_index].lock();
    match core.state {
        LifecycleState::Off => Ok(AffinityInfo::Off),
        LifecycleState::On => Ok(AffinityInfo::On),
        LifecycleState::OnPending => Ok(AffinityInfo::OnPending),
        LifecycleState::Parking => {
            poll_until(platform.poll_policy(), || is_parked(platform, core_index))?;

            // The core sits in its wait loop with exceptions masked; finish
            // the teardown by gating its clock. The primary core has no
            // enable bit.
            if core_index >= 1 {
                let shift = core_index as u32 - 1;
                platform.device(DeviceBlock::Src).modify32(
                    layout::SRC_SCR,
                    1 << (layout::SRC_SCR_CORE1_ENABLE_SHIFT + shift),
                    0,
                );
            }
            core.state = LifecycleState::Off;
            debug!("core {core_index} parked and torn down");
            Ok(AffinityInfo::Off)
        }
    }
}

/// Completes a bring-up on the freshly booted core: consumes its rendezvous
/// slot and reports it `On`.
///
/// Panics if the core was not released by a bring-up; a core executing this
/// path without one means the reset controller state and ours disagree.
pub(crate) fn finish_bring_up(platform: &PlatformImpl, cores: &CoreStates) -> EntryPoint {
    let core_index = CoresImpl::core_index();
    let mut core = cores[core_index].lock();
    assert_eq!(
        core.state,
        LifecycleState::OnPending,
        "core {core_index} booted without a pending bring-up"
    );

    let (pc, context_id) = slot_read(platform, core_index);
    assert_ne!(pc, PARKED_SENTINEL, "core {core_index} booted from a parked slot");

    core.state = LifecycleState::On;
    debug!("core {core_index} is up");
    EntryPoint { pc, context_id }
}
